//! Таблица доступных отчётов: тип → подтип → период → формат даты.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::date::DateFormat;
use crate::error::ReportError;
use crate::types::{DateGranularity, ReportSubType, ReportType};

/// Периоды подтипа и формат даты для каждого.
pub type GranularityFormats = BTreeMap<DateGranularity, DateFormat>;

/// Полная таблица возможностей сервиса.
pub type CapabilityTable = BTreeMap<ReportType, BTreeMap<ReportSubType, GranularityFormats>>;

static CAPABILITIES: LazyLock<CapabilityTable> = LazyLock::new(|| {
    use DateGranularity::{Daily, Monthly, Weekly, Yearly};

    let entry = |granularities: &[DateGranularity]| -> GranularityFormats {
        granularities
            .iter()
            .map(|g| (*g, DateFormat::for_granularity(*g)))
            .collect()
    };

    BTreeMap::from([
        (
            ReportType::Sales,
            BTreeMap::from([
                (
                    ReportSubType::Summary,
                    entry(&[Daily, Weekly, Monthly, Yearly]),
                ),
                (ReportSubType::OptIn, entry(&[Weekly])),
            ]),
        ),
        (
            ReportType::SubscriptionEvent,
            BTreeMap::from([(ReportSubType::Summary, entry(&[Daily]))]),
        ),
        (
            ReportType::Subscription,
            BTreeMap::from([(ReportSubType::Summary, entry(&[Daily]))]),
        ),
        (
            ReportType::Newsstand,
            BTreeMap::from([(ReportSubType::Detailed, entry(&[Daily, Weekly]))]),
        ),
    ])
});

/// Таблица возможностей, общая для всех запросов.
#[inline]
pub fn capabilities() -> &'static CapabilityTable {
    &CAPABILITIES
}

/// Проверяет комбинацию и возвращает формат даты для неё.
pub fn validate(
    report_type: ReportType,
    subtype: ReportSubType,
    granularity: DateGranularity,
) -> Result<DateFormat, ReportError> {
    CAPABILITIES
        .get(&report_type)
        .and_then(|subtypes| subtypes.get(&subtype))
        .and_then(|granularities| granularities.get(&granularity))
        .copied()
        .ok_or_else(|| ReportError::UnsupportedReport {
            report_type: report_type.to_string(),
            subtype: subtype.to_string(),
            granularity: granularity.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sales_summary_supports_all_granularities() {
        for g in [
            DateGranularity::Daily,
            DateGranularity::Weekly,
            DateGranularity::Monthly,
            DateGranularity::Yearly,
        ] {
            assert!(validate(ReportType::Sales, ReportSubType::Summary, g).is_ok());
        }
        assert_eq!(
            validate(ReportType::Sales, ReportSubType::Summary, DateGranularity::Monthly).unwrap(),
            DateFormat::Month
        );
    }

    #[test]
    fn unknown_combinations_are_rejected() {
        let err = validate(ReportType::Sales, ReportSubType::OptIn, DateGranularity::Daily)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Report 'Sales / Opt-In / Daily' is not available"
        );
        assert!(
            validate(ReportType::Newsstand, ReportSubType::Summary, DateGranularity::Daily)
                .is_err()
        );
        assert!(
            validate(ReportType::Subscription, ReportSubType::Summary, DateGranularity::Weekly)
                .is_err()
        );
    }

    #[test]
    fn table_has_nine_granularity_entries() {
        let count: usize = capabilities()
            .values()
            .flat_map(BTreeMap::values)
            .map(BTreeMap::len)
            .sum();
        assert_eq!(count, 9);
    }
}
