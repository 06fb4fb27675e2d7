//! Нормализация даты отчёта под формат периода.

use chrono::{Datelike, Days, Local, NaiveDate};
use tracing::debug;

use crate::error::ReportError;
use crate::types::DateGranularity;
use crate::utils::is_epoch_sentinel;

/// Канонический формат даты в запросе.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    /// `YYYYMMDD`.
    Day,
    /// `YYYYMM`.
    Month,
    /// `YYYY`.
    Year,
}

impl DateFormat {
    /// Формат, которого требует период.
    pub const fn for_granularity(granularity: DateGranularity) -> Self {
        match granularity {
            DateGranularity::Daily | DateGranularity::Weekly => Self::Day,
            DateGranularity::Monthly => Self::Month,
            DateGranularity::Yearly => Self::Year,
        }
    }

    /// Шаблон `strftime`.
    pub const fn pattern(self) -> &'static str {
        match self {
            Self::Day => "%Y%m%d",
            Self::Month => "%Y%m",
            Self::Year => "%Y",
        }
    }

    /// Длина строки в этом формате.
    pub const fn width(self) -> usize {
        match self {
            Self::Day => 8,
            Self::Month => 6,
            Self::Year => 4,
        }
    }

    /// Форматирует дату.
    pub fn format(self, date: NaiveDate) -> String {
        date.format(self.pattern()).to_string()
    }
}

/// Дата запроса после нормализации.
#[derive(Debug)]
pub struct ResolvedDate {
    /// Дата в каноническом формате периода.
    pub date: String,
    /// Предупреждение, если исходная дата была отброшена.
    pub warning: Option<ReportError>,
}

/// Нормализует дату относительно сегодняшнего локального дня.
#[inline]
pub fn resolve(raw: Option<&str>, granularity: DateGranularity) -> ResolvedDate {
    resolve_at(raw, granularity, Local::now().date_naive())
}

/// Нормализует дату относительно заданного `today`.
///
/// Без даты берётся вчерашний день для `Daily` и `today` для остальных периодов.
/// Недельные отчёты всегда приводятся к воскресенью, см. [`week_ending_sunday`].
pub fn resolve_at(raw: Option<&str>, granularity: DateGranularity, today: NaiveDate) -> ResolvedDate {
    let mut warning = None;
    let parsed = raw.and_then(|value| {
        let date = parse_canonical(value, granularity);
        if date.is_none() {
            debug!(value, %granularity, "rejecting report date");
            warning = Some(ReportError::InvalidDate {
                value: value.to_string(),
            });
        }
        date
    });

    let mut date = parsed.unwrap_or_else(|| default_date(granularity, today));
    if granularity == DateGranularity::Weekly {
        date = week_ending_sunday(date);
    }

    ResolvedDate {
        date: DateFormat::for_granularity(granularity).format(date),
        warning,
    }
}

/// Воскресенье недели, начинающейся с понедельника строго раньше `date`.
pub fn week_ending_sunday(date: NaiveDate) -> NaiveDate {
    let back = match date.weekday().num_days_from_monday() {
        0 => 7,
        n => u64::from(n),
    };
    date - Days::new(back) + Days::new(6)
}

fn default_date(granularity: DateGranularity, today: NaiveDate) -> NaiveDate {
    match granularity {
        DateGranularity::Daily => today.pred_opt().unwrap_or(today),
        _ => today,
    }
}

/// Разбирает дату и проверяет, что форматирование возвращает ту же строку.
fn parse_canonical(value: &str, granularity: DateGranularity) -> Option<NaiveDate> {
    let format = DateFormat::for_granularity(granularity);
    if value.len() != format.width() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let year: i32 = value[0..4].parse().ok()?;
    let date = match format {
        DateFormat::Year => NaiveDate::from_ymd_opt(year, 1, 1)?,
        DateFormat::Month => NaiveDate::from_ymd_opt(year, value[4..6].parse().ok()?, 1)?,
        DateFormat::Day => {
            NaiveDate::from_ymd_opt(year, value[4..6].parse().ok()?, value[6..8].parse().ok()?)?
        }
    };

    if is_epoch_sentinel(date) {
        return None;
    }
    (format.format(date) == value).then_some(date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn defaults_follow_granularity() {
        let today = ymd(2016, 11, 23);
        assert_eq!(resolve_at(None, DateGranularity::Daily, today).date, "20161122");
        assert_eq!(resolve_at(None, DateGranularity::Monthly, today).date, "201611");
        assert_eq!(resolve_at(None, DateGranularity::Yearly, today).date, "2016");
        assert!(resolve_at(None, DateGranularity::Daily, today).warning.is_none());
    }

    #[test]
    fn canonical_dates_are_kept() {
        let today = ymd(2020, 1, 1);
        for (raw, granularity) in [
            ("20161122", DateGranularity::Daily),
            ("201602", DateGranularity::Monthly),
            ("2015", DateGranularity::Yearly),
        ] {
            let resolved = resolve_at(Some(raw), granularity, today);
            assert_eq!(resolved.date, raw);
            assert!(resolved.warning.is_none());
        }
    }

    #[test]
    fn invalid_dates_fall_back_with_warning() {
        let today = ymd(2016, 11, 23);
        for raw in ["20160230", "2016113", "2016-11-22", "abcdefgh", "19700101"] {
            let resolved = resolve_at(Some(raw), DateGranularity::Daily, today);
            assert_eq!(resolved.date, "20161122", "input {raw}");
            assert!(matches!(
                resolved.warning,
                Some(ReportError::InvalidDate { ref value }) if value == raw
            ));
        }
        let monthly = resolve_at(Some("201613"), DateGranularity::Monthly, today);
        assert_eq!(monthly.date, "201611");
        assert!(monthly.warning.is_some());
    }

    #[test]
    fn weekly_snaps_to_sunday_within_six_days() {
        let mut date = ymd(2016, 1, 1);
        while date < ymd(2017, 1, 1) {
            let sunday = week_ending_sunday(date);
            assert_eq!(sunday.weekday(), Weekday::Sun);
            assert!((sunday - date).num_days().abs() <= 6, "{date} -> {sunday}");
            assert_eq!(week_ending_sunday(sunday), sunday);
            date = date.succ_opt().unwrap();
        }
    }

    #[test]
    fn weekly_resolution_is_idempotent() {
        let today = ymd(2016, 12, 1);
        let first = resolve_at(Some("20161122"), DateGranularity::Weekly, today);
        let expected = ymd(2016, 11, 21) + Days::new(6);
        assert_eq!(first.date, expected.format("%Y%m%d").to_string());
        let again = resolve_at(Some(&first.date), DateGranularity::Weekly, today);
        assert_eq!(again.date, first.date);
    }

    #[test]
    fn monday_maps_to_previous_sunday() {
        assert_eq!(week_ending_sunday(ymd(2016, 11, 21)), ymd(2016, 11, 20));
    }
}
