//! Ошибки загрузки и агрегации отчётов, а также накопитель нефатальных ошибок.

use tracing::warn;

/// Ошибка загрузки или разбора отчёта о продажах.
#[derive(thiserror::Error, Debug)]
pub enum ReportError {
    /// Не хватает учётных данных или каталог кэша непригоден.
    #[error("{0}")]
    Configuration(String),
    /// Переданная дата не прошла проверку, будет использована дата по умолчанию.
    #[error("Specified date is not a valid value, using default")]
    InvalidDate {
        /// Исходное значение даты.
        value: String,
    },
    /// Комбинации тип/подтип/период нет в таблице возможностей.
    #[error("Report '{report_type} / {subtype} / {granularity}' is not available")]
    UnsupportedReport {
        /// Тип отчёта.
        report_type: String,
        /// Подтип отчёта.
        subtype: String,
        /// Период отчёта.
        granularity: String,
    },
    /// Сбой соединения, DNS или TLS.
    #[error("{0}")]
    Transport(String),
    /// Сервис вернул сообщение об ошибке.
    #[error("{0}")]
    Application(String),
    /// Сервис не вернул список поставщиков или учётных записей.
    #[error("{0}")]
    ListingUnavailable(String),
    /// Не удалось распаковать или открыть отчёт.
    #[error("{0}")]
    Decode(String),
    /// Ошибка ввода-вывода.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Ошибка сериализации JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Файл настроек не разобран.
    #[error("Settings error: {0}")]
    Settings(#[from] toml::de::Error),
}

impl ReportError {
    /// Фатальные ошибки всегда возвращаются вызывающему немедленно,
    /// остальные попадают в [`Outcome::errors`] вне строгого режима.
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::InvalidDate { .. } | Self::ListingUnavailable(_))
    }
}

/// Накопитель нефатальных ошибок одного запроса.
///
/// В строгом режиме любая ошибка сразу возвращается как `Err`.
#[derive(Debug, Default)]
pub(crate) struct Diagnostics {
    strict: bool,
    errors: Vec<ReportError>,
}

impl Diagnostics {
    pub(crate) const fn new(strict: bool) -> Self {
        Self {
            strict,
            errors: Vec::new(),
        }
    }

    /// Записывает ошибку или возвращает её, если включён строгий режим.
    pub(crate) fn soft(&mut self, err: ReportError) -> Result<(), ReportError> {
        if self.strict {
            return Err(err);
        }
        warn!(error = %err, "soft error recorded");
        self.errors.push(err);
        Ok(())
    }

    /// Возвращает фатальную ошибку, нефатальную передаёт в [`Self::soft`].
    pub(crate) fn record(&mut self, err: ReportError) -> Result<(), ReportError> {
        if err.is_fatal() {
            return Err(err);
        }
        self.soft(err)
    }

    pub(crate) fn finish<T>(self, value: Option<T>) -> Outcome<T> {
        Outcome {
            value,
            errors: self.errors,
        }
    }
}

/// Результат операции вместе с накопленными нефатальными ошибками.
#[derive(Debug)]
pub struct Outcome<T> {
    /// Значение, `None` при нефатальном отказе.
    pub value: Option<T>,
    /// Нефатальные ошибки в порядке возникновения.
    pub errors: Vec<ReportError>,
}

impl<T> Outcome<T> {
    /// Есть ли накопленные ошибки.
    #[inline]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Ошибки, объединённые переводом строки.
    pub fn errors_as_string(&self) -> String {
        self.errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Забирает значение, отбрасывая ошибки.
    #[inline]
    pub fn into_value(self) -> Option<T> {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_mode_raises_soft_errors() {
        let mut diag = Diagnostics::new(true);
        let err = diag
            .soft(ReportError::InvalidDate {
                value: "2016".into(),
            })
            .unwrap_err();
        assert!(matches!(err, ReportError::InvalidDate { .. }));
    }

    #[test]
    fn permissive_mode_collects_errors() {
        let mut diag = Diagnostics::new(false);
        diag.soft(ReportError::InvalidDate {
            value: "x".into(),
        })
        .unwrap();
        diag.soft(ReportError::Application("Invalid vendor".into()))
            .unwrap();
        let outcome: Outcome<()> = diag.finish(None);
        assert!(outcome.has_errors());
        assert_eq!(
            outcome.errors_as_string(),
            "Specified date is not a valid value, using default\nInvalid vendor"
        );
    }

    #[test]
    fn fatality_by_kind() {
        assert!(!ReportError::InvalidDate { value: String::new() }.is_fatal());
        assert!(!ReportError::ListingUnavailable("Access denied".into()).is_fatal());
        assert!(ReportError::Transport("timeout".into()).is_fatal());
        assert!(ReportError::Application("Invalid vendor".into()).is_fatal());
        assert!(ReportError::Decode("bad gzip".into()).is_fatal());
    }

    #[test]
    fn record_raises_fatal_and_collects_the_rest() {
        let mut diag = Diagnostics::new(false);
        let err = diag
            .record(ReportError::Application("Invalid vendor".into()))
            .unwrap_err();
        assert!(matches!(err, ReportError::Application(_)));
        diag.record(ReportError::ListingUnavailable("Access denied".into()))
            .unwrap();
        let outcome: Outcome<()> = diag.finish(None);
        assert_eq!(outcome.errors_as_string(), "Access denied");

        let mut strict = Diagnostics::new(true);
        assert!(strict
            .record(ReportError::ListingUnavailable("Access denied".into()))
            .is_err());
    }
}
