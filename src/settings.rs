//! Файл настроек в формате TOML.
//!
//! ```toml
//! [credentials]
//! username = "dev@example.com"
//! password = "secret"
//! vendor = "85012345"
//!
//! [reports]
//! folder = "/var/lib/itc"
//! use_cache = true
//! mode = "earnings-only"
//! verify_tls = true
//! strict = false
//! ```

use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::ReportError;
use crate::report::ReporterBuilder;
use crate::types::InclusionMode;

/// Настройки из файла; все поля необязательны.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Учётные данные.
    #[serde(default)]
    pub credentials: CredentialSettings,
    /// Параметры загрузки отчётов.
    #[serde(default)]
    pub reports: ReportSettings,
}

/// Раздел `[credentials]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialSettings {
    /// Логин.
    pub username: Option<String>,
    /// Пароль.
    pub password: Option<String>,
    /// Идентификатор поставщика.
    pub vendor: Option<String>,
}

/// Раздел `[reports]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportSettings {
    /// Каталог кэша.
    pub folder: Option<String>,
    /// Читать ли отчёты из кэша.
    #[serde(default = "default_true")]
    pub use_cache: bool,
    /// Режим учёта бесплатных загрузок: `all` или `earnings-only`.
    #[serde(default)]
    pub mode: InclusionMode,
    /// Проверять ли TLS-сертификат.
    #[serde(default = "default_true")]
    pub verify_tls: bool,
    /// Строгий режим ошибок.
    #[serde(default)]
    pub strict: bool,
}

const fn default_true() -> bool {
    true
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            folder: None,
            use_cache: true,
            mode: InclusionMode::All,
            verify_tls: true,
            strict: false,
        }
    }
}

impl Settings {
    /// Разбирает настройки из строки TOML.
    pub fn parse(content: &str) -> Result<Self, ReportError> {
        Ok(toml::from_str(content)?)
    }

    /// Загружает настройки из файла; отсутствующий файл даёт настройки по умолчанию.
    pub fn load_from(path: &Path) -> Result<Self, ReportError> {
        if !path.exists() {
            debug!(path = %path.display(), "settings file not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let settings = Self::parse(&content)?;
        info!(path = %path.display(), "settings loaded");
        Ok(settings)
    }

    /// Builder клиента, заполненный из настроек.
    pub fn into_builder(self) -> ReporterBuilder {
        let Self {
            credentials,
            reports,
        } = self;
        let mut builder = ReporterBuilder::new()
            .mode(reports.mode)
            .use_cache(reports.use_cache)
            .verify_tls(reports.verify_tls)
            .strict(reports.strict);
        if let Some(username) = credentials.username {
            builder = builder.login(username);
        }
        if let Some(password) = credentials.password {
            builder = builder.password(password);
        }
        if let Some(vendor) = credentials.vendor {
            builder = builder.vendor(vendor);
        }
        if let Some(folder) = reports.folder {
            builder = builder.folder(folder);
        }
        builder
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let settings = Settings::parse("").unwrap();
        assert_eq!(settings, Settings::default());
        assert!(settings.reports.use_cache);
        assert!(settings.reports.verify_tls);
    }

    #[test]
    fn full_file_is_applied_to_builder() {
        let dir = tempfile::tempdir().unwrap();
        let content = format!(
            r#"
            [credentials]
            username = "dev@example.com"
            password = "secret"
            vendor = "85012345"

            [reports]
            folder = "{}"
            use_cache = false
            mode = "earnings-only"
            strict = true
            "#,
            dir.path().display()
        );
        let config = Settings::parse(&content).unwrap().into_builder().config().unwrap();
        assert_eq!(config.credentials.username, "dev@example.com");
        assert_eq!(config.credentials.vendor, "85012345");
        assert_eq!(config.mode, InclusionMode::EarningsOnly);
        assert_eq!(config.folder.as_deref(), Some(dir.path()));
        assert!(!config.use_cache);
        assert!(config.strict);
        assert!(config.verify_tls);
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let err = Settings::parse("[reports]\nmode = \"free-only\"\n").unwrap_err();
        assert!(matches!(err, ReportError::Settings(_)));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("itc.toml")).unwrap();
        assert_eq!(settings, Settings::default());
    }
}
