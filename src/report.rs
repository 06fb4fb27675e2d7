//! Настройки клиента и загрузка отчётов: кэш, запрос, распаковка, агрегация.

use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use tracing::{debug, info};

use crate::cache::{validate_folder, Artifact, ReportCache, ReportIdentity};
use crate::capability;
use crate::date::resolve_at;
use crate::decode::decompress;
use crate::error::{Diagnostics, Outcome, ReportError};
use crate::parser::aggregate;
use crate::query::{build_payload, Query, SALES_ENDPOINT};
use crate::response::{interpret, ResponseOutcome};
use crate::transport::{HttpTransport, Transport};
use crate::types::{
    AggregatedReport, Credentials, DateGranularity, InclusionMode, ListingQuery, ReportQuery,
    ReportRequest,
};

/// Неизменяемые настройки клиента.
#[derive(Debug, Clone)]
pub struct ReporterConfig {
    /// Учётные данные.
    pub credentials: Credentials,
    /// Режим учёта бесплатных загрузок.
    pub mode: InclusionMode,
    /// Каталог кэша; без него отчёт хранится во временном каталоге.
    pub folder: Option<PathBuf>,
    /// Использовать ли сохранённые отчёты.
    pub use_cache: bool,
    /// Проверять ли TLS-сертификат.
    pub verify_tls: bool,
    /// Строгий режим: любая ошибка прерывает запрос.
    pub strict: bool,
    /// Адрес сервиса.
    pub endpoint: String,
}

/// Builder для [`ReporterConfig`] и [`Reporter`].
#[derive(Debug, Clone)]
pub struct ReporterBuilder {
    credentials: Credentials,
    mode: InclusionMode,
    folder: Option<String>,
    use_cache: bool,
    verify_tls: bool,
    strict: bool,
    endpoint: String,
}

impl Default for ReporterBuilder {
    fn default() -> Self {
        Self {
            credentials: Credentials::default(),
            mode: InclusionMode::All,
            folder: None,
            use_cache: true,
            verify_tls: true,
            strict: false,
            endpoint: SALES_ENDPOINT.to_string(),
        }
    }
}

impl ReporterBuilder {
    /// Создаёт builder с настройками по умолчанию.
    ///
    /// # Пример
    ///
    /// ```
    /// # use itc_sales_report::{InclusionMode, ReporterBuilder};
    /// let config = ReporterBuilder::new()
    ///     .login("dev@example.com")
    ///     .password("secret")
    ///     .vendor("85012345")
    ///     .mode(InclusionMode::EarningsOnly)
    ///     .config()
    ///     .unwrap();
    /// assert!(config.folder.is_none());
    /// ```
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Логин iTunes Connect.
    #[inline]
    pub fn login(mut self, login: impl Into<String>) -> Self {
        self.credentials.username = login.into();
        self
    }

    /// Пароль iTunes Connect.
    #[inline]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.credentials.password = password.into();
        self
    }

    /// Идентификатор поставщика.
    #[inline]
    pub fn vendor(mut self, vendor: impl Into<String>) -> Self {
        self.credentials.vendor = vendor.into();
        self
    }

    /// Режим учёта бесплатных загрузок.
    #[inline]
    pub const fn mode(mut self, mode: InclusionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Каталог для сохранения отчётов.
    #[inline]
    pub fn folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = Some(folder.into());
        self
    }

    /// Разрешает чтение отчётов из кэша; `false` всегда обращается к сервису.
    #[inline]
    pub const fn use_cache(mut self, enabled: bool) -> Self {
        self.use_cache = enabled;
        self
    }

    /// Включает или отключает проверку TLS.
    #[inline]
    pub const fn verify_tls(mut self, enabled: bool) -> Self {
        self.verify_tls = enabled;
        self
    }

    /// Строгий режим ошибок.
    #[inline]
    pub const fn strict(mut self, enabled: bool) -> Self {
        self.strict = enabled;
        self
    }

    /// Адрес сервиса вместо [`SALES_ENDPOINT`].
    #[inline]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Проверяет каталог и возвращает готовые настройки.
    pub fn config(self) -> Result<ReporterConfig, ReportError> {
        let folder = self.folder.as_deref().map(validate_folder).transpose()?;
        Ok(ReporterConfig {
            credentials: self.credentials,
            mode: self.mode,
            folder,
            use_cache: self.use_cache,
            verify_tls: self.verify_tls,
            strict: self.strict,
            endpoint: self.endpoint,
        })
    }

    /// Клиент с HTTP-транспортом.
    pub fn build(self) -> Result<Reporter, ReportError> {
        let config = self.config()?;
        let transport = HttpTransport::new(config.verify_tls)?;
        Ok(Reporter::new(config, transport))
    }

    /// Клиент с произвольным транспортом.
    pub fn build_with<T: Transport>(self, transport: T) -> Result<Reporter<T>, ReportError> {
        Ok(Reporter::new(self.config()?, transport))
    }
}

/// Клиент Reporter API: один запрос за вызов, синхронно.
#[derive(Debug)]
pub struct Reporter<T = HttpTransport> {
    config: ReporterConfig,
    transport: T,
}

impl Reporter {
    /// Builder клиента.
    #[inline]
    pub fn builder() -> ReporterBuilder {
        ReporterBuilder::new()
    }
}

impl<T: Transport> Reporter<T> {
    /// Клиент из готовых настроек.
    pub const fn new(config: ReporterConfig, transport: T) -> Self {
        Self { config, transport }
    }

    /// Текущие настройки.
    #[inline]
    pub const fn config(&self) -> &ReporterConfig {
        &self.config
    }

    /// Список поставщиков.
    #[inline]
    pub fn vendors(&self) -> Result<Outcome<Vec<String>>, ReportError> {
        self.listing(ListingQuery::Vendors)
    }

    /// Список учётных записей.
    #[inline]
    pub fn accounts(&self) -> Result<Outcome<Vec<String>>, ReportError> {
        self.listing(ListingQuery::Accounts)
    }

    /// Дневной сводный отчёт о продажах, по умолчанию за вчера.
    #[inline]
    pub fn daily_sales(&self, date: Option<&str>) -> Result<Outcome<AggregatedReport>, ReportError> {
        self.report(&ReportRequest::sales(DateGranularity::Daily, date))
    }

    /// Недельный отчёт о продажах.
    #[inline]
    pub fn weekly_sales(&self, date: Option<&str>) -> Result<Outcome<AggregatedReport>, ReportError> {
        self.report(&ReportRequest::sales(DateGranularity::Weekly, date))
    }

    /// Месячный отчёт о продажах.
    #[inline]
    pub fn monthly_sales(&self, date: Option<&str>) -> Result<Outcome<AggregatedReport>, ReportError> {
        self.report(&ReportRequest::sales(DateGranularity::Monthly, date))
    }

    /// Годовой отчёт о продажах.
    #[inline]
    pub fn yearly_sales(&self, date: Option<&str>) -> Result<Outcome<AggregatedReport>, ReportError> {
        self.report(&ReportRequest::sales(DateGranularity::Yearly, date))
    }

    /// Отчёт произвольного типа из таблицы возможностей.
    #[inline]
    pub fn report(&self, request: &ReportRequest) -> Result<Outcome<AggregatedReport>, ReportError> {
        self.report_at(request, Local::now().date_naive())
    }

    /// То же, что [`Self::report`], с явной текущей датой.
    pub fn report_at(
        &self,
        request: &ReportRequest,
        today: NaiveDate,
    ) -> Result<Outcome<AggregatedReport>, ReportError> {
        let mut diag = Diagnostics::new(self.config.strict);
        self.check_credentials(true)?;
        capability::validate(request.report_type, request.subtype, request.granularity)?;

        let resolved = resolve_at(request.date.as_deref(), request.granularity, today);
        if let Some(warning) = resolved.warning {
            diag.record(warning)?;
        }

        let query = ReportQuery {
            report_type: request.report_type,
            subtype: request.subtype,
            granularity: request.granularity,
            date: resolved.date,
        };
        let vendor = &self.config.credentials.vendor;
        let identity = ReportIdentity::new(&query, vendor);
        let cache = self.config.folder.as_ref().map(ReportCache::new);

        let cached = cache
            .as_ref()
            .filter(|_| self.config.use_cache)
            .and_then(|cache| cache.lookup(&identity));
        let artifact = if let Some(path) = cached {
            info!(file = %identity.file_name(), "using cached report");
            Artifact::Cached(path)
        } else {
            let payload = build_payload(&self.config.credentials, Query::Report(&query))?;
            info!(
                report_type = %query.report_type,
                subtype = %query.subtype,
                granularity = %query.granularity,
                date = %query.date,
                "requesting report"
            );
            let raw = self.transport.send(&self.config.endpoint, &payload);
            match interpret(raw, false) {
                ResponseOutcome::ArtifactReady { filename, body } => {
                    debug!(filename = %filename, bytes = body.len(), "report received");
                    let text = decompress(&body)?;
                    match cache.as_ref() {
                        Some(cache) => Artifact::Cached(cache.store(&identity, &text)?),
                        None => Artifact::transient(&identity, &text)?,
                    }
                }
                ResponseOutcome::Failure(error) => {
                    diag.record(error)?;
                    return Ok(diag.finish(None));
                }
                ResponseOutcome::Listing(_) => {
                    return Err(ReportError::Application(
                        "Unexpected listing response to a report request".into(),
                    ));
                }
            }
        };

        let text = artifact.read()?;
        let report = aggregate(&text, self.config.mode);
        Ok(diag.finish(Some(report)))
    }

    fn listing(&self, listing: ListingQuery) -> Result<Outcome<Vec<String>>, ReportError> {
        let mut diag = Diagnostics::new(self.config.strict);
        self.check_credentials(false)?;

        let query = Query::Listing(listing);
        let payload = build_payload(&self.config.credentials, query)?;
        info!(operation = query.operation(), "requesting listing");
        let raw = self.transport.send(&self.config.endpoint, &payload);

        match interpret(raw, true) {
            ResponseOutcome::Listing(lines) => Ok(diag.finish(Some(lines))),
            ResponseOutcome::Failure(error) => {
                diag.record(error)?;
                Ok(diag.finish(None))
            }
            ResponseOutcome::ArtifactReady { .. } => Err(ReportError::Application(
                "Unexpected report response to a listing request".into(),
            )),
        }
    }

    /// Учётные данные проверяются до любого ввода-вывода.
    fn check_credentials(&self, need_vendor: bool) -> Result<(), ReportError> {
        let creds = &self.config.credentials;
        let missing = if creds.username.is_empty() {
            Some("username")
        } else if creds.password.is_empty() {
            Some("password")
        } else if need_vendor && creds.vendor.is_empty() {
            Some("vendor")
        } else {
            None
        };
        missing.map_or(Ok(()), |field| {
            Err(ReportError::Configuration(format!(
                "Please specify a {field} before attempting to fetch any reports"
            )))
        })
    }
}
