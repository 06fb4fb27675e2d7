//! Формирование тела запроса к Reporter API.

use serde::Serialize;

use crate::error::ReportError;
use crate::types::{Credentials, ListingQuery, ReportQuery};

/// Адрес сервиса отчётов о продажах.
pub const SALES_ENDPOINT: &str = "https://reportingitc-reporter.apple.com/reportservice/sales/v1";
/// Адрес сервиса финансовых отчётов.
pub const FINANCE_ENDPOINT: &str =
    "https://reportingitc-reporter.apple.com/reportservice/finance/v1";

/// Имя поля формы, в котором передаётся JSON запроса.
pub const FORM_FIELD: &str = "jsonRequest";

const PROPERTIES_MARKER: &str = "p=Reporter.properties";
const PROTOCOL_VERSION: &str = "1.0";
const MODE: &str = "Normal";

/// Запрос к сервису: список или отчёт.
#[derive(Debug, Clone, Copy)]
pub enum Query<'a> {
    /// Список поставщиков или учётных записей.
    Listing(ListingQuery),
    /// Отчёт с уже проверенными параметрами.
    Report(&'a ReportQuery),
}

impl Query<'_> {
    /// Имя операции сервиса.
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::Listing(ListingQuery::Vendors) => "Sales.getVendors",
            Self::Listing(ListingQuery::Accounts) => "Sales.getAccounts",
            Self::Report(_) => "Sales.getReport",
        }
    }

    /// Список инструкций в квадратных скобках.
    pub fn instruction(&self, vendor: &str) -> String {
        match self {
            Self::Listing(_) => format!("[{PROPERTIES_MARKER}, {}]", self.operation()),
            Self::Report(q) => format!(
                "[{PROPERTIES_MARKER}, {}, {vendor},{},{},{},{}]",
                self.operation(),
                q.report_type,
                q.subtype,
                q.granularity,
                q.date
            ),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestEnvelope<'a> {
    userid: &'a str,
    password: &'a str,
    version: &'a str,
    mode: &'a str,
    query_input: String,
}

/// Собирает JSON, который передаётся в поле [`FORM_FIELD`].
pub fn build_payload(credentials: &Credentials, query: Query<'_>) -> Result<String, ReportError> {
    let envelope = RequestEnvelope {
        userid: &credentials.username,
        password: &credentials.password,
        version: PROTOCOL_VERSION,
        mode: MODE,
        query_input: query.instruction(&credentials.vendor),
    };
    Ok(serde_json::to_string(&envelope)?)
}
