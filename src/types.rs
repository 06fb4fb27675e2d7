//! Доменные типы запросов и агрегированного отчёта.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

/// Денежное значение, используем `Decimal` для точных расчётов.
pub type Money = Decimal;

/// Тип отчёта.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReportType {
    /// Продажи.
    Sales,
    /// Подписки.
    Subscription,
    /// События подписок.
    SubscriptionEvent,
    /// Киоск.
    Newsstand,
}

impl ReportType {
    /// Имя типа в протоколе сервиса.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sales => "Sales",
            Self::Subscription => "Subscription",
            Self::SubscriptionEvent => "Subscription Event",
            Self::Newsstand => "Newsstand",
        }
    }
}

/// Подтип отчёта, допустимые значения зависят от типа.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReportSubType {
    /// Сводный.
    Summary,
    /// Opt-In.
    OptIn,
    /// Подробный.
    Detailed,
}

impl ReportSubType {
    /// Имя подтипа в протоколе сервиса.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Summary => "Summary",
            Self::OptIn => "Opt-In",
            Self::Detailed => "Detailed",
        }
    }
}

/// Гранулярность даты отчёта.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DateGranularity {
    /// День.
    Daily,
    /// Неделя, заканчивающаяся воскресеньем.
    Weekly,
    /// Месяц.
    Monthly,
    /// Год.
    Yearly,
}

impl DateGranularity {
    /// Имя периода в протоколе сервиса.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "Daily",
            Self::Weekly => "Weekly",
            Self::Monthly => "Monthly",
            Self::Yearly => "Yearly",
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),+) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })+
    };
}

display_as_str!(ReportType, ReportSubType, DateGranularity);

/// Политика учёта бесплатных загрузок.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InclusionMode {
    /// Продажи и бесплатные загрузки.
    #[default]
    All,
    /// Только строки с ненулевой ценой.
    EarningsOnly,
}

/// Учётные данные iTunes Connect.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Логин.
    pub username: String,
    /// Пароль.
    pub password: String,
    /// Идентификатор поставщика.
    pub vendor: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .field("vendor", &self.vendor)
            .finish()
    }
}

/// Запрос отчёта: тип, подтип, период и необязательная дата в исходном виде.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    /// Тип отчёта.
    pub report_type: ReportType,
    /// Подтип отчёта.
    pub subtype: ReportSubType,
    /// Период.
    pub granularity: DateGranularity,
    /// Дата от вызывающего, `None` означает дату по умолчанию.
    pub date: Option<String>,
}

impl ReportRequest {
    /// Сводный отчёт о продажах за указанный период.
    pub fn sales(granularity: DateGranularity, date: Option<&str>) -> Self {
        Self {
            report_type: ReportType::Sales,
            subtype: ReportSubType::Summary,
            granularity,
            date: date.map(str::to_string),
        }
    }
}

/// Проверенный запрос отчёта с нормализованной датой.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportQuery {
    /// Тип отчёта.
    pub report_type: ReportType,
    /// Подтип отчёта.
    pub subtype: ReportSubType,
    /// Период.
    pub granularity: DateGranularity,
    /// Дата в каноническом формате периода.
    pub date: String,
}

/// Вид списка, запрашиваемого вместо отчёта.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingQuery {
    /// Список поставщиков.
    Vendors,
    /// Список учётных записей.
    Accounts,
}

/// Итоги по одной валюте.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CurrencyRevenue {
    /// Оборот по полной цене.
    pub turnover: Money,
    /// Выручка разработчика.
    pub earnings: Money,
    /// Проданные единицы.
    pub units: i64,
}

/// Строка отчёта в виде пар «столбец — значение» в порядке заголовка.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailRow {
    /// Пары в порядке столбцов заголовка.
    pub fields: Vec<(String, String)>,
}

impl DetailRow {
    /// Значение столбца по имени.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }
}

impl Serialize for DetailRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Агрегированный отчёт о продажах.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregatedReport {
    /// Самая ранняя дата начала среди строк.
    #[serde(serialize_with = "serialize_compact_date")]
    pub report_start_date: Option<NaiveDate>,
    /// Самая поздняя дата окончания среди строк.
    #[serde(serialize_with = "serialize_compact_date")]
    pub report_end_date: Option<NaiveDate>,
    /// Всего проданных единиц.
    #[serde(rename = "number_sales")]
    pub total_units_sold: i64,
    /// Бесплатные загрузки, учитываются только в режиме [`InclusionMode::All`].
    #[serde(rename = "app_downloads")]
    pub total_app_downloads: i64,
    /// Итоги по валютам.
    pub revenues: BTreeMap<String, CurrencyRevenue>,
    /// Учтённые строки отчёта.
    pub details: Vec<DetailRow>,
}

fn serialize_compact_date<S: Serializer>(
    date: &Option<NaiveDate>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match date {
        Some(date) => serializer.collect_str(&date.format("%Y%m%d")),
        None => serializer.serialize_none(),
    }
}
