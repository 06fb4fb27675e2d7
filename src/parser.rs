//! Разбор распакованного отчёта о продажах и агрегация по валютам.
//!
//! Столбцы читаются по фиксированным позициям, имена из заголовка используются
//! только для строк `details`.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::types::{AggregatedReport, CurrencyRevenue, DetailRow, InclusionMode, Money};
use crate::utils::{is_epoch_sentinel, parse_money, parse_row_date, parse_units};

/// Позиции столбцов в отчётах семейства Sales.
pub mod column {
    /// Артикул.
    pub const SKU: usize = 2;
    /// Количество единиц.
    pub const UNITS: usize = 7;
    /// Выручка разработчика за единицу.
    pub const EARNINGS: usize = 8;
    /// Начало периода строки.
    pub const BEGIN_DATE: usize = 9;
    /// Конец периода строки.
    pub const END_DATE: usize = 10;
    /// Валюта выручки.
    pub const CURRENCY: usize = 13;
    /// Цена для покупателя.
    pub const FULL_PRICE: usize = 15;
}

const DELIMITER: char = '\t';

/// Строка отчёта, разобранная по позициям столбцов.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalesRow {
    /// Артикул.
    pub sku: Option<String>,
    /// Количество единиц.
    pub units: Option<i64>,
    /// Выручка разработчика.
    pub earnings: Option<Money>,
    /// Начало периода, `None` для пустой даты или эпохи.
    pub begin_date: Option<NaiveDate>,
    /// Конец периода, `None` для пустой даты или эпохи.
    pub end_date: Option<NaiveDate>,
    /// Валюта выручки.
    pub currency: Option<String>,
    /// Цена для покупателя, `None` если ячейка пуста, отсутствует или не число.
    pub full_price: Option<Money>,
    /// Ячейка цены заполнена, но не является числом.
    pub malformed_price: bool,
}

impl SalesRow {
    /// Разбирает ячейки строки по позициям столбцов.
    pub fn parse(cells: &[&str]) -> Self {
        let cell = |idx: usize| cells.get(idx).map(|s| s.trim());
        let price_cell = cell(column::FULL_PRICE).filter(|v| !v.is_empty());
        let full_price = price_cell.and_then(parse_money);
        let has_dates = cells.len() > column::BEGIN_DATE.max(column::END_DATE);
        let date = |idx: usize| {
            cell(idx)
                .filter(|_| has_dates)
                .and_then(parse_row_date)
                .filter(|d| !is_epoch_sentinel(*d))
        };

        Self {
            sku: cell(column::SKU).map(str::to_string),
            units: cell(column::UNITS).and_then(parse_units),
            earnings: cell(column::EARNINGS).and_then(parse_money),
            begin_date: date(column::BEGIN_DATE),
            end_date: date(column::END_DATE),
            currency: cell(column::CURRENCY)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
            full_price,
            malformed_price: price_cell.is_some() && full_price.is_none(),
        }
    }

    /// Платная продажа: положительная цена.
    pub fn is_paid(&self) -> bool {
        self.full_price.is_some_and(|price| price > Decimal::ZERO)
    }
}

/// Отслеживает самую раннюю и самую позднюю дату отчёта.
#[derive(Debug, Default)]
struct DateSpan {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

impl DateSpan {
    fn observe(&mut self, begin: Option<NaiveDate>, end: Option<NaiveDate>) {
        if let Some(begin) = begin {
            self.start = Some(self.start.map_or(begin, |cur| cur.min(begin)));
        }
        if let Some(end) = end {
            self.end = Some(self.end.map_or(end, |cur| cur.max(end)));
        }
    }
}

/// Агрегирует текст отчёта с учётом режима включения бесплатных загрузок.
pub fn aggregate(text: &str, mode: InclusionMode) -> AggregatedReport {
    let mut lines = text.lines();
    let header: Vec<String> = lines
        .next()
        .map(|line| line.split(DELIMITER).map(str::to_string).collect())
        .unwrap_or_default();

    let mut report = AggregatedReport::default();
    let mut span = DateSpan::default();
    let mut skipped = 0usize;

    for (idx, line) in lines.enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let cells: Vec<&str> = line.split(DELIMITER).collect();
        let row = SalesRow::parse(&cells);
        span.observe(row.begin_date, row.end_date);
        let sku = row.sku.as_deref().unwrap_or_default();
        if row.malformed_price {
            debug!(row = idx + 1, sku, "skipping row with malformed price");
            skipped += 1;
            continue;
        }

        if row.is_paid() {
            let Some(currency) = row.currency.as_deref() else {
                continue;
            };
            let (Some(price), Some(earnings), Some(units)) =
                (row.full_price, row.earnings, row.units)
            else {
                debug!(row = idx + 1, sku, "skipping sale with missing fields");
                skipped += 1;
                continue;
            };
            let revenue = report.revenues.entry(currency.to_string()).or_default();
            add_sale(revenue, price, earnings, units);
            report.total_units_sold += units;
            report.details.push(detail_row(&header, &cells));
        } else if mode == InclusionMode::All {
            if let Some(units) = row.units {
                report.total_app_downloads += units;
                report.details.push(detail_row(&header, &cells));
            }
        }
    }

    report.report_start_date = span.start;
    report.report_end_date = span.end;
    info!(
        rows = report.details.len(),
        skipped,
        units_sold = report.total_units_sold,
        downloads = report.total_app_downloads,
        currencies = report.revenues.len(),
        "report aggregated"
    );
    report
}

fn add_sale(revenue: &mut CurrencyRevenue, price: Money, earnings: Money, units: i64) {
    revenue.turnover += price;
    revenue.earnings += earnings;
    revenue.units += units;
}

/// Сопоставляет ячейки с именами столбцов, отсутствующие ячейки пустые.
fn detail_row(header: &[String], cells: &[&str]) -> DetailRow {
    DetailRow {
        fields: header
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                (
                    name.clone(),
                    cells.get(idx).copied().unwrap_or_default().to_string(),
                )
            })
            .collect(),
    }
}
