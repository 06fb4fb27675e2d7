//! Вспомогательные парсеры чисел и дат из ячеек отчёта.

use crate::types::Money;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Форматы дат, встречающиеся в столбцах отчёта.
const ROW_DATE_FORMATS: [&str; 3] = ["%m/%d/%Y", "%Y-%m-%d", "%Y%m%d"];

/// Нормализует числовую строку, удаляя пробелы, знак плюса итд.
fn normalize_number(input: &str) -> String {
    input
        .chars()
        .filter(|ch| !matches!(*ch, ' ' | '\u{a0}' | '\u{202f}' | '+'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Разбирает денежное значение, `None` для пустой или нечисловой ячейки.
pub fn parse_money(value: &str) -> Option<Money> {
    let normalized = normalize_number(value);
    if normalized.is_empty() {
        return None;
    }
    Decimal::from_str(&normalized).ok()
}

/// Разбирает количество единиц.
pub fn parse_units(value: &str) -> Option<i64> {
    let normalized = normalize_number(value);
    normalized
        .parse::<i64>()
        .ok()
        .or_else(|| Decimal::from_str(&normalized).ok()?.trunc().try_into().ok())
}

/// Разбирает дату из столбца отчёта.
pub fn parse_row_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    ROW_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

/// Даты не позже 1970-01-01 означают пустое значение.
pub fn is_epoch_sentinel(date: NaiveDate) -> bool {
    // `NaiveDate::default()` равна 1970-01-01.
    date <= NaiveDate::default()
}
