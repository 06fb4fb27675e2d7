//! Сырой ответ транспорта и разбор блоков заголовков.

use regex::Regex;
use std::sync::LazyLock;

static STATUS_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^HTTP/\S+\s+(\d{3})").expect("valid status line regex"));

/// Ответ сервиса до интерпретации.
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    /// HTTP-код последнего перехода, `0` если запрос не состоялся.
    pub status: u16,
    /// Заголовки всех переходов, блоки разделены пустой строкой.
    pub headers: String,
    /// Тело ответа.
    pub body: Vec<u8>,
    /// Ошибка транспорта (соединение, DNS, TLS).
    pub transport_error: Option<String>,
}

impl RawResponse {
    /// Ответ для запроса, который не дошёл до сервера.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            transport_error: Some(error.into()),
            ..Self::default()
        }
    }

    /// Тело ответа как текст.
    #[inline]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Заголовки одного перехода.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderBlock {
    /// Строка статуса, например `HTTP/1.1 200 OK`.
    pub status_line: String,
    /// Пары `ключ: значение` в исходном порядке.
    pub entries: Vec<(String, String)>,
}

impl HeaderBlock {
    /// Значение заголовка без учёта регистра имени.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    }

    /// Код статуса из строки статуса.
    pub fn status_code(&self) -> Option<u16> {
        STATUS_LINE_RE
            .captures(&self.status_line)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }
}

/// Делит сырые заголовки на блоки по пустой строке.
///
/// Первая строка блока считается строкой статуса, остальные разбираются как `ключ: значение`.
pub fn split_header_blocks(raw: &str) -> Vec<HeaderBlock> {
    let mut blocks = Vec::new();
    let mut current: Option<HeaderBlock> = None;

    for line in raw.lines() {
        if line.trim().is_empty() {
            if let Some(block) = current.take() {
                blocks.push(block);
            }
            continue;
        }
        match current.as_mut() {
            None => {
                current = Some(HeaderBlock {
                    status_line: line.trim().to_string(),
                    entries: Vec::new(),
                });
            }
            Some(block) => {
                if let Some((key, value)) = line.split_once(':') {
                    block
                        .entries
                        .push((key.trim().to_string(), value.trim().to_string()));
                }
            }
        }
    }

    if let Some(block) = current {
        blocks.push(block);
    }
    blocks
}
