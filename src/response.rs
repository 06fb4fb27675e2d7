//! Классификация ответа сервиса: список, готовый отчёт или ошибка.

use tracing::debug;

use crate::error::ReportError;
use crate::raw::{split_header_blocks, HeaderBlock, RawResponse};

/// Заголовок с именем файла отчёта.
const FILENAME_HEADER: &str = "filename";
/// Заголовок с текстом ошибки сервиса.
const ERROR_HEADER: &str = "ERRORMSG";

/// Итог интерпретации ответа.
#[derive(Debug)]
pub enum ResponseOutcome {
    /// Строки списка поставщиков или учётных записей.
    Listing(Vec<String>),
    /// Сжатый отчёт готов к распаковке.
    ArtifactReady {
        /// Имя файла из заголовков.
        filename: String,
        /// Тело ответа.
        body: Vec<u8>,
    },
    /// Ошибка; фатальность определяет [`ReportError::is_fatal`].
    Failure(ReportError),
}

/// Интерпретирует ответ на запрос списка или отчёта.
pub fn interpret(raw: RawResponse, listing: bool) -> ResponseOutcome {
    if listing {
        return interpret_listing(raw);
    }

    let blocks = split_header_blocks(&raw.headers);
    let Some(first) = blocks.first() else {
        let cause = raw.transport_error.unwrap_or_default();
        return ResponseOutcome::Failure(ReportError::Transport(format!(
            "Unknown error has occurred: {cause}"
        )));
    };
    let status = first.status_code().unwrap_or(raw.status);
    debug!(blocks = blocks.len(), status, "interpreting report response");

    if let Some(filename) = artifact_filename(first) {
        if let Some(cause) = raw.transport_error {
            return ResponseOutcome::Failure(ReportError::Transport(format!(
                "Unable to download report {filename}: {cause}"
            )));
        }
        return ResponseOutcome::ArtifactReady {
            filename,
            body: raw.body,
        };
    }
    if let Some(message) = first.get(ERROR_HEADER) {
        return ResponseOutcome::Failure(ReportError::Application(message.to_string()));
    }

    ResponseOutcome::Failure(ReportError::Application(format!(
        "Unknown error has occurred (http code {status}, content: {})",
        raw.body_text()
    )))
}

fn interpret_listing(raw: RawResponse) -> ResponseOutcome {
    if raw.status != 200 {
        let message = match raw.transport_error {
            Some(err) if raw.body.is_empty() => err,
            _ => raw.body_text(),
        };
        return ResponseOutcome::Failure(ReportError::ListingUnavailable(message));
    }

    let body = raw.body_text();
    let mut lines: Vec<String> = body
        .split('\n')
        .map(|line| line.trim_end_matches('\r').to_string())
        .collect();
    if lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }
    ResponseOutcome::Listing(lines)
}

/// Имя файла из заголовка `filename` или `Content-Disposition`.
fn artifact_filename(block: &HeaderBlock) -> Option<String> {
    if let Some(name) = block.get(FILENAME_HEADER) {
        return Some(name.to_string());
    }
    let disposition = block.get("content-disposition")?;
    let (_, name) = disposition.split_once("filename=")?;
    Some(
        name.split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .trim_matches('"')
            .to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_response(headers: &str, status: u16, body: &str) -> RawResponse {
        RawResponse {
            status,
            headers: headers.to_string(),
            body: body.as_bytes().to_vec(),
            transport_error: None,
        }
    }

    #[test]
    fn listing_drops_trailing_empty_line() {
        let raw = report_response("", 200, "85012345, Example Inc\n85099999, Other\n");
        let ResponseOutcome::Listing(lines) = interpret(raw, true) else {
            panic!("expected listing");
        };
        assert_eq!(lines, vec!["85012345, Example Inc", "85099999, Other"]);
    }

    #[test]
    fn listing_failure_is_not_fatal() {
        let raw = report_response("HTTP/1.1 401\r\n\r\n", 401, "Invalid credentials");
        match interpret(raw, true) {
            ResponseOutcome::Failure(error) => {
                assert!(!error.is_fatal());
                assert!(matches!(error, ReportError::ListingUnavailable(_)));
                assert_eq!(error.to_string(), "Invalid credentials");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn filename_header_means_artifact() {
        let raw = report_response(
            "HTTP/1.1 200 OK\r\nfilename: S_D_1_20161122.txt.gz\r\n\r\n",
            200,
            "gz",
        );
        match interpret(raw, false) {
            ResponseOutcome::ArtifactReady { filename, body } => {
                assert_eq!(filename, "S_D_1_20161122.txt.gz");
                assert_eq!(body, b"gz");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn content_disposition_filename_is_recognized() {
        let raw = report_response(
            "HTTP/1.1 200 OK\r\nContent-Disposition: attachment; filename=\"report.txt.gz\"\r\n\r\n",
            200,
            "",
        );
        assert!(matches!(
            interpret(raw, false),
            ResponseOutcome::ArtifactReady { ref filename, .. } if filename == "report.txt.gz"
        ));
    }

    #[test]
    fn error_header_carries_exact_message() {
        let raw = report_response(
            "HTTP/1.1 200 OK\r\nERRORMSG: There are no reports available to download for this selection.\r\n\r\n",
            200,
            "",
        );
        match interpret(raw, false) {
            ResponseOutcome::Failure(ReportError::Application(message)) => {
                assert_eq!(
                    message,
                    "There are no reports available to download for this selection."
                );
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn only_first_block_is_inspected() {
        let raw = report_response(
            "HTTP/1.1 302 Found\r\nLocation: /x\r\n\r\nHTTP/1.1 200 OK\r\nfilename: late.txt.gz\r\n\r\n",
            200,
            "body",
        );
        match interpret(raw, false) {
            ResponseOutcome::Failure(error) => {
                assert!(error.is_fatal());
                assert_eq!(
                    error.to_string(),
                    "Unknown error has occurred (http code 302, content: body)"
                );
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_response_reports_code_and_body() {
        let raw = report_response("HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\n\r\n", 200, "oops");
        match interpret(raw, false) {
            ResponseOutcome::Failure(error) => {
                assert!(error.is_fatal());
                assert_eq!(
                    error.to_string(),
                    "Unknown error has occurred (http code 200, content: oops)"
                );
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_headers_are_transport_failure() {
        let raw = RawResponse::failed("Connection refused");
        match interpret(raw, false) {
            ResponseOutcome::Failure(ReportError::Transport(message)) => {
                assert_eq!(message, "Unknown error has occurred: Connection refused");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn status_line_code_is_preferred_over_transport_status() {
        let raw = report_response(
            "HTTP/1.1 503 Service Unavailable\r\nContent-Type: text/plain\r\n\r\n",
            0,
            "down",
        );
        match interpret(raw, false) {
            ResponseOutcome::Failure(error) => assert_eq!(
                error.to_string(),
                "Unknown error has occurred (http code 503, content: down)"
            ),
            other => panic!("unexpected {other:?}"),
        }

        let raw = report_response("garbage\r\n\r\n", 500, "");
        match interpret(raw, false) {
            ResponseOutcome::Failure(error) => assert_eq!(
                error.to_string(),
                "Unknown error has occurred (http code 500, content: )"
            ),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn truncated_body_is_transport_failure() {
        let raw = RawResponse {
            status: 200,
            headers: "HTTP/1.1 200 OK\r\nfilename: S_D_1_20161122.txt.gz\r\n\r\n".into(),
            body: Vec::new(),
            transport_error: Some("connection reset".into()),
        };
        match interpret(raw, false) {
            ResponseOutcome::Failure(ReportError::Transport(message)) => {
                assert_eq!(
                    message,
                    "Unable to download report S_D_1_20161122.txt.gz: connection reset"
                );
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
