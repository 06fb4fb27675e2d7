//! HTTP-транспорт: POST формы с JSON запроса и сбор заголовков всех переходов.

use reqwest::blocking::{Client, Response};
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use reqwest::{StatusCode, Url};
use std::fmt::Write as _;
use tracing::{debug, warn};

use crate::error::ReportError;
use crate::query::FORM_FIELD;
use crate::raw::RawResponse;

const USER_AGENT: &str = concat!("itc-sales-report/", env!("CARGO_PKG_VERSION"));
const MAX_REDIRECTS: usize = 5;

/// Отправка тела запроса на адрес сервиса.
///
/// Реализация не возвращает ошибок: сбой соединения описывается полем
/// [`RawResponse::transport_error`].
pub trait Transport {
    /// Выполняет один запрос.
    fn send(&self, endpoint: &str, payload: &str) -> RawResponse;
}

/// Блокирующий транспорт на `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Создаёт клиент; `verify_tls = false` отключает проверку сертификата.
    pub fn new(verify_tls: bool) -> Result<Self, ReportError> {
        if !verify_tls {
            warn!("TLS certificate verification disabled");
        }
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(Policy::none())
            .danger_accept_invalid_certs(!verify_tls)
            .build()
            .map_err(|err| ReportError::Transport(err.to_string()))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn send(&self, endpoint: &str, payload: &str) -> RawResponse {
        let mut url = match Url::parse(endpoint) {
            Ok(url) => url,
            Err(err) => return RawResponse::failed(format!("invalid endpoint '{endpoint}': {err}")),
        };
        let form = [(FORM_FIELD, payload)];
        let mut headers = String::new();
        let mut post = true;
        let mut hops = 0;

        loop {
            debug!(url = %url, post, hop = hops, "sending reporter request");
            let request = if post {
                self.client.post(url.clone()).form(&form)
            } else {
                self.client.get(url.clone())
            };
            let response = match request.send() {
                Ok(response) => response,
                Err(err) => return RawResponse::failed(err.to_string()),
            };

            let status = response.status();
            append_header_block(&mut headers, &response);

            if status.is_redirection() && hops < MAX_REDIRECTS {
                if let Some(next) = redirect_target(&response) {
                    post = post
                        && matches!(
                            status,
                            StatusCode::TEMPORARY_REDIRECT | StatusCode::PERMANENT_REDIRECT
                        );
                    url = next;
                    hops += 1;
                    continue;
                }
            }

            let code = status.as_u16();
            return match response.bytes() {
                Ok(body) => RawResponse {
                    status: code,
                    headers,
                    body: body.to_vec(),
                    transport_error: None,
                },
                Err(err) => RawResponse {
                    status: code,
                    headers,
                    body: Vec::new(),
                    transport_error: Some(err.to_string()),
                },
            };
        }
    }
}

fn redirect_target(response: &Response) -> Option<Url> {
    let location = response.headers().get(LOCATION)?.to_str().ok()?;
    response.url().join(location).ok()
}

/// Дописывает заголовки ответа в виде `HTTP/1.1 200 OK\r\nkey: value\r\n\r\n`.
fn append_header_block(out: &mut String, response: &Response) {
    let _ = write!(out, "{:?} {}\r\n", response.version(), response.status());
    for (name, value) in response.headers() {
        let _ = write!(
            out,
            "{}: {}\r\n",
            name,
            String::from_utf8_lossy(value.as_bytes())
        );
    }
    out.push_str("\r\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::split_header_blocks;
    use httpmock::prelude::*;

    #[test]
    fn posts_form_and_captures_headers() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/reportservice/sales/v1")
                .header("content-type", "application/x-www-form-urlencoded");
            then.status(200)
                .header("filename", "S_D_85012345_20161122.txt.gz")
                .body(vec![1u8, 2, 3]);
        });

        let transport = HttpTransport::new(true).unwrap();
        let raw = transport.send(&server.url("/reportservice/sales/v1"), r#"{"userid":"a"}"#);

        mock.assert();
        assert_eq!(raw.status, 200);
        assert_eq!(raw.body, vec![1, 2, 3]);
        assert!(raw.transport_error.is_none());
        let blocks = split_header_blocks(&raw.headers);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].status_code(), Some(200));
        assert_eq!(
            blocks[0].get("filename"),
            Some("S_D_85012345_20161122.txt.gz")
        );
    }

    #[test]
    fn follows_temporary_redirect_with_post() {
        let server = MockServer::start();
        let moved = server.mock(|when, then| {
            when.method(POST).path("/old");
            then.status(307).header("location", "/new");
        });
        let target = server.mock(|when, then| {
            when.method(POST).path("/new");
            then.status(200).header("ERRORMSG", "Invalid vendor number.");
        });

        let transport = HttpTransport::new(true).unwrap();
        let raw = transport.send(&server.url("/old"), "{}");

        moved.assert();
        target.assert();
        assert_eq!(raw.status, 200);
        let blocks = split_header_blocks(&raw.headers);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].status_code(), Some(307));
        assert_eq!(blocks[1].get("errormsg"), Some("Invalid vendor number."));
    }

    #[test]
    fn connection_failure_has_no_headers() {
        let transport = HttpTransport::new(true).unwrap();
        let raw = transport.send("http://127.0.0.1:1/reportservice/sales/v1", "{}");
        assert!(raw.headers.is_empty());
        assert!(raw.transport_error.is_some());
        assert_eq!(raw.status, 0);
    }

    #[test]
    fn invalid_endpoint_is_transport_error() {
        let transport = HttpTransport::new(false).unwrap();
        let raw = transport.send("not a url", "{}");
        assert!(raw.transport_error.unwrap().contains("invalid endpoint"));
    }
}
