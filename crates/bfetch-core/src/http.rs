//! HTTP GET transport.
//!
//! The engine only depends on the `Transport` trait; `CurlTransport` is the
//! libcurl implementation used in production. Redirects are followed
//! transparently and the final status line is kept so errors can name the
//! reason phrase.

use std::cell::{Cell, RefCell};
use std::io::{self, Write};
use std::str;
use std::time::Duration;

use thiserror::Error;

use crate::cancel::CancelToken;
use crate::config::FetchConfig;

/// Status of the final response after redirects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpStatus {
    pub code: u32,
    pub reason: String,
}

impl HttpStatus {
    pub fn new(code: u32, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// Only an exact 200 counts as success.
    pub fn is_ok(&self) -> bool {
        self.code == 200
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{0}")]
    Curl(#[from] curl::Error),
    #[error("write failed: {0}")]
    Sink(#[source] io::Error),
    #[error("cancelled")]
    Cancelled,
}

/// Performs one GET, streaming the response body into `sink`.
pub trait Transport: Send + Sync {
    fn get(
        &self,
        url: &str,
        sink: &mut dyn Write,
        cancel: &CancelToken,
    ) -> Result<HttpStatus, TransportError>;
}

/// libcurl handle settings applied to every request.
#[derive(Debug, Clone)]
pub struct CurlOptions {
    pub connect_timeout: Duration,
    /// Hard wall-clock limit per request (None = no limit).
    pub request_timeout: Option<Duration>,
    pub max_redirects: u32,
    pub user_agent: String,
}

impl Default for CurlOptions {
    fn default() -> Self {
        CurlOptions::from(&FetchConfig::default())
    }
}

impl From<&FetchConfig> for CurlOptions {
    fn from(cfg: &FetchConfig) -> Self {
        Self {
            connect_timeout: cfg.connect_timeout(),
            request_timeout: cfg.request_timeout(),
            max_redirects: cfg.max_redirects,
            user_agent: cfg.user_agent(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CurlTransport {
    options: CurlOptions,
}

impl CurlTransport {
    pub fn new(options: CurlOptions) -> Self {
        Self { options }
    }

    fn configure(&self, easy: &mut curl::easy::Easy, url: &str) -> Result<(), curl::Error> {
        easy.url(url)?;
        easy.follow_location(true)?;
        easy.max_redirections(self.options.max_redirects)?;
        easy.connect_timeout(self.options.connect_timeout)?;
        if let Some(t) = self.options.request_timeout {
            easy.timeout(t)?;
        }
        easy.useragent(&self.options.user_agent)?;
        easy.progress(true)?;
        Ok(())
    }
}

impl Transport for CurlTransport {
    fn get(
        &self,
        url: &str,
        sink: &mut dyn Write,
        cancel: &CancelToken,
    ) -> Result<HttpStatus, TransportError> {
        if cancel.is_cancelled() {
            return Err(TransportError::Cancelled);
        }

        let mut easy = curl::easy::Easy::new();
        self.configure(&mut easy, url)?;

        let status_line: RefCell<Option<String>> = RefCell::new(None);
        let sink_error: RefCell<Option<io::Error>> = RefCell::new(None);
        let cancelled = Cell::new(false);

        {
            let mut transfer = easy.transfer();
            transfer.header_function(|data| {
                if let Ok(line) = str::from_utf8(data) {
                    let line = line.trim_end();
                    // Each redirect hop starts a new header block; keep the last.
                    if line.starts_with("HTTP/") {
                        status_line.replace(Some(line.to_string()));
                    }
                }
                true
            })?;
            transfer.write_function(|data| {
                if cancel.is_cancelled() {
                    cancelled.set(true);
                    return Ok(0);
                }
                match sink.write_all(data) {
                    Ok(()) => Ok(data.len()),
                    Err(e) => {
                        sink_error.replace(Some(e));
                        Ok(0) // abort transfer
                    }
                }
            })?;
            transfer.progress_function(|_, _, _, _| {
                if cancel.is_cancelled() {
                    cancelled.set(true);
                    return false;
                }
                true
            })?;
            if let Err(e) = transfer.perform() {
                if cancelled.get() {
                    return Err(TransportError::Cancelled);
                }
                if e.is_write_error() {
                    if let Some(io_err) = sink_error.take() {
                        return Err(TransportError::Sink(io_err));
                    }
                }
                return Err(TransportError::Curl(e));
            }
        }

        let code = easy.response_code()?;
        let reason = status_line
            .take()
            .and_then(|line| parse_status_line(&line))
            .filter(|(parsed, reason)| *parsed == code && !reason.is_empty())
            .map(|(_, reason)| reason)
            .unwrap_or_else(|| canonical_reason(code).to_string());
        Ok(HttpStatus { code, reason })
    }
}

/// Parses `HTTP/1.1 404 Not Found` into `(404, "Not Found")`.
/// HTTP/2 status lines carry no reason phrase and yield an empty string.
pub fn parse_status_line(line: &str) -> Option<(u32, String)> {
    let mut parts = line.trim().splitn(3, ' ');
    let version = parts.next()?;
    if !version.starts_with("HTTP/") {
        return None;
    }
    let code = parts.next()?.parse::<u32>().ok()?;
    let reason = parts.next().unwrap_or("").trim().to_string();
    Some((code, reason))
}

/// Reason phrase for common status codes, used when the server sent none.
pub fn canonical_reason(code: u32) -> &'static str {
    match code {
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        203 => "Non-Authoritative Information",
        204 => "No Content",
        206 => "Partial Content",
        300 => "Multiple Choices",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        410 => "Gone",
        416 => "Range Not Satisfiable",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_http1_status_line() {
        assert_eq!(
            parse_status_line("HTTP/1.1 404 Not Found\r\n"),
            Some((404, "Not Found".to_string()))
        );
        assert_eq!(
            parse_status_line("HTTP/1.0 200 OK"),
            Some((200, "OK".to_string()))
        );
        assert_eq!(
            parse_status_line("HTTP/1.1 503 Service Temporarily Unavailable"),
            Some((503, "Service Temporarily Unavailable".to_string()))
        );
    }

    #[test]
    fn parse_http2_status_line_has_no_reason() {
        assert_eq!(parse_status_line("HTTP/2 204"), Some((204, String::new())));
    }

    #[test]
    fn parse_rejects_non_status_lines() {
        assert_eq!(parse_status_line("Content-Length: 5"), None);
        assert_eq!(parse_status_line("HTTP/1.1 abc Nope"), None);
        assert_eq!(parse_status_line(""), None);
    }

    #[test]
    fn canonical_reasons() {
        assert_eq!(canonical_reason(404), "Not Found");
        assert_eq!(canonical_reason(204), "No Content");
        assert_eq!(canonical_reason(799), "");
    }

    #[test]
    fn only_exact_200_is_ok() {
        assert!(HttpStatus::new(200, "OK").is_ok());
        assert!(!HttpStatus::new(204, "No Content").is_ok());
        assert!(!HttpStatus::new(206, "Partial Content").is_ok());
        assert!(!HttpStatus::new(404, "Not Found").is_ok());
    }

    #[test]
    fn curl_options_follow_config() {
        let cfg = FetchConfig {
            connect_timeout_secs: 7,
            request_timeout_secs: Some(90),
            max_redirects: 2,
            user_agent: Some("ua/1".to_string()),
            ..FetchConfig::default()
        };
        let opts = CurlOptions::from(&cfg);
        assert_eq!(opts.connect_timeout, Duration::from_secs(7));
        assert_eq!(opts.request_timeout, Some(Duration::from_secs(90)));
        assert_eq!(opts.max_redirects, 2);
        assert_eq!(opts.user_agent, "ua/1");
    }

    #[test]
    fn cancelled_token_short_circuits_before_connecting() {
        let transport = CurlTransport::default();
        let token = CancelToken::new();
        token.cancel();
        let mut sink = Vec::new();
        let err = transport
            .get("http://127.0.0.1:9/never", &mut sink, &token)
            .unwrap_err();
        assert!(matches!(err, TransportError::Cancelled));
        assert!(sink.is_empty());
    }
}
