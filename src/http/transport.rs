use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::{Client, Method};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::{TransportError, ValidationError};

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Text(String),
}

#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: String,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Value,
}

/// Sends one request and reports the raw outcome.
///
/// HTTP error statuses are successful sends; only failures to obtain a
/// response at all surface as [`TransportError`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: OutboundRequest) -> Result<TransportResponse, TransportError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Builds a transport whose requests time out after `timeout`.
    ///
    /// Redirects are not followed so a target cannot bounce a request past
    /// the URL guard.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying client cannot be constructed.
    pub fn new(timeout: Duration) -> Result<Self, ValidationError> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("goldrun/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| ValidationError::BuildClientFailed { source: err })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: OutboundRequest) -> Result<TransportResponse, TransportError> {
        let method = Method::from_bytes(request.method.to_ascii_uppercase().as_bytes())
            .map_err(|err| {
                debug!("Rejected method '{}': {}", request.method, err);
                TransportError::InvalidMethod {
                    method: request.method.clone(),
                }
            })?;

        check_headers(&request.headers)?;
        let mut builder = self.client.request(method, request.url.clone());
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => {
                if has_header(&request.headers, "content-type") {
                    let encoded = serde_json::to_vec(&value).map_err(|err| {
                        TransportError::Request {
                            message: err.to_string(),
                        }
                    })?;
                    builder.body(encoded)
                } else {
                    builder.json(&value)
                }
            }
            RequestBody::Text(text) => builder.body(text),
        };

        let response = builder.send().await.map_err(map_send_error)?;
        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| TransportError::Body {
                message: err.to_string(),
            })?;
        debug!("{} answered {} ({} bytes)", request.url, status, bytes.len());

        Ok(TransportResponse {
            status,
            body: parse_body(&bytes),
        })
    }
}

fn map_send_error(err: reqwest::Error) -> TransportError {
    let message = err.to_string();
    if err.is_timeout() {
        TransportError::Timeout { message }
    } else if err.is_connect() {
        TransportError::Connect { message }
    } else {
        TransportError::Request { message }
    }
}

/// Names what is wrong with a header pair, if anything.
#[must_use]
pub fn header_problem(name: &str, value: &str) -> Option<&'static str> {
    if HeaderName::from_bytes(name.as_bytes()).is_err() {
        return Some("invalid header name");
    }
    if HeaderValue::from_str(value).is_err() {
        return Some("invalid header value");
    }
    None
}

/// Rejects the first header that is not a valid HTTP name/value pair.
///
/// # Errors
///
/// Returns [`TransportError::InvalidHeader`] naming the offending header.
pub fn check_headers(headers: &[(String, String)]) -> Result<(), TransportError> {
    for (name, value) in headers {
        if let Some(reason) = header_problem(name, value) {
            return Err(TransportError::InvalidHeader {
                name: name.clone(),
                reason,
            });
        }
    }
    Ok(())
}

fn has_header(headers: &[(String, String)], name: &str) -> bool {
    headers.iter().any(|(key, _)| key.eq_ignore_ascii_case(name))
}

/// Decodes a response body as JSON, falling back to text; empty bodies are null.
#[must_use]
pub fn parse_body(bytes: &[u8]) -> Value {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}
