use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out: {message}")]
    Timeout { message: String },
    #[error("connection failed: {message}")]
    Connect { message: String },
    #[error("request failed: {message}")]
    Request { message: String },
    #[error("failed to read response body: {message}")]
    Body { message: String },
    #[error("invalid HTTP method '{method}'")]
    InvalidMethod { method: String },
    #[error("header '{name}' rejected: {reason}")]
    InvalidHeader { name: String, reason: &'static str },
}
