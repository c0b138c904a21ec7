use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardError {
    #[error("request path '{path}' rejected: {reason}")]
    UnsafeRequestTarget { path: String, reason: &'static str },
    #[error("origin '{origin}' is not a valid URL: {source}")]
    InvalidOrigin {
        origin: String,
        #[source]
        source: url::ParseError,
    },
    #[error("origin '{origin}' must use https (http requires allow-insecure)")]
    InsecureOrigin { origin: String },
    #[error("host '{host}' resolves to a private or loopback range")]
    PrivateHostBlocked { host: String },
}
