use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SuiteError {
    #[error("Suite '{id}' not found.")]
    NotFound { id: String },
    #[error("Suite '{id}' is malformed: {}", .problems.join("; "))]
    Malformed { id: String, problems: Vec<String> },
    #[error("Failed to read suite '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse JSON suite '{origin}': {source}")]
    ParseJson {
        origin: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to parse TOML suite '{origin}': {source}")]
    ParseToml {
        origin: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("Failed to fetch suite from '{url}': {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Suite endpoint '{url}' answered with status {status}.")]
    FetchStatus { url: String, status: u16 },
    #[error("Invalid suite endpoint URL for '{id}': {source}")]
    InvalidEndpoint {
        id: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Unsupported suite extension '{ext}'. Use .json or .toml.")]
    UnsupportedExtension { ext: String },
    #[error("Suite file must have .json or .toml extension.")]
    MissingExtension,
}
