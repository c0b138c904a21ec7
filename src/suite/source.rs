use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::SuiteError;

/// Extensions tried, in order, when a directory is searched for a suite id.
const SUITE_EXTENSIONS: [&str; 2] = ["json", "toml"];

/// Somewhere suite documents can be read from.
///
/// `fetch` answers `Ok(None)` when the source simply does not know the id so
/// the loader can move on to the next source.
#[async_trait]
pub trait SuiteSource: Send + Sync {
    async fn fetch(&self, id: &str) -> Result<Option<Value>, SuiteError>;

    fn describe(&self) -> String;
}

/// Reads `<dir>/<id>.json` or `<dir>/<id>.toml`.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl SuiteSource for DirectorySource {
    async fn fetch(&self, id: &str) -> Result<Option<Value>, SuiteError> {
        if !is_plain_id(id) {
            debug!("Suite id '{}' is not a plain file name; skipping directory", id);
            return Ok(None);
        }

        for ext in SUITE_EXTENSIONS {
            let path = self.dir.join(format!("{}.{}", id, ext));
            match tokio::fs::read_to_string(&path).await {
                Ok(content) => {
                    debug!("Reading suite '{}' from {}", id, path.display());
                    return decode_suite_document(&path, &content).map(Some);
                }
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => return Err(SuiteError::Read { path, source: err }),
            }
        }

        Ok(None)
    }

    fn describe(&self) -> String {
        format!("directory {}", self.dir.display())
    }
}

/// Fetches `GET <endpoint>/<id>` and expects a JSON suite document.
#[derive(Debug, Clone)]
pub struct HttpSource {
    endpoint: Url,
    client: Client,
}

impl HttpSource {
    #[must_use]
    pub fn new(endpoint: Url, client: Client) -> Self {
        Self { endpoint, client }
    }

    fn suite_url(&self, id: &str) -> Result<Url, SuiteError> {
        let mut url = self.endpoint.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| SuiteError::InvalidEndpoint {
                    id: id.to_owned(),
                    source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
                })?;
            segments.pop_if_empty().push(id);
        }
        Ok(url)
    }
}

#[async_trait]
impl SuiteSource for HttpSource {
    async fn fetch(&self, id: &str) -> Result<Option<Value>, SuiteError> {
        let url = self.suite_url(id)?;
        debug!("Fetching suite '{}' from {}", id, url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|err| SuiteError::Fetch {
                url: url.to_string(),
                source: err,
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(SuiteError::FetchStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(|err| SuiteError::Fetch {
            url: url.to_string(),
            source: err,
        })?;
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|err| SuiteError::ParseJson {
                origin: url.to_string(),
                source: err,
            })
    }

    fn describe(&self) -> String {
        format!("endpoint {}", self.endpoint)
    }
}

/// Decodes a suite file by extension into a JSON value.
///
/// # Errors
///
/// Returns an error for unknown extensions or unparseable content.
pub fn decode_suite_document(path: &Path, content: &str) -> Result<Value, SuiteError> {
    let origin = path.display().to_string();
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(content)
            .map_err(|err| SuiteError::ParseJson { origin, source: err }),
        Some("toml") => {
            let document: toml::Value = toml::from_str(content).map_err(|err| {
                SuiteError::ParseToml {
                    origin: origin.clone(),
                    source: err,
                }
            })?;
            serde_json::to_value(document)
                .map_err(|err| SuiteError::ParseJson { origin, source: err })
        }
        Some(ext) => Err(SuiteError::UnsupportedExtension {
            ext: ext.to_owned(),
        }),
        None => Err(SuiteError::MissingExtension),
    }
}

/// Splits a suite file path into the directory to search and the suite id.
///
/// # Errors
///
/// Returns an error when the path has no usable stem or extension.
pub fn split_suite_path(path: &Path) -> Result<(PathBuf, String), SuiteError> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if SUITE_EXTENSIONS.contains(&ext) => {}
        Some(ext) => {
            return Err(SuiteError::UnsupportedExtension {
                ext: ext.to_owned(),
            });
        }
        None => return Err(SuiteError::MissingExtension),
    }
    let id = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .ok_or(SuiteError::MissingExtension)?;
    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    Ok((dir, id.to_owned()))
}

fn is_plain_id(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && !id.contains(['/', '\\'])
        && !id.chars().any(char::is_control)
}
