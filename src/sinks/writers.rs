use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{info, warn};

use crate::error::SinkError;

use super::ArtifactSink;

/// Writes each record as pretty JSON to `<dir>/<name>.json`.
///
/// Existing files are never overwritten.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl ArtifactSink for DirectorySink {
    async fn store(&self, name: &str, record: &Value) -> Result<String, SinkError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|err| SinkError::CreateDir {
                path: self.dir.clone(),
                source: err,
            })?;

        let json =
            serde_json::to_vec_pretty(record).map_err(|err| SinkError::Serialize { source: err })?;
        let path = self.dir.join(format!("{}.json", name));
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|err| {
                if err.kind() == std::io::ErrorKind::AlreadyExists {
                    SinkError::AlreadyExists {
                        name: name.to_owned(),
                    }
                } else {
                    SinkError::Write {
                        path: path.clone(),
                        source: err,
                    }
                }
            })?;
        write_or_discard(&mut file, &json, &path).await?;

        info!("Wrote run artifact {}", path.display());
        Ok(path.display().to_string())
    }
}

/// Writes `bytes` and flushes; on failure the partially written file at
/// `path` is removed so no truncated artifact is left behind.
pub(crate) async fn write_or_discard<W>(
    writer: &mut W,
    bytes: &[u8],
    path: &Path,
) -> Result<(), SinkError>
where
    W: AsyncWrite + Unpin,
{
    let written = match writer.write_all(bytes).await {
        Ok(()) => writer.flush().await,
        Err(err) => Err(err),
    };
    let Err(err) = written else {
        return Ok(());
    };

    if let Err(remove_err) = tokio::fs::remove_file(path).await {
        warn!(
            "Failed to remove partial artifact {}: {}",
            path.display(),
            remove_err
        );
    }
    Err(SinkError::Write {
        path: path.to_path_buf(),
        source: err,
    })
}

/// Keeps records in memory; useful when embedding the runner.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<(String, Value)>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn records(&self) -> Vec<(String, Value)> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ArtifactSink for MemorySink {
    async fn store(&self, name: &str, record: &Value) -> Result<String, SinkError> {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        if records.iter().any(|(existing, _)| existing == name) {
            return Err(SinkError::AlreadyExists {
                name: name.to_owned(),
            });
        }
        records.push((name.to_owned(), record.clone()));
        Ok(format!("memory:{}", name))
    }
}
