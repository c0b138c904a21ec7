//! Durable storage for run artifacts.
mod format;
mod writers;


use async_trait::async_trait;
use serde_json::Value;

use crate::error::SinkError;

pub use format::artifact_name;
pub use writers::{DirectorySink, MemorySink};

/// Accepts one immutable run record under a unique name.
///
/// Returns a description of where the record landed.
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    async fn store(&self, name: &str, record: &Value) -> Result<String, SinkError>;
}
