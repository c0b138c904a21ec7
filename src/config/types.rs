use std::time::Duration;

use serde::Deserialize;

use crate::args::parsers::parse_duration;
use crate::error::ValidationError;

/// Settings accepted in `goldrun.toml` / `goldrun.json`; every field mirrors a CLI flag.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(alias = "origin")]
    pub base_url: Option<String>,
    pub suites_dir: Option<String>,
    pub suite_endpoint: Option<String>,
    pub artifacts_dir: Option<String>,
    pub no_artifacts: Option<bool>,
    pub allow_insecure: Option<bool>,
    pub strict_templates: Option<bool>,
    pub retry_network_errors: Option<bool>,
    pub timeout: Option<DurationValue>,
    pub deadline: Option<DurationValue>,
    pub verbose: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DurationValue {
    Seconds(u64),
    Text(String),
}

impl DurationValue {
    pub(crate) fn to_duration(&self) -> Result<Duration, ValidationError> {
        match self {
            DurationValue::Seconds(0) => Err(ValidationError::DurationZero),
            DurationValue::Seconds(secs) => Ok(Duration::from_secs(*secs)),
            DurationValue::Text(text) => parse_duration(text),
        }
    }
}
