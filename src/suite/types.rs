use std::num::NonZeroU32;

use serde_json::{Map, Value};

/// Default pause between retry attempts when a policy omits `baseDelayMs`.
pub const DEFAULT_BASE_DELAY_MS: u64 = 200;

/// A named, versioned, ordered collection of cases. Immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct TestSuite {
    pub name: String,
    pub version: String,
    pub cases: Vec<TestCase>,
}

impl TestSuite {
    /// `name@version`, the reference recorded in run artifacts.
    #[must_use]
    pub fn reference(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestCase {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub request: Option<TestRequest>,
    pub expect: Option<TestExpectations>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
    pub repeat: NonZeroU32,
    pub think_time_ms: u64,
    pub policy: RetryPolicy,
    pub simulate: SimulateFlags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: NonZeroU32,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: NonZeroU32::MIN,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimulateFlags {
    /// Answer the very first attempt of the first repeat with a synthetic 429.
    pub rate_limit: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Uniqueness {
    /// Every repeat must yield the same resource identifier.
    SingleResource,
}

impl Uniqueness {
    pub const SINGLE_RESOURCE: &'static str = "single_resource";
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestExpectations {
    pub status: Option<u16>,
    pub uniqueness: Option<Uniqueness>,
    pub client_backoff: bool,
    /// Expectation keys this engine does not evaluate, kept verbatim.
    pub extensions: Map<String, Value>,
}
