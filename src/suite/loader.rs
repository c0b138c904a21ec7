use std::sync::Arc;

use tracing::{debug, info};

use crate::error::SuiteError;

use super::cache::SuiteCache;
use super::parse::parse_suite;
use super::source::SuiteSource;
use super::types::TestSuite;

/// Resolves suite ids to validated suites, consulting its own cache first.
pub struct SuiteLoader {
    sources: Vec<Box<dyn SuiteSource>>,
    cache: SuiteCache,
}

impl SuiteLoader {
    #[must_use]
    pub fn new(cache: SuiteCache) -> Self {
        Self {
            sources: Vec::new(),
            cache,
        }
    }

    /// Appends a source; sources are searched in the order they were added.
    #[must_use]
    pub fn with_source<S>(mut self, source: S) -> Self
    where
        S: SuiteSource + 'static,
    {
        self.sources.push(Box::new(source));
        self
    }

    #[must_use]
    pub const fn cache(&self) -> &SuiteCache {
        &self.cache
    }

    /// Loads a suite by id.
    ///
    /// # Errors
    ///
    /// Returns [`SuiteError::NotFound`] when no source knows the id,
    /// [`SuiteError::Malformed`] when the document fails validation, and
    /// read/parse errors from the source that holds it.
    pub async fn load(&self, id: &str) -> Result<Arc<TestSuite>, SuiteError> {
        if let Some(suite) = self.cache.get(id) {
            debug!("Suite '{}' served from cache", id);
            return Ok(suite);
        }

        for source in &self.sources {
            let Some(document) = source.fetch(id).await? else {
                debug!("Suite '{}' not found in {}", id, source.describe());
                continue;
            };
            let suite = Arc::new(parse_suite(id, &document)?);
            info!(
                "Loaded suite '{}' ({}, {} case(s)) from {}",
                id,
                suite.reference(),
                suite.cases.len(),
                source.describe()
            );
            self.cache.insert(id, Arc::clone(&suite));
            return Ok(suite);
        }

        Err(SuiteError::NotFound { id: id.to_owned() })
    }
}
