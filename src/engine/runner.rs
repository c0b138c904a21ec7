use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{SinkError, SuiteError};
use crate::shutdown::RunControl;
use crate::sinks::{ArtifactSink, artifact_name};
use crate::suite::{SuiteLoader, TestSuite};
use crate::template::Artifacts;

use super::executor::CaseExecutor;
use super::result::{CaseResult, CaseStatus, RunSummary, SuiteRunResult};

/// What to run: an id for the loader, or a suite already in hand.
#[derive(Debug, Clone)]
pub enum SuiteRef {
    Id(String),
    Inline { id: String, suite: Arc<TestSuite> },
}

/// The run result plus the outcome of handing it to the artifact sink.
///
/// `artifact` is `None` when no sink is configured. A sink failure never
/// changes `result`.
#[derive(Debug)]
pub struct RunReport {
    pub result: SuiteRunResult,
    pub artifact: Option<Result<String, SinkError>>,
}

pub struct SuiteRunner {
    loader: SuiteLoader,
    executor: CaseExecutor,
    clock: Arc<dyn Clock>,
    sink: Option<Arc<dyn ArtifactSink>>,
}

impl SuiteRunner {
    #[must_use]
    pub fn new(loader: SuiteLoader, executor: CaseExecutor, clock: Arc<dyn Clock>) -> Self {
        Self {
            loader,
            executor,
            clock,
            sink: None,
        }
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ArtifactSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    #[must_use]
    pub const fn loader(&self) -> &SuiteLoader {
        &self.loader
    }

    /// Runs every case of the suite in declared order.
    ///
    /// # Errors
    ///
    /// Only loader failures are returned, before any case runs. Case failures
    /// are part of the returned result.
    pub async fn run(
        &self,
        suite_ref: SuiteRef,
        control: &mut RunControl,
    ) -> Result<RunReport, SuiteError> {
        let (suite_id, suite) = match suite_ref {
            SuiteRef::Id(id) => {
                let suite = self.loader.load(&id).await?;
                (id, suite)
            }
            SuiteRef::Inline { id, suite } => (id, suite),
        };

        let run_id = Uuid::new_v4().to_string();
        let started_ms = self.clock.now_ms();
        info!(
            "Starting run {} of suite '{}' ({}, {} case(s))",
            run_id,
            suite_id,
            suite.reference(),
            suite.cases.len()
        );

        let mut artifacts = Artifacts::new();
        let mut cases = Vec::with_capacity(suite.cases.len());
        for case in &suite.cases {
            let result = match control.check() {
                Err(reason) if case.request.is_some() => CaseResult {
                    id: case.id.clone(),
                    name: case.name.clone(),
                    status: CaseStatus::Failed,
                    errors: vec![format!("{} before case started", reason)],
                    repeats: Vec::new(),
                },
                Err(_) => CaseResult::skipped(&case.id, &case.name),
                Ok(()) => self.executor.execute(case, &artifacts, control).await,
            };
            if let Some(body) = result.final_body() {
                artifacts.capture(case.id.clone(), body.clone());
            }
            cases.push(result);
        }

        let finished_ms = self.clock.now_ms();
        let summary = RunSummary::from_cases(&cases, finished_ms.saturating_sub(started_ms));
        let result = SuiteRunResult {
            suite: suite.reference(),
            suite_id,
            run_id,
            started_at: format_timestamp(started_ms),
            finished_at: format_timestamp(finished_ms),
            summary,
            cases,
        };
        info!(
            "Run {} finished: {} total, {} passed, {} failed, {} skipped in {}ms",
            result.run_id,
            summary.total,
            summary.passed,
            summary.failed,
            summary.skipped,
            summary.duration_ms
        );

        let artifact = match self.sink.as_ref() {
            Some(sink) => Some(persist(sink.as_ref(), &result, started_ms).await),
            None => None,
        };

        Ok(RunReport { result, artifact })
    }
}

async fn persist(
    sink: &dyn ArtifactSink,
    result: &SuiteRunResult,
    started_ms: u64,
) -> Result<String, SinkError> {
    let record = serde_json::to_value(result).map_err(|err| SinkError::Serialize { source: err })?;
    let name = artifact_name(started_ms, &result.suite_id, &result.run_id);
    let stored = sink.store(&name, &record).await;
    match stored.as_ref() {
        Ok(location) => info!("Stored artifact for run {} at {}", result.run_id, location),
        Err(err) => error!("Failed to store artifact for run {}: {}", result.run_id, err),
    }
    stored
}

fn format_timestamp(epoch_ms: u64) -> String {
    i64::try_from(epoch_ms)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map_or_else(
            || {
                warn!("Timestamp {} out of range", epoch_ms);
                epoch_ms.to_string()
            },
            |time| time.to_rfc3339_opts(SecondsFormat::Millis, true),
        )
}
