use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseStatus {
    Passed,
    Failed,
    Skipped,
}

/// One concrete execution of a case's request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    pub status: u16,
    pub body: Value,
    pub duration_ms: u64,
    /// Attempt start, in epoch milliseconds.
    pub timestamp: u64,
}

impl AttemptRecord {
    #[must_use]
    pub const fn finished_at_ms(&self) -> u64 {
        self.timestamp.saturating_add(self.duration_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepeatRecord {
    pub repeat_index: u32,
    pub attempts: Vec<AttemptRecord>,
}

impl RepeatRecord {
    #[must_use]
    pub fn final_attempt(&self) -> Option<&AttemptRecord> {
        self.attempts.last()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseResult {
    pub id: String,
    pub name: String,
    pub status: CaseStatus,
    pub errors: Vec<String>,
    pub repeats: Vec<RepeatRecord>,
}

impl CaseResult {
    #[must_use]
    pub fn skipped(id: &str, name: &str) -> Self {
        Self {
            id: id.to_owned(),
            name: name.to_owned(),
            status: CaseStatus::Skipped,
            errors: Vec::new(),
            repeats: Vec::new(),
        }
    }

    /// Body of the last attempt of the last repeat, the value later cases can
    /// reference.
    #[must_use]
    pub fn final_body(&self) -> Option<&Value> {
        self.repeats
            .iter()
            .rev()
            .find_map(RepeatRecord::final_attempt)
            .map(|attempt| &attempt.body)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
}

impl RunSummary {
    #[must_use]
    pub fn from_cases(cases: &[CaseResult], duration_ms: u64) -> Self {
        let count = |status: CaseStatus| cases.iter().filter(|case| case.status == status).count();
        Self {
            total: cases.len(),
            passed: count(CaseStatus::Passed),
            failed: count(CaseStatus::Failed),
            skipped: count(CaseStatus::Skipped),
            duration_ms,
        }
    }
}

/// Everything one invocation of the runner produced; this is the artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteRunResult {
    pub suite: String,
    pub suite_id: String,
    pub run_id: String,
    pub started_at: String,
    pub finished_at: String,
    pub summary: RunSummary,
    pub cases: Vec<CaseResult>,
}

impl SuiteRunResult {
    #[must_use]
    pub fn failed_cases(&self) -> impl Iterator<Item = &CaseResult> {
        self.cases
            .iter()
            .filter(|case| case.status == CaseStatus::Failed)
    }
}
