//! Case execution, retry policy, and suite orchestration.
mod executor;
mod expect;
mod result;
mod retry;
mod runner;


pub use executor::{CaseExecutor, ExecutorConfig};
pub use expect::extract_identifier;
pub use result::{AttemptRecord, CaseResult, CaseStatus, RepeatRecord, RunSummary, SuiteRunResult};
pub use retry::{
    NETWORK_FAILURE_STATUS, RATE_LIMITED_STATUS, RetryMachine, RetryState, is_retriable,
};
pub use runner::{RunReport, SuiteRef, SuiteRunner};
