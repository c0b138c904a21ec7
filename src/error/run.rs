use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("{failed} of {total} case(s) failed.")]
    CasesFailed { failed: usize, total: usize },
}
