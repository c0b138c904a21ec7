use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("no artifact captured for case '{case_id}' (referenced as '{{{{from:{case_id}}}}}')")]
    UnresolvedReference { case_id: String },
}
