use super::domain::SubmissionFormState;

/// Outbound hooks the hosting application supplies (backend persistence, PDF export).
pub trait SubmissionHandlers: Send + Sync {
    fn save_draft(&self, state: &SubmissionFormState) -> Result<(), HandlerError>;
    fn submit(&self, state: &SubmissionFormState) -> Result<(), HandlerError>;
    fn export_pdf(&self, state: &SubmissionFormState) -> Result<(), HandlerError>;
}

/// Failure reported by an injected handler; surfaced to the caller untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandlerError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("backend rejected the request: {0}")]
    Rejected(String),
}
