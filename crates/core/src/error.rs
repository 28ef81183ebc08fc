use greencard_types::{IdentifierError, PatientId};

/// Fault raised by a [`crate::ClinicalFactSource`] implementation.
///
/// "No data" is never a fault: sources return `Ok(None)` for it. A `SourceError` means the
/// lookup itself could not be carried out and is propagated to the caller untouched.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("clinical data source unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum GreencardError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(#[from] IdentifierError),
    #[error("patient not found: {0}")]
    PatientNotFound(PatientId),
    #[error("duplicate patient record: {0}")]
    DuplicatePatient(PatientId),
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("failed to read record file: {0}")]
    FileRead(std::io::Error),
    #[error("record schema mismatch at {path}: {message}")]
    SchemaMismatch { path: String, message: String },
}

pub type GreencardResult<T> = std::result::Result<T, GreencardError>;
