use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Unknown severity: {0}")]
    UnknownSeverity(String),

    #[error("Unknown spec kind: {0}")]
    UnknownSpecKind(String),

    #[error("Invalid document path: {0}")]
    InvalidPath(String),
}
