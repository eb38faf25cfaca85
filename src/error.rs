use thiserror::Error;

/// Errors surfaced by the scoring core. Rejection happens before any
/// scoring, so there is never a partial result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrustError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, TrustError>;
