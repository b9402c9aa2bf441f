use thiserror::Error;
use watch_domain::DomainError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Recovers a typed domain error carried through an adapter's `anyhow::Error`.
    pub fn from_port(err: anyhow::Error) -> Self {
        match err.downcast::<DomainError>() {
            Ok(domain) => AppError::Domain(domain),
            Err(other) => AppError::Internal(other),
        }
    }

    /// Errors that must stop the poll worker instead of waiting for the next cycle.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::Domain(err) if err.is_auth())
    }
}
