use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("invalid timestamp '{value}': {reason}")]
    Parse { value: String, reason: String },
    #[error("authorization rejected: {0}")]
    Auth(String),
}

impl DomainError {
    pub fn parse(value: impl Into<String>, reason: impl ToString) -> Self {
        DomainError::Parse {
            value: value.into(),
            reason: reason.to_string(),
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, DomainError::Auth(_))
    }
}
