use thiserror::Error;

/// Rejection of a connection attempt before any session exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing document ID")]
    MissingDocumentId,
    #[error("missing user ID")]
    MissingUserId,
    #[error("missing document and user ID")]
    MissingBoth,
}

impl ValidationError {
    /// Check both identifiers, returning the matching rejection if either is empty.
    pub fn check(document_id: &str, user_id: &str) -> Result<(), ValidationError> {
        match (document_id.is_empty(), user_id.is_empty()) {
            (false, false) => Ok(()),
            (true, false) => Err(ValidationError::MissingDocumentId),
            (false, true) => Err(ValidationError::MissingUserId),
            (true, true) => Err(ValidationError::MissingBoth),
        }
    }
}

/// Failures local to one session's channel. None of these reach other clients.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("delivery failed: {0}")]
    Delivery(String),
    #[error("receive failed: {0}")]
    Receive(String),
    #[error("session is closed")]
    SessionClosed,
}

impl RelayError {
    pub fn delivery(e: impl std::fmt::Display) -> Self {
        RelayError::Delivery(e.to_string())
    }

    pub fn receive(e: impl std::fmt::Display) -> Self {
        RelayError::Receive(e.to_string())
    }
}
