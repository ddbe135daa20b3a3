use crate::domain::request::{RequestId, Status};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PayoutError {
    #[error("payment request {0} not found")]
    NotFound(RequestId),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("cannot {action} a request in status '{from}'")]
    InvalidTransition { action: &'static str, from: Status },
    #[error("storage error: {0}")]
    Storage(String),
    #[error("scheduling error: {0}")]
    Scheduling(String),
    #[error("gateway error: {0}")]
    Gateway(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PayoutError {
    /// Whether a retry can reasonably be expected to succeed.
    ///
    /// `NotFound` and transition conflicts are permanent; infrastructure
    /// hiccups (lock timeouts, queue or IO failures) are not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PayoutError::Storage(_)
                | PayoutError::Scheduling(_)
                | PayoutError::Gateway(_)
                | PayoutError::Io(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, PayoutError>;
