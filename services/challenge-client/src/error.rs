use reqwest::StatusCode;
use thiserror::Error;

/// Errors talking to the ranking service.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Invalid base URL {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("Ranking service unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Ranking service returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Unexpected response body: {0}")]
    Decode(String),
}

impl ClientError {
    /// HTTP status, when the service answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::Transport(e) => e.status(),
            _ => None,
        }
    }
}

/// Failure to produce a signature.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignError {
    #[error("Signing rejected by user")]
    Rejected,

    #[error("No signing account available")]
    NoAccount,

    #[error("Signer failed: {0}")]
    Failed(String),
}

/// Reasons a challenge attempt could not be completed.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("A submission is already in flight")]
    AlreadySubmitting,

    #[error("Could not sign challenge message: {0}")]
    Sign(#[from] SignError),

    #[error("Could not encode challenge message: {0}")]
    Encode(String),

    #[error(transparent)]
    Client(#[from] ClientError),
}
