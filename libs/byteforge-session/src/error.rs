use std::time::Duration;
use thiserror::Error;

/// Failure to get a usable answer out of the execution service
///
/// Compile and runtime errors of the submitted program are not transport
/// errors; they come back as `ProgramOutcome::error`.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),
    #[error("execution service did not answer within {0:?}")]
    Timeout(Duration),
    #[error("execution service returned status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },
    #[error("malformed response from execution service: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            TransportError::MalformedResponse(e.to_string())
        } else {
            TransportError::Network(e.to_string())
        }
    }
}

/// Reasons a run trigger did not produce a program result
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("log in to run code")]
    Authorization,
    #[error("an execution is already running")]
    ConcurrentExecution,
    #[error("couldn't reach the execution service: {0}")]
    Transport(#[from] TransportError),
    #[error("execution cancelled by reset")]
    Cancelled,
}

impl SessionError {
    /// Re-triggering the run is the expected recovery
    pub fn is_retryable(&self) -> bool {
        matches!(self, SessionError::Transport(_))
    }
}
