use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Safety limits so pathological submissions never reach the execution service
pub const MAX_SOURCE_CODE_BYTES: usize = 1024 * 1024; // 1MB
pub const MAX_STDIN_BYTES: usize = 10 * 1024 * 1024; // 10MB

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("source code is empty")]
    EmptySource,
    #[error("source code exceeds maximum size of {limit} bytes ({actual} bytes)")]
    SourceTooLarge { actual: usize, limit: usize },
    #[error("program input exceeds maximum size of {limit} bytes ({actual} bytes)")]
    StdinTooLarge { actual: usize, limit: usize },
}

/// A single program submission
///
/// Built fresh for every run and never mutated afterwards; the fields are
/// private so the validation in `new` cannot be bypassed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    source_code: String,
    stdin: String,
}

impl ExecutionRequest {
    pub fn new(
        source_code: impl Into<String>,
        stdin: impl Into<String>,
    ) -> Result<Self, RequestError> {
        let source_code = source_code.into();
        let stdin = stdin.into();

        if source_code.trim().is_empty() {
            return Err(RequestError::EmptySource);
        }
        if source_code.len() > MAX_SOURCE_CODE_BYTES {
            return Err(RequestError::SourceTooLarge {
                actual: source_code.len(),
                limit: MAX_SOURCE_CODE_BYTES,
            });
        }
        if stdin.len() > MAX_STDIN_BYTES {
            return Err(RequestError::StdinTooLarge {
                actual: stdin.len(),
                limit: MAX_STDIN_BYTES,
            });
        }

        Ok(Self { source_code, stdin })
    }

    pub fn source_code(&self) -> &str {
        &self.source_code
    }

    pub fn stdin(&self) -> &str {
        &self.stdin
    }

    /// Wire body sent to the execution service
    pub fn to_body(&self) -> ExecuteBody {
        ExecuteBody {
            code: self.source_code.clone(),
            input: self.stdin.clone(),
        }
    }
}

/// Which side failed when a run carries an error message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The submitted program failed to compile or crashed
    Program,
    /// The execution service could not be reached or answered garbage
    Transport,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub output: String,
    pub error_message: Option<String>,
    pub error_kind: Option<ErrorKind>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

impl ExecutionResult {
    /// Result of a completed round trip. An empty error string counts as success.
    pub fn program(
        output: String,
        error: Option<String>,
        started_at: DateTime<Utc>,
        elapsed_ms: u64,
    ) -> Self {
        let error_message = error.filter(|e| !e.is_empty());
        let error_kind = error_message.as_ref().map(|_| ErrorKind::Program);
        Self {
            output,
            error_message,
            error_kind,
            started_at,
            finished_at: finished_at(started_at, elapsed_ms),
            elapsed_ms,
        }
    }

    /// Result recorded when the execution service itself failed
    pub fn transport(message: String, started_at: DateTime<Utc>, elapsed_ms: u64) -> Self {
        Self {
            output: String::new(),
            error_message: Some(message),
            error_kind: Some(ErrorKind::Transport),
            started_at,
            finished_at: finished_at(started_at, elapsed_ms),
            elapsed_ms,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error_message.is_none()
    }

    /// Status this result settles a session into
    pub fn status(&self) -> SessionStatus {
        if self.is_success() {
            SessionStatus::Succeeded
        } else {
            SessionStatus::Failed
        }
    }
}

fn finished_at(started_at: DateTime<Utc>, elapsed_ms: u64) -> DateTime<Utc> {
    started_at + Duration::milliseconds(elapsed_ms as i64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Idle,
    Executing,
    Succeeded,
    Failed,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Idle => write!(f, "idle"),
            SessionStatus::Executing => write!(f, "executing"),
            SessionStatus::Succeeded => write!(f, "succeeded"),
            SessionStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Point-in-time copy of a session for rendering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub current_result: Option<ExecutionResult>,
    pub runs_started: u64,
}

/// Request body accepted by the execution service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteBody {
    pub code: String,
    pub input: String,
}

/// Response body returned by the execution service
///
/// `output` is mandatory; a body without it is a malformed response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceResponse {
    pub output: String,
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_rejects_empty_source() {
        assert_eq!(ExecutionRequest::new("", ""), Err(RequestError::EmptySource));
        assert_eq!(
            ExecutionRequest::new("  \n\t", "5"),
            Err(RequestError::EmptySource)
        );
    }

    #[test]
    fn test_request_allows_empty_stdin() {
        let request = ExecutionRequest::new("class Main {}", "").unwrap();
        assert_eq!(request.source_code(), "class Main {}");
        assert_eq!(request.stdin(), "");
    }

    #[test]
    fn test_request_size_limits() {
        let big_source = "x".repeat(MAX_SOURCE_CODE_BYTES + 1);
        assert!(matches!(
            ExecutionRequest::new(big_source, ""),
            Err(RequestError::SourceTooLarge { .. })
        ));

        let big_input = "1".repeat(MAX_STDIN_BYTES + 1);
        assert!(matches!(
            ExecutionRequest::new("class Main {}", big_input),
            Err(RequestError::StdinTooLarge { .. })
        ));
    }

    #[test]
    fn test_to_body_uses_service_field_names() {
        let request = ExecutionRequest::new("code", "input").unwrap();
        let json = serde_json::to_value(request.to_body()).unwrap();
        assert_eq!(json, serde_json::json!({ "code": "code", "input": "input" }));
    }

    #[test]
    fn test_program_result_partition() {
        let start = Utc::now();

        let ok = ExecutionResult::program("hi\n".to_string(), None, start, 12);
        assert!(ok.is_success());
        assert_eq!(ok.error_kind, None);
        assert_eq!(ok.status(), SessionStatus::Succeeded);

        let failed = ExecutionResult::program(
            String::new(),
            Some("cannot find symbol".to_string()),
            start,
            12,
        );
        assert_eq!(failed.error_kind, Some(ErrorKind::Program));
        assert_eq!(failed.status(), SessionStatus::Failed);
    }

    #[test]
    fn test_empty_error_string_is_success() {
        let result = ExecutionResult::program("ok".to_string(), Some(String::new()), Utc::now(), 1);
        assert!(result.is_success());
        assert_eq!(result.error_message, None);
    }

    #[test]
    fn test_timing_is_exact() {
        let start = Utc::now();
        let result = ExecutionResult::transport("network error".to_string(), start, 250);
        assert!(result.finished_at >= result.started_at);
        assert_eq!(
            (result.finished_at - result.started_at).num_milliseconds(),
            result.elapsed_ms as i64
        );
        assert_eq!(result.error_kind, Some(ErrorKind::Transport));
    }

    #[test]
    fn test_service_response_parsing() {
        let ok: ServiceResponse = serde_json::from_str(r#"{"output":"hi\n"}"#).unwrap();
        assert_eq!(ok.output, "hi\n");
        assert_eq!(ok.error, None);

        let null_error: ServiceResponse =
            serde_json::from_str(r#"{"output":"","error":null}"#).unwrap();
        assert_eq!(null_error.error, None);

        assert!(serde_json::from_str::<ServiceResponse>(r#"{"error":"x"}"#).is_err());
        assert!(serde_json::from_str::<ServiceResponse>(r#"{"output":5}"#).is_err());
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&SessionStatus::Executing).unwrap(),
            "\"executing\""
        );
        assert_eq!(SessionStatus::Failed.to_string(), "failed");
    }
}
