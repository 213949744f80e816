/// Execution Client - Boundary to the Remote Execution Service
///
/// **Core Responsibility:**
/// Send one program submission to the execution service and hand back a
/// validated outcome.
///
/// **Critical Contract:**
/// - A program that fails to compile or crashes is a normal round trip:
///   `Ok(ProgramOutcome { error: Some(..), .. })`
/// - Only infrastructure problems (network, timeout, bad status, bad body)
///   become `Err(TransportError)`
/// - Holds no state between calls

use crate::auth::TokenAuth;
use crate::error::TransportError;
use async_trait::async_trait;
use byteforge_common::config::Config;
use byteforge_common::types::{ExecutionRequest, ServiceResponse};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Validated answer of the execution service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramOutcome {
    pub output: String,
    /// Compile or runtime error of the submitted program; never empty
    pub error: Option<String>,
}

impl From<ServiceResponse> for ProgramOutcome {
    fn from(response: ServiceResponse) -> Self {
        Self {
            output: response.output,
            error: response.error.filter(|e| !e.is_empty()),
        }
    }
}

#[async_trait]
pub trait ExecutionClient: Send + Sync {
    async fn execute(&self, request: &ExecutionRequest) -> Result<ProgramOutcome, TransportError>;
}

#[async_trait]
impl<T: ExecutionClient + ?Sized> ExecutionClient for Arc<T> {
    async fn execute(&self, request: &ExecutionRequest) -> Result<ProgramOutcome, TransportError> {
        (**self).execute(request).await
    }
}

/// JSON-over-HTTP client for the execution service
#[derive(Clone)]
pub struct HttpExecutionClient {
    http: reqwest::Client,
    endpoint: String,
    timeout: Option<Duration>,
    token: Option<Arc<TokenAuth>>,
}

impl HttpExecutionClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            timeout: None,
            token: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let mut client = Self::new(config.execution_url.clone());
        client.timeout = config.timeout();
        client
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Attach the current user's token as a bearer header when present
    pub fn with_token_source(mut self, token: Arc<TokenAuth>) -> Self {
        self.token = Some(token);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn classify(&self, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout(self.timeout.unwrap_or_default())
        } else {
            TransportError::from(e)
        }
    }
}

#[async_trait]
impl ExecutionClient for HttpExecutionClient {
    async fn execute(&self, request: &ExecutionRequest) -> Result<ProgramOutcome, TransportError> {
        let mut builder = self.http.post(&self.endpoint).json(&request.to_body());

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(token) = self.token.as_ref().and_then(|t| t.token()) {
            builder = builder.bearer_auth(token);
        }

        debug!(
            endpoint = %self.endpoint,
            source_size = request.source_code().len(),
            input_size = request.stdin().len(),
            "Sending execution request"
        );

        let res = builder.send().await.map_err(|e| self.classify(e))?;
        let status = res.status();
        let body = res.text().await.map_err(|e| self.classify(e))?;

        if !status.is_success() {
            return Err(TransportError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }

        let response: ServiceResponse = serde_json::from_str(&body)
            .map_err(|e| TransportError::MalformedResponse(e.to_string()))?;

        Ok(ProgramOutcome::from(response))
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod client_tests;
