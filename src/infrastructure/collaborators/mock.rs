//! Deterministic default collaborator, used when no live backend is wired up.
//!
//! Returns a canned success response for every operation after a small
//! simulated delay, and records every call it receives so tests can assert
//! on call counts and parameters. Failure injection lets tests exercise the
//! saga coordinator's compensation path without a real backend to break.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::error::DomainError;
use crate::domain::ports::collaborator::{CollaboratorContext, CollaboratorRequest, CollaboratorResponse};
use crate::metadata;

/// A recorded call, kept for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub target: String,
    pub operation: String,
}

/// Mock implementation of every collaborator target.
pub struct MockCollaboratorContext {
    simulated_latency_ms: u64,
    calls: Mutex<Vec<RecordedCall>>,
    fail_operations: Mutex<Vec<String>>,
}

impl Default for MockCollaboratorContext {
    fn default() -> Self {
        Self::new(5)
    }
}

impl MockCollaboratorContext {
    #[must_use]
    pub fn new(simulated_latency_ms: u64) -> Self {
        Self {
            simulated_latency_ms,
            calls: Mutex::new(Vec::new()),
            fail_operations: Mutex::new(Vec::new()),
        }
    }

    /// Make every call to `operation` fail, to exercise compensation paths.
    pub fn fail_on(&self, operation: impl Into<String>) {
        self.fail_operations.lock().expect("mutex poisoned").push(operation.into());
    }

    #[must_use]
    pub fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("mutex poisoned").clone()
    }
}

#[async_trait]
impl CollaboratorContext for MockCollaboratorContext {
    async fn call(&self, request: CollaboratorRequest) -> Result<CollaboratorResponse, DomainError> {
        if self.simulated_latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.simulated_latency_ms)).await;
        }

        self.calls.lock().expect("mutex poisoned").push(RecordedCall {
            target: request.target.as_str().to_string(),
            operation: request.operation.clone(),
        });

        let should_fail = self
            .fail_operations
            .lock()
            .expect("mutex poisoned")
            .iter()
            .any(|op| op == &request.operation);
        if should_fail {
            return Ok(CollaboratorResponse::failure(
                format!("mock collaborator configured to fail operation '{}'", request.operation),
                self.simulated_latency_ms,
            ));
        }

        Ok(CollaboratorResponse::success(
            metadata! { "operation" => request.operation.as_str(), "target" => request.target.as_str() },
            self.simulated_latency_ms,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::collaborator::CollaboratorTarget;

    #[tokio::test]
    async fn records_every_call() {
        let mock = MockCollaboratorContext::new(0);
        mock.call(CollaboratorRequest::new(
            CollaboratorTarget::WorldContext,
            "advance_time",
            metadata! {},
        ))
        .await
        .unwrap();
        assert_eq!(mock.recorded_calls().len(), 1);
    }

    #[tokio::test]
    async fn fail_on_forces_unsuccessful_response() {
        let mock = MockCollaboratorContext::new(0);
        mock.fail_on("advance_time");
        let response = mock
            .call(CollaboratorRequest::new(
                CollaboratorTarget::WorldContext,
                "advance_time",
                metadata! {},
            ))
            .await
            .unwrap();
        assert!(!response.success);
    }
}
