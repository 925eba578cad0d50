//! Per-phase execution outcome and aggregate AI usage accounting.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::models::metadata::Metadata;

/// A single recorded call to an AI collaborator during phase execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiOperation {
    pub operation_name: String,
    pub model: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub cost: Decimal,
}

impl AiOperation {
    #[must_use]
    pub const fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// AI usage accumulated across all operations in a phase.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AiUsage {
    pub total_cost: Decimal,
    pub total_tokens: u64,
    pub operations: Vec<AiOperation>,
}

impl AiUsage {
    #[must_use]
    pub fn record(&self, operation: AiOperation) -> Self {
        let mut next = self.clone();
        next.total_cost += operation.cost;
        next.total_tokens += operation.total_tokens();
        next.operations.push(operation);
        next
    }
}

/// Outcome of executing a single phase, produced by the phase executor
/// framework regardless of which phase ran.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseResult {
    pub success: bool,
    pub events_processed: u64,
    pub events_generated: u64,
    pub artifacts_created: Vec<String>,
    pub performance_metrics: Metadata,
    pub ai_usage: AiUsage,
    pub error_details: Option<String>,
    pub rollback_data: Metadata,
    pub cross_context_calls: u32,
    pub metadata: Metadata,
}

impl PhaseResult {
    #[must_use]
    pub fn success(events_processed: u64, events_generated: u64) -> Self {
        Self {
            success: true,
            events_processed,
            events_generated,
            artifacts_created: Vec::new(),
            performance_metrics: Metadata::new(),
            ai_usage: AiUsage::default(),
            error_details: None,
            rollback_data: Metadata::new(),
            cross_context_calls: 0,
            metadata: Metadata::new(),
        }
    }

    #[must_use]
    pub fn failure(error_details: impl Into<String>) -> Self {
        Self {
            success: false,
            events_processed: 0,
            events_generated: 0,
            artifacts_created: Vec::new(),
            performance_metrics: Metadata::new(),
            ai_usage: AiUsage::default(),
            error_details: Some(error_details.into()),
            rollback_data: Metadata::new(),
            cross_context_calls: 0,
            metadata: Metadata::new(),
        }
    }

    #[must_use]
    pub fn with_rollback_data(mut self, rollback_data: Metadata) -> Self {
        self.rollback_data = rollback_data;
        self
    }

    #[must_use]
    pub fn with_ai_usage(mut self, ai_usage: AiUsage) -> Self {
        self.ai_usage = ai_usage;
        self
    }

    #[must_use]
    pub fn with_cross_context_calls(mut self, count: u32) -> Self {
        self.cross_context_calls = count;
        self
    }

    #[must_use]
    pub fn with_artifacts(mut self, artifacts: Vec<String>) -> Self {
        self.artifacts_created = artifacts;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn ai_usage_accumulates_cost_and_tokens() {
        let usage = AiUsage::default().record(AiOperation {
            operation_name: "summarize".into(),
            model: "claude".into(),
            prompt_tokens: 100,
            completion_tokens: 50,
            cost: Decimal::from_str("0.02").unwrap(),
        });
        assert_eq!(usage.total_tokens, 150);
        assert_eq!(usage.total_cost, Decimal::from_str("0.02").unwrap());
    }

    #[test]
    fn failure_result_has_no_success_counters() {
        let result = PhaseResult::failure("collaborator unreachable");
        assert!(!result.success);
        assert_eq!(result.events_processed, 0);
        assert!(result.error_details.is_some());
    }
}
