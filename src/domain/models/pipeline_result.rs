//! Final outcome of running the whole five-phase pipeline for a turn.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::models::compensation::CompensationAction;
use crate::domain::models::phase::PhaseType;
use crate::domain::models::phase_result::PhaseResult;

/// Aggregated result of a complete (or partially-completed) pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub overall_success: bool,
    pub phase_results: HashMap<PhaseType, PhaseResult>,
    pub total_execution_time_ms: u64,
    pub compensation_actions_taken: Vec<CompensationAction>,
    pub completion_percentage: f32,
    pub executive_summary: String,
}

impl PipelineResult {
    #[must_use]
    pub fn completed(phase_results: HashMap<PhaseType, PhaseResult>, total_execution_time_ms: u64) -> Self {
        let completion_percentage = Self::completion_percentage(&phase_results);
        Self {
            overall_success: true,
            executive_summary: format!(
                "Turn completed successfully across {} phases in {total_execution_time_ms}ms",
                phase_results.len()
            ),
            phase_results,
            total_execution_time_ms,
            compensation_actions_taken: Vec::new(),
            completion_percentage,
        }
    }

    #[must_use]
    pub fn compensated(
        phase_results: HashMap<PhaseType, PhaseResult>,
        total_execution_time_ms: u64,
        compensation_actions_taken: Vec<CompensationAction>,
        failure_summary: impl Into<String>,
    ) -> Self {
        let completion_percentage = Self::completion_percentage(&phase_results);
        Self {
            overall_success: false,
            executive_summary: failure_summary.into(),
            phase_results,
            total_execution_time_ms,
            compensation_actions_taken,
            completion_percentage,
        }
    }

    fn completion_percentage(phase_results: &HashMap<PhaseType, PhaseResult>) -> f32 {
        if phase_results.is_empty() {
            return 0.0;
        }
        let succeeded = phase_results.values().filter(|r| r.success).count();
        (succeeded as f32 / PhaseType::ALL.len() as f32) * 100.0
    }

    #[must_use]
    pub fn total_ai_cost(&self) -> rust_decimal::Decimal {
        self.phase_results
            .values()
            .map(|r| r.ai_usage.total_cost)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_percentage_reflects_successful_phases() {
        let mut results = HashMap::new();
        results.insert(PhaseType::WorldUpdate, PhaseResult::success(1, 1));
        results.insert(PhaseType::SubjectiveBrief, PhaseResult::success(1, 1));
        let pipeline = PipelineResult::completed(results, 100);
        assert!((pipeline.completion_percentage - 40.0).abs() < f32::EPSILON);
    }
}
