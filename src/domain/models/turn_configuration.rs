//! Turn configuration value object.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::models::phase::PhaseType;

/// Narrative analysis depth, driving prompt size and token budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeDepth {
    Basic,
    Standard,
    Detailed,
    Comprehensive,
}

impl NarrativeDepth {
    #[must_use]
    pub const fn cost_multiplier(self) -> f64 {
        match self {
            Self::Basic => 1.0,
            Self::Standard => 1.5,
            Self::Detailed => 2.0,
            Self::Comprehensive => 3.0,
        }
    }

    #[must_use]
    pub const fn subjective_brief_max_tokens(self) -> u32 {
        match self {
            Self::Basic => 200,
            Self::Standard => 500,
            Self::Detailed => 1000,
            Self::Comprehensive => 2000,
        }
    }

    #[must_use]
    pub const fn narrative_max_tokens(self) -> u32 {
        match self {
            Self::Basic => 300,
            Self::Standard => 800,
            Self::Detailed => 1500,
            Self::Comprehensive => 3000,
        }
    }
}

/// Immutable record of the knobs that drive one turn's execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TurnConfiguration {
    #[serde(default = "default_world_time_advance")]
    pub world_time_advance: u32,
    #[serde(default = "default_true")]
    pub ai_integration_enabled: bool,
    #[serde(default = "default_narrative_depth")]
    pub narrative_analysis_depth: NarrativeDepth,
    #[serde(default = "default_max_execution_time_ms")]
    pub max_execution_time_ms: u64,
    #[serde(default = "default_true")]
    pub rollback_enabled: bool,
    #[serde(default)]
    pub max_ai_cost: Option<Decimal>,
    #[serde(default = "default_max_memory_usage_mb")]
    pub max_memory_usage_mb: u32,
    #[serde(default = "default_max_concurrent_operations")]
    pub max_concurrent_operations: u32,
    #[serde(default)]
    pub participants: Vec<String>,
    #[serde(default)]
    pub excluded_agents: HashSet<String>,
    #[serde(default)]
    pub required_agents: HashSet<String>,
    #[serde(default = "default_phase_timeouts")]
    pub phase_timeouts: HashMap<PhaseType, u64>,
    #[serde(default = "default_phase_enabled")]
    pub phase_enabled: HashMap<PhaseType, bool>,
    #[serde(default = "default_ai_temperature")]
    pub ai_temperature: f64,
    #[serde(default = "default_ai_max_tokens")]
    pub ai_max_tokens: u32,
    #[serde(default)]
    pub narrative_themes: Vec<String>,
    #[serde(default = "default_narrative_perspectives")]
    pub narrative_perspectives: Vec<String>,
    #[serde(default)]
    pub fail_fast_on_phase_failure: bool,
    #[serde(default = "default_max_participants")]
    pub max_participants: usize,
}

fn default_world_time_advance() -> u32 {
    300
}
fn default_true() -> bool {
    true
}
fn default_narrative_depth() -> NarrativeDepth {
    NarrativeDepth::Standard
}
fn default_max_execution_time_ms() -> u64 {
    60_000
}
fn default_max_memory_usage_mb() -> u32 {
    512
}
fn default_max_concurrent_operations() -> u32 {
    10
}
fn default_ai_temperature() -> f64 {
    0.7
}
fn default_ai_max_tokens() -> u32 {
    1000
}
fn default_max_participants() -> usize {
    10
}
fn default_narrative_perspectives() -> Vec<String> {
    vec!["omniscient".to_string()]
}

/// Default per-phase timeouts in milliseconds.
#[must_use]
pub fn default_phase_timeouts() -> HashMap<PhaseType, u64> {
    HashMap::from([
        (PhaseType::WorldUpdate, 5_000),
        (PhaseType::SubjectiveBrief, 10_000),
        (PhaseType::InteractionOrchestration, 12_000),
        (PhaseType::EventIntegration, 3_000),
        (PhaseType::NarrativeIntegration, 8_000),
    ])
}

fn default_phase_enabled() -> HashMap<PhaseType, bool> {
    PhaseType::ALL.iter().map(|p| (*p, true)).collect()
}

impl Default for TurnConfiguration {
    fn default() -> Self {
        Self {
            world_time_advance: default_world_time_advance(),
            ai_integration_enabled: true,
            narrative_analysis_depth: default_narrative_depth(),
            max_execution_time_ms: default_max_execution_time_ms(),
            rollback_enabled: true,
            max_ai_cost: None,
            max_memory_usage_mb: default_max_memory_usage_mb(),
            max_concurrent_operations: default_max_concurrent_operations(),
            participants: Vec::new(),
            excluded_agents: HashSet::new(),
            required_agents: HashSet::new(),
            phase_timeouts: default_phase_timeouts(),
            phase_enabled: default_phase_enabled(),
            ai_temperature: default_ai_temperature(),
            ai_max_tokens: default_ai_max_tokens(),
            narrative_themes: Vec::new(),
            narrative_perspectives: default_narrative_perspectives(),
            fail_fast_on_phase_failure: false,
            max_participants: default_max_participants(),
        }
    }
}

impl TurnConfiguration {
    /// Balanced defaults for a general-purpose turn.
    #[must_use]
    pub fn create_default(participants: Vec<String>) -> Self {
        Self {
            participants,
            ..Self::default()
        }
    }

    /// A short, AI-light turn suited to quick iteration.
    #[must_use]
    pub fn create_fast_turn(participants: Vec<String>) -> Self {
        Self {
            participants,
            max_execution_time_ms: 60_000,
            narrative_analysis_depth: NarrativeDepth::Basic,
            phase_timeouts: HashMap::from([
                (PhaseType::WorldUpdate, 2_000),
                (PhaseType::SubjectiveBrief, 3_000),
                (PhaseType::InteractionOrchestration, 4_000),
                (PhaseType::EventIntegration, 2_000),
                (PhaseType::NarrativeIntegration, 4_000),
            ]),
            ai_max_tokens: 500,
            ..Self::default()
        }
    }

    /// A long, high-fidelity turn with a generous cost ceiling.
    #[must_use]
    pub fn create_detailed_turn(participants: Vec<String>, max_ai_cost: Decimal) -> Self {
        Self {
            participants,
            max_execution_time_ms: 600_000,
            narrative_analysis_depth: NarrativeDepth::Comprehensive,
            max_ai_cost: Some(max_ai_cost),
            ai_max_tokens: 2000,
            ..Self::default()
        }
    }

    /// A turn with AI integration fully disabled.
    #[must_use]
    pub fn create_ai_disabled(participants: Vec<String>) -> Self {
        Self {
            participants,
            ai_integration_enabled: false,
            narrative_analysis_depth: NarrativeDepth::Basic,
            phase_timeouts: HashMap::from([
                (PhaseType::WorldUpdate, 5_000),
                (PhaseType::SubjectiveBrief, 2_000),
                (PhaseType::InteractionOrchestration, 10_000),
                (PhaseType::EventIntegration, 3_000),
                (PhaseType::NarrativeIntegration, 2_000),
            ]),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn phase_timeout(&self, phase: PhaseType) -> u64 {
        self.phase_timeouts
            .get(&phase)
            .copied()
            .unwrap_or_else(|| *default_phase_timeouts().get(&phase).unwrap_or(&5_000))
    }

    #[must_use]
    pub fn is_phase_enabled(&self, phase: PhaseType) -> bool {
        self.phase_enabled.get(&phase).copied().unwrap_or(true)
    }

    /// AI is only ever invoked for the brief and narrative phases.
    #[must_use]
    pub fn should_use_ai_for_phase(&self, phase: PhaseType) -> bool {
        self.ai_integration_enabled
            && matches!(
                phase,
                PhaseType::SubjectiveBrief | PhaseType::NarrativeIntegration
            )
    }

    #[must_use]
    pub fn get_estimated_ai_cost(&self) -> Decimal {
        if !self.ai_integration_enabled {
            return Decimal::ZERO;
        }
        let base = Decimal::new(50, 2); // $0.50
        #[allow(clippy::cast_precision_loss)]
        let multiplier = Decimal::try_from(self.narrative_analysis_depth.cost_multiplier())
            .unwrap_or(Decimal::ONE);
        let per_participant = Decimal::new(20, 2); // $0.20
        base * multiplier + per_participant * Decimal::from(self.participants.len())
    }

    #[must_use]
    pub fn total_phase_timeout(&self) -> u64 {
        PhaseType::ALL
            .iter()
            .filter(|p| self.is_phase_enabled(**p))
            .map(|p| self.phase_timeout(*p))
            .sum()
    }

    /// Validate cross-field invariants, returning the full list of violations.
    #[must_use]
    pub fn validate_constraints(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.world_time_advance == 0 {
            errors.push("world_time_advance must be > 0".to_string());
        }
        if self.max_execution_time_ms == 0 {
            errors.push("max_execution_time_ms must be > 0".to_string());
        }
        if !(0.0..=2.0).contains(&self.ai_temperature) {
            errors.push("ai_temperature must be within [0, 2]".to_string());
        }
        if self.ai_max_tokens == 0 {
            errors.push("ai_max_tokens must be > 0".to_string());
        }
        if let Some(cost) = self.max_ai_cost {
            if cost <= Decimal::ZERO {
                errors.push("max_ai_cost must be > 0 when set".to_string());
            }
        }
        if !self.excluded_agents.is_disjoint(&self.required_agents) {
            errors.push("excluded_agents and required_agents must be disjoint".to_string());
        }
        if self.phase_timeouts.values().any(|t| *t == 0) {
            errors.push("all phase_timeouts must be > 0".to_string());
        }
        if self.total_phase_timeout() > self.max_execution_time_ms {
            errors.push(format!(
                "sum of enabled phase timeouts ({}) exceeds max_execution_time_ms ({})",
                self.total_phase_timeout(),
                self.max_execution_time_ms
            ));
        }
        if let Some(max_cost) = self.max_ai_cost {
            if self.get_estimated_ai_cost() > max_cost {
                errors.push(format!(
                    "estimated AI cost ({}) exceeds max_ai_cost ({max_cost})",
                    self.get_estimated_ai_cost()
                ));
            }
        }
        let participants: HashSet<&String> = self.participants.iter().collect();
        if !self
            .required_agents
            .iter()
            .all(|agent| participants.contains(agent))
        {
            errors.push("required_agents must be a subset of participants".to_string());
        }
        if self.participants.is_empty() {
            errors.push("participants must not be empty".to_string());
        }
        if self.participants.len() > self.max_participants {
            errors.push(format!(
                "participants ({}) exceeds max_participants ({})",
                self.participants.len(),
                self.max_participants
            ));
        }
        let unique: HashSet<&String> = self.participants.iter().collect();
        if unique.len() != self.participants.len() {
            errors.push("participants must be unique".to_string());
        }
        if self.participants.iter().any(|p| p.trim().is_empty()) {
            errors.push("participants must not be blank".to_string());
        }

        errors
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validate_constraints().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid_with_participants() {
        let config = TurnConfiguration::create_default(vec!["alice".into(), "bob".into()]);
        assert!(config.is_valid(), "{:?}", config.validate_constraints());
    }

    #[test]
    fn rejects_required_agent_not_in_participants() {
        let mut config = TurnConfiguration::create_default(vec!["alice".into()]);
        config.required_agents.insert("carol".into());
        assert!(!config.is_valid());
    }

    #[test]
    fn ai_only_runs_for_brief_and_narrative() {
        let config = TurnConfiguration::create_default(vec!["alice".into()]);
        assert!(config.should_use_ai_for_phase(PhaseType::SubjectiveBrief));
        assert!(config.should_use_ai_for_phase(PhaseType::NarrativeIntegration));
        assert!(!config.should_use_ai_for_phase(PhaseType::WorldUpdate));
    }

    #[test]
    fn ai_disabled_turn_has_zero_estimated_cost() {
        let config = TurnConfiguration::create_ai_disabled(vec!["alice".into()]);
        assert_eq!(config.get_estimated_ai_cost(), Decimal::ZERO);
    }
}
