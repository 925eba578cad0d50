//! Distributed tracing setup: span field conventions and the adaptive
//! sampling decision used before a turn's root span is opened.
//!
//! The turn engine doesn't ship its own OTLP/Jaeger exporter wiring here —
//! that belongs to whichever `tracing-subscriber` layer the binary installs
//! at startup (see `infrastructure::logging`). This module only carries the
//! sampling policy and the span-naming conventions that the rest of the
//! crate is expected to follow.

use crate::infrastructure::config::TracingConfig;

/// Reasons a trace was kept regardless of the configured base sampling rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingReason {
    Error,
    HighCost,
    LongDuration,
    BaseRate,
}

/// Inputs available when a turn finishes, used to decide in hindsight
/// whether its trace should have been kept at a boosted rate. Turn engines
/// that sample at span-start time can't see these yet, so this decision is
/// applied at the point the turn result is known and is used to decide
/// whether to force-flush the completed span's sampling decision downstream.
#[derive(Debug, Clone, Copy)]
pub struct SamplingInputs {
    pub had_error: bool,
    pub total_ai_cost_dollars: f64,
    pub duration_seconds: f64,
}

/// Decide whether a completed turn's trace should be kept, and why.
///
/// Errors are always kept. Spend over a dollar and slow turns are kept at an
/// elevated rate. Everything else falls back to the configured base rate.
#[must_use]
pub fn decide_sampling(inputs: SamplingInputs, config: &TracingConfig) -> (bool, SamplingReason) {
    if inputs.had_error {
        return (true, SamplingReason::Error);
    }
    if inputs.total_ai_cost_dollars > 1.0 {
        return (sample(0.5), SamplingReason::HighCost);
    }
    if inputs.duration_seconds > 10.0 {
        return (sample(0.8), SamplingReason::LongDuration);
    }
    (sample(config.default_sampling_rate), SamplingReason::BaseRate)
}

/// Deterministic enough for tests, not cryptographically sound: sampling
/// decisions don't need a CSPRNG, just a coin that respects the given rate.
fn sample(rate: f64) -> bool {
    if rate >= 1.0 {
        return true;
    }
    if rate <= 0.0 {
        return false;
    }
    fastrand_like() < rate
}

/// A minimal, dependency-free `[0, 1)` generator seeded from the thread-local
/// state of a `RandomState` hasher. Good enough for sampling decisions;
/// not used anywhere security-sensitive.
fn fastrand_like() -> f64 {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};
    let mut hasher = RandomState::new().build_hasher();
    hasher.write_u64(std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0) as u64);
    (hasher.finish() % 1_000_000) as f64 / 1_000_000.0
}

/// Standard span field names, kept in one place so every module spells them
/// the same way.
pub mod fields {
    pub const TURN_ID: &str = "turn_id";
    pub const PHASE: &str = "phase";
    pub const COMPENSATION_TYPE: &str = "compensation_type";
    pub const COLLABORATOR_TARGET: &str = "collaborator_target";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_are_always_sampled() {
        let config = TracingConfig::default();
        let (kept, reason) = decide_sampling(
            SamplingInputs { had_error: true, total_ai_cost_dollars: 0.0, duration_seconds: 0.1 },
            &config,
        );
        assert!(kept);
        assert_eq!(reason, SamplingReason::Error);
    }

    #[test]
    fn high_cost_turns_are_classified_even_without_error() {
        let config = TracingConfig::default();
        let (_, reason) = decide_sampling(
            SamplingInputs { had_error: false, total_ai_cost_dollars: 5.0, duration_seconds: 0.1 },
            &config,
        );
        assert_eq!(reason, SamplingReason::HighCost);
    }

    #[test]
    fn cheap_fast_turns_fall_back_to_base_rate() {
        let config = TracingConfig::default();
        let (_, reason) = decide_sampling(
            SamplingInputs { had_error: false, total_ai_cost_dollars: 0.0, duration_seconds: 0.2 },
            &config,
        );
        assert_eq!(reason, SamplingReason::BaseRate);
    }
}
