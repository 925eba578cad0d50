//! In-memory registry of turns, keyed by turn id.
//!
//! Holds every turn the process has created, completed or not, so the HTTP
//! status/list endpoints can answer without re-running anything. Guarded by
//! a single `tokio::sync::RwLock`; callers are expected to clone a `Turn` out
//! (it's a plain value object) rather than hold the guard across an await.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::error::DomainError;
use crate::domain::models::turn::Turn;

#[derive(Default)]
pub struct TurnRegistry {
    turns: RwLock<HashMap<Uuid, Turn>>,
}

impl TurnRegistry {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn insert(&self, turn: Turn) {
        self.turns.write().await.insert(turn.turn_id.uuid(), turn);
    }

    pub async fn get(&self, turn_id: Uuid) -> Result<Turn, DomainError> {
        self.turns
            .read()
            .await
            .get(&turn_id)
            .cloned()
            .ok_or(DomainError::TurnNotFound(turn_id))
    }

    /// Apply `update` to the stored turn and persist the result, returning it.
    /// `update` runs outside the lock so a long-running pipeline step never
    /// holds it; only the swap in/out is guarded.
    pub async fn replace(&self, turn: Turn) -> Turn {
        let turn_id = turn.turn_id.uuid();
        self.turns.write().await.insert(turn_id, turn.clone());
        turn
    }

    pub async fn list(&self) -> Vec<Turn> {
        self.turns.read().await.values().cloned().collect()
    }

    pub async fn remove(&self, turn_id: Uuid) -> Option<Turn> {
        self.turns.write().await.remove(&turn_id)
    }

    pub async fn active_count(&self) -> usize {
        self.turns
            .read()
            .await
            .values()
            .filter(|t| !t.state.is_terminal())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::turn_configuration::TurnConfiguration;

    #[tokio::test]
    async fn insert_then_get_round_trips() {
        let registry = TurnRegistry::new();
        let turn = Turn::create(TurnConfiguration::create_default(vec!["alice".into()])).unwrap();
        let turn_id = turn.turn_id.uuid();
        registry.insert(turn).await;
        let fetched = registry.get(turn_id).await.unwrap();
        assert_eq!(fetched.turn_id.uuid(), turn_id);
    }

    #[tokio::test]
    async fn get_missing_turn_errors() {
        let registry = TurnRegistry::new();
        assert!(registry.get(Uuid::new_v4()).await.is_err());
    }
}
