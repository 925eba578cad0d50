//! Turn identity value object.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::error::DomainError;

static CUSTOM_NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]{1,50}$").expect("static pattern is valid"));

const RESERVED_NAMES: [&str; 6] = ["test", "debug", "system", "admin", "root", "api"];

/// Immutable identifier for a turn, with optional sequence/campaign/name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnId {
    turn_uuid: Uuid,
    sequence_number: Option<u32>,
    campaign_id: Option<Uuid>,
    custom_name: Option<String>,
    created_at: DateTime<Utc>,
}

impl TurnId {
    /// Build a `TurnId`, validating sequence number and custom name.
    pub fn new(
        turn_uuid: Uuid,
        sequence_number: Option<u32>,
        campaign_id: Option<Uuid>,
        custom_name: Option<String>,
    ) -> Result<Self, DomainError> {
        if let Some(seq) = sequence_number {
            if seq < 1 {
                return Err(DomainError::ValidationFailed(
                    "sequence_number must be a positive integer".into(),
                ));
            }
        }
        if let Some(ref name) = custom_name {
            Self::validate_custom_name(name)?;
        }
        Ok(Self {
            turn_uuid,
            sequence_number,
            campaign_id,
            custom_name,
            created_at: Utc::now(),
        })
    }

    fn validate_custom_name(name: &str) -> Result<(), DomainError> {
        if !CUSTOM_NAME_PATTERN.is_match(name) {
            return Err(DomainError::ValidationFailed(format!(
                "custom_name '{name}' must contain only alphanumeric characters, hyphens, and \
                 underscores (1-50 characters)"
            )));
        }
        if RESERVED_NAMES.contains(&name.to_lowercase().as_str()) {
            return Err(DomainError::ValidationFailed(format!(
                "custom_name '{name}' is reserved"
            )));
        }
        Ok(())
    }

    /// Generate a fresh turn id with a random uuid.
    #[must_use]
    pub fn generate() -> Self {
        Self {
            turn_uuid: Uuid::new_v4(),
            sequence_number: None,
            campaign_id: None,
            custom_name: None,
            created_at: Utc::now(),
        }
    }

    /// Create a sequenced turn id for campaign progression.
    pub fn create_sequenced(sequence_number: u32, campaign_id: Option<Uuid>) -> Result<Self, DomainError> {
        Self::new(Uuid::new_v4(), Some(sequence_number), campaign_id, None)
    }

    /// Create a named turn id.
    pub fn create_named(custom_name: impl Into<String>, campaign_id: Option<Uuid>) -> Result<Self, DomainError> {
        Self::new(Uuid::new_v4(), None, campaign_id, Some(custom_name.into()))
    }

    #[must_use]
    pub const fn uuid(&self) -> Uuid {
        self.turn_uuid
    }

    #[must_use]
    pub const fn sequence_number(&self) -> Option<u32> {
        self.sequence_number
    }

    #[must_use]
    pub const fn campaign_id(&self) -> Option<Uuid> {
        self.campaign_id
    }

    #[must_use]
    pub fn custom_name(&self) -> Option<&str> {
        self.custom_name.as_deref()
    }

    #[must_use]
    pub const fn is_sequenced(&self) -> bool {
        self.sequence_number.is_some()
    }

    #[must_use]
    pub const fn is_named(&self) -> bool {
        self.custom_name.is_some()
    }

    #[must_use]
    pub fn belongs_to_campaign(&self, campaign_id: Uuid) -> bool {
        self.campaign_id == Some(campaign_id)
    }

    /// Short form for logging: `name(uuid8)`, `turn_N(uuid8)`, or bare `uuid8`.
    #[must_use]
    pub fn to_short_string(&self) -> String {
        let short = &self.turn_uuid.to_string()[..8];
        if let Some(ref name) = self.custom_name {
            format!("{name}({short})")
        } else if let Some(seq) = self.sequence_number {
            format!("turn_{seq}({short})")
        } else {
            short.to_string()
        }
    }

    /// Round-trippable pipe-delimited form: `uuid|seq|campaign|name`.
    #[must_use]
    pub fn to_full_string(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.turn_uuid,
            self.sequence_number.map_or_else(String::new, |s| s.to_string()),
            self.campaign_id.map_or_else(String::new, |c| c.to_string()),
            self.custom_name.clone().unwrap_or_default(),
        )
    }

    /// Human-readable display name for UIs.
    #[must_use]
    pub fn display_name(&self) -> String {
        match (&self.custom_name, self.sequence_number) {
            (Some(name), Some(seq)) => format!("{name} (Turn #{seq})"),
            (Some(name), None) => name.clone(),
            (None, Some(seq)) => format!("Turn #{seq}"),
            (None, None) => format!("Turn {}...", &self.turn_uuid.to_string()[..8]),
        }
    }

    /// Parse either a bare uuid or the pipe-delimited full form.
    pub fn parse_full(value: &str) -> Result<Self, DomainError> {
        let invalid = || DomainError::ValidationFailed(format!("invalid turn id string: {value}"));

        if !value.contains('|') {
            let uuid = Uuid::parse_str(value).map_err(|_| invalid())?;
            return Self::new(uuid, None, None, None);
        }

        let parts: Vec<&str> = value.split('|').collect();
        let turn_uuid = Uuid::parse_str(parts.first().ok_or_else(invalid)?).map_err(|_| invalid())?;
        let sequence_number = match parts.get(1) {
            Some(s) if !s.is_empty() => Some(s.parse::<u32>().map_err(|_| invalid())?),
            _ => None,
        };
        let campaign_id = match parts.get(2) {
            Some(s) if !s.is_empty() => Some(Uuid::parse_str(s).map_err(|_| invalid())?),
            _ => None,
        };
        let custom_name = match parts.get(3) {
            Some(s) if !s.is_empty() => Some((*s).to_string()),
            _ => None,
        };

        Self::new(turn_uuid, sequence_number, campaign_id, custom_name)
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_short_string())
    }
}

impl FromStr for TurnId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_full(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_full_string() {
        let id = TurnId::create_named("campaign-kickoff", None).unwrap();
        let parsed = TurnId::parse_full(&id.to_full_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn rejects_reserved_custom_name() {
        assert!(TurnId::create_named("admin", None).is_err());
    }

    #[test]
    fn rejects_zero_sequence_number() {
        assert!(TurnId::create_sequenced(0, None).is_err());
    }

    #[test]
    fn bare_uuid_parses() {
        let uuid = Uuid::new_v4();
        let parsed = TurnId::parse_full(&uuid.to_string()).unwrap();
        assert_eq!(parsed.uuid(), uuid);
        assert!(!parsed.is_named());
    }
}
