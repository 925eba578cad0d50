//! Free-form metadata value variant.
//!
//! The original system carries many untyped bag-of-values maps for metadata,
//! phase results, and event payloads. Rather than reaching for
//! `serde_json::Value` everywhere, this crate uses a small closed variant so
//! that the common shapes (string, number, bool, list, nested map) stay
//! structurally typed while remaining open for extension.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A metadata value: string, number, bool, list, or nested map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    String(String),
    Number(f64),
    Bool(bool),
    List(Vec<MetadataValue>),
    Map(Metadata),
}

/// A string-keyed bag of [`MetadataValue`]s.
pub type Metadata = HashMap<String, MetadataValue>;

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<usize> for MetadataValue {
    fn from(value: usize) -> Self {
        #[allow(clippy::cast_precision_loss)]
        Self::Number(value as f64)
    }
}

impl From<Vec<MetadataValue>> for MetadataValue {
    fn from(value: Vec<MetadataValue>) -> Self {
        Self::List(value)
    }
}

impl From<Vec<String>> for MetadataValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value.into_iter().map(Self::String).collect())
    }
}

/// Build a [`Metadata`] map from `(key, value)` pairs.
#[macro_export]
macro_rules! metadata {
    ($($key:expr => $value:expr),* $(,)?) => {{
        let mut map: $crate::domain::models::metadata::Metadata = ::std::collections::HashMap::new();
        $(map.insert($key.to_string(), $crate::domain::models::metadata::MetadataValue::from($value));)*
        map
    }};
}
