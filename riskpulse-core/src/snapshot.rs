//! Aggregate portfolio statistics as produced by the scoring service
//!
//! The payload is opaque to RiskPulse. It is validated as JSON once on the
//! way in and then carried around as the exact text the upstream produced,
//! so re-serializing it for transmission never reorders keys or reformats
//! numbers.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::value::RawValue;
use std::fmt;
use std::sync::Arc;

/// Opaque upstream statistics document (counts by tier, trends, totals)
#[derive(Clone)]
pub struct StatsSnapshot {
    raw: Arc<RawValue>,
}

impl StatsSnapshot {
    /// Parse a snapshot from JSON text
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let raw: Box<RawValue> = serde_json::from_str(text)?;
        Ok(Self { raw: raw.into() })
    }

    /// Parse a snapshot from a JSON response body
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let raw: Box<RawValue> = serde_json::from_slice(bytes)?;
        Ok(Self { raw: raw.into() })
    }

    /// Build a snapshot from an already parsed value
    pub fn from_value(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        let raw = serde_json::value::to_raw_value(value)?;
        Ok(Self { raw: raw.into() })
    }

    /// The JSON text exactly as received
    pub fn as_str(&self) -> &str {
        self.raw.get()
    }

    /// Parse into a generic JSON value for inspection
    pub fn to_value(&self) -> serde_json::Value {
        // Already validated on construction
        serde_json::from_str(self.raw.get()).unwrap_or(serde_json::Value::Null)
    }

    /// Look up a numeric field at a JSON pointer, e.g. `/summary/criticalRisk`
    pub fn pointer_i64(&self, pointer: &str) -> Option<i64> {
        self.to_value().pointer(pointer).and_then(|v| v.as_i64())
    }
}

impl PartialEq for StatsSnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for StatsSnapshot {}

impl fmt::Debug for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StatsSnapshot").field(&self.as_str()).finish()
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for StatsSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for StatsSnapshot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Box::<RawValue>::deserialize(deserializer)?;
        Ok(Self { raw: raw.into() })
    }
}
