//! Scoring service request types
//!
//! The scoring service expects every request body wrapped in an
//! `input_data` envelope. Response bodies are passed through untouched.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Envelope the scoring service expects around request payloads
#[derive(Debug, Clone, Serialize)]
pub struct InputData<T> {
    pub input_data: T,
}

impl<T> InputData<T> {
    pub fn new(input_data: T) -> Self {
        Self { input_data }
    }
}

/// Risk tier filter for the customer listing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskFilter {
    #[default]
    All,
    Critical,
    High,
    Medium,
    Low,
}

impl RiskFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskFilter::All => "All",
            RiskFilter::Critical => "Critical",
            RiskFilter::High => "High",
            RiskFilter::Medium => "Medium",
            RiskFilter::Low => "Low",
        }
    }
}

impl fmt::Display for RiskFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "" | "all" => Ok(RiskFilter::All),
            "critical" => Ok(RiskFilter::Critical),
            "high" => Ok(RiskFilter::High),
            "medium" => Ok(RiskFilter::Medium),
            "low" => Ok(RiskFilter::Low),
            _ => Err(format!("Unknown risk filter: {}", s)),
        }
    }
}

/// Parameters for POST /list_customers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerQuery {
    #[serde(default)]
    pub risk_filter: RiskFilter,
    #[serde(default)]
    pub search: String,
    /// Score every returned customer with the live ensemble (slow)
    #[serde(default)]
    pub enrich_ml: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// Single customer reference used by lookup, analysis and insight calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRef {
    pub customer_id: String,
}

/// Parameters for POST /execute_intervention
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterventionRequest {
    pub customer_id: String,
    /// Recommended offer or action being triggered
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
