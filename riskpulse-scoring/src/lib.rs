//! Scoring service integration for RiskPulse
//!
//! This crate provides a client for the external machine-learning scoring
//! service: aggregate dashboard statistics for the live stream, plus the
//! customer, analysis, narrative and intervention endpoints used by the
//! rest of the dashboard.

pub mod client;
pub mod types;

pub use client::ScoringClient;
pub use types::{CustomerQuery, InterventionRequest, RiskFilter};
