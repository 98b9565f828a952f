//! Scenario driver for canarystack.
//!
//! This crate provides:
//! - Scenarios: the demo run plus one corruption injection per detector
//! - Soak: seeded random operations checked against a `Vec` model
//! - Structured log: JSONL evidence records with pinned dump digests

#![forbid(unsafe_code)]

pub mod error;
pub mod scenarios;
pub mod soak;
pub mod structured_log;

pub use error::HarnessError;
pub use scenarios::{Scenario, ScenarioReport, resolve_profile, run_scenario};
pub use soak::{SoakPlan, SoakReport, XorShift64, run_soak};
pub use structured_log::{LogEmitter, LogEntry, LogLevel, Outcome};
