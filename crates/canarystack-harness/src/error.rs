//! Harness error type.

use canarystack_membrane::{StackError, Status};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("stack error: {0}")]
    Stack(#[from] StackError),
    #[error("unknown scenario '{0}'")]
    UnknownScenario(String),
    #[error("scenario '{name}' expected {expected} but observed {observed}")]
    ScenarioFailed {
        name: String,
        expected: Status,
        observed: Status,
    },
    #[error("soak diverged from the reference stack at step {step}: {detail}")]
    SoakDiverged { step: usize, detail: String },
}
