//! Hardware control error types

use std::time::Duration;
use thiserror::Error;

/// Errors from hardware control operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HardwareError {
    /// External control command exceeded its wall-clock timeout
    #[error("Command timed out")]
    Timeout,

    /// External control command exited nonzero (or could not be spawned)
    #[error("Command failed (exit code {})", exit_code_str(.0))]
    CommandFailed(Option<i32>),

    /// Circuit breaker is open for the active control method
    #[error("Circuit open for {method}, retry in {retry_in:.1?}")]
    CircuitOpen {
        method: &'static str,
        retry_in: Duration,
    },

    /// No control method was detected; only simulated mode is available
    #[error("No hardware control method available")]
    NoControlMethod,

    /// Invalid parameter value
    #[error("Invalid parameter: {0}")]
    InvalidParams(String),

    /// The controller worker task is gone (process shutting down)
    #[error("Hardware worker unavailable")]
    WorkerGone,
}

fn exit_code_str(code: &Option<i32>) -> String {
    match code {
        Some(c) => c.to_string(),
        None => "none".to_string(),
    }
}
