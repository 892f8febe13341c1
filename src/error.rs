//! Error taxonomy for the adaptive engine
//!
//! Everything here is fatal at construction time only. Once an optimizer is
//! running, degraded outcomes (slot exhaustion, no convergence) are ordinary
//! results and never surface as errors to container users.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("window size must be greater than zero")]
    ZeroWindow,

    #[error("convergence rate {rate} must not exceed window size {window}")]
    ConvergenceOutOfRange { rate: usize, window: usize },

    #[error("finished ratio must be a non-negative finite number, got {ratio}")]
    InvalidFinishedRatio { ratio: f64 },
}
