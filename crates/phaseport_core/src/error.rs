//! Error taxonomy of the simulation engine.
//!
//! Every condition here is local and recoverable: callers receive it as an
//! explicit `Result`, and a session that failed can always be reset.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SimulationError {
    /// A continuous step produced a non-finite coordinate.
    #[error("numerical divergence at t = {time}: coordinate {index} is not finite")]
    NumericalDivergence { time: f64, index: usize },

    #[error("parameter `{name}` = {value} is outside its valid range [{min}, {max}]")]
    InvalidParameter {
        name: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("unknown parameter `{name}`")]
    UnknownParameter { name: String },

    #[error("state dimension mismatch: expected {expected}, got {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("invalid request: {reason}")]
    InvalidRequest { reason: String },
}

impl SimulationError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        SimulationError::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// True for the divergence status that freezes a running session.
    pub fn is_divergence(&self) -> bool {
        matches!(self, SimulationError::NumericalDivergence { .. })
    }
}

pub type Result<T, E = SimulationError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_values() {
        let err = SimulationError::InvalidParameter {
            name: "rho".to_string(),
            value: 80.0,
            min: 0.1,
            max: 50.0,
        };
        let message = err.to_string();
        assert!(message.contains("rho"), "{message}");
        assert!(message.contains("80"), "{message}");

        let err = SimulationError::DimensionMismatch {
            expected: 3,
            found: 2,
        };
        assert_eq!(
            err.to_string(),
            "state dimension mismatch: expected 3, got 2"
        );
    }

    #[test]
    fn only_divergence_reports_as_divergence() {
        assert!(SimulationError::NumericalDivergence {
            time: 1.0,
            index: 0
        }
        .is_divergence());
        assert!(!SimulationError::invalid("nope").is_divergence());
    }
}
