//! Error types shared by the simulator, payoff evaluator and aggregator.
//!
//! Every failure is returned to the caller as a [`SimulationError`]; validation
//! happens before the first random draw so a failed run never consumes RNG state.

/// Errors raised while configuring or running a simulation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimulationError {
    #[error("invalid parameter `{name}` = {value}: {constraint}")]
    InvalidParameter {
        name: String,
        value: f64,
        constraint: String,
    },

    #[error("unrecognized {kind}: `{value}`")]
    UnrecognizedName { kind: &'static str, value: String },

    #[error("covariance matrix is not positive semi-definite (min eigenvalue {min_eigenvalue:.3e})")]
    NonPositiveSemiDefinite { min_eigenvalue: f64 },

    #[error("shape mismatch: expected {expected}, found {found}")]
    ShapeMismatch { expected: String, found: String },

    #[error("empty sample collection")]
    EmptySample,

    #[error("non-finite value in {0}")]
    NonFinite(String),

    #[error("config error: {0}")]
    Config(String),
}

pub type SimResult<T> = Result<T, SimulationError>;

impl SimulationError {
    pub(crate) fn invalid(name: &str, value: f64, constraint: impl Into<String>) -> Self {
        SimulationError::InvalidParameter {
            name: name.to_string(),
            value,
            constraint: constraint.into(),
        }
    }

    pub(crate) fn shape(expected: impl Into<String>, found: impl Into<String>) -> Self {
        SimulationError::ShapeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }
}

impl From<toml::de::Error> for SimulationError {
    fn from(e: toml::de::Error) -> Self {
        SimulationError::Config(e.to_string())
    }
}

/// Parameter checks used by every validation routine in the crate.
pub(crate) mod validation {
    use super::{SimResult, SimulationError};

    pub fn finite(name: &str, value: f64) -> SimResult<()> {
        if !value.is_finite() {
            return Err(SimulationError::invalid(name, value, "must be finite"));
        }
        Ok(())
    }

    pub fn positive(name: &str, value: f64) -> SimResult<()> {
        finite(name, value)?;
        if value <= 0.0 {
            return Err(SimulationError::invalid(name, value, "must be > 0"));
        }
        Ok(())
    }

    pub fn non_negative(name: &str, value: f64) -> SimResult<()> {
        finite(name, value)?;
        if value < 0.0 {
            return Err(SimulationError::invalid(name, value, "must be >= 0"));
        }
        Ok(())
    }

    pub fn at_least_one(name: &str, count: usize) -> SimResult<()> {
        if count < 1 {
            return Err(SimulationError::invalid(name, count as f64, "must be >= 1"));
        }
        Ok(())
    }

    pub fn open_unit(name: &str, value: f64) -> SimResult<()> {
        finite(name, value)?;
        if value <= 0.0 || value >= 1.0 {
            return Err(SimulationError::invalid(name, value, "must be in (0, 1)"));
        }
        Ok(())
    }
}
