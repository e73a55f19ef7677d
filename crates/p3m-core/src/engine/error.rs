use thiserror::Error;

use super::config::ConfigError;
use crate::core::interpolation::InterpolationError;

#[derive(Debug, Error)]
pub enum P3mError {
    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Interpolation table error: {source}")]
    Interpolation {
        #[from]
        source: InterpolationError,
    },

    #[error(
        "Influence function is not finite at frequency ({nx}, {ny}, {nz}): {value}; check mesh, alpha and box length"
    )]
    DegenerateInfluence {
        nx: usize,
        ny: usize,
        nz: usize,
        value: f64,
    },

    #[error("Mesh of size {found} does not match the configured mesh of {expected}")]
    MeshMismatch { expected: usize, found: usize },

    #[error("Assignment cache holds {found} particles but {expected} were expected")]
    CacheMismatch { expected: usize, found: usize },

    #[error("Assignment cache was built without derivative weights")]
    MissingDerivatives,

    #[error("Interpolation table of order {found} does not match cao {expected}")]
    InterpolationMismatch { expected: usize, found: usize },
}
