use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Conditions raised while building, validating and pricing resource trees.
///
/// Nothing here is fatal to an estimate: callers log reservation, legacy and
/// estimation conditions as warnings and carry on with a fallback.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error(
        "Invalid {field}, ignoring reserved options. Expected: {}. Got: {value}",
        .accepted.join(", ")
    )]
    InvalidReservationParameter {
        field: &'static str,
        value: String,
        accepted: Vec<&'static str>,
    },

    #[error(
        "Reserved node type {node_type} uses the legacy payment option {payment_option}, \
         which may not be offered in every region; the price may be missing"
    )]
    UnsupportedLegacyCombination {
        node_type: String,
        payment_option: String,
    },

    #[error("Invalid cost component {name}: {reason}")]
    InvalidCostComponent { name: String, reason: String },

    #[error("Invalid tier bounds: {reason}")]
    InvalidTierBounds { reason: String },

    #[error("Error estimating usage for resource {resource}: {reason}")]
    EstimateFailed { resource: String, reason: String },

    #[error("Usage estimation for resource {resource} timed out after {}s", .timeout.as_secs_f64())]
    EstimateTimedOut { resource: String, timeout: Duration },

    #[error("Usage estimation for resource {resource} was cancelled")]
    EstimateCancelled { resource: String },

    #[error("Invalid config at {}: {reason}", .path.display())]
    Config { path: PathBuf, reason: String },

    #[error("Invalid price catalog at {}: {reason}", .path.display())]
    Catalog { path: PathBuf, reason: String },

    #[error("Failed to read {}: {reason}", .path.display())]
    Io { path: PathBuf, reason: String },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            reason: err.to_string(),
        }
    }
}
