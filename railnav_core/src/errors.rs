// railnav_core/src/errors.rs

use thiserror::Error;

/// Why a single sample was not applied to an estimator.
///
/// None of these are fatal: the estimator keeps its last valid state and the
/// caller simply gets "no update" for that cycle.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EstimationError {
    #[error("non-positive time step ({dt} s), integration skipped")]
    NonPositiveTimeStep { dt: f64 },

    #[error("sample contains non-finite values")]
    NonFiniteSample,

    #[error("acceleration magnitude {magnitude:.2} m/s^2 exceeds the {limit:.2} m/s^2 ceiling")]
    ExcessiveMagnitude { magnitude: f64, limit: f64 },

    #[error("acceleration jump of {delta:.2} m/s^2 exceeds the {limit:.2} m/s^2 ceiling")]
    ExcessiveJump { delta: f64, limit: f64 },
}

/// Errors raised while building a `TrackProfile`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackProfileError {
    #[error("track profile has no sections")]
    Empty,

    #[error("section {index} has invalid length {length}")]
    InvalidLength { index: usize, length: f64 },

    #[error("section {index} has invalid marker interval {interval}")]
    InvalidInterval { index: usize, interval: f64 },
}

/// Errors raised when tuning parameters are outside their valid range.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{name} must lie in [{min}, {max}], got {value}")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{name} must be at least 1")]
    ZeroCapacity { name: &'static str },
}

impl ConfigError {
    /// Checks `value` against the closed range `[min, max]`.
    pub fn check_range(name: &'static str, value: f64, min: f64, max: f64) -> Result<(), Self> {
        if value.is_finite() && (min..=max).contains(&value) {
            Ok(())
        } else {
            Err(ConfigError::OutOfRange {
                name,
                value,
                min,
                max,
            })
        }
    }
}

/// Errors raised while building a vehicle's estimator set from configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error("invalid tuning: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid track profile: {0}")]
    Track(#[from] TrackProfileError),
}
