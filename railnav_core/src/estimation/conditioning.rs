// railnav_core/src/estimation/conditioning.rs

//! Preparation of raw accelerometer readings before they reach a motion
//! strategy: gravity removal, low-pass filtering, plausibility checks and
//! the at-rest calibration phase.

use crate::errors::{ConfigError, EstimationError};
use crate::messages::ImuReading;
use crate::types::{Axis, Vec3};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Subtracts the nominal gravity from the vertical axis.
pub fn remove_gravity(acceleration: &Vec3, axis: Axis, gravity: f64) -> Vec3 {
    let mut linear = *acceleration;
    linear[axis.index()] -= gravity;
    linear
}

// =========================================================================
// == Low-Pass Filter ==
// =========================================================================

/// Exponential smoothing: `filtered = alpha * filtered + (1 - alpha) * raw`.
#[derive(Debug, Clone)]
pub struct LowPassFilter {
    alpha: f64,
    value: Vec3,
}

impl LowPassFilter {
    pub fn new(alpha: f64) -> Result<Self, ConfigError> {
        ConfigError::check_range("low_pass_alpha", alpha, 0.0, 0.999)?;
        Ok(Self {
            alpha,
            value: Vec3::zeros(),
        })
    }

    pub fn apply(&mut self, raw: &Vec3) -> Vec3 {
        self.value = self.value * self.alpha + raw * (1.0 - self.alpha);
        self.value
    }

    /// Restarts the filter from zero.
    pub fn reset(&mut self) {
        self.value = Vec3::zeros();
    }
}

// =========================================================================
// == Plausibility Checks ==
// =========================================================================

/// Physical limits used to spot sensor glitches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationConfig {
    /// Largest plausible acceleration magnitude, gravity included (m/s^2).
    pub max_magnitude: f64,
    /// Largest plausible change between consecutive readings (m/s^2).
    pub max_jump: f64,
    /// After this many consecutive jump rejections the new level is accepted
    /// as genuine and becomes the reference.
    pub max_consecutive_rejections: u32,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_magnitude: 4.0 * crate::types::STANDARD_GRAVITY,
            max_jump: 20.0,
            max_consecutive_rejections: 5,
        }
    }
}

/// Rejects readings that are non-finite, too large, or jump too far from
/// the previous accepted reading.
#[derive(Debug, Clone)]
pub struct SampleValidator {
    config: ValidationConfig,
    last_accepted: Option<Vec3>,
    consecutive_rejections: u32,
}

impl SampleValidator {
    pub fn new(config: ValidationConfig) -> Result<Self, ConfigError> {
        ConfigError::check_range("validation.max_magnitude", config.max_magnitude, 0.0, f64::MAX)?;
        ConfigError::check_range("validation.max_jump", config.max_jump, 0.0, f64::MAX)?;
        Ok(Self {
            config,
            last_accepted: None,
            consecutive_rejections: 0,
        })
    }

    pub fn check(&mut self, reading: &ImuReading) -> Result<(), EstimationError> {
        check_finite(reading)?;

        let magnitude = reading.acceleration.norm();
        if magnitude > self.config.max_magnitude {
            return Err(EstimationError::ExcessiveMagnitude {
                magnitude,
                limit: self.config.max_magnitude,
            });
        }

        if let Some(last) = self.last_accepted {
            let delta = (reading.acceleration - last).norm();
            if delta > self.config.max_jump {
                self.consecutive_rejections += 1;
                if self.consecutive_rejections < self.config.max_consecutive_rejections {
                    return Err(EstimationError::ExcessiveJump {
                        delta,
                        limit: self.config.max_jump,
                    });
                }
                debug!(
                    delta,
                    rejections = self.consecutive_rejections,
                    "accepting sustained acceleration level as new reference"
                );
            }
        }

        self.consecutive_rejections = 0;
        self.last_accepted = Some(reading.acceleration);
        Ok(())
    }
}

/// Rejects readings with NaN or infinite components.
pub fn check_finite(reading: &ImuReading) -> Result<(), EstimationError> {
    let finite = reading.acceleration.iter().all(|v| v.is_finite())
        && reading.angular_rate.iter().all(|v| v.is_finite());
    if finite {
        Ok(())
    } else {
        Err(EstimationError::NonFiniteSample)
    }
}

// =========================================================================
// == At-Rest Calibration ==
// =========================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CalibrationConfig {
    /// Number of readings observed at rest before motion integration starts.
    pub warmup_samples: usize,
    /// Multiplier applied to the observed noise amplitude.
    pub margin: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            warmup_samples: 50,
            margin: 1.5,
        }
    }
}

/// What the warm-up window learned about the accelerometer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    /// Mean gravity-free reading at rest, per axis.
    pub bias: Vec3,
    /// Noise amplitude around the bias (times the margin), per axis.
    pub noise_ceiling: Vec3,
}

/// Learns per-axis bias and noise ceilings over a fixed window of readings
/// taken while the vehicle stands still.
#[derive(Debug, Clone)]
pub struct AutoCalibrator {
    config: CalibrationConfig,
    count: usize,
    sum: Vec3,
    min: Vec3,
    max: Vec3,
}

impl AutoCalibrator {
    pub fn new(config: CalibrationConfig) -> Result<Self, ConfigError> {
        if config.warmup_samples == 0 {
            return Err(ConfigError::ZeroCapacity {
                name: "calibration.warmup_samples",
            });
        }
        ConfigError::check_range("calibration.margin", config.margin, 1.0, f64::MAX)?;
        Ok(Self {
            config,
            count: 0,
            sum: Vec3::zeros(),
            min: Vec3::repeat(f64::INFINITY),
            max: Vec3::repeat(f64::NEG_INFINITY),
        })
    }

    pub fn samples_seen(&self) -> usize {
        self.count
    }

    /// Feeds one gravity-free reading. Returns the calibration once the
    /// window is full.
    pub fn observe(&mut self, linear_acceleration: &Vec3) -> Option<Calibration> {
        self.count += 1;
        self.sum += linear_acceleration;
        self.min = self.min.inf(linear_acceleration);
        self.max = self.max.sup(linear_acceleration);

        if self.count < self.config.warmup_samples {
            return None;
        }

        let bias = self.sum / self.count as f64;
        let spread = (self.max - bias).sup(&(bias - self.min));
        let calibration = Calibration {
            bias,
            noise_ceiling: spread * self.config.margin,
        };
        info!(
            samples = self.count,
            bias = ?calibration.bias.as_slice(),
            noise_ceiling = ?calibration.noise_ceiling.as_slice(),
            "accelerometer calibration complete"
        );
        Some(calibration)
    }
}
