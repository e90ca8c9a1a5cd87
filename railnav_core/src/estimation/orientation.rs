// railnav_core/src/estimation/orientation.rs

//! Roll/pitch/yaw from a complementary filter.
//!
//! The gyroscope is integrated for short-term accuracy and blended with the
//! tilt implied by the accelerometer's gravity reading, which corrects roll
//! and pitch drift over the long term. Yaw has no accelerometer reference and
//! is integrated from the gyroscope alone, so it drifts without bound.

use crate::errors::{ConfigError, EstimationError};
use crate::messages::ImuReading;
use crate::types::{AngleUnit, Vec3, STANDARD_GRAVITY};
use crate::utils::serde_helpers;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// Lowest accepted gyroscope weight of the complementary filter.
pub const MIN_GYRO_WEIGHT: f64 = 0.95;
/// Highest accepted gyroscope weight of the complementary filter.
pub const MAX_GYRO_WEIGHT: f64 = 0.98;

/// Orientation in degrees, every angle inside (-180, 180].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OrientationState {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

/// Wraps an angle in degrees into (-180, 180].
///
/// Angles already in range and non-finite input are returned unchanged.
pub fn normalize_angle(angle: f64) -> f64 {
    if !angle.is_finite() || (angle > -180.0 && angle <= 180.0) {
        return angle;
    }
    // rem_euclid lands in [0, 360] (360 only through rounding).
    let wrapped = angle.rem_euclid(360.0);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

/// Tuning of the complementary filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrientationConfig {
    /// Weight of the integrated gyroscope angle, in [0.95, 0.98].
    pub gyro_weight: f64,
    /// Unit of the incoming gyroscope rates.
    pub gyro_unit: AngleUnit,
    /// Constant gyroscope offset, subtracted from every reading (gyro unit).
    #[serde(with = "serde_helpers::vec3_from_array")]
    pub gyro_bias: Vec3,
    /// Offsets subtracted from the accelerometer tilt angles `[x, y]`, in degrees.
    pub accel_angle_bias: [f64; 2],
    /// Gravity used to express acceleration in g.
    pub gravity: f64,
}

impl Default for OrientationConfig {
    fn default() -> Self {
        Self {
            gyro_weight: 0.96,
            gyro_unit: AngleUnit::Degrees,
            // Bench calibration of the reference IMU.
            gyro_bias: Vec3::new(-0.56, 2.0, -0.79),
            accel_angle_bias: [0.58, 1.58],
            gravity: STANDARD_GRAVITY,
        }
    }
}

/// Complementary-filter orientation estimator for a single vehicle.
#[derive(Debug, Clone)]
pub struct ComplementaryFilter {
    config: OrientationConfig,
    state: OrientationState,
    initialized: bool,
}

impl ComplementaryFilter {
    pub fn new(config: OrientationConfig) -> Result<Self, ConfigError> {
        ConfigError::check_range(
            "orientation.gyro_weight",
            config.gyro_weight,
            MIN_GYRO_WEIGHT,
            MAX_GYRO_WEIGHT,
        )?;
        ConfigError::check_range("orientation.gravity", config.gravity, 1e-3, f64::MAX)?;

        Ok(Self {
            config,
            state: OrientationState::default(),
            initialized: false,
        })
    }

    pub fn state(&self) -> OrientationState {
        self.state
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Marks the filter as seeded. The first reading of a run only starts
    /// the clock; nothing is integrated.
    pub fn initialize(&mut self) {
        self.initialized = true;
    }

    /// Roll and pitch implied by the gravity direction, in degrees, with the
    /// calibration offsets removed.
    ///
    /// `atan2` with a non-negative second argument equals `atan(a / b)` and
    /// stays defined when the horizontal components vanish.
    pub fn accelerometer_tilt(&self, acceleration: &Vec3) -> Vector2<f64> {
        let g = acceleration / self.config.gravity;
        let angle_x = g.y.atan2((g.x * g.x + g.z * g.z).sqrt()).to_degrees();
        let angle_y = (-g.x).atan2((g.y * g.y + g.z * g.z).sqrt()).to_degrees();
        Vector2::new(
            angle_x - self.config.accel_angle_bias[0],
            angle_y - self.config.accel_angle_bias[1],
        )
    }

    /// Advances the orientation by `dt` seconds.
    pub fn update(
        &mut self,
        reading: &ImuReading,
        dt: f64,
    ) -> Result<OrientationState, EstimationError> {
        if !(dt > 0.0) {
            return Err(EstimationError::NonPositiveTimeStep { dt });
        }

        let tilt = self.accelerometer_tilt(&reading.acceleration);
        let rate = (reading.angular_rate - self.config.gyro_bias)
            .map(|r| self.config.gyro_unit.to_degrees(r));
        let w = self.config.gyro_weight;

        let roll = w * (self.state.roll + rate.x * dt) + (1.0 - w) * tilt.x;
        let pitch = w * (self.state.pitch + rate.y * dt) + (1.0 - w) * tilt.y;
        let yaw = self.state.yaw + rate.z * dt;

        self.state = OrientationState {
            roll: normalize_angle(roll),
            pitch: normalize_angle(pitch),
            yaw: normalize_angle(yaw),
        };
        self.initialized = true;
        Ok(self.state)
    }
}
