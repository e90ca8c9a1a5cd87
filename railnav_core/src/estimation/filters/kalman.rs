// railnav_core/src/estimation/filters/kalman.rs

use std::any::Any;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{ConfigError, EstimationError};
use crate::estimation::conditioning::remove_gravity;
use crate::estimation::kalman::{
    kalman_predict, kalman_update, KalmanPredictParams, KalmanState, KalmanUpdateParams,
};
use crate::estimation::{MotionEstimator, MotionState};
use crate::messages::ImuReading;
use crate::models::accelerometer::AccelerometerModel;
use crate::models::constant_acceleration::ConstantAccelerationModel;
use crate::models::{StateMatrix, POSITION, VELOCITY};
use crate::types::{Axis, STANDARD_GRAVITY};
use crate::utils::linalg::DEFAULT_SINGULAR_EPSILON;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KalmanConfig {
    /// Diagonal of the process noise `Q`.
    pub process_noise: f64,
    /// Diagonal of the measurement noise `R`.
    pub measurement_noise: f64,
    /// Diagonal of the initial covariance `P0`.
    pub initial_covariance: f64,
    pub gravity: f64,
    pub gravity_axis: Axis,
    /// Innovation covariances with a smaller determinant are not inverted.
    pub singular_epsilon: f64,
}

impl Default for KalmanConfig {
    fn default() -> Self {
        Self {
            process_noise: 0.01,
            measurement_noise: 0.1,
            initial_covariance: 1.0,
            gravity: STANDARD_GRAVITY,
            gravity_axis: Axis::Z,
            singular_epsilon: DEFAULT_SINGULAR_EPSILON,
        }
    }
}

/// A linear Kalman filter over position, velocity and acceleration with a
/// constant-acceleration motion model, corrected by the accelerometer.
#[derive(Debug, Clone)]
pub struct KalmanMotionEstimator {
    config: KalmanConfig,
    state: KalmanState,
    /// The process noise covariance matrix (Q).
    process_noise_q: StateMatrix,
    dynamics: ConstantAccelerationModel,
    measurement: AccelerometerModel,
    skipped_updates: u64,
}

impl KalmanMotionEstimator {
    pub fn new(config: KalmanConfig) -> Result<Self, ConfigError> {
        ConfigError::check_range("kalman.process_noise", config.process_noise, 0.0, f64::MAX)?;
        ConfigError::check_range(
            "kalman.measurement_noise",
            config.measurement_noise,
            0.0,
            f64::MAX,
        )?;
        ConfigError::check_range(
            "kalman.initial_covariance",
            config.initial_covariance,
            0.0,
            f64::MAX,
        )?;
        ConfigError::check_range("kalman.gravity", config.gravity, 0.0, f64::MAX)?;
        ConfigError::check_range("kalman.singular_epsilon", config.singular_epsilon, 0.0, 1.0)?;

        let dynamics = ConstantAccelerationModel;
        Ok(Self {
            state: KalmanState::new(config.initial_covariance),
            process_noise_q: dynamics.process_noise(config.process_noise),
            dynamics,
            measurement: AccelerometerModel::new(config.measurement_noise),
            skipped_updates: 0,
            config,
        })
    }

    /// Full filter state, including acceleration and covariance.
    pub fn filter_state(&self) -> &KalmanState {
        &self.state
    }

    /// Number of corrections skipped because the innovation covariance was
    /// singular.
    pub fn skipped_updates(&self) -> u64 {
        self.skipped_updates
    }
}

impl MotionEstimator for KalmanMotionEstimator {
    fn initialize(&mut self, _reading: &ImuReading) {
        self.state = KalmanState::new(self.config.initial_covariance);
    }

    fn process(&mut self, reading: &ImuReading, dt: f64) -> Result<(), EstimationError> {
        if !(dt > 0.0) {
            return Err(EstimationError::NonPositiveTimeStep { dt });
        }

        // 1. Predict.
        let transition = self.dynamics.transition(dt);
        let predicted = kalman_predict(
            &self.state,
            &KalmanPredictParams {
                transition: &transition,
                process_noise_q: &self.process_noise_q,
            },
        );

        // 2. Correct with the gravity-free accelerometer reading.
        let z = remove_gravity(
            &reading.acceleration,
            self.config.gravity_axis,
            self.config.gravity,
        );
        let params = KalmanUpdateParams {
            model: &self.measurement,
            z: &z,
            singular_epsilon: self.config.singular_epsilon,
        };
        self.state = match kalman_update(&predicted, &params) {
            Some(corrected) => corrected,
            None => {
                self.skipped_updates += 1;
                debug!(
                    skipped = self.skipped_updates,
                    "singular innovation covariance, keeping prediction"
                );
                predicted
            }
        };
        Ok(())
    }

    fn state(&self) -> MotionState {
        MotionState {
            position: self.state.x.fixed_rows::<3>(POSITION).into_owned(),
            velocity: self.state.x.fixed_rows::<3>(VELOCITY).into_owned(),
        }
    }

    fn name(&self) -> &'static str {
        "kalman"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
