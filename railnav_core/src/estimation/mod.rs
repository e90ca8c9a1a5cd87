// railnav_core/src/estimation/mod.rs

use crate::errors::{ConfigError, EstimationError};
use crate::messages::ImuReading;
use crate::types::Vec3;
use dyn_clone::DynClone;
use serde::{Deserialize, Serialize};
use std::any::Any;

use self::conditioning::ValidationConfig;
use self::filters::inertial::{InertialConfig, InertialIntegrator};
use self::filters::kalman::{KalmanConfig, KalmanMotionEstimator};
use self::orientation::OrientationConfig;

/// Position and velocity of a vehicle in the sensor frame (m, m/s).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotionState {
    pub position: Vec3,
    pub velocity: Vec3,
}

/// The contract for any algorithm that turns accelerometer readings into
/// velocity and position. Strategies are interchangeable and picked once,
/// when a vehicle's estimator set is built.
pub trait MotionEstimator: DynClone + std::fmt::Debug + Send + Sync {
    /// Seeds the estimator with the first reading of a run. Nothing is
    /// integrated.
    fn initialize(&mut self, reading: &ImuReading);

    /// Advances the estimate by `dt` seconds. On error the previous state is
    /// kept untouched.
    fn process(&mut self, reading: &ImuReading, dt: f64) -> Result<(), EstimationError>;

    /// Returns the current best estimate.
    fn state(&self) -> MotionState;

    /// True while the strategy is still learning sensor characteristics and
    /// does not integrate yet.
    fn is_calibrating(&self) -> bool {
        false
    }

    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Allows for dynamic downcasting to access strategy-specific state.
    fn as_any(&self) -> &dyn Any;
}

dyn_clone::clone_trait_object!(MotionEstimator);

/// Selects and parameterizes the motion strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MotionStrategyConfig {
    Integrator(InertialConfig),
    Kalman(KalmanConfig),
}

impl Default for MotionStrategyConfig {
    fn default() -> Self {
        MotionStrategyConfig::Integrator(InertialConfig::default())
    }
}

impl MotionStrategyConfig {
    pub fn build(&self) -> Result<Box<dyn MotionEstimator>, ConfigError> {
        Ok(match self {
            MotionStrategyConfig::Integrator(config) => {
                Box::new(InertialIntegrator::new(config.clone())?)
            }
            MotionStrategyConfig::Kalman(config) => {
                Box::new(KalmanMotionEstimator::new(config.clone())?)
            }
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            MotionStrategyConfig::Integrator(_) => "integrator",
            MotionStrategyConfig::Kalman(_) => "kalman",
        }
    }
}

/// Everything needed to build the inertial part of one vehicle's estimator set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EstimatorConfig {
    pub orientation: OrientationConfig,
    pub motion: MotionStrategyConfig,
    /// Plausibility limits applied to every reading before either estimator
    /// sees it. Non-finite readings are rejected even without this section.
    pub validation: Option<ValidationConfig>,
}

pub mod conditioning;
pub mod filters;
pub mod kalman;
pub mod orientation;
