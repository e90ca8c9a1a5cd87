// railnav_core/src/estimation/filters/inertial.rs

use std::any::Any;

use nalgebra::SVector;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{ConfigError, EstimationError};
use crate::estimation::conditioning::{
    remove_gravity, AutoCalibrator, Calibration, CalibrationConfig, LowPassFilter,
};
use crate::estimation::{MotionEstimator, MotionState};
use crate::messages::ImuReading;
use crate::types::{Axis, Vec3, STANDARD_GRAVITY};
use crate::utils::integrators::{IntegrationScheme, Integrator, RK2, RK4};

/// `[px, py, pz, vx, vy, vz]`, the state the Runge-Kutta schemes advance.
type KinematicVector = SVector<f64, 6>;

/// Tuning of the dead-reckoning integrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InertialConfig {
    /// Nominal gravity removed from `gravity_axis`, in m/s^2.
    pub gravity: f64,
    pub gravity_axis: Axis,
    /// Weight of the previous filtered value in the low-pass filter.
    pub low_pass_alpha: f64,
    /// Filtered accelerations at or below this magnitude count as "at rest"
    /// for that axis (m/s^2).
    pub stationary_threshold: f64,
    /// Multiplier applied to the velocity every cycle.
    pub damping: f64,
    /// Velocity components below this magnitude snap to zero (m/s).
    pub min_velocity: f64,
    /// Optional per-axis speed ceiling (m/s).
    pub max_speed: Option<f64>,
    pub scheme: IntegrationScheme,
    /// When present, the first readings are used to learn bias and noise
    /// before any motion is integrated.
    pub calibration: Option<CalibrationConfig>,
}

impl Default for InertialConfig {
    fn default() -> Self {
        Self {
            gravity: STANDARD_GRAVITY,
            gravity_axis: Axis::Z,
            low_pass_alpha: 0.8,
            stationary_threshold: 0.015,
            damping: 0.9,
            min_velocity: 0.001,
            max_speed: None,
            scheme: IntegrationScheme::Euler,
            calibration: None,
        }
    }
}

/// Integrates gravity-free, low-pass-filtered acceleration into velocity and
/// position, with a per-axis zero-velocity update and velocity damping to
/// keep accelerometer bias from running away.
#[derive(Debug, Clone)]
pub struct InertialIntegrator {
    config: InertialConfig,
    low_pass: LowPassFilter,
    calibrator: Option<AutoCalibrator>,
    calibration: Option<Calibration>,
    state: MotionState,
}

impl InertialIntegrator {
    pub fn new(config: InertialConfig) -> Result<Self, ConfigError> {
        ConfigError::check_range("integrator.gravity", config.gravity, 0.0, f64::MAX)?;
        ConfigError::check_range(
            "integrator.stationary_threshold",
            config.stationary_threshold,
            0.0,
            f64::MAX,
        )?;
        ConfigError::check_range("integrator.damping", config.damping, 0.0, 1.0)?;
        ConfigError::check_range("integrator.min_velocity", config.min_velocity, 0.0, f64::MAX)?;
        if let Some(max_speed) = config.max_speed {
            ConfigError::check_range("integrator.max_speed", max_speed, 0.0, f64::MAX)?;
        }

        let low_pass = LowPassFilter::new(config.low_pass_alpha)?;
        let calibrator = config
            .calibration
            .clone()
            .map(AutoCalibrator::new)
            .transpose()?;

        Ok(Self {
            config,
            low_pass,
            calibrator,
            calibration: None,
            state: MotionState::default(),
        })
    }

    /// The learned calibration, once the warm-up window has completed.
    pub fn calibration(&self) -> Option<&Calibration> {
        self.calibration.as_ref()
    }

    /// Per-axis stationary threshold, raised to the learned noise ceiling
    /// after calibration.
    fn thresholds(&self) -> Vec3 {
        let configured = Vec3::repeat(self.config.stationary_threshold);
        match &self.calibration {
            Some(c) => configured.sup(&c.noise_ceiling),
            None => configured,
        }
    }

    /// Damping, minimum-velocity snap and the optional speed ceiling.
    fn condition_velocity(&self, velocity: Vec3) -> Vec3 {
        velocity.map(|v| {
            let damped = v * self.config.damping;
            if damped.abs() < self.config.min_velocity {
                return 0.0;
            }
            match self.config.max_speed {
                Some(limit) => damped.clamp(-limit, limit),
                None => damped,
            }
        })
    }
}

impl MotionEstimator for InertialIntegrator {
    fn initialize(&mut self, _reading: &ImuReading) {
        self.state = MotionState::default();
        self.low_pass.reset();
    }

    fn process(&mut self, reading: &ImuReading, dt: f64) -> Result<(), EstimationError> {
        if !(dt > 0.0) {
            return Err(EstimationError::NonPositiveTimeStep { dt });
        }

        let linear = remove_gravity(
            &reading.acceleration,
            self.config.gravity_axis,
            self.config.gravity,
        );

        // --- Warm-up: learn bias and noise, integrate nothing ---
        if let Some(calibrator) = self.calibrator.as_mut() {
            if let Some(calibration) = calibrator.observe(&linear) {
                self.calibration = Some(calibration);
                self.calibrator = None;
            }
            return Ok(());
        }

        let bias = self.calibration.map(|c| c.bias).unwrap_or_else(Vec3::zeros);
        let filtered = self.low_pass.apply(&(linear - bias));

        // --- Zero-velocity update ---
        let thresholds = self.thresholds();
        let mut velocity = self.state.velocity;
        let mut acceleration = filtered;
        for i in 0..3 {
            if filtered[i].abs() <= thresholds[i] {
                velocity[i] = 0.0;
                acceleration[i] = 0.0;
            }
        }

        let position = self.state.position;
        let (position, velocity) = match self.config.scheme {
            IntegrationScheme::Euler => {
                let velocity = self.condition_velocity(velocity + acceleration * dt);
                (position + velocity * dt, velocity)
            }
            IntegrationScheme::Heun | IntegrationScheme::RungeKutta4 => {
                let integrator: &dyn Integrator<f64, 6> = match self.config.scheme {
                    IntegrationScheme::Heun => &RK2,
                    _ => &RK4,
                };
                let derivative = |x: &KinematicVector, _t: f64| {
                    KinematicVector::new(
                        x[3],
                        x[4],
                        x[5],
                        acceleration.x,
                        acceleration.y,
                        acceleration.z,
                    )
                };
                let mut x0 = KinematicVector::zeros();
                x0.fixed_rows_mut::<3>(0).copy_from(&position);
                x0.fixed_rows_mut::<3>(3).copy_from(&velocity);
                let x1 = integrator.step(&derivative, &x0, 0.0, dt);
                (
                    x1.fixed_rows::<3>(0).into_owned(),
                    self.condition_velocity(x1.fixed_rows::<3>(3).into_owned()),
                )
            }
        };

        debug!(
            dt,
            filtered = ?filtered.as_slice(),
            velocity = ?velocity.as_slice(),
            "inertial integration step"
        );
        self.state = MotionState { position, velocity };
        Ok(())
    }

    fn state(&self) -> MotionState {
        self.state
    }

    fn is_calibrating(&self) -> bool {
        self.calibrator.is_some()
    }

    fn name(&self) -> &'static str {
        "integrator"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
