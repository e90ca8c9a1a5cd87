// railnav_core/src/models/accelerometer.rs

use super::{ObservationMatrix, StateVector, ACCELERATION};
use crate::types::Vec3;
use nalgebra::Matrix3;

// --- Accelerometer Measurement Model ---
// z = H x + v, where z is the gravity-free acceleration and H picks the
// acceleration block of the state.
#[derive(Debug, Clone)]
pub struct AccelerometerModel {
    /// The 3x3 measurement noise covariance `R`.
    r_matrix: Matrix3<f64>,
}

impl AccelerometerModel {
    pub fn new(measurement_noise: f64) -> Self {
        Self {
            r_matrix: Matrix3::identity() * measurement_noise,
        }
    }

    pub fn r(&self) -> &Matrix3<f64> {
        &self.r_matrix
    }

    /// The measurement Jacobian. Constant, since the model is linear.
    pub fn observation_matrix(&self) -> ObservationMatrix {
        let mut h = ObservationMatrix::zeros();
        h.fixed_view_mut::<3, 3>(0, ACCELERATION)
            .copy_from(&Matrix3::identity());
        h
    }

    /// The ideal reading `h(x)` for a given state.
    pub fn predict_measurement(&self, x: &StateVector) -> Vec3 {
        x.fixed_rows::<3>(ACCELERATION).into_owned()
    }
}
