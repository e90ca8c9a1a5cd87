// railnav_core/src/estimation/kalman.rs

//! Pure predict/update steps of the linear Kalman filter over the 9-element
//! constant-acceleration state. Neither function has side effects.

use crate::models::accelerometer::AccelerometerModel;
use crate::models::{StateMatrix, StateVector};
use crate::types::Vec3;
use crate::utils::linalg::{invert_3x3, symmetrize};

/// Mean and covariance of the filter.
#[derive(Debug, Clone, PartialEq)]
pub struct KalmanState {
    pub x: StateVector,
    pub p: StateMatrix,
}

impl KalmanState {
    /// Zero state with covariance `p0 * I`.
    pub fn new(initial_covariance: f64) -> Self {
        Self {
            x: StateVector::zeros(),
            p: StateMatrix::identity() * initial_covariance,
        }
    }
}

/// Parameters of one prediction step.
pub struct KalmanPredictParams<'a> {
    pub transition: &'a StateMatrix,
    pub process_noise_q: &'a StateMatrix,
}

/// Parameters of one measurement update.
pub struct KalmanUpdateParams<'a> {
    pub model: &'a AccelerometerModel,
    pub z: &'a Vec3,
    pub singular_epsilon: f64,
}

/// `x' = F x`, `P' = F P F^T + Q`, then P is symmetrized.
pub fn kalman_predict(current: &KalmanState, params: &KalmanPredictParams) -> KalmanState {
    let f = params.transition;
    let x = f * current.x;
    let mut p = f * current.p * f.transpose() + params.process_noise_q;
    symmetrize(&mut p);
    KalmanState { x, p }
}

/// Standard Kalman correction. Returns `None` when the innovation covariance
/// is singular, in which case the caller keeps the prediction.
pub fn kalman_update(predicted: &KalmanState, params: &KalmanUpdateParams) -> Option<KalmanState> {
    let h = params.model.observation_matrix();
    let y = params.z - params.model.predict_measurement(&predicted.x); // Innovation

    let s = h * predicted.p * h.transpose() + params.model.r();
    let s_inv = invert_3x3(&s, params.singular_epsilon)?;

    let k_gain = predicted.p * h.transpose() * s_inv;
    let x = predicted.x + k_gain * y;
    let i_kh = StateMatrix::identity() - k_gain * h;
    let mut p = i_kh * predicted.p;
    symmetrize(&mut p);

    Some(KalmanState { x, p })
}
