// railnav_core/src/models/constant_acceleration.rs

use super::{StateMatrix, ACCELERATION, POSITION, VELOCITY};
use nalgebra::Matrix3;

// --- Constant Acceleration Model ---
// Assumes the vehicle keeps a slowly changing acceleration between samples.
// Any change in acceleration is left to the process noise.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConstantAccelerationModel;

impl ConstantAccelerationModel {
    /// The discrete transition matrix `F(dt)`:
    /// `p += dt * v + dt^2 / 2 * a`, `v += dt * a`, `a` persists.
    pub fn transition(&self, dt: f64) -> StateMatrix {
        let mut f = StateMatrix::identity();
        let i3 = Matrix3::<f64>::identity();
        f.fixed_view_mut::<3, 3>(POSITION, VELOCITY)
            .copy_from(&(i3 * dt));
        f.fixed_view_mut::<3, 3>(POSITION, ACCELERATION)
            .copy_from(&(i3 * (0.5 * dt * dt)));
        f.fixed_view_mut::<3, 3>(VELOCITY, ACCELERATION)
            .copy_from(&(i3 * dt));
        f
    }

    /// The process noise `Q = q * I`. Independent of `dt`.
    pub fn process_noise(&self, q: f64) -> StateMatrix {
        StateMatrix::identity() * q
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StateVector;
    use approx::assert_abs_diff_eq;

    #[test]
    fn transition_matches_kinematics() {
        let model = ConstantAccelerationModel;
        let mut x = StateVector::zeros();
        x[POSITION] = 1.0;
        x[VELOCITY] = 2.0;
        x[ACCELERATION] = 4.0;
        let next = model.transition(0.5) * x;
        assert_abs_diff_eq!(next[POSITION], 1.0 + 1.0 + 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(next[VELOCITY], 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(next[ACCELERATION], 4.0, epsilon = 1e-12);
    }

    #[test]
    fn zero_dt_is_identity() {
        assert_eq!(
            ConstantAccelerationModel.transition(0.0),
            StateMatrix::identity()
        );
    }
}
