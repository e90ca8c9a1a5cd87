// railnav_core/src/utils/integrators.rs

use nalgebra::SVector;
use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul};

/// A single-step ODE solver over a fixed-size state vector.
///
/// `func(x, t)` returns the time derivative of `x`. The step advances the
/// state from `t0` to `tf`.
pub trait Integrator<T, const D: usize> {
    fn step(
        &self,
        func: &dyn Fn(&SVector<T, D>, T) -> SVector<T, D>,
        x0: &SVector<T, D>,
        t0: T,
        tf: T,
    ) -> SVector<T, D>;
}

/// Selects one of the integrators below. Used by configuration so the
/// scheme can be chosen per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationScheme {
    /// First order, semi-implicit: velocity is updated first and the new
    /// velocity moves the position. Handled directly by the caller.
    #[default]
    Euler,
    /// Second order (Heun).
    Heun,
    /// Classic fourth order Runge-Kutta.
    RungeKutta4,
}

// Runge-Kutta methods
#[derive(Debug, Default, Clone, Copy)]
pub struct RK2;

impl<T, const D: usize> Integrator<T, D> for RK2
where
    T: Copy + num_traits::Float + Mul<SVector<T, D>, Output = SVector<T, D>>,
    SVector<T, D>: Add<Output = SVector<T, D>> + Clone,
{
    fn step(
        &self,
        func: &dyn Fn(&SVector<T, D>, T) -> SVector<T, D>,
        x0: &SVector<T, D>,
        t0: T,
        tf: T,
    ) -> SVector<T, D> {
        let dt: T = tf - t0;
        let half = T::one() / (T::one() + T::one());
        let k1 = func(x0, t0);
        let k2 = func(&(x0.clone() + dt * k1.clone()), tf);

        // Weighted average of k1 and k2
        x0.clone() + half * dt * (k1 + k2)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RK4;

impl<T, const D: usize> Integrator<T, D> for RK4
where
    T: Copy + num_traits::Float + Mul<SVector<T, D>, Output = SVector<T, D>>,
    SVector<T, D>: Add<Output = SVector<T, D>> + Clone,
{
    fn step(
        &self,
        func: &dyn Fn(&SVector<T, D>, T) -> SVector<T, D>,
        x0: &SVector<T, D>,
        t0: T,
        tf: T,
    ) -> SVector<T, D> {
        let dt = tf - t0;
        let two = T::one() + T::one();
        let half = T::one() / two;
        let sixth = T::one() / (two + two + two);

        let k1 = func(x0, t0);
        let k2 = func(&(x0.clone() + half * dt * k1.clone()), t0 + half * dt);
        let k3 = func(&(x0.clone() + half * dt * k2.clone()), t0 + half * dt);
        let k4 = func(&(x0.clone() + dt * k3.clone()), tf);

        x0.clone() + dt * sixth * (k1 + two * k2 + two * k3 + k4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::Vector2;

    // x = [position, velocity] under a constant acceleration of 2 m/s^2.
    fn constant_accel(x: &Vector2<f64>, _t: f64) -> Vector2<f64> {
        Vector2::new(x[1], 2.0)
    }

    fn decay(x: &Vector2<f64>, _t: f64) -> Vector2<f64> {
        -x
    }

    #[test]
    fn rk4_is_exact_for_constant_acceleration() {
        let x0 = Vector2::new(1.0, 3.0);
        let x1 = <RK4 as Integrator<f64, 2>>::step(&RK4, &constant_accel, &x0, 0.0, 0.5);
        // p = p0 + v0 t + a t^2 / 2, v = v0 + a t
        assert_abs_diff_eq!(x1[0], 1.0 + 1.5 + 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(x1[1], 4.0, epsilon = 1e-12);
    }

    #[test]
    fn heun_is_exact_for_constant_acceleration() {
        let x0 = Vector2::new(0.0, 0.0);
        let x1 = <RK2 as Integrator<f64, 2>>::step(&RK2, &constant_accel, &x0, 0.0, 1.0);
        assert_abs_diff_eq!(x1[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(x1[1], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn higher_order_schemes_track_exponential_decay_more_closely() {
        let x0 = Vector2::new(1.0, 1.0);
        let exact = (-0.1f64).exp();
        // Explicit Euler for reference: x1 = x0 - 0.1 * x0.
        let e1 = (0.9 - exact).abs();
        let e2 = (<RK2 as Integrator<f64, 2>>::step(&RK2, &decay, &x0, 0.0, 0.1)[0] - exact).abs();
        let e4 = (<RK4 as Integrator<f64, 2>>::step(&RK4, &decay, &x0, 0.0, 0.1)[0] - exact).abs();
        assert!(e2 < e1);
        assert!(e4 < e2);
        assert!(e4 < 1e-7);
    }
}
