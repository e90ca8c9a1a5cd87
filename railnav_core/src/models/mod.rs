// railnav_core/src/models/mod.rs

//! Linear models used by the Kalman motion strategy.
//!
//! The filter state is `x = [px, py, pz, vx, vy, vz, ax, ay, az]`.

use nalgebra::{SMatrix, SVector};

pub const STATE_DIM: usize = 9;
pub const MEASUREMENT_DIM: usize = 3;

pub type StateVector = SVector<f64, STATE_DIM>;
pub type StateMatrix = SMatrix<f64, STATE_DIM, STATE_DIM>;
pub type ObservationMatrix = SMatrix<f64, MEASUREMENT_DIM, STATE_DIM>;

/// Index of the first position component inside the state vector.
pub const POSITION: usize = 0;
/// Index of the first velocity component inside the state vector.
pub const VELOCITY: usize = 3;
/// Index of the first acceleration component inside the state vector.
pub const ACCELERATION: usize = 6;

pub mod accelerometer;
pub mod constant_acceleration;
