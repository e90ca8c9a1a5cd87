// railnav_core/src/estimation/filters/mod.rs

pub mod inertial;
pub mod kalman;
