// railnav_core/src/utils/mod.rs

pub mod integrators;
pub mod linalg;
pub mod serde_helpers;
