// railnav_core/src/prelude.rs

// --- Core Abstractions ---
pub use crate::estimation::{EstimatorConfig, MotionEstimator, MotionState, MotionStrategyConfig};
pub use crate::fleet::{EstimatorRegistry, FleetConfig, VehicleEstimators};

// --- Messages and Snapshots ---
pub use crate::messages::{
    ImuReading, LocalizationSnapshot, MeasurementData, MeasurementMessage, MotionSnapshot,
    Snapshot, SnapshotMessage, SpeedSnapshot,
};
pub use crate::types::{AngleUnit, Axis, Vec3, VehicleId, STANDARD_GRAVITY};

// --- Errors ---
pub use crate::errors::{BuildError, ConfigError, EstimationError, TrackProfileError};

// --- Concrete Estimators (exported for convenience) ---
pub use crate::estimation::filters::inertial::{InertialConfig, InertialIntegrator};
pub use crate::estimation::filters::kalman::{KalmanConfig, KalmanMotionEstimator};
pub use crate::estimation::orientation::{ComplementaryFilter, OrientationConfig, OrientationState};
pub use crate::speed::{SpeedStabilizer, StabilizerConfig};
pub use crate::track::localizer::{LocalizerPhase, TrackLocalizer};
pub use crate::track::{TrackConfig, TrackProfile, TrackSection};
pub use crate::utils::integrators::IntegrationScheme;
