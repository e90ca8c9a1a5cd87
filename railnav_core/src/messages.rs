// railnav_core/src/messages.rs

use crate::estimation::orientation::OrientationState;
use crate::track::localizer::LocalizerPhase;
use crate::types::{Vec3, VehicleId};
use crate::utils::serde_helpers;
use serde::Serialize;

// =========================================================================
// == Sensor Input ==
// =========================================================================

/// One accelerometer + gyroscope reading in the sensor frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImuReading {
    /// Specific force in m/s^2 (gravity included).
    pub acceleration: Vec3,
    /// Angular rate in the unit the orientation estimator was built with.
    pub angular_rate: Vec3,
    /// Die temperature in degrees Celsius, when the sensor reports it.
    pub temperature: Option<f64>,
}

/// A self-describing container for every kind of sample the core consumes.
#[derive(Debug, Clone, PartialEq)]
pub enum MeasurementData {
    Imu(ImuReading),
    /// The optical sensor passed a track marker.
    MarkerCrossing,
    /// A distance reading that already passed the ingestion reliability gate, in metres.
    Distance(f64),
}

impl MeasurementData {
    pub fn kind(&self) -> &'static str {
        match self {
            MeasurementData::Imu(_) => "imu",
            MeasurementData::MarkerCrossing => "marker",
            MeasurementData::Distance(_) => "distance",
        }
    }
}

/// The generic message that carries all sensor data into the core.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementMessage {
    pub vehicle: VehicleId,
    /// Seconds on a monotonic clock.
    pub timestamp: f64,
    pub data: MeasurementData,
}

// =========================================================================
// == Output Snapshots ==
// =========================================================================

/// Orientation, velocity and position after one inertial update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MotionSnapshot {
    #[serde(with = "serde_helpers::vec3_as_xyz")]
    pub position: Vec3,
    #[serde(with = "serde_helpers::vec3_as_xyz")]
    pub velocity: Vec3,
    pub orientation: OrientationState,
    /// Elapsed time used for this update, in seconds. Zero for the
    /// initializing sample.
    pub time_step: f64,
    /// True while the motion strategy is still learning sensor noise at rest.
    pub calibrating: bool,
}

/// Absolute track position derived from marker crossings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LocalizationSnapshot {
    pub passed_marker_count: u32,
    pub position: f64,
    pub speed: f64,
    pub time_since_last_marker: f64,
    pub remaining_distance: f64,
    pub missed_markers: u32,
    pub phase: LocalizerPhase,
}

/// Output of the speed stabilizer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpeedSnapshot {
    pub instant_speed: f64,
    pub average_speed: f64,
    pub filtered_speed: f64,
    pub time_diff: f64,
}

/// Any snapshot produced for downstream broadcast.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Snapshot {
    Motion(MotionSnapshot),
    Localization(LocalizationSnapshot),
    Speed(SpeedSnapshot),
}

/// A snapshot together with the vehicle and time it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotMessage {
    pub vehicle: VehicleId,
    pub timestamp: f64,
    #[serde(flatten)]
    pub snapshot: Snapshot,
}
