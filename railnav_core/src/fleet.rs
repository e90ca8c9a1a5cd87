// railnav_core/src/fleet.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::{BuildError, EstimationError};
use crate::estimation::conditioning::{check_finite, SampleValidator};
use crate::estimation::orientation::{ComplementaryFilter, OrientationState};
use crate::estimation::{EstimatorConfig, MotionEstimator};
use crate::messages::{
    ImuReading, LocalizationSnapshot, MeasurementData, MeasurementMessage, MotionSnapshot,
    Snapshot, SnapshotMessage, SpeedSnapshot,
};
use crate::speed::{SpeedStabilizer, StabilizerConfig};
use crate::track::localizer::TrackLocalizer;
use crate::track::TrackConfig;
use crate::types::{Vec3, VehicleId};

/// Configuration shared by every vehicle's estimator set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FleetConfig {
    pub estimator: EstimatorConfig,
    pub track: TrackConfig,
    pub stabilizer: StabilizerConfig,
}

/// All estimators belonging to one vehicle. Samples for a vehicle must be
/// applied in order, one at a time.
#[derive(Debug, Clone)]
pub struct VehicleEstimators {
    orientation: ComplementaryFilter,
    motion: Box<dyn MotionEstimator>,
    validator: Option<SampleValidator>,
    localizer: TrackLocalizer,
    stabilizer: SpeedStabilizer,
    last_imu_timestamp: Option<f64>,
}

impl VehicleEstimators {
    pub fn new(config: &FleetConfig) -> Result<Self, BuildError> {
        let profile = config.track.profile()?;
        Ok(Self {
            orientation: ComplementaryFilter::new(config.estimator.orientation.clone())?,
            motion: config.estimator.motion.build()?,
            validator: config
                .estimator
                .validation
                .clone()
                .map(SampleValidator::new)
                .transpose()?,
            localizer: TrackLocalizer::new(profile, config.track.tolerance)?,
            stabilizer: SpeedStabilizer::new(config.stabilizer.clone())?,
            last_imu_timestamp: None,
        })
    }

    pub fn orientation(&self) -> OrientationState {
        self.orientation.state()
    }

    pub fn motion(&self) -> &dyn MotionEstimator {
        self.motion.as_ref()
    }

    pub fn localizer(&self) -> &TrackLocalizer {
        &self.localizer
    }

    /// Applies one inertial reading. The first reading of a vehicle only
    /// starts the clock and yields a zero-motion snapshot.
    pub fn on_imu(
        &mut self,
        reading: &ImuReading,
        timestamp: f64,
    ) -> Result<MotionSnapshot, EstimationError> {
        check_finite_value(timestamp)?;
        check_finite(reading)?;

        let Some(last) = self.last_imu_timestamp else {
            if let Some(validator) = self.validator.as_mut() {
                validator.check(reading)?;
            }
            self.orientation.initialize();
            self.motion.initialize(reading);
            self.last_imu_timestamp = Some(timestamp);
            return Ok(MotionSnapshot {
                position: Vec3::zeros(),
                velocity: Vec3::zeros(),
                orientation: OrientationState::default(),
                time_step: 0.0,
                calibrating: self.motion.is_calibrating(),
            });
        };

        let dt = timestamp - last;
        if !(dt > 0.0) {
            return Err(EstimationError::NonPositiveTimeStep { dt });
        }
        if let Some(validator) = self.validator.as_mut() {
            validator.check(reading)?;
        }

        let orientation = self.orientation.update(reading, dt)?;
        self.motion.process(reading, dt)?;
        self.last_imu_timestamp = Some(timestamp);

        let motion = self.motion.state();
        Ok(MotionSnapshot {
            position: motion.position,
            velocity: motion.velocity,
            orientation,
            time_step: dt,
            calibrating: self.motion.is_calibrating(),
        })
    }

    pub fn on_marker(
        &mut self,
        timestamp: f64,
    ) -> Result<LocalizationSnapshot, EstimationError> {
        check_finite_value(timestamp)?;
        Ok(self.localizer.on_marker(timestamp))
    }

    /// `Ok(None)` while the stabilizer is seeding or rate-limited.
    pub fn on_distance(
        &mut self,
        distance: f64,
        timestamp: f64,
    ) -> Result<Option<SpeedSnapshot>, EstimationError> {
        check_finite_value(timestamp)?;
        check_finite_value(distance)?;
        Ok(self.stabilizer.process(distance, timestamp))
    }
}

fn check_finite_value(value: f64) -> Result<(), EstimationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(EstimationError::NonFiniteSample)
    }
}

/// Keyed store of estimator sets. A vehicle's set is cloned from a freshly
/// built prototype the first time its id is seen and lives as long as the
/// registry.
#[derive(Debug)]
pub struct EstimatorRegistry {
    prototype: VehicleEstimators,
    vehicles: HashMap<VehicleId, VehicleEstimators>,
}

impl EstimatorRegistry {
    pub fn new(config: &FleetConfig) -> Result<Self, BuildError> {
        let prototype = VehicleEstimators::new(config)?;
        info!(
            motion = prototype.motion.name(),
            track_length = prototype.localizer.profile().total_length(),
            "estimator registry ready"
        );
        Ok(Self {
            prototype,
            vehicles: HashMap::new(),
        })
    }

    pub fn vehicle(&self, id: &VehicleId) -> Option<&VehicleEstimators> {
        self.vehicles.get(id)
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    /// Routes a measurement to its vehicle. Rejected samples and samples that
    /// produce nothing yield `None`; the error is logged and the vehicle keeps
    /// its last valid state.
    pub fn handle(&mut self, message: &MeasurementMessage) -> Option<SnapshotMessage> {
        let estimators = self
            .vehicles
            .entry(message.vehicle.clone())
            .or_insert_with(|| {
                info!(vehicle = %message.vehicle, "new vehicle, estimator set created");
                self.prototype.clone()
            });

        let outcome = match &message.data {
            MeasurementData::Imu(reading) => estimators
                .on_imu(reading, message.timestamp)
                .map(|snapshot| Some(Snapshot::Motion(snapshot))),
            MeasurementData::MarkerCrossing => estimators
                .on_marker(message.timestamp)
                .map(|snapshot| Some(Snapshot::Localization(snapshot))),
            MeasurementData::Distance(distance) => estimators
                .on_distance(*distance, message.timestamp)
                .map(|snapshot| snapshot.map(Snapshot::Speed)),
        };

        match outcome {
            Ok(snapshot) => snapshot.map(|snapshot| SnapshotMessage {
                vehicle: message.vehicle.clone(),
                timestamp: message.timestamp,
                snapshot,
            }),
            Err(err) => {
                warn!(
                    vehicle = %message.vehicle,
                    kind = message.data.kind(),
                    error = %err,
                    "sample rejected"
                );
                None
            }
        }
    }
}
