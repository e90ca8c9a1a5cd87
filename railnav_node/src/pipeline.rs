// railnav_node/src/pipeline.rs

use std::time::Instant;

use railnav_core::errors::BuildError;
use railnav_core::fleet::EstimatorRegistry;
use railnav_core::messages::{MeasurementMessage, SnapshotMessage};
use tracing::warn;

use crate::config::{NodeConfig, TimestampSource};
use crate::ingest::{parse_frame, IngestError};
use crate::lidar::LidarGateConfig;

/// Counters over one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub lines: u64,
    pub dropped: u64,
    pub ignored: u64,
    pub snapshots: u64,
}

/// Frames in, snapshots out: ingestion, timestamping and routing to the
/// per-vehicle estimators.
pub struct Pipeline {
    registry: EstimatorRegistry,
    gate: LidarGateConfig,
    timestamps: TimestampSource,
    started: Instant,
    stats: PipelineStats,
}

impl Pipeline {
    pub fn new(config: &NodeConfig) -> Result<Self, BuildError> {
        Ok(Self {
            registry: EstimatorRegistry::new(&config.fleet())?,
            gate: config.lidar.clone(),
            timestamps: config.node.timestamps,
            started: Instant::now(),
            stats: PipelineStats::default(),
        })
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    pub fn registry(&self) -> &EstimatorRegistry {
        &self.registry
    }

    /// Processes a line stamped with the node's monotonic clock.
    pub fn process_line(&mut self, line: &str) -> Option<SnapshotMessage> {
        let arrival = self.started.elapsed().as_secs_f64();
        self.process_line_at(line, arrival)
    }

    /// Processes a line that arrived `arrival` seconds after start-up.
    pub fn process_line_at(&mut self, line: &str, arrival: f64) -> Option<SnapshotMessage> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        self.stats.lines += 1;

        let message = match self.measurement(line, arrival) {
            Ok(Some(message)) => message,
            Ok(None) => {
                self.stats.ignored += 1;
                return None;
            }
            Err(err) => {
                self.stats.dropped += 1;
                warn!(error = %err, "frame dropped");
                return None;
            }
        };

        let snapshot = self.registry.handle(&message);
        match snapshot {
            Some(_) => self.stats.snapshots += 1,
            None => self.stats.ignored += 1,
        }
        snapshot
    }

    fn measurement(
        &self,
        line: &str,
        arrival: f64,
    ) -> Result<Option<MeasurementMessage>, IngestError> {
        let Some(frame) = parse_frame(line, &self.gate)? else {
            return Ok(None);
        };
        let timestamp = match self.timestamps {
            TimestampSource::Arrival => arrival,
            TimestampSource::Frame => frame.recorded_at.ok_or(IngestError::MissingTimestamp)?,
        };
        Ok(Some(MeasurementMessage {
            vehicle: frame.vehicle,
            timestamp,
            data: frame.data,
        }))
    }
}
