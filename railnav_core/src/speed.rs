// railnav_core/src/speed.rs

//! Stabilized speed from a raw distance stream (the LIDAR range to a fixed
//! target): rate-limited, averaged over a short window, then low-passed.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::ConfigError;
use crate::messages::SpeedSnapshot;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StabilizerConfig {
    /// Minimum time between two accepted samples, in seconds.
    pub update_interval: f64,
    /// Number of instantaneous speeds in the moving average.
    pub window: usize,
    /// Weight of the new average in the low-pass filter.
    pub alpha: f64,
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self {
            update_interval: 1.0,
            window: 5,
            alpha: 0.2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpeedStabilizer {
    config: StabilizerConfig,
    last_sample: Option<(f64, f64)>,
    last_update: Option<f64>,
    history: VecDeque<f64>,
    filtered_speed: f64,
}

impl SpeedStabilizer {
    pub fn new(config: StabilizerConfig) -> Result<Self, ConfigError> {
        if config.window == 0 {
            return Err(ConfigError::ZeroCapacity {
                name: "stabilizer.window",
            });
        }
        ConfigError::check_range(
            "stabilizer.update_interval",
            config.update_interval,
            0.0,
            f64::MAX,
        )?;
        ConfigError::check_range("stabilizer.alpha", config.alpha, 0.0, 1.0)?;
        Ok(Self {
            history: VecDeque::with_capacity(config.window),
            config,
            last_sample: None,
            last_update: None,
            filtered_speed: 0.0,
        })
    }

    pub fn filtered_speed(&self) -> f64 {
        self.filtered_speed
    }

    /// Feeds one distance reading (m) taken at `timestamp` (s).
    ///
    /// Returns `None` while rate-limited, for the seeding sample, for
    /// non-finite input, and when no time has elapsed since the previous
    /// accepted sample.
    pub fn process(&mut self, position: f64, timestamp: f64) -> Option<SpeedSnapshot> {
        if !position.is_finite() || !timestamp.is_finite() {
            debug!(position, timestamp, "non-finite distance sample ignored");
            return None;
        }
        if let Some(last_update) = self.last_update {
            if timestamp - last_update < self.config.update_interval {
                return None;
            }
        }

        let Some((last_position, last_timestamp)) = self.last_sample else {
            self.last_sample = Some((position, timestamp));
            return None;
        };

        let time_diff = timestamp - last_timestamp;
        if !(time_diff > 0.0) {
            debug!(time_diff, "no elapsed time, speed sample ignored");
            return None;
        }

        let instant_speed = (position - last_position).abs() / time_diff;
        if self.history.len() == self.config.window {
            self.history.pop_front();
        }
        self.history.push_back(instant_speed);
        let average_speed = self.history.iter().sum::<f64>() / self.history.len() as f64;
        self.filtered_speed =
            self.config.alpha * average_speed + (1.0 - self.config.alpha) * self.filtered_speed;

        self.last_sample = Some((position, timestamp));
        self.last_update = Some(timestamp);

        Some(SpeedSnapshot {
            instant_speed,
            average_speed,
            filtered_speed: self.filtered_speed,
            time_diff,
        })
    }
}
