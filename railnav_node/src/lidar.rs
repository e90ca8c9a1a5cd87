// railnav_node/src/lidar.rs

//! Reliability gate for LIDAR range readings. A return whose strength does
//! not match what the range predicts (glare, a passing object, dust) is
//! discarded before it can disturb the speed estimate.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LidarGateConfig {
    /// Longest usable range; farther readings are clamped to it (m).
    pub max_distance: f64,
    /// Strength of a return at zero range.
    pub max_strength: f64,
    /// Floor of the expected strength.
    pub min_strength: f64,
    /// Exponential attenuation per metre.
    pub attenuation: f64,
    /// Accepted relative deviation from the expected strength.
    pub tolerance: f64,
}

impl Default for LidarGateConfig {
    fn default() -> Self {
        Self {
            max_distance: 40.0,
            max_strength: 13000.0,
            min_strength: 4.0,
            attenuation: 0.1,
            tolerance: 0.2,
        }
    }
}

impl LidarGateConfig {
    /// Strength a clean return at `distance` metres should have.
    pub fn expected_strength(&self, distance: f64) -> f64 {
        (self.max_strength * (-self.attenuation * distance).exp()).max(self.min_strength)
    }

    /// Returns the (clamped) distance when the reading is trustworthy.
    pub fn accept(&self, distance: f64, strength: f64) -> Option<f64> {
        if !distance.is_finite() || !strength.is_finite() {
            return None;
        }
        let distance = distance.min(self.max_distance);
        let expected = self.expected_strength(distance);
        let reliable = strength >= expected * (1.0 - self.tolerance)
            && strength <= expected * (1.0 + self.tolerance);
        reliable.then_some(distance)
    }
}
