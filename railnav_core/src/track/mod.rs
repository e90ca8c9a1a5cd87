// railnav_core/src/track/mod.rs

//! The piecewise track model: a fixed sequence of sections, some of them
//! carrying evenly spaced optical markers.

use crate::errors::TrackProfileError;
use serde::{Deserialize, Serialize};

pub mod localizer;

/// Guards `floor(length / interval)` against binary rounding, so that
/// `1.95 / 0.05` counts 39 markers rather than 38.
const MARKER_COUNT_EPSILON: f64 = 1e-9;

/// One stretch of track. An interval of zero marks an unmarked section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, f64)", into = "(f64, f64)")]
pub struct TrackSection {
    pub length: f64,
    pub marker_interval: f64,
}

impl TrackSection {
    pub const fn new(length: f64, marker_interval: f64) -> Self {
        Self {
            length,
            marker_interval,
        }
    }

    pub fn is_marked(&self) -> bool {
        self.marker_interval > 0.0
    }

    /// Number of markers inside this section.
    pub fn marker_count(&self) -> u32 {
        if !self.is_marked() {
            return 0;
        }
        (self.length / self.marker_interval + MARKER_COUNT_EPSILON).floor() as u32
    }
}

impl From<(f64, f64)> for TrackSection {
    fn from((length, marker_interval): (f64, f64)) -> Self {
        Self::new(length, marker_interval)
    }
}

impl From<TrackSection> for (f64, f64) {
    fn from(section: TrackSection) -> Self {
        (section.length, section.marker_interval)
    }
}

/// The 191 m reference track.
pub const REFERENCE_SECTIONS: [TrackSection; 9] = [
    TrackSection::new(5.0, 0.0),
    TrackSection::new(86.0, 4.0),
    TrackSection::new(1.95, 0.05),
    TrackSection::new(2.05, 0.0),
    TrackSection::new(44.0, 4.0),
    TrackSection::new(4.0, 0.0),
    TrackSection::new(0.95, 0.05),
    TrackSection::new(3.05, 0.0),
    TrackSection::new(44.0, 4.0),
];

/// Where a given marker sits on the track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerLocation {
    /// Distance from the track origin, in metres.
    pub position: f64,
    /// Spacing of the markers around it.
    pub interval: f64,
    pub section_index: usize,
}

/// An immutable, validated sequence of track sections.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackProfile {
    sections: Vec<TrackSection>,
    total_length: f64,
    total_markers: u32,
}

impl TrackProfile {
    pub fn new(sections: Vec<TrackSection>) -> Result<Self, TrackProfileError> {
        if sections.is_empty() {
            return Err(TrackProfileError::Empty);
        }
        for (index, section) in sections.iter().enumerate() {
            if !section.length.is_finite() || section.length < 0.0 {
                return Err(TrackProfileError::InvalidLength {
                    index,
                    length: section.length,
                });
            }
            if !section.marker_interval.is_finite() || section.marker_interval < 0.0 {
                return Err(TrackProfileError::InvalidInterval {
                    index,
                    interval: section.marker_interval,
                });
            }
        }

        let total_length = sections.iter().map(|s| s.length).sum();
        let total_markers = sections.iter().map(TrackSection::marker_count).sum();
        Ok(Self {
            sections,
            total_length,
            total_markers,
        })
    }

    /// The reference 191 m track with 101 markers.
    pub fn reference() -> Self {
        let sections = REFERENCE_SECTIONS.to_vec();
        let total_length = sections.iter().map(|s| s.length).sum();
        let total_markers = sections.iter().map(TrackSection::marker_count).sum();
        Self {
            sections,
            total_length,
            total_markers,
        }
    }

    pub fn sections(&self) -> &[TrackSection] {
        &self.sections
    }

    pub fn total_length(&self) -> f64 {
        self.total_length
    }

    pub fn total_markers(&self) -> u32 {
        self.total_markers
    }

    /// Locates marker number `count` (1-based). `None` for marker 0 and for
    /// counts past the last marker.
    pub fn locate_marker(&self, count: u32) -> Option<MarkerLocation> {
        if count == 0 {
            return None;
        }
        let mut passed = 0u32;
        let mut start = 0.0;
        for (section_index, section) in self.sections.iter().enumerate() {
            let markers = section.marker_count();
            if passed + markers >= count {
                return Some(MarkerLocation {
                    position: start + f64::from(count - passed) * section.marker_interval,
                    interval: section.marker_interval,
                    section_index,
                });
            }
            passed += markers;
            start += section.length;
        }
        None
    }

    /// Analytic position of marker `count`. Counts past the last marker map
    /// to the end of the track.
    pub fn marker_position(&self, count: u32) -> f64 {
        if count == 0 {
            return 0.0;
        }
        self.locate_marker(count)
            .map_or(self.total_length, |location| location.position)
    }
}

/// Track layout and localizer tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackConfig {
    /// `[length, marker_interval]` pairs, in metres.
    pub sections: Vec<TrackSection>,
    /// Largest accepted gap between the dead-reckoned and the expected
    /// marker position before missed markers are assumed (m).
    pub tolerance: f64,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            sections: REFERENCE_SECTIONS.to_vec(),
            tolerance: 0.5,
        }
    }
}

impl TrackConfig {
    pub fn profile(&self) -> Result<TrackProfile, TrackProfileError> {
        TrackProfile::new(self.sections.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn reference_track_totals() {
        let track = TrackProfile::reference();
        assert_abs_diff_eq!(track.total_length(), 191.0, epsilon = 1e-9);
        // 21 + 39 + 11 + 19 + 11
        assert_eq!(track.total_markers(), 101);
        assert_eq!(TrackProfile::new(REFERENCE_SECTIONS.to_vec()).unwrap(), track);
    }

    #[test]
    fn fine_sections_survive_rounding() {
        assert_eq!(TrackSection::new(1.95, 0.05).marker_count(), 39);
        assert_eq!(TrackSection::new(0.95, 0.05).marker_count(), 19);
        assert_eq!(TrackSection::new(4.0, 0.0).marker_count(), 0);
    }

    #[test]
    fn marker_positions_follow_the_piecewise_model() {
        let track = TrackProfile::reference();
        assert_abs_diff_eq!(track.marker_position(1), 9.0, epsilon = 1e-9);
        assert_abs_diff_eq!(track.marker_position(4), 21.0, epsilon = 1e-9);
        assert_abs_diff_eq!(track.marker_position(21), 89.0, epsilon = 1e-9);
        assert_abs_diff_eq!(track.marker_position(22), 91.05, epsilon = 1e-9);
        // Last fine marker of the first dense section, then the next 4 m section.
        assert_abs_diff_eq!(track.marker_position(60), 92.95, epsilon = 1e-9);
        assert_abs_diff_eq!(track.marker_position(61), 99.0, epsilon = 1e-9);
        assert_abs_diff_eq!(track.marker_position(101), 191.0, epsilon = 1e-9);
        assert_abs_diff_eq!(track.marker_position(150), 191.0, epsilon = 1e-9);
    }

    #[test]
    fn located_markers_carry_their_spacing() {
        let track = TrackProfile::reference();
        let location = track.locate_marker(22).unwrap();
        assert_eq!(location.section_index, 2);
        assert_eq!(location.interval, 0.05);
        assert!(track.locate_marker(0).is_none());
        assert!(track.locate_marker(102).is_none());
    }

    #[test]
    fn invalid_profiles_are_rejected() {
        assert_eq!(TrackProfile::new(vec![]), Err(TrackProfileError::Empty));
        assert!(matches!(
            TrackProfile::new(vec![TrackSection::new(5.0, 0.0), TrackSection::new(-1.0, 1.0)]),
            Err(TrackProfileError::InvalidLength { index: 1, .. })
        ));
        assert!(matches!(
            TrackProfile::new(vec![TrackSection::new(5.0, f64::NAN)]),
            Err(TrackProfileError::InvalidInterval { index: 0, .. })
        ));
    }
}
