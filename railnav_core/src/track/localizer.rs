// railnav_core/src/track/localizer.rs

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{MarkerLocation, TrackProfile};
use crate::errors::ConfigError;
use crate::messages::LocalizationSnapshot;

/// Lifecycle of a localizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocalizerPhase {
    /// No marker seen yet.
    #[default]
    Uninitialized,
    /// Every marker since the previous one was observed.
    Tracking,
    /// Missed markers were back-filled on the last event. Lasts one event.
    Recovering,
}

/// Turns marker crossings into an absolute position on a `TrackProfile`.
#[derive(Debug, Clone)]
pub struct TrackLocalizer {
    profile: TrackProfile,
    tolerance: f64,
    phase: LocalizerPhase,
    passed_marker_count: u32,
    last_position: f64,
    last_timestamp: Option<f64>,
    speed: f64,
    expected_next: Option<MarkerLocation>,
}

impl TrackLocalizer {
    pub fn new(profile: TrackProfile, tolerance: f64) -> Result<Self, ConfigError> {
        ConfigError::check_range("track.tolerance", tolerance, 0.0, f64::MAX)?;
        info!(
            total_length = profile.total_length(),
            total_markers = profile.total_markers(),
            "track profile loaded"
        );
        let expected_next = profile.locate_marker(1);
        Ok(Self {
            profile,
            tolerance,
            phase: LocalizerPhase::Uninitialized,
            passed_marker_count: 0,
            last_position: 0.0,
            last_timestamp: None,
            speed: 0.0,
            expected_next,
        })
    }

    pub fn profile(&self) -> &TrackProfile {
        &self.profile
    }

    pub fn phase(&self) -> LocalizerPhase {
        self.phase
    }

    pub fn passed_marker_count(&self) -> u32 {
        self.passed_marker_count
    }

    pub fn position(&self) -> f64 {
        self.last_position
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Where the next marker is expected, in metres.
    pub fn expected_next_marker_position(&self) -> Option<f64> {
        self.expected_next.map(|location| location.position)
    }

    /// Handles one marker crossing observed at `timestamp` (seconds).
    pub fn on_marker(&mut self, timestamp: f64) -> LocalizationSnapshot {
        self.passed_marker_count += 1;
        let mut position = self.profile.marker_position(self.passed_marker_count);

        let elapsed = self.last_timestamp.map(|last| timestamp - last);
        let missed = match elapsed {
            Some(dt) => self.detect_missed_markers(dt),
            None => 0,
        };
        if missed > 0 {
            self.passed_marker_count += missed;
            position = self.profile.marker_position(self.passed_marker_count);
            info!(
                missed,
                passed = self.passed_marker_count,
                position,
                section = ?self
                    .profile
                    .locate_marker(self.passed_marker_count)
                    .map(|location| location.section_index),
                "missed markers recovered"
            );
        }

        let position = position.min(self.profile.total_length());
        let delta_position = position - self.last_position;
        match elapsed {
            Some(dt) if dt > 0.0 && delta_position > 0.0 => {
                self.speed = delta_position / dt;
            }
            Some(dt) => {
                debug!(dt, delta_position, speed = self.speed, "speed retained");
            }
            None => {}
        }

        self.phase = if missed > 0 {
            LocalizerPhase::Recovering
        } else {
            LocalizerPhase::Tracking
        };
        self.last_timestamp = Some(timestamp);
        self.last_position = position;
        if let Some(next) = self.profile.locate_marker(self.passed_marker_count + 1) {
            self.expected_next = Some(next);
        }

        LocalizationSnapshot {
            passed_marker_count: self.passed_marker_count,
            position,
            speed: self.speed,
            time_since_last_marker: elapsed.unwrap_or(0.0),
            remaining_distance: self.profile.total_length() - position,
            missed_markers: missed,
            phase: self.phase,
        }
    }

    /// Dead-reckons from the previous marker with the last known speed and
    /// counts the markers passed unseen on the way.
    ///
    /// Walks the profile from the expected marker: a marker lying more than
    /// half its own spacing short of the dead-reckoned position was missed.
    /// The walk never consumes the last marker, since the current event has
    /// to be one.
    fn detect_missed_markers(&self, elapsed: f64) -> u32 {
        let Some(expected) = self.expected_next else {
            return 0;
        };
        if !(elapsed > 0.0) || !(self.speed > 0.0) {
            return 0;
        }

        let observed = self.last_position + self.speed * elapsed;
        if (observed - expected.position).abs() <= self.tolerance {
            return 0;
        }

        // `passed_marker_count` already includes the current event, so it
        // is the number of the expected marker.
        let mut missed = 0;
        let mut candidate = expected;
        while let Some(next) = self
            .profile
            .locate_marker(self.passed_marker_count + missed + 1)
        {
            if candidate.position >= observed - candidate.interval / 2.0 {
                break;
            }
            missed += 1;
            candidate = next;
        }
        missed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::ops::RangeInclusive;

    fn localizer() -> TrackLocalizer {
        TrackLocalizer::new(TrackProfile::reference(), 0.5).unwrap()
    }

    #[test]
    fn positions_follow_marker_count_without_misses() {
        let mut localizer = localizer();
        assert_eq!(localizer.phase(), LocalizerPhase::Uninitialized);
        assert_eq!(localizer.expected_next_marker_position(), Some(9.0));

        let first = localizer.on_marker(0.0);
        assert_eq!(first.passed_marker_count, 1);
        assert_abs_diff_eq!(first.position, 9.0, epsilon = 1e-9);
        assert_eq!(first.speed, 0.0);
        assert_eq!(first.time_since_last_marker, 0.0);
        assert_abs_diff_eq!(first.remaining_distance, 182.0, epsilon = 1e-9);
        assert_eq!(first.phase, LocalizerPhase::Tracking);

        for n in 2..=21u32 {
            let snapshot = localizer.on_marker(f64::from(n) * 2.0);
            assert_eq!(snapshot.missed_markers, 0, "marker {n}");
            assert_eq!(snapshot.passed_marker_count, n);
        }
        assert_abs_diff_eq!(localizer.position(), 89.0, epsilon = 1e-9);

        // First marker of the fine section, after the 2 m unmarked stretch.
        let snapshot = localizer.on_marker(42.525);
        assert_eq!(snapshot.missed_markers, 0);
        assert_eq!(snapshot.passed_marker_count, 22);
        assert_abs_diff_eq!(snapshot.position, 91.05, epsilon = 1e-9);
    }

    #[test]
    fn speed_comes_from_marker_spacing() {
        let mut localizer = localizer();
        localizer.on_marker(10.0);
        let second = localizer.on_marker(12.0);
        assert_abs_diff_eq!(second.speed, 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(second.time_since_last_marker, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn skipped_marker_is_recovered() {
        let mut localizer = localizer();
        localizer.on_marker(0.0); // 9 m
        localizer.on_marker(2.0); // 13 m, speed 2 m/s
        localizer.on_marker(4.0); // 17 m
        assert_eq!(localizer.expected_next_marker_position(), Some(21.0));

        // The marker at 21 m (t = 6) is never seen.
        let snapshot = localizer.on_marker(8.0);
        assert_eq!(snapshot.missed_markers, 1);
        assert_eq!(snapshot.passed_marker_count, 5);
        assert_abs_diff_eq!(snapshot.position, 25.0, epsilon = 1e-9);
        assert_abs_diff_eq!(snapshot.speed, 2.0, epsilon = 1e-12);
        assert_eq!(snapshot.phase, LocalizerPhase::Recovering);

        // Recovery lasts one event.
        let snapshot = localizer.on_marker(10.0);
        assert_eq!(snapshot.missed_markers, 0);
        assert_eq!(snapshot.phase, LocalizerPhase::Tracking);
        assert_abs_diff_eq!(snapshot.position, 29.0, epsilon = 1e-9);
    }

    #[test]
    fn slowing_down_never_yields_negative_misses() {
        let mut localizer = localizer();
        localizer.on_marker(0.0);
        localizer.on_marker(2.0);
        // Much slower than before: dead reckoning undershoots by 3 m.
        let snapshot = localizer.on_marker(2.5);
        assert_eq!(snapshot.missed_markers, 0);
        assert_eq!(snapshot.passed_marker_count, 3);
    }

    #[test]
    fn zero_elapsed_time_retains_speed() {
        let mut localizer = localizer();
        localizer.on_marker(0.0);
        localizer.on_marker(2.0);
        let snapshot = localizer.on_marker(2.0);
        assert_abs_diff_eq!(snapshot.speed, 2.0, epsilon = 1e-12);
        assert_eq!(snapshot.passed_marker_count, 3);
    }

    /// Replays the reference track at a constant 2 m/s, skipping `dropped`.
    fn replay(
        localizer: &mut TrackLocalizer,
        markers: RangeInclusive<u32>,
        dropped: &[u32],
    ) -> Vec<LocalizationSnapshot> {
        let profile = TrackProfile::reference();
        markers
            .filter(|n| !dropped.contains(n))
            .map(|n| localizer.on_marker(profile.marker_position(n) / 2.0))
            .collect()
    }

    #[test]
    fn dropout_at_end_of_fine_section_costs_one_marker() {
        let mut localizer = localizer();
        let snapshots = replay(&mut localizer, 1..=62, &[60]);
        assert!(snapshots[..59].iter().all(|s| s.missed_markers == 0));

        // #59 at 92.90 m, #60 at 92.95 m unseen, #61 at 99 m.
        let recovered = snapshots[59];
        assert_eq!(recovered.missed_markers, 1);
        assert_eq!(recovered.passed_marker_count, 61);
        assert_abs_diff_eq!(recovered.position, 99.0, epsilon = 1e-9);
        assert_abs_diff_eq!(recovered.speed, 2.0, epsilon = 1e-6);
        assert_eq!(recovered.phase, LocalizerPhase::Recovering);

        let next = snapshots[60];
        assert_eq!(next.missed_markers, 0);
        assert_eq!(next.passed_marker_count, 62);
        assert_abs_diff_eq!(next.position, 103.0, epsilon = 1e-9);
    }

    #[test]
    fn dropout_at_end_of_second_fine_section_costs_one_marker() {
        let mut localizer = localizer();
        let track = TrackProfile::reference();
        assert_abs_diff_eq!(track.marker_position(90), 143.95, epsilon = 1e-9);
        assert_abs_diff_eq!(track.marker_position(91), 151.0, epsilon = 1e-9);

        let snapshots = replay(&mut localizer, 1..=91, &[90]);
        let recovered = snapshots.last().unwrap();
        assert_eq!(recovered.missed_markers, 1);
        assert_eq!(recovered.passed_marker_count, 91);
        assert_abs_diff_eq!(recovered.position, 151.0, epsilon = 1e-9);
    }

    #[test]
    fn scattered_dropouts_keep_absolute_position() {
        let mut localizer = localizer();
        let dropped = [5, 60, 66, 90, 95];
        let snapshots = replay(&mut localizer, 1..=101, &dropped);
        let total_missed: u32 = snapshots.iter().map(|s| s.missed_markers).sum();
        assert_eq!(total_missed, 5);

        let last = snapshots.last().unwrap();
        assert_eq!(last.passed_marker_count, 101);
        assert_abs_diff_eq!(last.position, 191.0, epsilon = 1e-9);
        assert_abs_diff_eq!(last.remaining_distance, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn position_is_clamped_at_track_end() {
        let mut localizer = localizer();
        for n in 0..110u32 {
            let snapshot = localizer.on_marker(f64::from(n));
            assert!(snapshot.position <= 191.0);
            assert!(snapshot.remaining_distance >= 0.0);
        }
        assert_abs_diff_eq!(localizer.position(), 191.0, epsilon = 1e-9);
        // Past the last marker the expectation stays on the last one.
        assert_abs_diff_eq!(
            localizer.expected_next_marker_position().unwrap(),
            191.0,
            epsilon = 1e-9
        );
    }
}
