// railnav_node/src/ingest.rs

//! The ingestion boundary: relay frames (one JSON object per line) are
//! parsed, checked and turned into core measurements. A frame is either
//! accepted whole or dropped; nothing past this point sees partial data.

use railnav_core::messages::{ImuReading, MeasurementData};
use railnav_core::types::{Vec3, VehicleId};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::lidar::LidarGateConfig;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("frame has an empty vehicle id")]
    EmptyVehicle,

    #[error("unknown event `{0}`")]
    UnknownEvent(String),

    #[error("invalid `{event}` payload: {source}")]
    InvalidPayload {
        event: &'static str,
        source: serde_json::Error,
    },

    #[error("`{0}` payload contains non-finite numbers")]
    NonFinite(&'static str),

    #[error("frame has no `t` timestamp")]
    MissingTimestamp,
}

/// A frame that passed ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub vehicle: VehicleId,
    /// The `t` field, seconds on the sender's monotonic clock.
    pub recorded_at: Option<f64>,
    pub data: MeasurementData,
}

#[derive(Deserialize)]
struct RawFrame {
    vehicle: String,
    event: String,
    #[serde(default)]
    t: Option<f64>,
    #[serde(default)]
    data: Value,
}

#[derive(Deserialize)]
struct RawVector {
    x: f64,
    y: f64,
    z: f64,
}

impl From<RawVector> for Vec3 {
    fn from(v: RawVector) -> Self {
        Vec3::new(v.x, v.y, v.z)
    }
}

#[derive(Deserialize)]
struct RawInertial {
    accelerometer: RawVector,
    gyroscope: RawVector,
    #[serde(default)]
    temperature: Option<f64>,
}

#[derive(Deserialize)]
struct RawLidar {
    dis: Option<f64>,
    strength: Option<f64>,
    #[serde(default)]
    temp: Option<f64>,
}

fn payload<T: for<'de> Deserialize<'de>>(
    event: &'static str,
    data: Value,
) -> Result<T, IngestError> {
    serde_json::from_value(data).map_err(|source| IngestError::InvalidPayload { event, source })
}

/// Parses one relay line.
///
/// `Ok(None)` marks a well-formed frame that carries nothing for the core:
/// a `hasBand` of `false`, or a LIDAR reading that failed the gate.
pub fn parse_frame(line: &str, gate: &LidarGateConfig) -> Result<Option<Frame>, IngestError> {
    let raw: RawFrame = serde_json::from_str(line)?;
    if raw.vehicle.trim().is_empty() {
        return Err(IngestError::EmptyVehicle);
    }
    if raw.t.is_some_and(|t| !t.is_finite()) {
        return Err(IngestError::NonFinite("t"));
    }

    let data = match raw.event.as_str() {
        "acceleration" => {
            let inertial: RawInertial = payload("acceleration", raw.data)?;
            let reading = ImuReading {
                acceleration: inertial.accelerometer.into(),
                angular_rate: inertial.gyroscope.into(),
                temperature: inertial.temperature,
            };
            let finite = reading.acceleration.iter().all(|v| v.is_finite())
                && reading.angular_rate.iter().all(|v| v.is_finite());
            if !finite {
                return Err(IngestError::NonFinite("acceleration"));
            }
            MeasurementData::Imu(reading)
        }
        "hasBand" => {
            let crossed: bool = payload("hasBand", raw.data)?;
            if !crossed {
                return Ok(None);
            }
            MeasurementData::MarkerCrossing
        }
        "lidar" => {
            let lidar: RawLidar = payload("lidar", raw.data)?;
            let (Some(distance), Some(strength)) = (lidar.dis, lidar.strength) else {
                debug!(vehicle = %raw.vehicle, "lidar frame without distance or strength");
                return Ok(None);
            };
            match gate.accept(distance, strength) {
                Some(distance) => MeasurementData::Distance(distance),
                None => {
                    debug!(
                        vehicle = %raw.vehicle,
                        distance,
                        strength,
                        expected = gate.expected_strength(distance.min(gate.max_distance)),
                        temperature = ?lidar.temp,
                        "unreliable lidar reading dropped"
                    );
                    return Ok(None);
                }
            }
        }
        _ => return Err(IngestError::UnknownEvent(raw.event)),
    };

    Ok(Some(Frame {
        vehicle: VehicleId::new(raw.vehicle),
        recorded_at: raw.t,
        data,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<Option<Frame>, IngestError> {
        parse_frame(line, &LidarGateConfig::default())
    }

    #[test]
    fn acceleration_frame_is_parsed() {
        let frame = parse(
            r#"{"vehicle":"train-1","event":"acceleration","t":12.5,
                "data":{"accelerometer":{"x":0.1,"y":0,"z":9.81},
                        "gyroscope":{"x":0,"y":0,"z":1.5},"temperature":24.1}}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(frame.vehicle.as_str(), "train-1");
        assert_eq!(frame.recorded_at, Some(12.5));
        match frame.data {
            MeasurementData::Imu(reading) => {
                assert_eq!(reading.acceleration, Vec3::new(0.1, 0.0, 9.81));
                assert_eq!(reading.angular_rate.z, 1.5);
                assert_eq!(reading.temperature, Some(24.1));
            }
            other => panic!("unexpected data {other:?}"),
        }
    }

    #[test]
    fn marker_frames() {
        let frame = parse(r#"{"vehicle":"train-1","event":"hasBand","data":true}"#)
            .unwrap()
            .unwrap();
        assert_eq!(frame.data, MeasurementData::MarkerCrossing);
        assert_eq!(frame.recorded_at, None);

        assert!(parse(r#"{"vehicle":"train-1","event":"hasBand","data":false}"#)
            .unwrap()
            .is_none());
        assert!(matches!(
            parse(r#"{"vehicle":"train-1","event":"hasBand","data":"yes"}"#),
            Err(IngestError::InvalidPayload { event: "hasBand", .. })
        ));
    }

    #[test]
    fn lidar_frames_pass_through_the_gate() {
        let gate = LidarGateConfig::default();
        let strength = gate.expected_strength(12.3);
        let line = format!(
            r#"{{"vehicle":"train-1","event":"lidar","data":{{"dis":12.3,"strength":{strength},"temp":31}}}}"#
        );
        let frame = parse(&line).unwrap().unwrap();
        assert_eq!(frame.data, MeasurementData::Distance(12.3));

        let weak = r#"{"vehicle":"train-1","event":"lidar","data":{"dis":12.3,"strength":5,"temp":31}}"#;
        assert!(parse(weak).unwrap().is_none());

        let blank = r#"{"vehicle":"train-1","event":"lidar","data":{"dis":null,"strength":null,"temp":null}}"#;
        assert!(parse(blank).unwrap().is_none());
    }

    #[test]
    fn malformed_frames_are_errors() {
        assert!(matches!(parse("not json"), Err(IngestError::Malformed(_))));
        assert!(matches!(
            parse(r#"{"event":"hasBand","data":true}"#),
            Err(IngestError::Malformed(_))
        ));
        assert!(matches!(
            parse(r#"{"vehicle":" ","event":"hasBand","data":true}"#),
            Err(IngestError::EmptyVehicle)
        ));
        assert!(matches!(
            parse(r#"{"vehicle":"a","event":"brakeOpen","data":true}"#),
            Err(IngestError::UnknownEvent(e)) if e == "brakeOpen"
        ));
        // Gyroscope missing: the whole frame is rejected.
        assert!(matches!(
            parse(r#"{"vehicle":"a","event":"acceleration","data":{"accelerometer":{"x":0,"y":0,"z":9.8}}}"#),
            Err(IngestError::InvalidPayload { event: "acceleration", .. })
        ));
        assert!(matches!(
            parse(r#"{"vehicle":"a","event":"acceleration","data":{"accelerometer":{"x":"0","y":0,"z":9.8},"gyroscope":{"x":0,"y":0,"z":0}}}"#),
            Err(IngestError::InvalidPayload { .. })
        ));
    }
}
