// railnav_node/src/output.rs

use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};

use railnav_core::messages::SnapshotMessage;

/// Writes snapshots as JSON lines, flushing after each so downstream
/// consumers see them immediately.
pub struct SnapshotWriter<W: Write> {
    inner: W,
}

impl SnapshotWriter<Box<dyn Write>> {
    /// `-` is stdout; anything else is a file opened for appending.
    pub fn open(target: &str) -> io::Result<Self> {
        let inner: Box<dyn Write> = if target == "-" {
            Box::new(io::stdout().lock())
        } else {
            let file = OpenOptions::new().create(true).append(true).open(target)?;
            Box::new(BufWriter::new(file))
        };
        Ok(Self { inner })
    }
}

impl<W: Write> SnapshotWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn write(&mut self, snapshot: &SnapshotMessage) -> io::Result<()> {
        serde_json::to_writer(&mut self.inner, snapshot)?;
        self.inner.write_all(b"\n")?;
        self.inner.flush()
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use railnav_core::messages::{Snapshot, SpeedSnapshot};
    use serde_json::Value;

    #[test]
    fn one_object_per_line() {
        let mut writer = SnapshotWriter::new(Vec::new());
        for timestamp in [1.0, 2.0] {
            writer
                .write(&SnapshotMessage {
                    vehicle: "train-1".into(),
                    timestamp,
                    snapshot: Snapshot::Speed(SpeedSnapshot {
                        instant_speed: 1.5,
                        average_speed: 1.5,
                        filtered_speed: 0.3,
                        time_diff: 1.0,
                    }),
                })
                .unwrap();
        }
        let text = String::from_utf8(writer.into_inner()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let value: Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(value["vehicle"], "train-1");
        assert_eq!(value["timestamp"], 2.0);
        assert_eq!(value["kind"], "speed");
        assert_eq!(value["instant_speed"], 1.5);
    }
}
