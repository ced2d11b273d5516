//! Detector description loaded from a JSON document.
//!
//! ```json
//! {
//!   "tank": { "center": { "x": 0.0, "y": -14.46, "z": 168.1 }, "radius": 137.504, "half_height": 128.33 },
//!   "sensors": [
//!     { "channel_id": 332, "kind": "LUX",
//!       "position": { "x": 0.0, "y": 0.0, "z": 30.0 },
//!       "orientation": { "x": 0.0, "y": 0.0, "z": -1.0 },
//!       "gain": 0.0071 }
//!   ]
//! }
//! ```
//!
//! `tank` is optional and defaults to the standard tank. A sensor without a
//! `gain` has no calibration and its hits are ignored.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use log::{debug, warn};
use muonfit_core::{GeometryProvider, SensorGeometry, SensorKind, TankGeometry, Vector3};
use serde::Deserialize;

use crate::{Error, Result};

#[derive(Debug, Deserialize)]
struct DetectorDocument {
    #[serde(default)]
    tank: Option<TankGeometry>,
    sensors: Vec<SensorEntry>,
}

#[derive(Debug, Deserialize)]
struct SensorEntry {
    channel_id: u32,
    #[serde(default)]
    kind: String,
    position: Vector3,
    orientation: Vector3,
    #[serde(default)]
    gain: Option<f64>,
}

/// Sensor positions, kinds and gains by channel.
#[derive(Debug, Clone, Default)]
pub struct SensorTable {
    tank: Option<TankGeometry>,
    sensors: HashMap<u32, SensorGeometry>,
    gains: HashMap<u32, f64>,
}

impl SensorTable {
    /// Loads a detector description from a JSON file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is not valid JSON, lists
    /// no sensors, or contains an invalid sensor entry.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let table = Self::from_reader(BufReader::new(file))?;
        debug!(
            "loaded {} sensors ({} calibrated) from {}",
            table.len(),
            table.gains.len(),
            path.as_ref().display()
        );
        Ok(table)
    }

    /// Parses a detector description from any reader.
    ///
    /// # Errors
    /// See [`SensorTable::open`].
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let document: DetectorDocument = serde_json::from_reader(reader)?;
        if document.sensors.is_empty() {
            return Err(muonfit_core::Error::MissingInput(
                "detector description lists no sensors".to_string(),
            )
            .into());
        }

        let mut table = Self {
            tank: document.tank,
            ..Self::default()
        };
        for entry in document.sensors {
            table.insert_entry(entry)?;
        }
        Ok(table)
    }

    fn insert_entry(&mut self, entry: SensorEntry) -> Result<()> {
        let channel = entry.channel_id;
        if self.sensors.contains_key(&channel) {
            return Err(Error::InvalidFormat(format!(
                "channel {channel} listed twice"
            )));
        }
        if !entry.position.is_finite() {
            return Err(Error::InvalidFormat(format!(
                "channel {channel} has a non-finite position"
            )));
        }
        let orientation = entry.orientation.unit().ok_or_else(|| {
            Error::InvalidFormat(format!("channel {channel} has no orientation"))
        })?;

        let kind = SensorKind::from_name(&entry.kind);
        if kind == SensorKind::Unknown {
            warn!("channel {channel}: unknown sensor kind {:?}, area 0", entry.kind);
        }
        match entry.gain {
            Some(gain) if gain.is_finite() && gain > 0.0 => {
                self.gains.insert(channel, gain);
            }
            Some(gain) => {
                return Err(Error::InvalidFormat(format!(
                    "channel {channel} has gain {gain}"
                )));
            }
            None => debug!("channel {channel} has no gain calibration"),
        }
        self.sensors.insert(
            channel,
            SensorGeometry {
                channel_id: channel,
                kind,
                position: entry.position,
                orientation,
            },
        );
        Ok(())
    }

    /// Tank cylinder, if the document defined one.
    #[must_use]
    pub fn tank(&self) -> Option<&TankGeometry> {
        self.tank.as_ref()
    }

    /// Returns the number of sensors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    /// Returns true if the table holds no sensors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }
}

impl GeometryProvider for SensorTable {
    fn sensor(&self, channel_id: u32) -> Option<&SensorGeometry> {
        self.sensors.get(&channel_id)
    }

    fn spe_gain(&self, channel_id: u32) -> Option<f64> {
        self.gains.get(&channel_id).copied()
    }
}
