//! Tank-stage photosensors, hits and clusters.

use crate::geometry::Vector3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Photosensor model. Determines the photocathode area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SensorKind {
    Lux,
    Etel,
    Hamamatsu,
    Watchboy,
    Watchman,
    #[default]
    Unknown,
}

impl SensorKind {
    /// Photocathode area in cm².
    #[must_use]
    pub const fn photocathode_area(self) -> f64 {
        match self {
            Self::Lux | Self::Watchboy | Self::Watchman => 470.0,
            Self::Etel => 613.0,
            Self::Hamamatsu => 330.0,
            Self::Unknown => 0.0,
        }
    }

    /// Parses a detector-database sensor type name.
    ///
    /// Unrecognised names map to [`SensorKind::Unknown`].
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let name = name.to_ascii_lowercase();
        if name.contains("lux") {
            Self::Lux
        } else if name.contains("etel") {
            Self::Etel
        } else if name.contains("hamamatsu") {
            Self::Hamamatsu
        } else if name.contains("watchboy") {
            Self::Watchboy
        } else if name.contains("watchman") {
            Self::Watchman
        } else {
            Self::Unknown
        }
    }
}

/// Static description of one photosensor.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SensorGeometry {
    pub channel_id: u32,
    pub kind: SensorKind,
    /// Photocathode centre (cm).
    pub position: Vector3,
    /// Unit vector the sensor faces.
    pub orientation: Vector3,
}

/// A single photosensor pulse.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SensorHit {
    pub channel_id: u32,
    /// Integrated charge, in the units given by [`ChargeUnits`].
    pub charge: f64,
    /// Hit time (ns).
    pub time: f64,
}

impl SensorHit {
    /// Creates a new hit.
    #[must_use]
    pub const fn new(channel_id: u32, charge: f64, time: f64) -> Self {
        Self {
            channel_id,
            charge,
            time,
        }
    }
}

/// A pre-clustered group of tank-stage hits.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TankCluster {
    /// Cluster time assigned by the upstream clustering (ns).
    pub time: f64,
    pub hits: Vec<SensorHit>,
}

impl TankCluster {
    /// Creates a cluster.
    #[must_use]
    pub fn new(time: f64, hits: Vec<SensorHit>) -> Self {
        Self { time, hits }
    }

    /// Mean hit time, or `None` for an empty cluster.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_time(&self) -> Option<f64> {
        if self.hits.is_empty() {
            return None;
        }
        let sum: f64 = self.hits.iter().map(|hit| hit.time).sum();
        Some(sum / self.hits.len() as f64)
    }

    /// Summed raw charge of all hits.
    #[must_use]
    pub fn total_charge(&self) -> f64 {
        self.hits.iter().map(|hit| hit.charge).sum()
    }

    /// Returns the number of hits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Returns true if the cluster has no hits.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// Units of [`SensorHit::charge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ChargeUnits {
    /// Calibrated charge; divide by the channel gain to obtain PE.
    #[default]
    Calibrated,
    /// Already photoelectrons (simulation).
    PhotoElectrons,
}

/// Aggregated light seen by one sensor in the selected cluster.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SensorLightRecord {
    pub channel_id: u32,
    pub position: Vector3,
    pub orientation: Vector3,
    /// Photocathode area (cm²).
    pub area: f64,
    pub total_pe: f64,
    /// Earliest hit time (ns).
    pub earliest_time: f64,
}

/// Run-scoped source of sensor geometry and calibration.
pub trait GeometryProvider: Send + Sync {
    /// Geometry for a channel, if known.
    fn sensor(&self, channel_id: u32) -> Option<&SensorGeometry>;

    /// Single-photoelectron gain for a channel, if calibrated.
    fn spe_gain(&self, channel_id: u32) -> Option<f64>;
}
