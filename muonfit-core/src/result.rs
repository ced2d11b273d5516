//! Per-event reconstruction outcome.
//!
//! Values that were not computed are `None`. The legacy numeric sentinels
//! only appear when results are written out.

use crate::config::FiducialConfig;
use crate::event::EventId;
use crate::geometry::Vector3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Legacy output value for quantities of events rejected before reconstruction.
pub const NOT_ATTEMPTED: f64 = -888.0;

/// Legacy output value for quantities of events without a usable fit.
pub const NO_FIT: f64 = -999.0;

/// Why an event was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RejectReason {
    /// Trigger word present but not the beam trigger.
    NotBeamTrigger,
    /// Front veto fired.
    VetoHit,
    /// Not exactly one range-stage track.
    TrackMultiplicity,
    /// Track left the range stage.
    TrackNotStopped,
    /// Track direction has zero length.
    DegenerateTrack,
    /// No vertex candidate inside the fiducial volume.
    NoFiducialVertex,
    /// Fitted tank length is negative or non-finite.
    BadFit,
    /// Energy seed is negative or non-finite, so no energy can be integrated.
    InvalidEnergySeed,
}

impl RejectReason {
    /// All reasons, in cut order.
    pub const ALL: [Self; 8] = [
        Self::NotBeamTrigger,
        Self::VetoHit,
        Self::TrackMultiplicity,
        Self::TrackNotStopped,
        Self::DegenerateTrack,
        Self::NoFiducialVertex,
        Self::BadFit,
        Self::InvalidEnergySeed,
    ];

    /// Short snake-case label for reports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::NotBeamTrigger => "not_beam_trigger",
            Self::VetoHit => "veto_hit",
            Self::TrackMultiplicity => "track_multiplicity",
            Self::TrackNotStopped => "track_not_stopped",
            Self::DegenerateTrack => "degenerate_track",
            Self::NoFiducialVertex => "no_fiducial_vertex",
            Self::BadFit => "bad_fit",
            Self::InvalidEnergySeed => "invalid_energy_seed",
        }
    }
}

/// Final status of one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EventStatus {
    /// All physics outputs available.
    Reconstructed,
    /// Passed the cuts but no tank-length fit exists.
    NoFit,
    /// Failed a cut.
    Rejected(RejectReason),
}

impl EventStatus {
    /// Legacy value written in place of missing quantities.
    #[must_use]
    pub const fn sentinel(self) -> f64 {
        match self {
            Self::Rejected(_) => NOT_ATTEMPTED,
            Self::Reconstructed | Self::NoFit => NO_FIT,
        }
    }

    /// Short label for reports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Reconstructed => "reconstructed",
            Self::NoFit => "no_fit",
            Self::Rejected(reason) => reason.label(),
        }
    }
}

/// Fiducial-volume membership of the resolved vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FiducialFlags {
    /// Inside the central cylinder.
    pub central: bool,
    /// Inside the full-cylinder volume.
    pub full_cylinder: bool,
    /// Full cylinder, upstream half (z < 0).
    pub upstream: bool,
    /// Full cylinder, downstream half.
    pub downstream: bool,
}

impl FiducialFlags {
    /// Evaluates all shapes for a tank-relative vertex.
    #[must_use]
    pub fn evaluate(relative: &Vector3, config: &FiducialConfig) -> Self {
        let full_cylinder = config.full_cylinder.contains(relative);
        Self {
            central: config.central.contains(relative),
            full_cylinder,
            upstream: full_cylinder && relative.z < 0.0,
            downstream: full_cylinder && relative.z > 0.0 && relative.z < config.downstream_z_max,
        }
    }
}

/// Complete result record for one event.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReconstructionResult {
    /// Event this record belongs to.
    pub event_id: EventId,
    /// How far reconstruction got.
    pub status: EventStatus,
    /// Time of the tank cluster the fit belongs to (ns).
    pub cluster_time: Option<f64>,
    /// Vertex in the detector frame (cm).
    pub vertex: Option<Vector3>,
    /// Tank-relative vertex mapped into the reporting frame (m).
    pub reporting_vertex: Option<Vector3>,
    /// Tank-stage path length (cm).
    pub tank_length: Option<f64>,
    /// Range-stage path length (cm).
    pub range_length: Option<f64>,
    /// Track angle to the beam axis (rad).
    pub track_angle: Option<f64>,
    /// Cosine of the track angle.
    pub cos_theta: Option<f64>,
    /// Energy seed before integration (MeV).
    pub seed_energy: Option<f64>,
    /// Energy deposited in the tank stage (MeV).
    pub tank_deposit: Option<f64>,
    /// Energy deposited in the range stage (MeV).
    pub range_deposit: Option<f64>,
    /// Kinetic energy at production (MeV).
    pub kinetic_energy: Option<f64>,
    /// Total muon energy (MeV).
    pub total_energy: Option<f64>,
    /// Transverse momentum (MeV/c).
    pub transverse_momentum: Option<f64>,
    /// Quasi-elastic neutrino energy (MeV).
    pub neutrino_energy: Option<f64>,
    /// Squared four-momentum transfer (MeV²).
    pub q_squared: Option<f64>,
    /// Fiducial membership of the tank-relative vertex.
    pub fiducial: Option<FiducialFlags>,
}

impl ReconstructionResult {
    /// A result with the given status and nothing computed.
    #[must_use]
    pub const fn empty(event_id: EventId, status: EventStatus) -> Self {
        Self {
            event_id,
            status,
            cluster_time: None,
            vertex: None,
            reporting_vertex: None,
            tank_length: None,
            range_length: None,
            track_angle: None,
            cos_theta: None,
            seed_energy: None,
            tank_deposit: None,
            range_deposit: None,
            kinetic_energy: None,
            total_energy: None,
            transverse_momentum: None,
            neutrino_energy: None,
            q_squared: None,
            fiducial: None,
        }
    }

    /// A rejected event.
    #[must_use]
    pub const fn rejected(event_id: EventId, reason: RejectReason) -> Self {
        Self::empty(event_id, EventStatus::Rejected(reason))
    }

    /// Returns true if the event was fully reconstructed.
    #[must_use]
    pub fn is_reconstructed(&self) -> bool {
        self.status == EventStatus::Reconstructed
    }

    /// A value or the status sentinel.
    #[must_use]
    pub fn or_sentinel(&self, value: Option<f64>) -> f64 {
        value.unwrap_or_else(|| self.status.sentinel())
    }
}
