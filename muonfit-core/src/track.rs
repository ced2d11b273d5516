//! Range-stage track stubs.

use crate::error::GeometryError;
use crate::geometry::Vector3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single hit scintillator paddle belonging to a track.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PaddleHit {
    /// Detector channel id. Channel order follows layer order.
    pub channel_id: u32,
    /// Paddle centre (cm).
    pub position: Vector3,
}

impl PaddleHit {
    /// Creates a new paddle hit.
    #[must_use]
    pub const fn new(channel_id: u32, position: Vector3) -> Self {
        Self {
            channel_id,
            position,
        }
    }
}

/// A track segment already fitted in the range stage.
///
/// Read-only input to reconstruction. `direction` points from the tank stage
/// towards the range stage; `entry_point` is where the track enters the range
/// stage and `exit_point` where it leaves the tank.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TrackStub {
    pub start: Vector3,
    pub stop: Vector3,
    pub entry_point: Vector3,
    pub exit_point: Vector3,
    pub direction: Vector3,
    /// Angle to the beam axis (rad).
    pub angle: f64,
    /// Uncertainty on `angle` (rad).
    pub angle_error: f64,
    /// Energy lost in the range stage as estimated by the track fit (MeV).
    pub energy_loss: f64,
    /// Track start time (ns).
    pub start_time: f64,
    pub is_stopped: bool,
    pub is_penetrating: bool,
    pub is_side_exit: bool,
    /// Number of absorber layers crossed.
    pub layers_hit: u32,
    /// Hit paddles, in no particular order.
    pub paddle_hits: Vec<PaddleHit>,
}

impl TrackStub {
    /// Builds a stopped stub from its endpoints.
    ///
    /// Direction and angle are derived from `stop - start`; both the entry and
    /// exit points are placed at `start`.
    #[must_use]
    pub fn from_endpoints(start: Vector3, stop: Vector3) -> Self {
        let delta = stop - start;
        let direction = delta.unit().unwrap_or_default();
        Self {
            start,
            stop,
            entry_point: start,
            exit_point: start,
            direction,
            angle: direction.angle_to(&Vector3::BEAM_AXIS),
            is_stopped: true,
            ..Self::default()
        }
    }

    /// Sets the tank exit point.
    #[must_use]
    pub fn with_exit_point(mut self, exit_point: Vector3) -> Self {
        self.exit_point = exit_point;
        self
    }

    /// Sets the range-stage entry point.
    #[must_use]
    pub fn with_entry_point(mut self, entry_point: Vector3) -> Self {
        self.entry_point = entry_point;
        self
    }

    /// Sets the fitted energy loss (MeV).
    #[must_use]
    pub fn with_energy_loss(mut self, energy_loss: f64) -> Self {
        self.energy_loss = energy_loss;
        self
    }

    /// Sets the start time (ns).
    #[must_use]
    pub fn with_start_time(mut self, start_time: f64) -> Self {
        self.start_time = start_time;
        self
    }

    /// Sets the number of layers hit.
    #[must_use]
    pub fn with_layers_hit(mut self, layers_hit: u32) -> Self {
        self.layers_hit = layers_hit;
        self
    }

    /// Sets the hit paddles.
    #[must_use]
    pub fn with_paddle_hits(mut self, paddle_hits: Vec<PaddleHit>) -> Self {
        self.paddle_hits = paddle_hits;
        self
    }

    /// Marks whether the track stopped in the range stage.
    #[must_use]
    pub fn with_stopped(mut self, is_stopped: bool) -> Self {
        self.is_stopped = is_stopped;
        self
    }

    /// Straight-line length between start and stop (cm).
    #[inline]
    #[must_use]
    pub fn endpoint_length(&self) -> f64 {
        self.start.distance(&self.stop)
    }

    /// Normalised direction.
    ///
    /// # Errors
    /// Returns [`GeometryError::ZeroDirection`] for a zero-length direction.
    pub fn unit_direction(&self) -> Result<Vector3, GeometryError> {
        self.direction.unit().ok_or(GeometryError::ZeroDirection)
    }

    /// Positions of the hit paddles.
    #[must_use]
    pub fn hit_positions(&self) -> Vec<Vector3> {
        self.paddle_hits.iter().map(|hit| hit.position).collect()
    }
}
