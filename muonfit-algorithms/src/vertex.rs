//! Backward vertex-candidate search from the range-stage entry point.

use muonfit_core::{GeometryError, TankGeometry, Vector3, VertexSearchConfig};

/// A candidate vertex on the backward-extrapolated track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexCandidate {
    /// Position in the detector frame (cm).
    pub position: Vector3,
    /// Number of steps taken back from the entry point (1-based).
    pub step_index: usize,
    /// True if the candidate lies in the fiducial volume.
    pub in_fiducial_volume: bool,
}

/// Steps backward along the track until it leaves the tank.
#[derive(Debug, Clone)]
pub struct VertexSearch {
    config: VertexSearchConfig,
    tank: TankGeometry,
}

impl VertexSearch {
    /// Creates a search over the given tank.
    #[must_use]
    pub fn new(config: VertexSearchConfig, tank: TankGeometry) -> Self {
        Self { config, tank }
    }

    /// Enumerates candidates `entry - n * step * direction` for n = 1, 2, ...
    ///
    /// The first `unconditional_steps` candidates are always kept; after that
    /// the first candidate outside the tank ends the search.
    ///
    /// # Errors
    /// Returns [`GeometryError::ZeroDirection`] for a zero-length direction.
    pub fn candidates(
        &self,
        entry: &Vector3,
        direction: &Vector3,
    ) -> Result<Vec<VertexCandidate>, GeometryError> {
        let direction = direction.unit().ok_or(GeometryError::ZeroDirection)?;
        let mut candidates = Vec::new();

        for step_index in 1..=self.config.max_steps {
            #[allow(clippy::cast_precision_loss)]
            let distance = step_index as f64 * self.config.step;
            let position = *entry - direction * distance;
            if step_index > self.config.unconditional_steps && !self.tank.contains(&position) {
                break;
            }
            candidates.push(VertexCandidate {
                position,
                step_index,
                in_fiducial_volume: self.config.fiducial.contains(&self.tank.relative(&position)),
            });
        }
        Ok(candidates)
    }

    /// Returns true if any candidate lies in the fiducial volume.
    ///
    /// # Errors
    /// Returns [`GeometryError::ZeroDirection`] for a zero-length direction.
    pub fn reaches_fiducial_volume(
        &self,
        entry: &Vector3,
        direction: &Vector3,
    ) -> Result<bool, GeometryError> {
        Ok(self
            .candidates(entry, direction)?
            .iter()
            .any(|c| c.in_fiducial_volume))
    }
}
