//! Error types for muonfit-core.

use thiserror::Error;

/// Result type alias for muonfit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for muonfit operations.
///
/// These are run-level failures. Problems with a single event never surface
/// as an `Error`; they become an [`EventStatus`](crate::EventStatus).
#[derive(Error, Debug)]
pub enum Error {
    /// A required collaborator value is absent.
    #[error("missing input: {0}")]
    MissingInput(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),
}

/// Degenerate geometric input.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// A direction vector has (near) zero length.
    #[error("zero-length direction vector")]
    ZeroDirection,

    /// Too few points to fit a direction.
    #[error("need at least {required} points to fit a direction, got {got}")]
    TooFewPoints { required: usize, got: usize },

    /// Track perpendicular to the beam axis; `1/cos` is unbounded.
    #[error("track angle {angle_rad} rad is perpendicular to the beam axis")]
    PerpendicularTrack { angle_rad: f64 },
}

/// Input outside the physical domain of a model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PhysicsError {
    /// Kinetic energy must be strictly positive and finite.
    #[error("kinetic energy {0} MeV is outside the stopping-power domain")]
    NonPositiveEnergy(f64),

    /// Total energy below the particle rest mass.
    #[error("total energy {energy} MeV is below the rest mass {mass} MeV")]
    BelowRestMass { energy: f64, mass: f64 },

    /// Kinematic solution does not exist for this configuration.
    #[error("no physical quasi-elastic solution (denominator {0})")]
    Unphysical(f64),
}
