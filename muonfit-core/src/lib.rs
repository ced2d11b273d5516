//! muonfit-core: Core types for two-stage muon track reconstruction.
//!
//! This crate provides the detector-frame geometry, the per-event inputs and
//! results, run configuration and run statistics shared by the algorithm and
//! I/O crates.
//!

pub mod config;
pub mod error;
pub mod event;
pub mod fit;
pub mod geometry;
pub mod result;
pub mod sensor;
pub mod statistics;
pub mod track;

pub use config::{
    AngleSource, ClusterSelectionConfig, EnergyConfig, FiducialConfig, ProfileConfig,
    RangeLengthMethod, ReconstructionConfig, ReportingFrame, VertexSearchConfig,
};
pub use error::{Error, GeometryError, PhysicsError, Result};
pub use event::{EventId, EventInput, ParseEventIdError};
pub use fit::{TrackFit, TrackFitLookup};
pub use geometry::{FiducialCylinder, TankGeometry, Vector3};
pub use result::{
    EventStatus, FiducialFlags, ReconstructionResult, RejectReason, NOT_ATTEMPTED, NO_FIT,
};
pub use sensor::{
    ChargeUnits, GeometryProvider, SensorGeometry, SensorHit, SensorKind, SensorLightRecord,
    TankCluster,
};
pub use statistics::RunStatistics;
pub use track::{PaddleHit, TrackStub};
