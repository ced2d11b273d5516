//! muonfit-algorithms: Reconstruction stages for two-stage muon tracks.
//!
//! This crate provides the per-event components:
//! - **Vertex search** - backward stepping from the range-stage entry point
//! - **Photon-density profile** - Cherenkov-cone projection of tank light
//! - **Range-track estimators** - stub endpoints, connect-the-dots, layer count
//! - **Stopping power** - Bethe energy loss in water and iron, integrated stepwise
//! - **Kinematics** - quasi-elastic neutrino energy and Q²
//!
//! and the pipeline that chains them over a batch of events.
//!
#![warn(missing_docs)]

pub mod angle;
pub mod dedx;
mod integrator;
pub mod kinematics;
mod light;
mod processing;
mod profile;
mod vertex;

pub use angle::{
    connect_the_dots, estimator_for, layer_count_length, principal_direction, resolve_angle,
    scattering_rescale, ConnectTheDots, LayerCount, RangeTrackEstimator, StubEndpoints,
};
pub use dedx::{Constituent, Medium, MUON_MASS};
pub use integrator::{EnergyDeposit, StoppingPowerIntegrator};
pub use kinematics::{quasi_elastic, transverse_momentum, Kinematics};
pub use light::{aggregate_light, is_coincident, select_main_cluster, SelectedCluster};
pub use processing::{reconstruct_batch, record_outcomes, EventOutcome, EventProfile, RunContext};
pub use profile::{
    PhotonDensityProfiler, ProfileBin, ProfilePoint, SensorProjection, TrackSegmentProfile,
};
pub use vertex::{VertexCandidate, VertexSearch};

// Re-export core configuration types
pub use muonfit_core::{ReconstructionConfig, RunStatistics};
