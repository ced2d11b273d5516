//! Per-event reconstruction pipeline and batch helpers.

use log::{debug, warn};
use muonfit_core::{
    EventId, EventInput, EventStatus, FiducialFlags, GeometryProvider, PhysicsError,
    RangeLengthMethod, ReconstructionConfig, ReconstructionResult, RejectReason, Result,
    RunStatistics, TrackFitLookup, TrackStub, Vector3,
};
use rayon::prelude::*;

use crate::angle::{
    estimator_for, resolve_angle, scattering_rescale, RangeTrackEstimator, StubEndpoints,
};
use crate::dedx::MUON_MASS;
use crate::integrator::StoppingPowerIntegrator;
use crate::kinematics::{quasi_elastic, transverse_momentum};
use crate::light::{aggregate_light, is_coincident, select_main_cluster};
use crate::profile::{PhotonDensityProfiler, ProfilePoint};
use crate::vertex::VertexSearch;

/// Photon-density profile of one event, as handed to the external length fit.
#[derive(Debug, Clone, PartialEq)]
pub struct EventProfile {
    /// Event the profile belongs to.
    pub event_id: EventId,
    /// Time of the selected tank cluster (ns).
    pub cluster_time: f64,
    /// Defined `(distance, eta)` points.
    pub points: Vec<ProfilePoint>,
    /// Unweighted mean of the point densities.
    pub mean_eta: f64,
}

/// Everything produced for one event.
#[derive(Debug, Clone, PartialEq)]
pub struct EventOutcome {
    /// The result record. Always present.
    pub result: ReconstructionResult,
    /// Profile, when a coincident cluster produced one.
    pub profile: Option<EventProfile>,
}

impl EventOutcome {
    fn rejected(event_id: EventId, reason: RejectReason) -> Self {
        debug!("event {event_id} rejected: {}", reason.label());
        Self {
            result: ReconstructionResult::rejected(event_id, reason),
            profile: None,
        }
    }
}

/// Run-scoped state shared read-only by every event.
pub struct RunContext<'a> {
    config: ReconstructionConfig,
    geometry: &'a dyn GeometryProvider,
    fits: Option<&'a dyn TrackFitLookup>,
    vertex_search: VertexSearch,
    profiler: PhotonDensityProfiler,
    integrator: StoppingPowerIntegrator,
    estimator: Box<dyn RangeTrackEstimator>,
}

impl<'a> RunContext<'a> {
    /// Validates `config` and builds the run components.
    ///
    /// # Errors
    /// Returns [`muonfit_core::Error::ConfigError`] for an invalid configuration.
    pub fn new(config: ReconstructionConfig, geometry: &'a dyn GeometryProvider) -> Result<Self> {
        config.validate()?;
        let estimator = estimator_for(config.range_length, &config.energy);
        debug!("range length estimator: {}", estimator.name());
        Ok(Self {
            vertex_search: VertexSearch::new(config.vertex.clone(), config.tank.clone()),
            profiler: PhotonDensityProfiler::new(config.profile.clone()),
            integrator: StoppingPowerIntegrator::from_config(&config.energy),
            estimator,
            geometry,
            fits: None,
            config,
        })
    }

    /// Attaches the fitted tank-length lookup.
    #[must_use]
    pub fn with_fits(mut self, fits: &'a dyn TrackFitLookup) -> Self {
        self.fits = Some(fits);
        self
    }

    /// The run configuration.
    #[must_use]
    pub fn config(&self) -> &ReconstructionConfig {
        &self.config
    }

    /// Applies the selection cuts and returns the single track and its direction.
    fn preselect<'e>(
        &self,
        event: &'e EventInput,
    ) -> std::result::Result<(&'e TrackStub, Vector3), RejectReason> {
        if event.trigger_word.is_some_and(|word| word != self.config.beam_trigger) {
            return Err(RejectReason::NotBeamTrigger);
        }
        if event.veto_hit {
            return Err(RejectReason::VetoHit);
        }
        let [track] = event.tracks.as_slice() else {
            return Err(RejectReason::TrackMultiplicity);
        };
        if !track.is_stopped {
            return Err(RejectReason::TrackNotStopped);
        }
        let direction = track.unit_direction().map_err(|err| {
            warn!("event {}: {err}", event.id);
            RejectReason::DegenerateTrack
        })?;
        match self
            .vertex_search
            .reaches_fiducial_volume(&track.entry_point, &direction)
        {
            Ok(true) => Ok((track, direction)),
            Ok(false) => Err(RejectReason::NoFiducialVertex),
            Err(err) => {
                warn!("event {}: {err}", event.id);
                Err(RejectReason::DegenerateTrack)
            }
        }
    }

    fn build_profile(
        &self,
        event: &EventInput,
        track: &TrackStub,
        direction: &Vector3,
    ) -> Option<EventProfile> {
        let clusters = &self.config.clusters;
        let selected = select_main_cluster(&event.clusters, clusters)?;
        if !is_coincident(track.start_time, selected.cluster.time, clusters) {
            debug!(
                "event {}: cluster at {} ns not coincident with track start {} ns",
                event.id, selected.cluster.time, track.start_time
            );
            return None;
        }

        let records = aggregate_light(selected.cluster, self.geometry, clusters);
        let profile = match self.profiler.profile(&records, &track.exit_point, direction) {
            Ok(profile) => profile,
            Err(err) => {
                warn!("event {}: {err}", event.id);
                return None;
            }
        };
        let mean_eta = profile.mean_eta()?;
        Some(EventProfile {
            event_id: event.id,
            cluster_time: selected.cluster.time,
            points: profile.points(),
            mean_eta,
        })
    }

    fn range_length(&self, event_id: EventId, track: &TrackStub, angle: f64) -> f64 {
        self.estimator.length(track, angle).unwrap_or_else(|err| {
            warn!(
                "event {event_id}: {} estimate failed ({err}), using stub endpoints",
                self.estimator.name()
            );
            StubEndpoints.length(track, angle).unwrap_or_default()
        })
    }

    /// Reconstructs one event. Never fails; problems become the result status.
    #[must_use]
    pub fn reconstruct_event(&self, event: &EventInput) -> EventOutcome {
        let (track, direction) = match self.preselect(event) {
            Ok(selected) => selected,
            Err(reason) => return EventOutcome::rejected(event.id, reason),
        };

        let profile = self.build_profile(event, track, &direction);
        let angle = resolve_angle(track, self.config.angle_source);
        let cos_theta = angle.cos();
        let mut range_length = self.range_length(event.id, track, angle);

        let Some(fit) = self.fits.and_then(|fits| fits.fit(&event.id)) else {
            let mut result = ReconstructionResult::empty(event.id, EventStatus::NoFit);
            result.cluster_time = profile.as_ref().map(|p| p.cluster_time);
            result.range_length = Some(range_length);
            result.track_angle = Some(angle);
            result.cos_theta = Some(cos_theta);
            return EventOutcome { result, profile };
        };

        if !(fit.tank_length.is_finite() && fit.tank_length >= 0.0) {
            let mut outcome = EventOutcome::rejected(event.id, RejectReason::BadFit);
            outcome.profile = profile;
            return outcome;
        }

        let vertex = track.exit_point - direction * fit.tank_length;
        let energy = &self.config.energy;
        let tank_seed = fit.tank_length * energy.tank_seed_dedx;
        let mut range_seed = if energy.use_track_energy_loss {
            track.energy_loss
        } else {
            range_length * energy.range_seed_dedx
        };
        if self.config.range_length == RangeLengthMethod::LayerCount {
            range_length = scattering_rescale(range_length, range_seed, energy);
            range_seed = range_length * energy.range_seed_dedx;
        }
        let seed = EnergySeed {
            tank: tank_seed,
            range: range_seed,
        };
        if !seed.is_physical() {
            debug!(
                "event {}: energy seed tank {} MeV, range {} MeV",
                event.id, seed.tank, seed.range
            );
            let mut outcome = EventOutcome::rejected(event.id, RejectReason::InvalidEnergySeed);
            outcome.profile = profile;
            return outcome;
        }

        let relative = self.config.tank.relative(&vertex);
        let mut result = ReconstructionResult::empty(event.id, EventStatus::Reconstructed);
        result.cluster_time = Some(fit.cluster_time);
        result.vertex = Some(vertex);
        result.reporting_vertex = Some(self.config.reporting.transform(&relative));
        result.fiducial = Some(FiducialFlags::evaluate(&relative, &self.config.fiducial));
        result.tank_length = Some(fit.tank_length);
        result.range_length = Some(range_length);
        result.track_angle = Some(angle);
        result.cos_theta = Some(cos_theta);
        result.seed_energy = Some(seed.total());

        if let Err(err) = self.fill_energy(&mut result, seed, fit.tank_length, range_length) {
            warn!("event {}: energy integration failed ({err})", event.id);
            let mut outcome = EventOutcome::rejected(event.id, RejectReason::InvalidEnergySeed);
            outcome.profile = profile;
            return outcome;
        }
        EventOutcome { result, profile }
    }

    fn fill_energy(
        &self,
        result: &mut ReconstructionResult,
        seed: EnergySeed,
        tank_length: f64,
        range_length: f64,
    ) -> std::result::Result<(), PhysicsError> {
        let (tank, range) = if self.config.energy.simple {
            (seed.tank, seed.range)
        } else {
            let deposit = self
                .integrator
                .integrate(seed.total(), tank_length, range_length)?;
            (deposit.tank, deposit.range)
        };
        let kinetic_energy = tank + range;
        let total_energy = kinetic_energy + MUON_MASS;
        let cos_theta = result.cos_theta.unwrap_or(1.0);

        result.tank_deposit = Some(tank);
        result.range_deposit = Some(range);
        result.kinetic_energy = Some(kinetic_energy);
        result.total_energy = Some(total_energy);
        result.transverse_momentum = Some(transverse_momentum(total_energy, MUON_MASS, cos_theta));

        match quasi_elastic(total_energy, cos_theta) {
            Ok(kinematics) => {
                result.neutrino_energy = Some(kinematics.neutrino_energy);
                result.q_squared = Some(kinematics.q_squared);
            }
            Err(err) => debug!("event {}: kinematics not computed ({err})", result.event_id),
        }
        Ok(())
    }

    /// Reconstructs a batch in parallel. Output order matches input order.
    #[must_use]
    pub fn reconstruct_events(&self, events: &[EventInput]) -> Vec<EventOutcome> {
        events
            .par_iter()
            .map(|event| self.reconstruct_event(event))
            .collect()
    }
}

/// Initial energy estimate split by stage (MeV).
#[derive(Debug, Clone, Copy)]
struct EnergySeed {
    tank: f64,
    range: f64,
}

impl EnergySeed {
    fn total(self) -> f64 {
        self.tank + self.range
    }

    fn is_physical(self) -> bool {
        [self.tank, self.range]
            .iter()
            .all(|value| value.is_finite() && *value >= 0.0)
    }
}

/// Folds a batch of outcomes into `stats`, in order.
pub fn record_outcomes(stats: &mut RunStatistics, outcomes: &[EventOutcome]) {
    for outcome in outcomes {
        stats.record(&outcome.result);
        if outcome.profile.is_some() {
            stats.record_profile();
        }
    }
}

/// Builds a context and reconstructs one batch.
///
/// # Errors
/// Returns [`muonfit_core::Error::ConfigError`] for an invalid configuration.
pub fn reconstruct_batch(
    events: &[EventInput],
    config: ReconstructionConfig,
    geometry: &dyn GeometryProvider,
    fits: Option<&dyn TrackFitLookup>,
) -> Result<Vec<EventOutcome>> {
    let mut context = RunContext::new(config, geometry)?;
    if let Some(fits) = fits {
        context = context.with_fits(fits);
    }
    Ok(context.reconstruct_events(events))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use muonfit_core::{SensorGeometry, TankGeometry, TrackFit};
    use std::collections::HashMap;

    struct NoSensors;

    impl GeometryProvider for NoSensors {
        fn sensor(&self, _channel_id: u32) -> Option<&SensorGeometry> {
            None
        }

        fn spe_gain(&self, _channel_id: u32) -> Option<f64> {
            None
        }
    }

    fn stopped_event(number: u64) -> EventInput {
        let track = TrackStub::from_endpoints(Vector3::new(0.0, 0.0, 150.0), Vector3::new(0.0, 0.0, 250.0))
            .with_entry_point(Vector3::new(0.0, 0.0, 50.0))
            .with_exit_point(Vector3::new(0.0, 0.0, 50.0))
            .with_energy_loss(250.0);
        EventInput::new(EventId::new(0, number)).with_track(track)
    }

    #[test]
    fn test_cut_order() {
        let context = RunContext::new(ReconstructionConfig::default(), &NoSensors).unwrap();
        let cases = [
            (stopped_event(1).with_trigger_word(14), RejectReason::NotBeamTrigger),
            (stopped_event(2).with_veto_hit(true), RejectReason::VetoHit),
            (EventInput::new(EventId::new(0, 3)), RejectReason::TrackMultiplicity),
            (
                stopped_event(4).with_track(TrackStub::default()),
                RejectReason::TrackMultiplicity,
            ),
        ];
        for (event, reason) in cases {
            let outcome = context.reconstruct_event(&event);
            assert_eq!(outcome.result.status, EventStatus::Rejected(reason));
            assert!(outcome.result.kinetic_energy.is_none());
        }

        let mut through_going = stopped_event(5);
        through_going.tracks[0].is_stopped = false;
        assert_eq!(
            context.reconstruct_event(&through_going).result.status,
            EventStatus::Rejected(RejectReason::TrackNotStopped)
        );
    }

    #[test]
    fn test_degenerate_and_outside_tracks() {
        let context = RunContext::new(ReconstructionConfig::default(), &NoSensors).unwrap();

        let mut degenerate = stopped_event(1);
        degenerate.tracks[0].direction = Vector3::zero();
        assert_eq!(
            context.reconstruct_event(&degenerate).result.status,
            EventStatus::Rejected(RejectReason::DegenerateTrack)
        );

        let mut far = stopped_event(2);
        far.tracks[0].entry_point = Vector3::new(0.0, 0.0, 1000.0);
        assert_eq!(
            context.reconstruct_event(&far).result.status,
            EventStatus::Rejected(RejectReason::NoFiducialVertex)
        );
    }

    #[test]
    fn test_no_fit() {
        let context = RunContext::new(ReconstructionConfig::default(), &NoSensors).unwrap();
        let outcome = context.reconstruct_event(&stopped_event(1));
        assert_eq!(outcome.result.status, EventStatus::NoFit);
        assert_relative_eq!(outcome.result.range_length.unwrap(), 100.0);
        assert!(outcome.result.vertex.is_none());
        assert!(outcome.profile.is_none());
    }

    #[test]
    fn test_reconstructed_event() {
        let mut fits = HashMap::new();
        fits.insert(EventId::new(0, 1), TrackFit::new(5.0, 100.0));
        fits.insert(EventId::new(0, 2), TrackFit::new(5.0, -3.0));
        let context = RunContext::new(ReconstructionConfig::default(), &NoSensors)
            .unwrap()
            .with_fits(&fits);

        let result = context.reconstruct_event(&stopped_event(1)).result;
        assert_eq!(result.status, EventStatus::Reconstructed);
        let vertex = result.vertex.unwrap();
        assert_relative_eq!(vertex.z, -50.0);
        // Seed: 100 cm * 2 MeV/cm + 250 MeV fitted loss.
        assert_relative_eq!(result.seed_energy.unwrap(), 450.0);
        let tank = result.tank_deposit.unwrap();
        let range = result.range_deposit.unwrap();
        assert!(tank >= 0.0 && range >= 0.0);
        assert_relative_eq!(result.kinetic_energy.unwrap(), tank + range, epsilon = 1e-9);
        assert_relative_eq!(result.total_energy.unwrap(), result.kinetic_energy.unwrap() + MUON_MASS);
        assert!(result.neutrino_energy.is_some());
        let flags = result.fiducial.unwrap();
        assert!(flags.central && flags.full_cylinder && flags.upstream);
        assert!(!flags.downstream);
        let reporting = result.reporting_vertex.unwrap();
        assert_relative_eq!(reporting.z, -0.5 + 1.681, epsilon = 1e-12);

        assert_eq!(
            context.reconstruct_event(&stopped_event(2)).result.status,
            EventStatus::Rejected(RejectReason::BadFit)
        );
    }

    #[test]
    fn test_reporting_vertex_with_offset_tank() {
        let center = Vector3::new(0.0, -14.46, 168.1);
        let tank = TankGeometry {
            center,
            ..TankGeometry::default()
        };
        let config = ReconstructionConfig::default().with_tank(tank);
        let mut fits = HashMap::new();
        fits.insert(EventId::new(0, 1), TrackFit::new(5.0, 100.0));
        let context = RunContext::new(config, &NoSensors).unwrap().with_fits(&fits);

        let mut event = stopped_event(1);
        let track = &mut event.tracks[0];
        track.start = track.start + center;
        track.stop = track.stop + center;
        track.entry_point = track.entry_point + center;
        track.exit_point = track.exit_point + center;

        let result = context.reconstruct_event(&event).result;
        assert_eq!(result.status, EventStatus::Reconstructed);
        let vertex = result.vertex.unwrap();
        assert_relative_eq!(vertex.z, 168.1 - 50.0, epsilon = 1e-9);
        let reporting = result.reporting_vertex.unwrap();
        assert_relative_eq!(reporting.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(reporting.y, -0.1446, epsilon = 1e-12);
        assert_relative_eq!(reporting.z, -0.5 + 1.681, epsilon = 1e-12);
        let flags = result.fiducial.unwrap();
        assert!(flags.central && flags.upstream);
    }

    #[test]
    fn test_negative_energy_seed_is_rejected() {
        let mut fits = HashMap::new();
        fits.insert(EventId::new(0, 1), TrackFit::new(5.0, 100.0));
        fits.insert(EventId::new(0, 2), TrackFit::new(5.0, 100.0));
        let context = RunContext::new(ReconstructionConfig::default(), &NoSensors)
            .unwrap()
            .with_fits(&fits);

        let mut bad = stopped_event(2);
        bad.tracks[0].energy_loss = -999.0;
        let outcomes = context.reconstruct_events(&[stopped_event(1), bad]);
        assert_eq!(outcomes[0].result.status, EventStatus::Reconstructed);
        assert_eq!(
            outcomes[1].result.status,
            EventStatus::Rejected(RejectReason::InvalidEnergySeed)
        );
        assert!(outcomes[1].result.kinetic_energy.is_none());

        let mut stats = RunStatistics::new();
        record_outcomes(&mut stats, &outcomes);
        assert_eq!(stats.reconstructed, 1);
        assert_relative_eq!(
            stats.mean_kinetic_energy().unwrap(),
            outcomes[0].result.kinetic_energy.unwrap()
        );

        let simple = RunContext::new(
            ReconstructionConfig::default().with_simple_energy(true),
            &NoSensors,
        )
        .unwrap()
        .with_fits(&fits);
        let mut bad = stopped_event(2);
        bad.tracks[0].energy_loss = -999.0;
        assert_eq!(
            simple.reconstruct_event(&bad).result.status,
            EventStatus::Rejected(RejectReason::InvalidEnergySeed)
        );
    }

    #[test]
    fn test_simple_energy_reports_seed() {
        let mut fits = HashMap::new();
        fits.insert(EventId::new(0, 1), TrackFit::new(5.0, 100.0));
        let config = ReconstructionConfig::default().with_simple_energy(true);
        let context = RunContext::new(config, &NoSensors).unwrap().with_fits(&fits);
        let result = context.reconstruct_event(&stopped_event(1)).result;
        assert_relative_eq!(result.kinetic_energy.unwrap(), 450.0);
        assert_relative_eq!(result.tank_deposit.unwrap(), 200.0);
    }

    #[test]
    fn test_batch_preserves_order_and_statistics() {
        let events: Vec<EventInput> = (0..20).map(stopped_event).collect();
        let outcomes = reconstruct_batch(&events, ReconstructionConfig::default(), &NoSensors, None).unwrap();
        let ids: Vec<u64> = outcomes.iter().map(|o| o.result.event_id.number).collect();
        assert_eq!(ids, (0..20).collect::<Vec<_>>());

        let mut stats = RunStatistics::new();
        record_outcomes(&mut stats, &outcomes);
        assert_eq!(stats.events_seen, 20);
        assert_eq!(stats.no_fit, 20);
    }

    #[test]
    fn test_invalid_config_is_fatal() {
        let mut config = ReconstructionConfig::default();
        config.vertex.step = -1.0;
        assert!(RunContext::new(config.clone(), &NoSensors).is_err());
        assert!(reconstruct_batch(&[], config, &NoSensors, None).is_err());
        assert!(reconstruct_batch(&[], ReconstructionConfig::default(), &NoSensors, None)
            .unwrap()
            .is_empty());
    }
}
