//! Photon-density versus track-distance profiles.
//!
//! Each sensor is projected back onto the track at the point whose Cherenkov
//! cone reaches it. The sensor's charge and its share of the emission ring are
//! accumulated per distance bin; the ratio is the photon density `eta`.

use std::f64::consts::{FRAC_PI_2, PI};

use muonfit_core::geometry::LENGTH_EPSILON;
use muonfit_core::{GeometryError, ProfileConfig, SensorLightRecord, Vector3};

/// Accumulators for one distance bin.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProfileBin {
    /// Bin centre, distance from the tank exit point (cm).
    pub center: f64,
    /// Summed photoelectrons.
    pub sum_pe: f64,
    /// Summed ring-area fractions.
    pub sum_area_fraction: f64,
}

impl ProfileBin {
    /// Photon density, or `None` if nothing landed in the bin.
    #[must_use]
    pub fn eta(&self) -> Option<f64> {
        (self.sum_area_fraction > 0.0).then(|| self.sum_pe / self.sum_area_fraction)
    }
}

/// A single `(distance, eta)` point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfilePoint {
    /// Distance from the tank exit point (cm).
    pub distance: f64,
    /// Photon density.
    pub eta: f64,
}

/// Binned accumulators for one event.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSegmentProfile {
    bins: Vec<ProfileBin>,
    bin_width: f64,
    /// Sensors that landed in a bin.
    pub accepted: usize,
    /// Sensors skipped as degenerate or out of range.
    pub dropped: usize,
}

impl TrackSegmentProfile {
    fn new(config: &ProfileConfig) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let bins = (0..config.bin_count())
            .map(|i| ProfileBin {
                center: config.first_bin_center + i as f64 * config.bin_width,
                ..ProfileBin::default()
            })
            .collect();
        Self {
            bins,
            bin_width: config.bin_width,
            accepted: 0,
            dropped: 0,
        }
    }

    /// Index of the bin with `center - w/2 <= distance < center + w/2`.
    fn bin_index(&self, distance: f64) -> Option<usize> {
        self.bins.iter().position(|bin| {
            distance >= bin.center - self.bin_width / 2.0 && distance < bin.center + self.bin_width / 2.0
        })
    }

    fn fill(&mut self, distance: f64, pe: f64, area_fraction: f64) {
        if let Some(index) = self.bin_index(distance) {
            let bin = &mut self.bins[index];
            bin.sum_pe += pe;
            bin.sum_area_fraction += area_fraction;
            self.accepted += 1;
        } else {
            self.dropped += 1;
        }
    }

    /// All bins, including empty ones.
    #[must_use]
    pub fn bins(&self) -> &[ProfileBin] {
        &self.bins
    }

    /// Points for bins with a defined density, in distance order.
    #[must_use]
    pub fn points(&self) -> Vec<ProfilePoint> {
        self.bins
            .iter()
            .filter_map(|bin| {
                bin.eta().map(|eta| ProfilePoint {
                    distance: bin.center,
                    eta,
                })
            })
            .collect()
    }

    /// Unweighted mean density over the defined points.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_eta(&self) -> Option<f64> {
        let points = self.points();
        if points.is_empty() {
            return None;
        }
        Some(points.iter().map(|p| p.eta).sum::<f64>() / points.len() as f64)
    }

    /// Returns true if no bin has a defined density.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bins.iter().all(|bin| bin.sum_area_fraction <= 0.0)
    }
}

/// Projection of one sensor onto the track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorProjection {
    /// Distance from the exit point back to the emission point (cm).
    pub distance: f64,
    /// Fraction of the emission ring covered by the sensor.
    pub area_fraction: f64,
}

/// Builds [`TrackSegmentProfile`]s.
#[derive(Debug, Clone)]
pub struct PhotonDensityProfiler {
    config: ProfileConfig,
    tan_cherenkov: f64,
}

impl PhotonDensityProfiler {
    /// Creates a profiler.
    #[must_use]
    pub fn new(config: ProfileConfig) -> Self {
        let tan_cherenkov = config.cherenkov_angle_deg.to_radians().tan();
        Self {
            config,
            tan_cherenkov,
        }
    }

    /// Projects one sensor onto the track through `exit_point` along unit `direction`.
    ///
    /// Returns `None` for a sensor sitting on the exit point.
    #[must_use]
    pub fn project(
        &self,
        record: &SensorLightRecord,
        exit_point: &Vector3,
        direction: &Vector3,
    ) -> Option<SensorProjection> {
        let to_sensor = record.position - *exit_point;
        let ri = to_sensor.magnitude();
        if ri < LENGTH_EPSILON {
            return None;
        }

        let alpha = to_sensor.angle_to(&-*direction);
        let distance = ri * alpha.sin() / self.tan_cherenkov + ri * alpha.cos();

        let emission = *exit_point - *direction * distance;
        let bi = record.position - emission;
        let mut psi = bi.angle_to(&-record.orientation);
        if psi > FRAC_PI_2 {
            psi = PI - psi;
        }

        let effective_area = 0.5 * record.area * (1.0 + psi.cos());
        let ring_area = 2.0 * PI * self.config.bin_width * ri;
        Some(SensorProjection {
            distance,
            area_fraction: effective_area / ring_area,
        })
    }

    /// Accumulates all sensor records into a profile.
    ///
    /// # Errors
    /// Returns [`GeometryError::ZeroDirection`] for a zero-length direction.
    pub fn profile(
        &self,
        records: &[SensorLightRecord],
        exit_point: &Vector3,
        direction: &Vector3,
    ) -> Result<TrackSegmentProfile, GeometryError> {
        let direction = direction.unit().ok_or(GeometryError::ZeroDirection)?;
        let mut profile = TrackSegmentProfile::new(&self.config);

        for record in records {
            match self.project(record, exit_point, &direction) {
                Some(projection) => {
                    profile.fill(projection.distance, record.total_pe, projection.area_fraction);
                }
                None => {
                    log::debug!("sensor {} sits on the tank exit point, skipped", record.channel_id);
                    profile.dropped += 1;
                }
            }
        }
        Ok(profile)
    }
}
