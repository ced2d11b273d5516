//! Run-scoped reconstruction configuration.
//!
//! Defaults reproduce the legacy analysis constants. Every group derives
//! serde traits behind the `serde` feature and tolerates partial documents.

use crate::error::{Error, Result};
use crate::geometry::{FiducialCylinder, TankGeometry, Vector3};
use crate::sensor::ChargeUnits;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Method used to measure the range-stage path length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RangeLengthMethod {
    /// `|stop - start|` of the track stub.
    #[default]
    StubEndpoints,
    /// Sum of distances between consecutive hit paddles.
    ConnectTheDots,
    /// Layers crossed times layer thickness over `|cos(angle)|`.
    LayerCount,
}

/// Source of the track angle used downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AngleSource {
    /// Angle reported by the track fit.
    #[default]
    Stub,
    /// Principal direction of the hit paddle positions.
    PrincipalDirection,
}

/// Backward vertex-candidate search.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct VertexSearchConfig {
    /// Step length (cm).
    pub step: f64,
    /// Candidates accepted regardless of containment.
    pub unconditional_steps: usize,
    /// Volume a candidate must fall in to count as fiducial.
    pub fiducial: FiducialCylinder,
    /// Upper bound on emitted candidates.
    pub max_steps: usize,
}

impl Default for VertexSearchConfig {
    fn default() -> Self {
        Self {
            step: 10.0,
            unconditional_steps: 5,
            fiducial: FiducialCylinder::new(100.0, 100.0),
            max_steps: 1000,
        }
    }
}

/// Photon-density profile binning.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ProfileConfig {
    /// Cherenkov half-angle (degrees).
    pub cherenkov_angle_deg: f64,
    /// Bin width (cm).
    pub bin_width: f64,
    /// Centre of the first bin (cm).
    pub first_bin_center: f64,
    /// Centre of the last bin (cm).
    pub last_bin_center: f64,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            cherenkov_angle_deg: 41.0,
            bin_width: 5.0,
            first_bin_center: 55.0,
            last_bin_center: 495.0,
        }
    }
}

impl ProfileConfig {
    /// Number of bins spanned by the configured centres.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn bin_count(&self) -> usize {
        if self.bin_width <= 0.0 || self.last_bin_center < self.first_bin_center {
            return 0;
        }
        ((self.last_bin_center - self.first_bin_center) / self.bin_width).round() as usize + 1
    }
}

/// Main tank-cluster selection and light aggregation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ClusterSelectionConfig {
    /// Earliest accepted mean cluster time (ns).
    pub min_mean_time: f64,
    /// Latest accepted mean cluster time (ns).
    pub max_mean_time: f64,
    /// Expected `track_start - cluster_time` (ns).
    pub coincidence_offset: f64,
    /// Half-width of the coincidence window (ns, exclusive).
    pub coincidence_half_width: f64,
    /// Minimum summed PE for a sensor to enter the profile.
    pub charge_threshold_pe: f64,
    /// Units of the hit charges.
    pub charge_units: ChargeUnits,
}

impl Default for ClusterSelectionConfig {
    fn default() -> Self {
        Self {
            min_mean_time: 0.0,
            max_mean_time: 2000.0,
            coincidence_offset: 745.0,
            coincidence_half_width: 50.0,
            charge_threshold_pe: 3.0,
            charge_units: ChargeUnits::Calibrated,
        }
    }
}

impl ClusterSelectionConfig {
    /// Settings for simulated events: no readout delay, charge already in PE.
    #[must_use]
    pub fn simulation() -> Self {
        Self::default().with_simulation_readout()
    }

    /// Switches to simulated readout, keeping every other setting.
    #[must_use]
    pub fn with_simulation_readout(mut self) -> Self {
        self.coincidence_offset = 0.0;
        self.charge_units = ChargeUnits::PhotoElectrons;
        self
    }
}

/// Energy seed and stopping-power integration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EnergyConfig {
    /// Seed loss rate in the tank (MeV/cm).
    pub tank_seed_dedx: f64,
    /// Seed loss rate in the absorber (MeV/cm).
    pub range_seed_dedx: f64,
    /// Seed the range stage from the track fit's energy loss.
    pub use_track_energy_loss: bool,
    /// Integration step (cm).
    pub step: f64,
    /// Energy below which the range stage deposits what is left (MeV).
    pub range_cutoff: f64,
    /// Absorber layer thickness (cm).
    pub layer_thickness: f64,
    /// Initial range-stage loss at which the high-energy rescale applies (MeV).
    pub scatter_threshold: f64,
    /// Layer-count length divisor at or above the threshold.
    pub scatter_factor_high: f64,
    /// Layer-count length divisor below the threshold.
    pub scatter_factor_low: f64,
    /// Add the radiative term to the absorber stopping power.
    pub radiative_correction: bool,
    /// Report the seed instead of the integrated energy.
    pub simple: bool,
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            tank_seed_dedx: 2.0,
            range_seed_dedx: 11.5,
            use_track_energy_loss: true,
            step: 10.0,
            range_cutoff: 20.0,
            layer_thickness: 5.0,
            scatter_threshold: 400.0,
            scatter_factor_high: 0.95,
            scatter_factor_low: 0.80,
            radiative_correction: false,
            simple: false,
        }
    }
}

/// Fiducial shapes applied to the resolved vertex (tank frame).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FiducialConfig {
    /// Central volume.
    pub central: FiducialCylinder,
    /// Full-cylinder volume, also split into upstream and downstream halves.
    pub full_cylinder: FiducialCylinder,
    /// Downstream half extends to this z (cm, exclusive).
    pub downstream_z_max: f64,
}

impl Default for FiducialConfig {
    fn default() -> Self {
        Self {
            central: FiducialCylinder::new(100.0, 100.0),
            full_cylinder: FiducialCylinder::new(100.0, 50.0),
            downstream_z_max: 100.0,
        }
    }
}

/// Affine map from the tank frame (cm) to the reporting frame (m).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ReportingFrame {
    /// Length conversion applied first (m per cm).
    pub scale: f64,
    /// Added after scaling (m).
    pub offset: Vector3,
}

impl Default for ReportingFrame {
    fn default() -> Self {
        Self {
            scale: 0.01,
            offset: Vector3::new(0.0, -0.1446, 1.681),
        }
    }
}

impl ReportingFrame {
    /// Maps a tank-frame point into the reporting frame.
    #[must_use]
    pub fn transform(&self, point: &Vector3) -> Vector3 {
        *point * self.scale + self.offset
    }
}

/// Complete configuration for a reconstruction run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ReconstructionConfig {
    /// Tank containment cylinder.
    pub tank: TankGeometry,
    /// Backward vertex-candidate search.
    pub vertex: VertexSearchConfig,
    /// Photon-density profile binning.
    pub profile: ProfileConfig,
    /// Main cluster selection and light aggregation.
    pub clusters: ClusterSelectionConfig,
    /// Energy seed and integration.
    pub energy: EnergyConfig,
    /// Fiducial shapes for the resolved vertex.
    pub fiducial: FiducialConfig,
    /// Output frame of the reporting vertex.
    pub reporting: ReportingFrame,
    /// Range-stage length estimator.
    pub range_length: RangeLengthMethod,
    /// Where the track angle comes from.
    pub angle_source: AngleSource,
    /// Required trigger word when the event carries one.
    pub beam_trigger: u32,
}

impl Default for ReconstructionConfig {
    fn default() -> Self {
        Self {
            tank: TankGeometry::default(),
            vertex: VertexSearchConfig::default(),
            profile: ProfileConfig::default(),
            clusters: ClusterSelectionConfig::default(),
            energy: EnergyConfig::default(),
            fiducial: FiducialConfig::default(),
            reporting: ReportingFrame::default(),
            range_length: RangeLengthMethod::default(),
            angle_source: AngleSource::default(),
            beam_trigger: 5,
        }
    }
}

impl ReconstructionConfig {
    /// Creates a configuration with legacy defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults adjusted for simulated input.
    #[must_use]
    pub fn simulation() -> Self {
        Self::default().with_simulation_readout()
    }

    /// Switches cluster handling to simulated readout, keeping all other settings.
    #[must_use]
    pub fn with_simulation_readout(mut self) -> Self {
        self.clusters = self.clusters.with_simulation_readout();
        self
    }

    /// Sets the tank geometry.
    #[must_use]
    pub fn with_tank(mut self, tank: TankGeometry) -> Self {
        self.tank = tank;
        self
    }

    /// Sets the cluster selection settings.
    #[must_use]
    pub fn with_clusters(mut self, clusters: ClusterSelectionConfig) -> Self {
        self.clusters = clusters;
        self
    }

    /// Sets the energy settings.
    #[must_use]
    pub fn with_energy(mut self, energy: EnergyConfig) -> Self {
        self.energy = energy;
        self
    }

    /// Sets the range-length method.
    #[must_use]
    pub fn with_range_length(mut self, method: RangeLengthMethod) -> Self {
        self.range_length = method;
        self
    }

    /// Sets the angle source.
    #[must_use]
    pub fn with_angle_source(mut self, source: AngleSource) -> Self {
        self.angle_source = source;
        self
    }

    /// Enables or disables simple (seed-only) energy reporting.
    #[must_use]
    pub fn with_simple_energy(mut self, simple: bool) -> Self {
        self.energy.simple = simple;
        self
    }

    /// Checks that lengths and bin settings are usable.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("tank.radius", self.tank.radius),
            ("tank.half_height", self.tank.half_height),
            ("vertex.step", self.vertex.step),
            ("energy.tank_seed_dedx", self.energy.tank_seed_dedx),
            ("energy.range_seed_dedx", self.energy.range_seed_dedx),
            ("profile.bin_width", self.profile.bin_width),
            ("energy.step", self.energy.step),
            ("energy.layer_thickness", self.energy.layer_thickness),
            ("energy.scatter_factor_high", self.energy.scatter_factor_high),
            ("energy.scatter_factor_low", self.energy.scatter_factor_low),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::ConfigError(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        let angle = self.profile.cherenkov_angle_deg;
        if !(angle > 0.0 && angle < 90.0) {
            return Err(Error::ConfigError(format!(
                "profile.cherenkov_angle_deg must lie in (0, 90), got {angle}"
            )));
        }
        if self.profile.bin_count() == 0 {
            return Err(Error::ConfigError(
                "profile bin centres describe an empty range".to_string(),
            ));
        }
        if self.clusters.max_mean_time < self.clusters.min_mean_time {
            return Err(Error::ConfigError(
                "clusters.max_mean_time is below clusters.min_mean_time".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults_match_legacy_constants() {
        let config = ReconstructionConfig::default();
        assert_relative_eq!(config.vertex.step, 10.0);
        assert_eq!(config.vertex.unconditional_steps, 5);
        assert_relative_eq!(config.profile.cherenkov_angle_deg, 41.0);
        assert_eq!(config.profile.bin_count(), 89);
        assert_relative_eq!(config.clusters.coincidence_offset, 745.0);
        assert_relative_eq!(config.energy.range_cutoff, 20.0);
        assert!(config.energy.use_track_energy_loss);
        assert!(!config.energy.radiative_correction);
        assert_eq!(config.range_length, RangeLengthMethod::StubEndpoints);
        assert_eq!(config.beam_trigger, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_simulation_preset() {
        let config = ReconstructionConfig::simulation();
        assert_relative_eq!(config.clusters.coincidence_offset, 0.0);
        assert_eq!(config.clusters.charge_units, ChargeUnits::PhotoElectrons);
    }

    #[test]
    fn test_simulation_readout_keeps_other_cluster_settings() {
        let mut config = ReconstructionConfig::default();
        config.clusters.charge_threshold_pe = 5.0;
        config.clusters.coincidence_half_width = 80.0;
        config.beam_trigger = 14;

        let config = config.with_simulation_readout();
        assert_relative_eq!(config.clusters.coincidence_offset, 0.0);
        assert_eq!(config.clusters.charge_units, ChargeUnits::PhotoElectrons);
        assert_relative_eq!(config.clusters.charge_threshold_pe, 5.0);
        assert_relative_eq!(config.clusters.coincidence_half_width, 80.0);
        assert_eq!(config.beam_trigger, 14);
    }

    #[test]
    fn test_builders() {
        let config = ReconstructionConfig::new()
            .with_range_length(RangeLengthMethod::LayerCount)
            .with_angle_source(AngleSource::PrincipalDirection)
            .with_simple_energy(true);
        assert_eq!(config.range_length, RangeLengthMethod::LayerCount);
        assert_eq!(config.angle_source, AngleSource::PrincipalDirection);
        assert!(config.energy.simple);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = ReconstructionConfig::default();
        config.energy.step = 0.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("energy.step"));

        let mut config = ReconstructionConfig::default();
        config.profile.cherenkov_angle_deg = 90.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reporting_frame() {
        let frame = ReportingFrame::default();
        let p = frame.transform(&Vector3::new(100.0, 100.0, 100.0));
        assert_relative_eq!(p.x, 1.0);
        assert_relative_eq!(p.y, 1.0 - 0.1446);
        assert_relative_eq!(p.z, 1.0 + 1.681);
    }
}
