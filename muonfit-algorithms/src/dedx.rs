//! Restricted mean energy loss of muons (Bethe formula, no density effect).

use muonfit_core::PhysicsError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Muon rest mass used for stopping power and total energy (MeV).
pub const MUON_MASS: f64 = 105.66;
/// Electron rest mass (MeV).
pub const ELECTRON_MASS: f64 = 0.511;
/// `4π N_A r_e² m_e c²` (MeV cm²/mol).
pub const BETHE_K: f64 = 0.307;

/// One component of a medium.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Constituent {
    /// Mass fraction of the medium.
    pub mass_fraction: f64,
    /// Density (g/cm³).
    pub density: f64,
    /// Z/A.
    pub z_over_a: f64,
    /// Mean excitation energy (MeV).
    pub mean_excitation: f64,
}

impl Constituent {
    /// Creates a constituent.
    #[must_use]
    pub const fn new(mass_fraction: f64, density: f64, z_over_a: f64, mean_excitation: f64) -> Self {
        Self {
            mass_fraction,
            density,
            z_over_a,
            mean_excitation,
        }
    }
}

/// A medium a muon loses energy in.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Medium {
    /// Short name used in logs.
    pub name: String,
    /// Ionising components.
    pub constituents: Vec<Constituent>,
    /// Add the low-energy radiative term.
    pub radiative: bool,
}

impl Medium {
    /// Gadolinium-loaded water.
    #[must_use]
    pub fn tank_liquid() -> Self {
        Self {
            name: "gd-water".to_string(),
            constituents: vec![
                Constituent::new(0.999 * 16.0 / 18.0, 1.0, 0.5, 9.2e-5),
                Constituent::new(0.999 * 2.0 / 18.0, 1.0, 1.0, 1.92e-5),
                Constituent::new(0.001 * 314.0 / 602.0, 1.0, 0.5, 5.888e-4),
            ],
            radiative: false,
        }
    }

    /// Iron absorber.
    #[must_use]
    pub fn iron() -> Self {
        Self {
            name: "iron".to_string(),
            constituents: vec![Constituent::new(1.0, 7.874, 0.464, 2.86e-4)],
            radiative: false,
        }
    }

    /// Enables or disables the radiative term.
    #[must_use]
    pub fn with_radiative(mut self, radiative: bool) -> Self {
        self.radiative = radiative;
        self
    }

    /// Mass-weighted density (g/cm³).
    fn density(&self) -> f64 {
        self.constituents
            .iter()
            .map(|c| c.mass_fraction * c.density)
            .sum()
    }

    /// Energy loss per unit length (MeV/cm) at kinetic energy `kinetic_energy` (MeV).
    ///
    /// # Errors
    /// Returns [`PhysicsError::NonPositiveEnergy`] for non-positive or
    /// non-finite energies, or if the loss rate is not finite.
    pub fn stopping_power(&self, kinetic_energy: f64) -> Result<f64, PhysicsError> {
        if !(kinetic_energy.is_finite() && kinetic_energy > 0.0) {
            return Err(PhysicsError::NonPositiveEnergy(kinetic_energy));
        }

        let gamma = (kinetic_energy + MUON_MASS) / MUON_MASS;
        let beta_sq = (gamma * gamma - 1.0) / (gamma * gamma);
        let bg_sq = beta_sq * gamma * gamma;
        let mass_ratio = ELECTRON_MASS / MUON_MASS;
        let t_max = 2.0 * ELECTRON_MASS * bg_sq
            / (1.0 + 2.0 * ELECTRON_MASS * gamma / MUON_MASS + mass_ratio * mass_ratio);

        let ionisation: f64 = self
            .constituents
            .iter()
            .map(|c| {
                let ln_term =
                    (2.0 * ELECTRON_MASS * bg_sq * t_max / (c.mean_excitation * c.mean_excitation)).ln();
                c.mass_fraction * c.density * BETHE_K * c.z_over_a / beta_sq
                    * (0.5 * ln_term - beta_sq - 0.5)
            })
            .sum();

        let total = if self.radiative {
            ionisation + radiative_loss(kinetic_energy, self.density())
        } else {
            ionisation
        };

        if total.is_finite() {
            Ok(total)
        } else {
            Err(PhysicsError::NonPositiveEnergy(kinetic_energy))
        }
    }
}

/// Radiative loss `b(T)·T·ρ` with `b` in 1e-6 cm²/g, floored at zero.
fn radiative_loss(kinetic_energy: f64, density: f64) -> f64 {
    let b = (1.0338 * (kinetic_energy / 1000.0).ln() + 0.89287).max(0.0);
    b * 1e-6 * kinetic_energy * density
}
