//! Stepwise energy-loss integration across the tank and range stages.

use muonfit_core::{EnergyConfig, PhysicsError};

use crate::dedx::Medium;

/// Energy bookkeeping for one integrated track.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EnergyDeposit {
    /// Energy deposited in the tank stage (MeV).
    pub tank: f64,
    /// Energy deposited in the range stage (MeV).
    pub range: f64,
    /// Energy left after both stages (MeV).
    pub final_energy: f64,
    /// True if the particle ran out of energy before the path ended.
    pub stopped_early: bool,
}

impl EnergyDeposit {
    /// Kinetic energy at production: the sum of both stage deposits (MeV).
    #[must_use]
    pub fn total(&self) -> f64 {
        self.tank + self.range
    }
}

/// Explicit-Euler integration of `dE/dx` along both stage lengths.
///
/// The loss rate of each step is evaluated at the energy at the start of the
/// step. A step never deposits more than the energy left.
#[derive(Debug, Clone)]
pub struct StoppingPowerIntegrator {
    tank: Medium,
    range: Medium,
    step: f64,
    range_cutoff: f64,
}

impl StoppingPowerIntegrator {
    /// Creates an integrator from explicit media and settings.
    #[must_use]
    pub fn new(tank: Medium, range: Medium, step: f64, range_cutoff: f64) -> Self {
        Self {
            tank,
            range,
            step,
            range_cutoff,
        }
    }

    /// Water tank followed by an iron absorber, configured from `config`.
    #[must_use]
    pub fn from_config(config: &EnergyConfig) -> Self {
        Self::new(
            Medium::tank_liquid(),
            Medium::iron().with_radiative(config.radiative_correction),
            config.step,
            config.range_cutoff,
        )
    }

    /// Integrates from `initial_energy` over `tank_length` then `range_length` (cm).
    ///
    /// # Errors
    /// Returns [`PhysicsError::NonPositiveEnergy`] if `initial_energy` is
    /// negative or not finite.
    pub fn integrate(
        &self,
        initial_energy: f64,
        tank_length: f64,
        range_length: f64,
    ) -> Result<EnergyDeposit, PhysicsError> {
        if !(initial_energy.is_finite() && initial_energy >= 0.0) {
            return Err(PhysicsError::NonPositiveEnergy(initial_energy));
        }

        let mut energy = initial_energy;
        let tank = self.run_stage(&self.tank, &mut energy, tank_length, None)?;
        let range = self.run_stage(&self.range, &mut energy, range_length, Some(self.range_cutoff))?;

        Ok(EnergyDeposit {
            tank: tank.deposited,
            range: range.deposited,
            final_energy: energy,
            stopped_early: tank.stopped || range.stopped,
        })
    }

    fn run_stage(
        &self,
        medium: &Medium,
        energy: &mut f64,
        length: f64,
        cutoff: Option<f64>,
    ) -> Result<StageOutcome, PhysicsError> {
        let mut outcome = StageOutcome::default();
        let mut remaining = length;

        while remaining > 0.0 {
            if *energy <= 0.0 || cutoff.is_some_and(|cut| *energy < cut) {
                outcome.deposited += *energy;
                *energy = 0.0;
                outcome.stopped = true;
                break;
            }

            let dx = self.step.min(remaining);
            let rate = medium.stopping_power(*energy)?;
            let delta = if rate > 0.0 {
                (rate * dx).min(*energy)
            } else {
                *energy
            };
            outcome.deposited += delta;
            *energy -= delta;
            remaining -= dx;
        }

        Ok(outcome)
    }
}

#[derive(Debug, Default)]
struct StageOutcome {
    deposited: f64,
    stopped: bool,
}
