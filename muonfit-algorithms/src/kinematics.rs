//! Charged-current quasi-elastic kinematics.

use muonfit_core::PhysicsError;

/// Proton mass (MeV).
pub const PROTON_MASS: f64 = 938.272;
/// Neutron mass (MeV).
pub const NEUTRON_MASS: f64 = 939.565;
/// Nuclear binding energy (MeV).
pub const BINDING_ENERGY: f64 = 26.0;
/// Muon mass as used in the kinematic formulae (MeV).
pub const KINEMATIC_MUON_MASS: f64 = 105.658;

/// Incident-neutrino observables for one muon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kinematics {
    /// Reconstructed neutrino energy (MeV).
    pub neutrino_energy: f64,
    /// Squared four-momentum transfer (MeV²).
    pub q_squared: f64,
}

/// Computes neutrino energy and Q² from the muon's total energy (MeV) and
/// `cos` of its angle to the beam.
///
/// # Errors
/// Returns [`PhysicsError::BelowRestMass`] when `total_energy` is below the
/// muon mass or not finite, and [`PhysicsError::Unphysical`] when the
/// quasi-elastic denominator is not positive.
pub fn quasi_elastic(total_energy: f64, cos_theta: f64) -> Result<Kinematics, PhysicsError> {
    if !(total_energy.is_finite() && cos_theta.is_finite()) || total_energy < KINEMATIC_MUON_MASS {
        return Err(PhysicsError::BelowRestMass {
            energy: total_energy,
            mass: KINEMATIC_MUON_MASS,
        });
    }
    let cos_theta = cos_theta.clamp(-1.0, 1.0);
    let m_mu_sq = KINEMATIC_MUON_MASS * KINEMATIC_MUON_MASS;
    let momentum = (total_energy * total_energy - m_mu_sq).sqrt();
    let bound = NEUTRON_MASS - BINDING_ENERGY;

    let denominator = 2.0 * (bound - total_energy + momentum * cos_theta);
    if denominator <= 0.0 {
        return Err(PhysicsError::Unphysical(denominator));
    }
    let numerator = PROTON_MASS * PROTON_MASS - bound * bound - m_mu_sq + 2.0 * bound * total_energy;
    let neutrino_energy = numerator / denominator;
    let q_squared = 2.0 * neutrino_energy * (total_energy - momentum * cos_theta) - m_mu_sq;

    Ok(Kinematics {
        neutrino_energy,
        q_squared,
    })
}

/// Transverse momentum (MeV/c) from total energy, mass and `cos θ`.
///
/// Returns 0 when the energy is below the mass.
#[must_use]
pub fn transverse_momentum(total_energy: f64, mass: f64, cos_theta: f64) -> f64 {
    let p_sq = (total_energy * total_energy - mass * mass).max(0.0);
    let sin_sq = (1.0 - cos_theta * cos_theta).max(0.0);
    (sin_sq * p_sq).sqrt()
}
