//! Run-level diagnostic counters.

use std::collections::BTreeMap;

use crate::result::{EventStatus, ReconstructionResult, RejectReason};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Accumulated counters for a reconstruction run.
///
/// Updated by the caller after each batch, in input order.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RunStatistics {
    /// Number of events seen.
    pub events_seen: usize,
    /// Events with all physics outputs.
    pub reconstructed: usize,
    /// Events passing the cuts without a tank-length fit.
    pub no_fit: usize,
    /// Rejected events by reason.
    pub rejected: BTreeMap<RejectReason, usize>,
    /// Photon-density profiles built.
    pub profiles_built: usize,
    /// Reconstructed events that carry a kinetic energy.
    pub energies_recorded: usize,
    /// Sum of reconstructed kinetic energies (MeV).
    pub kinetic_energy_sum: f64,
}

impl RunStatistics {
    /// Creates empty statistics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one event result.
    pub fn record(&mut self, result: &ReconstructionResult) {
        self.events_seen += 1;
        match result.status {
            EventStatus::Reconstructed => {
                self.reconstructed += 1;
                if let Some(energy) = result.kinetic_energy {
                    self.energies_recorded += 1;
                    self.kinetic_energy_sum += energy;
                }
            }
            EventStatus::NoFit => self.no_fit += 1,
            EventStatus::Rejected(reason) => *self.rejected.entry(reason).or_insert(0) += 1,
        }
    }

    /// Records that a profile was built.
    pub fn record_profile(&mut self) {
        self.profiles_built += 1;
    }

    /// Folds another accumulator into this one.
    pub fn merge(&mut self, other: &Self) {
        self.events_seen += other.events_seen;
        self.reconstructed += other.reconstructed;
        self.no_fit += other.no_fit;
        for (reason, count) in &other.rejected {
            *self.rejected.entry(*reason).or_insert(0) += count;
        }
        self.profiles_built += other.profiles_built;
        self.energies_recorded += other.energies_recorded;
        self.kinetic_energy_sum += other.kinetic_energy_sum;
    }

    /// Total rejected events.
    #[must_use]
    pub fn rejected_total(&self) -> usize {
        self.rejected.values().sum()
    }

    /// Rejections for one reason.
    #[must_use]
    pub fn rejected_for(&self, reason: RejectReason) -> usize {
        self.rejected.get(&reason).copied().unwrap_or(0)
    }

    /// Mean kinetic energy over reconstructed events that have one (MeV).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_kinetic_energy(&self) -> Option<f64> {
        if self.energies_recorded == 0 {
            None
        } else {
            Some(self.kinetic_energy_sum / self.energies_recorded as f64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventId;
    use approx::assert_relative_eq;

    fn reconstructed(energy: f64) -> ReconstructionResult {
        let mut result = ReconstructionResult::empty(EventId::new(0, 0), EventStatus::Reconstructed);
        result.kinetic_energy = Some(energy);
        result
    }

    #[test]
    fn test_record() {
        let mut stats = RunStatistics::new();
        stats.record(&reconstructed(300.0));
        stats.record(&reconstructed(500.0));
        stats.record(&ReconstructionResult::empty(EventId::new(0, 1), EventStatus::NoFit));
        stats.record(&ReconstructionResult::rejected(EventId::new(0, 2), RejectReason::VetoHit));

        assert_eq!(stats.events_seen, 4);
        assert_eq!(stats.reconstructed, 2);
        assert_eq!(stats.no_fit, 1);
        assert_eq!(stats.rejected_for(RejectReason::VetoHit), 1);
        assert_eq!(stats.rejected_for(RejectReason::BadFit), 0);
        assert_relative_eq!(stats.mean_kinetic_energy().unwrap(), 400.0);
    }

    #[test]
    fn test_merge() {
        let mut a = RunStatistics::new();
        a.record(&reconstructed(100.0));
        a.record(&ReconstructionResult::rejected(EventId::new(0, 2), RejectReason::TrackNotStopped));
        let mut b = RunStatistics::new();
        b.record(&ReconstructionResult::rejected(EventId::new(0, 3), RejectReason::TrackNotStopped));
        b.record_profile();

        a.merge(&b);
        assert_eq!(a.events_seen, 3);
        assert_eq!(a.rejected_total(), 2);
        assert_eq!(a.rejected_for(RejectReason::TrackNotStopped), 2);
        assert_eq!(a.profiles_built, 1);
    }

    #[test]
    fn test_empty_mean() {
        assert!(RunStatistics::new().mean_kinetic_energy().is_none());
    }

    #[test]
    fn test_mean_ignores_events_without_energy() {
        let mut stats = RunStatistics::new();
        stats.record(&reconstructed(450.0));
        stats.record(&ReconstructionResult::empty(EventId::new(0, 3), EventStatus::Reconstructed));
        assert_eq!(stats.reconstructed, 2);
        assert_eq!(stats.energies_recorded, 1);
        assert_relative_eq!(stats.mean_kinetic_energy().unwrap(), 450.0);

        let mut merged = RunStatistics::new();
        merged.merge(&stats);
        merged.merge(&stats);
        assert_eq!(merged.energies_recorded, 2);
        assert_relative_eq!(merged.mean_kinetic_energy().unwrap(), 450.0);
    }
}
