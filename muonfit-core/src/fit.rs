//! Externally fitted tank-stage track lengths.

use std::collections::HashMap;

use crate::event::EventId;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Result of the external photon-density fit for one event.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrackFit {
    /// Time of the cluster the profile was built from (ns).
    pub cluster_time: f64,
    /// Fitted tank-stage path length (cm).
    pub tank_length: f64,
}

impl TrackFit {
    /// Creates a new fit record.
    #[must_use]
    pub const fn new(cluster_time: f64, tank_length: f64) -> Self {
        Self {
            cluster_time,
            tank_length,
        }
    }
}

/// Run-scoped lookup of fitted tank lengths by event.
pub trait TrackFitLookup: Send + Sync {
    /// The fit for an event, if one exists.
    fn fit(&self, id: &EventId) -> Option<TrackFit>;
}

impl TrackFitLookup for HashMap<EventId, TrackFit> {
    fn fit(&self, id: &EventId) -> Option<TrackFit> {
        self.get(id).copied()
    }
}
