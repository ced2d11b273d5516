//! Per-event input records and identifiers.

use std::fmt;
use std::str::FromStr;

use crate::sensor::TankCluster;
use crate::track::TrackStub;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Identifies an event as `p<part>_<number>`.
///
/// Serialized in that string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct EventId {
    /// Run part (file segment) number.
    pub part: u32,
    /// Event number within the part.
    pub number: u64,
}

impl EventId {
    /// Creates a new event id.
    #[must_use]
    pub const fn new(part: u32, number: u64) -> Self {
        Self { part, number }
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}_{}", self.part, self.number)
    }
}

/// Error parsing an [`EventId`] string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid event id {0:?}, expected p<part>_<number>")]
pub struct ParseEventIdError(pub String);

impl FromStr for EventId {
    type Err = ParseEventIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseEventIdError(s.to_string());
        let rest = s.trim().strip_prefix('p').ok_or_else(err)?;
        let (part, number) = rest.split_once('_').ok_or_else(err)?;
        Ok(Self {
            part: part.parse().map_err(|_| err())?,
            number: number.parse().map_err(|_| err())?,
        })
    }
}

impl TryFrom<String> for EventId {
    type Error = ParseEventIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EventId> for String {
    fn from(id: EventId) -> Self {
        id.to_string()
    }
}

/// Everything reconstruction needs to know about one event.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EventInput {
    pub id: EventId,
    /// Trigger word, when the event carries one. Simulation usually does not.
    pub trigger_word: Option<u32>,
    /// True if the front veto fired.
    pub veto_hit: bool,
    /// Range-stage tracks.
    pub tracks: Vec<TrackStub>,
    /// Tank-stage clusters.
    pub clusters: Vec<TankCluster>,
}

impl EventInput {
    /// Creates an event with the given id and no content.
    #[must_use]
    pub fn new(id: EventId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// Adds a range-stage track.
    #[must_use]
    pub fn with_track(mut self, track: TrackStub) -> Self {
        self.tracks.push(track);
        self
    }

    /// Adds a tank cluster.
    #[must_use]
    pub fn with_cluster(mut self, cluster: TankCluster) -> Self {
        self.clusters.push(cluster);
        self
    }

    /// Sets the trigger word.
    #[must_use]
    pub fn with_trigger_word(mut self, trigger_word: u32) -> Self {
        self.trigger_word = Some(trigger_word);
        self
    }

    /// Sets the veto flag.
    #[must_use]
    pub fn with_veto_hit(mut self, veto_hit: bool) -> Self {
        self.veto_hit = veto_hit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_id_display_and_parse() {
        let id = EventId::new(3, 1234);
        assert_eq!(id.to_string(), "p3_1234");
        assert_eq!("p3_1234".parse::<EventId>(), Ok(id));
        assert_eq!(" p0_7 ".parse::<EventId>(), Ok(EventId::new(0, 7)));
    }

    #[test]
    fn test_event_id_rejects_malformed() {
        for bad in ["3_1234", "p3-1234", "px_1", "p1_", ""] {
            assert!(bad.parse::<EventId>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn test_event_builders() {
        let event = EventInput::new(EventId::new(1, 2))
            .with_trigger_word(5)
            .with_veto_hit(true)
            .with_track(TrackStub::default())
            .with_cluster(TankCluster::default());
        assert_eq!(event.trigger_word, Some(5));
        assert!(event.veto_hit);
        assert_eq!(event.tracks.len(), 1);
        assert_eq!(event.clusters.len(), 1);
    }
}
