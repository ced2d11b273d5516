//! Loader for the externally produced tank-length fit table.
//!
//! The table is plain text, one `event_id,cluster_time,tank_length` record
//! per line. Any line containing `#` is a comment. Repeated separators are
//! treated as one.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::{debug, warn};
use muonfit_core::{EventId, TrackFit, TrackFitLookup};

use crate::{Error, Result};

/// Fitted tank lengths keyed by event.
#[derive(Debug, Clone, Default)]
pub struct TrackFitTable {
    fits: HashMap<EventId, TrackFit>,
}

impl TrackFitTable {
    /// Loads a table from a file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or a record is malformed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let table = Self::from_reader(BufReader::new(file))?;
        debug!(
            "loaded {} track fits from {}",
            table.len(),
            path.as_ref().display()
        );
        Ok(table)
    }

    /// Parses a table from any buffered reader.
    ///
    /// The first record for an event wins; later duplicates are ignored with
    /// a warning.
    ///
    /// # Errors
    /// Returns [`Error::Parse`] with the 1-based line number of the first
    /// malformed record.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut fits = HashMap::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let line_number = index + 1;
            if line.contains('#') || line.trim().is_empty() {
                continue;
            }
            let (id, fit) = parse_record(&line, line_number)?;
            if fits.contains_key(&id) {
                warn!("line {line_number}: duplicate fit for {id} ignored");
                continue;
            }
            fits.insert(id, fit);
        }
        Ok(Self { fits })
    }

    /// Returns the number of events with a fit.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fits.len()
    }

    /// Returns true if the table holds no fits.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fits.is_empty()
    }

    /// Adds or replaces a fit.
    pub fn insert(&mut self, id: EventId, fit: TrackFit) {
        self.fits.insert(id, fit);
    }

    /// Iterates fits in event order.
    pub fn iter_sorted(&self) -> impl Iterator<Item = (&EventId, &TrackFit)> {
        let mut entries: Vec<_> = self.fits.iter().collect();
        entries.sort_by_key(|(id, _)| **id);
        entries.into_iter()
    }

    /// Summary statistics of the fitted lengths.
    #[must_use]
    pub fn summary(&self) -> FitTableSummary {
        let mut summary = FitTableSummary {
            entries: self.fits.len(),
            ..FitTableSummary::default()
        };
        for fit in self.fits.values() {
            if fit.tank_length < 0.0 || !fit.tank_length.is_finite() {
                summary.unusable += 1;
                continue;
            }
            summary.min_length = Some(
                summary
                    .min_length
                    .map_or(fit.tank_length, |m| m.min(fit.tank_length)),
            );
            summary.max_length = Some(
                summary
                    .max_length
                    .map_or(fit.tank_length, |m| m.max(fit.tank_length)),
            );
            summary.length_sum += fit.tank_length;
        }
        summary
    }
}

impl TrackFitLookup for TrackFitTable {
    fn fit(&self, id: &EventId) -> Option<TrackFit> {
        self.fits.get(id).copied()
    }
}

impl FromIterator<(EventId, TrackFit)> for TrackFitTable {
    fn from_iter<I: IntoIterator<Item = (EventId, TrackFit)>>(iter: I) -> Self {
        Self {
            fits: iter.into_iter().collect(),
        }
    }
}

fn parse_record(line: &str, line_number: usize) -> Result<(EventId, TrackFit)> {
    let fields: Vec<&str> = line
        .split(',')
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .collect();
    let [id, cluster_time, tank_length, ..] = fields.as_slice() else {
        return Err(Error::parse(
            line_number,
            format!("expected 3 fields, found {}", fields.len()),
        ));
    };
    let id: EventId = id
        .parse()
        .map_err(|err| Error::parse(line_number, format!("{err}")))?;
    let number = |name: &str, value: &str| {
        value
            .parse::<f64>()
            .map_err(|err| Error::parse(line_number, format!("{name} {value:?}: {err}")))
    };
    Ok((
        id,
        TrackFit::new(
            number("cluster_time", *cluster_time)?,
            number("tank_length", *tank_length)?,
        ),
    ))
}

/// Overview of a fit table, as printed by `muonfit fits`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FitTableSummary {
    /// Number of events in the table.
    pub entries: usize,
    /// Fits with a negative or non-finite length.
    pub unusable: usize,
    /// Shortest usable length (cm).
    pub min_length: Option<f64>,
    /// Longest usable length (cm).
    pub max_length: Option<f64>,
    length_sum: f64,
}

impl FitTableSummary {
    /// Mean usable length (cm).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_length(&self) -> Option<f64> {
        let usable = self.entries - self.unusable;
        (usable > 0).then(|| self.length_sum / usable as f64)
    }
}
