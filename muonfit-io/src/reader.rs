//! Readers for event records and run configuration.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use log::debug;
use muonfit_core::{EventInput, ReconstructionConfig};

use crate::{Error, Result};

/// Streams [`EventInput`] records from a JSON Lines file.
///
/// Blank lines are skipped. Each other line must hold one event object.
pub struct EventReader<R: BufRead> {
    lines: Lines<R>,
    line_number: usize,
}

impl EventReader<BufReader<File>> {
    /// Opens a JSON Lines event file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> EventReader<R> {
    /// Wraps a buffered reader.
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_number: 0,
        }
    }

    /// Reads every remaining event.
    ///
    /// # Errors
    /// Returns the first read or decode error.
    pub fn read_all(self) -> Result<Vec<EventInput>> {
        self.collect()
    }
}

impl<R: BufRead> Iterator for EventReader<R> {
    type Item = Result<EventInput>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(err) => return Some(Err(err.into())),
            };
            self.line_number += 1;
            if line.trim().is_empty() {
                continue;
            }
            return Some(
                serde_json::from_str(&line)
                    .map_err(|err| Error::parse(self.line_number, err.to_string())),
            );
        }
    }
}

/// Reads all events from a JSON Lines file.
///
/// # Errors
/// Returns an error if the file cannot be read or a line is not a valid event.
pub fn read_events<P: AsRef<Path>>(path: P) -> Result<Vec<EventInput>> {
    let events = EventReader::open(path.as_ref())?.read_all()?;
    debug!("read {} events from {}", events.len(), path.as_ref().display());
    Ok(events)
}

/// Reads a JSON run configuration. Missing fields take their defaults.
///
/// # Errors
/// Returns an error if the file cannot be read or decoded, or if the
/// configuration is invalid.
pub fn read_config<P: AsRef<Path>>(path: P) -> Result<ReconstructionConfig> {
    let file = File::open(path)?;
    let config: ReconstructionConfig = serde_json::from_reader(BufReader::new(file))?;
    config.validate()?;
    Ok(config)
}
