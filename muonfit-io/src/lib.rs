//! muonfit-io: File I/O for muonfit.
//!
//! This crate reads the per-run inputs (events as JSON Lines, the detector
//! description, the external tank-length fit table and the run
//! configuration) and writes the result and profile CSV files.
//!

mod detector;
mod error;
mod reader;
mod track_fits;
mod writer;

pub use detector::SensorTable;
pub use error::{Error, Result};
pub use reader::{read_config, read_events, EventReader};
pub use track_fits::{FitTableSummary, TrackFitTable};
pub use writer::{ProfileWriter, ResultWriter, PROFILE_HEADER, RESULT_HEADER};
