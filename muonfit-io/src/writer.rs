//! CSV writers for reconstruction results and photon-density profiles.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use muonfit_algorithms::{EventOutcome, EventProfile};
use muonfit_core::{FiducialFlags, ReconstructionResult, Vector3};

use crate::Result;

/// Header of the results file.
pub const RESULT_HEADER: &str = "event_id,status,cluster_time,vertex_x,vertex_y,vertex_z,\
report_x,report_y,report_z,tank_length,range_length,track_angle,cos_theta,seed_energy,\
tank_deposit,range_deposit,kinetic_energy,total_energy,transverse_momentum,\
neutrino_energy,q_squared,fv_central,fv_full,fv_upstream,fv_downstream";

/// Header of the profile file read by the external length fit.
pub const PROFILE_HEADER: &str = "##ev_id,cluster_time,ai,eta";

/// Writes one CSV row per event.
///
/// Values that were not computed are written as the status sentinel, so
/// every row has every column.
pub struct ResultWriter<W: Write> {
    writer: W,
}

impl ResultWriter<BufWriter<File>> {
    /// Creates the file and writes the header.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or written.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        Self::new(BufWriter::new(file))
    }
}

impl<W: Write> ResultWriter<W> {
    /// Wraps a writer and writes the header.
    ///
    /// # Errors
    /// Returns an error if the header cannot be written.
    pub fn new(mut writer: W) -> Result<Self> {
        writeln!(writer, "{RESULT_HEADER}")?;
        Ok(Self { writer })
    }

    /// Writes one result row.
    ///
    /// # Errors
    /// Returns an error if the row cannot be written.
    pub fn write_result(&mut self, result: &ReconstructionResult) -> Result<()> {
        let value = |v: Option<f64>| result.or_sentinel(v);
        let vector = |v: Option<Vector3>| {
            [
                value(v.map(|p| p.x)),
                value(v.map(|p| p.y)),
                value(v.map(|p| p.z)),
            ]
        };
        let [vx, vy, vz] = vector(result.vertex);
        let [rx, ry, rz] = vector(result.reporting_vertex);
        write!(
            self.writer,
            "{},{},{},{vx},{vy},{vz},{rx},{ry},{rz}",
            result.event_id,
            result.status.label(),
            value(result.cluster_time),
        )?;
        for v in [
            result.tank_length,
            result.range_length,
            result.track_angle,
            result.cos_theta,
            result.seed_energy,
            result.tank_deposit,
            result.range_deposit,
            result.kinetic_energy,
            result.total_energy,
            result.transverse_momentum,
            result.neutrino_energy,
            result.q_squared,
        ] {
            write!(self.writer, ",{}", value(v))?;
        }
        for flag in fiducial_columns(result) {
            write!(self.writer, ",{flag}")?;
        }
        writeln!(self.writer)?;
        Ok(())
    }

    /// Writes the result of every outcome, in order, and flushes.
    ///
    /// # Errors
    /// Returns an error if a row cannot be written.
    pub fn write_outcomes(&mut self, outcomes: &[EventOutcome]) -> Result<()> {
        for outcome in outcomes {
            self.write_result(&outcome.result)?;
        }
        self.flush()
    }

    /// Flushes the writer.
    ///
    /// # Errors
    /// Returns an error if the underlying writer fails.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Fiducial flags as `1`/`0`, or the sentinel when no vertex was resolved.
fn fiducial_columns(result: &ReconstructionResult) -> [f64; 4] {
    let Some(FiducialFlags {
        central,
        full_cylinder,
        upstream,
        downstream,
    }) = result.fiducial
    else {
        return [result.status.sentinel(); 4];
    };
    [central, full_cylinder, upstream, downstream].map(|flag| if flag { 1.0 } else { 0.0 })
}

/// Writes profile points, one row per `(distance, eta)` pair.
pub struct ProfileWriter<W: Write> {
    writer: W,
}

impl ProfileWriter<BufWriter<File>> {
    /// Creates the file and writes the header.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or written.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        Self::new(BufWriter::new(file))
    }
}

impl<W: Write> ProfileWriter<W> {
    /// Wraps a writer and writes the header.
    ///
    /// # Errors
    /// Returns an error if the header cannot be written.
    pub fn new(mut writer: W) -> Result<Self> {
        writeln!(writer, "{PROFILE_HEADER}")?;
        Ok(Self { writer })
    }

    /// Writes all points of one profile.
    ///
    /// # Errors
    /// Returns an error if a row cannot be written.
    pub fn write_profile(&mut self, profile: &EventProfile) -> Result<()> {
        for point in &profile.points {
            writeln!(
                self.writer,
                "{},{},{},{}",
                profile.event_id, profile.cluster_time, point.distance, point.eta
            )?;
        }
        Ok(())
    }

    /// Writes the profiles of all outcomes that have one, and flushes.
    ///
    /// Returns the number of profiles written.
    ///
    /// # Errors
    /// Returns an error if a row cannot be written.
    pub fn write_outcomes(&mut self, outcomes: &[EventOutcome]) -> Result<usize> {
        let mut written = 0;
        for profile in outcomes.iter().filter_map(|o| o.profile.as_ref()) {
            self.write_profile(profile)?;
            written += 1;
        }
        self.flush()?;
        Ok(written)
    }

    /// Flushes the writer.
    ///
    /// # Errors
    /// Returns an error if the underlying writer fails.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use muonfit_algorithms::ProfilePoint;
    use muonfit_core::{EventId, EventStatus, RejectReason};

    fn columns(line: &str) -> Vec<&str> {
        line.split(',').collect()
    }

    #[test]
    fn test_rejected_row_uses_not_attempted() {
        let mut writer = ResultWriter::new(Vec::new()).unwrap();
        let result = ReconstructionResult::rejected(EventId::new(1, 4), RejectReason::VetoHit);
        writer.write_result(&result).unwrap();

        let text = String::from_utf8(writer.writer).unwrap();
        let mut lines = text.lines();
        let header = columns(lines.next().unwrap());
        let row = columns(lines.next().unwrap());
        assert_eq!(header.len(), row.len());
        assert_eq!(row[0], "p1_4");
        assert_eq!(row[1], "veto_hit");
        assert!(row[2..].iter().all(|v| *v == "-888"));
    }

    #[test]
    fn test_no_fit_row_keeps_known_values() {
        let mut writer = ResultWriter::new(Vec::new()).unwrap();
        let mut result = ReconstructionResult::empty(EventId::new(0, 9), EventStatus::NoFit);
        result.range_length = Some(42.5);
        writer.write_result(&result).unwrap();

        let text = String::from_utf8(writer.writer).unwrap();
        let row = columns(text.lines().nth(1).unwrap());
        assert_eq!(row[1], "no_fit");
        assert_eq!(row[10], "42.5");
        assert_eq!(row[9], "-999");
        assert_eq!(row[row.len() - 1], "-999");
    }

    #[test]
    fn test_fiducial_flags_as_integers() {
        let mut result = ReconstructionResult::empty(EventId::new(0, 1), EventStatus::Reconstructed);
        result.fiducial = Some(FiducialFlags {
            central: true,
            full_cylinder: true,
            upstream: false,
            downstream: true,
        });
        assert_eq!(fiducial_columns(&result), [1.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_profile_rows() {
        let mut writer = ProfileWriter::new(Vec::new()).unwrap();
        let profile = EventProfile {
            event_id: EventId::new(2, 7),
            cluster_time: 812.5,
            points: vec![
                ProfilePoint {
                    distance: 55.0,
                    eta: 120.25,
                },
                ProfilePoint {
                    distance: 60.0,
                    eta: 98.0,
                },
            ],
            mean_eta: 109.125,
        };
        writer.write_profile(&profile).unwrap();

        let text = String::from_utf8(writer.writer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, [PROFILE_HEADER, "p2_7,812.5,55,120.25", "p2_7,812.5,60,98"]);
    }
}
