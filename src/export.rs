//! # CSV export
//!
//! Writing results to disk always goes through an explicit [`ExportContext`] naming the
//! output directory and the tracker; nothing is written relative to a process-wide
//! working directory.
//!
//! File layout
//! -----------------
//! * `<tracker>_<aspect>_<trajectory>.csv` – one file per trajectory, columns
//!   `frame,keypoint,x,y,z` ([`ExportContext::save_trajectories`]).
//! * `<tracker>_<aspect>_reprojection_error.csv` – long-form error table of aspects that
//!   carry one, columns `frame,keypoint,error` ([`ExportContext::save_reprojection_errors`]).
//! * `<tracker>_data_by_frame.csv` – the consolidated table of the subject, columns
//!   `frame,aspect,trajectory,keypoint,x,y,z,reprojection_error`
//!   ([`ExportContext::save_all_data`]).
//!
//! Undetected points and missing errors are written as `NaN` and read back as NaN.
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};

use camino::{Utf8Path, Utf8PathBuf};
use tracing::info;

use crate::constants::MarkerName;
use crate::skelly_errors::SkellyError;
use crate::subject::{ConsolidatedRow, Subject};
use crate::trajectories::Trajectory;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportContext {
    pub output_dir: Utf8PathBuf,
    pub tracker_name: String,
}

impl ExportContext {
    pub fn new(output_dir: impl Into<Utf8PathBuf>, tracker_name: impl Into<String>) -> Self {
        ExportContext {
            output_dir: output_dir.into(),
            tracker_name: tracker_name.into(),
        }
    }

    /// Export context using the subject's tracker name.
    pub fn for_subject(output_dir: impl Into<Utf8PathBuf>, subject: &Subject) -> Self {
        Self::new(output_dir, subject.tracker())
    }

    /// Path of the CSV file of one trajectory.
    pub fn trajectory_path(&self, aspect: &str, trajectory: &str) -> Utf8PathBuf {
        self.output_dir
            .join(format!("{}_{aspect}_{trajectory}.csv", self.tracker_name))
    }

    /// Path of the long-form reprojection error file of one aspect.
    pub fn reprojection_error_path(&self, aspect: &str) -> Utf8PathBuf {
        self.output_dir
            .join(format!("{}_{aspect}_reprojection_error.csv", self.tracker_name))
    }

    /// Path of the consolidated CSV file.
    pub fn data_by_frame_path(&self) -> Utf8PathBuf {
        self.output_dir
            .join(format!("{}_data_by_frame.csv", self.tracker_name))
    }

    /// Write one CSV file per trajectory of every aspect.
    ///
    /// Return
    /// ----------
    /// * The written paths, in layout order then trajectory insertion order.
    ///
    /// Errors
    /// ----------
    /// * [`SkellyError::IoError`] / [`SkellyError::CsvError`] on any write failure.
    pub fn save_trajectories(&self, subject: &Subject) -> Result<Vec<Utf8PathBuf>, SkellyError> {
        fs::create_dir_all(&self.output_dir)?;
        let mut written = Vec::new();
        for (aspect_name, aspect) in subject.aspects() {
            for (trajectory_name, trajectory) in aspect.trajectories() {
                let path = self.trajectory_path(aspect_name, trajectory_name);
                trajectory.write_csv(BufWriter::new(File::create(&path)?))?;
                info!(path = %path, "Saved trajectory");
                written.push(path);
            }
        }
        Ok(written)
    }

    /// Write the reprojection error of every aspect that has one. Aspects without
    /// errors are skipped.
    pub fn save_reprojection_errors(&self, subject: &Subject) -> Result<Vec<Utf8PathBuf>, SkellyError> {
        fs::create_dir_all(&self.output_dir)?;
        let mut written = Vec::new();
        for (aspect_name, aspect) in subject.aspects() {
            let Some(errors) = aspect.reprojection_error() else {
                continue;
            };
            let path = self.reprojection_error_path(aspect_name);
            let mut csv_writer = csv::Writer::from_writer(BufWriter::new(File::create(&path)?));
            for row in errors.to_table() {
                csv_writer.serialize(row)?;
            }
            csv_writer.flush()?;
            info!(path = %path, "Saved reprojection error");
            written.push(path);
        }
        Ok(written)
    }

    /// Write the consolidated table of the subject.
    pub fn save_all_data(&self, subject: &Subject) -> Result<Utf8PathBuf, SkellyError> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self.data_by_frame_path();
        write_consolidated_csv(&subject.all_data_table(), BufWriter::new(File::create(&path)?))?;
        info!(path = %path, "Saved consolidated data");
        Ok(path)
    }
}

/// Write consolidated rows as CSV, with a header line.
pub fn write_consolidated_csv<W: io::Write>(rows: &[ConsolidatedRow], writer: W) -> Result<(), SkellyError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Read consolidated rows written by [`write_consolidated_csv`].
pub fn read_consolidated_csv<R: io::Read>(reader: R) -> Result<Vec<ConsolidatedRow>, SkellyError> {
    csv::Reader::from_reader(reader)
        .deserialize()
        .collect::<Result<Vec<_>, _>>()
        .map_err(SkellyError::from)
}

/// Reload a per-trajectory CSV file.
///
/// Arguments
/// -----------------
/// * `path`: a file written by [`ExportContext::save_trajectories`].
/// * `name`: name of the rebuilt trajectory.
///
/// Errors
/// ----------
/// * [`SkellyError::IoError`] / [`SkellyError::CsvError`] if the file cannot be read.
/// * [`SkellyError::MalformedTable`] if the rows do not form a `(frame, marker)` grid.
pub fn read_trajectory_csv(path: &Utf8Path, name: &str) -> Result<Trajectory, SkellyError> {
    let file = File::open(path)?;
    Trajectory::read_csv(name, BufReader::new(file))
}

/// Reload a per-trajectory CSV file whose marker names are known, typically from the
/// aspect's [`AnatomicalStructure`](crate::anatomy::AnatomicalStructure). A file holding
/// zero frames still yields a trajectory with those markers.
pub fn read_trajectory_csv_with_markers(
    path: &Utf8Path,
    name: &str,
    marker_names: &[MarkerName],
) -> Result<Trajectory, SkellyError> {
    let file = File::open(path)?;
    Trajectory::read_csv_with_markers(name, BufReader::new(file), marker_names)
}
