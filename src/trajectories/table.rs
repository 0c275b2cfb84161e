//! Long-form table representation of a [`Trajectory`].
//!
//! The table has one [`TrajectoryRow`] per `(frame, marker)` pair, markers in declaration
//! order within frames in ascending order. It is the interchange format used by the CSV
//! writers and readers, and [`Trajectory::from_table`] rebuilds the exact same trajectory
//! from it (NaN included).
//!
//! Table layout
//! -----------------
//! ```text
//! frame,keypoint,x,y,z
//! 0,nose,0.12,1.5,0.3
//! 0,left_eye,NaN,NaN,NaN
//! 1,nose,...
//! ```
use std::io;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use super::{PointArray, Trajectory};
use crate::constants::{FrameIndex, MarkerName};
use crate::skelly_errors::SkellyError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryRow {
    pub frame: FrameIndex,
    pub keypoint: MarkerName,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl TrajectoryRow {
    pub fn point(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }
}

impl Trajectory {
    /// Long-form table, one row per `(frame, marker)`.
    pub fn to_table(&self) -> Vec<TrajectoryRow> {
        let mut rows = Vec::with_capacity(self.n_frames() * self.n_markers());
        for frame in 0..self.n_frames() {
            for (point, keypoint) in self.as_array().frame(frame).iter().zip(self.marker_names()) {
                rows.push(TrajectoryRow {
                    frame,
                    keypoint: keypoint.clone(),
                    x: point.x,
                    y: point.y,
                    z: point.z,
                });
            }
        }
        rows
    }

    /// Rebuild a trajectory from its long-form table.
    ///
    /// The marker order is the order of the keypoints of frame 0. Every later frame must
    /// list the same keypoints in the same order, and frames must be consecutive from 0.
    /// A zero-frame table carries no keypoints, so it rebuilds as a `(0, 0, 3)` trajectory;
    /// use [`Trajectory::from_table_with_markers`] when the marker names are known.
    ///
    /// Arguments
    /// -----------------
    /// * `name`: name of the rebuilt trajectory.
    /// * `rows`: the table, as produced by [`Trajectory::to_table`].
    ///
    /// Errors
    /// ----------
    /// * [`SkellyError::MalformedTable`] if the rows are not a complete, ordered
    ///   `(frame, marker)` grid.
    pub fn from_table(name: impl Into<String>, rows: &[TrajectoryRow]) -> Result<Self, SkellyError> {
        let marker_names: Vec<MarkerName> = rows
            .iter()
            .take_while(|row| row.frame == 0)
            .map(|row| row.keypoint.clone())
            .collect();

        if marker_names.is_empty() {
            if let Some(first) = rows.first() {
                return Err(SkellyError::MalformedTable(format!(
                    "first row is frame {}, expected frame 0",
                    first.frame
                )));
            }
            return Trajectory::new(name, PointArray::nan(0, 0), marker_names);
        }

        let n_markers = marker_names.len();
        if rows.len() % n_markers != 0 {
            return Err(SkellyError::MalformedTable(format!(
                "{} rows is not a multiple of {n_markers} markers",
                rows.len()
            )));
        }

        for (i, row) in rows.iter().enumerate() {
            let (frame, column) = (i / n_markers, i % n_markers);
            if row.frame != frame || row.keypoint != marker_names[column] {
                return Err(SkellyError::MalformedTable(format!(
                    "row {i} is ({}, {}), expected ({frame}, {})",
                    row.frame, row.keypoint, marker_names[column]
                )));
            }
        }

        let points = rows.iter().map(TrajectoryRow::point).collect();
        let array = PointArray::new(rows.len() / n_markers, n_markers, points)?;
        Trajectory::new(name, array, marker_names)
    }

    /// Rebuild a trajectory whose marker names are known in advance.
    ///
    /// Same as [`Trajectory::from_table`], except that an empty table yields a zero-frame
    /// trajectory that still carries `marker_names`.
    ///
    /// Errors
    /// ----------
    /// * [`SkellyError::MalformedTable`] if the rows are malformed or name other markers,
    ///   or other marker order, than `marker_names`.
    pub fn from_table_with_markers(
        name: impl Into<String>,
        rows: &[TrajectoryRow],
        marker_names: &[MarkerName],
    ) -> Result<Self, SkellyError> {
        if rows.is_empty() {
            return Trajectory::new(
                name,
                PointArray::nan(0, marker_names.len()),
                marker_names.to_vec(),
            );
        }
        let trajectory = Self::from_table(name, rows)?;
        if trajectory.marker_names() != marker_names {
            return Err(SkellyError::MalformedTable(format!(
                "table keypoints {:?} do not match markers {:?}",
                trajectory.marker_names(),
                marker_names
            )));
        }
        Ok(trajectory)
    }

    /// Write the long-form table as CSV, with a `frame,keypoint,x,y,z` header.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), SkellyError> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for row in self.to_table() {
            csv_writer.serialize(row)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Read a trajectory back from CSV written by [`Trajectory::write_csv`].
    pub fn read_csv<R: io::Read>(name: impl Into<String>, reader: R) -> Result<Self, SkellyError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let rows = csv_reader
            .deserialize()
            .collect::<Result<Vec<TrajectoryRow>, _>>()?;
        Self::from_table(name, &rows)
    }

    /// [`Trajectory::read_csv`] for a trajectory whose marker names are known, see
    /// [`Trajectory::from_table_with_markers`].
    pub fn read_csv_with_markers<R: io::Read>(
        name: impl Into<String>,
        reader: R,
        marker_names: &[MarkerName],
    ) -> Result<Self, SkellyError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let rows = csv_reader
            .deserialize()
            .collect::<Result<Vec<TrajectoryRow>, _>>()?;
        Self::from_table_with_markers(name, &rows, marker_names)
    }
}
