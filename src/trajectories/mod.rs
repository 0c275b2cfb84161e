//! # Trajectories: named marker time series
//!
//! A [`Trajectory`] is a dense `(frames, markers, 3)` array of positions together with
//! the ordered marker names it was built with. It is the unit of data stored by an
//! [`Aspect`](crate::aspect::Aspect) and produced by every step of the
//! [`biomechanics`](crate::biomechanics) pipeline.
//!
//! Modules
//! -----------------
//! * [`point_array`] – The raw `(frames, markers, 3)` storage, slicing and concatenation.
//! * [`table`] – Long-form `(frame, keypoint, x, y, z)` export, reload and CSV I/O.
//! * [`error_series`] – Per-marker scalar error over frames.
//! * [`display`] – Table rendering with `comfy-table`.
//!
//! Data Model
//! -----------------
//! * Missing detections are NaN in every coordinate; the shape never varies over frames.
//! * A trajectory is immutable once built; computations produce new trajectories.
//! * Marker lookups go through an `ahash` name → index map built at construction.
pub mod display;
pub mod error_series;
pub mod point_array;
pub mod table;

use indexmap::IndexMap;
use nalgebra::Vector3;

use crate::constants::{FrameIndex, MarkerName, NameIndex};
use crate::skelly_errors::SkellyError;
pub use error_series::ErrorSeries;
pub use point_array::PointArray;
pub use table::TrajectoryRow;

#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    name: String,
    array: PointArray,
    marker_names: Vec<MarkerName>,
    marker_index: NameIndex,
}

impl Trajectory {
    /// Create a trajectory from an array and its marker names.
    ///
    /// Arguments
    /// -----------------
    /// * `name`: identifier of the trajectory (e.g. `3d_xyz`).
    /// * `array`: positions, shape `(frames, markers, 3)`.
    /// * `marker_names`: one name per marker column, in column order.
    ///
    /// Errors
    /// ----------
    /// * [`SkellyError::ShapeMismatch`] if the array's marker axis and the name list differ
    ///   in length. Nothing is truncated or padded.
    /// * [`SkellyError::DuplicateMarker`] if a name appears twice.
    pub fn new(
        name: impl Into<String>,
        array: PointArray,
        marker_names: Vec<MarkerName>,
    ) -> Result<Self, SkellyError> {
        let name = name.into();
        if array.n_markers() != marker_names.len() {
            return Err(SkellyError::ShapeMismatch {
                context: format!("{name}: marker columns"),
                expected: marker_names.len(),
                actual: array.n_markers(),
            });
        }

        let mut marker_index = NameIndex::default();
        for (i, marker) in marker_names.iter().enumerate() {
            if marker_index.insert(marker.clone(), i).is_some() {
                return Err(SkellyError::DuplicateMarker(marker.clone()));
            }
        }

        Ok(Trajectory {
            name,
            array,
            marker_names,
            marker_index,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn n_frames(&self) -> usize {
        self.array.n_frames()
    }

    pub fn n_markers(&self) -> usize {
        self.array.n_markers()
    }

    pub fn marker_names(&self) -> &[MarkerName] {
        &self.marker_names
    }

    pub fn marker_index(&self, marker: &str) -> Option<usize> {
        self.marker_index.get(marker).copied()
    }

    /// Whole-array view.
    pub fn as_array(&self) -> &PointArray {
        &self.array
    }

    pub fn into_array(self) -> PointArray {
        self.array
    }

    /// Position of a marker (by column index) at a frame.
    pub fn point(&self, frame: FrameIndex, marker: usize) -> Vector3<f64> {
        self.array.point(frame, marker)
    }

    /// The `(frames, 3)` series of a marker.
    pub fn get_marker(&self, marker: &str) -> Result<Vec<Vector3<f64>>, SkellyError> {
        let column = self
            .marker_index(marker)
            .ok_or_else(|| SkellyError::UnknownMarker(marker.to_string()))?;
        Ok(self.array.marker_series(column))
    }

    /// Every marker at one frame, in marker order.
    pub fn get_frame(
        &self,
        frame: FrameIndex,
    ) -> Result<IndexMap<MarkerName, Vector3<f64>>, SkellyError> {
        if frame >= self.n_frames() {
            return Err(SkellyError::FrameOutOfRange {
                frame,
                n_frames: self.n_frames(),
            });
        }
        Ok(self
            .marker_names
            .iter()
            .cloned()
            .zip(self.array.frame(frame))
            .collect())
    }

    /// Marker name → `(frames, 3)` series, in marker order.
    pub fn as_map(&self) -> IndexMap<MarkerName, Vec<Vector3<f64>>> {
        self.marker_names
            .iter()
            .enumerate()
            .map(|(column, name)| (name.clone(), self.array.marker_series(column)))
            .collect()
    }
}
