//! Dense `(frames, markers, 3)` point arrays.
//!
//! [`PointArray`] is the in-memory form of the raw tracker output and the storage behind
//! every [`Trajectory`](crate::trajectories::Trajectory). The coordinates live in an
//! [`ndarray::Array3`] indexed `[frame, marker, axis]`. An undetected point is a vector of
//! NaN, never a missing entry, so the shape is constant over frames.
//!
//! Single points cross the API as [`nalgebra::Vector3`], which is what the biomechanics
//! code does its geometry with.
use std::ops::Range;

use nalgebra::Vector3;
use ndarray::{s, Array3, ArrayView1, ArrayView3, Axis};

use crate::skelly_errors::SkellyError;

#[derive(Debug, Clone, PartialEq)]
pub struct PointArray {
    data: Array3<f64>,
}

#[inline]
fn to_vector(xyz: ArrayView1<f64>) -> Vector3<f64> {
    Vector3::new(xyz[0], xyz[1], xyz[2])
}

impl PointArray {
    /// Wrap frame-major points.
    ///
    /// Errors
    /// ----------
    /// * [`SkellyError::ShapeMismatch`] if `points.len() != n_frames * n_markers`.
    pub fn new(
        n_frames: usize,
        n_markers: usize,
        points: Vec<Vector3<f64>>,
    ) -> Result<Self, SkellyError> {
        let expected = n_frames * n_markers;
        if points.len() != expected {
            return Err(SkellyError::ShapeMismatch {
                context: "point array length".into(),
                expected,
                actual: points.len(),
            });
        }
        let data = Array3::from_shape_fn((n_frames, n_markers, 3), |(frame, marker, axis)| {
            points[frame * n_markers + marker][axis]
        });
        Ok(PointArray { data })
    }

    /// Build an array from a row-major `f64` buffer of shape `(n_frames, n_markers, 3)`,
    /// the layout numeric array libraries use by default.
    pub fn from_flat(n_frames: usize, n_markers: usize, values: &[f64]) -> Result<Self, SkellyError> {
        let expected = n_frames * n_markers * 3;
        let shape_error = || SkellyError::ShapeMismatch {
            context: "flat point buffer length".into(),
            expected,
            actual: values.len(),
        };
        if values.len() != expected {
            return Err(shape_error());
        }
        let data = Array3::from_shape_vec((n_frames, n_markers, 3), values.to_vec())
            .map_err(|_| shape_error())?;
        Ok(PointArray { data })
    }

    /// Build an array by evaluating `f(frame, marker)` once for every point, frame by frame.
    pub fn from_fn<F>(n_frames: usize, n_markers: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> Vector3<f64>,
    {
        let mut data = Array3::zeros((n_frames, n_markers, 3));
        for frame in 0..n_frames {
            for marker in 0..n_markers {
                let point = f(frame, marker);
                data.slice_mut(s![frame, marker, ..])
                    .assign(&ArrayView1::from(point.as_slice()));
            }
        }
        PointArray { data }
    }

    /// An array of the given shape filled with NaN.
    pub fn nan(n_frames: usize, n_markers: usize) -> Self {
        PointArray {
            data: Array3::from_elem((n_frames, n_markers, 3), f64::NAN),
        }
    }

    pub fn n_frames(&self) -> usize {
        self.data.dim().0
    }

    pub fn n_markers(&self) -> usize {
        self.data.dim().1
    }

    /// `(frames, markers, 3)`
    pub fn shape(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// Read-only view of the coordinates, indexed `[frame, marker, axis]`.
    pub fn view(&self) -> ArrayView3<'_, f64> {
        self.data.view()
    }

    pub fn point(&self, frame: usize, marker: usize) -> Vector3<f64> {
        to_vector(self.data.slice(s![frame, marker, ..]))
    }

    pub(crate) fn set_point(&mut self, frame: usize, marker: usize, point: &Vector3<f64>) {
        self.data
            .slice_mut(s![frame, marker, ..])
            .assign(&ArrayView1::from(point.as_slice()));
    }

    /// All markers of one frame, in marker order.
    pub fn frame(&self, frame: usize) -> Vec<Vector3<f64>> {
        self.data
            .index_axis(Axis(0), frame)
            .outer_iter()
            .map(to_vector)
            .collect()
    }

    /// The `(frames, 3)` series of one marker.
    pub fn marker_series(&self, marker: usize) -> Vec<Vector3<f64>> {
        self.data
            .index_axis(Axis(1), marker)
            .outer_iter()
            .map(to_vector)
            .collect()
    }

    /// Row-major `f64` buffer of shape `(frames, markers, 3)`; inverse of [`PointArray::from_flat`].
    pub fn to_flat(&self) -> Vec<f64> {
        self.data.iter().copied().collect()
    }

    /// Copy a contiguous range of markers over every frame.
    ///
    /// Errors
    /// ----------
    /// * [`SkellyError::ShapeMismatch`] if the range ends past the marker axis.
    pub fn slice_markers(&self, range: Range<usize>) -> Result<Self, SkellyError> {
        if range.end > self.n_markers() || range.start > range.end {
            return Err(SkellyError::ShapeMismatch {
                context: "marker range end".into(),
                expected: self.n_markers(),
                actual: range.end,
            });
        }
        Ok(PointArray {
            data: self.data.slice(s![.., range, ..]).to_owned(),
        })
    }

    /// Concatenate arrays along the marker axis; inverse of [`PointArray::slice_markers`].
    ///
    /// Errors
    /// ----------
    /// * [`SkellyError::ShapeMismatch`] if the arrays disagree on the number of frames.
    pub fn concat_markers(parts: &[PointArray]) -> Result<Self, SkellyError> {
        let Some(first) = parts.first() else {
            return Ok(Self::nan(0, 0));
        };
        let n_frames = first.n_frames();
        let frame_error = |actual| SkellyError::ShapeMismatch {
            context: "frame count of concatenated arrays".into(),
            expected: n_frames,
            actual,
        };
        if let Some(bad) = parts.iter().find(|p| p.n_frames() != n_frames) {
            return Err(frame_error(bad.n_frames()));
        }
        let views: Vec<ArrayView3<f64>> = parts.iter().map(|p| p.data.view()).collect();
        let data = ndarray::concatenate(Axis(1), &views).map_err(|_| frame_error(n_frames))?;
        Ok(PointArray { data })
    }

    /// Bitwise equality, treating NaN payloads as ordinary bit patterns.
    pub fn bit_eq(&self, other: &PointArray) -> bool {
        self.shape() == other.shape()
            && self
                .data
                .iter()
                .zip(other.data.iter())
                .all(|(x, y)| x.to_bits() == y.to_bits())
    }
}

/// `true` if any coordinate of the point is NaN.
#[inline]
pub fn has_nan(point: &Vector3<f64>) -> bool {
    point.iter().any(|c| c.is_nan())
}
