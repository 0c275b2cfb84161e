//! Per-marker, per-frame scalar error (typically the tracker's reprojection error).
//!
//! An [`ErrorSeries`] only covers markers with a native error, usually the tracked
//! markers of an aspect; virtual markers have none.
use indexmap::IndexMap;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::constants::{FrameIndex, MarkerName, NameIndex};
use crate::skelly_errors::SkellyError;

/// One row of the long-form error table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRow {
    pub frame: FrameIndex,
    pub keypoint: MarkerName,
    pub error: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ErrorSeries {
    pub name: String,
    data: DMatrix<f64>,
    marker_names: Vec<MarkerName>,
    marker_index: NameIndex,
}

impl ErrorSeries {
    /// Wrap a `(frames, markers)` matrix.
    ///
    /// Errors
    /// ----------
    /// * [`SkellyError::ShapeMismatch`] if the number of columns differs from the number of
    ///   marker names.
    pub fn new(
        name: impl Into<String>,
        data: DMatrix<f64>,
        marker_names: Vec<MarkerName>,
    ) -> Result<Self, SkellyError> {
        let name = name.into();
        if data.ncols() != marker_names.len() {
            return Err(SkellyError::ShapeMismatch {
                context: format!("{name}: error columns"),
                expected: marker_names.len(),
                actual: data.ncols(),
            });
        }
        let marker_index = marker_names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();
        Ok(ErrorSeries {
            name,
            data,
            marker_names,
            marker_index,
        })
    }

    pub fn n_frames(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_markers(&self) -> usize {
        self.data.ncols()
    }

    pub fn marker_names(&self) -> &[MarkerName] {
        &self.marker_names
    }

    pub fn as_matrix(&self) -> &DMatrix<f64> {
        &self.data
    }

    /// Error of one marker over every frame.
    pub fn get_marker(&self, marker: &str) -> Result<Vec<f64>, SkellyError> {
        let column = self
            .marker_index
            .get(marker)
            .ok_or_else(|| SkellyError::UnknownMarker(marker.to_string()))?;
        Ok(self.data.column(*column).iter().copied().collect())
    }

    /// Error of every marker at one frame, in marker order.
    pub fn get_frame(&self, frame: FrameIndex) -> Result<IndexMap<MarkerName, f64>, SkellyError> {
        if frame >= self.n_frames() {
            return Err(SkellyError::FrameOutOfRange {
                frame,
                n_frames: self.n_frames(),
            });
        }
        Ok(self
            .marker_names
            .iter()
            .enumerate()
            .map(|(column, name)| (name.clone(), self.data[(frame, column)]))
            .collect())
    }

    /// Error of a marker at a frame, `None` if the series does not cover it.
    pub fn error_at(&self, frame: FrameIndex, marker: &str) -> Option<f64> {
        let column = *self.marker_index.get(marker)?;
        (frame < self.n_frames()).then(|| self.data[(frame, column)])
    }

    /// Long-form table, one row per `(frame, marker)`.
    pub fn to_table(&self) -> Vec<ErrorRow> {
        (0..self.n_frames())
            .flat_map(|frame| {
                self.marker_names
                    .iter()
                    .enumerate()
                    .map(move |(column, name)| ErrorRow {
                        frame,
                        keypoint: name.clone(),
                        error: self.data[(frame, column)],
                    })
            })
            .collect()
    }
}

#[cfg(test)]
mod test_error_series {
    use super::*;

    fn sample() -> ErrorSeries {
        let data = DMatrix::from_row_slice(2, 2, &[0.1, 0.2, 0.3, f64::NAN]);
        ErrorSeries::new("reprojection_error", data, vec!["a".into(), "b".into()]).unwrap()
    }

    #[test]
    fn test_marker_and_frame_access() {
        let errors = sample();
        assert_eq!(errors.get_marker("a").unwrap(), vec![0.1, 0.3]);
        let frame = errors.get_frame(0).unwrap();
        assert_eq!(frame["b"], 0.2);
        assert!(errors.get_frame(1).unwrap()["b"].is_nan());
        assert_eq!(errors.error_at(1, "a"), Some(0.3));
        assert_eq!(errors.error_at(1, "mid"), None);
    }

    #[test]
    fn test_unknown_marker_and_frame() {
        let errors = sample();
        assert_eq!(
            errors.get_marker("mid"),
            Err(SkellyError::UnknownMarker("mid".into()))
        );
        assert_eq!(
            errors.get_frame(2),
            Err(SkellyError::FrameOutOfRange {
                frame: 2,
                n_frames: 2
            })
        );
    }

    #[test]
    fn test_width_mismatch() {
        let data = DMatrix::from_row_slice(1, 3, &[0., 0., 0.]);
        assert!(matches!(
            ErrorSeries::new("e", data, vec!["a".into()]),
            Err(SkellyError::ShapeMismatch { expected: 1, actual: 3, .. })
        ));
    }

    #[test]
    fn test_table() {
        let rows = sample().to_table();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1].frame, 0);
        assert_eq!(rows[1].keypoint, "b");
        assert_eq!(rows[2].error, 0.3);
    }
}
