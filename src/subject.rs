//! # Subject: the tracked body as a whole
//!
//! A [`Subject`] owns one [`Aspect`] per entry of the model's layout order. The tracker
//! delivers a single array whose marker axis concatenates the tracked markers of every
//! aspect in that order; the subject splits it ([`Subject::ingest_tracked_points`]),
//! forwards each slice to its aspect, and fans queries and calculations out to them.
//!
//! ## Consolidated table
//!
//! [`Subject::all_data_table`] flattens every trajectory of every aspect into a single
//! long-form table of [`ConsolidatedRow`]s, ordered by frame, then layout order,
//! trajectory insertion order and marker order. [`Subject::from_consolidated_table`]
//! rebuilds a subject from such a table.
//!
//! ## Example
//!
//! ```rust,ignore
//! use camino::Utf8Path;
//! use skellymodels::{ModelInfo, Subject};
//!
//! let model = ModelInfo::from_path(Utf8Path::new("mediapipe.json"))?;
//! let mut subject = Subject::from_model_info("session_01", &model)?;
//! subject.ingest_tracked_points(&raw_points)?;
//! for (aspect, messages) in subject.calculate()? {
//!     println!("{aspect}: {}", messages.join("; "));
//! }
//! ```
use std::fmt;
use std::ops::Range;

use indexmap::IndexMap;
use nalgebra::{DMatrix, Vector3};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::aspect::Aspect;
use crate::biomechanics::CalculationPipeline;
use crate::constants::{AspectName, FrameIndex, MarkerName, XYZ};
use crate::model_info::ModelInfo;
use crate::skelly_errors::SkellyError;
use crate::trajectories::{PointArray, Trajectory, TrajectoryRow};

/// One row of the consolidated table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedRow {
    pub frame: FrameIndex,
    pub aspect: AspectName,
    pub trajectory: String,
    pub keypoint: MarkerName,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Reprojection error of the keypoint at that frame, NaN when unknown.
    pub reprojection_error: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Subject {
    name: String,
    tracker: String,
    aspects: IndexMap<AspectName, Aspect>,
    slices: IndexMap<AspectName, Range<usize>>,
}

impl Subject {
    /// Create a subject with one empty aspect per layout entry of the model.
    ///
    /// Arguments
    /// -----------------
    /// * `name`: identifier of the subject (e.g. a recording session).
    /// * `model_info`: the tracker model; its name becomes the subject's tracker name.
    ///
    /// Errors
    /// ----------
    /// * Any validation error raised while building the aspects' anatomical structures.
    pub fn from_model_info(name: impl Into<String>, model_info: &ModelInfo) -> Result<Self, SkellyError> {
        let mut aspects = IndexMap::with_capacity(model_info.aspect_order().len());
        for aspect_name in model_info.aspect_order() {
            let info = model_info.aspect(aspect_name)?;
            aspects.insert(aspect_name.clone(), Aspect::from_aspect_info(aspect_name.clone(), info)?);
        }

        Ok(Subject {
            name: name.into(),
            tracker: model_info.name.clone(),
            aspects,
            slices: model_info.tracked_point_slices(),
        })
    }

    /// Create a subject and ingest the tracker's raw array in one go.
    pub fn from_tracked_points(
        name: impl Into<String>,
        model_info: &ModelInfo,
        points: &PointArray,
    ) -> Result<Self, SkellyError> {
        let mut subject = Self::from_model_info(name, model_info)?;
        subject.ingest_tracked_points(points)?;
        Ok(subject)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the tracker model the subject was built from.
    pub fn tracker(&self) -> &str {
        &self.tracker
    }

    /// Aspects, in layout order.
    pub fn aspects(&self) -> &IndexMap<AspectName, Aspect> {
        &self.aspects
    }

    pub fn aspect_order(&self) -> impl Iterator<Item = &str> {
        self.aspects.keys().map(String::as_str)
    }

    pub fn aspect(&self, name: &str) -> Result<&Aspect, SkellyError> {
        self.aspects
            .get(name)
            .ok_or_else(|| SkellyError::UnknownAspect(name.to_string()))
    }

    pub fn aspect_mut(&mut self, name: &str) -> Result<&mut Aspect, SkellyError> {
        self.aspects
            .get_mut(name)
            .ok_or_else(|| SkellyError::UnknownAspect(name.to_string()))
    }

    /// Width of the tracker's raw array.
    pub fn num_tracked_points(&self) -> usize {
        self.slices.values().map(|range| range.len()).sum()
    }

    fn check_width(&self, context: &str, actual: usize) -> Result<(), SkellyError> {
        let expected = self.num_tracked_points();
        if actual != expected {
            return Err(SkellyError::ShapeMismatch {
                context: context.to_string(),
                expected,
                actual,
            });
        }
        Ok(())
    }

    /// Split the tracker's raw array by layout order and ingest each slice in its aspect.
    ///
    /// Arguments
    /// -----------------
    /// * `points`: shape `(frames, Σ tracked markers, 3)`, aspects concatenated in layout
    ///   order.
    ///
    /// Errors
    /// ----------
    /// * [`SkellyError::ShapeMismatch`] if the marker axis differs from the total number of
    ///   tracked markers. No aspect is modified in that case.
    pub fn ingest_tracked_points(&mut self, points: &PointArray) -> Result<(), SkellyError> {
        self.check_width("tracked points width", points.n_markers())?;

        for (aspect_name, range) in &self.slices {
            let part = points.slice_markers(range.clone())?;
            if let Some(aspect) = self.aspects.get_mut(aspect_name) {
                aspect.ingest_tracked_points(&part)?;
            }
        }
        info!(
            subject = %self.name,
            frames = points.n_frames(),
            aspects = self.aspects.len(),
            "Ingested tracked points"
        );
        Ok(())
    }

    /// Split the tracker's reprojection error by layout order, like
    /// [`Subject::ingest_tracked_points`].
    ///
    /// Errors
    /// ----------
    /// * [`SkellyError::ShapeMismatch`] if the column count differs from the total number
    ///   of tracked markers, or if an aspect rejects its slice.
    pub fn ingest_reprojection_error(&mut self, errors: &DMatrix<f64>) -> Result<(), SkellyError> {
        self.check_width("reprojection error width", errors.ncols())?;

        for (aspect_name, range) in &self.slices {
            let part = errors.columns(range.start, range.len()).into_owned();
            if let Some(aspect) = self.aspects.get_mut(aspect_name) {
                aspect.ingest_reprojection_error(part)?;
            }
        }
        Ok(())
    }

    pub fn get_marker(
        &self,
        aspect: &str,
        trajectory: &str,
        marker: &str,
    ) -> Result<Vec<Vector3<f64>>, SkellyError> {
        self.aspect(aspect)?.get_marker(trajectory, marker)
    }

    pub fn get_frame(
        &self,
        aspect: &str,
        trajectory: &str,
        frame: FrameIndex,
    ) -> Result<IndexMap<MarkerName, Vector3<f64>>, SkellyError> {
        self.aspect(aspect)?.get_frame(trajectory, frame)
    }

    pub fn get_error_for_marker(&self, aspect: &str, marker: &str) -> Result<Vec<f64>, SkellyError> {
        self.aspect(aspect)?.get_error_for_marker(marker)
    }

    pub fn get_error_for_frame(
        &self,
        aspect: &str,
        frame: FrameIndex,
    ) -> Result<IndexMap<MarkerName, f64>, SkellyError> {
        self.aspect(aspect)?.get_error_for_frame(frame)
    }

    /// Run the standard pipeline (center of mass, then rigid bones) on every aspect.
    ///
    /// Return
    /// ----------
    /// * Aspect name → messages of each calculation, in layout order.
    pub fn calculate(&mut self) -> Result<IndexMap<AspectName, Vec<String>>, SkellyError> {
        self.calculate_with(&CalculationPipeline::standard())
    }

    /// Run a custom pipeline on every aspect.
    pub fn calculate_with(
        &mut self,
        pipeline: &CalculationPipeline,
    ) -> Result<IndexMap<AspectName, Vec<String>>, SkellyError> {
        let mut messages = IndexMap::with_capacity(self.aspects.len());
        for (name, aspect) in self.aspects.iter_mut() {
            messages.insert(name.clone(), pipeline.run(aspect)?);
        }
        Ok(messages)
    }

    /// Every trajectory of every aspect as one long-form table.
    ///
    /// Rows are sorted by frame. Within a frame they keep layout order, then trajectory
    /// insertion order, then marker order. `reprojection_error` is the aspect's error for
    /// the keypoint at that frame, or NaN if the aspect has none for it.
    pub fn all_data_table(&self) -> Vec<ConsolidatedRow> {
        let mut rows = Vec::new();
        for (aspect_name, aspect) in &self.aspects {
            let errors = aspect.reprojection_error();
            for (trajectory_name, trajectory) in aspect.trajectories() {
                rows.extend(trajectory.to_table().into_iter().map(|row| ConsolidatedRow {
                    reprojection_error: errors
                        .and_then(|e| e.error_at(row.frame, &row.keypoint))
                        .unwrap_or(f64::NAN),
                    frame: row.frame,
                    aspect: aspect_name.clone(),
                    trajectory: trajectory_name.clone(),
                    keypoint: row.keypoint,
                    x: row.x,
                    y: row.y,
                    z: row.z,
                }));
            }
        }
        rows.sort_by_key(|row| row.frame);
        rows
    }

    /// Rebuild a subject from a consolidated table.
    ///
    /// Trajectories are regrouped by `(aspect, trajectory)` in order of first appearance
    /// and stored as-is; no calculation is re-run. When the `3d_xyz` rows of an aspect carry
    /// reprojection errors for its tracked markers, the error series is restored too.
    ///
    /// Errors
    /// ----------
    /// * [`SkellyError::UnknownAspect`] if a row names an aspect absent from the model's layout.
    /// * [`SkellyError::MalformedTable`] if a trajectory's rows do not form a complete
    ///   `(frame, marker)` grid, or if the `3d_xyz` keypoints differ from the aspect's
    ///   marker names.
    pub fn from_consolidated_table(
        name: impl Into<String>,
        model_info: &ModelInfo,
        rows: &[ConsolidatedRow],
    ) -> Result<Self, SkellyError> {
        let mut subject = Self::from_model_info(name, model_info)?;

        let mut groups: IndexMap<(&str, &str), Vec<&ConsolidatedRow>> = IndexMap::new();
        for row in rows {
            groups
                .entry((row.aspect.as_str(), row.trajectory.as_str()))
                .or_default()
                .push(row);
        }

        for ((aspect_name, trajectory_name), group) in groups {
            let table: Vec<TrajectoryRow> = group
                .iter()
                .map(|row| TrajectoryRow {
                    frame: row.frame,
                    keypoint: row.keypoint.clone(),
                    x: row.x,
                    y: row.y,
                    z: row.z,
                })
                .collect();
            let aspect = subject.aspect_mut(aspect_name)?;
            let trajectory = if trajectory_name == XYZ {
                let marker_names = aspect.anatomical_structure().marker_names();
                Trajectory::from_table_with_markers(trajectory_name, &table, marker_names)?
            } else {
                Trajectory::from_table(trajectory_name, &table)?
            };

            if trajectory_name == XYZ {
                if let Some(errors) = restore_errors(aspect, &trajectory, &group) {
                    aspect.add_trajectory(trajectory);
                    aspect.ingest_reprojection_error(errors)?;
                    continue;
                }
            }
            aspect.add_trajectory(trajectory);
        }

        for aspect in subject.aspects.values().filter(|a| a.xyz().is_none()) {
            warn!(aspect = aspect.name(), "No 3d_xyz data found in the consolidated table");
        }
        Ok(subject)
    }
}

/// Error matrix of the tracked markers from `3d_xyz` rows.
///
/// `None` if every value is NaN, or, with a warning, if a tracked marker has no column.
fn restore_errors(
    aspect: &Aspect,
    trajectory: &Trajectory,
    group: &[&ConsolidatedRow],
) -> Option<DMatrix<f64>> {
    if group.iter().all(|row| row.reprojection_error.is_nan()) {
        return None;
    }
    let tracked = aspect.anatomical_structure().tracked_point_names();
    let mut columns = Vec::with_capacity(tracked.len());
    for name in tracked {
        let Some(column) = trajectory.marker_index(name) else {
            warn!(
                aspect = aspect.name(),
                marker = name.as_str(),
                "Tracked marker missing from the reloaded 3d_xyz, reprojection errors dropped"
            );
            return None;
        };
        columns.push(column);
    }
    let n_markers = trajectory.n_markers();
    Some(DMatrix::from_fn(trajectory.n_frames(), tracked.len(), |frame, i| {
        group[frame * n_markers + columns[i]].reprojection_error
    }))
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Subject: {} (tracker: {})", self.name, self.tracker)?;
        for aspect in self.aspects.values() {
            write!(f, "{aspect}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test_subject {
    use super::*;
    use crate::model_info::AspectInfo;

    fn model() -> ModelInfo {
        let aspect = |tracker: &str, names: &[&str]| AspectInfo {
            tracker_name: tracker.into(),
            tracked_point_names: names.iter().map(|s| s.to_string()).collect(),
            virtual_marker_definitions: IndexMap::new(),
            segment_connections: IndexMap::new(),
            center_of_mass_definitions: IndexMap::new(),
            joint_hierarchy: IndexMap::new(),
        };
        let mut aspects = IndexMap::new();
        aspects.insert("face".to_string(), aspect("toy_face", &["f0", "f1", "f2"]));
        aspects.insert("body".to_string(), aspect("toy_body", &["b0", "b1"]));
        ModelInfo::new(
            "toy".into(),
            aspects,
            vec!["body".into(), "face".into()],
        )
        .unwrap()
    }

    #[test]
    fn test_aspects_follow_layout() {
        let subject = Subject::from_model_info("s", &model()).unwrap();
        assert_eq!(subject.aspect_order().collect::<Vec<_>>(), vec!["body", "face"]);
        assert_eq!(subject.tracker(), "toy");
        assert_eq!(subject.num_tracked_points(), 5);
        assert_eq!(
            subject.aspect("face").unwrap().tracker_type(),
            Some("toy_face")
        );
        assert_eq!(
            subject.aspect("hands").err(),
            Some(SkellyError::UnknownAspect("hands".into()))
        );
    }

    #[test]
    fn test_split_by_layout() {
        let points = PointArray::from_fn(2, 5, |f, m| Vector3::new(m as f64, f as f64, 0.));
        let subject = Subject::from_tracked_points("s", &model(), &points).unwrap();

        let b1 = subject.get_marker("body", XYZ, "b1").unwrap();
        assert_eq!(b1[1], Vector3::new(1., 1., 0.));
        let f0 = subject.get_marker("face", XYZ, "f0").unwrap();
        assert_eq!(f0[0], Vector3::new(2., 0., 0.));
    }

    #[test]
    fn test_width_mismatch_is_fatal() {
        let mut subject = Subject::from_model_info("s", &model()).unwrap();
        assert_eq!(
            subject.ingest_tracked_points(&PointArray::nan(1, 4)),
            Err(SkellyError::ShapeMismatch {
                context: "tracked points width".into(),
                expected: 5,
                actual: 4
            })
        );
        assert!(subject.aspects().values().all(|a| a.xyz().is_none()));

        assert!(matches!(
            subject.ingest_reprojection_error(&DMatrix::zeros(1, 6)),
            Err(SkellyError::ShapeMismatch { expected: 5, actual: 6, .. })
        ));
    }

    #[test]
    fn test_error_split() {
        let mut subject = Subject::from_model_info("s", &model()).unwrap();
        let errors = DMatrix::from_fn(2, 5, |f, m| (f * 10 + m) as f64);
        subject.ingest_reprojection_error(&errors).unwrap();
        assert_eq!(subject.get_error_for_marker("face", "f2").unwrap(), vec![4., 14.]);
        assert_eq!(subject.get_error_for_frame("body", 1).unwrap()["b0"], 10.);
    }

    #[test]
    fn test_consolidated_table_order() {
        let points = PointArray::from_fn(2, 5, |f, m| Vector3::new(m as f64, f as f64, 0.));
        let mut subject = Subject::from_tracked_points("s", &model(), &points).unwrap();
        subject
            .ingest_reprojection_error(&DMatrix::from_element(2, 5, 0.5))
            .unwrap();

        let rows = subject.all_data_table();
        assert_eq!(rows.len(), 10);
        let keys: Vec<_> = rows
            .iter()
            .take(5)
            .map(|r| (r.frame, r.aspect.as_str(), r.keypoint.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![
                (0, "body", "b0"),
                (0, "body", "b1"),
                (0, "face", "f0"),
                (0, "face", "f1"),
                (0, "face", "f2")
            ]
        );
        assert!(rows.iter().all(|r| r.reprojection_error == 0.5));

        let back = Subject::from_consolidated_table("s", &model(), &rows).unwrap();
        assert_eq!(back.all_data_table(), rows);
    }

    #[test]
    fn test_consolidated_xyz_must_match_structure() {
        let points = PointArray::from_fn(2, 5, |f, m| Vector3::new(m as f64, f as f64, 0.));
        let subject = Subject::from_tracked_points("s", &model(), &points).unwrap();
        let mut rows = subject.all_data_table();
        for row in rows.iter_mut().filter(|r| r.keypoint == "b1") {
            row.keypoint = "b9".into();
        }
        assert!(matches!(
            Subject::from_consolidated_table("s", &model(), &rows),
            Err(SkellyError::MalformedTable(_))
        ));
    }

    #[test]
    fn test_errors_need_every_tracked_marker() {
        let subject = Subject::from_model_info("s", &model()).unwrap();
        let body = subject.aspect("body").unwrap();
        let row = |keypoint: &str| ConsolidatedRow {
            frame: 0,
            aspect: "body".into(),
            trajectory: XYZ.into(),
            keypoint: keypoint.into(),
            x: 0.,
            y: 0.,
            z: 0.,
            reprojection_error: 0.5,
        };

        let partial = Trajectory::new(XYZ, PointArray::nan(1, 1), vec!["b0".into()]).unwrap();
        let rows = [row("b0")];
        let group: Vec<&ConsolidatedRow> = rows.iter().collect();
        assert_eq!(restore_errors(body, &partial, &group), None);

        let full =
            Trajectory::new(XYZ, PointArray::nan(1, 2), vec!["b0".into(), "b1".into()]).unwrap();
        let rows = [row("b0"), row("b1")];
        let group: Vec<&ConsolidatedRow> = rows.iter().collect();
        assert_eq!(
            restore_errors(body, &full, &group),
            Some(DMatrix::from_element(1, 2, 0.5))
        );
    }

    #[test]
    fn test_calculate_reports_per_aspect() {
        let points = PointArray::from_fn(1, 5, |_, m| Vector3::new(m as f64, 0., 0.));
        let mut subject = Subject::from_tracked_points("s", &model(), &points).unwrap();
        let messages = subject.calculate().unwrap();
        assert_eq!(messages.keys().collect::<Vec<_>>(), vec!["body", "face"]);
        assert_eq!(messages["face"].len(), 2);
    }
}
