//! # Aspect: one tracked part of a subject
//!
//! An [`Aspect`] (body, face, left hand, ...) ties an
//! [`AnatomicalStructure`] to the data computed for it: an ordered collection of named
//! [`Trajectory`]s, an optional reprojection [`ErrorSeries`] and free-form metadata.
//!
//! ## Lifecycle
//!
//! 1. The aspect is created empty from its structure ([`Aspect::new`] or
//!    [`Aspect::from_aspect_info`]).
//! 2. Raw tracked points are ingested ([`Aspect::ingest_tracked_points`]); virtual
//!    markers are synthesized and the result is stored as `3d_xyz`.
//! 3. Calculations add derived trajectories (`segment_com`, `total_body_com`,
//!    `rigid_3d_xyz`), either one by one or through a
//!    [`CalculationPipeline`](crate::biomechanics::CalculationPipeline).
//!
//! Trajectories are kept in insertion order and are never removed; storing a trajectory
//! under an existing name replaces it in place.
use std::fmt;

use indexmap::IndexMap;
use nalgebra::{DMatrix, Vector3};
use tracing::{debug, info};

use crate::anatomy::AnatomicalStructure;
use crate::biomechanics::{
    bone_length_statistics, synthesize_virtual_markers, AnatomicalCalculation,
    BoneLengthStatistics, CenterOfMassCalculation, RigidBonesEnforcement,
};
use crate::constants::{
    AspectName, FrameIndex, MarkerName, SegmentName, RIGID_XYZ, SEGMENT_COM, TOTAL_BODY_COM,
    TRACKER_TYPE_KEY, XYZ,
};
use crate::model_info::AspectInfo;
use crate::skelly_errors::SkellyError;
use crate::trajectories::{ErrorSeries, PointArray, Trajectory};

const REPROJECTION_ERROR: &str = "reprojection_error";

#[derive(Debug, Clone, PartialEq)]
pub struct Aspect {
    name: AspectName,
    structure: AnatomicalStructure,
    trajectories: IndexMap<String, Trajectory>,
    reprojection_error: Option<ErrorSeries>,
    metadata: IndexMap<String, String>,
}

impl Aspect {
    /// An aspect without data.
    pub fn new(name: impl Into<AspectName>, structure: AnatomicalStructure) -> Self {
        Aspect {
            name: name.into(),
            structure,
            trajectories: IndexMap::new(),
            reprojection_error: None,
            metadata: IndexMap::new(),
        }
    }

    /// Build the structure of an aspect from its configuration and record its tracker.
    ///
    /// Arguments
    /// -----------------
    /// * `name`: aspect name (e.g. `body`).
    /// * `info`: the aspect configuration.
    ///
    /// Return
    /// ----------
    /// * An empty aspect whose `tracker_type` metadata is the configured tracker name.
    ///
    /// Errors
    /// ----------
    /// * Any validation error of [`AnatomicalStructure::from_aspect_info`].
    pub fn from_aspect_info(name: impl Into<AspectName>, info: &AspectInfo) -> Result<Self, SkellyError> {
        let structure = AnatomicalStructure::from_aspect_info(info)?;
        let mut aspect = Aspect::new(name, structure);
        aspect.add_metadata(TRACKER_TYPE_KEY, info.tracker_name.clone());
        Ok(aspect)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn anatomical_structure(&self) -> &AnatomicalStructure {
        &self.structure
    }

    /// Every stored trajectory, in insertion order.
    pub fn trajectories(&self) -> &IndexMap<String, Trajectory> {
        &self.trajectories
    }

    pub fn trajectory(&self, name: &str) -> Result<&Trajectory, SkellyError> {
        self.trajectories
            .get(name)
            .ok_or_else(|| SkellyError::UnknownTrajectory {
                aspect: self.name.clone(),
                trajectory: name.to_string(),
            })
    }

    pub fn reprojection_error(&self) -> Option<&ErrorSeries> {
        self.reprojection_error.as_ref()
    }

    pub fn metadata(&self) -> &IndexMap<String, String> {
        &self.metadata
    }

    pub fn add_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    /// The tracker that produced this aspect, if recorded.
    pub fn tracker_type(&self) -> Option<&str> {
        self.metadata.get(TRACKER_TYPE_KEY).map(String::as_str)
    }

    /// Store a trajectory under its own name.
    pub fn add_trajectory(&mut self, trajectory: Trajectory) {
        debug!(
            aspect = %self.name,
            trajectory = trajectory.name(),
            frames = trajectory.n_frames(),
            markers = trajectory.n_markers(),
            "Storing trajectory"
        );
        self.trajectories
            .insert(trajectory.name().to_string(), trajectory);
    }

    /// Number of frames of the ingested data, if any.
    pub fn n_frames(&self) -> Option<usize> {
        self.xyz().map(Trajectory::n_frames)
    }

    pub fn xyz(&self) -> Option<&Trajectory> {
        self.trajectories.get(XYZ)
    }

    pub fn rigid_xyz(&self) -> Option<&Trajectory> {
        self.trajectories.get(RIGID_XYZ)
    }

    pub fn segment_com(&self) -> Option<&Trajectory> {
        self.trajectories.get(SEGMENT_COM)
    }

    pub fn total_body_com(&self) -> Option<&Trajectory> {
        self.trajectories.get(TOTAL_BODY_COM)
    }

    /// Ingest raw tracked points and store them, with virtual markers, as `3d_xyz`.
    ///
    /// Arguments
    /// -----------------
    /// * `points`: shape `(frames, tracked markers, 3)` in tracked-marker order, NaN for
    ///   undetected points.
    ///
    /// Errors
    /// ----------
    /// * [`SkellyError::ShapeMismatch`] if the marker axis does not match the number of
    ///   tracked markers.
    pub fn ingest_tracked_points(&mut self, points: &PointArray) -> Result<(), SkellyError> {
        let trajectory = synthesize_virtual_markers(points, &self.structure)?;
        info!(
            aspect = %self.name,
            frames = trajectory.n_frames(),
            markers = trajectory.n_markers(),
            "Ingested tracked points"
        );
        self.add_trajectory(trajectory);
        Ok(())
    }

    /// Ingest the tracker's reprojection error for the tracked markers.
    ///
    /// Arguments
    /// -----------------
    /// * `errors`: shape `(frames, tracked markers)`.
    ///
    /// Errors
    /// ----------
    /// * [`SkellyError::ShapeMismatch`] if the column count differs from the number of
    ///   tracked markers, or if tracked points were ingested with a different frame count.
    pub fn ingest_reprojection_error(&mut self, errors: DMatrix<f64>) -> Result<(), SkellyError> {
        if let Some(n_frames) = self.n_frames() {
            if errors.nrows() != n_frames {
                return Err(SkellyError::ShapeMismatch {
                    context: format!("{}: reprojection error frames", self.name),
                    expected: n_frames,
                    actual: errors.nrows(),
                });
            }
        }
        let series = ErrorSeries::new(
            REPROJECTION_ERROR,
            errors,
            self.structure.tracked_point_names().to_vec(),
        )
        .map_err(|e| match e {
            SkellyError::ShapeMismatch {
                expected, actual, ..
            } => SkellyError::ShapeMismatch {
                context: format!("{}: reprojection error columns", self.name),
                expected,
                actual,
            },
            other => other,
        })?;
        self.reprojection_error = Some(series);
        Ok(())
    }

    /// Compute and store `segment_com` and `total_body_com`; see
    /// [`calculate_center_of_mass`](crate::biomechanics::calculate_center_of_mass).
    pub fn calculate_center_of_mass(&mut self) -> Result<Vec<String>, SkellyError> {
        CenterOfMassCalculation.calculate_and_store(self)
    }

    /// Compute and store `rigid_3d_xyz`; see
    /// [`enforce_rigid_bones`](crate::biomechanics::enforce_rigid_bones).
    pub fn enforce_rigid_bones(&mut self) -> Result<Vec<String>, SkellyError> {
        RigidBonesEnforcement.calculate_and_store(self)
    }

    /// Segment length statistics of the `3d_xyz` trajectory.
    pub fn bone_length_statistics(
        &self,
    ) -> Result<IndexMap<SegmentName, BoneLengthStatistics>, SkellyError> {
        bone_length_statistics(self.trajectory(XYZ)?, &self.structure)
    }

    pub fn get_marker(&self, trajectory: &str, marker: &str) -> Result<Vec<Vector3<f64>>, SkellyError> {
        self.trajectory(trajectory)?.get_marker(marker)
    }

    pub fn get_frame(
        &self,
        trajectory: &str,
        frame: FrameIndex,
    ) -> Result<IndexMap<MarkerName, Vector3<f64>>, SkellyError> {
        self.trajectory(trajectory)?.get_frame(frame)
    }

    fn error_series(&self) -> Result<&ErrorSeries, SkellyError> {
        self.reprojection_error
            .as_ref()
            .ok_or_else(|| SkellyError::NoReprojectionError(self.name.clone()))
    }

    pub fn get_error_for_marker(&self, marker: &str) -> Result<Vec<f64>, SkellyError> {
        self.error_series()?.get_marker(marker)
    }

    pub fn get_error_for_frame(&self, frame: FrameIndex) -> Result<IndexMap<MarkerName, f64>, SkellyError> {
        self.error_series()?.get_frame(frame)
    }
}

impl fmt::Display for Aspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Aspect: {}", self.name)?;
        writeln!(f, "  Anatomical Structure:")?;
        write!(f, "{}", self.structure)?;
        if self.trajectories.is_empty() {
            writeln!(f, "  Trajectories: none")?;
        } else {
            let names: Vec<&str> = self.trajectories.keys().map(String::as_str).collect();
            writeln!(
                f,
                "  Trajectories: {} ({})",
                self.trajectories.len(),
                names.join(", ")
            )?;
        }
        match &self.reprojection_error {
            Some(_) => writeln!(f, "  Reprojection error: yes")?,
            None => writeln!(f, "  Reprojection error: no")?,
        }
        if self.metadata.is_empty() {
            writeln!(f, "  Metadata: none")
        } else {
            let entries: Vec<String> = self
                .metadata
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            writeln!(f, "  Metadata: {}", entries.join(", "))
        }
    }
}
