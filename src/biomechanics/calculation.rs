//! # Anatomical calculations as pipeline steps
//!
//! An [`AnatomicalCalculation`] reads an [`Aspect`], produces new trajectories and
//! stores them back into the aspect. A [`CalculationPipeline`] runs a fixed sequence of
//! calculations on one aspect and collects their messages.
//!
//! A calculation that has nothing to do (e.g. no center-of-mass table) is **not** an
//! error: it returns an unsuccessful [`CalculationResult`] with an explanatory message,
//! nothing is stored, and the pipeline moves on to the next step. Errors are reserved
//! for inconsistent data, such as an aspect that never ingested tracked points.
//!
//! ## See also
//! ------------
//! * [`crate::subject::Subject::calculate`] – Runs a pipeline over every aspect.
use std::fmt;

use tracing::info;

use crate::aspect::Aspect;
use crate::constants::XYZ;
use crate::skelly_errors::SkellyError;
use crate::trajectories::Trajectory;

use super::center_of_mass::calculate_center_of_mass;
use super::rigid_bones::enforce_rigid_bones;

/// Outcome of an [`AnatomicalCalculation::calculate`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculationResult {
    pub success: bool,
    /// Trajectories to store in the aspect, only meaningful when `success` is set.
    pub trajectories: Vec<Trajectory>,
    pub messages: Vec<String>,
}

impl CalculationResult {
    pub fn skipped(message: String) -> Self {
        CalculationResult {
            success: false,
            trajectories: Vec::new(),
            messages: vec![message],
        }
    }

    pub fn completed(trajectories: Vec<Trajectory>, message: String) -> Self {
        CalculationResult {
            success: true,
            trajectories,
            messages: vec![message],
        }
    }
}

pub trait AnatomicalCalculation: fmt::Debug {
    /// Short name of the calculation, used in logs.
    fn name(&self) -> &'static str;

    /// Compute the results from the aspect's data without modifying it.
    fn calculate(&self, aspect: &Aspect) -> Result<CalculationResult, SkellyError>;

    /// Store the trajectories of a successful result in the aspect.
    fn store(&self, aspect: &mut Aspect, result: CalculationResult) {
        if !result.success {
            return;
        }
        for trajectory in result.trajectories {
            aspect.add_trajectory(trajectory);
        }
    }

    /// Run [`Self::calculate`], then [`Self::store`] on success, and return the messages.
    fn calculate_and_store(&self, aspect: &mut Aspect) -> Result<Vec<String>, SkellyError> {
        let result = self.calculate(aspect)?;
        let messages = result.messages.clone();
        info!(
            aspect = aspect.name(),
            calculation = self.name(),
            success = result.success,
            "{}",
            messages.join("; ")
        );
        self.store(aspect, result);
        Ok(messages)
    }
}

fn base_trajectory(aspect: &Aspect) -> Result<&Trajectory, SkellyError> {
    aspect.trajectory(XYZ)
}

/// Segment and whole-body center of mass, stored as `segment_com` and `total_body_com`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CenterOfMassCalculation;

impl AnatomicalCalculation for CenterOfMassCalculation {
    fn name(&self) -> &'static str {
        "center_of_mass"
    }

    fn calculate(&self, aspect: &Aspect) -> Result<CalculationResult, SkellyError> {
        let trajectory = base_trajectory(aspect)?;
        Ok(
            match calculate_center_of_mass(trajectory, aspect.anatomical_structure())? {
                None => CalculationResult::skipped(format!(
                    "No center of mass definitions for aspect: {}, skipping center of mass calculation",
                    aspect.name()
                )),
                Some(com) => CalculationResult::completed(
                    vec![com.segment_com, com.total_body_com],
                    format!("Calculated center of mass for aspect: {}", aspect.name()),
                ),
            },
        )
    }
}

/// Rigid bone enforcement, stored as `rigid_3d_xyz`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RigidBonesEnforcement;

impl AnatomicalCalculation for RigidBonesEnforcement {
    fn name(&self) -> &'static str {
        "rigid_bones"
    }

    fn calculate(&self, aspect: &Aspect) -> Result<CalculationResult, SkellyError> {
        let trajectory = base_trajectory(aspect)?;
        Ok(
            match enforce_rigid_bones(trajectory, aspect.anatomical_structure())? {
                None => CalculationResult::skipped(format!(
                    "No segment connections for aspect: {}, skipping rigid bones enforcement",
                    aspect.name()
                )),
                Some(rigid) => CalculationResult::completed(
                    vec![rigid],
                    format!("Enforced rigid bones for aspect: {}", aspect.name()),
                ),
            },
        )
    }
}

/// An ordered sequence of calculations applied to one aspect.
#[derive(Debug)]
pub struct CalculationPipeline {
    steps: Vec<Box<dyn AnatomicalCalculation>>,
}

impl CalculationPipeline {
    /// An empty pipeline.
    pub fn new() -> Self {
        CalculationPipeline { steps: Vec::new() }
    }

    /// Center of mass, then rigid bones.
    pub fn standard() -> Self {
        Self::new()
            .with_step(CenterOfMassCalculation)
            .with_step(RigidBonesEnforcement)
    }

    pub fn with_step<C: AnatomicalCalculation + 'static>(mut self, step: C) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step on the aspect, in order, and collect their messages.
    ///
    /// Errors
    /// ----------
    /// * The first error returned by a step; later steps are not run.
    pub fn run(&self, aspect: &mut Aspect) -> Result<Vec<String>, SkellyError> {
        let mut messages = Vec::new();
        for step in &self.steps {
            messages.extend(step.calculate_and_store(aspect)?);
        }
        Ok(messages)
    }
}

impl Default for CalculationPipeline {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod test_calculation_pipeline {
    use indexmap::IndexMap;
    use nalgebra::Vector3;

    use super::*;
    use crate::anatomy::AnatomicalStructure;
    use crate::constants::{RIGID_XYZ, SEGMENT_COM, TOTAL_BODY_COM};
    use crate::model_info::{SegmentCenterOfMass, SegmentConnection};
    use crate::trajectories::PointArray;

    fn aspect(with_segments: bool) -> Aspect {
        let mut segments = IndexMap::new();
        let mut coms = IndexMap::new();
        if with_segments {
            segments.insert(
                "ab".to_string(),
                SegmentConnection {
                    proximal: "a".into(),
                    distal: "b".into(),
                },
            );
            coms.insert(
                "ab".to_string(),
                SegmentCenterOfMass {
                    segment_com_length: 0.5,
                    segment_com_percentage: 1.0,
                },
            );
        }
        let structure = AnatomicalStructure::builder()
            .with_landmarks(vec!["a".into(), "b".into()])
            .with_segment_connections(segments)
            .with_center_of_mass(coms)
            .build()
            .unwrap();
        Aspect::new("body", structure)
    }

    fn points() -> PointArray {
        PointArray::from_fn(2, 2, |f, m| Vector3::new(m as f64 * (f + 1) as f64, 0., 0.))
    }

    #[test]
    fn test_standard_pipeline() {
        let mut body = aspect(true);
        body.ingest_tracked_points(&points()).unwrap();

        let pipeline = CalculationPipeline::standard();
        assert_eq!(pipeline.len(), 2);
        let messages = pipeline.run(&mut body).unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].starts_with("Calculated center of mass"));

        let names: Vec<_> = body.trajectories().keys().cloned().collect();
        assert_eq!(names, vec![XYZ, SEGMENT_COM, TOTAL_BODY_COM, RIGID_XYZ]);
    }

    #[test]
    fn test_skipped_steps_store_nothing() {
        let mut body = aspect(false);
        body.ingest_tracked_points(&points()).unwrap();

        let messages = CalculationPipeline::default().run(&mut body).unwrap();
        assert!(messages[0].starts_with("No center of mass definitions"));
        assert!(messages[1].starts_with("No segment connections"));
        assert_eq!(body.trajectories().len(), 1);
    }

    #[test]
    fn test_missing_base_trajectory() {
        let mut body = aspect(true);
        assert_eq!(
            CenterOfMassCalculation.calculate_and_store(&mut body),
            Err(SkellyError::UnknownTrajectory {
                aspect: "body".into(),
                trajectory: XYZ.into()
            })
        );
    }
}
