//! # Segment and whole-body center of mass
//!
//! Each segment listed in the center-of-mass table has its center of mass on the line
//! from its proximal to its distal marker, at a fraction `segment_com_length` of the
//! segment length:
//!
//! ```text
//! segment_com = proximal + segment_com_length · (distal − proximal)
//! ```
//!
//! The whole-body center of mass is the mass-weighted sum of the segment centers, using
//! `segment_com_percentage` as the fraction of body mass carried by each segment:
//!
//! ```text
//! total_body_com = Σᵢ segment_com_percentageᵢ · segment_comᵢ
//! ```
//!
//! Missing data
//! -----------------
//! * A segment center is NaN on a frame as soon as one of its endpoints is.
//! * The body center is NaN on the **whole frame** as soon as one contributing segment
//!   center has a NaN component.
//!
//! See also
//! ------------
//! * [`crate::anatomy::AnatomicalStructure::center_of_mass_definitions`] – Validated table.
//! * [`crate::biomechanics::CenterOfMassCalculation`] – Pipeline step storing the results.
use nalgebra::Vector3;
use tracing::{debug, info};

use crate::anatomy::AnatomicalStructure;
use crate::constants::{MarkerName, SEGMENT_COM, TOTAL_BODY_COM};
use crate::skelly_errors::SkellyError;
use crate::trajectories::point_array::has_nan;
use crate::trajectories::{PointArray, Trajectory};

/// Output of [`calculate_center_of_mass`].
#[derive(Debug, Clone, PartialEq)]
pub struct CenterOfMass {
    /// One marker per segment of the center-of-mass table, in declared order.
    pub segment_com: Trajectory,
    /// A single marker, named `total_body_com`.
    pub total_body_com: Trajectory,
}

struct SegmentTerm {
    proximal: usize,
    distal: usize,
    length: f64,
    percentage: f64,
}

fn resolve(trajectory: &Trajectory, marker: &str) -> Result<usize, SkellyError> {
    trajectory
        .marker_index(marker)
        .ok_or_else(|| SkellyError::UnknownMarker(marker.to_string()))
}

/// Compute segment and whole-body centers of mass from a marker trajectory.
///
/// Arguments
/// -----------------
/// * `trajectory`: marker positions containing every segment endpoint (usually `3d_xyz`).
/// * `structure`: anatomical structure of the aspect.
///
/// Return
/// ----------
/// * `Ok(None)` when the structure has no center-of-mass definitions; this is logged
///   and is not an error.
/// * `Ok(Some(CenterOfMass))` otherwise.
///
/// Errors
/// ----------
/// * [`SkellyError::UnknownMarker`] if a segment endpoint is missing from `trajectory`.
pub fn calculate_center_of_mass(
    trajectory: &Trajectory,
    structure: &AnatomicalStructure,
) -> Result<Option<CenterOfMass>, SkellyError> {
    let definitions = structure.center_of_mass_definitions();
    if definitions.is_empty() {
        info!(
            trajectory = trajectory.name(),
            "No center of mass definitions, skipping center of mass calculation"
        );
        return Ok(None);
    }

    let mut names: Vec<MarkerName> = Vec::with_capacity(definitions.len());
    let mut terms = Vec::with_capacity(definitions.len());
    for (segment, com) in definitions {
        let connection = structure
            .segment_connections()
            .get(segment)
            .ok_or_else(|| SkellyError::UnknownSegment(segment.clone()))?;
        terms.push(SegmentTerm {
            proximal: resolve(trajectory, &connection.proximal)?,
            distal: resolve(trajectory, &connection.distal)?,
            length: com.segment_com_length,
            percentage: com.segment_com_percentage,
        });
        names.push(segment.clone());
    }

    let n_frames = trajectory.n_frames();
    let segment_array = PointArray::from_fn(n_frames, terms.len(), |frame, i| {
        let term = &terms[i];
        let proximal = trajectory.point(frame, term.proximal);
        let distal = trajectory.point(frame, term.distal);
        proximal + (distal - proximal) * term.length
    });

    let total_array = PointArray::from_fn(n_frames, 1, |frame, _| {
        let segments = segment_array.frame(frame);
        if segments.iter().any(has_nan) {
            return Vector3::repeat(f64::NAN);
        }
        segments
            .iter()
            .zip(&terms)
            .fold(Vector3::zeros(), |acc, (com, term)| acc + com * term.percentage)
    });

    debug!(
        frames = n_frames,
        segments = terms.len(),
        "Computed segment and total body center of mass"
    );

    Ok(Some(CenterOfMass {
        segment_com: Trajectory::new(SEGMENT_COM, segment_array, names)?,
        total_body_com: Trajectory::new(
            TOTAL_BODY_COM,
            total_array,
            vec![TOTAL_BODY_COM.to_string()],
        )?,
    }))
}
