//! Virtual marker synthesis.
//!
//! A virtual marker is a weighted sum of other markers, e.g. the hip center as the
//! midpoint of both hips. Recipes are evaluated in declaration order, which the
//! [`AnatomicalStructure`] has already validated: a recipe only uses tracked markers and
//! virtual markers declared before it, all of them produced earlier in the same pass.
use nalgebra::Vector3;
use tracing::debug;

use crate::anatomy::{AnatomicalStructure, VirtualMarkerRecipe};
use crate::constants::XYZ;
use crate::skelly_errors::SkellyError;
use crate::trajectories::{PointArray, Trajectory};

/// Weighted sum of the recipe's components, taken from the markers already known for the frame.
#[inline]
fn weighted_sum(recipe: &VirtualMarkerRecipe, known: &[Vector3<f64>]) -> Vector3<f64> {
    recipe
        .components
        .iter()
        .fold(Vector3::zeros(), |acc, &(index, weight)| acc + known[index] * weight)
}

/// Append the virtual markers of `structure` to raw tracked points.
///
/// For every frame and axis, a virtual marker is `Σ wᵢ · componentᵢ`. NaN is absorbing:
/// a virtual marker is NaN on an axis as soon as one of its components is.
///
/// Arguments
/// -----------------
/// * `base`: tracked points, shape `(frames, tracked markers, 3)`, in the structure's
///   tracked-marker order.
/// * `structure`: anatomical structure providing the recipes.
///
/// Return
/// ----------
/// * A [`Trajectory`] named `3d_xyz` holding every marker of the structure: the tracked
///   markers unchanged, followed by the virtual markers in declaration order.
///
/// Errors
/// ----------
/// * [`SkellyError::ShapeMismatch`] if `base` does not have one column per tracked marker.
pub fn synthesize_virtual_markers(
    base: &PointArray,
    structure: &AnatomicalStructure,
) -> Result<Trajectory, SkellyError> {
    let num_tracked = structure.num_tracked_points();
    if base.n_markers() != num_tracked {
        return Err(SkellyError::ShapeMismatch {
            context: "tracked points".into(),
            expected: num_tracked,
            actual: base.n_markers(),
        });
    }

    let recipes = structure.virtual_marker_recipes();
    let num_markers = structure.num_markers();
    let mut points = Vec::with_capacity(base.n_frames() * num_markers);
    let mut known = Vec::with_capacity(num_markers);

    for frame in 0..base.n_frames() {
        known.clear();
        known.extend(base.frame(frame));
        for recipe in recipes {
            let point = weighted_sum(recipe, &known);
            known.push(point);
        }
        points.extend_from_slice(&known);
    }

    debug!(
        frames = base.n_frames(),
        tracked = num_tracked,
        virtual_markers = recipes.len(),
        "Synthesized virtual markers"
    );

    let array = PointArray::new(base.n_frames(), num_markers, points)?;
    Trajectory::new(XYZ, array, structure.marker_names().to_vec())
}
