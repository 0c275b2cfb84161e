//! # Rigid bone enforcement
//!
//! Tracked segment lengths fluctuate from frame to frame because of detection noise. This
//! module replaces each segment's length by a per-segment reference length, keeping the
//! measured segment direction:
//!
//! 1. **Reference length** – the median of `‖distal − proximal‖` over the frames where
//!    both endpoints are fully detected ([`bone_length_statistics`]).
//! 2. **Rescaling** – on every frame, the distal marker is moved to
//!    `proximal′ + L · (distal − proximal) / ‖distal − proximal‖`, where `proximal′` is
//!    the proximal marker as already adjusted ([`enforce_rigid_bones`]).
//!
//! Conventions
//! -----------------
//! * Lengths, medians and directions are measured on the input trajectory. The anchor of
//!   each segment is its proximal marker in the output being built, so a chain declared
//!   root first keeps every link at its reference length.
//! * Segments are processed in declared order. A marker that is the distal end of several
//!   segments keeps the position computed for the **last** of them.
//! * A NaN endpoint, a zero-length segment or a segment without any valid frame yields a
//!   NaN distal marker on the affected frames.
//! * The median of an even number of lengths is the mean of the two middle values.
use indexmap::IndexMap;
use itertools::Itertools;
use nalgebra::Vector3;
use ordered_float::NotNan;
use tracing::{debug, info};

use crate::anatomy::{AnatomicalStructure, SegmentIndices};
use crate::constants::{SegmentName, RIGID_XYZ};
use crate::skelly_errors::SkellyError;
use crate::trajectories::point_array::has_nan;
use crate::trajectories::Trajectory;

/// Length statistics of one segment over the frames where it is fully detected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneLengthStatistics {
    /// Median length, NaN without any valid frame.
    pub median: f64,
    /// Population standard deviation, NaN without any valid frame.
    pub stdev: f64,
    /// Number of frames with both endpoints detected.
    pub valid_frames: usize,
}

fn check_markers(trajectory: &Trajectory, structure: &AnatomicalStructure) -> Result<(), SkellyError> {
    if trajectory.marker_names() != structure.marker_names() {
        return Err(SkellyError::ShapeMismatch {
            context: format!("{}: markers of the anatomical structure", trajectory.name()),
            expected: structure.num_markers(),
            actual: trajectory.n_markers(),
        });
    }
    Ok(())
}

fn segment_lengths(trajectory: &Trajectory, segment: &SegmentIndices) -> Vec<NotNan<f64>> {
    (0..trajectory.n_frames())
        .filter_map(|frame| {
            let proximal = trajectory.point(frame, segment.proximal);
            let distal = trajectory.point(frame, segment.distal);
            if has_nan(&proximal) || has_nan(&distal) {
                return None;
            }
            NotNan::new((distal - proximal).norm()).ok()
        })
        .collect()
}

/// Median of a set of lengths, NaN when empty.
fn median(mut lengths: Vec<NotNan<f64>>) -> f64 {
    lengths.sort_unstable();
    let n = lengths.len();
    match n {
        0 => f64::NAN,
        _ if n % 2 == 1 => lengths[n / 2].into_inner(),
        _ => (lengths[n / 2 - 1].into_inner() + lengths[n / 2].into_inner()) / 2.0,
    }
}

fn stdev(lengths: &[NotNan<f64>]) -> f64 {
    if lengths.is_empty() {
        return f64::NAN;
    }
    let n = lengths.len() as f64;
    let mean = lengths.iter().map(|l| l.into_inner()).sum::<f64>() / n;
    let variance = lengths
        .iter()
        .map(|l| (l.into_inner() - mean).powi(2))
        .sum::<f64>()
        / n;
    variance.sqrt()
}

/// Per-segment length statistics of a marker trajectory.
///
/// Arguments
/// -----------------
/// * `trajectory`: marker positions with exactly the structure's markers, in order.
/// * `structure`: anatomical structure providing the segments.
///
/// Return
/// ----------
/// * Segment name → [`BoneLengthStatistics`], in declared segment order.
///
/// Errors
/// ----------
/// * [`SkellyError::ShapeMismatch`] if the trajectory markers differ from the structure's.
pub fn bone_length_statistics(
    trajectory: &Trajectory,
    structure: &AnatomicalStructure,
) -> Result<IndexMap<SegmentName, BoneLengthStatistics>, SkellyError> {
    check_markers(trajectory, structure)?;

    Ok(structure
        .segments()
        .iter()
        .map(|segment| {
            let lengths = segment_lengths(trajectory, segment);
            let stats = BoneLengthStatistics {
                stdev: stdev(&lengths),
                valid_frames: lengths.len(),
                median: median(lengths),
            };
            debug!(
                segment = %segment.name,
                median = stats.median,
                stdev = stats.stdev,
                valid_frames = stats.valid_frames,
                "Bone length statistics"
            );
            (segment.name.clone(), stats)
        })
        .collect())
}

/// Point at `length` from `anchor` along `distal − proximal`; NaN when the direction is
/// undefined or the anchor is missing.
#[inline]
fn rescale(
    anchor: &Vector3<f64>,
    proximal: &Vector3<f64>,
    distal: &Vector3<f64>,
    length: f64,
) -> Vector3<f64> {
    if has_nan(anchor) || has_nan(proximal) || has_nan(distal) {
        return Vector3::repeat(f64::NAN);
    }
    match (distal - proximal).try_normalize(0.0) {
        Some(direction) => anchor + direction * length,
        None => Vector3::repeat(f64::NAN),
    }
}

/// Give every segment its median length on every frame.
///
/// Arguments
/// -----------------
/// * `trajectory`: marker positions with exactly the structure's markers, in order
///   (usually `3d_xyz`).
/// * `structure`: anatomical structure providing the segments.
///
/// Return
/// ----------
/// * `Ok(None)` when the structure has no segments; this is logged and is not an error.
/// * `Ok(Some(trajectory))` otherwise: a `rigid_3d_xyz` trajectory with the full marker
///   set, where every distal marker has been placed at its reference length from its
///   (adjusted) proximal marker and every other marker is copied.
///
/// Errors
/// ----------
/// * [`SkellyError::ShapeMismatch`] if the trajectory markers differ from the structure's.
///
/// See also
/// ------------
/// * [`bone_length_statistics`] – Reference lengths used for the rescaling.
pub fn enforce_rigid_bones(
    trajectory: &Trajectory,
    structure: &AnatomicalStructure,
) -> Result<Option<Trajectory>, SkellyError> {
    if !structure.has_segments() {
        info!(
            trajectory = trajectory.name(),
            "No segment connections, skipping rigid bone enforcement"
        );
        return Ok(None);
    }

    let statistics = bone_length_statistics(trajectory, structure)?;
    let source = trajectory.as_array();
    let mut rigid = source.clone();

    for (segment, stats) in structure.segments().iter().zip_eq(statistics.values()) {
        for frame in 0..source.n_frames() {
            let moved = rescale(
                &rigid.point(frame, segment.proximal),
                &source.point(frame, segment.proximal),
                &source.point(frame, segment.distal),
                stats.median,
            );
            rigid.set_point(frame, segment.distal, &moved);
        }
    }

    info!(
        segments = structure.segments().len(),
        frames = source.n_frames(),
        "Enforced rigid bone lengths"
    );

    Trajectory::new(RIGID_XYZ, rigid, trajectory.marker_names().to_vec()).map(Some)
}

#[cfg(test)]
mod test_rigid_bones {
    use approx::assert_relative_eq;

    use super::*;
    use crate::model_info::SegmentConnection;
    use crate::trajectories::PointArray;

    fn structure(segments: &[(&str, &str, &str)]) -> AnatomicalStructure {
        let segments = segments
            .iter()
            .map(|(name, proximal, distal)| {
                (
                    name.to_string(),
                    SegmentConnection {
                        proximal: proximal.to_string(),
                        distal: distal.to_string(),
                    },
                )
            })
            .collect();
        AnatomicalStructure::builder()
            .with_landmarks(vec!["a".into(), "b".into(), "c".into()])
            .with_segment_connections(segments)
            .build()
            .unwrap()
    }

    fn trajectory(frames: &[[Vector3<f64>; 3]]) -> Trajectory {
        let array = PointArray::from_fn(frames.len(), 3, |f, m| frames[f][m]);
        Trajectory::new("3d_xyz", array, vec!["a".into(), "b".into(), "c".into()]).unwrap()
    }

    fn v(x: f64, y: f64, z: f64) -> Vector3<f64> {
        Vector3::new(x, y, z)
    }

    fn noisy() -> Trajectory {
        let nan = Vector3::repeat(f64::NAN);
        trajectory(&[
            [v(0., 0., 0.), v(1., 0., 0.), v(0., 0., 0.)],
            [v(0., 0., 0.), v(0., 3., 0.), v(0., 0., 0.)],
            [v(1., 1., 1.), v(1., 1., 3.), v(0., 0., 0.)],
            [v(0., 0., 0.), nan, v(0., 0., 0.)],
        ])
    }

    #[test]
    fn test_statistics() {
        let s = structure(&[("ab", "a", "b")]);
        let stats = bone_length_statistics(&noisy(), &s).unwrap();
        let ab = stats["ab"];
        assert_eq!(ab.valid_frames, 3);
        assert_relative_eq!(ab.median, 2.0);
        // lengths 1, 3, 2
        assert_relative_eq!(ab.stdev, (2.0f64 / 3.0).sqrt());
    }

    #[test]
    fn test_even_median() {
        assert_relative_eq!(
            median([4.0, 1.0, 3.0, 2.0].map(|l| NotNan::new(l).unwrap()).to_vec()),
            2.5
        );
        assert!(median(Vec::new()).is_nan());
    }

    #[test]
    fn test_length_and_direction() {
        let s = structure(&[("ab", "a", "b")]);
        let input = noisy();
        let rigid = enforce_rigid_bones(&input, &s).unwrap().unwrap();
        assert_eq!(rigid.name(), RIGID_XYZ);
        assert_eq!(rigid.marker_names(), input.marker_names());

        for frame in 0..3 {
            let a = rigid.point(frame, 0);
            let b = rigid.point(frame, 1);
            assert_relative_eq!((b - a).norm(), 2.0, epsilon = 1e-12);

            let before = (input.point(frame, 1) - input.point(frame, 0)).normalize();
            let after = (b - a).normalize();
            assert_relative_eq!(before.dot(&after), 1.0, epsilon = 1e-12);
        }
        assert!(has_nan(&rigid.point(3, 1)));
        // proximal and untouched markers are copied
        assert_eq!(rigid.point(2, 0), input.point(2, 0));
        assert_eq!(rigid.point(1, 2), input.point(1, 2));
    }

    #[test]
    fn test_zero_length_frame() {
        let s = structure(&[("ab", "a", "b")]);
        let input = trajectory(&[
            [v(0., 0., 0.), v(1., 0., 0.), v(0., 0., 0.)],
            [v(0., 0., 0.), v(0., 0., 0.), v(0., 0., 0.)],
        ]);
        let rigid = enforce_rigid_bones(&input, &s).unwrap().unwrap();
        assert!(has_nan(&rigid.point(1, 1)));
    }

    #[test]
    fn test_chain_follows_adjusted_parent() {
        let s = structure(&[("ab", "a", "b"), ("bc", "b", "c")]);
        // ab lengths 1, 3, 2; bc always 1
        let input = trajectory(&[
            [v(0., 0., 0.), v(1., 0., 0.), v(1., 1., 0.)],
            [v(0., 0., 0.), v(3., 0., 0.), v(3., 0., 1.)],
            [v(0., 0., 0.), v(0., 2., 0.), v(1., 2., 0.)],
        ]);
        let rigid = enforce_rigid_bones(&input, &s).unwrap().unwrap();
        for frame in 0..3 {
            let (a, b, c) = (rigid.point(frame, 0), rigid.point(frame, 1), rigid.point(frame, 2));
            assert_relative_eq!((b - a).norm(), 2.0, epsilon = 1e-12);
            assert_relative_eq!((c - b).norm(), 1.0, epsilon = 1e-12);

            let before = input.point(frame, 2) - input.point(frame, 1);
            assert_relative_eq!(c - b, before, epsilon = 1e-12);
        }
        assert_relative_eq!(rigid.point(0, 2), v(2., 1., 0.), epsilon = 1e-12);
    }

    #[test]
    fn test_shared_distal_last_write_wins() {
        let s = structure(&[("ac", "a", "c"), ("bc", "b", "c")]);
        let input = trajectory(&[
            [v(0., 0., 0.), v(10., 0., 0.), v(0., 1., 0.)],
            [v(0., 0., 0.), v(10., 0., 0.), v(0., 3., 0.)],
        ]);
        let rigid = enforce_rigid_bones(&input, &s).unwrap().unwrap();
        let bc = bone_length_statistics(&input, &s).unwrap()["bc"].median;
        for frame in 0..2 {
            assert_relative_eq!(
                (rigid.point(frame, 2) - rigid.point(frame, 1)).norm(),
                bc,
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn test_no_segments_is_noop() {
        let s = structure(&[]);
        assert_eq!(enforce_rigid_bones(&noisy(), &s).unwrap(), None);
    }

    #[test]
    fn test_marker_mismatch() {
        let s = structure(&[("ab", "a", "b")]);
        let array = PointArray::nan(1, 2);
        let traj = Trajectory::new("3d_xyz", array, vec!["a".into(), "b".into()]).unwrap();
        assert!(matches!(
            enforce_rigid_bones(&traj, &s),
            Err(SkellyError::ShapeMismatch { expected: 3, actual: 2, .. })
        ));
    }
}
