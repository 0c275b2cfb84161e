//! # Tabular display for trajectories
//!
//! [`TrajectoryDisplay`] borrows a [`Trajectory`] and renders it with `comfy-table` when
//! used with `{}`: one row per `(frame, marker)`, in table order.
//!
//! ```rust,ignore
//! use skellymodels::trajectories::display::TrajectoryDisplayExt;
//!
//! println!("{}", trajectory.show().with_precision(2).max_frames(5));
//! ```
//!
//! Undetected points render as `NaN`. Large trajectories are truncated with
//! [`TrajectoryDisplay::max_frames`]; a footer line tells how many frames were skipped.
use std::fmt;

use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, ContentArrangement, Row, Table};

use super::Trajectory;

pub struct TrajectoryDisplay<'a> {
    trajectory: &'a Trajectory,
    /// Fixed-point digits for coordinates (default = 4).
    precision: usize,
    /// Render at most this many frames.
    max_frames: Option<usize>,
}

impl<'a> TrajectoryDisplay<'a> {
    pub fn new(trajectory: &'a Trajectory) -> Self {
        Self {
            trajectory,
            precision: 4,
            max_frames: None,
        }
    }

    pub fn with_precision(mut self, p: usize) -> Self {
        self.precision = p;
        self
    }

    pub fn max_frames(mut self, n: usize) -> Self {
        self.max_frames = Some(n);
        self
    }

    fn render(&self) -> String {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("Frame"),
            Cell::new("Keypoint"),
            Cell::new("x"),
            Cell::new("y"),
            Cell::new("z"),
        ]);

        let n_frames = self
            .max_frames
            .map_or(self.trajectory.n_frames(), |n| n.min(self.trajectory.n_frames()));
        let p = self.precision;
        for frame in 0..n_frames {
            let points = self.trajectory.as_array().frame(frame);
            for (point, keypoint) in points.iter().zip(self.trajectory.marker_names()) {
                table.add_row(Row::from(vec![
                    Cell::new(frame).set_alignment(CellAlignment::Right),
                    Cell::new(keypoint),
                    Cell::new(format!("{:.*}", p, point.x)).set_alignment(CellAlignment::Right),
                    Cell::new(format!("{:.*}", p, point.y)).set_alignment(CellAlignment::Right),
                    Cell::new(format!("{:.*}", p, point.z)).set_alignment(CellAlignment::Right),
                ]));
            }
        }
        table.to_string()
    }
}

impl fmt::Display for TrajectoryDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Trajectory '{}' ({} frames × {} markers)",
            self.trajectory.name(),
            self.trajectory.n_frames(),
            self.trajectory.n_markers()
        )?;
        write!(f, "{}", self.render())?;

        let shown = self
            .max_frames
            .map_or(self.trajectory.n_frames(), |n| n.min(self.trajectory.n_frames()));
        let skipped = self.trajectory.n_frames() - shown;
        if skipped > 0 {
            write!(f, "\n… {skipped} more frames")?;
        }
        Ok(())
    }
}

/// Ergonomic entry point for [`TrajectoryDisplay`].
pub trait TrajectoryDisplayExt {
    fn show(&self) -> TrajectoryDisplay<'_>;

    fn show_string(&self) -> String {
        self.show().to_string()
    }
}

impl TrajectoryDisplayExt for Trajectory {
    fn show(&self) -> TrajectoryDisplay<'_> {
        TrajectoryDisplay::new(self)
    }
}

#[cfg(test)]
mod test_trajectory_display {
    use nalgebra::Vector3;

    use super::*;
    use crate::trajectories::PointArray;

    #[test]
    fn test_render() {
        let array = PointArray::from_fn(3, 1, |f, _| Vector3::new(f as f64, 0.5, f64::NAN));
        let traj = Trajectory::new("3d_xyz", array, vec!["nose".into()]).unwrap();

        let text = traj.show().with_precision(2).max_frames(2).to_string();
        assert!(text.starts_with("Trajectory '3d_xyz' (3 frames × 1 markers)"));
        assert!(text.contains("nose"));
        assert!(text.contains("0.50"));
        assert!(text.contains("NaN"));
        assert!(text.ends_with("… 1 more frames"));
    }
}
