#![allow(dead_code)]

use approx::assert_relative_eq;
use nalgebra::Vector3;
use skellymodels::{ModelInfo, PointArray};

/// Two aspects: a body with virtual markers, segments and a mass table, and a pattern-named face.
pub const TOY_MODEL: &str = r#"{
  "name": "toy",
  "aspects": {
    "body": {
      "tracker_name": "toy_body",
      "landmarks": { "type": "list", "names": ["left_hip", "right_hip", "neck", "head_top"] },
      "virtual_marker_definitions": {
        "hip_center": {
          "marker_names": ["left_hip", "right_hip"],
          "marker_weights": [0.5, 0.5]
        },
        "upper_center": {
          "marker_names": ["hip_center", "neck"],
          "marker_weights": [0.5, 0.5]
        }
      },
      "segment_connections": {
        "trunk": { "proximal": "hip_center", "distal": "neck" },
        "head": { "proximal": "neck", "distal": "head_top" }
      },
      "center_of_mass_definitions": {
        "trunk": { "segment_com_length": 0.5, "segment_com_percentage": 0.8 },
        "head": { "segment_com_length": 0.5, "segment_com_percentage": 0.2 }
      },
      "joint_hierarchy": { "hip_center": ["neck"], "neck": ["head_top"] }
    },
    "face": {
      "tracker_name": "toy_face",
      "landmarks": { "type": "pattern", "naming_pattern": "face_{:02}", "count": 3 }
    }
  },
  "layout": { "order": ["body", "face"] }
}"#;

/// Single aspect with the two-marker end-to-end scenario.
pub const AB_MODEL: &str = r#"{
  "name": "ab",
  "aspects": {
    "body": {
      "tracker_name": "ab_tracker",
      "landmarks": { "type": "list", "names": ["A", "B"] },
      "virtual_marker_definitions": {
        "mid": { "marker_names": ["A", "B"], "marker_weights": [0.5, 0.5] }
      },
      "segment_connections": { "AB": { "proximal": "A", "distal": "B" } },
      "center_of_mass_definitions": {
        "AB": { "segment_com_length": 0.5, "segment_com_percentage": 1.0 }
      }
    }
  },
  "layout": { "order": ["body"] }
}"#;

pub fn toy_model() -> ModelInfo {
    ModelInfo::from_json_str(TOY_MODEL).unwrap()
}

pub fn ab_model() -> ModelInfo {
    ModelInfo::from_json_str(AB_MODEL).unwrap()
}

/// Frames of the end-to-end scenario: A=(0,0,0),(1,0,0); B=(10,0,0),(1,2,0).
pub fn ab_points() -> PointArray {
    PointArray::new(
        2,
        2,
        vec![
            Vector3::new(0., 0., 0.),
            Vector3::new(10., 0., 0.),
            Vector3::new(1., 0., 0.),
            Vector3::new(1., 2., 0.),
        ],
    )
    .unwrap()
}

/// Deterministic raw array for the toy model: 4 body markers then 3 face markers.
pub fn toy_points(n_frames: usize) -> PointArray {
    PointArray::from_fn(n_frames, 7, |frame, marker| {
        let t = frame as f64 * 0.1;
        match marker {
            0 => Vector3::new(-0.1, 0.0, 1.0 + t),
            1 => Vector3::new(0.1, 0.0, 1.0 + t),
            2 => Vector3::new(0.0, 0.05 * t, 1.5 + t * 1.1),
            3 => Vector3::new(0.0, 0.0, 1.75 + t),
            m => Vector3::new(m as f64, t, 1.6),
        }
    })
}

pub fn assert_point_close(actual: &Vector3<f64>, expected: &Vector3<f64>, epsilon: f64) {
    assert_relative_eq!(actual.x, expected.x, epsilon = epsilon);
    assert_relative_eq!(actual.y, expected.y, epsilon = epsilon);
    assert_relative_eq!(actual.z, expected.z, epsilon = epsilon);
}
