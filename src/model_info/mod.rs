//! # Tracker model configuration
//!
//! A [`ModelInfo`] describes everything the crate needs to know about one tracker's
//! output: which aspects it produces (body, face, hands, ...), the landmark names of each
//! aspect, how virtual markers are derived, how markers connect into segments, the mass
//! distribution over those segments, and the order in which aspects are concatenated in
//! the tracker's raw arrays.
//!
//! ## Document layout
//!
//! ```json
//! {
//!   "name": "mediapipe",
//!   "aspects": {
//!     "body": {
//!       "tracker_name": "mediapipe_body",
//!       "landmarks": { "type": "list", "names": ["nose", "left_hip", "right_hip"] },
//!       "virtual_marker_definitions": {
//!         "hips_center": { "marker_names": ["left_hip", "right_hip"], "marker_weights": [0.5, 0.5] }
//!       },
//!       "segment_connections": { "spine": { "proximal": "hips_center", "distal": "nose" } },
//!       "center_of_mass_definitions": {
//!         "spine": { "segment_com_length": 0.5, "segment_com_percentage": 1.0 }
//!       },
//!       "joint_hierarchy": { "hips_center": ["nose"] }
//!     },
//!     "face": {
//!       "tracker_name": "mediapipe_face",
//!       "landmarks": { "type": "pattern", "naming_pattern": "face_{:04}", "count": 478 }
//!     }
//!   },
//!   "layout": { "order": ["body", "face"] }
//! }
//! ```
//!
//! Map order is significant: virtual markers, segments and center-of-mass entries keep
//! the order in which the document declares them.
//!
//! ## Validation
//!
//! Loading is **structural only**: missing or malformed keys, ambiguous landmark
//! specifications and inconsistent layouts are rejected here. Cross-references and
//! numeric invariants (weight sums, mass fractions, dependency cycles) are checked when an
//! [`AnatomicalStructure`](crate::anatomy::AnatomicalStructure) is built from an
//! [`AspectInfo`], where the full marker set is known.
//!
//! ## See also
//! ------------
//! * [`expand_naming_pattern`] – Expansion of generated landmark names.
//! * [`crate::anatomy::AnatomicalStructure::from_aspect_info`] – Semantic validation.
pub mod naming_pattern;

use std::ops::Range;

use camino::Utf8Path;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::constants::{AspectName, MarkerName, SegmentName};
use crate::skelly_errors::SkellyError;
pub use naming_pattern::expand_naming_pattern;

/// Recipe of a virtual marker: a weighted sum of other markers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualMarkerDefinition {
    pub marker_names: Vec<MarkerName>,
    pub marker_weights: Vec<f64>,
}

/// A segment (bone) between a proximal and a distal marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentConnection {
    pub proximal: MarkerName,
    pub distal: MarkerName,
}

/// Anthropometric data of a segment.
///
/// * `segment_com_length`: position of the segment center of mass as a fraction of the
///   proximal → distal distance.
/// * `segment_com_percentage`: fraction of the aspect's total mass carried by the segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentCenterOfMass {
    pub segment_com_length: f64,
    pub segment_com_percentage: f64,
}

/// How the tracked landmarks of an aspect are named.
///
/// This is resolved into a concrete name list while loading; nothing downstream of
/// [`ModelInfo`] sees the distinction.
#[derive(Debug, Clone, PartialEq)]
pub enum LandmarkSpec {
    /// Explicit, ordered list of names.
    List(Vec<MarkerName>),
    /// `count` names generated from a pattern, see [`expand_naming_pattern`].
    Pattern { naming_pattern: String, count: usize },
}

impl LandmarkSpec {
    fn from_raw(aspect: &str, raw: RawLandmarkSpec) -> Result<Self, SkellyError> {
        let invalid = |reason: &str| SkellyError::InvalidLandmarks {
            aspect: aspect.to_string(),
            reason: reason.to_string(),
        };

        let kind = match (raw.kind.as_deref(), &raw.names, &raw.naming_pattern) {
            (_, Some(_), Some(_)) => {
                return Err(invalid(
                    "both an explicit name list and a naming pattern are given",
                ))
            }
            (_, None, None) => {
                return Err(invalid(
                    "neither an explicit name list nor a naming pattern is given",
                ))
            }
            (Some(kind), _, _) => kind,
            (None, Some(_), None) => "list",
            (None, None, Some(_)) => "pattern",
        };

        match (kind, raw.names, raw.naming_pattern) {
            ("list", Some(names), None) => {
                if raw.count.is_some_and(|count| count != names.len()) {
                    return Err(invalid("'count' does not match the number of names"));
                }
                Ok(LandmarkSpec::List(names))
            }
            ("pattern", None, Some(naming_pattern)) => {
                let count = raw
                    .count
                    .ok_or_else(|| invalid("a naming pattern requires a 'count'"))?;
                Ok(LandmarkSpec::Pattern {
                    naming_pattern,
                    count,
                })
            }
            ("list", None, Some(_)) => Err(invalid("type 'list' requires 'names'")),
            ("pattern", Some(_), None) => Err(invalid("type 'pattern' requires 'naming_pattern'")),
            (other, _, _) => Err(invalid(&format!(
                "unknown landmark type '{other}', expected 'list' or 'pattern'"
            ))),
        }
    }

    /// Resolve into the ordered landmark names.
    pub fn resolve(&self) -> Result<Vec<MarkerName>, SkellyError> {
        match self {
            LandmarkSpec::List(names) => Ok(names.clone()),
            LandmarkSpec::Pattern {
                naming_pattern,
                count,
            } => expand_naming_pattern(naming_pattern, *count),
        }
    }
}

/// Configuration of a single aspect, with its landmark names already resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct AspectInfo {
    pub tracker_name: String,
    pub tracked_point_names: Vec<MarkerName>,
    pub virtual_marker_definitions: IndexMap<MarkerName, VirtualMarkerDefinition>,
    pub segment_connections: IndexMap<SegmentName, SegmentConnection>,
    pub center_of_mass_definitions: IndexMap<SegmentName, SegmentCenterOfMass>,
    pub joint_hierarchy: IndexMap<MarkerName, Vec<MarkerName>>,
}

impl AspectInfo {
    /// Number of markers the tracker provides for this aspect.
    pub fn num_tracked_points(&self) -> usize {
        self.tracked_point_names.len()
    }
}

/// The full configuration of a tracker model.
///
/// Aspects are kept in document order; [`ModelInfo::aspect_order`] gives the layout
/// order used to split concatenated raw arrays.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInfo {
    pub name: String,
    aspects: IndexMap<AspectName, AspectInfo>,
    order: Vec<AspectName>,
}

#[derive(Deserialize)]
struct RawLandmarkSpec {
    #[serde(rename = "type")]
    kind: Option<String>,
    names: Option<Vec<MarkerName>>,
    naming_pattern: Option<String>,
    count: Option<usize>,
}

#[derive(Deserialize)]
struct RawAspectInfo {
    tracker_name: String,
    landmarks: RawLandmarkSpec,
    virtual_marker_definitions: Option<IndexMap<MarkerName, VirtualMarkerDefinition>>,
    segment_connections: Option<IndexMap<SegmentName, SegmentConnection>>,
    center_of_mass_definitions: Option<IndexMap<SegmentName, SegmentCenterOfMass>>,
    joint_hierarchy: Option<IndexMap<MarkerName, Vec<MarkerName>>>,
}

#[derive(Deserialize)]
struct RawLayout {
    order: Vec<AspectName>,
}

#[derive(Deserialize)]
struct RawModelInfo {
    name: String,
    aspects: IndexMap<AspectName, RawAspectInfo>,
    layout: RawLayout,
}

impl ModelInfo {
    /// Load a model from a JSON document held in memory.
    ///
    /// Arguments
    /// -----------------
    /// * `document`: the JSON text of the configuration.
    ///
    /// Return
    /// ----------
    /// * The loaded [`ModelInfo`].
    ///
    /// Errors
    /// ----------
    /// * [`SkellyError::JsonError`] if the text is not valid JSON.
    /// * Any error of [`ModelInfo::from_value`].
    pub fn from_json_str(document: &str) -> Result<Self, SkellyError> {
        let value: Value = serde_json::from_str(document)?;
        Self::from_value(value)
    }

    /// Load a model from a JSON file.
    pub fn from_path(path: &Utf8Path) -> Result<Self, SkellyError> {
        let document = std::fs::read_to_string(path)?;
        Self::from_json_str(&document)
    }

    /// Load a model from an already parsed JSON value.
    ///
    /// Errors
    /// ----------
    /// * [`SkellyError::InvalidConfiguration`] when a required key is missing or has the
    ///   wrong type.
    /// * [`SkellyError::InvalidLandmarks`] when a landmark specification is ambiguous,
    ///   empty or incomplete.
    /// * [`SkellyError::InvalidNamingPattern`] when a pattern has no index placeholder.
    /// * [`SkellyError::UnknownLayoutAspect`] / [`SkellyError::DuplicateLayoutAspect`]
    ///   when the layout order is inconsistent with the declared aspects.
    pub fn from_value(value: Value) -> Result<Self, SkellyError> {
        let raw: RawModelInfo = serde_json::from_value(value)
            .map_err(|e| SkellyError::InvalidConfiguration(e.to_string()))?;

        let mut aspects = IndexMap::with_capacity(raw.aspects.len());
        for (aspect_name, raw_aspect) in raw.aspects {
            let landmarks = LandmarkSpec::from_raw(&aspect_name, raw_aspect.landmarks)?;
            let info = AspectInfo {
                tracker_name: raw_aspect.tracker_name,
                tracked_point_names: landmarks.resolve()?,
                virtual_marker_definitions: raw_aspect.virtual_marker_definitions.unwrap_or_default(),
                segment_connections: raw_aspect.segment_connections.unwrap_or_default(),
                center_of_mass_definitions: raw_aspect.center_of_mass_definitions.unwrap_or_default(),
                joint_hierarchy: raw_aspect.joint_hierarchy.unwrap_or_default(),
            };
            aspects.insert(aspect_name, info);
        }

        Self::new(raw.name, aspects, raw.layout.order)
    }

    /// Assemble a model from already resolved aspects.
    ///
    /// Arguments
    /// -----------------
    /// * `name`: name of the model, used as tracker name for exports.
    /// * `aspects`: the aspect configurations.
    /// * `order`: layout order of the aspects in concatenated raw arrays.
    pub fn new(
        name: String,
        aspects: IndexMap<AspectName, AspectInfo>,
        order: Vec<AspectName>,
    ) -> Result<Self, SkellyError> {
        let mut seen = IndexSet::with_capacity(order.len());
        for aspect_name in &order {
            if !aspects.contains_key(aspect_name) {
                return Err(SkellyError::UnknownLayoutAspect(aspect_name.clone()));
            }
            if !seen.insert(aspect_name) {
                return Err(SkellyError::DuplicateLayoutAspect(aspect_name.clone()));
            }
        }

        for unused in aspects.keys().filter(|name| !seen.contains(name)) {
            warn!(model = %name, aspect = %unused, "Aspect is not part of the layout order and will be ignored");
        }

        Ok(ModelInfo {
            name,
            aspects,
            order,
        })
    }

    /// Aspect names in layout order.
    pub fn aspect_order(&self) -> &[AspectName] {
        &self.order
    }

    /// Every declared aspect, in document order (including aspects absent from the layout).
    pub fn aspects(&self) -> &IndexMap<AspectName, AspectInfo> {
        &self.aspects
    }

    pub fn aspect(&self, name: &str) -> Result<&AspectInfo, SkellyError> {
        self.aspects
            .get(name)
            .ok_or_else(|| SkellyError::UnknownAspect(name.to_string()))
    }

    /// Total width of the tracker's raw array: the tracked markers of every layout aspect.
    pub fn num_tracked_points(&self) -> usize {
        self.order
            .iter()
            .filter_map(|name| self.aspects.get(name))
            .map(AspectInfo::num_tracked_points)
            .sum()
    }

    /// Names of every tracked marker, concatenated in layout order.
    pub fn tracked_point_names(&self) -> Vec<MarkerName> {
        self.order
            .iter()
            .filter_map(|name| self.aspects.get(name))
            .flat_map(|aspect| aspect.tracked_point_names.iter().cloned())
            .collect()
    }

    /// Marker range covered by each aspect in a concatenated raw array.
    ///
    /// Ranges are contiguous, start at zero and follow the layout order.
    pub fn tracked_point_slices(&self) -> IndexMap<AspectName, Range<usize>> {
        let mut start = 0;
        self.order
            .iter()
            .filter_map(|name| self.aspects.get(name).map(|aspect| (name, aspect)))
            .map(|(name, aspect)| {
                let end = start + aspect.num_tracked_points();
                let range = start..end;
                start = end;
                (name.clone(), range)
            })
            .collect()
    }
}

#[cfg(test)]
mod test_model_info {
    use super::*;
    use serde_json::json;

    fn document() -> Value {
        json!({
            "name": "mediapipe",
            "aspects": {
                "body": {
                    "tracker_name": "mediapipe_body",
                    "landmarks": {"type": "list", "names": ["nose", "left_hip", "right_hip"]},
                    "virtual_marker_definitions": {
                        "hips_center": {"marker_names": ["left_hip", "right_hip"], "marker_weights": [0.5, 0.5]}
                    },
                    "segment_connections": {"spine": {"proximal": "hips_center", "distal": "nose"}},
                    "center_of_mass_definitions": {
                        "spine": {"segment_com_length": 0.5, "segment_com_percentage": 1.0}
                    }
                },
                "face": {
                    "tracker_name": "mediapipe_face",
                    "landmarks": {"type": "pattern", "naming_pattern": "face_{}", "count": 4}
                }
            },
            "layout": {"order": ["face", "body"]}
        })
    }

    #[test]
    fn test_load_model() {
        let model = ModelInfo::from_value(document()).unwrap();
        assert_eq!(model.name, "mediapipe");
        assert_eq!(model.aspect_order(), &["face".to_string(), "body".to_string()]);
        assert_eq!(model.num_tracked_points(), 7);

        let face = model.aspect("face").unwrap();
        assert_eq!(
            face.tracked_point_names,
            vec!["face_0", "face_1", "face_2", "face_3"]
        );
        assert!(face.virtual_marker_definitions.is_empty());

        let body = model.aspect("body").unwrap();
        assert_eq!(body.tracker_name, "mediapipe_body");
        assert_eq!(body.segment_connections["spine"].proximal, "hips_center");
        assert_eq!(
            body.center_of_mass_definitions["spine"].segment_com_percentage,
            1.0
        );
    }

    #[test]
    fn test_tracked_point_slices() {
        let model = ModelInfo::from_value(document()).unwrap();
        let slices = model.tracked_point_slices();
        assert_eq!(slices["face"], 0..4);
        assert_eq!(slices["body"], 4..7);
        assert_eq!(model.tracked_point_names()[4], "nose");
    }

    #[test]
    fn test_both_landmark_kinds() {
        let mut doc = document();
        doc["aspects"]["body"]["landmarks"]["naming_pattern"] = json!("b_{}");
        assert!(matches!(
            ModelInfo::from_value(doc),
            Err(SkellyError::InvalidLandmarks { aspect, .. }) if aspect == "body"
        ));
    }

    #[test]
    fn test_no_landmark_kind() {
        let mut doc = document();
        doc["aspects"]["face"]["landmarks"] = json!({"type": "pattern", "count": 3});
        assert!(matches!(
            ModelInfo::from_value(doc),
            Err(SkellyError::InvalidLandmarks { aspect, .. }) if aspect == "face"
        ));
    }

    #[test]
    fn test_pattern_without_count() {
        let mut doc = document();
        doc["aspects"]["face"]["landmarks"] = json!({"type": "pattern", "naming_pattern": "f_{}"});
        assert!(matches!(
            ModelInfo::from_value(doc),
            Err(SkellyError::InvalidLandmarks { .. })
        ));
    }

    #[test]
    fn test_missing_required_key() {
        let mut doc = document();
        doc["aspects"]["body"]
            .as_object_mut()
            .unwrap()
            .remove("tracker_name");
        assert!(matches!(
            ModelInfo::from_value(doc),
            Err(SkellyError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_layout_errors() {
        let mut doc = document();
        doc["layout"]["order"] = json!(["body", "left_hand"]);
        assert_eq!(
            ModelInfo::from_value(doc),
            Err(SkellyError::UnknownLayoutAspect("left_hand".into()))
        );

        let mut doc = document();
        doc["layout"]["order"] = json!(["body", "body"]);
        assert_eq!(
            ModelInfo::from_value(doc),
            Err(SkellyError::DuplicateLayoutAspect("body".into()))
        );
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            ModelInfo::from_json_str("{ not json"),
            Err(SkellyError::JsonError(_))
        ));
    }

    #[test]
    fn test_declaration_order_is_preserved() {
        let doc = json!({
            "name": "m",
            "aspects": {
                "body": {
                    "tracker_name": "t",
                    "landmarks": {"names": ["a", "b"]},
                    "virtual_marker_definitions": {
                        "z": {"marker_names": ["a"], "marker_weights": [1.0]},
                        "y": {"marker_names": ["b"], "marker_weights": [1.0]},
                        "x": {"marker_names": ["a", "b"], "marker_weights": [0.5, 0.5]}
                    }
                }
            },
            "layout": {"order": ["body"]}
        });
        let model = ModelInfo::from_value(doc).unwrap();
        let keys: Vec<_> = model.aspect("body").unwrap().virtual_marker_definitions.keys().cloned().collect();
        assert_eq!(keys, vec!["z", "y", "x"]);
    }
}
