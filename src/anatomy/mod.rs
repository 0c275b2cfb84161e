//! # Anatomical structure of an aspect
//!
//! An [`AnatomicalStructure`] is the validated, immutable description of one aspect: its
//! tracked landmarks, its virtual markers (in declaration order), its segments, the
//! center-of-mass table and the joint hierarchy. It is built once, from an
//! [`AspectInfo`] or through the fluent [`AnatomicalStructureBuilder`], and every
//! configuration error is reported at that point rather than during computation.
//!
//! ## Marker order
//!
//! The canonical marker order is: tracked markers as the tracker provides them, then
//! virtual markers in declaration order, which is checked to be a valid synthesis order
//! (see [`dependency`]). Trajectories built by the
//! pipeline use exactly this order.
//!
//! ## Invariants checked at construction
//!
//! * Marker names are unique across tracked and virtual markers.
//! * Every virtual marker recipe has as many weights as components, weights summing to
//!   `1 ± WEIGHT_SUM_EPS`, and components that are tracked or earlier-declared markers.
//! * Segment endpoints and joint hierarchy entries name known markers.
//! * Center-of-mass entries name declared segments, carry values in `[0, 1]`, and their
//!   mass fractions sum to `1 ± WEIGHT_SUM_EPS`.
//!
//! ## See also
//! ------------
//! * [`crate::model_info::ModelInfo`] – Structural loading of the configuration.
//! * [`crate::biomechanics`] – Algorithms consuming the structure.
pub(crate) mod dependency;

use std::fmt;

use indexmap::IndexMap;

use crate::constants::{Components, MarkerName, NameIndex, SegmentName, WEIGHT_SUM_EPS};
use crate::model_info::{
    AspectInfo, SegmentCenterOfMass, SegmentConnection, VirtualMarkerDefinition,
};
use crate::skelly_errors::SkellyError;
use dependency::check_declaration_order;

/// A virtual marker recipe with its components resolved to marker indices.
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualMarkerRecipe {
    pub name: MarkerName,
    /// `(marker index, weight)` pairs, indices into the canonical marker order.
    pub components: Components<(usize, f64)>,
}

/// A segment with its endpoints resolved to marker indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentIndices {
    pub name: SegmentName,
    pub proximal: usize,
    pub distal: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnatomicalStructure {
    marker_names: Vec<MarkerName>,
    num_tracked: usize,
    marker_index: NameIndex,
    virtual_marker_definitions: IndexMap<MarkerName, VirtualMarkerDefinition>,
    recipes: Vec<VirtualMarkerRecipe>,
    segment_connections: IndexMap<SegmentName, SegmentConnection>,
    segments: Vec<SegmentIndices>,
    center_of_mass_definitions: IndexMap<SegmentName, SegmentCenterOfMass>,
    joint_hierarchy: IndexMap<MarkerName, Vec<MarkerName>>,
}

impl AnatomicalStructure {
    /// Create a new [`AnatomicalStructureBuilder`].
    pub fn builder() -> AnatomicalStructureBuilder {
        AnatomicalStructureBuilder::new()
    }

    /// Build and validate the structure of an aspect from its configuration.
    ///
    /// Arguments
    /// -----------------
    /// * `info`: the aspect configuration loaded by [`ModelInfo`](crate::model_info::ModelInfo).
    ///
    /// Return
    /// ----------
    /// * The validated structure, or the first configuration error encountered.
    pub fn from_aspect_info(info: &AspectInfo) -> Result<Self, SkellyError> {
        AnatomicalStructureBuilder::new()
            .with_landmarks(info.tracked_point_names.clone())
            .with_virtual_markers(info.virtual_marker_definitions.clone())
            .with_segment_connections(info.segment_connections.clone())
            .with_center_of_mass(info.center_of_mass_definitions.clone())
            .with_joint_hierarchy(info.joint_hierarchy.clone())
            .build()
    }

    /// Every marker name: tracked markers, then virtual markers in declaration order.
    pub fn marker_names(&self) -> &[MarkerName] {
        &self.marker_names
    }

    pub fn tracked_point_names(&self) -> &[MarkerName] {
        &self.marker_names[..self.num_tracked]
    }

    /// Virtual marker names in declaration order.
    pub fn virtual_marker_names(&self) -> &[MarkerName] {
        &self.marker_names[self.num_tracked..]
    }

    pub fn num_tracked_points(&self) -> usize {
        self.num_tracked
    }

    pub fn num_markers(&self) -> usize {
        self.marker_names.len()
    }

    /// Index of a marker in the canonical marker order.
    pub fn marker_index(&self, name: &str) -> Option<usize> {
        self.marker_index.get(name).copied()
    }

    /// Virtual marker definitions in declaration order.
    pub fn virtual_marker_definitions(&self) -> &IndexMap<MarkerName, VirtualMarkerDefinition> {
        &self.virtual_marker_definitions
    }

    /// Virtual marker recipes in declaration order, with resolved component indices.
    pub fn virtual_marker_recipes(&self) -> &[VirtualMarkerRecipe] {
        &self.recipes
    }

    pub fn segment_connections(&self) -> &IndexMap<SegmentName, SegmentConnection> {
        &self.segment_connections
    }

    /// Segments in declared order, with resolved endpoint indices.
    pub fn segments(&self) -> &[SegmentIndices] {
        &self.segments
    }

    pub fn center_of_mass_definitions(&self) -> &IndexMap<SegmentName, SegmentCenterOfMass> {
        &self.center_of_mass_definitions
    }

    pub fn joint_hierarchy(&self) -> &IndexMap<MarkerName, Vec<MarkerName>> {
        &self.joint_hierarchy
    }

    pub fn has_virtual_markers(&self) -> bool {
        !self.recipes.is_empty()
    }

    pub fn has_segments(&self) -> bool {
        !self.segments.is_empty()
    }

    pub fn has_center_of_mass(&self) -> bool {
        !self.center_of_mass_definitions.is_empty()
    }
}

impl fmt::Display for AnatomicalStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn count_or_none(f: &mut fmt::Formatter<'_>, n: usize, what: &str) -> fmt::Result {
            if n == 0 {
                writeln!(f, "  No {what}")
            } else {
                writeln!(f, "  {n} {what}")
            }
        }

        writeln!(f, "  {} tracked points", self.num_tracked)?;
        count_or_none(f, self.recipes.len(), "virtual markers")?;
        count_or_none(f, self.segments.len(), "segment connections")?;
        count_or_none(
            f,
            self.center_of_mass_definitions.len(),
            "center of mass definitions",
        )?;
        count_or_none(f, self.joint_hierarchy.len(), "joint hierarchy entries")
    }
}

/// Builder for [`AnatomicalStructure`], with validation in [`AnatomicalStructureBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct AnatomicalStructureBuilder {
    landmark_names: Option<Vec<MarkerName>>,
    virtual_markers: IndexMap<MarkerName, VirtualMarkerDefinition>,
    segment_connections: IndexMap<SegmentName, SegmentConnection>,
    center_of_mass: IndexMap<SegmentName, SegmentCenterOfMass>,
    joint_hierarchy: IndexMap<MarkerName, Vec<MarkerName>>,
}

impl AnatomicalStructureBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_landmarks(mut self, names: Vec<MarkerName>) -> Self {
        self.landmark_names = Some(names);
        self
    }

    pub fn with_virtual_markers(
        mut self,
        definitions: IndexMap<MarkerName, VirtualMarkerDefinition>,
    ) -> Self {
        self.virtual_markers = definitions;
        self
    }

    pub fn with_segment_connections(
        mut self,
        connections: IndexMap<SegmentName, SegmentConnection>,
    ) -> Self {
        self.segment_connections = connections;
        self
    }

    pub fn with_center_of_mass(
        mut self,
        definitions: IndexMap<SegmentName, SegmentCenterOfMass>,
    ) -> Self {
        self.center_of_mass = definitions;
        self
    }

    pub fn with_joint_hierarchy(mut self, hierarchy: IndexMap<MarkerName, Vec<MarkerName>>) -> Self {
        self.joint_hierarchy = hierarchy;
        self
    }

    /// Validate the accumulated definitions and produce the [`AnatomicalStructure`].
    ///
    /// Validation rules
    /// -----------------
    /// * Landmark names must be set and unique; virtual marker names must not shadow them.
    /// * Each virtual marker has one weight per component and weights summing to one.
    /// * Virtual marker components are tracked markers or virtual markers declared
    ///   earlier; forward and cyclic references are rejected.
    /// * Segment endpoints and joint hierarchy entries are known markers.
    /// * Center-of-mass entries name declared segments, lie in `[0, 1]` and their
    ///   percentages sum to one.
    ///
    /// Returns
    /// -----------------
    /// * `Ok(AnatomicalStructure)` if every rule holds.
    /// * `Err(SkellyError)` describing the first violated rule.
    pub fn build(self) -> Result<AnatomicalStructure, SkellyError> {
        let tracked = self.landmark_names.ok_or_else(|| {
            SkellyError::InvalidConfiguration(
                "landmark names must be set before building an anatomical structure".into(),
            )
        })?;

        let mut marker_index = NameIndex::default();
        for (index, name) in tracked.iter().enumerate() {
            if marker_index.insert(name.clone(), index).is_some() {
                return Err(SkellyError::DuplicateMarker(name.clone()));
            }
        }

        for (name, definition) in &self.virtual_markers {
            if marker_index.contains_key(name) {
                return Err(SkellyError::DuplicateMarker(name.clone()));
            }
            validate_weights(name, definition)?;
        }

        let num_tracked = tracked.len();
        check_declaration_order(|name| marker_index.contains_key(name), &self.virtual_markers)?;

        let mut marker_names = tracked;
        marker_names.reserve(self.virtual_markers.len());
        for name in self.virtual_markers.keys() {
            marker_index.insert(name.clone(), marker_names.len());
            marker_names.push(name.clone());
        }

        let mut recipes = Vec::with_capacity(self.virtual_markers.len());
        for (name, definition) in &self.virtual_markers {
            let components = definition
                .marker_names
                .iter()
                .zip(&definition.marker_weights)
                .map(|(component, &weight)| {
                    lookup(&marker_index, component, || format!("virtual marker '{name}'"))
                        .map(|index| (index, weight))
                })
                .collect::<Result<Components<_>, _>>()?;
            recipes.push(VirtualMarkerRecipe {
                name: name.clone(),
                components,
            });
        }

        let segments = self
            .segment_connections
            .iter()
            .map(|(name, connection)| {
                let context = || format!("segment '{name}'");
                Ok(SegmentIndices {
                    name: name.clone(),
                    proximal: lookup(&marker_index, &connection.proximal, context)?,
                    distal: lookup(&marker_index, &connection.distal, context)?,
                })
            })
            .collect::<Result<Vec<_>, SkellyError>>()?;

        validate_center_of_mass(&self.center_of_mass, &self.segment_connections)?;

        for (parent, children) in &self.joint_hierarchy {
            for marker in std::iter::once(parent).chain(children) {
                lookup(&marker_index, marker, || "joint hierarchy".to_string())?;
            }
        }

        Ok(AnatomicalStructure {
            marker_names,
            num_tracked,
            marker_index,
            virtual_marker_definitions: self.virtual_markers,
            recipes,
            segment_connections: self.segment_connections,
            segments,
            center_of_mass_definitions: self.center_of_mass,
            joint_hierarchy: self.joint_hierarchy,
        })
    }
}

fn lookup<F>(index: &NameIndex, marker: &str, context: F) -> Result<usize, SkellyError>
where
    F: FnOnce() -> String,
{
    index
        .get(marker)
        .copied()
        .ok_or_else(|| SkellyError::UnresolvedMarker {
            context: context(),
            marker: marker.to_string(),
        })
}

/// `true` when `value` is within tolerance of one; NaN is never within tolerance.
fn sums_to_one(value: f64) -> bool {
    (value - 1.0).abs() <= WEIGHT_SUM_EPS
}

fn validate_weights(name: &str, definition: &VirtualMarkerDefinition) -> Result<(), SkellyError> {
    if definition.marker_names.len() != definition.marker_weights.len() {
        return Err(SkellyError::WeightCountMismatch {
            marker: name.to_string(),
            names: definition.marker_names.len(),
            weights: definition.marker_weights.len(),
        });
    }

    let sum: f64 = definition.marker_weights.iter().sum();
    if !sums_to_one(sum) {
        return Err(SkellyError::InvalidWeightSum {
            marker: name.to_string(),
            sum,
        });
    }
    Ok(())
}

fn validate_center_of_mass(
    definitions: &IndexMap<SegmentName, SegmentCenterOfMass>,
    segments: &IndexMap<SegmentName, SegmentConnection>,
) -> Result<(), SkellyError> {
    if definitions.is_empty() {
        return Ok(());
    }
    if segments.is_empty() {
        return Err(SkellyError::MissingSegmentConnections);
    }

    for (segment, com) in definitions {
        if !segments.contains_key(segment) {
            return Err(SkellyError::UnknownSegment(segment.clone()));
        }
        for (field, value) in [
            ("segment_com_length", com.segment_com_length),
            ("segment_com_percentage", com.segment_com_percentage),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SkellyError::CenterOfMassOutOfRange {
                    segment: segment.clone(),
                    field,
                    value,
                });
            }
        }
    }

    let total: f64 = definitions
        .values()
        .map(|com| com.segment_com_percentage)
        .sum();
    if !sums_to_one(total) {
        return Err(SkellyError::InvalidMassFractionSum(total));
    }
    Ok(())
}
