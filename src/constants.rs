//! # Constants and type definitions for skellymodels
//!
//! This module centralizes the **numerical tolerances**, the **well-known trajectory names**
//! and the **common type aliases** used throughout the crate.
//!
//! ## Overview
//!
//! - Tolerances used when validating an anatomical configuration
//! - Names under which an [`Aspect`](crate::aspect::Aspect) stores its trajectories
//! - Core type aliases (marker, segment and aspect identifiers)
//! - Hash map flavour used for name lookups

use ahash::RandomState;
use smallvec::SmallVec;
use std::collections::HashMap;

// -------------------------------------------------------------------------------------------------
// Tolerances
// -------------------------------------------------------------------------------------------------

/// Tolerance on the sum of virtual marker weights and of segment mass fractions.
pub const WEIGHT_SUM_EPS: f64 = 1e-3;

// -------------------------------------------------------------------------------------------------
// Trajectory names
// -------------------------------------------------------------------------------------------------

/// Tracked points plus virtual markers, as ingested from the tracker.
pub const XYZ: &str = "3d_xyz";

/// Output of the rigid-bone enforcement.
pub const RIGID_XYZ: &str = "rigid_3d_xyz";

/// One center of mass point per segment.
pub const SEGMENT_COM: &str = "segment_com";

/// Whole-body center of mass, a single marker.
pub const TOTAL_BODY_COM: &str = "total_body_com";

/// Metadata key recording which tracker produced an aspect.
pub const TRACKER_TYPE_KEY: &str = "tracker_type";

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Name of a tracked or virtual marker
pub type MarkerName = String;
/// Name of a segment (bone)
pub type SegmentName = String;
/// Name of an aspect (body, face, left_hand, ...)
pub type AspectName = String;
/// Zero-based frame index
pub type FrameIndex = usize;

/// Name → column index lookup, hashed with `ahash`.
pub type NameIndex = HashMap<MarkerName, usize, RandomState>;

/// Component list of a virtual marker; recipes rarely reference more than four markers.
pub type Components<T> = SmallVec<[T; 4]>;
