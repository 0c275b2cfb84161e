//! # Biomechanics
//!
//! Stateless algorithms turning marker trajectories into derived quantities, using the
//! [`AnatomicalStructure`](crate::anatomy::AnatomicalStructure) of an aspect:
//!
//! * [`virtual_markers`] – weighted combinations of tracked markers.
//! * [`center_of_mass`] – per-segment and whole-body centers of mass.
//! * [`rigid_bones`] – constant segment lengths from per-segment medians.
//! * [`calculation`] – the same algorithms as pipeline steps operating on an
//!   [`Aspect`](crate::aspect::Aspect).
//!
//! All algorithms are deterministic and never modify their inputs. Degenerate numerics
//! (NaN inputs, zero-length segments) produce NaN outputs rather than errors.
pub mod calculation;
pub mod center_of_mass;
pub mod rigid_bones;
pub mod virtual_markers;

pub use calculation::{
    AnatomicalCalculation, CalculationPipeline, CalculationResult, CenterOfMassCalculation,
    RigidBonesEnforcement,
};
pub use center_of_mass::{calculate_center_of_mass, CenterOfMass};
pub use rigid_bones::{bone_length_statistics, enforce_rigid_bones, BoneLengthStatistics};
pub use virtual_markers::synthesize_virtual_markers;
