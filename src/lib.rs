//! # skellymodels
//!
//! Anatomical data model and biomechanics pipeline for motion-capture subjects.
//!
//! A tracker model ([`ModelInfo`]) describes the aspects of a body (body, face, hands)
//! and how their markers relate. A [`Subject`] built from it ingests the tracker's raw
//! 3D points, splits them per [`Aspect`], synthesizes virtual markers and derives
//! centers of mass and rigid-bone trajectories. Results are addressable by aspect,
//! trajectory, marker and frame, and can be exported as CSV.
//!
//! Modules
//! -----------------
//! * [`model_info`] – Loading of the JSON tracker configuration.
//! * [`anatomy`] – Validated per-aspect anatomical structure.
//! * [`trajectories`] – Point arrays, trajectories, error series and their tables.
//! * [`biomechanics`] – Virtual markers, center of mass, rigid bones, calculation pipeline.
//! * [`aspect`] / [`subject`] – Orchestration of the data and calculations.
//! * [`export`] – CSV writers and readers.
//!
//! Logging uses [`tracing`]; the library never installs a subscriber.
pub mod anatomy;
pub mod aspect;
pub mod biomechanics;
pub mod constants;
pub mod export;
pub mod model_info;
pub mod skelly_errors;
pub mod subject;
pub mod trajectories;

pub use anatomy::AnatomicalStructure;
pub use aspect::Aspect;
pub use export::ExportContext;
pub use model_info::ModelInfo;
pub use skelly_errors::SkellyError;
pub use subject::Subject;
pub use trajectories::{PointArray, Trajectory};
