//! Scene relation core: scores whether placed 3D objects satisfy symbolic spatial relations.
//!
//! This crate defines:
//! - [`OrientedBox`]: the posed bounding volume of an object, with its semantic face frame.
//! - [`Sampler`]: deterministic quasi-random point sets on box volumes, faces and surfaces.
//! - [`predicates`]: containment, face projection, surface gaps, facing and score shapes.
//! - [`object_relations`] / [`arch_relations`]: one scorer per relation type, against
//!   another object or against the room architecture.
//! - [`Evaluator`]: turns a [`RelationDescriptor`] into per-type [`ScoreResult`]s and an
//!   overall verdict, one descriptor at a time or as a parallel batch.
//!
//! Everything is a pure function of (geometry, descriptor, configuration): the same inputs
//! and seed always produce bit-identical results.

pub mod arch;
pub mod arch_relations;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod geometry;
pub mod object_relations;
pub mod predicates;
pub mod resolver;
pub mod sampler;
pub mod scene;

pub use arch::{Architecture, Ceiling, Floor, Opening, OpeningKind, Room, Wall};
pub use config::RelationConfig;
pub use descriptor::{
    AnchorRef, Evaluation, RelationDescriptor, RelationSide, RelationType, ScoreResult, TargetRef,
};
pub use error::{RelationError, RelationResult};
pub use geometry::{FaceFrame, LocalAxis, OrientedBox, Side};
pub use resolver::{evaluate, Evaluator};
pub use sampler::{PointCloudCache, Sampler};
pub use scene::{SceneGeometry, SceneObject};
