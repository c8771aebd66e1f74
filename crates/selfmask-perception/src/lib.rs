//! `selfmask-perception` – geometry and reference frames.
//!
//! Everything the self filter needs to reason about where the robot's body
//! is in space.
//!
//! # Modules
//!
//! - [`bodies`] – the [`Body`][bodies::Body] capability trait with sphere,
//!   box, cylinder and convex-mesh implementations, plus
//!   [`BoundingSphere`][bodies::BoundingSphere] and
//!   [`merge_bounding_spheres`][bodies::merge_bounding_spheres].
//! - [`shape_factory`] – [`ShapeFactory`][shape_factory::ShapeFactory]:
//!   builds the scaled/unscaled body pair for a link from its
//!   [`ShapeDescriptor`][selfmask_types::ShapeDescriptor].
//! - [`mesh`] – [`MeshLoader`][mesh::MeshLoader] and its OBJ-file and
//!   in-memory implementations.
//! - [`transform`] – [`TransformProvider`][transform::TransformProvider], the
//!   collaborator that resolves frame transforms, and
//!   [`TfBuffer`][transform::TfBuffer], a static frame tree implementing
//!   it.

pub mod bodies;
pub mod mesh;
pub mod shape_factory;
pub mod transform;

pub use bodies::{Body, BodyKind, BoundingSphere, merge_bounding_spheres};
pub use mesh::{MeshLibrary, MeshLoader, ObjMeshLoader, TriMesh};
pub use shape_factory::{BuiltShape, ShapeFactory};
pub use transform::{TfBuffer, TransformError, TransformProvider};
