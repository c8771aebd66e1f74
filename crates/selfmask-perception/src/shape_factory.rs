//! Shape Factory.
//!
//! Turns a [`ShapeDescriptor`] plus inflation settings into the pair of
//! bodies the self filter keeps per link:
//!
//! - the **scaled** body, inflated by `scale` and `padding`, used for the
//!   conservative containment and shadow tests;
//! - the **unscaled** body at unit scale and zero padding, used to recognise
//!   points on the true link surface.
//!
//! Construction is side-effect free; any failure is returned to the caller,
//! which skips that one link.

use std::sync::Arc;

use selfmask_types::{MaskError, ShapeDescriptor};

use crate::bodies::{Body, BoxBody, ConvexMeshBody, CylinderBody, SphereBody};
use crate::mesh::{MeshLibrary, MeshLoader};

/// The product of [`ShapeFactory::build`].
#[derive(Debug)]
pub struct BuiltShape {
    pub scaled: Box<dyn Body>,
    pub unscaled: Box<dyn Body>,
    /// Volume of the scaled body.
    pub volume: f64,
}

/// Builds collision bodies from shape descriptors.
#[derive(Clone)]
pub struct ShapeFactory {
    meshes: Arc<dyn MeshLoader>,
}

impl std::fmt::Debug for ShapeFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShapeFactory").finish_non_exhaustive()
    }
}

impl Default for ShapeFactory {
    /// A factory without mesh resources: every mesh descriptor fails.
    fn default() -> Self {
        Self::new(Arc::new(MeshLibrary::new()))
    }
}

impl ShapeFactory {
    pub fn new(meshes: Arc<dyn MeshLoader>) -> Self {
        Self { meshes }
    }

    /// Build the scaled/unscaled body pair for `descriptor`.
    ///
    /// # Errors
    ///
    /// - [`MaskError::InvalidShape`] for non-positive or non-finite
    ///   dimensions, `scale < 1`, or `padding < 0` (either would let the
    ///   unscaled body escape the scaled one).
    /// - [`MaskError::MeshResource`] when a mesh cannot be loaded.
    pub fn build(
        &self,
        descriptor: &ShapeDescriptor,
        scale: f64,
        padding: f64,
    ) -> Result<BuiltShape, MaskError> {
        if !(scale.is_finite() && scale >= 1.0) {
            return Err(MaskError::InvalidShape(format!(
                "scale must be a finite value >= 1, got {scale}"
            )));
        }
        if !(padding.is_finite() && padding >= 0.0) {
            return Err(MaskError::InvalidShape(format!(
                "padding must be a finite value >= 0, got {padding}"
            )));
        }

        let mut scaled = self.create_body(descriptor)?;
        scaled.set_scale(scale);
        scaled.set_padding(padding);
        let volume = scaled.compute_volume();
        let unscaled = self.create_body(descriptor)?;

        Ok(BuiltShape {
            scaled,
            unscaled,
            volume,
        })
    }

    fn create_body(&self, descriptor: &ShapeDescriptor) -> Result<Box<dyn Body>, MaskError> {
        let body: Box<dyn Body> = match descriptor {
            ShapeDescriptor::Sphere { radius } => {
                positive("sphere radius", *radius)?;
                Box::new(SphereBody::new(*radius))
            }
            ShapeDescriptor::Box { dims } => {
                positive("box x", dims.x)?;
                positive("box y", dims.y)?;
                positive("box z", dims.z)?;
                Box::new(BoxBody::new(*dims))
            }
            ShapeDescriptor::Cylinder { radius, length } => {
                positive("cylinder radius", *radius)?;
                positive("cylinder length", *length)?;
                Box::new(CylinderBody::new(*radius, *length))
            }
            ShapeDescriptor::Mesh { resource, scale } => {
                if resource.is_empty() {
                    return Err(MaskError::MeshResource {
                        resource: String::new(),
                        details: "empty mesh filename".to_string(),
                    });
                }
                if !scale.is_finite() || scale.x <= 0.0 || scale.y <= 0.0 || scale.z <= 0.0 {
                    return Err(MaskError::InvalidShape(format!(
                        "mesh scale must be positive, got {scale:?}"
                    )));
                }
                let mesh = self.meshes.load(resource, *scale)?;
                Box::new(ConvexMeshBody::new(mesh.vertices)?)
            }
        };
        Ok(body)
    }
}

fn positive(what: &str, v: f64) -> Result<(), MaskError> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(MaskError::InvalidShape(format!("{what} must be positive, got {v}")))
    }
}
