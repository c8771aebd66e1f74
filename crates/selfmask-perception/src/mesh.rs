//! Mesh resources.
//!
//! [`MeshLoader`] turns the resource string of a
//! [`ShapeDescriptor::Mesh`][selfmask_types::ShapeDescriptor::Mesh] into a
//! [`TriMesh`].  Two loaders ship with the crate:
//!
//! - [`ObjMeshLoader`] reads Wavefront OBJ files from disk.  `file://` URIs
//!   are taken as absolute paths, `package://<pkg>/<path>` resolves to
//!   `<root>/<pkg>/<path>`, and anything else is joined onto `<root>`.
//! - [`MeshLibrary`] serves meshes registered in memory, which is what tests
//!   and simulators use.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use selfmask_types::{MaskError, Vec3};
use tracing::debug;

/// A triangle soup in the link's collision frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriMesh {
    pub vertices: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
}

impl TriMesh {
    /// Multiply every vertex component-wise by `scale`.
    pub fn scaled(mut self, scale: Vec3) -> Self {
        for v in &mut self.vertices {
            *v = v.mul_elem(scale);
        }
        self
    }
}

/// Resolves mesh resources to triangle meshes.
pub trait MeshLoader: Send + Sync {
    /// Load `resource` and apply the per-axis `scale` to its vertices.
    ///
    /// # Errors
    ///
    /// Returns [`MaskError::MeshResource`] when the resource cannot be found
    /// or parsed, or contains no vertices.
    fn load(&self, resource: &str, scale: Vec3) -> Result<TriMesh, MaskError>;
}

// ────────────────────────────────────────────────────────────────────────────
// ObjMeshLoader
// ────────────────────────────────────────────────────────────────────────────

/// Loads Wavefront OBJ meshes from the filesystem via `tobj`.
#[derive(Debug, Clone)]
pub struct ObjMeshLoader {
    root: PathBuf,
}

impl ObjMeshLoader {
    /// Create a loader resolving relative and `package://` resources under
    /// `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map a resource string onto a filesystem path.
    pub fn resolve(&self, resource: &str) -> PathBuf {
        if let Some(path) = resource.strip_prefix("file://") {
            PathBuf::from(path)
        } else if let Some(rest) = resource.strip_prefix("package://") {
            self.root.join(rest)
        } else {
            let path = Path::new(resource);
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                self.root.join(path)
            }
        }
    }
}

impl MeshLoader for ObjMeshLoader {
    fn load(&self, resource: &str, scale: Vec3) -> Result<TriMesh, MaskError> {
        let path = self.resolve(resource);
        let fail = |details: String| MaskError::MeshResource {
            resource: resource.to_string(),
            details,
        };
        if !path.exists() {
            return Err(fail(format!("{} does not exist", path.display())));
        }

        let options = tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        };
        let (models, _materials) =
            tobj::load_obj(&path, &options).map_err(|e| fail(e.to_string()))?;

        let mut mesh = TriMesh::default();
        for model in &models {
            let base = mesh.vertices.len() as u32;
            mesh.vertices.extend(model.mesh.positions.chunks_exact(3).map(|c| {
                Vec3::new(f64::from(c[0]), f64::from(c[1]), f64::from(c[2]))
            }));
            mesh.triangles.extend(
                model
                    .mesh
                    .indices
                    .chunks_exact(3)
                    .map(|t| [base + t[0], base + t[1], base + t[2]]),
            );
        }
        if mesh.vertices.is_empty() {
            return Err(fail("mesh contains no vertices".to_string()));
        }
        debug!(
            resource,
            path = %path.display(),
            vertices = mesh.vertices.len(),
            triangles = mesh.triangles.len(),
            "loaded mesh"
        );
        Ok(mesh.scaled(scale))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// MeshLibrary
// ────────────────────────────────────────────────────────────────────────────

/// In-memory mesh registry keyed by resource string.
#[derive(Debug, Clone, Default)]
pub struct MeshLibrary {
    meshes: HashMap<String, TriMesh>,
}

impl MeshLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the mesh served for `resource`.
    pub fn insert(&mut self, resource: impl Into<String>, mesh: TriMesh) {
        self.meshes.insert(resource.into(), mesh);
    }
}

impl MeshLoader for MeshLibrary {
    fn load(&self, resource: &str, scale: Vec3) -> Result<TriMesh, MaskError> {
        self.meshes
            .get(resource)
            .filter(|m| !m.vertices.is_empty())
            .cloned()
            .map(|m| m.scaled(scale))
            .ok_or_else(|| MaskError::MeshResource {
                resource: resource.to_string(),
                details: "not registered".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TETRA_OBJ: &str = "\
v 0 0 0
v 1 0 0
v 0 1 0
v 0 0 1
f 1 3 2
f 1 2 4
f 1 4 3
f 2 3 4
";

    #[test]
    fn resolve_handles_uri_schemes() {
        let loader = ObjMeshLoader::new("/opt/robot");
        assert_eq!(loader.resolve("file:///tmp/a.obj"), PathBuf::from("/tmp/a.obj"));
        assert_eq!(
            loader.resolve("package://arm/meshes/b.obj"),
            PathBuf::from("/opt/robot/arm/meshes/b.obj")
        );
        assert_eq!(loader.resolve("c.obj"), PathBuf::from("/opt/robot/c.obj"));
    }

    #[test]
    fn loads_obj_from_disk_with_scale() {
        let dir = tempfile::tempdir().expect("tmp dir");
        std::fs::write(dir.path().join("tetra.obj"), TETRA_OBJ).expect("write obj");

        let loader = ObjMeshLoader::new(dir.path());
        let mesh = loader
            .load("tetra.obj", Vec3::new(2.0, 1.0, 1.0))
            .expect("load");
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.triangles.len(), 4);
        assert!(mesh.vertices.contains(&Vec3::new(2.0, 0.0, 0.0)));
    }

    #[test]
    fn missing_file_is_a_mesh_resource_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let loader = ObjMeshLoader::new(dir.path());
        let err = loader.load("ghost.obj", Vec3::splat(1.0)).unwrap_err();
        assert!(matches!(err, MaskError::MeshResource { .. }));
    }

    #[test]
    fn library_serves_registered_meshes() {
        let mut lib = MeshLibrary::new();
        lib.insert(
            "mem://unit",
            TriMesh {
                vertices: vec![Vec3::new(1.0, 1.0, 1.0)],
                triangles: vec![],
            },
        );
        let m = lib.load("mem://unit", Vec3::splat(3.0)).unwrap();
        assert_eq!(m.vertices[0], Vec3::splat(3.0));
        assert!(lib.load("mem://other", Vec3::splat(1.0)).is_err());
    }
}
