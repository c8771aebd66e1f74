//! Robot model collaborator.
//!
//! The filter never parses robot descriptions itself; it asks a
//! [`ModelResolver`] for the collision geometry of each monitored link.
//! [`RobotModel`] is a minimal serde description that implements the trait
//! for configuration files and tests:
//!
//! ```toml
//! name = "mobile_manipulator"
//!
//! [[links]]
//! name = "base_link"
//! [links.collision]
//! origin = { xyz = [0.0, 0.0, 0.1] }
//! geometry = { type = "box", dims = { x = 0.6, y = 0.5, z = 0.2 } }
//!
//! [[links]]
//! name = "forearm"
//! [links.collision]
//! origin = { xyz = [0.15, 0.0, 0.0], rpy = [0.0, 1.5708, 0.0] }
//! geometry = { type = "cylinder", radius = 0.05, length = 0.3 }
//! ```

use std::path::Path;

use selfmask_types::{MaskError, Quaternion, ShapeDescriptor, Transform3D, Vec3};
use serde::{Deserialize, Serialize};

/// Supplies per-link collision geometry.
pub trait ModelResolver: Send + Sync {
    /// Collision shape of `link_name` and its offset from the link frame.
    ///
    /// `None` when the link is unknown or has no collision geometry; this
    /// is a normal outcome, not an error.
    fn resolve(&self, link_name: &str) -> Option<(ShapeDescriptor, Transform3D)>;
}

/// Position (`xyz`, metres) and fixed-axis orientation (`rpy`, radians).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Origin {
    #[serde(default)]
    pub xyz: [f64; 3],
    #[serde(default)]
    pub rpy: [f64; 3],
}

impl Origin {
    pub fn to_transform(self) -> Transform3D {
        let [roll, pitch, yaw] = self.rpy;
        Transform3D::new(Vec3::from(self.xyz), Quaternion::from_rpy(roll, pitch, yaw))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionDescription {
    #[serde(default)]
    pub origin: Origin,
    pub geometry: ShapeDescriptor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkDescription {
    pub name: String,
    #[serde(default)]
    pub collision: Option<CollisionDescription>,
}

/// A flat list of links and their collision geometry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RobotModel {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub links: Vec<LinkDescription>,
}

impl RobotModel {
    /// Parse a TOML description.
    pub fn from_toml_str(raw: &str) -> Result<Self, MaskError> {
        toml::from_str(raw)
            .map_err(|e| MaskError::ModelUnavailable(format!("unable to parse robot model: {e}")))
    }

    /// Parse a JSON description.
    pub fn from_json_str(raw: &str) -> Result<Self, MaskError> {
        serde_json::from_str(raw)
            .map_err(|e| MaskError::ModelUnavailable(format!("unable to parse robot model: {e}")))
    }

    /// Load a description from disk; `.json` files are parsed as JSON,
    /// everything else as TOML.
    pub fn load(path: &Path) -> Result<Self, MaskError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            MaskError::ModelUnavailable(format!("robot model {} not readable: {e}", path.display()))
        })?;
        if path.extension().is_some_and(|ext| ext == "json") {
            Self::from_json_str(&raw)
        } else {
            Self::from_toml_str(&raw)
        }
    }

    /// Add a link with collision geometry (builder style, used by tests and
    /// simulators).
    pub fn with_link(mut self, name: &str, geometry: ShapeDescriptor, origin: Origin) -> Self {
        self.links.push(LinkDescription {
            name: name.to_string(),
            collision: Some(CollisionDescription { origin, geometry }),
        });
        self
    }
}

impl ModelResolver for RobotModel {
    fn resolve(&self, link_name: &str) -> Option<(ShapeDescriptor, Transform3D)> {
        let link = self.links.iter().find(|l| l.name == link_name)?;
        let collision = link.collision.as_ref()?;
        Some((collision.geometry.clone(), collision.origin.to_transform()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL: &str = r#"
        name = "test_bot"

        [[links]]
        name = "base_link"
        [links.collision]
        origin = { xyz = [0.0, 0.0, 0.1] }
        geometry = { type = "box", dims = { x = 0.6, y = 0.5, z = 0.2 } }

        [[links]]
        name = "antenna"

        [[links]]
        name = "head"
        [links.collision]
        geometry = { type = "sphere", radius = 0.12 }
    "#;

    #[test]
    fn parses_toml_and_resolves_links() {
        let model = RobotModel::from_toml_str(MODEL).unwrap();
        assert_eq!(model.name, "test_bot");
        assert_eq!(model.links.len(), 3);

        let (shape, offset) = model.resolve("base_link").unwrap();
        assert_eq!(shape.kind(), "box");
        assert!((offset.translation.z - 0.1).abs() < 1e-12);

        let (shape, offset) = model.resolve("head").unwrap();
        assert_eq!(shape, ShapeDescriptor::Sphere { radius: 0.12 });
        assert_eq!(offset, Transform3D::identity());
    }

    #[test]
    fn links_without_collision_or_unknown_resolve_to_none() {
        let model = RobotModel::from_toml_str(MODEL).unwrap();
        assert!(model.resolve("antenna").is_none());
        assert!(model.resolve("ghost").is_none());
    }

    #[test]
    fn malformed_model_is_unavailable() {
        let err = RobotModel::from_toml_str("links = 5").unwrap_err();
        assert!(matches!(err, MaskError::ModelUnavailable(_)));
    }

    #[test]
    fn json_model_from_disk() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("robot.json");
        let model = RobotModel::default().with_link(
            "wrist",
            ShapeDescriptor::Cylinder {
                radius: 0.04,
                length: 0.1,
            },
            Origin {
                xyz: [0.0, 0.0, 0.05],
                rpy: [0.0, 0.0, 0.0],
            },
        );
        std::fs::write(&path, serde_json::to_string(&model).unwrap()).unwrap();

        let loaded = RobotModel::load(&path).unwrap();
        assert_eq!(loaded, model);
        assert!(RobotModel::load(&dir.path().join("missing.toml")).is_err());
    }
}
