//! Scene files – a robot model, a transform tree and one point cloud.
//!
//! ```toml
//! model_path = "robot.toml"        # or an inline [model] table
//!
//! [[transforms]]
//! parent = "odom"
//! child = "base_link"
//! xyz = [1.0, 0.0, 0.0]
//!
//! [[transforms]]
//! parent = "base_link"
//! child = "head_camera"
//! xyz = [0.0, 0.0, 1.2]
//! rpy = [0.0, 0.3, 0.0]
//!
//! [cloud]
//! frame_id = "odom"
//! points = [[1.0, 0.0, 0.1], [4.0, 2.0, 0.0]]
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use selfmask_filter::{Origin, RobotModel};
use selfmask_perception::TfBuffer;
use selfmask_types::{MaskError, PointCloud, Vec3};
use serde::{Deserialize, Serialize};
use tracing::error;

/// A static edge of the transform tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneTransform {
    pub parent: String,
    pub child: String,
    #[serde(default)]
    pub xyz: [f64; 3],
    #[serde(default)]
    pub rpy: [f64; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneCloud {
    pub frame_id: String,
    /// Acquisition time; defaults to load time.
    #[serde(default)]
    pub stamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub points: Vec<[f64; 3]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub model: Option<RobotModel>,
    /// Robot model file, relative to the scene file.
    #[serde(default)]
    pub model_path: Option<PathBuf>,
    #[serde(default)]
    pub transforms: Vec<SceneTransform>,
    pub cloud: SceneCloud,
}

/// A scene with its model resolved and its transforms loaded.
#[derive(Debug)]
pub struct LoadedScene {
    pub model: Option<RobotModel>,
    pub tf: Arc<TfBuffer>,
    pub cloud: PointCloud,
}

impl Scene {
    pub fn from_toml_str(raw: &str) -> Result<Self, MaskError> {
        toml::from_str(raw).map_err(|e| MaskError::Config(format!("failed to parse scene: {e}")))
    }

    /// Read and resolve a scene file.
    pub fn load(path: &Path) -> Result<LoadedScene, MaskError> {
        let raw = std::fs::read_to_string(path).map_err(|e| MaskError::Io {
            path: path.display().to_string(),
            details: e.to_string(),
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_toml_str(&raw)?.resolve(base)
    }

    /// Resolve `model_path` against `base` and build the transform buffer.
    ///
    /// A scene with no model at all still loads; configuration reports it.
    /// A `model_path` that cannot be read or parsed fails the scene.
    pub fn resolve(self, base: &Path) -> Result<LoadedScene, MaskError> {
        let model = match (self.model, self.model_path) {
            (Some(model), _) => Some(model),
            (None, Some(rel)) => {
                let path = base.join(rel);
                let model = RobotModel::load(&path).inspect_err(|e| {
                    error!(path = %path.display(), error = %e, "robot model could not be loaded");
                })?;
                Some(model)
            }
            (None, None) => None,
        };

        let tf = TfBuffer::new();
        for t in &self.transforms {
            let origin = Origin {
                xyz: t.xyz,
                rpy: t.rpy,
            };
            tf.set_static_transform(&t.parent, &t.child, origin.to_transform());
        }

        let stamp = self.cloud.stamp.unwrap_or_else(Utc::now);
        let points = self.cloud.points.into_iter().map(Vec3::from).collect();
        Ok(LoadedScene {
            model,
            tf: Arc::new(tf),
            cloud: PointCloud::new(self.cloud.frame_id, stamp, points),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use selfmask_filter::ModelResolver;
    use selfmask_perception::TransformProvider;
    use std::time::Duration;

    const SCENE: &str = r#"
        [model]
        name = "pillar_bot"
        [[model.links]]
        name = "pillar"
        [model.links.collision]
        geometry = { type = "cylinder", radius = 0.2, length = 1.0 }

        [[transforms]]
        parent = "odom"
        child = "pillar"
        xyz = [1.0, 0.0, 0.5]

        [cloud]
        frame_id = "odom"
        stamp = "2024-05-01T12:00:00Z"
        points = [[1.0, 0.0, 0.5], [3.0, 0.0, 0.0]]
    "#;

    #[test]
    fn inline_scene_resolves() {
        let scene = Scene::from_toml_str(SCENE)
            .unwrap()
            .resolve(Path::new("."))
            .unwrap();
        let model = scene.model.expect("inline model");
        assert!(model.resolve("pillar").is_some());

        assert_eq!(scene.cloud.len(), 2);
        assert_eq!(scene.cloud.frame_id, "odom");
        let t = scene
            .tf
            .lookup("odom", "pillar", scene.cloud.stamp, Duration::ZERO)
            .unwrap();
        assert!((t.translation.x - 1.0).abs() < 1e-12);
    }

    #[test]
    fn model_path_is_relative_to_scene_file() {
        let dir = tempfile::tempdir().expect("tmp dir");
        std::fs::write(
            dir.path().join("robot.toml"),
            "[[links]]\nname = \"ball\"\n[links.collision]\ngeometry = { type = \"sphere\", radius = 0.3 }\n",
        )
        .unwrap();
        let scene_path = dir.path().join("scene.toml");
        std::fs::write(
            &scene_path,
            "model_path = \"robot.toml\"\n[cloud]\nframe_id = \"base\"\n",
        )
        .unwrap();

        let scene = Scene::load(&scene_path).unwrap();
        assert!(scene.model.unwrap().resolve("ball").is_some());
        assert!(scene.cloud.is_empty());
    }

    #[test]
    fn unreadable_model_path_fails_the_scene() {
        let err = Scene::from_toml_str(
            "model_path = \"nowhere.toml\"\n[cloud]\nframe_id = \"base\"\n",
        )
        .unwrap()
        .resolve(Path::new("/nonexistent"))
        .unwrap_err();
        assert!(matches!(err, MaskError::ModelUnavailable(_)), "{err}");
    }

    #[test]
    fn malformed_model_file_reports_the_parse_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        std::fs::write(dir.path().join("robot.toml"), "[[links]]\nname = 7\n").unwrap();
        let scene_path = dir.path().join("scene.toml");
        std::fs::write(
            &scene_path,
            "model_path = \"robot.toml\"\n[cloud]\nframe_id = \"base\"\n",
        )
        .unwrap();

        let err = Scene::load(&scene_path).unwrap_err();
        assert!(matches!(err, MaskError::ModelUnavailable(_)), "{err}");
        assert!(err.to_string().contains("unable to parse"), "{err}");
    }

    #[test]
    fn scene_without_model_still_loads() {
        let scene = Scene::from_toml_str("[cloud]\nframe_id = \"base\"\n")
            .unwrap()
            .resolve(Path::new("."))
            .unwrap();
        assert!(scene.model.is_none());
    }

    #[test]
    fn scene_without_cloud_is_rejected() {
        assert!(matches!(
            Scene::from_toml_str("transforms = []"),
            Err(MaskError::Config(_))
        ));
    }
}
