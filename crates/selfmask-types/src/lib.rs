//! `selfmask-types` – shared vocabulary for the self-filter workspace.
//!
//! Every other crate speaks in these types: the rigid-body math in
//! [`math`], the collision [`ShapeDescriptor`]s a robot model hands out, the
//! per-link [`LinkInfo`] inflation settings, the per-point [`Label`] result,
//! and the workspace-wide [`MaskError`].

pub mod math;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use math::{Quaternion, Transform3D, Vec3};

/// Collision geometry of a single link, as described by the robot model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShapeDescriptor {
    Sphere { radius: f64 },
    /// Full edge lengths along the body's x, y and z axes.
    Box { dims: Vec3 },
    /// Cylinder aligned with the body's z axis, centred on its origin.
    Cylinder { radius: f64, length: f64 },
    /// A mesh resource (`file://`, `package://` or a plain path) and the
    /// per-axis scale applied to its vertices on load.
    Mesh {
        resource: String,
        #[serde(default = "unit_scale")]
        scale: Vec3,
    },
}

fn unit_scale() -> Vec3 {
    Vec3::splat(1.0)
}

impl ShapeDescriptor {
    /// Short lowercase name of the shape kind, used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            ShapeDescriptor::Sphere { .. } => "sphere",
            ShapeDescriptor::Box { .. } => "box",
            ShapeDescriptor::Cylinder { .. } => "cylinder",
            ShapeDescriptor::Mesh { .. } => "mesh",
        }
    }
}

/// A link to be monitored, with the inflation applied to its scaled body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkInfo {
    pub name: String,
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default = "default_padding")]
    pub padding: f64,
}

pub fn default_scale() -> f64 {
    1.0
}

pub fn default_padding() -> f64 {
    0.01
}

impl LinkInfo {
    pub fn new(name: impl Into<String>, scale: f64, padding: f64) -> Self {
        Self {
            name: name.into(),
            scale,
            padding,
        }
    }
}

/// Per-point classification result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    /// The point lies on the robot (or too close to the sensor).
    Inside,
    /// The point belongs to the environment.
    Outside,
    /// The robot's body sits between the point and the sensor.
    Shadow,
}

impl Label {
    /// Numeric mask code: `0` inside, `1` outside, `2` shadow.
    pub fn code(self) -> u8 {
        match self {
            Label::Inside => 0,
            Label::Outside => 1,
            Label::Shadow => 2,
        }
    }

    /// True for points that should be removed from obstacle data.
    pub fn is_self(self) -> bool {
        !matches!(self, Label::Outside)
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Label::Inside => write!(f, "inside"),
            Label::Outside => write!(f, "outside"),
            Label::Shadow => write!(f, "shadow"),
        }
    }
}

/// A batch of sensor points sharing one frame and acquisition time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointCloud {
    pub frame_id: String,
    pub stamp: DateTime<Utc>,
    pub points: Vec<Vec3>,
}

impl PointCloud {
    pub fn new(frame_id: impl Into<String>, stamp: DateTime<Utc>, points: Vec<Vec3>) -> Self {
        Self {
            frame_id: frame_id.into(),
            stamp,
            points,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Workspace-wide error type.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MaskError {
    #[error("Robot model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    #[error("Mesh resource '{resource}' unusable: {details}")]
    MeshResource { resource: String, details: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error on {path}: {details}")]
    Io { path: String, details: String },
}
