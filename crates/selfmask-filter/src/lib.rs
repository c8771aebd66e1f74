//! `selfmask-filter` – robot self filtering for point clouds.
//!
//! Labels each point of a cloud as belonging to the robot, to the
//! environment, or to the region the robot occludes from the sensor.
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`model`] | [`ModelResolver`] seam and the serde [`RobotModel`] |
//! | [`body_set`] | Ordered monitored links and per-frame state |
//! | [`frame_updater`] | Posing bodies and the sensor through a transform provider |
//! | [`classifier`] | Containment and intersection labelling |
//! | [`self_mask`] | The [`SelfMask`] orchestrator and cloud filtering |

pub mod body_set;
pub mod classifier;
pub mod frame_updater;
pub mod model;
pub mod self_mask;

pub use body_set::{BodyLink, BodySet, ConfigureReport, SensorState, SkippedLink};
pub use classifier::{Classifier, ShadowObserver};
pub use frame_updater::{FrameReport, FrameUpdater, SensorSource};
pub use model::{CollisionDescription, LinkDescription, ModelResolver, Origin, RobotModel};
pub use self_mask::{FilteredCloud, LabelCounts, SelfMask, SelfMaskConfig, filter_cloud};
