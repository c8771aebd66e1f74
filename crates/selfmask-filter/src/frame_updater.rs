//! Frame Updater.
//!
//! Poses every monitored body in a reference frame for one timestamp.  Each
//! link is looked up independently: a failed lookup degrades that link to
//! the identity link pose and is logged, while the rest of the set is still
//! updated.  The sensor origin is resolved the same way, falling back to the
//! reference-frame origin.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use selfmask_perception::TransformProvider;
use selfmask_types::{Transform3D, Vec3};
use tracing::{error, trace};

use crate::body_set::{BodySet, SensorState};

/// Where the sensor origin comes from.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SensorSource {
    /// No sensor: intersection classification degrades to containment.
    #[default]
    None,
    /// Origin of a named frame, resolved through the transform provider.
    Frame(String),
    /// A position already expressed in the reference frame.
    Position(Vec3),
}

impl SensorSource {
    pub fn is_none(&self) -> bool {
        matches!(self, SensorSource::None)
    }
}

/// What went wrong during a frame update, if anything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    /// Links posed at identity because their transform was unavailable.
    pub degraded_links: Vec<String>,
    /// True when the sensor frame could not be resolved and the
    /// reference-frame origin was used instead.
    pub sensor_fallback: bool,
}

impl FrameReport {
    pub fn is_clean(&self) -> bool {
        self.degraded_links.is_empty() && !self.sensor_fallback
    }
}

/// Refreshes body poses from a [`TransformProvider`].
#[derive(Clone)]
pub struct FrameUpdater {
    tf: Arc<dyn TransformProvider>,
    timeout: Duration,
}

impl std::fmt::Debug for FrameUpdater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameUpdater")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl FrameUpdater {
    pub fn new(tf: Arc<dyn TransformProvider>, timeout: Duration) -> Self {
        Self { tf, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Pose every body in `frame` as of `stamp`.
    pub fn assume_frame(
        &self,
        bodies: &mut BodySet,
        frame: &str,
        stamp: DateTime<Utc>,
    ) -> FrameReport {
        let mut report = FrameReport::default();
        for link in bodies.links_mut() {
            let link_pose = match self.tf.lookup(frame, &link.name, stamp, self.timeout) {
                Ok(t) => t,
                Err(e) => {
                    error!(
                        link = %link.name,
                        frame,
                        error = %e,
                        "unable to look up link transform; using identity"
                    );
                    report.degraded_links.push(link.name.clone());
                    Transform3D::identity()
                }
            };
            link.set_link_pose(link_pose);
        }
        trace!(frame, bodies = bodies.len(), "bodies posed");
        report
    }

    /// Pose every body and resolve the sensor origin in `frame`.
    ///
    /// [`SensorSource::None`] leaves the previous sensor state untouched.
    pub fn assume_frame_with_sensor(
        &self,
        bodies: &mut BodySet,
        frame: &str,
        stamp: DateTime<Utc>,
        sensor: &SensorSource,
        min_standoff: f64,
    ) -> FrameReport {
        let mut report = self.assume_frame(bodies, frame, stamp);
        let position = match sensor {
            SensorSource::None => return report,
            SensorSource::Position(p) => *p,
            SensorSource::Frame(sensor_frame) => {
                match self.tf.lookup(frame, sensor_frame, stamp, self.timeout) {
                    Ok(t) => t.translation,
                    Err(e) => {
                        error!(
                            sensor_frame = %sensor_frame,
                            frame,
                            error = %e,
                            "unable to look up sensor origin; using reference frame origin"
                        );
                        report.sensor_fallback = true;
                        Vec3::zero()
                    }
                }
            }
        };
        bodies.set_sensor(SensorState {
            position,
            min_standoff,
        });
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Origin, RobotModel};
    use selfmask_perception::{ShapeFactory, TfBuffer};
    use selfmask_types::{LinkInfo, ShapeDescriptor};

    fn two_spheres() -> BodySet {
        let model = RobotModel::default()
            .with_link("a", ShapeDescriptor::Sphere { radius: 0.2 }, Origin::default())
            .with_link("b", ShapeDescriptor::Sphere { radius: 0.1 }, Origin::default());
        let links = vec![LinkInfo::new("a", 1.0, 0.0), LinkInfo::new("b", 1.0, 0.0)];
        BodySet::configure(&model, &ShapeFactory::default(), &links).0
    }

    fn at(x: f64, y: f64, z: f64) -> Transform3D {
        Transform3D::from_translation(Vec3::new(x, y, z))
    }

    #[test]
    fn poses_all_links_in_reference_frame() {
        let tf = Arc::new(TfBuffer::new());
        tf.set_static_transform("odom", "base", at(1.0, 0.0, 0.0));
        tf.set_static_transform("base", "a", at(0.0, 1.0, 0.0));
        tf.set_static_transform("base", "b", at(0.0, 0.0, 1.0));
        let updater = FrameUpdater::new(tf, Duration::ZERO);

        let mut set = two_spheres();
        let report = updater.assume_frame(&mut set, "odom", Utc::now());
        assert!(report.is_clean());
        let a = &set.links()[0];
        let b = &set.links()[1];
        assert_eq!(a.name, "a");
        assert!(a.bounding.center.distance(Vec3::new(1.0, 1.0, 0.0)) < 1e-12);
        assert!(b.bounding.center.distance(Vec3::new(1.0, 0.0, 1.0)) < 1e-12);
    }

    #[test]
    fn failed_link_lookup_degrades_only_that_link() {
        let tf = Arc::new(TfBuffer::new());
        tf.set_static_transform("base", "a", at(2.0, 0.0, 0.0));
        let updater = FrameUpdater::new(tf, Duration::ZERO);

        let mut set = two_spheres();
        let report = updater.assume_frame(&mut set, "base", Utc::now());
        assert_eq!(report.degraded_links, vec!["b"]);
        assert!(set.links()[0].bounding.center.distance(Vec3::new(2.0, 0.0, 0.0)) < 1e-12);
        assert_eq!(set.links()[1].scaled.pose(), Transform3D::identity());
    }

    #[test]
    fn sensor_frame_resolves_to_its_origin() {
        let tf = Arc::new(TfBuffer::new());
        tf.set_static_transform("base", "a", Transform3D::identity());
        tf.set_static_transform("base", "b", Transform3D::identity());
        tf.set_static_transform("base", "camera", at(0.0, 0.0, 1.5));
        let updater = FrameUpdater::new(tf, Duration::ZERO);

        let mut set = two_spheres();
        let source = SensorSource::Frame("camera".into());
        let report = updater.assume_frame_with_sensor(&mut set, "base", Utc::now(), &source, 0.02);
        assert!(report.is_clean());
        assert_eq!(
            set.sensor(),
            SensorState {
                position: Vec3::new(0.0, 0.0, 1.5),
                min_standoff: 0.02
            }
        );
    }

    #[test]
    fn unknown_sensor_frame_falls_back_to_origin() {
        let tf = Arc::new(TfBuffer::new());
        tf.set_static_transform("base", "a", Transform3D::identity());
        tf.set_static_transform("base", "b", Transform3D::identity());
        let updater = FrameUpdater::new(tf, Duration::ZERO);

        let mut set = two_spheres();
        set.set_sensor(SensorState {
            position: Vec3::splat(9.0),
            min_standoff: 0.0,
        });
        let source = SensorSource::Frame("lidar".into());
        let report = updater.assume_frame_with_sensor(&mut set, "base", Utc::now(), &source, 0.01);
        assert!(report.sensor_fallback);
        assert!(report.degraded_links.is_empty());
        assert_eq!(set.sensor().position, Vec3::zero());
    }

    #[test]
    fn explicit_position_and_none_sources() {
        let tf = Arc::new(TfBuffer::new());
        let updater = FrameUpdater::new(tf, Duration::ZERO);
        let mut set = BodySet::default();

        let p = Vec3::new(0.5, 0.0, 0.0);
        updater.assume_frame_with_sensor(&mut set, "base", Utc::now(), &SensorSource::Position(p), 0.1);
        assert_eq!(set.sensor().position, p);

        updater.assume_frame_with_sensor(&mut set, "base", Utc::now(), &SensorSource::None, 0.3);
        assert_eq!(set.sensor().position, p);
        assert_eq!(set.sensor().min_standoff, 0.1);
    }
}
