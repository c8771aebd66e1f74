//! Self Mask.
//!
//! The public entry point of the filter.  A [`SelfMask`] owns the monitored
//! [`BodySet`] and wires together the [`ShapeFactory`] (configuration), the
//! [`FrameUpdater`] (posing) and the [`Classifier`] (labelling).
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use selfmask_filter::{RobotModel, SelfMask, SelfMaskConfig, SensorSource};
//! use selfmask_perception::{ShapeFactory, TfBuffer};
//! use selfmask_types::{LinkInfo, PointCloud};
//!
//! # fn demo(model: RobotModel, cloud: PointCloud) -> Result<(), selfmask_types::MaskError> {
//! let tf = Arc::new(TfBuffer::new());
//! let mut mask = SelfMask::new(tf, ShapeFactory::default(), SelfMaskConfig::default());
//! mask.configure(Some(&model), &[LinkInfo::new("base_link", 1.0, 0.01)])?;
//!
//! let labels = mask.classify_intersection(
//!     &cloud,
//!     &SensorSource::Frame("camera_link".into()),
//!     0.01,
//!     None,
//! );
//! let filtered = selfmask_filter::filter_cloud(&cloud, &labels);
//! println!("kept {} of {} points", filtered.kept.len(), cloud.len());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use selfmask_perception::{ShapeFactory, TransformProvider};
use selfmask_types::{Label, LinkInfo, MaskError, PointCloud, Vec3};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::body_set::{BodySet, ConfigureReport};
use crate::classifier::{Classifier, ShadowObserver};
use crate::frame_updater::{FrameReport, FrameUpdater, SensorSource};
use crate::model::ModelResolver;

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

fn default_transform_timeout_ms() -> u64 {
    100
}

fn default_parallel() -> bool {
    true
}

/// Runtime settings of a [`SelfMask`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfMaskConfig {
    /// Upper bound on each transform lookup.
    #[serde(default = "default_transform_timeout_ms")]
    pub transform_timeout_ms: u64,
    /// Split large batches across the rayon pool.
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

impl Default for SelfMaskConfig {
    fn default() -> Self {
        Self {
            transform_timeout_ms: default_transform_timeout_ms(),
            parallel: default_parallel(),
        }
    }
}

impl SelfMaskConfig {
    pub fn transform_timeout(&self) -> Duration {
        Duration::from_millis(self.transform_timeout_ms)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SelfMask
// ────────────────────────────────────────────────────────────────────────────

/// Labels point-cloud points that belong to (or are occluded by) the robot.
///
/// All mutating operations take `&mut self`, so reconfiguration can never
/// overlap a classification in progress.
#[derive(Debug)]
pub struct SelfMask {
    factory: ShapeFactory,
    updater: FrameUpdater,
    config: SelfMaskConfig,
    bodies: BodySet,
}

impl SelfMask {
    pub fn new(
        tf: Arc<dyn TransformProvider>,
        factory: ShapeFactory,
        config: SelfMaskConfig,
    ) -> Self {
        Self {
            updater: FrameUpdater::new(tf, config.transform_timeout()),
            factory,
            config,
            bodies: BodySet::default(),
        }
    }

    pub fn config(&self) -> &SelfMaskConfig {
        &self.config
    }

    /// Replace the monitored set with bodies for `links`.
    ///
    /// The previous set is released first, so a failed configuration leaves
    /// the mask empty.
    ///
    /// # Errors
    ///
    /// [`MaskError::ModelUnavailable`] when no robot model is supplied.
    /// Per-link problems are not errors; see [`ConfigureReport`].
    #[instrument(skip_all, fields(requested = links.len()))]
    pub fn configure(
        &mut self,
        model: Option<&dyn ModelResolver>,
        links: &[LinkInfo],
    ) -> Result<ConfigureReport, MaskError> {
        self.bodies = BodySet::default();

        let Some(model) = model else {
            error!("robot model not available; self filter has nothing to monitor");
            return Err(MaskError::ModelUnavailable(
                "no robot model supplied".to_string(),
            ));
        };

        let (bodies, report) = BodySet::configure(model, &self.factory, links);
        if bodies.is_empty() {
            warn!("no robot links will be included in the self mask");
        } else {
            info!(
                monitored = bodies.len(),
                missing = report.missing.len(),
                skipped = report.skipped.len(),
                "self mask configured"
            );
        }
        self.bodies = bodies;
        Ok(report)
    }

    /// Monitored link names, largest body first.
    pub fn monitored_links(&self) -> Vec<String> {
        self.bodies.link_names()
    }

    pub fn bodies(&self) -> &BodySet {
        &self.bodies
    }

    /// Pose the bodies in `frame` at `stamp` for subsequent single-point
    /// queries.
    pub fn assume_frame(&mut self, frame: &str, stamp: DateTime<Utc>) -> FrameReport {
        self.updater.assume_frame(&mut self.bodies, frame, stamp)
    }

    /// Like [`SelfMask::assume_frame`], also resolving the sensor origin.
    pub fn assume_frame_with_sensor(
        &mut self,
        frame: &str,
        stamp: DateTime<Utc>,
        sensor: &SensorSource,
        min_standoff: f64,
    ) -> FrameReport {
        self.updater
            .assume_frame_with_sensor(&mut self.bodies, frame, stamp, sensor, min_standoff)
    }

    /// Label every point of `cloud` `Inside` or `Outside`.
    #[instrument(skip_all, fields(frame = %cloud.frame_id, points = cloud.len()))]
    pub fn classify_containment(&mut self, cloud: &PointCloud) -> Vec<Label> {
        if self.bodies.is_empty() {
            return vec![Label::Outside; cloud.len()];
        }
        self.assume_frame(&cloud.frame_id, cloud.stamp);
        Classifier::new(&self.bodies, self.config.parallel).classify_containment(&cloud.points)
    }

    /// Label every point of `cloud` `Inside`, `Outside` or `Shadow` as seen
    /// from `sensor`.
    ///
    /// Points closer than `min_standoff` to the sensor are labelled
    /// `Inside`.  `observer`, if given, receives the occluding surface point
    /// of every shadowed point.  With [`SensorSource::None`] this is
    /// [`SelfMask::classify_containment`].
    #[instrument(skip_all, fields(frame = %cloud.frame_id, points = cloud.len()))]
    pub fn classify_intersection(
        &mut self,
        cloud: &PointCloud,
        sensor: &SensorSource,
        min_standoff: f64,
        observer: Option<ShadowObserver<'_>>,
    ) -> Vec<Label> {
        if sensor.is_none() {
            return self.classify_containment(cloud);
        }
        if self.bodies.is_empty() {
            return vec![Label::Outside; cloud.len()];
        }
        self.assume_frame_with_sensor(&cloud.frame_id, cloud.stamp, sensor, min_standoff);
        Classifier::new(&self.bodies, self.config.parallel)
            .classify_intersection(&cloud.points, observer)
    }

    /// Containment label of one point against the most recent frame.
    pub fn containment_of(&self, p: Vec3) -> Label {
        Classifier::new(&self.bodies, false).containment_of(p)
    }

    /// Intersection label of one point against the most recent frame and
    /// sensor origin.
    pub fn intersection_of(&self, p: Vec3, observer: Option<ShadowObserver<'_>>) -> Label {
        Classifier::new(&self.bodies, false).intersection_of(p, observer)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Filtering
// ────────────────────────────────────────────────────────────────────────────

/// Number of points per label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCounts {
    pub inside: usize,
    pub outside: usize,
    pub shadow: usize,
}

impl LabelCounts {
    pub fn from_labels(labels: &[Label]) -> Self {
        labels.iter().fold(Self::default(), |mut c, l| {
            match l {
                Label::Inside => c.inside += 1,
                Label::Outside => c.outside += 1,
                Label::Shadow => c.shadow += 1,
            }
            c
        })
    }

    pub fn total(&self) -> usize {
        self.inside + self.outside + self.shadow
    }
}

/// A cloud split by label.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredCloud {
    /// Points labelled `Outside`.
    pub kept: PointCloud,
    /// Points labelled `Inside` or `Shadow`.
    pub removed: PointCloud,
    pub counts: LabelCounts,
}

/// Split `cloud` according to `labels` (one label per point, as returned by
/// the classify operations).  Extra points without a label are kept.
pub fn filter_cloud(cloud: &PointCloud, labels: &[Label]) -> FilteredCloud {
    if labels.len() != cloud.len() {
        warn!(
            points = cloud.len(),
            labels = labels.len(),
            "label count does not match point count"
        );
    }
    let mut kept = PointCloud::new(cloud.frame_id.clone(), cloud.stamp, Vec::new());
    let mut removed = PointCloud::new(cloud.frame_id.clone(), cloud.stamp, Vec::new());
    for (i, p) in cloud.points.iter().enumerate() {
        match labels.get(i) {
            Some(l) if l.is_self() => removed.points.push(*p),
            _ => kept.points.push(*p),
        }
    }
    FilteredCloud {
        kept,
        removed,
        counts: LabelCounts::from_labels(labels),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Origin, RobotModel};
    use selfmask_perception::TfBuffer;
    use selfmask_types::{ShapeDescriptor, Transform3D};

    fn mask_with_ball() -> (SelfMask, Arc<TfBuffer>) {
        let tf = Arc::new(TfBuffer::new());
        tf.set_static_transform("base", "ball", Transform3D::identity());
        let mut mask = SelfMask::new(tf.clone(), ShapeFactory::default(), SelfMaskConfig::default());
        let model = RobotModel::default().with_link(
            "ball",
            ShapeDescriptor::Sphere { radius: 1.0 },
            Origin::default(),
        );
        mask.configure(Some(&model), &[LinkInfo::new("ball", 1.0, 0.0)])
            .unwrap();
        (mask, tf)
    }

    // ── Configuration ────────────────────────────────────────────────────────

    #[test]
    fn config_defaults_and_toml() {
        let cfg = SelfMaskConfig::default();
        assert_eq!(cfg.transform_timeout(), Duration::from_millis(100));
        assert!(cfg.parallel);

        let cfg: SelfMaskConfig = toml::from_str("parallel = false").unwrap();
        assert!(!cfg.parallel);
        assert_eq!(cfg.transform_timeout_ms, 100);
    }

    #[test]
    fn missing_model_empties_the_mask() {
        let (mut mask, _tf) = mask_with_ball();
        assert_eq!(mask.monitored_links(), vec!["ball"]);

        let err = mask.configure(None, &[LinkInfo::new("ball", 1.0, 0.0)]);
        assert!(matches!(err, Err(MaskError::ModelUnavailable(_))));
        assert!(mask.monitored_links().is_empty());
    }

    // ── Classification ───────────────────────────────────────────────────────

    #[test]
    fn single_point_queries_use_latest_frame() {
        let (mut mask, tf) = mask_with_ball();
        tf.set_static_transform("odom", "base", Transform3D::from_translation(Vec3::new(5.0, 0.0, 0.0)));

        assert!(mask.assume_frame("odom", Utc::now()).is_clean());
        assert_eq!(mask.containment_of(Vec3::new(5.0, 0.0, 0.0)), Label::Inside);
        assert_eq!(mask.containment_of(Vec3::zero()), Label::Outside);

        mask.assume_frame("base", Utc::now());
        assert_eq!(mask.containment_of(Vec3::zero()), Label::Inside);
    }

    #[test]
    fn none_sensor_falls_back_to_containment() {
        let (mut mask, _tf) = mask_with_ball();
        let cloud = PointCloud::new(
            "base",
            Utc::now(),
            vec![Vec3::zero(), Vec3::new(0.0, 0.0, -3.0)],
        );
        let labels = mask.classify_intersection(&cloud, &SensorSource::None, 0.01, None);
        assert_eq!(labels, vec![Label::Inside, Label::Outside]);
    }

    // ── Filtering ────────────────────────────────────────────────────────────

    #[test]
    fn filter_cloud_splits_by_label() {
        let cloud = PointCloud::new(
            "base",
            Utc::now(),
            vec![Vec3::splat(1.0), Vec3::splat(2.0), Vec3::splat(3.0), Vec3::splat(4.0)],
        );
        let labels = [Label::Outside, Label::Inside, Label::Shadow, Label::Outside];
        let filtered = filter_cloud(&cloud, &labels);
        assert_eq!(filtered.kept.points, vec![Vec3::splat(1.0), Vec3::splat(4.0)]);
        assert_eq!(filtered.removed.points, vec![Vec3::splat(2.0), Vec3::splat(3.0)]);
        assert_eq!(filtered.kept.frame_id, "base");
        assert_eq!(
            filtered.counts,
            LabelCounts {
                inside: 1,
                outside: 2,
                shadow: 1
            }
        );
        assert_eq!(filtered.counts.total(), 4);
    }

    #[test]
    fn label_counts_serialise() {
        let counts = LabelCounts {
            inside: 3,
            outside: 10,
            shadow: 2,
        };
        let json = serde_json::to_string(&counts).unwrap();
        assert_eq!(json, r#"{"inside":3,"outside":10,"shadow":2}"#);
    }
}
