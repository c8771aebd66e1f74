//! Body Set.
//!
//! The ordered collection of monitored links, one [`BodyLink`] per link that
//! resolved to a usable shape.  Links are ordered by descending scaled
//! volume so that the biggest (most likely to contain a point) bodies are
//! tested first.
//!
//! The set also carries the state refreshed by every frame update: current
//! body poses, per-body bounding spheres, and the sensor origin used by the
//! intersection classifier.

use std::collections::HashSet;

use selfmask_perception::{Body, BoundingSphere, ShapeFactory};
use selfmask_types::{LinkInfo, MaskError, Transform3D, Vec3};
use tracing::{debug, warn};

use crate::model::ModelResolver;

/// One monitored link.
#[derive(Debug)]
pub struct BodyLink {
    pub name: String,
    /// Inflated body used for containment and shadow tests.
    pub scaled: Box<dyn Body>,
    /// Unit-scale, unpadded body used to recognise true-surface points.
    pub unscaled: Box<dyn Body>,
    /// Collision origin relative to the link frame.
    pub static_offset: Transform3D,
    /// Volume of the scaled body, used for ordering.
    pub volume: f64,
    /// Bounding sphere of the scaled body at the current pose.
    pub bounding: BoundingSphere,
    /// `bounding.radius²`, cached for the hot loop.
    pub radius2: f64,
}

impl BodyLink {
    /// Apply a link pose (link frame expressed in the reference frame) to
    /// both bodies and refresh the bounding sphere.
    pub(crate) fn set_link_pose(&mut self, link_pose: Transform3D) {
        let pose = link_pose.compose(self.static_offset);
        self.scaled.set_pose(pose);
        self.unscaled.set_pose(pose);
        self.bounding = self.scaled.compute_bounding_sphere();
        self.radius2 = self.bounding.radius * self.bounding.radius;
    }
}

/// Sensor origin and minimum standoff for shadow classification.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SensorState {
    pub position: Vec3,
    pub min_standoff: f64,
}

/// Why a requested link was not monitored.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedLink {
    pub name: String,
    pub reason: MaskError,
}

/// Outcome of [`BodySet::configure`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigureReport {
    /// Monitored link names in classification order.
    pub monitored: Vec<String>,
    /// Links the model has no collision geometry for.
    pub missing: Vec<String>,
    /// Links whose geometry could not be turned into bodies.
    pub skipped: Vec<SkippedLink>,
}

/// Ordered monitored links plus per-frame state.
#[derive(Debug, Default)]
pub struct BodySet {
    links: Vec<BodyLink>,
    sensor: SensorState,
}

impl BodySet {
    /// Build the set for `requested` links.
    ///
    /// Links that the model does not know are reported in
    /// [`ConfigureReport::missing`] with a single aggregated warning; links
    /// whose shapes fail to build are skipped individually.  Neither aborts
    /// the configuration.
    pub fn configure(
        model: &dyn ModelResolver,
        factory: &ShapeFactory,
        requested: &[LinkInfo],
    ) -> (Self, ConfigureReport) {
        let mut report = ConfigureReport::default();
        let mut links = Vec::with_capacity(requested.len());
        let mut seen = HashSet::new();

        for info in requested {
            if !seen.insert(info.name.as_str()) {
                warn!(link = %info.name, "link requested more than once; keeping the first entry");
                report.skipped.push(SkippedLink {
                    name: info.name.clone(),
                    reason: MaskError::Config(format!("duplicate link '{}'", info.name)),
                });
                continue;
            }
            let Some((shape, static_offset)) = model.resolve(&info.name) else {
                report.missing.push(info.name.clone());
                continue;
            };
            match factory.build(&shape, info.scale, info.padding) {
                Ok(built) => {
                    debug!(
                        link = %info.name,
                        shape = shape.kind(),
                        scale = info.scale,
                        padding = info.padding,
                        volume = built.volume,
                        "monitoring link"
                    );
                    let mut link = BodyLink {
                        name: info.name.clone(),
                        scaled: built.scaled,
                        unscaled: built.unscaled,
                        static_offset,
                        volume: built.volume,
                        bounding: BoundingSphere::default(),
                        radius2: 0.0,
                    };
                    link.set_link_pose(Transform3D::identity());
                    links.push(link);
                }
                Err(e) => {
                    warn!(link = %info.name, error = %e, "unable to create collision body; link skipped");
                    report.skipped.push(SkippedLink {
                        name: info.name.clone(),
                        reason: e,
                    });
                }
            }
        }

        if !report.missing.is_empty() {
            warn!(
                links = %report.missing.join(" "),
                "some links were included for self filtering but have no collision geometry in the robot model"
            );
        }

        // Stable: equal volumes keep their request order.
        links.sort_by(|a, b| b.volume.total_cmp(&a.volume));
        report.monitored = links.iter().map(|l| l.name.clone()).collect();

        (
            Self {
                links,
                sensor: SensorState::default(),
            },
            report,
        )
    }

    pub fn links(&self) -> &[BodyLink] {
        &self.links
    }

    pub(crate) fn links_mut(&mut self) -> &mut [BodyLink] {
        &mut self.links
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Monitored link names in classification order.
    pub fn link_names(&self) -> Vec<String> {
        self.links.iter().map(|l| l.name.clone()).collect()
    }

    pub fn sensor(&self) -> SensorState {
        self.sensor
    }

    pub(crate) fn set_sensor(&mut self, sensor: SensorState) {
        self.sensor = sensor;
    }
}
