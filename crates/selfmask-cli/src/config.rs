//! Filter configuration – reads/writes `selfmask.toml`.
//!
//! ```toml
//! mesh_root = "/opt/robot/description"
//! default_scale = 1.0
//! default_padding = 0.01
//! min_sensor_dist = 0.01
//! sensor_frame = "head_camera"
//!
//! [mask]
//! transform_timeout_ms = 100
//! parallel = true
//!
//! [[links]]
//! name = "base_link"
//!
//! [[links]]
//! name = "gripper"
//! padding = 0.03
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use selfmask_filter::SelfMaskConfig;
use selfmask_types::{LinkInfo, MaskError};
use serde::{Deserialize, Serialize};

/// A monitored link; unset inflation falls back to the config defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSetting {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub padding: Option<f64>,
}

/// Persisted filter configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory that relative and `package://` mesh resources resolve
    /// against.
    #[serde(default = "default_mesh_root")]
    pub mesh_root: PathBuf,

    #[serde(default = "selfmask_types::default_scale")]
    pub default_scale: f64,

    #[serde(default = "selfmask_types::default_padding")]
    pub default_padding: f64,

    /// Points closer than this to the sensor are treated as self.
    #[serde(default = "default_min_sensor_dist")]
    pub min_sensor_dist: f64,

    /// Sensor frame for shadow classification; empty selects containment.
    #[serde(default)]
    pub sensor_frame: String,

    #[serde(default)]
    pub mask: SelfMaskConfig,

    #[serde(default)]
    pub links: Vec<LinkSetting>,
}

fn default_mesh_root() -> PathBuf {
    PathBuf::from(".")
}
fn default_min_sensor_dist() -> f64 {
    0.01
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mesh_root: default_mesh_root(),
            default_scale: selfmask_types::default_scale(),
            default_padding: selfmask_types::default_padding(),
            min_sensor_dist: default_min_sensor_dist(),
            sensor_frame: String::new(),
            mask: SelfMaskConfig::default(),
            links: Vec::new(),
        }
    }
}

impl Config {
    /// Monitored links with defaults applied.
    pub fn link_infos(&self) -> Vec<LinkInfo> {
        self.links
            .iter()
            .map(|l| {
                LinkInfo::new(
                    l.name.clone(),
                    l.scale.unwrap_or(self.default_scale),
                    l.padding.unwrap_or(self.default_padding),
                )
            })
            .collect()
    }
}

/// Load the config from `path` and apply environment overrides.
pub fn load_from(path: &Path) -> Result<Config, MaskError> {
    let raw = fs::read_to_string(path).map_err(|e| MaskError::Io {
        path: path.display().to_string(),
        details: e.to_string(),
    })?;
    let mut cfg: Config = toml::from_str(&raw)
        .map_err(|e| MaskError::Config(format!("failed to parse {}: {e}", path.display())))?;
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

/// Apply `SELFMASK_*` environment variable overrides to `cfg`.
///
/// Supported variables:
///
/// | Variable | Config field |
/// |---|---|
/// | `SELFMASK_MESH_ROOT` | `mesh_root` |
/// | `SELFMASK_SENSOR_FRAME` | `sensor_frame` |
/// | `SELFMASK_DEFAULT_SCALE` | `default_scale` |
/// | `SELFMASK_DEFAULT_PADDING` | `default_padding` |
/// | `SELFMASK_MIN_SENSOR_DIST` | `min_sensor_dist` |
/// | `SELFMASK_TRANSFORM_TIMEOUT_MS` | `mask.transform_timeout_ms` |
///
/// Values that do not parse are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("SELFMASK_MESH_ROOT") {
        cfg.mesh_root = PathBuf::from(v);
    }
    if let Ok(v) = std::env::var("SELFMASK_SENSOR_FRAME") {
        cfg.sensor_frame = v;
    }
    if let Ok(v) = std::env::var("SELFMASK_DEFAULT_SCALE")
        && let Ok(scale) = v.parse::<f64>()
    {
        cfg.default_scale = scale;
    }
    if let Ok(v) = std::env::var("SELFMASK_DEFAULT_PADDING")
        && let Ok(padding) = v.parse::<f64>()
    {
        cfg.default_padding = padding;
    }
    if let Ok(v) = std::env::var("SELFMASK_MIN_SENSOR_DIST")
        && let Ok(dist) = v.parse::<f64>()
    {
        cfg.min_sensor_dist = dist;
    }
    if let Ok(v) = std::env::var("SELFMASK_TRANSFORM_TIMEOUT_MS")
        && let Ok(ms) = v.parse::<u64>()
    {
        cfg.mask.transform_timeout_ms = ms;
    }
}

/// Save the config to `path`, creating parent directories if necessary.
pub fn save_to(cfg: &Config, path: &Path) -> Result<(), MaskError> {
    let io_err = |e: std::io::Error| MaskError::Io {
        path: path.display().to_string(),
        details: e.to_string(),
    };
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| MaskError::Config(format!("failed to serialize config: {e}")))?;
    fs::write(path, raw).map_err(io_err)
}
