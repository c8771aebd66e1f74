//! `selfmask` – classify the points of a scene against the robot's own body.
//!
//! ```text
//! selfmask classify <scene.toml> [--config <selfmask.toml>] [--sensor <frame>] [--containment] [--json]
//! selfmask links    <scene.toml> [--config <selfmask.toml>]
//! selfmask init-config [<path>]
//! ```
//!
//! Without `--config` the monitored links default to every link of the
//! scene's robot model with the default inflation.

mod config;
mod scene;
mod telemetry;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use colored::Colorize;
use selfmask_filter::{LabelCounts, ModelResolver, SelfMask, SensorSource, filter_cloud};
use selfmask_perception::{ObjMeshLoader, ShapeFactory};
use selfmask_types::{Label, MaskError};
use serde::Serialize;
use tracing::{info, warn};

use config::{Config, LinkSetting};
use scene::{LoadedScene, Scene};

fn main() -> ExitCode {
    let _guard = telemetry::init_tracing("selfmask");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match parse_args(&args) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{}: {msg}", "error".red().bold());
            eprintln!();
            print_usage();
            return ExitCode::from(2);
        }
    };

    let result = match command {
        Command::Help => {
            print_usage();
            Ok(())
        }
        Command::Version => {
            println!("selfmask {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Command::InitConfig { path } => init_config(&path),
        Command::Links(opts) => list_links(&opts),
        Command::Classify(opts) => classify(&opts),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {e}", "error".red().bold());
            ExitCode::FAILURE
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Arguments
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default)]
struct SceneOptions {
    scene: PathBuf,
    config: Option<PathBuf>,
    sensor: Option<String>,
    containment: bool,
    json: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Help,
    Version,
    InitConfig { path: PathBuf },
    Links(SceneOptions),
    Classify(SceneOptions),
}

fn parse_args(args: &[String]) -> Result<Command, String> {
    let Some((cmd, rest)) = args.split_first() else {
        return Ok(Command::Help);
    };
    match cmd.as_str() {
        "help" | "-h" | "--help" => Ok(Command::Help),
        "version" | "-V" | "--version" => Ok(Command::Version),
        "init-config" => match rest {
            [] => Ok(Command::InitConfig {
                path: PathBuf::from("selfmask.toml"),
            }),
            [path] => Ok(Command::InitConfig {
                path: PathBuf::from(path),
            }),
            _ => Err("init-config takes at most one path".to_string()),
        },
        "links" => parse_scene_options(rest).map(Command::Links),
        "classify" => parse_scene_options(rest).map(Command::Classify),
        other => Err(format!("unknown command '{other}'")),
    }
}

fn parse_scene_options(args: &[String]) -> Result<SceneOptions, String> {
    let mut opts = SceneOptions::default();
    let mut scene = None;
    let mut it = args.iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let v = it.next().ok_or("--config needs a path")?;
                opts.config = Some(PathBuf::from(v));
            }
            "--sensor" | "-s" => {
                let v = it.next().ok_or("--sensor needs a frame name")?;
                opts.sensor = Some(v.clone());
            }
            "--containment" => opts.containment = true,
            "--json" => opts.json = true,
            flag if flag.starts_with('-') => return Err(format!("unknown option '{flag}'")),
            path if scene.is_none() => scene = Some(PathBuf::from(path)),
            extra => return Err(format!("unexpected argument '{extra}'")),
        }
    }
    opts.scene = scene.ok_or("missing scene file")?;
    Ok(opts)
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

fn init_config(path: &Path) -> Result<(), MaskError> {
    let mut cfg = Config::default();
    cfg.links.push(LinkSetting {
        name: "base_link".to_string(),
        scale: None,
        padding: None,
    });
    config::save_to(&cfg, path)?;
    println!(
        "  {} Config written to {}",
        "✓".green().bold(),
        path.display().to_string().bold()
    );
    Ok(())
}

/// Load the config (or defaults monitoring every model link) and the scene,
/// then configure a mask.
fn prepare(opts: &SceneOptions) -> Result<(Config, LoadedScene, SelfMask), MaskError> {
    let mut cfg = match &opts.config {
        Some(path) => config::load_from(path)?,
        None => {
            let mut cfg = Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
    };
    if let Some(sensor) = &opts.sensor {
        cfg.sensor_frame = sensor.clone();
    }

    let scene = Scene::load(&opts.scene)?;
    if cfg.links.is_empty()
        && let Some(model) = &scene.model
    {
        cfg.links = model
            .links
            .iter()
            .map(|l| LinkSetting {
                name: l.name.clone(),
                scale: None,
                padding: None,
            })
            .collect();
    }

    let factory = ShapeFactory::new(Arc::new(ObjMeshLoader::new(cfg.mesh_root.clone())));
    let mut mask = SelfMask::new(scene.tf.clone(), factory, cfg.mask.clone());
    let report = mask.configure(
        scene.model.as_ref().map(|m| m as &dyn ModelResolver),
        &cfg.link_infos(),
    )?;
    for link in &report.missing {
        warn!(link = %link, "link has no collision geometry");
    }
    for skipped in &report.skipped {
        warn!(link = %skipped.name, reason = %skipped.reason, "link skipped");
    }
    Ok((cfg, scene, mask))
}

fn list_links(opts: &SceneOptions) -> Result<(), MaskError> {
    let (_cfg, _scene, mask) = prepare(opts)?;
    let links = mask.monitored_links();
    if links.is_empty() {
        println!("  {}", "No links monitored.".yellow());
        return Ok(());
    }
    println!("  {} monitored link(s), largest first:", links.len());
    for (link, body) in links.iter().zip(mask.bodies().links()) {
        println!(
            "    • {} {}",
            link.bold(),
            format!("({:?}, {:.4} m³)", body.scaled.kind(), body.volume).dimmed()
        );
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct ClassifyReport<'a> {
    frame_id: &'a str,
    mode: &'static str,
    monitored: Vec<String>,
    counts: LabelCounts,
    labels: Vec<u8>,
}

fn classify(opts: &SceneOptions) -> Result<(), MaskError> {
    let (cfg, scene, mut mask) = prepare(opts)?;
    let cloud = &scene.cloud;

    let sensor = if opts.containment || cfg.sensor_frame.is_empty() {
        SensorSource::None
    } else {
        SensorSource::Frame(cfg.sensor_frame.clone())
    };
    let mode = if sensor.is_none() {
        "containment"
    } else {
        "intersection"
    };
    let labels = mask.classify_intersection(cloud, &sensor, cfg.min_sensor_dist, None);
    let filtered = filter_cloud(cloud, &labels);
    info!(
        mode,
        points = cloud.len(),
        kept = filtered.kept.len(),
        removed = filtered.removed.len(),
        "cloud classified"
    );

    if opts.json {
        let report = ClassifyReport {
            frame_id: &cloud.frame_id,
            mode,
            monitored: mask.monitored_links(),
            counts: filtered.counts,
            labels: labels.iter().map(|l| l.code()).collect(),
        };
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| MaskError::Config(format!("failed to serialize report: {e}")))?;
        println!("{json}");
        return Ok(());
    }

    println!(
        "  {} points in '{}' ({} mode)",
        cloud.len(),
        cloud.frame_id.bold(),
        mode
    );
    for (p, label) in cloud.points.iter().zip(&labels) {
        let tag = match label {
            Label::Inside => "inside ".red(),
            Label::Outside => "outside".green(),
            Label::Shadow => "shadow ".yellow(),
        };
        println!("    {tag}  ({:>8.3}, {:>8.3}, {:>8.3})", p.x, p.y, p.z);
    }
    let c = filtered.counts;
    println!();
    println!(
        "  {} inside, {} shadow, {} outside – {} point(s) kept",
        c.inside.to_string().red().bold(),
        c.shadow.to_string().yellow().bold(),
        c.outside.to_string().green().bold(),
        filtered.kept.len()
    );
    Ok(())
}

fn print_usage() {
    println!("{} {}", "selfmask".bold(), env!("CARGO_PKG_VERSION").dimmed());
    println!("  Robot self filtering for point clouds.");
    println!();
    println!("  {}", "USAGE".bold());
    println!("    selfmask classify <scene.toml> [--config <path>] [--sensor <frame>] [--containment] [--json]");
    println!("    selfmask links <scene.toml> [--config <path>]");
    println!("    selfmask init-config [<path>]");
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
