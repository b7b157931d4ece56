//! lumen CLI - render the built-in scenes to PNG
//!
//! Runs the path tracer for a number of frames so reservoir reuse can settle,
//! then writes the last frame.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lumen_math::{Point3, Transform, Vec3};
use lumen_render::{Camera, Environment, RenderConfig, Renderer, SeedMode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod scenes;

use scenes::SceneKind;

#[derive(Parser)]
#[command(name = "lumen")]
#[command(about = "Real-time path tracer with reservoir-resampled direct lighting", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a built-in scene to a PNG file
    Render {
        /// Scene to render
        #[arg(short, long, value_enum, default_value = "cornell")]
        scene: SceneKind,
        /// TOML file with [render] and [environment] tables
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Output PNG path
        #[arg(short, long, default_value = "lumen.png")]
        output: PathBuf,
        /// Frames to render; only the last one is written
        #[arg(short, long, default_value_t = 8)]
        frames: u32,
        /// Camera orbit per frame, in degrees (0 keeps the camera still)
        #[arg(long, default_value_t = 0.0)]
        orbit: f32,
        /// Override image width
        #[arg(long)]
        width: Option<u32>,
        /// Override image height
        #[arg(long)]
        height: Option<u32>,
        /// Override samples per pixel
        #[arg(long)]
        spp: Option<u32>,
        /// Reuse the same random streams every frame, keyed by this value
        #[arg(long)]
        lock_seed: Option<u32>,
    },
    /// Print the effective configuration as TOML
    Config {
        /// TOML file to merge over the defaults
        config: Option<PathBuf>,
    },
    /// Display acceleration structure statistics for a scene
    Info {
        /// Scene to inspect
        #[arg(value_enum)]
        scene: SceneKind,
    },
}

/// Contents of a `--config` file.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct FileConfig {
    render: RenderConfig,
    environment: Environment,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            scene,
            config,
            output,
            frames,
            orbit,
            width,
            height,
            spp,
            lock_seed,
        } => {
            let mut file = load_config(config.as_deref())?;
            let render = &mut file.render;
            if let Some(width) = width {
                render.width = width;
            }
            if let Some(height) = height {
                render.height = height;
            }
            if let Some(spp) = spp {
                render.spp = spp;
            }
            if let Some(lock) = lock_seed {
                render.seed = SeedMode::Locked(lock);
            }
            render_scene(scene, file, frames, orbit, &output)?;
        }
        Commands::Config { config } => {
            let file = load_config(config.as_deref())?;
            print!("{}", toml::to_string(&file)?);
        }
        Commands::Info { scene } => {
            show_info(scene)?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<FileConfig> {
    let Some(path) = path else {
        return Ok(FileConfig::default());
    };
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let file: FileConfig = toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    debug!(path = %path.display(), "loaded config");
    Ok(file)
}

/// Camera for `frame`, orbiting the view target about +Y.
fn orbit_camera(view: &scenes::View, frame: u32, orbit_deg: f32, aspect: f32) -> Camera {
    let angle = (frame as f32 * orbit_deg).to_radians();
    let spin = Transform::translation(view.at.x, view.at.y, view.at.z)
        .then(&Transform::rotation_y(angle))
        .then(&Transform::translation(-view.at.x, -view.at.y, -view.at.z));
    let from = spin.apply_point(&view.from);
    Camera::look_at(from, view.at, Vec3::y(), view.vfov_deg, aspect)
}

fn render_scene(kind: SceneKind, file: FileConfig, frames: u32, orbit: f32, output: &Path) -> Result<()> {
    if frames == 0 {
        anyhow::bail!("--frames must be at least 1");
    }

    let start = Instant::now();
    let (scene, view) = scenes::build(kind)?;
    info!(
        scene = ?kind,
        instances = scene.instances.len(),
        tlas_nodes = scene.tlas_nodes.len(),
        blas_nodes = scene.blas_nodes.len(),
        elapsed_ms = start.elapsed().as_secs_f64() * 1e3,
        "scene built"
    );

    let aspect = file.render.aspect();
    let mut renderer = Renderer::new(Arc::new(scene), file.render, file.environment)?;

    let mut last = None;
    for frame in 0..frames {
        let camera = orbit_camera(&view, frame, orbit, aspect);
        let start = Instant::now();
        let image = renderer.render_frame(&camera)?;
        info!(frame, elapsed_ms = start.elapsed().as_secs_f64() * 1e3, "frame done");
        last = Some(image);
    }

    let Some(frame) = last else {
        anyhow::bail!("no frame rendered");
    };
    let image = image::RgbaImage::from_raw(frame.width, frame.height, frame.color_bytes().to_vec())
        .context("colour buffer does not match the frame size")?;
    image
        .save(output)
        .with_context(|| format!("writing {}", output.display()))?;

    println!(
        "Rendered {} frame(s) of {:?} at {}x{} to {}",
        frames,
        kind,
        frame.width,
        frame.height,
        output.display()
    );
    Ok(())
}

fn show_info(kind: SceneKind) -> Result<()> {
    let (scene, view) = scenes::build(kind)?;
    let bounds = scene.bounds();

    println!("lumen scene: {kind:?}");
    println!("  Instances: {}", scene.instances.len());
    println!("  Spheres: {}", scene.spheres.len());
    println!("  Triangles: {}", scene.triangles.len());
    println!("  Materials: {}", scene.materials.len());
    println!("  Textures: {}", scene.textures.len());
    println!(
        "  TLAS: {} nodes ({} bytes)",
        scene.tlas_nodes.len(),
        scene.tlas_bytes().len()
    );
    println!(
        "  BLAS: {} nodes ({} bytes)",
        scene.blas_nodes.len(),
        scene.blas_bytes().len()
    );
    println!(
        "  Bounds: [{:.2}, {:.2}, {:.2}] - [{:.2}, {:.2}, {:.2}]",
        bounds.min.x, bounds.min.y, bounds.min.z, bounds.max.x, bounds.max.y, bounds.max.z
    );
    let eye: Point3 = view.from;
    println!("  Camera: from ({:.1}, {:.1}, {:.1})", eye.x, eye.y, eye.z);
    Ok(())
}
