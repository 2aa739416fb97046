use anyhow::Context as _;
use clap::{Parser, Subcommand};
use orbitview_assets::{FsModelLoader, ModelLoader, ModelRef};
use orbitview_common::SurfaceSize;
use orbitview_render::{
    DebugTextRenderer, Framing, FramingMode, ManualScheduler, RenderLoop, SceneConfig,
    SceneContext,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "orbitview-cli", about = "Headless orbitview tool")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Load a model and print its meshes, bounds, and framing
    Inspect {
        /// Geometry file (OBJ), relative to --assets-dir
        geometry: String,
        /// Material library (MTL)
        #[arg(long)]
        material: Option<String>,
        #[arg(long, default_value = ".")]
        assets_dir: PathBuf,
    },
    /// Load, frame, and run the render loop headlessly
    Frame {
        #[arg(long, default_value = "3d-model.obj")]
        model: String,
        #[arg(long)]
        material: Option<String>,
        #[arg(long, default_value = ".")]
        assets_dir: PathBuf,
        /// Initial display size
        #[arg(long, default_value = "800x600")]
        size: SurfaceSize,
        /// Number of ticks to run
        #[arg(short, long, default_value = "3")]
        ticks: u64,
        /// Simulated display refresh interval in milliseconds
        #[arg(long, default_value = "16")]
        frame_ms: u64,
        /// Change the display size halfway through
        #[arg(long)]
        resize_to: Option<SurfaceSize>,
        /// Scene configuration (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Framing mode override: look-at or fit
        #[arg(long)]
        framing: Option<FramingMode>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Info => {
            println!("orbitview-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("assets: {}", orbitview_assets::crate_info());
            println!("input: {}", orbitview_input::crate_info());
            println!("render: {}", orbitview_render::crate_info());
        }
        Commands::Inspect {
            geometry,
            material,
            assets_dir,
        } => {
            let mut model = ModelRef::new(geometry);
            if let Some(material) = material {
                model = model.with_material(material);
            }
            let loaded = FsModelLoader::new(assets_dir).load(&model)?;

            println!("Model: {}", loaded.resource_id);
            println!(
                "Meshes: {}  Vertices: {}  Triangles: {}",
                loaded.meshes.len(),
                loaded.vertex_count(),
                loaded.triangle_count()
            );
            for mesh in &loaded.meshes {
                let color = loaded.material_for(mesh).base_color();
                println!(
                    "  {} material={} vertices={} triangles={} color=({:.2}, {:.2}, {:.2}, {:.2})",
                    mesh.name,
                    mesh.material.as_deref().unwrap_or("-"),
                    mesh.vertex_count(),
                    mesh.triangle_count(),
                    color[0],
                    color[1],
                    color[2],
                    color[3]
                );
            }

            match Framing::from_bounds(&loaded.bounds) {
                Some(framing) => {
                    let (min, max) = (loaded.bounds.min, loaded.bounds.max);
                    println!(
                        "Bounds: min=({:.3}, {:.3}, {:.3}) max=({:.3}, {:.3}, {:.3})",
                        min.x, min.y, min.z, max.x, max.y, max.z
                    );
                    print_framing(&framing, SceneConfig::default().camera.fov_degrees);
                }
                None => println!("Bounds: empty (model cannot be framed)"),
            }
        }
        Commands::Frame {
            model,
            material,
            assets_dir,
            size,
            ticks,
            frame_ms,
            resize_to,
            config,
            framing,
        } => {
            let mut config = match config {
                Some(path) => SceneConfig::load(&path)
                    .with_context(|| format!("loading scene config {}", path.display()))?,
                None => SceneConfig::default(),
            };
            if let Some(framing) = framing {
                config.framing = framing;
            }

            let mut model_ref = ModelRef::new(model);
            if let Some(material) = material {
                model_ref = model_ref.with_material(material);
            }

            // the loop ticks while the model loads; framing lands between ticks
            let mut ctx = SceneContext::new(&config);
            ctx.begin_model_load(FsModelLoader::new(assets_dir), model_ref);

            let mut renderer = DebugTextRenderer::new(size);
            let mut render_loop = RenderLoop::new(ManualScheduler::new());
            render_loop.start();

            for i in 0..ticks {
                if !render_loop.scheduler().take_request() {
                    break;
                }
                if i > 0 {
                    std::thread::sleep(Duration::from_millis(frame_ms));
                }
                report_load(&mut ctx);
                if let Some(new_size) = resize_to {
                    if i == ticks / 2 {
                        renderer.set_display_size(new_size);
                    }
                }
                let report = render_loop.tick(&mut renderer, &ctx.scene, &mut ctx.camera)?;
                print!("{}", renderer.last_frame());
                println!("resized: {}\n", report.resized);
            }

            if ctx.is_loading() {
                tracing::warn!(ticks, "model still loading when the tick budget ran out");
            }
            println!(
                "Ran {} frames, {} resizes, final size {}",
                render_loop.frames(),
                render_loop.resizes(),
                render_loop
                    .last_size()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "unsized".into())
            );
        }
    }

    Ok(())
}

/// Apply a finished load, if any. Returns true on the tick it resolved.
fn report_load(ctx: &mut SceneContext) -> bool {
    match ctx.poll_model_load() {
        Some(Ok(framing)) => print_framing(&framing, ctx.camera.fov_degrees),
        // the scene still renders, unframed
        Some(Err(e)) => tracing::warn!("load failed, rendering unframed: {e}"),
        None => return false,
    }
    true
}

fn print_framing(framing: &Framing, fov_degrees: f32) {
    let c = framing.center;
    println!(
        "Framing: size={:.3} center=({:.3}, {:.3}, {:.3})",
        framing.size, c.x, c.y, c.z
    );
    println!(
        "  near={:.4} far={:.2} max_orbit={:.2} fit_distance={:.2}",
        framing.near(),
        framing.far(),
        framing.max_orbit_distance(),
        framing.fit_distance(fov_degrees)
    );
}
