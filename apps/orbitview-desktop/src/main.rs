use anyhow::{Context as _, Result};
use clap::Parser;
use egui::Context as EguiContext;
use glam::{Vec2, Vec3};
use orbitview_assets::{FsModelLoader, ModelRef, ResourceLoadError};
use orbitview_common::SurfaceSize;
use orbitview_input::{Action, ControllerId, NoopControllerHooks};
use orbitview_render::{
    Framing, FrameScheduler, FramingMode, PerspectiveCamera, RenderLoop, RenderLoopError,
    Renderer, Scene, SceneConfig, SceneContext,
};
use orbitview_render_wgpu::WgpuRenderer;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

/// Consecutive draw failures tolerated before the app gives up.
const MAX_DRAW_FAILURES: u32 = 3;

/// Pixels of trackpad scroll per zoom step.
const PIXELS_PER_ZOOM_STEP: f32 = 50.0;

#[derive(Parser)]
#[command(name = "orbitview-desktop", about = "Orbit viewer for a single OBJ model")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Directory model and material paths are resolved against
    #[arg(long, default_value = ".")]
    assets_dir: PathBuf,

    /// Geometry file (OBJ)
    #[arg(long, default_value = "3d-model.obj")]
    model: String,

    /// Material library (MTL)
    #[arg(long, default_value = "3d-model.mtl")]
    material: String,

    /// Ignore --material and use the OBJ's own mtllib, if any
    #[arg(long)]
    no_material: bool,

    /// Scene configuration (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Framing mode override: look-at or fit
    #[arg(long)]
    framing: Option<FramingMode>,
}

#[derive(Debug, thiserror::Error)]
enum FrameError {
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
}

/// Redraw requests routed to the window's refresh cycle.
struct WindowScheduler(Arc<Window>);

impl FrameScheduler for WindowScheduler {
    fn request_frame(&self) {
        self.0.request_redraw();
    }
}

/// Values shown in the overlay that the renderer cannot see on its own.
#[derive(Debug, Clone)]
struct HudInfo {
    visible: bool,
    load_status: String,
    framing_mode: FramingMode,
    orbit_target: Vec3,
    orbit_distance: f32,
    frames: u64,
    resizes: u64,
}

impl Default for HudInfo {
    fn default() -> Self {
        Self {
            visible: true,
            load_status: String::new(),
            framing_mode: FramingMode::default(),
            orbit_target: Vec3::ZERO,
            orbit_distance: 0.0,
            frames: 0,
            resizes: 0,
        }
    }
}

/// Window surface, GPU device, scene renderer and egui overlay.
struct GpuSurface {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    renderer: WgpuRenderer,
    egui_ctx: EguiContext,
    egui_winit: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
    hud: HudInfo,
}

impl GpuSurface {
    fn new(window: Arc<Window>) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("create surface")?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("no compatible GPU adapter")?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("orbitview_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .context("create device")?;

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .context("surface reports no formats")?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let renderer = WgpuRenderer::new(&device, &queue, surface_format, config.width, config.height);

        let egui_ctx = EguiContext::default();
        let egui_winit = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(&device, surface_format, None, 1, false);

        tracing::info!(
            backend = adapter.get_info().backend.to_str(),
            format = ?surface_format,
            "GPU initialized"
        );

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            renderer,
            egui_ctx,
            egui_winit,
            egui_renderer,
            hud: HudInfo::default(),
        })
    }

    /// Reapply the current configuration after a lost or outdated surface.
    fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
    }

    fn draw_hud(&mut self, view: &wgpu::TextureView, scene: &Scene, camera: &PerspectiveCamera) {
        let raw_input = self.egui_winit.take_egui_input(&self.window);
        let hud = &self.hud;
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            hud_ui(ctx, hud, scene, camera);
        });

        self.egui_winit
            .handle_platform_output(&self.window, full_output.platform_output);

        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer
                .update_texture(&self.device, &self.queue, *id, image_delta);
        }
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("egui_encoder"),
            });
        self.egui_renderer.update_buffers(
            &self.device,
            &self.queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );
        {
            let mut pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui_pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    ..Default::default()
                })
                .forget_lifetime();
            self.egui_renderer
                .render(&mut pass, &paint_jobs, &screen_descriptor);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }
}

impl Renderer for GpuSurface {
    type Error = FrameError;

    fn display_size(&self) -> SurfaceSize {
        let size = self.window.inner_size();
        SurfaceSize::new(size.width, size.height)
    }

    fn resize(&mut self, size: SurfaceSize) {
        self.config.width = size.width;
        self.config.height = size.height;
        self.surface.configure(&self.device, &self.config);
        self.renderer.resize(&self.device, size.width, size.height);
    }

    fn draw(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<(), FrameError> {
        if self.display_size().is_zero_area() {
            // minimized: nothing to present into
            return Ok(());
        }

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.renderer.sync_scene(&self.device, &self.queue, scene);
        self.renderer
            .render(&self.device, &self.queue, &view, scene, camera);

        if self.hud.visible {
            self.draw_hud(&view, scene, camera);
        }

        output.present();
        Ok(())
    }
}

fn hud_ui(ctx: &EguiContext, hud: &HudInfo, scene: &Scene, camera: &PerspectiveCamera) {
    egui::Window::new("orbitview")
        .default_pos([12.0, 12.0])
        .resizable(false)
        .show(ctx, |ui| {
            ui.label(hud.load_status.as_str());
            ui.label(format!("Models: {}", scene.models().len()));
            ui.separator();

            ui.label(format!(
                "Camera: ({:.2}, {:.2}, {:.2})",
                camera.position.x, camera.position.y, camera.position.z
            ));
            ui.label(format!(
                "fov {:.0}  aspect {:.3}  near {:.3}  far {:.1}",
                camera.fov_degrees, camera.aspect, camera.near, camera.far
            ));
            ui.label(format!(
                "Orbit: target ({:.2}, {:.2}, {:.2})  distance {:.2}",
                hud.orbit_target.x, hud.orbit_target.y, hud.orbit_target.z, hud.orbit_distance
            ));
            ui.label(format!("Framing: {:?}", hud.framing_mode));
            ui.separator();

            ui.label(format!("Frames: {}  Resizes: {}", hud.frames, hud.resizes));
            ui.small("F1: Toggle HUD | LMB: Orbit | Wheel: Zoom | RMB: Select");
        });
}

/// Scene state plus desktop input tracking.
struct AppState {
    ctx: SceneContext,
    hooks: NoopControllerHooks,
    show_hud: bool,
    dragging: bool,
    cursor: Option<Vec2>,
    load_status: String,
    draw_failures: u32,
}

impl AppState {
    fn new(ctx: SceneContext, loading: &str) -> Self {
        Self {
            ctx,
            hooks: NoopControllerHooks,
            show_hud: true,
            dragging: false,
            cursor: None,
            load_status: format!("Loading {loading}..."),
            draw_failures: 0,
        }
    }

    fn apply(&mut self, action: Action) {
        self.ctx.handle_action(&action, &mut self.hooks);
    }

    fn handle_key(&mut self, key: KeyCode, event_loop: &ActiveEventLoop) {
        match key {
            KeyCode::F1 => self.show_hud = !self.show_hud,
            KeyCode::Escape => event_loop.exit(),
            _ => {}
        }
    }

    fn handle_mouse_button(&mut self, button: MouseButton, pressed: bool) {
        match button {
            MouseButton::Left => {
                self.dragging = pressed;
            }
            // controller 0 trigger stand-in
            MouseButton::Right => {
                let id = ControllerId(0);
                self.apply(if pressed {
                    Action::SelectStart(id)
                } else {
                    Action::SelectEnd(id)
                });
            }
            _ => {}
        }
    }

    /// A button event the HUD consumed. A left release still ends the drag,
    /// otherwise the orbit would stick to the cursor after leaving the HUD.
    fn handle_consumed_mouse_button(&mut self, button: MouseButton, pressed: bool) {
        if button == MouseButton::Left && !pressed {
            self.dragging = false;
        }
    }

    fn handle_cursor(&mut self, position: Vec2) {
        if let Some(last) = self.cursor.replace(position) {
            if self.dragging {
                self.apply(Action::Orbit(position - last));
            }
        }
    }

    fn handle_wheel(&mut self, delta: MouseScrollDelta) {
        let steps = match delta {
            MouseScrollDelta::LineDelta(_, y) => y,
            MouseScrollDelta::PixelDelta(p) => p.y as f32 / PIXELS_PER_ZOOM_STEP,
        };
        if steps != 0.0 {
            self.apply(Action::Zoom(steps));
        }
    }

    fn on_load(&mut self, result: Result<Framing, ResourceLoadError>) {
        self.load_status = match result {
            Ok(framing) => format!(
                "Loaded: size {:.2} at ({:.2}, {:.2}, {:.2})",
                framing.size, framing.center.x, framing.center.y, framing.center.z
            ),
            Err(e) => {
                tracing::error!("{e}");
                format!("Load failed: {e}")
            }
        };
    }

    fn hud_info(&self, render_loop: &RenderLoop<WindowScheduler>) -> HudInfo {
        HudInfo {
            visible: self.show_hud,
            load_status: self.load_status.clone(),
            framing_mode: self.ctx.framing_mode(),
            orbit_target: self.ctx.controls.target,
            orbit_distance: self.ctx.controls.distance(&self.ctx.camera),
            frames: render_loop.frames(),
            resizes: render_loop.resizes(),
        }
    }
}

struct App {
    state: AppState,
    gpu: Option<GpuSurface>,
    render_loop: Option<RenderLoop<WindowScheduler>>,
}

impl App {
    fn new(state: AppState) -> Self {
        Self {
            state,
            gpu: None,
            render_loop: None,
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let (Some(gpu), Some(render_loop)) = (&mut self.gpu, &mut self.render_loop) else {
            return;
        };

        if let Some(result) = self.state.ctx.poll_model_load() {
            self.state.on_load(result);
        }
        gpu.hud = self.state.hud_info(render_loop);

        let ctx = &mut self.state.ctx;
        match render_loop.tick(gpu, &ctx.scene, &mut ctx.camera) {
            Ok(_) => self.state.draw_failures = 0,
            Err(RenderLoopError::DrawFailure { frame, .. }) => {
                self.state.draw_failures += 1;
                if self.state.draw_failures >= MAX_DRAW_FAILURES {
                    tracing::error!(
                        frame,
                        failures = self.state.draw_failures,
                        "giving up after repeated draw failures"
                    );
                    event_loop.exit();
                    return;
                }
                gpu.reconfigure();
                render_loop.resume();
            }
            Err(e @ RenderLoopError::Halted) => {
                tracing::warn!("{e}");
            }
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() {
            return;
        }

        let attrs = Window::default_attributes()
            .with_title("orbitview")
            .with_inner_size(PhysicalSize::new(1280u32, 720));
        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                tracing::error!("failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };

        let gpu = match GpuSurface::new(window.clone()) {
            Ok(gpu) => gpu,
            Err(e) => {
                tracing::error!("failed to initialize GPU: {e:#}");
                event_loop.exit();
                return;
            }
        };

        let mut render_loop = RenderLoop::new(WindowScheduler(window));
        render_loop.start();

        self.gpu = Some(gpu);
        self.render_loop = Some(render_loop);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let Some(gpu) = &mut self.gpu {
            let response = gpu.egui_winit.on_window_event(&gpu.window, &event);
            if response.consumed {
                if let WindowEvent::MouseInput { button, state, .. } = event {
                    self.state
                        .handle_consumed_mouse_button(button, state == ElementState::Pressed);
                }
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                self.state.handle_key(key, event_loop);
            }
            WindowEvent::MouseInput {
                button,
                state: btn_state,
                ..
            } => {
                self.state
                    .handle_mouse_button(button, btn_state == ElementState::Pressed);
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.state
                    .handle_cursor(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::CursorLeft { .. } => {
                self.state.cursor = None;
            }
            WindowEvent::MouseWheel { delta, .. } => {
                self.state.handle_wheel(delta);
            }
            // a zero-area tick parks the loop until the window is visible again
            WindowEvent::Resized(size) if size.width > 0 && size.height > 0 => {
                if let Some(render_loop) = &mut self.render_loop {
                    render_loop.wake();
                }
            }
            WindowEvent::Occluded(false) => {
                if let Some(render_loop) = &mut self.render_loop {
                    render_loop.wake();
                }
            }
            WindowEvent::RedrawRequested => {
                self.redraw(event_loop);
            }
            _ => {}
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("orbitview-desktop starting");

    let mut config = match &cli.config {
        Some(path) => SceneConfig::load(path)
            .with_context(|| format!("loading scene config {}", path.display()))?,
        None => SceneConfig::default(),
    };
    if let Some(framing) = cli.framing {
        config.framing = framing;
    }

    let mut model = ModelRef::new(cli.model);
    if !cli.no_material {
        model = model.with_material(cli.material);
    }

    let mut ctx = SceneContext::new(&config);
    let loading = model.resource_id().to_string();
    ctx.begin_model_load(FsModelLoader::new(cli.assets_dir), model);

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(AppState::new(ctx, &loading));
    event_loop.run_app(&mut app)?;

    Ok(())
}
