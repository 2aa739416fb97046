//! Rendering adapter: renderer-agnostic scene bootstrap and render loop.
//!
//! # Invariants
//! - After any resize the camera aspect equals the surface width / height.
//! - A completed model load is applied between ticks, never during one.
//! - Draw failures are surfaced, never retried internally.
//!
//! Backends implement [`Renderer`]. [`DebugTextRenderer`] is the headless
//! implementation used by the CLI and tests; the wgpu backend lives in
//! `orbitview-render-wgpu`.

mod camera;
mod config;
mod context;
mod orbit;
mod render_loop;
mod renderer;
mod scene;

pub use camera::PerspectiveCamera;
pub use config::{
    CameraConfig, ConfigError, DirectionalConfig, FloorConfig, FramingMode, HemisphereConfig,
    OrbitConfig, SceneConfig, XrConfig,
};
pub use context::{
    Framing, SceneContext, build_scene, frame_area, initialize_scene, load_model_and_frame,
};
pub use orbit::OrbitControls;
pub use render_loop::{
    FrameScheduler, LoopState, ManualScheduler, RenderLoop, RenderLoopError, Renderer, TickReport,
};
pub use renderer::DebugTextRenderer;
pub use scene::{ControllerRig, FloorPlane, Light, ModelNode, PointerModel, Scene};

pub fn crate_info() -> &'static str {
    "orbitview-render v0.1.0"
}
