use crate::camera::PerspectiveCamera;
use crate::render_loop::Renderer;
use crate::scene::{Light, Scene};
use orbitview_common::SurfaceSize;
use std::convert::Infallible;
use std::fmt::Write as _;

/// Headless text renderer.
///
/// Produces a human-readable description of each frame instead of pixels.
/// Useful for CLI output, logging, and testing the render loop without a GPU.
#[derive(Debug)]
pub struct DebugTextRenderer {
    display: SurfaceSize,
    surface: Option<SurfaceSize>,
    frames: u64,
    last_frame: String,
}

impl DebugTextRenderer {
    pub fn new(display: SurfaceSize) -> Self {
        Self {
            display,
            surface: None,
            frames: 0,
            last_frame: String::new(),
        }
    }

    /// Simulate the host container changing size.
    pub fn set_display_size(&mut self, size: SurfaceSize) {
        self.display = size;
    }

    /// Size of the drawing buffer after the last resize.
    pub fn surface_size(&self) -> Option<SurfaceSize> {
        self.surface
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames
    }

    pub fn last_frame(&self) -> &str {
        &self.last_frame
    }

    fn describe(&self, scene: &Scene, camera: &PerspectiveCamera) -> String {
        let mut out = String::new();
        let surface = self
            .surface
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unsized".into());
        let bg = scene.background;

        // writing to a String cannot fail
        let _ = writeln!(out, "=== Frame {} ({surface}) ===", self.frames);
        let _ = writeln!(out, "Background: ({:.2}, {:.2}, {:.2})", bg[0], bg[1], bg[2]);
        let p = camera.position;
        let t = camera.target();
        let _ = writeln!(
            out,
            "Camera: eye=({:.2}, {:.2}, {:.2}) target=({:.2}, {:.2}, {:.2}) fov={:.0} aspect={:.3} near={:.3} far={:.1}",
            p.x, p.y, p.z, t.x, t.y, t.z, camera.fov_degrees, camera.aspect, camera.near, camera.far
        );
        if let Some(floor) = &scene.floor {
            let _ = writeln!(out, "Floor: size={} repeats={}", floor.size, floor.repeats());
        }
        for light in &scene.lights {
            match light {
                Light::Hemisphere { intensity, .. } => {
                    let _ = writeln!(out, "Light: hemisphere intensity={intensity}");
                }
                Light::Directional {
                    intensity, position, ..
                } => {
                    let _ = writeln!(
                        out,
                        "Light: directional intensity={intensity} from=({:.1}, {:.1}, {:.1})",
                        position.x, position.y, position.z
                    );
                }
            }
        }
        let _ = writeln!(out, "Controllers: {}", scene.controllers.len());
        let _ = writeln!(out, "Models: {}", scene.models().len());
        for node in scene.models() {
            let _ = writeln!(
                out,
                "  [{}] {} meshes={} vertices={}",
                node.id.short(),
                node.model.resource_id,
                node.model.meshes.len(),
                node.model.vertex_count()
            );
        }
        out
    }
}

impl Renderer for DebugTextRenderer {
    type Error = Infallible;

    fn display_size(&self) -> SurfaceSize {
        self.display
    }

    fn resize(&mut self, size: SurfaceSize) {
        self.surface = Some(size);
    }

    fn draw(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<(), Infallible> {
        self.frames += 1;
        self.last_frame = self.describe(scene, camera);
        Ok(())
    }
}
