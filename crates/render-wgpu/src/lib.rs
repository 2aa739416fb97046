//! wgpu render backend for orbitview.
//!
//! Draws a checkered floor plane and the scene's models, lit by one hemisphere
//! light and one directional light. Materials with a decoded `map_Kd` are
//! sampled from their texture; the rest draw their flat diffuse color.
//!
//! # Invariants
//! - The renderer never mutates the scene or the camera.
//! - Model geometry is uploaded once per scene node and dropped with it.

mod gpu;
mod shaders;

pub use gpu::WgpuRenderer;
