//! Shared types for the orbitview workspace.
//!
//! Nothing here knows about files, GPUs, or windows.

mod bounds;
mod types;

pub use bounds::Aabb;
pub use types::{NodeId, SurfaceSize, Transform, hex_rgb};
