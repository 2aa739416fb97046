//! Model loading: OBJ/MTL through `tobj`, diffuse textures through `image`,
//! and single-shot asynchronous load tasks.
//!
//! Models are named by resource ids relative to a loader root. Every failure
//! carries the id of the resource that could not be read or parsed.
//!
//! # Invariants
//! - A [`ModelLoadTask`] resolves exactly once: model or [`ResourceLoadError`].
//! - Only the geometry and an explicit material library are fatal. Missing
//!   `mtllib` files and textures are logged and skipped.

mod error;
mod loader;
mod model;
mod task;
mod wavefront;

pub use error::{AssetError, ResourceLoadError};
pub use loader::{FsModelLoader, ModelLoader};
pub use model::{LoadedModel, Material, Mesh, ModelRef, TextureImage};
pub use task::{LoadResult, ModelLoadTask};

pub fn crate_info() -> &'static str {
    "orbitview-assets v0.1.0"
}
