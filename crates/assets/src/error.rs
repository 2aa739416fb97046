/// Errors from reading or parsing a model resource.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("OBJ/MTL error: {0}")]
    Wavefront(#[from] tobj::LoadError),
    #[error("texture error: {0}")]
    Image(#[from] image::ImageError),
    #[error("model has no geometry with a non-zero extent")]
    EmptyGeometry,
    #[error("load was dropped before it completed")]
    Canceled,
}

/// A model load failed. Carries the id of the resource that could not be read.
#[derive(Debug, thiserror::Error)]
#[error("failed to load resource `{resource_id}`: {source}")]
pub struct ResourceLoadError {
    pub resource_id: String,
    #[source]
    pub source: AssetError,
}

impl ResourceLoadError {
    pub fn new(resource_id: impl Into<String>, source: AssetError) -> Self {
        Self {
            resource_id: resource_id.into(),
            source,
        }
    }
}
