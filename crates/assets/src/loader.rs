use crate::error::{AssetError, ResourceLoadError};
use crate::model::{LoadedModel, Material, ModelRef, TextureImage};
use crate::wavefront;
use std::cell::Cell;
use std::collections::BTreeMap;
use std::io::Read as _;
use std::path::{Path, PathBuf};

/// Resolves a [`ModelRef`] into parsed geometry and materials.
///
/// Loaders are synchronous; [`crate::ModelLoadTask`] runs them off the render
/// thread and hands back a single-shot future.
pub trait ModelLoader {
    fn load(&self, model: &ModelRef) -> Result<LoadedModel, ResourceLoadError>;
}

/// Loads OBJ/MTL files and their diffuse textures relative to a root directory.
#[derive(Debug, Clone)]
pub struct FsModelLoader {
    root: PathBuf,
}

impl FsModelLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read(&self, resource_id: &str) -> Result<String, ResourceLoadError> {
        let path = self.root.join(resource_id);
        std::fs::read_to_string(&path)
            .map_err(|e| ResourceLoadError::new(resource_id, AssetError::Io(e)))
    }

    /// An `mtllib` named by the OBJ. Failures are logged; the model still
    /// loads with whatever libraries did resolve.
    fn read_library(&self, resource_id: &str) -> tobj::MTLLoadResult {
        let source = match self.read(resource_id) {
            Ok(source) => source,
            Err(e) => {
                tracing::warn!("skipping material library: {e}");
                return Err(tobj::LoadError::OpenFileFailed);
            }
        };
        tobj::load_mtl_buf(&mut source.as_bytes()).inspect_err(|e| {
            tracing::warn!(resource_id, "skipping material library: {e}");
        })
    }

    fn read_texture(&self, resource_id: &str) -> Result<TextureImage, ResourceLoadError> {
        let bytes = std::fs::read(self.root.join(resource_id))
            .map_err(|e| ResourceLoadError::new(resource_id, AssetError::Io(e)))?;
        let image = image::load_from_memory(&bytes)
            .map_err(|e| ResourceLoadError::new(resource_id, AssetError::Image(e)))?
            .to_rgba8();
        Ok(TextureImage::new(image.width(), image.height(), image.into_raw()))
    }

    /// Decodes every distinct `map_Kd`. A texture that fails leaves its
    /// material drawn in its flat diffuse color.
    fn read_textures(
        &self,
        materials: &BTreeMap<String, Material>,
    ) -> BTreeMap<String, TextureImage> {
        let mut textures = BTreeMap::new();
        for id in materials.values().filter_map(|m| m.diffuse_map.as_deref()) {
            if textures.contains_key(id) {
                continue;
            }
            match self.read_texture(id) {
                Ok(texture) => {
                    textures.insert(id.to_string(), texture);
                }
                Err(e) => tracing::warn!("drawing without texture: {e}"),
            }
        }
        textures
    }
}

impl ModelLoader for FsModelLoader {
    fn load(&self, model: &ModelRef) -> Result<LoadedModel, ResourceLoadError> {
        let _span = tracing::info_span!("load_model", geometry = %model.geometry).entered();

        // Material library first, so a broken MTL fails before the heavier OBJ parse.
        let explicit = match &model.material {
            Some(id) => match tobj::load_mtl_buf(&mut self.read(id)?.as_bytes()) {
                Ok(library) => Some(library),
                Err(e) => return Err(ResourceLoadError::new(id, AssetError::Wavefront(e))),
            },
            None => None,
        };

        let source = self.read(&model.geometry)?;
        // mtllib paths are relative to the OBJ file
        let base = Path::new(&model.geometry)
            .parent()
            .unwrap_or_else(|| Path::new(""));

        // An explicit library replaces every mtllib in the OBJ. It is declared
        // ahead of the OBJ body so usemtl resolves even when the OBJ names none.
        let header: &[u8] = if explicit.is_some() {
            b"mtllib explicit.mtl\n"
        } else {
            b""
        };
        let explicit_served = Cell::new(false);
        let (models, libraries) = tobj::load_obj_buf(
            &mut header.chain(source.as_bytes()),
            &wavefront::LOAD_OPTIONS,
            |lib: &Path| match &explicit {
                Some(library) if !explicit_served.replace(true) => Ok(library.clone()),
                Some(_) => Ok(Default::default()),
                None => self.read_library(&base.join(lib).to_string_lossy()),
            },
        )
        .map_err(|e| ResourceLoadError::new(&model.geometry, AssetError::Wavefront(e)))?;

        let libraries = libraries.unwrap_or_else(|e| {
            tracing::debug!("no material libraries: {e}");
            Vec::new()
        });
        let meshes = models
            .into_iter()
            .map(|m| wavefront::mesh_from(m, &libraries))
            .collect();

        let library_dir = model
            .material
            .as_deref()
            .and_then(|id| Path::new(id).parent())
            .unwrap_or(base);
        let materials: BTreeMap<String, Material> = libraries
            .into_iter()
            .map(|m| {
                let material = wavefront::material_from(m, library_dir);
                (material.name.clone(), material)
            })
            .collect();
        let textures = self.read_textures(&materials);

        let loaded =
            LoadedModel::new(model.geometry.clone(), meshes, materials).with_textures(textures);
        tracing::info!(
            meshes = loaded.meshes.len(),
            vertices = loaded.vertex_count(),
            materials = loaded.materials.len(),
            textures = loaded.textures.len(),
            "model loaded"
        );
        Ok(loaded)
    }
}

impl<L: ModelLoader + ?Sized> ModelLoader for std::sync::Arc<L> {
    fn load(&self, model: &ModelRef) -> Result<LoadedModel, ResourceLoadError> {
        (**self).load(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const OBJ: &str = "mtllib lib.mtl\nv 0 0 0\nv 2 0 0\nv 0 2 0\nusemtl red\nf 1 2 3\n";
    const MTL: &str = "newmtl red\nKd 1 0 0\n";

    #[test]
    fn loads_geometry_and_explicit_material() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("model.obj"), OBJ).unwrap();
        fs::write(dir.path().join("model.mtl"), MTL).unwrap();

        let loader = FsModelLoader::new(dir.path());
        let model = loader
            .load(&ModelRef::new("model.obj").with_material("model.mtl"))
            .unwrap();

        assert_eq!(model.resource_id, "model.obj");
        assert_eq!(model.meshes.len(), 1);
        assert_eq!(model.material_for(&model.meshes[0]).diffuse, [1.0, 0.0, 0.0]);
        assert!((model.bounds.diagonal() - 8.0_f32.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn falls_back_to_mtllib() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("car")).unwrap();
        fs::write(dir.path().join("car/model.obj"), OBJ).unwrap();
        fs::write(dir.path().join("car/lib.mtl"), MTL).unwrap();

        let loader = FsModelLoader::new(dir.path());
        let model = loader.load(&ModelRef::new("car/model.obj")).unwrap();
        assert!(model.materials.contains_key("red"));
    }

    #[test]
    fn missing_mtllib_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("model.obj"), OBJ).unwrap();

        let loader = FsModelLoader::new(dir.path());
        let model = loader.load(&ModelRef::new("model.obj")).unwrap();
        assert!(model.materials.is_empty());
        assert_eq!(model.material_for(&model.meshes[0]).name, "default");
    }

    #[test]
    fn missing_geometry_reports_its_id() {
        let dir = tempfile::tempdir().unwrap();
        let loader = FsModelLoader::new(dir.path());
        let err = loader.load(&ModelRef::new("missing.obj")).unwrap_err();
        assert_eq!(err.resource_id, "missing.obj");
        assert!(matches!(err.source, AssetError::Io(_)));
    }

    #[test]
    fn missing_material_reports_material_id() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("model.obj"), OBJ).unwrap();
        let loader = FsModelLoader::new(dir.path());
        let err = loader
            .load(&ModelRef::new("model.obj").with_material("gone.mtl"))
            .unwrap_err();
        assert_eq!(err.resource_id, "gone.mtl");
    }

    #[test]
    fn parse_failure_reports_geometry_id() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bad.obj"), "v 0 0\n").unwrap();
        let loader = FsModelLoader::new(dir.path());
        let err = loader.load(&ModelRef::new("bad.obj")).unwrap_err();
        assert_eq!(err.resource_id, "bad.obj");
        assert!(matches!(err.source, AssetError::Wavefront(_)));
    }

    #[test]
    fn malformed_material_reports_material_id() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("model.obj"), OBJ).unwrap();
        fs::write(dir.path().join("bad.mtl"), "newmtl red\nKd one two three\n").unwrap();
        let loader = FsModelLoader::new(dir.path());
        let err = loader
            .load(&ModelRef::new("model.obj").with_material("bad.mtl"))
            .unwrap_err();
        assert_eq!(err.resource_id, "bad.mtl");
        assert!(matches!(err.source, AssetError::Wavefront(_)));
    }

    #[test]
    fn explicit_material_applies_without_mtllib() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("plain.obj"),
            "v 0 0 0\nv 2 0 0\nv 0 2 0\nusemtl red\nf 1 2 3\n",
        )
        .unwrap();
        fs::write(dir.path().join("model.mtl"), MTL).unwrap();

        let loader = FsModelLoader::new(dir.path());
        let model = loader
            .load(&ModelRef::new("plain.obj").with_material("model.mtl"))
            .unwrap();
        assert_eq!(model.meshes[0].material.as_deref(), Some("red"));
        assert_eq!(model.materials.len(), 1);
    }

    fn write_png(path: &Path, width: u32, height: u32) {
        image::RgbaImage::from_pixel(width, height, image::Rgba([200, 100, 50, 255]))
            .save(path)
            .unwrap();
    }

    #[test]
    fn diffuse_map_is_decoded() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("car")).unwrap();
        fs::write(dir.path().join("car/model.obj"), OBJ).unwrap();
        fs::write(dir.path().join("car/lib.mtl"), "newmtl red\nKd 1 0 0\nmap_Kd paint.png\n")
            .unwrap();
        write_png(&dir.path().join("car/paint.png"), 4, 2);

        let loader = FsModelLoader::new(dir.path());
        let model = loader.load(&ModelRef::new("car/model.obj")).unwrap();

        let material = model.material_for(&model.meshes[0]);
        let texture = model.texture_for(&material).expect("texture decoded");
        assert_eq!((texture.width, texture.height), (4, 2));
        assert_eq!(texture.rgba.len(), 4 * 2 * 4);
        assert_eq!(&texture.rgba[..4], &[200, 100, 50, 255]);
    }

    #[test]
    fn missing_texture_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("model.obj"), OBJ).unwrap();
        fs::write(dir.path().join("model.mtl"), "newmtl red\nmap_Kd nowhere.png\n").unwrap();

        let loader = FsModelLoader::new(dir.path());
        let model = loader
            .load(&ModelRef::new("model.obj").with_material("model.mtl"))
            .unwrap();
        let material = model.material_for(&model.meshes[0]);
        assert_eq!(material.diffuse_map.as_deref(), Some("nowhere.png"));
        assert!(model.texture_for(&material).is_none());
    }

    #[test]
    fn undecodable_texture_is_reported_by_id() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.png"), "not a png").unwrap();
        let loader = FsModelLoader::new(dir.path());

        let err = loader.read_texture("notes.png").unwrap_err();
        assert_eq!(err.resource_id, "notes.png");
        assert!(matches!(err.source, AssetError::Image(_)));

        let err = loader.read_texture("absent.png").unwrap_err();
        assert!(matches!(err.source, AssetError::Io(_)));
    }
}
