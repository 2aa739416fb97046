use glam::{Vec2, Vec3};
use orbitview_common::Aabb;
use std::collections::BTreeMap;
use std::fmt;

/// Identifies the files that make up one model.
///
/// The geometry id is the primary resource id: it names the model in logs and
/// in load errors unless the material itself failed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelRef {
    pub geometry: String,
    pub material: Option<String>,
}

impl ModelRef {
    pub fn new(geometry: impl Into<String>) -> Self {
        Self {
            geometry: geometry.into(),
            material: None,
        }
    }

    pub fn with_material(mut self, material: impl Into<String>) -> Self {
        self.material = Some(material.into());
        self
    }

    pub fn resource_id(&self) -> &str {
        &self.geometry
    }
}

/// Surface parameters read from an MTL library.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub ambient: [f32; 3],
    pub diffuse: [f32; 3],
    pub specular: [f32; 3],
    pub shininess: f32,
    pub opacity: f32,
    /// Resource id of the diffuse texture (`map_Kd`), relative to the loader root.
    pub diffuse_map: Option<String>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: "default".into(),
            ambient: [0.0, 0.0, 0.0],
            diffuse: [0.8, 0.8, 0.8],
            specular: [0.0, 0.0, 0.0],
            shininess: 0.0,
            opacity: 1.0,
            diffuse_map: None,
        }
    }
}

impl Material {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn base_color(&self) -> [f32; 4] {
        [self.diffuse[0], self.diffuse[1], self.diffuse[2], self.opacity]
    }
}

/// Decoded diffuse texture: tightly packed RGBA8 rows, top row first.
#[derive(Clone, PartialEq, Eq)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl TextureImage {
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Self {
        Self {
            width,
            height,
            rgba,
        }
    }
}

impl fmt::Debug for TextureImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextureImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/// Indexed triangle list with one index per vertex (position, normal and uv
/// share it).
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub name: String,
    pub material: Option<String>,
    pub positions: Vec<Vec3>,
    /// Empty when the source had no normals; renderers derive face normals.
    pub normals: Vec<Vec3>,
    /// Empty when the source had no texture coordinates.
    pub uvs: Vec<Vec2>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(self.positions.iter().copied())
    }
}

/// A fully parsed model, ready to be placed in a scene.
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub resource_id: String,
    pub meshes: Vec<Mesh>,
    pub materials: BTreeMap<String, Material>,
    /// Decoded diffuse textures keyed by [`Material::diffuse_map`].
    pub textures: BTreeMap<String, TextureImage>,
    pub bounds: Aabb,
}

impl LoadedModel {
    pub fn new(
        resource_id: impl Into<String>,
        meshes: Vec<Mesh>,
        materials: BTreeMap<String, Material>,
    ) -> Self {
        let bounds = meshes
            .iter()
            .fold(Aabb::EMPTY, |acc, mesh| acc.union(&mesh.bounds()));
        Self {
            resource_id: resource_id.into(),
            meshes,
            materials,
            textures: BTreeMap::new(),
            bounds,
        }
    }

    pub fn with_textures(mut self, textures: BTreeMap<String, TextureImage>) -> Self {
        self.textures = textures;
        self
    }

    /// Diffuse texture of `material`, if it names one that decoded.
    pub fn texture_for(&self, material: &Material) -> Option<&TextureImage> {
        material
            .diffuse_map
            .as_ref()
            .and_then(|id| self.textures.get(id))
    }

    /// Material bound to `mesh`, or the default grey when the name is unknown.
    pub fn material_for(&self, mesh: &Mesh) -> Material {
        mesh.material
            .as_ref()
            .and_then(|name| self.materials.get(name))
            .cloned()
            .unwrap_or_default()
    }

    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(Mesh::vertex_count).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(Mesh::triangle_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle(material: Option<&str>, offset: Vec3) -> Mesh {
        Mesh {
            name: "tri".into(),
            material: material.map(String::from),
            positions: vec![
                offset,
                offset + Vec3::X,
                offset + Vec3::Y,
            ],
            normals: vec![Vec3::Z; 3],
            uvs: Vec::new(),
            indices: vec![0, 1, 2],
        }
    }

    #[test]
    fn model_ref_resource_id_is_geometry() {
        let r = ModelRef::new("3d-model.obj").with_material("3d-model.mtl");
        assert_eq!(r.resource_id(), "3d-model.obj");
        assert_eq!(r.material.as_deref(), Some("3d-model.mtl"));
    }

    #[test]
    fn loaded_model_bounds_span_all_meshes() {
        let model = LoadedModel::new(
            "m.obj",
            vec![triangle(None, Vec3::ZERO), triangle(None, Vec3::new(5.0, 0.0, 0.0))],
            BTreeMap::new(),
        );
        assert_eq!(model.bounds.min, Vec3::ZERO);
        assert_eq!(model.bounds.max, Vec3::new(6.0, 1.0, 0.0));
        assert_eq!(model.vertex_count(), 6);
        assert_eq!(model.triangle_count(), 2);
    }

    #[test]
    fn material_lookup_falls_back_to_default() {
        let mut materials = BTreeMap::new();
        let mut red = Material::named("red");
        red.diffuse = [1.0, 0.0, 0.0];
        materials.insert("red".to_string(), red);

        let model = LoadedModel::new(
            "m.obj",
            vec![triangle(Some("red"), Vec3::ZERO), triangle(Some("blue"), Vec3::ZERO)],
            materials,
        );
        assert_eq!(model.material_for(&model.meshes[0]).base_color(), [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(model.material_for(&model.meshes[1]).name, "default");
    }

    #[test]
    fn texture_lookup_goes_through_diffuse_map() {
        let mut textured = Material::named("wood");
        textured.diffuse_map = Some("tex/wood.png".into());
        let mut missing = Material::named("tile");
        missing.diffuse_map = Some("tex/tile.png".into());

        let model = LoadedModel::new("m.obj", Vec::new(), BTreeMap::new()).with_textures(
            BTreeMap::from([(
                "tex/wood.png".to_string(),
                TextureImage::new(1, 1, vec![255, 0, 0, 255]),
            )]),
        );

        assert_eq!(model.texture_for(&textured).map(|t| t.width), Some(1));
        assert!(model.texture_for(&missing).is_none());
        assert!(model.texture_for(&Material::default()).is_none());
    }

    #[test]
    fn empty_model_has_empty_bounds() {
        let model = LoadedModel::new("empty.obj", Vec::new(), BTreeMap::new());
        assert!(model.bounds.is_empty());
        assert_eq!(model.vertex_count(), 0);
    }
}
