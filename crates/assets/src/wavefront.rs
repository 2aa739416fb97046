//! Conversion from `tobj` output into orbitview's model types.

use crate::model::{Material, Mesh};
use glam::{Vec2, Vec3};
use std::path::Path;

/// `tobj` options for every load: triangles only, one index per vertex.
pub(crate) const LOAD_OPTIONS: tobj::LoadOptions = tobj::GPU_LOAD_OPTIONS;

/// `materials` is the list `tobj` resolved `usemtl` against.
pub(crate) fn mesh_from(model: tobj::Model, materials: &[tobj::Material]) -> Mesh {
    let mesh = model.mesh;
    let material = mesh
        .material_id
        .and_then(|id| materials.get(id))
        .map(|m| m.name.clone());

    Mesh {
        name: model.name,
        material,
        positions: mesh.positions.chunks_exact(3).map(Vec3::from_slice).collect(),
        normals: mesh.normals.chunks_exact(3).map(Vec3::from_slice).collect(),
        uvs: mesh.texcoords.chunks_exact(2).map(Vec2::from_slice).collect(),
        indices: mesh.indices,
    }
}

/// Texture paths are resolved against `base`, the directory of the library.
pub(crate) fn material_from(material: tobj::Material, base: &Path) -> Material {
    let defaults = Material::named(material.name);

    // `Tr` is the inverse of `d`; `d` wins when both are present.
    let opacity = material
        .dissolve
        .or_else(|| {
            material
                .unknown_param
                .get("Tr")
                .and_then(|tr| tr.trim().parse::<f32>().ok())
                .map(|tr| 1.0 - tr)
        })
        .map_or(defaults.opacity, |d| d.clamp(0.0, 1.0));

    Material {
        ambient: material.ambient.unwrap_or(defaults.ambient),
        diffuse: material.diffuse.unwrap_or(defaults.diffuse),
        specular: material.specular.unwrap_or(defaults.specular),
        shininess: material.shininess.unwrap_or(defaults.shininess),
        opacity,
        diffuse_map: material
            .diffuse_texture
            .map(|tex| base.join(tex).to_string_lossy().into_owned()),
        ..defaults
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Loads `obj` with `mtl` as its only library.
    fn load(obj: &str, mtl: &str) -> (Vec<Mesh>, Vec<Material>) {
        let source = format!("mtllib car.mtl\n{obj}");
        let (models, materials) = tobj::load_obj_buf(&mut source.as_bytes(), &LOAD_OPTIONS, |_| {
            tobj::load_mtl_buf(&mut mtl.as_bytes())
        })
        .unwrap();
        let materials = materials.unwrap_or_default();
        let meshes = models.into_iter().map(|m| mesh_from(m, &materials)).collect();
        let materials = materials
            .into_iter()
            .map(|m| material_from(m, Path::new("car")))
            .collect();
        (meshes, materials)
    }

    #[test]
    fn quads_are_triangulated() {
        let obj = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n";
        let (meshes, _) = load(obj, "");
        assert_eq!(meshes.len(), 1);
        assert_eq!(meshes[0].triangle_count(), 2);
        assert_eq!(meshes[0].vertex_count(), 4);
        assert!(meshes[0].normals.is_empty());
        assert!(meshes[0].uvs.is_empty());
    }

    #[test]
    fn usemtl_names_the_mesh_material() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nvt 1 0\nvt 0 1\n\
                   o body\nusemtl paint\nf 1/1 2/2 3/3\n";
        let mtl = "newmtl paint\nKd 0.2 0.4 0.6\n";
        let (meshes, materials) = load(obj, mtl);

        assert_eq!(meshes[0].name, "body");
        assert_eq!(meshes[0].material.as_deref(), Some("paint"));
        assert_eq!(meshes[0].uvs.len(), 3);
        assert!(meshes[0].uvs.contains(&Vec2::new(1.0, 0.0)));
        assert_eq!(materials[0].diffuse, [0.2, 0.4, 0.6]);
    }

    #[test]
    fn missing_material_fields_keep_defaults() {
        let (_, materials) = load("", "newmtl bare\n");
        let bare = &materials[0];
        assert_eq!(bare.name, "bare");
        assert_eq!(bare.diffuse, Material::default().diffuse);
        assert_eq!(bare.opacity, 1.0);
        assert!(bare.diffuse_map.is_none());
    }

    #[test]
    fn transparency_reads_d_or_inverted_tr() {
        let mtl = "newmtl glass\nd 0.25\n\nnewmtl tinted\nTr 0.75\n";
        let (_, materials) = load("", mtl);
        assert!((materials[0].opacity - 0.25).abs() < 1e-6);
        assert!((materials[1].opacity - 0.25).abs() < 1e-6);
    }

    #[test]
    fn diffuse_map_resolves_against_library_dir() {
        let (_, materials) = load("", "newmtl wood\nmap_Kd wood.png\n");
        let expected = Path::new("car").join("wood.png");
        assert_eq!(
            materials[0].diffuse_map.as_deref(),
            Some(expected.to_string_lossy().as_ref())
        );
    }
}
