use glam::Vec3;
use orbitview_assets::LoadedModel;
use orbitview_common::{NodeId, Transform};
use orbitview_input::ControllerId;

/// Checkered ground plane lying on y = 0, centered at the origin.
#[derive(Debug, Clone, PartialEq)]
pub struct FloorPlane {
    pub size: f32,
    /// World-space edge length of one checker tile pair.
    pub tile_size: f32,
    pub color_a: [f32; 3],
    pub color_b: [f32; 3],
}

impl FloorPlane {
    /// How many times the checker texture repeats across the plane.
    pub fn repeats(&self) -> f32 {
        self.size / self.tile_size
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Light {
    /// Sky color from above, ground color from below, blended by normal.
    Hemisphere {
        sky: [f32; 3],
        ground: [f32; 3],
        intensity: f32,
    },
    Directional {
        color: [f32; 3],
        intensity: f32,
        position: Vec3,
        target: Vec3,
    },
}

/// Pointer geometry attached to each controller: a thin cone-like cylinder
/// with a small sphere marking the pivot.
#[derive(Debug, Clone, PartialEq)]
pub struct PointerModel {
    pub radius_top: f32,
    pub radius_bottom: f32,
    pub length: f32,
    pub radial_segments: u32,
    pub pivot_offset: Vec3,
    pub pivot_radius: f32,
}

impl Default for PointerModel {
    fn default() -> Self {
        Self {
            radius_top: 0.01,
            radius_bottom: 0.02,
            length: 0.08,
            radial_segments: 5,
            pivot_offset: Vec3::new(0.0, 0.0, -0.05),
            pivot_radius: 0.01,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControllerRig {
    pub id: ControllerId,
    pub pointer: PointerModel,
}

#[derive(Debug, Clone)]
pub struct ModelNode {
    pub id: NodeId,
    pub model: LoadedModel,
    pub transform: Transform,
}

/// Everything a renderer draws in one frame, apart from the camera.
#[derive(Debug, Clone)]
pub struct Scene {
    pub background: [f32; 3],
    pub floor: Option<FloorPlane>,
    pub lights: Vec<Light>,
    pub controllers: Vec<ControllerRig>,
    models: Vec<ModelNode>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new([0.0, 0.0, 0.0])
    }
}

impl Scene {
    pub fn new(background: [f32; 3]) -> Self {
        Self {
            background,
            floor: None,
            lights: Vec::new(),
            controllers: Vec::new(),
            models: Vec::new(),
        }
    }

    /// Add a model at the origin and return its node id.
    pub fn add_model(&mut self, model: LoadedModel) -> NodeId {
        let id = NodeId::new();
        tracing::debug!(node = %id.short(), resource = %model.resource_id, "model added to scene");
        self.models.push(ModelNode {
            id,
            model,
            transform: Transform::default(),
        });
        id
    }

    pub fn models(&self) -> &[ModelNode] {
        &self.models
    }

    pub fn model(&self, id: NodeId) -> Option<&ModelNode> {
        self.models.iter().find(|node| node.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn floor_repeats() {
        let floor = FloorPlane {
            size: 4000.0,
            tile_size: 200.0,
            color_a: [1.0; 3],
            color_b: [0.0; 3],
        };
        assert_eq!(floor.repeats(), 20.0);
    }

    #[test]
    fn add_and_find_model() {
        let mut scene = Scene::default();
        assert!(scene.models().is_empty());
        let id = scene.add_model(LoadedModel::new("m.obj", Vec::new(), BTreeMap::new()));
        assert_eq!(scene.models().len(), 1);
        assert_eq!(scene.model(id).unwrap().model.resource_id, "m.obj");
        assert!(scene.model(NodeId::new()).is_none());
    }

    #[test]
    fn pointer_defaults() {
        let p = PointerModel::default();
        assert_eq!(p.length, 0.08);
        assert_eq!(p.pivot_offset.z, -0.05);
    }
}
