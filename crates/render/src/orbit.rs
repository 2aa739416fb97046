use crate::camera::PerspectiveCamera;
use glam::{Vec2, Vec3};
use std::f32::consts::PI;

/// Keeps the polar angle off the poles so the view never flips.
const POLE_EPSILON: f32 = 1e-3;

/// Orbit controls: the camera circles `target` at a clamped distance.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitControls {
    pub target: Vec3,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Radians per pixel of pointer motion.
    pub rotate_speed: f32,
    /// Fraction of the distance covered per wheel step.
    pub zoom_speed: f32,
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self {
            target: Vec3::new(0.0, 5.0, 0.0),
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            rotate_speed: 0.005,
            zoom_speed: 0.1,
        }
    }
}

impl OrbitControls {
    pub fn new(target: Vec3) -> Self {
        Self {
            target,
            ..Self::default()
        }
    }

    pub fn distance(&self, camera: &PerspectiveCamera) -> f32 {
        (camera.position - self.target).length()
    }

    /// Clamp the camera's distance to the allowed range and aim it at the target.
    pub fn update(&self, camera: &mut PerspectiveCamera) {
        let offset = camera.position - self.target;
        let distance = offset.length();
        let clamped = distance.max(self.min_distance).min(self.max_distance);
        if distance > f32::EPSILON && clamped != distance {
            camera.position = self.target + offset / distance * clamped;
        }
        camera.look_at(self.target);
    }

    /// Rotate around the target by a pointer delta.
    pub fn rotate(&self, camera: &mut PerspectiveCamera, delta: Vec2) {
        let offset = camera.position - self.target;
        let radius = offset.length();
        if radius <= f32::EPSILON {
            self.update(camera);
            return;
        }

        let theta = offset.x.atan2(offset.z) - delta.x * self.rotate_speed;
        let phi = (offset.y / radius).clamp(-1.0, 1.0).acos() - delta.y * self.rotate_speed;
        let phi = phi.clamp(POLE_EPSILON, PI - POLE_EPSILON);

        camera.position = self.target
            + radius * Vec3::new(phi.sin() * theta.sin(), phi.cos(), phi.sin() * theta.cos());
        self.update(camera);
    }

    /// Move toward (positive steps) or away from the target.
    pub fn zoom(&self, camera: &mut PerspectiveCamera, steps: f32) {
        let scale = (1.0 - self.zoom_speed).powf(steps);
        camera.position = self.target + (camera.position - self.target) * scale;
        self.update(camera);
    }
}
