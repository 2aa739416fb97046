use glam::{Mat4, Vec3};

/// Perspective camera with an explicit look-at target.
///
/// The projection matrix is cached; call [`update_projection_matrix`] after
/// changing `fov_degrees`, `aspect`, `near`, or `far` directly.
///
/// [`update_projection_matrix`]: PerspectiveCamera::update_projection_matrix
#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveCamera {
    pub fov_degrees: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    target: Vec3,
    projection: Mat4,
}

impl Default for PerspectiveCamera {
    fn default() -> Self {
        let mut camera = Self::new(45.0, 2.0, 0.1, 1000.0);
        camera.position = Vec3::new(0.0, 10.0, 20.0);
        camera
    }
}

impl PerspectiveCamera {
    pub fn new(fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            fov_degrees,
            aspect,
            near,
            far,
            position: Vec3::ZERO,
            target: Vec3::NEG_Z,
            projection: Mat4::IDENTITY,
        };
        camera.update_projection_matrix();
        camera
    }

    pub fn update_projection_matrix(&mut self) {
        self.projection =
            Mat4::perspective_rh(self.fov_degrees.to_radians(), self.aspect, self.near, self.far);
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
        self.update_projection_matrix();
    }

    pub fn look_at(&mut self, target: Vec3) {
        self.target = target;
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize_or_zero()
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    pub fn view_matrix(&self) -> Mat4 {
        let dir = self.forward();
        if dir == Vec3::ZERO {
            return Mat4::from_translation(-self.position);
        }
        // looking straight up or down makes +Y a degenerate up vector
        let up = if dir.dot(Vec3::Y).abs() > 0.999 {
            Vec3::NEG_Z
        } else {
            Vec3::Y
        };
        Mat4::look_at_rh(self.position, self.target, up)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finite(m: Mat4) -> bool {
        m.to_cols_array().iter().all(|v| v.is_finite())
    }

    #[test]
    fn default_camera() {
        let cam = PerspectiveCamera::default();
        assert_eq!(cam.fov_degrees, 45.0);
        assert_eq!(cam.aspect, 2.0);
        assert_eq!(cam.near, 0.1);
        assert_eq!(cam.far, 1000.0);
        assert!(cam.position.y > 0.0);
        assert!(finite(cam.view_projection()));
    }

    #[test]
    fn set_aspect_refreshes_projection() {
        let mut cam = PerspectiveCamera::default();
        cam.set_aspect(16.0 / 9.0);
        let expected = Mat4::perspective_rh(45.0_f32.to_radians(), 16.0 / 9.0, 0.1, 1000.0);
        assert_eq!(cam.projection_matrix(), expected);
    }

    #[test]
    fn projection_is_stale_until_updated() {
        let mut cam = PerspectiveCamera::default();
        let before = cam.projection_matrix();
        cam.near = 1.0;
        assert_eq!(cam.projection_matrix(), before);
        cam.update_projection_matrix();
        assert_ne!(cam.projection_matrix(), before);
    }

    #[test]
    fn looking_straight_down_is_finite() {
        let mut cam = PerspectiveCamera::default();
        cam.position = Vec3::new(0.0, 10.0, 0.0);
        cam.look_at(Vec3::ZERO);
        assert!(finite(cam.view_matrix()));
        assert_eq!(cam.forward(), Vec3::NEG_Y);
    }

    #[test]
    fn looking_at_own_position_is_finite() {
        let mut cam = PerspectiveCamera::default();
        cam.look_at(cam.position);
        assert!(finite(cam.view_matrix()));
    }
}
