//! Scene bootstrap: one-time construction plus asynchronous model framing.

use crate::camera::PerspectiveCamera;
use crate::config::{FramingMode, SceneConfig};
use crate::orbit::OrbitControls;
use crate::scene::{ControllerRig, FloorPlane, Light, PointerModel, Scene};
use glam::Vec3;
use orbitview_assets::{
    AssetError, LoadResult, ModelLoadTask, ModelLoader, ModelRef, ResourceLoadError,
};
use orbitview_common::Aabb;
use orbitview_input::{Action, ControllerHooks, ControllerId, dispatch_select};

/// Camera parameters derived from a model's bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Framing {
    /// Length of the bounding box diagonal.
    pub size: f32,
    pub center: Vec3,
}

impl Framing {
    /// `None` for an empty or zero-extent box, which cannot be framed.
    pub fn from_bounds(bounds: &Aabb) -> Option<Self> {
        let size = bounds.diagonal();
        if bounds.is_empty() || !size.is_finite() || size <= f32::EPSILON {
            return None;
        }
        Some(Self {
            size,
            center: bounds.center(),
        })
    }

    pub fn near(&self) -> f32 {
        self.size / 100.0
    }

    pub fn far(&self) -> f32 {
        self.size * 100.0
    }

    pub fn max_orbit_distance(&self) -> f32 {
        self.size * 10.0
    }

    /// Distance at which `size * 1.2` fills the camera's vertical field of view.
    pub fn fit_distance(&self, fov_degrees: f32) -> f32 {
        let half_fov = (fov_degrees * 0.5).to_radians();
        (self.size * 1.2 * 0.5) / half_fov.tan()
    }
}

/// Build the camera and orbit controls. The controls are applied once, so
/// the camera already looks at the default target.
pub fn initialize_scene(config: &SceneConfig) -> (PerspectiveCamera, OrbitControls) {
    let cam = &config.camera;
    let mut camera = PerspectiveCamera::new(cam.fov_degrees, cam.aspect, cam.near, cam.far);
    camera.position = cam.position;

    let controls = OrbitControls {
        target: config.orbit.target,
        min_distance: config.orbit.min_distance,
        max_distance: f32::INFINITY,
        rotate_speed: config.orbit.rotate_speed,
        zoom_speed: config.orbit.zoom_speed,
    };
    controls.update(&mut camera);

    (camera, controls)
}

/// Build the static part of the scene: floor, lights, controller rigs.
pub fn build_scene(config: &SceneConfig) -> Scene {
    let mut scene = Scene::new(config.background);

    if config.floor.enabled {
        scene.floor = Some(FloorPlane {
            size: config.floor.size,
            tile_size: config.floor.tile_size,
            color_a: config.floor.color_a,
            color_b: config.floor.color_b,
        });
    }

    let hemi = &config.hemisphere_light;
    scene.lights.push(Light::Hemisphere {
        sky: hemi.sky,
        ground: hemi.ground,
        intensity: hemi.intensity,
    });
    let dir = &config.directional_light;
    scene.lights.push(Light::Directional {
        color: dir.color,
        intensity: dir.intensity,
        position: dir.position,
        target: dir.target,
    });

    if config.xr.enabled {
        scene.controllers = (0..config.xr.controllers)
            .map(|i| ControllerRig {
                id: ControllerId(i),
                pointer: PointerModel::default(),
            })
            .collect();
    }

    scene
}

/// Point the camera and controls at a framed model.
///
/// Near/far become `size / 100` and `size * 100`; the orbit target moves to
/// the center with a maximum distance of `size * 10`.
pub fn frame_area(
    framing: &Framing,
    mode: FramingMode,
    camera: &mut PerspectiveCamera,
    controls: &mut OrbitControls,
) {
    if mode == FramingMode::FitByFov {
        // keep the camera's current compass direction from the center
        let horizontal = (camera.position - framing.center) * Vec3::new(1.0, 0.0, 1.0);
        let mut direction = horizontal.normalize_or_zero();
        if direction == Vec3::ZERO {
            direction = Vec3::Z;
        }
        camera.position = framing.center + direction * framing.fit_distance(camera.fov_degrees);
    }

    camera.near = framing.near();
    camera.far = framing.far();
    camera.update_projection_matrix();
    camera.look_at(framing.center);

    controls.max_distance = framing.max_orbit_distance();
    controls.target = framing.center;
    controls.update(camera);
}

/// Explicit state shared by the bootstrapper and the render loop.
///
/// Owned by the application entry point. Load completion is applied through
/// [`SceneContext::poll_model_load`] between ticks, so a tick never sees a
/// half-framed camera.
#[derive(Debug)]
pub struct SceneContext {
    pub scene: Scene,
    pub camera: PerspectiveCamera,
    pub controls: OrbitControls,
    framing_mode: FramingMode,
    framing: Option<Framing>,
    pending: Option<ModelLoadTask>,
}

impl SceneContext {
    pub fn new(config: &SceneConfig) -> Self {
        let (camera, controls) = initialize_scene(config);
        let scene = build_scene(config);
        tracing::info!(
            lights = scene.lights.len(),
            controllers = scene.controllers.len(),
            floor = scene.floor.is_some(),
            "scene initialized"
        );
        Self {
            scene,
            camera,
            controls,
            framing_mode: config.framing,
            framing: None,
            pending: None,
        }
    }

    pub fn framing_mode(&self) -> FramingMode {
        self.framing_mode
    }

    pub fn set_framing_mode(&mut self, mode: FramingMode) {
        self.framing_mode = mode;
    }

    /// Framing from the last successful load, if any.
    pub fn framing(&self) -> Option<Framing> {
        self.framing
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Start loading `model` in the background. Does not block.
    pub fn begin_model_load<L>(&mut self, loader: L, model: ModelRef)
    where
        L: ModelLoader + Send + 'static,
    {
        tracing::info!(geometry = %model.geometry, material = ?model.material, "model load started");
        self.attach_load(ModelLoadTask::spawn(loader, model));
    }

    /// Track an already-started load task.
    pub fn attach_load(&mut self, task: ModelLoadTask) {
        if let Some(previous) = self.pending.replace(task) {
            tracing::warn!(resource = previous.resource_id(), "replacing a pending model load");
        }
    }

    /// Apply the pending load if it has completed.
    ///
    /// Returns `None` while the load is still running (or none was started),
    /// and `Some` exactly once when it resolves.
    pub fn poll_model_load(&mut self) -> Option<Result<Framing, ResourceLoadError>> {
        let result = self.pending.as_mut()?.try_take()?;
        self.pending = None;
        Some(self.complete_load(result))
    }

    /// Integrate a finished load: add the model and frame it.
    ///
    /// On failure the camera and controls are left untouched.
    pub fn complete_load(&mut self, result: LoadResult) -> Result<Framing, ResourceLoadError> {
        let model = result
            .inspect_err(|e| tracing::warn!("model load failed, scene stays unframed: {e}"))?;

        let Some(framing) = Framing::from_bounds(&model.bounds) else {
            let err = ResourceLoadError::new(model.resource_id.clone(), AssetError::EmptyGeometry);
            tracing::warn!("{err}");
            return Err(err);
        };

        let node = self.scene.add_model(model);
        frame_area(&framing, self.framing_mode, &mut self.camera, &mut self.controls);
        self.framing = Some(framing);

        tracing::info!(
            node = %node.short(),
            size = framing.size,
            center = ?framing.center,
            near = self.camera.near,
            far = self.camera.far,
            "model framed"
        );
        Ok(framing)
    }

    /// Route an input action to the orbit controls or the controller hooks.
    pub fn handle_action(&mut self, action: &Action, hooks: &mut dyn ControllerHooks) {
        match action {
            Action::Orbit(delta) => self.controls.rotate(&mut self.camera, *delta),
            Action::Zoom(steps) => self.controls.zoom(&mut self.camera, *steps),
            Action::SelectStart(_) | Action::SelectEnd(_) => {
                dispatch_select(action, hooks);
            }
            Action::Noop => {}
        }
    }
}

/// Load `model` and frame the camera around it once it arrives.
///
/// The load runs off-thread; this future resolves when it completes. On
/// failure the error names the resource and `ctx` is left unframed.
///
/// The future borrows `ctx` mutably until the load resolves, so nothing can
/// tick on this context in the meantime. Use it before a render loop exists.
/// Once one is running, use [`SceneContext::begin_model_load`] and
/// [`SceneContext::poll_model_load`] between ticks instead.
pub async fn load_model_and_frame<L>(
    loader: L,
    model: ModelRef,
    ctx: &mut SceneContext,
) -> Result<Framing, ResourceLoadError>
where
    L: ModelLoader + Send + 'static,
{
    let task = ModelLoadTask::spawn(loader, model);
    let result = task.await;
    ctx.complete_load(result)
}
