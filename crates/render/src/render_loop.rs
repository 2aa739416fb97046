use crate::camera::PerspectiveCamera;
use crate::scene::Scene;
use orbitview_common::SurfaceSize;
use std::cell::Cell;

/// Output surface plus draw call. Implemented by every backend.
pub trait Renderer {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Current size of the container the surface is displayed in.
    fn display_size(&self) -> SurfaceSize;

    /// Resize the drawing buffer.
    fn resize(&mut self, size: SurfaceSize);

    /// Draw one frame of `scene` as seen by `camera`.
    fn draw(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<(), Self::Error>;
}

/// Source of display refresh signals.
pub trait FrameScheduler {
    /// Ask for one more tick on the next refresh.
    fn request_frame(&self);
}

/// Scheduler for headless use: records requests for the caller to honor.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    pending: Cell<bool>,
    requested: Cell<u64>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume the pending request, if any.
    pub fn take_request(&self) -> bool {
        self.pending.replace(false)
    }

    pub fn total_requests(&self) -> u64 {
        self.requested.get()
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&self) {
        self.pending.set(true);
        self.requested.set(self.requested.get() + 1);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Constructed, no tick yet.
    Idle,
    Running,
    /// A draw failed; waiting for external recovery via [`RenderLoop::resume`].
    Halted,
}

#[derive(Debug, thiserror::Error)]
pub enum RenderLoopError {
    #[error("draw failed on frame {frame}: {source}")]
    DrawFailure {
        frame: u64,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("render loop is halted after a draw failure")]
    Halted,
}

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// 1-based index of the frame just drawn.
    pub frame: u64,
    pub resized: bool,
    pub size: SurfaceSize,
    /// False when the surface had no area; the loop then waits for
    /// [`RenderLoop::wake`].
    pub scheduled: bool,
}

/// Drives one draw per display refresh and keeps the camera's projection in
/// step with the surface size.
///
/// # Invariants
/// - After a resize, `camera.aspect == width / height`.
/// - Exactly one draw per successful tick; resize only when the size changed.
/// - A zero-area tick does not schedule another frame.
#[derive(Debug)]
pub struct RenderLoop<S: FrameScheduler> {
    scheduler: S,
    state: LoopState,
    last_size: Option<SurfaceSize>,
    frames: u64,
    resizes: u64,
}

impl<S: FrameScheduler> RenderLoop<S> {
    pub fn new(scheduler: S) -> Self {
        Self {
            scheduler,
            state: LoopState::Idle,
            last_size: None,
            frames: 0,
            resizes: 0,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn resizes(&self) -> u64 {
        self.resizes
    }

    pub fn last_size(&self) -> Option<SurfaceSize> {
        self.last_size
    }

    /// `Idle -> Running`: request the first frame. No-op once started.
    pub fn start(&mut self) {
        if self.state == LoopState::Idle {
            tracing::info!("render loop started");
            self.state = LoopState::Running;
            self.scheduler.request_frame();
        }
    }

    /// Leave `Halted` after the backend has been recovered.
    ///
    /// The cached size is dropped so the next tick re-establishes the surface.
    pub fn resume(&mut self) {
        if self.state == LoopState::Halted {
            tracing::info!(frame = self.frames, "render loop resumed");
            self.state = LoopState::Running;
            self.last_size = None;
            self.scheduler.request_frame();
        }
    }

    /// Restart scheduling after a zero-area tick parked the loop. Call when the
    /// display regains an area. No-op unless running.
    pub fn wake(&mut self) {
        if self.state == LoopState::Running {
            tracing::debug!(frame = self.frames, "render loop woken");
            self.scheduler.request_frame();
        }
    }

    /// Run one frame: resize if the display size changed, draw once, and
    /// schedule the next frame while the surface has an area.
    pub fn tick<R: Renderer>(
        &mut self,
        renderer: &mut R,
        scene: &Scene,
        camera: &mut PerspectiveCamera,
    ) -> Result<TickReport, RenderLoopError> {
        match self.state {
            LoopState::Halted => return Err(RenderLoopError::Halted),
            LoopState::Idle => {
                tracing::info!("render loop started");
                self.state = LoopState::Running;
            }
            LoopState::Running => {}
        }

        let frame = self.frames + 1;
        let _span = tracing::trace_span!("tick", frame).entered();

        let size = renderer.display_size();
        let resized = self.resize_if_needed(renderer, camera, size);

        if let Err(e) = renderer.draw(scene, camera) {
            self.state = LoopState::Halted;
            tracing::error!(frame, "draw failed, halting render loop: {e}");
            return Err(RenderLoopError::DrawFailure {
                frame,
                source: Box::new(e),
            });
        }

        self.frames = frame;
        let scheduled = !size.is_zero_area();
        if scheduled {
            self.scheduler.request_frame();
        } else {
            tracing::debug!(frame, "surface has no area, waiting for wake");
        }
        tracing::trace!(resized, %size, "frame drawn");

        Ok(TickReport {
            frame,
            resized,
            size,
            scheduled,
        })
    }

    fn resize_if_needed<R: Renderer>(
        &mut self,
        renderer: &mut R,
        camera: &mut PerspectiveCamera,
        size: SurfaceSize,
    ) -> bool {
        if size.is_zero_area() {
            // minimized; keep the last good projection
            return false;
        }
        if self.last_size == Some(size) {
            return false;
        }

        renderer.resize(size);
        camera.set_aspect(size.aspect());
        self.last_size = Some(size);
        self.resizes += 1;
        tracing::debug!(%size, aspect = camera.aspect, "surface resized");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("device lost")]
    struct DeviceLost;

    #[derive(Default)]
    struct RecordingRenderer {
        display: Option<SurfaceSize>,
        resizes: Vec<SurfaceSize>,
        draws: u32,
        fail_next_draw: bool,
    }

    impl RecordingRenderer {
        fn with_display(width: u32, height: u32) -> Self {
            Self {
                display: Some(SurfaceSize::new(width, height)),
                ..Self::default()
            }
        }

        fn set_display(&mut self, width: u32, height: u32) {
            self.display = Some(SurfaceSize::new(width, height));
        }
    }

    impl Renderer for RecordingRenderer {
        type Error = DeviceLost;

        fn display_size(&self) -> SurfaceSize {
            self.display.unwrap_or(SurfaceSize::new(0, 0))
        }

        fn resize(&mut self, size: SurfaceSize) {
            self.resizes.push(size);
        }

        fn draw(&mut self, _scene: &Scene, _camera: &PerspectiveCamera) -> Result<(), DeviceLost> {
            if std::mem::take(&mut self.fail_next_draw) {
                return Err(DeviceLost);
            }
            self.draws += 1;
            Ok(())
        }
    }

    fn setup() -> (RenderLoop<ManualScheduler>, Scene, PerspectiveCamera) {
        (
            RenderLoop::new(ManualScheduler::new()),
            Scene::default(),
            PerspectiveCamera::default(),
        )
    }

    #[test]
    fn aspect_matches_surface_after_resize() {
        let sizes = [(1, 1), (800, 600), (1920, 1080), (600, 800), (3, 7), (4096, 17)];
        let (mut lp, scene, mut camera) = setup();
        let mut renderer = RecordingRenderer::default();
        for (w, h) in sizes {
            renderer.set_display(w, h);
            lp.tick(&mut renderer, &scene, &mut camera).unwrap();
            let expected = w as f32 / h as f32;
            assert!((camera.aspect - expected).abs() <= f32::EPSILON * expected.max(1.0));
        }
        assert_eq!(renderer.resizes.len(), sizes.len());
    }

    #[test]
    fn unchanged_size_skips_resize_but_draws() {
        let (mut lp, scene, mut camera) = setup();
        let mut renderer = RecordingRenderer::with_display(640, 480);

        let first = lp.tick(&mut renderer, &scene, &mut camera).unwrap();
        let second = lp.tick(&mut renderer, &scene, &mut camera).unwrap();

        assert!(first.resized);
        assert!(!second.resized);
        assert_eq!(renderer.resizes.len(), 1);
        assert_eq!(renderer.draws, 2);
        assert_eq!(second.frame, 2);
    }

    #[test]
    fn same_ratio_resize_is_still_detected() {
        let (mut lp, scene, mut camera) = setup();
        let mut renderer = RecordingRenderer::with_display(800, 600);
        lp.tick(&mut renderer, &scene, &mut camera).unwrap();
        let before = camera.aspect;
        let resizes_before = renderer.resizes.len();

        renderer.set_display(1024, 768);
        let report = lp.tick(&mut renderer, &scene, &mut camera).unwrap();

        assert!(report.resized);
        assert_eq!(renderer.resizes.len() - resizes_before, 1);
        assert_eq!(renderer.resizes.last(), Some(&SurfaceSize::new(1024, 768)));
        assert!((camera.aspect - before).abs() < 1e-6);
        assert!((camera.aspect - 4.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn steady_full_hd_draws_once_per_tick() {
        let (mut lp, scene, mut camera) = setup();
        let mut renderer = RecordingRenderer::with_display(1920, 1080);

        lp.tick(&mut renderer, &scene, &mut camera).unwrap();
        assert_eq!(renderer.draws, 1);
        assert_eq!(renderer.resizes.len(), 1);

        lp.tick(&mut renderer, &scene, &mut camera).unwrap();
        lp.tick(&mut renderer, &scene, &mut camera).unwrap();
        assert_eq!(renderer.draws, 3);
        assert_eq!(renderer.resizes.len(), 1);
        assert_eq!(lp.resizes(), 1);
    }

    #[test]
    fn each_tick_requests_the_next_frame() {
        let (mut lp, scene, mut camera) = setup();
        let mut renderer = RecordingRenderer::with_display(10, 10);

        assert_eq!(lp.state(), LoopState::Idle);
        lp.start();
        assert_eq!(lp.state(), LoopState::Running);
        assert!(lp.scheduler().take_request());

        lp.tick(&mut renderer, &scene, &mut camera).unwrap();
        assert!(lp.scheduler().take_request());
        assert!(!lp.scheduler().take_request());
        assert_eq!(lp.scheduler().total_requests(), 2);
    }

    #[test]
    fn first_tick_starts_an_idle_loop() {
        let (mut lp, scene, mut camera) = setup();
        let mut renderer = RecordingRenderer::with_display(10, 10);
        lp.tick(&mut renderer, &scene, &mut camera).unwrap();
        assert_eq!(lp.state(), LoopState::Running);
    }

    #[test]
    fn zero_area_skips_resize_and_keeps_aspect() {
        let (mut lp, scene, mut camera) = setup();
        let mut renderer = RecordingRenderer::with_display(800, 400);
        lp.tick(&mut renderer, &scene, &mut camera).unwrap();

        renderer.set_display(0, 400);
        let report = lp.tick(&mut renderer, &scene, &mut camera).unwrap();
        assert!(!report.resized);
        assert_eq!(camera.aspect, 2.0);
        assert_eq!(renderer.draws, 2);
        assert_eq!(lp.last_size(), Some(SurfaceSize::new(800, 400)));
    }

    #[test]
    fn zero_area_parks_until_woken() {
        let (mut lp, scene, mut camera) = setup();
        let mut renderer = RecordingRenderer::with_display(800, 400);
        let first = lp.tick(&mut renderer, &scene, &mut camera).unwrap();
        assert!(first.scheduled);
        assert!(lp.scheduler().take_request());

        renderer.set_display(800, 0);
        let parked = lp.tick(&mut renderer, &scene, &mut camera).unwrap();
        assert!(!parked.scheduled);
        assert!(!lp.scheduler().take_request(), "minimized window must not spin");

        renderer.set_display(1024, 512);
        lp.wake();
        assert!(lp.scheduler().take_request());
        let restored = lp.tick(&mut renderer, &scene, &mut camera).unwrap();
        assert!(restored.resized);
        assert!(restored.scheduled);
        assert!(lp.scheduler().take_request());
    }

    #[test]
    fn wake_is_ignored_unless_running() {
        let (mut lp, scene, mut camera) = setup();
        lp.wake();
        assert!(!lp.scheduler().take_request());

        let mut renderer = RecordingRenderer::with_display(10, 10);
        lp.tick(&mut renderer, &scene, &mut camera).unwrap();
        renderer.fail_next_draw = true;
        let _ = lp.tick(&mut renderer, &scene, &mut camera);
        let _ = lp.scheduler().take_request();
        lp.wake();
        assert!(!lp.scheduler().take_request());
    }

    #[test]
    fn draw_failure_halts_until_resumed() {
        let (mut lp, scene, mut camera) = setup();
        let mut renderer = RecordingRenderer::with_display(320, 240);
        lp.tick(&mut renderer, &scene, &mut camera).unwrap();
        assert!(lp.scheduler().take_request());

        renderer.fail_next_draw = true;
        let err = lp.tick(&mut renderer, &scene, &mut camera).unwrap_err();
        assert!(matches!(err, RenderLoopError::DrawFailure { frame: 2, .. }));
        assert_eq!(err.to_string(), "draw failed on frame 2: device lost");
        assert_eq!(lp.state(), LoopState::Halted);
        assert!(!lp.scheduler().take_request());

        assert!(matches!(
            lp.tick(&mut renderer, &scene, &mut camera),
            Err(RenderLoopError::Halted)
        ));
        assert_eq!(renderer.draws, 1);

        lp.resume();
        assert_eq!(lp.state(), LoopState::Running);
        assert!(lp.scheduler().take_request());
        let report = lp.tick(&mut renderer, &scene, &mut camera).unwrap();
        assert!(report.resized, "resume re-establishes the surface");
        assert_eq!(report.frame, 2);
        assert_eq!(renderer.draws, 2);
    }
}
