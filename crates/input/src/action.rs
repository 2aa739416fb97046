use glam::Vec2;

/// Index of a tracked controller (0 = first, 1 = second).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControllerId(pub u8);

impl std::fmt::Display for ControllerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "controller{}", self.0)
    }
}

/// A high-level action that any embodiment mode (desktop, VR) can produce.
///
/// The scene consumes actions, never raw window or XR events, so desktop and
/// VR share the same camera logic.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Orbit around the target by a pointer delta in pixels.
    Orbit(Vec2),
    /// Zoom by wheel steps; positive moves toward the target.
    Zoom(f32),
    /// Primary button pressed on a controller.
    SelectStart(ControllerId),
    /// Primary button released on a controller.
    SelectEnd(ControllerId),
    /// No-op (used for input mapping that hasn't been bound yet).
    Noop,
}
