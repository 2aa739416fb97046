//! Embodiment modes: desktop pointer input and VR controller hooks mapped to
//! shared actions.
//!
//! # Invariants
//! - Same action set for desktop and VR.
//! - Controller hooks are extension points; the default implementation is a no-op.

pub mod action;
mod hooks;

pub use action::{Action, ControllerId};
pub use hooks::{ControllerHooks, NoopControllerHooks};

pub fn crate_info() -> &'static str {
    "orbitview-input v0.1.0"
}

/// Forward a select action to `hooks`. Other actions are ignored.
///
/// Returns `true` when the action was a select event.
pub fn dispatch_select(action: &Action, hooks: &mut dyn ControllerHooks) -> bool {
    match action {
        Action::SelectStart(id) => {
            tracing::debug!(%id, "select start");
            hooks.on_select_start(*id);
            true
        }
        Action::SelectEnd(id) => {
            tracing::debug!(%id, "select end");
            hooks.on_select_end(*id);
            true
        }
        _ => false,
    }
}
