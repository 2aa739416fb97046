use crate::action::ControllerId;

/// Extension points invoked when a controller's select button changes state.
///
/// Both hooks default to doing nothing. The scene forwards select actions
/// here and enforces nothing about what implementors do with them.
pub trait ControllerHooks {
    fn on_select_start(&mut self, _controller: ControllerId) {}

    fn on_select_end(&mut self, _controller: ControllerId) {}
}

/// Hooks that ignore every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopControllerHooks;

impl ControllerHooks for NoopControllerHooks {}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: Vec<(&'static str, ControllerId)>,
    }

    impl ControllerHooks for Recorder {
        fn on_select_start(&mut self, controller: ControllerId) {
            self.events.push(("start", controller));
        }

        fn on_select_end(&mut self, controller: ControllerId) {
            self.events.push(("end", controller));
        }
    }

    #[test]
    fn noop_hooks_accept_events() {
        let mut hooks = NoopControllerHooks;
        hooks.on_select_start(ControllerId(0));
        hooks.on_select_end(ControllerId(0));
    }

    #[test]
    fn overridden_hooks_are_called() {
        let mut hooks = Recorder::default();
        let dyn_hooks: &mut dyn ControllerHooks = &mut hooks;
        dyn_hooks.on_select_start(ControllerId(1));
        dyn_hooks.on_select_end(ControllerId(1));
        assert_eq!(
            hooks.events,
            vec![("start", ControllerId(1)), ("end", ControllerId(1))]
        );
    }
}
