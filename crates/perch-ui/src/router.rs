use std::collections::HashMap;

use perch_core::input::{Event, EventKind, PointerButton};

use crate::screen::Screen;

/// Per-dispatch context handed to handlers.
pub struct Dispatch {
    /// Whether the primary button is currently held (tracked by the router
    /// across down/up events).
    pub primary_held: bool,
    /// Set by a handler to request a frame.
    pub redraw: bool,
}

pub type Handler = Box<dyn FnMut(&mut Screen, &Event, &mut Dispatch)>;

/// Maps raw input events to container operations through a dispatch table
/// keyed by event kind. Events are processed one at a time, in arrival
/// order; a kind with no registered handler is logged and dropped.
///
/// Handlers receive the screen explicitly; there is no global display state.
pub struct Router {
    handlers: HashMap<EventKind, Handler>,
    primary_held: bool,
}

impl Router {
    pub fn new() -> Self {
        let mut router = Self {
            handlers: HashMap::new(),
            primary_held: false,
        };
        router.set_handler(EventKind::PointerDown, Box::new(on_pointer_down));
        router.set_handler(EventKind::PointerUp, Box::new(on_pointer_up));
        router.set_handler(EventKind::PointerMove, Box::new(on_pointer_move));
        router.set_handler(EventKind::Wheel, Box::new(on_wheel));
        router.set_handler(EventKind::KeyDown, Box::new(on_key_down));
        router.set_handler(EventKind::KeyUp, Box::new(on_key_up));
        router
    }

    /// Replace the handler for one event kind.
    pub fn set_handler(&mut self, kind: EventKind, handler: Handler) {
        self.handlers.insert(kind, handler);
    }

    pub fn remove_handler(&mut self, kind: EventKind) -> Option<Handler> {
        self.handlers.remove(&kind)
    }

    /// Route one event; returns true when a handler requested a redraw.
    pub fn dispatch(&mut self, screen: &mut Screen, event: &Event) -> bool {
        match event {
            Event::PointerDown {
                button: PointerButton::Primary,
                ..
            } => self.primary_held = true,
            Event::PointerUp {
                button: PointerButton::Primary,
                ..
            } => self.primary_held = false,
            _ => {}
        }
        let kind = event.kind();
        let Some(handler) = self.handlers.get_mut(&kind) else {
            log::warn!("no handler registered for event kind {kind:?}, dropping");
            return false;
        };
        let mut dispatch = Dispatch {
            primary_held: self.primary_held,
            redraw: false,
        };
        handler(screen, event, &mut dispatch);
        dispatch.redraw
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

/// Press: register the hit, deactivating whatever else was mid-interaction.
fn on_pointer_down(screen: &mut Screen, event: &Event, dispatch: &mut Dispatch) {
    let Event::PointerDown { button, pos } = *event else {
        return;
    };
    if button != PointerButton::Primary {
        return;
    }
    let prev = screen.root.focus_path();
    let hit = screen.root.hit_register(pos);
    if !prev.is_empty() && screen.root.active_at(&prev) == Some(true) {
        // an element elsewhere is still editing/expanded: wind it down
        if !hit || screen.root.focus_path() != prev {
            screen.root.stop_at(&prev);
            dispatch.redraw = true;
        }
    }
    if hit {
        screen.root.press_focus(pos);
    }
}

/// Release: click the held element if the pointer never left it.
fn on_pointer_up(screen: &mut Screen, event: &Event, _dispatch: &mut Dispatch) {
    let Event::PointerUp { button, pos } = *event else {
        return;
    };
    if button != PointerButton::Primary {
        return;
    }
    if screen.root.still_focused(pos) {
        screen.root.click_focus(pos);
        // keep focus only while the interaction continues (editing, open list)
        if screen.root.deepest_active() != Some(true) {
            screen.root.drop_focus();
        }
    } else if screen.root.focus.is_some() {
        screen.root.notify_lost_focus();
        screen.root.drop_focus();
    }
}

/// Move: the single cancellation path. Dragging off a pressed element clears
/// focus and fires its lost-focus action synchronously.
fn on_pointer_move(screen: &mut Screen, event: &Event, dispatch: &mut Dispatch) {
    let Event::PointerMove { pos } = *event else {
        return;
    };
    if screen.root.focus.is_none() || !dispatch.primary_held {
        return;
    }
    if !screen.root.still_focused(pos) {
        screen.root.notify_lost_focus();
        screen.root.drop_focus();
    }
}

fn on_wheel(screen: &mut Screen, event: &Event, _dispatch: &mut Dispatch) {
    let Event::Wheel { delta, precise } = *event else {
        return;
    };
    screen.root.scroll_focus(delta, precise);
}

fn on_key_down(screen: &mut Screen, event: &Event, dispatch: &mut Dispatch) {
    let Event::KeyDown { ch, key } = *event else {
        return;
    };
    if screen.root.key_focus(ch, key) {
        dispatch.redraw = true;
    }
}

fn on_key_up(_screen: &mut Screen, _event: &Event, _dispatch: &mut Dispatch) {}
