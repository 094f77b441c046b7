use crate::geometry::Point;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerButton {
    Primary,   // Left mouse, touch
    Secondary, // Right mouse
    Tertiary,  // Middle mouse
}

/// Symbolic key code. Printable payloads travel separately in
/// [`Event::KeyDown`] so a key carries both, matching what window systems
/// report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Character(char),
    Enter,
    Tab,
    Backspace,
    Delete,
    Escape,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Home,
    End,
    Space,
    Other,
}

/// One discrete input event, already in display pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Event {
    PointerDown { button: PointerButton, pos: Point },
    PointerUp { button: PointerButton, pos: Point },
    PointerMove { pos: Point },
    /// `precise` distinguishes pixel-exact deltas from raw wheel units; some
    /// hosts report the precise axis inverted.
    Wheel { delta: f32, precise: bool },
    KeyDown { ch: Option<char>, key: Key },
    KeyUp { key: Key },
}

/// Dispatch-table key for [`Event`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    PointerDown,
    PointerUp,
    PointerMove,
    Wheel,
    KeyDown,
    KeyUp,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::PointerDown { .. } => EventKind::PointerDown,
            Event::PointerUp { .. } => EventKind::PointerUp,
            Event::PointerMove { .. } => EventKind::PointerMove,
            Event::Wheel { .. } => EventKind::Wheel,
            Event::KeyDown { .. } => EventKind::KeyDown,
            Event::KeyUp { .. } => EventKind::KeyUp,
        }
    }
}
