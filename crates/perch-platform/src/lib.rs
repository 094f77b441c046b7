//! Desktop glue: converts `winit` window events into Perch input events and
//! backs the [`Display`] contract with a `winit` window.
//!
//! Presentation is injected as a callback because uploading a CPU frame to a
//! window is renderer-specific; everything else (event conversion, display
//! mode switching, size queries) is handled here.

use std::sync::Arc;

use anyhow::Context;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::{Key as WinitKey, NamedKey};
use winit::window::{Fullscreen, Window, WindowAttributes};

use perch_core::input::{Event, Key, PointerButton};
use perch_core::{Point, Size};
use perch_surface::Pixmap;
use perch_ui::{Display, DisplayMode};

/// Stateful converter from `winit` window events to Perch input events.
///
/// Button events carry no position on `winit`, so the converter tracks the
/// last cursor position itself.
#[derive(Default)]
pub struct WindowInput {
    cursor: Point,
}

impl WindowInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn convert(&mut self, event: &WindowEvent) -> Option<Event> {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = Point::new(position.x as i32, position.y as i32);
                Some(Event::PointerMove { pos: self.cursor })
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let button = match button {
                    MouseButton::Left => PointerButton::Primary,
                    MouseButton::Right => PointerButton::Secondary,
                    MouseButton::Middle => PointerButton::Tertiary,
                    other => {
                        log::debug!("ignoring unmapped mouse button {other:?}");
                        return None;
                    }
                };
                let pos = self.cursor;
                Some(match state {
                    ElementState::Pressed => Event::PointerDown { button, pos },
                    ElementState::Released => Event::PointerUp { button, pos },
                })
            }
            WindowEvent::MouseWheel { delta, .. } => Some(match delta {
                MouseScrollDelta::LineDelta(_, y) => Event::Wheel {
                    delta: *y,
                    precise: false,
                },
                MouseScrollDelta::PixelDelta(pos) => Event::Wheel {
                    delta: pos.y as f32,
                    precise: true,
                },
            }),
            WindowEvent::KeyboardInput { event, .. } => {
                let (ch, key) = match &event.logical_key {
                    WinitKey::Character(s) => {
                        let c = s.chars().next();
                        (c, c.map(Key::Character).unwrap_or(Key::Other))
                    }
                    WinitKey::Named(named) => {
                        let key = match named {
                            NamedKey::Enter => Key::Enter,
                            NamedKey::Tab => Key::Tab,
                            NamedKey::Backspace => Key::Backspace,
                            NamedKey::Delete => Key::Delete,
                            NamedKey::Escape => Key::Escape,
                            NamedKey::ArrowLeft => Key::ArrowLeft,
                            NamedKey::ArrowRight => Key::ArrowRight,
                            NamedKey::ArrowUp => Key::ArrowUp,
                            NamedKey::ArrowDown => Key::ArrowDown,
                            NamedKey::Home => Key::Home,
                            NamedKey::End => Key::End,
                            NamedKey::Space => Key::Space,
                            _ => Key::Other,
                        };
                        let ch = if *named == NamedKey::Space { Some(' ') } else { None };
                        (ch, key)
                    }
                    _ => (None, Key::Other),
                };
                Some(match event.state {
                    ElementState::Pressed => Event::KeyDown { ch, key },
                    ElementState::Released => Event::KeyUp { key },
                })
            }
            _ => None,
        }
    }
}

pub fn create_window(
    event_loop: &ActiveEventLoop,
    title: &str,
    size: Size,
) -> anyhow::Result<Arc<Window>> {
    let attributes = WindowAttributes::default()
        .with_title(title)
        .with_inner_size(PhysicalSize::new(size.w, size.h));
    let window = event_loop
        .create_window(attributes)
        .context("creating the perch window")?;
    Ok(Arc::new(window))
}

pub type PresentFn = Box<dyn FnMut(&Window, &Pixmap)>;

/// [`Display`] backed by a `winit` window plus an injected present callback.
pub struct WinitDisplay {
    window: Arc<Window>,
    present: PresentFn,
}

impl WinitDisplay {
    pub fn new(window: Arc<Window>, present: PresentFn) -> Self {
        Self { window, present }
    }

    pub fn window(&self) -> &Window {
        &self.window
    }
}

impl Display for WinitDisplay {
    fn window_size(&self) -> Size {
        let size = self.window.inner_size();
        Size::new(size.width, size.height)
    }

    /// Mode switches are requests; the authoritative size arrives with the
    /// host's resize event, so the returned size is best-effort.
    fn set_mode(&mut self, mode: DisplayMode) -> Size {
        match mode {
            DisplayMode::Fullscreen => {
                self.window.set_fullscreen(Some(Fullscreen::Borderless(None)));
            }
            DisplayMode::Windowed(size) => {
                self.window.set_fullscreen(None);
                let _ = self
                    .window
                    .request_inner_size(PhysicalSize::new(size.w, size.h));
            }
        }
        self.window_size()
    }

    fn present(&mut self, frame: &Pixmap) {
        (self.present)(&self.window, frame);
    }
}
