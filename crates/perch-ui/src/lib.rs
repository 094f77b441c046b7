//! Perch's retained-mode widget tree.
//!
//! A [`Screen`] owns a tree of positioned, z-ordered elements — sprites,
//! buttons, text fields, dropdown lists, and nested sub-menus — that compose
//! their rendered output onto a shared [`perch_surface::Pixmap`] and route
//! pointer/keyboard events to the correct element.
//!
//! The usual wiring:
//!
//! 1. Build a [`Screen`] sized to the display and `add` elements to
//!    `screen.root` (or to nested [`Container`]s).
//! 2. Feed every [`perch_core::input::Event`] through a [`Router`].
//! 3. When the router (or your own state) asks for a frame, call
//!    [`Screen::draw_screen`] with your [`Display`] implementation.
//!
//! Containers own their children in an arena; focus and parent references
//! are non-owning keys that are re-validated on every use, so callbacks may
//! restructure the tree mid-event without leaving dangling references.

pub mod container;
pub mod dropdown;
pub mod node;
pub mod router;
pub mod screen;
pub mod textfield;
pub mod widget;

pub use container::{ChildKey, Container, Element, FocusPath};
pub use dropdown::{Dropdown, DropdownOption};
pub use node::{Node, ParentId};
pub use router::{Dispatch, Handler, Router};
pub use screen::{Display, DisplayMode, Screen};
pub use textfield::{TextAlign, TextField};
pub use widget::{Action, Sprite, Widget, action};
