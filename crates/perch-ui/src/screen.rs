use perch_core::{Anchor, Point, Position, Size};
use perch_surface::Pixmap;

use crate::container::Container;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayMode {
    Fullscreen,
    Windowed(Size),
}

/// Physical display collaborator: size queries, mode switches, and frame
/// presentation. Window creation and the host event pump live behind this
/// boundary.
pub trait Display {
    fn window_size(&self) -> Size;
    /// Switch modes; returns the resulting display size.
    fn set_mode(&mut self, mode: DisplayMode) -> Size;
    fn present(&mut self, frame: &Pixmap);
}

/// Top of the widget tree: a container pinned to the physical display with
/// absolute top-left coordinates, plus the fullscreen/windowed toggle.
pub struct Screen {
    pub root: Container,
    fullscreen: bool,
    small_size: Size,
}

impl Screen {
    pub fn new(display_size: Size, background: Option<Pixmap>, fullscreen: bool) -> Self {
        let background = background.unwrap_or_else(|| Pixmap::new(display_size));
        let mut root = Container::new(Position::Pixels(0.0, 0.0), background)
            .name("screen")
            .priority(100)
            .anchor(Anchor::TOP_LEFT);
        root.resize_canvas(display_size);
        let small_size = if fullscreen {
            Size::new(display_size.w.div_ceil(2), display_size.h.div_ceil(2))
        } else {
            display_size
        };
        Self {
            root,
            fullscreen,
            small_size,
        }
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn size(&self) -> Size {
        self.root.canvas().size()
    }

    /// Replace the background without resizing; the root always tracks the
    /// physical display size.
    pub fn set_background(&mut self, background: Pixmap) {
        self.root.replace_background(background);
    }

    /// Swap the display mode, carrying the current frame over, then recenter
    /// the background and present a full redraw. The windowed size is
    /// remembered across round trips.
    pub fn toggle_fullscreen(&mut self, display: &mut dyn Display) {
        self.fullscreen = !self.fullscreen;
        let old = self.root.canvas().clone();
        let new_size = if self.fullscreen {
            self.small_size = self.root.node.rect().size();
            display.set_mode(DisplayMode::Fullscreen)
        } else {
            display.set_mode(DisplayMode::Windowed(self.small_size))
        };
        self.root.resize_canvas(new_size);
        self.root.canvas_mut().blit(&old, Point::new(0, 0));
        self.center_background();
        self.draw_screen(display);
    }

    pub fn center_background(&mut self) {
        self.root.center_background();
    }

    /// The frame boundary: compose the full tree and present it.
    pub fn draw_screen(&mut self, display: &mut dyn Display) {
        self.root.draw();
        display.present(self.root.canvas());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perch_core::Color;

    struct HeadlessDisplay {
        size: Size,
        presented: usize,
    }

    impl HeadlessDisplay {
        fn new(size: Size) -> Self {
            Self { size, presented: 0 }
        }
    }

    impl Display for HeadlessDisplay {
        fn window_size(&self) -> Size {
            self.size
        }

        fn set_mode(&mut self, mode: DisplayMode) -> Size {
            match mode {
                DisplayMode::Fullscreen => self.size = Size::new(1920, 1080),
                DisplayMode::Windowed(size) => self.size = size,
            }
            self.size
        }

        fn present(&mut self, _frame: &Pixmap) {
            self.presented += 1;
        }
    }

    #[test]
    fn toggle_round_trip_restores_the_windowed_size() {
        let mut display = HeadlessDisplay::new(Size::new(800, 600));
        let mut screen = Screen::new(display.size, None, false);
        assert!(!screen.is_fullscreen());

        screen.toggle_fullscreen(&mut display);
        assert!(screen.is_fullscreen());
        assert_eq!(screen.size(), Size::new(1920, 1080));
        assert_eq!(display.presented, 1);

        screen.toggle_fullscreen(&mut display);
        assert!(!screen.is_fullscreen());
        assert_eq!(screen.size(), Size::new(800, 600));
    }

    #[test]
    fn fullscreen_screen_halves_its_restore_size() {
        let screen = Screen::new(Size::new(801, 601), None, true);
        assert_eq!(screen.small_size, Size::new(401, 301));
    }

    #[test]
    fn center_background_recenters_the_source() {
        let mut display = HeadlessDisplay::new(Size::new(100, 100));
        let background = Pixmap::solid(Size::new(20, 20), Color::WHITE);
        let mut screen = Screen::new(display.size, Some(background), false);
        screen.toggle_fullscreen(&mut display);
        // 20x20 source centered on the 1920x1080 canvas
        let center = Point::new(960, 540);
        assert_eq!(screen.root.canvas().get(center.x, center.y), Color::WHITE);
        assert_eq!(screen.root.canvas().get(10, 10), Color::TRANSPARENT);
    }
}
