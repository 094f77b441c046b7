use std::rc::Rc;

use perch_core::{Anchor, Point, Position};
use perch_surface::{Mask, Pixmap};

use crate::node::Node;

/// First-class widget action, re-assignable at runtime.
pub type Action = Rc<dyn Fn()>;

pub fn action(f: impl Fn() + 'static) -> Action {
    Rc::new(f)
}

pub(crate) fn noop() -> Action {
    Rc::new(|| {})
}

/// Plain visual element: drawn, never hit-tested.
#[derive(Clone)]
pub struct Sprite {
    pub node: Node,
    image: Pixmap,
}

impl Sprite {
    pub fn new(pos: Position, image: Pixmap) -> Self {
        let node = Node::new(pos, image.size(), 5, "sprite");
        Self { node, image }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.node.name = name.to_owned();
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.node.priority = priority;
        self
    }

    pub fn anchor(mut self, anchor: Anchor) -> Self {
        self.node.set_anchor(anchor);
        self
    }

    pub fn image(&self) -> &Pixmap {
        &self.image
    }

    pub fn set_image(&mut self, image: Pixmap) {
        self.node.set_content_size(image.size());
        self.image = image;
    }
}

/// Interactive visual element: pixel content, an opacity mask derived from
/// it, an `active` flag for in-progress interactions, and four injectable
/// action slots.
#[derive(Clone)]
pub struct Widget {
    pub node: Node,
    image: Pixmap,
    mask: Mask,
    pub active: bool,
    pub click: Action,
    pub hover: Action,
    pub press: Action,
    pub lost_focus: Action,
}

impl Widget {
    pub fn new(pos: Position, image: Pixmap, click: Action) -> Self {
        let node = Node::new(pos, image.size(), 15, "button");
        let mask = Mask::from_alpha(&image, 0);
        Self {
            node,
            image,
            mask,
            active: false,
            click,
            hover: noop(),
            press: noop(),
            lost_focus: noop(),
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.node.name = name.to_owned();
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.node.priority = priority;
        self
    }

    pub fn anchor(mut self, anchor: Anchor) -> Self {
        self.node.set_anchor(anchor);
        self
    }

    pub fn on_hover(mut self, action: Action) -> Self {
        self.hover = action;
        self
    }

    pub fn on_press(mut self, action: Action) -> Self {
        self.press = action;
        self
    }

    pub fn on_lost_focus(mut self, action: Action) -> Self {
        self.lost_focus = action;
        self
    }

    pub fn image(&self) -> &Pixmap {
        &self.image
    }

    pub fn set_image(&mut self, image: Pixmap) {
        self.node.set_content_size(image.size());
        self.mask = Mask::from_alpha(&image, 0);
        self.image = image;
    }

    /// True iff `pos` (in the owning container's space) lands inside the
    /// bounding rect and on a non-transparent pixel.
    pub fn is_hit(&self, pos: Point) -> bool {
        let rect = self.node.rect();
        rect.contains(pos) && self.mask.get(pos.x - rect.left(), pos.y - rect.top())
    }

    pub fn still_focused(&self, pos: Point) -> bool {
        self.is_hit(pos)
    }

    /// Crop the widget to the tight bounds of its visible pixels, keeping
    /// on-screen placement. Reduces blit area when compositing many widgets.
    pub fn fit_to_content(&mut self, threshold: u8) {
        let bounds = self.image.bounding_rect(threshold);
        self.image = self.image.crop(bounds);
        self.mask = Mask::from_alpha(&self.image, 0);
        self.node.crop_rect(bounds);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perch_core::{Color, Rect, Size};

    fn cross_widget() -> Widget {
        // 3x3 image with only the plus-shaped pixels opaque
        let mut image = Pixmap::new(Size::new(3, 3));
        for &(x, y) in &[(1, 0), (0, 1), (1, 1), (2, 1), (1, 2)] {
            image.put(x, y, Color::WHITE);
        }
        Widget::new(Position::Pixels(10.0, 10.0), image, noop()).anchor(Anchor::TOP_LEFT)
    }

    #[test]
    fn hit_requires_rect_and_mask() {
        let w = cross_widget();
        assert!(w.is_hit(Point::new(11, 10)));
        assert!(w.is_hit(Point::new(10, 11)));
        // inside the rect, transparent corner
        assert!(!w.is_hit(Point::new(10, 10)));
        // outside the rect entirely, regardless of mask
        assert!(!w.is_hit(Point::new(13, 10)));
    }

    #[test]
    fn zero_size_widget_never_hits() {
        let w = Widget::new(Position::Pixels(0.0, 0.0), Pixmap::new(Size::ZERO), noop());
        assert!(!w.is_hit(Point::new(0, 0)));
    }

    #[test]
    fn fit_to_content_shrinks_rect_and_mask() {
        let mut image = Pixmap::new(Size::new(6, 6));
        image.put(2, 2, Color::WHITE);
        image.put(3, 3, Color::WHITE);
        let mut w = Widget::new(Position::Pixels(0.0, 0.0), image, noop()).anchor(Anchor::TOP_LEFT);
        w.fit_to_content(0);
        assert_eq!(w.node.rect(), Rect::new(2, 2, 2, 2));
        assert!(w.is_hit(Point::new(2, 2)));
        assert!(!w.is_hit(Point::new(3, 2)));
    }
}
