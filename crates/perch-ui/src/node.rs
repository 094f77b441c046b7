use perch_core::{Align, Anchor, Position, Rect, Size};

/// Identity token of an owning container. Children keep it only for
/// membership diagnostics; ownership flows strictly downward through the
/// container's arena and upward lookups are resolved by the container itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParentId(pub(crate) u64);

/// Positioned, aligned, z-ordered tree node.
///
/// The cached bounding rect is authoritative: it is recomputed on every
/// explicit position/anchor/content/reference change and never lazily at
/// read time.
#[derive(Clone, Debug)]
pub struct Node {
    pub name: String,
    pub priority: i32,
    pos: Position,
    anchor: Anchor,
    rect: Rect,
    parent: Option<ParentId>,
    reference: Size,
}

impl Node {
    pub fn new(pos: Position, content: Size, priority: i32, name: &str) -> Self {
        let mut node = Self {
            name: name.to_owned(),
            priority,
            pos,
            anchor: Anchor::CENTER,
            rect: Rect::from_size(content),
            parent: None,
            reference: Size::ZERO,
        };
        node.update_pos(None);
        node
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn pos(&self) -> Position {
        self.pos
    }

    pub fn anchor(&self) -> Anchor {
        self.anchor
    }

    pub fn parent(&self) -> Option<ParentId> {
        self.parent
    }

    pub fn set_pos(&mut self, pos: Position) {
        self.pos = pos;
        self.update_pos(None);
    }

    pub fn set_anchor(&mut self, anchor: Anchor) {
        self.anchor = anchor;
        self.update_pos(None);
    }

    /// Content size changed; the rect tracks it and the anchor re-applies.
    pub fn set_content_size(&mut self, size: Size) {
        self.rect.w = size.w;
        self.rect.h = size.h;
        self.update_pos(None);
    }

    /// Re-resolve the rect, optionally against a new reference size.
    pub fn update_pos(&mut self, reference: Option<Size>) {
        if let Some(r) = reference {
            self.reference = r;
        }
        let p = self.pos.resolve(self.reference);
        match self.anchor.h {
            Align::Start => self.rect.set_left(p.x),
            Align::Center => self.rect.set_centerx(p.x),
            Align::End => self.rect.set_right(p.x),
        }
        match self.anchor.v {
            Align::Start => self.rect.set_top(p.y),
            Align::Center => self.rect.set_centery(p.y),
            Align::End => self.rect.set_bottom(p.y),
        }
    }

    pub(crate) fn attach(&mut self, parent: ParentId, reference: Size) {
        self.parent = Some(parent);
        self.update_pos(Some(reference));
    }

    pub(crate) fn detach(&mut self) {
        self.parent = None;
    }

    /// Shrink the rect to a cropped content region, keeping its on-screen
    /// placement (the region is relative to the old rect's top-left).
    pub(crate) fn crop_rect(&mut self, region: Rect) {
        self.rect = Rect::new(
            self.rect.x + region.x,
            self.rect.y + region.y,
            region.w,
            region.h,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perch_core::Point;

    fn anchored(anchor: Anchor) -> Node {
        let mut node = Node::new(Position::Fraction(0.5, 0.5), Size::new(20, 10), 5, "n");
        node.set_anchor(anchor);
        node.update_pos(Some(Size::new(100, 100)));
        node
    }

    #[test]
    fn anchor_pins_the_expected_edge() {
        assert_eq!(anchored(Anchor::TOP_LEFT).rect().top_left(), Point::new(50, 50));
        assert_eq!(anchored(Anchor::CENTER).rect().center(), Point::new(50, 50));
        let r = anchored(Anchor::BOTTOM_RIGHT).rect();
        assert_eq!((r.right(), r.bottom()), (50, 50));
        let r = anchored(Anchor { h: Align::End, v: Align::Start }).rect();
        assert_eq!((r.right(), r.top()), (50, 50));
    }

    #[test]
    fn anchored_edge_is_independent_of_content_size() {
        let mut node = anchored(Anchor::TOP_RIGHT);
        node.set_content_size(Size::new(40, 40));
        assert_eq!(node.rect().right(), 50);
        assert_eq!(node.rect().top(), 50);
    }

    #[test]
    fn fraction_resolution_truncates() {
        let mut node = Node::new(Position::Fraction(0.33, 0.0), Size::new(0, 0), 5, "n");
        node.set_anchor(Anchor::TOP_LEFT);
        node.update_pos(Some(Size::new(10, 10)));
        assert_eq!(node.rect().left(), 3);
    }

    #[test]
    fn pixel_positions_ignore_the_reference() {
        let mut node = Node::new(Position::Pixels(7.0, 9.0), Size::new(2, 2), 5, "n");
        node.set_anchor(Anchor::TOP_LEFT);
        node.update_pos(Some(Size::new(1000, 1000)));
        assert_eq!(node.rect().top_left(), Point::new(7, 9));
    }
}
