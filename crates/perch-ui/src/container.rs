use std::sync::atomic::{AtomicU64, Ordering};

use slotmap::SlotMap;
use smallvec::SmallVec;

use perch_core::input::Key;
use perch_core::{Anchor, Point, Position, Rect, Size};
use perch_surface::Pixmap;

use crate::dropdown::Dropdown;
use crate::node::{Node, ParentId};
use crate::textfield::TextField;
use crate::widget::{Sprite, Widget};

slotmap::new_key_type! {
    /// Non-owning handle to a container child. Focus references and parent
    /// back-references are keys, never pointers; every use re-validates
    /// membership because a callback may have removed the child meanwhile.
    pub struct ChildKey;
}

/// Root-to-leaf chain of focus keys.
pub type FocusPath = SmallVec<[ChildKey; 4]>;

static NEXT_PARENT_ID: AtomicU64 = AtomicU64::new(1);

/// Closed set of tree elements; dispatch is a `match`, not a vtable.
pub enum Element {
    Sprite(Sprite),
    Button(Widget),
    Field(TextField),
    Dropdown(Dropdown),
    Menu(Container),
}

impl Element {
    pub fn node(&self) -> &Node {
        match self {
            Element::Sprite(s) => &s.node,
            Element::Button(w) => &w.node,
            Element::Field(t) => &t.widget.node,
            Element::Dropdown(d) => &d.widget.node,
            Element::Menu(m) => &m.node,
        }
    }

    pub fn node_mut(&mut self) -> &mut Node {
        match self {
            Element::Sprite(s) => &mut s.node,
            Element::Button(w) => &mut w.node,
            Element::Field(t) => &mut t.widget.node,
            Element::Dropdown(d) => &mut d.widget.node,
            Element::Menu(m) => &mut m.node,
        }
    }

    fn is_interactive(&self) -> bool {
        matches!(
            self,
            Element::Button(_) | Element::Field(_) | Element::Dropdown(_)
        )
    }

    fn active(&self) -> bool {
        match self {
            Element::Sprite(_) => false,
            Element::Button(w) => w.active,
            Element::Field(t) => t.widget.active,
            Element::Dropdown(d) => d.widget.active,
            Element::Menu(m) => m.active,
        }
    }
}

/// Ordered collection of children composing onto one canvas.
///
/// Children are owned by a slotmap arena; `order` is the draw order (ascending
/// priority, insertion-stable), `interactive` and `menus` are insertion-order
/// views used for hit routing. Sub-menus take hit priority over sibling leaf
/// widgets regardless of draw order.
pub struct Container {
    id: ParentId,
    pub node: Node,
    /// Composed output of the last `draw`.
    canvas: Pixmap,
    /// Current background, possibly baked.
    background: Pixmap,
    /// Pristine background.
    source: Pixmap,
    children: SlotMap<ChildKey, Element>,
    order: Vec<ChildKey>,
    interactive: Vec<ChildKey>,
    menus: Vec<ChildKey>,
    pub focus: Option<ChildKey>,
    pub active: bool,
}

impl Container {
    pub fn new(pos: Position, background: Pixmap) -> Self {
        let node = Node::new(pos, background.size(), 25, "menu");
        Self {
            id: ParentId(NEXT_PARENT_ID.fetch_add(1, Ordering::Relaxed)),
            node,
            canvas: background.clone(),
            source: background.clone(),
            background,
            children: SlotMap::with_key(),
            order: Vec::new(),
            interactive: Vec::new(),
            menus: Vec::new(),
            focus: None,
            active: false,
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

    pub fn id(&self) -> ParentId {
        self.id
    }

    pub fn canvas(&self) -> &Pixmap {
        &self.canvas
    }

    pub(crate) fn canvas_mut(&mut self) -> &mut Pixmap {
        &mut self.canvas
    }

    pub fn child(&self, key: ChildKey) -> Option<&Element> {
        self.children.get(key)
    }

    pub fn child_mut(&mut self, key: ChildKey) -> Option<&mut Element> {
        self.children.get_mut(key)
    }

    pub fn contains(&self, key: ChildKey) -> bool {
        self.children.contains_key(key)
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Attach a child: interactive kinds join hit routing, menus join the
    /// sub-menu scan, everything joins the render list.
    pub fn add(&mut self, element: Element) -> ChildKey {
        let interactive = element.is_interactive();
        let is_menu = matches!(element, Element::Menu(_));
        let key = self.children.insert(element);
        self.order.push(key);
        let id = self.id;
        let viewport = self.node.rect().size();
        self.children[key].node_mut().attach(id, viewport);
        if interactive {
            self.interactive.push(key);
        }
        if is_menu {
            self.menus.push(key);
        }
        self.sort_children();
        key
    }

    /// Attach a display-only child: drawn, never hit-tested (a text field
    /// added this way is a plain value readout).
    pub fn add_display(&mut self, element: Element) -> ChildKey {
        let key = self.children.insert(element);
        self.order.push(key);
        let id = self.id;
        let viewport = self.node.rect().size();
        self.children[key].node_mut().attach(id, viewport);
        self.sort_children();
        key
    }

    /// Detach a child, clearing focus if it pointed there. Removing an
    /// absent child is a logged no-op.
    pub fn remove(&mut self, key: ChildKey) -> Option<Element> {
        let Some(mut element) = self.children.remove(key) else {
            log::warn!("remove: child not present in container '{}'", self.node.name);
            return None;
        };
        self.order.retain(|&k| k != key);
        self.interactive.retain(|&k| k != key);
        self.menus.retain(|&k| k != key);
        if self.focus == Some(key) {
            self.focus = None;
        }
        element.node_mut().detach();
        Some(element)
    }

    /// Re-derive the draw order from child priorities (stable, so insertion
    /// order breaks ties). Called automatically on add; call after mutating
    /// a child's priority in place.
    pub fn sort_children(&mut self) {
        let Self { order, children, .. } = self;
        order.sort_by_key(|&k| children[k].node().priority);
    }

    pub fn buttons_named(&self, name: &str) -> Vec<ChildKey> {
        self.interactive
            .iter()
            .copied()
            .filter(|&k| self.children[k].node().name == name)
            .collect()
    }

    pub fn menus_named(&self, name: &str) -> Vec<ChildKey> {
        self.menus
            .iter()
            .copied()
            .filter(|&k| self.children[k].node().name == name)
            .collect()
    }

    pub fn sprites_named(&self, name: &str) -> Vec<ChildKey> {
        self.order
            .iter()
            .copied()
            .filter(|&k| self.children[k].node().name == name)
            .collect()
    }

    /// Compose background plus every child in draw order onto the canvas.
    /// Idempotent: with no state change, repeated calls produce identical
    /// pixels.
    pub fn draw(&mut self) {
        let Self {
            canvas,
            background,
            children,
            order,
            ..
        } = self;
        if canvas.size() == background.size() {
            *canvas = background.clone();
        } else {
            *canvas = Pixmap::new(canvas.size());
            canvas.blit(background, Point::new(0, 0));
        }
        // open dropdown lists compose directly onto the canvas, beneath the
        // render-list blits
        for &key in order.iter() {
            if let Some(Element::Dropdown(dropdown)) = children.get(key) {
                if let Some((slice, at)) = dropdown.list_slice() {
                    canvas.blit(&slice, at);
                }
            }
        }
        for &key in order.iter() {
            let Some(child) = children.get_mut(key) else {
                continue;
            };
            let at = child.node().rect().top_left();
            match child {
                Element::Sprite(s) => canvas.blit(s.image(), at),
                Element::Button(w) => canvas.blit(w.image(), at),
                Element::Field(t) => canvas.blit(&t.render(), at),
                Element::Dropdown(d) => canvas.blit(d.widget.image(), at),
                Element::Menu(m) => {
                    m.draw();
                    canvas.blit(&m.canvas, at);
                }
            }
        }
    }

    /// Merge the current composition into the background and drop all
    /// children. Baked content no longer redraws or hit-tests; baking is
    /// irreversible.
    pub fn bake_background(&mut self) {
        self.draw();
        self.background = self.canvas.clone();
        self.children.clear();
        self.order.clear();
        self.interactive.clear();
        self.menus.clear();
        self.focus = None;
    }

    /// Revert to the pristine background (does not un-bake).
    pub fn clear_background(&mut self) {
        self.background = self.source.clone();
    }

    /// Drop all children and revert to the pristine background.
    pub fn clear(&mut self) {
        self.children.clear();
        self.order.clear();
        self.interactive.clear();
        self.menus.clear();
        self.focus = None;
        self.background = self.source.clone();
    }

    /// Swap in a new background, resizing the container to match.
    pub fn set_background(&mut self, background: Pixmap, redraw: bool) {
        self.node.set_content_size(background.size());
        self.canvas = Pixmap::new(background.size());
        self.source = background.clone();
        self.background = background;
        self.refresh_child_positions();
        if redraw {
            self.draw();
        }
    }

    /// Swap backgrounds without touching geometry (root surfaces track the
    /// physical display size instead).
    pub(crate) fn replace_background(&mut self, background: Pixmap) {
        self.source = background.clone();
        self.background = background;
    }

    pub(crate) fn resize_canvas(&mut self, size: Size) {
        self.canvas = Pixmap::new(size);
        self.node.set_content_size(size);
        self.refresh_child_positions();
    }

    /// Recenter the pristine background on the current canvas, reallocating
    /// the working background when the canvas size changed.
    pub(crate) fn center_background(&mut self) {
        let canvas_rect = Rect::from_size(self.canvas.size());
        let mut src_rect = Rect::from_size(self.source.size());
        src_rect.set_center(canvas_rect.center());
        if self.background.size() != self.canvas.size() {
            self.background = self.canvas.clone();
        }
        self.background.blit(&self.source, src_rect.top_left());
    }

    fn refresh_child_positions(&mut self) {
        let viewport = self.node.rect().size();
        for (_, child) in self.children.iter_mut() {
            child.node_mut().update_pos(Some(viewport));
        }
    }

    fn localize(&self, pos: Point) -> Point {
        let rect = self.node.rect();
        pos.offset(-rect.left(), -rect.top())
    }

    /// Find the first hit element and take focus along the way: sub-menus in
    /// insertion order first (recursively), then interactive children in
    /// insertion order. A miss leaves focus untouched.
    pub fn hit_register(&mut self, pos: Point) -> bool {
        let local = self.localize(pos);
        for i in 0..self.menus.len() {
            let key = self.menus[i];
            let hit = match self.children.get_mut(key) {
                Some(Element::Menu(menu)) => {
                    menu.node.rect().contains(local) && menu.hit_register(local)
                }
                _ => false,
            };
            if hit {
                self.focus = Some(key);
                return true;
            }
        }
        for i in 0..self.interactive.len() {
            let key = self.interactive[i];
            let hit = match self.children.get_mut(key) {
                Some(Element::Button(w)) => w.is_hit(local),
                Some(Element::Field(t)) => t.widget.is_hit(local),
                Some(Element::Dropdown(d)) => d.is_hit(local),
                _ => false,
            };
            if hit {
                self.focus = Some(key);
                return true;
            }
        }
        false
    }

    /// Whether the current focus still claims `pos`.
    pub fn still_focused(&self, pos: Point) -> bool {
        let Some(key) = self.focus else {
            return false;
        };
        let local = self.localize(pos);
        match self.children.get(key) {
            Some(Element::Button(w)) => w.still_focused(local),
            Some(Element::Field(t)) => t.widget.still_focused(local),
            Some(Element::Dropdown(d)) => d.still_focused(local),
            Some(Element::Menu(m)) => m.still_focused(local),
            Some(Element::Sprite(_)) | None => false,
        }
    }

    /// Root-to-leaf chain of focus keys; truncates at any stale link.
    pub fn focus_path(&self) -> FocusPath {
        let mut path = FocusPath::new();
        let mut cur = self;
        loop {
            let Some(key) = cur.focus else { break };
            let Some(child) = cur.children.get(key) else { break };
            path.push(key);
            match child {
                Element::Menu(menu) => cur = menu,
                _ => break,
            }
        }
        path
    }

    /// `active` flag of the element a focus path ends at, if it still exists.
    pub fn active_at(&self, path: &[ChildKey]) -> Option<bool> {
        let (&key, rest) = path.split_first()?;
        match self.children.get(key)? {
            Element::Menu(menu) if !rest.is_empty() => menu.active_at(rest),
            element if rest.is_empty() => Some(element.active()),
            _ => None,
        }
    }

    /// `active` flag of the deepest currently-focused element.
    pub fn deepest_active(&self) -> Option<bool> {
        self.active_at(&self.focus_path())
    }

    /// Deactivate the element at `path`: commit an editing field, fold an
    /// open dropdown. Stale paths are ignored.
    pub fn stop_at(&mut self, path: &[ChildKey]) {
        let Some((&key, rest)) = path.split_first() else {
            return;
        };
        match self.children.get_mut(key) {
            Some(Element::Menu(menu)) => menu.stop_at(rest),
            Some(Element::Field(field)) if rest.is_empty() => field.stop(),
            Some(Element::Dropdown(dropdown)) if rest.is_empty() => dropdown.close(),
            _ => {}
        }
    }

    /// Press the focused element (pointer held down on it).
    pub fn press_focus(&mut self, pos: Point) {
        let Some(key) = self.focus else { return };
        let local = self.localize(pos);
        match self.children.get_mut(key) {
            Some(Element::Menu(menu)) => menu.press_focus(local),
            Some(Element::Button(w)) => {
                let action = w.press.clone();
                action();
            }
            Some(Element::Field(field)) => field.press(local),
            Some(Element::Dropdown(dropdown)) => {
                let action = dropdown.widget.press.clone();
                action();
            }
            _ => {}
        }
    }

    /// Click the focused element (pointer released while still on it).
    pub fn click_focus(&mut self, pos: Point) {
        let Some(key) = self.focus else { return };
        let local = self.localize(pos);
        match self.children.get_mut(key) {
            Some(Element::Menu(menu)) => menu.click_focus(local),
            Some(Element::Button(w)) => {
                let action = w.click.clone();
                action();
            }
            Some(Element::Field(field)) => field.activate(local),
            Some(Element::Dropdown(dropdown)) => dropdown.click(),
            _ => {}
        }
    }

    /// Run the focused element's hover action.
    pub fn hover_focus(&mut self) {
        let Some(key) = self.focus else { return };
        match self.children.get_mut(key) {
            Some(Element::Menu(menu)) => menu.hover_focus(),
            Some(Element::Button(w)) => {
                let action = w.hover.clone();
                action();
            }
            Some(Element::Field(field)) => {
                let action = field.widget.hover.clone();
                action();
            }
            Some(Element::Dropdown(dropdown)) => {
                let action = dropdown.widget.hover.clone();
                action();
            }
            _ => {}
        }
    }

    /// Notify the focused element that the pointer left it while held.
    pub fn notify_lost_focus(&mut self) {
        let Some(key) = self.focus else { return };
        match self.children.get_mut(key) {
            Some(Element::Menu(menu)) => menu.notify_lost_focus(),
            Some(Element::Button(w)) => {
                let action = w.lost_focus.clone();
                action();
            }
            Some(Element::Field(field)) => {
                let action = field.widget.lost_focus.clone();
                action();
            }
            Some(Element::Dropdown(dropdown)) => {
                let action = dropdown.widget.lost_focus.clone();
                action();
            }
            _ => {}
        }
    }

    pub fn drop_focus(&mut self) {
        self.focus = None;
    }

    /// Route a wheel event to the focused element (open dropdowns only).
    pub fn scroll_focus(&mut self, delta: f32, precise: bool) {
        let Some(key) = self.focus else { return };
        match self.children.get_mut(key) {
            Some(Element::Menu(menu)) => menu.scroll_focus(delta, precise),
            Some(Element::Dropdown(dropdown)) => dropdown.on_scroll(delta, precise),
            _ => {}
        }
    }

    /// Route a key to the focused element; true when an editing field took
    /// it (and a redraw is warranted).
    pub fn key_focus(&mut self, ch: Option<char>, key: Key) -> bool {
        let Some(k) = self.focus else { return false };
        match self.children.get_mut(k) {
            Some(Element::Menu(menu)) => menu.key_focus(ch, key),
            Some(Element::Field(field)) if field.widget.active => {
                field.handle_input(ch, key);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::noop;
    use perch_core::Color;

    fn solid(w: u32, h: u32, c: Color) -> Pixmap {
        Pixmap::solid(Size::new(w, h), c)
    }

    fn button_at(x: f32, y: f32, w: u32, h: u32) -> Widget {
        Widget::new(
            Position::Pixels(x, y),
            solid(w, h, Color::WHITE),
            noop(),
        )
        .anchor(Anchor::TOP_LEFT)
    }

    fn container(w: u32, h: u32) -> Container {
        Container::new(Position::Pixels(0.0, 0.0), solid(w, h, Color(20, 20, 20, 255)))
            .anchor(Anchor::TOP_LEFT)
    }

    #[test]
    fn add_then_remove_restores_child_lists_and_focus() {
        let mut root = container(100, 100);
        let key = root.add(Element::Button(button_at(0.0, 0.0, 10, 10)));
        assert!(root.hit_register(Point::new(5, 5)));
        assert_eq!(root.focus, Some(key));
        let removed = root.remove(key);
        assert!(removed.is_some());
        assert_eq!(root.child_count(), 0);
        assert_eq!(root.focus, None);
        assert!(!root.hit_register(Point::new(5, 5)));
    }

    #[test]
    fn removing_an_absent_child_is_a_noop() {
        let mut root = container(100, 100);
        let key = root.add(Element::Button(button_at(0.0, 0.0, 10, 10)));
        root.remove(key);
        assert!(root.remove(key).is_none());
    }

    #[test]
    fn hit_prefers_insertion_order_over_priority() {
        let mut root = container(100, 100);
        let first = root.add(Element::Button(button_at(0.0, 0.0, 20, 20).priority(1)));
        let _second = root.add(Element::Button(button_at(0.0, 0.0, 20, 20).priority(2)));
        assert!(root.hit_register(Point::new(10, 10)));
        assert_eq!(root.focus, Some(first));
    }

    #[test]
    fn submenus_take_hit_priority_over_sibling_widgets() {
        let mut root = container(100, 100);
        let _button = root.add(Element::Button(button_at(0.0, 0.0, 40, 40)));
        let mut menu = container(40, 40);
        let inner = menu.add(Element::Button(button_at(0.0, 0.0, 40, 40)));
        let menu_key = root.add(Element::Menu(menu));
        assert!(root.hit_register(Point::new(10, 10)));
        assert_eq!(root.focus, Some(menu_key));
        assert_eq!(root.focus_path().as_slice(), &[menu_key, inner]);
    }

    #[test]
    fn miss_leaves_focus_untouched() {
        let mut root = container(100, 100);
        let key = root.add(Element::Button(button_at(0.0, 0.0, 10, 10)));
        assert!(root.hit_register(Point::new(5, 5)));
        assert!(!root.hit_register(Point::new(90, 90)));
        assert_eq!(root.focus, Some(key));
    }

    #[test]
    fn draw_respects_priority_and_insertion_order() {
        let mut root = container(10, 10);
        root.add(Element::Sprite(
            Sprite::new(Position::Pixels(0.0, 0.0), solid(10, 10, Color(255, 0, 0, 255)))
                .priority(10)
                .anchor(Anchor::TOP_LEFT),
        ));
        root.add(Element::Sprite(
            Sprite::new(Position::Pixels(0.0, 0.0), solid(10, 10, Color(0, 255, 0, 255)))
                .priority(5)
                .anchor(Anchor::TOP_LEFT),
        ));
        root.draw();
        // the priority-10 sprite draws last even though added first
        assert_eq!(root.canvas().get(5, 5), Color(255, 0, 0, 255));

        // same priority: later insertion draws on top
        let mut root = container(10, 10);
        root.add(Element::Sprite(
            Sprite::new(Position::Pixels(0.0, 0.0), solid(10, 10, Color(255, 0, 0, 255)))
                .anchor(Anchor::TOP_LEFT),
        ));
        root.add(Element::Sprite(
            Sprite::new(Position::Pixels(0.0, 0.0), solid(10, 10, Color(0, 0, 255, 255)))
                .anchor(Anchor::TOP_LEFT),
        ));
        root.draw();
        assert_eq!(root.canvas().get(5, 5), Color(0, 0, 255, 255));
    }

    #[test]
    fn draw_is_idempotent() {
        let mut root = container(20, 20);
        root.add(Element::Button(button_at(2.0, 2.0, 8, 8)));
        root.draw();
        let first = root.canvas().clone();
        root.draw();
        assert_eq!(root.canvas(), &first);
    }

    #[test]
    fn bake_merges_and_stops_hit_testing() {
        let mut root = container(20, 20);
        root.add(Element::Button(button_at(0.0, 0.0, 10, 10)));
        root.draw();
        let composed = root.canvas().clone();
        root.bake_background();
        assert_eq!(root.child_count(), 0);
        assert!(!root.hit_register(Point::new(5, 5)));
        root.draw();
        // the button's pixels are still there, permanently merged
        assert_eq!(root.canvas(), &composed);
        // reverting to the pristine background is explicit
        root.clear_background();
        root.draw();
        assert_eq!(root.canvas().get(5, 5), Color(20, 20, 20, 255));
    }

    #[test]
    fn clear_empties_children_and_restores_background() {
        let mut root = container(20, 20);
        root.add(Element::Button(button_at(0.0, 0.0, 10, 10)));
        root.add(Element::Menu(container(5, 5)));
        root.hit_register(Point::new(5, 5));
        root.clear();
        assert_eq!(root.child_count(), 0);
        assert_eq!(root.focus, None);
        root.draw();
        assert_eq!(root.canvas().get(5, 5), Color(20, 20, 20, 255));
    }

    #[test]
    fn nested_menu_coordinates_are_localized() {
        let mut root = container(100, 100);
        let mut menu = container(40, 40);
        let inner = menu.add(Element::Button(button_at(10.0, 10.0, 10, 10)));
        let menu = Element::Menu({
            let mut m = menu;
            m.node.set_pos(Position::Pixels(50.0, 50.0));
            m
        });
        let menu_key = root.add(menu);
        // global (62, 62) -> menu-local (12, 12) -> inside the inner button
        assert!(root.hit_register(Point::new(62, 62)));
        assert_eq!(root.focus_path().as_slice(), &[menu_key, inner]);
        assert!(root.still_focused(Point::new(62, 62)));
        assert!(!root.still_focused(Point::new(95, 95)));
    }

    #[test]
    fn still_focused_validates_membership() {
        let mut root = container(100, 100);
        let mut menu = container(40, 40);
        let inner = menu.add(Element::Button(button_at(0.0, 0.0, 10, 10)));
        let menu_key = root.add(Element::Menu(menu));
        assert!(root.hit_register(Point::new(5, 5)));
        // a callback removed the inner child behind our back
        if let Some(Element::Menu(m)) = root.child_mut(menu_key) {
            m.remove(inner);
        }
        assert!(!root.still_focused(Point::new(5, 5)));
        assert_eq!(root.deepest_active(), Some(false));
    }

    #[test]
    fn name_lookups_filter_by_kind() {
        let mut root = container(100, 100);
        root.add(Element::Button(button_at(0.0, 0.0, 5, 5).name("ok")));
        root.add(Element::Button(button_at(0.0, 0.0, 5, 5).name("cancel")));
        root.add(Element::Menu(container(10, 10).name("ok")));
        assert_eq!(root.buttons_named("ok").len(), 1);
        assert_eq!(root.menus_named("ok").len(), 1);
        // names are not unique across the render list
        assert_eq!(root.sprites_named("ok").len(), 2);
    }

    #[test]
    fn set_background_resizes_and_recomputes_children() {
        let mut root = container(100, 100);
        let key = root.add(Element::Button(
            Widget::new(
                Position::Fraction(0.5, 0.5),
                solid(10, 10, Color::WHITE),
                noop(),
            ),
        ));
        assert_eq!(root.child(key).unwrap().node().rect().center(), Point::new(50, 50));
        root.set_background(solid(200, 200, Color(20, 20, 20, 255)), false);
        assert_eq!(root.child(key).unwrap().node().rect().center(), Point::new(100, 100));
    }
}
