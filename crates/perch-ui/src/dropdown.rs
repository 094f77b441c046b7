use std::rc::Rc;

use perch_core::{Anchor, Color, Point, Position, Rect, Size};
use perch_surface::Pixmap;
use perch_text::{TextShaper, centered_label};

use crate::widget::{Action, Widget, noop};

pub struct DropdownOption {
    pub label: String,
    pub action: Action,
}

/// Explicit command bound to the dropdown's click, re-assigned at runtime:
/// fold the list out, or run the option matched by the last hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Binding {
    Open,
    Option(usize),
}

/// Folding option list.
///
/// Closed, the dropdown is an ordinary widget. Open (`active`), it keeps one
/// transient widget per option plus an offscreen composite of all of them;
/// the visible scrolled slice is composed directly below the dropdown's rect,
/// bypassing the parent's render list. Option widgets and the composite are
/// discarded on close.
pub struct Dropdown {
    pub widget: Widget,
    shaper: Rc<dyn TextShaper>,
    options: Vec<DropdownOption>,
    option_template: Pixmap,
    rows: Vec<Widget>,
    list: Option<Pixmap>,
    binding: Binding,
    scroll: f32,
    max_scroll: f32,
    scroll_speed: f32,
}

impl Dropdown {
    pub fn new(
        pos: Position,
        image: Pixmap,
        option_template: Pixmap,
        shaper: Rc<dyn TextShaper>,
    ) -> Self {
        let widget = Widget::new(pos, image, noop()).name("dropdown");
        Self {
            widget,
            shaper,
            options: Vec::new(),
            option_template,
            rows: Vec::new(),
            list: None,
            binding: Binding::Open,
            scroll: 0.0,
            max_scroll: 0.0,
            scroll_speed: 1.0,
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.widget.node.name = name.to_owned();
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.widget.node.priority = priority;
        self
    }

    pub fn anchor(mut self, anchor: Anchor) -> Self {
        self.widget.node.set_anchor(anchor);
        self
    }

    pub fn option(mut self, label: &str, action: Action) -> Self {
        self.options.push(DropdownOption {
            label: label.to_owned(),
            action,
        });
        self
    }

    pub fn is_open(&self) -> bool {
        self.widget.active
    }

    pub fn scroll(&self) -> f32 {
        self.scroll
    }

    pub fn max_scroll(&self) -> f32 {
        self.max_scroll
    }

    /// Fold the list out. Reopening while already open rebuilds the option
    /// widgets; an empty option list leaves the dropdown closed.
    pub fn open(&mut self) {
        self.scroll = 0.0;
        if self.widget.active {
            self.rows.clear();
        }
        if self.options.is_empty() {
            return;
        }
        let row = self.option_template.size();
        let mut list = Pixmap::new(Size::new(row.w, row.h * self.options.len() as u32));
        let mut y = 0i32;
        for opt in &self.options {
            let image = centered_label(
                self.shaper.as_ref(),
                &opt.label,
                &self.option_template,
                Color::WHITE,
                (0.5, 0.5),
            );
            let widget = Widget::new(Position::Pixels(0.0, y as f32), image, noop())
                .name("option")
                .anchor(Anchor::TOP_LEFT);
            list.blit(widget.image(), Point::new(0, y));
            y += row.h as i32;
            self.rows.push(widget);
        }
        self.max_scroll = (list.height() - row.h) as f32;
        self.scroll_speed = row.h as f32 / 4.0;
        self.list = Some(list);
        self.widget.active = true;
    }

    /// Discard the transient widgets and composite and rebind to reopen.
    pub fn close(&mut self) {
        self.rows.clear();
        self.scroll = 0.0;
        self.max_scroll = 0.0;
        self.scroll_speed = 1.0;
        self.list = None;
        self.widget.active = false;
        self.binding = Binding::Open;
    }

    /// Wheel input while open; clamped into `[0, max_scroll]`. Hosts report
    /// the precise axis inverted relative to raw wheel units.
    pub fn on_scroll(&mut self, delta: f32, precise: bool) {
        if !self.widget.active || self.list.is_none() {
            return;
        }
        let step = if precise { -delta } else { delta };
        self.scroll = (self.scroll + step * self.scroll_speed).clamp(0.0, self.max_scroll);
    }

    /// Shift a container-space point into composite space: the list hangs
    /// below the dropdown's rect, offset by the current scroll.
    fn list_point(&self, pos: Point) -> Point {
        let rect = self.widget.node.rect();
        Point::new(
            pos.x - rect.left(),
            pos.y - rect.top() - (rect.h as i32 - self.scroll as i32),
        )
    }

    /// Own rect/mask first; while open, the shifted point is tested against
    /// each option in order, rebinding the click command on a match.
    pub(crate) fn is_hit(&mut self, pos: Point) -> bool {
        if self.widget.is_hit(pos) {
            return true;
        }
        if !self.widget.active {
            return false;
        }
        let local = self.list_point(pos);
        for (i, row) in self.rows.iter().enumerate() {
            if row.is_hit(local) {
                self.binding = Binding::Option(i);
                return true;
            }
        }
        false
    }

    /// Mirrors [`Self::is_hit`] but compares the matched option against the
    /// current binding instead of rebinding. The own-rect test returns early
    /// whether or not the list is open, so a closed dropdown only retains
    /// focus while the pointer stays on its own pixels.
    pub(crate) fn still_focused(&self, pos: Point) -> bool {
        if self.widget.is_hit(pos) {
            return true;
        }
        if !self.widget.active {
            return false;
        }
        let local = self.list_point(pos);
        for (i, row) in self.rows.iter().enumerate() {
            if row.is_hit(local) {
                return self.binding == Binding::Option(i);
            }
        }
        false
    }

    /// Run the bound command.
    pub(crate) fn click(&mut self) {
        match self.binding {
            Binding::Open => self.open(),
            Binding::Option(i) => {
                if let Some(opt) = self.options.get(i) {
                    let action = opt.action.clone();
                    action();
                }
            }
        }
    }

    /// Visible slice of the open list and the point the parent blits it at.
    pub(crate) fn list_slice(&self) -> Option<(Pixmap, Point)> {
        if !self.widget.active {
            return None;
        }
        let list = self.list.as_ref()?;
        let scroll = self.scroll as i32;
        let slice = list.crop(Rect::new(
            0,
            scroll,
            list.width(),
            list.height() - scroll as u32,
        ));
        Some((slice, self.widget.node.rect().bottom_left()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perch_text::FixedShaper;
    use std::cell::Cell;

    const ROW: u32 = 20;

    fn dropdown_with(picked: &Rc<Cell<i32>>) -> Dropdown {
        let shaper = Rc::new(FixedShaper { advance: 6.0, height: 10 });
        let image = Pixmap::solid(Size::new(60, ROW), Color(90, 90, 90, 255));
        let template = Pixmap::solid(Size::new(60, ROW), Color(70, 70, 70, 255));
        let mut dd = Dropdown::new(Position::Pixels(0.0, 0.0), image, template, shaper)
            .anchor(Anchor::TOP_LEFT);
        for i in 0..3 {
            let picked = picked.clone();
            dd = dd.option(&format!("option {i}"), Rc::new(move || picked.set(i)));
        }
        dd
    }

    fn dropdown() -> Dropdown {
        dropdown_with(&Rc::new(Cell::new(-1)))
    }

    #[test]
    fn open_builds_rows_and_scroll_bounds() {
        let mut dd = dropdown();
        dd.open();
        assert!(dd.is_open());
        assert_eq!(dd.max_scroll(), (3 * ROW - ROW) as f32);
        assert_eq!(dd.scroll(), 0.0);
        // reopening is idempotent
        dd.open();
        assert!(dd.is_open());
        assert_eq!(dd.rows.len(), 3);
    }

    #[test]
    fn open_with_no_options_stays_closed() {
        let shaper = Rc::new(FixedShaper { advance: 6.0, height: 10 });
        let image = Pixmap::solid(Size::new(60, ROW), Color(90, 90, 90, 255));
        let template = Pixmap::solid(Size::new(60, ROW), Color(70, 70, 70, 255));
        let mut dd = Dropdown::new(Position::Pixels(0.0, 0.0), image, template, shaper);
        dd.open();
        assert!(!dd.is_open());
        assert!(dd.list_slice().is_none());
    }

    #[test]
    fn scroll_is_clamped() {
        let mut dd = dropdown();
        dd.open();
        // raw wheel units: delta 5 at speed 5 -> 25, under max 40
        dd.on_scroll(5.0, false);
        assert_eq!(dd.scroll(), 25.0);
        dd.on_scroll(50.0, false);
        assert_eq!(dd.scroll(), dd.max_scroll());
        dd.on_scroll(-100.0, false);
        assert_eq!(dd.scroll(), 0.0);
    }

    #[test]
    fn precise_axis_is_inverted() {
        let mut dd = dropdown();
        dd.open();
        dd.on_scroll(-5.0, true);
        assert_eq!(dd.scroll(), 25.0);
    }

    #[test]
    fn scroll_while_closed_is_ignored() {
        let mut dd = dropdown();
        dd.on_scroll(5.0, false);
        assert_eq!(dd.scroll(), 0.0);
    }

    #[test]
    fn hit_on_open_list_rebinds_click() {
        let picked = Rc::new(Cell::new(-1));
        let mut dd = dropdown_with(&picked);
        dd.open();
        // second row: list hangs below the 20 px widget
        assert!(dd.is_hit(Point::new(5, ROW as i32 + 25)));
        dd.click();
        assert_eq!(picked.get(), 1);
        // and the dropdown stays open until told otherwise
        assert!(dd.is_open());
    }

    #[test]
    fn scroll_shifts_option_hits() {
        let picked = Rc::new(Cell::new(-1));
        let mut dd = dropdown_with(&picked);
        dd.open();
        dd.on_scroll(4.0, false); // 20 px: one full row
        assert!(dd.is_hit(Point::new(5, ROW as i32 + 5)));
        dd.click();
        assert_eq!(picked.get(), 1);
    }

    #[test]
    fn close_discards_transients_and_rebinds_open() {
        let mut dd = dropdown();
        dd.open();
        assert!(dd.is_hit(Point::new(5, ROW as i32 + 5)));
        dd.close();
        assert!(!dd.is_open());
        assert!(dd.list_slice().is_none());
        assert_eq!(dd.rows.len(), 0);
        assert_eq!(dd.scroll(), 0.0);
        dd.click();
        assert!(dd.is_open());
    }

    #[test]
    fn still_focused_on_closed_dropdown_needs_own_pixels() {
        let mut dd = dropdown();
        // pressed but not open: only its own pixels retain focus
        assert!(dd.still_focused(Point::new(5, 5)));
        assert!(!dd.still_focused(Point::new(5, ROW as i32 + 5)));
        // open: a matched option retains focus only if it is the bound one
        dd.open();
        assert!(dd.is_hit(Point::new(5, ROW as i32 + 5)));
        assert!(dd.still_focused(Point::new(5, ROW as i32 + 5)));
        assert!(!dd.still_focused(Point::new(5, ROW as i32 + 25)));
    }

    #[test]
    fn list_slice_drops_scrolled_rows() {
        let mut dd = dropdown();
        dd.open();
        let (full, at) = dd.list_slice().unwrap();
        assert_eq!(full.height(), 3 * ROW);
        assert_eq!(at, Point::new(0, ROW as i32));
        dd.on_scroll(4.0, false);
        let (slice, _) = dd.list_slice().unwrap();
        assert_eq!(slice.height(), 2 * ROW);
    }
}
