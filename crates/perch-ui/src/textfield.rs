use std::collections::HashSet;
use std::rc::Rc;
use std::time::{Duration, Instant};

use perch_core::input::Key;
use perch_core::{Anchor, Color, Point, Position, Rect, Size};
use perch_surface::Pixmap;
use perch_text::TextShaper;
use unicode_segmentation::UnicodeSegmentation;

use crate::widget::{Action, Widget};

const SCROLL_MARGIN: f32 = 5.0;
const BLINK_PERIOD: Duration = Duration::from_millis(500);
const SELECTION_COLOR: Color = Color(50, 50, 255, 150);
const CARET_COLOR: Color = Color::WHITE;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TextAlign {
    #[default]
    Start,
    End,
    Center,
}

/// Byte offset of a grapheme boundary index.
fn boundary_byte(text: &str, boundary: usize) -> usize {
    text.grapheme_indices(true)
        .nth(boundary)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

/// Single-line editable text box.
///
/// Two states, tracked by the base widget's `active` flag: idle (display
/// only) and editing. A press records the selection anchor, the activation
/// click places the caret and either collapses or extends the selection, and
/// `handle_input` drives all mutation until Enter commits back to idle.
/// Cursor and selection indices are grapheme-boundary indices.
pub struct TextField {
    pub widget: Widget,
    shaper: Rc<dyn TextShaper>,
    text: String,
    cursor: usize,
    /// Cached caret offset in box pixels, including the text rect's x.
    cursor_px: f32,
    /// (start, length); length 0 means no selection.
    selection: (usize, usize),
    /// Boundary recorded on press, before the activation click lands.
    anchor_index: usize,
    align: TextAlign,
    /// Horizontal inset in pixels and vertical center as a fraction of the
    /// box height (`Center` alignment reads both as fractions).
    inset: (f32, f32),
    color: Color,
    allow: HashSet<char>,
    deny: HashSet<char>,
    on_commit: Option<Action>,
    on_activate: Option<Action>,
    /// Horizontal scroll offset keeping the caret in view.
    scroll: f32,
    last_action: Instant,
}

impl TextField {
    pub fn new(pos: Position, image: Pixmap, shaper: Rc<dyn TextShaper>) -> Self {
        let widget = Widget::new(pos, image, crate::widget::noop()).name("textbox");
        Self {
            widget,
            shaper,
            text: String::new(),
            cursor: 0,
            cursor_px: 0.0,
            selection: (0, 0),
            anchor_index: 0,
            align: TextAlign::Start,
            inset: (5.0, 0.5),
            color: Color::WHITE,
            allow: HashSet::new(),
            deny: HashSet::new(),
            on_commit: None,
            on_activate: None,
            scroll: 0.0,
            last_action: Instant::now(),
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

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_owned();
        self
    }

    pub fn align(mut self, align: TextAlign) -> Self {
        self.align = align;
        self
    }

    pub fn color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn allow(mut self, chars: impl IntoIterator<Item = char>) -> Self {
        self.allow = chars.into_iter().collect();
        self
    }

    pub fn deny(mut self, chars: impl IntoIterator<Item = char>) -> Self {
        self.deny = chars.into_iter().collect();
        self
    }

    pub fn on_commit(mut self, action: Action) -> Self {
        self.on_commit = Some(action);
        self
    }

    pub fn on_activate(mut self, action: Action) -> Self {
        self.on_activate = Some(action);
        self
    }

    pub fn current_text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: &str) {
        self.text = text.to_owned();
        self.cursor = self.cursor.min(self.grapheme_len());
        self.selection = (0, 0);
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn selection(&self) -> (usize, usize) {
        self.selection
    }

    pub fn is_editing(&self) -> bool {
        self.widget.active
    }

    pub fn scroll(&self) -> f32 {
        self.scroll
    }

    fn grapheme_len(&self) -> usize {
        self.text.graphemes(true).count()
    }

    /// Where the rendered text sits inside the box, per the alignment mode.
    fn text_rect(&self) -> Rect {
        let size = if self.text.is_empty() {
            Size::ZERO
        } else {
            self.shaper.line_size(&self.text)
        };
        let boxr = self.widget.node.rect();
        let mut rect = Rect::from_size(size);
        match self.align {
            TextAlign::Start => {
                rect.x = self.inset.0 as i32;
                rect.set_centery((boxr.h as f32 * self.inset.1) as i32);
            }
            TextAlign::End => {
                rect.set_right(boxr.w as i32 - self.inset.0 as i32);
                rect.set_centery((boxr.h as f32 * self.inset.1) as i32);
            }
            TextAlign::Center => {
                rect.set_center(Point::new(
                    (boxr.w as f32 * self.inset.0) as i32,
                    (boxr.h as f32 * self.inset.1) as i32,
                ));
            }
        }
        rect
    }

    /// Caret pixel offset at a grapheme boundary, including the text rect x.
    fn caret_px(&self, boundary: usize) -> f32 {
        let tx = self.text_rect().x as f32;
        if self.text.is_empty() {
            return tx;
        }
        let widths = self.shaper.prefix_widths(&self.text);
        tx + widths[boundary.min(widths.len() - 1)]
    }

    /// Map a pointer position (owning container's space) to the nearest
    /// boundary. Scans boundaries left to right and stops at the first one at
    /// or right of the pointer, keeping it when it is at least as close as
    /// the previous boundary.
    fn cursor_from_point(&self, pos: Point) -> (usize, f32) {
        let rect = self.widget.node.rect();
        let x = (pos.x - rect.left()) as f32;
        let tx = self.text_rect().x as f32;
        let widths = self.shaper.prefix_widths(&self.text);
        let n = widths.len() - 1;
        let mut width = tx;
        for (i, w) in widths.iter().enumerate() {
            let prev = width;
            width = tx + w;
            if width - x < 0.0 {
                continue;
            }
            return if width - x <= (prev - x).abs() {
                (i, width)
            } else {
                (i.saturating_sub(1), prev)
            };
        }
        (n, width)
    }

    /// Press half of activation: place the selection anchor.
    pub(crate) fn press(&mut self, pos: Point) {
        let (cursor, cursor_px) = self.cursor_from_point(pos);
        self.cursor = cursor;
        self.cursor_px = cursor_px;
        self.anchor_index = cursor;
    }

    /// Click half of activation: enter editing, place the caret, and collapse
    /// or extend the selection against the pressed anchor.
    pub(crate) fn activate(&mut self, pos: Point) {
        if let Some(cb) = self.on_activate.clone() {
            cb();
        }
        self.widget.active = true;
        self.last_action = Instant::now();
        let (cursor, cursor_px) = self.cursor_from_point(pos);
        self.cursor = cursor;
        self.cursor_px = cursor_px;
        let anchor = self.anchor_index;
        self.selection = if cursor == anchor {
            (0, 0)
        } else if cursor < anchor {
            (cursor, anchor - cursor)
        } else {
            (anchor, cursor - anchor)
        };
        let n = self.grapheme_len();
        if self.selection.0 >= n {
            self.selection = (n, 0);
        } else if self.selection.0 + self.selection.1 >= n {
            self.selection.1 = n - self.selection.0;
        }
    }

    /// Re-derive the scroll offset so the caret stays within the margin.
    fn scroll_into_view(&mut self) {
        let w = self.widget.node.rect().w as f32;
        if self.cursor_px > w - SCROLL_MARGIN {
            self.scroll = self.cursor_px - w + SCROLL_MARGIN;
        } else if self.cursor_px < SCROLL_MARGIN {
            self.scroll = self.cursor_px - SCROLL_MARGIN;
        } else {
            self.scroll = 0.0;
        }
    }

    fn delete_boundaries(&mut self, from: usize, to: usize) {
        let start = boundary_byte(&self.text, from);
        let end = boundary_byte(&self.text, to);
        self.text.replace_range(start..end, "");
    }

    /// Handle one key while editing; a no-op while idle.
    ///
    /// Enter resets the editing state *before* the commit callback runs, so
    /// the callback observes the field already idle.
    pub fn handle_input(&mut self, ch: Option<char>, key: Key) {
        if !self.widget.active {
            return;
        }
        if key == Key::Enter {
            self.cursor = 0;
            self.selection = (0, 0);
            self.widget.active = false;
            self.scroll = 0.0;
            if let Some(cb) = self.on_commit.clone() {
                cb();
            }
            return;
        }
        self.last_action = Instant::now();
        if key == Key::ArrowLeft || key == Key::ArrowRight {
            let delta: i64 = if key == Key::ArrowRight { 1 } else { -1 };
            let n = self.grapheme_len() as i64;
            self.cursor = (self.cursor as i64 + delta).clamp(0, n) as usize;
            self.cursor_px = self.caret_px(self.cursor);
            self.selection = (0, 0);
            self.scroll_into_view();
            return;
        }
        if self.selection.1 > 0 {
            self.delete_boundaries(self.selection.0, self.selection.0 + self.selection.1);
            self.cursor = self.selection.0.min(self.grapheme_len());
            self.selection = (0, 0);
            self.cursor_px = self.caret_px(self.cursor);
            self.scroll_into_view();
            if key == Key::Backspace || key == Key::Delete {
                return;
            }
        }
        match key {
            Key::Backspace => {
                self.cursor = self.cursor.min(self.grapheme_len());
                if self.cursor == 0 {
                    return;
                }
                self.delete_boundaries(self.cursor - 1, self.cursor);
                self.cursor -= 1;
                self.cursor_px = self.caret_px(self.cursor);
                self.scroll_into_view();
                return;
            }
            Key::Delete => {
                if self.cursor >= self.grapheme_len() {
                    return;
                }
                self.delete_boundaries(self.cursor, self.cursor + 1);
                self.cursor_px = self.caret_px(self.cursor);
                self.scroll_into_view();
                return;
            }
            _ => {}
        }
        if let Some(c) = ch {
            if !self.allow.is_empty() && !self.allow.contains(&c) {
                return;
            }
            if self.deny.contains(&c) {
                return;
            }
            let at = boundary_byte(&self.text, self.cursor);
            self.text.insert(at, c);
            // an inserted combining mark can merge boundaries
            self.cursor = (self.cursor + 1).min(self.grapheme_len());
            self.cursor_px = self.caret_px(self.cursor);
            self.scroll_into_view();
        }
    }

    /// Synthesize the commit transition (used when focus moves elsewhere).
    pub fn stop(&mut self) {
        self.handle_input(None, Key::Enter);
    }

    fn caret_visible(&self) -> bool {
        (self.last_action.elapsed().as_millis() / BLINK_PERIOD.as_millis()) % 2 == 0
    }

    /// Compose box, scrolled text, selection highlight, and blinking caret.
    pub fn render(&self) -> Pixmap {
        let mut out = self.widget.image().clone();
        let trect = self.text_rect();
        if !self.text.is_empty() {
            let line = self.shaper.render_line(&self.text, self.color, true);
            out.blit(&line, trect.translate(-(self.scroll as i32), 0).top_left());
        }
        if self.widget.active {
            let h = self.widget.node.rect().h as f32;
            let band_h = (h * 0.9).floor() as u32;
            let band_y = (h * 0.05).ceil() as i32;
            if self.selection.1 > 0 {
                let x = self.caret_px(self.selection.0);
                let w = self.caret_px(self.selection.0 + self.selection.1) - x;
                out.blit(
                    &Pixmap::solid(Size::new(w.max(0.0) as u32, band_h), SELECTION_COLOR),
                    Point::new(x as i32, band_y),
                );
            }
            if self.caret_visible() {
                out.blit(
                    &Pixmap::solid(Size::new(3, band_h), CARET_COLOR),
                    Point::new((self.cursor_px - 1.0 - self.scroll) as i32, band_y),
                );
            }
        }
        out
    }
}
