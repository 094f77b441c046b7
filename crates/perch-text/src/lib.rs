//! Text substrate: line measurement and rendering behind the [`TextShaper`]
//! contract the widget layer consumes.
//!
//! The shipped implementation ([`Font`]) wraps `ab_glyph` for glyph outlines
//! and `fontdb` for system-font discovery. Widths are reported per grapheme
//! boundary so caret mapping can binary-search a prefix table; see
//! [`TextShaper::prefix_widths`].

use ab_glyph::{Font as _, FontArc, FontVec, PxScale, ScaleFont, point};
use perch_core::{Color, Point, Rect, Size};
use perch_surface::Pixmap;
use thiserror::Error;
use unicode_segmentation::UnicodeSegmentation;

#[derive(Error, Debug)]
pub enum FontError {
    #[error("font data could not be parsed")]
    Parse(#[from] ab_glyph::InvalidFont),
    #[error("no usable system font found")]
    NoSystemFont,
}

/// Measurement/render contract the widget layer depends on.
///
/// `prefix_widths` returns one entry per grapheme boundary (count + 1
/// entries, the first always 0.0): entry `i` is the pixel width of the text's
/// first `i` graphemes.
pub trait TextShaper {
    fn line_size(&self, text: &str) -> Size;
    fn prefix_widths(&self, text: &str) -> Vec<f32>;
    fn render_line(&self, text: &str, color: Color, antialias: bool) -> Pixmap;
}

/// A parsed font at a fixed pixel size.
#[derive(Clone)]
pub struct Font {
    inner: FontArc,
    px: f32,
}

impl Font {
    pub fn from_bytes(data: Vec<u8>, px: f32) -> Result<Self, FontError> {
        Ok(Self {
            inner: FontArc::try_from_vec(data)?,
            px,
        })
    }

    /// Load the default sans-serif face known to the system.
    pub fn system_default(px: f32) -> Result<Self, FontError> {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        let query = fontdb::Query {
            families: &[fontdb::Family::SansSerif],
            ..fontdb::Query::default()
        };
        let id = db.query(&query).ok_or(FontError::NoSystemFont)?;
        let parsed = db
            .with_face_data(id, |data, index| {
                FontVec::try_from_vec_and_index(data.to_vec(), index)
            })
            .ok_or(FontError::NoSystemFont)??;
        Ok(Self {
            inner: FontArc::new(parsed),
            px,
        })
    }

    pub fn px(&self) -> f32 {
        self.px
    }

    fn scale(&self) -> PxScale {
        PxScale::from(self.px)
    }
}

impl TextShaper for Font {
    fn line_size(&self, text: &str) -> Size {
        let scaled = self.inner.as_scaled(self.scale());
        let width = self.prefix_widths(text).last().copied().unwrap_or(0.0);
        Size::new(width.ceil() as u32, scaled.height().ceil() as u32)
    }

    fn prefix_widths(&self, text: &str) -> Vec<f32> {
        let scaled = self.inner.as_scaled(self.scale());
        let mut widths = vec![0.0];
        let mut x = 0.0f32;
        let mut prev = None;
        for grapheme in text.graphemes(true) {
            for ch in grapheme.chars() {
                let id = scaled.glyph_id(ch);
                if let Some(p) = prev {
                    x += scaled.kern(p, id);
                }
                x += scaled.h_advance(id);
                prev = Some(id);
            }
            widths.push(x);
        }
        widths
    }

    fn render_line(&self, text: &str, color: Color, antialias: bool) -> Pixmap {
        let scaled = self.inner.as_scaled(self.scale());
        let mut out = Pixmap::new(self.line_size(text));
        let baseline = scaled.ascent();
        let mut x = 0.0f32;
        let mut prev = None;
        for ch in text.chars() {
            let id = scaled.glyph_id(ch);
            if let Some(p) = prev {
                x += scaled.kern(p, id);
            }
            let mut glyph = scaled.scaled_glyph(ch);
            glyph.position = point(x, baseline);
            if let Some(outlined) = scaled.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                outlined.draw(|gx, gy, coverage| {
                    let alpha = if antialias {
                        (coverage * color.a() as f32).round() as u8
                    } else if coverage >= 0.5 {
                        color.a()
                    } else {
                        0
                    };
                    out.blend(
                        bounds.min.x as i32 + gx as i32,
                        bounds.min.y as i32 + gy as i32,
                        color.with_alpha(alpha),
                    );
                });
            }
            x += scaled.h_advance(id);
            prev = Some(id);
        }
        out
    }
}

/// Fixed-advance shaper for tests and headless runs: every grapheme is
/// `advance` pixels wide and lines render as solid blocks.
#[derive(Clone, Copy, Debug)]
pub struct FixedShaper {
    pub advance: f32,
    pub height: u32,
}

impl TextShaper for FixedShaper {
    fn line_size(&self, text: &str) -> Size {
        let n = text.graphemes(true).count() as f32;
        Size::new((n * self.advance).ceil() as u32, self.height)
    }

    fn prefix_widths(&self, text: &str) -> Vec<f32> {
        let n = text.graphemes(true).count();
        (0..=n).map(|i| i as f32 * self.advance).collect()
    }

    fn render_line(&self, text: &str, color: Color, _antialias: bool) -> Pixmap {
        Pixmap::solid(self.line_size(text), color)
    }
}

/// Render `text` centered onto a copy of `template` at the fractional
/// position `pos` and return the compound surface.
pub fn centered_label(
    shaper: &dyn TextShaper,
    text: &str,
    template: &Pixmap,
    color: Color,
    pos: (f32, f32),
) -> Pixmap {
    let rendered = shaper.render_line(text, color, true);
    let mut rect = Rect::from_size(rendered.size());
    rect.set_center(Point::new(
        (template.width() as f32 * pos.0).round() as i32,
        (template.height() as f32 * pos.1).round() as i32,
    ));
    let mut compound = template.clone();
    compound.blit(&rendered, rect.top_left());
    compound
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_shaper_prefix_widths_per_boundary() {
        let shaper = FixedShaper { advance: 4.0, height: 10 };
        assert_eq!(shaper.prefix_widths(""), vec![0.0]);
        assert_eq!(shaper.prefix_widths("abc"), vec![0.0, 4.0, 8.0, 12.0]);
        // one boundary per grapheme cluster, not per char
        assert_eq!(shaper.prefix_widths("a\u{1F44D}\u{1F3FD}b").len(), 4);
    }

    #[test]
    fn centered_label_centers_the_text_block() {
        let shaper = FixedShaper { advance: 2.0, height: 4 };
        let template = Pixmap::new(Size::new(10, 8));
        let label = centered_label(&shaper, "ab", &template, Color::WHITE, (0.5, 0.5));
        assert_eq!(label.size(), template.size());
        // 4x4 block centered at (5, 4)
        assert_eq!(label.get(3, 2), Color::WHITE);
        assert_eq!(label.get(6, 5), Color::WHITE);
        assert_eq!(label.get(1, 2), Color::TRANSPARENT);
    }
}
