use crate::Pixmap;

/// Per-pixel boolean hit mask derived from a surface's alpha channel.
///
/// A widget's clickable area is exactly its visible, non-transparent pixels;
/// the mask is rebuilt whenever the widget's content changes.
#[derive(Clone, Debug)]
pub struct Mask {
    w: u32,
    h: u32,
    bits: Vec<bool>,
}

impl Mask {
    /// Set pixels are those with alpha strictly above `threshold`.
    pub fn from_alpha(pixmap: &Pixmap, threshold: u8) -> Self {
        let (w, h) = (pixmap.width(), pixmap.height());
        let mut bits = Vec::with_capacity(w as usize * h as usize);
        for y in 0..h as i32 {
            for x in 0..w as i32 {
                bits.push(pixmap.get(x, y).a() > threshold);
            }
        }
        Self { w, h, bits }
    }

    /// Out-of-range queries are a miss, never an error.
    pub fn get(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 || x as u32 >= self.w || y as u32 >= self.h {
            return false;
        }
        self.bits[y as usize * self.w as usize + x as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perch_core::{Color, Size};

    #[test]
    fn mask_tracks_alpha() {
        let mut pix = Pixmap::new(Size::new(3, 1));
        pix.put(1, 0, Color::WHITE);
        let mask = Mask::from_alpha(&pix, 0);
        assert!(!mask.get(0, 0));
        assert!(mask.get(1, 0));
        assert!(!mask.get(2, 0));
    }

    #[test]
    fn out_of_range_is_a_miss() {
        let pix = Pixmap::solid(Size::new(2, 2), Color::WHITE);
        let mask = Mask::from_alpha(&pix, 0);
        assert!(!mask.get(-1, 0));
        assert!(!mask.get(0, 2));
    }

    #[test]
    fn threshold_gates_translucency() {
        let mut pix = Pixmap::new(Size::new(1, 1));
        pix.put(0, 0, Color(255, 255, 255, 10));
        assert!(Mask::from_alpha(&pix, 0).get(0, 0));
        assert!(!Mask::from_alpha(&pix, 10).get(0, 0));
    }
}
