//! Opaque-pixel colour statistics
//!
//! A [`ColourProfile`] is the whole basis of the colour heuristics: mean
//! RGB over the opaque pixels of a sprite, plus how much of the canvas
//! those pixels cover. Profiles are computed on demand and never cached.

use image::RgbaImage;

/// Sprites with fewer opaque pixels than this say nothing useful about
/// their colour.
pub const MIN_OPAQUE_PIXELS: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColourProfile {
    pub mean_r: f32,
    pub mean_g: f32,
    pub mean_b: f32,
    /// Opaque fraction of the canvas, 0.0 to 1.0.
    pub coverage: f32,
}

/// Average the opaque pixels of a sprite. Returns `None` when fewer than
/// [`MIN_OPAQUE_PIXELS`] pixels are opaque.
pub fn analyse(bitmap: &RgbaImage) -> Option<ColourProfile> {
    let mut opaque = 0u32;
    let (mut sum_r, mut sum_g, mut sum_b) = (0u64, 0u64, 0u64);

    for pixel in bitmap.pixels() {
        if pixel[3] > 0 {
            opaque += 1;
            sum_r += pixel[0] as u64;
            sum_g += pixel[1] as u64;
            sum_b += pixel[2] as u64;
        }
    }

    if opaque < MIN_OPAQUE_PIXELS {
        return None;
    }

    let total = bitmap.width() * bitmap.height();
    Some(ColourProfile {
        mean_r: sum_r as f32 / opaque as f32,
        mean_g: sum_g as f32 / opaque as f32,
        mean_b: sum_b as f32 / opaque as f32,
        coverage: opaque as f32 / total as f32,
    })
}
