//! Bitmap-side stages of the scrape
//!
//! Everything in here works on decoded `RgbaImage`s: colour profiling of
//! individual sprites, atlas packing of the final picks, and the
//! human-facing diagnostic sheets.

pub mod atlas;
pub mod profile;
pub mod sheets;
