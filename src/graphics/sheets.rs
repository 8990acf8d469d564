//! Diagnostic catalog sheets
//!
//! Contact sheets of catalog entries with their ids stamped underneath,
//! for eyeballing what the heuristics had to choose from. Cells that
//! repeat an earlier bitmap are dropped; a hash collision only ever
//! drops a cell from a debug image, so the fast non-cryptographic hash
//! is fine here.

use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use image::{imageops, Rgba, RgbaImage};
use twox_hash::XxHash64;

use crate::{
    formats::{dat::CatalogEntry, spr::SpriteArchive},
    tileset::select::representative_index,
};

const CELL_W: u32 = 32;
/// Sprite plus an 8 pixel label strip.
const CELL_H: u32 = 40;
const SHEET_COLS: u32 = 24;
const LABEL_COLOUR: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// 3x5 digit glyphs, one row per byte, high bit leftmost.
const DIGITS: [[u8; 5]; 10] = [
    [0b111, 0b101, 0b101, 0b101, 0b111],
    [0b010, 0b110, 0b010, 0b010, 0b111],
    [0b111, 0b001, 0b111, 0b100, 0b111],
    [0b111, 0b001, 0b111, 0b001, 0b111],
    [0b101, 0b101, 0b111, 0b001, 0b001],
    [0b111, 0b100, 0b111, 0b001, 0b111],
    [0b111, 0b100, 0b111, 0b101, 0b111],
    [0b111, 0b001, 0b001, 0b001, 0b001],
    [0b111, 0b101, 0b111, 0b101, 0b111],
    [0b111, 0b101, 0b111, 0b001, 0b111],
];

/// Sheet of every ground entry.
pub fn render_ground_sheet(items: &[CatalogEntry], archive: &SpriteArchive) -> RgbaImage {
    render_catalog_sheet(items, archive, |e| e.flags.is_ground())
}

/// Sheet of every entry carrying a non-empty market name.
pub fn render_named_sheet(items: &[CatalogEntry], archive: &SpriteArchive) -> RgbaImage {
    render_catalog_sheet(items, archive, |e| {
        e.flags.market.as_ref().map_or(false, |m| !m.name.is_empty())
    })
}

/// Grid sheet over the entries matching `filter`, in catalog order.
/// Entries without a decodable representative sprite are skipped, as are
/// exact duplicates of an earlier cell.
pub fn render_catalog_sheet<F>(
    items: &[CatalogEntry],
    archive: &SpriteArchive,
    filter: F,
) -> RgbaImage
where
    F: Fn(&CatalogEntry) -> bool,
{
    let mut cells: Vec<(u32, RgbaImage)> = Vec::new();
    let mut seen = HashSet::new();

    for entry in items.iter().filter(|e| filter(e)) {
        let Some(sprite_id) = entry.sprite_ref(representative_index(entry)) else {
            continue;
        };
        let Some(bitmap) = archive.extract(sprite_id) else {
            continue;
        };
        if seen.insert(bitmap_hash(&bitmap)) {
            cells.push((entry.id, bitmap));
        }
    }

    let rows = ((cells.len() as u32 + SHEET_COLS - 1) / SHEET_COLS).max(1);
    let mut sheet = RgbaImage::new(SHEET_COLS * CELL_W, rows * CELL_H);

    for (i, (id, bitmap)) in cells.iter().enumerate() {
        let x = (i as u32 % SHEET_COLS) * CELL_W;
        let y = (i as u32 / SHEET_COLS) * CELL_H;
        imageops::overlay(&mut sheet, bitmap, x as i64, y as i64);
        draw_number(&mut sheet, *id, x + 1, y + CELL_W + 2);
    }

    sheet
}

fn bitmap_hash(bitmap: &RgbaImage) -> u64 {
    let mut hasher = XxHash64::default();
    bitmap.as_raw().hash(&mut hasher);
    hasher.finish()
}

fn draw_number(sheet: &mut RgbaImage, value: u32, x: u32, y: u32) {
    for (i, ch) in value.to_string().bytes().enumerate() {
        draw_digit(sheet, (ch - b'0') as usize, x + i as u32 * 4, y);
    }
}

fn draw_digit(sheet: &mut RgbaImage, digit: usize, x: u32, y: u32) {
    for (dy, row) in DIGITS[digit].iter().enumerate() {
        for dx in 0..3u32 {
            if row & (0b100 >> dx) != 0 {
                let px = x + dx;
                let py = y + dy as u32;
                if px < sheet.width() && py < sheet.height() {
                    sheet.put_pixel(px, py, LABEL_COLOUR);
                }
            }
        }
    }
}
