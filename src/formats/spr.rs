//! Sprite archive (.spr) reader
//!
//! The archive is a flat bag of 32x32 RGBA sprites. The header is a u32
//! signature followed by a u32 sprite count and one u32 file offset per
//! sprite. Sprite ids are 1-based; an offset of 0 marks an empty slot.
//!
//! Each sprite block holds 3 colour-key bytes (ignored, transparency is
//! carried by the encoding itself), a u16 payload length, and a
//! run-length stream that alternates a u16 transparent-pixel skip with a
//! u16 opaque run followed by 3 RGB bytes per opaque pixel. Decoding is
//! deliberately lossy-safe: a payload that ends mid-field or mid-run just
//! leaves the remaining pixels transparent.

use std::{fmt, fs, io, path::Path};

use image::{Rgba, RgbaImage};

/// Sprites are always square and this big.
pub const SPRITE_DIM: u32 = 32;

/// Pixels per sprite. Decoding never writes beyond this many.
pub const SPRITE_PIXELS: usize = (SPRITE_DIM * SPRITE_DIM) as usize;

#[derive(Debug)]
pub enum SprError {
    Io(io::Error),
    Format(String),
}

impl From<io::Error> for SprError {
    fn from(err: io::Error) -> Self {
        SprError::Io(err)
    }
}

impl fmt::Display for SprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SprError::Io(err) => write!(f, "IO error: {}", err),
            SprError::Format(msg) => write!(f, "Format error: {}", msg),
        }
    }
}

impl std::error::Error for SprError {}

/// An opened sprite archive: the raw file plus the decoded offset table.
/// Sprites are decoded on demand, nothing is cached.
pub struct SpriteArchive {
    data: Vec<u8>,
    signature: u32,
    offsets: Vec<u32>,
}

impl SpriteArchive {
    pub fn open(path: &Path) -> Result<Self, SprError> {
        let data = fs::read(path)?;
        Self::from_bytes(data)
    }

    pub fn from_bytes(data: Vec<u8>) -> Result<Self, SprError> {
        if data.len() < 8 {
            return Err(SprError::Format(format!(
                "header needs 8 bytes, file has {}",
                data.len()
            )));
        }

        let signature = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        let count = u32::from_le_bytes([data[4], data[5], data[6], data[7]]) as usize;

        let table_end = 8 + count * 4;
        if data.len() < table_end {
            return Err(SprError::Format(format!(
                "offset table for {} sprites needs {} bytes, file has {}",
                count,
                table_end,
                data.len()
            )));
        }

        let mut offsets = Vec::with_capacity(count);
        for i in 0..count {
            let at = 8 + i * 4;
            offsets.push(u32::from_le_bytes([
                data[at],
                data[at + 1],
                data[at + 2],
                data[at + 3],
            ]));
        }

        Ok(SpriteArchive {
            data,
            signature,
            offsets,
        })
    }

    pub fn signature(&self) -> u32 {
        self.signature
    }

    /// Number of sprite slots declared in the header, empty slots included.
    pub fn sprite_count(&self) -> u32 {
        self.offsets.len() as u32
    }

    /// Decode one sprite. Ids are 1-based; id 0, ids past the table and
    /// empty slots all yield `None`. A slot whose offset points outside the
    /// file is treated like an empty slot.
    pub fn extract(&self, id: u32) -> Option<RgbaImage> {
        if id == 0 || id as usize > self.offsets.len() {
            return None;
        }

        let offset = self.offsets[(id - 1) as usize] as usize;
        if offset == 0 {
            return None;
        }

        // 3 colour-key bytes, then the u16 payload length.
        if offset + 5 > self.data.len() {
            return None;
        }
        let length = u16::from_le_bytes([self.data[offset + 3], self.data[offset + 4]]) as usize;

        let start = offset + 5;
        let end = usize::min(start + length, self.data.len());
        Some(decode_rle(&self.data[start..end]))
    }
}

/// Expand one run-length payload onto a fresh transparent 32x32 canvas.
/// Stops when the payload runs out or the canvas is full, whichever comes
/// first.
fn decode_rle(payload: &[u8]) -> RgbaImage {
    let mut bitmap = RgbaImage::new(SPRITE_DIM, SPRITE_DIM);
    let mut pos = 0;
    let mut pixel = 0;

    while pos + 4 <= payload.len() && pixel < SPRITE_PIXELS {
        let skip = u16::from_le_bytes([payload[pos], payload[pos + 1]]) as usize;
        let run = u16::from_le_bytes([payload[pos + 2], payload[pos + 3]]) as usize;
        pos += 4;
        pixel += skip;

        for _ in 0..run {
            if pixel >= SPRITE_PIXELS || pos + 3 > payload.len() {
                return bitmap;
            }
            let x = pixel as u32 % SPRITE_DIM;
            let y = pixel as u32 / SPRITE_DIM;
            bitmap.put_pixel(
                x,
                y,
                Rgba([payload[pos], payload[pos + 1], payload[pos + 2], 255]),
            );
            pos += 3;
            pixel += 1;
        }
    }

    bitmap
}
