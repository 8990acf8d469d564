//! Tile atlas packing and the mapping manifest
//!
//! Packs the selector's picks into a fixed-column grid, left to right and
//! top to bottom, one cell per frame. Alongside the image goes a JSON
//! manifest mapping each tile identifier to its cell, or to an ordered
//! list of cells for animated tiles.

use std::{collections::HashMap, fmt, fs, io, path::Path};

use image::{imageops, ImageError, RgbaImage};
use serde::Serialize;

use crate::tileset::{Frame, Selection, SelectionImage, TileKind};

#[derive(Debug)]
pub enum AtlasError {
    Io(io::Error),
    Image(ImageError),
    Json(serde_json::Error),
    Optimise(String),
}

impl From<io::Error> for AtlasError {
    fn from(err: io::Error) -> Self {
        AtlasError::Io(err)
    }
}

impl From<ImageError> for AtlasError {
    fn from(err: ImageError) -> Self {
        AtlasError::Image(err)
    }
}

impl From<serde_json::Error> for AtlasError {
    fn from(err: serde_json::Error) -> Self {
        AtlasError::Json(err)
    }
}

impl fmt::Display for AtlasError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AtlasError::Io(err) => write!(f, "IO error: {}", err),
            AtlasError::Image(err) => write!(f, "Image error: {}", err),
            AtlasError::Json(err) => write!(f, "JSON error: {}", err),
            AtlasError::Optimise(msg) => write!(f, "PNG optimisation error: {}", msg),
        }
    }
}

impl std::error::Error for AtlasError {}

#[derive(Debug, Clone)]
pub struct AtlasConfig {
    pub columns: u32,
    pub tile_size: u32,
    pub optimise_png: bool,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        AtlasConfig {
            columns: 8,
            tile_size: 32,
            optimise_png: true,
        }
    }
}

/// Grid cell in tile units, not pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridPos {
    pub col: u32,
    pub row: u32,
}

/// Manifest value for one tile. Serialises either as a bare cell object
/// or as `{"frames": [...]}` for animations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TilePlacement {
    Static(GridPos),
    Animated { frames: Vec<GridPos> },
}

#[derive(Debug)]
pub struct PackedAtlas {
    pub image: RgbaImage,
    pub mapping: HashMap<String, TilePlacement>,
}

/// Lay the selections out in selection order. Overlay picks are first
/// composited onto the selected grass tile when one exists, so the cell
/// shows the object as it would sit in the world.
pub fn pack_atlas(selections: &[Selection], config: &AtlasConfig) -> PackedAtlas {
    let tile = config.tile_size;
    let columns = config.columns.max(1);

    let base_ground = selections.iter().find_map(|s| match (&s.image, s.kind) {
        (SelectionImage::Static(frame), TileKind::Grass) => Some(frame.bitmap.clone()),
        _ => None,
    });

    let total: usize = selections.iter().map(|s| s.frames().len()).sum();
    let rows = ((total as u32 + columns - 1) / columns).max(1);
    let mut image = RgbaImage::new(columns * tile, rows * tile);

    let mut mapping = HashMap::new();
    let mut index = 0u32;
    for selection in selections {
        match &selection.image {
            SelectionImage::Static(frame) => {
                let cell = compose_cell(frame, selection, base_ground.as_ref());
                let pos = place(&mut image, &cell, index, columns, tile);
                index += 1;
                mapping.insert(
                    selection.kind.identifier().to_string(),
                    TilePlacement::Static(pos),
                );
            }
            SelectionImage::Animated(frames) => {
                let mut positions = Vec::with_capacity(frames.len());
                for frame in frames {
                    positions.push(place(&mut image, &frame.bitmap, index, columns, tile));
                    index += 1;
                }
                mapping.insert(
                    selection.kind.identifier().to_string(),
                    TilePlacement::Animated { frames: positions },
                );
            }
        }
    }

    PackedAtlas { image, mapping }
}

fn compose_cell(frame: &Frame, selection: &Selection, base: Option<&RgbaImage>) -> RgbaImage {
    match base {
        Some(ground) if selection.overlay => {
            let mut cell = ground.clone();
            imageops::overlay(&mut cell, &frame.bitmap, 0, 0);
            cell
        }
        _ => frame.bitmap.clone(),
    }
}

fn place(image: &mut RgbaImage, bitmap: &RgbaImage, index: u32, columns: u32, tile: u32) -> GridPos {
    let col = index % columns;
    let row = index / columns;
    imageops::overlay(image, bitmap, (col * tile) as i64, (row * tile) as i64);
    GridPos { col, row }
}

/// Write `tileset.png` and `tileset.json` into `out_dir`, creating it if
/// needed. A failed PNG optimisation pass is reported but not fatal; the
/// unoptimised file is already on disk.
pub fn save_atlas(atlas: &PackedAtlas, out_dir: &Path, config: &AtlasConfig) -> Result<(), AtlasError> {
    fs::create_dir_all(out_dir)?;

    let image_path = out_dir.join("tileset.png");
    atlas.image.save(&image_path)?;
    if config.optimise_png {
        if let Err(err) = optimise_png(&image_path) {
            println!("  - Warning: PNG optimisation failed: {}", err);
        }
    }

    let json = serde_json::to_string_pretty(&atlas.mapping)?;
    fs::write(out_dir.join("tileset.json"), json)?;
    Ok(())
}

/// Lossless in-place oxipng pass, shared with the diagnostic sheets.
pub(crate) fn optimise_png(path: &Path) -> Result<(), AtlasError> {
    let mut options = oxipng::Options::from_preset(2);
    options.bit_depth_reduction = true;

    oxipng::optimize(
        &oxipng::InFile::Path(path.to_path_buf()),
        &oxipng::OutFile::Path(Some(path.to_path_buf())),
        &options,
    )
    .map_err(|e| AtlasError::Optimise(e.to_string()))
}
