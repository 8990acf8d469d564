//! Tile vocabulary and selection records
//!
//! [`TileKind`] is the closed list of tiles the scraper hunts for.
//! Declaration order is load-bearing: the selector walks it top to
//! bottom and the atlas packer places picks in the same order.

pub mod classify;
pub mod select;

use std::fmt;

use image::RgbaImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileKind {
    Grass,
    Dirt,
    Sand,
    StoneFloor,
    WoodFloor,
    Water,
    Lava,
    StoneWall,
    WoodWall,
    Tree,
    Bush,
    Boulder,
    Flowers,
}

impl TileKind {
    pub const ALL: [TileKind; 13] = [
        TileKind::Grass,
        TileKind::Dirt,
        TileKind::Sand,
        TileKind::StoneFloor,
        TileKind::WoodFloor,
        TileKind::Water,
        TileKind::Lava,
        TileKind::StoneWall,
        TileKind::WoodWall,
        TileKind::Tree,
        TileKind::Bush,
        TileKind::Boulder,
        TileKind::Flowers,
    ];

    /// Key used for this tile in the mapping manifest.
    pub fn identifier(self) -> &'static str {
        match self {
            TileKind::Grass => "grass",
            TileKind::Dirt => "dirt",
            TileKind::Sand => "sand",
            TileKind::StoneFloor => "stone_floor",
            TileKind::WoodFloor => "wood_floor",
            TileKind::Water => "water",
            TileKind::Lava => "lava",
            TileKind::StoneWall => "stone_wall",
            TileKind::WoodWall => "wood_wall",
            TileKind::Tree => "tree",
            TileKind::Bush => "bush",
            TileKind::Boulder => "boulder",
            TileKind::Flowers => "flowers",
        }
    }

    /// Tiles extracted as an animation sequence rather than a single cell.
    pub fn animated(self) -> bool {
        matches!(self, TileKind::Water | TileKind::Lava)
    }

    /// Tiles composited onto a ground base in the atlas instead of
    /// standing alone.
    pub fn overlay(self) -> bool {
        matches!(
            self,
            TileKind::Tree | TileKind::Bush | TileKind::Boulder | TileKind::Flowers
        )
    }
}

impl fmt::Display for TileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

/// One decoded sprite frame, tagged with the archive id it came from.
#[derive(Debug, Clone)]
pub struct Frame {
    pub sprite_id: u32,
    pub bitmap: RgbaImage,
}

#[derive(Debug, Clone)]
pub enum SelectionImage {
    Static(Frame),
    Animated(Vec<Frame>),
}

/// What the selector settled on for one tile kind.
#[derive(Debug, Clone)]
pub struct Selection {
    pub kind: TileKind,
    /// Catalog id of the winning entry.
    pub entry_id: u32,
    pub overlay: bool,
    pub image: SelectionImage,
}

impl Selection {
    /// Frames in placement order. A static selection is one frame.
    pub fn frames(&self) -> &[Frame] {
        match &self.image {
            SelectionImage::Static(frame) => std::slice::from_ref(frame),
            SelectionImage::Animated(frames) => frames,
        }
    }
}
