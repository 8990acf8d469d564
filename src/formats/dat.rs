//! Object catalog (.dat) reader
//!
//! The catalog describes every drawable thing the client knows about. The
//! header is a u32 signature and four u16 entry counts, one per category:
//! items, creatures, effects and missiles. The body is a single
//! undelimited byte stream holding all entries back to back in exactly
//! that order, so entry boundaries only emerge from parsing every entry
//! before them. [`Catalog::cursor`] hands out the read position that the
//! four parse passes thread through; running them out of order, or after
//! an earlier pass halted, would desynchronise everything that follows.
//!
//! Item ids start at 100, the other categories start at 1. Each entry is
//! a run of single-byte attribute tags (most carrying 0, 2 or 4 bytes of
//! payload, market data being the one variable-length case) closed by a
//! 0xFF sentinel, then the sprite geometry and one u32 sprite reference
//! per combination of width, height, layer, pattern and animation frame.

use std::{fmt, fs, io::Cursor, path::Path};

use crate::binary_utils::{read_bytes, read_u16_le, read_u32_le, read_u8, seek_to};

pub const ITEM_BASE_ID: u32 = 100;
pub const OTHER_BASE_ID: u32 = 1;

/// Closes every attribute run.
const ATTR_END: u8 = 0xFF;

/// Upper bound on sprite references per entry. Real entries stay well
/// under this; anything above it is a corrupt geometry byte.
const MAX_SPRITE_REFS: usize = 4096;

#[derive(Debug)]
pub enum DatError {
    Io(std::io::Error),
    Format(String),
    /// An attribute tag outside the known table. The stream cannot be
    /// resynchronised past it because the tag's payload width is unknown.
    UnknownAttribute { id: u32, tag: u8 },
}

impl From<std::io::Error> for DatError {
    fn from(err: std::io::Error) -> Self {
        DatError::Io(err)
    }
}

impl fmt::Display for DatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatError::Io(err) => write!(f, "IO error: {}", err),
            DatError::Format(msg) => write!(f, "Format error: {}", msg),
            DatError::UnknownAttribute { id, tag } => {
                write!(f, "Unknown attribute 0x{:02X} on entry {}", tag, id)
            }
        }
    }
}

impl std::error::Error for DatError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Item,
    Creature,
    Effect,
    Missile,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntryKind::Item => "item",
            EntryKind::Creature => "creature",
            EntryKind::Effect => "effect",
            EntryKind::Missile => "missile",
        };
        write!(f, "{}", name)
    }
}

/// Marketplace listing carried by sellable items. The name is the only
/// variable-length attribute payload in the whole format.
#[derive(Debug, Clone, Default, PartialEq)]
#[allow(dead_code)]
pub struct MarketInfo {
    pub category: u16,
    pub trade_as: u16,
    pub show_as: u16,
    pub name: String,
    pub restrict_vocation: u16,
    pub required_level: u16,
}

/// Decoded attribute set of one entry. Booleans default to false and
/// payload-carrying attributes to `None`, so an absent tag reads as "not
/// set".
#[derive(Debug, Clone, Default, PartialEq)]
#[allow(dead_code)]
pub struct EntryFlags {
    pub ground_speed: Option<u16>,
    pub ground_border: bool,
    pub on_bottom: bool,
    pub on_top: bool,
    pub container: bool,
    pub stackable: bool,
    pub force_use: bool,
    pub multi_use: bool,
    pub writable: Option<u16>,
    pub writable_once: Option<u16>,
    pub fluid_container: bool,
    pub splash: bool,
    pub unpassable: bool,
    pub unmoveable: bool,
    pub block_missiles: bool,
    pub block_pathfind: bool,
    pub no_move_animation: bool,
    pub pickupable: bool,
    pub hangable: bool,
    pub hook_south: bool,
    pub hook_east: bool,
    pub rotateable: bool,
    pub light: Option<(u16, u16)>,
    pub dont_hide: bool,
    pub translucent: bool,
    pub displacement: (u16, u16),
    pub elevation: Option<u16>,
    pub lying_object: bool,
    pub animate_always: bool,
    pub minimap_colour: Option<u16>,
    pub lens_help: Option<u16>,
    pub full_ground: bool,
    pub ignore_look: bool,
    pub cloth_slot: Option<u16>,
    pub market: Option<MarketInfo>,
    pub default_action: Option<u16>,
    pub wrappable: bool,
    pub unwrappable: bool,
    pub top_effect: bool,
}

impl EntryFlags {
    /// Walkable terrain, as opposed to things standing on it.
    pub fn is_ground(&self) -> bool {
        self.ground_speed.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
#[allow(dead_code)]
pub struct CatalogEntry {
    pub kind: EntryKind,
    pub id: u32,
    pub flags: EntryFlags,
    pub width: u8,
    pub height: u8,
    pub exact_size: u8,
    pub layers: u8,
    pub pattern_x: u8,
    pub pattern_y: u8,
    pub pattern_z: u8,
    pub anim_length: u8,
    pub sprite_refs: Vec<u32>,
}

impl CatalogEntry {
    /// Sprite slots spanned by one animation frame across all layers and
    /// patterns.
    pub fn frame_stride(&self) -> usize {
        self.width as usize
            * self.height as usize
            * self.layers as usize
            * self.pattern_x as usize
            * self.pattern_y as usize
            * self.pattern_z as usize
    }

    pub fn sprite_ref(&self, index: usize) -> Option<u32> {
        self.sprite_refs.get(index).copied()
    }
}

/// Read position inside the catalog body. Obtained from
/// [`Catalog::cursor`] and advanced by each parse pass in turn.
#[derive(Debug, Clone, Copy)]
pub struct CatalogCursor {
    pos: usize,
}

/// Outcome of parsing one category: everything decoded before the first
/// fault, plus the fault itself when there was one.
#[derive(Debug)]
pub struct CategoryParse {
    pub entries: Vec<CatalogEntry>,
    pub halt: Option<ParseHalt>,
}

/// A fault that stopped a category mid-way. Entries up to and including
/// `last_good_id` survived; `None` means the first entry already failed.
#[derive(Debug)]
pub struct ParseHalt {
    pub last_good_id: Option<u32>,
    pub error: DatError,
}

pub struct Catalog {
    data: Vec<u8>,
    signature: u32,
    item_count: u16,
    creature_count: u16,
    effect_count: u16,
    missile_count: u16,
}

impl Catalog {
    pub fn open(path: &Path) -> Result<Self, DatError> {
        let data = fs::read(path)?;
        Self::from_bytes(data)
    }

    pub fn from_bytes(data: Vec<u8>) -> Result<Self, DatError> {
        if data.len() < 12 {
            return Err(DatError::Format(format!(
                "header needs 12 bytes, file has {}",
                data.len()
            )));
        }

        Ok(Catalog {
            signature: u32::from_le_bytes([data[0], data[1], data[2], data[3]]),
            item_count: u16::from_le_bytes([data[4], data[5]]),
            creature_count: u16::from_le_bytes([data[6], data[7]]),
            effect_count: u16::from_le_bytes([data[8], data[9]]),
            missile_count: u16::from_le_bytes([data[10], data[11]]),
            data,
        })
    }

    pub fn signature(&self) -> u32 {
        self.signature
    }

    pub fn item_count(&self) -> u16 {
        self.item_count
    }

    pub fn creature_count(&self) -> u16 {
        self.creature_count
    }

    pub fn effect_count(&self) -> u16 {
        self.effect_count
    }

    pub fn missile_count(&self) -> u16 {
        self.missile_count
    }

    /// Body cursor positioned at the first item entry.
    pub fn cursor(&self) -> CatalogCursor {
        CatalogCursor { pos: 12 }
    }

    pub fn parse_items(&self, cursor: &mut CatalogCursor) -> CategoryParse {
        self.parse_category(cursor, EntryKind::Item, ITEM_BASE_ID, self.item_count)
    }

    pub fn parse_creatures(&self, cursor: &mut CatalogCursor) -> CategoryParse {
        self.parse_category(cursor, EntryKind::Creature, OTHER_BASE_ID, self.creature_count)
    }

    pub fn parse_effects(&self, cursor: &mut CatalogCursor) -> CategoryParse {
        self.parse_category(cursor, EntryKind::Effect, OTHER_BASE_ID, self.effect_count)
    }

    pub fn parse_missiles(&self, cursor: &mut CatalogCursor) -> CategoryParse {
        self.parse_category(cursor, EntryKind::Missile, OTHER_BASE_ID, self.missile_count)
    }

    /// Decode one category's declared entry count, stopping at the first
    /// fault. Already-decoded entries are kept either way.
    fn parse_category(
        &self,
        cursor: &mut CatalogCursor,
        kind: EntryKind,
        base_id: u32,
        count: u16,
    ) -> CategoryParse {
        let mut entries: Vec<CatalogEntry> = Vec::with_capacity(count as usize);
        let mut halt = None;

        for n in 0..count as u32 {
            match self.parse_entry(cursor, kind, base_id + n) {
                Ok(entry) => entries.push(entry),
                Err(error) => {
                    halt = Some(ParseHalt {
                        last_good_id: entries.last().map(|e| e.id),
                        error,
                    });
                    break;
                }
            }
        }

        CategoryParse { entries, halt }
    }

    fn parse_entry(
        &self,
        cursor: &mut CatalogCursor,
        kind: EntryKind,
        id: u32,
    ) -> Result<CatalogEntry, DatError> {
        let mut c = Cursor::new(self.data.as_slice());
        seek_to(&mut c, cursor.pos as u64)?;

        let flags = read_attributes(&mut c, id)?;

        let width = read_u8(&mut c)?;
        let height = read_u8(&mut c)?;
        let exact_size = if width > 1 || height > 1 {
            read_u8(&mut c)?
        } else {
            32
        };
        let layers = read_u8(&mut c)?;
        let pattern_x = read_u8(&mut c)?;
        let pattern_y = read_u8(&mut c)?;
        let pattern_z = read_u8(&mut c)?;
        let anim_length = read_u8(&mut c)?;

        if width == 0
            || height == 0
            || layers == 0
            || pattern_x == 0
            || pattern_y == 0
            || pattern_z == 0
            || anim_length == 0
        {
            return Err(DatError::Format(format!("entry {} has zero geometry", id)));
        }

        let total = width as usize
            * height as usize
            * layers as usize
            * pattern_x as usize
            * pattern_y as usize
            * pattern_z as usize
            * anim_length as usize;
        if total > MAX_SPRITE_REFS {
            return Err(DatError::Format(format!(
                "entry {} declares {} sprite references (limit {})",
                id, total, MAX_SPRITE_REFS
            )));
        }

        let mut sprite_refs = Vec::with_capacity(total);
        for _ in 0..total {
            sprite_refs.push(read_u32_le(&mut c)?);
        }

        cursor.pos = c.position() as usize;

        Ok(CatalogEntry {
            kind,
            id,
            flags,
            width,
            height,
            exact_size,
            layers,
            pattern_x,
            pattern_y,
            pattern_z,
            anim_length,
            sprite_refs,
        })
    }
}

/// Consume one attribute run up to its 0xFF sentinel.
fn read_attributes(c: &mut Cursor<&[u8]>, id: u32) -> Result<EntryFlags, DatError> {
    let mut flags = EntryFlags::default();

    loop {
        let tag = read_u8(c)?;
        match tag {
            ATTR_END => break,
            0x00 => flags.ground_speed = Some(read_u16_le(c)?),
            0x01 => flags.ground_border = true,
            0x02 => flags.on_bottom = true,
            0x03 => flags.on_top = true,
            0x04 => flags.container = true,
            0x05 => flags.stackable = true,
            0x06 => flags.force_use = true,
            0x07 => flags.multi_use = true,
            0x08 => flags.writable = Some(read_u16_le(c)?),
            0x09 => flags.writable_once = Some(read_u16_le(c)?),
            0x0A => flags.fluid_container = true,
            0x0B => flags.splash = true,
            0x0C => flags.unpassable = true,
            0x0D => flags.unmoveable = true,
            0x0E => flags.block_missiles = true,
            0x0F => flags.block_pathfind = true,
            0x10 => flags.no_move_animation = true,
            0x11 => flags.pickupable = true,
            0x12 => flags.hangable = true,
            0x13 => flags.hook_south = true,
            0x14 => flags.hook_east = true,
            0x15 => flags.rotateable = true,
            0x16 => flags.light = Some((read_u16_le(c)?, read_u16_le(c)?)),
            0x17 => flags.dont_hide = true,
            0x18 => flags.translucent = true,
            0x19 => flags.displacement = (read_u16_le(c)?, read_u16_le(c)?),
            0x1A => flags.elevation = Some(read_u16_le(c)?),
            0x1B => flags.lying_object = true,
            0x1C => flags.animate_always = true,
            0x1D => flags.minimap_colour = Some(read_u16_le(c)?),
            0x1E => flags.lens_help = Some(read_u16_le(c)?),
            0x1F => flags.full_ground = true,
            0x20 => flags.ignore_look = true,
            0x21 => flags.cloth_slot = Some(read_u16_le(c)?),
            0x22 => flags.market = Some(read_market(c)?),
            0x23 => flags.default_action = Some(read_u16_le(c)?),
            0x24 => flags.wrappable = true,
            0x25 => flags.unwrappable = true,
            0x26 => flags.top_effect = true,
            _ => return Err(DatError::UnknownAttribute { id, tag }),
        }
    }

    Ok(flags)
}

fn read_market(c: &mut Cursor<&[u8]>) -> Result<MarketInfo, DatError> {
    let category = read_u16_le(c)?;
    let trade_as = read_u16_le(c)?;
    let show_as = read_u16_le(c)?;
    let name_length = read_u16_le(c)? as usize;
    let name_bytes = read_bytes(c, name_length)?;
    let name = String::from_utf8_lossy(&name_bytes).into_owned();
    let restrict_vocation = read_u16_le(c)?;
    let required_level = read_u16_le(c)?;

    Ok(MarketInfo {
        category,
        trade_as,
        show_as,
        name,
        restrict_vocation,
        required_level,
    })
}
