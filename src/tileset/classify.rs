//! Heuristic classification of catalog entries
//!
//! Two independent partitions feed the selector. The structural one
//! sorts every item entry into exactly one coarse category from its
//! attribute flags alone. The colour one groups ground entries into
//! colour families from the profile of their representative sprite.

use std::collections::HashMap;

use crate::{
    formats::{dat::CatalogEntry, spr::SpriteArchive},
    graphics::profile::{self, ColourProfile},
    tileset::select::representative_index,
};

/// Colour families a ground sprite can read as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroundKind {
    Water,
    Lava,
    Grass,
    DarkGrass,
    Sand,
    Dirt,
    Wood,
    WhiteStone,
    Stone,
    DarkStone,
    Red,
    Unknown,
}

type ColourRule = fn(&ColourProfile) -> bool;

/// Ordered decision table for [`classify_ground`]. The first matching
/// rule wins, so the most distinctive families sit on top: water before
/// grass keeps teal shallows out of the grass bucket, lava before red
/// keeps embers out of the brick bucket.
pub const GROUND_RULES: [(GroundKind, ColourRule); 11] = [
    (GroundKind::Water, is_water),
    (GroundKind::Lava, is_lava),
    (GroundKind::Grass, is_grass),
    (GroundKind::DarkGrass, is_dark_grass),
    (GroundKind::Sand, is_sand),
    (GroundKind::Dirt, is_dirt),
    (GroundKind::Wood, is_wood),
    (GroundKind::WhiteStone, is_white_stone),
    (GroundKind::Stone, is_stone),
    (GroundKind::DarkStone, is_dark_stone),
    (GroundKind::Red, is_red),
];

/// Single evaluation point for the colour rules. Every profile lands in
/// exactly one family; nothing matching falls through to `Unknown`.
pub fn classify_ground(profile: &ColourProfile) -> GroundKind {
    for (kind, rule) in GROUND_RULES {
        if rule(profile) {
            return kind;
        }
    }
    GroundKind::Unknown
}

/// Spread between the brightest and darkest channel mean. Low spread
/// reads as grey.
fn spread(p: &ColourProfile) -> f32 {
    let hi = p.mean_r.max(p.mean_g).max(p.mean_b);
    let lo = p.mean_r.min(p.mean_g).min(p.mean_b);
    hi - lo
}

fn is_water(p: &ColourProfile) -> bool {
    p.mean_b > p.mean_r * 1.2 && p.mean_b > p.mean_g * 1.05
}

fn is_lava(p: &ColourProfile) -> bool {
    p.mean_r > 140.0 && p.mean_g < p.mean_r * 0.6 && p.mean_b < p.mean_r * 0.45
}

fn is_grass(p: &ColourProfile) -> bool {
    p.mean_g >= 70.0 && p.mean_g > p.mean_r * 1.1 && p.mean_g > p.mean_b * 1.3
}

fn is_dark_grass(p: &ColourProfile) -> bool {
    p.mean_g < 70.0 && p.mean_g > p.mean_r && p.mean_g > p.mean_b
}

fn is_sand(p: &ColourProfile) -> bool {
    p.mean_r > 160.0 && p.mean_g > 130.0 && p.mean_b < p.mean_g && p.mean_r - p.mean_b > 40.0
}

fn is_dirt(p: &ColourProfile) -> bool {
    p.mean_r > 90.0
        && p.mean_r <= 160.0
        && p.mean_g > p.mean_r * 0.55
        && p.mean_g < p.mean_r * 0.85
        && p.mean_g > p.mean_b * 1.15
        && p.mean_b < p.mean_r * 0.55
}

fn is_wood(p: &ColourProfile) -> bool {
    p.mean_r > 90.0
        && p.mean_g > p.mean_r * 0.5
        && p.mean_g < p.mean_r * 0.9
        && p.mean_g > p.mean_b * 1.25
        && p.mean_b < p.mean_r * 0.6
}

fn is_white_stone(p: &ColourProfile) -> bool {
    p.mean_r > 150.0 && p.mean_g > 150.0 && p.mean_b > 140.0 && spread(p) < 35.0
}

fn is_stone(p: &ColourProfile) -> bool {
    p.mean_r > 80.0 && p.mean_r <= 160.0 && spread(p) < 30.0
}

fn is_dark_stone(p: &ColourProfile) -> bool {
    p.mean_r <= 80.0 && spread(p) < 30.0
}

fn is_red(p: &ColourProfile) -> bool {
    p.mean_r > 110.0 && p.mean_r > p.mean_g * 1.4 && p.mean_r > p.mean_b * 1.4
}

/// Coarse structural category of one item entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StructuralCategory {
    Ground,
    Wall,
    Vegetation,
    Overlay,
    Object,
}

/// Fixed-precedence partition over the attribute flags. Total: every
/// entry lands in exactly one category, `Object` being the catch-all.
pub fn categorise_structural(entry: &CatalogEntry) -> StructuralCategory {
    let f = &entry.flags;
    if f.is_ground() {
        StructuralCategory::Ground
    } else if f.unpassable && f.block_missiles && f.unmoveable && !f.container {
        StructuralCategory::Wall
    } else if f.on_top && f.unpassable {
        StructuralCategory::Vegetation
    } else if f.pickupable && !f.stackable && f.displacement != (0, 0) {
        StructuralCategory::Overlay
    } else {
        StructuralCategory::Object
    }
}

/// A ground entry that survived profiling: the entry itself, the profile
/// of its representative sprite and that sprite's archive id.
#[derive(Debug)]
pub struct GroundCandidate<'a> {
    pub entry: &'a CatalogEntry,
    pub profile: ColourProfile,
    pub sprite_id: u32,
}

/// Classifier output, read by the selector.
#[derive(Debug, Default)]
pub struct Buckets<'a> {
    pub grounds: HashMap<GroundKind, Vec<GroundCandidate<'a>>>,
    pub walls: Vec<&'a CatalogEntry>,
    pub vegetation: Vec<&'a CatalogEntry>,
    pub overlays: Vec<&'a CatalogEntry>,
    pub objects: Vec<&'a CatalogEntry>,
}

/// Partition the item entries. Ground entries that have no decodable
/// representative sprite, or whose sprite is too sparse to profile, are
/// dropped silently.
pub fn build_buckets<'a>(items: &'a [CatalogEntry], archive: &SpriteArchive) -> Buckets<'a> {
    let mut buckets = Buckets::default();

    for entry in items {
        match categorise_structural(entry) {
            StructuralCategory::Ground => {
                let Some(sprite_id) = entry.sprite_ref(representative_index(entry)) else {
                    continue;
                };
                let Some(bitmap) = archive.extract(sprite_id) else {
                    continue;
                };
                let Some(profile) = profile::analyse(&bitmap) else {
                    continue;
                };
                let kind = classify_ground(&profile);
                buckets.grounds.entry(kind).or_default().push(GroundCandidate {
                    entry,
                    profile,
                    sprite_id,
                });
            }
            StructuralCategory::Wall => buckets.walls.push(entry),
            StructuralCategory::Vegetation => buckets.vegetation.push(entry),
            StructuralCategory::Overlay => buckets.overlays.push(entry),
            StructuralCategory::Object => buckets.objects.push(entry),
        }
    }

    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::dat::{EntryFlags, EntryKind};

    fn profile(r: f32, g: f32, b: f32) -> ColourProfile {
        ColourProfile {
            mean_r: r,
            mean_g: g,
            mean_b: b,
            coverage: 0.8,
        }
    }

    #[test]
    fn every_family_is_reachable() {
        let cases = [
            (profile(60.0, 70.0, 140.0), GroundKind::Water),
            (profile(220.0, 90.0, 40.0), GroundKind::Lava),
            (profile(70.0, 120.0, 50.0), GroundKind::Grass),
            (profile(40.0, 60.0, 35.0), GroundKind::DarkGrass),
            (profile(210.0, 185.0, 130.0), GroundKind::Sand),
            (profile(120.0, 85.0, 50.0), GroundKind::Dirt),
            (profile(170.0, 125.0, 75.0), GroundKind::Wood),
            (profile(190.0, 190.0, 180.0), GroundKind::WhiteStone),
            (profile(120.0, 118.0, 122.0), GroundKind::Stone),
            (profile(60.0, 60.0, 66.0), GroundKind::DarkStone),
            (profile(150.0, 85.0, 75.0), GroundKind::Red),
            (profile(200.0, 40.0, 180.0), GroundKind::Unknown),
        ];
        for (p, expected) in cases {
            assert_eq!(classify_ground(&p), expected, "profile {:?}", p);
        }
    }

    #[test]
    fn teal_shallows_read_as_water() {
        let teal = profile(40.0, 110.0, 120.0);
        assert_eq!(classify_ground(&teal), GroundKind::Water);
    }

    #[test]
    fn lava_outranks_red() {
        let ember = profile(200.0, 80.0, 30.0);
        assert!(is_red(&ember), "red rule would also match");
        assert_eq!(classify_ground(&ember), GroundKind::Lava);
    }

    fn entry_with(flags: EntryFlags) -> CatalogEntry {
        CatalogEntry {
            kind: EntryKind::Item,
            id: 100,
            flags,
            width: 1,
            height: 1,
            exact_size: 32,
            layers: 1,
            pattern_x: 1,
            pattern_y: 1,
            pattern_z: 1,
            anim_length: 1,
            sprite_refs: vec![1],
        }
    }

    #[test]
    fn ground_flag_wins_over_everything() {
        let mut flags = EntryFlags {
            ground_speed: Some(100),
            unpassable: true,
            block_missiles: true,
            unmoveable: true,
            ..Default::default()
        };
        assert_eq!(
            categorise_structural(&entry_with(flags.clone())),
            StructuralCategory::Ground
        );
        flags.ground_speed = None;
        assert_eq!(
            categorise_structural(&entry_with(flags)),
            StructuralCategory::Wall
        );
    }

    #[test]
    fn containers_are_not_walls() {
        let flags = EntryFlags {
            unpassable: true,
            block_missiles: true,
            unmoveable: true,
            container: true,
            ..Default::default()
        };
        assert_eq!(
            categorise_structural(&entry_with(flags)),
            StructuralCategory::Object
        );
    }

    #[test]
    fn on_top_and_unpassable_reads_as_vegetation() {
        let flags = EntryFlags {
            on_top: true,
            unpassable: true,
            ..Default::default()
        };
        assert_eq!(
            categorise_structural(&entry_with(flags)),
            StructuralCategory::Vegetation
        );
    }

    #[test]
    fn displaced_pickupables_read_as_overlay() {
        let flags = EntryFlags {
            pickupable: true,
            displacement: (8, 8),
            ..Default::default()
        };
        assert_eq!(
            categorise_structural(&entry_with(flags.clone())),
            StructuralCategory::Overlay
        );

        let stacked = EntryFlags {
            stackable: true,
            ..flags
        };
        assert_eq!(
            categorise_structural(&entry_with(stacked)),
            StructuralCategory::Object
        );
    }

    #[test]
    fn default_flags_are_a_generic_object() {
        assert_eq!(
            categorise_structural(&entry_with(EntryFlags::default())),
            StructuralCategory::Object
        );
    }
}
