//! Representative-sprite selection
//!
//! Reduces the classifier's buckets to at most one pick per
//! [`TileKind`], walking the vocabulary in declaration order. Entries
//! already claimed by an earlier kind are off the table for later ones,
//! so no two tiles ever share a catalog entry.

use std::collections::HashSet;

use crate::{
    formats::{dat::CatalogEntry, spr::SpriteArchive},
    graphics::profile::{self, ColourProfile},
    tileset::{
        classify::{classify_ground, Buckets, GroundCandidate, GroundKind},
        Frame, Selection, SelectionImage, TileKind,
    },
};

/// Coverage below this is too thin to stand for a full tile.
const MIN_COVERAGE: f32 = 0.05;

/// Index of the entry's representative sprite. Entries carrying a 2D
/// border pattern get the centre cell of the pattern grid, which is the
/// variant drawn when the tile is surrounded by itself; everything else
/// gets the first sprite.
pub fn representative_index(entry: &CatalogEntry) -> usize {
    if entry.pattern_x >= 2 && entry.pattern_y >= 2 {
        (entry.pattern_x as usize + 1)
            * entry.width as usize
            * entry.height as usize
            * entry.layers as usize
    } else {
        0
    }
}

/// Stable two-key ranking over ground candidates: the full-ground flag
/// first (when preferred), opaque coverage second. The earliest candidate
/// wins ties, so catalog order breaks them. An empty pool is "no pick",
/// not an error.
pub fn pick_best<'a, 'e>(
    candidates: &[&'a GroundCandidate<'e>],
    prefer_full_ground: bool,
) -> Option<&'a GroundCandidate<'e>> {
    let mut ranked: Vec<&GroundCandidate> = candidates.to_vec();
    ranked.sort_by(|a, b| {
        let full = |c: &GroundCandidate| prefer_full_ground && c.entry.flags.full_ground;
        full(b).cmp(&full(a)).then(
            b.profile
                .coverage
                .partial_cmp(&a.profile.coverage)
                .unwrap_or(std::cmp::Ordering::Equal),
        )
    });
    ranked.first().copied()
}

fn is_static_entry(e: &CatalogEntry) -> bool {
    e.anim_length == 1
}

fn spans_multiple_tiles(e: &CatalogEntry) -> bool {
    e.width >= 2 || e.height >= 2
}

fn fits_single_tile(e: &CatalogEntry) -> bool {
    e.width == 1 && e.height == 1
}

fn is_stone_coloured(p: &ColourProfile) -> bool {
    matches!(
        classify_ground(p),
        GroundKind::Stone | GroundKind::WhiteStone | GroundKind::DarkStone
    )
}

fn is_wood_coloured(p: &ColourProfile) -> bool {
    matches!(classify_ground(p), GroundKind::Wood | GroundKind::Dirt)
}

fn is_leaf_coloured(p: &ColourProfile) -> bool {
    matches!(classify_ground(p), GroundKind::Grass | GroundKind::DarkGrass)
}

fn is_flower_coloured(p: &ColourProfile) -> bool {
    matches!(classify_ground(p), GroundKind::Red)
}

/// "Kit" in a market name marks the boxed shop form of a furnishing, not
/// the object as placed in the world.
fn has_kit_name(entry: &CatalogEntry) -> bool {
    entry
        .flags
        .market
        .as_ref()
        .map_or(false, |m| m.name.to_ascii_lowercase().contains("kit"))
}

pub struct Selector<'a> {
    archive: &'a SpriteArchive,
    used: HashSet<u32>,
}

impl<'a> Selector<'a> {
    pub fn new(archive: &'a SpriteArchive) -> Self {
        Selector {
            archive,
            used: HashSet::new(),
        }
    }

    /// Walk the whole vocabulary and pick a representative for each kind
    /// that has a viable candidate. Kinds without one are simply absent
    /// from the result.
    pub fn select_all(&mut self, buckets: &Buckets) -> Vec<Selection> {
        let mut selections = Vec::new();
        for kind in TileKind::ALL {
            if let Some(selection) = self.select(kind, buckets) {
                self.used.insert(selection.entry_id);
                selections.push(selection);
            }
        }
        selections
    }

    fn select(&self, kind: TileKind, buckets: &Buckets) -> Option<Selection> {
        match kind {
            TileKind::Grass => self.select_ground(kind, buckets, &[GroundKind::Grass]),
            TileKind::Dirt => self.select_ground(kind, buckets, &[GroundKind::Dirt]),
            TileKind::Sand => self.select_ground(kind, buckets, &[GroundKind::Sand]),
            TileKind::StoneFloor => self.select_ground(
                kind,
                buckets,
                &[GroundKind::Stone, GroundKind::WhiteStone, GroundKind::DarkStone],
            ),
            TileKind::WoodFloor => self.select_ground(kind, buckets, &[GroundKind::Wood]),
            TileKind::Water => self.select_ground(kind, buckets, &[GroundKind::Water]),
            TileKind::Lava => self.select_ground(kind, buckets, &[GroundKind::Lava]),
            TileKind::StoneWall => {
                self.select_scored(kind, &buckets.walls, is_static_entry, is_stone_coloured, false)
            }
            TileKind::WoodWall => {
                self.select_scored(kind, &buckets.walls, is_static_entry, is_wood_coloured, false)
            }
            TileKind::Tree => self.select_scored(
                kind,
                &buckets.vegetation,
                spans_multiple_tiles,
                is_leaf_coloured,
                true,
            ),
            TileKind::Bush => self.select_scored(
                kind,
                &buckets.vegetation,
                fits_single_tile,
                is_leaf_coloured,
                false,
            ),
            TileKind::Boulder => self.select_scored(
                kind,
                &buckets.overlays,
                fits_single_tile,
                is_stone_coloured,
                false,
            ),
            TileKind::Flowers => self.select_scored(
                kind,
                &buckets.overlays,
                fits_single_tile,
                is_flower_coloured,
                false,
            ),
        }
    }

    /// Pick from one or more ground colour families, tried as a single
    /// merged pool. Animated kinds narrow the pool to moving entries
    /// first and fall back to the full pool when none move.
    fn select_ground(
        &self,
        kind: TileKind,
        buckets: &Buckets,
        sources: &[GroundKind],
    ) -> Option<Selection> {
        let mut pool: Vec<&GroundCandidate> = Vec::new();
        for source in sources {
            if let Some(candidates) = buckets.grounds.get(source) {
                pool.extend(candidates.iter().filter(|c| !self.used.contains(&c.entry.id)));
            }
        }

        if kind.animated() {
            let moving: Vec<&GroundCandidate> = pool
                .iter()
                .copied()
                .filter(|c| c.entry.anim_length >= 2)
                .collect();
            if !moving.is_empty() {
                pool = moving;
            }
        }

        let best = pick_best(&pool, true)?;
        self.build_selection(kind, best.entry, best.sprite_id)
    }

    fn select_scored(
        &self,
        kind: TileKind,
        pool: &[&CatalogEntry],
        structural: fn(&CatalogEntry) -> bool,
        colour: fn(&ColourProfile) -> bool,
        prefer_larger: bool,
    ) -> Option<Selection> {
        let (entry, representative) =
            self.score_by_flags_and_colour(pool, structural, colour, prefer_larger)?;
        self.build_selection(kind, entry, representative)
    }

    /// Score every not-yet-used entry that passes both predicates;
    /// highest score wins and the first seen wins ties. Market names
    /// containing "kit" lose a large flat penalty, footprint earns a
    /// bonus when asked for. The winner comes back with its
    /// representative sprite id.
    fn score_by_flags_and_colour<'e>(
        &self,
        pool: &[&'e CatalogEntry],
        structural: fn(&CatalogEntry) -> bool,
        colour: fn(&ColourProfile) -> bool,
        prefer_larger: bool,
    ) -> Option<(&'e CatalogEntry, u32)> {
        let mut best: Option<(&CatalogEntry, u32)> = None;
        let mut best_score = f32::MIN;

        for &entry in pool {
            if self.used.contains(&entry.id) || !structural(entry) {
                continue;
            }
            let Some(sprite_id) = entry.sprite_ref(representative_index(entry)) else {
                continue;
            };
            let Some(bitmap) = self.archive.extract(sprite_id) else {
                continue;
            };
            let Some(profile) = profile::analyse(&bitmap) else {
                continue;
            };
            if profile.coverage < MIN_COVERAGE || !colour(&profile) {
                continue;
            }

            let mut score = 100.0 * profile.coverage;
            if !has_kit_name(entry) {
                score += 1000.0;
            }
            if prefer_larger {
                score += 50.0 * (entry.width as f32 + entry.height as f32);
            }

            if score > best_score {
                best_score = score;
                best = Some((entry, sprite_id));
            }
        }

        best
    }

    /// Decode the winner into a selection, reusing the representative
    /// sprite every path has already settled on. Animated kinds add the
    /// representative cell of each further animation frame in declared
    /// order; a frame that fails to decode disqualifies the whole pick.
    fn build_selection(
        &self,
        kind: TileKind,
        entry: &CatalogEntry,
        representative: u32,
    ) -> Option<Selection> {
        let first = Frame {
            sprite_id: representative,
            bitmap: self.archive.extract(representative)?,
        };

        let image = if kind.animated() {
            let base_index = representative_index(entry);
            let stride = entry.frame_stride();
            let mut frames = vec![first];
            for frame in 1..entry.anim_length as usize {
                let sprite_id = entry.sprite_ref(base_index + frame * stride)?;
                let bitmap = self.archive.extract(sprite_id)?;
                frames.push(Frame { sprite_id, bitmap });
            }
            SelectionImage::Animated(frames)
        } else {
            SelectionImage::Static(first)
        };

        Some(Selection {
            kind,
            entry_id: entry.id,
            overlay: kind.overlay(),
            image,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::dat::{EntryFlags, EntryKind, MarketInfo};
    use crate::tileset::classify::build_buckets;

    /// Archive where sprite id N is a solid 32x32 block of `colours[N-1]`
    /// at the given opaque coverage.
    fn archive_of(colours: &[([u8; 3], usize)]) -> SpriteArchive {
        let mut data = Vec::new();
        data.extend_from_slice(&1u32.to_le_bytes());
        data.extend_from_slice(&(colours.len() as u32).to_le_bytes());
        let table_at = data.len();
        data.resize(table_at + colours.len() * 4, 0);

        for (i, (rgb, opaque)) in colours.iter().enumerate() {
            let offset = (data.len() as u32).to_le_bytes();
            data[table_at + i * 4..table_at + i * 4 + 4].copy_from_slice(&offset);

            let mut payload = Vec::new();
            payload.extend_from_slice(&0u16.to_le_bytes());
            payload.extend_from_slice(&(*opaque as u16).to_le_bytes());
            for _ in 0..*opaque {
                payload.extend_from_slice(rgb);
            }

            data.extend_from_slice(&[0, 0, 0]);
            data.extend_from_slice(&(payload.len() as u16).to_le_bytes());
            data.extend_from_slice(&payload);
        }

        SpriteArchive::from_bytes(data).unwrap()
    }

    fn entry(id: u32, flags: EntryFlags, refs: Vec<u32>) -> CatalogEntry {
        CatalogEntry {
            kind: EntryKind::Item,
            id,
            flags,
            width: 1,
            height: 1,
            exact_size: 32,
            layers: 1,
            pattern_x: 1,
            pattern_y: 1,
            pattern_z: 1,
            anim_length: refs.len() as u8,
            sprite_refs: refs,
        }
    }

    fn ground_flags(full: bool) -> EntryFlags {
        EntryFlags {
            ground_speed: Some(100),
            full_ground: full,
            ..Default::default()
        }
    }

    fn candidate(entry: &CatalogEntry, coverage: f32) -> GroundCandidate<'_> {
        GroundCandidate {
            entry,
            profile: ColourProfile {
                mean_r: 0.0,
                mean_g: 0.0,
                mean_b: 0.0,
                coverage,
            },
            sprite_id: entry.sprite_refs[0],
        }
    }

    #[test]
    fn representative_index_prefers_pattern_centre() {
        let mut e = entry(100, ground_flags(false), vec![0; 16]);
        e.pattern_x = 4;
        e.pattern_y = 4;
        e.anim_length = 1;
        assert_eq!(representative_index(&e), 5);

        let plain = entry(101, ground_flags(false), vec![1]);
        assert_eq!(representative_index(&plain), 0);
    }

    #[test]
    fn representative_index_scales_with_footprint() {
        let mut e = entry(100, ground_flags(false), vec![0; 16]);
        e.width = 2;
        e.height = 2;
        e.pattern_x = 2;
        e.pattern_y = 2;
        e.anim_length = 1;
        // Centre cell of the pattern grid, first sprite of that cell.
        assert_eq!(representative_index(&e), 12);
    }

    #[test]
    fn pick_best_ranks_full_ground_then_coverage() {
        let a = entry(100, ground_flags(true), vec![1]);
        let b = entry(101, ground_flags(false), vec![2]);
        let ca = candidate(&a, 0.9);
        let cb = candidate(&b, 0.3);
        assert_eq!(pick_best(&[&cb, &ca], true).unwrap().entry.id, 100);

        // Without the preference only coverage counts.
        let cb_high = candidate(&b, 0.95);
        assert_eq!(pick_best(&[&ca, &cb_high], false).unwrap().entry.id, 101);
    }

    #[test]
    fn pick_best_is_stable_on_ties() {
        let a = entry(100, ground_flags(false), vec![1]);
        let b = entry(101, ground_flags(false), vec![2]);
        let ca = candidate(&a, 0.5);
        let cb = candidate(&b, 0.5);
        assert_eq!(pick_best(&[&ca, &cb], true).unwrap().entry.id, 100);
        assert_eq!(pick_best(&[&cb, &ca], true).unwrap().entry.id, 101);
    }

    #[test]
    fn pick_best_of_nothing_is_none() {
        assert!(pick_best(&[], true).is_none());
    }

    #[test]
    fn grass_pick_takes_highest_coverage() {
        let archive = archive_of(&[
            ([60, 150, 50], 500),
            ([55, 140, 45], 900),
        ]);
        let items = vec![
            entry(100, ground_flags(false), vec![1]),
            entry(101, ground_flags(false), vec![2]),
        ];
        let buckets = build_buckets(&items, &archive);

        let mut selector = Selector::new(&archive);
        let selections = selector.select_all(&buckets);

        let grass = selections.iter().find(|s| s.kind == TileKind::Grass).unwrap();
        assert_eq!(grass.entry_id, 101);
        assert_eq!(grass.frames().len(), 1);
        assert_eq!(grass.frames()[0].sprite_id, 2);
    }

    #[test]
    fn full_ground_outranks_coverage_for_grounds() {
        let archive = archive_of(&[
            ([60, 150, 50], 1000),
            ([55, 140, 45], 600),
        ]);
        let full = EntryFlags {
            full_ground: true,
            ..ground_flags(false)
        };
        let items = vec![
            entry(100, ground_flags(false), vec![1]),
            entry(101, full, vec![2]),
        ];
        let buckets = build_buckets(&items, &archive);

        let mut selector = Selector::new(&archive);
        let selections = selector.select_all(&buckets);
        let grass = selections.iter().find(|s| s.kind == TileKind::Grass).unwrap();
        assert_eq!(grass.entry_id, 101);
    }

    #[test]
    fn stone_floor_merges_the_grey_families() {
        let archive = archive_of(&[
            ([200, 198, 195], 700),
            ([50, 50, 55], 900),
        ]);
        let items = vec![
            entry(100, ground_flags(false), vec![1]),
            entry(101, ground_flags(false), vec![2]),
        ];
        let buckets = build_buckets(&items, &archive);
        assert!(buckets.grounds.contains_key(&GroundKind::WhiteStone));
        assert!(buckets.grounds.contains_key(&GroundKind::DarkStone));

        let mut selector = Selector::new(&archive);
        let selections = selector.select_all(&buckets);
        let floor = selections
            .iter()
            .find(|s| s.kind == TileKind::StoneFloor)
            .unwrap();
        assert_eq!(floor.entry_id, 101, "higher coverage across merged pool");
    }

    #[test]
    fn water_prefers_animated_and_orders_frames() {
        let archive = archive_of(&[
            ([40, 70, 150], 1000),
            ([45, 75, 155], 1000),
            ([50, 80, 160], 1000),
            ([55, 85, 165], 1000),
            ([40, 70, 150], 600),
        ]);
        let items = vec![
            entry(100, ground_flags(false), vec![5]),
            entry(101, ground_flags(false), vec![1, 2, 3, 4]),
        ];
        let buckets = build_buckets(&items, &archive);

        let mut selector = Selector::new(&archive);
        let selections = selector.select_all(&buckets);
        let water = selections.iter().find(|s| s.kind == TileKind::Water).unwrap();

        assert_eq!(water.entry_id, 101);
        let ids: Vec<u32> = water.frames().iter().map(|f| f.sprite_id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn water_falls_back_to_still_candidates() {
        let archive = archive_of(&[([40, 70, 150], 800)]);
        let items = vec![entry(100, ground_flags(false), vec![1])];
        let buckets = build_buckets(&items, &archive);

        let mut selector = Selector::new(&archive);
        let selections = selector.select_all(&buckets);
        let water = selections.iter().find(|s| s.kind == TileKind::Water).unwrap();
        assert_eq!(water.frames().len(), 1);
    }

    #[test]
    fn kit_names_lose_to_placed_objects() {
        let archive = archive_of(&[
            ([120, 120, 124], 1000),
            ([122, 122, 126], 400),
        ]);
        let kit_market = MarketInfo {
            name: "stone wall kit".to_string(),
            ..Default::default()
        };
        let wall_flags = EntryFlags {
            unpassable: true,
            block_missiles: true,
            unmoveable: true,
            ..Default::default()
        };
        let kit_flags = EntryFlags {
            market: Some(kit_market),
            ..wall_flags.clone()
        };
        let items = vec![
            entry(100, kit_flags, vec![1]),
            entry(101, wall_flags, vec![2]),
        ];
        let buckets = build_buckets(&items, &archive);

        let mut selector = Selector::new(&archive);
        let selections = selector.select_all(&buckets);
        let wall = selections
            .iter()
            .find(|s| s.kind == TileKind::StoneWall)
            .unwrap();
        assert_eq!(wall.entry_id, 101, "kit penalty outweighs coverage");
    }

    #[test]
    fn sparse_candidates_are_disqualified() {
        // 40 opaque pixels is under the profiling floor entirely.
        let archive = archive_of(&[([120, 120, 124], 40)]);
        let wall_flags = EntryFlags {
            unpassable: true,
            block_missiles: true,
            unmoveable: true,
            ..Default::default()
        };
        let items = vec![entry(100, wall_flags, vec![1])];
        let buckets = build_buckets(&items, &archive);

        let mut selector = Selector::new(&archive);
        let selections = selector.select_all(&buckets);
        assert!(selections.iter().all(|s| s.kind != TileKind::StoneWall));
    }

    #[test]
    fn a_used_entry_is_off_the_table() {
        // One grey ground entry; StoneFloor takes it on the first walk,
        // after which it may never be picked again.
        let archive = archive_of(&[([120, 120, 124], 900)]);
        let items = vec![entry(100, ground_flags(false), vec![1])];
        let buckets = build_buckets(&items, &archive);

        let mut selector = Selector::new(&archive);
        let first = selector.select_all(&buckets);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].kind, TileKind::StoneFloor);

        let second = selector.select_all(&buckets);
        assert!(second.is_empty());
    }

    #[test]
    fn tree_prefers_the_larger_canopy() {
        let archive = archive_of(&[
            ([50, 120, 45], 800),
            ([50, 120, 45], 800),
        ]);
        let veg_flags = EntryFlags {
            on_top: true,
            unpassable: true,
            ..Default::default()
        };
        let mut small = entry(100, veg_flags.clone(), vec![1, 1]);
        small.anim_length = 1;
        small.width = 2;
        small.height = 1;
        let mut big = entry(101, veg_flags, vec![2, 2, 2, 2]);
        big.anim_length = 1;
        big.width = 2;
        big.height = 2;
        let items = vec![small, big];
        let buckets = build_buckets(&items, &archive);

        let mut selector = Selector::new(&archive);
        let selections = selector.select_all(&buckets);
        let tree = selections.iter().find(|s| s.kind == TileKind::Tree).unwrap();
        assert_eq!(tree.entry_id, 101);
        assert!(tree.overlay);
    }
}
