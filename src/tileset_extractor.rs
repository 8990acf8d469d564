//! End-to-end extraction pipeline
//!
//! Opens the two client files, runs the four catalog parse passes over a
//! shared cursor, then classifies, selects, packs and writes every
//! artifact into the output directory.

use std::fs;
use std::io;
use std::path::Path;

use crate::{
    formats::{
        dat::{Catalog, CatalogEntry, CategoryParse},
        spr::SpriteArchive,
    },
    graphics::{
        atlas::{self, AtlasConfig},
        sheets,
    },
    tileset::{classify, select::Selector, TileKind},
};

#[allow(dead_code)]
pub struct TilesetExtractor {
    archive: SpriteArchive,
    items: Vec<CatalogEntry>,
    creatures: Vec<CatalogEntry>,
    effects: Vec<CatalogEntry>,
    missiles: Vec<CatalogEntry>,
    atlas_config: AtlasConfig,
}

impl TilesetExtractor {
    /// Open and decode both client files. A catalog fault inside one
    /// category keeps that category's good entries but abandons the later
    /// categories, whose positions in the stream are no longer knowable.
    pub fn new(spr_path: &Path, dat_path: &Path) -> io::Result<Self> {
        println!("Opening sprite archive {:?}...", spr_path);
        let archive = SpriteArchive::open(spr_path).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Failed to open sprite archive: {}", e),
            )
        })?;
        println!(
            "  Signature 0x{:08X}, {} sprite slots",
            archive.signature(),
            archive.sprite_count()
        );

        println!("Opening object catalog {:?}...", dat_path);
        let catalog = Catalog::open(dat_path).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Failed to open object catalog: {}", e),
            )
        })?;
        println!(
            "  Signature 0x{:08X}: {} items, {} creatures, {} effects, {} missiles",
            catalog.signature(),
            catalog.item_count(),
            catalog.creature_count(),
            catalog.effect_count(),
            catalog.missile_count()
        );

        let mut cursor = catalog.cursor();
        let mut lost = false;

        let items = take_category("items", catalog.parse_items(&mut cursor), &mut lost);
        let creatures = if lost {
            abandoned("creatures")
        } else {
            take_category("creatures", catalog.parse_creatures(&mut cursor), &mut lost)
        };
        let effects = if lost {
            abandoned("effects")
        } else {
            take_category("effects", catalog.parse_effects(&mut cursor), &mut lost)
        };
        let missiles = if lost {
            abandoned("missiles")
        } else {
            take_category("missiles", catalog.parse_missiles(&mut cursor), &mut lost)
        };

        Ok(TilesetExtractor {
            archive,
            items,
            creatures,
            effects,
            missiles,
            atlas_config: AtlasConfig::default(),
        })
    }

    /// Run the scrape and write `tileset.png`, `tileset.json` and the two
    /// diagnostic sheets into `out_dir`.
    pub fn extract_tileset(&self, out_dir: &Path) -> io::Result<()> {
        fs::create_dir_all(out_dir)?;

        println!("Classifying {} item entries...", self.items.len());
        let buckets = classify::build_buckets(&self.items, &self.archive);
        let ground_total: usize = buckets.grounds.values().map(Vec::len).sum();
        println!(
            "  {} grounds in {} colour families, {} walls, {} vegetation, {} overlays, {} other objects",
            ground_total,
            buckets.grounds.len(),
            buckets.walls.len(),
            buckets.vegetation.len(),
            buckets.overlays.len(),
            buckets.objects.len()
        );

        println!("Selecting tile representatives...");
        let mut selector = Selector::new(&self.archive);
        let selections = selector.select_all(&buckets);
        for selection in &selections {
            let sprites: Vec<String> = selection
                .frames()
                .iter()
                .map(|f| f.sprite_id.to_string())
                .collect();
            println!(
                "  {} <- entry {}, sprites [{}]",
                selection.kind,
                selection.entry_id,
                sprites.join(", ")
            );
        }
        for kind in TileKind::ALL {
            if !selections.iter().any(|s| s.kind == kind) {
                println!("  - Warning: no candidate found for {}", kind);
            }
        }

        println!("Packing atlas...");
        let atlas = atlas::pack_atlas(&selections, &self.atlas_config);
        atlas::save_atlas(&atlas, out_dir, &self.atlas_config).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Failed to save atlas: {}", e),
            )
        })?;
        println!(
            "  {}x{} px, {} tiles mapped",
            atlas.image.width(),
            atlas.image.height(),
            atlas.mapping.len()
        );

        println!("Rendering diagnostic sheets...");
        let grounds = sheets::render_ground_sheet(&self.items, &self.archive);
        let named = sheets::render_named_sheet(&self.items, &self.archive);
        for (name, sheet) in [("grounds.png", grounds), ("named.png", named)] {
            let path = out_dir.join(name);
            sheet
                .save(&path)
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
            if self.atlas_config.optimise_png {
                if let Err(err) = atlas::optimise_png(&path) {
                    println!("  - Warning: PNG optimisation failed: {}", err);
                }
            }
        }

        println!("Extraction complete.");
        Ok(())
    }
}

fn take_category(name: &str, parse: CategoryParse, lost: &mut bool) -> Vec<CatalogEntry> {
    if let Some(halt) = &parse.halt {
        match halt.last_good_id {
            Some(id) => eprintln!(
                "  - Warning: {} parse halted after entry {}: {}",
                name, id, halt.error
            ),
            None => eprintln!(
                "  - Warning: {} parse halted before the first entry: {}",
                name, halt.error
            ),
        }
        *lost = true;
    }
    println!("  Parsed {} {}", parse.entries.len(), name);
    parse.entries
}

fn abandoned(name: &str) -> Vec<CatalogEntry> {
    eprintln!("  - Warning: skipping {}, stream position was lost", name);
    Vec::new()
}
