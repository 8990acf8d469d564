mod binary_utils;
mod formats;
mod graphics;
mod tileset;
mod tileset_extractor;

use std::path::PathBuf;

use clap::Parser;

use tileset_extractor::TilesetExtractor;

/// Scrape a legacy client's sprite archive and object catalog into a
/// tile atlas, a position manifest and diagnostic sheets.
#[derive(Parser)]
#[command(name = "tileset_scraper", version)]
struct Cli {
    /// Sprite archive (.spr)
    spr_path: PathBuf,

    /// Object catalog (.dat)
    dat_path: PathBuf,

    /// Directory the artifacts are written into
    #[arg(short, long, default_value = "output")]
    out_dir: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    match TilesetExtractor::new(&cli.spr_path, &cli.dat_path) {
        Ok(extractor) => {
            if let Err(e) = extractor.extract_tileset(&cli.out_dir) {
                eprintln!("Extraction failed: {}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Failed to open client files: {}", e);
            std::process::exit(1);
        }
    }
}
