//! Print the contents of Turrican II world files
//!
//! Run with: cargo run --bin t2-inspect -- <game-dir> [--world N] [--level N] [--verify]

use std::path::PathBuf;

use clap::Parser;
use t2edit::blockmap;
use t2edit::{Endianness, GameConfig, Level, StreamWriter, World};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "t2-inspect")]
#[command(about = "Inspect Turrican II world files without modifying them")]
struct Args {
    /// Directory holding the L1..L5 world files and their overlays
    game_dir: PathBuf,

    /// Level metadata, relative to the game directory unless absolute
    #[arg(long, default_value = GameConfig::DEFAULT_FILE)]
    config: PathBuf,

    /// Only this world (1 based)
    #[arg(long)]
    world: Option<usize>,

    /// Only this level (1 based)
    #[arg(long)]
    level: Option<usize>,

    /// Re-encode every level in memory and compare sizes
    #[arg(long)]
    verify: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).compact().init();

    let args = Args::parse();
    let config = GameConfig::load(&args.game_dir.join(&args.config))?;

    let mut mismatches = 0;
    for (world_index, world_config) in config.worlds.iter().enumerate() {
        if args.world.is_some_and(|w| w != world_index + 1) {
            continue;
        }

        let world = World::open(&args.game_dir, world_config)?;
        let header = world.header();
        println!("{}", world.path().display());
        println!(
            "  gfx {}  collision {}  palette {}  u1 {}  u2 {}",
            header.tile_gfx_offset,
            header.tile_collision_offset,
            header.palette_offset,
            header.u1_offset,
            header.u2_offset
        );
        println!("  {} tiles, {} colors", world.tileset().len(), world.palette().len());

        for (level_index, level) in world.levels().iter().enumerate() {
            if args.level.is_some_and(|l| l != level_index + 1) {
                continue;
            }
            print_level(level);
            if args.verify && !verify_level(level)? {
                mismatches += 1;
            }
        }
    }

    if args.verify {
        println!("{mismatches} level(s) failed verification");
        if mismatches > 0 {
            std::process::exit(1);
        }
    }
    Ok(())
}

fn print_level(level: &Level) {
    let h = level.header();
    println!("  {}", level.name);
    println!(
        "    data {}  tiles {}x{}  camera ({}, {})  player ({}, {})  u1 {:#04x}  u2 {}",
        h.data_offset,
        h.tilemap_width,
        h.tilemap_height,
        h.camera_tile_x,
        h.camera_tile_y,
        h.player_x,
        h.player_y,
        h.u1,
        h.u2
    );
    println!(
        "    blockmap {}x{} at {}  {} entities  {} / {} bytes ({} left)",
        h.blockmap_width,
        h.blockmap_height,
        h.blockmap_row_pointers_offset,
        level.entities().len(),
        level.calculate_blockmap_size(),
        level.maximum_blockmap_size,
        level.bytes_left()
    );
}

/// Encode the level into a scratch buffer and check the computed blockmap
/// size against what was written
fn verify_level(level: &Level) -> t2edit::Result<bool> {
    let mut scratch = level.clone();
    let expected = scratch.calculate_blockmap_size();
    let dropped = blockmap::build_blocks(&scratch.blockmap_geometry(), scratch.entities()).dropped;

    let mut writer = StreamWriter::new(Endianness::Big);
    let result = scratch.write_entities(&mut writer)?;
    scratch.save_at(&mut writer, result.end_offset.as_usize())?;

    let ok = result.byte_len() == expected && dropped == 0;
    println!(
        "    verify: computed {} written {} dropped {} {}",
        expected,
        result.byte_len(),
        dropped,
        if ok { "ok" } else { "MISMATCH" }
    );
    Ok(ok)
}
