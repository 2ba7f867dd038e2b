//! World files: one primary file holding the shared tileset, palette and
//! level headers, plus one overlay file per level after the first.

use std::path::{Path, PathBuf};

use crate::codec::{Endianness, Offset, StreamReader, StreamWriter};
use crate::config::{LevelConfig, WorldConfig};
use crate::entity::TemplateCatalog;
use crate::error::{Error, Result};
use crate::level::{Level, LEVEL_HEADER_SIZE};
use crate::tileset::{Palette, Tileset};

/// Levels whose overlay file stores the tilemap past a fixed prefix,
/// as `(world index, level index, bytes)`
const LEVEL_DATA_ADJUSTMENTS: &[(usize, usize, usize)] = &[(2, 1, 19620)];

/// Extra offset of a level's tilemap inside its data
pub fn level_data_adjustment(world_index: usize, level_index: usize) -> usize {
    LEVEL_DATA_ADJUSTMENTS
        .iter()
        .find(|(w, l, _)| *w == world_index && *l == level_index)
        .map(|(_, _, bytes)| *bytes)
        .unwrap_or(0)
}

pub fn overlay_file_name(world_index: usize, level_index: usize) -> String {
    format!("L{}-{}", world_index + 1, level_index + 1)
}

/// `L1` is world 0, `L2` world 1 and so on
pub fn world_index_from_path(path: &Path) -> Result<usize> {
    let invalid = |reason: &str| Error::InvalidWorld {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| invalid("file name is not valid text"))?;
    let number = name
        .chars()
        .nth(1)
        .and_then(|c| c.to_digit(10))
        .ok_or_else(|| invalid("file name does not carry a world number"))?;
    if number == 0 {
        return Err(invalid("world numbers start at 1"));
    }
    Ok(number as usize - 1)
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WorldHeader {
    pub tile_gfx_offset: Offset,
    pub tile_collision_offset: Offset,
    pub palette_offset: Offset,
    pub u1_offset: Offset,
    pub u2_offset: Offset,
    pub level_offsets: Vec<Offset>,
}

impl WorldHeader {
    pub fn read(reader: &mut StreamReader) -> Result<Self> {
        let tile_gfx_offset = Offset::from_pointer(reader.read_u32()?);
        let tile_collision_offset = Offset::from_pointer(reader.read_u32()?);
        let palette_offset = Offset::from_pointer(reader.read_u32()?);
        let u1_offset = Offset::from_pointer(reader.read_u32()?);
        let u2_offset = Offset::from_pointer(reader.read_u32()?);

        let count = reader.read_u16()? as usize;
        let mut level_offsets = Vec::with_capacity(count);
        for _ in 0..count {
            level_offsets.push(Offset::from_pointer(reader.read_u32()?));
        }

        Ok(Self {
            tile_gfx_offset,
            tile_collision_offset,
            palette_offset,
            u1_offset,
            u2_offset,
            level_offsets,
        })
    }

    pub fn write(&self, writer: &mut StreamWriter) {
        writer.write_u32(self.tile_gfx_offset.to_pointer());
        writer.write_u32(self.tile_collision_offset.to_pointer());
        writer.write_u32(self.palette_offset.to_pointer());
        writer.write_u32(self.u1_offset.to_pointer());
        writer.write_u32(self.u2_offset.to_pointer());
        writer.write_u16(self.level_offsets.len() as u16);
        for offset in &self.level_offsets {
            writer.write_u32(offset.to_pointer());
        }
    }
}

/// Outcome of [`World::save`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveReport {
    pub saved: usize,
    pub not_saved: usize,
    /// Indices of modified levels left unsaved because their blockmap
    /// did not fit
    pub skipped: Vec<usize>,
}

#[derive(Debug)]
pub struct World {
    path: PathBuf,
    world_index: usize,
    header: WorldHeader,
    palette: Palette,
    tileset: Tileset,
    levels: Vec<Level>,
}

impl World {
    /// Load a world from its config entry, resolved against `game_dir`
    pub fn open(game_dir: &Path, config: &WorldConfig) -> Result<Self> {
        Self::load(&game_dir.join(&config.world_file), &config.levels)
    }

    pub fn load(path: &Path, level_configs: &[LevelConfig]) -> Result<Self> {
        let world_index = world_index_from_path(path)?;
        let invalid = |reason: String| Error::InvalidWorld {
            path: path.to_path_buf(),
            reason,
        };

        let mut reader = StreamReader::from_file(path, Endianness::Big)?;
        let header = WorldHeader::read(&mut reader)?;

        let size = reader.size();
        for (what, offset) in [
            ("tile graphics", header.tile_gfx_offset),
            ("tile collision", header.tile_collision_offset),
            ("palette", header.palette_offset),
        ] {
            if offset.as_usize() > size {
                return Err(invalid(format!("{what} offset {offset} is past the end of the file")));
            }
        }
        if header.level_offsets.is_empty() {
            return Err(invalid("no levels".to_string()));
        }

        let mut levels = Vec::with_capacity(header.level_offsets.len());
        for (level_index, offset) in header.level_offsets.iter().enumerate() {
            let config = level_configs
                .get(level_index)
                .ok_or_else(|| invalid(format!("no level data for level {}", level_index + 1)))?;
            if offset.as_usize() + LEVEL_HEADER_SIZE > size {
                return Err(invalid(format!("level {} header at {offset} is truncated", level_index + 1)));
            }

            let mut level = Level::new(world_index, level_index);
            level.name = format!("{}-{}: {}", world_index + 1, level_index + 1, config.name);
            level.maximum_blockmap_size = config.blockmap_size;
            reader.seek(offset.as_usize())?;
            level.load_header(&mut reader)?;
            levels.push(level);
        }

        reader.seek(header.palette_offset.as_usize())?;
        let palette = Palette::read(&mut reader, Palette::WORLD_COLORS)?;
        let tileset = Tileset::read(&mut reader, header.tile_gfx_offset, header.tile_collision_offset)?;

        let dir = path.parent().unwrap_or_else(|| Path::new(""));
        for level in &mut levels {
            let level_index = level.level_index();
            if level_index > 0 {
                let overlay = dir.join(overlay_file_name(world_index, level_index));
                reader.insert_file(&overlay, level.data_offset().as_usize())?;
            }
            level.load(&mut reader, level_data_adjustment(world_index, level_index))?;
        }

        tracing::info!(
            path = %path.display(),
            world = world_index + 1,
            levels = levels.len(),
            tiles = tileset.len(),
            "loaded world"
        );

        Ok(Self {
            path: path.to_path_buf(),
            world_index,
            header,
            palette,
            tileset,
            levels,
        })
    }

    /// Attach the layered entity template catalogs found in `dir` to every
    /// level
    pub fn load_templates(&mut self, dir: &Path) -> Result<()> {
        for level in &mut self.levels {
            let catalog = TemplateCatalog::load_layers(dir, self.world_index, level.level_index())?;
            level.set_templates(catalog);
        }
        Ok(())
    }

    /// Write every modified level back to disk.
    ///
    /// Blockmaps and headers go to the primary file, tilemaps to the primary
    /// file for the first level and to the overlay files otherwise. Levels
    /// whose blockmap exceeds their budget are skipped and counted. The
    /// primary file is written last.
    pub fn save(&mut self) -> Result<SaveReport> {
        let mut primary = StreamWriter::from_file(&self.path, Endianness::Big)?;
        let dir = self.path.parent().unwrap_or_else(|| Path::new("")).to_path_buf();
        let mut report = SaveReport::default();

        for (level_index, level) in self.levels.iter_mut().enumerate() {
            if !level.modified {
                continue;
            }
            if let Err(e) = level.ensure_can_save() {
                tracing::warn!(level = %level.name, error = %e, "level not saved");
                report.not_saved += 1;
                report.skipped.push(level_index);
                continue;
            }

            level.write_entities(&mut primary)?;

            if level_index == 0 {
                level.save(&mut primary)?;
            } else {
                let overlay = dir.join(overlay_file_name(self.world_index, level_index));
                let mut stream = StreamWriter::from_file(&overlay, Endianness::Big)?;
                level.save_at(&mut stream, level_data_adjustment(self.world_index, level_index))?;
                stream.write_to_file(&overlay)?;
            }

            primary.seek(self.header.level_offsets[level_index].as_usize());
            level.save_header(&mut primary);
            level.modified = false;
            report.saved += 1;
        }

        primary.write_to_file(&self.path)?;

        tracing::info!(
            path = %self.path.display(),
            saved = report.saved,
            not_saved = report.not_saved,
            "saved world"
        );
        Ok(report)
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn levels_mut(&mut self) -> &mut [Level] {
        &mut self.levels
    }

    pub fn level(&self, index: usize) -> Option<&Level> {
        self.levels.get(index)
    }

    pub fn level_mut(&mut self, index: usize) -> Option<&mut Level> {
        self.levels.get_mut(index)
    }

    pub fn tileset(&self) -> &Tileset {
        &self.tileset
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn header(&self) -> &WorldHeader {
        &self.header
    }

    pub fn world_index(&self) -> usize {
        self.world_index
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_modified(&self) -> bool {
        self.levels.iter().any(|l| l.modified)
    }
}
