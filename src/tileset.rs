use crate::codec::{Offset, StreamReader};
use crate::error::{Error, Result};

/// World palette, one `0x0RGB` word per color
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Palette {
    colors: Vec<u16>,
}

impl Palette {
    pub const WORLD_COLORS: usize = 16;

    pub fn read(reader: &mut StreamReader, count: usize) -> Result<Self> {
        let colors = (0..count).map(|_| reader.read_u16()).collect::<Result<Vec<_>>>()?;
        Ok(Self { colors })
    }

    pub fn raw(&self, index: usize) -> Option<u16> {
        self.colors.get(index).copied()
    }

    /// 8 bit channels, each 4 bit channel scaled by 17
    pub fn rgb(&self, index: usize) -> Option<(u8, u8, u8)> {
        let value = self.raw(index)?;
        let channel = |shift: u16| (((value >> shift) & 0xF) as u8) * 17;
        Some((channel(8), channel(4), channel(0)))
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionType {
    None,
    Solid,
    Destructable,
    Secret,
    Hurt,
    Other(u8),
}

impl CollisionType {
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::None,
            1 => Self::Solid,
            127 => Self::Destructable,
            128 => Self::Secret,
            211 => Self::Hurt,
            other => Self::Other(other),
        }
    }
}

/// One 32x32 tile as stored in the world file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    /// Four interleaved bitplanes
    pub graphics: Vec<u8>,
    /// 4x4 grid of 8 pixel collision cells, row-major
    pub collision: [u8; 16],
}

impl Tile {
    pub const GRAPHICS_SIZE: usize = 32 * 32 * 4 / 8;

    pub fn collision_at(&self, cell_x: usize, cell_y: usize) -> Option<CollisionType> {
        if cell_x >= 4 || cell_y >= 4 {
            return None;
        }
        Some(CollisionType::from_u8(self.collision[cell_x + cell_y * 4]))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tileset {
    tiles: Vec<Tile>,
}

impl Tileset {
    /// The graphics block starts with a table of `u32` offsets relative to
    /// itself; the first offset also gives the table length. Collision
    /// data is 16 bytes per tile in tile order.
    pub fn read(reader: &mut StreamReader, gfx_offset: Offset, collision_offset: Offset) -> Result<Self> {
        reader.seek(gfx_offset.as_usize())?;
        let table_size = reader.read_u32()? as usize;
        let count = table_size / 4;
        if table_size > reader.size() {
            return Err(Error::InvalidFormat(format!(
                "tile offset table of {table_size} bytes at {gfx_offset}"
            )));
        }

        reader.seek(gfx_offset.as_usize())?;
        let mut offsets = Vec::with_capacity(count);
        for _ in 0..count {
            offsets.push(gfx_offset.as_usize() + reader.read_u32()? as usize);
        }

        let mut tiles = Vec::with_capacity(count);
        for offset in offsets {
            reader.seek(offset)?;
            tiles.push(Tile {
                graphics: reader.read_bytes(Tile::GRAPHICS_SIZE)?,
                collision: [0; 16],
            });
        }

        reader.seek(collision_offset.as_usize())?;
        for tile in &mut tiles {
            let bytes = reader.read_bytes(16)?;
            tile.collision.copy_from_slice(&bytes);
        }

        tracing::debug!(tiles = tiles.len(), "read tileset");
        Ok(Self { tiles })
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn get(&self, index: u8) -> Option<&Tile> {
        self.tiles.get(index as usize)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Endianness, StreamWriter};

    #[test]
    fn test_palette_rgb() {
        let mut writer = StreamWriter::new(Endianness::Big);
        writer.write_u16(0x0F80);
        writer.write_u16(0x0001);
        let mut reader = StreamReader::new(writer.into_vec(), Endianness::Big);

        let palette = Palette::read(&mut reader, 2).unwrap();
        assert_eq!(palette.len(), 2);
        assert_eq!(palette.rgb(0), Some((255, 136, 0)));
        assert_eq!(palette.rgb(1), Some((0, 0, 17)));
        assert_eq!(palette.rgb(2), None);
    }

    #[test]
    fn test_read_tileset() {
        let mut writer = StreamWriter::new(Endianness::Big);
        // Two tiles; the table is 8 bytes and tile data follows it.
        writer.write_u32(8);
        writer.write_u32(8 + Tile::GRAPHICS_SIZE as u32);
        writer.write_bytes(&[0x11; Tile::GRAPHICS_SIZE]);
        writer.write_bytes(&[0x22; Tile::GRAPHICS_SIZE]);
        let collision_at = writer.index();
        let mut collision = [0u8; 32];
        collision[0] = 1;
        collision[16 + 5] = 211;
        writer.write_bytes(&collision);

        let mut reader = StreamReader::new(writer.into_vec(), Endianness::Big);
        let tileset = Tileset::read(&mut reader, Offset(0), Offset::from(collision_at)).unwrap();

        assert_eq!(tileset.len(), 2);
        assert_eq!(tileset.get(0).unwrap().graphics[0], 0x11);
        assert_eq!(tileset.get(1).unwrap().graphics[0], 0x22);
        assert_eq!(tileset.get(0).unwrap().collision_at(0, 0), Some(CollisionType::Solid));
        assert_eq!(tileset.get(1).unwrap().collision_at(1, 1), Some(CollisionType::Hurt));
        assert_eq!(tileset.get(1).unwrap().collision_at(4, 0), None);
    }

    #[test]
    fn test_collision_types() {
        assert_eq!(CollisionType::from_u8(127), CollisionType::Destructable);
        assert_eq!(CollisionType::from_u8(128), CollisionType::Secret);
        assert_eq!(CollisionType::from_u8(9), CollisionType::Other(9));
    }
}
