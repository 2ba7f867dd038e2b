use crate::blockmap::{self, BlockmapGeometry, BlockmapWriteResult};
use crate::codec::{Offset, StreamReader, StreamWriter};
use crate::entity::{Entity, EntityTemplate, TemplateCatalog};
use crate::error::{Error, Result};
use crate::tilemap::Tilemap;

/// Serialized size of a level header
pub const LEVEL_HEADER_SIZE: usize = 50;

const CAMERA_BIAS: i32 = 1;
const PLAYER_BIAS: i32 = 32;

/// Fixed-layout level header, with on-disk biases removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LevelHeader {
    pub data_offset: Offset,
    pub tilemap_width: u16,
    pub tilemap_height: u16,
    pub camera_tile_x: i32,
    pub camera_tile_y: i32,
    pub player_x: i32,
    pub player_y: i32,
    pub blockmap_width: u32,
    pub blockmap_height: u32,
    pub code_offset_1: Offset,
    pub code_offset_2: Offset,
    /// Unknown, kept as read
    pub u1: u8,
    pub pointers_behaviour_offset: Offset,
    pub blockmap_row_pointers_offset: Offset,
    pub blockmap_pointers_offset: Offset,
    /// Unknown, kept as read. Possibly the music track.
    pub u2: u16,
    pub code_offset_3: Offset,
}

impl LevelHeader {
    pub fn read(reader: &mut StreamReader) -> Result<Self> {
        let data_offset = Offset::from_pointer(reader.read_u32()?);
        let tilemap_width = reader.read_u16()?;
        let tilemap_height = reader.read_u16()?;
        let camera_tile_x = reader.read_i16()? as i32 + CAMERA_BIAS;
        let camera_tile_y = reader.read_i16()? as i32 + CAMERA_BIAS;
        let player_x = reader.read_i16()? as i32 - PLAYER_BIAS;
        let player_y = reader.read_i16()? as i32 - PLAYER_BIAS;
        let blockmap_width = reader.read_u16()? as u32 + 1;
        let blockmap_height = reader.read_u16()? as u32 + 1;
        let code_offset_1 = Offset::from_pointer(reader.read_u32()?);
        let code_offset_2 = Offset::from_pointer(reader.read_u32()?);
        let u1 = reader.read_u8()?;
        reader.skip(3)?;
        let pointers_behaviour_offset = Offset::from_pointer(reader.read_u32()?);
        let blockmap_row_pointers_offset = Offset::from_pointer(reader.read_u32()?);
        let blockmap_pointers_offset = Offset::from_pointer(reader.read_u32()?);
        let u2 = reader.read_u16()?;
        let code_offset_3 = Offset::from_pointer(reader.read_u32()?);

        Ok(Self {
            data_offset,
            tilemap_width,
            tilemap_height,
            camera_tile_x,
            camera_tile_y,
            player_x,
            player_y,
            blockmap_width,
            blockmap_height,
            code_offset_1,
            code_offset_2,
            u1,
            pointers_behaviour_offset,
            blockmap_row_pointers_offset,
            blockmap_pointers_offset,
            u2,
            code_offset_3,
        })
    }

    pub fn write(&self, writer: &mut StreamWriter) {
        writer.write_u32(self.data_offset.to_pointer());
        writer.write_u16(self.tilemap_width);
        writer.write_u16(self.tilemap_height);
        writer.write_i16((self.camera_tile_x - CAMERA_BIAS) as i16);
        writer.write_i16((self.camera_tile_y - CAMERA_BIAS) as i16);
        writer.write_i16((self.player_x + PLAYER_BIAS) as i16);
        writer.write_i16((self.player_y + PLAYER_BIAS) as i16);
        writer.write_u16(self.blockmap_width.wrapping_sub(1) as u16);
        writer.write_u16(self.blockmap_height.wrapping_sub(1) as u16);
        writer.write_u32(self.code_offset_1.to_pointer());
        writer.write_u32(self.code_offset_2.to_pointer());
        writer.write_u8(self.u1);
        writer.write_bytes(&[0, 0, 0]);
        writer.write_u32(self.pointers_behaviour_offset.to_pointer());
        writer.write_u32(self.blockmap_row_pointers_offset.to_pointer());
        writer.write_u32(self.blockmap_pointers_offset.to_pointer());
        writer.write_u16(self.u2);
        writer.write_u32(self.code_offset_3.to_pointer());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelState {
    Unloaded,
    HeaderLoaded,
    Loaded,
}

/// One level of a world: header, tile grid and entities
#[derive(Debug, Clone)]
pub struct Level {
    world_index: usize,
    level_index: usize,
    pub name: String,
    /// Bytes reserved for this level's blockmap in the world file
    pub maximum_blockmap_size: usize,
    pub modified: bool,
    state: LevelState,
    header: LevelHeader,
    tilemap: Tilemap,
    entities: Vec<Entity>,
    templates: TemplateCatalog,
}

impl Level {
    pub fn new(world_index: usize, level_index: usize) -> Self {
        Self {
            world_index,
            level_index,
            name: "Unnamed".to_string(),
            maximum_blockmap_size: 0,
            modified: false,
            state: LevelState::Unloaded,
            header: LevelHeader::default(),
            tilemap: Tilemap::default(),
            entities: Vec::new(),
            templates: TemplateCatalog::new(),
        }
    }

    pub fn load_header(&mut self, reader: &mut StreamReader) -> Result<()> {
        self.header = LevelHeader::read(reader)?;
        self.state = LevelState::HeaderLoaded;
        tracing::debug!(
            level = %self.name,
            data = %self.header.data_offset,
            tiles = ?(self.header.tilemap_width, self.header.tilemap_height),
            blockmap = ?(self.header.blockmap_width, self.header.blockmap_height),
            "read level header"
        );
        Ok(())
    }

    /// Read the tilemap at the data offset plus `extra_offset`, then the
    /// blockmap entities
    pub fn load(&mut self, reader: &mut StreamReader, extra_offset: usize) -> Result<()> {
        if self.state == LevelState::Unloaded {
            return Err(self.not_loaded());
        }

        reader.seek(self.header.data_offset.as_usize() + extra_offset)?;
        self.tilemap = Tilemap::decode(
            reader,
            self.header.tilemap_width as usize,
            self.header.tilemap_height as usize,
        )?;
        self.entities = blockmap::read_entities(
            reader,
            self.header.blockmap_width as usize,
            self.header.blockmap_height as usize,
            self.header.blockmap_row_pointers_offset,
            self.header.blockmap_pointers_offset,
        )?;

        self.state = LevelState::Loaded;
        self.modified = false;
        tracing::debug!(level = %self.name, entities = self.entities.len(), "loaded level");
        Ok(())
    }

    /// Write the tilemap at the level's data offset
    pub fn save(&self, writer: &mut StreamWriter) -> Result<()> {
        self.save_at(writer, self.header.data_offset.as_usize())
    }

    /// Write the tilemap at an explicit offset of `writer`
    pub fn save_at(&self, writer: &mut StreamWriter, offset: usize) -> Result<()> {
        self.require_loaded()?;
        writer.seek(offset);
        self.tilemap.encode(writer);
        Ok(())
    }

    /// Rebuild and write the blockmap, then record its new shape in the
    /// header
    pub fn write_entities(&mut self, writer: &mut StreamWriter) -> Result<BlockmapWriteResult> {
        self.require_loaded()?;

        let geometry = self.blockmap_geometry();
        let mut layout = blockmap::build_blocks(&geometry, &self.entities);
        let result = blockmap::write(&mut layout, writer, self.header.blockmap_row_pointers_offset);

        self.header.blockmap_width = result.width as u32;
        self.header.blockmap_height = result.height as u32;
        self.header.blockmap_pointers_offset = result.pointer_table_offset;

        tracing::debug!(
            level = %self.name,
            width = result.width,
            height = result.height,
            bytes = result.byte_len(),
            "wrote blockmap"
        );
        Ok(result)
    }

    /// Write the header at the writer's current position
    pub fn save_header(&self, writer: &mut StreamWriter) {
        self.header.write(writer);
    }

    pub fn blockmap_geometry(&self) -> BlockmapGeometry {
        BlockmapGeometry::for_tilemap(
            self.header.tilemap_width as usize,
            self.header.tilemap_height as usize,
            self.header.blockmap_width as usize,
            self.header.blockmap_height as usize,
        )
    }

    pub fn calculate_blockmap_size(&self) -> usize {
        blockmap::calculate_size(&self.blockmap_geometry(), &self.entities)
    }

    /// Blockmap budget left; negative when over
    pub fn bytes_left(&self) -> i64 {
        self.maximum_blockmap_size as i64 - self.calculate_blockmap_size() as i64
    }

    pub fn can_save(&self) -> bool {
        self.bytes_left() >= 0
    }

    pub fn ensure_can_save(&self) -> Result<()> {
        let size = self.calculate_blockmap_size();
        if size > self.maximum_blockmap_size {
            return Err(Error::CapacityExceeded {
                level: self.name.clone(),
                size,
                maximum: self.maximum_blockmap_size,
            });
        }
        Ok(())
    }

    pub fn add_entity(&mut self, template: &EntityTemplate, x: i32, y: i32) {
        self.entities.push(Entity::new(template.entity_type, template.subtype, x, y));
        self.modified = true;
    }

    pub fn remove_entity(&mut self, index: usize) -> Option<Entity> {
        if index >= self.entities.len() {
            return None;
        }
        self.modified = true;
        Some(self.entities.remove(index))
    }

    /// Indices of entities inside `[x1, x2) x [y1, y2)`
    pub fn entities_inside(&self, x1: i32, y1: i32, x2: i32, y2: i32) -> Vec<usize> {
        self.entities
            .iter()
            .enumerate()
            .filter(|(_, e)| e.x >= x1 && e.x < x2 && e.y >= y1 && e.y < y2)
            .map(|(i, _)| i)
            .collect()
    }

    /// Index of the first entity exactly at `(x, y)`
    pub fn entity_at(&self, x: i32, y: i32) -> Option<usize> {
        self.entities.iter().position(|e| e.x == x && e.y == y)
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Marks the level modified
    pub fn entities_mut(&mut self) -> &mut Vec<Entity> {
        self.modified = true;
        &mut self.entities
    }

    pub fn set_entities(&mut self, entities: Vec<Entity>) {
        self.entities = entities;
        self.modified = true;
    }

    pub fn tilemap(&self) -> &Tilemap {
        &self.tilemap
    }

    /// Marks the level modified
    pub fn tilemap_mut(&mut self) -> &mut Tilemap {
        self.modified = true;
        &mut self.tilemap
    }

    pub fn header(&self) -> &LevelHeader {
        &self.header
    }

    /// Marks the level modified
    pub fn header_mut(&mut self) -> &mut LevelHeader {
        self.modified = true;
        &mut self.header
    }

    pub fn templates(&self) -> &TemplateCatalog {
        &self.templates
    }

    pub fn set_templates(&mut self, templates: TemplateCatalog) {
        self.templates = templates;
    }

    pub fn template(&self, entity_type: u8, subtype: u8) -> Result<&EntityTemplate> {
        self.templates.require(entity_type, subtype)
    }

    pub fn data_offset(&self) -> Offset {
        self.header.data_offset
    }

    pub fn state(&self) -> LevelState {
        self.state
    }

    pub fn world_index(&self) -> usize {
        self.world_index
    }

    pub fn level_index(&self) -> usize {
        self.level_index
    }

    fn require_loaded(&self) -> Result<()> {
        if self.state != LevelState::Loaded {
            return Err(self.not_loaded());
        }
        Ok(())
    }

    fn not_loaded(&self) -> Error {
        Error::LevelNotLoaded { level: self.name.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Endianness, BASE_OFFSET};

    fn sample_header() -> LevelHeader {
        LevelHeader {
            data_offset: Offset(0x100),
            tilemap_width: 20,
            tilemap_height: 4,
            camera_tile_x: 3,
            camera_tile_y: 0,
            player_x: -12,
            player_y: 96,
            blockmap_width: 2,
            blockmap_height: 1,
            code_offset_1: Offset(0x1234),
            code_offset_2: Offset::from_pointer(0),
            u1: 0x7F,
            pointers_behaviour_offset: Offset(0x2000),
            blockmap_row_pointers_offset: Offset(0x200),
            blockmap_pointers_offset: Offset(0x202),
            u2: 5,
            code_offset_3: Offset(0x3000),
        }
    }

    /// Buffer holding `header` at 0, its tilemap and a blockmap of `entities`
    fn level_bytes(header: &mut LevelHeader, entities: &[Entity]) -> Vec<u8> {
        let mut writer = StreamWriter::new(Endianness::Big);

        let tiles = (0..header.tilemap_width as usize * header.tilemap_height as usize)
            .map(|i| (i % 251) as u8)
            .collect();
        let tilemap = Tilemap::from_tiles(header.tilemap_width as usize, header.tilemap_height as usize, tiles).unwrap();
        writer.seek(header.data_offset.as_usize());
        tilemap.encode(&mut writer);

        let geometry = BlockmapGeometry::for_tilemap(
            header.tilemap_width as usize,
            header.tilemap_height as usize,
            header.blockmap_width as usize,
            header.blockmap_height as usize,
        );
        let mut layout = blockmap::build_blocks(&geometry, entities);
        let result = blockmap::write(&mut layout, &mut writer, header.blockmap_row_pointers_offset);
        header.blockmap_width = result.width as u32;
        header.blockmap_height = result.height as u32;
        header.blockmap_pointers_offset = result.pointer_table_offset;

        writer.seek(0);
        header.write(&mut writer);
        writer.into_vec()
    }

    #[test]
    fn test_header_size_and_biases() {
        let header = sample_header();
        let mut writer = StreamWriter::new(Endianness::Big);
        header.write(&mut writer);
        let bytes = writer.into_vec();

        assert_eq!(bytes.len(), LEVEL_HEADER_SIZE);
        assert_eq!(&bytes[0..4], &(0x100 + BASE_OFFSET).to_be_bytes());
        // Camera x is stored minus one, player x plus 32, blockmap width minus one.
        assert_eq!(&bytes[8..10], &2i16.to_be_bytes());
        assert_eq!(&bytes[12..14], &20i16.to_be_bytes());
        assert_eq!(&bytes[16..18], &1u16.to_be_bytes());
        assert_eq!(&bytes[28..32], &[0x7F, 0, 0, 0]);
    }

    #[test]
    fn test_header_roundtrip() {
        let header = sample_header();
        let mut writer = StreamWriter::new(Endianness::Big);
        header.write(&mut writer);

        let mut reader = StreamReader::new(writer.into_vec(), Endianness::Big);
        assert_eq!(LevelHeader::read(&mut reader).unwrap(), header);
    }

    #[test]
    fn test_header_truncated() {
        let mut reader = StreamReader::new(vec![0u8; LEVEL_HEADER_SIZE - 1], Endianness::Big);
        assert!(LevelHeader::read(&mut reader).is_err());
    }

    #[test]
    fn test_load_requires_header() {
        let mut level = Level::new(0, 0);
        let mut reader = StreamReader::new(vec![0u8; 8], Endianness::Big);
        assert!(matches!(level.load(&mut reader, 0), Err(Error::LevelNotLoaded { .. })));

        let mut writer = StreamWriter::new(Endianness::Big);
        assert!(level.save(&mut writer).is_err());
        assert!(level.write_entities(&mut writer).is_err());
    }

    #[test]
    fn test_load_and_resave_is_byte_identical() {
        let mut header = sample_header();
        let entities = vec![Entity::new(1, 2, 0, 0), Entity::new(3, 0, 40, 10)];
        let bytes = level_bytes(&mut header, &entities);

        let mut reader = StreamReader::new(bytes.clone(), Endianness::Big);
        let mut level = Level::new(0, 0);
        level.load_header(&mut reader).unwrap();
        level.load(&mut reader, 0).unwrap();

        assert_eq!(level.state(), LevelState::Loaded);
        assert_eq!(level.tilemap().width(), 20);
        assert_eq!(level.entities().len(), 2);
        assert!(!level.modified);

        let mut writer = StreamWriter::from_bytes(bytes.clone(), Endianness::Big);
        level.write_entities(&mut writer).unwrap();
        level.save(&mut writer).unwrap();
        writer.seek(0);
        level.save_header(&mut writer);
        assert_eq!(writer.into_vec(), bytes);
    }

    #[test]
    fn test_write_entities_updates_header() {
        let mut header = sample_header();
        header.blockmap_width = 3;
        header.blockmap_height = 2;
        let bytes = level_bytes(&mut header, &[Entity::new(1, 0, 0, 0), Entity::new(1, 0, 70, 0)]);

        let mut reader = StreamReader::new(bytes.clone(), Endianness::Big);
        let mut level = Level::new(0, 0);
        level.load_header(&mut reader).unwrap();
        level.load(&mut reader, 0).unwrap();
        // 20x4 tiles: 256 wide blocks, 512 high blocks. The empty second row was pruned.
        assert_eq!((level.header().blockmap_width, level.header().blockmap_height), (3, 1));

        level.entities_mut().retain(|e| e.x == 0);
        let expected_size = level.calculate_blockmap_size();
        let mut writer = StreamWriter::from_bytes(bytes, Endianness::Big);
        let result = level.write_entities(&mut writer).unwrap();

        assert_eq!((result.width, result.height), (2, 1));
        assert_eq!(level.header().blockmap_width, 2);
        assert_eq!(level.header().blockmap_pointers_offset, Offset(0x202));
        assert_eq!(result.byte_len(), expected_size);
    }

    #[test]
    fn test_capacity() {
        let mut header = sample_header();
        let bytes = level_bytes(&mut header, &[Entity::new(1, 0, 0, 0)]);
        let mut reader = StreamReader::new(bytes, Endianness::Big);
        let mut level = Level::new(0, 0);
        level.load_header(&mut reader).unwrap();
        level.load(&mut reader, 0).unwrap();

        // The empty second column was pruned when the level was built, so one
        // record of 4 bytes, one pointer and one row pointer remain.
        assert_eq!(level.header().blockmap_width, 1);
        assert_eq!(level.calculate_blockmap_size(), 4 + 4 + 2);

        level.maximum_blockmap_size = 10;
        assert!(level.can_save());
        assert_eq!(level.bytes_left(), 0);

        level.maximum_blockmap_size = 9;
        assert!(!level.can_save());
        assert!(matches!(
            level.ensure_can_save(),
            Err(Error::CapacityExceeded { size: 10, maximum: 9, .. })
        ));
    }

    #[test]
    fn test_entity_editing() {
        let mut level = Level::new(0, 0);
        let template = EntityTemplate {
            name: "Walker".into(),
            entity_type: 4,
            subtype: 1,
            gfx: "enemies".into(),
            gfx_index: 0,
            offset_x: 0,
            offset_y: 0,
        };

        level.add_entity(&template, 10, 10);
        level.add_entity(&template, 20, 10);
        level.add_entity(&template, 10, 10);
        assert!(level.modified);

        assert_eq!(level.entity_at(10, 10), Some(0));
        assert_eq!(level.entity_at(11, 10), None);
        assert_eq!(level.entities_inside(0, 0, 20, 20), vec![0, 2]);

        let removed = level.remove_entity(1).unwrap();
        assert_eq!((removed.x, removed.entity_type, removed.subtype), (20, 4, 1));
        assert!(level.remove_entity(5).is_none());
        assert_eq!(level.entities().len(), 2);
    }
}
