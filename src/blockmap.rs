//! Entity blockmap codec.
//!
//! The game finds entities near the camera through a grid of blocks. On
//! disk the grid is three regions laid out back to back:
//!
//! ```text
//! row pointers    u16[height]          byte offset of each row in the pointer table
//! block pointers  u32[width * height]  BASE_OFFSET + offset of each block record
//! block records   (u8 packed, u8 x, u8 y)* 0xFF
//! ```
//!
//! Every empty block points at one shared `0xFF` record. Blockmap
//! dimensions come from the level header and are only ever shrunk by
//! pruning a trailing empty row and column, once each per encode.

use crate::codec::{Offset, StreamReader, StreamWriter};
use crate::entity::Entity;
use crate::error::{Error, Result};

/// Block-local coordinate span. Independent of the block's world size.
pub const BLOCK_SPAN: i32 = 32;

/// Terminates a block record
pub const BLOCK_TERMINATOR: u8 = 0xFF;

const ENTITY_X_BIAS: i64 = 3;
const COORD_SCALE: f64 = 8.0;

const ENTITY_RECORD_SIZE: usize = 3;
const BLOCK_POINTER_SIZE: usize = 4;
const ROW_POINTER_SIZE: usize = 2;

/// Grid dimensions plus the world size of one block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockmapGeometry {
    pub width: usize,
    pub height: usize,
    pub block_width: f64,
    pub block_height: f64,
}

impl BlockmapGeometry {
    /// Levels at most 16 tiles along an axis use double-size blocks on it
    pub fn block_extent(tiles: usize) -> f64 {
        if tiles <= 16 {
            512.0
        } else {
            256.0
        }
    }

    pub fn for_tilemap(tiles_wide: usize, tiles_high: usize, width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            block_width: Self::block_extent(tiles_wide),
            block_height: Self::block_extent(tiles_high),
        }
    }

    pub fn block_count(&self) -> usize {
        self.width * self.height
    }

    /// Block coordinates an entity belongs to, clamped into the grid.
    /// `None` only when the grid has no blocks.
    pub fn assign(&self, entity: &Entity) -> Option<(usize, usize)> {
        if self.width == 0 || self.height == 0 {
            return None;
        }
        let bx = (((entity.x as i64 + ENTITY_X_BIAS) as f64 * COORD_SCALE) / self.block_width).floor() as i64;
        let by = ((entity.y as f64 * COORD_SCALE) / self.block_height).floor() as i64;
        Some((
            bx.clamp(0, self.width as i64 - 1) as usize,
            by.clamp(0, self.height as i64 - 1) as usize,
        ))
    }

    /// Row-major index of the block an entity belongs to
    pub fn block_index(&self, entity: &Entity) -> Option<usize> {
        self.assign(entity).map(|(bx, by)| bx + by * self.width)
    }
}

/// Type 15 subtype 15 packs to the record terminator and cannot be stored
pub fn is_storable(entity: &Entity) -> bool {
    entity.packed() != BLOCK_TERMINATOR
}

/// One entity as stored inside a block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockEntry {
    pub packed: u8,
    pub x: u8,
    pub y: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block {
    pub entries: Vec<BlockEntry>,
    /// Position of this block's record once written
    pub offset: Option<Offset>,
}

impl Block {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialized length of this block's own record
    pub fn record_size(&self) -> usize {
        self.entries.len() * ENTITY_RECORD_SIZE + 1
    }

    fn write(&self, writer: &mut StreamWriter) {
        for entry in &self.entries {
            writer.write_u8(entry.packed);
            writer.write_u8(entry.x);
            writer.write_u8(entry.y);
        }
        writer.write_u8(BLOCK_TERMINATOR);
    }
}

/// Blocks in row-major order with the grid size they were built for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockLayout {
    pub width: usize,
    pub height: usize,
    pub blocks: Vec<Block>,
    /// Entities left out: no block to go to, or not storable
    pub dropped: usize,
}

impl BlockLayout {
    /// Bytes `write` produces for this layout
    pub fn encoded_size(&self) -> usize {
        let mut size = 0;
        let mut had_empty = false;
        for block in &self.blocks {
            if !block.is_empty() {
                size += block.record_size();
            } else if !had_empty {
                size += 1;
                had_empty = true;
            }
        }
        size + self.blocks.len() * BLOCK_POINTER_SIZE + self.height * ROW_POINTER_SIZE
    }

    pub fn entity_count(&self) -> usize {
        self.blocks.iter().map(|b| b.entries.len()).sum()
    }
}

/// Offsets produced by writing a blockmap, to be stored in the level header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockmapWriteResult {
    pub width: usize,
    pub height: usize,
    pub row_pointer_offset: Offset,
    pub pointer_table_offset: Offset,
    /// First byte after the last block record
    pub end_offset: Offset,
    pub block_offsets: Vec<Offset>,
}

impl BlockmapWriteResult {
    pub fn byte_len(&self) -> usize {
        (self.end_offset.raw() - self.row_pointer_offset.raw()) as usize
    }
}

/// Sort entities into blocks without pruning
pub fn partition(geometry: &BlockmapGeometry, entities: &[Entity]) -> BlockLayout {
    let mut blocks = vec![Block::default(); geometry.block_count()];
    let mut dropped = 0;

    for entity in entities {
        if !is_storable(entity) {
            tracing::warn!(x = entity.x, y = entity.y, "entity packs to the block terminator, dropped");
            dropped += 1;
            continue;
        }
        let Some((bx, by)) = geometry.assign(entity) else {
            dropped += 1;
            continue;
        };

        let local_x = entity.x as i64 + ENTITY_X_BIAS - bx as i64 * BLOCK_SPAN as i64;
        let local_y = entity.y as i64 - by as i64 * BLOCK_SPAN as i64;
        if !(0..=255).contains(&local_x) || !(0..=255).contains(&local_y) {
            tracing::warn!(
                x = entity.x, y = entity.y, local_x, local_y,
                "entity lies outside its block's coordinate range and will move"
            );
        }

        blocks[bx + by * geometry.width].entries.push(BlockEntry {
            packed: entity.packed(),
            x: local_x as u8,
            y: local_y as u8,
        });
    }

    if dropped > 0 {
        tracing::warn!(dropped, "entities dropped from blockmap");
    }

    BlockLayout {
        width: geometry.width,
        height: geometry.height,
        blocks,
        dropped,
    }
}

/// Drop the last row if it is empty, then the last column if it is empty.
///
/// Each check runs once. A dimension is never pruned below 1 because the
/// header stores `size - 1`.
pub fn prune<T>(
    mut cells: Vec<T>,
    mut width: usize,
    mut height: usize,
    is_empty: impl Fn(&T) -> bool,
) -> (Vec<T>, usize, usize) {
    if height > 1 {
        let last_row = (height - 1) * width;
        if cells[last_row..last_row + width].iter().all(&is_empty) {
            cells.truncate(last_row);
            height -= 1;
        }
    }

    if width > 1 {
        let last_column_empty = (0..height).all(|y| is_empty(&cells[(width - 1) + y * width]));
        if last_column_empty {
            let old_width = width;
            width -= 1;
            let mut index = 0;
            cells.retain(|_| {
                let keep = index % old_width != old_width - 1;
                index += 1;
                keep
            });
        }
    }

    (cells, width, height)
}

/// Partition and prune, producing the layout that will be written
pub fn build_blocks(geometry: &BlockmapGeometry, entities: &[Entity]) -> BlockLayout {
    let layout = partition(geometry, entities);
    let (blocks, width, height) = prune(layout.blocks, layout.width, layout.height, Block::is_empty);
    if (width, height) != (layout.width, layout.height) {
        tracing::debug!(
            from_width = layout.width, from_height = layout.height, width, height,
            "pruned blockmap"
        );
    }
    BlockLayout { width, height, blocks, dropped: layout.dropped }
}

/// Serialize `layout` starting at `row_pointer_offset`
pub fn write(layout: &mut BlockLayout, writer: &mut StreamWriter, row_pointer_offset: Offset) -> BlockmapWriteResult {
    let pointer_table_offset = row_pointer_offset.advance(layout.height * ROW_POINTER_SIZE);

    writer.seek(row_pointer_offset.as_usize());
    for row in 0..layout.height {
        writer.write_u16((row * layout.width * BLOCK_POINTER_SIZE) as u16);
    }

    writer.seek(pointer_table_offset.as_usize() + layout.blocks.len() * BLOCK_POINTER_SIZE);
    let mut shared_empty: Option<Offset> = None;
    for block in &mut layout.blocks {
        if block.is_empty() {
            if let Some(offset) = shared_empty {
                block.offset = Some(offset);
                continue;
            }
            shared_empty = Some(Offset::from(writer.index()));
        }
        block.offset = Some(Offset::from(writer.index()));
        block.write(writer);
    }
    let end_offset = Offset::from(writer.index());

    writer.seek(pointer_table_offset.as_usize());
    let block_offsets: Vec<Offset> = layout
        .blocks
        .iter()
        .map(|b| b.offset.unwrap_or(Offset::ZERO))
        .collect();
    for offset in &block_offsets {
        writer.write_u32(offset.to_pointer());
    }

    BlockmapWriteResult {
        width: layout.width,
        height: layout.height,
        row_pointer_offset,
        pointer_table_offset,
        end_offset,
        block_offsets,
    }
}

/// Decode every entity from a blockmap
pub fn read_entities(
    reader: &mut StreamReader,
    width: usize,
    height: usize,
    row_pointer_offset: Offset,
    pointer_table_offset: Offset,
) -> Result<Vec<Entity>> {
    reader.seek(row_pointer_offset.as_usize())?;
    let mut row_offsets = Vec::with_capacity(height);
    for _ in 0..height {
        row_offsets.push(reader.read_u16()? as usize);
    }

    let mut entities = Vec::new();
    for (by, row_offset) in row_offsets.into_iter().enumerate() {
        reader.seek(pointer_table_offset.as_usize() + row_offset)?;
        let mut block_offsets = Vec::with_capacity(width);
        for _ in 0..width {
            block_offsets.push(Offset::from_pointer(reader.read_u32()?));
        }

        for (bx, offset) in block_offsets.into_iter().enumerate() {
            reader.seek(offset.as_usize())?;
            read_block(reader, bx, by, &mut entities).map_err(|e| match e {
                Error::UnexpectedEof { .. } => {
                    Error::InvalidFormat(format!("block record at {offset} has no terminator"))
                }
                other => other,
            })?;
        }
    }

    Ok(entities)
}

fn read_block(reader: &mut StreamReader, bx: usize, by: usize, out: &mut Vec<Entity>) -> Result<()> {
    loop {
        let value = reader.read_u8()?;
        if value == BLOCK_TERMINATOR {
            return Ok(());
        }
        let local_x = reader.read_u8()? as i32;
        let local_y = reader.read_u8()? as i32;
        out.push(Entity::from_packed(
            value,
            local_x + bx as i32 * BLOCK_SPAN - ENTITY_X_BIAS as i32,
            local_y + by as i32 * BLOCK_SPAN,
        ));
    }
}

/// Bytes `build_blocks` + `write` would produce, computed from block sizes
/// only
pub fn calculate_size(geometry: &BlockmapGeometry, entities: &[Entity]) -> usize {
    let mut sizes = vec![0usize; geometry.block_count()];
    for entity in entities.iter().filter(|e| is_storable(e)) {
        if let Some(index) = geometry.block_index(entity) {
            sizes[index] += ENTITY_RECORD_SIZE;
        }
    }

    let (sizes, _, height) = prune(sizes, geometry.width, geometry.height, |s| *s == 0);

    let mut size = 0;
    let mut had_empty = false;
    for block_size in &sizes {
        if *block_size > 0 {
            size += block_size + 1;
        } else if !had_empty {
            size += 1;
            had_empty = true;
        }
    }

    size + sizes.len() * BLOCK_POINTER_SIZE + height * ROW_POINTER_SIZE
}
