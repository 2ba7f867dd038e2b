//! Level tile grid.
//!
//! Tiles are kept row-major in memory (`tiles[x + y * width]`) but the game
//! stores them column by column, so the codec walks x in the outer loop.

use crate::codec::{StreamReader, StreamWriter};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tilemap {
    width: usize,
    height: usize,
    tiles: Vec<u8>,
}

impl Tilemap {
    /// Edge length of one tile in pixels
    pub const TILE_SIZE: u32 = 32;

    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, tiles: vec![0; width * height] }
    }

    /// Returns `None` when `tiles` does not hold exactly `width * height` cells.
    pub fn from_tiles(width: usize, height: usize, tiles: Vec<u8>) -> Option<Self> {
        (tiles.len() == width * height).then_some(Self { width, height, tiles })
    }

    pub fn decode(reader: &mut StreamReader, width: usize, height: usize) -> Result<Self> {
        let mut tiles = vec![0u8; width * height];
        for x in 0..width {
            for y in 0..height {
                tiles[x + y * width] = reader.read_u8()?;
            }
        }
        Ok(Self { width, height, tiles })
    }

    pub fn encode(&self, writer: &mut StreamWriter) {
        for x in 0..self.width {
            for y in 0..self.height {
                writer.write_u8(self.tiles[x + y * self.width]);
            }
        }
    }

    /// Copy the rectangle `[x1, x2) x [y1, y2)` out of `src`. Cells that lie
    /// outside `src` stay 0.
    pub fn subregion(src: &Tilemap, x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        let width = (x2 - x1).max(0) as usize;
        let height = (y2 - y1).max(0) as usize;
        let mut out = Self::new(width, height);

        for y in y1..y2 {
            for x in x1..x2 {
                if let Some(tile) = src.get_signed(x, y) {
                    out.tiles[(x - x1) as usize + (y - y1) as usize * width] = tile;
                }
            }
        }
        out
    }

    /// Paste all of `src` with its top left corner at `(put_x, put_y)`.
    /// Cells that land outside this map are dropped.
    pub fn stamp(&mut self, src: &Tilemap, put_x: i32, put_y: i32) {
        for y in 0..src.height {
            for x in 0..src.width {
                let tile = src.tiles[x + y * src.width];
                self.set_signed(put_x + x as i32, put_y + y as i32, tile);
            }
        }
    }

    /// Fill `[x1, x2) x [y1, y2)` by repeating `src`, starting from its top
    /// left cell at `(x1, y1)`.
    pub fn fill_pattern(&mut self, src: &Tilemap, x1: i32, y1: i32, x2: i32, y2: i32) {
        if src.is_empty() {
            return;
        }

        for (row, y) in (y1..y2).enumerate() {
            let src_y = row % src.height;
            for (col, x) in (x1..x2).enumerate() {
                let src_x = col % src.width;
                self.set_signed(x, y, src.tiles[src_x + src_y * src.width]);
            }
        }
    }

    pub fn clear(&mut self) {
        self.width = 0;
        self.height = 0;
        self.tiles.clear();
    }

    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.tiles[x + y * self.width])
    }

    /// Returns false when `(x, y)` is outside the map.
    pub fn set(&mut self, x: usize, y: usize, tile: u8) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.tiles[x + y * self.width] = tile;
        true
    }

    fn get_signed(&self, x: i32, y: i32) -> Option<u8> {
        if x < 0 || y < 0 {
            return None;
        }
        self.get(x as usize, y as usize)
    }

    fn set_signed(&mut self, x: i32, y: i32, tile: u8) -> bool {
        if x < 0 || y < 0 {
            return false;
        }
        self.set(x as usize, y as usize, tile)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn tiles(&self) -> &[u8] {
        &self.tiles
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}
