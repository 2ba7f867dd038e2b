//! Turrican II level data
//!
//! Reading and writing of the game's world files: the tilemaps, the
//! blockmap index that stores level entities, level headers, and the
//! tileset and palette shared by every level of a world.

pub mod blockmap;
pub mod codec;
pub mod config;
pub mod entity;
pub mod error;
pub mod level;
pub mod tilemap;
pub mod tileset;
pub mod world;

pub use error::{Error, Result};
pub use codec::{Endianness, Offset, StreamReader, StreamWriter, BASE_OFFSET};
pub use blockmap::{BlockmapGeometry, BlockmapWriteResult};
pub use config::{GameConfig, LevelConfig, WorldConfig};
pub use entity::{Entity, EntityTemplate, TemplateCatalog};
pub use level::{Level, LevelHeader, LevelState, LEVEL_HEADER_SIZE};
pub use tilemap::Tilemap;
pub use tileset::{CollisionType, Palette, Tile, Tileset};
pub use world::{SaveReport, World, WorldHeader};
