use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unexpected end of data at {offset:#x}: need {need} bytes, have {have}")]
    UnexpectedEof { offset: usize, need: usize, have: usize },

    #[error("seek to {offset:#x} is beyond the end of the stream ({size:#x} bytes)")]
    SeekOutOfBounds { offset: usize, size: usize },

    #[error("\"{}\" is not a valid world file: {reason}", path.display())]
    InvalidWorld { path: PathBuf, reason: String },

    #[error("invalid level data: {0}")]
    InvalidFormat(String),

    #[error("level {level} blockmap needs {size} bytes (max {maximum})")]
    CapacityExceeded { level: String, size: usize, maximum: usize },

    #[error("unknown entity template {entity_type}, {subtype}")]
    UnknownTemplate { entity_type: u8, subtype: u8 },

    #[error("level {level} has not been loaded")]
    LevelNotLoaded { level: String },

    #[error("io error on \"{}\": {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config \"{}\": {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io { path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
