pub mod reader;
pub mod source;
pub mod types;
pub mod writer;

pub use reader::StreamReader;
pub use source::{AddressSpace, Segment};
pub use types::{Endianness, Offset, BASE_OFFSET};
pub use writer::StreamWriter;
