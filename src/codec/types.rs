/// Address the game loads world files at. Every pointer stored on disk is
/// relative to memory, so it carries this base.
pub const BASE_OFFSET: u32 = 0x20700;

/// Byte order of a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Endianness {
    #[default]
    Little,
    Big,
}

/// Byte offset into a world file's address space, with `BASE_OFFSET`
/// already removed.
///
/// Conversion to and from on-disk pointers wraps, so a pointer that is
/// smaller than the base (null code pointers exist in shipped files)
/// survives a load/save cycle unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Offset(pub u32);

impl Offset {
    pub const ZERO: Offset = Offset(0);

    pub fn from_pointer(pointer: u32) -> Self {
        Self(pointer.wrapping_sub(BASE_OFFSET))
    }

    pub fn to_pointer(self) -> u32 {
        self.0.wrapping_add(BASE_OFFSET)
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn as_usize(self) -> usize {
        self.0 as usize
    }

    pub fn advance(self, bytes: usize) -> Self {
        Self(self.0.wrapping_add(bytes as u32))
    }
}

impl From<u32> for Offset {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

impl From<usize> for Offset {
    fn from(v: usize) -> Self {
        Self(v as u32)
    }
}

impl std::fmt::Display for Offset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#07x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointer_roundtrip() {
        for raw in [0u32, 1, 0x1234, 0x20700, 0xFFFF_FFFF] {
            let offset = Offset::from_pointer(raw);
            assert_eq!(offset.to_pointer(), raw);
        }
        assert_eq!(Offset::from_pointer(0x20710), Offset(0x10));
        assert_eq!(Offset(0x10).to_pointer(), 0x20710);
    }
}
