use std::ops::{Index, IndexMut};

/// A 4-bit unsigned integer (nibble).
///
/// Register and key indices are nibbles, so indexing a 16-entry array with a
/// `u4` can never go out of bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[allow(non_camel_case_types)]
pub struct u4(u8);

/// Returned when converting a value above 0xF into a [`u4`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("value {0:#04X} does not fit in a nibble")]
pub struct NibbleOutOfRange(pub u8);

impl u4 {
    pub const MAX: u4 = u4(0x0F);

    /// Creates a new `u4` from a `u8`.
    ///
    /// Panics if the value is greater than 0x0F.
    pub const fn new(value: u8) -> Self {
        assert!(value <= 0x0F, "u4 value must be in range 0x0-0xF");
        Self(value)
    }

    /// Extracts nibble `position` (1 = highest, 4 = lowest) of a 16-bit word.
    pub const fn of_word(word: u16, position: u8) -> Self {
        assert!(position >= 1 && position <= 4, "nibble position must be 1-4");
        let shift = (4 - position) * 4;
        Self(((word >> shift) & 0x0F) as u8)
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    /// Indices `0..=self`, e.g. the registers touched by FX55/FX65.
    pub fn up_to(self) -> impl Iterator<Item = u4> {
        (0..=self.0).map(u4)
    }
}

impl TryFrom<u8> for u4 {
    type Error = NibbleOutOfRange;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value <= 0x0F {
            Ok(Self(value))
        } else {
            Err(NibbleOutOfRange(value))
        }
    }
}

impl From<u4> for usize {
    fn from(v: u4) -> usize {
        v.0 as usize
    }
}

impl From<u4> for u8 {
    fn from(v: u4) -> u8 {
        v.0
    }
}

impl std::fmt::Display for u4 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:X}", self.0)
    }
}

impl<T> Index<u4> for [T; 16] {
    type Output = T;

    fn index(&self, index: u4) -> &Self::Output {
        &self[index.0 as usize]
    }
}

impl<T> IndexMut<u4> for [T; 16] {
    fn index_mut(&mut self, index: u4) -> &mut Self::Output {
        &mut self[index.0 as usize]
    }
}
