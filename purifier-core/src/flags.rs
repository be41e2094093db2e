//! Chained flag bytes at the head of every tile record.
//!
//! `Flags1` is always present. `Flags2` follows only when `Flags1` bit 0 is
//! set, and `Flags3` only when `Flags2` bit 0 is set. Missing bytes read as
//! all-zero.

use bitflags::bitflags;
use std::io::{Read, Seek, Write};

use crate::cursor::RecordCursor;
use crate::Result;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Flags1: u8 {
        const HAS_FLAGS2 = 0x01;
        const ACTIVE = 0x02;
        const HAS_WALL = 0x04;
        const LIQUID_LO = 0x08;
        const LIQUID_HI = 0x10;
        const WIDE_ID = 0x20;
        const RLE_SHORT = 0x40;
        const RLE_LONG = 0x80;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Flags2: u8 {
        const HAS_FLAGS3 = 0x01;
        const WIRE_RED = 0x02;
        const WIRE_BLUE = 0x04;
        const WIRE_GREEN = 0x08;
        const SLOPE_0 = 0x10;
        const SLOPE_1 = 0x20;
        const SLOPE_2 = 0x40;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Flags3: u8 {
        const ACTUATOR = 0x02;
        const ACTUATED = 0x04;
        const TILE_PAINTED = 0x08;
        const WALL_PAINTED = 0x10;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liquid {
    None,
    Water,
    Lava,
    Honey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slope {
    Square,
    HalfTile,
    TopRightMissing,
    TopLeftMissing,
    BottomRightMissing,
    BottomLeftMissing,
    Unused(u8),
}

/// Byte width of the stored tile identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdWidth {
    One,
    Two,
}

impl IdWidth {
    pub fn bytes(self) -> usize {
        match self {
            IdWidth::One => 1,
            IdWidth::Two => 2,
        }
    }

    pub fn max_value(self) -> u16 {
        match self {
            IdWidth::One => u8::MAX as u16,
            IdWidth::Two => u16::MAX,
        }
    }
}

/// Width of the trailing run-length counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunLength {
    None,
    Short,
    Long,
}

impl RunLength {
    pub fn bytes(self) -> usize {
        match self {
            RunLength::None => 0,
            RunLength::Short => 1,
            RunLength::Long => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TileFlags {
    pub flags1: Flags1,
    pub flags2: Flags2,
    pub flags3: Flags3,
}

impl TileFlags {
    /// Read 1 to 3 flag bytes, returning the flags and how many bytes were
    /// consumed.
    pub fn read<S: Read + Write + Seek>(cursor: &mut RecordCursor<S>) -> Result<(Self, usize)> {
        let flags1 = Flags1::from_bits_retain(cursor.read_u8()?);
        let mut flags = TileFlags { flags1, ..Default::default() };
        let mut consumed = 1;

        if flags1.contains(Flags1::HAS_FLAGS2) {
            flags.flags2 = Flags2::from_bits_retain(cursor.read_u8()?);
            consumed += 1;
            if flags.flags2.contains(Flags2::HAS_FLAGS3) {
                flags.flags3 = Flags3::from_bits_retain(cursor.read_u8()?);
                consumed += 1;
            }
        }

        Ok((flags, consumed))
    }

    pub fn is_active(&self) -> bool {
        self.flags1.contains(Flags1::ACTIVE)
    }

    pub fn has_wall(&self) -> bool {
        self.flags1.contains(Flags1::HAS_WALL)
    }

    pub fn id_width(&self) -> IdWidth {
        if self.flags1.contains(Flags1::WIDE_ID) {
            IdWidth::Two
        } else {
            IdWidth::One
        }
    }

    pub fn liquid(&self) -> Liquid {
        match (self.flags1.bits() >> 3) & 0b11 {
            0 => Liquid::None,
            1 => Liquid::Water,
            2 => Liquid::Lava,
            _ => Liquid::Honey,
        }
    }

    /// The long counter wins when both run-length bits are set.
    pub fn run_length(&self) -> RunLength {
        if self.flags1.contains(Flags1::RLE_LONG) {
            RunLength::Long
        } else if self.flags1.contains(Flags1::RLE_SHORT) {
            RunLength::Short
        } else {
            RunLength::None
        }
    }

    pub fn slope(&self) -> Slope {
        match (self.flags2.bits() >> 4) & 0b111 {
            0 => Slope::Square,
            1 => Slope::HalfTile,
            2 => Slope::TopRightMissing,
            3 => Slope::TopLeftMissing,
            4 => Slope::BottomRightMissing,
            5 => Slope::BottomLeftMissing,
            n => Slope::Unused(n),
        }
    }

    pub fn tile_painted(&self) -> bool {
        self.flags3.contains(Flags3::TILE_PAINTED)
    }

    pub fn wall_painted(&self) -> bool {
        self.flags3.contains(Flags3::WALL_PAINTED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn read(bytes: &[u8]) -> (TileFlags, usize, u64) {
        let mut cur = RecordCursor::new(Cursor::new(bytes.to_vec()), 0).unwrap();
        let (flags, n) = TileFlags::read(&mut cur).unwrap();
        (flags, n, cur.position())
    }

    #[test]
    fn single_flag_byte_leaves_others_zero() {
        // flags2 bit clear: the following 0xFF bytes belong to the next field.
        let (flags, n, pos) = read(&[0b0010_0010, 0xFF, 0xFF]);
        assert_eq!(n, 1);
        assert_eq!(pos, 1);
        assert!(flags.flags2.is_empty());
        assert!(flags.flags3.is_empty());
        assert!(flags.is_active());
        assert_eq!(flags.id_width(), IdWidth::Two);
    }

    #[test]
    fn flags3_only_when_flags2_low_bit_set() {
        let (flags, n, _) = read(&[0x01, 0b0011_0000, 0xFF]);
        assert_eq!(n, 2);
        assert_eq!(flags.slope(), Slope::TopLeftMissing);
        assert!(flags.flags3.is_empty());

        let (flags, n, _) = read(&[0x01, 0x01, 0b0001_1000]);
        assert_eq!(n, 3);
        assert!(flags.tile_painted());
        assert!(flags.wall_painted());
    }

    #[test]
    fn decodes_liquid_and_run_length() {
        let (flags, _, _) = read(&[0b0000_1000]);
        assert_eq!(flags.liquid(), Liquid::Water);
        let (flags, _, _) = read(&[0b0001_0000]);
        assert_eq!(flags.liquid(), Liquid::Lava);
        let (flags, _, _) = read(&[0b0101_1000]);
        assert_eq!(flags.liquid(), Liquid::Honey);
        assert_eq!(flags.run_length(), RunLength::Short);
        let (flags, _, _) = read(&[0b1100_0000]);
        assert_eq!(flags.run_length(), RunLength::Long);
        assert_eq!(flags.run_length().bytes(), 2);
    }

    #[test]
    fn truncated_chain_is_an_error() {
        let mut cur = RecordCursor::new(Cursor::new(vec![0x01, 0x01]), 0).unwrap();
        assert!(TileFlags::read(&mut cur).is_err());
    }
}
