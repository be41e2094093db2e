use std::io::{Read, Seek, Write};
use std::ops::Range;

use crate::bits::{byte_len_for_bits, FrameImportance};
use crate::cursor::RecordCursor;
use crate::{PurifierError, Result};

pub const MAGIC: &[u8; 7] = b"relogic";
pub const SECTION_COUNT_OFFSET: u64 = 0x18;
pub const SECTION_TABLE_OFFSET: u64 = 0x1A;
pub const FRAME_IMPORTANCE_OFFSET: u64 = 0x42;
pub const SECTION_COUNT: usize = 10;

/// Absolute offsets of the world sections, in file order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionPointers(pub [i32; SECTION_COUNT]);

impl SectionPointers {
    pub const HEADER: usize = 0;
    pub const TILES: usize = 1;
    pub const CHESTS: usize = 2;
    pub const FOOTER: usize = 6;

    /// Non-negative and strictly increasing. The three reserved slots at
    /// the end may be zero and are not checked.
    pub fn validate(&self) -> Result<()> {
        let used = &self.0[..=Self::FOOTER];
        if let Some(bad) = used.iter().find(|p| **p < 0) {
            return Err(PurifierError::InvalidSectionTable(format!(
                "negative section offset {bad}"
            )));
        }
        for pair in used.windows(2) {
            if pair[1] <= pair[0] {
                return Err(PurifierError::InvalidSectionTable(format!(
                    "section offsets not increasing: 0x{:X} then 0x{:X}",
                    pair[0], pair[1]
                )));
            }
        }
        Ok(())
    }

    pub fn tiles(&self) -> Range<u64> {
        self.0[Self::TILES] as u64..self.0[Self::CHESTS] as u64
    }
}

#[derive(Debug, Clone)]
pub struct WorldHeader {
    pub version: i32,
    pub magic_ok: bool,
    pub file_type: u8,
    pub section_count: i16,
    pub sections: SectionPointers,
    pub frame_important: FrameImportance,
}

impl WorldHeader {
    pub fn read<S: Read + Write + Seek>(stream: &mut S) -> Result<Self> {
        let mut cursor = RecordCursor::new(stream, 0)?;

        let version = cursor.read_i32_le()?;
        let magic = cursor.read_bytes(MAGIC.len())?;
        let magic_ok = magic.as_slice() == MAGIC;
        let file_type = cursor.read_u8()?;
        if !magic_ok {
            log::warn!("world file has no relogic signature (version {version})");
        }

        cursor.seek_to(SECTION_COUNT_OFFSET)?;
        let section_count = cursor.read_i16_le()?;
        if section_count as usize != SECTION_COUNT {
            log::warn!(
                "header declares {section_count} sections, reading the usual {SECTION_COUNT}"
            );
        }

        let mut pointers = [0i32; SECTION_COUNT];
        for p in pointers.iter_mut() {
            *p = cursor.read_i32_le()?;
        }
        let sections = SectionPointers(pointers);
        sections.validate()?;

        cursor.seek_to(FRAME_IMPORTANCE_OFFSET)?;
        let bit_count = cursor.read_u16_le()? as usize;
        let need = byte_len_for_bits(bit_count);
        let have = cursor.remaining()?;
        if have < need as u64 {
            return Err(PurifierError::BitmapTruncated {
                bits: bit_count,
                need,
                have: have as usize,
            });
        }
        let bytes = cursor.read_bytes(need)?;
        let frame_important = FrameImportance::from_bytes(&bytes, bit_count)?;

        log::debug!(
            "world version {version}, type {file_type}, tiles 0x{:X}..0x{:X}, {bit_count} frame bits",
            sections.0[SectionPointers::TILES],
            sections.0[SectionPointers::CHESTS]
        );

        Ok(Self {
            version,
            magic_ok,
            file_type,
            section_count,
            sections,
            frame_important,
        })
    }
}
