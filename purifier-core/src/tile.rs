//! Variable-width tile record codec.
//!
//! Field order after the flag bytes:
//!
//! | field            | bytes | present when                         |
//! |------------------|-------|--------------------------------------|
//! | tile ID          | 1/2   | flags1 ACTIVE (WIDE_ID selects 2)    |
//! | frame X, frame Y | 4     | frame-importance bit for the tile ID |
//! | tile paint       | 1     | flags3 TILE_PAINTED                  |
//! | wall ID          | 1     | flags1 HAS_WALL                      |
//! | wall paint       | 1     | flags3 WALL_PAINTED                  |
//! | liquid volume    | 1     | either flags1 liquid bit             |
//! | run length       | 1/2   | flags1 RLE_SHORT / RLE_LONG          |
//!
//! The record width comes only from what was read. A substitution rewrites
//! the ID field in place with the same width.

use std::io::{Read, Seek, Write};

use crate::bits::FrameImportance;
use crate::cursor::RecordCursor;
use crate::flags::{IdWidth, Liquid, RunLength, TileFlags};
use crate::substitution::{Substitution, SubstitutionTable};
use crate::{PurifierError, Result};

/// One decoded tile record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileRecord {
    pub offset: u64,
    pub flags: TileFlags,
    /// `None` for air.
    pub tile_id: Option<u16>,
    pub wall_id: Option<u8>,
    pub liquid_volume: Option<u8>,
    /// Extra copies of this record that follow without stored bytes.
    pub run_length: u16,
    pub substitution: Option<Substitution>,
    /// Bytes consumed, flags included.
    pub len: usize,
}

impl TileRecord {
    /// Number of map tiles this record stands for.
    pub fn tiles_covered(&self) -> u64 {
        1 + self.run_length as u64
    }
}

/// Whether a matched substitution is written back or only reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Patch,
    DryRun,
}

/// Decode the record at the cursor, rewriting its tile ID when the table
/// has a mapping for it.
pub fn decode_record<S: Read + Write + Seek>(
    cursor: &mut RecordCursor<S>,
    frame_important: &FrameImportance,
    table: &SubstitutionTable,
    mode: WriteMode,
) -> Result<TileRecord> {
    let offset = cursor.position();
    let (flags, mut len) = TileFlags::read(cursor)?;

    let mut tile_id = None;
    let mut substitution = None;
    if flags.is_active() {
        let width = flags.id_width();
        let id_offset = cursor.position();
        let id = match width {
            IdWidth::One => cursor.read_u8()? as u16,
            IdWidth::Two => cursor.read_u16_le()?,
        };
        len += width.bytes();

        if let Some(sub) = table.lookup(id) {
            check_fits(width, sub.to, id_offset)?;
            if frame_important.is_important(sub.to) != frame_important.is_important(id) {
                return Err(PurifierError::FrameImportanceMismatch {
                    offset: id_offset,
                    from: sub.from,
                    to: sub.to,
                });
            }
            if mode == WriteMode::Patch {
                match width {
                    IdWidth::One => cursor.patch_u8(id_offset, sub.to as u8)?,
                    IdWidth::Two => cursor.patch_u16_le(id_offset, sub.to)?,
                }
            }
            log::trace!(
                "0x{id_offset:08X}: {} tile {} -> {}",
                sub.biome.name(),
                sub.from,
                sub.to
            );
            substitution = Some(sub);
        }
        tile_id = Some(id);
    }

    // Air looks up as tile 0 (dirt), which has no frame data.
    let lookup_id = tile_id.unwrap_or(0);
    match frame_important.is_important(lookup_id) {
        Some(true) => {
            cursor.skip(4)?;
            len += 4;
        }
        Some(false) => {}
        None => {
            return Err(PurifierError::UnknownTileId {
                offset,
                id: lookup_id,
                known: frame_important.len(),
            });
        }
    }

    if flags.tile_painted() {
        cursor.skip(1)?;
        len += 1;
    }

    let mut wall_id = None;
    if flags.has_wall() {
        wall_id = Some(cursor.read_u8()?);
        len += 1;
    }

    if flags.wall_painted() {
        cursor.skip(1)?;
        len += 1;
    }

    let mut liquid_volume = None;
    if flags.liquid() != Liquid::None {
        liquid_volume = Some(cursor.read_u8()?);
        len += 1;
    }

    let run_length = match flags.run_length() {
        RunLength::Long => cursor.read_u16_le()?,
        RunLength::Short => cursor.read_u8()? as u16,
        RunLength::None => 0,
    };
    len += flags.run_length().bytes();

    debug_assert_eq!(cursor.position(), offset + len as u64);

    Ok(TileRecord {
        offset,
        flags,
        tile_id,
        wall_id,
        liquid_volume,
        run_length,
        substitution,
        len,
    })
}

/// A replacement ID must fit the field it overwrites; truncating it would
/// shift every record after it.
fn check_fits(width: IdWidth, id: u16, offset: u64) -> Result<()> {
    if id > width.max_value() {
        return Err(PurifierError::IdentifierOverflow {
            offset,
            id,
            width: width.bytes(),
        });
    }
    Ok(())
}
