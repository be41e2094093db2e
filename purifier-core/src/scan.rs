use serde::{Deserialize, Serialize};
use std::io::{Read, Seek, Write};
use std::ops::Range;

use crate::bits::FrameImportance;
use crate::cursor::RecordCursor;
use crate::substitution::{Biome, SubstitutionTable};
use crate::tile::{decode_record, WriteMode};
use crate::{PurifierError, Result};

const PROGRESS_EVERY: u64 = 1_000_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiomeCounts {
    pub corruption: u64,
    pub crimson: u64,
    pub hallow: u64,
}

impl BiomeCounts {
    fn bump(&mut self, biome: Biome) {
        match biome {
            Biome::Corruption => self.corruption += 1,
            Biome::Crimson => self.crimson += 1,
            Biome::Hallow => self.hallow += 1,
        }
    }

    pub fn get(&self, biome: Biome) -> u64 {
        match biome {
            Biome::Corruption => self.corruption,
            Biome::Crimson => self.crimson,
            Biome::Hallow => self.hallow,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    /// Stored tile records decoded.
    pub records: u64,
    /// Map tiles represented, run lengths included.
    pub tiles_covered: u64,
    /// Records whose tile ID matched an active mapping.
    pub tiles_purified: u64,
    /// Map tiles purified, run lengths included.
    pub tiles_purified_covered: u64,
    pub by_biome: BiomeCounts,
    pub end_offset: u64,
}

/// Walk every tile record in `range`, rewriting infected tile IDs.
///
/// The section must end flush with `range.end`; stopping short at end of
/// file or stepping past the end are both format errors.
pub fn purify_tiles<S: Read + Write + Seek>(
    stream: &mut S,
    range: Range<u64>,
    frame_important: &FrameImportance,
    table: &SubstitutionTable,
    mode: WriteMode,
) -> Result<ScanReport> {
    if range.end < range.start {
        return Err(PurifierError::InvalidSectionTable(format!(
            "tile section ends at 0x{:X} before it starts at 0x{:X}",
            range.end, range.start
        )));
    }

    let mut cursor = RecordCursor::new(stream, range.start)?;
    let mut report = ScanReport::default();

    while cursor.position() < range.end {
        let record = decode_record(&mut cursor, frame_important, table, mode)?;

        report.records += 1;
        report.tiles_covered += record.tiles_covered();
        if let Some(sub) = record.substitution {
            report.tiles_purified += 1;
            report.tiles_purified_covered += record.tiles_covered();
            report.by_biome.bump(sub.biome);
        }

        if report.records % PROGRESS_EVERY == 0 {
            log::debug!(
                "{} records, {} purified, at 0x{:08X} of 0x{:08X}",
                report.records,
                report.tiles_purified,
                cursor.position(),
                range.end
            );
        }
    }

    report.end_offset = cursor.position();
    if report.end_offset != range.end {
        return Err(PurifierError::SectionOverrun {
            end: range.end,
            reached: report.end_offset,
        });
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::io::Cursor;

    const IMPORTANT: &[u16] = &[5, 21];

    fn tfi() -> FrameImportance {
        FrameImportance::from_ids(470, IMPORTANT)
    }

    /// Encode a random but well-formed record. Returns the bytes and the
    /// tile ID when the tile is solid.
    fn random_record(rng: &mut StdRng) -> (Vec<u8>, Option<u16>) {
        let pool: [u16; 14] = [0, 1, 2, 5, 21, 23, 25, 109, 117, 199, 203, 399, 401, 403];
        let mut out = vec![0u8];
        let mut flags1 = 0u8;
        let mut flags3 = 0u8;

        let tile = if rng.gen_bool(0.7) {
            Some(pool[rng.gen_range(0..pool.len())])
        } else {
            None
        };
        let wide = tile.map_or(false, |id| id > 255 || rng.gen_bool(0.2));
        let wall = rng.gen_bool(0.3);
        let liquid: u8 = rng.gen_range(0..4);
        let rle: u8 = rng.gen_range(0..3);
        let paint_tile = rng.gen_bool(0.1);
        let paint_wall = rng.gen_bool(0.1);
        let flags2 = if rng.gen_bool(0.2) || paint_tile || paint_wall {
            rng.gen::<u8>() & 0xFE
        } else {
            0
        };
        let with_flags2 = flags2 != 0 || paint_tile || paint_wall;
        let with_flags3 = paint_tile || paint_wall;

        if with_flags2 {
            flags1 |= 0x01;
            out.push(flags2 | if with_flags3 { 0x01 } else { 0x00 });
        }
        if with_flags3 {
            if paint_tile {
                flags3 |= 0x08;
            }
            if paint_wall {
                flags3 |= 0x10;
            }
            out.push(flags3);
        }
        if let Some(id) = tile {
            flags1 |= 0x02;
            if wide {
                flags1 |= 0x20;
                out.extend_from_slice(&id.to_le_bytes());
            } else {
                out.push(id as u8);
            }
            if IMPORTANT.contains(&id) {
                out.extend_from_slice(&rng.gen::<[u8; 4]>());
            }
        }
        if paint_tile {
            out.push(rng.gen());
        }
        if wall {
            flags1 |= 0x04;
            out.push(rng.gen());
        }
        if paint_wall {
            out.push(rng.gen());
        }
        if liquid != 0 {
            flags1 |= liquid << 3;
            out.push(rng.gen());
        }
        match rle {
            1 => {
                flags1 |= 0x40;
                out.push(rng.gen());
            }
            2 => {
                flags1 |= 0x80;
                out.extend_from_slice(&rng.gen::<u16>().to_le_bytes());
            }
            _ => {}
        }
        out[0] = flags1;
        (out, tile)
    }

    /// A fake file: junk header, the tile section, then a junk trailer.
    fn random_world(seed: u64, records: usize) -> (Vec<u8>, Range<u64>, Vec<Option<u16>>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut data: Vec<u8> = (0..64).map(|_| rng.gen()).collect();
        let start = data.len() as u64;
        let mut tiles = Vec::with_capacity(records);
        for _ in 0..records {
            let (bytes, tile) = random_record(&mut rng);
            data.extend_from_slice(&bytes);
            tiles.push(tile);
        }
        let end = data.len() as u64;
        data.extend((0..32).map(|_| rng.gen::<u8>()));
        (data, start..end, tiles)
    }

    fn scan(data: &mut Vec<u8>, range: Range<u64>, hallow: bool) -> Result<ScanReport> {
        let mut stream = Cursor::new(std::mem::take(data));
        let result = purify_tiles(
            &mut stream,
            range,
            &tfi(),
            &SubstitutionTable::new(hallow),
            WriteMode::Patch,
        );
        *data = stream.into_inner();
        result
    }

    #[test]
    fn scan_ends_flush_and_preserves_size() {
        let (mut data, range, _) = random_world(7, 5_000);
        let len = data.len();
        let report = scan(&mut data, range.clone(), false).unwrap();
        assert_eq!(report.records, 5_000);
        assert_eq!(report.end_offset, range.end);
        assert_eq!(data.len(), len);
    }

    #[test]
    fn purified_count_matches_active_mappings() {
        for hallow in [false, true] {
            let (mut data, range, tiles) = random_world(11, 3_000);
            let table = SubstitutionTable::new(hallow);
            let expected = tiles
                .iter()
                .flatten()
                .filter(|id| table.lookup(**id).is_some())
                .count() as u64;
            let report = scan(&mut data, range, hallow).unwrap();
            assert_eq!(report.tiles_purified, expected);
            let by_biome = report.by_biome;
            assert_eq!(
                by_biome.corruption + by_biome.crimson + by_biome.hallow,
                expected
            );
            if !hallow {
                assert_eq!(by_biome.hallow, 0);
            }
        }
    }

    #[test]
    fn second_pass_purifies_nothing() {
        let (mut data, range, _) = random_world(23, 4_000);
        let first = scan(&mut data, range.clone(), true).unwrap();
        assert!(first.tiles_purified > 0);
        let after_first = data.clone();

        let second = scan(&mut data, range, true).unwrap();
        assert_eq!(second.tiles_purified, 0);
        assert_eq!(second.records, first.records);
        assert_eq!(data, after_first);
    }

    #[test]
    fn only_tile_id_bytes_change() {
        let (original, range, _) = random_world(31, 2_000);
        let mut data = original.clone();
        let report = scan(&mut data, range.clone(), true).unwrap();

        let changed = original
            .iter()
            .zip(&data)
            .enumerate()
            .filter(|(_, (a, b))| a != b)
            .map(|(i, _)| i as u64)
            .collect::<Vec<_>>();
        assert!(changed.iter().all(|i| range.contains(i)));
        // Each purified record changes at most two bytes.
        assert!(changed.len() as u64 <= report.tiles_purified * 2);
        assert!(!changed.is_empty());
    }

    #[test]
    fn dry_run_leaves_bytes_alone() {
        let (original, range, _) = random_world(5, 1_000);
        let mut stream = Cursor::new(original.clone());
        let report = purify_tiles(
            &mut stream,
            range,
            &tfi(),
            &SubstitutionTable::new(true),
            WriteMode::DryRun,
        )
        .unwrap();
        assert!(report.tiles_purified > 0);
        assert_eq!(stream.into_inner(), original);
    }

    #[test]
    fn wide_grass_with_run_then_air() {
        // Corrupt grass stored wide with a short run, then a single air tile.
        let mut data = vec![0b0110_0010, 23, 0, 4, 0x00];
        let report = scan(&mut data, 0..5, false).unwrap();
        assert_eq!(report.tiles_purified, 1);
        assert_eq!(report.tiles_purified_covered, 5);
        assert_eq!(report.tiles_covered, 6);
        assert_eq!(data, vec![0b0110_0010, 2, 0, 4, 0x00]);
    }

    #[test]
    fn overrun_is_detected() {
        // The record is 3 bytes wide but the section claims 2.
        let mut data = vec![0b0100_0010, 1, 7, 0, 0];
        let err = scan(&mut data, 0..2, false).unwrap_err();
        assert!(matches!(
            err,
            PurifierError::SectionOverrun { end: 2, reached: 3 }
        ));
    }

    #[test]
    fn truncated_section_is_detected() {
        let (data, range, _) = random_world(3, 200);
        let mut truncated = data[..(range.end as usize - 1)].to_vec();
        let err = scan(&mut truncated, range, false).unwrap_err();
        assert!(matches!(err, PurifierError::UnexpectedEof { .. }));
    }

    #[test]
    fn empty_section_is_fine() {
        let mut data = vec![0xAB; 10];
        let report = scan(&mut data, 4..4, false).unwrap();
        assert_eq!(report.records, 0);
        assert_eq!(report.end_offset, 4);
    }
}
