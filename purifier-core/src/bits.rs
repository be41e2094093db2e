use bit_vec::BitVec;

use crate::{PurifierError, Result};

/// Expand a byte slice into individual bits, least-significant bit of each
/// byte first.
pub fn unpack_bits_lsb(bytes: &[u8]) -> Vec<bool> {
    bytes
        .iter()
        .flat_map(|&b| (0..8).map(move |i| (b >> i) & 1 == 1))
        .collect()
}

/// Number of bytes needed to store `bit_count` bits.
pub fn byte_len_for_bits(bit_count: usize) -> usize {
    (bit_count + 7) / 8
}

/// Per-tile-ID table telling whether a tile stores frame coordinates.
///
/// Loaded from the world header. The bit count is stored alongside the
/// bytes and newer file versions grow it, so the table keeps exactly the
/// declared number of entries and ignores padding bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameImportance {
    bits: BitVec,
}

impl FrameImportance {
    pub fn from_bytes(bytes: &[u8], bit_count: usize) -> Result<Self> {
        let need = byte_len_for_bits(bit_count);
        if bytes.len() < need {
            return Err(PurifierError::BitmapTruncated {
                bits: bit_count,
                need,
                have: bytes.len(),
            });
        }

        let bits: BitVec = unpack_bits_lsb(&bytes[..need])
            .into_iter()
            .take(bit_count)
            .collect();
        Ok(Self { bits })
    }

    /// Builds a table from explicit IDs. Mostly useful for tests and tools
    /// that synthesise worlds.
    pub fn from_ids(bit_count: usize, important: &[u16]) -> Self {
        let mut bits = BitVec::from_elem(bit_count, false);
        for &id in important {
            if (id as usize) < bit_count {
                bits.set(id as usize, true);
            }
        }
        Self { bits }
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// `None` when `id` lies past the declared bit count.
    pub fn is_important(&self, id: u16) -> Option<bool> {
        self.bits.get(id as usize)
    }

    /// Serialise back to the on-disk LSB-first layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![0u8; byte_len_for_bits(self.bits.len())];
        for (i, set) in self.bits.iter().enumerate() {
            if set {
                out[i / 8] |= 1 << (i % 8);
            }
        }
        out
    }
}
