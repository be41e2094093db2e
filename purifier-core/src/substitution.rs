use serde::{Deserialize, Serialize};

/// Spreading biomes whose tiles can be purified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Biome {
    Corruption,
    Crimson,
    Hallow,
}

impl Biome {
    pub const ALL: [Biome; 3] = [Biome::Corruption, Biome::Crimson, Biome::Hallow];

    /// (infected tile ID, pure tile ID) pairs.
    pub fn tile_pairs(self) -> &'static [(u16, u16)] {
        match self {
            Biome::Corruption => CORRUPTED_TILES,
            Biome::Crimson => CRIMSONED_TILES,
            Biome::Hallow => HALLOWED_TILES,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Biome::Corruption => "corruption",
            Biome::Crimson => "crimson",
            Biome::Hallow => "hallow",
        }
    }
}

// Grass, stone, thorns, sand, ice, hardened sand, sandstone.
const CORRUPTED_TILES: &[(u16, u16)] = &[
    (23, 2),
    (25, 1),
    (32, 69),
    (112, 53),
    (163, 161),
    (398, 397),
    (400, 396),
];

const CRIMSONED_TILES: &[(u16, u16)] = &[
    (199, 2),
    (200, 161),
    (203, 1),
    (234, 53),
    (352, 69),
    (399, 397),
    (401, 396),
];

const HALLOWED_TILES: &[(u16, u16)] = &[
    (109, 2),
    (116, 53),
    (117, 1),
    (164, 161),
    (402, 397),
    (403, 396),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Substitution {
    pub biome: Biome,
    pub from: u16,
    pub to: u16,
}

/// Ordered tile-ID lookup: corruption, then crimson, then (optionally)
/// hallow. First hit wins.
#[derive(Debug, Clone)]
pub struct SubstitutionTable {
    purify_hallow: bool,
}

impl SubstitutionTable {
    pub fn new(purify_hallow: bool) -> Self {
        Self { purify_hallow }
    }

    pub fn active_biomes(&self) -> impl Iterator<Item = Biome> + '_ {
        Biome::ALL
            .into_iter()
            .filter(move |b| *b != Biome::Hallow || self.purify_hallow)
    }

    pub fn lookup(&self, id: u16) -> Option<Substitution> {
        first_match(
            self.active_biomes().map(|biome| (biome, biome.tile_pairs())),
            id,
        )
    }

    /// Checks that no ID appears in two biomes and that no pure target is
    /// itself purifiable. Both must hold for a second pass to be a no-op.
    pub fn validate() -> std::result::Result<(), String> {
        let mut seen: Vec<(u16, Biome)> = Vec::new();
        for biome in Biome::ALL {
            for &(from, _) in biome.tile_pairs() {
                if let Some((_, other)) = seen.iter().find(|(id, _)| *id == from) {
                    return Err(format!(
                        "tile {from} is listed for both {} and {}",
                        other.name(),
                        biome.name()
                    ));
                }
                seen.push((from, biome));
            }
        }
        for biome in Biome::ALL {
            for &(_, to) in biome.tile_pairs() {
                if let Some((_, owner)) = seen.iter().find(|(id, _)| *id == to) {
                    return Err(format!(
                        "pure tile {to} from {} is itself a {} tile",
                        biome.name(),
                        owner.name()
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Searches `tables` in order and returns the first pair whose source is `id`.
fn first_match<'a>(
    tables: impl IntoIterator<Item = (Biome, &'a [(u16, u16)])>,
    id: u16,
) -> Option<Substitution> {
    tables.into_iter().find_map(|(biome, pairs)| {
        pairs
            .iter()
            .find(|(from, _)| *from == id)
            .map(|&(from, to)| Substitution { biome, from, to })
    })
}
