// Weighted loot tables and generator profiles.

use super::entity::{GeneratorType, LocationClass};
use super::items::ItemKind;
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LootEntry {
    pub item: ItemKind,
    pub min: u32,
    pub max: u32,
    pub weight: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LootTable {
    pub entries: &'static [LootEntry],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LootRoll {
    pub item: ItemKind,
    pub count: u32,
}

impl LootTable {
    pub fn total_weight(&self) -> u32 {
        self.entries.iter().map(|e| e.weight).sum()
    }

    /// Picks an entry with a single uniform draw walked down the cumulative weights.
    pub fn roll<R: Rng>(&self, rng: &mut R) -> Option<LootRoll> {
        let total = self.total_weight();
        if total == 0 {
            return None;
        }
        let draw = rng.gen_range(0..total);
        let entry = self.pick(draw)?;
        let count = if entry.max > entry.min {
            rng.gen_range(entry.min..=entry.max)
        } else {
            entry.min
        };
        Some(LootRoll {
            item: entry.item,
            count,
        })
    }

    fn pick(&self, mut draw: u32) -> Option<&LootEntry> {
        for entry in self.entries {
            if draw < entry.weight {
                return Some(entry);
            }
            draw -= entry.weight;
        }
        None
    }
}

pub const GOLD_TABLE: LootTable = LootTable {
    entries: &[
        LootEntry {
            item: ItemKind::Gold,
            min: 1,
            max: 2,
            weight: 80,
        },
        LootEntry {
            item: ItemKind::Gold,
            min: 3,
            max: 5,
            weight: 20,
        },
    ],
};

pub const SUPPLY_TABLE: LootTable = LootTable {
    entries: &[
        LootEntry {
            item: ItemKind::Arrow,
            min: 2,
            max: 4,
            weight: 40,
        },
        LootEntry {
            item: ItemKind::Wood,
            min: 4,
            max: 8,
            weight: 30,
        },
        LootEntry {
            item: ItemKind::Gold,
            min: 2,
            max: 4,
            weight: 15,
        },
        LootEntry {
            item: ItemKind::Tnt,
            min: 1,
            max: 1,
            weight: 10,
        },
        LootEntry {
            item: ItemKind::Pearl,
            min: 1,
            max: 1,
            weight: 5,
        },
    ],
};

pub fn table_for(generator_type: GeneratorType) -> LootTable {
    match generator_type {
        GeneratorType::Gold => GOLD_TABLE,
        GeneratorType::Supply => SUPPLY_TABLE,
    }
}

/// Spawn cadence and crowding limits for one location class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeneratorProfile {
    pub interval_ms: u64,
    pub spawn_radius: f32,
    /// Units of loot allowed to pile up nearby before spawning pauses.
    pub cap: u32,
}

pub fn profile_for(location: LocationClass) -> GeneratorProfile {
    match location {
        LocationClass::Base => GeneratorProfile {
            interval_ms: 1500,
            spawn_radius: 40.0,
            cap: 20,
        },
        LocationClass::Center => GeneratorProfile {
            interval_ms: 5000,
            spawn_radius: 80.0,
            cap: 12,
        },
    }
}
