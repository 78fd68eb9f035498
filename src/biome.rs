//! Центральная пустыня и таблица биомов
//!
//! Биом выводится из корзины высоты, муссонного пояса, корзины удалённости
//! от океана и положения относительно ветра. Правила проверяются строго по
//! порядку таблицы [`BIOME_RULES`]; если ни одно не сработало, берётся
//! [`BiomeKind::Grassland`]. Океан биома не получает.

use crate::climate::{self, Exposure};
use crate::config::{ClimateSettings, WorldGenerationParams};
use crate::error::Result;
use crate::grid::GridStore;
use crate::hex::Axial;
use crate::tags::TagSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BiomeKind {
    Alpine,
    Highland,
    Desert,
    Scrubland,
    Grassland,
    Woodland,
    Rainforest,
    Wetland,
}

impl BiomeKind {
    pub const ALL: [BiomeKind; 8] = [
        BiomeKind::Alpine,
        BiomeKind::Highland,
        BiomeKind::Desert,
        BiomeKind::Scrubland,
        BiomeKind::Grassland,
        BiomeKind::Woodland,
        BiomeKind::Rainforest,
        BiomeKind::Wetland,
    ];

    /// Влажные биомы: низины в них заболачиваются.
    #[must_use]
    pub fn is_wet(self) -> bool {
        matches!(self, BiomeKind::Rainforest | BiomeKind::Wetland)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElevationBucket {
    Low,
    High,
    Peak,
}

impl ElevationBucket {
    pub const ALL: [ElevationBucket; 3] = [
        ElevationBucket::Low,
        ElevationBucket::High,
        ElevationBucket::Peak,
    ];

    #[must_use]
    pub fn of(elevation: f32, settings: &ClimateSettings) -> Self {
        if elevation >= settings.peak_elevation {
            ElevationBucket::Peak
        } else if elevation >= settings.high_elevation {
            ElevationBucket::High
        } else {
            ElevationBucket::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DistanceBucket {
    Coastal,
    Near,
    Inland,
}

impl DistanceBucket {
    pub const ALL: [DistanceBucket; 3] = [
        DistanceBucket::Coastal,
        DistanceBucket::Near,
        DistanceBucket::Inland,
    ];

    #[must_use]
    pub fn of(distance_from_ocean: f32, settings: &ClimateSettings) -> Self {
        if distance_from_ocean <= settings.coastal_distance as f32 {
            DistanceBucket::Coastal
        } else if distance_from_ocean <= settings.near_distance as f32 {
            DistanceBucket::Near
        } else {
            DistanceBucket::Inland
        }
    }
}

/// Всё, от чего зависит биом тайла.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiomeInputs {
    pub elevation: ElevationBucket,
    pub band: u32,
    pub band_count: u32,
    pub distance: DistanceBucket,
    pub exposure: Exposure,
    pub central_desert: bool,
    pub scrubland: bool,
}

impl BiomeInputs {
    /// Влажность: дальние муссонные пояса, близость к морю и наветренность
    /// добавляют влаги, дождевая тень её забирает.
    #[must_use]
    pub fn moisture(&self) -> f32 {
        let band = if self.band_count > 1 {
            self.band.min(self.band_count - 1) as f32 / (self.band_count - 1) as f32
        } else {
            0.5
        };
        let distance = match self.distance {
            DistanceBucket::Coastal => 1.0,
            DistanceBucket::Near => 0.5,
            DistanceBucket::Inland => 0.0,
        };
        let exposure = match self.exposure {
            Exposure::Windward => 0.5,
            Exposure::Valley => 0.25,
            Exposure::Neutral => 0.0,
            Exposure::Leeward => -0.5,
        };
        band + distance + exposure
    }
}

/// Правило таблицы биомов.
pub struct BiomeRule {
    pub name: &'static str,
    pub matches: fn(&BiomeInputs) -> bool,
    pub biome: BiomeKind,
}

/// Таблица биомов в порядке приоритета.
pub const BIOME_RULES: &[BiomeRule] = &[
    BiomeRule {
        name: "peak",
        matches: |i| i.elevation == ElevationBucket::Peak,
        biome: BiomeKind::Alpine,
    },
    BiomeRule {
        name: "high",
        matches: |i| i.elevation == ElevationBucket::High,
        biome: BiomeKind::Highland,
    },
    BiomeRule {
        name: "central_desert",
        matches: |i| i.central_desert,
        biome: BiomeKind::Desert,
    },
    BiomeRule {
        name: "desert_rim",
        matches: |i| i.scrubland,
        biome: BiomeKind::Scrubland,
    },
    BiomeRule {
        name: "arid",
        matches: |i| i.moisture() < 0.25,
        biome: BiomeKind::Desert,
    },
    BiomeRule {
        name: "dry",
        matches: |i| i.moisture() < 0.75,
        biome: BiomeKind::Scrubland,
    },
    BiomeRule {
        name: "temperate",
        matches: |i| i.moisture() < 1.25,
        biome: BiomeKind::Grassland,
    },
    BiomeRule {
        name: "humid",
        matches: |i| i.moisture() < 1.75,
        biome: BiomeKind::Woodland,
    },
    BiomeRule {
        name: "coastal_valley",
        matches: |i| i.distance == DistanceBucket::Coastal && i.exposure == Exposure::Valley,
        biome: BiomeKind::Wetland,
    },
    BiomeRule {
        name: "saturated",
        matches: |i| i.moisture() >= 2.25,
        biome: BiomeKind::Wetland,
    },
    BiomeRule {
        name: "tropical",
        matches: |i| i.moisture() >= 1.75,
        biome: BiomeKind::Rainforest,
    },
];

/// Первый сработавший биом; иначе травы.
#[must_use]
pub fn classify_biome(inputs: &BiomeInputs) -> BiomeKind {
    BIOME_RULES
        .iter()
        .find(|rule| (rule.matches)(inputs))
        .map_or(BiomeKind::Grassland, |rule| rule.biome)
}

/// `CENTRAL_DESERT` на самых удалённых от океана ярусах и `SCRUBLAND` вокруг.
///
/// Возвращает (пустыня, кустарник).
pub fn tag_central_desert(
    grid: &mut GridStore,
    settings: &ClimateSettings,
    region_count: u32,
) -> Result<(usize, usize)> {
    let steps = settings
        .central_desert_steps
        .unwrap_or_else(|| ((region_count as f32).sqrt() as u32).max(1));

    let tiers: BTreeSet<u32> = grid
        .iter()
        .filter(|(_, t)| t.tags().is_dry_land() && !t.has(TagSet::MOUNTAIN))
        .map(|(_, t)| t.distance_from_ocean as u32)
        .filter(|&d| d > 0)
        .collect();
    let desert_tiers: BTreeSet<u32> = tiers.iter().rev().take(steps as usize).copied().collect();
    if desert_tiers.is_empty() {
        tracing::warn!(target: "hexmapgen::biome", "нет суши для центральной пустыни");
        return Ok((0, 0));
    }

    let desert: Vec<Axial> = grid
        .iter()
        .filter(|(_, t)| {
            t.tags().is_dry_land()
                && !t.has(TagSet::MOUNTAIN)
                && desert_tiers.contains(&(t.distance_from_ocean as u32))
        })
        .map(|(c, _)| c)
        .collect();
    for &c in &desert {
        grid.add_tags(c, TagSet::CENTRAL_DESERT)?;
    }

    let mut rim = Vec::new();
    for (coord, tile) in grid.iter() {
        let tags = tile.tags();
        if !tags.is_dry_land() || tags.contains(TagSet::CENTRAL_DESERT) {
            continue;
        }
        if grid
            .neighbors_in_bounds(coord)
            .any(|(_, n)| grid.get(n).is_ok_and(|t| t.has(TagSet::CENTRAL_DESERT)))
        {
            rim.push(coord);
        }
    }
    for &c in &rim {
        grid.add_tags(c, TagSet::SCRUBLAND)?;
    }

    Ok((desert.len(), rim.len()))
}

/// Итоги стадии биомов.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BiomeReport {
    pub central_desert: usize,
    pub scrubland: usize,
    pub classified: usize,
}

/// Теги пустыни и склонов, затем биом каждого не-океанского тайла.
pub fn classify_biomes(grid: &mut GridStore, params: &WorldGenerationParams) -> Result<BiomeReport> {
    let settings = &params.climate;
    let (central_desert, scrubland) = tag_central_desert(grid, settings, params.region_count)?;
    climate::tag_exposure(grid, settings)?;

    let mut classified = 0;
    for (_, tile) in grid.iter_mut() {
        let tags = tile.tags();
        if tags.is_ocean() {
            continue;
        }
        let inputs = BiomeInputs {
            elevation: ElevationBucket::of(tile.elevation, settings),
            band: tile.monsoon_band,
            band_count: params.monsoon.band_count,
            distance: DistanceBucket::of(tile.distance_from_ocean, settings),
            exposure: Exposure::from_tags(tags),
            central_desert: tags.contains(TagSet::CENTRAL_DESERT),
            scrubland: tags.contains(TagSet::SCRUBLAND),
        };
        tile.biome = Some(classify_biome(&inputs));
        classified += 1;
    }

    tracing::info!(
        target: "hexmapgen::biome",
        classified,
        central_desert,
        scrubland,
        "биомы назначены"
    );
    Ok(BiomeReport {
        central_desert,
        scrubland,
        classified,
    })
}
