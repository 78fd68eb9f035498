//! Итоговый тип местности тайла
//!
//! Одно правило на строку, первое совпадение побеждает. Правило требует
//! подмножество тегов и, при необходимости, определённую роль реки или
//! влажный биом. Порядок элементов в наборе тегов не важен: проверяется
//! только порядок правил.

use crate::biome::BiomeKind;
use crate::grid::{GridStore, TileRecord};
use crate::rivers::RiverRole;
use crate::tags::TagSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TerrainKind {
    Ocean,
    Estuary,
    Lake,
    River,
    Mountain,
    Highlands,
    DesertDunes,
    Scrublands,
    Plains,
    Grassland,
    Woodlands,
    Jungle,
    Marsh,
}

impl TerrainKind {
    /// Местность, которую даёт сам биом.
    #[must_use]
    pub fn from_biome(biome: BiomeKind) -> Self {
        match biome {
            BiomeKind::Alpine | BiomeKind::Highland => TerrainKind::Highlands,
            BiomeKind::Desert => TerrainKind::DesertDunes,
            BiomeKind::Scrubland => TerrainKind::Scrublands,
            BiomeKind::Grassland => TerrainKind::Grassland,
            BiomeKind::Woodland => TerrainKind::Woodlands,
            BiomeKind::Rainforest => TerrainKind::Jungle,
            BiomeKind::Wetland => TerrainKind::Marsh,
        }
    }
}

/// Что даёт сработавшее правило.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerrainOutcome {
    Fixed(TerrainKind),
    /// Местность биома тайла; без биома — травы
    FromBiome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerrainRule {
    pub name: &'static str,
    pub requires: TagSet,
    pub river: Option<RiverRole>,
    pub wet_biome: bool,
    pub outcome: TerrainOutcome,
}

impl TerrainRule {
    const fn tags(name: &'static str, requires: TagSet, outcome: TerrainOutcome) -> Self {
        Self {
            name,
            requires,
            river: None,
            wet_biome: false,
            outcome,
        }
    }

    #[must_use]
    pub fn matches(&self, tile: &TileRecord) -> bool {
        if !tile.has(self.requires) {
            return false;
        }
        if let Some(role) = self.river
            && tile.river.as_ref().is_none_or(|r| r.role != role)
        {
            return false;
        }
        !self.wet_biome || tile.biome.is_some_and(BiomeKind::is_wet)
    }
}

/// Упорядоченный список правил.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerrainRules {
    rules: Vec<TerrainRule>,
}

impl TerrainRules {
    #[must_use]
    pub fn new(rules: Vec<TerrainRule>) -> Self {
        Self { rules }
    }

    /// Стандартный приоритет: вода, русла, рельеф, пустыня, долины, низины, биом.
    #[must_use]
    pub fn standard() -> Self {
        use TerrainKind as T;
        use TerrainOutcome::{FromBiome, Fixed};

        let mut estuary = TerrainRule::tags("estuary", TagSet::OCEAN, Fixed(T::Estuary));
        estuary.river = Some(RiverRole::Mouth);
        let mut channel = TerrainRule::tags("river", TagSet::empty(), Fixed(T::River));
        channel.river = Some(RiverRole::Channel);
        let mut wet_lowlands = TerrainRule::tags("wet_lowlands", TagSet::LOWLANDS, Fixed(T::Marsh));
        wet_lowlands.wet_biome = true;

        Self::new(vec![
            estuary,
            TerrainRule::tags("ocean", TagSet::OCEAN, Fixed(T::Ocean)),
            TerrainRule::tags("lake", TagSet::LAKE, Fixed(T::Lake)),
            channel,
            TerrainRule::tags("mountain", TagSet::MOUNTAIN, Fixed(T::Mountain)),
            TerrainRule::tags("foothills", TagSet::FOOTHILLS, Fixed(T::Highlands)),
            TerrainRule::tags("central_desert", TagSet::CENTRAL_DESERT, Fixed(T::DesertDunes)),
            TerrainRule::tags("scrubland", TagSet::SCRUBLAND, Fixed(T::Scrublands)),
            TerrainRule::tags(
                "valley",
                TagSet::WINDWARD | TagSet::LEEWARD,
                Fixed(T::Plains),
            ),
            wet_lowlands,
            TerrainRule::tags("lowlands", TagSet::LOWLANDS, Fixed(T::Plains)),
            TerrainRule::tags("biome", TagSet::empty(), FromBiome),
        ])
    }

    #[must_use]
    pub fn rules(&self) -> &[TerrainRule] {
        &self.rules
    }

    /// Тип местности тайла. Всегда определён: без совпадений — травы.
    #[must_use]
    pub fn resolve(&self, tile: &TileRecord) -> TerrainKind {
        match self.rules.iter().find(|rule| rule.matches(tile)) {
            Some(TerrainRule {
                outcome: TerrainOutcome::Fixed(kind),
                ..
            }) => *kind,
            Some(TerrainRule {
                outcome: TerrainOutcome::FromBiome,
                ..
            }) => tile.biome.map_or(TerrainKind::Grassland, TerrainKind::from_biome),
            None => TerrainKind::Grassland,
        }
    }
}

impl Default for TerrainRules {
    fn default() -> Self {
        Self::standard()
    }
}

/// Пишет `terrain_type` каждому тайлу и возвращает сводку по типам.
pub fn resolve_terrain(grid: &mut GridStore, rules: &TerrainRules) -> BTreeMap<TerrainKind, usize> {
    let mut summary = BTreeMap::new();
    for (_, tile) in grid.iter_mut() {
        let kind = rules.resolve(tile);
        tile.terrain_type = Some(kind);
        *summary.entry(kind).or_insert(0) += 1;
    }
    tracing::info!(
        target: "hexmapgen::terrain",
        kinds = summary.len(),
        "типы местности назначены"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rivers::RiverSegment;

    fn tile(tags: TagSet) -> TileRecord {
        let mut t = TileRecord::default();
        t.tag(tags);
        t
    }

    fn with_river(mut t: TileRecord, role: RiverRole) -> TileRecord {
        t.river = Some(RiverSegment {
            id: 0,
            role,
            outflow: None,
            edges: 0,
            flow: 1,
        });
        t
    }

    #[test]
    fn mouth_on_ocean_is_an_estuary() {
        let rules = TerrainRules::standard();
        let ocean = tile(TagSet::OCEAN | TagSet::COASTLINE);
        assert_eq!(rules.resolve(&ocean), TerrainKind::Ocean);
        assert_eq!(
            rules.resolve(&with_river(ocean, RiverRole::Mouth)),
            TerrainKind::Estuary
        );
    }

    #[test]
    fn channel_beats_mountain_but_not_lake() {
        let rules = TerrainRules::standard();
        let mountain = with_river(tile(TagSet::MOUNTAIN), RiverRole::Channel);
        assert_eq!(rules.resolve(&mountain), TerrainKind::River);
        let lake = with_river(tile(TagSet::LAKE), RiverRole::End);
        assert_eq!(rules.resolve(&lake), TerrainKind::Lake);
        let source = with_river(tile(TagSet::MOUNTAIN), RiverRole::Source);
        assert_eq!(rules.resolve(&source), TerrainKind::Mountain);
    }

    #[test]
    fn lowlands_depend_on_wetness() {
        let rules = TerrainRules::standard();
        let mut wet = tile(TagSet::LOWLANDS);
        wet.biome = Some(BiomeKind::Rainforest);
        assert_eq!(rules.resolve(&wet), TerrainKind::Marsh);
        let mut dry = tile(TagSet::LOWLANDS);
        dry.biome = Some(BiomeKind::Grassland);
        assert_eq!(rules.resolve(&dry), TerrainKind::Plains);
    }

    #[test]
    fn biome_decides_when_no_tag_rule_fires() {
        let rules = TerrainRules::standard();
        for biome in BiomeKind::ALL {
            let mut t = tile(TagSet::LANDMASS);
            t.biome = Some(biome);
            assert_eq!(rules.resolve(&t), TerrainKind::from_biome(biome));
        }
        assert_eq!(rules.resolve(&TileRecord::default()), TerrainKind::Grassland);
    }

    #[test]
    fn empty_rule_list_still_resolves() {
        let rules = TerrainRules::new(Vec::new());
        assert_eq!(rules.resolve(&tile(TagSet::OCEAN)), TerrainKind::Grassland);
    }

    #[test]
    fn resolution_is_total_over_tag_combinations() {
        let rules = TerrainRules::standard();
        let flags: Vec<TagSet> = TagSet::all().iter().collect();
        for mask in 0u32..(1 << flags.len()) {
            let mut tags = TagSet::empty();
            for (i, f) in flags.iter().enumerate() {
                if mask & (1 << i) != 0 {
                    tags |= *f;
                }
            }
            let t = tile(tags);
            assert_eq!(rules.resolve(&t), rules.resolve(&t.clone()));
        }
    }
}
