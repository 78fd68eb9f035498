//! Наветренные и подветренные склоны
//!
//! Ветер дует в направлении [`ClimateSettings::wind_direction`]. Если гора
//! стоит дальше по ветру, воздух упирается в неё над тайлом, и тайл наветренный.
//! Если гора стоит против ветра, тайл в её дождевой тени, то есть подветренный.
//! Тайл между двумя горами получает оба тега (долина).

use crate::config::ClimateSettings;
use crate::error::Result;
use crate::grid::GridStore;
use crate::hex::{Axial, HexDirection};
use crate::tags::TagSet;
use serde::Serialize;

/// Положение тайла относительно гор и ветра.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Exposure {
    Neutral,
    Windward,
    Leeward,
    /// Горы с обеих сторон
    Valley,
}

impl Exposure {
    pub const ALL: [Exposure; 4] = [
        Exposure::Neutral,
        Exposure::Windward,
        Exposure::Leeward,
        Exposure::Valley,
    ];

    #[must_use]
    pub fn from_flags(windward: bool, leeward: bool) -> Self {
        match (windward, leeward) {
            (true, true) => Exposure::Valley,
            (true, false) => Exposure::Windward,
            (false, true) => Exposure::Leeward,
            (false, false) => Exposure::Neutral,
        }
    }

    /// Восстанавливает положение по уже выставленным тегам.
    #[must_use]
    pub fn from_tags(tags: TagSet) -> Self {
        Self::from_flags(tags.contains(TagSet::WINDWARD), tags.contains(TagSet::LEEWARD))
    }

    #[must_use]
    pub fn tags(self) -> TagSet {
        match self {
            Exposure::Neutral => TagSet::empty(),
            Exposure::Windward => TagSet::WINDWARD,
            Exposure::Leeward => TagSet::LEEWARD,
            Exposure::Valley => TagSet::WINDWARD | TagSet::LEEWARD,
        }
    }
}

/// Есть ли гора в пределах `steps` шагов от `coord` в направлении `direction`.
fn mountain_along(grid: &GridStore, coord: Axial, direction: HexDirection, steps: u32) -> bool {
    let mut current = coord;
    for _ in 0..steps {
        current = current.neighbor(direction);
        match grid.get(current) {
            Ok(tile) if tile.has(TagSet::MOUNTAIN) => return true,
            Ok(_) => {}
            Err(_) => return false,
        }
    }
    false
}

/// Выставляет `WINDWARD`/`LEEWARD` на сухой суше, кроме самих гор.
pub fn tag_exposure(grid: &mut GridStore, settings: &ClimateSettings) -> Result<[usize; 4]> {
    let wind = settings.wind_direction;
    let mut exposures = Vec::new();
    for (coord, tile) in grid.iter() {
        let tags = tile.tags();
        if !tags.is_dry_land() || tags.contains(TagSet::MOUNTAIN) {
            continue;
        }
        let exposure = Exposure::from_flags(
            mountain_along(grid, coord, wind, settings.scan_steps),
            mountain_along(grid, coord, wind.opposite(), settings.scan_steps),
        );
        if exposure != Exposure::Neutral {
            exposures.push((coord, exposure));
        }
    }

    let mut counts = [0usize; 4];
    for (coord, exposure) in exposures {
        grid.add_tags(coord, exposure.tags())?;
        counts[exposure as usize] += 1;
    }

    tracing::info!(
        target: "hexmapgen::climate",
        wind = wind.short_name(),
        windward = counts[Exposure::Windward as usize],
        leeward = counts[Exposure::Leeward as usize],
        valleys = counts[Exposure::Valley as usize],
        "склоны размечены"
    );
    Ok(counts)
}
