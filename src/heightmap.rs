//! Высоты тайлов
//!
//! Базовый фрактальный шум региона плюс поправки от уже размеченных тегов:
//! надбавка горам, купол к центру карты, понижение океана и подъём суши
//! вглубь материка. Результат не ограничивается сверху и снизу.

use crate::config::ElevationSettings;
use crate::grid::GridStore;
use crate::region::{self, NoiseLayer, RegionMap};
use crate::tags::TagSet;

/// Диапазон получившихся высот.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElevationRange {
    pub min: f32,
    pub max: f32,
}

/// Пишет `elevation` каждого тайла.
///
/// Читает `MOUNTAIN`, `OCEAN`, `distance_from_center` и `distance_from_ocean`,
/// поэтому запускается после классификации суши и метрик океана.
pub fn generate_elevation(
    grid: &mut GridStore,
    regions: &RegionMap,
    settings: &ElevationSettings,
) -> ElevationRange {
    // === 1. Базовый шум региона ===
    let noises = regions.noises(NoiseLayer::Elevation, settings.frequency, settings.octaves);
    let mut base: Vec<f32> = grid
        .iter()
        .map(|(coord, tile)| region::sample_unit(&noises[tile.region as usize], coord))
        .collect();

    // === 2. Сглаживание по соседям ===
    for _ in 0..settings.smooth_passes {
        base = smooth_hex(grid, &base);
    }

    // === 3. Поправки от тегов и расстояний ===
    let max_center = grid.radius().max(1) as f32;
    let max_ocean = grid
        .iter()
        .map(|(_, t)| t.distance_from_ocean)
        .fold(0.0f32, f32::max)
        .max(1.0);

    let mut range = ElevationRange {
        min: f32::INFINITY,
        max: f32::NEG_INFINITY,
    };
    for ((_, tile), b) in grid.iter_mut().zip(base) {
        let mountain = if tile.has(TagSet::MOUNTAIN) { 1.0 } else { 0.0 };
        let ocean = if tile.has(TagSet::OCEAN) { 1.0 } else { 0.0 };
        let dome = 1.0 - tile.distance_from_center / max_center;
        let inland = tile.distance_from_ocean / max_ocean;

        tile.elevation = b + settings.mountain_bonus * mountain + settings.dome_weight * dome
            - settings.ocean_depth * ocean
            + settings.coastal_weight * inland;

        range.min = range.min.min(tile.elevation);
        range.max = range.max.max(tile.elevation);
    }

    tracing::info!(
        target: "hexmapgen::elevation",
        min = range.min,
        max = range.max,
        smooth_passes = settings.smooth_passes,
        "высоты посчитаны"
    );
    range
}

/// Один проход усреднения: тайл и его соседи внутри карты.
fn smooth_hex(grid: &GridStore, values: &[f32]) -> Vec<f32> {
    grid.all_coordinates()
        .iter()
        .zip(values)
        .map(|(&coord, &own)| {
            let mut sum = own;
            let mut count = 1.0;
            for (_, n) in grid.neighbors_in_bounds(coord) {
                if let Some(idx) = grid.index(n) {
                    sum += values[idx];
                    count += 1.0;
                }
            }
            sum / count
        })
        .collect()
}
