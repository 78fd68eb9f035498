//! Производные скалярные поля тайлов
//!
//! Расстояние от центра не зависит ни от чего и считается до классификации суши.
//! Расстояние от океана и муссонный пояс считаются только после того, как
//! затопление океаном полностью завершено.

use crate::config::MonsoonSettings;
use crate::grid::GridStore;
use crate::hex::Axial;
use crate::landmass::Spine;
use crate::tags::TagSet;

/// Пишет `distance_from_center`: шаги сетки от `(0, 0)`.
pub fn compute_center_distance(grid: &mut GridStore) {
    for (coord, tile) in grid.iter_mut() {
        tile.distance_from_center = coord.ring() as f32;
    }
}

/// Пишет `distance_from_ocean` и `monsoon_band`.
pub fn compute_ocean_metrics(grid: &mut GridStore, spine: &Spine, monsoon: &MonsoonSettings) {
    let oceans = grid.tagged(TagSet::OCEAN);
    let field = grid.distance_field(oceans.iter().copied(), |_, _| true);
    // Карта связна, а кайма всегда океан, так что сюда попадаем только на пустом наборе
    let unreachable = 2 * grid.radius() + 1;

    let bands = monsoon_bands(grid.all_coordinates(), spine, &monsoon.resolved_boundaries());

    for ((_, tile), (dist, band)) in grid.iter_mut().zip(field.into_iter().zip(bands)) {
        tile.distance_from_ocean = dist.unwrap_or(unreachable) as f32;
        tile.monsoon_band = band;
    }

    tracing::info!(
        target: "hexmapgen::metrics",
        ocean_tiles = oceans.len(),
        bands = monsoon.band_count,
        "расстояние от океана и муссонные пояса посчитаны"
    );
}

/// Пояс каждого тайла по удалённости от оси хребта.
///
/// Ось хребта — прямая от его начала к концу. Удалённость нормируется на
/// максимальную по карте и режется границами `boundaries`: пояс 0 идёт вдоль хребта.
fn monsoon_bands(coords: &[Axial], spine: &Spine, boundaries: &[f32]) -> Vec<u32> {
    let (sx, sy) = spine.start().to_cartesian();
    let (ex, ey) = if spine.len() > 1 {
        spine.end().to_cartesian()
    } else {
        Axial::ORIGIN.to_cartesian()
    };
    let (mut ax, mut ay) = (ex - sx, ey - sy);
    let len = (ax * ax + ay * ay).sqrt();
    if len <= f32::EPSILON {
        (ax, ay) = (1.0, 0.0);
    } else {
        ax /= len;
        ay /= len;
    }
    // Перпендикуляр к оси
    let (px, py) = (-ay, ax);

    let offsets: Vec<f32> = coords
        .iter()
        .map(|c| {
            let (x, y) = c.to_cartesian();
            ((x - sx) * px + (y - sy) * py).abs()
        })
        .collect();
    let max_offset = offsets.iter().copied().fold(0.0f32, f32::max);

    offsets
        .into_iter()
        .map(|o| {
            let norm = if max_offset > 0.0 { o / max_offset } else { 0.0 };
            boundaries.iter().filter(|&&b| norm >= b).count() as u32
        })
        .collect()
}
