//! Классификация суши: хребет, океан, побережье, горы
//!
//! Порядок внутри стадии фиксирован:
//! 1. хребет континента от внутреннего края к центру;
//! 2. маска суши (купол + близость к хребту + шум региона);
//! 3. затопление океаном от каймы, непрозатопленные карманы становятся озёрами;
//! 4. побережье (`COASTLINE` на воде, `SHORE` на суше);
//! 5. горы и наращивание одиночных гор в хребты;
//! 6. расстояние до гор, предгорья и низины.

use crate::config::{MountainSettings, WorldGenerationParams};
use crate::error::{MapgenError, Result};
use crate::grid::GridStore;
use crate::hex::{self, Axial};
use crate::region::{self, NoiseLayer, RegionMap, RngStream};
use crate::tags::TagSet;
use rand::Rng;
use std::collections::{BTreeMap, HashSet};

/// Путь хребта континента от внутреннего края карты к центру.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spine {
    tiles: Vec<Axial>,
}

impl Spine {
    #[must_use]
    pub fn new(tiles: Vec<Axial>) -> Self {
        Self { tiles }
    }

    #[must_use]
    pub fn tiles(&self) -> &[Axial] {
        &self.tiles
    }

    /// Первый тайл хребта. Для пустого хребта — центр карты.
    #[must_use]
    pub fn start(&self) -> Axial {
        self.tiles.first().copied().unwrap_or(Axial::ORIGIN)
    }

    #[must_use]
    pub fn end(&self) -> Axial {
        self.tiles.last().copied().unwrap_or(Axial::ORIGIN)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

/// Итоги стадии суши.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmassReport {
    pub spine: Spine,
    pub land_tiles: usize,
    pub ocean_tiles: usize,
    pub lake_tiles: usize,
    pub mountain_tiles: usize,
    /// Сколько тайлов добавило наращивание хребтов
    pub annexed_mountains: usize,
}

pub fn classify_landmass(
    grid: &mut GridStore,
    regions: &RegionMap,
    params: &WorldGenerationParams,
) -> Result<LandmassReport> {
    let spine = trace_spine(grid, regions, params)?;
    for &c in spine.tiles() {
        grid.add_tags(c, TagSet::SPINE | TagSet::LANDMASS)?;
    }

    let spine_field = grid.distance_field(spine.tiles().iter().copied(), |_, _| true);
    for ((_, tile), d) in grid.iter_mut().zip(&spine_field) {
        tile.distance_from_spine = d.map(|d| d as f32);
    }

    mark_land_forming(grid, regions, params)?;
    let (ocean_tiles, lake_tiles) = flood_ocean(grid)?;
    tag_coastline(grid)?;

    let scores = mountain_scores(grid, regions, &params.mountains);
    let initial = tag_mountains(grid, &scores, params.mountains.threshold);
    let annexed = sculpt_mountain_ranges(grid, &scores, &params.mountains)?;
    tag_mountain_surroundings(grid, &params.mountains)?;

    let land_tiles = grid.iter().filter(|(_, t)| t.tags().is_dry_land()).count();
    let report = LandmassReport {
        spine,
        land_tiles,
        ocean_tiles,
        lake_tiles,
        mountain_tiles: initial + annexed,
        annexed_mountains: annexed,
    };

    tracing::info!(
        target: "hexmapgen::landmass",
        spine = report.spine.len(),
        land = report.land_tiles,
        ocean = report.ocean_tiles,
        lakes = report.lake_tiles,
        mountains = report.mountain_tiles,
        annexed = report.annexed_mountains,
        "суша классифицирована"
    );

    Ok(report)
}

/// Прокладывает хребет. Генератор берётся у региона, которому принадлежит центр карты.
fn trace_spine(
    grid: &GridStore,
    regions: &RegionMap,
    params: &WorldGenerationParams,
) -> Result<Spine> {
    let interior = params.radius.saturating_sub(params.border_width);
    let owner = regions.seed_for(grid, Axial::ORIGIN)?;
    let mut rng = owner.rng(RngStream::Spine);

    let start_ring = hex::ring(Axial::ORIGIN, interior);
    let mut current = start_ring[rng.gen_range(0..start_ring.len())];
    let mut tiles = vec![current];
    let mut visited: HashSet<Axial> = HashSet::from([current]);

    for _ in 0..params.spine.length {
        let ring = current.ring();
        if ring == 0 {
            break;
        }
        let inward: Vec<Axial> = current
            .neighbors()
            .into_iter()
            .filter(|n| n.ring() < ring)
            .collect();
        let sideways: Vec<Axial> = current
            .neighbors()
            .into_iter()
            .filter(|n| n.ring() == ring && !visited.contains(n))
            .collect();

        let pool = if !sideways.is_empty() && rng.gen_bool(f64::from(params.spine.meander)) {
            &sideways
        } else {
            &inward
        };
        current = pool[rng.gen_range(0..pool.len())];
        visited.insert(current);
        tiles.push(current);
    }

    Ok(Spine::new(tiles))
}

/// Тайлы, блокирующие затопление. Кайма шириной `border_width` сушей не бывает.
fn mark_land_forming(
    grid: &mut GridStore,
    regions: &RegionMap,
    params: &WorldGenerationParams,
) -> Result<()> {
    let settings = &params.landmass;
    let noises = regions.noises(NoiseLayer::Landmass, settings.noise_frequency, 3);
    let interior = params.radius - params.border_width;
    let radius = params.radius as f32;

    let mut land = Vec::new();
    for (coord, tile) in grid.iter() {
        if coord.ring() > interior || tile.has(TagSet::LANDMASS) {
            continue;
        }
        let dome = 1.0 - coord.ring() as f32 / radius;
        let spine = tile.distance_from_spine.map_or(0.0, |d| 1.0 / (1.0 + d));
        let noise = region::sample_unit(&noises[tile.region as usize], coord);
        let score = settings.dome_weight * dome
            + settings.spine_weight * spine
            + settings.noise_weight * noise;
        if score >= settings.threshold {
            land.push(coord);
        }
    }

    for c in land {
        grid.add_tags(c, TagSet::LANDMASS)?;
    }
    Ok(())
}

/// BFS от каймы через тайлы без `LANDMASS`. Возвращает (океан, озёра).
///
/// Сушеобразующие тайлы каймы затопление не начинают.
fn flood_ocean(grid: &mut GridStore) -> Result<(usize, usize)> {
    let border: Vec<Axial> = grid
        .border_coordinates()
        .into_iter()
        .filter(|&c| grid.get(c).is_ok_and(|t| !t.has(TagSet::LANDMASS)))
        .collect();
    let field = grid.distance_field(border, |_, t| !t.has(TagSet::LANDMASS));

    let mut ocean = 0;
    let mut lakes = 0;
    for ((_, tile), reached) in grid.iter_mut().zip(&field) {
        if reached.is_some() {
            tile.tag(TagSet::OCEAN);
            ocean += 1;
        } else if !tile.has(TagSet::LANDMASS) {
            // Вода, до которой океан не дотянулся
            tile.tag(TagSet::LAKE);
            lakes += 1;
        }
    }

    if ocean == grid.len() {
        return Err(MapgenError::NoLand);
    }
    Ok((ocean, lakes))
}

fn tag_coastline(grid: &mut GridStore) -> Result<()> {
    let mut coastline = Vec::new();
    let mut shore = Vec::new();
    for (coord, tile) in grid.iter() {
        let ocean = tile.has(TagSet::OCEAN);
        let mixed = grid
            .neighbors_in_bounds(coord)
            .any(|(_, n)| grid.get(n).is_ok_and(|t| t.has(TagSet::OCEAN) != ocean));
        if mixed {
            if ocean {
                coastline.push(coord);
            } else {
                shore.push(coord);
            }
        }
    }

    for c in coastline {
        grid.add_tags(c, TagSet::COASTLINE)?;
    }
    for c in shore {
        grid.add_tags(c, TagSet::SHORE)?;
    }
    Ok(())
}

/// Суша, где могут стоять горы: не вода и не берег.
fn mountain_eligible(tags: TagSet) -> bool {
    tags.is_dry_land() && !tags.contains(TagSet::SHORE)
}

/// Балл горы для каждого тайла (по индексу сетки); 0 для неподходящих.
fn mountain_scores(grid: &GridStore, regions: &RegionMap, settings: &MountainSettings) -> Vec<f32> {
    let noises = regions.noises(NoiseLayer::Mountains, settings.noise_frequency, 2);
    grid.iter()
        .map(|(coord, tile)| {
            if !mountain_eligible(tile.tags()) {
                return 0.0;
            }
            let noise = region::sample_unit(&noises[tile.region as usize], coord);
            let proximity = tile
                .distance_from_spine
                .map_or(0.0, |d| 1.0 / (1.0 + d * settings.spine_falloff));
            0.5 * noise + 0.5 * proximity
        })
        .collect()
}

fn tag_mountains(grid: &mut GridStore, scores: &[f32], threshold: f32) -> usize {
    let mut count = 0;
    for ((_, tile), &score) in grid.iter_mut().zip(scores) {
        if mountain_eligible(tile.tags()) && score >= threshold {
            tile.tag(TagSet::MOUNTAIN);
            count += 1;
        }
    }
    count
}

fn is_mountain(grid: &GridStore, coord: Axial) -> bool {
    grid.get(coord).is_ok_and(|t| t.has(TagSet::MOUNTAIN))
}

/// Наращивает одиночные горы в хребты.
///
/// Каждая гора без соседей-гор (в лексическом порядке) жадно присоединяет
/// лучшего по баллу подходящего соседа с баллом не ниже
/// `threshold · range_threshold_factor`, пока хребет не достигнет
/// `max_range_length` тайлов. Возвращает число присоединённых тайлов.
pub fn sculpt_mountain_ranges(
    grid: &mut GridStore,
    scores: &[f32],
    settings: &MountainSettings,
) -> Result<usize> {
    let lowered = settings.threshold * settings.range_threshold_factor;

    let mut isolated: Vec<Axial> = grid
        .tagged(TagSet::MOUNTAIN)
        .into_iter()
        .filter(|&c| !grid.neighbors_in_bounds(c).any(|(_, n)| is_mountain(grid, n)))
        .collect();
    isolated.sort_unstable();

    let mut annexed = 0;
    for seed in isolated {
        // Предыдущий хребет мог дорасти до этой горы
        if grid.neighbors_in_bounds(seed).any(|(_, n)| is_mountain(grid, n)) {
            continue;
        }
        let mut current = seed;
        let mut length = 1;
        while length < settings.max_range_length {
            let mut best: Option<(Axial, f32)> = None;
            for (_, n) in grid.neighbors_in_bounds(current) {
                let Some(idx) = grid.index(n) else { continue };
                let tags = grid.get(n)?.tags();
                if tags.contains(TagSet::MOUNTAIN) || !mountain_eligible(tags) {
                    continue;
                }
                let score = scores[idx];
                if score >= lowered && best.is_none_or(|(_, s)| score > s) {
                    best = Some((n, score));
                }
            }
            let Some((next, _)) = best else { break };
            grid.add_tags(next, TagSet::MOUNTAIN)?;
            current = next;
            length += 1;
            annexed += 1;
        }
    }

    tracing::debug!(
        target: "hexmapgen::landmass",
        annexed,
        threshold = lowered,
        "хребты наращены"
    );
    Ok(annexed)
}

/// `distance_from_mountain`, `FOOTHILLS` и `LOWLANDS`.
fn tag_mountain_surroundings(grid: &mut GridStore, settings: &MountainSettings) -> Result<()> {
    let mountains = grid.tagged(TagSet::MOUNTAIN);
    if mountains.is_empty() {
        return Ok(());
    }
    let field = grid.distance_field(mountains, |_, _| true);
    for ((_, tile), d) in grid.iter_mut().zip(&field) {
        tile.distance_from_mountain = d.map(|d| d as f32);
    }

    // Ярусы суши по расстоянию до гор
    let mut tiers: BTreeMap<u32, Vec<Axial>> = BTreeMap::new();
    let mut land = 0usize;
    for ((coord, tile), d) in grid.iter().zip(&field) {
        if !tile.tags().is_dry_land() {
            continue;
        }
        land += 1;
        if let Some(d) = *d
            && d > 0
        {
            tiers.entry(d).or_default().push(coord);
        }
    }

    let foothills: Vec<Axial> = tiers
        .iter()
        .take_while(|&(&d, _)| d <= settings.foothill_distance)
        .flat_map(|(_, tiles)| tiles.iter().copied())
        .collect();
    for c in foothills {
        grid.add_tags(c, TagSet::FOOTHILLS)?;
    }

    let target = (land as f32 * settings.lowlands_percent / 100.0).round() as usize;
    let lowland_tiers = farthest_tiers(&tiers, target);
    for d in &lowland_tiers {
        for &c in &tiers[d] {
            grid.add_tags(c, TagSet::LOWLANDS)?;
        }
    }
    Ok(())
}

/// Самые дальние ярусы, суммарный размер которых ближе всего к `target`.
fn farthest_tiers(tiers: &BTreeMap<u32, Vec<Axial>>, target: usize) -> Vec<u32> {
    if target == 0 {
        return Vec::new();
    }
    let mut best_count = 0;
    let mut best_error = target;
    let mut cumulative = 0;
    for (i, tiles) in tiers.values().rev().enumerate() {
        cumulative += tiles.len();
        let error = cumulative.abs_diff(target);
        if error < best_error {
            best_error = error;
            best_count = i + 1;
        }
    }
    tiers.keys().rev().take(best_count).copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::seed_regions;

    fn classified(seed: u64, radius: u32) -> (GridStore, LandmassReport) {
        let params = WorldGenerationParams {
            seed,
            radius,
            region_count: 3,
            ..Default::default()
        };
        let mut grid = GridStore::new(radius);
        let regions = seed_regions(seed, params.region_count, &mut grid).unwrap();
        let report = classify_landmass(&mut grid, &regions, &params).unwrap();
        (grid, report)
    }

    #[test]
    fn spine_is_connected_and_stays_inside_border() {
        let (grid, report) = classified(42, 8);
        let tiles = report.spine.tiles();
        assert!(!tiles.is_empty());
        assert_eq!(tiles[0].ring(), 7);
        for w in tiles.windows(2) {
            assert_eq!(w[0].distance(w[1]), 1);
        }
        for &c in tiles {
            assert!(c.ring() < 8);
            let tags = grid.get(c).unwrap().tags();
            assert!(tags.contains(TagSet::SPINE | TagSet::LANDMASS));
            assert!(!tags.is_ocean());
        }
    }

    #[test]
    fn straight_spine_walks_to_center() {
        let params = WorldGenerationParams {
            seed: 9,
            radius: 6,
            region_count: 1,
            spine: crate::config::SpineSettings {
                length: 20,
                meander: 0.0,
            },
            ..Default::default()
        };
        let mut grid = GridStore::new(6);
        let regions = seed_regions(9, 1, &mut grid).unwrap();
        let spine = trace_spine(&grid, &regions, &params).unwrap();
        assert_eq!(spine.len(), 6);
        assert_eq!(spine.end(), Axial::ORIGIN);
    }

    #[test]
    fn border_is_always_ocean() {
        for seed in [1, 2, 3, 42] {
            let (grid, _) = classified(seed, 6);
            for c in grid.border_coordinates() {
                assert!(grid.get(c).unwrap().has(TagSet::OCEAN), "seed {seed}, {c}");
            }
        }
    }

    #[test]
    fn coastline_and_shore_face_each_other() {
        let (grid, _) = classified(5, 7);
        for (coord, tile) in grid.iter() {
            let ocean_neighbor = grid
                .neighbors_in_bounds(coord)
                .any(|(_, n)| grid.get(n).unwrap().has(TagSet::OCEAN));
            let land_neighbor = grid
                .neighbors_in_bounds(coord)
                .any(|(_, n)| !grid.get(n).unwrap().has(TagSet::OCEAN));
            if tile.has(TagSet::OCEAN) {
                assert_eq!(tile.has(TagSet::COASTLINE), land_neighbor);
                assert!(!tile.has(TagSet::SHORE));
            } else {
                assert_eq!(tile.has(TagSet::SHORE), ocean_neighbor);
                assert!(!tile.has(TagSet::COASTLINE));
            }
        }
    }

    #[test]
    fn mountains_never_touch_water() {
        let (grid, report) = classified(17, 9);
        assert_eq!(grid.tagged(TagSet::MOUNTAIN).len(), report.mountain_tiles);
        for c in grid.tagged(TagSet::MOUNTAIN) {
            let tags = grid.get(c).unwrap().tags();
            assert!(tags.is_dry_land());
            assert!(!tags.contains(TagSet::SHORE));
        }
    }

    #[test]
    fn lake_pockets_are_enclosed_by_land() {
        let mut grid = GridStore::new(3);
        for c in hex::ring(Axial::ORIGIN, 1) {
            grid.add_tags(c, TagSet::LANDMASS).unwrap();
        }
        let (ocean, lakes) = flood_ocean(&mut grid).unwrap();
        assert_eq!(lakes, 1);
        assert_eq!(ocean, grid.len() - 7);
        assert!(grid.get(Axial::ORIGIN).unwrap().has(TagSet::LAKE));
    }

    #[test]
    fn land_on_the_border_is_not_flooded() {
        let mut grid = GridStore::new(3);
        let edge = Axial::new(3, 0);
        grid.add_tags(edge, TagSet::SPINE | TagSet::LANDMASS).unwrap();
        let (ocean, lakes) = flood_ocean(&mut grid).unwrap();
        assert_eq!((ocean, lakes), (grid.len() - 1, 0));
        let tags = grid.get(edge).unwrap().tags();
        assert!(tags.contains(TagSet::SPINE));
        assert!(!tags.contains(TagSet::OCEAN));
    }

    #[test]
    fn flooding_everything_is_fatal() {
        let mut grid = GridStore::new(2);
        assert!(matches!(flood_ocean(&mut grid), Err(MapgenError::NoLand)));
    }

    #[test]
    fn lone_mountain_grows_into_a_range() {
        let mut grid = GridStore::new(3);
        for (_, tile) in grid.iter_mut() {
            tile.tag(TagSet::LANDMASS);
        }
        grid.add_tags(Axial::ORIGIN, TagSet::MOUNTAIN).unwrap();
        let mut scores = vec![0.0; grid.len()];
        // Дорожка из подходящих тайлов на восток
        for q in 1..=3 {
            scores[grid.index(Axial::new(q, 0)).unwrap()] = 0.7;
        }
        let settings = MountainSettings {
            threshold: 0.8,
            range_threshold_factor: 0.8,
            max_range_length: 3,
            ..Default::default()
        };
        let annexed = sculpt_mountain_ranges(&mut grid, &scores, &settings).unwrap();
        assert_eq!(annexed, 2);
        assert!(grid.get(Axial::new(2, 0)).unwrap().has(TagSet::MOUNTAIN));
        assert!(!grid.get(Axial::new(3, 0)).unwrap().has(TagSet::MOUNTAIN));
    }

    #[test]
    fn lowlands_take_the_farthest_tiers() {
        let mut tiers = BTreeMap::new();
        tiers.insert(1, vec![Axial::new(0, 0); 10]);
        tiers.insert(2, vec![Axial::new(0, 0); 6]);
        tiers.insert(3, vec![Axial::new(0, 0); 3]);
        assert_eq!(farthest_tiers(&tiers, 3), vec![3]);
        assert_eq!(farthest_tiers(&tiers, 8), vec![3, 2]);
        assert!(farthest_tiers(&tiers, 0).is_empty());
    }

    #[test]
    fn foothills_surround_mountains() {
        let (grid, _) = classified(23, 9);
        for c in grid.tagged(TagSet::FOOTHILLS) {
            let tile = grid.get(c).unwrap();
            assert_eq!(tile.distance_from_mountain, Some(1.0));
            assert!(!tile.has(TagSet::MOUNTAIN));
        }
    }
}
