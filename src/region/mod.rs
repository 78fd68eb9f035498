//! Разбиение карты на регионы и под-сиды
//!
//! Каждый тайл принадлежит ближайшему центроиду. Все случайные решения на
//! стадиях суши и высот берутся из генератора региона, в котором лежит тайл.

use crate::error::{ConfigError, Result};
use crate::grid::GridStore;
use crate::hex::Axial;
use fastnoise_lite::{FastNoiseLite, FractalType, NoiseType};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

/// Независимые потоки случайных чисел внутри одного региона.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RngStream {
    Spine = 1,
}

/// Слои шума, каждый со своим производным сидом.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseLayer {
    Landmass = 11,
    Mountains = 12,
    Elevation = 13,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionSeed {
    pub id: u32,
    pub centroid: Axial,
    pub sub_seed: u64,
}

impl RegionSeed {
    /// Свежий генератор для потока `stream`. Сам сид при этом не меняется.
    #[must_use]
    pub fn rng(&self, stream: RngStream) -> ChaCha8Rng {
        let mut rng = ChaCha8Rng::seed_from_u64(self.sub_seed);
        rng.set_stream(stream as u64);
        rng
    }

    /// Фрактальный шум региона. Значения `get_noise_2d` лежат в `[-1, 1]`.
    #[must_use]
    pub fn noise(&self, layer: NoiseLayer, frequency: f32, octaves: i32) -> FastNoiseLite {
        let mut noise = FastNoiseLite::new();
        noise.set_seed(Some(splitmix64(self.sub_seed ^ layer as u64) as i32));
        noise.set_noise_type(Some(NoiseType::OpenSimplex2));
        noise.set_fractal_type(Some(FractalType::FBm));
        noise.set_fractal_octaves(Some(octaves));
        noise.set_frequency(Some(frequency));
        noise
    }
}

/// Результат разбиения: регионы, упорядоченные лексически по центроиду.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionMap {
    pub regions: Vec<RegionSeed>,
}

impl RegionMap {
    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Регион, которому принадлежит тайл.
    pub fn seed_for(&self, grid: &GridStore, coord: Axial) -> Result<&RegionSeed> {
        let id = grid.get(coord)?.region;
        Ok(&self.regions[id as usize])
    }

    /// Шумы всех регионов одного слоя, индекс = id региона.
    #[must_use]
    pub fn noises(&self, layer: NoiseLayer, frequency: f32, octaves: i32) -> Vec<FastNoiseLite> {
        self.regions
            .iter()
            .map(|r| r.noise(layer, frequency, octaves))
            .collect()
    }
}

/// Значение шума в тайле, приведённое к `[0, 1]`.
#[must_use]
pub fn sample_unit(noise: &FastNoiseLite, coord: Axial) -> f32 {
    let (x, y) = coord.to_cartesian();
    (noise.get_noise_2d(x, y) + 1.0) * 0.5
}

/// Под-сид как чистая функция от (мастер-сид, id региона).
#[must_use]
pub fn derive_sub_seed(master_seed: u64, region_id: u32) -> u64 {
    splitmix64(master_seed ^ (u64::from(region_id) + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

/// Выбирает центроиды, назначает каждому тайлу регион и выводит под-сиды.
///
/// Ничьи по расстоянию разрешаются в пользу лексически меньшего центроида.
/// Записывает поле `region` каждого тайла. Число регионов вне `1..=тайлов`
/// считается ошибкой конфигурации.
pub fn seed_regions(master_seed: u64, region_count: u32, grid: &mut GridStore) -> Result<RegionMap> {
    let coords = grid.all_coordinates();
    let count = region_count as usize;
    if count == 0 || count > coords.len() {
        return Err(ConfigError::Invalid(format!(
            "region_count {region_count} must be between 1 and the tile count {}",
            coords.len()
        ))
        .into());
    }

    let mut rng = ChaCha8Rng::seed_from_u64(master_seed);
    let mut centroids: Vec<Axial> = rand::seq::index::sample(&mut rng, coords.len(), count)
        .into_iter()
        .map(|i| coords[i])
        .collect();
    centroids.sort_unstable();

    let regions: Vec<RegionSeed> = centroids
        .iter()
        .enumerate()
        .map(|(id, &centroid)| RegionSeed {
            id: id as u32,
            centroid,
            sub_seed: derive_sub_seed(master_seed, id as u32),
        })
        .collect();

    for (coord, tile) in grid.iter_mut() {
        let mut best = 0;
        let mut best_dist = u32::MAX;
        for region in &regions {
            let d = coord.distance(region.centroid);
            if d < best_dist {
                best_dist = d;
                best = region.id;
            }
        }
        tile.region = best;
    }

    tracing::info!(
        target: "hexmapgen::region",
        regions = regions.len(),
        "регионы размечены"
    );

    Ok(RegionMap { regions })
}
