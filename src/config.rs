// src/config.rs
//! Конфигурация генерации мира
//!
//! Этот модуль определяет все параметры, управляющие процедурной генерацией гексагональной карты:
//! - Размер карты, сид, число регионов и ширину океанской каймы
//! - Форму хребта континента и маску суши
//! - Пороги гор, рек и муссонных поясов
//! - Коэффициенты высоты и климата
//!
//! Все структуры поддерживают сериализацию в TOML/JSON; любое поле можно опустить — будет
//! подставлено значение по умолчанию.

use crate::error::ConfigError;
use crate::hex::{self, HexDirection};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Размер гекса в пикселях
///
/// Нужен только потребителям результата (рендеру); сама генерация работает в координатах сетки.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TileSize {
    pub width: u32,
    pub height: u32,
}

impl Default for TileSize {
    fn default() -> Self {
        Self {
            width: 128,
            height: 148,
        }
    }
}

impl TileSize {
    /// Центр гекса в пикселях относительно центра карты.
    #[must_use]
    pub fn pixel_center(self, coord: hex::Axial) -> (f32, f32) {
        let (x, y) = coord.to_cartesian();
        (
            x * self.width as f32 / 3f32.sqrt(),
            y * self.height as f32 / 2.0,
        )
    }
}

/// Параметры хребта континента
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpineSettings {
    /// Максимальное число шагов от края к центру
    pub length: u32,
    /// Вероятность бокового шага вместо шага внутрь (0.0 — прямой хребет)
    pub meander: f32,
}

impl Default for SpineSettings {
    fn default() -> Self {
        Self {
            length: 24,
            meander: 0.3,
        }
    }
}

/// Маска суши: какие тайлы блокируют затопление океаном
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LandmassSettings {
    /// Порог суммарного балла, начиная с которого тайл становится сушей
    pub threshold: f32,
    /// Вес купола (близость к центру карты)
    pub dome_weight: f32,
    /// Вес близости к хребту
    pub spine_weight: f32,
    /// Вес регионального шума
    pub noise_weight: f32,
    pub noise_frequency: f32,
}

impl Default for LandmassSettings {
    fn default() -> Self {
        Self {
            threshold: 0.55,
            dome_weight: 0.6,
            spine_weight: 0.4,
            noise_weight: 0.3,
            noise_frequency: 0.12,
        }
    }
}

/// Горы и производные от них теги
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MountainSettings {
    /// Порог балла горы: `0.5·шум + 0.5·близость к хребту`
    pub threshold: f32,
    /// Скорость затухания близости к хребту с расстоянием
    pub spine_falloff: f32,
    /// Множитель порога при наращивании хребтов (меньше 1 — порог понижается)
    pub range_threshold_factor: f32,
    /// Максимальная длина одного горного хребта в тайлах
    pub max_range_length: u32,
    /// Расстояние от гор, в пределах которого суша считается предгорьем
    pub foothill_distance: u32,
    /// Целевая доля низин среди суши, в процентах
    pub lowlands_percent: f32,
    pub noise_frequency: f32,
}

impl Default for MountainSettings {
    fn default() -> Self {
        Self {
            threshold: 0.72,
            spine_falloff: 0.5,
            range_threshold_factor: 0.8,
            max_range_length: 5,
            foothill_distance: 1,
            lowlands_percent: 15.0,
            noise_frequency: 0.2,
        }
    }
}

/// Коэффициенты высоты
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ElevationSettings {
    pub octaves: i32,
    pub frequency: f32,
    /// K1: надбавка горам
    pub mountain_bonus: f32,
    /// K2: вес купола от центра карты
    pub dome_weight: f32,
    /// K3: понижение океана (даёт отрицательные значения — морское дно)
    pub ocean_depth: f32,
    /// K4: подъём суши по мере удаления от океана
    pub coastal_weight: f32,
    /// Число проходов сглаживания базового шума по соседям
    pub smooth_passes: u32,
}

impl Default for ElevationSettings {
    fn default() -> Self {
        Self {
            octaves: 4,
            frequency: 0.08,
            mountain_bonus: 1.0,
            dome_weight: 0.5,
            ocean_depth: 1.0,
            coastal_weight: 0.6,
            smooth_passes: 1,
        }
    }
}

/// Реки
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RiverSettings {
    /// Квантиль высоты суши, выше которого тайл может стать истоком (0.0–1.0)
    pub source_percentile: f32,
    /// Минимальное расстояние между истоками в шагах
    pub min_source_spacing: u32,
    /// Целевое число рек на 100 тайлов суши
    pub density: f32,
    /// Сколько кандидатов трассировать на каждую итоговую реку
    pub candidates_per_river: f32,
    /// Бюджет шагов одной трассы
    pub max_steps: u32,
}

impl Default for RiverSettings {
    fn default() -> Self {
        Self {
            source_percentile: 0.75,
            min_source_spacing: 2,
            density: 5.0,
            candidates_per_river: 4.0,
            max_steps: 150,
        }
    }
}

/// Муссонные пояса вдоль оси, перпендикулярной хребту
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MonsoonSettings {
    pub band_count: u32,
    /// Границы поясов в долях от 0 до 1 (`band_count - 1` возрастающих значений).
    /// `None` — равномерное деление.
    pub boundaries: Option<Vec<f32>>,
}

impl Default for MonsoonSettings {
    fn default() -> Self {
        Self {
            band_count: 4,
            boundaries: None,
        }
    }
}

impl MonsoonSettings {
    /// Итоговые границы поясов.
    #[must_use]
    pub fn resolved_boundaries(&self) -> Vec<f32> {
        match &self.boundaries {
            Some(b) => b.clone(),
            None => (1..self.band_count)
                .map(|i| i as f32 / self.band_count as f32)
                .collect(),
        }
    }
}

/// Климат: ветер, корзины расстояний и высот
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClimateSettings {
    /// Куда дует преобладающий ветер
    pub wind_direction: HexDirection,
    /// Сколько шагов просматривать вдоль оси ветра в поисках гор
    pub scan_steps: u32,
    /// До этого расстояния от океана включительно тайл считается прибрежным
    pub coastal_distance: u32,
    /// До этого расстояния включительно — ближняя суша, дальше — глубинка
    pub near_distance: u32,
    /// Порог высоты для нагорий
    pub high_elevation: f32,
    /// Порог высоты для альпийского пояса
    pub peak_elevation: f32,
    /// Сколько самых удалённых от океана ярусов становится центральной пустыней.
    /// `None` — `max(1, ⌊√regions⌋)`.
    pub central_desert_steps: Option<u32>,
}

impl Default for ClimateSettings {
    fn default() -> Self {
        Self {
            wind_direction: HexDirection::East,
            scan_steps: 3,
            coastal_distance: 1,
            near_distance: 3,
            high_elevation: 1.3,
            peak_elevation: 1.9,
            central_desert_steps: None,
        }
    }
}

/// Основные параметры генерации мира
///
/// Полная конфигурация для генерации одной карты. Поддерживает загрузку из TOML-файлов.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorldGenerationParams {
    /// Сид генератора случайных чисел (детерминированная генерация)
    pub seed: u64,

    /// Радиус шестиугольной карты в тайлах (по умолчанию 12)
    #[serde(default = "default_radius")]
    pub radius: u32,

    /// Количество регионов со своими под-сидами
    #[serde(default = "default_region_count")]
    pub region_count: u32,

    /// Ширина гарантированной океанской каймы по краю карты
    #[serde(default = "default_border_width")]
    pub border_width: u32,

    #[serde(default)]
    pub tile_size: TileSize,

    #[serde(default)]
    pub spine: SpineSettings,

    #[serde(default)]
    pub landmass: LandmassSettings,

    #[serde(default)]
    pub mountains: MountainSettings,

    #[serde(default)]
    pub elevation: ElevationSettings,

    #[serde(default)]
    pub rivers: RiverSettings,

    #[serde(default)]
    pub monsoon: MonsoonSettings,

    #[serde(default)]
    pub climate: ClimateSettings,
}

fn default_radius() -> u32 {
    12
}
fn default_region_count() -> u32 {
    7
}
fn default_border_width() -> u32 {
    1
}

impl Default for WorldGenerationParams {
    fn default() -> Self {
        Self {
            seed: 0,
            radius: 12,
            region_count: 7,
            border_width: 1,
            tile_size: TileSize::default(),
            spine: SpineSettings::default(),
            landmass: LandmassSettings::default(),
            mountains: MountainSettings::default(),
            elevation: ElevationSettings::default(),
            rivers: RiverSettings::default(),
            monsoon: MonsoonSettings::default(),
            climate: ClimateSettings::default(),
        }
    }
}

impl WorldGenerationParams {
    /// Загружает параметры из TOML-файла
    ///
    /// # Пример
    /// ```toml
    /// # world.toml
    /// seed = 42
    /// radius = 16
    /// region_count = 9
    ///
    /// [rivers]
    /// density = 8.0
    /// ```
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let params: Self = toml::from_str(contents)?;
        params.validate()?;
        Ok(params)
    }

    /// Проверяет согласованность параметров.
    ///
    /// Противоречивая конфигурация — фатальная ошибка: мир из неё не строится.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.radius == 0 {
            return invalid("radius must be at least 1".into());
        }
        if self.border_width == 0 {
            return invalid("border_width must be at least 1: the outer ring is always ocean".into());
        }
        if self.border_width >= self.radius {
            return invalid(format!(
                "border_width {} leaves no interior inside radius {}",
                self.border_width, self.radius
            ));
        }
        let tiles = hex::tile_count(self.radius);
        if self.region_count == 0 || self.region_count as usize > tiles {
            return invalid(format!(
                "region_count {} must be between 1 and the tile count {tiles}",
                self.region_count
            ));
        }
        if self.tile_size.width == 0 || self.tile_size.height == 0 {
            return invalid("tile_size must be non-zero".into());
        }
        if !(0.0..=1.0).contains(&self.spine.meander) {
            return invalid("spine.meander must be within 0.0..=1.0".into());
        }
        if self.landmass.noise_frequency <= 0.0
            || self.mountains.noise_frequency <= 0.0
            || self.elevation.frequency <= 0.0
        {
            return invalid("noise frequencies must be positive".into());
        }
        if self.elevation.octaves < 1 {
            return invalid("elevation.octaves must be at least 1".into());
        }
        if self.mountains.max_range_length == 0 {
            return invalid("mountains.max_range_length must be at least 1".into());
        }
        if !(0.0..=100.0).contains(&self.mountains.lowlands_percent) {
            return invalid("mountains.lowlands_percent must be within 0..=100".into());
        }
        if !(0.0..=1.0).contains(&self.rivers.source_percentile) {
            return invalid("rivers.source_percentile must be within 0.0..=1.0".into());
        }
        if self.rivers.max_steps == 0 {
            return invalid("rivers.max_steps must be at least 1".into());
        }
        if self.rivers.density < 0.0 || self.rivers.candidates_per_river < 1.0 {
            return invalid("rivers.density must be >= 0 and candidates_per_river >= 1".into());
        }
        if self.monsoon.band_count == 0 {
            return invalid("monsoon.band_count must be at least 1".into());
        }
        let boundaries = self.monsoon.resolved_boundaries();
        if boundaries.len() != self.monsoon.band_count as usize - 1 {
            return invalid(format!(
                "monsoon.boundaries needs {} values, got {}",
                self.monsoon.band_count - 1,
                boundaries.len()
            ));
        }
        if boundaries.iter().any(|b| !(0.0..1.0).contains(b) || *b <= 0.0)
            || boundaries.windows(2).any(|w| w[0] >= w[1])
        {
            return invalid("monsoon.boundaries must be ascending values in (0, 1)".into());
        }
        if self.climate.peak_elevation <= self.climate.high_elevation {
            return invalid("climate.peak_elevation must exceed climate.high_elevation".into());
        }
        if self.climate.near_distance < self.climate.coastal_distance {
            return invalid("climate.near_distance must be >= climate.coastal_distance".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        WorldGenerationParams::default().validate().unwrap();
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let params = WorldGenerationParams::from_toml_str(
            r#"
            seed = 42
            radius = 5

            [rivers]
            max_steps = 10
            "#,
        )
        .unwrap();
        assert_eq!(params.seed, 42);
        assert_eq!(params.radius, 5);
        assert_eq!(params.region_count, 7);
        assert_eq!(params.rivers.max_steps, 10);
        assert_eq!(params.rivers.min_source_spacing, 2);
        assert_eq!(params.climate.wind_direction, HexDirection::East);
    }

    #[test]
    fn pixel_centers_follow_tile_size() {
        let size = TileSize::default();
        assert_eq!(size.pixel_center(hex::Axial::ORIGIN), (0.0, 0.0));
        let (x, y) = size.pixel_center(hex::Axial::new(1, 0));
        assert!((x - 128.0).abs() < 1e-3 && y.abs() < 1e-3);
        let (_, y) = size.pixel_center(hex::Axial::new(0, 2));
        assert!((y - 222.0).abs() < 1e-3);
    }

    #[test]
    fn missing_ocean_border_is_rejected() {
        let params = WorldGenerationParams {
            border_width: 0,
            ..Default::default()
        };
        assert!(matches!(params.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn border_swallowing_the_map_is_rejected() {
        let params = WorldGenerationParams {
            radius: 3,
            border_width: 3,
            ..Default::default()
        };
        assert!(matches!(params.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn monsoon_boundaries_must_match_band_count() {
        let mut params = WorldGenerationParams::default();
        params.monsoon = MonsoonSettings {
            band_count: 3,
            boundaries: Some(vec![0.5]),
        };
        assert!(params.validate().is_err());

        params.monsoon.boundaries = Some(vec![0.6, 0.3]);
        assert!(params.validate().is_err());

        params.monsoon.boundaries = Some(vec![0.3, 0.6]);
        params.validate().unwrap();
    }

    #[test]
    fn default_boundaries_split_evenly() {
        let monsoon = MonsoonSettings {
            band_count: 4,
            boundaries: None,
        };
        assert_eq!(monsoon.resolved_boundaries(), vec![0.25, 0.5, 0.75]);
    }

    #[test]
    fn too_many_regions_is_rejected() {
        let params = WorldGenerationParams {
            radius: 1,
            region_count: 8,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }
}
