//! Конвейер генерации мира
//!
//! Стадии идут строго в порядке [`Stage::ORDER`] по одной общей сетке.
//! Каждая стадия объявляет поля, которые читает и пишет; перед запуском
//! (в отладочных сборках) порядок проверяется графом зависимостей.
//! [`spawn_generation`] запускает весь конвейер в отдельном потоке и
//! отдаёт результат через канал на одно сообщение.

use crate::biome::{self, BiomeReport};
use crate::config::WorldGenerationParams;
use crate::error::{MapgenError, Result};
use crate::grid::GridStore;
use crate::heightmap::{self, ElevationRange};
use crate::landmass::{self, LandmassReport};
use crate::metrics;
use crate::region::{self, RegionMap};
use crate::rivers::{self, HydrologyReport};
use crate::terrain::{self, TerrainKind, TerrainRules};
use crate::tile::{self, TileMap};
use crossbeam_channel::{Receiver, TryRecvError};
use petgraph::algo::toposort;
use petgraph::graph::DiGraph;
use std::collections::{BTreeMap, HashMap};
use std::thread;
use std::time::Instant;

/// Поле данных, которое стадия читает или пишет.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Region,
    DistanceFromCenter,
    DistanceFromOcean,
    MonsoonBand,
    DistanceFromSpine,
    DistanceFromMountain,
    Tags,
    Elevation,
    River,
    ShorelineBitmask,
    Biome,
    TerrainType,
    Entities,
}

/// Как стадия пишет поле.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Единственный писатель поля
    Write,
    /// Только добавляет (теги); писателей может быть несколько
    Append,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Regions,
    CenterMetrics,
    Landmass,
    OceanMetrics,
    Elevation,
    Hydrology,
    Shoreline,
    Biome,
    Terrain,
    Entities,
}

impl Stage {
    pub const ORDER: [Stage; 10] = [
        Stage::Regions,
        Stage::CenterMetrics,
        Stage::Landmass,
        Stage::OceanMetrics,
        Stage::Elevation,
        Stage::Hydrology,
        Stage::Shoreline,
        Stage::Biome,
        Stage::Terrain,
        Stage::Entities,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Stage::Regions => "regions",
            Stage::CenterMetrics => "center_metrics",
            Stage::Landmass => "landmass",
            Stage::OceanMetrics => "ocean_metrics",
            Stage::Elevation => "elevation",
            Stage::Hydrology => "hydrology",
            Stage::Shoreline => "shoreline",
            Stage::Biome => "biome",
            Stage::Terrain => "terrain",
            Stage::Entities => "entities",
        }
    }

    #[must_use]
    pub const fn reads(self) -> &'static [Field] {
        use Field as F;
        match self {
            Stage::Regions | Stage::CenterMetrics => &[],
            Stage::Landmass => &[F::Region],
            Stage::OceanMetrics | Stage::Shoreline => &[F::Tags],
            Stage::Elevation => &[F::Region, F::Tags, F::DistanceFromCenter, F::DistanceFromOcean],
            Stage::Hydrology => &[F::Tags, F::Elevation],
            Stage::Biome => &[F::Tags, F::Elevation, F::DistanceFromOcean, F::MonsoonBand],
            Stage::Terrain => &[F::Tags, F::Biome, F::River],
            Stage::Entities => &[F::TerrainType, F::River, F::ShorelineBitmask],
        }
    }

    #[must_use]
    pub const fn writes(self) -> &'static [(Field, Access)] {
        use Access::{Append, Write};
        use Field as F;
        match self {
            Stage::Regions => &[(F::Region, Write)],
            Stage::CenterMetrics => &[(F::DistanceFromCenter, Write)],
            Stage::Landmass => &[
                (F::DistanceFromSpine, Write),
                (F::DistanceFromMountain, Write),
                (F::Tags, Append),
            ],
            Stage::OceanMetrics => &[(F::DistanceFromOcean, Write), (F::MonsoonBand, Write)],
            Stage::Elevation => &[(F::Elevation, Write)],
            Stage::Hydrology => &[(F::River, Write), (F::Tags, Append)],
            Stage::Shoreline => &[(F::ShorelineBitmask, Write)],
            Stage::Biome => &[(F::Biome, Write), (F::Tags, Append)],
            Stage::Terrain => &[(F::TerrainType, Write)],
            Stage::Entities => &[(F::Entities, Write)],
        }
    }
}

/// Проверяет стандартный порядок стадий.
pub fn validate_stage_order() -> Result<()> {
    validate_order(&Stage::ORDER)
}

/// Проверяет, что порядок `stages` согласован с их чтениями и записями.
///
/// Граф: рёбра расписания (стадия i → i+1) плюс рёбра данных писатель → читатель.
/// Читатель, стоящий раньше писателя, даёт цикл. Для полей `Append` читателю
/// достаточно одного писателя перед ним, и рёбра идут только от таких писателей.
pub fn validate_order(stages: &[Stage]) -> Result<()> {
    let mut graph = DiGraph::<Stage, Option<Field>>::new();
    let nodes: Vec<_> = stages.iter().map(|&s| graph.add_node(s)).collect();
    for w in nodes.windows(2) {
        graph.add_edge(w[0], w[1], None);
    }

    let mut writers: HashMap<Field, Vec<(usize, Access)>> = HashMap::new();
    for (i, stage) in stages.iter().enumerate() {
        for &(field, access) in stage.writes() {
            writers.entry(field).or_default().push((i, access));
        }
    }

    for (field, list) in &writers {
        let exclusive = list.iter().filter(|(_, a)| *a == Access::Write).count();
        if exclusive > 1 || (exclusive == 1 && list.len() > 1) {
            return Err(MapgenError::StageOrder(format!(
                "{field:?} has {} writers, but an exclusive field allows only one",
                list.len()
            )));
        }
    }

    for (reader, stage) in stages.iter().enumerate() {
        for &field in stage.reads() {
            let Some(list) = writers.get(&field) else {
                return Err(MapgenError::StageOrder(format!(
                    "{} reads {field:?}, which no stage writes",
                    stage.name()
                )));
            };
            let appended = list.iter().all(|&(_, a)| a == Access::Append);
            if appended && !list.iter().any(|&(w, _)| w < reader) {
                return Err(MapgenError::StageOrder(format!(
                    "{} reads {field:?} before any stage appends to it",
                    stage.name()
                )));
            }
            for &(writer, access) in list {
                if writer == reader || (access == Access::Append && writer > reader) {
                    continue;
                }
                graph.add_edge(nodes[writer], nodes[reader], Some(field));
            }
        }
    }

    toposort(&graph, None).map_err(|cycle| {
        MapgenError::StageOrder(format!(
            "stage {} depends on data produced after it",
            graph[cycle.node_id()].name()
        ))
    })?;
    Ok(())
}

/// Сводка по всем стадиям.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationReport {
    pub seed: u64,
    pub radius: u32,
    pub regions: RegionMap,
    pub landmass: LandmassReport,
    pub elevation: ElevationRange,
    pub hydrology: HydrologyReport,
    pub shoreline_tiles: usize,
    pub biomes: BiomeReport,
    pub terrain: BTreeMap<TerrainKind, usize>,
}

/// Готовый мир: тайлы для рендера, исходная сетка и сводка.
#[derive(Debug, Clone)]
pub struct GeneratedWorld {
    pub tiles: TileMap,
    pub grid: GridStore,
    pub report: GenerationReport,
}

fn timed<T>(stage: Stage, run: impl FnOnce() -> T) -> T {
    let _span = tracing::info_span!("stage", name = stage.name()).entered();
    let started = Instant::now();
    let out = run();
    tracing::debug!(
        target: "hexmapgen::pipeline",
        stage = stage.name(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "стадия завершена"
    );
    out
}

/// Синхронно прогоняет все стадии.
pub fn generate_world(params: &WorldGenerationParams) -> Result<GeneratedWorld> {
    params.validate()?;
    if cfg!(debug_assertions) {
        validate_stage_order()?;
    }

    tracing::info!(
        target: "hexmapgen::pipeline",
        seed = params.seed,
        radius = params.radius,
        regions = params.region_count,
        "генерация мира"
    );

    let mut grid = GridStore::new(params.radius);
    let regions = timed(Stage::Regions, || {
        region::seed_regions(params.seed, params.region_count, &mut grid)
    })?;
    timed(Stage::CenterMetrics, || metrics::compute_center_distance(&mut grid));
    let landmass = timed(Stage::Landmass, || {
        landmass::classify_landmass(&mut grid, &regions, params)
    })?;
    timed(Stage::OceanMetrics, || {
        metrics::compute_ocean_metrics(&mut grid, &landmass.spine, &params.monsoon);
    });
    let elevation = timed(Stage::Elevation, || {
        heightmap::generate_elevation(&mut grid, &regions, &params.elevation)
    });
    let hydrology = timed(Stage::Hydrology, || rivers::generate_rivers(&mut grid, &params.rivers))?;
    let shoreline_tiles = timed(Stage::Shoreline, || rivers::resolve_shoreline_bitmasks(&mut grid))?;
    let biomes = timed(Stage::Biome, || biome::classify_biomes(&mut grid, params))?;
    let terrain = timed(Stage::Terrain, || {
        terrain::resolve_terrain(&mut grid, &TerrainRules::standard())
    });
    let tiles = timed(Stage::Entities, || tile::create_tile_entities(&grid));

    Ok(GeneratedWorld {
        tiles,
        grid,
        report: GenerationReport {
            seed: params.seed,
            radius: params.radius,
            regions,
            landmass,
            elevation,
            hydrology,
            shoreline_tiles,
            biomes,
            terrain,
        },
    })
}

/// Ожидание результата фоновой генерации.
#[derive(Debug)]
pub struct GenerationHandle {
    receiver: Receiver<Result<GeneratedWorld>>,
    taken: bool,
}

impl GenerationHandle {
    /// Неблокирующая проверка, удобна раз в кадр. Результат отдаётся один раз.
    pub fn try_take(&mut self) -> Option<Result<GeneratedWorld>> {
        if self.taken {
            return None;
        }
        match self.receiver.try_recv() {
            Ok(result) => {
                self.taken = true;
                Some(result)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.taken = true;
                Some(Err(MapgenError::WorkerLost))
            }
        }
    }

    /// Блокирует до готовности мира.
    pub fn wait(self) -> Result<GeneratedWorld> {
        if self.taken {
            return Err(MapgenError::WorkerLost);
        }
        self.receiver.recv().unwrap_or(Err(MapgenError::WorkerLost))
    }
}

/// Запускает генерацию в отдельном потоке.
#[must_use]
pub fn spawn_generation(params: WorldGenerationParams) -> GenerationHandle {
    let (sender, receiver) = crossbeam_channel::bounded(1);
    let spawned = thread::Builder::new()
        .name("hexmapgen-worker".into())
        .spawn(move || {
            let result = generate_world(&params);
            if let Err(err) = &result {
                tracing::error!(target: "hexmapgen::pipeline", %err, "генерация не удалась");
            }
            // Получатель мог уже уйти, тогда результат просто никому не нужен
            let _ = sender.send(result);
        });
    if let Err(err) = spawned {
        tracing::error!(target: "hexmapgen::pipeline", %err, "не удалось запустить поток генерации");
    }
    GenerationHandle {
        receiver,
        taken: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_params(seed: u64) -> WorldGenerationParams {
        WorldGenerationParams {
            seed,
            radius: 6,
            region_count: 3,
            ..Default::default()
        }
    }

    #[test]
    fn standard_order_is_consistent() {
        validate_stage_order().unwrap();
    }

    #[test]
    fn reading_before_writing_is_rejected() {
        let mut order = Stage::ORDER.to_vec();
        order.swap(2, 4); // высоты раньше суши
        assert!(matches!(validate_order(&order), Err(MapgenError::StageOrder(_))));
    }

    #[test]
    fn two_exclusive_writers_are_rejected() {
        let mut order = Stage::ORDER.to_vec();
        order.push(Stage::Terrain);
        assert!(matches!(validate_order(&order), Err(MapgenError::StageOrder(_))));
    }

    #[test]
    fn missing_writer_is_rejected() {
        assert!(validate_order(&[Stage::Landmass]).is_err());
    }

    #[test]
    fn invalid_config_is_fatal() {
        let params = WorldGenerationParams {
            radius: 2,
            border_width: 2,
            ..Default::default()
        };
        assert!(matches!(generate_world(&params), Err(MapgenError::Config(_))));
    }

    #[test]
    fn background_generation_delivers_once() {
        let mut handle = spawn_generation(small_params(3));
        let world = loop {
            if let Some(result) = handle.try_take() {
                break result.unwrap();
            }
            thread::yield_now();
        };
        assert_eq!(world.tiles.len(), world.grid.len());
        assert!(handle.try_take().is_none());
    }

    #[test]
    fn wait_matches_synchronous_run() {
        let background = spawn_generation(small_params(11)).wait().unwrap();
        let direct = generate_world(&small_params(11)).unwrap();
        assert_eq!(background.tiles, direct.tiles);
        assert_eq!(background.grid, direct.grid);
    }
}
