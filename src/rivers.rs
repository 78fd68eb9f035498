//! Гидрология: истоки, трассировка рек вниз по склону, маски берега
//!
//! Река шагает на самого низкого соседа, который строго ниже текущего тайла,
//! поэтому подъём и циклы невозможны по построению. Трасса кончается устьем
//! (шаг в океан), озером или вырожденно: котловина, повторный визит или
//! исчерпанный бюджет шагов. Вырожденные концы не фатальны и попадают в
//! [`HydrologyReport`].

use crate::config::RiverSettings;
use crate::error::{DegenerateReason, DegenerateTerrain, Result};
use crate::grid::GridStore;
use crate::hex::{Axial, HexDirection};
use crate::tags::TagSet;
use serde::Serialize;
use std::collections::HashSet;

/// Роль тайла в реке.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RiverRole {
    Source,
    Channel,
    /// Последний тайл реки, уже в океане.
    Mouth,
    /// Река кончилась на суше.
    End,
}

impl RiverRole {
    /// При слиянии рек побеждает больший ранг.
    fn rank(self) -> u8 {
        match self {
            RiverRole::Source => 0,
            RiverRole::Channel => 1,
            RiverRole::Mouth | RiverRole::End => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiverSegment {
    /// Первая река, прошедшая через тайл
    pub id: u32,
    pub role: RiverRole,
    /// Куда вода уходит с тайла
    pub outflow: Option<HexDirection>,
    /// Биты втекающих и вытекающих рёбер
    pub edges: u8,
    /// Накопленный объём
    pub flow: u32,
}

/// Чем закончилась трасса.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TraceEnd {
    Mouth,
    Lake,
    Degenerate(DegenerateReason),
}

#[derive(Debug, Clone)]
struct Trace {
    path: Vec<Axial>,
    end: TraceEnd,
}

impl Trace {
    /// Вес при отборе: озёрные концы чуть ценнее.
    fn weight(&self) -> usize {
        self.path.len() + usize::from(self.end == TraceEnd::Lake)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HydrologyReport {
    pub rivers: usize,
    pub candidates: usize,
    pub mouths: usize,
    pub lakes: usize,
    pub degenerate: Vec<DegenerateTerrain>,
}

/// Трассирует реки и пишет поле `river`; концы в котловинах и озёрах получают `LAKE`.
pub fn generate_rivers(grid: &mut GridStore, settings: &RiverSettings) -> Result<HydrologyReport> {
    let land = grid.iter().filter(|(_, t)| t.tags().is_dry_land()).count();
    let target = ((land as f32 * settings.density / 100.0) as usize).max(1);
    let limit = ((target as f32 * settings.candidates_per_river).ceil() as usize).max(target);

    let sources = select_sources(grid, settings, limit);
    let mut traces = Vec::with_capacity(sources.len());
    for &source in &sources {
        let trace = trace_river(grid, source, settings.max_steps)?;
        if trace.path.len() > 1 {
            traces.push(trace);
        }
    }

    // === Отбор: самые длинные трассы, стабильно ===
    traces.sort_by(|a, b| b.weight().cmp(&a.weight()));
    traces.truncate(target);

    let mut report = HydrologyReport {
        candidates: sources.len(),
        rivers: traces.len(),
        ..Default::default()
    };

    for (id, trace) in traces.iter().enumerate() {
        let id = id as u32;
        write_trace(grid, id, trace)?;

        let last = trace.path[trace.path.len() - 1];
        match trace.end {
            TraceEnd::Mouth => report.mouths += 1,
            TraceEnd::Lake => {
                grid.add_tags(last, TagSet::LAKE)?;
                report.lakes += 1;
            }
            TraceEnd::Degenerate(reason) => {
                let entry = DegenerateTerrain {
                    river: id,
                    coord: last,
                    reason,
                };
                match reason {
                    DegenerateReason::StepBudget => {
                        tracing::warn!(target: "hexmapgen::hydrology", %entry, "бюджет шагов исчерпан");
                    }
                    DegenerateReason::ClosedBasin | DegenerateReason::Cycle => {
                        tracing::debug!(target: "hexmapgen::hydrology", %entry, "река кончилась в котловине");
                    }
                }
                if reason == DegenerateReason::ClosedBasin {
                    grid.add_tags(last, TagSet::LAKE)?;
                    report.lakes += 1;
                }
                report.degenerate.push(entry);
            }
        }
    }

    tracing::info!(
        target: "hexmapgen::hydrology",
        rivers = report.rivers,
        candidates = report.candidates,
        mouths = report.mouths,
        lakes = report.lakes,
        degenerate = report.degenerate.len(),
        "реки проложены"
    );
    Ok(report)
}

/// Тайл, с которого может начаться река: сухая суша не у берега.
fn can_be_source(tags: TagSet) -> bool {
    tags.is_dry_land() && !tags.contains(TagSet::SHORE)
}

/// Истоки: высокие тайлы выше квантиля, от высшего к низшему, с разрежением.
fn select_sources(grid: &GridStore, settings: &RiverSettings, limit: usize) -> Vec<Axial> {
    let mut candidates: Vec<(Axial, f32)> = grid
        .iter()
        .filter(|(_, t)| can_be_source(t.tags()))
        .map(|(c, t)| (c, t.elevation))
        .collect();
    if candidates.is_empty() {
        return Vec::new();
    }

    let mut heights: Vec<f32> = candidates.iter().map(|&(_, h)| h).collect();
    heights.sort_by(f32::total_cmp);
    let rank = (settings.source_percentile * (heights.len() - 1) as f32).floor() as usize;
    let threshold = heights[rank.min(heights.len() - 1)];

    candidates.retain(|&(_, h)| h >= threshold);
    candidates.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut chosen: Vec<Axial> = Vec::new();
    for (coord, _) in candidates {
        if chosen.len() >= limit {
            break;
        }
        if chosen
            .iter()
            .all(|c| c.distance(coord) >= settings.min_source_spacing)
        {
            chosen.push(coord);
        }
    }
    chosen
}

/// Самый низкий сосед строго ниже `coord`; ничьи по порядку направлений.
fn lowest_neighbor(grid: &GridStore, coord: Axial, elevation: f32) -> Result<Option<Axial>> {
    let mut best: Option<(Axial, f32)> = None;
    for (_, n) in grid.neighbors_in_bounds(coord) {
        let h = grid.get(n)?.elevation;
        if h < elevation && best.is_none_or(|(_, bh)| h < bh) {
            best = Some((n, h));
        }
    }
    Ok(best.map(|(c, _)| c))
}

fn trace_river(grid: &GridStore, source: Axial, max_steps: u32) -> Result<Trace> {
    let mut path = vec![source];
    let mut visited: HashSet<Axial> = HashSet::from([source]);
    let mut current = source;

    for _ in 0..max_steps {
        let elevation = grid.get(current)?.elevation;
        let Some(next) = lowest_neighbor(grid, current, elevation)? else {
            return Ok(Trace {
                path,
                end: TraceEnd::Degenerate(DegenerateReason::ClosedBasin),
            });
        };
        if !visited.insert(next) {
            return Ok(Trace {
                path,
                end: TraceEnd::Degenerate(DegenerateReason::Cycle),
            });
        }
        path.push(next);
        let tags = grid.get(next)?.tags();
        if tags.is_ocean() {
            return Ok(Trace {
                path,
                end: TraceEnd::Mouth,
            });
        }
        if tags.contains(TagSet::LAKE) {
            return Ok(Trace {
                path,
                end: TraceEnd::Lake,
            });
        }
        current = next;
    }

    Ok(Trace {
        path,
        end: TraceEnd::Degenerate(DegenerateReason::StepBudget),
    })
}

/// Роль при слиянии: больший ранг, но тайл, с которого вода уходит дальше,
/// концом не становится.
fn merged_role(existing: RiverRole, incoming: RiverRole, outflow: Option<HexDirection>) -> RiverRole {
    let role = if incoming.rank() > existing.rank() {
        incoming
    } else {
        existing
    };
    if role == RiverRole::End && outflow.is_some() {
        RiverRole::Channel
    } else {
        role
    }
}

/// Пишет трассу в сетку, сливаясь с уже проложенными реками.
fn write_trace(grid: &mut GridStore, id: u32, trace: &Trace) -> Result<()> {
    let last = trace.path.len() - 1;
    for (i, &coord) in trace.path.iter().enumerate() {
        let role = if i == last {
            if trace.end == TraceEnd::Mouth {
                RiverRole::Mouth
            } else {
                RiverRole::End
            }
        } else if i == 0 {
            RiverRole::Source
        } else {
            RiverRole::Channel
        };

        let outflow = trace
            .path
            .get(i + 1)
            .and_then(|&next| coord.direction_to(next));
        let inflow = i
            .checked_sub(1)
            .and_then(|p| trace.path[p].direction_to(coord))
            .map(HexDirection::opposite);
        let edges = outflow.map_or(0, HexDirection::bit) | inflow.map_or(0, HexDirection::bit);
        let flow = i as u32 + 1;

        let tile = grid.get_mut(coord)?;
        match &mut tile.river {
            Some(segment) => {
                segment.outflow = segment.outflow.or(outflow);
                segment.role = merged_role(segment.role, role, segment.outflow);
                segment.edges |= edges;
                segment.flow += flow;
            }
            None => {
                tile.river = Some(RiverSegment {
                    id,
                    role,
                    outflow,
                    edges,
                    flow,
                });
            }
        }
    }
    Ok(())
}

/// Маска береговой линии: для не-океанских тайлов с океаном по соседству
/// бит `i` выставлен, если сосед в направлении `i` — океан.
pub fn resolve_shoreline_bitmasks(grid: &mut GridStore) -> Result<usize> {
    let mut masks = Vec::new();
    for (coord, tile) in grid.iter() {
        if tile.has(TagSet::OCEAN) {
            continue;
        }
        let mut mask = 0u8;
        for (direction, n) in grid.neighbors_in_bounds(coord) {
            if grid.get(n)?.has(TagSet::OCEAN) {
                mask |= direction.bit();
            }
        }
        if mask != 0 {
            masks.push((coord, mask));
        }
    }

    let count = masks.len();
    for (coord, mask) in masks {
        grid.get_mut(coord)?.shoreline_bitmask = Some(mask);
    }
    tracing::info!(target: "hexmapgen::hydrology", tiles = count, "маски берега посчитаны");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Сетка-склон: высота растёт с `q`, океан на западной кайме.
    fn slope(radius: u32) -> GridStore {
        let mut grid = GridStore::new(radius);
        for (coord, tile) in grid.iter_mut() {
            tile.elevation = coord.q as f32 + 0.01 * coord.r as f32;
            if coord.q == -(radius as i32) {
                tile.tag(TagSet::OCEAN);
            } else {
                tile.tag(TagSet::LANDMASS);
            }
        }
        grid
    }

    #[test]
    fn river_runs_downhill_into_the_sea() {
        let grid = slope(4);
        let trace = trace_river(&grid, Axial::new(3, 0), 50).unwrap();
        assert_eq!(trace.end, TraceEnd::Mouth);
        for w in trace.path.windows(2) {
            let a = grid.get(w[0]).unwrap().elevation;
            let b = grid.get(w[1]).unwrap().elevation;
            assert!(b < a);
        }
        assert!(grid.get(*trace.path.last().unwrap()).unwrap().has(TagSet::OCEAN));
    }

    #[test]
    fn pit_is_a_closed_basin() {
        let mut grid = slope(3);
        grid.get_mut(Axial::new(1, 0)).unwrap().elevation = -100.0;
        let trace = trace_river(&grid, Axial::new(2, 0), 50).unwrap();
        assert_eq!(trace.path.last(), Some(&Axial::new(1, 0)));
        assert_eq!(trace.end, TraceEnd::Degenerate(DegenerateReason::ClosedBasin));
    }

    #[test]
    fn step_budget_stops_long_rivers() {
        let grid = slope(6);
        let trace = trace_river(&grid, Axial::new(6, -3), 2).unwrap();
        assert_eq!(trace.path.len(), 3);
        assert_eq!(trace.end, TraceEnd::Degenerate(DegenerateReason::StepBudget));
    }

    #[test]
    fn sources_respect_spacing() {
        let grid = slope(6);
        let settings = RiverSettings {
            source_percentile: 0.5,
            min_source_spacing: 3,
            ..Default::default()
        };
        let sources = select_sources(&grid, &settings, 100);
        assert!(!sources.is_empty());
        for (i, a) in sources.iter().enumerate() {
            for b in &sources[i + 1..] {
                assert!(a.distance(*b) >= 3);
            }
        }
    }

    #[test]
    fn confluence_merges_edges_and_keeps_end_roles() {
        let mut grid = GridStore::new(3);
        let a = Trace {
            path: vec![Axial::new(1, -1), Axial::new(0, 0), Axial::new(-1, 0)],
            end: TraceEnd::Mouth,
        };
        let b = Trace {
            path: vec![Axial::new(1, 0), Axial::new(0, 0), Axial::new(-1, 0)],
            end: TraceEnd::Mouth,
        };
        write_trace(&mut grid, 0, &a).unwrap();
        write_trace(&mut grid, 1, &b).unwrap();

        let joint = grid.get(Axial::ORIGIN).unwrap().river.clone().unwrap();
        assert_eq!(joint.id, 0);
        assert_eq!(joint.role, RiverRole::Channel);
        assert_eq!(joint.outflow, Some(HexDirection::West));
        assert_eq!(
            joint.edges,
            HexDirection::West.bit() | HexDirection::NorthEast.bit() | HexDirection::East.bit()
        );
        assert_eq!(joint.flow, 4);

        let mouth = grid.get(Axial::new(-1, 0)).unwrap().river.clone().unwrap();
        assert_eq!(mouth.role, RiverRole::Mouth);
        assert_eq!(mouth.flow, 6);
    }

    #[test]
    fn cut_short_river_does_not_break_a_channel() {
        use crate::terrain::{TerrainKind, TerrainRules};

        let main = Trace {
            path: vec![Axial::new(2, 0), Axial::new(1, 0), Axial::ORIGIN, Axial::new(-1, 0)],
            end: TraceEnd::Mouth,
        };
        let short = Trace {
            path: vec![Axial::new(1, -1), Axial::new(1, 0)],
            end: TraceEnd::Degenerate(DegenerateReason::StepBudget),
        };

        // Порядок записи не должен влиять на результат
        for order in [[&main, &short], [&short, &main]] {
            let mut grid = GridStore::new(3);
            for (id, trace) in order.into_iter().enumerate() {
                write_trace(&mut grid, id as u32, trace).unwrap();
            }
            let tile = grid.get(Axial::new(1, 0)).unwrap();
            let river = tile.river.clone().unwrap();
            assert_eq!(river.role, RiverRole::Channel);
            assert_eq!(river.outflow, Some(HexDirection::West));
            assert_eq!(TerrainRules::standard().resolve(tile), TerrainKind::River);
        }
    }

    #[test]
    fn river_end_without_outflow_stays_an_end() {
        assert_eq!(merged_role(RiverRole::Channel, RiverRole::End, None), RiverRole::End);
        assert_eq!(
            merged_role(RiverRole::Source, RiverRole::End, Some(HexDirection::East)),
            RiverRole::Channel
        );
        assert_eq!(merged_role(RiverRole::Mouth, RiverRole::Channel, None), RiverRole::Mouth);
    }

    #[test]
    fn shoreline_mask_marks_ocean_neighbors() {
        let mut grid = GridStore::new(1);
        grid.add_tags(Axial::new(1, -1), TagSet::OCEAN).unwrap();
        grid.add_tags(Axial::new(-1, 0), TagSet::OCEAN).unwrap();
        resolve_shoreline_bitmasks(&mut grid).unwrap();
        assert_eq!(
            grid.get(Axial::ORIGIN).unwrap().shoreline_bitmask,
            Some(HexDirection::NorthEast.bit() | HexDirection::West.bit())
        );
        assert_eq!(grid.get(Axial::new(1, -1)).unwrap().shoreline_bitmask, None);
    }

    #[test]
    fn generated_channels_never_sit_on_ocean() {
        let mut grid = slope(6);
        let settings = RiverSettings {
            density: 20.0,
            min_source_spacing: 1,
            ..Default::default()
        };
        let report = generate_rivers(&mut grid, &settings).unwrap();
        assert!(report.rivers >= 1);
        for (_, tile) in grid.iter() {
            if let Some(river) = &tile.river
                && tile.has(TagSet::OCEAN)
            {
                assert_eq!(river.role, RiverRole::Mouth);
            }
        }
    }
}
