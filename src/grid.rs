//! Хранилище тайлов карты
//!
//! [`GridStore`] владеет всеми [`TileRecord`] карты и знает только о
//! хранении и соседстве, без логики генерации. Каждое поле записи
//! заполняется ровно одной стадией конвейера (см. [`crate::pipeline::Stage`]).

use crate::biome::BiomeKind;
use crate::error::{MapgenError, Result};
use crate::hex::{self, Axial, HexDirection};
use crate::rivers::RiverSegment;
use crate::tags::TagSet;
use crate::terrain::TerrainKind;
use std::collections::VecDeque;

/// Данные одного тайла.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TileRecord {
    pub region: u32,
    pub distance_from_center: f32,
    pub distance_from_ocean: f32,
    pub monsoon_band: u32,
    pub distance_from_spine: Option<f32>,
    pub distance_from_mountain: Option<f32>,
    tags: TagSet,
    pub elevation: f32,
    pub river: Option<RiverSegment>,
    pub shoreline_bitmask: Option<u8>,
    pub biome: Option<BiomeKind>,
    pub terrain_type: Option<TerrainKind>,
}

impl TileRecord {
    #[must_use]
    pub fn tags(&self) -> TagSet {
        self.tags
    }

    #[must_use]
    pub fn has(&self, tags: TagSet) -> bool {
        self.tags.contains(tags)
    }

    /// Добавляет теги. Снять тег нельзя.
    pub fn tag(&mut self, tags: TagSet) {
        self.tags.insert(tags);
    }
}

/// Тайлы шестиугольной карты радиуса `radius` в плотном векторе.
#[derive(Debug, Clone, PartialEq)]
pub struct GridStore {
    radius: u32,
    coords: Vec<Axial>,
    tiles: Vec<TileRecord>,
    row_offsets: Vec<usize>,
}

impl GridStore {
    /// Создаёт все записи карты одним пакетом.
    #[must_use]
    pub fn new(radius: u32) -> Self {
        let coords = hex::hexagon(radius);
        let r_max = radius as i32;
        let mut row_offsets = Vec::with_capacity(2 * radius as usize + 1);
        let mut offset = 0;
        for r in -r_max..=r_max {
            row_offsets.push(offset);
            let q_min = (-r_max).max(-r - r_max);
            let q_max = r_max.min(-r + r_max);
            offset += (q_max - q_min + 1) as usize;
        }
        Self {
            radius,
            tiles: vec![TileRecord::default(); coords.len()],
            coords,
            row_offsets,
        }
    }

    #[must_use]
    pub fn radius(&self) -> u32 {
        self.radius
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    #[must_use]
    pub fn contains(&self, coord: Axial) -> bool {
        coord.ring() <= self.radius
    }

    /// Плотный индекс тайла, `None` за пределами радиуса.
    #[must_use]
    pub fn index(&self, coord: Axial) -> Option<usize> {
        if !self.contains(coord) {
            return None;
        }
        let r_max = self.radius as i32;
        let row = (coord.r + r_max) as usize;
        let q_min = (-r_max).max(-coord.r - r_max);
        Some(self.row_offsets[row] + (coord.q - q_min) as usize)
    }

    fn checked_index(&self, coord: Axial) -> Result<usize> {
        self.index(coord).ok_or(MapgenError::OutOfBounds {
            q: coord.q,
            r: coord.r,
            radius: self.radius,
        })
    }

    pub fn get(&self, coord: Axial) -> Result<&TileRecord> {
        let idx = self.checked_index(coord)?;
        Ok(&self.tiles[idx])
    }

    pub fn get_mut(&mut self, coord: Axial) -> Result<&mut TileRecord> {
        let idx = self.checked_index(coord)?;
        Ok(&mut self.tiles[idx])
    }

    pub fn set(&mut self, coord: Axial, record: TileRecord) -> Result<()> {
        let idx = self.checked_index(coord)?;
        self.tiles[idx] = record;
        Ok(())
    }

    pub fn add_tags(&mut self, coord: Axial, tags: TagSet) -> Result<()> {
        self.get_mut(coord)?.tag(tags);
        Ok(())
    }

    /// Шесть соседей в фиксированном порядке направлений (включая внешние).
    #[must_use]
    pub fn neighbors(&self, coord: Axial) -> [Axial; 6] {
        coord.neighbors()
    }

    /// Соседи внутри карты вместе с направлением на них.
    pub fn neighbors_in_bounds(
        &self,
        coord: Axial,
    ) -> impl Iterator<Item = (HexDirection, Axial)> + '_ {
        HexDirection::ALL
            .into_iter()
            .map(move |d| (d, coord.neighbor(d)))
            .filter(move |&(_, n)| self.contains(n))
    }

    /// Все координаты в детерминированном порядке: по `r`, затем по `q`.
    #[must_use]
    pub fn all_coordinates(&self) -> &[Axial] {
        &self.coords
    }

    pub fn iter(&self) -> impl Iterator<Item = (Axial, &TileRecord)> {
        self.coords.iter().copied().zip(self.tiles.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Axial, &mut TileRecord)> {
        self.coords.iter().copied().zip(self.tiles.iter_mut())
    }

    /// Тайлы внешнего кольца карты.
    #[must_use]
    pub fn border_coordinates(&self) -> Vec<Axial> {
        hex::ring(Axial::ORIGIN, self.radius)
    }

    /// Многоисточниковый BFS: число шагов до ближайшего источника.
    ///
    /// Расширение идёт только через тайлы, для которых `passable` истинно;
    /// сами источники получают 0. Недостижимые тайлы — `None`.
    /// Результат индексируется как [`GridStore::index`].
    pub fn distance_field<I, F>(&self, sources: I, passable: F) -> Vec<Option<u32>>
    where
        I: IntoIterator<Item = Axial>,
        F: Fn(Axial, &TileRecord) -> bool,
    {
        let mut distances = vec![None; self.tiles.len()];
        let mut queue = VecDeque::new();

        for source in sources {
            if let Some(idx) = self.index(source)
                && distances[idx].is_none()
            {
                distances[idx] = Some(0);
                queue.push_back((source, 0u32));
            }
        }

        while let Some((coord, dist)) = queue.pop_front() {
            for (_, next) in self.neighbors_in_bounds(coord) {
                let Some(idx) = self.index(next) else {
                    continue;
                };
                if distances[idx].is_none() && passable(next, &self.tiles[idx]) {
                    distances[idx] = Some(dist + 1);
                    queue.push_back((next, dist + 1));
                }
            }
        }
        distances
    }

    /// Координаты тайлов, у которых есть все теги `tags`.
    #[must_use]
    pub fn tagged(&self, tags: TagSet) -> Vec<Axial> {
        self.iter()
            .filter(|(_, t)| t.has(tags))
            .map(|(c, _)| c)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_is_dense_and_matches_iteration_order() {
        let grid = GridStore::new(4);
        for (i, &c) in grid.all_coordinates().iter().enumerate() {
            assert_eq!(grid.index(c), Some(i));
        }
        assert_eq!(grid.len(), hex::tile_count(4));
    }

    #[test]
    fn out_of_bounds_access_fails() {
        let mut grid = GridStore::new(2);
        let outside = Axial::new(3, 0);
        assert!(matches!(
            grid.get(outside),
            Err(MapgenError::OutOfBounds { q: 3, r: 0, radius: 2 })
        ));
        assert!(grid.set(outside, TileRecord::default()).is_err());
        assert!(grid.get(Axial::new(2, -2)).is_ok());
    }

    #[test]
    fn tags_accumulate() {
        let mut grid = GridStore::new(1);
        let c = Axial::ORIGIN;
        grid.add_tags(c, TagSet::OCEAN).unwrap();
        grid.add_tags(c, TagSet::COASTLINE).unwrap();
        assert_eq!(grid.get(c).unwrap().tags(), TagSet::OCEAN | TagSet::COASTLINE);
    }

    #[test]
    fn edge_tiles_have_fewer_in_bounds_neighbors() {
        let grid = GridStore::new(2);
        assert_eq!(grid.neighbors_in_bounds(Axial::ORIGIN).count(), 6);
        assert_eq!(grid.neighbors_in_bounds(Axial::new(2, 0)).count(), 4);
        assert_eq!(grid.neighbors_in_bounds(Axial::new(2, -2)).count(), 3);
    }

    #[test]
    fn distance_field_counts_steps_from_nearest_source() {
        let grid = GridStore::new(3);
        let field = grid.distance_field([Axial::ORIGIN], |_, _| true);
        for (c, _) in grid.iter() {
            assert_eq!(field[grid.index(c).unwrap()], Some(c.ring()));
        }
    }

    #[test]
    fn distance_field_respects_passability() {
        let grid = GridStore::new(2);
        let field = grid.distance_field([Axial::ORIGIN], |_, _| false);
        assert_eq!(field.iter().filter(|d| d.is_some()).count(), 1);
    }
}
