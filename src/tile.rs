//! Готовые к отрисовке тайлы
//!
//! Из записи сетки остаётся только то, что нужно рендеру: координата, тип
//! местности, река (для рёбер русла) и маска берега. Теги и сырые высоты
//! наружу не попадают.

use crate::grid::{GridStore, TileRecord};
use crate::hex::Axial;
use crate::rivers::RiverSegment;
use crate::terrain::TerrainKind;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TileEntity {
    pub coord: Axial,
    pub terrain_type: TerrainKind,
    pub river: Option<RiverSegment>,
    pub shoreline_bitmask: Option<u8>,
}

/// Тайлы карты, упорядоченные по координате.
pub type TileMap = BTreeMap<Axial, TileEntity>;

/// Тайл без назначенного типа местности становится травами.
#[must_use]
pub fn create_tile_entity(coord: Axial, record: &TileRecord) -> TileEntity {
    TileEntity {
        coord,
        terrain_type: record.terrain_type.unwrap_or(TerrainKind::Grassland),
        river: record.river.clone(),
        shoreline_bitmask: record.shoreline_bitmask,
    }
}

#[must_use]
pub fn create_tile_entities(grid: &GridStore) -> TileMap {
    grid.iter()
        .map(|(coord, record)| (coord, create_tile_entity(coord, record)))
        .collect()
}
