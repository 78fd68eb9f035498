//! Диагностическая выгрузка сетки в JSON
//!
//! Объект с ключами `"q,r"`; в каждом тайле все скалярные и перечислимые поля
//! записи, теги списком имён, река вложенным объектом. Вещественные числа
//! округляются до трёх знаков. Ошибка выгрузки не фатальна: вызывающий её
//! логирует и продолжает работу.

use crate::error::ExportError;
use crate::grid::{GridStore, TileRecord};
use serde_json::{Map, Value, json};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

fn round3(v: f32) -> f64 {
    (f64::from(v) * 1000.0).round() / 1000.0
}

#[must_use]
pub fn tile_to_json(record: &TileRecord) -> Value {
    json!({
        "region": record.region,
        "distance_from_center": round3(record.distance_from_center),
        "distance_from_ocean": round3(record.distance_from_ocean),
        "monsoon_band": record.monsoon_band,
        "distance_from_spine": record.distance_from_spine.map(round3),
        "distance_from_mountain": record.distance_from_mountain.map(round3),
        "tags": record.tags().names(),
        "elevation": round3(record.elevation),
        "river": record.river,
        "shoreline_bitmask": record.shoreline_bitmask,
        "biome": record.biome,
        "terrain_type": record.terrain_type,
    })
}

/// Вся сетка одним объектом с ключами `"q,r"`.
#[must_use]
pub fn grid_to_json(grid: &GridStore) -> Value {
    let tiles: Map<String, Value> = grid
        .iter()
        .map(|(coord, record)| (coord.to_string(), tile_to_json(record)))
        .collect();
    Value::Object(tiles)
}

pub fn write_export(grid: &GridStore, path: impl AsRef<Path>) -> Result<(), ExportError> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, &grid_to_json(grid))?;
    writer.flush()?;

    tracing::info!(
        target: "hexmapgen::export",
        path = %path.display(),
        tiles = grid.len(),
        "сетка выгружена"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hex::Axial;
    use crate::tags::TagSet;
    use crate::terrain::TerrainKind;

    #[test]
    fn floats_are_rounded_and_tags_named() {
        let mut grid = GridStore::new(1);
        {
            let tile = grid.get_mut(Axial::ORIGIN).unwrap();
            tile.elevation = 0.123_456;
            tile.terrain_type = Some(TerrainKind::Plains);
            tile.tag(TagSet::LANDMASS | TagSet::LOWLANDS);
        }
        let json = grid_to_json(&grid);
        let origin = &json["0,0"];
        assert_eq!(origin["elevation"], json!(0.123));
        assert_eq!(origin["tags"], json!(["LANDMASS", "LOWLANDS"]));
        assert_eq!(origin["terrain_type"], json!("Plains"));
        assert_eq!(origin["river"], Value::Null);
        assert!(origin.get("type").is_none());
    }

    #[test]
    fn every_tile_is_keyed_by_coordinate() {
        let grid = GridStore::new(2);
        let json = grid_to_json(&grid);
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), grid.len());
        assert!(object.contains_key("-2,0"));
        assert!(object.contains_key("1,-2"));
    }

    #[test]
    fn unwritable_path_is_an_error() {
        let grid = GridStore::new(1);
        let result = write_export(&grid, "/nonexistent-dir/for/export.json");
        assert!(matches!(result, Err(ExportError::Io(_))));
    }
}
