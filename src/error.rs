//! Ошибки генерации
//!
//! Фатальные ошибки ([`MapgenError`]) прерывают конвейер и пробрасываются через `?`.
//! [`DegenerateTerrain`] — нефатальная диагностика гидрологии: река просто
//! помечается концом, генерация продолжается. [`ExportError`] перехватывается
//! вызывающей стороной и только логируется.

use crate::hex::Axial;
use std::{io, path::PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MapgenError {
    /// Обращение за пределы радиуса карты.
    #[error("coordinate ({q}, {r}) is outside map radius {radius}")]
    OutOfBounds { q: i32, r: i32, radius: u32 },

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Противоречивые пороги не оставили на карте ни одного тайла суши.
    #[error("no land tiles remain after ocean flood-fill")]
    NoLand,

    #[error("invalid stage order: {0}")]
    StageOrder(String),

    /// Фоновый поток завершился, не отправив результат.
    #[error("generation worker terminated without producing a world")]
    WorkerLost,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write export: {0}")]
    Io(#[from] io::Error),

    #[error("failed to serialize export: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Причина досрочной остановки реки.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegenerateReason {
    /// Нет соседа строго ниже — замкнутая котловина.
    ClosedBasin,
    /// Трасса вернулась в уже посещённый тайл.
    Cycle,
    /// Исчерпан бюджет шагов трассировки.
    StepBudget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("river {river} ended at {coord}: {reason:?}")]
pub struct DegenerateTerrain {
    pub river: u32,
    pub coord: Axial,
    pub reason: DegenerateReason,
}

pub type Result<T, E = MapgenError> = std::result::Result<T, E>;
