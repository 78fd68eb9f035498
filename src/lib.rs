pub mod biome;
pub mod climate;
pub mod config;
pub mod error;
pub mod export;
pub mod grid;
pub mod heightmap;
pub mod hex;
pub mod landmass;
pub mod metrics;
pub mod pipeline;
pub mod region;
pub mod rivers;
pub mod tags;
pub mod terrain;
pub mod tile;

pub use config::{ClimateSettings, RiverSettings, WorldGenerationParams};
pub use error::{DegenerateTerrain, ExportError, MapgenError};
pub use grid::{GridStore, TileRecord};
pub use hex::{Axial, HexDirection};
pub use pipeline::{GeneratedWorld, GenerationHandle, generate_world, spawn_generation};
pub use tags::TagSet;
pub use terrain::TerrainKind;
pub use tile::{TileEntity, TileMap};
