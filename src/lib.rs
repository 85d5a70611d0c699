pub mod biome;
pub mod config;
pub mod elevation;
pub mod error;
pub mod export;
pub mod graph;
pub mod land;
pub mod map;
pub mod moisture;
pub mod points;
pub mod rivers;
pub mod stats;
pub mod voronoi;

pub use biome::Biome;
pub use config::{
    ElevationSettings, GraphSettings, IslandSettings, MapConfig, MoistureSettings, RiverSettings,
    SamplingSettings,
};
pub use error::MapError;
pub use export::{ExportError, GeoFrame};
pub use graph::{Center, Corner, Edge, Graph, Point};
pub use map::{Map, Stage};
pub use stats::MapStats;
