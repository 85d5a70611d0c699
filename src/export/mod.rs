//! Выгрузка готовой карты: строки JSON, PNG биомов и рельеф.
//!
//! Экспортёры только читают граф и ничего в нём не достраивают.

pub mod json;
pub mod png;
pub mod relief;

use thiserror::Error;

use crate::graph::{Graph, Point};
use crate::map::Stage;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// Экспортёру передан граф, не прошедший все этапы
    #[error("map is incomplete: {0}")]
    Incomplete(String),
}

/// Граф можно выгружать только после этапа биомов
pub(crate) fn ensure_complete(graph: &Graph) -> Result<(), ExportError> {
    match graph.stage() {
        Some(Stage::Biomes) => Ok(()),
        stage => Err(ExportError::Incomplete(format!(
            "graph is at stage {:?}, biomes are required",
            stage.map(Stage::name)
        ))),
    }
}

/// Рамка долготы и широты, в которую растягивается единичный квадрат
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoFrame {
    pub max_lat: f64,
    pub max_lng: f64,
}

impl Default for GeoFrame {
    fn default() -> Self {
        Self {
            max_lat: 60.0,
            max_lng: 120.0,
        }
    }
}

impl GeoFrame {
    /// `[lng, lat]` точки; центр квадрата попадает в `(0, 0)`
    #[must_use]
    pub fn to_lnglat(&self, point: Point) -> [f64; 2] {
        [
            self.max_lng * point.x - self.max_lng / 2.0,
            self.max_lat * point.y - self.max_lat / 2.0,
        ]
    }
}
