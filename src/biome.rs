use serde::{Deserialize, Serialize};

use crate::error::MapError;
use crate::graph::Graph;
use crate::map::Stage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Biome {
    Ocean,
    Lake,
    Beach,
    Snow,
    Tundra,
    Bare,
    Scorched,
    Taiga,
    Shrubland,
    TemperateDesert,
    TemperateRainForest,
    TemperateDeciduousForest,
    Grassland,
    TropicalRainForest,
    TropicalSeasonalForest,
    SubtropicalDesert,
}

impl Biome {
    pub fn to_rgb(&self) -> [u8; 3] {
        match self {
            Biome::Ocean => [68, 68, 122],
            Biome::Lake => [51, 102, 153],
            Biome::Beach => [160, 144, 119],
            Biome::Snow => [255, 255, 255],
            Biome::Tundra => [187, 187, 170],
            Biome::Bare => [136, 136, 136],
            Biome::Scorched => [85, 85, 85],
            Biome::Taiga => [153, 170, 119],
            Biome::Shrubland => [136, 153, 119],
            Biome::TemperateDesert => [201, 210, 155],
            Biome::TemperateRainForest => [68, 136, 85],
            Biome::TemperateDeciduousForest => [103, 148, 89],
            Biome::Grassland => [136, 170, 85],
            Biome::TropicalRainForest => [51, 119, 85],
            Biome::TropicalSeasonalForest => [85, 153, 68],
            Biome::SubtropicalDesert => [210, 185, 139],
        }
    }
}

/// Таблица биомов суши: строки по поясам высоты снизу вверх, столбцы по шестым долям влажности
const BIOME_TABLE: [[Biome; 6]; 4] = {
    use Biome::{
        Bare, Grassland, Scorched, Shrubland, Snow, SubtropicalDesert, Taiga, TemperateDeciduousForest,
        TemperateDesert, TemperateRainForest, TropicalRainForest, TropicalSeasonalForest, Tundra,
    };
    [
        [
            SubtropicalDesert,
            Grassland,
            TropicalSeasonalForest,
            TropicalSeasonalForest,
            TropicalRainForest,
            TropicalRainForest,
        ],
        [
            TemperateDesert,
            Grassland,
            Grassland,
            TemperateDeciduousForest,
            TemperateDeciduousForest,
            TemperateRainForest,
        ],
        [TemperateDesert, TemperateDesert, Shrubland, Shrubland, Taiga, Taiga],
        [Scorched, Bare, Tundra, Snow, Snow, Snow],
    ]
};

fn elevation_band(elevation: f64) -> usize {
    if elevation < 0.3 {
        0
    } else if elevation < 0.6 {
        1
    } else if elevation < 0.8 {
        2
    } else {
        3
    }
}

fn moisture_band(moisture: f64) -> usize {
    ((moisture.clamp(0.0, 1.0) * 6.0) as usize).min(5)
}

/// Биом суши по высоте и влажности
#[must_use]
pub fn land_biome(elevation: f64, moisture: f64) -> Biome {
    BIOME_TABLE[elevation_band(elevation)][moisture_band(moisture)]
}

/// Назначает биомы всем центрам. Вода минует таблицу: океан и озёра помечаются напрямую.
pub fn assign_biomes(graph: &mut Graph) -> Result<(), MapError> {
    graph.require(Stage::Rivers)?;

    for center in &mut graph.centers {
        center.biome = Some(if center.ocean {
            Biome::Ocean
        } else if center.water {
            Biome::Lake
        } else if center.coast {
            Biome::Beach
        } else {
            land_biome(center.elevation, center.moisture)
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_corners_of_the_table() {
        assert_eq!(land_biome(0.1, 0.0), Biome::SubtropicalDesert);
        assert_eq!(land_biome(0.1, 1.0), Biome::TropicalRainForest);
        assert_eq!(land_biome(0.95, 0.0), Biome::Scorched);
        assert_eq!(land_biome(0.95, 0.9), Biome::Snow);
        assert_eq!(land_biome(0.45, 0.9), Biome::TemperateRainForest);
        assert_eq!(land_biome(0.7, 0.7), Biome::Taiga);
    }

    #[test]
    fn bands_clamp_out_of_range_values() {
        assert_eq!(moisture_band(-0.5), 0);
        assert_eq!(moisture_band(1.0), 5);
        assert_eq!(moisture_band(7.0), 5);
        assert_eq!(elevation_band(2.0), 3);
    }
}
