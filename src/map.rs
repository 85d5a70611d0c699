//! Оркестратор генерации: владеет сидом, конфигурацией и графом и прогоняет этапы
//! строго по порядку.

use log::info;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::MapConfig;
use crate::error::MapError;
use crate::graph::{Center, Corner, Edge, Graph, Point};
use crate::{elevation, land, moisture, points, rivers, voronoi};

/// Этапы генерации в порядке выполнения
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
    Points,
    Graph,
    Land,
    Elevation,
    Rivers,
    Biomes,
}

impl Stage {
    pub const ORDER: [Stage; 6] = [
        Stage::Points,
        Stage::Graph,
        Stage::Land,
        Stage::Elevation,
        Stage::Rivers,
        Stage::Biomes,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Stage::Points => "points",
            Stage::Graph => "graph",
            Stage::Land => "land",
            Stage::Elevation => "elevation",
            Stage::Rivers => "rivers",
            Stage::Biomes => "biomes",
        }
    }

    fn run(self, run: &mut Run<'_>) -> Result<(), MapError> {
        let config = run.config;
        match self {
            Stage::Points => {
                run.points = points::generate_points(
                    config.points,
                    &config.sampling,
                    &config.graph,
                    &mut run.rng,
                )?;
            }
            Stage::Graph => {
                run.graph = voronoi::build_graph(&run.points, &config.graph, &mut run.rng)?;
            }
            Stage::Land => land::shape_land(&mut run.graph, &config.island, &mut run.rng)?,
            Stage::Elevation => {
                elevation::assign_elevation(&mut run.graph, &config.elevation, &mut run.rng)?;
            }
            Stage::Rivers => {
                rivers::generate_rivers(
                    &mut run.graph,
                    &config.rivers,
                    config.river_attempts(),
                    &mut run.rng,
                )?;
            }
            Stage::Biomes => moisture::classify_biomes(&mut run.graph, &config.moisture)?,
        }
        Ok(())
    }
}

/// Общее состояние одного прогона
struct Run<'a> {
    config: &'a MapConfig,
    rng: ChaCha8Rng,
    points: Vec<Point>,
    graph: Graph,
}

/// Полностью размеченная карта. Создаётся только завершённым прогоном.
#[derive(Debug, Clone, PartialEq)]
pub struct Map {
    seed: u64,
    points: Vec<Point>,
    graph: Graph,
}

impl Map {
    /// Прогоняет все этапы. Без сида в конфигурации выбирает случайный из `0..10000`.
    pub fn generate(config: &MapConfig) -> Result<Self, MapError> {
        config.validate()?;
        let seed = config
            .seed
            .unwrap_or_else(|| rand::thread_rng().gen_range(0..10_000));
        info!("seed = {seed}, точек: {}", config.points);

        let mut run = Run {
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
            points: Vec::new(),
            graph: Graph::default(),
        };
        for stage in Stage::ORDER {
            info!("Этап '{}'", stage.name());
            stage.run(&mut run)?;
        }
        run.graph.require(Stage::Biomes)?;

        Ok(Self {
            seed,
            points: run.points,
            graph: run.graph,
        })
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Число точек (и центров), использованных в прогоне
    #[must_use]
    pub fn points_number(&self) -> usize {
        self.points.len()
    }

    /// Точки после релаксации
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    #[must_use]
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    #[must_use]
    pub fn centers(&self) -> &[Center] {
        &self.graph.centers
    }

    #[must_use]
    pub fn corners(&self) -> &[Corner] {
        &self.graph.corners
    }

    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.graph.edges
    }
}
