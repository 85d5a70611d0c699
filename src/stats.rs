//! Сводка по готовой карте

use std::collections::BTreeMap;

use log::info;
use petgraph::algo::connected_components;
use serde::Serialize;

use crate::biome::Biome;
use crate::graph::Graph;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapStats {
    pub centers: usize,
    pub corners: usize,
    pub edges: usize,
    pub land: usize,
    pub ocean: usize,
    pub lakes: usize,
    pub coast: usize,
    /// Доля суши в процентах
    pub land_percent: f64,
    /// Связные компоненты суши по смежности центров
    pub islands: usize,
    pub river_edges: usize,
    pub max_river_width: u32,
    pub biomes: BTreeMap<String, usize>,
}

/// Число островов: компоненты связности подграфа суши
fn count_islands(graph: &Graph) -> usize {
    let adjacency = graph.center_graph();
    let land = adjacency.filter_map(
        |_, &c| (!graph.centers[c].water).then_some(c),
        |_, &e| Some(e),
    );
    connected_components(&land)
}

#[must_use]
pub fn collect(graph: &Graph) -> MapStats {
    let centers = graph.centers.len();
    let land = graph.centers.iter().filter(|c| !c.water).count();

    let mut biomes = BTreeMap::new();
    for biome in graph.centers.iter().filter_map(|c| c.biome) {
        *biomes.entry(biome_name(biome)).or_insert(0) += 1;
    }

    MapStats {
        centers,
        corners: graph.corners.len(),
        edges: graph.edges.len(),
        land,
        ocean: graph.centers.iter().filter(|c| c.ocean).count(),
        lakes: graph.centers.iter().filter(|c| c.lake()).count(),
        coast: graph.centers.iter().filter(|c| c.coast).count(),
        land_percent: 100.0 * land as f64 / centers.max(1) as f64,
        islands: count_islands(graph),
        river_edges: graph.edges.iter().filter(|e| e.river > 0).count(),
        max_river_width: graph.edges.iter().map(|e| e.river).max().unwrap_or(0),
        biomes,
    }
}

fn biome_name(biome: Biome) -> String {
    format!("{biome:?}")
}

impl MapStats {
    pub fn log_report(&self) {
        info!(
            "Центров: {}, углов: {}, рёбер: {}",
            self.centers, self.corners, self.edges
        );
        info!(
            "Суша: {} ({:.1}%), океан: {}, озёра: {}, побережье: {}, островов: {}",
            self.land, self.land_percent, self.ocean, self.lakes, self.coast, self.islands
        );
        info!(
            "Рёбер с рекой: {}, максимальная ширина: {}",
            self.river_edges, self.max_river_width
        );
        for (biome, count) in &self.biomes {
            info!("  {biome}: {count}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapConfig;
    use crate::map::Map;

    #[test]
    fn counts_are_consistent() {
        let map = Map::generate(&MapConfig::new(3, 300)).unwrap();
        let stats = collect(map.graph());
        assert_eq!(stats.centers, 300);
        assert_eq!(stats.land + stats.ocean + stats.lakes, stats.centers);
        assert_eq!(stats.biomes.values().sum::<usize>(), stats.centers);
        assert!(stats.coast <= stats.land);
        if stats.land > 0 {
            assert!(stats.islands >= 1);
        }
    }

    #[test]
    fn empty_map_has_no_islands() {
        let mut config = MapConfig::new(3, 100);
        config.island.land_fraction = 0.0;
        let map = Map::generate(&config).unwrap();
        let stats = collect(map.graph());
        assert_eq!(stats.land, 0);
        assert_eq!(stats.islands, 0);
        assert_eq!(stats.river_edges, 0);
    }
}
