//! Влажность: распространение от пресной воды, рек и побережья, затем классификация биомов

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use log::info;

use crate::biome::assign_biomes;
use crate::config::MoistureSettings;
use crate::error::MapError;
use crate::graph::Graph;
use crate::map::Stage;

/// Река из многих проходов насыщает угол не больше этого значения
const RIVER_MOISTURE_CAP: f64 = 3.0;

/// Элемент фронта распространения: сначала самый влажный, при равенстве меньший индекс
#[derive(Debug, Clone, Copy, PartialEq)]
struct Wet {
    moisture: f64,
    corner: usize,
}

impl Eq for Wet {}

impl Ord for Wet {
    fn cmp(&self, other: &Self) -> Ordering {
        self.moisture
            .total_cmp(&other.moisture)
            .then_with(|| other.corner.cmp(&self.corner))
    }
}

impl PartialOrd for Wet {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Начальная влажность угла до распространения
fn source_moisture(graph: &Graph, corner: usize, settings: &MoistureSettings) -> f64 {
    let q = &graph.corners[corner];
    let mut moisture: f64 = 0.0;

    if q.water && !q.ocean {
        moisture = moisture.max(settings.fresh_water_moisture);
    }
    if q.river > 0 {
        let river = (settings.river_moisture * f64::from(q.river)).min(RIVER_MOISTURE_CAP);
        moisture = moisture.max(river);
    }
    if q.coast && q.touches.iter().any(|&c| graph.centers[c].ocean) {
        moisture = moisture.max(settings.coast_moisture);
    }
    moisture
}

/// Распространяет влажность по графу углов, угасая на каждом шаге
fn propagate(graph: &Graph, settings: &MoistureSettings) -> Vec<f64> {
    let mut moisture = vec![0.0; graph.corners.len()];
    let mut heap = BinaryHeap::new();

    for corner in graph.corners.iter().filter(|q| !q.ocean) {
        let m = source_moisture(graph, corner.index, settings);
        if m > 0.0 {
            moisture[corner.index] = m;
            heap.push(Wet {
                moisture: m,
                corner: corner.index,
            });
        }
    }

    while let Some(Wet { moisture: m, corner }) = heap.pop() {
        if m < moisture[corner] {
            continue;
        }
        let next = m * settings.decay;
        for &s in &graph.corners[corner].adjacent {
            if graph.corners[s].ocean || next <= moisture[s] {
                continue;
            }
            moisture[s] = next;
            heap.push(Wet {
                moisture: next,
                corner: s,
            });
        }
    }
    moisture
}

/// Влажность углов и центров.
///
/// Суша перераспределяется по рангу линейно в `[0,1]`, озёрные углы ограничиваются 1,
/// океан всегда 1.
pub fn assign_moisture(graph: &mut Graph, settings: &MoistureSettings) {
    let raw = propagate(graph, settings);

    let mut land: Vec<usize> = graph
        .corners
        .iter()
        .filter(|q| !q.water)
        .map(|q| q.index)
        .collect();
    land.sort_by(|&a, &b| raw[a].total_cmp(&raw[b]).then(a.cmp(&b)));
    let span = land.len().saturating_sub(1).max(1) as f64;

    for (rank, &q) in land.iter().enumerate() {
        graph.corners[q].moisture = rank as f64 / span;
    }
    for corner in graph.corners.iter_mut().filter(|q| q.water) {
        corner.moisture = if corner.ocean {
            1.0
        } else {
            raw[corner.index].min(1.0)
        };
    }

    let corners = &graph.corners;
    for center in &mut graph.centers {
        center.moisture = if center.water {
            1.0
        } else {
            let sum: f64 = center.corners.iter().map(|&q| corners[q].moisture).sum();
            sum / center.corners.len().max(1) as f64
        };
    }
}

/// Этап биомов: влажность и классификация каждого центра
pub fn classify_biomes(graph: &mut Graph, settings: &MoistureSettings) -> Result<(), MapError> {
    graph.require(Stage::Rivers)?;

    assign_moisture(graph, settings);
    assign_biomes(graph)?;

    if let Some(center) = graph.centers.iter().find(|c| c.biome.is_none()) {
        return Err(MapError::invariant(format!(
            "center {} was left without a biome",
            center.index
        )));
    }
    graph.mark(Stage::Biomes);

    let land = graph.centers.iter().filter(|c| !c.water);
    let (count, total) = land.fold((0usize, 0.0), |(n, s), c| (n + 1, s + c.moisture));
    info!(
        "Биомы назначены, средняя влажность суши {:.3}",
        total / count.max(1) as f64
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biome::Biome;
    use crate::config::{ElevationSettings, GraphSettings, IslandSettings, RiverSettings};
    use crate::elevation::assign_elevation;
    use crate::land::shape_land;
    use crate::points::random_points;
    use crate::rivers::generate_rivers;
    use crate::voronoi::build_graph;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn with_rivers(seed: u64) -> Graph {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let points = random_points(300, &mut rng).unwrap();
        let mut graph = build_graph(&points, &GraphSettings::default(), &mut rng).unwrap();
        shape_land(&mut graph, &IslandSettings::default(), &mut rng).unwrap();
        assign_elevation(&mut graph, &ElevationSettings::default(), &mut rng).unwrap();
        generate_rivers(&mut graph, &RiverSettings::default(), 150, &mut rng).unwrap();
        graph
    }

    #[test]
    fn wettest_is_popped_first() {
        let mut heap = BinaryHeap::new();
        heap.push(Wet { moisture: 0.5, corner: 1 });
        heap.push(Wet { moisture: 0.9, corner: 4 });
        heap.push(Wet { moisture: 0.9, corner: 2 });
        assert_eq!(heap.pop().map(|w| w.corner), Some(2));
        assert_eq!(heap.pop().map(|w| w.corner), Some(4));
        assert_eq!(heap.pop().map(|w| w.corner), Some(1));
    }

    #[test]
    fn moisture_stays_in_unit_range() {
        let mut graph = with_rivers(41);
        assign_moisture(&mut graph, &MoistureSettings::default());
        for q in &graph.corners {
            assert!((0.0..=1.0).contains(&q.moisture), "corner {}", q.index);
        }
        for c in &graph.centers {
            assert!((0.0..=1.0).contains(&c.moisture), "center {}", c.index);
            if c.water {
                assert_eq!(c.moisture, 1.0);
            }
        }
    }

    #[test]
    fn propagation_decays_by_at_most_one_step() {
        let graph = with_rivers(42);
        let settings = MoistureSettings::default();
        let raw = propagate(&graph, &settings);
        for q in graph.corners.iter().filter(|q| !q.ocean) {
            assert!(raw[q.index] >= source_moisture(&graph, q.index, &settings));
            for &s in q.adjacent.iter().filter(|&&s| !graph.corners[s].ocean) {
                assert!(raw[s] >= raw[q.index] * settings.decay - 1e-12);
            }
        }
    }

    #[test]
    fn every_center_gets_a_biome() {
        let mut graph = with_rivers(43);
        classify_biomes(&mut graph, &MoistureSettings::default()).unwrap();
        assert_eq!(graph.stage(), Some(Stage::Biomes));
        for c in &graph.centers {
            let biome = c.biome.unwrap();
            if c.ocean {
                assert_eq!(biome, Biome::Ocean);
            } else if c.water {
                assert_eq!(biome, Biome::Lake);
            } else if c.coast {
                assert_eq!(biome, Biome::Beach);
            }
        }
    }

    #[test]
    fn requires_rivers_stage() {
        let mut rng = ChaCha8Rng::seed_from_u64(44);
        let points = random_points(50, &mut rng).unwrap();
        let mut graph = build_graph(&points, &GraphSettings::default(), &mut rng).unwrap();
        shape_land(&mut graph, &IslandSettings::default(), &mut rng).unwrap();
        assert!(matches!(
            classify_biomes(&mut graph, &MoistureSettings::default()),
            Err(MapError::PipelineInvariant(_))
        ));
    }
}
