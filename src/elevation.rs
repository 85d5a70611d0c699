//! Высота углов: расстояние от океана по графу углов, затем перераспределение по рангу.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use log::info;
use rand::Rng;

use crate::config::ElevationSettings;
use crate::error::MapError;
use crate::graph::Graph;
use crate::map::Stage;

/// Элемент фронта Дейкстры; сравнение обращено, чтобы `BinaryHeap` отдавал минимум
#[derive(Debug, Clone, Copy, PartialEq)]
struct Frontier {
    cost: f64,
    corner: usize,
}

impl Eq for Frontier {}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.corner.cmp(&self.corner))
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Кратчайшие расстояния от всех океанских углов.
///
/// Шаг стоит `water_step`; если оба конца на суше, добавляются `land_step` и случайная
/// добавка угла-приёмника.
fn distance_from_ocean(
    graph: &Graph,
    settings: &ElevationSettings,
    jitter: &[f64],
) -> Result<Vec<f64>, MapError> {
    let mut distance = vec![f64::INFINITY; graph.corners.len()];
    let mut heap = BinaryHeap::new();

    for corner in graph.corners.iter().filter(|q| q.ocean) {
        distance[corner.index] = 0.0;
        heap.push(Frontier {
            cost: 0.0,
            corner: corner.index,
        });
    }
    if heap.is_empty() {
        return Err(MapError::invariant("no ocean corners to propagate elevation from"));
    }

    while let Some(Frontier { cost, corner }) = heap.pop() {
        if cost > distance[corner] {
            continue;
        }
        let q = &graph.corners[corner];
        for &s in &q.adjacent {
            let mut step = settings.water_step;
            if !q.water && !graph.corners[s].water {
                step += settings.land_step + jitter[s];
            }
            let next = cost + step;
            if next < distance[s] {
                distance[s] = next;
                heap.push(Frontier {
                    cost: next,
                    corner: s,
                });
            }
        }
    }

    if let Some(q) = distance.iter().position(|d| d.is_infinite()) {
        return Err(MapError::invariant(format!(
            "corner {q} is unreachable from the ocean"
        )));
    }
    Ok(distance)
}

/// Ранговое перераспределение: ранг `i` из `m` даёт `1 - sqrt(1 - (i+1)/m)`.
///
/// Кривая строго возрастает, поэтому порядок высот сохраняется, а низин получается
/// больше, чем пиков.
fn redistribute(graph: &mut Graph, distance: &[f64]) {
    let mut land: Vec<usize> = graph
        .corners
        .iter()
        .filter(|q| !q.ocean)
        .map(|q| q.index)
        .collect();
    land.sort_by(|&a, &b| distance[a].total_cmp(&distance[b]).then(a.cmp(&b)));

    let m = land.len() as f64;
    for (rank, &q) in land.iter().enumerate() {
        let y = (rank as f64 + 1.0) / m;
        graph.corners[q].elevation = 1.0 - (1.0 - y).max(0.0).sqrt();
    }
    for corner in graph.corners.iter_mut().filter(|q| q.ocean) {
        corner.elevation = 0.0;
    }
}

fn assign_center_elevation(graph: &mut Graph) {
    let corners = &graph.corners;
    for center in &mut graph.centers {
        center.elevation = if center.ocean {
            0.0
        } else {
            let sum: f64 = center.corners.iter().map(|&q| corners[q].elevation).sum();
            sum / center.corners.len().max(1) as f64
        };
    }
}

/// Для каждого неокеанского угла выбирается самый низкий сосед, если он строго ниже.
/// При равных высотах выбирается меньший индекс.
pub fn assign_downslopes(graph: &mut Graph) {
    let downslopes: Vec<Option<usize>> = graph
        .corners
        .iter()
        .map(|q| {
            if q.ocean {
                return None;
            }
            q.adjacent
                .iter()
                .copied()
                .filter(|&s| graph.corners[s].elevation < q.elevation)
                .min_by(|&a, &b| {
                    graph.corners[a]
                        .elevation
                        .total_cmp(&graph.corners[b].elevation)
                        .then(a.cmp(&b))
                })
        })
        .collect();

    for (corner, downslope) in graph.corners.iter_mut().zip(downslopes) {
        corner.downslope = downslope;
    }
}

/// Этап высот: расстояние от океана, перераспределение, высоты центров, склоны
pub fn assign_elevation<R: Rng>(
    graph: &mut Graph,
    settings: &ElevationSettings,
    rng: &mut R,
) -> Result<(), MapError> {
    graph.require(Stage::Land)?;

    let jitter: Vec<f64> = (0..graph.corners.len())
        .map(|_| rng.gen_range(0.0..1.0) * settings.jitter)
        .collect();
    let distance = distance_from_ocean(graph, settings, &jitter)?;

    redistribute(graph, &distance);
    assign_center_elevation(graph);
    assign_downslopes(graph);
    graph.mark(Stage::Elevation);

    let peak = graph
        .corners
        .iter()
        .map(|q| q.elevation)
        .fold(0.0_f64, f64::max);
    info!("Высоты назначены, максимум {peak:.3}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GraphSettings, IslandSettings};
    use crate::land::shape_land;
    use crate::points::random_points;
    use crate::voronoi::build_graph;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn elevated(seed: u64) -> Graph {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let points = random_points(300, &mut rng).unwrap();
        let mut graph = build_graph(&points, &GraphSettings::default(), &mut rng).unwrap();
        shape_land(&mut graph, &IslandSettings::default(), &mut rng).unwrap();
        assign_elevation(&mut graph, &ElevationSettings::default(), &mut rng).unwrap();
        graph
    }

    #[test]
    fn frontier_pops_cheapest_first() {
        let mut heap = BinaryHeap::new();
        heap.push(Frontier { cost: 2.0, corner: 0 });
        heap.push(Frontier { cost: 1.0, corner: 5 });
        heap.push(Frontier { cost: 1.0, corner: 3 });
        assert_eq!(heap.pop().map(|f| f.corner), Some(3));
        assert_eq!(heap.pop().map(|f| f.corner), Some(5));
        assert_eq!(heap.pop().map(|f| f.corner), Some(0));
    }

    #[test]
    fn sea_level_separates_ocean_from_the_rest() {
        let graph = elevated(21);
        for q in &graph.corners {
            assert!(q.elevation >= 0.0 && q.elevation <= 1.0);
            assert_eq!(q.ocean, q.elevation <= 0.0, "corner {}", q.index);
        }
        for c in &graph.centers {
            if !c.lake() {
                assert_eq!(c.water, c.elevation <= 0.0, "center {}", c.index);
            }
        }
    }

    #[test]
    fn every_land_corner_drains_downhill() {
        let graph = elevated(22);
        for q in graph.corners.iter().filter(|q| !q.ocean) {
            let down = q.downslope.expect("rank curve leaves no pits");
            assert!(graph.corners[down].elevation < q.elevation);
            assert!(q.adjacent.contains(&down));
        }
        assert!(graph.corners.iter().filter(|q| q.ocean).all(|q| q.downslope.is_none()));
    }

    #[test]
    fn lowlands_outnumber_peaks() {
        let graph = elevated(23);
        let land: Vec<f64> = graph
            .corners
            .iter()
            .filter(|q| !q.ocean)
            .map(|q| q.elevation)
            .collect();
        let low = land.iter().filter(|&&e| e < 0.3).count();
        let high = land.iter().filter(|&&e| e >= 0.7).count();
        assert!(low > high);
    }

    #[test]
    fn downslope_ties_prefer_smallest_index() {
        let mut graph = elevated(24);
        let q = graph
            .corners
            .iter()
            .find(|q| !q.ocean && q.adjacent.len() >= 2)
            .map(|q| q.index)
            .unwrap();
        let neighbors = graph.corners[q].adjacent.clone();
        for q in graph.corners.iter_mut() {
            q.elevation = 1.0;
        }
        for &s in &neighbors {
            graph.corners[s].elevation = 0.5;
        }
        assign_downslopes(&mut graph);
        assert_eq!(graph.corners[q].downslope, neighbors.iter().copied().min());
    }
}
