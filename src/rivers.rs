use log::{info, warn};
use rand::Rng;

use crate::config::RiverSettings;
use crate::error::MapError;
use crate::graph::Graph;
use crate::map::Stage;

/// Проходит по `downslope` от истока до воды, расширяя русло на каждом ребре.
///
/// Сухой угол без спуска считается локальным минимумом: он становится озером, и река
/// заканчивается в нём. Возвращает пройденные углы, от истока к устью.
pub fn trace_river(graph: &mut Graph, source: usize) -> Result<Vec<usize>, MapError> {
    graph.require(Stage::Elevation)?;
    if source >= graph.corners.len() {
        return Err(MapError::invariant(format!("river source {source} does not exist")));
    }

    let limit = graph.corners.len();
    let mut path = vec![source];
    let mut q = source;

    while !graph.corners[q].water {
        let Some(next) = graph.corners[q].downslope else {
            warn!("Локальный минимум в углу {q}: становится озером");
            graph.corners[q].water = true;
            break;
        };
        let edge = graph.edge_between(q, next).ok_or_else(|| {
            MapError::invariant(format!("downslope {q} -> {next} has no edge"))
        })?;

        graph.edges[edge].river += 1;
        graph.corners[q].river += 1;
        q = next;
        path.push(q);

        if path.len() > limit {
            return Err(MapError::invariant(format!(
                "river from corner {source} did not reach water in {limit} steps"
            )));
        }
    }
    graph.corners[q].river += 1;
    Ok(path)
}

/// Закладывает реки из случайных углов в полосе высот истоков.
///
/// Реки, прошедшие по одному ребру, складываются (слияние притоков). Возвращает
/// число заложенных рек.
pub fn generate_rivers<R: Rng>(
    graph: &mut Graph,
    settings: &RiverSettings,
    attempts: usize,
    rng: &mut R,
) -> Result<usize, MapError> {
    graph.require(Stage::Elevation)?;
    if graph.corners.is_empty() {
        return Err(MapError::invariant("graph has no corners"));
    }

    let mut rivers = 0;
    for _ in 0..attempts {
        let q = rng.gen_range(0..graph.corners.len());
        let corner = &graph.corners[q];
        if corner.water
            || corner.elevation < settings.min_source_elevation
            || corner.elevation > settings.max_source_elevation
        {
            continue;
        }
        trace_river(graph, q)?;
        rivers += 1;
    }
    graph.mark(Stage::Rivers);

    let river_edges = graph.edges.iter().filter(|e| e.river > 0).count();
    let widest = graph.edges.iter().map(|e| e.river).max().unwrap_or(0);
    info!("Рек: {rivers} (из {attempts} попыток), рёбер с руслом: {river_edges}, максимальная ширина {widest}");
    Ok(rivers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ElevationSettings, GraphSettings, IslandSettings};
    use crate::elevation::assign_elevation;
    use crate::land::shape_land;
    use crate::points::random_points;
    use crate::voronoi::build_graph;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn elevated(seed: u64) -> (Graph, ChaCha8Rng) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let points = random_points(300, &mut rng).unwrap();
        let mut graph = build_graph(&points, &GraphSettings::default(), &mut rng).unwrap();
        shape_land(&mut graph, &IslandSettings::default(), &mut rng).unwrap();
        assign_elevation(&mut graph, &ElevationSettings::default(), &mut rng).unwrap();
        (graph, rng)
    }

    #[test]
    fn river_reaches_water_and_widens_edges() {
        let (mut graph, _) = elevated(31);
        let source = graph
            .corners
            .iter()
            .filter(|q| !q.water)
            .max_by(|a, b| a.elevation.total_cmp(&b.elevation))
            .map(|q| q.index)
            .unwrap();

        let path = trace_river(&mut graph, source).unwrap();
        let mouth = *path.last().unwrap();
        assert!(graph.corners[mouth].water);
        for pair in path.windows(2) {
            let edge = graph.edge_between(pair[0], pair[1]).unwrap();
            assert_eq!(graph.edges[edge].river, 1);
            assert!(graph.corners[pair[1]].elevation < graph.corners[pair[0]].elevation);
        }
    }

    #[test]
    fn confluence_accumulates_width() {
        let (mut graph, _) = elevated(32);
        let source = graph
            .corners
            .iter()
            .filter(|q| !q.water)
            .max_by(|a, b| a.elevation.total_cmp(&b.elevation))
            .map(|q| q.index)
            .unwrap();

        let first = trace_river(&mut graph, source).unwrap();
        let second = trace_river(&mut graph, source).unwrap();
        assert_eq!(first, second);
        let edge = graph.edge_between(first[0], first[1]).unwrap();
        assert_eq!(graph.edges[edge].river, 2);
    }

    #[test]
    fn pit_is_promoted_to_lake() {
        let (mut graph, _) = elevated(33);
        let pit = graph.corners.iter().find(|q| !q.water).map(|q| q.index).unwrap();
        graph.corners[pit].downslope = None;

        let path = trace_river(&mut graph, pit).unwrap();
        assert_eq!(path, vec![pit]);
        assert!(graph.corners[pit].water);
    }

    #[test]
    fn generation_is_deterministic() {
        let (mut a, mut rng_a) = elevated(34);
        let (mut b, mut rng_b) = elevated(34);
        generate_rivers(&mut a, &RiverSettings::default(), 150, &mut rng_a).unwrap();
        generate_rivers(&mut b, &RiverSettings::default(), 150, &mut rng_b).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.stage(), Some(Stage::Rivers));
    }

    #[test]
    fn rivers_are_laid_only_once() {
        let (mut graph, mut rng) = elevated(36);
        generate_rivers(&mut graph, &RiverSettings::default(), 100, &mut rng).unwrap();
        let laid = graph.clone();
        let source = graph.corners.iter().position(|q| !q.water).unwrap();

        assert!(matches!(
            generate_rivers(&mut graph, &RiverSettings::default(), 100, &mut rng),
            Err(MapError::PipelineInvariant(_))
        ));
        assert!(matches!(
            trace_river(&mut graph, source),
            Err(MapError::PipelineInvariant(_))
        ));
        assert_eq!(graph, laid);
    }

    #[test]
    fn requires_elevation_stage() {
        let mut rng = ChaCha8Rng::seed_from_u64(35);
        let points = random_points(50, &mut rng).unwrap();
        let mut graph = build_graph(&points, &GraphSettings::default(), &mut rng).unwrap();
        assert!(matches!(
            trace_river(&mut graph, 0),
            Err(MapError::PipelineInvariant(_))
        ));
    }
}
