use polymap::{Map, MapConfig};
use proptest::prelude::*;

fn arb_config() -> impl Strategy<Value = MapConfig> {
    (0u64..10_000, 20usize..120).prop_map(|(seed, points)| MapConfig::new(seed, points))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn interior_edges_have_two_corners_and_two_centers(config in arb_config()) {
        let map = Map::generate(&config).unwrap();
        let graph = map.graph();
        for edge in graph.interior_edges() {
            let d1 = edge.d1.unwrap();
            prop_assert_ne!(edge.d0, d1);
            prop_assert_ne!(edge.v0, edge.v1);
            prop_assert!(graph.centers[edge.d0].borders.contains(&edge.index));
            prop_assert!(graph.centers[d1].borders.contains(&edge.index));
            prop_assert!(graph.corners[edge.v0].protrudes.contains(&edge.index));
            prop_assert!(graph.corners[edge.v1].protrudes.contains(&edge.index));
        }
        let neighbors: usize = map.centers().iter().map(|c| c.neighbors.len()).sum();
        prop_assert_eq!(neighbors, 2 * graph.interior_edges().count());
    }

    #[test]
    fn same_seed_reproduces_the_graph(config in arb_config()) {
        let a = Map::generate(&config).unwrap();
        let b = Map::generate(&config).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn downslope_always_descends(config in arb_config()) {
        let map = Map::generate(&config).unwrap();
        let corners = map.corners();
        for q in corners.iter().filter(|q| !q.water) {
            if let Some(down) = q.downslope {
                prop_assert!(corners[down].elevation < q.elevation);
            }
        }
        for q in corners {
            prop_assert!(q.elevation >= 0.0);
        }
    }

    #[test]
    fn river_width_grows_downstream(config in arb_config()) {
        let map = Map::generate(&config).unwrap();
        let graph = map.graph();
        for q in graph.corners.iter().filter(|q| !q.water) {
            let Some(down) = q.downslope else { continue };
            let edge = graph.edge_between(q.index, down).unwrap();
            let width = graph.edges[edge].river;
            if width == 0 || graph.corners[down].water {
                continue;
            }
            let Some(next) = graph.corners[down].downslope else { continue };
            let below = graph.edge_between(down, next).unwrap();
            prop_assert!(graph.edges[below].river >= width);
        }
    }

    #[test]
    fn completed_map_has_biome_everywhere(config in arb_config()) {
        let map = Map::generate(&config).unwrap();
        prop_assert!(map.centers().iter().all(|c| c.biome.is_some()));
    }
}
