use std::collections::VecDeque;

use fastnoise_lite::{FastNoiseLite, FractalType, NoiseType};
use log::info;
use rand::Rng;

use crate::config::IslandSettings;
use crate::error::MapError;
use crate::graph::{Graph, Point};
use crate::map::Stage;

/// Шум FBm для силуэта острова
fn island_noise(seed: i32, settings: &IslandSettings) -> FastNoiseLite {
    let mut noise = FastNoiseLite::new();
    noise.set_seed(Some(seed));
    noise.set_noise_type(Some(NoiseType::OpenSimplex2));
    noise.set_fractal_type(Some(FractalType::FBm));
    noise.set_fractal_octaves(Some(settings.octaves));
    noise.set_frequency(Some(settings.frequency));
    noise
}

/// Оценка «сушности» точки: шум в `[0,1]`, ослабленный к краям карты
fn island_score(noise: &FastNoiseLite, point: Point, settings: &IslandSettings) -> f64 {
    let value = f64::from(noise.get_noise_2d(point.x as f32, point.y as f32));
    let value = ((value + 1.0) * 0.5).clamp(0.0, 1.0);

    // 0 в центре карты, 1 в углу квадрата
    let d = Point::new(0.5, 0.5).distance(point) / std::f64::consts::FRAC_1_SQRT_2;
    let falloff = (1.0 - d.powf(settings.falloff_exponent)).max(0.0);
    value * falloff
}

/// Делит центры на сушу и воду, находит океан, озёра и побережье.
///
/// Граничные центры всегда вода. Сушей становятся `round(land_fraction · N)` центров
/// с наибольшей оценкой (порог по квантилю, равенство решается индексом).
pub fn shape_land<R: Rng>(
    graph: &mut Graph,
    settings: &IslandSettings,
    rng: &mut R,
) -> Result<(), MapError> {
    graph.require(Stage::Graph)?;

    let noise = island_noise(rng.gen_range(i32::MIN..=i32::MAX), settings);
    let scores: Vec<f64> = graph
        .centers
        .iter()
        .map(|c| island_score(&noise, c.point, settings))
        .collect();

    let target = (settings.land_fraction * graph.centers.len() as f64).round() as usize;
    let mut candidates: Vec<usize> = graph
        .centers
        .iter()
        .filter(|c| !c.border)
        .map(|c| c.index)
        .collect();
    candidates.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));

    for center in &mut graph.centers {
        center.water = true;
        center.ocean = false;
        center.coast = false;
    }
    for &i in candidates.iter().take(target) {
        graph.centers[i].water = false;
    }

    fill_ocean(graph);
    assign_coast(graph);
    assign_corner_flags(graph);
    graph.mark(Stage::Land);

    let land = graph.centers.iter().filter(|c| !c.water).count();
    let lakes = graph.centers.iter().filter(|c| c.lake()).count();
    info!(
        "Суша: {land} из {} центров ({:.1}%), озёр: {lakes}",
        graph.centers.len(),
        100.0 * land as f64 / graph.centers.len().max(1) as f64
    );
    Ok(())
}

/// Заливка от граничной воды: достижимое по воде становится океаном, остальная вода озёрами
fn fill_ocean(graph: &mut Graph) {
    let mut queue = VecDeque::new();

    for center in &mut graph.centers {
        if center.border && center.water {
            center.ocean = true;
            queue.push_back(center.index);
        }
    }

    while let Some(c) = queue.pop_front() {
        for k in 0..graph.centers[c].neighbors.len() {
            let n = graph.centers[c].neighbors[k];
            let neighbor = &mut graph.centers[n];
            if neighbor.water && !neighbor.ocean {
                neighbor.ocean = true;
                queue.push_back(n);
            }
        }
    }
}

fn assign_coast(graph: &mut Graph) {
    let coast: Vec<bool> = graph
        .centers
        .iter()
        .map(|c| !c.water && c.neighbors.iter().any(|&n| graph.centers[n].water))
        .collect();
    for (center, coast) in graph.centers.iter_mut().zip(coast) {
        center.coast = coast;
    }
}

/// Флаги углов выводятся из касающихся центров
fn assign_corner_flags(graph: &mut Graph) {
    let centers = &graph.centers;
    for corner in &mut graph.corners {
        let all_ocean = corner.touches.iter().all(|&c| centers[c].ocean);
        let all_water = corner.touches.iter().all(|&c| centers[c].water);
        let any_water = corner.touches.iter().any(|&c| centers[c].water);

        corner.ocean = corner.border || all_ocean;
        corner.water = corner.border || all_water;
        corner.coast = !corner.water && any_water;
    }
}
