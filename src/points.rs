//! Выборка точек и релаксация Ллойда

use log::debug;
use rand::Rng;

use crate::config::{GraphSettings, SamplingSettings};
use crate::error::MapError;
use crate::graph::Point;
use crate::voronoi::clipped_cells;

/// `n` равномерно распределённых точек в `[0,1)²`
pub fn random_points<R: Rng>(n: usize, rng: &mut R) -> Result<Vec<Point>, MapError> {
    if n < 3 {
        return Err(MapError::config(format!(
            "at least 3 points are required, got {n}"
        )));
    }
    Ok((0..n)
        .map(|_| Point::new(rng.gen_range(0.0..1.0), rng.gen_range(0.0..1.0)))
        .collect())
}

/// Центр масс многоугольника (для вырожденного берётся среднее вершин)
#[must_use]
pub fn centroid(polygon: &[Point]) -> Point {
    let mut area = 0.0;
    let (mut cx, mut cy) = (0.0, 0.0);
    for (i, a) in polygon.iter().enumerate() {
        let b = polygon[(i + 1) % polygon.len()];
        let cross = a.x * b.y - b.x * a.y;
        area += cross;
        cx += (a.x + b.x) * cross;
        cy += (a.y + b.y) * cross;
    }
    area *= 0.5;

    if area.abs() < 1e-12 {
        let n = polygon.len().max(1) as f64;
        let (sx, sy) = polygon
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        return Point::new(sx / n, sy / n);
    }
    Point::new(cx / (6.0 * area), cy / (6.0 * area))
}

/// Релаксация Ллойда: каждая точка переезжает в центр масс своей ячейки
pub fn relax<R: Rng>(
    mut points: Vec<Point>,
    sampling: &SamplingSettings,
    graph: &GraphSettings,
    rng: &mut R,
) -> Result<Vec<Point>, MapError> {
    for iteration in 0..sampling.lloyd_iterations {
        let cells = clipped_cells(&points, graph, rng)?;
        let mut movement: f64 = 0.0;

        points = cells
            .polygons
            .iter()
            .zip(&cells.sites)
            .map(|(polygon, &site)| {
                let c = centroid(polygon);
                let moved = Point::new(c.x.clamp(0.0, 1.0), c.y.clamp(0.0, 1.0));
                movement = movement.max(site.distance(moved));
                moved
            })
            .collect();

        debug!("Релаксация {}: максимальный сдвиг {movement:.6}", iteration + 1);
        if movement < sampling.lloyd_tolerance {
            break;
        }
    }
    Ok(points)
}

/// Выборка и релаксация за один вызов
pub fn generate_points<R: Rng>(
    n: usize,
    sampling: &SamplingSettings,
    graph: &GraphSettings,
    rng: &mut R,
) -> Result<Vec<Point>, MapError> {
    let points = random_points(n, rng)?;
    relax(points, sampling, graph, rng)
}
