//! Построение диаграммы Вороного и двойственного графа центров, углов и рёбер
//!
//! Диаграмму считает `voronoice` (триангуляция Делоне, центры описанных окружностей) в
//! рамке с запасом, ячейки отсекаются единичным квадратом здесь же. Вершины ячеек
//! сливаются в углы с допуском, рёбра получаются из соседних вершин многоугольников и
//! связываются с обеими ячейками.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

use log::{debug, info, warn};
use rand::Rng;
use voronoice::{BoundingBox, Point as SitePoint, VoronoiBuilder};

use crate::config::GraphSettings;
use crate::error::MapError;
use crate::graph::{Center, Corner, Edge, Graph, Point};

/// Ячейки диаграммы, отсечённые единичным квадратом
#[derive(Debug, Clone)]
pub(crate) struct Cells {
    /// Точки, по которым диаграмма реально построена (после возможного возмущения)
    pub sites: Vec<Point>,
    /// Вершины ячейки `i` в порядке обхода
    pub polygons: Vec<Vec<Point>>,
}

/// Хеш-сетка для поиска точек в пределах допуска
struct SpatialHash {
    cell: f64,
    buckets: HashMap<(i64, i64), Vec<usize>>,
}

impl SpatialHash {
    fn new(cell: f64) -> Self {
        Self {
            cell,
            buckets: HashMap::new(),
        }
    }

    fn key(&self, p: Point) -> (i64, i64) {
        ((p.x / self.cell).floor() as i64, (p.y / self.cell).floor() as i64)
    }

    /// Наименьший индекс среди точек не дальше `cell` от `p`
    fn find(&self, p: Point, points: impl Fn(usize) -> Point) -> Option<usize> {
        let (kx, ky) = self.key(p);
        let mut found: Option<usize> = None;
        for dy in -1..=1 {
            for dx in -1..=1 {
                let Some(bucket) = self.buckets.get(&(kx + dx, ky + dy)) else {
                    continue;
                };
                for &id in bucket {
                    if points(id).distance(p) <= self.cell && found.is_none_or(|f| id < f) {
                        found = Some(id);
                    }
                }
            }
        }
        found
    }

    fn insert(&mut self, p: Point, id: usize) {
        let key = self.key(p);
        self.buckets.entry(key).or_default().push(id);
    }
}

/// Почему набор точек не годится для диаграммы
fn degeneracy(sites: &[Point], tolerance: f64) -> Option<String> {
    let mut hash = SpatialHash::new(tolerance);
    for (i, &p) in sites.iter().enumerate() {
        if let Some(j) = hash.find(p, |id| sites[id]) {
            return Some(format!("sites {j} and {i} coincide"));
        }
        hash.insert(p, i);
    }

    let a = sites[0];
    let b = sites
        .iter()
        .copied()
        .max_by(|p, q| a.distance(*p).total_cmp(&a.distance(*q)))?;
    let span = a.distance(b);
    let colinear = sites.iter().all(|p| {
        let cross = (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
        cross.abs() <= tolerance * span
    });
    colinear.then(|| "all sites are co-linear".to_string())
}

/// Сторона единичного квадрата, по которой отсекается ячейка
#[derive(Debug, Clone, Copy)]
enum Side {
    Left,
    Right,
    Bottom,
    Top,
}

impl Side {
    const ALL: [Side; 4] = [Side::Left, Side::Right, Side::Bottom, Side::Top];

    fn inside(self, p: Point) -> bool {
        match self {
            Side::Left => p.x >= 0.0,
            Side::Right => p.x <= 1.0,
            Side::Bottom => p.y >= 0.0,
            Side::Top => p.y <= 1.0,
        }
    }

    /// Пересечение отрезка `a`–`b` с прямой стороны; концы лежат по разные стороны
    fn crossing(self, a: Point, b: Point) -> Point {
        match self {
            Side::Left | Side::Right => {
                let x = if matches!(self, Side::Left) { 0.0 } else { 1.0 };
                let t = (x - a.x) / (b.x - a.x);
                Point::new(x, a.y + (b.y - a.y) * t)
            }
            Side::Bottom | Side::Top => {
                let y = if matches!(self, Side::Bottom) { 0.0 } else { 1.0 };
                let t = (y - a.y) / (b.y - a.y);
                Point::new(a.x + (b.x - a.x) * t, y)
            }
        }
    }
}

/// Отсечение выпуклой ячейки единичным квадратом (алгоритм Сазерленда-Ходжмена)
fn clip_to_unit_square(polygon: &[Point]) -> Vec<Point> {
    let mut ring = polygon.to_vec();
    for side in Side::ALL {
        if ring.is_empty() {
            break;
        }
        let mut clipped = Vec::with_capacity(ring.len() + 2);
        for (i, &a) in ring.iter().enumerate() {
            let b = ring[(i + 1) % ring.len()];
            match (side.inside(a), side.inside(b)) {
                (true, true) => clipped.push(b),
                (true, false) => clipped.push(side.crossing(a, b)),
                (false, true) => {
                    clipped.push(side.crossing(a, b));
                    clipped.push(b);
                }
                (false, false) => {}
            }
        }
        ring = clipped;
    }
    ring
}

/// Сторона рамки `voronoice`; вершины диаграммы не должны ложиться на её границу
const DIAGRAM_BOX: f64 = 4.0;

fn try_cells(sites: &[Point], tolerance: f64) -> Result<Vec<Vec<Point>>, String> {
    if let Some(reason) = degeneracy(sites, tolerance) {
        return Err(reason);
    }

    // voronoice работает в рамке с центром в начале координат
    let shifted: Vec<SitePoint> = sites
        .iter()
        .map(|p| SitePoint {
            x: p.x - 0.5,
            y: p.y - 0.5,
        })
        .collect();

    // voronoice паникует на некоторых вырожденных конфигурациях; это тоже повод
    // для новой попытки с возмущением
    let built = panic::catch_unwind(AssertUnwindSafe(|| {
        VoronoiBuilder::default()
            .set_sites(shifted)
            .set_bounding_box(BoundingBox::new_centered(DIAGRAM_BOX, DIAGRAM_BOX))
            .build()
            .map(|diagram| {
                diagram
                    .iter_cells()
                    .map(|cell| {
                        cell.iter_vertices()
                            .map(|v| Point::new(v.x + 0.5, v.y + 0.5))
                            .collect::<Vec<Point>>()
                    })
                    .collect::<Vec<_>>()
            })
    }));
    let cells = match built {
        Ok(Some(cells)) => cells,
        Ok(None) => return Err("triangulation failed".to_string()),
        Err(_) => return Err("diagram construction panicked".to_string()),
    };

    let polygons: Vec<Vec<Point>> = cells.iter().map(|cell| clip_to_unit_square(cell)).collect();

    if polygons.len() != sites.len() {
        return Err(format!(
            "diagram has {} cells for {} sites",
            polygons.len(),
            sites.len()
        ));
    }
    if let Some(i) = polygons.iter().position(|cell| cell.len() < 3) {
        return Err(format!("cell {i} has fewer than 3 vertices"));
    }
    Ok(polygons)
}

/// Строит отсечённые ячейки; при вырождении повторяет с возмущёнными точками
pub(crate) fn clipped_cells<R: Rng>(
    sites: &[Point],
    settings: &GraphSettings,
    rng: &mut R,
) -> Result<Cells, MapError> {
    if sites.len() < 3 {
        return Err(MapError::config(format!(
            "a diagram needs at least 3 sites, got {}",
            sites.len()
        )));
    }

    let tolerance = settings.corner_tolerance;
    let mut current = sites.to_vec();
    let mut reason = String::new();

    for attempt in 0..=settings.max_retries {
        if attempt > 0 {
            let amplitude = settings.perturbation * f64::from(1u32 << (attempt - 1).min(30));
            warn!("Диаграмма вырождена ({reason}), попытка {attempt}: возмущение {amplitude:e}");
            current = sites
                .iter()
                .map(|p| {
                    Point::new(
                        (p.x + rng.gen_range(-amplitude..=amplitude)).clamp(tolerance, 1.0 - tolerance),
                        (p.y + rng.gen_range(-amplitude..=amplitude)).clamp(tolerance, 1.0 - tolerance),
                    )
                })
                .collect();
        }

        match try_cells(&current, tolerance) {
            Ok(polygons) => {
                return Ok(Cells {
                    sites: current,
                    polygons,
                });
            }
            Err(why) => {
                debug!("Попытка {attempt} построения диаграммы не удалась: {why}");
                reason = why;
            }
        }
    }

    Err(MapError::GeometryConstruction {
        attempts: settings.max_retries + 1,
        reason,
    })
}

/// Возвращает угол для вершины, сливая её с уже существующим в пределах допуска
fn corner_for(
    corners: &mut Vec<Corner>,
    lookup: &mut SpatialHash,
    vertex: Point,
    tolerance: f64,
) -> usize {
    let snap = |v: f64| {
        if v <= tolerance {
            0.0
        } else if v >= 1.0 - tolerance {
            1.0
        } else {
            v
        }
    };
    let point = Point::new(snap(vertex.x), snap(vertex.y));

    if let Some(existing) = lookup.find(point, |id| corners[id].point) {
        return existing;
    }

    let index = corners.len();
    let mut corner = Corner::new(index, point);
    corner.border = point.x == 0.0 || point.x == 1.0 || point.y == 0.0 || point.y == 1.0;
    corners.push(corner);
    lookup.insert(point, index);
    index
}

/// Строит полностью связанный граф по (релаксированным) точкам
pub fn build_graph<R: Rng>(
    points: &[Point],
    settings: &GraphSettings,
    rng: &mut R,
) -> Result<Graph, MapError> {
    let cells = clipped_cells(points, settings, rng)?;
    let tolerance = settings.corner_tolerance;

    let mut centers: Vec<Center> = cells
        .sites
        .iter()
        .enumerate()
        .map(|(i, &p)| Center::new(i, p))
        .collect();
    let mut corners: Vec<Corner> = Vec::new();
    let mut edges: Vec<Edge> = Vec::new();
    let mut lookup = SpatialHash::new(tolerance);
    let mut edge_ids: HashMap<(usize, usize), usize> = HashMap::new();

    for (ci, polygon) in cells.polygons.iter().enumerate() {
        let mut ring: Vec<usize> = Vec::with_capacity(polygon.len());
        for &vertex in polygon {
            let q = corner_for(&mut corners, &mut lookup, vertex, tolerance);
            if ring.last() != Some(&q) {
                ring.push(q);
            }
        }
        while ring.len() > 1 && ring.first() == ring.last() {
            ring.pop();
        }
        if ring.len() < 3 {
            return Err(MapError::invariant(format!(
                "cell {ci} collapsed to {} corners after merging",
                ring.len()
            )));
        }

        for k in 0..ring.len() {
            let (a, b) = (ring[k], ring[(k + 1) % ring.len()]);
            let key = (a.min(b), a.max(b));

            match edge_ids.get(&key) {
                None => {
                    let id = edges.len();
                    edges.push(Edge {
                        index: id,
                        d0: ci,
                        d1: None,
                        v0: a,
                        v1: b,
                        river: 0,
                    });
                    edge_ids.insert(key, id);
                    corners[a].protrudes.push(id);
                    corners[b].protrudes.push(id);
                    corners[a].adjacent.push(b);
                    corners[b].adjacent.push(a);
                    centers[ci].borders.push(id);
                }
                Some(&id) => {
                    let d0 = edges[id].d0;
                    if d0 == ci {
                        continue;
                    }
                    if let Some(d1) = edges[id].d1 {
                        return Err(MapError::invariant(format!(
                            "edge {id} is shared by cells {d0}, {d1} and {ci}"
                        )));
                    }
                    edges[id].d1 = Some(ci);
                    centers[ci].borders.push(id);
                    centers[ci].neighbors.push(d0);
                    centers[d0].neighbors.push(ci);
                }
            }
        }

        for &q in &ring {
            if !corners[q].touches.contains(&ci) {
                corners[q].touches.push(ci);
            }
        }
        centers[ci].border = ring.iter().any(|&q| corners[q].border);
        centers[ci].corners = ring;
    }

    let graph = Graph::from_parts(centers, corners, edges);
    graph.validate()?;

    info!(
        "Граф построен: {} центров, {} углов, {} рёбер",
        graph.centers.len(),
        graph.corners.len(),
        graph.edges.len()
    );
    Ok(graph)
}
