//! Двойственный граф карты: центры (ячейки Вороного), углы (вершины) и рёбра.
//!
//! Все сущности живут в плоских векторах `Graph`, а взаимные ссылки являются индексами
//! в этих векторах. Топология неизменна после построения; последующие этапы меняют
//! только атрибуты.

use petgraph::graph::{NodeIndex, UnGraph};
use serde::{Deserialize, Serialize};

use crate::biome::Biome;
use crate::error::MapError;
use crate::map::Stage;

/// Точка в нормированном квадрате `[0,1]²`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    #[must_use]
    pub fn lerp(self, other: Point, t: f64) -> Point {
        Point::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }
}

/// Ячейка Вороного (регион вокруг исходной точки)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Center {
    pub index: usize,
    pub point: Point,

    pub water: bool,
    pub ocean: bool,
    pub coast: bool,
    pub border: bool,
    /// Заполняется классификатором биомов; после завершённого прогона всегда `Some`
    pub biome: Option<Biome>,
    pub elevation: f64,
    pub moisture: f64,

    /// Углы многоугольника в порядке обхода
    pub corners: Vec<usize>,
    pub neighbors: Vec<usize>,
    /// Рёбра, ограничивающие ячейку
    pub borders: Vec<usize>,
}

impl Center {
    #[must_use]
    pub fn new(index: usize, point: Point) -> Self {
        Self {
            index,
            point,
            ..Default::default()
        }
    }

    /// Озеро: вода, не связанная с внешним океаном
    #[must_use]
    pub fn lake(&self) -> bool {
        self.water && !self.ocean
    }
}

/// Вершина Вороного
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Corner {
    pub index: usize,
    pub point: Point,

    pub water: bool,
    pub ocean: bool,
    pub coast: bool,
    pub border: bool,
    pub elevation: f64,
    pub moisture: f64,
    /// Сколько русел прошло через угол
    pub river: u32,
    /// Соседний угол со строго меньшей высотой
    pub downslope: Option<usize>,

    /// Рёбра, выходящие из угла
    pub protrudes: Vec<usize>,
    /// Центры, которых касается угол
    pub touches: Vec<usize>,
    pub adjacent: Vec<usize>,
}

impl Corner {
    #[must_use]
    pub fn new(index: usize, point: Point) -> Self {
        Self {
            index,
            point,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn lake(&self) -> bool {
        self.water && !self.ocean
    }
}

/// Ребро Вороного между двумя углами и двумя центрами.
///
/// На периметре карты у ребра только один центр: `d1 == None`.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub index: usize,
    pub d0: usize,
    pub d1: Option<usize>,
    pub v0: usize,
    pub v1: usize,
    /// Ширина реки (0 = реки нет)
    pub river: u32,
}

impl Edge {
    #[must_use]
    pub fn is_interior(&self) -> bool {
        self.d1.is_some()
    }

    /// Второй конец ребра относительно угла `corner`
    #[must_use]
    pub fn other_corner(&self, corner: usize) -> Option<usize> {
        if self.v0 == corner {
            Some(self.v1)
        } else if self.v1 == corner {
            Some(self.v0)
        } else {
            None
        }
    }

    /// Середина отрезка `v0`–`v1`
    #[must_use]
    pub fn midpoint(&self, corners: &[Corner]) -> Point {
        corners[self.v0].point.lerp(corners[self.v1].point, 0.5)
    }

    /// Центр по другую сторону ребра
    #[must_use]
    pub fn other_center(&self, center: usize) -> Option<usize> {
        if self.d0 == center {
            self.d1
        } else if self.d1 == Some(center) {
            Some(self.d0)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Graph {
    pub centers: Vec<Center>,
    pub corners: Vec<Corner>,
    pub edges: Vec<Edge>,
    reached: Option<Stage>,
}

impl Graph {
    pub(crate) fn from_parts(centers: Vec<Center>, corners: Vec<Corner>, edges: Vec<Edge>) -> Self {
        Self {
            centers,
            corners,
            edges,
            reached: Some(Stage::Graph),
        }
    }

    /// Последний завершённый этап
    #[must_use]
    pub fn stage(&self) -> Option<Stage> {
        self.reached
    }

    /// Проверяет, что последним выполнен именно этап `stage`.
    ///
    /// Этап не может пропустить предшественника и не может повториться на графе,
    /// ушедшем дальше.
    pub fn require(&self, stage: Stage) -> Result<(), MapError> {
        match self.reached {
            Some(reached) if reached == stage => Ok(()),
            reached => Err(MapError::invariant(format!(
                "expected graph right after stage '{}', graph is at {:?}",
                stage.name(),
                reached.map(Stage::name)
            ))),
        }
    }

    pub(crate) fn mark(&mut self, stage: Stage) {
        self.reached = Some(stage);
    }

    #[must_use]
    pub fn interior_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(|e| e.is_interior())
    }

    /// Ребро, соединяющее два угла
    #[must_use]
    pub fn edge_between(&self, a: usize, b: usize) -> Option<usize> {
        self.corners[a]
            .protrudes
            .iter()
            .copied()
            .find(|&e| self.edges[e].other_corner(a) == Some(b))
    }

    /// Многоугольник ячейки, отсортированный по углу вокруг её точки
    #[must_use]
    pub fn polygon(&self, center: usize) -> Vec<Point> {
        let c = &self.centers[center];
        let mut ring: Vec<Point> = c.corners.iter().map(|&q| self.corners[q].point).collect();
        ring.sort_by(|a, b| {
            let angle_a = (a.y - c.point.y).atan2(a.x - c.point.x);
            let angle_b = (b.y - c.point.y).atan2(b.x - c.point.x);
            angle_a.total_cmp(&angle_b)
        });
        ring
    }

    /// Граф смежности центров; `NodeIndex::new(i)` соответствует центру `i`
    #[must_use]
    pub fn center_graph(&self) -> UnGraph<usize, ()> {
        let mut graph = UnGraph::with_capacity(self.centers.len(), self.edges.len());
        for center in &self.centers {
            graph.add_node(center.index);
        }
        for edge in &self.edges {
            if let Some(d1) = edge.d1 {
                graph.add_edge(NodeIndex::new(edge.d0), NodeIndex::new(d1), ());
            }
        }
        graph
    }

    /// Проверка ссылочной целостности и планарности после построения
    pub fn validate(&self) -> Result<(), MapError> {
        let centers = self.centers.len();
        let corners = self.corners.len();

        for (i, edge) in self.edges.iter().enumerate() {
            if edge.index != i {
                return Err(MapError::invariant(format!("edge {i} has index {}", edge.index)));
            }
            if edge.v0 >= corners || edge.v1 >= corners || edge.v0 == edge.v1 {
                return Err(MapError::invariant(format!(
                    "edge {i} has invalid corners ({}, {})",
                    edge.v0, edge.v1
                )));
            }
            if edge.d0 >= centers || edge.d1.is_some_and(|d| d >= centers || d == edge.d0) {
                return Err(MapError::invariant(format!(
                    "edge {i} has invalid centers ({}, {:?})",
                    edge.d0, edge.d1
                )));
            }
            if edge.d1.is_none() && !(self.corners[edge.v0].border && self.corners[edge.v1].border)
            {
                return Err(MapError::invariant(format!(
                    "edge {i} has a single center but is not on the map boundary"
                )));
            }
        }

        for center in &self.centers {
            if center.corners.len() < 3 {
                return Err(MapError::invariant(format!(
                    "center {} has only {} corners",
                    center.index,
                    center.corners.len()
                )));
            }
            if center.corners.iter().any(|&q| q >= corners)
                || center.neighbors.iter().any(|&n| n >= centers)
            {
                return Err(MapError::invariant(format!(
                    "center {} references a missing entity",
                    center.index
                )));
            }
        }

        for corner in &self.corners {
            if corner.touches.is_empty() || corner.touches.iter().any(|&c| c >= centers) {
                return Err(MapError::invariant(format!(
                    "corner {} touches no valid center",
                    corner.index
                )));
            }
        }
        Ok(())
    }
}
