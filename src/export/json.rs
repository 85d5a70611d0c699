//! Табличная выгрузка: строка на каждый центр и на каждое ребро с рекой

use std::fs;
use std::path::Path;

use log::info;
use serde::Serialize;

use super::{ExportError, GeoFrame, ensure_complete};
use crate::biome::Biome;
use crate::graph::Graph;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CenterRow {
    pub id: usize,
    pub biome: Biome,
    pub water: bool,
    pub ocean: bool,
    pub coast: bool,
    pub border: bool,
    pub elevation: f64,
    pub moisture: f64,
    /// Хотя бы одно ребро ячейки несёт реку
    pub river: bool,
    /// `[lng, lat]` точки ячейки
    pub site: [f64; 2],
    /// Замкнутое кольцо: первая вершина повторена в конце
    pub polygon: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiverRow {
    pub id: usize,
    pub width: u32,
    pub line: [[f64; 2]; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapRows {
    pub seed: u64,
    pub centers: Vec<CenterRow>,
    /// Каждая пара соседей ровно один раз, `a < b`
    pub neighbors: Vec<(usize, usize)>,
    pub rivers: Vec<RiverRow>,
}

/// Строки для всей карты
pub fn map_rows(graph: &Graph, seed: u64, frame: &GeoFrame) -> Result<MapRows, ExportError> {
    ensure_complete(graph)?;

    let mut centers = Vec::with_capacity(graph.centers.len());
    for center in &graph.centers {
        let biome = center.biome.ok_or_else(|| {
            ExportError::Incomplete(format!("center {} has no biome", center.index))
        })?;
        let mut polygon: Vec<[f64; 2]> = graph
            .polygon(center.index)
            .into_iter()
            .map(|p| frame.to_lnglat(p))
            .collect();
        if let Some(&first) = polygon.first() {
            polygon.push(first);
        }

        centers.push(CenterRow {
            id: center.index,
            biome,
            water: center.water,
            ocean: center.ocean,
            coast: center.coast,
            border: center.border,
            elevation: center.elevation,
            moisture: center.moisture,
            river: center.borders.iter().any(|&e| graph.edges[e].river > 0),
            site: frame.to_lnglat(center.point),
            polygon,
        });
    }

    let mut neighbors: Vec<(usize, usize)> = graph
        .centers
        .iter()
        .flat_map(|c| {
            c.neighbors
                .iter()
                .filter(move |&&n| c.index < n)
                .map(move |&n| (c.index, n))
        })
        .collect();
    neighbors.sort_unstable();
    neighbors.dedup();

    let rivers = graph
        .edges
        .iter()
        .filter(|e| e.river > 0)
        .map(|e| RiverRow {
            id: e.index,
            width: e.river,
            line: [
                frame.to_lnglat(graph.corners[e.v0].point),
                frame.to_lnglat(graph.corners[e.v1].point),
            ],
        })
        .collect();

    Ok(MapRows {
        seed,
        centers,
        neighbors,
        rivers,
    })
}

/// Сохраняет строки карты в JSON-файл
pub fn save_json(
    graph: &Graph,
    seed: u64,
    frame: &GeoFrame,
    path: impl AsRef<Path>,
) -> Result<(), ExportError> {
    let rows = map_rows(graph, seed, frame)?;
    let contents = serde_json::to_string_pretty(&rows)?;
    fs::write(path.as_ref(), contents)?;
    info!(
        "JSON сохранён в {:?}: {} центров, {} пар соседей, {} рёбер с рекой",
        path.as_ref(),
        rows.centers.len(),
        rows.neighbors.len(),
        rows.rivers.len()
    );
    Ok(())
}
