//! Карта биомов в PNG: залитые многоугольники ячеек и реки поверх

use std::path::Path;

use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut, draw_polygon_mut};
use imageproc::point::Point as PixelPoint;
use log::info;

use super::{ExportError, ensure_complete};
use crate::graph::{Graph, Point};

const BACKGROUND: Rgba<u8> = Rgba([68, 68, 122, 255]);
const RIVER: Rgba<u8> = Rgba([34, 85, 136, 255]);

/// Пиксельные координаты; ось y направлена вниз, поэтому переворачивается
fn to_pixel(point: Point, size: u32) -> (f32, f32) {
    let scale = size as f64;
    ((point.x * scale) as f32, ((1.0 - point.y) * scale) as f32)
}

/// Кольцо вершин в пикселях, пригодное для `draw_polygon_mut`.
///
/// Совпавшие после округления соседние вершины схлопываются, а последняя не может
/// совпадать с первой.
fn pixel_ring(polygon: &[Point], size: u32) -> Vec<PixelPoint<i32>> {
    let mut ring: Vec<PixelPoint<i32>> = Vec::with_capacity(polygon.len());
    for &p in polygon {
        let (x, y) = to_pixel(p, size);
        let pixel = PixelPoint::new(x.round() as i32, y.round() as i32);
        if ring.last() != Some(&pixel) {
            ring.push(pixel);
        }
    }
    while ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    ring
}

/// Толщина русла в пикселях
fn river_radius(width: u32, size: u32) -> i32 {
    let base = (size as f64 / 1000.0).max(0.5);
    (base * f64::from(width).sqrt()).round() as i32
}

/// Рисует карту биомов на квадратном холсте `size × size`
pub fn render_biomes(graph: &Graph, size: u32) -> Result<RgbaImage, ExportError> {
    ensure_complete(graph)?;
    let mut image = RgbaImage::from_pixel(size, size, BACKGROUND);

    for center in &graph.centers {
        let Some(biome) = center.biome else {
            return Err(ExportError::Incomplete(format!(
                "center {} has no biome",
                center.index
            )));
        };
        let [r, g, b] = biome.to_rgb();
        let ring = pixel_ring(&graph.polygon(center.index), size);
        if ring.len() >= 3 {
            draw_polygon_mut(&mut image, &ring, Rgba([r, g, b, 255]));
        }
    }

    for edge in graph.edges.iter().filter(|e| e.river > 0) {
        let start = to_pixel(graph.corners[edge.v0].point, size);
        let end = to_pixel(graph.corners[edge.v1].point, size);
        let radius = river_radius(edge.river, size);

        if radius == 0 {
            draw_line_segment_mut(&mut image, start, end, RIVER);
            continue;
        }
        // Широкое русло рисуется цепочкой кругов вдоль ребра
        let length = (end.0 - start.0).hypot(end.1 - start.1);
        let steps = (length / radius as f32).ceil().max(1.0) as usize;
        for k in 0..=steps {
            let t = k as f32 / steps as f32;
            let x = start.0 + (end.0 - start.0) * t;
            let y = start.1 + (end.1 - start.1) * t;
            draw_filled_circle_mut(&mut image, (x.round() as i32, y.round() as i32), radius, RIVER);
        }
    }
    Ok(image)
}

pub fn save_biome_png(graph: &Graph, size: u32, path: impl AsRef<Path>) -> Result<(), ExportError> {
    let image = render_biomes(graph, size)?;
    image.save(path.as_ref())?;
    info!("Карта биомов {size}×{size} сохранена в {:?}", path.as_ref());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biome::Biome;
    use crate::config::MapConfig;
    use crate::map::Map;

    #[test]
    fn ring_drops_repeated_and_closing_points() {
        let polygon = [
            Point::new(0.0, 0.0),
            Point::new(0.0001, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 0.0),
        ];
        let ring = pixel_ring(&polygon, 10);
        assert_eq!(ring.len(), 3);
        assert_ne!(ring.first(), ring.last());
    }

    #[test]
    fn y_axis_is_flipped() {
        assert_eq!(to_pixel(Point::new(0.0, 1.0), 100), (0.0, 0.0));
        assert_eq!(to_pixel(Point::new(1.0, 0.0), 100), (100.0, 100.0));
    }

    #[test]
    fn renders_biome_colors() {
        let map = Map::generate(&MapConfig::new(12, 200)).unwrap();
        let image = render_biomes(map.graph(), 128).unwrap();
        assert_eq!(image.dimensions(), (128, 128));

        // угол карты всегда океан
        let [r, g, b] = Biome::Ocean.to_rgb();
        assert_eq!(image.get_pixel(1, 1), &Rgba([r, g, b, 255]));
    }
}
