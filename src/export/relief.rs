//! Рельеф суши в градациях серого с отмывкой (hillshade).
//!
//! Высота внутри ячейки интерполируется плоскостью по треугольникам
//! (точка ячейки, угол, следующий угол), затем сглаживается медианным фильтром,
//! получает мелкую «холмистую» текстуру и освещается с северо-запада.

use std::path::Path;

use fastnoise_lite::{FastNoiseLite, FractalType, NoiseType};
use image::GrayImage;
use log::info;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{ExportError, ensure_complete};
use crate::graph::{Graph, Point};

/// Параметры растра рельефа
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReliefSettings {
    /// Сторона квадратного растра в пикселях
    #[serde(default = "default_size")]
    pub size: u32,

    /// Высота в метрах, соответствующая относительной высоте 1.0
    #[serde(default = "default_max_height")]
    pub max_height: f64,

    /// Шаг растра в метрах
    #[serde(default = "default_cell_size")]
    pub cell_size: f64,

    /// Сторона окна медианного фильтра в пикселях (0 или 1 отключают фильтр)
    #[serde(default = "default_median_window")]
    pub median_window: u32,

    /// Азимут источника света в градусах
    #[serde(default = "default_azimuth")]
    pub azimuth: f64,

    /// Высота источника света над горизонтом в градусах
    #[serde(default = "default_altitude")]
    pub altitude: f64,
}

fn default_size() -> u32 {
    512
}
fn default_max_height() -> f64 {
    500.0
}
fn default_cell_size() -> f64 {
    10.0
}
fn default_median_window() -> u32 {
    6
}
fn default_azimuth() -> f64 {
    225.0
}
fn default_altitude() -> f64 {
    45.0
}

impl Default for ReliefSettings {
    fn default() -> Self {
        Self {
            size: default_size(),
            max_height: default_max_height(),
            cell_size: default_cell_size(),
            median_window: default_median_window(),
            azimuth: default_azimuth(),
            altitude: default_altitude(),
        }
    }
}

/// Допуск на рёбрах треугольника
const INSIDE_EPS: f64 = 1e-9;

/// Треугольник с высотами в вершинах
struct Facet {
    points: [Point; 3],
    heights: [f64; 3],
}

impl Facet {
    /// Барицентрическая интерполяция; `None`, если точка снаружи
    fn height_at(&self, p: Point) -> Option<f64> {
        let [a, b, c] = self.points;
        let det = (b.y - c.y) * (a.x - c.x) + (c.x - b.x) * (a.y - c.y);
        if det.abs() < f64::EPSILON {
            return None;
        }
        let l1 = ((b.y - c.y) * (p.x - c.x) + (c.x - b.x) * (p.y - c.y)) / det;
        let l2 = ((c.y - a.y) * (p.x - c.x) + (a.x - c.x) * (p.y - c.y)) / det;
        let l3 = 1.0 - l1 - l2;
        if l1 < -INSIDE_EPS || l2 < -INSIDE_EPS || l3 < -INSIDE_EPS {
            return None;
        }
        Some(l1 * self.heights[0] + l2 * self.heights[1] + l3 * self.heights[2])
    }
}

/// Треугольники всех ячеек суши
fn land_facets(graph: &Graph) -> Vec<Facet> {
    let mut facets = Vec::new();
    for center in graph.centers.iter().filter(|c| !c.water) {
        let mut ring = center.corners.clone();
        let angle = |q: usize| {
            let p = graph.corners[q].point;
            (p.y - center.point.y).atan2(p.x - center.point.x)
        };
        ring.sort_by(|&a, &b| angle(a).total_cmp(&angle(b)));

        for k in 0..ring.len() {
            let (q1, q2) = (ring[k], ring[(k + 1) % ring.len()]);
            facets.push(Facet {
                points: [center.point, graph.corners[q1].point, graph.corners[q2].point],
                heights: [
                    center.elevation,
                    graph.corners[q1].elevation,
                    graph.corners[q2].elevation,
                ],
            });
        }
    }
    facets
}

/// Относительная высота суши в растре `size × size` (строка 0 на севере), вода = 0
#[must_use]
pub fn rasterize_elevation(graph: &Graph, size: u32) -> Vec<f32> {
    let n = size as usize;
    let mut heights = vec![0.0_f32; n * n];
    let scale = f64::from(size);

    for facet in land_facets(graph) {
        let xs = facet.points.map(|p| p.x * scale);
        let ys = facet.points.map(|p| (1.0 - p.y) * scale);
        let min = |v: [f64; 3]| v.into_iter().fold(f64::INFINITY, f64::min);
        let max = |v: [f64; 3]| v.into_iter().fold(f64::NEG_INFINITY, f64::max);

        let x0 = min(xs).floor().max(0.0) as usize;
        let x1 = (max(xs).ceil() as usize).min(n);
        let y0 = min(ys).floor().max(0.0) as usize;
        let y1 = (max(ys).ceil() as usize).min(n);

        for py in y0..y1 {
            for px in x0..x1 {
                let p = Point::new(
                    (px as f64 + 0.5) / scale,
                    1.0 - (py as f64 + 0.5) / scale,
                );
                if let Some(h) = facet.height_at(p) {
                    heights[py * n + px] = h.clamp(0.0, 1.0) as f32;
                }
            }
        }
    }
    heights
}

/// Индекс за краем растра отражается обратно: `d c b a | a b c d`
fn reflect(i: isize, n: usize) -> usize {
    let n = n as isize;
    let i = if i < 0 { -i - 1 } else { i };
    let i = if i >= n { 2 * n - i - 1 } else { i };
    i.clamp(0, n - 1) as usize
}

/// Медианный фильтр с квадратным окном `window × window` по вещественным высотам.
///
/// При чётном окне центр смещён к концу: смещения от `-w/2` до `w - w/2 - 1`.
fn smooth(heights: &[f32], size: u32, window: u32) -> Vec<f32> {
    if window <= 1 {
        return heights.to_vec();
    }
    let n = size as usize;
    let low = -((window / 2) as isize);
    let high = low + window as isize;

    let filter_row = |(y, line): (usize, &mut [f32])| {
        let mut samples = Vec::with_capacity((window * window) as usize);
        for (x, out) in line.iter_mut().enumerate() {
            samples.clear();
            for dy in low..high {
                let row = reflect(y as isize + dy, n) * n;
                for dx in low..high {
                    samples.push(heights[row + reflect(x as isize + dx, n)]);
                }
            }
            let mid = samples.len() / 2;
            let (_, median, _) = samples.select_nth_unstable_by(mid, f32::total_cmp);
            *out = *median;
        }
    };

    let mut smoothed = vec![0.0_f32; n * n];
    #[cfg(feature = "parallel")]
    smoothed.par_chunks_mut(n).enumerate().for_each(filter_row);
    #[cfg(not(feature = "parallel"))]
    smoothed.chunks_mut(n).enumerate().for_each(filter_row);
    smoothed
}

fn hill_noise(seed: u64) -> FastNoiseLite {
    let mut noise = FastNoiseLite::new();
    noise.set_seed(Some(seed as i32));
    noise.set_noise_type(Some(NoiseType::OpenSimplex2));
    noise.set_fractal_type(Some(FractalType::FBm));
    noise.set_fractal_octaves(Some(2));
    noise.set_frequency(Some(0.03));
    noise
}

/// Мелкая текстура холмов: амплитуда растёт с высотой, вода не затрагивается
fn add_hills(heights: &mut [f32], size: u32, seed: u64) {
    let noise = hill_noise(seed);
    let row = |(y, line): (usize, &mut [f32])| {
        for (x, h) in line.iter_mut().enumerate() {
            if *h > 0.0 {
                let amplitude = 0.004 + 0.004 * *h;
                *h += amplitude * noise.get_noise_2d(x as f32, y as f32);
            }
        }
    };

    #[cfg(feature = "parallel")]
    heights
        .par_chunks_mut(size as usize)
        .enumerate()
        .for_each(row);
    #[cfg(not(feature = "parallel"))]
    heights.chunks_mut(size as usize).enumerate().for_each(row);
}

/// Отмывка по формуле Хорна, результат `255·(shaded + 1) / 2`
fn hillshade(meters: &[f64], size: u32, settings: &ReliefSettings) -> Vec<u8> {
    let n = size as usize;
    let zenith = (90.0 - settings.altitude).to_radians();
    let azimuth = (360.0 - settings.azimuth + 90.0).rem_euclid(360.0).to_radians();
    let cell = settings.cell_size;

    let at = |x: isize, y: isize| {
        let x = x.clamp(0, n as isize - 1) as usize;
        let y = y.clamp(0, n as isize - 1) as usize;
        meters[y * n + x]
    };
    let shade = |i: usize| {
        let (x, y) = ((i % n) as isize, (i / n) as isize);
        let (a, b, c) = (at(x - 1, y - 1), at(x, y - 1), at(x + 1, y - 1));
        let (d, f) = (at(x - 1, y), at(x + 1, y));
        let (g, h, k) = (at(x - 1, y + 1), at(x, y + 1), at(x + 1, y + 1));

        let dzdx = ((c + 2.0 * f + k) - (a + 2.0 * d + g)) / (8.0 * cell);
        let dzdy = ((g + 2.0 * h + k) - (a + 2.0 * b + c)) / (8.0 * cell);
        let slope = dzdx.hypot(dzdy).atan();
        let aspect = dzdy.atan2(-dzdx);

        let shaded = zenith.cos() * slope.cos()
            + zenith.sin() * slope.sin() * (azimuth - aspect).cos();
        (255.0 * (shaded + 1.0) / 2.0).clamp(0.0, 255.0) as u8
    };

    #[cfg(feature = "parallel")]
    let pixels: Vec<u8> = (0..n * n).into_par_iter().map(shade).collect();
    #[cfg(not(feature = "parallel"))]
    let pixels: Vec<u8> = (0..n * n).map(shade).collect();
    pixels
}

/// Полный конвейер рельефа: растр, сглаживание, холмы, метры, отмывка
pub fn render_relief(
    graph: &Graph,
    seed: u64,
    settings: &ReliefSettings,
) -> Result<GrayImage, ExportError> {
    ensure_complete(graph)?;
    let size = settings.size;

    let raster = rasterize_elevation(graph, size);
    let mut heights = smooth(&raster, size, settings.median_window);
    add_hills(&mut heights, size, seed);

    let meters: Vec<f64> = heights
        .iter()
        .map(|&h| f64::from(h.max(0.0)) * settings.max_height)
        .collect();
    let pixels = hillshade(&meters, size, settings);

    GrayImage::from_raw(size, size, pixels)
        .ok_or_else(|| ExportError::Incomplete("relief raster has wrong length".to_string()))
}

pub fn save_relief_png(
    graph: &Graph,
    seed: u64,
    settings: &ReliefSettings,
    path: impl AsRef<Path>,
) -> Result<(), ExportError> {
    let image = render_relief(graph, seed, settings)?;
    image.save(path.as_ref())?;
    info!(
        "Рельеф {}×{} сохранён в {:?}",
        settings.size,
        settings.size,
        path.as_ref()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapConfig;
    use crate::map::Map;

    #[test]
    fn facet_interpolates_plane() {
        let facet = Facet {
            points: [Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(0.0, 1.0)],
            heights: [0.0, 1.0, 2.0],
        };
        let h = facet.height_at(Point::new(0.25, 0.25)).unwrap();
        assert!((h - 0.75).abs() < 1e-12);
        assert!(facet.height_at(Point::new(0.9, 0.9)).is_none());
    }

    #[test]
    fn reflect_mirrors_edges() {
        assert_eq!(reflect(-1, 4), 0);
        assert_eq!(reflect(-2, 4), 1);
        assert_eq!(reflect(2, 4), 2);
        assert_eq!(reflect(4, 4), 3);
        assert_eq!(reflect(5, 4), 2);
    }

    #[test]
    fn median_removes_spike_without_quantizing() {
        let size = 12;
        let level = 0.123_456_7_f32;
        let mut heights = vec![level; 144];
        heights[6 * 12 + 6] = 1.0;

        let smoothed = smooth(&heights, size, ReliefSettings::default().median_window);
        assert!(smoothed.iter().all(|&h| h == level));
    }

    #[test]
    fn median_keeps_gentle_slope() {
        let size = 16;
        let heights: Vec<f32> = (0..256).map(|i| (i % 16) as f32 * 0.001).collect();
        let smoothed = smooth(&heights, size, 6);
        // монотонный склон вдоль x: медиана строки окна остаётся на склоне
        for y in 0..16 {
            for x in 4..12 {
                let h = smoothed[y * 16 + x];
                assert!((h - x as f32 * 0.001).abs() <= 0.001 + 1e-6);
            }
        }
        assert!(smoothed.iter().any(|&h| h > 0.0 && h < 0.004));
    }

    #[test]
    fn flat_ground_is_evenly_lit() {
        let settings = ReliefSettings::default();
        let pixels = hillshade(&[0.0; 16], 4, &settings);
        // cos(45°) → 255 · (0.707 + 1) / 2
        assert!(pixels.iter().all(|&p| p == pixels[0]));
        assert_eq!(pixels[0], 217);
    }

    #[test]
    fn water_stays_at_sea_level() {
        let map = Map::generate(&MapConfig::new(14, 200)).unwrap();
        let raster = rasterize_elevation(map.graph(), 64);
        assert_eq!(raster.len(), 64 * 64);
        // углы растра лежат в граничных (океанских) ячейках
        assert_eq!(raster[0], 0.0);
        assert_eq!(raster[64 * 64 - 1], 0.0);
        assert!(raster.iter().all(|&h| (0.0..=1.0).contains(&h)));
        assert!(raster.iter().any(|&h| h > 0.0));
    }

    #[test]
    fn relief_has_requested_size() {
        let map = Map::generate(&MapConfig::new(15, 150)).unwrap();
        let settings = ReliefSettings {
            size: 48,
            ..Default::default()
        };
        let image = render_relief(map.graph(), map.seed(), &settings).unwrap();
        assert_eq!(image.dimensions(), (48, 48));
    }
}
