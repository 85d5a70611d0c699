// src/config.rs
//! Конфигурация генерации карты
//!
//! Этот модуль определяет все параметры, управляющие процедурной генерацией острова:
//! - Число точек и релаксация Ллойда
//! - Допуски построения диаграммы Вороного
//! - Форма острова и доля суши
//! - Рельеф, реки и влажность
//!
//! Все структуры поддерживают сериализацию в TOML/JSON для удобной настройки через конфигурационные файлы.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::MapError;

/// Параметры выборки точек
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SamplingSettings {
    /// Максимальное число итераций релаксации Ллойда (0 = без релаксации)
    #[serde(default = "default_lloyd_iterations")]
    pub lloyd_iterations: usize,

    /// Релаксация останавливается раньше, если ни одна точка не сдвинулась больше этого значения
    #[serde(default = "default_lloyd_tolerance")]
    pub lloyd_tolerance: f64,
}

fn default_lloyd_iterations() -> usize {
    2
}
fn default_lloyd_tolerance() -> f64 {
    1e-4
}

impl Default for SamplingSettings {
    fn default() -> Self {
        Self {
            lloyd_iterations: 2,
            lloyd_tolerance: 1e-4,
        }
    }
}

/// Параметры построения графа
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphSettings {
    /// Углы ближе этого расстояния сливаются в один
    #[serde(default = "default_corner_tolerance")]
    pub corner_tolerance: f64,

    /// Сколько раз перезапускать построение с возмущёнными точками
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Начальная амплитуда возмущения (удваивается с каждой попыткой)
    #[serde(default = "default_perturbation")]
    pub perturbation: f64,
}

fn default_corner_tolerance() -> f64 {
    1e-6
}
fn default_max_retries() -> usize {
    8
}
fn default_perturbation() -> f64 {
    1e-6
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            corner_tolerance: 1e-6,
            max_retries: 8,
            perturbation: 1e-6,
        }
    }
}

/// Форма острова
///
/// Шум FBm умножается на радиальный спад от центра карты, после чего лучшие по оценке
/// ячейки становятся сушей.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IslandSettings {
    /// Целевая доля суши среди всех ячеек:
    /// - `0.0`: только океан,
    /// - `1.0`: суша везде, кроме граничных ячеек.
    #[serde(default = "default_land_fraction")]
    pub land_fraction: f64,

    /// Число октав FBm
    #[serde(default = "default_octaves")]
    pub octaves: i32,

    /// Частота шума в нормированных координатах `[0,1]`
    #[serde(default = "default_frequency")]
    pub frequency: f32,

    /// Степень радиального спада:
    /// - `<1.0` → суша прижимается к центру,
    /// - `>1.0` → спад только у самых краёв.
    #[serde(default = "default_falloff_exponent")]
    pub falloff_exponent: f64,
}

fn default_land_fraction() -> f64 {
    0.45
}
fn default_octaves() -> i32 {
    4
}
fn default_frequency() -> f32 {
    3.0
}
fn default_falloff_exponent() -> f64 {
    2.0
}

impl Default for IslandSettings {
    fn default() -> Self {
        Self {
            land_fraction: 0.45,
            octaves: 4,
            frequency: 3.0,
            falloff_exponent: 2.0,
        }
    }
}

/// Параметры распространения высоты от побережья
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElevationSettings {
    /// Базовая стоимость любого шага между углами
    #[serde(default = "default_water_step")]
    pub water_step: f64,

    /// Дополнительная стоимость шага, если оба угла на суше
    #[serde(default = "default_land_step")]
    pub land_step: f64,

    /// Амплитуда случайной добавки к сухопутному шагу (убирает террасы)
    #[serde(default = "default_jitter")]
    pub jitter: f64,
}

fn default_water_step() -> f64 {
    0.01
}
fn default_land_step() -> f64 {
    1.0
}
fn default_jitter() -> f64 {
    1.0
}

impl Default for ElevationSettings {
    fn default() -> Self {
        Self {
            water_step: 0.01,
            land_step: 1.0,
            jitter: 1.0,
        }
    }
}

/// Параметры рек
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiverSettings {
    /// Число попыток заложить исток (`None` = половина числа точек)
    #[serde(default)]
    pub attempts: Option<usize>,

    /// Истоки только выше этой высоты
    #[serde(default = "default_min_source_elevation")]
    pub min_source_elevation: f64,

    /// И не выше этой
    #[serde(default = "default_max_source_elevation")]
    pub max_source_elevation: f64,
}

fn default_min_source_elevation() -> f64 {
    0.3
}
fn default_max_source_elevation() -> f64 {
    0.9
}

impl Default for RiverSettings {
    fn default() -> Self {
        Self {
            attempts: None,
            min_source_elevation: 0.3,
            max_source_elevation: 0.9,
        }
    }
}

/// Параметры влажности
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MoistureSettings {
    /// Затухание за один шаг по графу углов (строго между 0 и 1)
    #[serde(default = "default_decay")]
    pub decay: f64,

    /// Влажность у пресной воды (озёра)
    #[serde(default = "default_fresh_water_moisture")]
    pub fresh_water_moisture: f64,

    /// Вклад одного прохода реки через угол (итог ограничен 3.0)
    #[serde(default = "default_river_moisture")]
    pub river_moisture: f64,

    /// Умеренная влажность морского побережья
    #[serde(default = "default_coast_moisture")]
    pub coast_moisture: f64,
}

fn default_decay() -> f64 {
    0.9
}
fn default_fresh_water_moisture() -> f64 {
    1.0
}
fn default_river_moisture() -> f64 {
    0.2
}
fn default_coast_moisture() -> f64 {
    0.5
}

impl Default for MoistureSettings {
    fn default() -> Self {
        Self {
            decay: 0.9,
            fresh_water_moisture: 1.0,
            river_moisture: 0.2,
            coast_moisture: 0.5,
        }
    }
}

/// Основные параметры генерации карты
///
/// Полная конфигурация одного прогона. Поддерживает загрузку из TOML-файлов.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MapConfig {
    /// Сид генератора (если не задан, выбирается случайно и сообщается в логах)
    #[serde(default)]
    pub seed: Option<u64>,

    /// Количество ячеек Вороного (по умолчанию 3000)
    #[serde(default = "default_points")]
    pub points: usize,

    #[serde(default)]
    pub sampling: SamplingSettings,

    #[serde(default)]
    pub graph: GraphSettings,

    #[serde(default)]
    pub island: IslandSettings,

    #[serde(default)]
    pub elevation: ElevationSettings,

    #[serde(default)]
    pub rivers: RiverSettings,

    #[serde(default)]
    pub moisture: MoistureSettings,
}

fn default_points() -> usize {
    3000
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            seed: None,
            points: 3000,
            sampling: SamplingSettings::default(),
            graph: GraphSettings::default(),
            island: IslandSettings::default(),
            elevation: ElevationSettings::default(),
            rivers: RiverSettings::default(),
            moisture: MoistureSettings::default(),
        }
    }
}

impl MapConfig {
    /// Конфигурация по умолчанию с заданными сидом и числом точек
    #[must_use]
    pub fn new(seed: u64, points: usize) -> Self {
        Self {
            seed: Some(seed),
            points,
            ..Default::default()
        }
    }

    /// Загружает параметры из TOML-файла
    ///
    /// # Пример
    /// ```toml
    /// # map.toml
    /// seed = 42
    /// points = 2000
    ///
    /// [island]
    /// land_fraction = 0.3
    /// ```
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, MapError> {
        let contents = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Число попыток заложить реку для этой конфигурации
    #[must_use]
    pub fn river_attempts(&self) -> usize {
        self.rivers.attempts.unwrap_or(self.points / 2)
    }

    /// Проверяет параметры до начала генерации
    pub fn validate(&self) -> Result<(), MapError> {
        if self.points < 3 {
            return Err(MapError::config(format!(
                "at least 3 points are required, got {}",
                self.points
            )));
        }
        if !(self.sampling.lloyd_tolerance >= 0.0) {
            return Err(MapError::config("lloyd_tolerance must be non-negative"));
        }
        if !(self.graph.corner_tolerance > 0.0) || !(self.graph.perturbation > 0.0) {
            return Err(MapError::config(
                "corner_tolerance and perturbation must be positive",
            ));
        }
        if !(0.0..=1.0).contains(&self.island.land_fraction) {
            return Err(MapError::config(format!(
                "land_fraction must be within [0, 1], got {}",
                self.island.land_fraction
            )));
        }
        if self.island.octaves < 1 || !(self.island.frequency > 0.0) {
            return Err(MapError::config("noise octaves and frequency must be positive"));
        }
        if !(self.island.falloff_exponent > 0.0) {
            return Err(MapError::config("falloff_exponent must be positive"));
        }
        if !(self.elevation.water_step > 0.0)
            || self.elevation.land_step < 0.0
            || self.elevation.jitter < 0.0
        {
            return Err(MapError::config(
                "water_step must be positive, land_step and jitter non-negative",
            ));
        }
        if self.rivers.min_source_elevation > self.rivers.max_source_elevation {
            return Err(MapError::config(format!(
                "river source band is inverted: {} > {}",
                self.rivers.min_source_elevation, self.rivers.max_source_elevation
            )));
        }
        let decay = self.moisture.decay;
        if !(decay > 0.0 && decay < 1.0) {
            return Err(MapError::config(format!(
                "moisture decay must be within (0, 1), got {decay}"
            )));
        }
        Ok(())
    }
}

/// Готовые наборы параметров
pub mod presets {
    use super::{IslandSettings, MapConfig};

    /// Небольшой остров для быстрых прогонов
    #[must_use]
    pub fn small_island(seed: u64) -> MapConfig {
        MapConfig {
            island: IslandSettings {
                land_fraction: 0.3,
                ..Default::default()
            },
            ..MapConfig::new(seed, 500)
        }
    }

    /// Крупный массив суши, занимающий большую часть карты
    #[must_use]
    pub fn continent(seed: u64) -> MapConfig {
        MapConfig {
            island: IslandSettings {
                land_fraction: 0.65,
                octaves: 3,
                frequency: 2.0,
                falloff_exponent: 3.0,
            },
            ..MapConfig::new(seed, 4000)
        }
    }

    /// Много мелких островов
    #[must_use]
    pub fn archipelago(seed: u64) -> MapConfig {
        MapConfig {
            island: IslandSettings {
                land_fraction: 0.25,
                octaves: 5,
                frequency: 6.0,
                falloff_exponent: 4.0,
            },
            ..MapConfig::new(seed, 3000)
        }
    }
}
