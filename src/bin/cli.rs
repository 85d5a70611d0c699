use clap::Parser;
use env_logger::Env;
use polymap::export::json::save_json;
use polymap::export::png::save_biome_png;
use polymap::export::relief::{ReliefSettings, save_relief_png};
use polymap::{GeoFrame, Map, MapConfig, stats};
use std::path::PathBuf;

/// Генератор полигональных карт островов
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Путь к конфигурационному файлу в формате TOML
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Сид генерации (перекрывает значение из конфигурации)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Число точек (ячеек) карты
    #[arg(short, long)]
    points: Option<usize>,

    /// Куда сохранить строки карты в JSON
    #[arg(long)]
    json: Option<PathBuf>,

    /// Куда сохранить карту биомов
    #[arg(long)]
    png: Option<PathBuf>,

    /// Куда сохранить отмывку рельефа
    #[arg(long)]
    relief: Option<PathBuf>,

    /// Сторона изображений в пикселях
    #[arg(long, default_value_t = 1024)]
    size: u32,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => {
            println!("🔍 Загрузка конфигурации из {path:?}...");
            MapConfig::from_toml_file(path)?
        }
        None => MapConfig::default(),
    };
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    if let Some(points) = cli.points {
        config.points = points;
    }

    println!("Генерация карты ({} точек)...", config.points);
    let map = Map::generate(&config)?;
    println!("seed = {}", map.seed());

    stats::collect(map.graph()).log_report();

    if let Some(path) = &cli.json {
        println!("Сохранение JSON в {path:?}");
        save_json(map.graph(), map.seed(), &GeoFrame::default(), path)?;
    }
    if let Some(path) = &cli.png {
        println!("Сохранение карты биомов в {path:?}");
        save_biome_png(map.graph(), cli.size, path)?;
    }
    if let Some(path) = &cli.relief {
        println!("Сохранение рельефа в {path:?}");
        let settings = ReliefSettings {
            size: cli.size,
            ..Default::default()
        };
        save_relief_png(map.graph(), map.seed(), &settings, path)?;
    }

    println!("\nГотово!");
    Ok(())
}
