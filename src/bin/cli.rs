use clap::Parser;
use hexmapgen::{WorldGenerationParams, export, spawn_generation};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Генератор гексагональных карт мира
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Путь к конфигурационному файлу в формате TOML
    #[arg(short, long)]
    config: PathBuf,

    /// Путь для диагностической выгрузки тайлов в JSON
    #[arg(short, long, default_value = "tiledata_export.json")]
    output: PathBuf,

    /// Переопределить сид из конфигурации
    #[arg(long)]
    seed: Option<u64>,

    /// Переопределить радиус карты
    #[arg(long)]
    radius: Option<u32>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    println!("🔍 Загрузка конфигурации...");
    let mut params = WorldGenerationParams::from_toml_file(&cli.config)?;
    if let Some(seed) = cli.seed {
        params.seed = seed;
    }
    if let Some(radius) = cli.radius {
        params.radius = radius;
    }
    params.validate()?;

    println!(
        "🌍 Генерация мира (сид: {}, радиус: {}, регионов: {})...",
        params.seed, params.radius, params.region_count
    );
    let tile_size = params.tile_size;
    let world = spawn_generation(params).wait()?;
    let report = &world.report;

    let (half_w, half_h) = world
        .grid
        .all_coordinates()
        .iter()
        .map(|&c| tile_size.pixel_center(c))
        .fold((0.0f32, 0.0f32), |(w, h), (x, y)| (w.max(x.abs()), h.max(y.abs())));
    println!(
        "   Размер карты: {}x{} px",
        (2.0 * half_w) as u32 + tile_size.width,
        (2.0 * half_h) as u32 + tile_size.height
    );

    println!(
        "   Суша: {} тайлов, океан: {}, озёра: {}, горы: {}",
        report.landmass.land_tiles,
        report.landmass.ocean_tiles,
        report.landmass.lake_tiles,
        report.landmass.mountain_tiles
    );
    println!(
        "   Реки: {} (устьев: {}, вырожденных концов: {})",
        report.hydrology.rivers,
        report.hydrology.mouths,
        report.hydrology.degenerate.len()
    );
    println!("\n🗺  Типы местности:");
    for (kind, count) in &report.terrain {
        println!("   {kind:?}: {count}");
    }

    println!("\n💾 Сохранение в {:?}", cli.output);
    if let Err(err) = export::write_export(&world.grid, &cli.output) {
        tracing::warn!(target: "hexmapgen::export", %err, "выгрузка пропущена");
    }

    println!("\nГотово! Сгенерировано {} тайлов.", world.tiles.len());
    Ok(())
}
