use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use inquire::Select;

use wind_core::{
    Config, FetchRequest, FetchResult, SourceKey,
    profile::{self, ProfileModel, TerrainClass},
    source::source_from_key,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "wind", version, about = "Historical wind data toolkit")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List known data sources and their capabilities.
    Sources,

    /// Pick the default data source interactively.
    Configure,

    /// Check whether a date window falls inside a source's archive.
    Check {
        /// Source key, e.g. "nasa_power" or "open_meteo"; defaults to the configured source.
        #[arg(long)]
        source: Option<String>,

        #[arg(long)]
        start: NaiveDate,

        #[arg(long)]
        end: NaiveDate,
    },

    /// Fetch historical wind observations for a location.
    Fetch {
        /// Source key; defaults to the configured source.
        #[arg(long)]
        source: Option<String>,

        #[arg(long)]
        lat: f64,

        #[arg(long)]
        lon: f64,

        #[arg(long)]
        start: NaiveDate,

        #[arg(long)]
        end: NaiveDate,

        /// Capture heights in meters; defaults to every height the source supports.
        #[arg(long, value_delimiter = ',')]
        heights: Vec<u32>,

        /// Also request air temperature.
        #[arg(long)]
        temperature: bool,

        /// Also request relative humidity.
        #[arg(long)]
        humidity: bool,

        /// Print the full result as JSON instead of a summary.
        #[arg(long)]
        json: bool,
    },

    /// Estimate wind speed at an unmeasured height with both profile laws.
    Extrapolate {
        /// Measured wind speed in m/s.
        #[arg(long)]
        speed: f64,

        /// Measurement height in meters.
        #[arg(long)]
        height: f64,

        /// Target height in meters.
        #[arg(long)]
        target: f64,

        /// Terrain class supplying the default exponent and roughness length.
        #[arg(long, value_enum, default_value = "trees-buildings")]
        terrain: TerrainArg,

        /// Power-law exponent override.
        #[arg(long)]
        alpha: Option<f64>,

        /// Roughness length override in meters.
        #[arg(long)]
        z0: Option<f64>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TerrainArg {
    SmoothLake,
    ShortGrass,
    LowVegetation,
    Shrubs,
    TreesBuildings,
    Residential,
    Urban,
}

impl From<TerrainArg> for TerrainClass {
    fn from(arg: TerrainArg) -> Self {
        match arg {
            TerrainArg::SmoothLake => TerrainClass::SmoothLake,
            TerrainArg::ShortGrass => TerrainClass::ShortGrass,
            TerrainArg::LowVegetation => TerrainClass::LowVegetation,
            TerrainArg::Shrubs => TerrainClass::Shrubs,
            TerrainArg::TreesBuildings => TerrainClass::TreesBuildings,
            TerrainArg::Residential => TerrainClass::Residential,
            TerrainArg::Urban => TerrainClass::Urban,
        }
    }
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Sources => list_sources(),
            Command::Configure => configure(),
            Command::Check { source, start, end } => check(source.as_deref(), start, end),
            Command::Fetch { source, lat, lon, start, end, heights, temperature, humidity, json } => {
                fetch(source.as_deref(), lat, lon, start, end, heights, temperature, humidity, json)
                    .await
            }
            Command::Extrapolate { speed, height, target, terrain, alpha, z0 } => {
                extrapolate(speed, height, target, terrain.into(), alpha, z0)
            }
        }
    }
}

fn resolve_key(arg: Option<&str>, config: &Config) -> Result<SourceKey> {
    match arg {
        Some(raw) => SourceKey::try_from(raw),
        None => config.default_source_key(),
    }
}

fn list_sources() -> Result<()> {
    let config = Config::load()?;

    for key in SourceKey::remote() {
        let source = source_from_key(*key, &config)?;
        let descriptor = source.descriptor();

        println!("{} ({})", descriptor.display_name, descriptor.key);
        println!("  endpoint:   {}", descriptor.base_url);
        println!("  heights:    {:?} m", descriptor.supported_heights);
        let parameters: Vec<&str> =
            descriptor.supported_parameters.iter().map(|p| p.as_str()).collect();
        println!("  parameters: {}", parameters.join(", "));
        println!(
            "  archive:    since {} (newest records lag ~{} days)",
            descriptor.earliest_date, descriptor.publication_lag_days
        );
        println!();
    }

    Ok(())
}

fn configure() -> Result<()> {
    let mut config = Config::load()?;

    let options: Vec<&str> = SourceKey::remote().iter().map(|k| k.as_str()).collect();
    let choice = Select::new("Default data source:", options)
        .prompt()
        .context("Configuration cancelled")?;

    let key = SourceKey::try_from(choice)?;
    config.set_default_source(key);
    config.save()?;

    println!("Default source set to '{key}'.");
    println!("Config file: {}", Config::config_file_path()?.display());
    Ok(())
}

fn check(source: Option<&str>, start: NaiveDate, end: NaiveDate) -> Result<()> {
    let config = Config::load()?;
    let key = resolve_key(source, &config)?;
    let client = source_from_key(key, &config)?;

    let check = client.check_availability(start, end);
    if check.available {
        println!("{start}..{end} is inside the {key} archive.");
    } else if let Some(reason) = check.reason {
        println!("{start}..{end} is NOT fully available from {key}: {reason}");
    }
    println!("Archive window: {} .. {}", check.earliest, check.latest);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn fetch(
    source: Option<&str>,
    lat: f64,
    lon: f64,
    start: NaiveDate,
    end: NaiveDate,
    heights: Vec<u32>,
    temperature: bool,
    humidity: bool,
    json: bool,
) -> Result<()> {
    let config = Config::load()?;
    let key = resolve_key(source, &config)?;
    let client = source_from_key(key, &config)?;

    let heights = if heights.is_empty() {
        client.supported_heights().to_vec()
    } else {
        heights
    };

    let request = FetchRequest {
        latitude: lat,
        longitude: lon,
        start_date: start,
        end_date: end,
        heights,
        include_temperature: temperature,
        include_humidity: humidity,
    };

    let result = client.fetch(&request).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_summary(&result);
    }
    Ok(())
}

fn print_summary(result: &FetchResult) {
    let meta = &result.metadata;
    println!(
        "{}: {} observations at ({:.4}, {:.4})",
        meta.source, meta.total_count, meta.latitude, meta.longitude
    );
    if let (Some(start), Some(end)) = (meta.period_start, meta.period_end) {
        println!("period: {start} .. {end}");
    }
    println!(
        "included: wind_speed={} temperature={} humidity={}",
        meta.included.wind_speed, meta.included.temperature, meta.included.humidity
    );
    if meta.skipped_records > 0 {
        println!("skipped {} malformed records", meta.skipped_records);
    }

    for (height, observations) in result.by_height() {
        let speeds: Vec<f64> = observations.iter().map(|o| o.wind_speed).collect();
        let mean = speeds.iter().sum::<f64>() / speeds.len() as f64;
        let max = speeds.iter().cloned().fold(f64::MIN, f64::max);
        let min = speeds.iter().cloned().fold(f64::MAX, f64::min);
        println!(
            "  {height}m: {} records, mean {mean:.2} m/s, min {min:.2}, max {max:.2}",
            speeds.len()
        );
    }
}

fn extrapolate(
    speed: f64,
    height: f64,
    target: f64,
    terrain: TerrainClass,
    alpha: Option<f64>,
    z0: Option<f64>,
) -> Result<()> {
    let alpha = alpha.unwrap_or_else(|| terrain.alpha());
    let z0 = z0.unwrap_or_else(|| terrain.roughness_length());

    let check = profile::validate_parameters(height, target, alpha, ProfileModel::PowerLaw);
    if let Some(message) = check.message {
        println!("note: {message}");
    }

    let comparison = profile::compare_models(speed, height, target, alpha, z0)?;

    println!("{speed} m/s at {height}m -> {target}m ({}):", terrain.label());
    println!("  power law   (alpha={alpha}): {:.2} m/s", comparison.power_law);
    println!("  logarithmic (z0={z0}m):      {:.2} m/s", comparison.logarithmic);
    println!("  divergence: {:.3} m/s", comparison.divergence());
    Ok(())
}
