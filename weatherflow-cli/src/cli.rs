use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use weatherflow_core::{Config, FetchOptions, Location, Units, WeatherReport};

use crate::pipeline;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weatherflow", version, about = "Weather enrichment CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the WeatherAPI.com credentials used by all commands.
    Configure,

    /// Show current weather for a single location.
    Show {
        /// City name, e.g. "Berlin".
        #[arg(long)]
        city: Option<String>,

        /// Country name, e.g. "Germany".
        #[arg(long)]
        country: Option<String>,

        /// State or region name.
        #[arg(long)]
        state: Option<String>,

        /// Zip or postal code.
        #[arg(long)]
        zip: Option<String>,

        /// Latitude; only used together with --lon.
        #[arg(long)]
        lat: Option<f64>,

        /// Longitude; only used together with --lat.
        #[arg(long)]
        lon: Option<f64>,

        /// Temperature units: C, F, K, BOTH or ALL.
        #[arg(long)]
        units: Option<Units>,

        /// Include pressure, humidity, UV and the rest of the detailed data.
        #[arg(long)]
        detailed: bool,

        /// Skip the in-memory cache for this lookup.
        #[arg(long)]
        no_cache: bool,
    },

    /// Enrich a CSV of locations with current weather data.
    Run {
        /// Input CSV containing location columns.
        input_csv: PathBuf,

        /// Output CSV that will receive the weather columns.
        output_csv: PathBuf,

        /// Temperature units: C, F, K, BOTH or ALL.
        #[arg(long)]
        units: Option<Units>,

        /// Disable caching of weather results.
        #[arg(long)]
        no_cache: bool,

        /// Cache TTL in seconds.
        #[arg(long, default_value_t = 900)]
        ttl: u64,

        /// Process at most this many rows from the input CSV.
        #[arg(long)]
        max_rows: Option<usize>,

        /// Include detailed weather columns in the output.
        #[arg(long)]
        detailed: bool,

        /// Enable verbose output.
        #[arg(long)]
        verbose: bool,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        init_tracing(matches!(
            self.command,
            Command::Run { verbose: true, .. }
        ));

        match self.command {
            Command::Configure => configure(),
            Command::Show {
                city,
                country,
                state,
                zip,
                lat,
                lon,
                units,
                detailed,
                no_cache,
            } => {
                let location = Location {
                    city,
                    country,
                    state,
                    zip_code: zip,
                    lat,
                    lon,
                };
                show(location, units, detailed, no_cache).await
            }
            Command::Run {
                input_csv,
                output_csv,
                units,
                no_cache,
                ttl,
                max_rows,
                detailed,
                verbose: _,
            } => {
                pipeline::run(pipeline::RunArgs {
                    input_csv,
                    output_csv,
                    units,
                    use_cache: !no_cache,
                    cache_ttl_secs: ttl,
                    max_rows,
                    detailed,
                })
                .await
            }
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "weatherflow=debug,weatherflow_core=debug"
    } else {
        "weatherflow=info,weatherflow_core=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .init();
}

fn configure() -> Result<()> {
    let mut config = Config::load()?;

    let api_key = inquire::Password::new("WeatherAPI.com key:")
        .without_confirmation()
        .prompt()?;

    config.api_key = Some(api_key.trim().to_string());
    config.save()?;

    println!(
        "Saved credentials to {}",
        Config::config_file_path()?.display()
    );
    Ok(())
}

async fn show(
    location: Location,
    units: Option<Units>,
    detailed: bool,
    no_cache: bool,
) -> Result<()> {
    if location.is_empty() {
        bail!("Pass at least one of --city, --country, --state, --zip or --lat/--lon.");
    }

    let config = Config::load()?;
    let service = config.build_service()?;

    let options = FetchOptions {
        units,
        detailed,
        use_cache: !no_cache,
    };
    let report = service.get_current(&location, &options).await?;

    print_report(&report);
    Ok(())
}

fn print_report(report: &WeatherReport) {
    match &report.state {
        Some(state) => println!("{}, {state}, {}", report.city, report.country),
        None => println!("{}, {}", report.city, report.country),
    }
    if let Some(tz) = &report.time_zone {
        println!("  time zone:   {tz}");
    }
    if let Some(t) = report.temp_c {
        println!("  temperature: {t:.1} °C");
    }
    if let Some(t) = report.temp_f {
        println!("  temperature: {t:.1} °F");
    }
    if let Some(t) = report.temp_k {
        println!("  temperature: {t:.1} K");
    }
    println!("  clouds:      {}%", report.clouds);
    println!("  wind:        {:.1} kph", report.wind_speed_kph);

    if let Some(detail) = &report.detailed {
        if let Some(feels) = detail.feelslike_c {
            println!("  feels like:  {feels:.1} °C");
        }
        if let Some(humidity) = detail.humidity {
            println!("  humidity:    {humidity}%");
        }
        if let Some(pressure) = detail.pressure_mb {
            println!("  pressure:    {pressure:.1} mb");
        }
        if let Some(uv) = detail.uv {
            println!("  uv index:    {uv}");
        }
        if let Some(updated) = detail.last_updated {
            println!("  updated:     {updated}");
        }
    }
}
