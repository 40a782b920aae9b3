//! End-to-end CSV enrichment: read locations, fetch weather, write rows.

use std::path::PathBuf;

use anyhow::Result;
use tracing::{info, warn};
use weatherflow_core::{Config, FetchOptions, Units};

use crate::io;

#[derive(Debug)]
pub struct RunArgs {
    pub input_csv: PathBuf,
    pub output_csv: PathBuf,
    pub units: Option<Units>,
    pub use_cache: bool,
    pub cache_ttl_secs: u64,
    pub max_rows: Option<usize>,
    pub detailed: bool,
}

pub async fn run(args: RunArgs) -> Result<()> {
    let mut config = Config::load()?;
    // The --ttl flag wins over whatever the config file says.
    config.cache_ttl_secs = args.cache_ttl_secs;

    let service = config.build_service()?;
    let units = args.units.unwrap_or(config.default_units);

    info!(
        input = %args.input_csv.display(),
        output = %args.output_csv.display(),
        %units,
        cache = args.use_cache,
        detailed = args.detailed,
        "starting pipeline"
    );

    let mut locations = io::read_locations(&args.input_csv)?;
    if let Some(max) = args.max_rows
        && locations.len() > max
    {
        info!(from = locations.len(), to = max, "limiting input rows");
        locations.truncate(max);
    }
    info!(count = locations.len(), "read locations");

    let options = FetchOptions {
        units: Some(units),
        detailed: args.detailed,
        use_cache: args.use_cache,
    };
    let results = service.get_bulk(&locations, &options).await;

    let mut rows = Vec::with_capacity(results.len());
    let mut failures = 0usize;
    for (location, result) in locations.into_iter().zip(results) {
        match result {
            Ok(report) => rows.push((location, report)),
            Err(err) => {
                failures += 1;
                warn!(query = %location.to_query(), %err, "failed to fetch weather");
            }
        }
    }

    io::write_reports(&args.output_csv, &rows, units, args.detailed)?;
    info!(written = rows.len(), failures, "pipeline complete");

    Ok(())
}
