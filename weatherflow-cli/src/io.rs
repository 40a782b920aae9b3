//! CSV reading and writing for the enrichment pipeline.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::warn;
use weatherflow_core::{Location, Units, WeatherReport};

/// Raw CSV row; every column is optional so partially filled files survive.
#[derive(Debug, Deserialize)]
struct LocationRow {
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    zip_code: Option<String>,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
}

fn trimmed(field: Option<String>) -> Option<String> {
    field
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Read locations from `path`. Rows that cannot be parsed or identify
/// nothing are skipped with a warning rather than aborting the run.
pub fn read_locations(path: &Path) -> Result<Vec<Location>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open input CSV: {}", path.display()))?;

    let mut locations = Vec::new();
    for (idx, row) in reader.deserialize::<LocationRow>().enumerate() {
        // Header occupies line 1.
        let line = idx + 2;
        let row = match row {
            Ok(row) => row,
            Err(err) => {
                warn!(line, %err, "skipping unparseable CSV row");
                continue;
            }
        };

        let location = Location {
            city: trimmed(row.city),
            country: trimmed(row.country),
            state: trimmed(row.state),
            zip_code: trimmed(row.zip_code),
            lat: row.lat,
            lon: row.lon,
        };

        if location.is_empty() {
            warn!(line, "skipping row with no identifying fields");
            continue;
        }

        locations.push(location);
    }

    Ok(locations)
}

/// Write enriched rows to `path`. The column layout follows the requested
/// units and the detailed flag; location fields are echoed from the input.
pub fn write_reports(
    path: &Path,
    rows: &[(Location, WeatherReport)],
    units: Units,
    detailed: bool,
) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to open output CSV: {}", path.display()))?;

    let mut header = vec!["country", "state", "city", "zip_code"];
    if units.wants_celsius() {
        header.push("temp_c");
    }
    if units.wants_fahrenheit() {
        header.push("temp_f");
    }
    if units.wants_kelvin() {
        header.push("temp_k");
    }
    header.extend(["clouds", "wind_speed_kph"]);
    if detailed {
        header.extend([
            "wind_degree",
            "wind_dir",
            "pressure_mb",
            "pressure_in",
            "precip_mm",
            "precip_in",
            "humidity",
            "feelslike_c",
            "feelslike_f",
            "vis_km",
            "vis_miles",
            "uv",
            "gust_kph",
            "gust_mph",
            "last_updated",
        ]);
    }
    writer.write_record(&header)?;

    for (location, report) in rows {
        let mut record: Vec<String> = Vec::with_capacity(header.len());
        record.push(location.country.clone().unwrap_or_default());
        record.push(location.state.clone().unwrap_or_default());
        record.push(location.city.clone().unwrap_or_default());
        record.push(location.zip_code.clone().unwrap_or_default());

        if units.wants_celsius() {
            record.push(opt_field(report.temp_c));
        }
        if units.wants_fahrenheit() {
            record.push(opt_field(report.temp_f));
        }
        if units.wants_kelvin() {
            record.push(opt_field(report.temp_k));
        }
        record.push(report.clouds.to_string());
        record.push(report.wind_speed_kph.to_string());

        if detailed {
            let detail = report.detailed.clone().unwrap_or_default();
            record.push(opt_field(report.wind_degree));
            record.push(detail.wind_dir.unwrap_or_default());
            record.push(opt_field(detail.pressure_mb));
            record.push(opt_field(detail.pressure_in));
            record.push(opt_field(detail.precip_mm));
            record.push(opt_field(detail.precip_in));
            record.push(opt_field(detail.humidity));
            record.push(opt_field(detail.feelslike_c));
            record.push(opt_field(detail.feelslike_f));
            record.push(opt_field(detail.vis_km));
            record.push(opt_field(detail.vis_miles));
            record.push(opt_field(detail.uv));
            record.push(opt_field(detail.gust_kph));
            record.push(opt_field(detail.gust_mph));
            record.push(
                detail
                    .last_updated
                    .map(|ts| ts.to_rfc3339())
                    .unwrap_or_default(),
            );
        }

        writer.write_record(&record)?;
    }

    writer
        .flush()
        .with_context(|| format!("Failed to flush output CSV: {}", path.display()))?;
    Ok(())
}

fn opt_field<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use weatherflow_core::WeatherData;

    fn write_input(contents: &str) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().expect("temp file");
        fs::write(file.path(), contents).expect("write input CSV");
        file
    }

    fn sample_report(units: Units, detailed: bool) -> WeatherReport {
        let data = WeatherData {
            country: "United Kingdom".to_string(),
            state: None,
            city: "London".to_string(),
            time_zone: None,
            temp_c: 10.0,
            clouds: 75,
            wind_speed_kph: 12.5,
            wind_degree: Some(250),
            detailed: None,
        };
        WeatherReport::from_data(&data, units, detailed)
    }

    #[test]
    fn reads_and_trims_location_rows() {
        let input = write_input(
            "city,country,state,zip_code\n\
             London ,United Kingdom,,\n\
             ,,,\n\
             Berlin,Germany,  ,10115\n",
        );

        let locations = read_locations(input.path()).expect("read succeeds");

        assert_eq!(locations.len(), 2);
        assert_eq!(locations[0].city.as_deref(), Some("London"));
        assert_eq!(locations[0].country.as_deref(), Some("United Kingdom"));
        assert_eq!(locations[1].zip_code.as_deref(), Some("10115"));
        assert!(locations[1].state.is_none());
    }

    #[test]
    fn reads_files_with_partial_columns() {
        let input = write_input("city\nLondon\nParis\n");
        let locations = read_locations(input.path()).expect("read succeeds");

        assert_eq!(locations.len(), 2);
        assert_eq!(locations[1].city.as_deref(), Some("Paris"));
        assert!(locations[0].country.is_none());
    }

    #[test]
    fn header_follows_units_and_detail_flags() {
        let out = tempfile::NamedTempFile::new().expect("temp file");
        let location = Location {
            city: Some("London".to_string()),
            country: Some("United Kingdom".to_string()),
            ..Location::default()
        };
        let rows = vec![(location, sample_report(Units::Both, false))];

        write_reports(out.path(), &rows, Units::Both, false).expect("write succeeds");

        let written = fs::read_to_string(out.path()).expect("read back");
        let header = written.lines().next().expect("header line");
        assert!(header.contains("temp_c"));
        assert!(header.contains("temp_f"));
        assert!(!header.contains("temp_k"));
        assert!(!header.contains("humidity"));
        assert!(written.contains("50")); // 10 °C in Fahrenheit
    }

    #[test]
    fn detailed_header_adds_the_bundle_columns() {
        let out = tempfile::NamedTempFile::new().expect("temp file");
        let location = Location {
            city: Some("London".to_string()),
            ..Location::default()
        };
        let rows = vec![(location, sample_report(Units::C, true))];

        write_reports(out.path(), &rows, Units::C, true).expect("write succeeds");

        let written = fs::read_to_string(out.path()).expect("read back");
        let header = written.lines().next().expect("header line");
        for column in ["humidity", "uv", "gust_mph", "last_updated"] {
            assert!(header.contains(column), "missing column {column}");
        }
    }

    #[test]
    fn row_count_matches_input() {
        let out = tempfile::NamedTempFile::new().expect("temp file");
        let rows: Vec<(Location, WeatherReport)> = (0..3)
            .map(|i| {
                let location = Location {
                    city: Some(format!("City{i}")),
                    ..Location::default()
                };
                (location, sample_report(Units::C, false))
            })
            .collect();

        write_reports(out.path(), &rows, Units::C, false).expect("write succeeds");

        let written = fs::read_to_string(out.path()).expect("read back");
        // Header plus three data rows.
        assert_eq!(written.lines().count(), 4);
    }
}
