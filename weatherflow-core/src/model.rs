use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::units::{self, Units};

/// A place to fetch weather for. Every identifying field is optional; a
/// meaningful lookup needs at least one of them filled in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip_code: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}

impl Location {
    /// Query string for the provider, most specific fields first: both
    /// coordinates, then zip code, then city/state/country combinations.
    ///
    /// An empty location yields an empty query. Whether the provider accepts
    /// that is provider-dependent, so it is not rejected here; callers that
    /// want to reject blank records check [`Location::is_empty`].
    pub fn to_query(&self) -> String {
        if let (Some(lat), Some(lon)) = (self.lat, self.lon) {
            return format!("{lat},{lon}");
        }
        if let Some(zip) = non_empty(&self.zip_code) {
            return zip.to_string();
        }
        match (
            non_empty(&self.city),
            non_empty(&self.state),
            non_empty(&self.country),
        ) {
            (Some(city), _, Some(country)) => format!("{city},{country}"),
            (Some(city), Some(state), None) => format!("{city},{state}"),
            (Some(city), None, None) => city.to_string(),
            (None, Some(state), _) => state.to_string(),
            (None, None, Some(country)) => country.to_string(),
            (None, None, None) => String::new(),
        }
    }

    /// True when no identifying field carries a value.
    pub fn is_empty(&self) -> bool {
        self.to_query().is_empty()
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Canonical weather reading for one location.
///
/// Temperature is stored in Celsius only; other units are derived when
/// shaping a [`WeatherReport`]. Cached entries are replaced wholesale, never
/// edited in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherData {
    pub country: String,
    pub state: Option<String>,
    pub city: String,
    pub time_zone: Option<String>,
    pub temp_c: f64,
    /// Cloud cover, 0-100.
    pub clouds: u8,
    pub wind_speed_kph: f64,
    pub wind_degree: Option<i32>,
    pub detailed: Option<DetailedWeather>,
}

/// Extended readings the provider returns alongside the basics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailedWeather {
    pub pressure_mb: Option<f64>,
    pub pressure_in: Option<f64>,
    pub precip_mm: Option<f64>,
    pub precip_in: Option<f64>,
    pub humidity: Option<u8>,
    pub feelslike_c: Option<f64>,
    pub vis_km: Option<f64>,
    pub uv: Option<f64>,
    pub gust_kph: Option<f64>,
    pub wind_dir: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Output shape handed to callers.
///
/// Temperature fields are filled in per the requested [`Units`], derived from
/// the Celsius canonical value; the detailed bundle is present only when the
/// caller asked for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub city: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_c: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_f: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_k: Option<f64>,
    pub clouds: u8,
    pub wind_speed_kph: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wind_degree: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detailed: Option<DetailedReport>,
}

/// Detailed bundle of a report, with imperial companions derived on read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailedReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pressure_mb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pressure_in: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precip_mm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precip_in: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feelslike_c: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feelslike_f: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vis_km: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vis_miles: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uv: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gust_kph: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gust_mph: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wind_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl WeatherReport {
    /// Shape canonical data for output: select temperature units and
    /// optionally strip the detailed bundle. Pure; the input is untouched.
    pub fn from_data(data: &WeatherData, units: Units, detailed: bool) -> Self {
        let bundle = if detailed {
            data.detailed.as_ref().map(DetailedReport::from_bundle)
        } else {
            None
        };

        WeatherReport {
            country: data.country.clone(),
            state: data.state.clone(),
            city: data.city.clone(),
            time_zone: data.time_zone.clone(),
            temp_c: units.wants_celsius().then_some(data.temp_c),
            temp_f: units
                .wants_fahrenheit()
                .then(|| units::celsius_to_fahrenheit(data.temp_c)),
            temp_k: units
                .wants_kelvin()
                .then(|| units::celsius_to_kelvin(data.temp_c)),
            clouds: data.clouds,
            wind_speed_kph: data.wind_speed_kph,
            wind_degree: data.wind_degree,
            detailed: bundle,
        }
    }
}

impl DetailedReport {
    fn from_bundle(bundle: &DetailedWeather) -> Self {
        DetailedReport {
            pressure_mb: bundle.pressure_mb,
            pressure_in: bundle.pressure_in,
            precip_mm: bundle.precip_mm,
            precip_in: bundle.precip_in,
            humidity: bundle.humidity,
            feelslike_c: bundle.feelslike_c,
            feelslike_f: bundle.feelslike_c.map(units::celsius_to_fahrenheit),
            vis_km: bundle.vis_km,
            vis_miles: bundle.vis_km.map(units::km_to_miles),
            uv: bundle.uv,
            gust_kph: bundle.gust_kph,
            gust_mph: bundle.gust_kph.map(units::kph_to_mph),
            wind_dir: bundle.wind_dir.clone(),
            last_updated: bundle.last_updated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_data() -> WeatherData {
        WeatherData {
            country: "United Kingdom".to_string(),
            state: Some("Greater London".to_string()),
            city: "London".to_string(),
            time_zone: Some("Europe/London".to_string()),
            temp_c: 10.0,
            clouds: 75,
            wind_speed_kph: 12.5,
            wind_degree: Some(250),
            detailed: Some(DetailedWeather {
                humidity: Some(81),
                feelslike_c: Some(8.6),
                vis_km: Some(10.0),
                gust_kph: Some(20.2),
                ..DetailedWeather::default()
            }),
        }
    }

    #[test]
    fn query_prefers_coordinates() {
        let location = Location {
            city: Some("London".to_string()),
            zip_code: Some("EC2Y 5AA".to_string()),
            lat: Some(51.52),
            lon: Some(-0.11),
            ..Location::default()
        };
        assert_eq!(location.to_query(), "51.52,-0.11");
    }

    #[test]
    fn query_falls_back_through_fields() {
        let zip = Location {
            city: Some("London".to_string()),
            zip_code: Some("EC2Y 5AA".to_string()),
            ..Location::default()
        };
        assert_eq!(zip.to_query(), "EC2Y 5AA");

        let city_country = Location {
            city: Some("Berlin".to_string()),
            country: Some("Germany".to_string()),
            state: Some("Berlin".to_string()),
            ..Location::default()
        };
        assert_eq!(city_country.to_query(), "Berlin,Germany");

        let city_state = Location {
            city: Some("Springfield".to_string()),
            state: Some("Illinois".to_string()),
            ..Location::default()
        };
        assert_eq!(city_state.to_query(), "Springfield,Illinois");

        let country_only = Location {
            country: Some("Iceland".to_string()),
            ..Location::default()
        };
        assert_eq!(country_only.to_query(), "Iceland");
    }

    #[test]
    fn single_coordinate_is_ignored() {
        let location = Location {
            city: Some("Oslo".to_string()),
            lat: Some(59.91),
            ..Location::default()
        };
        assert_eq!(location.to_query(), "Oslo");
    }

    #[test]
    fn blank_fields_yield_empty_query() {
        let location = Location {
            city: Some("   ".to_string()),
            ..Location::default()
        };
        assert_eq!(location.to_query(), "");
        assert!(location.is_empty());
    }

    #[test]
    fn report_selects_units() {
        let data = sample_data();

        let celsius = WeatherReport::from_data(&data, Units::C, false);
        assert_eq!(celsius.temp_c, Some(10.0));
        assert_eq!(celsius.temp_f, None);
        assert_eq!(celsius.temp_k, None);

        let all = WeatherReport::from_data(&data, Units::All, false);
        assert_eq!(all.temp_c, Some(10.0));
        assert_eq!(all.temp_f, Some(50.0));
        assert_eq!(all.temp_k, Some(283.15));
    }

    #[test]
    fn report_strips_detail_unless_requested() {
        let data = sample_data();

        let basic = WeatherReport::from_data(&data, Units::C, false);
        assert!(basic.detailed.is_none());

        let detailed = WeatherReport::from_data(&data, Units::C, true);
        let bundle = detailed.detailed.expect("detailed bundle requested");
        assert_eq!(bundle.humidity, Some(81));
        assert_eq!(bundle.feelslike_c, Some(8.6));
        // Imperial companions are derived, not stored.
        assert!((bundle.feelslike_f.unwrap() - 47.48).abs() < 0.01);
        assert!((bundle.vis_miles.unwrap() - 6.2137).abs() < 0.001);
    }

    #[test]
    fn basic_report_serializes_without_detail_keys() {
        let data = sample_data();
        let report = WeatherReport::from_data(&data, Units::C, false);
        let json = serde_json::to_value(&report).expect("report serializes");
        assert!(json.get("detailed").is_none());
        assert!(json.get("temp_f").is_none());
        assert_eq!(json["temp_c"], 10.0);
    }
}
