use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Temperature units requested by a caller.
///
/// Celsius is the only unit ever stored; everything else is derived when a
/// report is shaped for output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Units {
    #[default]
    C,
    F,
    K,
    /// Celsius and Fahrenheit.
    Both,
    /// Celsius, Fahrenheit and Kelvin.
    All,
}

impl Units {
    pub fn wants_celsius(self) -> bool {
        matches!(self, Units::C | Units::Both | Units::All)
    }

    pub fn wants_fahrenheit(self) -> bool {
        matches!(self, Units::F | Units::Both | Units::All)
    }

    pub fn wants_kelvin(self) -> bool {
        matches!(self, Units::K | Units::All)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Units::C => "C",
            Units::F => "F",
            Units::K => "K",
            Units::Both => "BOTH",
            Units::All => "ALL",
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Units {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "C" => Ok(Units::C),
            "F" => Ok(Units::F),
            "K" => Ok(Units::K),
            "BOTH" => Ok(Units::Both),
            "ALL" => Ok(Units::All),
            _ => Err(anyhow::anyhow!(
                "Unknown units '{s}'. Supported units: C, F, K, BOTH, ALL."
            )),
        }
    }
}

pub fn celsius_to_fahrenheit(c: f64) -> f64 {
    c * 9.0 / 5.0 + 32.0
}

pub fn fahrenheit_to_celsius(f: f64) -> f64 {
    (f - 32.0) * 5.0 / 9.0
}

pub fn celsius_to_kelvin(c: f64) -> f64 {
    c + 273.15
}

pub fn kph_to_mph(kph: f64) -> f64 {
    kph / 1.609344
}

pub fn km_to_miles(km: f64) -> f64 {
    km / 1.609344
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn units_parse_roundtrip() {
        for units in [Units::C, Units::F, Units::K, Units::Both, Units::All] {
            let parsed: Units = units.as_str().parse().expect("roundtrip should succeed");
            assert_eq!(units, parsed);
        }
    }

    #[test]
    fn units_parse_is_case_insensitive() {
        assert_eq!("both".parse::<Units>().unwrap(), Units::Both);
        assert_eq!("all".parse::<Units>().unwrap(), Units::All);
        assert_eq!("f".parse::<Units>().unwrap(), Units::F);
    }

    #[test]
    fn unknown_units_error() {
        let err = "rankine".parse::<Units>().unwrap_err();
        assert!(err.to_string().contains("Unknown units"));
    }

    #[test]
    fn fahrenheit_roundtrip_recovers_celsius() {
        let f = celsius_to_fahrenheit(10.0);
        assert_eq!(f, 50.0);
        assert!((fahrenheit_to_celsius(f) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn kelvin_offset() {
        assert_eq!(celsius_to_kelvin(0.0), 273.15);
        assert_eq!(celsius_to_kelvin(-273.15), 0.0);
    }

    #[test]
    fn statute_conversions() {
        assert!((kph_to_mph(1.609344) - 1.0).abs() < 1e-9);
        assert!((km_to_miles(16.09344) - 10.0).abs() < 1e-9);
    }
}
