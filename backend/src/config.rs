//! Pipeline configuration.
//!
//! Defaults match the datasets the dashboards were built around: a Korean
//! weather-station export and a per-country MBTI percentage table. Every
//! value can be overridden from the environment (a `.env` file is honoured)
//! and again from the command line.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Encoding candidates, tried in order.
///
/// UTF-8 goes first: legacy double-byte decoders accept most UTF-8 Korean
/// byte pairs as garbage, while UTF-8 rejects almost every CP949 sequence.
pub const DEFAULT_ENCODINGS: [&str; 2] = ["utf-8", "cp949"];

/// Date column of the weather export.
pub const DEFAULT_DATE_COLUMN: &str = "날짜";

/// Mean-temperature column of the weather export.
pub const DEFAULT_VALUE_COLUMN: &str = "평균기온(℃)";

/// Country identifier column of the MBTI table.
pub const DEFAULT_COUNTRY_COLUMN: &str = "Country";

/// Ranking slice length.
pub const DEFAULT_TOP_N: usize = 10;

/// Number of periods averaged at each end of the series.
pub const DEFAULT_WINDOW: usize = 10;

/// Slopes with an absolute value at or below this are classified flat.
pub const DEFAULT_FLAT_EPSILON: f64 = 0.0;

/// Spellings under which the reference country appears in source tables.
pub const DEFAULT_REFERENCE_ALIASES: [&str; 3] =
    ["South Korea", "Korea, South", "Korea, Republic of"];

/// Environment variable prefix.
const ENV_PREFIX: &str = "TRENDRANK_";

/// Resolved configuration for both pipelines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub encodings: Vec<String>,
    pub date_column: String,
    pub value_column: String,
    pub country_column: String,
    pub top_n: usize,
    pub window: usize,
    pub flat_epsilon: f64,
    pub reference_aliases: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            encodings: DEFAULT_ENCODINGS.iter().map(|s| s.to_string()).collect(),
            date_column: DEFAULT_DATE_COLUMN.to_string(),
            value_column: DEFAULT_VALUE_COLUMN.to_string(),
            country_column: DEFAULT_COUNTRY_COLUMN.to_string(),
            top_n: DEFAULT_TOP_N,
            window: DEFAULT_WINDOW,
            flat_epsilon: DEFAULT_FLAT_EPSILON,
            reference_aliases: DEFAULT_REFERENCE_ALIASES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl PipelineConfig {
    /// Defaults overridden by `TRENDRANK_*` variables (after loading `.env`).
    pub fn from_env() -> ConfigResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each key.
    ///
    /// Keys (without the `TRENDRANK_` prefix):
    /// `ENCODINGS` (comma separated), `DATE_COLUMN`, `VALUE_COLUMN`,
    /// `COUNTRY_COLUMN`, `TOP_N`, `WINDOW`, `FLAT_EPSILON`,
    /// `REFERENCE_COUNTRIES` (semicolon separated, names contain commas).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let get = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));
        let mut config = Self::default();

        if let Some(v) = get("ENCODINGS") {
            config.encodings = split_list(&v, ',');
        }
        if let Some(v) = get("DATE_COLUMN") {
            config.date_column = v;
        }
        if let Some(v) = get("VALUE_COLUMN") {
            config.value_column = v;
        }
        if let Some(v) = get("COUNTRY_COLUMN") {
            config.country_column = v;
        }
        if let Some(v) = get("TOP_N") {
            config.top_n = parse_number("TOP_N", &v)?;
        }
        if let Some(v) = get("WINDOW") {
            config.window = parse_number("WINDOW", &v)?;
        }
        if let Some(v) = get("FLAT_EPSILON") {
            let epsilon: f64 = parse_number("FLAT_EPSILON", &v)?;
            if !epsilon.is_finite() || epsilon < 0.0 {
                return Err(invalid("FLAT_EPSILON", &v));
            }
            config.flat_epsilon = epsilon;
        }
        if let Some(v) = get("REFERENCE_COUNTRIES") {
            config.reference_aliases = split_list(&v, ';');
        }

        if config.encodings.is_empty() {
            return Err(invalid("ENCODINGS", ""));
        }
        if config.window == 0 {
            return Err(invalid("WINDOW", "0"));
        }

        Ok(config)
    }
}

/// Split a delimited list, dropping blank items.
pub fn split_list(value: &str, separator: char) -> Vec<String> {
    value
        .split(separator)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> ConfigResult<T> {
    value.trim().parse::<T>().map_err(|_| invalid(name, value))
}

fn invalid(name: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: format!("{}{}", ENV_PREFIX, name),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.encodings, vec!["utf-8", "cp949"]);
        assert_eq!(config.date_column, "날짜");
        assert_eq!(config.top_n, 10);
        assert_eq!(config.window, 10);
        assert_eq!(config.flat_epsilon, 0.0);
        assert_eq!(config.reference_aliases.len(), 3);
    }

    #[test]
    fn test_overrides() {
        let config = PipelineConfig::from_lookup(lookup_from(&[
            ("TRENDRANK_ENCODINGS", "cp949, utf-8 ,"),
            ("TRENDRANK_TOP_N", "5"),
            ("TRENDRANK_FLAT_EPSILON", "0.001"),
            ("TRENDRANK_REFERENCE_COUNTRIES", "Korea, South; South Korea"),
        ]))
        .unwrap();

        assert_eq!(config.encodings, vec!["cp949", "utf-8"]);
        assert_eq!(config.top_n, 5);
        assert!((config.flat_epsilon - 0.001).abs() < 1e-12);
        assert_eq!(config.reference_aliases, vec!["Korea, South", "South Korea"]);
        assert_eq!(config.value_column, DEFAULT_VALUE_COLUMN);
    }

    #[test]
    fn test_invalid_values() {
        let err = PipelineConfig::from_lookup(lookup_from(&[("TRENDRANK_TOP_N", "ten")])).unwrap_err();
        assert!(err.to_string().contains("TRENDRANK_TOP_N"));

        assert!(PipelineConfig::from_lookup(lookup_from(&[("TRENDRANK_FLAT_EPSILON", "-1")])).is_err());
        assert!(PipelineConfig::from_lookup(lookup_from(&[("TRENDRANK_WINDOW", "0")])).is_err());
        assert!(PipelineConfig::from_lookup(lookup_from(&[("TRENDRANK_ENCODINGS", " , ")])).is_err());
    }
}
