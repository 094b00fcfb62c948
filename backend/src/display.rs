//! Country display names.
//!
//! Rankings and lookups always use the identifier from the source table.
//! This mapping is applied only when a report is printed, and names without
//! an entry are shown unchanged.

use std::collections::HashMap;
use std::path::Path;

use crate::error::ConfigResult;

/// English name to Korean display name, for the bundled MBTI dataset.
const KOREAN_NAMES: &str = include_str!("../data/country_names_ko.json");

/// Identifier → display name mapping with identity fallback.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayNames {
    names: HashMap<String, String>,
}

impl DisplayNames {
    /// No mapping: every name displays as itself.
    pub fn identity() -> Self {
        Self::default()
    }

    /// The bundled Korean table.
    pub fn korean() -> ConfigResult<Self> {
        Self::from_json(KOREAN_NAMES)
    }

    /// Parse a JSON object of `"identifier": "display name"` pairs.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let names: HashMap<String, String> = serde_json::from_str(json)?;
        Ok(Self { names })
    }

    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn display<'a>(&'a self, country: &'a str) -> &'a str {
        self.names.get(country).map(String::as_str).unwrap_or(country)
    }

    /// `display` plus the identifier in parentheses when they differ.
    pub fn labelled(&self, country: &str) -> String {
        match self.names.get(country) {
            Some(name) if name != country => format!("{} ({})", name, country),
            _ => country.to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
