//! Domain models shared by both pipelines.
//!
//! - [`CleanRecord`] - One normalized temperature reading (period + value)
//! - [`YearlySummary`] - Per-period mean with its fitted trend value
//! - [`Direction`] - Sign of the fitted slope
//! - [`Category`] - The 16 personality types
//! - [`CountryRecord`] - Per-country category shares
//! - [`RankedCountry`] - One row of a ranking
//! - [`PositionTier`] - Where a ranked country sits relative to the others

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// Temperature
// =============================================================================

/// A row that survived normalization. Both fields are always present; rows
/// with a missing period or value never become a `CleanRecord`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CleanRecord {
    /// Calendar year of the parsed date.
    pub period: i32,
    pub value: f64,
}

/// Per-period aggregate, ascending by period within a summary set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlySummary {
    pub period: i32,
    pub mean_value: f64,
    /// Fitted value at this period, absent when no trend could be fitted.
    pub trend_value: Option<f64>,
}

/// Direction of a fitted trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Rising,
    Falling,
    Flat,
}

impl Direction {
    /// Classify a slope. Slopes within `epsilon` of zero are flat; an
    /// epsilon of zero means only an exactly zero slope is flat.
    pub fn classify(slope: f64, epsilon: f64) -> Self {
        if slope > epsilon {
            Direction::Rising
        } else if slope < -epsilon {
            Direction::Falling
        } else {
            Direction::Flat
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Rising => write!(f, "rising"),
            Direction::Falling => write!(f, "falling"),
            Direction::Flat => write!(f, "flat"),
        }
    }
}

// =============================================================================
// Personality categories
// =============================================================================

/// One of the 16 personality types. Each is stored in source tables as an
/// assertive (`-A`) and a turbulent (`-T`) sub-column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    Intj,
    Intp,
    Entj,
    Entp,
    Infj,
    Infp,
    Enfj,
    Enfp,
    Istj,
    Isfj,
    Estj,
    Esfj,
    Istp,
    Isfp,
    Estp,
    Esfp,
}

impl Category {
    /// All categories in their conventional display order.
    pub const ALL: [Category; 16] = [
        Category::Intj,
        Category::Intp,
        Category::Entj,
        Category::Entp,
        Category::Infj,
        Category::Infp,
        Category::Enfj,
        Category::Enfp,
        Category::Istj,
        Category::Isfj,
        Category::Estj,
        Category::Esfj,
        Category::Istp,
        Category::Isfp,
        Category::Estp,
        Category::Esfp,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::Intj => "INTJ",
            Category::Intp => "INTP",
            Category::Entj => "ENTJ",
            Category::Entp => "ENTP",
            Category::Infj => "INFJ",
            Category::Infp => "INFP",
            Category::Enfj => "ENFJ",
            Category::Enfp => "ENFP",
            Category::Istj => "ISTJ",
            Category::Isfj => "ISFJ",
            Category::Estj => "ESTJ",
            Category::Esfj => "ESFJ",
            Category::Istp => "ISTP",
            Category::Isfp => "ISFP",
            Category::Estp => "ESTP",
            Category::Esfp => "ESFP",
        }
    }

    /// Position in [`Category::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn assertive_column(self) -> String {
        format!("{}-A", self.label())
    }

    pub fn turbulent_column(self) -> String {
        format!("{}-T", self.label())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Unknown personality-type label.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown category '{0}' (expected one of INTJ, INTP, ..., ESFP)")]
pub struct ParseCategoryError(pub String);

impl FromStr for Category {
    type Err = ParseCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.label() == wanted)
            .ok_or_else(|| ParseCategoryError(s.to_string()))
    }
}

// =============================================================================
// Countries
// =============================================================================

/// Category shares of one country, indexed by [`Category::index`].
///
/// A share is absent when either sub-column is missing from the table or
/// fails to parse for this row. Shares are fractions; the 16 of one
/// country are expected to sum to about 1.0, which is not enforced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryRecord {
    /// Canonical identifier as it appears in the source table.
    pub country: String,
    pub values: [Option<f64>; 16],
    /// Row position in the source table, used for stable tie-breaking.
    pub source_row: usize,
}

impl CountryRecord {
    pub fn value(&self, category: Category) -> Option<f64> {
        self.values[category.index()]
    }

    /// Sum of the present shares.
    pub fn total(&self) -> f64 {
        self.values.iter().flatten().sum()
    }
}

/// A category with its share, as used in profiles and averages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryShare {
    pub category: Category,
    pub value: f64,
}

/// One row of a ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedCountry {
    pub country: String,
    pub value: f64,
    /// 1-based position in the descending sort.
    pub rank: usize,
    pub source_row: usize,
}

/// Where a ranked country sits in the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PositionTier {
    /// Within the top-N slice.
    TopN,
    /// Outside the top-N but in the upper half.
    AboveMedian,
    BelowMedian,
}
