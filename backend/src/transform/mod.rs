//! Transformation module.
//!
//! - Normalize: raw rows to clean (period, value) records
//! - Grouper: clean records to one mean per period
//! - Trend: least-squares fit and window summaries
//! - Rank: per-country category shares and rankings
//! - Pipeline: load + the steps above, with logs and completeness status

pub mod grouper;
pub mod normalize;
pub mod pipeline;
pub mod rank;
pub mod trend;

pub use grouper::{require_trend_points, yearly_means, MIN_TREND_PERIODS};
pub use normalize::{normalize_temperature, parse_date, parse_period, parse_value, Normalized};
pub use pipeline::*;
pub use rank::{country_profile, country_records, find_country, global_average, rank, CountryProfile, Ranking};
pub use trend::{summaries, LinearFit, TrendSummary};
