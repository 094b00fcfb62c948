//! High-level pipeline API: load, normalize, derive.
//!
//! Two pipelines share the loader and the source cache:
//!
//! - [`run_temperature`] - dated readings to yearly means and a fitted trend
//! - [`run_mbti`] - per-country category shares to a ranking, plus the
//!   [`run_profile`] and [`run_global_average`] views over the same table
//!
//! Load and schema failures are fatal and return [`PipelineError`]. Too few
//! periods, an empty ranking or a missing reference country are not: the
//! report still carries whatever could be derived, tagged
//! [`Completeness::Incomplete`].
//!
//! # Example
//!
//! ```rust,ignore
//! use trendrank::{run_temperature, Source, TemperatureOptions};
//!
//! let report = run_temperature(&Source::path("ta_20240101.csv"), &TemperatureOptions::default())?;
//! if let Some(trend) = report.trend {
//!     println!("{} by {:.4} per year", trend.direction, trend.slope);
//! }
//! ```

use chrono::Utc;
use serde::Serialize;

use crate::cache::{load_cached, CachedTable};
use crate::config::PipelineConfig;
use crate::error::{DataUnit, Incomplete, PipelineResult};
use crate::logs::{LogCollector, LogEntry};
use crate::models::{Category, CategoryShare, PositionTier, RankedCountry, YearlySummary};
use crate::parser::{Attempt, Source};
use super::grouper::{require_trend_points, yearly_means};
use super::normalize::normalize_temperature;
use super::rank::{
    country_profile, country_records, find_country, global_average, rank, require_category,
    unbalanced_countries, CountryProfile, Ranking, SHARE_SUM_TOLERANCE,
};
use super::trend::{summaries, TrendSummary};

/// Whether a report holds everything that was asked for.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "reasons", rename_all = "lowercase")]
pub enum Completeness {
    Complete,
    Incomplete(Vec<Incomplete>),
}

impl Completeness {
    fn from_reasons(reasons: Vec<Incomplete>) -> Self {
        if reasons.is_empty() {
            Completeness::Complete
        } else {
            Completeness::Incomplete(reasons)
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Completeness::Complete)
    }

    pub fn reasons(&self) -> &[Incomplete] {
        match self {
            Completeness::Complete => &[],
            Completeness::Incomplete(reasons) => reasons,
        }
    }
}

/// How the source was read.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceInfo {
    pub name: String,
    pub encoding: String,
    pub delimiter: char,
    pub headers: Vec<String>,
    pub row_count: usize,
    pub fingerprint: String,
    pub cache_hit: bool,
    pub attempts: Vec<Attempt>,
    /// RFC 3339 timestamp of this run.
    pub processed_at: String,
}

impl SourceInfo {
    fn new(name: String, cached: &CachedTable) -> Self {
        Self {
            name,
            encoding: cached.table.encoding.clone(),
            delimiter: cached.table.delimiter,
            headers: cached.table.headers.clone(),
            row_count: cached.table.row_count(),
            fingerprint: cached.fingerprint.to_string(),
            cache_hit: cached.hit,
            attempts: cached.table.attempts.clone(),
            processed_at: Utc::now().to_rfc3339(),
        }
    }
}

/// Load through the global cache and log how it went.
fn load(source: &Source, encodings: &[String], log: &mut LogCollector) -> PipelineResult<(CachedTable, SourceInfo)> {
    log.info(format!("Reading {}", source.name()));

    let cached = fatal(log, load_cached(source, encodings))?;
    let info = SourceInfo::new(source.name(), &cached);

    for attempt in info.attempts.iter().filter(|a| a.error.is_some()) {
        log.warning(format!(
            "Encoding {} rejected: {}",
            attempt.encoding,
            attempt.error.as_deref().unwrap_or_default()
        ));
    }
    log.success(format!("Detected encoding: {}", info.encoding));
    log.success(format!("Detected separator: '{}'", format_delimiter(info.delimiter)));
    log.success(format!(
        "Read {} rows{}",
        info.row_count,
        if info.cache_hit { " (cached)" } else { "" }
    ));

    Ok((cached, info))
}

/// Record a fatal error in the log before it propagates.
fn fatal<T, E: std::fmt::Display>(log: &mut LogCollector, result: Result<T, E>) -> Result<T, E> {
    result.map_err(|e| {
        log.error(e.to_string());
        e
    })
}

/// Delimiter as shown in logs.
pub fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "TAB".to_string(),
        c => c.to_string(),
    }
}

// =============================================================================
// Temperature
// =============================================================================

/// Options for [`run_temperature`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemperatureOptions {
    pub encodings: Vec<String>,
    pub date_column: String,
    pub value_column: String,
    pub window: usize,
    pub flat_epsilon: f64,
}

impl Default for TemperatureOptions {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

impl From<&PipelineConfig> for TemperatureOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            encodings: config.encodings.clone(),
            date_column: config.date_column.clone(),
            value_column: config.value_column.clone(),
            window: config.window,
            flat_epsilon: config.flat_epsilon,
        }
    }
}

/// Result of the temperature pipeline.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemperatureReport {
    pub source: SourceInfo,
    /// One entry per period, ascending.
    pub summaries: Vec<YearlySummary>,
    /// Absent when fewer than two periods survived normalization.
    pub trend: Option<TrendSummary>,
    pub rows_read: usize,
    pub dropped_rows: usize,
    pub status: Completeness,
    pub log: Vec<LogEntry>,
}

/// Load dated readings, reduce them to yearly means and fit a trend.
pub fn run_temperature(source: &Source, options: &TemperatureOptions) -> PipelineResult<TemperatureReport> {
    let mut log = LogCollector::new();
    let (cached, info) = load(source, &options.encodings, &mut log)?;

    let normalized = fatal(
        &mut log,
        normalize_temperature(&cached.table, &options.date_column, &options.value_column),
    )?;
    if normalized.dropped() > 0 {
        log.warning(format!(
            "Dropped {} rows ({} without a date, {} without a value)",
            normalized.dropped(),
            normalized.missing_period,
            normalized.missing_value
        ));
    }
    log.success(format!("{} clean records", normalized.records.len()));

    let means = yearly_means(&normalized.records);
    log.info(format!("{} periods", means.len()));

    let mut reasons = Vec::new();
    let trend = match require_trend_points(&means) {
        Ok(()) => TrendSummary::derive(&means, options.window, options.flat_epsilon),
        Err(reason) => {
            log.warning(reason.to_string());
            reasons.push(reason);
            None
        }
    };

    if let Some(trend) = &trend {
        log.success(format!(
            "Trend {} (slope {:.4}/period, {:+.2} between the first and last {} periods)",
            trend.direction, trend.slope, trend.difference, trend.window
        ));
    }

    let summaries = summaries(&means, trend.map(|t| t.fit()).as_ref());

    Ok(TemperatureReport {
        source: info,
        summaries,
        trend,
        rows_read: normalized.rows_read,
        dropped_rows: normalized.dropped(),
        status: Completeness::from_reasons(reasons),
        log: log.into_entries(),
    })
}

// =============================================================================
// MBTI
// =============================================================================

/// Options for the MBTI pipelines.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MbtiOptions {
    pub encodings: Vec<String>,
    pub country_column: String,
    pub category: Category,
    pub top_n: usize,
    /// Names tried in order when locating the reference country.
    pub reference_aliases: Vec<String>,
}

impl MbtiOptions {
    pub fn new(config: &PipelineConfig, category: Category) -> Self {
        Self {
            encodings: config.encodings.clone(),
            country_column: config.country_column.clone(),
            category,
            top_n: config.top_n,
            reference_aliases: config.reference_aliases.clone(),
        }
    }
}

impl Default for MbtiOptions {
    fn default() -> Self {
        Self::new(&PipelineConfig::default(), Category::Intj)
    }
}

/// The reference country's place in a ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferencePosition {
    pub entry: RankedCountry,
    pub tier: PositionTier,
}

/// Result of [`run_mbti`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MbtiReport {
    pub source: SourceInfo,
    pub ranking: Ranking,
    /// The first `top_n` entries.
    pub top: Vec<RankedCountry>,
    /// `top` plus the reference country when it ranks below the slice.
    pub chart: Vec<RankedCountry>,
    pub reference: Option<ReferencePosition>,
    pub status: Completeness,
    pub log: Vec<LogEntry>,
}

/// Rank every country by one category.
pub fn run_mbti(source: &Source, options: &MbtiOptions) -> PipelineResult<MbtiReport> {
    let mut log = LogCollector::new();
    let (cached, info) = load(source, &options.encodings, &mut log)?;

    fatal(&mut log, require_category(&cached.table, options.category))?;
    let records = fatal(&mut log, country_records(&cached.table, &options.country_column))?;
    log.success(format!("{} countries", records.len()));

    let unbalanced = unbalanced_countries(&records, SHARE_SUM_TOLERANCE);
    if !unbalanced.is_empty() {
        log.warning(format!(
            "{} countries with shares not summing to 100%: {}",
            unbalanced.len(),
            unbalanced.join(", ")
        ));
    }

    let ranking = rank(&records, options.category);
    if !ranking.unranked.is_empty() {
        log.warning(format!(
            "{} countries without a {} share: {}",
            ranking.unranked.len(),
            options.category,
            ranking.unranked.join(", ")
        ));
    }

    let mut reasons = Vec::new();
    if ranking.is_empty() {
        let reason = Incomplete::InsufficientData { found: 0, required: 1, unit: DataUnit::Countries };
        log.warning(reason.to_string());
        reasons.push(reason);
    }

    let reference = if options.reference_aliases.is_empty() || ranking.is_empty() {
        None
    } else {
        match ranking.lookup_any(&options.reference_aliases) {
            Ok(entry) => {
                let position = ReferencePosition {
                    entry: entry.clone(),
                    tier: ranking.tier(entry, options.top_n),
                };
                log.info(format!(
                    "{} ranks {} of {} ({:.2}%)",
                    entry.country,
                    entry.rank,
                    ranking.len(),
                    entry.value * 100.0
                ));
                Some(position)
            }
            Err(reason) => {
                log.warning(reason.to_string());
                reasons.push(reason);
                None
            }
        }
    };

    let top = ranking.top(options.top_n).to_vec();
    let chart = ranking.top_with(options.top_n, reference.as_ref().map(|r| &r.entry));
    log.success(format!("Top {} {} countries ready", top.len(), options.category));

    Ok(MbtiReport {
        source: info,
        ranking,
        top,
        chart,
        reference,
        status: Completeness::from_reasons(reasons),
        log: log.into_entries(),
    })
}

/// Result of [`run_profile`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileReport {
    pub source: SourceInfo,
    pub profile: Option<CountryProfile>,
    pub status: Completeness,
    pub log: Vec<LogEntry>,
}

/// Category distribution of the first of `countries` present in the table.
pub fn run_profile<S: AsRef<str>>(source: &Source, options: &MbtiOptions, countries: &[S]) -> PipelineResult<ProfileReport> {
    let mut log = LogCollector::new();
    let (cached, info) = load(source, &options.encodings, &mut log)?;

    let records = fatal(&mut log, country_records(&cached.table, &options.country_column))?;

    let found = countries.iter().find_map(|name| find_country(&records, name.as_ref()).ok());

    let (profile, status) = match found {
        Some(record) => {
            let profile = country_profile(record);
            if let Some(dominant) = profile.dominant() {
                log.success(format!(
                    "{}: most common type {} ({:.2}%)",
                    profile.country,
                    dominant.category,
                    dominant.value * 100.0
                ));
            }
            (Some(profile), Completeness::Complete)
        }
        None => {
            let reason = Incomplete::CountryNotFound {
                name: countries.iter().map(|c| c.as_ref()).collect::<Vec<_>>().join(" / "),
            };
            log.warning(reason.to_string());
            (None, Completeness::Incomplete(vec![reason]))
        }
    };

    Ok(ProfileReport { source: info, profile, status, log: log.into_entries() })
}

/// Result of [`run_global_average`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalReport {
    pub source: SourceInfo,
    pub countries: usize,
    /// Mean share per category, most common first.
    pub averages: Vec<CategoryShare>,
    pub status: Completeness,
    pub log: Vec<LogEntry>,
}

/// Mean share of every category across all countries.
pub fn run_global_average(source: &Source, options: &MbtiOptions) -> PipelineResult<GlobalReport> {
    let mut log = LogCollector::new();
    let (cached, info) = load(source, &options.encodings, &mut log)?;

    let records = fatal(&mut log, country_records(&cached.table, &options.country_column))?;

    let (averages, status) = match global_average(&records) {
        Ok(averages) => {
            if let Some(first) = averages.first() {
                log.success(format!("Most common type worldwide: {} ({:.2}%)", first.category, first.value * 100.0));
            }
            (averages, Completeness::Complete)
        }
        Err(reason) => {
            log.warning(reason.to_string());
            (Vec::new(), Completeness::Incomplete(vec![reason]))
        }
    };

    Ok(GlobalReport {
        source: info,
        countries: records.len(),
        averages,
        status,
        log: log.into_entries(),
    })
}
