//! # Trendrank - trends and rankings from regional CSV exports
//!
//! Trendrank loads CSV tables of unknown encoding (weather-station exports,
//! per-country survey shares), cleans them and derives the figures a
//! dashboard shows: yearly means with a fitted linear trend, and country
//! rankings by personality type.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  CSV bytes  │────▶│   Loader    │────▶│ Normalizer  │────▶│ Aggregator  │──▶ Trend
//! │ (UTF8/CP949)│     │ (enc. list) │     │ (schema chk)│     │ (per year)  │
//! └─────────────┘     └─────────────┘     └──────┬──────┘     └─────────────┘
//!                            │                   │
//!                     ┌──────┴──────┐            └──────────▶ Rank (per country)
//!                     │ SourceCache │
//!                     │ (sha256 key)│
//!                     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use trendrank::{run_mbti, Category, MbtiOptions, PipelineConfig, Source};
//!
//! let config = PipelineConfig::from_env()?;
//! let report = run_mbti(&Source::path("mbti.csv"), &MbtiOptions::new(&config, Category::Infp))?;
//! for entry in &report.top {
//!     println!("{:2}. {} {:.2}%", entry.rank, entry.country, entry.value * 100.0);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Fatal errors and recoverable `Incomplete` conditions
//! - [`config`] - Defaults, environment overrides
//! - [`logs`] - Pipeline log entries
//! - [`models`] - Domain models (CleanRecord, Category, RankedCountry)
//! - [`parser`] - Encoding fallback and delimited parsing
//! - [`cache`] - Fingerprint-keyed table cache
//! - [`validation`] - Required-column check
//! - [`transform`] - Normalize, aggregate, fit, rank, and the pipelines
//! - [`display`] - Country display names

// Core modules
pub mod config;
pub mod error;
pub mod logs;
pub mod models;

// Loading
pub mod cache;
pub mod parser;

// Validation
pub mod validation;

// Transformation
pub mod transform;

// Presentation helpers
pub mod display;

// =============================================================================
// Re-exports - Errors
// =============================================================================

pub use error::{
    ConfigError,
    DataUnit,
    Incomplete,
    LoadError,
    PipelineError,
    SchemaError,
};

// =============================================================================
// Re-exports - Config
// =============================================================================

pub use config::PipelineConfig;

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    Category,
    CategoryShare,
    CleanRecord,
    CountryRecord,
    Direction,
    PositionTier,
    RankedCountry,
    YearlySummary,
};

// =============================================================================
// Re-exports - Loading
// =============================================================================

pub use cache::{load_cached, CachedTable, Fingerprint, SourceCache};
pub use parser::{
    detect_delimiter,
    load_bytes,
    load_path,
    load_reader,
    load_source,
    Attempt,
    RawTable,
    Source,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{
    run_global_average,
    run_mbti,
    run_profile,
    run_temperature,
    Completeness,
    GlobalReport,
    MbtiOptions,
    MbtiReport,
    ProfileReport,
    ReferencePosition,
    SourceInfo,
    TemperatureOptions,
    TemperatureReport,
};
pub use transform::{CountryProfile, LinearFit, Ranking, TrendSummary};

pub use display::DisplayNames;
