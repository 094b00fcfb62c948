//! Aggregator: group clean records by period and reduce each group to its mean.
//!
//! # Architecture
//!
//! ```text
//! Clean records                   →  One record per period (ascending)
//! ┌─────────────────────────┐       ┌─────────────────────────┐
//! │ period: 1907, value: 13 │       │ period: 1907, value: 12 │
//! │ period: 1907, value: 11 │  →    ├─────────────────────────┤
//! │ period: 1908, value:  9 │       │ period: 1908, value:  9 │
//! └─────────────────────────┘       └─────────────────────────┘
//! ```
//!
//! The output has the same shape as the input, so aggregating an
//! already-aggregated set returns it unchanged.

use std::collections::BTreeMap;

use crate::error::{DataUnit, Incomplete};
use crate::models::CleanRecord;

/// Minimum number of distinct periods a trend fit needs.
pub const MIN_TREND_PERIODS: usize = 2;

/// Mean value per period, ascending by period.
pub fn yearly_means(records: &[CleanRecord]) -> Vec<CleanRecord> {
    let mut groups: BTreeMap<i32, PeriodAccumulator> = BTreeMap::new();

    for record in records {
        groups.entry(record.period).or_default().add(record.value);
    }

    groups
        .into_iter()
        .map(|(period, acc)| CleanRecord { period, value: acc.mean() })
        .collect()
}

/// `InsufficientData` when `means` has fewer periods than a fit needs.
pub fn require_trend_points(means: &[CleanRecord]) -> Result<(), Incomplete> {
    if means.len() < MIN_TREND_PERIODS {
        return Err(Incomplete::InsufficientData {
            found: means.len(),
            required: MIN_TREND_PERIODS,
            unit: DataUnit::Periods,
        });
    }
    Ok(())
}

/// Running sum for one period. Groups only exist once a value was added,
/// so `count` is never zero when `mean` is called.
#[derive(Debug, Default, Clone, Copy)]
struct PeriodAccumulator {
    sum: f64,
    count: usize,
}

impl PeriodAccumulator {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn mean(self) -> f64 {
        self.sum / self.count as f64
    }
}
