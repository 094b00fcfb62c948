//! Trend Deriver: least-squares line over (period, mean) pairs and the
//! summary figures a presenter shows next to the chart.

use serde::{Deserialize, Serialize};

use crate::models::{CleanRecord, Direction, YearlySummary};

/// `value ≈ slope * period + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    /// Ordinary least squares via the closed-form normal equations.
    ///
    /// Sums are taken around the means, which keeps year-sized abscissas
    /// from swamping the cross products. `None` for fewer than two points
    /// or when every point shares one period.
    pub fn fit(points: &[CleanRecord]) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }

        let n = points.len() as f64;
        let mean_x = points.iter().map(|p| p.period as f64).sum::<f64>() / n;
        let mean_y = points.iter().map(|p| p.value).sum::<f64>() / n;

        let (sxx, sxy) = points.iter().fold((0.0, 0.0), |(sxx, sxy), p| {
            let dx = p.period as f64 - mean_x;
            (sxx + dx * dx, sxy + dx * (p.value - mean_y))
        });

        if sxx == 0.0 {
            return None;
        }

        let slope = sxy / sxx;
        Some(Self { slope, intercept: mean_y - slope * mean_x })
    }

    /// Fitted value at `period`.
    pub fn value_at(&self, period: f64) -> f64 {
        self.slope * period + self.intercept
    }
}

/// Figures derived from the yearly means and their fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendSummary {
    pub slope: f64,
    pub intercept: f64,
    pub direction: Direction,
    /// Mean of the first `window` periods.
    pub first_window_mean: f64,
    /// Mean of the last `window` periods.
    pub last_window_mean: f64,
    /// `last_window_mean - first_window_mean`.
    pub difference: f64,
    /// Periods actually averaged at each end.
    pub window: usize,
}

impl TrendSummary {
    /// `None` when `means` cannot be fitted.
    pub fn derive(means: &[CleanRecord], window: usize, flat_epsilon: f64) -> Option<Self> {
        let fit = LinearFit::fit(means)?;
        let window = window.clamp(1, means.len());

        let first_window_mean = mean_of(&means[..window]);
        let last_window_mean = mean_of(&means[means.len() - window..]);

        Some(Self {
            slope: fit.slope,
            intercept: fit.intercept,
            direction: Direction::classify(fit.slope, flat_epsilon),
            first_window_mean,
            last_window_mean,
            difference: last_window_mean - first_window_mean,
            window,
        })
    }

    pub fn fit(&self) -> LinearFit {
        LinearFit { slope: self.slope, intercept: self.intercept }
    }
}

/// Yearly summaries with fitted values filled in when a fit exists.
pub fn summaries(means: &[CleanRecord], fit: Option<&LinearFit>) -> Vec<YearlySummary> {
    means
        .iter()
        .map(|m| YearlySummary {
            period: m.period,
            mean_value: m.value,
            trend_value: fit.map(|f| f.value_at(m.period as f64)),
        })
        .collect()
}

fn mean_of(records: &[CleanRecord]) -> f64 {
    records.iter().map(|r| r.value).sum::<f64>() / records.len() as f64
}
