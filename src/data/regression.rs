//! Regression assessment over a benchmark's history.
//!
//! The newest point is compared against the mean of every point before it.

use serde::Serialize;

use super::error::{HistoryError, Result};
use super::models::HistoryPoint;

/// Minimum number of prior points needed for a meaningful baseline
pub const MIN_PRIORS: usize = 2;

/// Outcome of comparing the latest measurement against its history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegressionReport {
    pub benchmark: String,
    pub unit: String,
    /// Commit that produced the latest point
    pub commit: String,
    pub latest: f64,
    /// Mean of all prior points
    pub baseline: f64,
    /// `latest / baseline - 1`, `None` when the baseline is zero
    pub change_ratio: Option<f64>,
    pub threshold: f64,
    pub priors: usize,
    pub regressed: bool,
}

impl RegressionReport {
    /// Value above which the latest point counts as a regression
    pub fn limit(&self) -> f64 {
        (1.0 + self.threshold) * self.baseline
    }
}

/// Assess the last of `points` against the mean of the ones before it.
///
/// Fails with `InsufficientHistory` when fewer than [`MIN_PRIORS`] priors exist.
pub fn assess<'a, I>(benchmark: &str, points: I, threshold: f64) -> Result<RegressionReport>
where
    I: IntoIterator<Item = HistoryPoint<'a>>,
{
    let points: Vec<HistoryPoint<'a>> = points.into_iter().collect();
    let priors = points.len().saturating_sub(1);

    let (latest, history) = match points.split_last() {
        Some((latest, history)) if priors >= MIN_PRIORS => (latest, history),
        _ => {
            return Err(HistoryError::InsufficientHistory {
                benchmark: benchmark.to_string(),
                priors,
            })
        }
    };

    let baseline = history.iter().map(|p| p.value).sum::<f64>() / priors as f64;
    let change_ratio = (baseline > 0.0).then(|| latest.value / baseline - 1.0);
    let regressed = latest.value > (1.0 + threshold) * baseline;

    Ok(RegressionReport {
        benchmark: benchmark.to_string(),
        unit: latest.unit.to_string(),
        commit: latest.commit_id.to_string(),
        latest: latest.value,
        baseline,
        change_ratio,
        threshold,
        priors,
        regressed,
    })
}
