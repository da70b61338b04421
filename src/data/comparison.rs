//! Side-by-side comparison of two benchmark runs.
//!
//! Pairs each measurement of the current entry with the measurement of the
//! same name in the previous entry, if it had one.

use super::models::Entry;

/// One benchmark's value in the current run next to its previous value
#[derive(Debug, Clone, PartialEq)]
pub struct BenchComparison<'a> {
    pub name: &'a str,
    pub unit: &'a str,
    pub previous: Option<f64>,
    pub current: f64,
}

impl BenchComparison<'_> {
    /// `current / previous`, `None` for new benchmarks or a zero previous value
    pub fn ratio(&self) -> Option<f64> {
        self.previous
            .filter(|&p| p > 0.0)
            .map(|p| self.current / p)
    }

    /// Whether the current value exceeds the previous one by more than `threshold_ratio`
    pub fn exceeds(&self, threshold_ratio: f64) -> bool {
        self.ratio().is_some_and(|r| r > 1.0 + threshold_ratio)
    }
}

/// Compare `current` against `previous`, in the order of `current`'s measurements
pub fn compare_entries<'a>(
    previous: Option<&'a Entry>,
    current: &'a Entry,
) -> impl Iterator<Item = BenchComparison<'a>> + 'a {
    current.benches.iter().map(move |m| BenchComparison {
        name: &m.name,
        unit: &m.unit,
        previous: previous.and_then(|p| p.bench(&m.name)).map(|p| p.value),
        current: m.value,
    })
}
