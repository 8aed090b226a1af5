//! Derived statistics over a buffer snapshot.

use serde::{Deserialize, Serialize};

use crate::sample::Sample;

/// Summary statistics of a sample sequence.
///
/// All fields are zero for an empty buffer: a defined boundary rather than
/// NaN propagation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// Largest absolute value seen.
    pub peak: f64,
}

/// Compute statistics over a snapshot. Pure; safe to call concurrently with
/// appends since it operates on an owned copy.
pub fn compute(samples: &[Sample]) -> Stats {
    if samples.is_empty() {
        return Stats::default();
    }

    let mut sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut peak = 0.0f64;
    for s in samples {
        sum += s.value;
        min = min.min(s.value);
        max = max.max(s.value);
        peak = peak.max(s.value.abs());
    }

    Stats {
        mean: sum / samples.len() as f64,
        min,
        max,
        peak,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(values: &[f64]) -> Vec<Sample> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| Sample::new(i as f64, v))
            .collect()
    }

    #[test]
    fn empty_buffer_is_all_zero() {
        assert_eq!(compute(&[]), Stats::default());
    }

    #[test]
    fn mean_lies_between_extrema() {
        let snap = samples(&[3.0, 7.5, 1.25, 9.0, 4.0]);
        let stats = compute(&snap);
        assert!(stats.mean >= stats.min);
        assert!(stats.mean <= stats.max);
        assert_eq!(stats.min, 1.25);
        assert_eq!(stats.max, 9.0);
    }

    #[test]
    fn peak_is_largest_magnitude() {
        let stats = compute(&samples(&[-8.0, 2.0, 5.0]));
        assert_eq!(stats.peak, 8.0);
        assert_eq!(stats.min, -8.0);
        assert_eq!(stats.max, 5.0);
    }

    #[test]
    fn single_sample_collapses() {
        let stats = compute(&samples(&[4.2]));
        assert_eq!(stats.mean, 4.2);
        assert_eq!(stats.min, 4.2);
        assert_eq!(stats.max, 4.2);
        assert_eq!(stats.peak, 4.2);
    }
}
