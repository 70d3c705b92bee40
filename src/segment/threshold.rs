//! Breakpoint detection over adjacent-sentence distances.

use crate::config::SegmenterSettings;
use crate::segment::ThresholdType;

/// How a boundary threshold is derived from a document's own distances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BreakpointStrategy {
    /// Threshold is the given quantile (0..=1) of the distances.
    Percentile(f64),
    /// Threshold is mean + k standard deviations.
    StandardDeviation(f64),
    /// Threshold is mean + k interquartile ranges.
    Interquartile(f64),
    /// Quantile (0..=1) applied to the gradient of the distances.
    Gradient(f64),
}

impl BreakpointStrategy {
    pub fn from_settings(settings: &SegmenterSettings) -> Self {
        match settings.threshold_type {
            ThresholdType::Percentile => Self::Percentile(settings.threshold_percentile),
            ThresholdType::StandardDeviation => {
                Self::StandardDeviation(settings.threshold_amount)
            }
            ThresholdType::Interquartile => Self::Interquartile(settings.threshold_amount),
            ThresholdType::Gradient => Self::Gradient(settings.threshold_percentile),
        }
    }

    /// Indices `i` such that a boundary falls between span `i` and `i + 1`.
    ///
    /// `distances[i]` is the distance between span `i` and span `i + 1`.
    /// A boundary is placed only where the score is strictly above the
    /// threshold, so uniform distances never split.
    pub fn breakpoints(&self, distances: &[f64]) -> Vec<usize> {
        if distances.is_empty() {
            return Vec::new();
        }
        // A lone distance has a flat gradient; two spans stay separate.
        if matches!(self, Self::Gradient(_)) && distances.len() == 1 {
            return vec![0];
        }

        let scores = match self {
            Self::Gradient(_) => gradient(distances),
            _ => distances.to_vec(),
        };
        let threshold = self.threshold(&scores);

        tracing::debug!(
            strategy = ?self,
            threshold,
            candidates = scores.len(),
            "Computed breakpoint threshold"
        );

        scores
            .iter()
            .enumerate()
            .filter(|(_, score)| **score > threshold)
            .map(|(i, _)| i)
            .collect()
    }

    fn threshold(&self, scores: &[f64]) -> f64 {
        match *self {
            Self::Percentile(q) | Self::Gradient(q) => quantile(scores, q),
            Self::StandardDeviation(k) => mean(scores) + k * std_dev(scores),
            Self::Interquartile(k) => {
                let iqr = quantile(scores, 0.75) - quantile(scores, 0.25);
                mean(scores) + k * iqr
            }
        }
    }
}

/// Linearly interpolated quantile, `q` clamped to [0, 1].
pub fn quantile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

// Population standard deviation.
fn std_dev(values: &[f64]) -> f64 {
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

// Central differences inside, one-sided at the edges.
fn gradient(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    if n < 2 {
        return vec![0.0; n];
    }
    (0..n)
        .map(|i| match i {
            0 => values[1] - values[0],
            i if i == n - 1 => values[n - 1] - values[n - 2],
            i => (values[i + 1] - values[i - 1]) / 2.0,
        })
        .collect()
}
