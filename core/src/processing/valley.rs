use crate::math::stats::StatsHelper;
use crate::prelude::{secs, Sample, Valley, ValleyConfig};
use crate::processing::waveform::sample_rate;
use std::time::Duration;

/// Finds pulse onsets (local minima) in a window.
///
/// The detector keeps no state between calls: every pass recomputes from the window it
/// is handed. Steps are smoothing, local-minimum scan, refractory merge and amplitude
/// gate, in that order.
#[derive(Debug, Clone, Default)]
pub struct ValleyDetector {
    config: ValleyConfig,
}

impl ValleyDetector {
    pub fn new(config: ValleyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValleyConfig {
        &self.config
    }

    pub fn detect(&self, samples: &[Sample]) -> Vec<Valley> {
        let Some(rate) = sample_rate(samples) else {
            return Vec::new();
        };
        let smoothing = odd_length(self.config.smoothing_secs, rate);
        let radius = ((self.config.comparison_radius_secs as f64 * rate).round() as usize).max(1);
        if samples.len() < 2 * radius + 1 {
            return Vec::new();
        }

        let values: Vec<f32> = samples.iter().map(|s| s.value).collect();
        let smoothed = StatsHelper::moving_average(&values, smoothing);
        let baseline =
            StatsHelper::moving_average(&smoothed, odd_length(self.config.baseline_secs, rate));

        let candidates = local_minima(&smoothed, radius);
        let refractory = secs(self.config.refractory_ms / 1000.0);
        let merged = enforce_refractory(&candidates, &smoothed, samples, refractory);

        merged
            .into_iter()
            .filter(|&idx| baseline[idx] - smoothed[idx] >= self.config.noise_floor)
            .map(|index| Valley {
                index,
                timestamp: samples[index].timestamp,
            })
            .collect()
    }
}

fn odd_length(length_secs: f32, rate: f64) -> usize {
    let len = (length_secs.max(0.0) as f64 * rate).round() as usize;
    len.max(1) | 1
}

/// Indices strictly below every left neighbour and not above any right neighbour within
/// `radius`; a flat bottom reports its first sample once.
fn local_minima(values: &[f32], radius: usize) -> Vec<usize> {
    let n = values.len();
    if n < 2 * radius + 1 {
        return Vec::new();
    }
    (radius..n - radius)
        .filter(|&i| {
            let v = values[i];
            values[i - radius..i].iter().all(|&left| left > v)
                && values[i + 1..=i + radius].iter().all(|&right| right >= v)
        })
        .collect()
}

/// Collapses candidates closer than `refractory` into one, keeping the lower value.
fn enforce_refractory(
    candidates: &[usize],
    values: &[f32],
    samples: &[Sample],
    refractory: Duration,
) -> Vec<usize> {
    let mut kept: Vec<usize> = Vec::with_capacity(candidates.len());
    for &idx in candidates {
        if let Some(last) = kept.last_mut() {
            let gap = samples[idx].timestamp.saturating_sub(samples[*last].timestamp);
            if gap < refractory {
                if values[idx] < values[*last] {
                    *last = idx;
                }
                continue;
            }
        }
        kept.push(idx);
    }
    kept
}
