use crate::math::stats::StatsHelper;
use crate::prelude::{HeartRate, Hrv, Valley, VitalsConfig, VitalsSnapshot};

/// Converts valley timing into heart rate and SDNN with heuristic confidences.
#[derive(Debug, Clone, Default)]
pub struct VitalsEstimator {
    config: VitalsConfig,
}

impl VitalsEstimator {
    pub fn new(config: VitalsConfig) -> Self {
        Self { config }
    }

    /// Inter-beat intervals in milliseconds between consecutive valleys.
    pub fn intervals_ms(valleys: &[Valley]) -> Vec<f32> {
        valleys
            .windows(2)
            .map(|pair| {
                let gap = pair[1].timestamp.saturating_sub(pair[0].timestamp);
                (gap.as_secs_f64() * 1000.0) as f32
            })
            .collect()
    }

    /// Estimate from `valleys`, or `previous` unchanged when no interval survives the
    /// physiological bound.
    pub fn estimate(&self, valleys: &[Valley], previous: &VitalsSnapshot) -> VitalsSnapshot {
        self.fresh_estimate(valleys).unwrap_or(*previous)
    }

    /// Whether at least one interval falls inside the physiological bound, i.e. whether
    /// `estimate` produces a fresh snapshot rather than carrying `previous` forward.
    pub fn has_plausible_interval(&self, valleys: &[Valley]) -> bool {
        !self.retained_intervals(valleys).1.is_empty()
    }

    /// `None` when the valleys yield no physiologically plausible interval.
    pub fn fresh_estimate(&self, valleys: &[Valley]) -> Option<VitalsSnapshot> {
        let (raw, retained) = self.retained_intervals(valleys);
        if raw == 0 {
            return None;
        }

        let instantaneous: Vec<f32> = retained.iter().map(|ibi| 60_000.0 / ibi).collect();
        let bpm = StatsHelper::median(&instantaneous)?;
        let retained_fraction = retained.len() as f32 / raw as f32;

        let heart_rate = HeartRate {
            bpm,
            confidence: confidence(retained_fraction, retained.len(), self.config.target_intervals),
        };
        let hrv = if retained.len() >= 2 {
            Hrv {
                sdnn: StatsHelper::sample_std_dev(&retained),
                confidence: confidence(
                    retained_fraction,
                    retained.len(),
                    self.config.target_hrv_intervals,
                ),
            }
        } else {
            Hrv::default()
        };

        Some(VitalsSnapshot { heart_rate, hrv })
    }

    /// Raw interval count and the intervals inside `[min_ibi_ms, max_ibi_ms]`.
    fn retained_intervals(&self, valleys: &[Valley]) -> (usize, Vec<f32>) {
        let raw = Self::intervals_ms(valleys);
        let retained = raw
            .iter()
            .copied()
            .filter(|ibi| (self.config.min_ibi_ms..=self.config.max_ibi_ms).contains(ibi))
            .collect();
        (raw.len(), retained)
    }
}

/// Rises monotonically with the retained fraction and the retained count, saturating at 1.
fn confidence(retained_fraction: f32, retained: usize, target: usize) -> f32 {
    let coverage = (retained as f32 / target.max(1) as f32).min(1.0);
    (retained_fraction * coverage).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn valleys_from_intervals(intervals_ms: &[u64]) -> Vec<Valley> {
        let mut at = 1_000u64;
        let mut valleys = vec![Valley {
            index: 0,
            timestamp: Duration::from_millis(at),
        }];
        for (i, ibi) in intervals_ms.iter().enumerate() {
            at += ibi;
            valleys.push(Valley {
                index: i + 1,
                timestamp: Duration::from_millis(at),
            });
        }
        valleys
    }

    #[test]
    fn median_bpm_and_sample_sdnn() {
        let estimator = VitalsEstimator::default();
        let valleys = valleys_from_intervals(&[800, 810, 790, 805]);
        let snapshot = estimator.fresh_estimate(&valleys).unwrap();

        let expected = StatsHelper::median(&[
            60_000.0 / 800.0,
            60_000.0 / 810.0,
            60_000.0 / 790.0,
            60_000.0 / 805.0,
        ])
        .unwrap();
        assert!((snapshot.heart_rate.bpm - expected).abs() < 1e-3);
        assert!((snapshot.heart_rate.bpm - 74.8).abs() < 0.2);
        assert!((snapshot.hrv.sdnn - 8.54).abs() < 0.05);
        assert!(snapshot.heart_rate.confidence > 0.0);
        assert!(snapshot.hrv.confidence > 0.0);
    }

    #[test]
    fn implausible_intervals_are_excluded_not_clamped() {
        let estimator = VitalsEstimator::default();
        let clean = estimator
            .fresh_estimate(&valleys_from_intervals(&[800, 800, 800, 800, 800]))
            .unwrap();
        let noisy = estimator
            .fresh_estimate(&valleys_from_intervals(&[800, 150, 800, 800, 2600, 800, 800]))
            .unwrap();
        assert!((noisy.heart_rate.bpm - 75.0).abs() < 1e-3);
        assert_eq!(noisy.hrv.sdnn, 0.0);
        assert!(noisy.heart_rate.confidence < clean.heart_rate.confidence);
    }

    #[test]
    fn confidence_saturates_with_more_beats() {
        let estimator = VitalsEstimator::default();
        let few = estimator
            .fresh_estimate(&valleys_from_intervals(&[800, 820]))
            .unwrap();
        let many = estimator
            .fresh_estimate(&valleys_from_intervals(&[800; 12]))
            .unwrap();
        assert!(few.heart_rate.confidence < many.heart_rate.confidence);
        assert_eq!(many.heart_rate.confidence, 1.0);
        assert_eq!(many.hrv.confidence, 1.0);
    }

    #[test]
    fn single_interval_reports_zero_hrv() {
        let snapshot = VitalsEstimator::default()
            .fresh_estimate(&valleys_from_intervals(&[1000]))
            .unwrap();
        assert!((snapshot.heart_rate.bpm - 60.0).abs() < 1e-3);
        assert_eq!(snapshot.hrv, Hrv::default());
    }

    #[test]
    fn no_valid_intervals_carries_previous_forward() {
        let estimator = VitalsEstimator::default();
        let previous = estimator
            .fresh_estimate(&valleys_from_intervals(&[800, 810, 790, 805]))
            .unwrap();
        let mixed = valleys_from_intervals(&[100, 800, 3000]);
        assert!(estimator.has_plausible_interval(&mixed));
        assert_ne!(estimator.estimate(&mixed, &previous), previous);

        for valleys in [
            Vec::new(),
            valleys_from_intervals(&[]),
            valleys_from_intervals(&[100, 3000]),
        ] {
            assert!(!estimator.has_plausible_interval(&valleys));
            let carried = estimator.estimate(&valleys, &previous);
            assert_eq!(carried, previous);
            assert!(carried.heart_rate.confidence <= previous.heart_rate.confidence);
        }
    }
}
