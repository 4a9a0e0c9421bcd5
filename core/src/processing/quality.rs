use crate::math::fft::FftHelper;
use crate::math::stats::StatsHelper;
use crate::prelude::{QualityAssessment, QualityConfig, Sample};
use crate::processing::waveform::sample_rate;

const MIN_SAMPLES: usize = 16;

/// Scores the waveform's periodicity and amplitude stability, independently of valley
/// detection.
#[derive(Debug, Clone, Default)]
pub struct QualityScorer {
    config: QualityConfig,
}

/// Spectral periodicity of one window.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Periodicity {
    /// Peak energy share of the heart-rate band, rescaled so chance level maps to 0.
    strength: f32,
    dominant_hz: f32,
}

impl QualityScorer {
    pub fn new(config: QualityConfig) -> Self {
        Self { config }
    }

    pub fn score(&self, samples: &[Sample]) -> QualityAssessment {
        let Some(rate) = sample_rate(samples) else {
            return QualityAssessment::insufficient();
        };
        let span = samples.len() as f64 / rate;
        if samples.len() < MIN_SAMPLES || span < self.config.min_window_secs as f64 {
            return QualityAssessment::insufficient();
        }

        let values: Vec<f32> = samples.iter().map(|s| s.value).collect();
        let confidence = self.energy_coverage(&values, rate);
        let Some(periodicity) = self.periodicity(&values, rate) else {
            return QualityAssessment {
                score: 0.0,
                confidence,
            };
        };

        let stability = amplitude_stability(&values, rate, periodicity.dominant_hz);
        let weight = self.config.stability_weight.clamp(0.0, 1.0);
        let score = periodicity.strength * (1.0 - weight + weight * stability);
        QualityAssessment {
            score: score.clamp(0.0, 1.0),
            confidence,
        }
    }

    fn periodicity(&self, values: &[f32], rate: f64) -> Option<Periodicity> {
        let n = values.len();
        let resolution = rate / n as f64;
        let half = n / 2;
        let min_bin = ((self.config.min_hz as f64 / resolution).ceil() as usize).max(1);
        let max_bin = ((self.config.max_hz as f64 / resolution).floor() as usize).min(half);
        let halfwidth = self.config.peak_halfwidth_bins;
        let band_bins = max_bin.checked_sub(min_bin)? + 1;
        if band_bins <= 2 * halfwidth + 1 {
            return None;
        }

        let spectrum = FftHelper::new(n).power_spectrum(values);
        let band = &spectrum[min_bin..=max_bin];
        let total: f32 = band.iter().sum();
        if total <= f32::EPSILON {
            return None;
        }

        let (peak, _) = band
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))?;
        let lo = peak.saturating_sub(halfwidth);
        let hi = (peak + halfwidth).min(band.len() - 1);
        let peak_energy: f32 = band[lo..=hi].iter().sum();

        let ratio = peak_energy / total;
        let chance = (2 * halfwidth + 1) as f32 / band_bins as f32;
        Some(Periodicity {
            strength: ((ratio - chance) / (1.0 - chance)).clamp(0.0, 1.0),
            dominant_hz: ((min_bin + peak) as f64 * resolution) as f32,
        })
    }

    /// Share of chunks whose spread sits between the dark/clipped floor and the motion ceiling.
    fn energy_coverage(&self, values: &[f32], rate: f64) -> f32 {
        let chunk = ((self.config.chunk_secs as f64 * rate).round() as usize).max(2);
        let chunks: Vec<&[f32]> = values.chunks_exact(chunk).collect();
        if chunks.is_empty() {
            return 0.0;
        }
        let energetic = chunks
            .iter()
            .filter(|c| {
                let spread = StatsHelper::std_dev(c);
                spread >= self.config.energy_floor && spread <= self.config.energy_ceiling
            })
            .count();
        energetic as f32 / chunks.len() as f32
    }
}

/// `1 / (1 + cv)` of per-cycle peak-to-valley amplitude; 1 when fewer than two cycles fit.
fn amplitude_stability(values: &[f32], rate: f64, dominant_hz: f32) -> f32 {
    if dominant_hz <= 0.0 {
        return 1.0;
    }
    let cycle = ((rate / dominant_hz as f64).round() as usize).max(2);
    let amplitudes: Vec<f32> = values
        .chunks_exact(cycle)
        .map(|c| {
            let (lo, hi) = c
                .iter()
                .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                    (lo.min(v), hi.max(v))
                });
            hi - lo
        })
        .collect();
    if amplitudes.len() < 2 {
        return 1.0;
    }
    1.0 / (1.0 + StatsHelper::coefficient_of_variation(&amplitudes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use std::f32::consts::PI;
    use std::time::Duration;

    const FS: f64 = 30.0;

    fn samples_from(values: impl IntoIterator<Item = f32>) -> Vec<Sample> {
        values
            .into_iter()
            .enumerate()
            .map(|(i, v)| Sample::new(v, Duration::from_secs_f64(i as f64 / FS)))
            .collect()
    }

    fn pulse(hz: f32, amplitude: impl Fn(usize) -> f32) -> Vec<Sample> {
        samples_from((0..300).map(|i| {
            let t = i as f32 / FS as f32;
            120.0 + amplitude(i) * (2.0 * PI * hz * t).sin()
        }))
    }

    #[test]
    fn clean_periodic_waveform_scores_high() {
        let quality = QualityScorer::default().score(&pulse(1.2, |_| 1.0));
        assert!(quality.score > 0.8, "score {}", quality.score);
        assert!(quality.confidence > 0.9, "confidence {}", quality.confidence);
    }

    #[test]
    fn off_bin_tone_still_scores_high() {
        let quality = QualityScorer::default().score(&pulse(1.25, |_| 1.0));
        assert!(quality.score > 0.8, "score {}", quality.score);
    }

    #[test]
    fn flat_waveform_has_no_periodicity() {
        let quality = QualityScorer::default().score(&samples_from(vec![87.0; 300]));
        assert!(quality.score.abs() < 1e-6);
        assert_eq!(quality.confidence, 0.0);
    }

    #[test]
    fn white_noise_scores_low() {
        let mut rng = StdRng::seed_from_u64(11);
        let noise = samples_from((0..300).map(|_| 120.0 + rng.gen_range(-1.0..1.0)));
        let quality = QualityScorer::default().score(&noise);
        assert!(quality.score < 0.5, "score {}", quality.score);
    }

    #[test]
    fn erratic_amplitude_is_penalised() {
        let steady = QualityScorer::default().score(&pulse(1.2, |_| 1.0));
        let erratic = QualityScorer::default().score(&pulse(1.2, |i| if (i / 25) % 2 == 0 { 0.2 } else { 3.0 }));
        assert!(erratic.score < steady.score);
    }

    #[test]
    fn quiet_stretches_reduce_confidence() {
        let quality = QualityScorer::default().score(&pulse(1.2, |i| if i < 150 { 0.0 } else { 1.0 }));
        assert!(quality.confidence > 0.4 && quality.confidence < 0.6);
    }

    #[test]
    fn short_window_is_insufficient() {
        let quality = QualityScorer::default().score(&pulse(1.2, |_| 1.0)[..45]);
        assert_eq!(quality, QualityAssessment::insufficient());
    }
}
