use crate::prelude::{PipelineConfig, QualityAssessment, Sample, Valley, VitalsSnapshot};
use crate::processing::{QualityScorer, ValleyDetector, VitalsEstimator};
use serde::Serialize;
use std::time::Duration;

/// Snapshot of everything an analysis pass needs; owns its copy of the window so the
/// pass can run away from the coordinator while frames keep arriving.
#[derive(Debug, Clone)]
pub struct AnalysisJob {
    pub generation: u64,
    pub at: Duration,
    pub samples: Vec<Sample>,
    /// Last fresh estimate, held when this window yields no plausible interval.
    pub previous: VitalsSnapshot,
}

/// Raw result of running the detector, estimator and scorer over one job.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub generation: u64,
    pub at: Duration,
    pub samples: Vec<Sample>,
    pub valleys: Vec<Valley>,
    /// Estimate for the window, or the job's `previous` snapshot when nothing survived.
    pub vitals: VitalsSnapshot,
    /// Set when `vitals` is the held previous snapshot; the coordinator fades it.
    pub carried_forward: bool,
    pub quality: QualityAssessment,
}

/// What a completed pass published.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub at: Duration,
    pub vitals: VitalsSnapshot,
    pub quality: QualityAssessment,
    pub valley_count: usize,
    pub carried_forward: bool,
}

/// The window-level stages bundled together. Holds configuration only.
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    detector: ValleyDetector,
    estimator: VitalsEstimator,
    scorer: QualityScorer,
}

impl Analyzer {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            detector: ValleyDetector::new(config.valley.clone()),
            estimator: VitalsEstimator::new(config.vitals.clone()),
            scorer: QualityScorer::new(config.quality.clone()),
        }
    }

    pub fn run(&self, job: AnalysisJob) -> AnalysisOutcome {
        let valleys = self.detector.detect(&job.samples);
        let vitals = self.estimator.estimate(&valleys, &job.previous);
        let carried_forward = !self.estimator.has_plausible_interval(&valleys);
        let quality = self.scorer.score(&job.samples);
        AnalysisOutcome {
            generation: job.generation,
            at: job.at,
            samples: job.samples,
            valleys,
            vitals,
            carried_forward,
            quality,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::{HeartRate, Hrv};

    fn job(samples: Vec<Sample>, previous: VitalsSnapshot) -> AnalysisJob {
        AnalysisJob {
            generation: 1,
            at: samples.last().map(|s| s.timestamp).unwrap_or_default(),
            samples,
            previous,
        }
    }

    fn held() -> VitalsSnapshot {
        VitalsSnapshot {
            heart_rate: HeartRate {
                bpm: 64.0,
                confidence: 0.8,
            },
            hrv: Hrv {
                sdnn: 30.0,
                confidence: 0.6,
            },
        }
    }

    #[test]
    fn flat_window_holds_previous_estimate() {
        let samples = (0..300)
            .map(|i| Sample::new(120.0, Duration::from_millis(i * 33)))
            .collect();
        let outcome = Analyzer::default().run(job(samples, held()));
        assert!(outcome.valleys.is_empty());
        assert!(outcome.carried_forward);
        assert_eq!(outcome.vitals, held());
    }

    #[test]
    fn pulsing_window_replaces_previous_estimate() {
        let samples = (0..300)
            .map(|i| {
                let t = i as f32 / 30.0;
                let value = 120.0 + 3.0 * (2.0 * std::f32::consts::PI * 1.25 * t).sin();
                Sample::new(value, Duration::from_secs_f32(t))
            })
            .collect();
        let outcome = Analyzer::default().run(job(samples, held()));
        assert!(!outcome.carried_forward);
        assert!(outcome.valleys.len() >= 10);
        assert!((outcome.vitals.heart_rate.bpm - 75.0).abs() < 2.0);
    }
}
