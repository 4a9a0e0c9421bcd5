use rppgcore::interface::DisplayView;
use rppgcore::prelude::SessionPhase;
use serde::{Deserialize, Serialize};

/// Minimum signal quality before vitals are shown at all.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityGate {
    pub min_score: f32,
    pub min_confidence: f32,
}

impl Default for QualityGate {
    fn default() -> Self {
        Self {
            min_score: 0.5,
            min_confidence: 0.5,
        }
    }
}

impl QualityGate {
    pub fn admits(&self, score: f32, confidence: f32) -> bool {
        score >= self.min_score && confidence >= self.min_confidence
    }
}

/// What the console shows; vitals are `None` when gated out or never estimated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayModel {
    pub recording: bool,
    pub sampling: bool,
    pub heart_rate: Option<f32>,
    pub hrv: Option<f32>,
    pub quality_score: f32,
    pub quality_confidence: f32,
    pub waveform_points: usize,
    pub valley_count: usize,
}

impl DisplayModel {
    pub fn from_view(view: &DisplayView, gate: &QualityGate) -> Self {
        let reliable = gate.admits(view.quality.score, view.quality.confidence);
        let shown = |value: f32| (reliable && value > 0.0).then_some(value);
        Self {
            recording: view.phase == SessionPhase::Recording,
            sampling: view.sampling,
            heart_rate: shown(view.vitals.heart_rate.bpm),
            hrv: shown(view.vitals.hrv.sdnn),
            quality_score: view.quality.score,
            quality_confidence: view.quality.confidence,
            waveform_points: view.waveform.len(),
            valley_count: view.valleys.len(),
        }
    }

    pub fn summary_line(&self) -> String {
        let heart_rate = self
            .heart_rate
            .map_or_else(|| "--".to_string(), |bpm| format!("{:.1}", bpm));
        let hrv = self
            .hrv
            .map_or_else(|| "--".to_string(), |sdnn| format!("{:.1}", sdnn));
        format!(
            "{} | HR {} BPM | HRV {} ms | quality {:.2} ({:.2}) | {} points, {} valleys",
            if self.sampling {
                "sampling"
            } else if self.recording {
                "recording"
            } else {
                "idle"
            },
            heart_rate,
            hrv,
            self.quality_score,
            self.quality_confidence,
            self.waveform_points,
            self.valley_count
        )
    }
}
