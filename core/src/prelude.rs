use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// One scalar PPG sample reduced from a single video frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub value: f32,
    /// Monotonic capture time relative to the session clock.
    pub timestamp: Duration,
}

impl Sample {
    pub fn new(value: f32, timestamp: Duration) -> Self {
        Self { value, timestamp }
    }
}

/// A detected pulse onset inside an analysed window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Valley {
    /// Index into the window the detector was given.
    pub index: usize,
    pub timestamp: Duration,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HeartRate {
    pub bpm: f32,
    pub confidence: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Hrv {
    /// SDNN in milliseconds.
    pub sdnn: f32,
    pub confidence: f32,
}

/// Externally visible vitals state. The default value is the "no data yet" snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VitalsSnapshot {
    pub heart_rate: HeartRate,
    pub hrv: Hrv,
}

impl VitalsSnapshot {
    /// Same readings with both confidences multiplied by `factor` (clamped to 0..1).
    pub fn with_confidence_scaled(&self, factor: f32) -> Self {
        let factor = factor.clamp(0.0, 1.0);
        Self {
            heart_rate: HeartRate {
                confidence: self.heart_rate.confidence * factor,
                ..self.heart_rate
            },
            hrv: Hrv {
                confidence: self.hrv.confidence * factor,
                ..self.hrv
            },
        }
    }
}

/// Signal-quality verdict derived from waveform shape alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityAssessment {
    pub score: f32,
    pub confidence: f32,
}

impl QualityAssessment {
    /// Window too short or too quiet to judge.
    pub fn insufficient() -> Self {
        Self::default()
    }
}

/// Recording state of a session; sampling is tracked separately and only valid while recording.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Idle,
    Recording,
}

/// Channel-combination strategy used to reduce a frame to one scalar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombinationStrategy {
    /// Mean of the green channel.
    #[default]
    #[serde(rename = "default", alias = "green")]
    Default,
    #[serde(rename = "red", alias = "red_only")]
    RedOnly,
    #[serde(rename = "blue", alias = "blue_only")]
    BlueOnly,
    /// `255 * (2G - R - B) / (R + G + B)` over the channel means, so the pulse swing is in
    /// pixel levels like the single-channel strategies.
    #[serde(rename = "chrom", alias = "chrominance_combination")]
    ChrominanceCombination,
}

impl CombinationStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CombinationStrategy::Default => "default",
            CombinationStrategy::RedOnly => "red",
            CombinationStrategy::BlueOnly => "blue",
            CombinationStrategy::ChrominanceCombination => "chrom",
        }
    }
}

impl fmt::Display for CombinationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CombinationStrategy {
    type Err = PipelineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "default" | "green" => Ok(CombinationStrategy::Default),
            "red" | "red_only" => Ok(CombinationStrategy::RedOnly),
            "blue" | "blue_only" => Ok(CombinationStrategy::BlueOnly),
            "chrom" | "chrominance" | "chrominance_combination" => {
                Ok(CombinationStrategy::ChrominanceCombination)
            }
            other => Err(PipelineError::UnknownStrategy(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveformConfig {
    /// Rolling retention of the buffer, in seconds.
    pub retention_secs: f32,
}

impl Default for WaveformConfig {
    fn default() -> Self {
        Self {
            retention_secs: 20.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValleyConfig {
    /// Moving-average length used to suppress single-frame noise.
    pub smoothing_secs: f32,
    /// Half-width of the neighbourhood a minimum must dominate.
    pub comparison_radius_secs: f32,
    /// Length of the moving average used as the local baseline for depth.
    pub baseline_secs: f32,
    /// Candidates closer than this collapse into one valley.
    pub refractory_ms: f32,
    /// Minimum depth below the local baseline, in sample units.
    pub noise_floor: f32,
}

impl Default for ValleyConfig {
    fn default() -> Self {
        Self {
            smoothing_secs: 0.1,
            comparison_radius_secs: 0.1,
            baseline_secs: 1.0,
            refractory_ms: 300.0,
            noise_floor: 0.05,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VitalsConfig {
    pub min_ibi_ms: f32,
    pub max_ibi_ms: f32,
    /// Retained intervals at which heart-rate confidence saturates.
    pub target_intervals: usize,
    /// Retained intervals at which HRV confidence saturates.
    pub target_hrv_intervals: usize,
}

impl Default for VitalsConfig {
    fn default() -> Self {
        Self {
            min_ibi_ms: 300.0,
            max_ibi_ms: 2000.0,
            target_intervals: 5,
            target_hrv_intervals: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Lower edge of the heart-rate band (Hz).
    pub min_hz: f32,
    /// Upper edge of the heart-rate band (Hz).
    pub max_hz: f32,
    pub min_window_secs: f32,
    /// Bins on each side of the spectral peak counted as peak energy.
    pub peak_halfwidth_bins: usize,
    /// Share of the score governed by cycle amplitude stability.
    pub stability_weight: f32,
    pub chunk_secs: f32,
    /// Chunk standard deviation below which a chunk counts as dark or clipped.
    pub energy_floor: f32,
    /// Chunk standard deviation above which a chunk counts as a motion burst.
    pub energy_ceiling: f32,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            min_hz: 0.5,
            max_hz: 3.33,
            min_window_secs: 3.0,
            peak_halfwidth_bins: 1,
            stability_weight: 0.3,
            chunk_secs: 1.0,
            energy_floor: 0.01,
            energy_ceiling: 25.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub analysis_window_secs: f32,
    pub analysis_interval_secs: f32,
    pub sampling_interval_secs: f32,
    pub carry_forward_timeout_secs: f32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            analysis_window_secs: 10.0,
            analysis_interval_secs: 1.0,
            sampling_interval_secs: 10.0,
            carry_forward_timeout_secs: 5.0,
        }
    }
}

/// Shared configuration for every pipeline stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub strategy: CombinationStrategy,
    pub waveform: WaveformConfig,
    pub valley: ValleyConfig,
    pub vitals: VitalsConfig,
    pub quality: QualityConfig,
    pub schedule: ScheduleConfig,
}

/// Converts a configured length in seconds into a non-negative duration.
pub fn secs(value: f32) -> Duration {
    Duration::try_from_secs_f32(value.max(0.0)).unwrap_or(Duration::MAX)
}

/// Common error type for pipeline execution.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
    #[error("out-of-order sample at {got:?} (latest {latest:?})")]
    OutOfOrderSample { latest: Duration, got: Duration },
    #[error("session is not recording")]
    SessionNotRecording,
    #[error("subject identity is empty")]
    EmptySubject,
    #[error("waveform buffer is empty")]
    EmptyWaveform,
    #[error("persistence sink closed")]
    SinkClosed,
    #[error("unknown combination strategy: {0}")]
    UnknownStrategy(String),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_parses_original_names() {
        assert_eq!(
            "default".parse::<CombinationStrategy>().unwrap(),
            CombinationStrategy::Default
        );
        assert_eq!(
            " Chrom ".parse::<CombinationStrategy>().unwrap(),
            CombinationStrategy::ChrominanceCombination
        );
        assert!(matches!(
            "infrared".parse::<CombinationStrategy>(),
            Err(PipelineError::UnknownStrategy(_))
        ));
    }

    #[test]
    fn scaled_snapshot_keeps_readings() {
        let snapshot = VitalsSnapshot {
            heart_rate: HeartRate {
                bpm: 70.0,
                confidence: 0.8,
            },
            hrv: Hrv {
                sdnn: 40.0,
                confidence: 0.4,
            },
        };
        let scaled = snapshot.with_confidence_scaled(0.5);
        assert_eq!(scaled.heart_rate.bpm, 70.0);
        assert_eq!(scaled.hrv.sdnn, 40.0);
        assert!((scaled.heart_rate.confidence - 0.4).abs() < 1e-6);
        assert!((scaled.hrv.confidence - 0.2).abs() < 1e-6);
    }

    #[test]
    fn config_fills_missing_sections_with_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"strategy":"red_only","valley":{"noise_floor":0.2}}"#)
                .unwrap();
        assert_eq!(config.strategy, CombinationStrategy::RedOnly);
        assert_eq!(config.valley.noise_floor, 0.2);
        assert_eq!(config.valley.refractory_ms, 300.0);
        assert_eq!(config.schedule.sampling_interval_secs, 10.0);
    }
}
