use crate::generator::template::pulse_shape;
use ndarray::Array3;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rppgcore::interface::{Frame, FrameSource};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the synthetic skin-video generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub width: usize,
    pub height: usize,
    pub fps: f64,
    pub duration_secs: f64,
    pub bpm: f32,
    /// Uniform beat-to-beat jitter applied to every interval.
    pub jitter_ms: f32,
    /// Peak pulse swing on the green channel, in pixel levels.
    pub amplitude: f32,
    /// Uniform per-pixel noise, in pixel levels.
    pub noise: f32,
    /// Skin tone as RGB.
    pub base_color: [f32; 3],
    pub seed: u64,
    pub description: Option<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            width: 16,
            height: 16,
            fps: 30.0,
            duration_secs: 30.0,
            bpm: 72.0,
            jitter_ms: 20.0,
            amplitude: 6.0,
            noise: 1.5,
            base_color: [170.0, 120.0, 100.0],
            seed: 0,
            description: None,
        }
    }
}

impl GeneratorConfig {
    fn normalized_fps(&self) -> f64 {
        self.fps.max(1.0)
    }

    pub fn total_frames(&self) -> usize {
        (self.duration_secs.max(0.0) * self.normalized_fps()).round() as usize
    }
}

/// Pulse weight per channel; blood absorbs green most strongly.
const CHANNEL_WEIGHTS: [f32; 3] = [0.35, 1.0, 0.2];

/// Deterministic frame stream for one simulated subject.
pub struct SyntheticFrameSource {
    config: GeneratorConfig,
    onsets: Vec<f64>,
    rng: StdRng,
    next_index: usize,
    total: usize,
}

impl SyntheticFrameSource {
    pub fn new(config: &GeneratorConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let onsets = beat_onsets(config, &mut rng);
        Self {
            config: config.clone(),
            onsets,
            rng,
            next_index: 0,
            total: config.total_frames(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.next_index)
    }

    #[cfg(test)]
    pub fn onsets(&self) -> &[f64] {
        &self.onsets
    }

    /// Pulse level in `[0, 1]` at time `t`.
    fn pulse_at(&self, t: f64) -> f32 {
        let idx = self.onsets.partition_point(|&onset| onset <= t);
        if idx == 0 || idx >= self.onsets.len() {
            return 0.0;
        }
        let start = self.onsets[idx - 1];
        let end = self.onsets[idx];
        pulse_shape(((t - start) / (end - start)) as f32)
    }
}

fn beat_onsets(config: &GeneratorConfig, rng: &mut StdRng) -> Vec<f64> {
    let period = 60.0 / config.bpm.max(1.0) as f64;
    let jitter = (config.jitter_ms.max(0.0) / 1000.0) as f64;
    let horizon = config.duration_secs.max(0.0) + 2.0 * period;

    let mut onsets = vec![0.0];
    let mut at = 0.0;
    while at < horizon {
        let offset = if jitter > 0.0 {
            rng.gen_range(-jitter..jitter)
        } else {
            0.0
        };
        at += (period + offset).max(period * 0.5);
        onsets.push(at);
    }
    onsets
}

impl FrameSource for SyntheticFrameSource {
    fn next_frame(&mut self) -> Option<Frame> {
        if self.next_index >= self.total {
            return None;
        }
        let t = self.next_index as f64 / self.config.normalized_fps();
        self.next_index += 1;

        let pulse = self.pulse_at(t);
        let noise = self.config.noise.max(0.0);
        let (height, width) = (self.config.height.max(1), self.config.width.max(1));
        let mut pixels = Array3::<u8>::zeros((height, width, 3));
        for ((_, _, channel), value) in pixels.indexed_iter_mut() {
            let level = self.config.base_color[channel]
                + self.config.amplitude * CHANNEL_WEIGHTS[channel] * pulse;
            let jitter = if noise > 0.0 {
                self.rng.gen_range(-noise..noise)
            } else {
                0.0
            };
            *value = (level + jitter).round().clamp(0.0, 255.0) as u8;
        }
        Some(Frame::new(pixels, Duration::from_secs_f64(t)))
    }
}
