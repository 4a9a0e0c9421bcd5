use num_complex::Complex32;
use rustfft::{num_traits::Zero, Fft, FftPlanner};
use std::f32::consts::PI;

/// Helper that wraps the `rustfft` planner for one transform length.
pub struct FftHelper {
    fft: std::sync::Arc<dyn Fft<f32>>,
    size: usize,
}

impl FftHelper {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        Self { fft, size }
    }

    pub fn forward(&self, input: &[f32]) -> Vec<Complex32> {
        let mut buffer: Vec<Complex32> = input
            .iter()
            .take(self.size)
            .map(|&value| Complex32::new(value, 0.0))
            .collect();
        buffer.resize(self.size, Complex32::zero());
        self.fft.process(&mut buffer);
        buffer
    }

    /// One-sided power spectrum (bins `0..=size/2`) of a mean-removed, Hann-windowed input.
    pub fn power_spectrum(&self, input: &[f32]) -> Vec<f32> {
        let n = input.len().min(self.size);
        if n == 0 {
            return vec![0.0; self.size / 2 + 1];
        }
        let mean = input[..n].iter().sum::<f32>() / n as f32;
        let windowed: Vec<f32> = input[..n]
            .iter()
            .enumerate()
            .map(|(i, &v)| (v - mean) * hann(i, n))
            .collect();

        self.forward(&windowed)
            .iter()
            .take(self.size / 2 + 1)
            .map(|c| c.norm_sqr())
            .collect()
    }
}

fn hann(i: usize, n: usize) -> f32 {
    if n < 2 {
        return 1.0;
    }
    0.5 - 0.5 * (2.0 * PI * i as f32 / (n - 1) as f32).cos()
}
