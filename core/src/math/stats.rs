pub struct StatsHelper;

impl StatsHelper {
    pub fn mean(samples: &[f32]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum: f64 = samples.iter().map(|&v| v as f64).sum();
        (sum / samples.len() as f64) as f32
    }

    /// Median of a finite set; `None` when empty.
    pub fn median(samples: &[f32]) -> Option<f32> {
        if samples.is_empty() {
            return None;
        }
        let mut sorted = samples.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 0 {
            Some((sorted[mid - 1] + sorted[mid]) / 2.0)
        } else {
            Some(sorted[mid])
        }
    }

    /// Population standard deviation.
    pub fn std_dev(samples: &[f32]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        let mean = Self::mean(samples) as f64;
        let var: f64 = samples
            .iter()
            .map(|&v| (v as f64 - mean).powi(2))
            .sum::<f64>()
            / samples.len() as f64;
        var.sqrt() as f32
    }

    /// Sample (n - 1) standard deviation; zero below two values.
    pub fn sample_std_dev(samples: &[f32]) -> f32 {
        if samples.len() < 2 {
            return 0.0;
        }
        let mean = Self::mean(samples) as f64;
        let var: f64 = samples
            .iter()
            .map(|&v| (v as f64 - mean).powi(2))
            .sum::<f64>()
            / (samples.len() - 1) as f64;
        var.sqrt() as f32
    }

    pub fn coefficient_of_variation(samples: &[f32]) -> f32 {
        let mean = Self::mean(samples);
        if mean.abs() <= f32::EPSILON {
            return 0.0;
        }
        Self::std_dev(samples) / mean.abs()
    }

    /// Centred moving average; the window shrinks at the edges instead of padding.
    pub fn moving_average(samples: &[f32], window: usize) -> Vec<f32> {
        let n = samples.len();
        if window <= 1 || n == 0 {
            return samples.to_vec();
        }
        let mut prefix = Vec::with_capacity(n + 1);
        prefix.push(0.0f64);
        for &v in samples {
            let last = prefix[prefix.len() - 1];
            prefix.push(last + v as f64);
        }

        let half = window / 2;
        (0..n)
            .map(|i| {
                let start = i.saturating_sub(half);
                let end = (i + half + 1).min(n);
                ((prefix[end] - prefix[start]) / (end - start) as f64) as f32
            })
            .collect()
    }
}
