use crate::prelude::{PipelineError, PipelineResult, Sample};
use std::collections::VecDeque;
use std::time::Duration;

/// Time-bounded, time-ordered sample buffer.
///
/// Samples older than `retention` relative to the newest sample are evicted on every
/// append, so memory stays bounded whatever the frame rate is.
#[derive(Debug, Clone)]
pub struct WaveformBuffer {
    samples: VecDeque<Sample>,
    retention: Duration,
}

impl WaveformBuffer {
    pub fn new(retention: Duration) -> Self {
        Self {
            samples: VecDeque::new(),
            retention,
        }
    }

    /// Appends a sample; equal timestamps are accepted, earlier ones are rejected untouched.
    pub fn append(&mut self, sample: Sample) -> PipelineResult<()> {
        if let Some(latest) = self.latest_timestamp() {
            if sample.timestamp < latest {
                return Err(PipelineError::OutOfOrderSample {
                    latest,
                    got: sample.timestamp,
                });
            }
        }
        self.samples.push_back(sample);

        if let Some(horizon) = sample.timestamp.checked_sub(self.retention) {
            while self
                .samples
                .front()
                .is_some_and(|oldest| oldest.timestamp < horizon)
            {
                self.samples.pop_front();
            }
        }
        Ok(())
    }

    /// Copies out the most recent `duration` worth of samples, oldest first.
    pub fn window(&self, duration: Duration) -> Vec<Sample> {
        let Some(latest) = self.latest_timestamp() else {
            return Vec::new();
        };
        match latest.checked_sub(duration) {
            Some(start) => {
                let first = self.samples.partition_point(|s| s.timestamp < start);
                self.samples.range(first..).copied().collect()
            }
            None => self.samples.iter().copied().collect(),
        }
    }

    pub fn latest_timestamp(&self) -> Option<Duration> {
        self.samples.back().map(|s| s.timestamp)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

/// Mean sampling rate of an ordered window in Hz; `None` when it spans no time.
pub fn sample_rate(samples: &[Sample]) -> Option<f64> {
    let (first, last) = (samples.first()?, samples.last()?);
    let span = last.timestamp.checked_sub(first.timestamp)?.as_secs_f64();
    if samples.len() < 2 || span <= 0.0 {
        return None;
    }
    Some((samples.len() - 1) as f64 / span)
}
