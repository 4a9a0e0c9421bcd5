use crate::interface::{DisplaySink, DisplayView, Frame, FrameSource, PersistenceSink, VitalsRecord};
use crate::pipeline::analysis::{AnalysisJob, AnalysisOutcome, AnalysisReport, Analyzer};
use crate::pipeline::session::SessionState;
use crate::prelude::{
    secs, CombinationStrategy, PipelineConfig, PipelineError, PipelineResult, Sample, Valley,
    VitalsSnapshot,
};
use crate::processing::FrameReducer;
use crate::telemetry::{LogManager, MetricsRecorder, MetricsSnapshot};
use std::time::Duration;

/// Result of one scheduling tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOutcome {
    pub sample: Option<Sample>,
    pub report: Option<AnalysisReport>,
    pub submitted: bool,
}

/// Drives the per-frame cycle and the slower analysis/sampling cadence for one session.
///
/// Frame ingestion (reduce + append) is O(1) amortised; window analysis only runs when
/// the analysis or sampling interval has elapsed on the frame clock.
pub struct PipelineCoordinator {
    config: PipelineConfig,
    session: SessionState,
    reducer: FrameReducer,
    analyzer: Analyzer,
    logger: LogManager,
    metrics: MetricsRecorder,
}

impl PipelineCoordinator {
    pub fn new(config: PipelineConfig, session: SessionState) -> Self {
        let analyzer = Analyzer::new(&config);
        Self {
            config,
            session,
            reducer: FrameReducer::new(),
            analyzer,
            logger: LogManager::new("rppgcore::coordinator"),
            metrics: MetricsRecorder::new(),
        }
    }

    /// Coordinator with a fresh idle session built from `config`.
    pub fn with_config(config: PipelineConfig) -> Self {
        let session = SessionState::new(config.strategy, secs(config.waveform.retention_secs));
        Self::new(config, session)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    fn analysis_window(&self) -> Duration {
        secs(self.config.schedule.analysis_window_secs)
    }

    pub fn start_recording(&mut self, subject: &str, started_at_unix: f64) -> PipelineResult<()> {
        self.session.begin(subject, started_at_unix)?;
        self.logger.record(&format!(
            "recording started for {} ({} strategy)",
            subject.trim(),
            self.session.strategy
        ));
        Ok(())
    }

    pub fn stop_recording(&mut self) {
        if self.session.is_recording() {
            self.logger.record(&format!(
                "recording stopped after {} samples",
                self.session.waveform.len()
            ));
        }
        self.session.end();
    }

    /// Sampling needs an active recording with at least one sample; the first record is
    /// submitted one full interval after enabling.
    pub fn set_sampling(&mut self, enabled: bool) -> PipelineResult<()> {
        if !enabled {
            self.session.sampling = false;
            return Ok(());
        }
        if !self.session.is_recording() {
            return Err(PipelineError::SessionNotRecording);
        }
        let Some(latest) = self.session.waveform.latest_timestamp() else {
            return Err(PipelineError::EmptyWaveform);
        };
        self.session.sampling = true;
        self.session.last_submission_at = Some(latest);
        Ok(())
    }

    /// Switching strategy clears the window; samples from different strategies do not mix.
    pub fn set_strategy(&mut self, strategy: CombinationStrategy) {
        if self.session.strategy == strategy {
            return;
        }
        self.session.strategy = strategy;
        self.session.waveform.clear();
        self.session.valleys.clear();
        self.logger
            .record(&format!("combination strategy set to {}", strategy));
    }

    /// Reduce one frame and append it. Only valid while recording.
    pub fn ingest_frame(&mut self, frame: &Frame) -> PipelineResult<Sample> {
        if !self.session.is_recording() {
            return Err(PipelineError::SessionNotRecording);
        }
        let value = match self.reducer.reduce(frame, self.session.strategy) {
            Ok(value) => value,
            Err(err) => {
                self.metrics.record_skipped();
                return Err(err);
            }
        };
        let sample = Sample::new(value, frame.captured_at());
        if let Err(err) = self.session.waveform.append(sample) {
            self.metrics.record_rejected();
            return Err(err);
        }
        self.metrics.record_ingested();
        Ok(sample)
    }

    /// Pull at most one frame, ingest it, then run whatever analysis or submission is due.
    /// Frame-level failures are logged and skipped. A tick that yields no frame does
    /// nothing; see `poll` for keeping the held estimate fading while frames are stalled.
    pub fn tick(
        &mut self,
        source: &mut dyn FrameSource,
        sink: &dyn PersistenceSink,
    ) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        if !self.session.is_recording() {
            return outcome;
        }
        let Some(frame) = source.next_frame() else {
            return outcome;
        };
        match self.ingest_frame(&frame) {
            Ok(sample) => outcome.sample = Some(sample),
            Err(err) => {
                self.logger.detail(&format!("skipping frame: {}", err));
                return outcome;
            }
        }

        let now = frame.captured_at();
        if self.submission_due(now) {
            outcome.report = self.analyze(now);
            outcome.submitted = self.submit(sink, now).is_ok();
        } else if self.analysis_due(now) {
            outcome.report = self.analyze(now);
        }
        outcome
    }

    /// Frameless pass on the caller's session clock. Once no frame has arrived for a full
    /// analysis interval, republishes the held estimate faded for `now`, on the analysis
    /// cadence. Returns `None` while frames are flowing or the session is idle.
    pub fn poll(&mut self, now: Duration) -> Option<AnalysisReport> {
        if !self.session.is_recording() {
            return None;
        }
        let latest = self.session.waveform.latest_timestamp()?;
        let interval = secs(self.config.schedule.analysis_interval_secs);
        if now.saturating_sub(latest) < interval || !self.analysis_due(now) {
            return None;
        }
        self.metrics.record_analysis();

        let previous = self.session.last_fresh.map(|(snapshot, _)| snapshot).unwrap_or_default();
        let vitals = self.faded(previous, now);
        self.session.vitals = vitals;
        self.session.last_analysis_at = Some(now);
        self.logger.detail(&format!(
            "no frames since {:.2}s, holding {:.1} bpm at confidence {:.2}",
            latest.as_secs_f32(),
            vitals.heart_rate.bpm,
            vitals.heart_rate.confidence
        ));
        Some(AnalysisReport {
            at: now,
            vitals,
            quality: self.session.quality,
            valley_count: self.session.valleys.len(),
            carried_forward: true,
        })
    }

    fn analysis_due(&self, now: Duration) -> bool {
        match self.session.last_analysis_at {
            Some(last) => {
                now.saturating_sub(last) >= secs(self.config.schedule.analysis_interval_secs)
            }
            None => true,
        }
    }

    fn submission_due(&self, now: Duration) -> bool {
        if !self.session.sampling {
            return false;
        }
        match self.session.last_submission_at {
            Some(last) => {
                now.saturating_sub(last) >= secs(self.config.schedule.sampling_interval_secs)
            }
            None => true,
        }
    }

    /// Copy the current analysis window out of the session.
    pub fn begin_analysis(&self, at: Duration) -> AnalysisJob {
        AnalysisJob {
            generation: self.session.generation,
            at,
            samples: self.session.waveform.window(self.analysis_window()),
            previous: self
                .session
                .last_fresh
                .map(|(snapshot, _)| snapshot)
                .unwrap_or_default(),
        }
    }

    /// Publish an outcome, or drop it when the session was stopped or restarted since the
    /// job was taken.
    pub fn complete_analysis(&mut self, outcome: AnalysisOutcome) -> Option<AnalysisReport> {
        if outcome.generation != self.session.generation || !self.session.is_recording() {
            self.metrics.record_stale();
            self.logger.detail(&format!(
                "discarding analysis from generation {} (current {})",
                outcome.generation, self.session.generation
            ));
            return None;
        }
        self.metrics.record_analysis();

        let carried_forward = outcome.carried_forward;
        let vitals = if carried_forward {
            self.faded(outcome.vitals, outcome.at)
        } else {
            self.session.last_fresh = Some((outcome.vitals, outcome.at));
            outcome.vitals
        };

        let report = AnalysisReport {
            at: outcome.at,
            vitals,
            quality: outcome.quality,
            valley_count: outcome.valleys.len(),
            carried_forward,
        };
        self.session.vitals = vitals;
        self.session.quality = outcome.quality;
        self.session.valleys = outcome.valleys;
        self.session.last_analysis_at = Some(outcome.at);

        self.logger.detail(&format!(
            "analysis at {:.2}s: {:.1} bpm ({:.2}), sdnn {:.1} ms ({:.2}), quality {:.2}/{:.2}{}",
            report.at.as_secs_f32(),
            vitals.heart_rate.bpm,
            vitals.heart_rate.confidence,
            vitals.hrv.sdnn,
            vitals.hrv.confidence,
            report.quality.score,
            report.quality.confidence,
            if carried_forward { " [carried]" } else { "" }
        ));
        Some(report)
    }

    /// Synchronous analysis pass over the current window.
    pub fn analyze(&mut self, at: Duration) -> Option<AnalysisReport> {
        let job = self.begin_analysis(at);
        let outcome = self.analyzer.run(job);
        self.complete_analysis(outcome)
    }

    /// A held estimate keeps its confidence for the timeout after the last fresh one, then
    /// fades linearly to zero over one more timeout.
    fn faded(&self, held: VitalsSnapshot, at: Duration) -> VitalsSnapshot {
        let Some((_, fresh_at)) = self.session.last_fresh else {
            return held;
        };
        let timeout = secs(self.config.schedule.carry_forward_timeout_secs).as_secs_f32();
        let stale = at.saturating_sub(fresh_at).as_secs_f32();
        if stale <= timeout {
            return held;
        }
        let factor = if timeout > 0.0 {
            1.0 - (stale - timeout) / timeout
        } else {
            0.0
        };
        held.with_confidence_scaled(factor)
    }

    /// Submit the current snapshot immediately, independent of the sampling cadence.
    pub fn save_now(&mut self, sink: &dyn PersistenceSink) -> PipelineResult<()> {
        let Some(latest) = self.session.waveform.latest_timestamp() else {
            return Err(PipelineError::EmptyWaveform);
        };
        self.submit(sink, latest)
    }

    fn submit(&mut self, sink: &dyn PersistenceSink, now: Duration) -> PipelineResult<()> {
        self.session.last_submission_at = Some(now);
        let subject = self.session.subject.as_deref().unwrap_or_default();
        let ppg_data = self
            .session
            .waveform
            .window(self.analysis_window())
            .iter()
            .map(|s| s.value)
            .collect();
        let timestamp = self.session.started_at_unix + now.as_secs_f64();

        let result = VitalsRecord::new(subject, &self.session.vitals, ppg_data, timestamp)
            .and_then(|record| sink.submit(record));
        match &result {
            Ok(()) => {
                self.metrics.record_submitted();
                self.logger.record(&format!(
                    "submitted vitals for {} at {:.2}s",
                    subject,
                    now.as_secs_f32()
                ));
            }
            Err(err) => {
                self.metrics.record_submit_failure();
                self.logger.warn(&format!("vitals submission failed: {}", err));
            }
        }
        result
    }

    /// Current window with the latest valleys re-indexed into it.
    pub fn display_view(&self) -> DisplayView {
        let waveform = self.session.waveform.window(self.analysis_window());
        let valleys = self
            .session
            .valleys
            .iter()
            .filter_map(|valley| {
                let index = waveform.partition_point(|s| s.timestamp < valley.timestamp);
                let sample = waveform.get(index)?;
                (sample.timestamp == valley.timestamp).then_some(Valley {
                    index,
                    timestamp: valley.timestamp,
                })
            })
            .collect();

        DisplayView {
            phase: self.session.phase,
            sampling: self.session.sampling,
            waveform,
            valleys,
            vitals: self.session.vitals,
            quality: self.session.quality,
        }
    }

    pub fn publish(&self, display: &dyn DisplaySink) {
        display.publish(&self.display_view());
    }
}
