use crate::generator::profile::SyntheticFrameSource;
use crate::workflow::config::WorkflowConfig;
use anyhow::Context;
use rppgcore::interface::{DisplaySink, PersistenceSink};
use rppgcore::pipeline::{AnalysisReport, PipelineCoordinator};
use rppgcore::prelude::{QualityAssessment, VitalsSnapshot};
use rppgcore::telemetry::MetricsSnapshot;
use serde::Serialize;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowResult {
    pub subject: String,
    pub frames: usize,
    pub reports: Vec<AnalysisReport>,
    pub vitals: VitalsSnapshot,
    pub quality: QualityAssessment,
    pub metrics: MetricsSnapshot,
    pub interrupted: bool,
}

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
}

/// One running session: coordinator, frame source and collaborators.
struct Drive<'a> {
    coordinator: PipelineCoordinator,
    source: SyntheticFrameSource,
    sink: &'a dyn PersistenceSink,
    display: &'a dyn DisplaySink,
    sampling: bool,
    reports: Vec<AnalysisReport>,
    frames: usize,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> Self {
        Self { config }
    }

    fn start<'a>(
        &self,
        sink: &'a dyn PersistenceSink,
        display: &'a dyn DisplaySink,
        started_at_unix: f64,
    ) -> anyhow::Result<Drive<'a>> {
        let mut coordinator = PipelineCoordinator::with_config(self.config.pipeline.clone());
        coordinator
            .start_recording(&self.config.subject, started_at_unix)
            .context("starting recording")?;
        Ok(Drive {
            coordinator,
            source: SyntheticFrameSource::new(&self.config.generator),
            sink,
            display,
            sampling: self.config.sampling,
            reports: Vec::new(),
            frames: 0,
        })
    }

    /// Push every generated frame through the pipeline as fast as possible.
    pub fn execute(
        &self,
        sink: &dyn PersistenceSink,
        display: &dyn DisplaySink,
        started_at_unix: f64,
    ) -> anyhow::Result<WorkflowResult> {
        let mut drive = self.start(sink, display, started_at_unix)?;
        while drive.step()? {}
        Ok(drive.finish(false))
    }

    /// Deliver frames at the generator's frame rate until the source runs out or Ctrl+C.
    pub async fn execute_paced(
        &self,
        sink: &dyn PersistenceSink,
        display: &dyn DisplaySink,
        started_at_unix: f64,
    ) -> anyhow::Result<WorkflowResult> {
        let mut drive = self.start(sink, display, started_at_unix)?;
        let period = Duration::from_secs_f64(1.0 / self.config.generator.fps.max(1.0));
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);
        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    log::info!("interrupted after {} frames", drive.frames);
                    return Ok(drive.finish(true));
                }
                _ = ticker.tick() => {
                    if !drive.step()? {
                        break;
                    }
                }
            }
        }
        Ok(drive.finish(false))
    }
}

impl Drive<'_> {
    /// Returns `false` once the source is exhausted.
    fn step(&mut self) -> anyhow::Result<bool> {
        if self.source.remaining() == 0 {
            return Ok(false);
        }
        let outcome = self.coordinator.tick(&mut self.source, self.sink);
        self.frames += 1;

        if self.sampling && outcome.sample.is_some() && !self.coordinator.session().is_sampling()
        {
            self.coordinator
                .set_sampling(true)
                .context("enabling sampling")?;
        }
        if let Some(report) = outcome.report {
            self.coordinator.publish(self.display);
            self.reports.push(report);
        }
        Ok(true)
    }

    fn finish(mut self, interrupted: bool) -> WorkflowResult {
        let session = self.coordinator.session();
        let result = WorkflowResult {
            subject: session.subject().unwrap_or_default().to_string(),
            frames: self.frames,
            reports: self.reports,
            vitals: session.vitals(),
            quality: session.quality(),
            metrics: self.coordinator.metrics(),
            interrupted,
        };
        self.coordinator.stop_recording();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::bridge::ConsoleDisplay;
    use crate::display::model::QualityGate;
    use crate::generator::profile::GeneratorConfig;
    use rppgcore::interface::ChannelSink;
    use rppgcore::prelude::CombinationStrategy;

    fn config(duration_secs: f64, sampling: bool) -> WorkflowConfig {
        strategy_config(CombinationStrategy::Default, duration_secs, sampling)
    }

    fn strategy_config(
        strategy: CombinationStrategy,
        duration_secs: f64,
        sampling: bool,
    ) -> WorkflowConfig {
        WorkflowConfig::from_args(
            "sim-subject",
            strategy,
            sampling,
            GeneratorConfig {
                duration_secs,
                seed: 3,
                ..Default::default()
            },
        )
    }

    #[test]
    fn runner_recovers_configured_heart_rate() {
        let (sink, _records) = ChannelSink::new();
        let display = ConsoleDisplay::quiet(QualityGate::default());
        let result = Runner::new(config(20.0, false))
            .execute(&sink, &display, 0.0)
            .unwrap();

        assert_eq!(result.frames, 600);
        assert_eq!(result.metrics.frames_ingested, 600);
        assert!(!result.reports.is_empty());
        assert!(
            (result.vitals.heart_rate.bpm - 72.0).abs() < 3.0,
            "bpm {}",
            result.vitals.heart_rate.bpm
        );
        assert!(result.quality.score > 0.5, "quality {:?}", result.quality);
        assert!(display.snapshot().heart_rate.is_some());
    }

    #[test]
    fn every_strategy_recovers_heart_rate() {
        for strategy in [
            CombinationStrategy::Default,
            CombinationStrategy::RedOnly,
            CombinationStrategy::BlueOnly,
            CombinationStrategy::ChrominanceCombination,
        ] {
            let (sink, _records) = ChannelSink::new();
            let display = ConsoleDisplay::quiet(QualityGate::default());
            let result = Runner::new(strategy_config(strategy, 20.0, false))
                .execute(&sink, &display, 0.0)
                .unwrap();

            let last = result.reports.last().unwrap();
            assert!(last.valley_count > 0, "{} found no valleys", strategy);
            assert!(
                (result.vitals.heart_rate.bpm - 72.0).abs() < 4.0,
                "{} bpm {}",
                strategy,
                result.vitals.heart_rate.bpm
            );
            assert!(
                result.quality.confidence > 0.5,
                "{} quality {:?}",
                strategy,
                result.quality
            );
        }
    }

    #[test]
    fn chrominance_vitals_pass_the_display_gate() {
        let (sink, _records) = ChannelSink::new();
        let display = ConsoleDisplay::quiet(QualityGate::default());
        let result = Runner::new(strategy_config(
            CombinationStrategy::ChrominanceCombination,
            20.0,
            false,
        ))
        .execute(&sink, &display, 0.0)
        .unwrap();
        assert!(result.vitals.heart_rate.confidence > 0.5);
        assert!(display.snapshot().heart_rate.is_some());
    }

    #[test]
    fn runner_is_deterministic_for_a_seed() {
        let (sink, _records) = ChannelSink::new();
        let display = ConsoleDisplay::quiet(QualityGate::default());
        let runner = Runner::new(config(12.0, false));
        let first = runner.execute(&sink, &display, 0.0).unwrap();
        let second = runner.execute(&sink, &display, 0.0).unwrap();
        assert_eq!(first.reports, second.reports);
        assert_eq!(first.vitals, second.vitals);
    }

    #[test]
    fn sampling_submits_every_interval() {
        let (sink, mut records) = ChannelSink::new();
        let display = ConsoleDisplay::quiet(QualityGate::default());
        let result = Runner::new(config(25.0, true))
            .execute(&sink, &display, 1_000.0)
            .unwrap();
        assert_eq!(result.metrics.records_submitted, 2);

        let first = records.try_recv().unwrap();
        let second = records.try_recv().unwrap();
        assert_eq!(first.subject_id, "sim-subject");
        assert!((first.timestamp - 1_010.0).abs() < 1e-6);
        assert!((second.timestamp - 1_020.0).abs() < 1e-6);
        assert!(records.try_recv().is_err());
    }

    #[tokio::test]
    async fn paced_run_delivers_every_frame() {
        let (sink, _records) = ChannelSink::new();
        let display = ConsoleDisplay::quiet(QualityGate::default());
        let result = Runner::new(config(0.3, false))
            .execute_paced(&sink, &display, 0.0)
            .await
            .unwrap();
        assert_eq!(result.frames, 9);
        assert!(!result.interrupted);
    }
}
