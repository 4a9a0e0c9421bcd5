use crate::prelude::{
    CombinationStrategy, PipelineError, PipelineResult, QualityAssessment, SessionPhase, Valley,
    VitalsSnapshot,
};
use crate::processing::waveform::WaveformBuffer;
use std::time::Duration;

/// State of one recording session, passed explicitly to the coordinator.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub(crate) subject: Option<String>,
    pub(crate) phase: SessionPhase,
    pub(crate) sampling: bool,
    pub(crate) strategy: CombinationStrategy,
    pub(crate) waveform: WaveformBuffer,
    pub(crate) vitals: VitalsSnapshot,
    pub(crate) quality: QualityAssessment,
    pub(crate) valleys: Vec<Valley>,
    /// Last estimate that came from real intervals, with the session time it was made.
    pub(crate) last_fresh: Option<(VitalsSnapshot, Duration)>,
    /// Bumped on every start/stop so in-flight analysis can tell it is stale.
    pub(crate) generation: u64,
    pub(crate) started_at_unix: f64,
    pub(crate) last_analysis_at: Option<Duration>,
    pub(crate) last_submission_at: Option<Duration>,
}

impl SessionState {
    pub fn new(strategy: CombinationStrategy, retention: Duration) -> Self {
        Self {
            subject: None,
            phase: SessionPhase::Idle,
            sampling: false,
            strategy,
            waveform: WaveformBuffer::new(retention),
            vitals: VitalsSnapshot::default(),
            quality: QualityAssessment::default(),
            valleys: Vec::new(),
            last_fresh: None,
            generation: 0,
            started_at_unix: 0.0,
            last_analysis_at: None,
            last_submission_at: None,
        }
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_recording(&self) -> bool {
        self.phase == SessionPhase::Recording
    }

    pub fn is_sampling(&self) -> bool {
        self.sampling
    }

    pub fn strategy(&self) -> CombinationStrategy {
        self.strategy
    }

    pub fn waveform(&self) -> &WaveformBuffer {
        &self.waveform
    }

    pub fn vitals(&self) -> VitalsSnapshot {
        self.vitals
    }

    pub fn quality(&self) -> QualityAssessment {
        self.quality
    }

    pub fn valleys(&self) -> &[Valley] {
        &self.valleys
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Idle -> Recording for a non-empty (trimmed) subject.
    pub(crate) fn begin(&mut self, subject: &str, started_at_unix: f64) -> PipelineResult<()> {
        let subject = subject.trim();
        if subject.is_empty() {
            return Err(PipelineError::EmptySubject);
        }
        self.reset();
        self.subject = Some(subject.to_string());
        self.phase = SessionPhase::Recording;
        self.started_at_unix = started_at_unix;
        Ok(())
    }

    /// Recording -> Idle; the next session starts clean.
    pub(crate) fn end(&mut self) {
        self.reset();
        self.phase = SessionPhase::Idle;
    }

    fn reset(&mut self) {
        self.generation += 1;
        self.sampling = false;
        self.waveform.clear();
        self.vitals = VitalsSnapshot::default();
        self.quality = QualityAssessment::default();
        self.valleys.clear();
        self.last_fresh = None;
        self.last_analysis_at = None;
        self.last_submission_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::Sample;

    #[test]
    fn begin_requires_subject_and_starts_clean() {
        let mut session = SessionState::new(CombinationStrategy::Default, Duration::from_secs(5));
        assert_eq!(session.begin("  ", 0.0), Err(PipelineError::EmptySubject));
        assert_eq!(session.phase(), SessionPhase::Idle);

        session.begin(" dana ", 100.0).unwrap();
        assert_eq!(session.subject(), Some("dana"));
        assert!(session.is_recording());

        session
            .waveform
            .append(Sample::new(1.0, Duration::from_millis(10)))
            .unwrap();
        let generation = session.generation();
        session.end();
        assert!(session.waveform().is_empty());
        assert!(session.generation() > generation);
        assert!(!session.is_recording());
    }
}
