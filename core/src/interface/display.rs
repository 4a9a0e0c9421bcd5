use crate::prelude::{QualityAssessment, Sample, SessionPhase, Valley, VitalsSnapshot};
use serde::Serialize;

/// Read-only view of the current session handed to rendering collaborators.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DisplayView {
    pub phase: SessionPhase,
    pub sampling: bool,
    pub waveform: Vec<Sample>,
    /// Indices refer to `waveform`.
    pub valleys: Vec<Valley>,
    pub vitals: VitalsSnapshot,
    pub quality: QualityAssessment,
}

/// Rendering collaborator; it never feeds back into the pipeline.
pub trait DisplaySink {
    fn publish(&self, view: &DisplayView);
}
