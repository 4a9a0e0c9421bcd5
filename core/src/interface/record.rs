use crate::prelude::{HeartRate, Hrv, PipelineError, PipelineResult, VitalsSnapshot};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Completed vitals sample handed to the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VitalsRecord {
    pub subject_id: String,
    pub heart_rate: HeartRate,
    pub hrv: Hrv,
    /// Raw waveform values of the analysed window.
    pub ppg_data: Vec<f32>,
    /// Unix time in seconds.
    pub timestamp: f64,
}

impl VitalsRecord {
    pub fn new(
        subject_id: &str,
        snapshot: &VitalsSnapshot,
        ppg_data: Vec<f32>,
        timestamp: f64,
    ) -> PipelineResult<Self> {
        let subject_id = subject_id.trim();
        if subject_id.is_empty() {
            return Err(PipelineError::EmptySubject);
        }
        Ok(Self {
            subject_id: subject_id.to_string(),
            heart_rate: snapshot.heart_rate,
            hrv: snapshot.hrv,
            ppg_data,
            timestamp,
        })
    }

    pub fn snapshot(&self) -> VitalsSnapshot {
        VitalsSnapshot {
            heart_rate: self.heart_rate,
            hrv: self.hrv,
        }
    }
}

/// Persistence collaborator. Submission is fire-and-forget: implementations must not block.
pub trait PersistenceSink {
    fn submit(&self, record: VitalsRecord) -> PipelineResult<()>;
}

/// Forwards records to an async consumer over an unbounded channel.
#[derive(Clone)]
pub struct ChannelSink {
    sender: UnboundedSender<VitalsRecord>,
}

impl ChannelSink {
    pub fn new() -> (Self, UnboundedReceiver<VitalsRecord>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl PersistenceSink for ChannelSink {
    fn submit(&self, record: VitalsRecord) -> PipelineResult<()> {
        if record.subject_id.trim().is_empty() {
            return Err(PipelineError::EmptySubject);
        }
        self.sender
            .send(record)
            .map_err(|_| PipelineError::SinkClosed)
    }
}
