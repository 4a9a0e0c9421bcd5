use rppgcore::interface::VitalsRecord;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedReceiver;

#[derive(Debug, Error, PartialEq)]
pub enum AggregateError {
    #[error("subject id is required")]
    MissingSubject,
    #[error("no records stored for subject {0}")]
    NoRecords(String),
}

/// Averages over every stored record of one subject.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectSummary {
    pub subject_id: String,
    pub avg_heart_rate: f64,
    #[serde(rename = "avgHRV")]
    pub avg_hrv: f64,
    /// Timestamp of the most recent record, unix seconds.
    pub last_access: f64,
    pub record_count: usize,
}

/// In-memory stand-in for the record database.
#[derive(Debug, Default)]
pub struct RecordStore {
    records: Mutex<Vec<VitalsRecord>>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: VitalsRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record);
        }
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Drain the channel until every sender is gone; returns how many records arrived.
    pub async fn consume(self: Arc<Self>, mut receiver: UnboundedReceiver<VitalsRecord>) -> usize {
        let mut received = 0;
        while let Some(record) = receiver.recv().await {
            log::debug!(
                "stored record for {} at {:.2}",
                record.subject_id,
                record.timestamp
            );
            self.insert(record);
            received += 1;
        }
        received
    }

    pub fn aggregate(&self, subject_id: &str) -> Result<SubjectSummary, AggregateError> {
        let subject_id = subject_id.trim();
        if subject_id.is_empty() {
            return Err(AggregateError::MissingSubject);
        }
        let records = self
            .records
            .lock()
            .map_err(|_| AggregateError::NoRecords(subject_id.to_string()))?;
        let matching: Vec<&VitalsRecord> = records
            .iter()
            .filter(|r| r.subject_id == subject_id)
            .collect();
        if matching.is_empty() {
            return Err(AggregateError::NoRecords(subject_id.to_string()));
        }

        let count = matching.len() as f64;
        let heart_rate = matching.iter().map(|r| r.heart_rate.bpm as f64).sum::<f64>() / count;
        let hrv = matching.iter().map(|r| r.hrv.sdnn as f64).sum::<f64>() / count;
        let last_access = matching
            .iter()
            .map(|r| r.timestamp)
            .fold(f64::NEG_INFINITY, f64::max);

        Ok(SubjectSummary {
            subject_id: subject_id.to_string(),
            avg_heart_rate: round2(heart_rate),
            avg_hrv: round2(hrv),
            last_access,
            record_count: matching.len(),
        })
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
