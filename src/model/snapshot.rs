use crate::model::upload_record::{RecordId, UploadRecord};
use serde::Serialize;

/// Read-only copy of the tracker state handed to the presentation layer
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrackerSnapshot {
    pub records: Vec<UploadRecord>,
    pub is_uploading: bool,
}

impl TrackerSnapshot {
    pub fn record(&self, id: RecordId) -> Option<&UploadRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn uploading_count(&self) -> usize {
        self.records.iter().filter(|r| r.status.is_uploading()).count()
    }

    pub fn error_count(&self) -> usize {
        self.records.iter().filter(|r| r.status.is_error()).count()
    }

    /// Average progress across all records, 0 when empty
    pub fn overall_progress(&self) -> f64 {
        if self.records.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.records.iter().map(|r| r.progress() as f64).sum();
        sum / self.records.len() as f64
    }

    /// True when every record has settled
    pub fn is_settled(&self) -> bool {
        self.records.iter().all(|r| r.status.is_terminal())
    }
}
