use crate::model::live_progress::LiveProgress;
use crate::model::source_file::SourceFile;
use crate::model::upload_status::UploadStatus;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// Unique identifier for a tracked record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RecordId(u64);

impl From<u64> for RecordId {
    fn from(id: u64) -> Self {
        RecordId(id)
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "upload-{}", self.0)
    }
}

/// Represents one file of a batch on the upload list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadRecord {
    pub id: RecordId,
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub status: UploadStatus,
}

impl UploadRecord {
    pub fn pending(id: RecordId, file: &SourceFile) -> Self {
        UploadRecord {
            id,
            name: file.name.clone(),
            size: file.size,
            mime_type: file.mime_type.clone(),
            status: UploadStatus::Pending,
        }
    }

    pub fn progress(&self) -> u8 {
        self.status.progress()
    }

    /// Bytes sent so far; the full size once completed
    pub fn uploaded_bytes(&self) -> Option<u64> {
        match &self.status {
            UploadStatus::Uploading(live) => Some(live.uploaded_bytes),
            UploadStatus::Completed { .. } => Some(self.size),
            _ => None,
        }
    }

    pub fn upload_speed(&self) -> Option<f64> {
        self.status.live().map(|live| live.speed)
    }

    pub fn eta_seconds(&self) -> Option<f64> {
        self.status.live().map(|live| live.eta_seconds)
    }

    pub fn result_url(&self) -> Option<&str> {
        self.status.url()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.status.error()
    }

    pub fn uploaded_at(&self) -> Option<DateTime<Utc>> {
        match &self.status {
            UploadStatus::Completed { uploaded_at, .. } => Some(*uploaded_at),
            _ => None,
        }
    }

    /// `pending -> uploading`; returns false for any other source state
    pub fn begin(&mut self) -> bool {
        if !self.status.is_pending() {
            return false;
        }
        self.status = UploadStatus::Uploading(LiveProgress::default());
        true
    }

    /// Applies one progress notification while uploading.
    ///
    /// Samples that arrive after a terminal transition, or that report fewer
    /// bytes than already recorded, are discarded so progress never regresses.
    pub fn apply_sample(&mut self, loaded: u64, total: u64, elapsed: Duration) -> bool {
        let current = match &self.status {
            UploadStatus::Uploading(live) => live,
            _ => return false,
        };
        if loaded < current.uploaded_bytes {
            return false;
        }
        let mut next = LiveProgress::from_sample(loaded, total, elapsed);
        next.progress = next.progress.max(current.progress);
        self.status = UploadStatus::Uploading(next);
        true
    }

    /// `uploading -> completed`
    pub fn complete(&mut self, url: String) -> bool {
        if !self.status.is_uploading() {
            return false;
        }
        self.status = UploadStatus::Completed {
            url,
            uploaded_at: Utc::now(),
        };
        true
    }

    /// `uploading -> error`
    pub fn fail(&mut self, message: impl Into<String>) -> bool {
        if !self.status.is_uploading() {
            return false;
        }
        self.status = UploadStatus::Error(message.into());
        true
    }
}
