//! Type-state pattern for the upload lifecycle
//!
//! This module provides a state machine representation for a record's
//! lifecycle, so a completed record can never carry an error message and an
//! errored record can never carry a link.

use crate::model::live_progress::LiveProgress;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Represents the lifecycle state of a single file upload.
///
/// `Pending` and `Uploading` are the only non-terminal states.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum UploadStatus {
    /// Queued behind other files
    #[default]
    Pending,
    /// Attempt in flight with live estimates
    Uploading(LiveProgress),
    /// Server accepted the file and returned a content identifier
    Completed {
        url: String,
        uploaded_at: DateTime<Utc>,
    },
    /// Attempt failed with a human-readable message
    Error(String),
}

impl UploadStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, UploadStatus::Pending)
    }

    pub fn is_uploading(&self) -> bool {
        matches!(self, UploadStatus::Uploading(_))
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, UploadStatus::Completed { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, UploadStatus::Error(_))
    }

    /// Returns true once no further transition is possible
    pub fn is_terminal(&self) -> bool {
        self.is_completed() || self.is_error()
    }

    /// Percentage shown for the record (0 for pending/error, 100 for completed)
    pub fn progress(&self) -> u8 {
        match self {
            UploadStatus::Pending => 0,
            UploadStatus::Uploading(live) => live.progress,
            UploadStatus::Completed { .. } => 100,
            UploadStatus::Error(_) => 0,
        }
    }

    pub fn live(&self) -> Option<&LiveProgress> {
        match self {
            UploadStatus::Uploading(live) => Some(live),
            _ => None,
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            UploadStatus::Completed { url, .. } => Some(url),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            UploadStatus::Error(msg) => Some(msg),
            _ => None,
        }
    }

    /// Short lowercase label, matching the serialized tag
    pub fn label(&self) -> &'static str {
        match self {
            UploadStatus::Pending => "pending",
            UploadStatus::Uploading(_) => "uploading",
            UploadStatus::Completed { .. } => "completed",
            UploadStatus::Error(_) => "error",
        }
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadStatus::Pending => write!(f, "Pending"),
            UploadStatus::Uploading(live) => write!(f, "Uploading ({}%)", live.progress),
            UploadStatus::Completed { url, .. } => write!(f, "Completed: {}", url),
            UploadStatus::Error(msg) => write!(f, "Error: {}", msg),
        }
    }
}
