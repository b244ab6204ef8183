//! Live estimates carried by a record while its upload is in flight

use serde::Serialize;
use std::time::Duration;

/// Progress, throughput and ETA for the attempt currently in flight.
///
/// Only exists inside [`UploadStatus::Uploading`](crate::model::upload_status::UploadStatus),
/// so the estimates disappear as soon as the record settles.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct LiveProgress {
    /// Whole percentage, 0 to 100
    pub progress: u8,
    pub uploaded_bytes: u64,
    /// Average bytes per second since the attempt started
    pub speed: f64,
    pub eta_seconds: f64,
}

impl LiveProgress {
    /// Estimates derived from one `(loaded, total)` notification.
    pub fn from_sample(loaded: u64, total: u64, elapsed: Duration) -> Self {
        let speed = average_speed(loaded, elapsed.as_secs_f64());
        LiveProgress {
            progress: percent(loaded, total),
            uploaded_bytes: loaded,
            speed,
            eta_seconds: eta_seconds(total.saturating_sub(loaded), speed),
        }
    }
}

/// Rounded completion percentage, clamped to 100.
///
/// An empty payload counts as fully sent.
pub fn percent(loaded: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let ratio = loaded as f64 / total as f64;
    (ratio * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Average speed in bytes per second; 0 when no time has elapsed.
pub fn average_speed(bytes: u64, elapsed_secs: f64) -> f64 {
    if elapsed_secs <= 0.0 {
        return 0.0;
    }
    bytes as f64 / elapsed_secs
}

/// Seconds left at the given speed; 0 when the speed is unknown.
pub fn eta_seconds(remaining_bytes: u64, speed: f64) -> f64 {
    if speed <= 0.0 {
        return 0.0;
    }
    (remaining_bytes as f64 / speed).max(0.0)
}
