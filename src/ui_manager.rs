//! This module renders tracker snapshots as progress lines on the terminal
use std::collections::HashMap;
use std::io::{self, Write};
use std::time::Duration;

use color_eyre::eyre;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

use netdrop::model::snapshot::TrackerSnapshot;
use netdrop::model::upload_record::{RecordId, UploadRecord};
use netdrop::model::upload_status::UploadStatus;
use netdrop::services::upload_tracker::UploadTracker;
use netdrop::utils::{format_bytes, format_eta, format_progress_bar, format_speed};

const RENDERING_TICK_RATE: Duration = Duration::from_millis(250);
const PROGRESS_BAR_WIDTH: usize = 20;
/// Minimum progress change (in percent) worth a new line
const PROGRESS_STEP: u8 = 10;

/// How the main loop ended
#[derive(Debug)]
pub enum Outcome {
    Finished(TrackerSnapshot),
    Interrupted,
}

/// Prints a line whenever a record changes status or makes visible progress
#[derive(Default)]
pub struct UiManager {
    last_seen: HashMap<RecordId, (&'static str, u8)>,
}

impl UiManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn main_loop(
        mut self,
        tracker: UploadTracker,
        mut state_rx: UnboundedReceiver<TrackerSnapshot>,
        mut batch: JoinHandle<Vec<RecordId>>,
    ) -> eyre::Result<Outcome> {
        let mut ticker = tokio::time::interval(RENDERING_TICK_RATE);
        let mut stderr = io::stderr();

        let outcome = loop {
            tokio::select! {
                // Tick to terminate the select every N milliseconds
                _ = ticker.tick() => (),
                Some(snapshot) = state_rx.recv() => {
                    self.render(&snapshot, &mut stderr)?;
                },
                joined = &mut batch => {
                    joined?;
                    while let Ok(snapshot) = state_rx.try_recv() {
                        self.render(&snapshot, &mut stderr)?;
                    }
                    break Outcome::Finished(tracker.snapshot().await);
                },
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("exited per user request");
                    writeln!(stderr, "Interrupted, cancelling remaining uploads")?;
                    cancel_batch(&tracker, &mut batch).await?;
                    break Outcome::Interrupted;
                }
            }
        };

        Ok(outcome)
    }

    fn render<W: Write>(&mut self, snapshot: &TrackerSnapshot, out: &mut W) -> eyre::Result<()> {
        for line in self.changed_lines(snapshot) {
            writeln!(out, "{}", line)?;
        }
        Ok(())
    }

    /// Lines for the records that changed enough since the last snapshot
    pub fn changed_lines(&mut self, snapshot: &TrackerSnapshot) -> Vec<String> {
        let mut lines = Vec::new();
        for record in &snapshot.records {
            let label = record.status.label();
            let progress = record.progress();
            let changed = match self.last_seen.get(&record.id) {
                None => true,
                Some((last_label, last_progress)) => {
                    *last_label != label || progress >= last_progress.saturating_add(PROGRESS_STEP)
                }
            };
            if changed {
                self.last_seen.insert(record.id, (label, progress));
                lines.push(render_record(record));
            }
        }
        lines
    }
}

/// Removes every record and waits for the batch to wind down.
///
/// Pending files are skipped. The file on the wire is aborted when the tracker
/// was built with `abort_on_remove`, otherwise its request runs to the end.
pub async fn cancel_batch(
    tracker: &UploadTracker,
    batch: &mut JoinHandle<Vec<RecordId>>,
) -> eyre::Result<()> {
    for record in tracker.records().await {
        tracker.remove(record.id).await;
    }
    batch.await?;
    Ok(())
}

/// One display line for a record
pub fn render_record(record: &UploadRecord) -> String {
    match &record.status {
        UploadStatus::Pending => {
            format!("[pending] {} ({})", record.name, format_bytes(record.size))
        }
        UploadStatus::Uploading(live) => format!(
            "[{:>3}%] {} {} {}/{} {} ETA {}",
            live.progress,
            format_progress_bar(live.progress, PROGRESS_BAR_WIDTH),
            record.name,
            format_bytes(live.uploaded_bytes),
            format_bytes(record.size),
            format_speed(live.speed),
            format_eta(live.eta_seconds)
        ),
        UploadStatus::Completed { url, .. } => format!("[done] {} -> {}", record.name, url),
        UploadStatus::Error(msg) => format!("[error] {}: {}", record.name, msg),
    }
}

/// Final per-file summary: the link for completed uploads, the reason otherwise
pub fn render_summary(snapshot: &TrackerSnapshot) -> Vec<String> {
    snapshot
        .records
        .iter()
        .map(|record| match &record.status {
            UploadStatus::Completed { url, .. } => {
                format!("{}\t{}\t{}", record.name, format_bytes(record.size), url)
            }
            status => format!(
                "{}\t{}\t{}",
                record.name,
                format_bytes(record.size),
                status.error().unwrap_or(status.label())
            ),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use netdrop::model::live_progress::LiveProgress;
    use netdrop::model::source_file::SourceFile;
    use netdrop::services::transport::{Transfer, Transport, TransportEvent};
    use netdrop::settings::base_address::BaseAddress;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    /// Starts a request that only ends when aborted
    #[derive(Default)]
    struct StalledTransport {
        sent: AtomicUsize,
    }

    impl Transport for StalledTransport {
        fn send(&self, file: &SourceFile, _endpoint: &str) -> Transfer {
            self.sent.fetch_add(1, Ordering::SeqCst);
            let (tx, rx) = mpsc::unbounded_channel();
            let total = file.size;
            let task = tokio::spawn(async move {
                let _ = tx.send(TransportEvent::Progress { loaded: 1, total });
                std::future::pending::<()>().await;
            });
            Transfer {
                events: rx,
                abort: Some(task.abort_handle()),
            }
        }
    }

    fn record(status: UploadStatus) -> UploadRecord {
        let mut record = UploadRecord::pending(RecordId::from(1), &SourceFile::new("/tmp/a.bin", 2048));
        record.status = status;
        record
    }

    fn uploading(progress: u8) -> UploadStatus {
        UploadStatus::Uploading(LiveProgress {
            progress,
            uploaded_bytes: 1024,
            speed: 1024.0,
            eta_seconds: 0.0,
        })
    }

    #[test]
    fn test_render_uploading_line() {
        let line = render_record(&record(uploading(50)));
        assert!(line.starts_with("[ 50%]"));
        assert!(line.contains("a.bin"));
        assert!(line.contains("1.00 KB/2.00 KB"));
        assert!(line.contains("1.00 KB/s"));
        assert!(line.ends_with("ETA calculating..."));
    }

    #[test]
    fn test_render_error_line() {
        let line = render_record(&record(UploadStatus::Error("Upload aborted".into())));
        assert_eq!(line, "[error] a.bin: Upload aborted");
    }

    #[test]
    fn test_changed_lines_throttles_small_steps() {
        let mut ui = UiManager::new();
        let snapshot = |status| TrackerSnapshot {
            records: vec![record(status)],
            is_uploading: true,
        };

        assert_eq!(ui.changed_lines(&snapshot(UploadStatus::Pending)).len(), 1);
        assert_eq!(ui.changed_lines(&snapshot(uploading(0))).len(), 1);
        assert!(ui.changed_lines(&snapshot(uploading(5))).is_empty());
        assert_eq!(ui.changed_lines(&snapshot(uploading(12))).len(), 1);
        assert_eq!(
            ui.changed_lines(&snapshot(UploadStatus::Error("x".into()))).len(),
            1
        );
    }

    #[test]
    fn test_summary_lists_link_or_reason() {
        let snapshot = TrackerSnapshot {
            records: vec![
                record(UploadStatus::Completed {
                    url: "http://localhost:8000/download/abc".into(),
                    uploaded_at: chrono::Utc::now(),
                }),
                record(UploadStatus::Error("Upload failed: HTTP 500 Internal Server Error".into())),
            ],
            is_uploading: false,
        };
        let lines = render_summary(&snapshot);
        assert_eq!(lines[0], "a.bin\t2.00 KB\thttp://localhost:8000/download/abc");
        assert_eq!(
            lines[1],
            "a.bin\t2.00 KB\tUpload failed: HTTP 500 Internal Server Error"
        );
    }

    #[tokio::test]
    async fn test_cancel_batch_aborts_in_flight_and_skips_pending() {
        let transport = Arc::new(StalledTransport::default());
        let base = BaseAddress::parse("http://localhost:8000").unwrap();
        let (tracker, mut rx) = UploadTracker::new(base, transport.clone(), true);

        let worker = tracker.clone();
        let mut batch = tokio::spawn(async move {
            worker
                .enqueue(vec![
                    SourceFile::new("/tmp/a.bin", 10),
                    SourceFile::new("/tmp/b.bin", 10),
                ])
                .await
        });
        while let Some(snapshot) = rx.recv().await {
            if snapshot.records.iter().any(|r| r.progress() == 10) {
                break;
            }
        }

        cancel_batch(&tracker, &mut batch).await.unwrap();
        assert!(tracker.records().await.is_empty());
        assert!(!tracker.is_uploading().await);
        assert_eq!(transport.sent.load(Ordering::SeqCst), 1);
    }
}
