//! Upload Tracker
//!
//! Owns the list of upload records and drives them through their lifecycle:
//! - Batches are appended in input order and processed one file at a time
//! - Only one attempt is in flight across the whole tracker
//! - Live progress, speed and ETA are recomputed on every notification
//! - Every state change is published as a [`TrackerSnapshot`]

use crate::model::error::{UploadError, UploadResult};
use crate::model::snapshot::TrackerSnapshot;
use crate::model::source_file::SourceFile;
use crate::model::upload_record::{RecordId, UploadRecord};
use crate::model::upload_response::UploadResponse;
use crate::services::transport::{Transfer, Transport, TransportEvent, TransportResponse};
use crate::settings::base_address::BaseAddress;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;
use tokio::task::AbortHandle;

/// The attempt currently on the wire
#[derive(Debug)]
struct InFlight {
    id: RecordId,
    abort: Option<AbortHandle>,
}

#[derive(Debug, Default)]
struct TrackerState {
    records: Vec<UploadRecord>,
    /// Batches enqueued but not yet fully settled
    active_batches: usize,
    in_flight: Option<InFlight>,
}

impl TrackerState {
    fn snapshot(&self) -> TrackerSnapshot {
        TrackerSnapshot {
            records: self.records.clone(),
            is_uploading: self.active_batches > 0,
        }
    }

    fn record_mut(&mut self, id: RecordId) -> Option<&mut UploadRecord> {
        self.records.iter_mut().find(|r| r.id == id)
    }
}

/// Sole owner of upload state.
///
/// Cloning is cheap and every clone drives the same state, so the tracker can
/// be handed to whichever task issues `enqueue`/`remove`/`clear`.
#[derive(Clone)]
pub struct UploadTracker {
    base: Arc<BaseAddress>,
    transport: Arc<dyn Transport>,
    abort_on_remove: bool,
    next_id: Arc<AtomicU64>,
    state: Arc<Mutex<TrackerState>>,
    /// Held for a whole batch so batches never interleave
    lane: Arc<Mutex<()>>,
    state_tx: UnboundedSender<TrackerSnapshot>,
}

impl UploadTracker {
    pub fn new(
        base: BaseAddress,
        transport: Arc<dyn Transport>,
        abort_on_remove: bool,
    ) -> (Self, UnboundedReceiver<TrackerSnapshot>) {
        let (state_tx, state_rx) = mpsc::unbounded_channel::<TrackerSnapshot>();

        let tracker = UploadTracker {
            base: Arc::new(base),
            transport,
            abort_on_remove,
            next_id: Arc::new(AtomicU64::new(1)),
            state: Arc::new(Mutex::new(TrackerState::default())),
            lane: Arc::new(Mutex::new(())),
            state_tx,
        };
        (tracker, state_rx)
    }

    pub fn base_address(&self) -> &BaseAddress {
        &self.base
    }

    fn generate_id(&self) -> RecordId {
        RecordId::from(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn publish(&self, state: &TrackerState) {
        // Nobody listening is fine; snapshots are also available on demand.
        let _ = self.state_tx.send(state.snapshot());
    }

    /// Adds a batch and uploads it file by file.
    ///
    /// Records are appended as `pending` before anything is sent. The future
    /// resolves once every file of the batch has settled; failures are
    /// reported only through each record's status.
    pub async fn enqueue(&self, files: Vec<SourceFile>) -> Vec<RecordId> {
        if files.is_empty() {
            tracing::warn!("Ignoring empty upload batch");
            return Vec::new();
        }

        let batch: Vec<(RecordId, SourceFile)> = {
            let mut state = self.state.lock().await;
            let batch: Vec<_> = files
                .into_iter()
                .map(|file| {
                    let id = self.generate_id();
                    state.records.push(UploadRecord::pending(id, &file));
                    (id, file)
                })
                .collect();
            state.active_batches += 1;
            self.publish(&state);
            batch
        };
        tracing::info!("Enqueued {} file(s)", batch.len());

        {
            let _lane = self.lane.lock().await;
            for (id, file) in &batch {
                self.attempt(*id, file).await;
            }
        }

        let mut state = self.state.lock().await;
        state.active_batches = state.active_batches.saturating_sub(1);
        self.publish(&state);

        batch.into_iter().map(|(id, _)| id).collect()
    }

    async fn attempt(&self, id: RecordId, file: &SourceFile) {
        {
            let mut state = self.state.lock().await;
            let began = state.record_mut(id).map(|r| r.begin()).unwrap_or(false);
            if !began {
                tracing::debug!("Skipping {}: removed before its turn", id);
                return;
            }
            state.in_flight = Some(InFlight { id, abort: None });
            self.publish(&state);
        }

        tracing::info!("Uploading {} ({}, {} bytes)", id, file.name, file.size);
        let started = Instant::now();
        let Transfer { mut events, abort } = self.transport.send(file, &self.base.upload_endpoint());

        {
            let mut state = self.state.lock().await;
            if state.record_mut(id).is_some() {
                if let Some(in_flight) = state.in_flight.as_mut() {
                    in_flight.abort = abort;
                }
            } else if self.abort_on_remove {
                if let Some(handle) = abort {
                    handle.abort();
                }
            }
        }

        // The lane stays held until the transfer ends, even for a removed
        // record; only an abort closes the stream early.
        let result = loop {
            match events.recv().await {
                Some(TransportEvent::Progress { loaded, total }) => {
                    let mut state = self.state.lock().await;
                    match state.record_mut(id) {
                        Some(record) => {
                            if record.apply_sample(loaded, total, started.elapsed()) {
                                self.publish(&state);
                            } else {
                                tracing::trace!("Dropped stale progress for {}", id);
                            }
                        }
                        None => tracing::trace!("Ignoring progress for removed {}", id),
                    }
                }
                Some(TransportEvent::Response(response)) => break self.settle(response),
                Some(TransportEvent::Failed(detail)) => break Err(UploadError::Transport(detail)),
                None => break Err(UploadError::Aborted),
            }
        };
        drop(events);

        let mut state = self.state.lock().await;
        state.in_flight = None;
        let Some(record) = state.record_mut(id) else {
            tracing::debug!("{} was removed before it settled", id);
            return;
        };
        match result {
            Ok(url) => {
                tracing::info!("Uploaded {} in {:.2?}: {}", id, started.elapsed(), url);
                record.complete(url);
            }
            Err(e) => {
                tracing::warn!("Upload of {} failed: {:?}", id, e);
                record.fail(e.to_string());
            }
        }
        self.publish(&state);
    }

    fn settle(&self, response: TransportResponse) -> UploadResult<String> {
        if !response.is_success() {
            return Err(UploadError::Rejected {
                status: response.status,
                reason: response.reason,
            });
        }
        let file_hash = UploadResponse::parse(&response.body)?.into_identifier()?;
        Ok(self.base.download_url(&file_hash))
    }

    /// Drops a record whatever its status. Returns false if it was already gone.
    ///
    /// Removing the record that is on the wire also aborts its request when
    /// the tracker was built with `abort_on_remove`.
    pub async fn remove(&self, id: RecordId) -> bool {
        let mut state = self.state.lock().await;
        let before = state.records.len();
        state.records.retain(|r| r.id != id);
        if state.records.len() == before {
            return false;
        }

        if self.abort_on_remove {
            if let Some(in_flight) = state.in_flight.as_mut().filter(|f| f.id == id) {
                if let Some(handle) = in_flight.abort.take() {
                    tracing::info!("Aborting in-flight upload {}", id);
                    handle.abort();
                }
            }
        }
        tracing::debug!("Removed {}", id);
        self.publish(&state);
        true
    }

    /// Empties the list; requests already on the wire keep running
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        state.records.clear();
        self.publish(&state);
    }

    pub async fn snapshot(&self) -> TrackerSnapshot {
        self.state.lock().await.snapshot()
    }

    pub async fn records(&self) -> Vec<UploadRecord> {
        self.state.lock().await.records.clone()
    }

    pub async fn record(&self, id: RecordId) -> Option<UploadRecord> {
        self.state
            .lock()
            .await
            .records
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    pub async fn is_uploading(&self) -> bool {
        self.state.lock().await.active_batches > 0
    }
}
