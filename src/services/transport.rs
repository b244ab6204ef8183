//! Upload transport
//!
//! One attempt is modelled as a finite stream of [`TransportEvent`]s: any
//! number of progress notifications followed by exactly one terminal event
//! (a server response or a failure). The stream has a single consumer and
//! cannot be restarted; a new attempt needs a new [`Transfer`].

use crate::model::source_file::SourceFile;
use crate::settings::app_settings::Settings;
use bytes::Bytes;
use color_eyre::eyre;
use futures::Stream;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::AbortHandle;
use tokio_util::io::ReaderStream;

/// Multipart field the server reads the payload from
pub const FILE_FIELD: &str = "file";

/// A single notification from an in-flight attempt
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Cumulative bytes handed to the connection so far
    Progress { loaded: u64, total: u64 },
    /// The server answered (any status)
    Response(TransportResponse),
    /// The request never produced a response
    Failed(String),
}

impl TransportEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransportEvent::Progress { .. })
    }
}

/// Status line and body of the server's answer
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub reason: String,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Handle to one attempt: its event stream and, when the transport runs the
/// request on its own task, a way to abort it
#[derive(Debug)]
pub struct Transfer {
    pub events: UnboundedReceiver<TransportEvent>,
    pub abort: Option<AbortHandle>,
}

impl Transfer {
    /// A transfer that cannot be aborted from the outside
    pub fn detached(events: UnboundedReceiver<TransportEvent>) -> Self {
        Transfer {
            events,
            abort: None,
        }
    }
}

/// Issues one upload request per call
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send + Sync {
    fn send(&self, file: &SourceFile, endpoint: &str) -> Transfer;
}

struct ProgressTracker {
    bytes_read: u64,
    content_length: u64,
    progress_sender: UnboundedSender<TransportEvent>,
}

impl ProgressTracker {
    fn track(&mut self, len: u64) {
        self.bytes_read += len;
        let _ = self.progress_sender.send(TransportEvent::Progress {
            loaded: self.bytes_read,
            total: self.content_length,
        });
    }
}

/// Wraps the request body stream and reports every chunk handed to the
/// connection as a progress event
#[pin_project::pin_project]
pub struct ProgressStream<S> {
    #[pin]
    inner: S,
    // Running byte count for the chunks yielded by `inner`
    progress_tracker: ProgressTracker,
}

impl<S> ProgressStream<S>
where
    S: Stream<Item = io::Result<Bytes>>,
{
    pub fn new(inner: S, content_length: u64, tx: UnboundedSender<TransportEvent>) -> Self {
        ProgressStream {
            inner,
            progress_tracker: ProgressTracker {
                bytes_read: 0,
                content_length,
                progress_sender: tx,
            },
        }
    }
}

impl<S> Stream for ProgressStream<S>
where
    S: Stream<Item = io::Result<Bytes>>,
{
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        match this.inner.poll_next(cx) {
            Poll::Ready(Some(Ok(data))) => {
                this.progress_tracker.track(data.len() as u64);
                Poll::Ready(Some(Ok(data)))
            }
            other => other,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// Multipart upload over HTTP, streaming the file from disk
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(settings: &Settings) -> eyre::Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = settings.connect_timeout_secs {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }
        Ok(HttpTransport {
            client: builder.build()?,
        })
    }

    pub fn with_client(client: Client) -> Self {
        HttpTransport { client }
    }
}

impl Transport for HttpTransport {
    fn send(&self, file: &SourceFile, endpoint: &str) -> Transfer {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = self.client.clone();
        let file = file.clone();
        let endpoint = endpoint.to_string();

        let handle = tokio::spawn(async move {
            let event = match post_multipart(&client, &file, &endpoint, tx.clone()).await {
                Ok(response) => TransportEvent::Response(response),
                Err(e) => {
                    tracing::warn!("Upload of {} failed in transport: {}", file.name, e);
                    TransportEvent::Failed(e)
                }
            };
            let _ = tx.send(event);
        });

        Transfer {
            events: rx,
            abort: Some(handle.abort_handle()),
        }
    }
}

async fn post_multipart(
    client: &Client,
    file: &SourceFile,
    endpoint: &str,
    tx: UnboundedSender<TransportEvent>,
) -> Result<TransportResponse, String> {
    let handle = tokio::fs::File::open(&file.path)
        .await
        .map_err(|e| format!("Failed to open {}: {}", file.path.display(), e))?;

    let stream = ProgressStream::new(ReaderStream::new(handle), file.size, tx);
    let part = Part::stream_with_length(Body::wrap_stream(stream), file.size)
        .file_name(file.name.clone())
        .mime_str(&file.mime_type)
        .map_err(|e| format!("Invalid MIME type {}: {}", file.mime_type, e))?;
    let form = Form::new().part(FILE_FIELD, part);

    tracing::debug!("POST {} ({} bytes, {})", endpoint, file.size, file.name);
    let response = client
        .post(endpoint)
        .multipart(form)
        .send()
        .await
        .map_err(|e| format!("Upload request failed: {}", e))?;

    let status = response.status();
    let reason = status.canonical_reason().unwrap_or_default().to_string();
    let body = response
        .text()
        .await
        .map_err(|e| format!("Failed to read response body: {}", e))?;

    Ok(TransportResponse {
        status: status.as_u16(),
        reason,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_progress_stream_reports_cumulative_bytes() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let chunks: Vec<io::Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"abcd")),
            Ok(Bytes::from_static(b"efgh")),
            Ok(Bytes::from_static(b"ij")),
        ];
        let stream = ProgressStream::new(futures::stream::iter(chunks), 10, tx);
        let collected: Vec<_> = stream.collect().await;
        assert_eq!(collected.len(), 3);

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(
            events,
            vec![
                TransportEvent::Progress { loaded: 4, total: 10 },
                TransportEvent::Progress { loaded: 8, total: 10 },
                TransportEvent::Progress { loaded: 10, total: 10 },
            ]
        );
    }

    #[tokio::test]
    async fn test_progress_stream_passes_errors_through() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let chunks: Vec<io::Result<Bytes>> = vec![Err(io::Error::new(io::ErrorKind::Other, "disk"))];
        let stream = ProgressStream::new(futures::stream::iter(chunks), 10, tx);
        let collected: Vec<_> = stream.collect().await;
        assert!(collected[0].is_err());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_response_success_range() {
        let response = |status| TransportResponse {
            status,
            reason: String::new(),
            body: String::new(),
        };
        assert!(response(200).is_success());
        assert!(response(201).is_success());
        assert!(!response(199).is_success());
        assert!(!response(302).is_success());
        assert!(!response(500).is_success());
    }

    #[test]
    fn test_terminal_events() {
        assert!(!TransportEvent::Progress { loaded: 1, total: 2 }.is_terminal());
        assert!(TransportEvent::Failed("x".into()).is_terminal());
    }

    #[tokio::test]
    async fn test_missing_file_fails_without_response() {
        let dir = tempfile::tempdir().unwrap();
        let file = SourceFile::new(dir.path().join("gone.bin"), 3);
        let transport = HttpTransport::with_client(Client::new());

        let mut transfer = transport.send(&file, "http://127.0.0.1:9/api/v1/upload");
        assert!(transfer.abort.is_some());
        match transfer.events.recv().await {
            Some(TransportEvent::Failed(msg)) => assert!(msg.starts_with("Failed to open")),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
