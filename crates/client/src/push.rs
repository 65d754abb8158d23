//! Push channel: the service's event stream
//!
//! Connects to the server-sent event endpoint and forwards every decoded
//! frame, in arrival order, into an mpsc channel. The stream does not
//! reconnect by itself; when it ends, the handle reports the loss and the
//! session owner decides whether to establish a new one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use reqwest::StatusCode;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use dra_core::event::PushEvent;

use crate::config::ClientConfig;
use crate::credentials::CredentialStore;
use crate::error::{ApiError, Result};
use crate::gateway::transport_error;

/// Event stream endpoint
pub const EVENTS_PATH: &str = "/api/events";

/// Factory for live push connections
pub struct PushChannel {
    client: reqwest::Client,
    base_url: String,
    credentials: Arc<dyn CredentialStore>,
}

impl PushChannel {
    pub fn new(config: &ClientConfig, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            // No request timeout here: the stream is meant to stay open
            client: reqwest::Client::new(),
            base_url: config.base_url.clone(),
            credentials,
        }
    }

    /// Open the stream and spawn a reader that forwards decoded events
    /// into `events` until the remote side closes, the receiver is
    /// dropped, or the returned handle disconnects.
    pub async fn connect(&self, events: mpsc::Sender<PushEvent>) -> Result<PushHandle> {
        let mut request = self
            .client
            .get(format!("{}{}", self.base_url, EVENTS_PATH))
            .header("Accept", "text/event-stream");
        if let Some(token) = self.credentials.get().await {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            if status == StatusCode::UNAUTHORIZED {
                self.credentials.clear().await;
                return Err(ApiError::Unauthorized);
            }
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::server(status.as_u16(), body));
        }

        info!("Push channel connected");
        let (abort_tx, abort_rx) = oneshot::channel();
        let connected = Arc::new(AtomicBool::new(true));
        tokio::spawn(forward_stream(
            response.bytes_stream(),
            events,
            abort_rx,
            connected.clone(),
        ));

        Ok(PushHandle {
            abort: Some(abort_tx),
            connected,
        })
    }
}

/// Read the stream to its end, forwarding decoded frames; `connected` is
/// cleared on every exit path.
async fn forward_stream<S, E>(
    mut stream: S,
    events: mpsc::Sender<PushEvent>,
    mut abort_rx: oneshot::Receiver<()>,
    connected: Arc<AtomicBool>,
) where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: std::fmt::Display,
{
    let mut buffer = BytesMut::new();
    'read: loop {
        tokio::select! {
            _ = &mut abort_rx => {
                info!("Push channel disconnected");
                break 'read;
            }
            chunk = stream.next() => {
                match chunk {
                    Some(Ok(bytes)) => {
                        for frame in extract_frames(&mut buffer, &bytes) {
                            match PushEvent::decode(&frame) {
                                Ok(Some(event)) => {
                                    if events.send(event).await.is_err() {
                                        debug!("Push receiver dropped, stopping reader");
                                        break 'read;
                                    }
                                }
                                Ok(None) => debug!("Skipping push frame with no consumer"),
                                Err(err) => debug!("Skipping malformed push frame: {}", err),
                            }
                        }
                    }
                    Some(Err(err)) => {
                        warn!("Push stream error: {}", err);
                        break 'read;
                    }
                    None => {
                        info!("Push stream ended");
                        break 'read;
                    }
                }
            }
        }
    }
    connected.store(false, Ordering::SeqCst);
}

/// Disposer for a live push connection
///
/// Dropping the handle disconnects; calling [`PushHandle::disconnect`]
/// more than once is a no-op.
#[derive(Debug)]
pub struct PushHandle {
    abort: Option<oneshot::Sender<()>>,
    connected: Arc<AtomicBool>,
}

impl PushHandle {
    /// True while the reader behind the stream is still running
    ///
    /// Turns false once the stream ends or the handle disconnects.
    /// Reconnecting is the owner's decision.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn disconnect(&mut self) {
        if let Some(abort) = self.abort.take() {
            let _ = abort.send(());
            self.connected.store(false, Ordering::SeqCst);
        }
    }
}

impl Drop for PushHandle {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Fold a stream chunk into the line buffer and pull out every complete
/// `data:` payload. Comment and event-name lines are skipped. Lines are
/// split on raw bytes, so a multi-byte character cut by a chunk boundary
/// stays buffered until its line completes.
fn extract_frames(buffer: &mut BytesMut, chunk: &[u8]) -> Vec<String> {
    buffer.extend_from_slice(chunk);

    let mut frames = Vec::new();
    while let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
        let line = buffer.split_to(newline_pos + 1);
        let line = String::from_utf8_lossy(&line[..newline_pos]);
        let line = line.trim();

        if let Some(data) = line.strip_prefix("data:") {
            let data = data.trim();
            if !data.is_empty() {
                frames.push(data.to_string());
            }
        }
    }
    frames
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    fn live_handle(abort: oneshot::Sender<()>) -> PushHandle {
        PushHandle {
            abort: Some(abort),
            connected: Arc::new(AtomicBool::new(true)),
        }
    }

    #[test]
    fn test_extract_single_frame() {
        let mut buffer = BytesMut::new();
        let frames = extract_frames(&mut buffer, b"data: {\"type\":\"task_update\"}\n\n");
        assert_eq!(frames, vec![r#"{"type":"task_update"}"#.to_string()]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_frame_split_across_chunks() {
        let mut buffer = BytesMut::new();
        let frames = extract_frames(&mut buffer, b"data: {\"type\":\"task_");
        assert!(frames.is_empty());

        let frames = extract_frames(&mut buffer, b"cancelled\"}\n");
        assert_eq!(frames, vec![r#"{"type":"task_cancelled"}"#.to_string()]);
    }

    #[test]
    fn test_multibyte_character_split_across_chunks() {
        let mut buffer = BytesMut::new();
        let payload = "data: {\"q\":\"café\"}\n";
        // The cut lands between the two bytes of the accented character
        let cut = payload.find('é').unwrap() + 1;

        let frames = extract_frames(&mut buffer, &payload.as_bytes()[..cut]);
        assert!(frames.is_empty());

        let frames = extract_frames(&mut buffer, &payload.as_bytes()[cut..]);
        assert_eq!(frames, vec![r#"{"q":"café"}"#.to_string()]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_multiple_frames_in_one_chunk() {
        let mut buffer = BytesMut::new();
        let frames = extract_frames(&mut buffer, b"data: {\"a\":1}\n\ndata: {\"b\":2}\n\n");
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1], r#"{"b":2}"#);
    }

    #[test]
    fn test_non_data_lines_are_skipped() {
        let mut buffer = BytesMut::new();
        let frames = extract_frames(
            &mut buffer,
            b": keepalive\nevent: task_update\ndata: {\"c\":3}\n",
        );
        assert_eq!(frames, vec![r#"{"c":3}"#.to_string()]);
    }

    #[test]
    fn test_data_prefix_without_space() {
        let mut buffer = BytesMut::new();
        let frames = extract_frames(&mut buffer, b"data:{\"d\":4}\n");
        assert_eq!(frames, vec![r#"{"d":4}"#.to_string()]);
    }

    #[tokio::test]
    async fn test_reader_forwards_frames_and_reports_stream_end() {
        let (events_tx, mut events_rx) = mpsc::channel(8);
        let (_abort_tx, abort_rx) = oneshot::channel();
        let connected = Arc::new(AtomicBool::new(true));

        let chunks: Vec<std::result::Result<Bytes, Infallible>> = vec![Ok(Bytes::from_static(
            b"data: {\"type\":\"task_update\",\"taskId\":\"task_1\",\"progress\":40}\n",
        ))];
        forward_stream(
            futures::stream::iter(chunks),
            events_tx,
            abort_rx,
            connected.clone(),
        )
        .await;

        match events_rx.recv().await {
            Some(PushEvent::Task(update)) => assert_eq!(update.progress, Some(0.4)),
            other => panic!("expected a task event, got {other:?}"),
        }
        assert!(!connected.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_reader_stops_on_abort() {
        let (events_tx, _events_rx) = mpsc::channel(8);
        let (abort_tx, abort_rx) = oneshot::channel();
        let connected = Arc::new(AtomicBool::new(true));

        // A stream that never yields parks the reader on the abort arm
        let reader = tokio::spawn(forward_stream(
            futures::stream::pending::<std::result::Result<Bytes, Infallible>>(),
            events_tx,
            abort_rx,
            connected.clone(),
        ));
        abort_tx.send(()).unwrap();
        reader.await.unwrap();

        assert!(!connected.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let (abort_tx, mut abort_rx) = oneshot::channel::<()>();
        let mut handle = live_handle(abort_tx);
        assert!(handle.is_connected());

        handle.disconnect();
        assert!(abort_rx.try_recv().is_ok());
        assert!(!handle.is_connected());

        // Second call finds nothing left to do
        handle.disconnect();
    }

    #[tokio::test]
    async fn test_drop_disconnects() {
        let (abort_tx, mut abort_rx) = oneshot::channel::<()>();
        drop(live_handle(abort_tx));
        assert!(abort_rx.try_recv().is_ok());
    }
}
