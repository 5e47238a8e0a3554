//! Native-messaging framing between the extension and the engine.
//!
//! Every message in either direction is a UTF-8 JSON body preceded by its
//! length as a 32-bit unsigned integer in native byte order. Inbound frames
//! carry either a request for the engine or the answer to a `checkVideo`
//! probe the daemon sent earlier:
//!
//! ```text
//! {"id": 7, "request": {"action": "getTime"}}
//! {"id": 3, "response": {"category": "productive"}}
//! ```
//!
//! Outbound frames answer requests, probe a tab, or push a notification:
//!
//! ```text
//! {"id": 7, "response": {...}}
//! {"id": 3, "tabId": 12, "request": {"action": "checkVideo"}}
//! {"notification": {"kind": "top_rank", ...}}
//! ```

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mission_focus_core::accounting::{Category, TabId};
use mission_focus_core::{
    EngineError, EngineHandle, EngineRequest, EngineResponse, Notification, Notifier,
    ObserverRequest, ObserverResponse, TabProbe,
};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Inbound {
    Request { id: u64, request: EngineRequest },
    Response { id: u64, response: ObserverResponse },
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Outbound {
    Response {
        id: u64,
        response: EngineResponse,
    },
    Error {
        id: u64,
        error: String,
    },
    Probe {
        id: u64,
        #[serde(rename = "tabId")]
        tab_id: TabId,
        request: ObserverRequest,
    },
    Notification {
        notification: Notification,
    },
}

pub type OutboundTx = mpsc::UnboundedSender<Outbound>;

/// Largest message the browser accepts from a native host.
pub const MAX_OUTBOUND_FRAME: usize = 1024 * 1024;
/// Inbound frames beyond this mean the stream lost sync.
pub const MAX_INBOUND_FRAME: usize = 64 * 1024 * 1024;

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<ObserverResponse>>>>;

// ── Probe ──

/// Sends `checkVideo` to the extension and waits for the matching reply.
#[derive(Clone)]
pub struct BridgeProbe {
    out: OutboundTx,
    pending: Pending,
    next_id: Arc<AtomicU64>,
}

impl BridgeProbe {
    pub fn new(out: OutboundTx) -> Self {
        Self {
            out,
            pending: Arc::default(),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Hand a probe answer to its waiter. Unknown or late ids are dropped.
    pub fn resolve(&self, id: u64, response: ObserverResponse) {
        let waiter = self
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id);
        match waiter {
            Some(tx) => {
                let _ = tx.send(response);
            }
            None => tracing::debug!(id, "probe reply with no waiter"),
        }
    }

    fn forget(&self, id: u64) {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id);
    }
}

/// Removes the pending entry when the probe future is dropped (timeout).
struct PendingGuard<'a> {
    probe: &'a BridgeProbe,
    id: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.probe.forget(self.id);
    }
}

#[async_trait]
impl TabProbe for BridgeProbe {
    async fn check_video(&self, tab: TabId) -> Option<Category> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, tx);
        let _guard = PendingGuard { probe: self, id };

        let probe = Outbound::Probe {
            id,
            tab_id: tab,
            request: ObserverRequest::CheckVideo,
        };
        if self.out.send(probe).is_err() {
            return None;
        }
        rx.await.ok().and_then(|r| r.category)
    }
}

// ── Notifier ──

/// Pushes notifications to the extension as `{"notification": ...}` frames.
pub struct BridgeNotifier {
    out: OutboundTx,
}

impl BridgeNotifier {
    pub fn new(out: OutboundTx) -> Self {
        Self { out }
    }
}

impl Notifier for BridgeNotifier {
    fn notify(&self, notification: &Notification) {
        tracing::info!(kind = ?notification.kind, "{}", notification.title);
        let frame = Outbound::Notification {
            notification: notification.clone(),
        };
        if self.out.send(frame).is_err() {
            tracing::debug!("output closed, notification dropped");
        }
    }
}

// ── Framing ──

/// Read one length-prefixed frame. `None` on a clean end of input.
pub async fn read_frame<R>(reader: &mut R) -> io::Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut len = [0u8; 4];
    match reader.read_exact(&mut len).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }
    let len = u32::from_ne_bytes(len) as usize;
    if len > MAX_INBOUND_FRAME {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame of {len} bytes exceeds {MAX_INBOUND_FRAME}"),
        ));
    }
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(Some(body))
}

/// Write `body` behind its length prefix and flush.
pub async fn write_frame<W>(writer: &mut W, body: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let len = u32::try_from(body.len())
        .ok()
        .filter(|_| body.len() <= MAX_OUTBOUND_FRAME)
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("frame of {} bytes exceeds {MAX_OUTBOUND_FRAME}", body.len()),
            )
        })?;
    writer.write_all(&len.to_ne_bytes()).await?;
    writer.write_all(body).await?;
    writer.flush().await
}

// ── Loops ──

/// Read inbound frames until EOF or cancellation.
///
/// Requests are queued on the engine here, in arrival order. Only the wait
/// for each reply runs in its own task, so a slow answer (remote
/// classification) never holds up probe replies behind it.
pub async fn read_loop<R>(
    mut reader: R,
    handle: EngineHandle,
    probe: BridgeProbe,
    out: OutboundTx,
    cancel: CancellationToken,
) where
    R: AsyncRead + Unpin,
{
    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => break,
            frame = read_frame(&mut reader) => frame,
        };
        let body = match frame {
            Ok(Some(body)) => body,
            Ok(None) => {
                tracing::info!("input closed");
                break;
            }
            Err(e) => {
                tracing::warn!("failed to read input: {e}");
                break;
            }
        };

        match serde_json::from_slice::<Inbound>(&body) {
            Ok(Inbound::Request { id, request }) => {
                let timeout = handle.timeout_for(&request);
                let queued = tokio::select! {
                    _ = cancel.cancelled() => break,
                    queued = handle.enqueue(request) => queued,
                };
                match queued {
                    Ok(pending) => {
                        let out = out.clone();
                        tokio::spawn(async move {
                            let _ = out.send(reply_frame(id, pending.wait(timeout).await));
                        });
                    }
                    Err(e) => {
                        let _ = out.send(reply_frame(id, Err(e)));
                    }
                }
            }
            Ok(Inbound::Response { id, response }) => probe.resolve(id, response),
            Err(e) => {
                tracing::warn!("malformed input frame: {e}");
                if let Some(id) = frame_id(&body) {
                    let _ = out.send(Outbound::Error {
                        id,
                        error: e.to_string(),
                    });
                }
            }
        }
    }
}

/// Serialize outbound frames until every sender is gone.
pub async fn write_loop<W>(writer: W, mut rx: mpsc::UnboundedReceiver<Outbound>)
where
    W: AsyncWrite + Unpin,
{
    let mut writer = writer;
    while let Some(frame) = rx.recv().await {
        let body = match serde_json::to_vec(&frame) {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!("failed to encode frame: {e}");
                continue;
            }
        };
        if body.len() > MAX_OUTBOUND_FRAME {
            tracing::warn!(len = body.len(), "outbound frame too large, dropped");
            continue;
        }
        if let Err(e) = write_frame(&mut writer, &body).await {
            tracing::warn!("failed to write output: {e}");
            break;
        }
    }
}

fn reply_frame(id: u64, reply: Result<EngineResponse, EngineError>) -> Outbound {
    match reply {
        Ok(response) => Outbound::Response { id, response },
        Err(e) => Outbound::Error {
            id,
            error: e.to_string(),
        },
    }
}

/// Best-effort id of a frame that failed to parse.
fn frame_id(body: &[u8]) -> Option<u64> {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()?
        .get("id")?
        .as_u64()
}
