use crate::lsp::error::{LspError, Result};
use crate::lsp::protocol::{encode_message, write_lsp_message, IncomingMessage, OutgoingMessage};
use dashmap::DashMap;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, trace};

/// One-shot continuation run when the response to a request arrives.
pub type ResponseHandler = Box<dyn FnOnce(Result<Value>) -> BoxFuture<'static, ()> + Send + Sync>;

type PendingRequests = Arc<DashMap<i32, ResponseHandler>>;
type SharedWriter = Arc<Mutex<Box<dyn AsyncWrite + Send + Unpin>>>;

/// What the caller expects back for an outbound message.
pub enum Dispatch {
    /// A request whose response is handed to the handler exactly once.
    Request(ResponseHandler),
    /// Fire-and-forget; no id is allocated and nothing is registered.
    Notification,
}

/// Wraps an async closure into a [`ResponseHandler`].
pub fn handler<F, Fut>(f: F) -> ResponseHandler
where
    F: FnOnce(Result<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Box::new(move |result| f(result).boxed())
}

/// Allocates request ids, owns the pending-response table and matches
/// responses back to the requests that produced them.
///
/// Cloning is cheap: every clone shares the same writer, counter and table.
#[derive(Clone)]
pub struct Dispatcher {
    writer: SharedWriter,
    pending: PendingRequests,
    next_id: Arc<AtomicI32>,
    closed: Arc<AtomicBool>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("pending", &self.pending.len())
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .finish()
    }
}

impl Dispatcher {
    pub fn new<W>(writer: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            writer: Arc::new(Mutex::new(Box::new(writer))),
            pending: Arc::new(DashMap::new()),
            next_id: Arc::new(AtomicI32::new(1)),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Sends a message and returns the allocated id for requests.
    ///
    /// The handler is registered before the frame is written so a fast reply
    /// always finds it. If the write fails the handler is removed and dropped
    /// without being invoked, which releases anything it captured.
    pub async fn send(&self, method: &str, params: Value, dispatch: Dispatch) -> Result<Option<i32>> {
        let (id, frame) = match dispatch {
            Dispatch::Request(handler) => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                self.pending.insert(id, handler);
                if self.closed.load(Ordering::SeqCst) {
                    self.pending.remove(&id);
                    return Err(LspError::ConnectionClosed);
                }
                match encode_message(&OutgoingMessage::request(id, method, &params)) {
                    Ok(frame) => (Some(id), frame),
                    Err(e) => {
                        self.pending.remove(&id);
                        return Err(e.into());
                    },
                }
            },
            Dispatch::Notification => (None, encode_message(&OutgoingMessage::notification(method, &params))?),
        };

        trace!(?id, method, "sending message");
        let write_result = {
            let mut writer = self.writer.lock().await;
            write_lsp_message(&mut *writer, &frame).await
        };

        if let Err(e) = write_result {
            if let Some(id) = id {
                self.pending.remove(&id);
            }
            return Err(LspError::Write(e));
        }
        Ok(id)
    }

    /// Sends a request and waits for its result.
    pub async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let (tx, rx) = oneshot::channel();
        let id = self
            .send(
                method,
                params,
                Dispatch::Request(handler(move |result| async move {
                    let _ = tx.send(result);
                })),
            )
            .await?
            .unwrap_or_default();

        match rx.await {
            Ok(result) => result,
            Err(_) => Err(LspError::HandlerDropped(id)),
        }
    }

    pub async fn notify(&self, method: &str, params: Value) -> Result<()> {
        self.send(method, params, Dispatch::Notification).await?;
        Ok(())
    }

    /// Routes an inbound message to its pending handler.
    ///
    /// The table entry is removed atomically, so a second message reusing the
    /// same id finds nothing. The handler runs on its own task; this call never
    /// waits for it. Returns whether a handler was dispatched.
    pub fn deliver(&self, message: IncomingMessage) -> bool {
        let Some(id) = message.correlation_id() else {
            trace!(method = ?message.method, "uncorrelated message ignored");
            return false;
        };

        let Some((_, handler)) = self.pending.remove(&id) else {
            debug!(id, "id not pending, ignored");
            return false;
        };

        tokio::spawn(handler(message.into_result()));
        true
    }

    /// Drops every pending handler without invoking it and refuses later
    /// requests. Called once no further response can arrive.
    pub fn fail_pending(&self) -> usize {
        self.closed.store(true, Ordering::SeqCst);
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Closes the outbound stream. Every later send fails with a write error.
    pub async fn shutdown(&self) -> std::io::Result<()> {
        let mut writer = self.writer.lock().await;
        writer.shutdown().await
    }
}
