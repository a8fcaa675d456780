//! JSON-RPC client over a single socket
//!
//! Two tasks own the socket halves. The writer drains an unbounded queue
//! of outgoing messages, the reader routes responses to the waiting
//! callers by request id, broadcasts notifications and turns down any
//! request the server sends.

mod handler;

pub use handler::{ErrorAction, ErrorHandler, LogErrors};

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use adt_core::{RpcError, TransportError};
use adt_protocol::{
    FrameCodec, Message, Method, Notification, ProtocolError, Request, RequestId, Response,
    ResponseError,
};
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;

use crate::transport::SocketEstablisher;

/// How long `stop` waits for queued frames to be flushed
const STOP_GRACE: Duration = Duration::from_secs(2);

type Pending = DashMap<RequestId, oneshot::Sender<Response>>;

pub struct RpcClient {
    outgoing: mpsc::UnboundedSender<Message>,
    pending: Arc<Pending>,
    next_id: AtomicI64,
    notifications: broadcast::Sender<Notification>,
    running: Arc<AtomicBool>,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl RpcClient {
    /// Connect to the language server and start the I/O tasks
    pub async fn start(
        establisher: &SocketEstablisher,
        handler: Arc<dyn ErrorHandler>,
    ) -> Result<Self, TransportError> {
        let stream = establisher.establish().await?;
        tracing::debug!("Connected to language server at {}", establisher.address());
        Ok(Self::from_stream(stream, handler))
    }

    /// Run the client over an already connected stream
    pub fn from_stream<S>(stream: S, handler: Arc<dyn ErrorHandler>) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        let (outgoing, queue) = mpsc::unbounded_channel();
        let (notifications, _) = broadcast::channel(64);
        let pending = Arc::new(Pending::new());
        let running = Arc::new(AtomicBool::new(true));
        let cancel = CancellationToken::new();

        let writer = tokio::spawn(write_loop(
            FramedWrite::new(write_half, FrameCodec::new()),
            queue,
            Arc::clone(&handler),
            cancel.clone(),
        ));

        let reader = tokio::spawn(read_loop(
            FramedRead::new(read_half, FrameCodec::new()),
            ReaderContext {
                outgoing: outgoing.clone(),
                pending: Arc::clone(&pending),
                notifications: notifications.clone(),
                running: Arc::clone(&running),
                handler,
                cancel: cancel.clone(),
            },
        ));

        Self {
            outgoing,
            pending,
            next_id: AtomicI64::new(1),
            notifications,
            running,
            cancel,
            tasks: Mutex::new(vec![reader, writer]),
        }
    }

    /// Call a typed method and wait for its result
    pub async fn invoke<M: Method>(&self, params: M::Params) -> Result<M::Result, RpcError> {
        let params = serde_json::to_value(&params)
            .map_err(|e| TransportError::Protocol(ProtocolError::Json(e)))?;
        let value = self.invoke_raw(M::NAME, params).await?;
        serde_json::from_value(value).map_err(|source| RpcError::InvalidResult {
            method: M::NAME.to_string(),
            source,
        })
    }

    /// Call a method by name
    ///
    /// Dropping the returned future abandons the call. The server is not
    /// told and its eventual response is discarded.
    pub async fn invoke_raw(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        if !self.is_running() {
            return Err(TransportError::Closed.into());
        }

        let id = RequestId::Number(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id.clone(), tx);
        let _abandon = AbandonOnDrop {
            pending: &self.pending,
            id: id.clone(),
        };

        // The reader clears pending calls only after it stopped running.
        if !self.running.load(Ordering::SeqCst) {
            return Err(TransportError::Closed.into());
        }

        tracing::debug!("-> {} #{}", method, id);
        self.outgoing
            .send(Request::new(id, method, params).into())
            .map_err(|_| TransportError::Closed)?;

        let response = rx.await.map_err(|_| TransportError::Closed)?;
        Ok(response.into_result()?)
    }

    /// Send a notification
    pub fn notify(&self, method: &str, params: Value) -> Result<(), RpcError> {
        if !self.is_running() {
            return Err(TransportError::Closed.into());
        }
        self.outgoing
            .send(Notification::new(method, params).into())
            .map_err(|_| TransportError::Closed)?;
        Ok(())
    }

    pub fn subscribe_notifications(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst) && !self.cancel.is_cancelled()
    }

    /// Flush what was written and close the socket
    pub async fn stop(&self) {
        self.cancel.cancel();
        for handle in self.take_tasks() {
            let abort = handle.abort_handle();
            if tokio::time::timeout(STOP_GRACE, handle).await.is_err() {
                tracing::warn!("Language server socket did not close in time");
                abort.abort();
            }
        }
        self.running.store(false, Ordering::SeqCst);
        self.pending.clear();
    }

    /// Drop the socket immediately
    pub fn kill(&self) {
        self.cancel.cancel();
        for handle in self.take_tasks() {
            handle.abort();
        }
        self.running.store(false, Ordering::SeqCst);
        self.pending.clear();
    }

    fn take_tasks(&self) -> Vec<JoinHandle<()>> {
        match self.tasks.lock() {
            Ok(mut tasks) => std::mem::take(&mut *tasks),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl Drop for RpcClient {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct AbandonOnDrop<'a> {
    pending: &'a Pending,
    id: RequestId,
}

impl Drop for AbandonOnDrop<'_> {
    fn drop(&mut self) {
        self.pending.remove(&self.id);
    }
}

async fn write_loop<W>(
    mut sink: FramedWrite<W, FrameCodec>,
    mut queue: mpsc::UnboundedReceiver<Message>,
    handler: Arc<dyn ErrorHandler>,
    cancel: CancellationToken,
) where
    W: AsyncWrite + Unpin,
{
    loop {
        let message = tokio::select! {
            _ = cancel.cancelled() => break,
            message = queue.recv() => match message {
                Some(message) => message,
                None => break,
            },
        };

        if let Err(e) = sink.send(message).await {
            tracing::error!("Failed to write to language server: {}", e);
            if handler.error(&e) == ErrorAction::Shutdown || matches!(e, ProtocolError::Io(_)) {
                cancel.cancel();
                break;
            }
        }
    }

    if let Err(e) = sink.close().await {
        tracing::debug!("Error closing language server socket: {}", e);
    }
}

struct ReaderContext {
    outgoing: mpsc::UnboundedSender<Message>,
    pending: Arc<Pending>,
    notifications: broadcast::Sender<Notification>,
    running: Arc<AtomicBool>,
    handler: Arc<dyn ErrorHandler>,
    cancel: CancellationToken,
}

async fn read_loop<R>(mut stream: FramedRead<R, FrameCodec>, ctx: ReaderContext)
where
    R: AsyncRead + Unpin,
{
    loop {
        let frame = tokio::select! {
            _ = ctx.cancel.cancelled() => break,
            frame = stream.next() => frame,
        };

        let frame = match frame {
            Some(Ok(frame)) => frame,
            Some(Err(e)) => {
                // The stream cannot resynchronise after a framing error.
                ctx.handler.error(&e);
                break;
            }
            None => break,
        };

        match frame.parse() {
            Ok(Message::Response(response)) => dispatch_response(&ctx, response),
            Ok(Message::Notification(notification)) => {
                tracing::debug!("<- {}", notification.method);
                let _ = ctx.notifications.send(notification);
            }
            Ok(Message::Request(request)) => {
                tracing::debug!("<- unsupported server request {}", request.method);
                let reply = Response::failure(
                    Some(request.id),
                    ResponseError::method_not_found(&request.method),
                );
                let _ = ctx.outgoing.send(reply.into());
            }
            Err(e) => {
                if ctx.handler.error(&e) == ErrorAction::Shutdown {
                    break;
                }
            }
        }
    }

    ctx.running.store(false, Ordering::SeqCst);
    ctx.pending.clear();

    if !ctx.cancel.is_cancelled() {
        ctx.handler.closed();
        ctx.cancel.cancel();
    }
}

fn dispatch_response(ctx: &ReaderContext, response: Response) {
    let Some(id) = response.id.clone() else {
        tracing::warn!(
            "Language server reported an error without request id: {:?}",
            response.error
        );
        return;
    };

    match ctx.pending.remove(&id) {
        Some((_, waiter)) => {
            tracing::debug!("<- response #{}", id);
            let _ = waiter.send(response);
        }
        None => tracing::debug!("Dropping response for abandoned request #{}", id),
    }
}
