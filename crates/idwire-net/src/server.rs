// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// TCP recognition server.
//
// One request/response exchange per connection:
//
//   1. read one length-prefixed frame (bounded by `max_frame_bytes` and, if
//      configured, `io_timeout`)
//   2. decode it as a `ClientMessage`
//   3. run the recognition on the blocking pool, bounded by the engine
//      concurrency semaphore
//   4. write one `ResponseEnvelope` frame and close; after rejecting an
//      oversized frame, the unread payload is drained first so the peer can
//      read the reply
//
// Every connection runs in its own task, so a stalled peer only ever stalls
// itself. Recognition failures, including panics inside the engine, become
// failure envelopes; they never reach the accept loop.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Notify, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use idwire_core::codec::{self, with_deadline};
use idwire_core::config::ServerConfig;
use idwire_core::error::{IdwireError, Result};
use idwire_core::types::{
    ClientMessage, FailureReason, RecognitionRequest, ResponseEnvelope, ServerStatus,
};
use idwire_engine::{Orchestrator, RecognitionEngine};

/// Most bytes read and discarded after rejecting an oversized frame.
const MAX_DRAIN_BYTES: usize = 256 * 1024 * 1024;

/// Drain deadline when no `io_timeout` is configured.
const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// State shared across all connection-handling tasks.
struct SharedState<E: RecognitionEngine> {
    orchestrator: Arc<Orchestrator<E>>,
    /// Bounds simultaneous engine calls; connections themselves are unbounded.
    engine_slots: Arc<Semaphore>,
    active_connections: Arc<AtomicU32>,
    io_timeout: Option<Duration>,
    max_frame_bytes: usize,
}

/// Recognition server bound to one engine.
pub struct RecognitionServer<E: RecognitionEngine> {
    config: ServerConfig,
    orchestrator: Arc<Orchestrator<E>>,
    status: ServerStatus,
    local_addr: Option<SocketAddr>,
    /// Notification handle used to signal a graceful shutdown.
    shutdown_signal: Arc<Notify>,
    /// Handle to the task running the accept loop.
    task_handle: Option<JoinHandle<()>>,
    active_connections: Arc<AtomicU32>,
}

impl<E: RecognitionEngine> RecognitionServer<E> {
    /// Create a server in `Stopped` state. Call [`Self::start`] to listen.
    pub fn new(config: ServerConfig, orchestrator: Orchestrator<E>) -> Self {
        Self {
            config,
            orchestrator: Arc::new(orchestrator),
            status: ServerStatus::Stopped,
            local_addr: None,
            shutdown_signal: Arc::new(Notify::new()),
            task_handle: None,
            active_connections: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn status(&self) -> ServerStatus {
        self.status
    }

    /// Address actually bound, available once running (useful with port 0).
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Number of connections currently being served.
    pub fn active_connections(&self) -> u32 {
        self.active_connections.load(Ordering::Relaxed)
    }

    /// Bind the listener and spawn the accept loop.
    ///
    /// # Errors
    ///
    /// Returns [`IdwireError::Connection`] if the address cannot be bound.
    pub async fn start(&mut self) -> Result<()> {
        if self.status == ServerStatus::Running {
            debug!(port = self.config.port, "recognition server already running");
            return Ok(());
        }

        self.status = ServerStatus::Starting;

        let bind_addr = format!("{}:{}", self.config.bind_addr, self.config.port);
        let listener = match TcpListener::bind(&bind_addr).await {
            Ok(listener) => listener,
            Err(e) => {
                self.status = ServerStatus::Error;
                return Err(IdwireError::Connection(format!("bind {bind_addr}: {e}")));
            }
        };
        let local_addr = listener.local_addr()?;
        let concurrency = self.config.effective_concurrency();

        info!(addr = %local_addr, concurrency, "recognition server listening");

        let shared = Arc::new(SharedState {
            orchestrator: Arc::clone(&self.orchestrator),
            engine_slots: Arc::new(Semaphore::new(concurrency)),
            active_connections: Arc::clone(&self.active_connections),
            io_timeout: self.config.io_timeout,
            max_frame_bytes: self.config.max_frame_bytes,
        });
        let shutdown = Arc::clone(&self.shutdown_signal);

        let handle = tokio::spawn(async move {
            Self::accept_loop(listener, shutdown, shared).await;
        });

        self.task_handle = Some(handle);
        self.local_addr = Some(local_addr);
        self.status = ServerStatus::Running;
        Ok(())
    }

    /// Stop accepting connections and wait for the accept loop to exit.
    ///
    /// Connections already being served run to completion.
    pub async fn stop(&mut self) -> Result<()> {
        if self.status != ServerStatus::Running {
            return Ok(());
        }

        info!(addr = ?self.local_addr, "stopping recognition server");
        self.shutdown_signal.notify_one();

        if let Some(handle) = self.task_handle.take() {
            handle
                .await
                .map_err(|e| IdwireError::Connection(format!("accept loop join: {e}")))?;
        }

        self.status = ServerStatus::Stopped;
        info!("recognition server stopped");
        Ok(())
    }

    /// Accept until shutdown, handing each connection to its own task.
    async fn accept_loop(
        listener: TcpListener,
        shutdown: Arc<Notify>,
        shared: Arc<SharedState<E>>,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.notified() => {
                    debug!("accept loop received shutdown signal");
                    break;
                }

                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, peer_addr)) => {
                            debug!(peer = %peer_addr, "incoming connection");
                            let state = Arc::clone(&shared);
                            tokio::spawn(async move {
                                state.active_connections.fetch_add(1, Ordering::Relaxed);
                                let served =
                                    Self::handle_connection(stream, peer_addr, &state).await;
                                if let Err(e) = served {
                                    warn!(peer = %peer_addr, error = %e, "connection dropped");
                                }
                                state.active_connections.fetch_sub(1, Ordering::Relaxed);
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "failed to accept connection");
                        }
                    }
                }
            }
        }
    }

    /// Serve the single exchange on one connection.
    ///
    /// Framing failures end the connection without a reply. Anything that was
    /// received in full gets exactly one response envelope.
    async fn handle_connection(
        mut stream: TcpStream,
        peer_addr: SocketAddr,
        state: &SharedState<E>,
    ) -> Result<()> {
        let received = with_deadline(
            state.io_timeout,
            "reading request",
            codec::read_frame(&mut stream, state.max_frame_bytes),
        )
        .await;

        // Payload bytes left unread by a rejected frame.
        let mut unread = 0usize;
        let envelope = match received {
            Ok(payload) => {
                debug!(peer = %peer_addr, bytes = payload.len(), "request frame received");
                match codec::decode::<ClientMessage>(&payload) {
                    Ok(ClientMessage::Recognize(request)) => Self::recognize(state, request).await,
                    Ok(ClientMessage::Log(_)) => Self::engine_status(state),
                    Err(e) => {
                        warn!(peer = %peer_addr, error = %e, "request does not match schema");
                        ResponseEnvelope::from_error(&e)
                    }
                }
            }
            Err(e @ IdwireError::FrameTooLarge { len, .. }) => {
                warn!(peer = %peer_addr, error = %e, "request frame rejected");
                unread = len;
                ResponseEnvelope::from_error(&e)
            }
            Err(e) => return Err(e),
        };

        let sent = with_deadline(
            state.io_timeout,
            "writing response",
            codec::write_message(&mut stream, &envelope),
        )
        .await?;

        if let Err(e) = stream.shutdown().await {
            debug!(peer = %peer_addr, error = %e, "shutdown after response failed");
        }
        if unread > 0 {
            Self::drain(&mut stream, peer_addr, unread, state.io_timeout).await;
        }

        match &envelope {
            ResponseEnvelope::Success { response } => info!(
                peer = %peer_addr,
                doc_type = %response.doc_type,
                bytes = sent,
                "recognition response sent"
            ),
            ResponseEnvelope::Failure { desc, reason } => info!(
                peer = %peer_addr,
                reason = ?reason,
                desc = %desc,
                bytes = sent,
                "failure response sent"
            ),
        }
        Ok(())
    }

    /// Discard up to `len` bytes (at most [`MAX_DRAIN_BYTES`]) so a peer still
    /// writing a rejected frame can finish and read the reply instead of
    /// hitting a reset. Best effort; errors only end the drain.
    async fn drain(
        stream: &mut TcpStream,
        peer_addr: SocketAddr,
        len: usize,
        io_timeout: Option<Duration>,
    ) {
        let limit = len.min(MAX_DRAIN_BYTES) as u64;
        let deadline = io_timeout.unwrap_or(DEFAULT_DRAIN_TIMEOUT);
        let mut rest = (&mut *stream).take(limit);
        match tokio::time::timeout(deadline, tokio::io::copy(&mut rest, &mut tokio::io::sink()))
            .await
        {
            Ok(Ok(discarded)) => debug!(peer = %peer_addr, discarded, "rejected payload drained"),
            Ok(Err(e)) => debug!(peer = %peer_addr, error = %e, "drain ended early"),
            Err(_) => debug!(peer = %peer_addr, "drain timed out"),
        }
    }

    /// Run one recognition on the blocking pool and wrap the outcome.
    async fn recognize(state: &SharedState<E>, request: RecognitionRequest) -> ResponseEnvelope {
        let permit = match Arc::clone(&state.engine_slots).acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                return ResponseEnvelope::from_error(&IdwireError::Recognition(format!(
                    "engine unavailable: {e}"
                )));
            }
        };

        let orchestrator = Arc::clone(&state.orchestrator);
        let outcome = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            orchestrator.recognize(&request)
        })
        .await;

        match outcome {
            Ok(Ok(result)) => ResponseEnvelope::success(result),
            Ok(Err(e)) => ResponseEnvelope::from_error(&e),
            Err(e) => {
                error!(error = %e, "recognition task aborted");
                ResponseEnvelope::from_error(&IdwireError::Recognition(format!(
                    "recognition task aborted: {e}"
                )))
            }
        }
    }

    /// Answer a log request with the engine's status.
    fn engine_status(state: &SharedState<E>) -> ResponseEnvelope {
        match state.orchestrator.engine_status() {
            Ok(version) => ResponseEnvelope::failure(
                format!("engine ready: {version}"),
                FailureReason::EngineStatus,
            ),
            Err(e) => ResponseEnvelope::from_error(&e),
        }
    }
}
