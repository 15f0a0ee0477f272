//! Connection state machine and lifecycle tracking.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Track every open connection and its state in a shared registry
//! - Drive one request/response exchange per connection
//! - Abandon the exchange when shutdown fires
//!
//! # Connection States
//! ```text
//! Connecting → Ready → Receiving → Processing → Sending → Closed
//!                  ↘ Failed (peer error, timeout, cancellation)
//! ```

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::broadcast;
use tokio::time::timeout;

use crate::config::{ListenerConfig, TimeoutConfig};
use crate::http::error::ApiError;
use crate::http::parser::{self, Frame, ParseError};
use crate::http::response::Response;
use crate::http::service::AutomationService;
use crate::observability::metrics;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

const READ_CHUNK: usize = 4096;

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Ready,
    Receiving,
    Processing,
    Sending,
    Closed,
    Failed,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    peer: SocketAddr,
    state: ConnectionState,
}

/// The set of open connections for one server.
///
/// Entries are inserted on accept and removed when the connection's
/// [`ConnectionGuard`] drops, so the set never holds terminal entries
/// for long.
#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    inner: Arc<Mutex<HashMap<ConnectionId, Entry>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection. Returns a guard that removes it on drop.
    pub fn track(&self, peer: SocketAddr) -> ConnectionGuard {
        let id = ConnectionId::new();
        let count = {
            let mut map = self.lock();
            map.insert(
                id,
                Entry {
                    peer,
                    state: ConnectionState::Connecting,
                },
            );
            map.len()
        };
        metrics::record_active_connections(count);
        ConnectionGuard {
            registry: self.clone(),
            id,
        }
    }

    pub fn active_count(&self) -> usize {
        self.lock().len()
    }

    pub fn state(&self, id: ConnectionId) -> Option<ConnectionState> {
        self.lock().get(&id).map(|e| e.state)
    }

    pub fn peer(&self, id: ConnectionId) -> Option<SocketAddr> {
        self.lock().get(&id).map(|e| e.peer)
    }

    /// Forget every connection. Their guards become no-ops.
    pub fn clear(&self) {
        self.lock().clear();
        metrics::record_active_connections(0);
    }

    fn set_state(&self, id: ConnectionId, state: ConnectionState) {
        if let Some(entry) = self.lock().get_mut(&id) {
            entry.state = state;
        }
    }

    fn remove(&self, id: ConnectionId) {
        let count = {
            let mut map = self.lock();
            map.remove(&id);
            map.len()
        };
        metrics::record_active_connections(count);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ConnectionId, Entry>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Guard that tracks a connection's lifetime.
/// Removes the connection from its registry when dropped.
#[derive(Debug)]
pub struct ConnectionGuard {
    registry: ConnectionRegistry,
    id: ConnectionId,
}

impl ConnectionGuard {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn set_state(&self, state: ConnectionState) {
        self.registry.set_state(self.id, state);
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.registry.remove(self.id);
        tracing::trace!(connection_id = %self.id, "Connection closed");
    }
}

/// Why a connection ended without sending a response.
#[derive(Debug)]
enum Abort {
    Io(std::io::Error),
    PeerClosed,
    ReadTimeout,
    WriteTimeout,
}

impl std::fmt::Display for Abort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Abort::Io(e) => write!(f, "I/O error: {}", e),
            Abort::PeerClosed => write!(f, "peer closed before a request was received"),
            Abort::ReadTimeout => write!(f, "timed out reading request"),
            Abort::WriteTimeout => write!(f, "timed out writing response"),
        }
    }
}

/// Limits applied to a single exchange.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionLimits {
    pub max_request_bytes: usize,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub handler_timeout: Duration,
}

impl ConnectionLimits {
    pub fn new(listener: &ListenerConfig, timeouts: &TimeoutConfig) -> Self {
        Self {
            max_request_bytes: listener.max_request_bytes,
            read_timeout: Duration::from_secs(timeouts.read_secs),
            write_timeout: Duration::from_secs(timeouts.write_secs),
            handler_timeout: Duration::from_secs(timeouts.handler_secs),
        }
    }
}

/// One accepted client: read a request, answer it, close.
pub struct Connection<S> {
    stream: S,
    peer: SocketAddr,
    guard: ConnectionGuard,
    limits: ConnectionLimits,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, peer: SocketAddr, guard: ConnectionGuard, limits: ConnectionLimits) -> Self {
        guard.set_state(ConnectionState::Ready);
        Self {
            stream,
            peer,
            guard,
            limits,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.guard.id()
    }

    /// Run the exchange to completion or until `shutdown` fires.
    ///
    /// Cancellation drops the in-flight handler future, so a domain call
    /// whose caller went away does not keep running.
    pub async fn run(mut self, service: Arc<AutomationService>, mut shutdown: broadcast::Receiver<()>) -> ConnectionState {
        let id = self.id();
        let peer = self.peer;

        let outcome = tokio::select! {
            result = self.exchange(&service) => result,
            _ = shutdown.recv() => {
                tracing::debug!(connection_id = %id, peer_addr = %peer, "Connection cancelled by shutdown");
                self.guard.set_state(ConnectionState::Failed);
                return ConnectionState::Failed;
            }
        };

        let state = match outcome {
            Ok(()) => ConnectionState::Closed,
            Err(Abort::PeerClosed) => {
                tracing::debug!(connection_id = %id, peer_addr = %peer, "Peer closed without a request");
                ConnectionState::Closed
            }
            Err(e) => {
                tracing::warn!(connection_id = %id, peer_addr = %peer, error = %e, "Connection failed");
                ConnectionState::Failed
            }
        };
        let _ = self.stream.shutdown().await;
        self.guard.set_state(state);
        state
    }

    async fn exchange(&mut self, service: &AutomationService) -> Result<(), Abort> {
        self.guard.set_state(ConnectionState::Receiving);
        let response = match timeout(self.limits.read_timeout, self.read_request()).await {
            Err(_) => return Err(Abort::ReadTimeout),
            Ok(Err(ReadFailure::Abort(abort))) => return Err(abort),
            Ok(Err(ReadFailure::Parse(e))) => {
                tracing::debug!(connection_id = %self.id(), error = %e, "Rejecting malformed request");
                metrics::record_parse_failure();
                ApiError::from(e).into_response()
            }
            Ok(Ok(bytes)) => {
                self.guard.set_state(ConnectionState::Processing);
                self.process(service, &bytes).await
            }
        };

        self.guard.set_state(ConnectionState::Sending);
        let bytes = response.to_bytes();
        match timeout(self.limits.write_timeout, self.stream.write_all(&bytes)).await {
            Err(_) => Err(Abort::WriteTimeout),
            Ok(Err(e)) => Err(Abort::Io(e)),
            Ok(Ok(())) => {
                let _ = self.stream.flush().await;
                Ok(())
            }
        }
    }

    async fn process(&self, service: &AutomationService, bytes: &[u8]) -> Response {
        let request = match parser::parse(bytes) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!(connection_id = %self.id(), error = %e, "Rejecting malformed request");
                metrics::record_parse_failure();
                return ApiError::from(e).into_response();
            }
        };

        match timeout(self.limits.handler_timeout, service.handle(request, self.peer)).await {
            Ok(response) => response,
            Err(_) => {
                tracing::warn!(connection_id = %self.id(), peer_addr = %self.peer, "Handler timed out");
                ApiError::Internal("Request timed out".to_string()).into_response()
            }
        }
    }

    /// Read until [`parser::frame`] reports a complete request.
    async fn read_request(&mut self) -> Result<Vec<u8>, ReadFailure> {
        let limit = self.limits.max_request_bytes;
        let mut buf: Vec<u8> = Vec::with_capacity(READ_CHUNK);
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            let n = self.stream.read(&mut chunk).await.map_err(|e| ReadFailure::Abort(Abort::Io(e)))?;
            if n == 0 {
                if buf.is_empty() {
                    return Err(ReadFailure::Abort(Abort::PeerClosed));
                }
                // Peer half-closed mid-request: parse what arrived so the
                // caller gets a precise 400.
                return match parser::frame(&buf, limit)? {
                    Frame::Complete(total) => {
                        buf.truncate(total);
                        Ok(buf)
                    }
                    Frame::Incomplete => Ok(buf),
                };
            }
            buf.extend_from_slice(&chunk[..n]);

            if let Frame::Complete(total) = parser::frame(&buf, limit)? {
                buf.truncate(total);
                return Ok(buf);
            }
        }
    }
}

enum ReadFailure {
    Abort(Abort),
    Parse(ParseError),
}

impl From<ParseError> for ReadFailure {
    fn from(e: ParseError) -> Self {
        ReadFailure::Parse(e)
    }
}
