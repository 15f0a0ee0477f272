//! The automation server.
//!
//! # Responsibilities
//! - Own the loopback listener and its accept loop
//! - Spawn one task per accepted connection
//! - Track lifecycle state (stopped → starting → listening → stopped, or failed)
//! - Apply configuration changes to the gate, limiter and listener
//!
//! # Design Decisions
//! - Explicit object, constructed once and shared by handle; no global
//! - All lifecycle mutation goes through one async mutex
//! - An accept failure stops only the listener; the process keeps running
//! - `start()` with the gate closed logs and returns without binding

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::api::{self, ServerInfo};
use crate::config::AutomationConfig;
use crate::http::service::AutomationService;
use crate::library::Library;
use crate::lifecycle::Shutdown;
use crate::net::{Connection, ConnectionLimits, ConnectionRegistry, Listener, ListenerError};
use crate::security::{AutomationGate, RateLimiter};

/// How long `stop()` waits for the accept loop before aborting it.
const ACCEPT_LOOP_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Stopped,
    Starting,
    Listening,
    Failed,
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{0}")]
    Listener(#[from] ListenerError),
}

#[derive(Default)]
struct Running {
    shutdown: Option<Arc<Shutdown>>,
    accept_task: Option<JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
}

/// Embedded HTTP server exposing the automation API on 127.0.0.1.
pub struct AutomationServer {
    config: ArcSwap<AutomationConfig>,
    service: Arc<AutomationService>,
    registry: ConnectionRegistry,
    info: ServerInfo,
    state: Arc<watch::Sender<ServerState>>,
    running: Mutex<Running>,
}

impl AutomationServer {
    /// Build the router and request pipeline. Performs no I/O.
    pub fn new(config: AutomationConfig, library: Arc<dyn Library>) -> Self {
        let info = ServerInfo::default();
        let router = api::routes(library, info.clone());
        let service = AutomationService::new(
            router,
            AutomationGate::new(config.automation.enabled),
            RateLimiter::new(&config.rate_limit),
        );
        let (state, _) = watch::channel(ServerState::Stopped);

        Self {
            config: ArcSwap::from_pointee(config),
            service: Arc::new(service),
            registry: ConnectionRegistry::new(),
            info,
            state: Arc::new(state),
            running: Mutex::new(Running::default()),
        }
    }

    /// Bind and begin accepting connections.
    ///
    /// No-op when already listening or when the automation gate is closed.
    pub async fn start(&self) -> Result<(), ServerError> {
        let mut running = self.running.lock().await;
        self.start_locked(&mut running).await
    }

    /// Cancel the listener and every active connection. Idempotent.
    pub async fn stop(&self) {
        let mut running = self.running.lock().await;
        self.stop_locked(&mut running).await;
    }

    /// Stop, wait for the OS to release the port, start again.
    pub async fn restart(&self) -> Result<(), ServerError> {
        let mut running = self.running.lock().await;
        self.restart_locked(&mut running).await
    }

    /// Apply a new configuration.
    ///
    /// The gate and rate limiter change immediately. The listener is
    /// stopped when the gate closes, started when it opens, and restarted
    /// when listener or timeout settings changed. Concurrent calls and
    /// lifecycle calls are serialized on the running lock.
    pub async fn reconfigure(&self, config: AutomationConfig) -> Result<(), ServerError> {
        let mut running = self.running.lock().await;
        let previous = self.config.swap(Arc::new(config.clone()));
        self.service.limiter().reconfigure(&config.rate_limit);
        self.service.gate().set(config.automation.enabled);

        let listening = self.state() == ServerState::Listening;
        if !config.automation.enabled {
            if listening {
                self.stop_locked(&mut running).await;
            }
            return Ok(());
        }
        if !listening {
            return self.start_locked(&mut running).await;
        }
        if previous.listener != config.listener || previous.timeouts != config.timeouts {
            tracing::info!("Listener settings changed, restarting");
            return self.restart_locked(&mut running).await;
        }
        Ok(())
    }

    pub fn state(&self) -> ServerState {
        *self.state.borrow()
    }

    /// Watch lifecycle transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<ServerState> {
        self.state.subscribe()
    }

    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().await.local_addr
    }

    pub fn active_connections(&self) -> usize {
        self.registry.active_count()
    }

    pub fn gate(&self) -> &AutomationGate {
        self.service.gate()
    }

    pub fn config(&self) -> Arc<AutomationConfig> {
        self.config.load_full()
    }

    async fn start_locked(&self, running: &mut Running) -> Result<(), ServerError> {
        if self.state() == ServerState::Listening && running.accept_task.is_some() {
            tracing::debug!("Server already listening");
            return Ok(());
        }
        if !self.service.gate().is_enabled() {
            tracing::info!("Automation API disabled, not binding a listener");
            return Ok(());
        }
        // Leftovers from a failed accept loop.
        if running.shutdown.is_some() || running.accept_task.is_some() {
            self.stop_locked(running).await;
        }

        self.state.send_replace(ServerState::Starting);
        let config = self.config.load_full();

        let listener = match Listener::bind(&config.listener).await {
            Ok(listener) => listener,
            Err(e) => {
                tracing::error!(error = %e, port = config.listener.port, "Failed to start automation server");
                self.state.send_replace(ServerState::Failed);
                return Err(e.into());
            }
        };
        let local_addr = match listener.local_addr() {
            Ok(addr) => addr,
            Err(e) => {
                self.state.send_replace(ServerState::Failed);
                return Err(ListenerError::Bind(e).into());
            }
        };

        let shutdown = Arc::new(Shutdown::new());
        let limits = ConnectionLimits::new(&config.listener, &config.timeouts);
        let task = tokio::spawn(accept_loop(
            listener,
            Arc::clone(&self.service),
            self.registry.clone(),
            limits,
            Arc::clone(&shutdown),
            Arc::clone(&self.state),
        ));

        running.shutdown = Some(shutdown);
        running.accept_task = Some(task);
        running.local_addr = Some(local_addr);
        self.info.set_port(local_addr.port());
        self.state.send_replace(ServerState::Listening);

        tracing::info!(address = %local_addr, "Automation server listening");
        Ok(())
    }

    async fn restart_locked(&self, running: &mut Running) -> Result<(), ServerError> {
        self.stop_locked(running).await;
        let delay = Duration::from_millis(self.config.load().restart_delay_ms);
        tokio::time::sleep(delay).await;
        self.start_locked(running).await
    }

    async fn stop_locked(&self, running: &mut Running) {
        if let Some(shutdown) = running.shutdown.take() {
            let cancelled = shutdown.trigger();
            tracing::debug!(subscribers = cancelled, "Shutdown signalled");
        }
        if let Some(mut task) = running.accept_task.take() {
            if tokio::time::timeout(ACCEPT_LOOP_GRACE, &mut task).await.is_err() {
                tracing::warn!("Accept loop did not exit in time, aborting");
                task.abort();
            }
        }
        self.registry.clear();
        self.info.set_port(0);

        let was_running = running.local_addr.take().is_some();
        self.state.send_replace(ServerState::Stopped);
        if was_running {
            tracing::info!("Automation server stopped");
        }
    }
}

async fn accept_loop(
    listener: Listener,
    service: Arc<AutomationService>,
    registry: ConnectionRegistry,
    limits: ConnectionLimits,
    shutdown: Arc<Shutdown>,
    state: Arc<watch::Sender<ServerState>>,
) {
    let mut stop = shutdown.subscribe();

    loop {
        let accepted = tokio::select! {
            biased;
            _ = stop.recv() => break,
            accepted = listener.accept() => accepted,
        };

        let (stream, peer, permit) = match accepted {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::error!(error = %e, "Accept failed, listener stopped");
                state.send_replace(ServerState::Failed);
                break;
            }
        };

        let guard = registry.track(peer);
        tracing::debug!(connection_id = %guard.id(), peer_addr = %peer, "Connection opened");
        let connection = Connection::new(stream, peer, guard, limits);
        let cancel = shutdown.subscribe();
        let service = Arc::clone(&service);

        tokio::spawn(async move {
            let _permit = permit;
            connection.run(service, cancel).await;
        });
    }

    tracing::debug!("Accept loop exited");
}
