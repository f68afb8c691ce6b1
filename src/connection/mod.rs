//! Push connection lifecycle
//!
//! - `transport`: the `Connector` seam and its WebSocket implementation
//! - `backoff`: delay schedule between reconnect attempts
//!
//! `ConnectionManager` owns at most one logical push connection. A single
//! driver task opens it, forwards every decoded snapshot to the state store
//! in arrival order, and reconnects after a close or error. Aborting that
//! task is the only way to tear the connection down, which also cancels a
//! pending reconnect delay.

mod backoff;
mod transport;

pub use backoff::ReconnectPolicy;
#[cfg(test)]
pub(crate) use transport::fake;
pub use transport::{Connector, PushStream, WsConnector};

use std::sync::{Arc, Mutex, MutexGuard};

use futures::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::model::{GlobalPlayerState, SnapshotSink};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionStatus {
    Idle,
    Connecting,
    Open,
    Reconnecting { attempt: u32 },
    /// Reconnect budget spent; only an explicit `connect()` starts over
    Disconnected,
}

impl ConnectionStatus {
    pub fn is_active(self) -> bool {
        matches!(
            self,
            ConnectionStatus::Connecting
                | ConnectionStatus::Open
                | ConnectionStatus::Reconnecting { .. }
        )
    }
}

struct Driver {
    generation: u64,
    task: Option<JoinHandle<()>>,
}

struct Shared<C> {
    connector: C,
    url: String,
    policy: ReconnectPolicy,
    sink: Arc<dyn SnapshotSink>,
    status: watch::Sender<ConnectionStatus>,
    driver: Mutex<Driver>,
}

pub struct ConnectionManager<C> {
    shared: Arc<Shared<C>>,
}

impl<C> Clone for ConnectionManager<C> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<C: Connector> ConnectionManager<C> {
    pub fn new(
        connector: C,
        url: impl Into<String>,
        policy: ReconnectPolicy,
        sink: Arc<dyn SnapshotSink>,
    ) -> Self {
        let (status, _) = watch::channel(ConnectionStatus::Idle);
        Self {
            shared: Arc::new(Shared {
                connector,
                url: url.into(),
                policy,
                sink,
                status,
                driver: Mutex::new(Driver {
                    generation: 0,
                    task: None,
                }),
            }),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.shared.status.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.shared.status.subscribe()
    }

    /// Start the push connection unless one is already connecting, open or
    /// waiting to reconnect. Must be called within a tokio runtime.
    pub fn connect(&self) {
        let mut driver = self.shared.lock_driver();
        let status = *self.shared.status.borrow();
        if status.is_active() {
            tracing::debug!(?status, "Push connection already active");
            return;
        }

        driver.generation += 1;
        let generation = driver.generation;
        self.shared.status.send_replace(ConnectionStatus::Connecting);
        tracing::info!(url = %self.shared.url, "Opening push connection");

        let shared = self.shared.clone();
        driver.task = Some(tokio::spawn(async move {
            shared.run(generation).await;
        }));
    }

    /// Close the connection and cancel any scheduled reconnect.
    pub fn disconnect(&self) {
        let mut driver = self.shared.lock_driver();
        driver.generation += 1;
        if let Some(task) = driver.task.take() {
            task.abort();
            tracing::info!("Push connection closed locally");
        }
        self.shared.status.send_replace(ConnectionStatus::Idle);
    }
}

impl<C: Connector> Shared<C> {
    fn lock_driver(&self) -> MutexGuard<'_, Driver> {
        self.driver.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Apply a status change unless this driver has been superseded.
    fn transition(&self, generation: u64, status: ConnectionStatus) -> bool {
        let driver = self.lock_driver();
        if driver.generation != generation {
            return false;
        }
        self.status.send_replace(status);
        true
    }

    fn forward(&self, generation: u64, snapshot: GlobalPlayerState) -> bool {
        let driver = self.lock_driver();
        if driver.generation != generation {
            return false;
        }
        self.sink.set_global_state(snapshot);
        true
    }

    async fn run(&self, generation: u64) {
        let mut failures: u32 = 0;
        loop {
            match self.connector.open(&self.url).await {
                Ok(stream) => {
                    if !self.transition(generation, ConnectionStatus::Open) {
                        return;
                    }
                    failures = 0;
                    tracing::info!(url = %self.url, "Push connection open");
                    if !self.pump(generation, stream).await {
                        return;
                    }
                }
                Err(e) => tracing::warn!(error = %e, "Push connection attempt failed"),
            }

            failures += 1;
            let Some(delay) = self.policy.delay_for(failures) else {
                tracing::error!(attempts = failures - 1, "Giving up on push connection");
                self.transition(generation, ConnectionStatus::Disconnected);
                return;
            };
            if !self.transition(generation, ConnectionStatus::Reconnecting { attempt: failures }) {
                return;
            }
            tracing::info!(
                attempt = failures,
                delay_ms = delay.as_millis() as u64,
                "Push connection lost, reconnecting"
            );
            tokio::time::sleep(delay).await;

            if !self.transition(generation, ConnectionStatus::Connecting) {
                return;
            }
        }
    }

    /// Forward snapshots until the connection ends. Returns `false` if this
    /// driver was superseded while reading.
    async fn pump(&self, generation: u64, mut stream: PushStream) -> bool {
        while let Some(item) = stream.next().await {
            match item {
                Ok(text) => match serde_json::from_str::<GlobalPlayerState>(&text) {
                    Ok(snapshot) => {
                        if !self.forward(generation, snapshot) {
                            return false;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            size = text.len(),
                            "Dropping undecodable push message"
                        );
                    }
                },
                Err(e) => {
                    // Dropping the stream closes the connection; the caller
                    // then schedules the reconnect.
                    tracing::warn!(error = %e, "Push connection error");
                    return true;
                }
            }
        }
        tracing::info!("Push connection closed by peer");
        true
    }
}
