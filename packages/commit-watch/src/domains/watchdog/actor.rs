//! The watchdog actor.
//!
//! ```text
//! WatchdogHandle ──► control mailbox ──┐
//!                                      ├─► Watchdog::run ─► TransactionRegistry
//! timer tasks ─────► expiry mailbox ───┘          │
//!                                                 └─► callbacks (JoinSet)
//! ```
//!
//! Start and completion signals share one mailbox, so two events for the same
//! transaction are applied in the order they were sent. Only the actor touches
//! the registry.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::events::{ControlEvent, ControlSignal, TimerExpired};
use super::registry::{CancelHandle, TransactionRegistry};
use super::{ShutdownPolicy, WatchdogConfig};
use crate::common::TransactionId;
use crate::kernel::BaseCompletionCallback;

#[derive(Debug, Error)]
pub enum WatchdogError {
    #[error("watchdog actor has stopped")]
    Stopped,
}

/// Cloneable sender side of the actor's control mailbox.
#[derive(Debug, Clone)]
pub struct WatchdogHandle {
    tx: mpsc::Sender<ControlEvent>,
}

impl WatchdogHandle {
    /// Announce a transaction. Replaces any live entry with the same id.
    pub async fn enqueue(
        &self,
        transaction_id: TransactionId,
        callback_path: impl Into<String>,
    ) -> Result<(), WatchdogError> {
        self.send(ControlEvent::Enqueue {
            transaction_id,
            callback_path: callback_path.into(),
        })
        .await
    }

    /// Mark a transaction complete.
    pub async fn dequeue(&self, transaction_id: TransactionId) -> Result<(), WatchdogError> {
        self.send(ControlEvent::Dequeue { transaction_id }).await
    }

    pub async fn apply(&self, signal: ControlSignal) -> Result<(), WatchdogError> {
        match signal {
            ControlSignal::Start {
                transaction_id,
                callback_path,
            } => self.enqueue(transaction_id, callback_path).await,
            ControlSignal::Complete { transaction_id } => self.dequeue(transaction_id).await,
        }
    }

    /// Number of transactions currently awaiting completion.
    ///
    /// Answered after every event sent before this call has been applied.
    pub async fn live_transactions(&self) -> Result<usize, WatchdogError> {
        let (reply, rx) = oneshot::channel();
        self.send(ControlEvent::LiveCount { reply }).await?;
        rx.await.map_err(|_| WatchdogError::Stopped)
    }

    async fn send(&self, event: ControlEvent) -> Result<(), WatchdogError> {
        self.tx.send(event).await.map_err(|_| WatchdogError::Stopped)
    }
}

pub struct Watchdog {
    registry: TransactionRegistry,
    timeout: Duration,
    shutdown_policy: ShutdownPolicy,
    callback: Arc<dyn BaseCompletionCallback>,
    control_rx: mpsc::Receiver<ControlEvent>,
    expiry_tx: mpsc::UnboundedSender<TimerExpired>,
    expiry_rx: mpsc::UnboundedReceiver<TimerExpired>,
    // Parent of every timer token
    timers: CancellationToken,
    callbacks: JoinSet<()>,
}

impl Watchdog {
    pub fn new(
        config: &WatchdogConfig,
        callback: Arc<dyn BaseCompletionCallback>,
    ) -> (Self, WatchdogHandle) {
        let (tx, control_rx) = mpsc::channel(config.mailbox_capacity.max(1));
        let (expiry_tx, expiry_rx) = mpsc::unbounded_channel();

        let watchdog = Self {
            registry: TransactionRegistry::new(),
            timeout: config.timeout,
            shutdown_policy: config.shutdown_policy,
            callback,
            control_rx,
            expiry_tx,
            expiry_rx,
            timers: CancellationToken::new(),
            callbacks: JoinSet::new(),
        };

        (watchdog, WatchdogHandle { tx })
    }

    /// Process events until `shutdown` is cancelled or every handle is dropped,
    /// then retire pending transactions according to the shutdown policy.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(
            timeout_secs = self.timeout.as_secs_f64(),
            shutdown_policy = ?self.shutdown_policy,
            "watchdog started"
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                event = self.control_rx.recv() => match event {
                    Some(event) => self.handle_control(event),
                    None => {
                        debug!("all watchdog handles dropped");
                        break;
                    }
                },
                Some(expired) = self.expiry_rx.recv() => self.handle_expiry(expired),
                Some(joined) = self.callbacks.join_next(), if !self.callbacks.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "callback task panicked");
                    }
                }
            }
        }

        self.wind_down().await;
    }

    fn handle_control(&mut self, event: ControlEvent) {
        match event {
            ControlEvent::Enqueue {
                transaction_id,
                callback_path,
            } => self.start(transaction_id, callback_path),
            ControlEvent::Dequeue { transaction_id } => {
                if self.registry.complete(&transaction_id) {
                    debug!(transaction_id = %transaction_id, "transaction completed");
                } else {
                    warn!(transaction_id = %transaction_id, "completion for unknown key");
                }
            }
            ControlEvent::LiveCount { reply } => {
                let _ = reply.send(self.registry.len());
            }
        }
    }

    fn start(&mut self, transaction_id: TransactionId, callback_path: String) {
        let deadline = Instant::now() + self.timeout;
        let token = self.timers.child_token();

        let installed = self.registry.start(
            transaction_id.clone(),
            callback_path,
            deadline,
            CancelHandle::new(token.clone()),
        );

        if installed.replaced {
            debug!(transaction_id = %transaction_id, "replaced live transaction");
        } else {
            debug!(transaction_id = %transaction_id, "transaction started");
        }

        let expiry_tx = self.expiry_tx.clone();
        let generation = installed.generation;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep_until(deadline) => {
                    let _ = expiry_tx.send(TimerExpired {
                        transaction_id,
                        generation,
                    });
                }
            }
        });
    }

    fn handle_expiry(&mut self, expired: TimerExpired) {
        match self
            .registry
            .expire(&expired.transaction_id, expired.generation)
        {
            Some(entry) => {
                info!(
                    transaction_id = %entry.transaction_id,
                    callback_path = %entry.callback_path,
                    "transaction timed out"
                );
                self.spawn_callback(entry.transaction_id, entry.callback_path);
            }
            None => {
                debug!(
                    transaction_id = %expired.transaction_id,
                    generation = expired.generation,
                    "ignoring stale timer"
                );
            }
        }
    }

    fn spawn_callback(&mut self, transaction_id: TransactionId, callback_path: String) {
        let callback = self.callback.clone();
        self.callbacks.spawn(async move {
            if let Err(e) = callback.invoke(&callback_path).await {
                warn!(
                    transaction_id = %transaction_id,
                    callback_path = %callback_path,
                    error = %e,
                    "completion callback failed"
                );
            }
        });
    }

    async fn wind_down(mut self) {
        let pending = self.registry.drain();
        self.timers.cancel();

        match self.shutdown_policy {
            ShutdownPolicy::DropPending => {
                if !pending.is_empty() {
                    info!(dropped = pending.len(), "dropping pending transactions");
                }
            }
            ShutdownPolicy::FirePending => {
                if !pending.is_empty() {
                    info!(count = pending.len(), "firing callbacks for pending transactions");
                }
                for (transaction_id, callback_path) in pending {
                    self.spawn_callback(transaction_id, callback_path);
                }
            }
        }

        let in_flight = self.callbacks.len();
        if in_flight > 0 {
            info!(count = in_flight, "waiting for callbacks to finish");
        }
        while let Some(joined) = self.callbacks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "callback task panicked");
            }
        }

        info!("watchdog stopped");
    }
}
