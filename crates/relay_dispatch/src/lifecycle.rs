//! Connection lifecycle — sequences connect → subscribe → run → disconnect.
//!
//! Exactly one [`Lifecycle`] exists per process. Its handle is passed
//! to the router and publish facade rather than reached globally, and
//! every transition is guarded: out-of-order calls fail with
//! [`EngineError::InvalidState`] naming the expected predecessor state.

use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use relay_broker::config::SubscribeOptions;
use relay_broker::{Consumer, Producer};

use crate::error::{ClientRole, EngineError};
use crate::router::MessageRouter;

/// The connection lifecycle states.
///
/// The machine is one-way: once stopped, a lifecycle is not restarted
/// (one instance per process).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Initial state; no transport sessions exist.
    Disconnected,
    /// Producer and consumer sessions are open.
    Connected,
    /// The consumer has registered interest in the discovered topics.
    Subscribed,
    /// The consumption loop is the steady state.
    Running,
    /// Shutdown requested; draining the in-flight record.
    ShuttingDown,
    /// Sessions closed; terminal.
    Stopped,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Connected => "Connected",
            ConnectionState::Subscribed => "Subscribed",
            ConnectionState::Running => "Running",
            ConnectionState::ShuttingDown => "ShuttingDown",
            ConnectionState::Stopped => "Stopped",
        };
        f.write_str(name)
    }
}

/// Owns the producer and consumer handles and drives their lifecycle.
pub struct Lifecycle {
    producer: Arc<dyn Producer>,
    consumer: Arc<dyn Consumer>,
    subscribe_options: SubscribeOptions,
    state: watch::Sender<ConnectionState>,
    shutdown: CancellationToken,
}

impl Lifecycle {
    /// Create a lifecycle manager owning the given transport handles.
    #[must_use]
    pub fn new(
        producer: Arc<dyn Producer>,
        consumer: Arc<dyn Consumer>,
        subscribe_options: SubscribeOptions,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            producer,
            consumer,
            subscribe_options,
            state,
            shutdown: CancellationToken::new(),
        }
    }

    /// The current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// The producer handle (shared with the publish facade).
    #[must_use]
    pub fn producer(&self) -> Arc<dyn Producer> {
        self.producer.clone()
    }

    /// The consumer handle (shared with the router).
    #[must_use]
    pub fn consumer(&self) -> Arc<dyn Consumer> {
        self.consumer.clone()
    }

    fn expect_state(
        &self,
        operation: &'static str,
        expected: ConnectionState,
    ) -> Result<(), EngineError> {
        let actual = self.state();
        if actual == expected {
            Ok(())
        } else {
            Err(EngineError::InvalidState {
                operation,
                expected,
                actual,
            })
        }
    }

    /// Open both transport sessions: `Disconnected` → `Connected`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Connection`] naming the session that
    /// failed. On a partial failure the session that did open is torn
    /// down first — the manager never leaves a half-open connection.
    pub async fn connect(&self) -> Result<(), EngineError> {
        self.expect_state("connect", ConnectionState::Disconnected)?;

        self.producer
            .connect()
            .await
            .map_err(|source| EngineError::Connection {
                role: ClientRole::Producer,
                source,
            })?;

        if let Err(source) = self.consumer.connect().await {
            if let Err(err) = self.producer.disconnect().await {
                warn!(error = %err, "producer teardown after failed consumer connect");
            }
            return Err(EngineError::Connection {
                role: ClientRole::Consumer,
                source,
            });
        }

        self.state.send_replace(ConnectionState::Connected);
        info!("producer and consumer connected");
        Ok(())
    }

    /// Register interest in the given topics: `Connected` → `Subscribed`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::EmptyTopics`] for an empty topic set and
    /// [`EngineError::Subscription`] when the broker rejects the
    /// request.
    pub async fn subscribe(&self, topics: Vec<String>) -> Result<(), EngineError> {
        self.expect_state("subscribe", ConnectionState::Connected)?;
        if topics.is_empty() {
            return Err(EngineError::EmptyTopics);
        }

        let count = topics.len();
        self.consumer
            .subscribe(topics, self.subscribe_options)
            .await
            .map_err(|source| EngineError::Subscription { source })?;

        self.state.send_replace(ConnectionState::Subscribed);
        info!(
            topics = count,
            from_beginning = self.subscribe_options.from_beginning,
            "subscribed"
        );
        Ok(())
    }

    /// Drive the consumption loop: `Subscribed` → `Running`.
    ///
    /// Does not return until shutdown is requested or the consumer
    /// stream closes; the loop is the steady state. Cancellation
    /// interrupts only the record fetch — a route in flight always
    /// runs to completion before the loop exits.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidState`] when called before
    /// `subscribe`.
    pub async fn run(&self, router: &MessageRouter) -> Result<(), EngineError> {
        self.expect_state("run", ConnectionState::Subscribed)?;
        self.state.send_replace(ConnectionState::Running);
        info!("consumption loop started");

        loop {
            let fetched = tokio::select! {
                () = self.shutdown.cancelled() => break,
                fetched = self.consumer.next_record() => fetched,
            };
            match fetched {
                Ok(Some(record)) => {
                    // Routed outside the select: shutdown never
                    // interrupts an in-flight record.
                    router.route(record).await;
                }
                Ok(None) => {
                    info!("consumer stream closed");
                    break;
                }
                Err(err) => {
                    error!(error = %err, "record fetch failed, stopping loop");
                    break;
                }
            }
        }

        self.teardown().await;
        Ok(())
    }

    /// Request shutdown and wait for the lifecycle to stop.
    ///
    /// Safe to call concurrently with an in-flight [`Lifecycle::run`]:
    /// the loop stops fetching, the current handler (if any) finishes,
    /// then both sessions disconnect. Idempotent — calling it when
    /// already stopped is a no-op.
    pub async fn shutdown(&self) {
        match self.state() {
            ConnectionState::Disconnected | ConnectionState::Stopped => {
                debug!("shutdown requested but nothing is running");
            }
            ConnectionState::Running | ConnectionState::ShuttingDown => {
                self.shutdown.cancel();
                let mut state = self.state.subscribe();
                let _ = state.wait_for(|s| *s == ConnectionState::Stopped).await;
            }
            ConnectionState::Connected | ConnectionState::Subscribed => {
                // The loop never started; disconnect directly.
                self.teardown().await;
            }
        }
    }

    /// Disconnect both sessions and mark the lifecycle stopped.
    async fn teardown(&self) {
        self.state.send_replace(ConnectionState::ShuttingDown);
        if let Err(err) = self.producer.disconnect().await {
            warn!(error = %err, "producer disconnect failed");
        }
        if let Err(err) = self.consumer.disconnect().await {
            warn!(error = %err, "consumer disconnect failed");
        }
        self.state.send_replace(ConnectionState::Stopped);
        info!("lifecycle stopped");
    }
}

impl std::fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lifecycle")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
