//! Engine error types.
//!
//! Only startup-phase failures surface here. Steady-state per-record
//! problems (undecodable payload, failing handler, record on an
//! unregistered topic) are absorbed by the router and reported as
//! diagnostics — the loop's availability outranks any single record.

use relay_broker::BrokerError;

use crate::lifecycle::ConnectionState;

/// Which transport session an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientRole {
    /// The producer session.
    Producer,
    /// The consumer session.
    Consumer,
}

impl std::fmt::Display for ClientRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientRole::Producer => f.write_str("producer"),
            ClientRole::Consumer => f.write_str("consumer"),
        }
    }
}

/// Errors that can occur while starting or stopping the engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A producer or consumer session could not be established. On a
    /// partial failure the side that did connect has already been torn
    /// down.
    #[error("{role} connection failed: {source}")]
    Connection {
        /// The session that failed.
        role: ClientRole,
        /// The underlying broker failure.
        source: BrokerError,
    },

    /// The broker rejected the subscription request.
    #[error("subscription failed: {source}")]
    Subscription {
        /// The underlying broker failure.
        source: BrokerError,
    },

    /// No topics were discovered, so there is nothing to subscribe to.
    #[error("cannot subscribe to an empty topic set")]
    EmptyTopics,

    /// A lifecycle operation was invoked out of sequence. Programmer
    /// error; always surfaced.
    #[error("`{operation}` called in state {actual}; expected {expected}")]
    InvalidState {
        /// The operation that was attempted.
        operation: &'static str,
        /// The state the operation requires.
        expected: ConnectionState,
        /// The state the engine was actually in.
        actual: ConnectionState,
    },
}
