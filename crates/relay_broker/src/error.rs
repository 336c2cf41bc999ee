//! Broker-layer error types.

/// Errors reported by a broker client implementation.
///
/// Retry policy is the client's concern; the engine treats every
/// variant as terminal for the operation that raised it.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// A transport session could not be established.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The broker rejected a subscription request.
    #[error("subscription rejected: {0}")]
    Subscribe(String),

    /// A send request failed.
    #[error("send failed: {0}")]
    Send(String),

    /// Fetching the next record failed.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// An operation was attempted on a client that is not connected.
    #[error("client is not connected")]
    NotConnected,

    /// An offset commit referred to an unknown topic or partition.
    #[error("unknown topic or partition: {0}")]
    UnknownTopic(String),
}
