//! The producer and consumer traits the engine depends on.
//!
//! Both traits are object-safe: the engine holds `Arc<dyn Producer>` /
//! `Arc<dyn Consumer>` and never names a concrete client. Methods take
//! `&self` — implementations are expected to manage their own interior
//! state, so a producer handle can be shared by concurrent publish
//! callers.

use futures::future::BoxFuture;

use crate::config::SubscribeOptions;
use crate::error::BrokerError;
use crate::record::{InboundRecord, RecordMetadata, SendRequest};

/// A broker producer session.
pub trait Producer: Send + Sync {
    /// Open the producer transport session.
    fn connect(&self) -> BoxFuture<'_, Result<(), BrokerError>>;

    /// Close the producer transport session.
    fn disconnect(&self) -> BoxFuture<'_, Result<(), BrokerError>>;

    /// Append the request's messages to its topic.
    ///
    /// Returns one [`RecordMetadata`] per partition written.
    fn send(&self, request: SendRequest) -> BoxFuture<'_, Result<Vec<RecordMetadata>, BrokerError>>;
}

/// A broker consumer session.
pub trait Consumer: Send + Sync {
    /// Open the consumer transport session.
    fn connect(&self) -> BoxFuture<'_, Result<(), BrokerError>>;

    /// Close the consumer transport session.
    fn disconnect(&self) -> BoxFuture<'_, Result<(), BrokerError>>;

    /// Register interest in the given topics.
    fn subscribe(
        &self,
        topics: Vec<String>,
        options: SubscribeOptions,
    ) -> BoxFuture<'_, Result<(), BrokerError>>;

    /// Wait for the next record on any subscribed topic.
    ///
    /// Resolves to `None` once the session is closed and no further
    /// records will be delivered.
    fn next_record(&self) -> BoxFuture<'_, Result<Option<InboundRecord>, BrokerError>>;

    /// Commit a consumed offset. Exposed to handlers for manual offset
    /// control; the engine itself never commits.
    fn commit(
        &self,
        topic: &str,
        partition: i32,
        offset: i64,
    ) -> BoxFuture<'_, Result<(), BrokerError>>;
}
