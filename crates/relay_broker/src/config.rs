//! Connection and session configuration.
//!
//! Everything here is consumed by broker client implementations, not by
//! the engine itself — the engine only reads the subscribe-time replay
//! flag. Option groups mirror the surfaces a broker client exposes:
//! client, consumer, producer, subscribe and run.

use serde::{Deserialize, Serialize};

/// Default broker address when none is configured.
pub const DEFAULT_BROKER: &str = "localhost:9092";

/// The environment variable used to override the broker address list
/// (comma-separated).
pub const BROKERS_ENV: &str = "RELAY_BROKERS";

/// Default client identifier.
pub const DEFAULT_CLIENT_ID: &str = "relay-client";

/// Default consumer group when none is configured.
pub const DEFAULT_GROUP_ID: &str = "relay-consumer";

/// Client-level connection parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientOptions {
    /// Broker addresses to bootstrap from.
    pub brokers: Vec<String>,
    /// Client identifier presented to the broker.
    pub client_id: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            brokers: vec![DEFAULT_BROKER.to_string()],
            client_id: DEFAULT_CLIENT_ID.to_string(),
        }
    }
}

impl ClientOptions {
    /// Build client options from the `RELAY_BROKERS` environment
    /// variable, falling back to [`DEFAULT_BROKER`].
    #[must_use]
    pub fn from_env() -> Self {
        let brokers = std::env::var(BROKERS_ENV)
            .map(|v| v.split(',').map(|b| b.trim().to_string()).collect())
            .unwrap_or_else(|_| vec![DEFAULT_BROKER.to_string()]);
        Self {
            brokers,
            ..Self::default()
        }
    }
}

/// Consumer session parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumerOptions {
    /// Consumer group under which partitions are claimed. Defaults to
    /// [`DEFAULT_GROUP_ID`] when unspecified.
    pub group_id: String,
}

impl Default for ConsumerOptions {
    fn default() -> Self {
        Self {
            group_id: DEFAULT_GROUP_ID.to_string(),
        }
    }
}

/// Producer session parameters, passed through to the client opaquely.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProducerOptions {
    /// Whether sends should be idempotent, if the client supports it.
    pub idempotent: bool,
}

/// Subscribe-time options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeOptions {
    /// Replay the topic from its first retained record instead of
    /// starting at the current end.
    pub from_beginning: bool,
}

/// Consumption-loop options, passed through to the client opaquely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOptions {
    /// Whether the client auto-commits consumed offsets.
    pub auto_commit: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self { auto_commit: true }
    }
}

/// The full configuration surface consumed by the engine and its
/// broker client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrokerOptions {
    /// Client-level connection parameters.
    pub client: ClientOptions,
    /// Consumer session parameters.
    pub consumer: ConsumerOptions,
    /// Producer session parameters.
    pub producer: ProducerOptions,
    /// Subscribe-time options.
    pub subscribe: SubscribeOptions,
    /// Consumption-loop options.
    pub run: RunOptions,
}

impl BrokerOptions {
    /// Override the consumer group id.
    #[must_use]
    pub fn with_group_id(mut self, group_id: impl Into<String>) -> Self {
        self.consumer.group_id = group_id.into();
        self
    }

    /// Replay subscribed topics from their first retained record.
    #[must_use]
    pub fn with_from_beginning(mut self, from_beginning: bool) -> Self {
        self.subscribe.from_beginning = from_beginning;
        self
    }
}
