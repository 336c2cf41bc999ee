//! Publish facade — normalises application values into broker-record
//! shape before handing them to the producer.
//!
//! The producer transport only accepts bytes or text, so structured
//! values are serialised to their canonical JSON text form. Values
//! already in record shape (an object carrying a `key` or `value`
//! field) pass through with only that serialisation step; anything
//! else is wrapped as `{ value }` first.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use relay_broker::record::SendOptions;
use relay_broker::{BrokerError, OutboundMessage, Payload, Producer, RecordMetadata, SendRequest};

/// Publishes application values through a shared producer handle.
///
/// The handle may be used by concurrent publish callers; the
/// producer's own concurrency safety is the client's contract.
#[derive(Clone)]
pub struct Publisher {
    producer: Arc<dyn Producer>,
}

impl Publisher {
    /// Create a facade over the given producer handle.
    #[must_use]
    pub fn new(producer: Arc<dyn Producer>) -> Self {
        Self { producer }
    }

    /// Normalise `value` and send it to `topic`.
    ///
    /// Caller options are merged into the outgoing request; topic and
    /// message are fixed by this call.
    ///
    /// # Errors
    ///
    /// Returns the producer's [`BrokerError`] when the send fails.
    pub async fn publish(
        &self,
        topic: &str,
        value: Value,
        options: SendOptions,
    ) -> Result<Vec<RecordMetadata>, BrokerError> {
        self.publish_message(topic, normalize(value), options).await
    }

    /// Send a message already in broker-record shape, unchanged.
    ///
    /// Normalisation is idempotent for shaped messages: a
    /// bytes-or-text value needs no further work.
    ///
    /// # Errors
    ///
    /// Returns the producer's [`BrokerError`] when the send fails.
    pub async fn publish_message(
        &self,
        topic: &str,
        message: OutboundMessage,
        options: SendOptions,
    ) -> Result<Vec<RecordMetadata>, BrokerError> {
        debug!(topic, "publishing message");
        self.producer
            .send(SendRequest {
                topic: topic.to_string(),
                messages: vec![message],
                options,
            })
            .await
    }
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher").finish_non_exhaustive()
    }
}

/// Normalise an arbitrary application value into broker-record shape.
///
/// Null, non-objects and objects lacking both a `key` and a `value`
/// field are wrapped as `{ value }`. A structured `value` field is
/// serialised to its JSON text form; string values pass through
/// untouched. Key and headers survive the serialisation step.
#[must_use]
pub fn normalize(value: Value) -> OutboundMessage {
    let shaped = match value {
        Value::Object(map) if map.contains_key("key") || map.contains_key("value") => map,
        other => {
            let mut map = serde_json::Map::new();
            map.insert("value".to_string(), other);
            map
        }
    };

    let headers = shaped.get("headers").and_then(Value::as_object).map(|map| {
        map.iter()
            .map(|(name, v)| (name.clone(), header_bytes(v)))
            .collect::<HashMap<String, Vec<u8>>>()
    });

    OutboundMessage {
        key: shaped.get("key").cloned().and_then(to_payload),
        value: shaped.get("value").cloned().and_then(to_payload),
        headers,
    }
}

/// A transport-ready payload: strings pass through, everything else
/// becomes its JSON text form, null becomes an absent value.
fn to_payload(value: Value) -> Option<Payload> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(Payload::Text(s)),
        other => Some(Payload::Text(other.to_string())),
    }
}

fn header_bytes(value: &Value) -> Vec<u8> {
    match value {
        Value::String(s) => s.as_bytes().to_vec(),
        other => other.to_string().into_bytes(),
    }
}
