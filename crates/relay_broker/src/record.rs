//! Record shapes crossing the broker boundary.
//!
//! An [`InboundRecord`] is what the consumer hands the engine for each
//! delivery; an [`OutboundMessage`] is what the producer accepts. The
//! transport only carries bytes or text, captured by [`Payload`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A value shape the transport accepts: raw bytes or UTF-8 text.
///
/// Anything else (structured application data) must be serialised to
/// its JSON text form before it reaches the producer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    /// Raw bytes, passed through untouched.
    Bytes(Vec<u8>),
    /// A plain string, passed through untouched.
    Text(String),
}

impl Payload {
    /// Returns the payload as bytes, borrowing text as UTF-8.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Payload::Bytes(b) => b,
            Payload::Text(s) => s.as_bytes(),
        }
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Payload::Text(s.to_string())
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Payload::Text(s)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(b: Vec<u8>) -> Self {
        Payload::Bytes(b)
    }
}

/// A record delivered by the consumer.
///
/// Partition, offset, headers and timestamp are broker-supplied
/// metadata — opaque to the engine and passed through whole to the
/// handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundRecord {
    /// The topic the record arrived on.
    pub topic: String,
    /// The partition within the topic.
    pub partition: i32,
    /// The record's offset within its partition.
    pub offset: i64,
    /// Optional record key.
    pub key: Option<Vec<u8>>,
    /// Optional payload bytes. Absent values reach the handler as-is.
    pub value: Option<Vec<u8>>,
    /// Broker headers, keyed by header name.
    pub headers: HashMap<String, Vec<u8>>,
    /// Broker-assigned timestamp, milliseconds since the epoch.
    pub timestamp_ms: i64,
}

/// A message in canonical broker-record shape: `{ key?, value?, headers? }`.
///
/// The publish facade normalises arbitrary application values into
/// this shape; messages already in it pass through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Optional record key.
    pub key: Option<Payload>,
    /// Optional record value.
    pub value: Option<Payload>,
    /// Optional broker headers.
    pub headers: Option<HashMap<String, Vec<u8>>>,
}

/// Producer options merged into a send request, passed through to the
/// broker client opaquely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendOptions {
    /// Number of acknowledgments required (`None` = client default).
    pub acks: Option<i16>,
    /// Send timeout in milliseconds (`None` = client default).
    pub timeout_ms: Option<u64>,
}

/// A request handed to [`Producer::send`](crate::client::Producer::send).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendRequest {
    /// Destination topic.
    pub topic: String,
    /// Messages to append.
    pub messages: Vec<OutboundMessage>,
    /// Caller-supplied producer options.
    pub options: SendOptions,
}

/// Delivery acknowledgment returned by the producer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMetadata {
    /// The topic the batch was appended to.
    pub topic: String,
    /// The partition the batch landed in.
    pub partition: i32,
    /// Offset of the first appended record.
    pub base_offset: i64,
}
