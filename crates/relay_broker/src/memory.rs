//! An in-process broker for tests and demos.
//!
//! Implements the [`Producer`] and [`Consumer`] traits against
//! partitioned in-memory logs. Semantics kept faithful to a real
//! broker where the engine can observe them: keyed records hash to a
//! stable partition, offsets are per-partition, `from_beginning`
//! decides whether a subscription replays retained records, and
//! ordering holds within a partition only.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use tokio::sync::Notify;
use tracing::debug;

use crate::client::{Consumer, Producer};
use crate::config::SubscribeOptions;
use crate::error::BrokerError;
use crate::record::{InboundRecord, OutboundMessage, RecordMetadata, SendRequest};

/// Shared broker state: per-topic partitioned logs plus an arrival
/// signal for blocked consumers.
#[derive(Debug)]
struct Shared {
    partitions: i32,
    logs: Mutex<HashMap<String, Vec<Vec<InboundRecord>>>>,
    arrivals: Notify,
}

impl Shared {
    /// Ensure a topic's partition logs exist, returning nothing.
    fn ensure_topic(&self, logs: &mut HashMap<String, Vec<Vec<InboundRecord>>>, topic: &str) {
        if !logs.contains_key(topic) {
            let empty = (0..self.partitions).map(|_| Vec::new()).collect();
            logs.insert(topic.to_string(), empty);
        }
    }
}

/// An in-process broker. Create one, then hand out producer and
/// consumer sessions with [`MemoryBroker::producer`] and
/// [`MemoryBroker::consumer`].
#[derive(Debug, Clone)]
pub struct MemoryBroker {
    shared: Arc<Shared>,
}

impl MemoryBroker {
    /// Create a broker with the given number of partitions per topic.
    #[must_use]
    pub fn new(partitions: i32) -> Self {
        assert!(partitions > 0, "a topic needs at least one partition");
        Self {
            shared: Arc::new(Shared {
                partitions,
                logs: Mutex::new(HashMap::new()),
                arrivals: Notify::new(),
            }),
        }
    }

    /// Open a new producer session (disconnected until `connect`).
    #[must_use]
    pub fn producer(&self) -> MemoryProducer {
        MemoryProducer {
            shared: self.shared.clone(),
            connected: Arc::new(Mutex::new(false)),
        }
    }

    /// Open a new consumer session (disconnected until `connect`).
    #[must_use]
    pub fn consumer(&self) -> MemoryConsumer {
        MemoryConsumer {
            shared: self.shared.clone(),
            state: Arc::new(Mutex::new(ConsumerState::default())),
        }
    }

    /// Number of records retained on a topic partition.
    #[must_use]
    pub fn partition_len(&self, topic: &str, partition: i32) -> usize {
        let logs = self.shared.logs.lock().expect("broker log lock");
        logs.get(topic)
            .and_then(|parts| parts.get(partition as usize))
            .map_or(0, Vec::len)
    }
}

fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as i64)
}

fn partition_for(key: Option<&[u8]>, partitions: i32) -> i32 {
    match key {
        Some(key) => {
            let mut hasher = DefaultHasher::new();
            key.hash(&mut hasher);
            (hasher.finish() % partitions as u64) as i32
        }
        None => 0,
    }
}

// ── Producer ────────────────────────────────────────────────────────────────

/// A producer session against a [`MemoryBroker`].
#[derive(Debug, Clone)]
pub struct MemoryProducer {
    shared: Arc<Shared>,
    connected: Arc<Mutex<bool>>,
}

impl MemoryProducer {
    fn append(&self, request: SendRequest) -> Result<Vec<RecordMetadata>, BrokerError> {
        if !*self.connected.lock().expect("producer lock") {
            return Err(BrokerError::NotConnected);
        }

        let mut logs = self.shared.logs.lock().expect("broker log lock");
        self.shared.ensure_topic(&mut logs, &request.topic);
        let parts = logs.get_mut(&request.topic).expect("topic just ensured");

        let mut batches: HashMap<i32, i64> = HashMap::new();
        for message in request.messages {
            let OutboundMessage {
                key,
                value,
                headers,
            } = message;
            let key = key.map(|k| k.as_bytes().to_vec());
            let partition = partition_for(key.as_deref(), self.shared.partitions);
            let log = &mut parts[partition as usize];
            let offset = log.len() as i64;
            log.push(InboundRecord {
                topic: request.topic.clone(),
                partition,
                offset,
                key,
                value: value.map(|v| v.as_bytes().to_vec()),
                headers: headers.unwrap_or_default(),
                timestamp_ms: now_ms(),
            });
            batches.entry(partition).or_insert(offset);
        }
        drop(logs);

        self.shared.arrivals.notify_waiters();

        let mut metadata: Vec<RecordMetadata> = batches
            .into_iter()
            .map(|(partition, base_offset)| RecordMetadata {
                topic: request.topic.clone(),
                partition,
                base_offset,
            })
            .collect();
        metadata.sort_by_key(|m| m.partition);
        Ok(metadata)
    }
}

impl Producer for MemoryProducer {
    fn connect(&self) -> BoxFuture<'_, Result<(), BrokerError>> {
        Box::pin(async move {
            *self.connected.lock().expect("producer lock") = true;
            debug!("memory producer connected");
            Ok(())
        })
    }

    fn disconnect(&self) -> BoxFuture<'_, Result<(), BrokerError>> {
        Box::pin(async move {
            *self.connected.lock().expect("producer lock") = false;
            debug!("memory producer disconnected");
            Ok(())
        })
    }

    fn send(&self, request: SendRequest) -> BoxFuture<'_, Result<Vec<RecordMetadata>, BrokerError>> {
        Box::pin(async move { self.append(request) })
    }
}

// ── Consumer ────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct ConsumerState {
    connected: bool,
    subscriptions: Vec<String>,
    /// Next unread index per (topic, partition).
    positions: HashMap<(String, i32), usize>,
    committed: HashMap<(String, i32), i64>,
}

/// A consumer session against a [`MemoryBroker`].
#[derive(Debug, Clone)]
pub struct MemoryConsumer {
    shared: Arc<Shared>,
    state: Arc<Mutex<ConsumerState>>,
}

impl MemoryConsumer {
    /// The offset last committed for a topic partition, if any.
    #[must_use]
    pub fn committed(&self, topic: &str, partition: i32) -> Option<i64> {
        let state = self.state.lock().expect("consumer lock");
        state.committed.get(&(topic.to_string(), partition)).copied()
    }

    /// Take the next unread record across all subscribed partitions,
    /// scanning topics in subscription order.
    fn try_take(&self) -> Option<InboundRecord> {
        let mut state = self.state.lock().expect("consumer lock");
        if !state.connected {
            return None;
        }
        let logs = self.shared.logs.lock().expect("broker log lock");
        let topics = state.subscriptions.clone();
        for topic in topics {
            let Some(parts) = logs.get(&topic) else {
                continue;
            };
            for (partition, log) in parts.iter().enumerate() {
                let slot = (topic.clone(), partition as i32);
                let position = state.positions.get(&slot).copied().unwrap_or(0);
                if position < log.len() {
                    state.positions.insert(slot, position + 1);
                    return Some(log[position].clone());
                }
            }
        }
        None
    }

    fn is_connected(&self) -> bool {
        self.state.lock().expect("consumer lock").connected
    }
}

impl Consumer for MemoryConsumer {
    fn connect(&self) -> BoxFuture<'_, Result<(), BrokerError>> {
        Box::pin(async move {
            self.state.lock().expect("consumer lock").connected = true;
            debug!("memory consumer connected");
            Ok(())
        })
    }

    fn disconnect(&self) -> BoxFuture<'_, Result<(), BrokerError>> {
        Box::pin(async move {
            self.state.lock().expect("consumer lock").connected = false;
            // Wake any blocked fetch so it can observe the closed session.
            self.shared.arrivals.notify_waiters();
            debug!("memory consumer disconnected");
            Ok(())
        })
    }

    fn subscribe(
        &self,
        topics: Vec<String>,
        options: SubscribeOptions,
    ) -> BoxFuture<'_, Result<(), BrokerError>> {
        Box::pin(async move {
            let mut state = self.state.lock().expect("consumer lock");
            if !state.connected {
                return Err(BrokerError::NotConnected);
            }
            let mut logs = self.shared.logs.lock().expect("broker log lock");
            for topic in &topics {
                self.shared.ensure_topic(&mut logs, topic);
                let parts = &logs[topic];
                for (partition, log) in parts.iter().enumerate() {
                    let start = if options.from_beginning { 0 } else { log.len() };
                    state
                        .positions
                        .insert((topic.clone(), partition as i32), start);
                }
            }
            state.subscriptions = topics;
            Ok(())
        })
    }

    fn next_record(&self) -> BoxFuture<'_, Result<Option<InboundRecord>, BrokerError>> {
        Box::pin(async move {
            loop {
                // Arm the arrival signal before scanning, so a record
                // appended between the scan and the await still wakes us.
                let arrival = self.shared.arrivals.notified();
                if let Some(record) = self.try_take() {
                    return Ok(Some(record));
                }
                if !self.is_connected() {
                    return Ok(None);
                }
                arrival.await;
            }
        })
    }

    fn commit(
        &self,
        topic: &str,
        partition: i32,
        offset: i64,
    ) -> BoxFuture<'_, Result<(), BrokerError>> {
        let topic = topic.to_string();
        Box::pin(async move {
            {
                let logs = self.shared.logs.lock().expect("broker log lock");
                let known = logs
                    .get(&topic)
                    .is_some_and(|parts| (partition as usize) < parts.len());
                if !known {
                    return Err(BrokerError::UnknownTopic(format!("{topic}/{partition}")));
                }
            }
            let mut state = self.state.lock().expect("consumer lock");
            state.committed.insert((topic, partition), offset);
            Ok(())
        })
    }
}
