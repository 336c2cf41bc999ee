//! Message router — resolves, decodes and invokes, absorbing failures.
//!
//! Nothing here propagates past the routing boundary: an unresolved
//! topic, an undecodable payload or a failing handler each produce a
//! diagnostic and leave the consumption loop running. Records within a
//! partition are routed strictly in delivery order because the
//! lifecycle loop awaits each route before fetching the next record.

use std::sync::Arc;

use serde_json::Value;
use tracing::{error, warn};

use relay_broker::{Consumer, InboundRecord};

use crate::table::DispatchTable;

/// What became of a routed record. Diagnostic only; never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// The handler ran to completion.
    Delivered,
    /// No handler is registered for the record's topic; the record was
    /// dropped.
    Unresolved,
    /// The handler returned an error, which was absorbed.
    Failed,
}

/// Routes inbound records against a frozen dispatch table.
///
/// Safe to invoke re-entrantly across partitions: it shares only the
/// read-only table and `&self` broker handles.
#[derive(Clone)]
pub struct MessageRouter {
    table: Arc<DispatchTable>,
    consumer: Arc<dyn Consumer>,
}

impl MessageRouter {
    /// Create a router over a frozen dispatch table and the active
    /// consumer handle passed through to handlers.
    #[must_use]
    pub fn new(table: Arc<DispatchTable>, consumer: Arc<dyn Consumer>) -> Self {
        Self { table, consumer }
    }

    /// The dispatch table this router resolves against.
    #[must_use]
    pub fn table(&self) -> &DispatchTable {
        &self.table
    }

    /// Route a single inbound record to its registered handler.
    pub async fn route(&self, record: InboundRecord) -> RouteOutcome {
        let Some(binding) = self.table.resolve(&record.topic) else {
            warn!(
                topic = %record.topic,
                partition = record.partition,
                offset = record.offset,
                "no handler registered for topic, dropping record"
            );
            return RouteOutcome::Unresolved;
        };

        let payload = decode_payload(&record);

        match binding
            .invoke(payload, record.clone(), self.consumer.clone())
            .await
        {
            Ok(()) => RouteOutcome::Delivered,
            Err(err) => {
                error!(
                    topic = %record.topic,
                    partition = record.partition,
                    offset = record.offset,
                    component = binding.component,
                    method = binding.method,
                    error = %err,
                    "handler failed, continuing"
                );
                RouteOutcome::Failed
            }
        }
    }
}

/// Decode the record's value as JSON.
///
/// A missing value and an undecodable value both yield `None` — the
/// handler is still invoked either way, decode failure must never
/// abort the loop.
fn decode_payload(record: &InboundRecord) -> Option<Value> {
    let bytes = record.value.as_deref()?;
    match serde_json::from_slice(bytes) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(
                topic = %record.topic,
                partition = record.partition,
                offset = record.offset,
                error = %err,
                "payload is not valid JSON, invoking handler without payload"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use serde_json::json;

    use relay_broker::memory::MemoryBroker;

    use super::*;
    use crate::handler::HandlerBinding;

    /// Collects every payload a handler sees, in invocation order.
    type Seen = Arc<Mutex<Vec<Option<Value>>>>;

    fn make_record(topic: &str, value: Option<&str>) -> InboundRecord {
        InboundRecord {
            topic: topic.to_string(),
            partition: 0,
            offset: 0,
            key: None,
            value: value.map(|v| v.as_bytes().to_vec()),
            headers: HashMap::new(),
            timestamp_ms: 0,
        }
    }

    fn make_router(bindings: Vec<HandlerBinding>) -> MessageRouter {
        let mut table = DispatchTable::new();
        for binding in bindings {
            table.register(binding);
        }
        let consumer = Arc::new(MemoryBroker::new(1).consumer());
        MessageRouter::new(Arc::new(table), consumer)
    }

    fn recording_binding(topic: &str, seen: &Seen) -> HandlerBinding {
        let seen = seen.clone();
        HandlerBinding::new(
            topic,
            "TestComponent",
            "on_record",
            Arc::new(move |payload, _, _| {
                let seen = seen.clone();
                Box::pin(async move {
                    seen.lock().unwrap().push(payload);
                    Ok(())
                })
            }),
        )
    }

    fn failing_binding(topic: &str) -> HandlerBinding {
        HandlerBinding::new(
            topic,
            "TestComponent",
            "on_fail",
            Arc::new(|_, _, _| Box::pin(async { anyhow::bail!("handler exploded") })),
        )
    }

    #[tokio::test]
    async fn test_routes_decoded_payload_to_handler() {
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let router = make_router(vec![recording_binding("orders", &seen)]);

        let record = make_record("orders", Some(r#"{"id": 7}"#));
        assert_eq!(router.route(record).await, RouteOutcome::Delivered);
        assert_eq!(seen.lock().unwrap().as_slice(), &[Some(json!({"id": 7}))]);
    }

    #[tokio::test]
    async fn test_unresolved_topic_is_dropped_not_fatal() {
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let router = make_router(vec![recording_binding("orders", &seen)]);

        let record = make_record("unknown", Some("{}"));
        assert_eq!(router.route(record).await, RouteOutcome::Unresolved);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bad_json_still_invokes_handler_without_payload() {
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let router = make_router(vec![recording_binding("orders", &seen)]);

        let record = make_record("orders", Some("not json"));
        assert_eq!(router.route(record).await, RouteOutcome::Delivered);
        assert_eq!(seen.lock().unwrap().as_slice(), &[None]);
    }

    #[tokio::test]
    async fn test_absent_value_invokes_handler_without_payload() {
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let router = make_router(vec![recording_binding("orders", &seen)]);

        let record = make_record("orders", None);
        assert_eq!(router.route(record).await, RouteOutcome::Delivered);
        assert_eq!(seen.lock().unwrap().as_slice(), &[None]);
    }

    #[tokio::test]
    async fn test_handler_failure_does_not_stop_later_records() {
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let router = make_router(vec![
            failing_binding("bad"),
            recording_binding("good", &seen),
        ]);

        assert_eq!(
            router.route(make_record("bad", Some("{}"))).await,
            RouteOutcome::Failed
        );
        // The next record, on another topic, is still delivered.
        assert_eq!(
            router.route(make_record("good", Some("1"))).await,
            RouteOutcome::Delivered
        );
        assert_eq!(seen.lock().unwrap().as_slice(), &[Some(json!(1))]);
    }

    #[tokio::test]
    async fn test_same_partition_records_observed_in_order() {
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let router = make_router(vec![recording_binding("orders", &seen)]);

        for seq in 0..4 {
            let body = format!(r#"{{"seq": {seq}}}"#);
            let mut record = make_record("orders", Some(&body));
            record.offset = seq;
            router.route(record).await;
        }

        let order: Vec<i64> = seen
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.as_ref().unwrap()["seq"].as_i64().unwrap())
            .collect();
        assert_eq!(order, vec![0, 1, 2, 3]);
    }
}
