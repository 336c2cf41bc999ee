//! The dispatch engine facade — wires discovery, subscription and the
//! consumption loop into the startup sequence.
//!
//! Ordering is load-bearing: connect first, then scan, then subscribe
//! to exactly the topics the scan discovered, then run. Every topic
//! the consumer subscribes to therefore has exactly one dispatch-table
//! entry at subscription time, and the table never changes afterwards.

use std::sync::{Arc, Mutex};

use tracing::info;

use relay_broker::{BrokerOptions, Consumer, Producer};

use crate::error::EngineError;
use crate::handler::HandlerComponent;
use crate::lifecycle::{ConnectionState, Lifecycle};
use crate::publish::Publisher;
use crate::router::MessageRouter;
use crate::scan::SubscriberScanner;
use crate::table::DispatchTable;
use crate::tags::TopicTags;

/// Owns the lifecycle, tag table and (after startup) the router.
///
/// Constructed once per process; clone-free handles to the producer
/// and consumer are shared out from here rather than reached globally.
pub struct DispatchEngine {
    lifecycle: Arc<Lifecycle>,
    tags: TopicTags,
    router: Mutex<Option<MessageRouter>>,
}

impl DispatchEngine {
    /// Create an engine over the given transport handles.
    #[must_use]
    pub fn new(
        producer: Arc<dyn Producer>,
        consumer: Arc<dyn Consumer>,
        options: BrokerOptions,
        tags: TopicTags,
    ) -> Self {
        Self {
            lifecycle: Arc::new(Lifecycle::new(producer, consumer, options.subscribe)),
            tags,
            router: Mutex::new(None),
        }
    }

    /// Run the startup sequence: connect, scan the components, then
    /// subscribe to every discovered topic.
    ///
    /// The scan is one-shot and eager — components registered after
    /// this call are not picked up.
    ///
    /// # Errors
    ///
    /// Propagates connection and subscription failures; a component
    /// set with no tagged methods fails with
    /// [`EngineError::EmptyTopics`] since there is nothing to
    /// subscribe to.
    pub async fn start(&self, components: &[Arc<dyn HandlerComponent>]) -> Result<(), EngineError> {
        self.lifecycle.connect().await?;

        let mut table = DispatchTable::new();
        SubscriberScanner::new(&self.tags).scan(components, &mut table);
        info!(
            components = components.len(),
            topics = table.len(),
            "handler discovery complete"
        );

        self.lifecycle.subscribe(table.topics()).await?;

        let router = MessageRouter::new(Arc::new(table), self.lifecycle.consumer());
        *self.router.lock().expect("router lock") = Some(router);
        Ok(())
    }

    /// Drive the consumption loop until shutdown is requested.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidState`] when called before
    /// [`DispatchEngine::start`] has completed.
    pub async fn run(&self) -> Result<(), EngineError> {
        let router = self.router.lock().expect("router lock").clone();
        match router {
            Some(router) => self.lifecycle.run(&router).await,
            None => Err(EngineError::InvalidState {
                operation: "run",
                expected: ConnectionState::Subscribed,
                actual: self.lifecycle.state(),
            }),
        }
    }

    /// Request shutdown and wait for the engine to stop. Idempotent.
    pub async fn shutdown(&self) {
        self.lifecycle.shutdown().await;
    }

    /// The current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.lifecycle.state()
    }

    /// Topics discovered by the scan, sorted. Empty before startup.
    #[must_use]
    pub fn topics(&self) -> Vec<String> {
        self.router
            .lock()
            .expect("router lock")
            .as_ref()
            .map_or_else(Vec::new, |router| router.table().topics())
    }

    /// A publish facade sharing this engine's producer handle.
    #[must_use]
    pub fn publisher(&self) -> Publisher {
        Publisher::new(self.lifecycle.producer())
    }
}

impl std::fmt::Debug for DispatchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchEngine")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    use serde_json::{Value, json};

    use relay_broker::memory::MemoryBroker;
    use relay_broker::record::SendOptions;

    use super::*;
    use crate::handler::HandlerFn;

    /// Test component capturing the payloads its handlers receive.
    struct EventHandlers {
        seen: Arc<StdMutex<Vec<(String, Option<Value>)>>>,
    }

    impl HandlerComponent for EventHandlers {
        fn type_name(&self) -> &'static str {
            "EventHandlers"
        }

        fn method_names(&self) -> Vec<&'static str> {
            vec!["on_created", "on_deleted", "untagged_helper"]
        }

        fn bind(self: Arc<Self>, method: &str) -> Option<HandlerFn> {
            let name = match method {
                "on_created" | "on_deleted" | "untagged_helper" => method.to_string(),
                _ => return None,
            };
            let seen = self.seen.clone();
            Some(Arc::new(move |payload, _record, _consumer| {
                let seen = seen.clone();
                let name = name.clone();
                Box::pin(async move {
                    seen.lock().unwrap().push((name, payload));
                    Ok(())
                })
            }))
        }
    }

    fn make_engine(broker: &MemoryBroker, tags: TopicTags) -> Arc<DispatchEngine> {
        Arc::new(DispatchEngine::new(
            Arc::new(broker.producer()),
            Arc::new(broker.consumer()),
            BrokerOptions::default(),
            tags,
        ))
    }

    #[tokio::test]
    async fn test_start_with_no_tagged_handlers_fails() {
        let broker = MemoryBroker::new(1);
        let engine = make_engine(&broker, TopicTags::new());
        let err = engine.start(&[]).await.unwrap_err();
        assert!(matches!(err, EngineError::EmptyTopics));
    }

    #[tokio::test]
    async fn test_startup_subscribes_to_discovered_topics() {
        let broker = MemoryBroker::new(1);
        let mut tags = TopicTags::new();
        tags.attach("EventHandlers", "on_created", "items.created");
        tags.attach("EventHandlers", "on_deleted", "items.deleted");

        let engine = make_engine(&broker, tags);
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let components: Vec<Arc<dyn HandlerComponent>> =
            vec![Arc::new(EventHandlers { seen: seen.clone() })];

        engine.start(&components).await.unwrap();
        assert_eq!(engine.state(), ConnectionState::Subscribed);
        assert_eq!(engine.topics(), vec!["items.created", "items.deleted"]);
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_records_reach_their_registered_handler() {
        let broker = MemoryBroker::new(1);
        let mut tags = TopicTags::new();
        tags.attach("EventHandlers", "on_created", "items.created");
        tags.attach("EventHandlers", "on_deleted", "items.deleted");

        let engine = make_engine(&broker, tags);
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let components: Vec<Arc<dyn HandlerComponent>> =
            vec![Arc::new(EventHandlers { seen: seen.clone() })];

        engine.start(&components).await.unwrap();
        let runner = engine.clone();
        let run = tokio::spawn(async move { runner.run().await });

        let publisher = engine.publisher();
        publisher
            .publish("items.created", json!({"id": 1}), SendOptions::default())
            .await
            .unwrap();
        publisher
            .publish("items.deleted", json!({"id": 2}), SendOptions::default())
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        engine.shutdown().await;
        run.await.unwrap().unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].0, "on_created");
        assert_eq!(seen[0].1, Some(json!({"id": 1})));
        assert_eq!(seen[1].0, "on_deleted");
        assert_eq!(seen[1].1, Some(json!({"id": 2})));
    }

    #[tokio::test]
    async fn test_run_before_start_is_invalid_state() {
        let broker = MemoryBroker::new(1);
        let engine = make_engine(&broker, TopicTags::new());
        let err = engine.run().await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidState {
                operation: "run",
                actual: ConnectionState::Disconnected,
                ..
            }
        ));
    }
}
