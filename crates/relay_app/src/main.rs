//! # relay_app — Demo
//!
//! Wires the dispatch engine to the in-process broker and walks the
//! whole startup sequence:
//!
//! 1. Connect producer and consumer.
//! 2. Scan the registered components for topic-tagged methods.
//! 3. Subscribe to every discovered topic.
//! 4. Run the consumption loop; publish a few records; shut down.

use std::sync::Arc;

use anyhow::Result;
use serde_json::{Value, json};
use tracing::info;
use tracing_subscriber::EnvFilter;

use relay_broker::memory::MemoryBroker;
use relay_broker::record::SendOptions;
use relay_broker::{BrokerOptions, Consumer, InboundRecord};
use relay_dispatch::{DispatchEngine, HandlerComponent, HandlerFn, TopicTags};

/// Order events component: two tagged handlers and a helper.
struct OrderHandlers;

impl OrderHandlers {
    async fn on_created(payload: Option<Value>, record: InboundRecord) -> Result<()> {
        info!(
            offset = record.offset,
            payload = %payload.unwrap_or(serde_json::Value::Null),
            "order created"
        );
        Ok(())
    }

    async fn on_cancelled(
        payload: Option<Value>,
        record: InboundRecord,
        consumer: Arc<dyn Consumer>,
    ) -> Result<()> {
        info!(payload = %payload.unwrap_or(serde_json::Value::Null), "order cancelled");
        // Manual offset control through the consumer handle.
        consumer
            .commit(&record.topic, record.partition, record.offset)
            .await?;
        Ok(())
    }
}

impl HandlerComponent for OrderHandlers {
    fn type_name(&self) -> &'static str {
        "OrderHandlers"
    }

    fn method_names(&self) -> Vec<&'static str> {
        vec!["on_created", "on_cancelled"]
    }

    fn bind(self: Arc<Self>, method: &str) -> Option<HandlerFn> {
        match method {
            "on_created" => Some(Arc::new(|payload, record, _consumer| {
                Box::pin(OrderHandlers::on_created(payload, record))
            })),
            "on_cancelled" => Some(Arc::new(|payload, record, consumer| {
                Box::pin(OrderHandlers::on_cancelled(payload, record, consumer))
            })),
            _ => None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("relay_app=info".parse()?))
        .init();

    info!("relay demo starting");

    let broker = MemoryBroker::new(1);
    let mut tags = TopicTags::new();
    tags.attach("OrderHandlers", "on_created", "orders.created");
    tags.attach("OrderHandlers", "on_cancelled", "orders.cancelled");

    let engine = Arc::new(DispatchEngine::new(
        Arc::new(broker.producer()),
        Arc::new(broker.consumer()),
        BrokerOptions::default().with_group_id("relay-demo"),
        tags,
    ));

    let components: Vec<Arc<dyn HandlerComponent>> = vec![Arc::new(OrderHandlers)];
    engine.start(&components).await?;
    info!(topics = ?engine.topics(), "engine started");

    let runner = engine.clone();
    let run = tokio::spawn(async move { runner.run().await });

    let publisher = engine.publisher();
    publisher
        .publish("orders.created", json!({"id": 1, "total": 9.99}), SendOptions::default())
        .await?;
    publisher
        .publish("orders.cancelled", json!({"id": 1}), SendOptions::default())
        .await?;

    // Let the loop drain the two records, then stop.
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    engine.shutdown().await;
    run.await??;

    info!("relay demo shut down");
    Ok(())
}
