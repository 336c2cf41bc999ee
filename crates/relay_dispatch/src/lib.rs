//! # relay_dispatch
//!
//! Discovery-and-dispatch engine for topic-tagged message handlers.
//!
//! This crate provides:
//!
//! - [`tags`] — The out-of-band table tying component methods to topics.
//! - [`handler`] — Handler callables and the component trait they are
//!   discovered on.
//! - [`table`] — The topic→handler dispatch table.
//! - [`scan`] — The one-shot metadata scan that populates the table.
//! - [`lifecycle`] — The connect/subscribe/run/shutdown state machine.
//! - [`router`] — Per-record resolve/decode/invoke with absorbed failures.
//! - [`publish`] — Normalising publish facade over the producer.
//! - [`engine`] — The facade wiring the above into the startup sequence.
//!
//! ## Startup sequence
//!
//! 1. Connect producer and consumer.
//! 2. Scan registered components and populate the dispatch table.
//! 3. Subscribe the consumer to every discovered topic.
//! 4. Run the consumption loop until shutdown is requested.
//!
//! The dispatch table is immutable once step 3 begins; components
//! registered later are not picked up.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use relay_broker::{BrokerOptions, memory::MemoryBroker};
//! use relay_dispatch::{DispatchEngine, TopicTags};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let broker = MemoryBroker::new(1);
//!     let mut tags = TopicTags::new();
//!     tags.attach("OrderHandlers", "on_created", "orders.created");
//!
//!     let engine = DispatchEngine::new(
//!         Arc::new(broker.producer()),
//!         Arc::new(broker.consumer()),
//!         BrokerOptions::default(),
//!         tags,
//!     );
//!     // engine.start(components).await?;
//!     // engine.run().await?;
//!     Ok(())
//! }
//! ```

pub mod engine;
pub mod error;
pub mod handler;
pub mod lifecycle;
pub mod publish;
pub mod router;
pub mod scan;
pub mod table;
pub mod tags;

pub use engine::DispatchEngine;
pub use error::{ClientRole, EngineError};
pub use handler::{HandlerBinding, HandlerComponent, HandlerFn};
pub use lifecycle::{ConnectionState, Lifecycle};
pub use publish::Publisher;
pub use router::{MessageRouter, RouteOutcome};
pub use scan::SubscriberScanner;
pub use table::DispatchTable;
pub use tags::TopicTags;
