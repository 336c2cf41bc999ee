//! # relay_broker
//!
//! Broker client boundary for the relay dispatch engine.
//!
//! This crate provides:
//!
//! - [`record`] — Record shapes crossing the broker boundary.
//! - [`client`] — The [`Producer`] and [`Consumer`] traits the engine
//!   depends on.
//! - [`config`] — Connection, consumer, producer and subscribe options.
//! - [`memory`] — An in-process broker backing tests and demos.
//! - [`error`] — Broker-layer error types.
//!
//! The engine never talks to a concrete broker client; it only relies
//! on the existence and async/failure semantics of the trait
//! operations. Wire protocol, partition assignment and transport are
//! the client implementation's concern.

pub mod client;
pub mod config;
pub mod error;
pub mod memory;
pub mod record;

pub use client::{Consumer, Producer};
pub use config::BrokerOptions;
pub use error::BrokerError;
pub use record::{InboundRecord, OutboundMessage, Payload, RecordMetadata, SendRequest};
