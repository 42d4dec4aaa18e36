//! Surety protocol node
//!
//! Hosts the protocol engine behind a single-writer actor and fans
//! committed events out to subscribers.
//!
//! # Architecture
//!
//! - **Single Writer**: One actor task owns the engine, so calls form a
//!   linear history without locks
//! - **Event Fan-out**: Outbox events are wrapped in envelopes and
//!   broadcast to any number of subscribers
//! - **Observability**: Prometheus counters and structured tracing on
//!   every transition

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod actor;
pub mod bus;
pub mod config;
pub mod error;
pub mod metrics;

// Re-exports
pub use actor::{spawn_protocol_actor, ProtocolActor, ProtocolHandle, ProtocolMessage};
pub use bus::{Envelope, EventBus};
pub use config::ServiceConfig;
pub use error::{Error, Result};
pub use metrics::Metrics;
