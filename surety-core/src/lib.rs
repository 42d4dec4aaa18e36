//! Surety Protocol Core
//!
//! Decentralized flight-delay insurance engine: airline admission by
//! multiparty vote, funding-gated flight registration, an insurance
//! ledger with quorum-triggered settlement, and an oracle consensus
//! engine over redundant status reports.
//!
//! # Architecture
//!
//! - **Pure transitions**: every operation maps (state, request) to
//!   (state, result) with no partial-write states observable
//! - **Single entry surface**: the [`SuretyEngine`] facade gates all
//!   mutations behind the operational flag
//! - **Recompute, never cache**: majority and quorum arithmetic is
//!   re-evaluated from current aggregate state on every call
//! - **Event outbox**: one event per committed transition, drained by
//!   the host and relayed out of process
//!
//! # Invariants
//!
//! - Registry size only increases; airlines are never un-registered
//! - Funding is additive; the active predicate is monotonic
//! - A flight's status transitions exactly once, Unknown -> terminal
//! - Outstanding claims never exceed funds held by the treasury

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod engine;
pub mod error;
pub mod events;
pub mod flights;
pub mod insurance;
pub mod oracle;
pub mod params;
pub mod registry;
pub mod types;

// Re-exports
pub use engine::{SuretyEngine, Treasury};
pub use error::{Error, ErrorCategory, Result};
pub use events::ProtocolEvent;
pub use params::ProtocolParams;
pub use registry::ProposalOutcome;
pub use types::{
    ether, Address, Airline, Flight, FlightKey, FlightStatus, OracleNode, OracleRequest, Policy,
    Wei, WEI_PER_ETHER,
};
