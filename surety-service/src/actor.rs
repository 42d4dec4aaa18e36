//! Actor-based concurrency for the protocol engine
//!
//! This module implements the single-writer pattern using Tokio actors:
//! - One logical writer task owns the engine, eliminating race conditions
//! - Async message passing with backpressure through a bounded mailbox
//! - Events drained from the engine outbox fan out over the bus
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │              Callers (binary, tests)                  │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       │ ProtocolHandle (Clone)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │             mpsc::channel (bounded)                   │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │           ProtocolActor (Single Task)                 │
//! │   SuretyEngine transition, then outbox drain          │
//! │                       │                               │
//! │                       ▼                               │
//! │          EventBus::publish(envelope)                  │
//! └───────────────────────────────────────────────────────┘
//! ```

use crate::bus::EventBus;
use crate::config::ServiceConfig;
use crate::metrics::Metrics;
use crate::{Error, Result};
use surety_core::registry::ProposalOutcome;
use surety_core::{
    Address, Airline, Flight, FlightKey, FlightStatus, Policy, ProtocolEvent, SuretyEngine,
    Treasury, Wei,
};
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

/// Message sent to the protocol actor
#[derive(Debug)]
pub enum ProtocolMessage {
    /// Flip the operational flag
    SetOperational {
        caller: Address,
        operational: bool,
        response: oneshot::Sender<Result<()>>,
    },

    /// Propose an airline for admission
    ProposeAirline {
        proposer: Address,
        candidate: Address,
        name: String,
        response: oneshot::Sender<Result<ProposalOutcome>>,
    },

    /// Add stake to an airline
    FundAirline {
        airline: Address,
        amount: Wei,
        response: oneshot::Sender<Result<Wei>>,
    },

    /// Register a flight
    RegisterFlight {
        airline: Address,
        flight_number: String,
        timestamp: i64,
        response: oneshot::Sender<Result<FlightKey>>,
    },

    /// Buy or top up coverage
    BuyInsurance {
        passenger: Address,
        flight_key: FlightKey,
        premium: Wei,
        response: oneshot::Sender<Result<()>>,
    },

    /// Transfer out payable claims
    Withdraw {
        passenger: Address,
        response: oneshot::Sender<Result<Wei>>,
    },

    /// Register an oracle identity
    RegisterOracle {
        identity: Address,
        fee: Wei,
        response: oneshot::Sender<Result<[u8; 3]>>,
    },

    /// Open a status request for a flight
    RequestFlightStatus {
        flight_key: FlightKey,
        response: oneshot::Sender<Result<Uuid>>,
    },

    /// Submit an oracle status report
    SubmitOracleReport {
        identity: Address,
        index: u8,
        flight_key: FlightKey,
        timestamp: i64,
        status: FlightStatus,
        response: oneshot::Sender<Result<bool>>,
    },

    /// Get an airline entry
    GetAirline {
        address: Address,
        response: oneshot::Sender<Option<Airline>>,
    },

    /// Get registered airlines
    GetRegisteredAirlines {
        response: oneshot::Sender<Vec<Airline>>,
    },

    /// Get active airlines
    GetActiveAirlines {
        response: oneshot::Sender<Vec<Airline>>,
    },

    /// Get cumulative funded amount for an airline
    GetFundedAmount {
        address: Address,
        response: oneshot::Sender<Wei>,
    },

    /// Get a flight by key
    GetFlight {
        flight_key: FlightKey,
        response: oneshot::Sender<Option<Flight>>,
    },

    /// Get all flight keys
    GetFlightKeys {
        response: oneshot::Sender<Vec<FlightKey>>,
    },

    /// Get a policy
    GetPolicy {
        flight_key: FlightKey,
        passenger: Address,
        response: oneshot::Sender<Option<Policy>>,
    },

    /// Get withdrawable credit for a passenger
    GetWithdrawable {
        passenger: Address,
        response: oneshot::Sender<Wei>,
    },

    /// Get assigned oracle indexes
    GetOracleIndexes {
        identity: Address,
        response: oneshot::Sender<Option<[u8; 3]>>,
    },

    /// Get the treasury snapshot
    GetTreasury {
        response: oneshot::Sender<Treasury>,
    },

    /// Get the operational flag
    IsOperational {
        response: oneshot::Sender<bool>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that owns the engine and processes protocol messages
pub struct ProtocolActor {
    /// The protocol engine (single writer)
    engine: SuretyEngine,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<ProtocolMessage>,

    /// Event fan-out
    bus: EventBus,

    /// Metrics collector
    metrics: Metrics,
}

impl std::fmt::Debug for ProtocolActor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtocolActor").finish_non_exhaustive()
    }
}

impl ProtocolActor {
    /// Create new actor
    pub fn new(
        engine: SuretyEngine,
        mailbox: mpsc::Receiver<ProtocolMessage>,
        bus: EventBus,
        metrics: Metrics,
    ) -> Self {
        Self {
            engine,
            mailbox,
            bus,
            metrics,
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            if matches!(msg, ProtocolMessage::Shutdown) {
                tracing::info!("Protocol actor shutting down");
                break;
            }
            self.handle_message(msg);
        }
    }

    fn handle_message(&mut self, msg: ProtocolMessage) {
        match msg {
            ProtocolMessage::SetOperational {
                caller,
                operational,
                response,
            } => {
                let result = self.engine.set_operational(&caller, operational);
                let _ = response.send(self.commit(result));
            }

            ProtocolMessage::ProposeAirline {
                proposer,
                candidate,
                name,
                response,
            } => {
                let result = self.engine.propose_airline(&proposer, candidate, &name);
                let _ = response.send(self.commit(result));
            }

            ProtocolMessage::FundAirline {
                airline,
                amount,
                response,
            } => {
                let result = self.engine.fund_airline(&airline, amount);
                let _ = response.send(self.commit(result));
            }

            ProtocolMessage::RegisterFlight {
                airline,
                flight_number,
                timestamp,
                response,
            } => {
                let result = self
                    .engine
                    .register_flight(&airline, &flight_number, timestamp);
                let _ = response.send(self.commit(result));
            }

            ProtocolMessage::BuyInsurance {
                passenger,
                flight_key,
                premium,
                response,
            } => {
                let result = self.engine.buy_insurance(passenger, flight_key, premium);
                let _ = response.send(self.commit(result));
            }

            ProtocolMessage::Withdraw {
                passenger,
                response,
            } => {
                let result = self.engine.withdraw(&passenger);
                let _ = response.send(self.commit(result));
            }

            ProtocolMessage::RegisterOracle {
                identity,
                fee,
                response,
            } => {
                let result = self.engine.register_oracle(identity, fee);
                let _ = response.send(self.commit(result));
            }

            ProtocolMessage::RequestFlightStatus {
                flight_key,
                response,
            } => {
                let result = self.engine.request_flight_status(flight_key);
                let _ = response.send(self.commit(result));
            }

            ProtocolMessage::SubmitOracleReport {
                identity,
                index,
                flight_key,
                timestamp,
                status,
                response,
            } => {
                let result =
                    self.engine
                        .submit_oracle_report(&identity, index, flight_key, timestamp, status);
                let _ = response.send(self.commit(result));
            }

            ProtocolMessage::GetAirline { address, response } => {
                let _ = response.send(self.engine.airline(&address));
            }

            ProtocolMessage::GetRegisteredAirlines { response } => {
                let _ = response.send(self.engine.registered_airlines());
            }

            ProtocolMessage::GetActiveAirlines { response } => {
                let _ = response.send(self.engine.active_airlines());
            }

            ProtocolMessage::GetFundedAmount { address, response } => {
                let _ = response.send(self.engine.funded_amount(&address));
            }

            ProtocolMessage::GetFlight {
                flight_key,
                response,
            } => {
                let _ = response.send(self.engine.flight(&flight_key));
            }

            ProtocolMessage::GetFlightKeys { response } => {
                let _ = response.send(self.engine.flight_keys());
            }

            ProtocolMessage::GetPolicy {
                flight_key,
                passenger,
                response,
            } => {
                let _ = response.send(self.engine.policy(&flight_key, &passenger));
            }

            ProtocolMessage::GetWithdrawable {
                passenger,
                response,
            } => {
                let _ = response.send(self.engine.withdrawable(&passenger));
            }

            ProtocolMessage::GetOracleIndexes { identity, response } => {
                let _ = response.send(self.engine.oracle_indexes(&identity));
            }

            ProtocolMessage::GetTreasury { response } => {
                let _ = response.send(self.engine.treasury());
            }

            ProtocolMessage::IsOperational { response } => {
                let _ = response.send(self.engine.is_operational());
            }

            ProtocolMessage::Shutdown => {
                // Handled in main loop
            }
        }
    }

    /// Drain the outbox after a transition and map the result
    fn commit<T>(&mut self, result: surety_core::Result<T>) -> Result<T> {
        if result.is_err() {
            self.metrics.record_rejected_call();
        }

        for event in self.engine.take_events() {
            self.observe(&event);
            self.bus.publish(event);
        }
        self.metrics
            .update_treasury_balance(self.engine.treasury().balance());

        result.map_err(Error::Protocol)
    }

    fn observe(&self, event: &ProtocolEvent) {
        match event {
            ProtocolEvent::AirlineRegistered { .. } => self.metrics.record_airline_registered(),
            ProtocolEvent::FlightRegistered { .. } => self.metrics.record_flight_registered(),
            ProtocolEvent::InsurancePurchased { .. } => self.metrics.record_policy_sold(),
            ProtocolEvent::OracleReportAccepted { .. } => self.metrics.record_oracle_report(),
            ProtocolEvent::FlightStatusResolved { .. } => self.metrics.record_flight_resolved(),
            ProtocolEvent::WithdrawalCompleted { .. } => self.metrics.record_withdrawal(),
            _ => {}
        }
    }
}

/// Handle for sending messages to the actor
#[derive(Debug, Clone)]
pub struct ProtocolHandle {
    sender: mpsc::Sender<ProtocolMessage>,
}

impl ProtocolHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<ProtocolMessage>) -> Self {
        Self { sender }
    }

    async fn call<T>(
        &self,
        msg: ProtocolMessage,
        rx: oneshot::Receiver<Result<T>>,
    ) -> Result<T> {
        self.sender
            .send(msg)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    async fn query<T>(&self, msg: ProtocolMessage, rx: oneshot::Receiver<T>) -> Result<T> {
        self.sender
            .send(msg)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))
    }

    /// Flip the operational flag
    pub async fn set_operational(&self, caller: Address, operational: bool) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.call(
            ProtocolMessage::SetOperational {
                caller,
                operational,
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Propose an airline for admission
    pub async fn propose_airline(
        &self,
        proposer: Address,
        candidate: Address,
        name: impl Into<String>,
    ) -> Result<ProposalOutcome> {
        let (tx, rx) = oneshot::channel();
        self.call(
            ProtocolMessage::ProposeAirline {
                proposer,
                candidate,
                name: name.into(),
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Add stake to an airline
    pub async fn fund_airline(&self, airline: Address, amount: Wei) -> Result<Wei> {
        let (tx, rx) = oneshot::channel();
        self.call(
            ProtocolMessage::FundAirline {
                airline,
                amount,
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Register a flight
    pub async fn register_flight(
        &self,
        airline: Address,
        flight_number: impl Into<String>,
        timestamp: i64,
    ) -> Result<FlightKey> {
        let (tx, rx) = oneshot::channel();
        self.call(
            ProtocolMessage::RegisterFlight {
                airline,
                flight_number: flight_number.into(),
                timestamp,
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Buy or top up coverage
    pub async fn buy_insurance(
        &self,
        passenger: Address,
        flight_key: FlightKey,
        premium: Wei,
    ) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.call(
            ProtocolMessage::BuyInsurance {
                passenger,
                flight_key,
                premium,
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Transfer out payable claims
    pub async fn withdraw(&self, passenger: Address) -> Result<Wei> {
        let (tx, rx) = oneshot::channel();
        self.call(
            ProtocolMessage::Withdraw {
                passenger,
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Register an oracle identity
    pub async fn register_oracle(&self, identity: Address, fee: Wei) -> Result<[u8; 3]> {
        let (tx, rx) = oneshot::channel();
        self.call(
            ProtocolMessage::RegisterOracle {
                identity,
                fee,
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Open a status request for a flight
    pub async fn request_flight_status(&self, flight_key: FlightKey) -> Result<Uuid> {
        let (tx, rx) = oneshot::channel();
        self.call(
            ProtocolMessage::RequestFlightStatus {
                flight_key,
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Submit an oracle status report
    pub async fn submit_oracle_report(
        &self,
        identity: Address,
        index: u8,
        flight_key: FlightKey,
        timestamp: i64,
        status: FlightStatus,
    ) -> Result<bool> {
        let (tx, rx) = oneshot::channel();
        self.call(
            ProtocolMessage::SubmitOracleReport {
                identity,
                index,
                flight_key,
                timestamp,
                status,
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Get an airline entry
    pub async fn airline(&self, address: Address) -> Result<Option<Airline>> {
        let (tx, rx) = oneshot::channel();
        self.query(ProtocolMessage::GetAirline {
            address,
            response: tx,
        }, rx)
        .await
    }

    /// Get registered airlines
    pub async fn registered_airlines(&self) -> Result<Vec<Airline>> {
        let (tx, rx) = oneshot::channel();
        self.query(ProtocolMessage::GetRegisteredAirlines { response: tx }, rx)
            .await
    }

    /// Get active airlines
    pub async fn active_airlines(&self) -> Result<Vec<Airline>> {
        let (tx, rx) = oneshot::channel();
        self.query(ProtocolMessage::GetActiveAirlines { response: tx }, rx)
            .await
    }

    /// Get cumulative funded amount for an airline (zero if unknown)
    pub async fn funded_amount(&self, address: Address) -> Result<Wei> {
        let (tx, rx) = oneshot::channel();
        self.query(
            ProtocolMessage::GetFundedAmount {
                address,
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Get a flight by key
    pub async fn flight(&self, flight_key: FlightKey) -> Result<Option<Flight>> {
        let (tx, rx) = oneshot::channel();
        self.query(
            ProtocolMessage::GetFlight {
                flight_key,
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Get all flight keys
    pub async fn flight_keys(&self) -> Result<Vec<FlightKey>> {
        let (tx, rx) = oneshot::channel();
        self.query(ProtocolMessage::GetFlightKeys { response: tx }, rx)
            .await
    }

    /// Get a policy
    pub async fn policy(
        &self,
        flight_key: FlightKey,
        passenger: Address,
    ) -> Result<Option<Policy>> {
        let (tx, rx) = oneshot::channel();
        self.query(
            ProtocolMessage::GetPolicy {
                flight_key,
                passenger,
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Get withdrawable credit for a passenger
    pub async fn withdrawable(&self, passenger: Address) -> Result<Wei> {
        let (tx, rx) = oneshot::channel();
        self.query(
            ProtocolMessage::GetWithdrawable {
                passenger,
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Get assigned oracle indexes
    pub async fn oracle_indexes(&self, identity: Address) -> Result<Option<[u8; 3]>> {
        let (tx, rx) = oneshot::channel();
        self.query(
            ProtocolMessage::GetOracleIndexes {
                identity,
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Get the treasury snapshot
    pub async fn treasury(&self) -> Result<Treasury> {
        let (tx, rx) = oneshot::channel();
        self.query(ProtocolMessage::GetTreasury { response: tx }, rx)
            .await
    }

    /// Get the operational flag
    pub async fn is_operational(&self) -> Result<bool> {
        let (tx, rx) = oneshot::channel();
        self.query(ProtocolMessage::IsOperational { response: tx }, rx)
            .await
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(ProtocolMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the protocol actor
///
/// Returns a cloneable handle and the event bus callers subscribe to.
pub fn spawn_protocol_actor(
    config: &ServiceConfig,
    metrics: Metrics,
) -> Result<(ProtocolHandle, EventBus)> {
    let engine = SuretyEngine::new(
        config.protocol.clone(),
        Address::new(config.admin.clone()),
        Address::new(config.genesis_airline.clone()),
        config.genesis_airline_name.clone(),
    )?;

    let bus = EventBus::new(config.event_capacity);
    let (tx, rx) = mpsc::channel(config.mailbox_capacity);
    let actor = ProtocolActor::new(engine, rx, bus.clone(), metrics);

    tokio::spawn(async move {
        actor.run().await;
    });

    Ok((ProtocolHandle::new(tx), bus))
}

#[cfg(test)]
mod tests {
    use super::*;
    use surety_core::{ether, ProtocolParams};

    fn test_config() -> ServiceConfig {
        ServiceConfig {
            admin: "0xADMIN".to_string(),
            genesis_airline: "0xA001".to_string(),
            genesis_airline_name: "UDA_001".to_string(),
            protocol: ProtocolParams {
                rng_seed: Some(11),
                ..ProtocolParams::default()
            },
            ..ServiceConfig::default()
        }
    }

    #[tokio::test]
    async fn test_actor_spawn_and_shutdown() {
        let (handle, _bus) = spawn_protocol_actor(&test_config(), Metrics::new().unwrap()).unwrap();
        assert!(handle.is_operational().await.unwrap());
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_actor_lifecycle_publishes_events() {
        let metrics = Metrics::new().unwrap();
        let (handle, bus) = spawn_protocol_actor(&test_config(), metrics.clone()).unwrap();
        let mut rx = bus.subscribe();

        let genesis = Address::new("0xA001");
        handle
            .fund_airline(genesis.clone(), ether(10))
            .await
            .unwrap();
        let key = handle
            .register_flight(genesis, "UDA_006", 1_700_000_000)
            .await
            .unwrap();
        handle
            .buy_insurance(Address::new("0xP01"), key, ether(1))
            .await
            .unwrap();

        assert_eq!(rx.recv().await.unwrap().kind, "airline.funded");
        assert_eq!(rx.recv().await.unwrap().kind, "flight.registered");
        assert_eq!(rx.recv().await.unwrap().kind, "insurance.purchased");

        assert_eq!(metrics.flights_registered.get(), 1);
        assert_eq!(metrics.policies_sold.get(), 1);
        assert_eq!(metrics.treasury_balance.get(), 11_000_000_000);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_actor_rejection_preserves_state() {
        let metrics = Metrics::new().unwrap();
        let (handle, _bus) = spawn_protocol_actor(&test_config(), metrics.clone()).unwrap();

        let result = handle
            .register_flight(Address::new("0xA001"), "UDA_006", 1_700_000_000)
            .await;
        assert!(matches!(
            result,
            Err(Error::Protocol(surety_core::Error::NotFunded(_)))
        ));
        assert_eq!(metrics.rejected_calls.get(), 1);
        assert!(handle.flight_keys().await.unwrap().is_empty());

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_actor_queries() {
        let (handle, _bus) = spawn_protocol_actor(&test_config(), Metrics::new().unwrap()).unwrap();

        let airlines = handle.registered_airlines().await.unwrap();
        assert_eq!(airlines.len(), 1);
        assert_eq!(airlines[0].name, "UDA_001");

        let missing = handle.airline(Address::new("0xA099")).await.unwrap();
        assert!(missing.is_none());

        // Genesis is registered but not active until funded.
        assert!(handle.active_airlines().await.unwrap().is_empty());
        assert_eq!(
            handle.funded_amount(Address::new("0xA001")).await.unwrap(),
            0
        );

        handle
            .fund_airline(Address::new("0xA001"), ether(10))
            .await
            .unwrap();
        assert_eq!(handle.active_airlines().await.unwrap().len(), 1);
        assert_eq!(
            handle.funded_amount(Address::new("0xA001")).await.unwrap(),
            ether(10)
        );

        let treasury = handle.treasury().await.unwrap();
        assert_eq!(treasury.balance(), ether(10));

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_actor_operational_gate() {
        let (handle, _bus) = spawn_protocol_actor(&test_config(), Metrics::new().unwrap()).unwrap();

        handle
            .set_operational(Address::new("0xADMIN"), false)
            .await
            .unwrap();
        let result = handle
            .fund_airline(Address::new("0xA001"), ether(10))
            .await;
        assert!(matches!(
            result,
            Err(Error::Protocol(surety_core::Error::ProtocolSuspended))
        ));

        // Queries stay available while suspended.
        assert!(!handle.is_operational().await.unwrap());

        handle.shutdown().await.unwrap();
    }
}
