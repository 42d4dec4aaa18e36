//! Protocol facade
//!
//! `SuretyEngine` is the single entry surface for the protocol: it
//! enforces the operational flag, delegates to the component registries,
//! keeps treasury accounting, and collects emitted events in an outbox
//! drained by the host.
//!
//! Every operation is a pure transition of (state, request) into
//! (state, result): validation precedes all mutation, so a rejected call
//! leaves state unchanged. Concurrency is the host's concern; the engine
//! assumes calls arrive in a single linear history.

use crate::events::ProtocolEvent;
use crate::flights::FlightRegistry;
use crate::insurance::InsuranceLedger;
use crate::oracle::{OracleEngine, ReportOutcome};
use crate::params::ProtocolParams;
use crate::registry::{AirlineRegistry, ProposalOutcome};
use crate::types::{Address, Airline, Flight, FlightKey, FlightStatus, Policy, Wei};
use crate::{Error, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Treasury accounting
///
/// Bounds payout liability: outstanding claims may never exceed
/// `balance()`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Treasury {
    /// Cumulative airline stake
    pub staked: Wei,

    /// Cumulative insurance premiums
    pub premiums: Wei,

    /// Cumulative oracle registration fees
    pub fees: Wei,

    /// Cumulative completed withdrawals
    pub withdrawn: Wei,
}

impl Treasury {
    /// Funds currently held by the protocol
    pub fn balance(&self) -> Wei {
        self.staked
            .saturating_add(self.premiums)
            .saturating_add(self.fees)
            .saturating_sub(self.withdrawn)
    }
}

/// The protocol engine
#[derive(Debug)]
pub struct SuretyEngine {
    params: ProtocolParams,
    admin: Address,
    operational: bool,
    airlines: AirlineRegistry,
    flights: FlightRegistry,
    insurance: InsuranceLedger,
    oracles: OracleEngine,
    treasury: Treasury,
    rng: StdRng,
    outbox: Vec<ProtocolEvent>,
}

impl SuretyEngine {
    /// Create an engine with a genesis airline already registered
    ///
    /// Without a genesis admission no proposer could ever become active
    /// and the bootstrap phase could not start.
    pub fn new(
        params: ProtocolParams,
        admin: Address,
        genesis_airline: Address,
        genesis_name: impl Into<String>,
    ) -> Result<Self> {
        params.validate()?;

        let rng = match params.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut airlines = AirlineRegistry::new();
        airlines.register_genesis(genesis_airline, genesis_name);

        Ok(Self {
            params,
            admin,
            operational: true,
            airlines,
            flights: FlightRegistry::new(),
            insurance: InsuranceLedger::new(),
            oracles: OracleEngine::new(),
            treasury: Treasury::default(),
            rng,
            outbox: Vec::new(),
        })
    }

    /// Protocol parameters
    pub fn params(&self) -> &ProtocolParams {
        &self.params
    }

    fn ensure_operational(&self) -> Result<()> {
        if self.operational {
            Ok(())
        } else {
            Err(Error::ProtocolSuspended)
        }
    }

    fn emit(&mut self, event: ProtocolEvent) {
        tracing::debug!(kind = event.kind(), "event emitted");
        self.outbox.push(event);
    }

    /// Drain events emitted since the last call
    pub fn take_events(&mut self) -> Vec<ProtocolEvent> {
        std::mem::take(&mut self.outbox)
    }

    // ---- administrative --------------------------------------------------

    /// Flip the global operational flag (admin only)
    ///
    /// Deliberately not gated on the flag itself, or the admin could
    /// never re-enable the protocol.
    pub fn set_operational(&mut self, caller: &Address, operational: bool) -> Result<()> {
        if *caller != self.admin {
            return Err(Error::Unauthorized(format!(
                "{} is not the protocol administrator",
                caller
            )));
        }
        if self.operational != operational {
            self.operational = operational;
            self.emit(ProtocolEvent::OperationalChanged { operational });
        }
        Ok(())
    }

    /// Whether mutating operations are currently accepted
    pub fn is_operational(&self) -> bool {
        self.operational
    }

    // ---- airline registry ------------------------------------------------

    /// Propose a candidate airline for admission
    pub fn propose_airline(
        &mut self,
        proposer: &Address,
        candidate: Address,
        name: &str,
    ) -> Result<ProposalOutcome> {
        self.ensure_operational()?;

        let outcome = self.airlines.propose(
            proposer,
            candidate.clone(),
            name,
            self.params.activation_threshold(),
            self.params.bootstrap_airlines,
        )?;

        let airline = self
            .airlines
            .get(&candidate)
            .cloned()
            .ok_or_else(|| Error::InvariantViolation("candidate vanished after propose".into()))?;
        if outcome.is_registered {
            self.emit(ProtocolEvent::AirlineRegistered { airline });
        } else {
            self.emit(ProtocolEvent::AirlineVoteRecorded { airline });
        }

        Ok(outcome)
    }

    /// Add stake to an airline's funding total
    pub fn fund_airline(&mut self, airline: &Address, amount: Wei) -> Result<Wei> {
        self.ensure_operational()?;

        let funded = self.airlines.fund(airline, amount)?;
        self.treasury.staked = self.treasury.staked.saturating_add(amount);

        let entry = self
            .airlines
            .get(airline)
            .cloned()
            .ok_or_else(|| Error::InvariantViolation("airline vanished after fund".into()))?;
        self.emit(ProtocolEvent::AirlineFunded { airline: entry });

        Ok(funded)
    }

    /// Registered airlines in insertion order
    pub fn registered_airlines(&self) -> Vec<Airline> {
        self.airlines.registered().into_iter().cloned().collect()
    }

    /// Active airlines in insertion order
    pub fn active_airlines(&self) -> Vec<Airline> {
        self.airlines
            .active(self.params.activation_threshold())
            .into_iter()
            .cloned()
            .collect()
    }

    /// Airline entry by address
    pub fn airline(&self, address: &Address) -> Option<Airline> {
        self.airlines.get(address).cloned()
    }

    /// Cumulative funded amount for an airline (zero if unknown)
    pub fn funded_amount(&self, address: &Address) -> Wei {
        self.airlines.get(address).map(|a| a.funded).unwrap_or(0)
    }

    // ---- flight registry -------------------------------------------------

    /// Register a flight (active airlines only)
    pub fn register_flight(
        &mut self,
        airline: &Address,
        flight_number: &str,
        timestamp: i64,
    ) -> Result<FlightKey> {
        self.ensure_operational()?;

        if !self
            .airlines
            .is_active(airline, self.params.activation_threshold())
        {
            return Err(Error::NotFunded(airline.to_string()));
        }

        let key = self
            .flights
            .register(airline.clone(), flight_number, timestamp)?;

        let flight = self
            .flights
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::InvariantViolation("flight vanished after register".into()))?;
        self.emit(ProtocolEvent::FlightRegistered { flight });

        Ok(key)
    }

    /// All registered flight keys
    pub fn flight_keys(&self) -> Vec<FlightKey> {
        self.flights.keys().to_vec()
    }

    /// Flight by key
    pub fn flight(&self, key: &FlightKey) -> Option<Flight> {
        self.flights.get(key).cloned()
    }

    // ---- insurance ledger ------------------------------------------------

    /// Buy (or top up) coverage for a flight
    pub fn buy_insurance(
        &mut self,
        passenger: Address,
        flight_key: FlightKey,
        premium: Wei,
    ) -> Result<()> {
        self.ensure_operational()?;

        let flight = self
            .flights
            .get(&flight_key)
            .ok_or_else(|| Error::UnknownFlight(flight_key.to_string()))?;
        if flight.status.is_terminal() {
            return Err(Error::AlreadyResolved(flight_key.to_string()));
        }

        let policy = self
            .insurance
            .buy(passenger, flight_key, premium, self.params.max_premium())?
            .clone();
        self.treasury.premiums = self.treasury.premiums.saturating_add(premium);
        self.emit(ProtocolEvent::InsurancePurchased { policy });

        Ok(())
    }

    /// Policy for (flight, passenger)
    pub fn policy(&self, flight_key: &FlightKey, passenger: &Address) -> Option<Policy> {
        self.insurance.get(flight_key, passenger).cloned()
    }

    /// Sum of payable claims for a passenger
    pub fn withdrawable(&self, passenger: &Address) -> Wei {
        self.insurance.withdrawable(passenger)
    }

    /// Transfer out every payable claim for a passenger
    ///
    /// The withdrawn flip and the treasury debit commit in the same
    /// transition; no caller can observe one without the other.
    pub fn withdraw(&mut self, passenger: &Address) -> Result<Wei> {
        self.ensure_operational()?;

        let amount = self.insurance.withdrawable(passenger);
        if amount == 0 {
            return Err(Error::NothingToWithdraw(passenger.to_string()));
        }
        if amount > self.treasury.balance() {
            return Err(Error::InvariantViolation(format!(
                "withdrawal of {} wei exceeds treasury balance {}",
                amount,
                self.treasury.balance()
            )));
        }

        let transferred = self.insurance.withdraw(passenger)?;
        self.treasury.withdrawn = self.treasury.withdrawn.saturating_add(transferred);
        self.emit(ProtocolEvent::WithdrawalCompleted {
            passenger: passenger.clone(),
            amount: transferred,
        });

        Ok(transferred)
    }

    // ---- oracle consensus ------------------------------------------------

    /// Register an oracle identity against the fixed fee
    pub fn register_oracle(&mut self, identity: Address, fee: Wei) -> Result<[u8; 3]> {
        self.ensure_operational()?;

        let indexes = self
            .oracles
            .register(identity.clone(), fee, &self.params, &mut self.rng)?;
        self.treasury.fees = self.treasury.fees.saturating_add(fee);
        self.emit(ProtocolEvent::OracleRegistered {
            oracle: crate::types::OracleNode {
                address: identity,
                indexes,
            },
        });

        Ok(indexes)
    }

    /// Assigned indexes for an oracle identity
    pub fn oracle_indexes(&self, identity: &Address) -> Option<[u8; 3]> {
        self.oracles.indexes(identity)
    }

    /// Open a status request for a flight with a fresh target index
    ///
    /// Returns immediately after opening; reports and quorum resolution
    /// arrive through separate calls.
    pub fn request_flight_status(&mut self, flight_key: FlightKey) -> Result<Uuid> {
        self.ensure_operational()?;

        let flight = self
            .flights
            .get(&flight_key)
            .ok_or_else(|| Error::UnknownFlight(flight_key.to_string()))?;
        if flight.status.is_terminal() {
            return Err(Error::AlreadyResolved(flight_key.to_string()));
        }
        let timestamp = flight.timestamp;

        let request = self
            .oracles
            .open_request(
                flight_key,
                timestamp,
                self.params.oracle_index_domain,
                &mut self.rng,
            )
            .clone();
        let request_id = request.request_id;
        self.emit(ProtocolEvent::OracleRequestOpened { request });

        Ok(request_id)
    }

    /// Submit an oracle status report
    ///
    /// Returns `true` when the report was recorded toward quorum and
    /// `false` when it was accepted but ignored (duplicate reporter or
    /// closed request).
    pub fn submit_oracle_report(
        &mut self,
        identity: &Address,
        index: u8,
        flight_key: FlightKey,
        timestamp: i64,
        status: FlightStatus,
    ) -> Result<bool> {
        self.ensure_operational()?;

        let outcome = self.oracles.submit(
            identity,
            index,
            flight_key,
            timestamp,
            status,
            self.params.min_oracle_responses,
        )?;

        match outcome {
            ReportOutcome::Ignored => Ok(false),
            ReportOutcome::Recorded { .. } => {
                self.emit_report_accepted(identity, index, flight_key, timestamp, status);
                Ok(true)
            }
            ReportOutcome::QuorumReached { status } => {
                self.emit_report_accepted(identity, index, flight_key, timestamp, status);
                self.finalize_flight(flight_key, status);
                Ok(true)
            }
        }
    }

    fn emit_report_accepted(
        &mut self,
        identity: &Address,
        index: u8,
        flight_key: FlightKey,
        timestamp: i64,
        status: FlightStatus,
    ) {
        let key = crate::types::RequestKey {
            flight_key,
            index,
            timestamp,
        };
        if let Some(request) = self.oracles.request(&key).cloned() {
            self.emit(ProtocolEvent::OracleReportAccepted {
                request,
                oracle: identity.clone(),
                status,
            });
        }
    }

    /// Write the final status and settle policies
    ///
    /// A flight already resolved through an earlier request makes this a
    /// no-op: the status transitions exactly once.
    fn finalize_flight(&mut self, flight_key: FlightKey, status: FlightStatus) {
        let flight = match self.flights.resolve(&flight_key, status) {
            Ok(flight) => flight.clone(),
            Err(Error::AlreadyResolved(_)) => return,
            Err(e) => {
                tracing::warn!(flight = %flight_key, error = %e, "resolution failed");
                return;
            }
        };

        let credited = self
            .insurance
            .settle_flight(&flight_key, status, &self.params);
        self.emit(ProtocolEvent::FlightStatusResolved { flight, credited });

        if !self.check_reserve_invariant() {
            tracing::warn!(
                flight = %flight_key,
                "outstanding claims exceed treasury balance"
            );
        }
    }

    // ---- accounting ------------------------------------------------------

    /// Treasury snapshot
    pub fn treasury(&self) -> Treasury {
        self.treasury
    }

    /// Check the payout liability bound
    ///
    /// Sum of outstanding (unwithdrawn) claims never exceeds funds held.
    /// This is the critical solvency invariant of the protocol.
    pub fn check_reserve_invariant(&self) -> bool {
        self.insurance.outstanding_claims() <= self.treasury.balance()
    }
}
