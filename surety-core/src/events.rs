//! Observable protocol events
//!
//! Exactly one event per committed transition, carrying the full new
//! state of the affected entity. External relays (oracle simulators, UI
//! refresh) consume these from the facade's outbox; the engine never
//! calls into a transport.

use crate::types::{Address, Airline, Flight, FlightStatus, OracleNode, OracleRequest, Policy, Wei};
use serde::{Deserialize, Serialize};

/// Protocol event emitted on a committed state transition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ProtocolEvent {
    /// Airline admitted to the registry (bootstrap or majority)
    AirlineRegistered {
        /// Full airline state after admission
        airline: Airline,
    },

    /// Admission vote recorded without reaching majority
    AirlineVoteRecorded {
        /// Full candidate state including the vote set
        airline: Airline,
    },

    /// Stake added to an airline
    AirlineFunded {
        /// Full airline state after funding
        airline: Airline,
    },

    /// Flight created by an active airline
    FlightRegistered {
        /// Full flight state
        flight: Flight,
    },

    /// Flight status finalized by oracle quorum
    FlightStatusResolved {
        /// Full flight state after resolution
        flight: Flight,
        /// Total claim amount credited to policies on this flight
        credited: Wei,
    },

    /// Coverage purchased or topped up
    InsurancePurchased {
        /// Full policy state after the purchase
        policy: Policy,
    },

    /// Oracle identity registered with its assigned indexes
    OracleRegistered {
        /// Full oracle state
        oracle: OracleNode,
    },

    /// Status request opened with a fresh target index
    OracleRequestOpened {
        /// Full request state
        request: OracleRequest,
    },

    /// Oracle report recorded toward quorum
    OracleReportAccepted {
        /// Full request state after the report
        request: OracleRequest,
        /// Reporting identity
        oracle: Address,
        /// Reported status
        status: FlightStatus,
    },

    /// Passenger credit transferred out
    WithdrawalCompleted {
        /// Withdrawing passenger
        passenger: Address,
        /// Amount transferred
        amount: Wei,
    },

    /// Administrative operational flag flipped
    OperationalChanged {
        /// New flag value
        operational: bool,
    },
}

impl ProtocolEvent {
    /// Stable event kind for routing and logging
    pub fn kind(&self) -> &'static str {
        match self {
            ProtocolEvent::AirlineRegistered { .. } => "airline.registered",
            ProtocolEvent::AirlineVoteRecorded { .. } => "airline.vote_recorded",
            ProtocolEvent::AirlineFunded { .. } => "airline.funded",
            ProtocolEvent::FlightRegistered { .. } => "flight.registered",
            ProtocolEvent::FlightStatusResolved { .. } => "flight.status_resolved",
            ProtocolEvent::InsurancePurchased { .. } => "insurance.purchased",
            ProtocolEvent::OracleRegistered { .. } => "oracle.registered",
            ProtocolEvent::OracleRequestOpened { .. } => "oracle.request_opened",
            ProtocolEvent::OracleReportAccepted { .. } => "oracle.report_accepted",
            ProtocolEvent::WithdrawalCompleted { .. } => "withdrawal.completed",
            ProtocolEvent::OperationalChanged { .. } => "operational.changed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind() {
        let event = ProtocolEvent::OperationalChanged { operational: false };
        assert_eq!(event.kind(), "operational.changed");
    }

    #[test]
    fn test_event_serialization() {
        let event = ProtocolEvent::WithdrawalCompleted {
            passenger: Address::new("0xP01"),
            amount: 1_500_000_000_000_000_000,
        };

        let json = serde_json::to_string(&event).unwrap();
        let back: ProtocolEvent = serde_json::from_str(&json).unwrap();
        match back {
            ProtocolEvent::WithdrawalCompleted { amount, .. } => {
                assert_eq!(amount, 1_500_000_000_000_000_000);
            }
            _ => panic!("wrong variant"),
        }
    }
}
