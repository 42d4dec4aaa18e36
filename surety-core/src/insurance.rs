//! Insurance ledger
//!
//! Sells coverage against a flight key, computes claim amounts when a
//! flight resolves to `LateAirline`, and tracks per-passenger credit and
//! withdrawal. Policies are an arena keyed by (flight key, passenger)
//! with index vectors per flight and per passenger.

use crate::params::ProtocolParams;
use crate::types::{Address, FlightKey, Policy, Wei};
use crate::{Error, FlightStatus, Result};
use std::collections::HashMap;

/// Policy key: (flight, passenger)
pub type PolicyKey = (FlightKey, Address);

/// Arena of insurance policies
#[derive(Debug, Default)]
pub struct InsuranceLedger {
    policies: HashMap<PolicyKey, Policy>,

    /// Passengers holding a policy on each flight
    by_flight: HashMap<FlightKey, Vec<Address>>,

    /// Flights each passenger holds a policy on
    by_passenger: HashMap<Address, Vec<FlightKey>>,
}

impl InsuranceLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Buy (or top up) coverage for a flight
    ///
    /// Flight existence and resolution state are the facade's checks;
    /// this enforces the premium bounds. A repeat purchase for the same
    /// key adds to `premium_paid`, still bounded by the cap.
    pub fn buy(
        &mut self,
        passenger: Address,
        flight_key: FlightKey,
        premium: Wei,
        cap: Wei,
    ) -> Result<&Policy> {
        if premium == 0 {
            return Err(Error::InvalidAmount("premium must be positive".to_string()));
        }

        let key = (flight_key, passenger.clone());
        let existing = self.policies.get(&key).map(|p| p.premium_paid).unwrap_or(0);
        // Saturation still trips the cap check, so no overflow panic.
        let total = existing.saturating_add(premium);
        if total > cap {
            return Err(Error::PremiumExceedsCap {
                premium: total,
                cap,
            });
        }

        if !self.policies.contains_key(&key) {
            self.by_flight
                .entry(flight_key)
                .or_default()
                .push(passenger.clone());
            self.by_passenger
                .entry(passenger.clone())
                .or_default()
                .push(flight_key);
        }
        let policy = self
            .policies
            .entry(key)
            .or_insert_with_key(|(flight, holder)| Policy::new(*flight, holder.clone(), 0));
        policy.premium_paid = total;

        tracing::debug!(
            flight = %policy.flight_key,
            passenger = %policy.passenger,
            premium = policy.premium_paid,
            "insurance purchased"
        );
        Ok(policy)
    }

    /// Look up a policy
    pub fn get(&self, flight_key: &FlightKey, passenger: &Address) -> Option<&Policy> {
        self.policies.get(&(*flight_key, passenger.clone()))
    }

    /// Settle every policy on a resolved flight
    ///
    /// `LateAirline` credits each policy with premium scaled by the
    /// payout ratio, computed once and memoized; any other terminal code
    /// settles the policies at zero. Returns the total credited.
    pub fn settle_flight(
        &mut self,
        flight_key: &FlightKey,
        status: FlightStatus,
        params: &ProtocolParams,
    ) -> Wei {
        let holders = match self.by_flight.get(flight_key) {
            Some(holders) => holders.clone(),
            None => return 0,
        };

        let mut credited = 0;
        for passenger in holders {
            let key = (*flight_key, passenger);
            if let Some(policy) = self.policies.get_mut(&key) {
                if policy.settled {
                    continue;
                }
                policy.settled = true;
                if status == FlightStatus::LateAirline {
                    policy.claim_amount = params.claim_for(policy.premium_paid);
                    credited += policy.claim_amount;
                }
            }
        }

        if credited > 0 {
            tracing::info!(flight = %flight_key, credited, "insurance claims credited");
        }
        credited
    }

    /// Sum of payable (credited, unwithdrawn) claims for a passenger
    pub fn withdrawable(&self, passenger: &Address) -> Wei {
        self.by_passenger
            .get(passenger)
            .map(|flights| {
                flights
                    .iter()
                    .filter_map(|f| self.policies.get(&(*f, passenger.clone())))
                    .filter(|p| p.is_payable())
                    .map(|p| p.claim_amount)
                    .sum()
            })
            .unwrap_or(0)
    }

    /// Mark every payable claim withdrawn and return the total
    ///
    /// The flip and the transfer commit together inside the single-writer
    /// engine, so no caller can observe a policy between them.
    pub fn withdraw(&mut self, passenger: &Address) -> Result<Wei> {
        let flights = self
            .by_passenger
            .get(passenger)
            .cloned()
            .unwrap_or_default();

        let mut total = 0;
        for flight_key in flights {
            let key = (flight_key, passenger.clone());
            if let Some(policy) = self.policies.get_mut(&key) {
                if policy.is_payable() {
                    total += policy.claim_amount;
                    policy.withdrawn = true;
                }
            }
        }

        if total == 0 {
            return Err(Error::NothingToWithdraw(passenger.to_string()));
        }

        tracing::info!(passenger = %passenger, amount = total, "withdrawal completed");
        Ok(total)
    }

    /// Sum of all outstanding (credited, unwithdrawn) claims
    pub fn outstanding_claims(&self) -> Wei {
        self.policies
            .values()
            .filter(|p| p.is_payable())
            .map(|p| p.claim_amount)
            .sum()
    }
}
