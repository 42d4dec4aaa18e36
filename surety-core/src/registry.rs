//! Airline registry and funding gate
//!
//! Admission state machine per airline: Unregistered -> Pending ->
//! Registered. The first `bootstrap` slots are filled without voting;
//! afterwards admission requires votes from at least half of the
//! currently registered airlines, recomputed on every vote because the
//! denominator can grow between votes.

use crate::types::{Address, Airline, Wei};
use crate::{Error, Result};
use std::collections::HashMap;

/// Outcome of a registration proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProposalOutcome {
    /// Vote count after this proposal (0 for bootstrap admissions)
    pub votes: u32,

    /// Whether the candidate is now registered
    pub is_registered: bool,
}

/// Arena of airline entries keyed by identity
#[derive(Debug, Default)]
pub struct AirlineRegistry {
    airlines: HashMap<Address, Airline>,

    /// Insertion order, for stable listing
    order: Vec<Address>,
}

impl AirlineRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an airline unconditionally (genesis admission)
    pub fn register_genesis(&mut self, address: Address, name: impl Into<String>) {
        if self.airlines.contains_key(&address) {
            return;
        }
        let mut airline = Airline::pending(address.clone(), name);
        airline.is_registered = true;
        self.order.push(address.clone());
        self.airlines.insert(address, airline);
    }

    /// Number of registered airlines (the majority denominator)
    pub fn registered_count(&self) -> u32 {
        self.airlines.values().filter(|a| a.is_registered).count() as u32
    }

    /// Look up an entry
    pub fn get(&self, address: &Address) -> Option<&Airline> {
        self.airlines.get(address)
    }

    /// Registered airlines in insertion order
    pub fn registered(&self) -> Vec<&Airline> {
        self.order
            .iter()
            .filter_map(|a| self.airlines.get(a))
            .filter(|a| a.is_registered)
            .collect()
    }

    /// Active airlines (registered and funded past the threshold)
    pub fn active(&self, activation_threshold: Wei) -> Vec<&Airline> {
        self.order
            .iter()
            .filter_map(|a| self.airlines.get(a))
            .filter(|a| a.is_active(activation_threshold))
            .collect()
    }

    /// Whether `address` is active under the given threshold
    pub fn is_active(&self, address: &Address, activation_threshold: Wei) -> bool {
        self.airlines
            .get(address)
            .map(|a| a.is_active(activation_threshold))
            .unwrap_or(false)
    }

    /// Add stake to an airline's funding total
    ///
    /// Funding is additive and never withdrawn; the active predicate is
    /// derived, not stored.
    pub fn fund(&mut self, airline: &Address, amount: Wei) -> Result<Wei> {
        if amount == 0 {
            return Err(Error::InvalidAmount("funding amount must be positive".to_string()));
        }

        let entry = self
            .airlines
            .get_mut(airline)
            .filter(|a| a.is_registered)
            .ok_or_else(|| Error::NotRegistered(airline.to_string()))?;

        entry.funded = entry.funded.saturating_add(amount);
        tracing::debug!(airline = %airline, funded = entry.funded, "airline funded");
        Ok(entry.funded)
    }

    /// Propose a candidate airline for admission
    ///
    /// Below `bootstrap` registered airlines the candidate is admitted
    /// directly; otherwise the proposer's vote is recorded (idempotent)
    /// and the majority check runs against the current registry size.
    pub fn propose(
        &mut self,
        proposer: &Address,
        candidate: Address,
        name: &str,
        activation_threshold: Wei,
        bootstrap: u32,
    ) -> Result<ProposalOutcome> {
        if !self.is_active(proposer, activation_threshold) {
            return Err(Error::Unauthorized(format!(
                "proposer {} is not an active airline",
                proposer
            )));
        }

        if let Some(existing) = self.airlines.get(&candidate) {
            if existing.is_registered {
                return Err(Error::AlreadyRegistered(candidate.to_string()));
            }
        }

        let registered = self.registered_count();

        if !self.airlines.contains_key(&candidate) {
            self.order.push(candidate.clone());
        }
        let entry = self
            .airlines
            .entry(candidate)
            .or_insert_with_key(|key| Airline::pending(key.clone(), name));

        // Bootstrap phase: no quorum possible yet, admit directly.
        if registered < bootstrap {
            entry.is_registered = true;
            tracing::info!(candidate = %entry.address, "airline admitted (bootstrap)");
            return Ok(ProposalOutcome {
                votes: 0,
                is_registered: true,
            });
        }

        // Re-voting by the same proposer is a no-op, not an error.
        entry.votes.insert(proposer.clone());
        let votes = entry.votes.len() as u32;

        // Admission at half the registry, so 2 of 4 suffices.
        if votes * 2 >= registered {
            entry.is_registered = true;
            tracing::info!(candidate = %entry.address, votes, "airline admitted (majority)");
        }

        Ok(ProposalOutcome {
            votes,
            is_registered: entry.is_registered,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ether;

    fn addr(n: u32) -> Address {
        Address::new(format!("0xA{:02}", n))
    }

    fn registry_with_genesis() -> AirlineRegistry {
        let mut registry = AirlineRegistry::new();
        registry.register_genesis(addr(1), "UDA_001");
        registry
    }

    #[test]
    fn test_fund_requires_entry() {
        let mut registry = registry_with_genesis();
        let result = registry.fund(&addr(9), ether(10));
        assert!(matches!(result, Err(Error::NotRegistered(_))));
    }

    #[test]
    fn test_fund_rejects_zero() {
        let mut registry = registry_with_genesis();
        let result = registry.fund(&addr(1), 0);
        assert!(matches!(result, Err(Error::InvalidAmount(_))));
    }

    #[test]
    fn test_fund_accumulates() {
        let mut registry = registry_with_genesis();
        assert_eq!(registry.fund(&addr(1), ether(4)).unwrap(), ether(4));
        assert_eq!(registry.fund(&addr(1), ether(6)).unwrap(), ether(10));
        assert!(registry.is_active(&addr(1), ether(10)));
    }

    #[test]
    fn test_fund_saturates_at_max() {
        let mut registry = registry_with_genesis();
        registry.fund(&addr(1), u128::MAX).unwrap();
        assert_eq!(registry.fund(&addr(1), u128::MAX).unwrap(), u128::MAX);
        assert!(registry.is_active(&addr(1), ether(10)));
    }

    #[test]
    fn test_unfunded_proposer_rejected() {
        let mut registry = registry_with_genesis();
        let result = registry.propose(&addr(1), addr(2), "UDA_002", ether(10), 4);
        assert!(matches!(result, Err(Error::Unauthorized(_))));
    }

    #[test]
    fn test_bootstrap_admission() {
        let mut registry = registry_with_genesis();
        registry.fund(&addr(1), ether(10)).unwrap();

        for n in 2..=4 {
            let outcome = registry
                .propose(&addr(1), addr(n), "UDA", ether(10), 4)
                .unwrap();
            assert_eq!(outcome.votes, 0);
            assert!(outcome.is_registered);
        }
        assert_eq!(registry.registered_count(), 4);
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = registry_with_genesis();
        registry.fund(&addr(1), ether(10)).unwrap();
        registry.propose(&addr(1), addr(2), "UDA_002", ether(10), 4).unwrap();

        let result = registry.propose(&addr(1), addr(2), "UDA_002", ether(10), 4);
        assert!(matches!(result, Err(Error::AlreadyRegistered(_))));
    }

    #[test]
    fn test_fifth_airline_needs_majority() {
        let mut registry = registry_with_genesis();
        registry.fund(&addr(1), ether(10)).unwrap();
        for n in 2..=4 {
            registry.propose(&addr(1), addr(n), "UDA", ether(10), 4).unwrap();
            registry.fund(&addr(n), ether(10)).unwrap();
        }

        // First vote: 1 of 4, below half.
        let first = registry
            .propose(&addr(1), addr(5), "UDA_005", ether(10), 4)
            .unwrap();
        assert_eq!(first.votes, 1);
        assert!(!first.is_registered);

        // Second vote from a different airline: 2 * 2 >= 4.
        let second = registry
            .propose(&addr(2), addr(5), "UDA_005", ether(10), 4)
            .unwrap();
        assert_eq!(second.votes, 2);
        assert!(second.is_registered);
    }

    #[test]
    fn test_revote_is_noop() {
        let mut registry = registry_with_genesis();
        registry.fund(&addr(1), ether(10)).unwrap();
        for n in 2..=4 {
            registry.propose(&addr(1), addr(n), "UDA", ether(10), 4).unwrap();
            registry.fund(&addr(n), ether(10)).unwrap();
        }

        registry.propose(&addr(1), addr(5), "UDA_005", ether(10), 4).unwrap();
        let repeat = registry
            .propose(&addr(1), addr(5), "UDA_005", ether(10), 4)
            .unwrap();
        assert_eq!(repeat.votes, 1);
        assert!(!repeat.is_registered);
    }

    #[test]
    fn test_majority_denominator_grows() {
        let mut registry = registry_with_genesis();
        registry.fund(&addr(1), ether(10)).unwrap();
        for n in 2..=4 {
            registry.propose(&addr(1), addr(n), "UDA", ether(10), 4).unwrap();
            registry.fund(&addr(n), ether(10)).unwrap();
        }

        // One vote for candidate 5 while the registry holds 4 airlines.
        registry.propose(&addr(1), addr(5), "UDA_005", ether(10), 4).unwrap();
        // Candidate 6 gets admitted by majority, growing the denominator to 5.
        registry.propose(&addr(2), addr(5), "UDA_005", ether(10), 4).unwrap();
        assert_eq!(registry.registered_count(), 5);

        // A new candidate now needs 3 of 5, recomputed at vote time.
        registry.fund(&addr(5), ether(10)).unwrap();
        let one = registry.propose(&addr(1), addr(6), "UDA_006", ether(10), 4).unwrap();
        assert!(!one.is_registered);
        let two = registry.propose(&addr(2), addr(6), "UDA_006", ether(10), 4).unwrap();
        assert!(!two.is_registered);
        let three = registry.propose(&addr(5), addr(6), "UDA_006", ether(10), 4).unwrap();
        assert_eq!(three.votes, 3);
        assert!(three.is_registered);
    }

    #[test]
    fn test_admission_at_half_of_even_registry() {
        let mut registry = registry_with_genesis();
        registry.fund(&addr(1), ether(10)).unwrap();
        for n in 2..=4 {
            registry.propose(&addr(1), addr(n), "UDA", ether(10), 4).unwrap();
            registry.fund(&addr(n), ether(10)).unwrap();
        }
        registry.propose(&addr(1), addr(5), "UDA_005", ether(10), 4).unwrap();
        registry.propose(&addr(2), addr(5), "UDA_005", ether(10), 4).unwrap();
        registry.fund(&addr(5), ether(10)).unwrap();
        registry.propose(&addr(1), addr(6), "UDA_006", ether(10), 4).unwrap();
        registry.propose(&addr(2), addr(6), "UDA_006", ether(10), 4).unwrap();
        registry.propose(&addr(5), addr(6), "UDA_006", ether(10), 4).unwrap();
        assert_eq!(registry.registered_count(), 6);

        // Six registered: two votes fall short, the third is half.
        registry.propose(&addr(1), addr(7), "UDA_007", ether(10), 4).unwrap();
        let two = registry
            .propose(&addr(2), addr(7), "UDA_007", ether(10), 4)
            .unwrap();
        assert!(!two.is_registered);
        let three = registry
            .propose(&addr(5), addr(7), "UDA_007", ether(10), 4)
            .unwrap();
        assert_eq!(three.votes, 3);
        assert!(three.is_registered);
    }

    #[test]
    fn test_listings() {
        let mut registry = registry_with_genesis();
        registry.fund(&addr(1), ether(10)).unwrap();
        registry.propose(&addr(1), addr(2), "UDA_002", ether(10), 4).unwrap();

        assert_eq!(registry.registered().len(), 2);
        assert_eq!(registry.active(ether(10)).len(), 1);
    }
}
