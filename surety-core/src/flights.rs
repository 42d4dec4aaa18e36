//! Flight registry
//!
//! Flights are keyed deterministically over (airline, flight number,
//! timestamp). A flight is immutable once created except for its status,
//! which transitions exactly once from `Unknown` to a terminal code.

use crate::types::{Address, Flight, FlightKey, FlightStatus};
use crate::{Error, Result};
use std::collections::HashMap;

/// Arena of flights keyed by flight key
#[derive(Debug, Default)]
pub struct FlightRegistry {
    flights: HashMap<FlightKey, Flight>,

    /// Insertion order, for stable listing
    order: Vec<FlightKey>,
}

impl FlightRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a flight for an airline
    ///
    /// The funding gate is the caller's responsibility; this only guards
    /// against key collisions.
    pub fn register(
        &mut self,
        airline: Address,
        flight_number: &str,
        timestamp: i64,
    ) -> Result<FlightKey> {
        let key = FlightKey::derive(&airline, flight_number, timestamp);

        if self.flights.contains_key(&key) {
            return Err(Error::AlreadyExists(key.to_string()));
        }

        let flight = Flight {
            key,
            airline,
            flight_number: flight_number.to_string(),
            timestamp,
            is_registered: true,
            status: FlightStatus::Unknown,
        };

        tracing::info!(flight = %key, number = flight_number, "flight registered");
        self.flights.insert(key, flight);
        self.order.push(key);
        Ok(key)
    }

    /// Look up a flight
    pub fn get(&self, key: &FlightKey) -> Option<&Flight> {
        self.flights.get(key)
    }

    /// All flight keys in insertion order
    pub fn keys(&self) -> &[FlightKey] {
        &self.order
    }

    /// Write the resolved status, exactly once
    ///
    /// A second resolution attempt is a conflict; quorum logic treats it
    /// as a no-op before calling in here.
    pub fn resolve(&mut self, key: &FlightKey, status: FlightStatus) -> Result<&Flight> {
        if !status.is_terminal() {
            return Err(Error::InvariantViolation(
                "resolution status must be terminal".to_string(),
            ));
        }

        let flight = self
            .flights
            .get_mut(key)
            .ok_or_else(|| Error::UnknownFlight(key.to_string()))?;

        if flight.status.is_terminal() {
            return Err(Error::AlreadyResolved(key.to_string()));
        }

        flight.status = status;
        tracing::info!(flight = %key, status = %status, "flight status resolved");
        Ok(flight)
    }
}
