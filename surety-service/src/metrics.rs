//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the protocol node.
//!
//! # Metrics
//!
//! - `surety_airlines_registered_total` - Total airlines admitted
//! - `surety_flights_registered_total` - Total flights registered
//! - `surety_policies_sold_total` - Total insurance purchases
//! - `surety_oracle_reports_total` - Total accepted oracle reports
//! - `surety_flights_resolved_total` - Total flights finalized
//! - `surety_withdrawals_total` - Total completed withdrawals
//! - `surety_treasury_balance_gwei` - Current treasury balance estimate
//! - `surety_rejected_calls_total` - Total rejected protocol calls

use prometheus::{IntCounter, IntGauge, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Total airlines admitted to the registry
    pub airlines_registered: IntCounter,

    /// Total flights registered
    pub flights_registered: IntCounter,

    /// Total insurance purchases
    pub policies_sold: IntCounter,

    /// Total accepted oracle reports
    pub oracle_reports: IntCounter,

    /// Total flights finalized with a status
    pub flights_resolved: IntCounter,

    /// Total completed withdrawals
    pub withdrawals: IntCounter,

    /// Treasury balance estimate in gwei (saturated at i64::MAX)
    pub treasury_balance: IntGauge,

    /// Total rejected protocol calls
    pub rejected_calls: IntCounter,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let airlines_registered = IntCounter::new(
            "surety_airlines_registered_total",
            "Total airlines admitted",
        )?;
        registry.register(Box::new(airlines_registered.clone()))?;

        let flights_registered = IntCounter::new(
            "surety_flights_registered_total",
            "Total flights registered",
        )?;
        registry.register(Box::new(flights_registered.clone()))?;

        let policies_sold = IntCounter::new(
            "surety_policies_sold_total",
            "Total insurance purchases",
        )?;
        registry.register(Box::new(policies_sold.clone()))?;

        let oracle_reports = IntCounter::new(
            "surety_oracle_reports_total",
            "Total accepted oracle reports",
        )?;
        registry.register(Box::new(oracle_reports.clone()))?;

        let flights_resolved = IntCounter::new(
            "surety_flights_resolved_total",
            "Total flights finalized",
        )?;
        registry.register(Box::new(flights_resolved.clone()))?;

        let withdrawals = IntCounter::new(
            "surety_withdrawals_total",
            "Total completed withdrawals",
        )?;
        registry.register(Box::new(withdrawals.clone()))?;

        let treasury_balance = IntGauge::new(
            "surety_treasury_balance_gwei",
            "Current treasury balance estimate",
        )?;
        registry.register(Box::new(treasury_balance.clone()))?;

        let rejected_calls = IntCounter::new(
            "surety_rejected_calls_total",
            "Total rejected protocol calls",
        )?;
        registry.register(Box::new(rejected_calls.clone()))?;

        Ok(Self {
            airlines_registered,
            flights_registered,
            policies_sold,
            oracle_reports,
            flights_resolved,
            withdrawals,
            treasury_balance,
            rejected_calls,
            registry,
        })
    }

    /// Record an airline admission
    pub fn record_airline_registered(&self) {
        self.airlines_registered.inc();
    }

    /// Record a flight registration
    pub fn record_flight_registered(&self) {
        self.flights_registered.inc();
    }

    /// Record an insurance purchase
    pub fn record_policy_sold(&self) {
        self.policies_sold.inc();
    }

    /// Record an accepted oracle report
    pub fn record_oracle_report(&self) {
        self.oracle_reports.inc();
    }

    /// Record a flight resolution
    pub fn record_flight_resolved(&self) {
        self.flights_resolved.inc();
    }

    /// Record a completed withdrawal
    pub fn record_withdrawal(&self) {
        self.withdrawals.inc();
    }

    /// Record a rejected protocol call
    pub fn record_rejected_call(&self) {
        self.rejected_calls.inc();
    }

    /// Update treasury balance estimate
    ///
    /// Wei amounts overflow the gauge, so the balance is reported in
    /// gwei.
    pub fn update_treasury_balance(&self, balance_wei: u128) {
        let gwei = balance_wei / 1_000_000_000;
        self.treasury_balance
            .set(i64::try_from(gwei).unwrap_or(i64::MAX));
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics")
    }
}
