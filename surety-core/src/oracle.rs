//! Oracle consensus engine
//!
//! Oracle identities register by paying a fixed fee and are assigned
//! three distinct pseudo-random indexes from the bounded domain. A
//! status request draws a fresh target index, so each request selects a
//! small, unpredictable subset of oracles. The first status to reach
//! quorum becomes the flight's final status.
//!
//! There is no request expiry: an unresolved request stays open until a
//! fresh request for the same flight supersedes it.

use crate::params::ProtocolParams;
use crate::types::{Address, FlightKey, FlightStatus, OracleNode, OracleRequest, RequestKey, Wei};
use crate::{Error, Result};
use rand::rngs::StdRng;
use rand::Rng;
use std::collections::HashMap;

/// Outcome of a submitted report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    /// Duplicate submission or late report on a closed request; not an error
    Ignored,

    /// Report recorded, quorum not yet reached
    Recorded {
        /// Matching reports so far for the submitted status
        tally: u32,
    },

    /// Report recorded and quorum reached; the request is now closed
    QuorumReached {
        /// The winning status
        status: FlightStatus,
    },
}

/// Oracle arena and open-request table
#[derive(Debug, Default)]
pub struct OracleEngine {
    oracles: HashMap<Address, OracleNode>,
    requests: HashMap<RequestKey, OracleRequest>,
}

impl OracleEngine {
    /// Create an empty engine
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an oracle identity against the fixed fee
    ///
    /// Indexes are drawn at registration time and are stable for the
    /// identity's lifetime.
    pub fn register(
        &mut self,
        identity: Address,
        fee: Wei,
        params: &ProtocolParams,
        rng: &mut StdRng,
    ) -> Result<[u8; 3]> {
        let required = params.oracle_registration_fee();
        if fee < required {
            return Err(Error::InsufficientFee {
                paid: fee,
                required,
            });
        }

        if self.oracles.contains_key(&identity) {
            return Err(Error::AlreadyRegistered(identity.to_string()));
        }

        let indexes = draw_distinct_indexes(params.oracle_index_domain, rng);
        tracing::debug!(oracle = %identity, ?indexes, "oracle registered");
        self.oracles.insert(
            identity.clone(),
            OracleNode {
                address: identity,
                indexes,
            },
        );
        Ok(indexes)
    }

    /// Assigned indexes for an identity
    pub fn indexes(&self, identity: &Address) -> Option<[u8; 3]> {
        self.oracles.get(identity).map(|o| o.indexes)
    }

    /// Number of registered oracles
    pub fn oracle_count(&self) -> usize {
        self.oracles.len()
    }

    /// Open a request for a flight with a freshly drawn target index
    ///
    /// A collision with an existing request for the same (flight, index,
    /// timestamp) supersedes it: the tally restarts.
    pub fn open_request(
        &mut self,
        flight_key: FlightKey,
        timestamp: i64,
        domain: u8,
        rng: &mut StdRng,
    ) -> &OracleRequest {
        let index = rng.gen_range(0..domain);
        let key = RequestKey {
            flight_key,
            index,
            timestamp,
        };

        let request = OracleRequest::open(key);
        tracing::info!(
            flight = %flight_key,
            index,
            request = %request.request_id,
            "oracle request opened"
        );
        self.requests.insert(key, request);
        &self.requests[&key]
    }

    /// Record a status report from an oracle
    ///
    /// Rejects with `IndexMismatch` unless `index` is among the
    /// identity's assigned indexes, and with `UnknownRequest` if no
    /// request was ever opened for (flight, index, timestamp). Duplicate
    /// submissions and reports on closed requests are ignored, not
    /// errors.
    pub fn submit(
        &mut self,
        identity: &Address,
        index: u8,
        flight_key: FlightKey,
        timestamp: i64,
        status: FlightStatus,
        min_responses: u32,
    ) -> Result<ReportOutcome> {
        let oracle = self
            .oracles
            .get(identity)
            .ok_or_else(|| Error::NotRegistered(identity.to_string()))?;

        if !oracle.has_index(index) {
            return Err(Error::IndexMismatch(format!(
                "index {} is not assigned to {}",
                index, identity
            )));
        }

        let key = RequestKey {
            flight_key,
            index,
            timestamp,
        };
        let request = self
            .requests
            .get_mut(&key)
            .ok_or_else(|| Error::UnknownRequest(format!("{} index {}", flight_key, index)))?;

        if !request.open {
            return Ok(ReportOutcome::Ignored);
        }
        if !request.reporters.insert(identity.clone()) {
            return Ok(ReportOutcome::Ignored);
        }

        let tally = request.tallies.entry(status).or_insert(0);
        *tally += 1;
        let tally = *tally;

        if tally >= min_responses {
            request.open = false;
            tracing::info!(flight = %flight_key, status = %status, tally, "quorum reached");
            return Ok(ReportOutcome::QuorumReached { status });
        }

        tracing::debug!(flight = %flight_key, status = %status, tally, "report recorded");
        Ok(ReportOutcome::Recorded { tally })
    }

    /// Look up a request by key
    pub fn request(&self, key: &RequestKey) -> Option<&OracleRequest> {
        self.requests.get(key)
    }

    /// Open requests for a flight (diagnostic)
    pub fn open_requests(&self, flight_key: &FlightKey) -> Vec<&OracleRequest> {
        self.requests
            .values()
            .filter(|r| r.open && r.key.flight_key == *flight_key)
            .collect()
    }
}

/// Draw three distinct indexes from `0..domain`
fn draw_distinct_indexes(domain: u8, rng: &mut StdRng) -> [u8; 3] {
    let first = rng.gen_range(0..domain);
    let mut second = rng.gen_range(0..domain);
    while second == first {
        second = rng.gen_range(0..domain);
    }
    let mut third = rng.gen_range(0..domain);
    while third == first || third == second {
        third = rng.gen_range(0..domain);
    }
    [first, second, third]
}
