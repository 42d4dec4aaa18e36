//! Core types for the surety protocol
//!
//! All types are designed for:
//! - Deterministic serialization (serde)
//! - Memory safety (no unsafe code)
//! - Exact arithmetic (integral wei amounts)

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use uuid::Uuid;

/// Amount in wei (smallest unit of the protocol currency)
pub type Wei = u128;

/// Wei per whole ether unit
pub const WEI_PER_ETHER: Wei = 1_000_000_000_000_000_000;

/// Convert a whole-ether amount to wei
pub fn ether(amount: u64) -> Wei {
    Wei::from(amount) * WEI_PER_ETHER
}

/// Participant identifier (address-like key for airlines, passengers, oracles)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address(String);

impl Address {
    /// Create new address
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Flight status resolved by oracle consensus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum FlightStatus {
    /// Not yet resolved
    Unknown = 0,
    /// Departed on time
    OnTime = 10,
    /// Delayed, airline at fault (payable)
    LateAirline = 20,
    /// Delayed by weather
    LateWeather = 30,
    /// Delayed by technical fault
    LateTechnical = 40,
    /// Delayed for another reason
    LateOther = 50,
}

impl FlightStatus {
    /// Wire code for this status
    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Parse from wire code
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(FlightStatus::Unknown),
            10 => Some(FlightStatus::OnTime),
            20 => Some(FlightStatus::LateAirline),
            30 => Some(FlightStatus::LateWeather),
            40 => Some(FlightStatus::LateTechnical),
            50 => Some(FlightStatus::LateOther),
            _ => None,
        }
    }

    /// A terminal status is any resolved outcome other than `Unknown`
    pub fn is_terminal(&self) -> bool {
        !matches!(self, FlightStatus::Unknown)
    }
}

impl fmt::Display for FlightStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlightStatus::Unknown => "unknown",
            FlightStatus::OnTime => "on-time",
            FlightStatus::LateAirline => "late-airline",
            FlightStatus::LateWeather => "late-weather",
            FlightStatus::LateTechnical => "late-technical",
            FlightStatus::LateOther => "late-other",
        };
        write!(f, "{}", name)
    }
}

/// Deterministic flight key: SHA-256 over (airline, flight number, timestamp)
///
/// Independent callers (buyer, oracle engine, UI) derive the same key
/// without a lookup round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FlightKey([u8; 32]);

impl FlightKey {
    /// Compute the key for (airline, flight number, timestamp)
    pub fn derive(airline: &Address, flight_number: &str, timestamp: i64) -> Self {
        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(airline.as_str().as_bytes());
        hasher.update([0u8]); // field separator
        hasher.update(flight_number.as_bytes());
        hasher.update([0u8]);
        hasher.update(timestamp.to_be_bytes());

        Self(hasher.finalize().into())
    }

    /// Raw key bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for FlightKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Airline registry entry
///
/// Created on first registration proposal; never deleted. `is_registered`
/// flips to true either immediately (bootstrap phase) or once half the
/// registered airlines have voted for admission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Airline {
    /// Airline identity
    pub address: Address,

    /// Display name
    pub name: String,

    /// Admission state
    pub is_registered: bool,

    /// Cumulative contributed stake (only ever increases)
    pub funded: Wei,

    /// Identities that voted for admission (uniqueness enforced)
    pub votes: HashSet<Address>,
}

impl Airline {
    /// Create a pending (unregistered) entry
    pub fn pending(address: Address, name: impl Into<String>) -> Self {
        Self {
            address,
            name: name.into(),
            is_registered: false,
            funded: 0,
            votes: HashSet::new(),
        }
    }

    /// Derived active predicate: registered and funded past the threshold
    pub fn is_active(&self, activation_threshold: Wei) -> bool {
        self.is_registered && self.funded >= activation_threshold
    }
}

/// Registered flight
///
/// Immutable once created except for `status`, written exactly once by
/// the oracle consensus engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flight {
    /// Deterministic flight key
    pub key: FlightKey,

    /// Operating airline
    pub airline: Address,

    /// Flight number
    pub flight_number: String,

    /// Scheduled departure (seconds since Unix epoch)
    pub timestamp: i64,

    /// Registration flag
    pub is_registered: bool,

    /// Resolved status (Unknown until quorum)
    pub status: FlightStatus,
}

/// Insurance policy keyed by (flight key, passenger)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    /// Insured flight
    pub flight_key: FlightKey,

    /// Policy holder
    pub passenger: Address,

    /// Cumulative premium paid (repeat purchases top up, capped)
    pub premium_paid: Wei,

    /// Claim amount, computed once at settlement
    pub claim_amount: Wei,

    /// Set once the owning flight resolved and the claim was computed
    pub settled: bool,

    /// Terminal flag flipped by withdrawal
    pub withdrawn: bool,
}

impl Policy {
    /// Create a fresh policy with an initial premium
    pub fn new(flight_key: FlightKey, passenger: Address, premium: Wei) -> Self {
        Self {
            flight_key,
            passenger,
            premium_paid: premium,
            claim_amount: 0,
            settled: false,
            withdrawn: false,
        }
    }

    /// Claim is payable but not yet withdrawn
    pub fn is_payable(&self) -> bool {
        self.claim_amount > 0 && !self.withdrawn
    }
}

/// Registered oracle identity with its three assigned indexes
///
/// Indexes are assigned at registration and stable for the identity's
/// lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleNode {
    /// Oracle identity
    pub address: Address,

    /// Three distinct assigned indexes from the bounded domain
    pub indexes: [u8; 3],
}

impl OracleNode {
    /// Whether `index` is among this oracle's assigned indexes
    pub fn has_index(&self, index: u8) -> bool {
        self.indexes.contains(&index)
    }
}

/// Key for an open oracle request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestKey {
    /// Flight under consensus
    pub flight_key: FlightKey,

    /// Target index drawn at request time
    pub index: u8,

    /// Flight timestamp (echoed by reports)
    pub timestamp: i64,
}

/// Open oracle request accumulating status reports
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleRequest {
    /// Request ID (UUIDv7 for time-ordering)
    pub request_id: Uuid,

    /// Request key: (flight, target index, timestamp)
    pub key: RequestKey,

    /// Still accepting reports toward quorum
    pub open: bool,

    /// Identities that already reported (duplicates ignored)
    pub reporters: HashSet<Address>,

    /// Matching-report tally per status
    pub tallies: HashMap<FlightStatus, u32>,
}

impl OracleRequest {
    /// Open a fresh request
    pub fn open(key: RequestKey) -> Self {
        Self {
            request_id: Uuid::now_v7(),
            key,
            open: true,
            reporters: HashSet::new(),
            tallies: HashMap::new(),
        }
    }

    /// Current tally for a status
    pub fn tally(&self, status: FlightStatus) -> u32 {
        self.tallies.get(&status).copied().unwrap_or(0)
    }
}
