//! Protocol parameters
//!
//! Amounts are expressed in whole ether units in the file/env form and
//! converted to wei at the accessor boundary.

use crate::types::{ether, Wei};
use serde::{Deserialize, Serialize};

/// Protocol constants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolParams {
    /// Cumulative funding (ether) at which an airline becomes active
    pub activation_threshold_ether: u64,

    /// Per-policy cumulative premium cap (ether)
    pub max_premium_ether: u64,

    /// Payout multiplier numerator (claim = premium * num / den)
    pub payout_numerator: u64,

    /// Payout multiplier denominator
    pub payout_denominator: u64,

    /// Fixed oracle registration fee (ether)
    pub oracle_registration_fee_ether: u64,

    /// Matching reports required to finalize a flight status
    pub min_oracle_responses: u32,

    /// Oracle indexes are drawn from `0..oracle_index_domain`
    pub oracle_index_domain: u8,

    /// Registry size below which admission skips voting
    pub bootstrap_airlines: u32,

    /// Seed for the engine RNG; entropy-seeded when absent
    pub rng_seed: Option<u64>,
}

impl Default for ProtocolParams {
    fn default() -> Self {
        Self {
            activation_threshold_ether: 10,
            max_premium_ether: 1,
            payout_numerator: 3,
            payout_denominator: 2,
            oracle_registration_fee_ether: 1,
            min_oracle_responses: 3,
            oracle_index_domain: 10,
            bootstrap_airlines: 4,
            rng_seed: None,
        }
    }
}

impl ProtocolParams {
    /// Activation threshold in wei
    pub fn activation_threshold(&self) -> Wei {
        ether(self.activation_threshold_ether)
    }

    /// Premium cap in wei
    pub fn max_premium(&self) -> Wei {
        ether(self.max_premium_ether)
    }

    /// Oracle registration fee in wei
    pub fn oracle_registration_fee(&self) -> Wei {
        ether(self.oracle_registration_fee_ether)
    }

    /// Claim amount for a given cumulative premium
    pub fn claim_for(&self, premium: Wei) -> Wei {
        premium * Wei::from(self.payout_numerator) / Wei::from(self.payout_denominator)
    }

    /// Load from TOML file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let params: ProtocolParams = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse params: {}", e)))?;
        params.validate()?;
        Ok(params)
    }

    /// Load from environment variables, falling back to defaults
    pub fn from_env() -> crate::Result<Self> {
        let mut params = ProtocolParams::default();

        if let Ok(v) = std::env::var("SURETY_ACTIVATION_THRESHOLD_ETHER") {
            params.activation_threshold_ether = v
                .parse()
                .map_err(|e| crate::Error::Config(format!("Bad activation threshold: {}", e)))?;
        }

        if let Ok(v) = std::env::var("SURETY_MIN_ORACLE_RESPONSES") {
            params.min_oracle_responses = v
                .parse()
                .map_err(|e| crate::Error::Config(format!("Bad min responses: {}", e)))?;
        }

        if let Ok(v) = std::env::var("SURETY_RNG_SEED") {
            params.rng_seed = Some(
                v.parse()
                    .map_err(|e| crate::Error::Config(format!("Bad rng seed: {}", e)))?,
            );
        }

        params.validate()?;
        Ok(params)
    }

    /// Reject degenerate parameter sets
    pub fn validate(&self) -> crate::Result<()> {
        if self.payout_denominator == 0 {
            return Err(crate::Error::Config(
                "payout_denominator must be positive".to_string(),
            ));
        }
        if self.min_oracle_responses == 0 {
            return Err(crate::Error::Config(
                "min_oracle_responses must be positive".to_string(),
            ));
        }
        if self.oracle_index_domain < 3 {
            return Err(crate::Error::Config(
                "oracle_index_domain must allow three distinct indexes".to_string(),
            ));
        }
        Ok(())
    }
}
