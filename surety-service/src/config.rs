//! Configuration for the service

use serde::{Deserialize, Serialize};
use surety_core::ProtocolParams;

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Protocol administrator identity
    pub admin: String,

    /// Genesis airline identity
    pub genesis_airline: String,

    /// Genesis airline display name
    pub genesis_airline_name: String,

    /// Actor mailbox capacity (backpressure bound)
    pub mailbox_capacity: usize,

    /// Event bus channel capacity
    pub event_capacity: usize,

    /// Protocol parameters
    pub protocol: ProtocolParams,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            service_name: "surety-service".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            admin: "0xADMIN".to_string(),
            genesis_airline: "0xA001".to_string(),
            genesis_airline_name: "GENESIS".to_string(),
            mailbox_capacity: 1000,
            event_capacity: 1024,
            protocol: ProtocolParams::default(),
        }
    }
}

impl ServiceConfig {
    /// Load from TOML file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ServiceConfig = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.protocol.validate().map_err(crate::Error::Protocol)?;
        Ok(config)
    }

    /// Load from environment variables, falling back to defaults
    pub fn from_env() -> crate::Result<Self> {
        let mut config = ServiceConfig::default();

        if let Ok(admin) = std::env::var("SURETY_ADMIN") {
            config.admin = admin;
        }

        if let Ok(airline) = std::env::var("SURETY_GENESIS_AIRLINE") {
            config.genesis_airline = airline;
        }

        config.protocol = ProtocolParams::from_env().map_err(crate::Error::Protocol)?;

        Ok(config)
    }
}
