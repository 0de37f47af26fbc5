//! Genesis configuration for the auction ledger.
//!
//! This module defines the parameters the ledger is started with. They are
//! fixed for the lifetime of the ledger state.

use auction_types::{derive_escrow_account, Address, DEFAULT_AUCTION_DURATION_SECS};
use serde::{Deserialize, Serialize};

/// Genesis configuration for the auction ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerGenesisConfig {
    /// Length of every auction's bidding window (seconds)
    pub auction_duration_secs: u64,

    /// Seed the escrow account is derived from
    pub escrow_seed: String,
}

impl Default for LedgerGenesisConfig {
    fn default() -> Self {
        Self {
            auction_duration_secs: DEFAULT_AUCTION_DURATION_SECS, // 15 minutes
            escrow_seed: "token-auction-escrow".to_string(),
        }
    }
}

impl LedgerGenesisConfig {
    /// Account holding assets and locked funds in custody.
    pub fn escrow_account(&self) -> Address {
        derive_escrow_account(&self.escrow_seed)
    }

    /// Validate the genesis configuration.
    pub fn validate(&self) -> Result<(), GenesisValidationError> {
        if self.auction_duration_secs == 0 {
            return Err(GenesisValidationError::InvalidDuration(
                "Auction duration cannot be zero".into(),
            ));
        }

        if self.escrow_seed.trim().is_empty() {
            return Err(GenesisValidationError::EmptyEscrowSeed);
        }

        Ok(())
    }
}

/// Errors that can occur during genesis validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenesisValidationError {
    #[error("Invalid auction duration: {0}")]
    InvalidDuration(String),

    #[error("Escrow seed cannot be empty")]
    EmptyEscrowSeed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LedgerGenesisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.auction_duration_secs, 900);
    }

    #[test]
    fn test_zero_duration() {
        let config = LedgerGenesisConfig {
            auction_duration_secs: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(GenesisValidationError::InvalidDuration(_))
        ));
    }

    #[test]
    fn test_empty_seed() {
        let config = LedgerGenesisConfig {
            escrow_seed: "  ".into(),
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(GenesisValidationError::EmptyEscrowSeed)
        );
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: LedgerGenesisConfig =
            serde_json::from_str(r#"{ "auction_duration_secs": 60 }"#).unwrap();
        assert_eq!(config.auction_duration_secs, 60);
        assert_eq!(config.escrow_seed, LedgerGenesisConfig::default().escrow_seed);
    }
}
