//! Core type definitions for escrow-backed token auctions.
//!
//! This crate provides the shared data structures used across the auction
//! ledger: identifiers, auction records, settlement results and the events
//! emitted on every committed transition.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

pub mod events;

pub use events::AuctionEvent;

// =========================
// IDENTIFIERS
// =========================

/// Generic address type (32 bytes). Used for participants, registries and
/// the escrow account alike.
pub type Address = [u8; 32];

/// Identifier of a token inside its asset registry.
pub type TokenId = u64;

/// Sequential identifier assigned by the ledger to every auction it opens.
pub type AuctionId = u64;

/// Amount of funds in the smallest indivisible unit.
pub type Amount = u128;

/// Default time before an auction can be settled: 15 minutes.
pub const DEFAULT_AUCTION_DURATION_SECS: u64 = 15 * 60;

// =========================
// AUCTION TYPES
// =========================

/// Auction lifecycle state
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub enum AuctionStatus {
    /// Asset in escrow, accepting bids until `closes_at`
    Active,
    /// Settled; terminal
    Closed,
}

/// A single auction as recorded by the ledger.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct AuctionRecord {
    pub auction_id: AuctionId,
    pub token_id: TokenId,
    pub seller: Address,
    /// Registry holding the canonical ownership record of `token_id`
    pub registry: Address,
    pub reserve_price: Amount,

    // Bid state
    pub highest_bidder: Option<Address>,
    pub highest_bid: Amount,

    // Timing
    pub created_at: u64,
    pub closes_at: u64,

    pub status: AuctionStatus,
}

impl AuctionRecord {
    pub fn is_active(&self) -> bool {
        self.status == AuctionStatus::Active
    }

    /// Whether the auction can be settled at `now`.
    pub fn has_ended(&self, now: u64) -> bool {
        now >= self.closes_at
    }

    /// Amount a new bid has to strictly exceed.
    pub fn bid_floor(&self) -> Amount {
        match self.highest_bidder {
            Some(_) => self.highest_bid.max(self.reserve_price),
            None => self.reserve_price,
        }
    }
}

/// Outcome of closing an auction.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct Settlement {
    pub auction_id: AuctionId,
    pub token_id: TokenId,
    pub seller: Address,
    /// `None` when the auction closed without bids and the asset went back
    /// to the seller
    pub winner: Option<Address>,
    /// Amount paid to the seller
    pub amount: Amount,
    pub closed_at: u64,
}

// =========================
// HELPER FUNCTIONS
// =========================

/// Derive the escrow account that holds assets and locked funds in custody.
pub fn derive_escrow_account(seed: &str) -> Address {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(b"TOKEN_AUCTION_ESCROW_V1:");
    hasher.update(seed.as_bytes());
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> AuctionRecord {
        AuctionRecord {
            auction_id: 1,
            token_id: 7,
            seller: [1u8; 32],
            registry: [9u8; 32],
            reserve_price: 100,
            highest_bidder: None,
            highest_bid: 0,
            created_at: 1_000,
            closes_at: 1_000 + DEFAULT_AUCTION_DURATION_SECS,
            status: AuctionStatus::Active,
        }
    }

    #[test]
    fn test_derive_escrow_account() {
        let a = derive_escrow_account("ledger-a");
        let b = derive_escrow_account("ledger-b");

        assert_ne!(a, b);
        assert_eq!(a, derive_escrow_account("ledger-a"));
    }

    #[test]
    fn test_bid_floor() {
        let mut auction = record();
        assert_eq!(auction.bid_floor(), 100);

        auction.highest_bidder = Some([2u8; 32]);
        auction.highest_bid = 150;
        assert_eq!(auction.bid_floor(), 150);
    }

    #[test]
    fn test_deadline_is_inclusive() {
        let auction = record();
        assert!(!auction.has_ended(auction.closes_at - 1));
        assert!(auction.has_ended(auction.closes_at));
        assert!(auction.has_ended(auction.closes_at + 1));
    }

    #[test]
    fn test_record_serialization() {
        let mut auction = record();
        auction.highest_bidder = Some([3u8; 32]);
        auction.highest_bid = 1_500_000_000_000_000_000;

        let encoded = borsh::to_vec(&auction).unwrap();
        let decoded: AuctionRecord = borsh::from_slice(&encoded).unwrap();
        assert_eq!(auction, decoded);
    }
}
