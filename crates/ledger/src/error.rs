//! Auction ledger error types.

use thiserror::Error;

use auction_types::{Amount, TokenId};

use crate::registry::RegistryError;
use crate::treasury::TransferError;

/// Errors that can occur in the auction ledger.
///
/// Every variant is returned before the failing call has left any trace in
/// the ledger state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuctionError {
    #[error("Not owner of token {0}")]
    NotOwner(TokenId),

    #[error("Reserve price must be greater than zero")]
    ZeroPrice,

    #[error("Token {0} is already being auctioned")]
    AlreadyAuctioned(TokenId),

    #[error("No active auction for token {0}")]
    NotAuctioned(TokenId),

    #[error("Bid amount must be greater than {floor}, got {amount}")]
    BidTooLow { amount: Amount, floor: Amount },

    #[error("Caller has no refund to withdraw")]
    NotDisplacedBidder,

    #[error("Auction has not ended: closes at {closes_at}, now {now}")]
    AuctionNotEnded { closes_at: u64, now: u64 },

    #[error("Only the seller can close the auction for token {0}")]
    NotSeller(TokenId),

    #[error("Unknown asset registry: {0}")]
    UnknownRegistry(String),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Transfer failed: {0}")]
    Transfer(#[from] TransferError),

    #[error("Refund balance overflow")]
    BalanceOverflow,
}
