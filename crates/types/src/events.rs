//! Notifications emitted by the ledger on committed transitions.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::{Address, Amount, AuctionId, TokenId};

/// Event appended to the ledger's log after a call commits.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub enum AuctionEvent {
    /// Asset moved into escrow and bidding opened.
    AuctionCreated {
        auction_id: AuctionId,
        token_id: TokenId,
        seller: Address,
        registry: Address,
        reserve_price: Amount,
        closes_at: u64,
    },

    /// A new highest bid was accepted.
    BidPlaced {
        bidder: Address,
        amount: Amount,
        token_id: TokenId,
        registry: Address,
    },

    /// Asset delivered to `winner`, `amount` paid to the seller.
    AuctionClosed {
        token_id: TokenId,
        winner: Address,
        amount: Amount,
    },

    /// Closed without bids; asset returned to the seller.
    AuctionClosedNoBid { token_id: TokenId },

    /// A displaced bidder pulled their refund.
    RefundWithdrawn { bidder: Address, amount: Amount },
}
