//! Call message types for the auction ledger.

use auction_types::{Address, Amount, TokenId};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// Call messages for the auction ledger.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub enum AuctionCall {
    /// Put a token held by the sender up for auction.
    CreateAuction {
        token_id: TokenId,
        reserve_price: Amount,
        registry: Address,
    },

    /// Outbid the current leader; `amount` is locked from the sender.
    PlaceBid { token_id: TokenId, amount: Amount },

    /// Pull the sender's refund balance.
    WithdrawBid,

    /// Settle an auction after its deadline (seller only).
    CloseAuction { token_id: TokenId },
}
