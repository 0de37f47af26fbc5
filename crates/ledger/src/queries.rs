//! Query handlers for the auction ledger.
//!
//! These functions provide read-only access to ledger state.

use crate::state::LedgerState;
use auction_types::{Address, Amount, AuctionId, AuctionRecord, AuctionStatus, TokenId};
use serde::{Deserialize, Serialize};

/// Query request types.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum AuctionQuery {
    /// Latest auction for a token.
    GetAuction { token_id: TokenId },

    /// Get auction details by ID.
    GetAuctionById { auction_id: AuctionId },

    /// Get all auctions (paginated).
    ListAuctions { offset: u64, limit: u64 },

    /// Every auction opened for a token.
    GetTokenHistory { token_id: TokenId },

    /// Get a participant's withdrawable refund.
    GetRefundBalance { address: Address },
}

/// Query response types.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum AuctionQueryResponse {
    /// Auction details.
    Auction(Option<AuctionRecord>),

    /// List of auctions.
    AuctionList(Vec<AuctionRecord>),

    /// Refund balance.
    RefundBalance(Amount),
}

/// Handle a query.
pub fn handle_query(state: &LedgerState, query: AuctionQuery) -> AuctionQueryResponse {
    match query {
        AuctionQuery::GetAuction { token_id } => {
            AuctionQueryResponse::Auction(state.get_auction(token_id).cloned())
        }

        AuctionQuery::GetAuctionById { auction_id } => {
            AuctionQueryResponse::Auction(state.get_auction_by_id(auction_id).cloned())
        }

        AuctionQuery::ListAuctions { offset, limit } => {
            let auctions: Vec<AuctionRecord> = state
                .auctions()
                .skip(usize::try_from(offset).unwrap_or(usize::MAX))
                .take(usize::try_from(limit).unwrap_or(usize::MAX))
                .cloned()
                .collect();
            AuctionQueryResponse::AuctionList(auctions)
        }

        AuctionQuery::GetTokenHistory { token_id } => AuctionQueryResponse::AuctionList(
            state.token_history(token_id).into_iter().cloned().collect(),
        ),

        AuctionQuery::GetRefundBalance { address } => {
            AuctionQueryResponse::RefundBalance(state.vault().balance_of(&address))
        }
    }
}

/// Summary of an auction for listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionSummary {
    pub auction_id: AuctionId,
    pub token_id: TokenId,
    pub seller: Address,
    pub status: AuctionStatus,
    pub highest_bid: Amount,
    pub has_bid: bool,
    pub closes_at: u64,
}

impl AuctionSummary {
    pub fn from_auction(auction: &AuctionRecord) -> Self {
        Self {
            auction_id: auction.auction_id,
            token_id: auction.token_id,
            seller: auction.seller,
            status: auction.status,
            highest_bid: auction.highest_bid,
            has_bid: auction.highest_bidder.is_some(),
            closes_at: auction.closes_at,
        }
    }
}

/// Get active auctions (currently accepting bids).
pub fn get_active_auctions(state: &LedgerState) -> Vec<AuctionSummary> {
    state
        .auctions()
        .filter(|auction| auction.is_active())
        .map(AuctionSummary::from_auction)
        .collect()
}

/// Get tokens whose auction is past its deadline and awaiting settlement.
pub fn get_closable_auctions(state: &LedgerState, current_time: u64) -> Vec<TokenId> {
    state
        .auctions()
        .filter(|auction| auction.is_active() && auction.has_ended(current_time))
        .map(|auction| auction.token_id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::{handle_create_auction, handle_place_bid, CallContext};
    use crate::registry::InMemoryRegistry;
    use crate::treasury::Bank;

    const REGISTRY: Address = [0xAAu8; 32];
    const SELLER: Address = [1u8; 32];

    fn state_with_auctions() -> LedgerState {
        let mut state = LedgerState::new([0xEEu8; 32], 100);
        let mut registry = InMemoryRegistry::new(REGISTRY);
        let mut bank = Bank::new(state.escrow_account());
        bank.deposit([2u8; 32], 1_000).unwrap();

        for (token_id, timestamp) in [(1, 0), (2, 50)] {
            registry.mint(token_id, SELLER).unwrap();
            let ctx = CallContext {
                sender: SELLER,
                timestamp,
            };
            handle_create_auction(&mut state, &mut registry, &ctx, token_id, 10, REGISTRY)
                .unwrap();
        }

        let ctx = CallContext {
            sender: [2u8; 32],
            timestamp: 60,
        };
        handle_place_bid(&mut state, &mut bank, &ctx, 2, 20).unwrap();
        handle_place_bid(&mut state, &mut bank, &ctx, 2, 30).unwrap();
        state
    }

    #[test]
    fn test_get_auction_query() {
        let state = state_with_auctions();

        let response = handle_query(&state, AuctionQuery::GetAuction { token_id: 2 });
        assert!(matches!(
            response,
            AuctionQueryResponse::Auction(Some(AuctionRecord { highest_bid: 30, .. }))
        ));

        let response = handle_query(&state, AuctionQuery::GetAuction { token_id: 3 });
        assert!(matches!(response, AuctionQueryResponse::Auction(None)));
    }

    #[test]
    fn test_list_auctions_paginated() {
        let state = state_with_auctions();

        let response = handle_query(&state, AuctionQuery::ListAuctions { offset: 1, limit: 10 });
        match response {
            AuctionQueryResponse::AuctionList(auctions) => {
                assert_eq!(auctions.len(), 1);
                assert_eq!(auctions[0].auction_id, 2);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn test_list_auctions_extreme_bounds() {
        let state = state_with_auctions();

        let all = handle_query(&state, AuctionQuery::ListAuctions { offset: 0, limit: u64::MAX });
        assert!(matches!(all, AuctionQueryResponse::AuctionList(ref list) if list.len() == 2));

        let past_end =
            handle_query(&state, AuctionQuery::ListAuctions { offset: u64::MAX, limit: 10 });
        assert!(matches!(past_end, AuctionQueryResponse::AuctionList(ref list) if list.is_empty()));
    }

    #[test]
    fn test_get_refund_balance_query() {
        let state = state_with_auctions();

        let response = handle_query(
            &state,
            AuctionQuery::GetRefundBalance { address: [2u8; 32] },
        );
        assert!(matches!(response, AuctionQueryResponse::RefundBalance(20)));
    }

    #[test]
    fn test_active_and_closable() {
        let mut state = state_with_auctions();

        // Past its deadline but unsettled, auction 1 still takes bids
        assert_eq!(get_active_auctions(&state).len(), 2);
        assert_eq!(get_closable_auctions(&state, 120), vec![1]);
        assert_eq!(get_closable_auctions(&state, 150), vec![1, 2]);

        state.set_status(1, AuctionStatus::Closed);
        let active = get_active_auctions(&state);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].token_id, 2);
        assert!(active[0].has_bid);
        assert_eq!(get_closable_auctions(&state, 150), vec![2]);
    }
}
