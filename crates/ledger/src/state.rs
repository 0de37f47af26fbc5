//! Ledger state: the auction arena, its token index and the refund vault.

use std::collections::{BTreeMap, HashMap};

use auction_types::{
    Address, Amount, AuctionEvent, AuctionId, AuctionRecord, AuctionStatus, TokenId,
};

use crate::genesis::{GenesisValidationError, LedgerGenesisConfig};
use crate::vault::RefundVault;

/// Auction ledger state.
///
/// Records are never removed. A token that is auctioned again gets a new
/// record; `latest_by_token` points at the most recent one.
#[derive(Debug, Clone)]
pub struct LedgerState {
    /// Account holding assets and locked bids in custody
    escrow_account: Address,

    /// Bidding window applied to new auctions
    auction_duration_secs: u64,

    /// Next auction ID to assign
    next_auction_id: AuctionId,

    /// All auctions by ID
    auctions: BTreeMap<AuctionId, AuctionRecord>,

    /// Most recent auction per token
    latest_by_token: HashMap<TokenId, AuctionId>,

    /// Refunds owed to displaced bidders
    vault: RefundVault,

    /// Events of committed calls, oldest first
    events: Vec<AuctionEvent>,
}

impl LedgerState {
    /// Create an empty ledger state.
    pub fn new(escrow_account: Address, auction_duration_secs: u64) -> Self {
        Self {
            escrow_account,
            auction_duration_secs,
            next_auction_id: 1,
            auctions: BTreeMap::new(),
            latest_by_token: HashMap::new(),
            vault: RefundVault::new(),
            events: Vec::new(),
        }
    }

    /// Validate `config` and build the initial state from it.
    pub fn from_genesis(config: &LedgerGenesisConfig) -> Result<Self, GenesisValidationError> {
        config.validate()?;
        Ok(Self::new(config.escrow_account(), config.auction_duration_secs))
    }

    pub fn escrow_account(&self) -> Address {
        self.escrow_account
    }

    pub fn auction_duration_secs(&self) -> u64 {
        self.auction_duration_secs
    }

    /// Get the next auction ID and increment.
    pub(crate) fn allocate_auction_id(&mut self) -> AuctionId {
        let id = self.next_auction_id;
        self.next_auction_id += 1;
        id
    }

    /// Store a new record and make it the token's latest auction.
    pub(crate) fn insert_auction(&mut self, record: AuctionRecord) {
        self.latest_by_token.insert(record.token_id, record.auction_id);
        self.auctions.insert(record.auction_id, record);
    }

    /// Latest auction for a token, whatever its status.
    pub fn get_auction(&self, token_id: TokenId) -> Option<&AuctionRecord> {
        self.latest_by_token
            .get(&token_id)
            .and_then(|auction_id| self.auctions.get(auction_id))
    }

    /// Get auction by ID.
    pub fn get_auction_by_id(&self, auction_id: AuctionId) -> Option<&AuctionRecord> {
        self.auctions.get(&auction_id)
    }

    pub(crate) fn get_auction_mut_by_id(
        &mut self,
        auction_id: AuctionId,
    ) -> Option<&mut AuctionRecord> {
        self.auctions.get_mut(&auction_id)
    }

    /// Auction currently accepting bids or awaiting settlement for a token.
    pub fn active_auction(&self, token_id: TokenId) -> Option<&AuctionRecord> {
        self.get_auction(token_id)
            .filter(|auction| auction.is_active())
    }

    pub(crate) fn set_status(&mut self, auction_id: AuctionId, status: AuctionStatus) {
        if let Some(auction) = self.auctions.get_mut(&auction_id) {
            auction.status = status;
        }
    }

    /// All auctions in creation order.
    pub fn auctions(&self) -> impl Iterator<Item = &AuctionRecord> {
        self.auctions.values()
    }

    /// Every auction ever opened for a token, oldest first.
    pub fn token_history(&self, token_id: TokenId) -> Vec<&AuctionRecord> {
        self.auctions
            .values()
            .filter(|auction| auction.token_id == token_id)
            .collect()
    }

    pub fn vault(&self) -> &RefundVault {
        &self.vault
    }

    pub(crate) fn vault_mut(&mut self) -> &mut RefundVault {
        &mut self.vault
    }

    /// Funds backing the leading bids of active auctions.
    pub fn locked_bids(&self) -> Amount {
        self.auctions
            .values()
            .filter(|auction| auction.is_active())
            .fold(0, |total: Amount, auction| {
                total.saturating_add(auction.highest_bid)
            })
    }

    /// Funds the escrow account has to hold: leading bids plus owed refunds.
    pub fn escrow_liabilities(&self) -> Amount {
        self.locked_bids().saturating_add(self.vault.total_owed())
    }

    pub(crate) fn emit(&mut self, event: AuctionEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[AuctionEvent] {
        &self.events
    }

    /// Take all events emitted since the last drain.
    pub fn drain_events(&mut self) -> Vec<AuctionEvent> {
        std::mem::take(&mut self.events)
    }
}

impl Default for LedgerState {
    fn default() -> Self {
        let config = LedgerGenesisConfig::default();
        Self::new(config.escrow_account(), config.auction_duration_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(auction_id: AuctionId, token_id: TokenId, status: AuctionStatus) -> AuctionRecord {
        AuctionRecord {
            auction_id,
            token_id,
            seller: [1u8; 32],
            registry: [9u8; 32],
            reserve_price: 10,
            highest_bidder: None,
            highest_bid: 0,
            created_at: 0,
            closes_at: 900,
            status,
        }
    }

    #[test]
    fn test_allocate_auction_id() {
        let mut state = LedgerState::default();
        assert_eq!(state.allocate_auction_id(), 1);
        assert_eq!(state.allocate_auction_id(), 2);
        assert_eq!(state.allocate_auction_id(), 3);
    }

    #[test]
    fn test_latest_auction_per_token() {
        let mut state = LedgerState::default();
        state.insert_auction(record(1, 7, AuctionStatus::Closed));
        state.insert_auction(record(2, 7, AuctionStatus::Active));
        state.insert_auction(record(3, 8, AuctionStatus::Closed));

        assert_eq!(state.get_auction(7).map(|a| a.auction_id), Some(2));
        assert_eq!(state.active_auction(7).map(|a| a.auction_id), Some(2));
        assert!(state.active_auction(8).is_none());
        assert!(state.get_auction(9).is_none());
        assert_eq!(state.token_history(7).len(), 2);
    }

    #[test]
    fn test_escrow_liabilities() {
        let mut state = LedgerState::default();
        let mut active = record(1, 7, AuctionStatus::Active);
        active.highest_bidder = Some([2u8; 32]);
        active.highest_bid = 40;
        let mut closed = record(2, 8, AuctionStatus::Closed);
        closed.highest_bidder = Some([3u8; 32]);
        closed.highest_bid = 500;

        state.insert_auction(active);
        state.insert_auction(closed);
        state.vault_mut().credit([4u8; 32], 25).unwrap();

        assert_eq!(state.locked_bids(), 40);
        assert_eq!(state.escrow_liabilities(), 65);
    }

    #[test]
    fn test_from_genesis_rejects_invalid() {
        let config = LedgerGenesisConfig {
            auction_duration_secs: 0,
            ..Default::default()
        };
        assert!(LedgerState::from_genesis(&config).is_err());

        let state = LedgerState::from_genesis(&LedgerGenesisConfig::default()).unwrap();
        assert_eq!(state.auction_duration_secs(), 900);
    }

    #[test]
    fn test_drain_events() {
        let mut state = LedgerState::default();
        state.emit(AuctionEvent::AuctionClosedNoBid { token_id: 1 });
        assert_eq!(state.events().len(), 1);

        let drained = state.drain_events();
        assert_eq!(drained, vec![AuctionEvent::AuctionClosedNoBid { token_id: 1 }]);
        assert!(state.events().is_empty());
    }
}
