//! End-to-end integration tests for the auction ledger.
//!
//! These tests exercise the full auction lifecycle against the in-memory
//! registry and bank:
//! 1. Auction creation and escrow custody
//! 2. Bidding, displacement and refunds
//! 3. Settlement
//! 4. Re-entrant and failing payout recipients

use std::collections::HashMap;

use auction_ledger::handlers::{
    handle_call, handle_close_auction, handle_create_auction, handle_place_bid,
    handle_withdraw_bid,
};
use auction_ledger::queries::{get_closable_auctions, handle_query};
use auction_ledger::{
    AssetRegistry, AuctionCall, AuctionError, AuctionQuery, AuctionQueryResponse, Bank,
    CallContext, CallOutcome, HandlerResult, HostEnv, InMemoryRegistry, LedgerGenesisConfig,
    LedgerState, TransferError, Treasury,
};
use auction_types::{
    Address, Amount, AuctionEvent, AuctionId, AuctionStatus, Settlement, TokenId,
    DEFAULT_AUCTION_DURATION_SECS,
};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;
use tracing_subscriber::EnvFilter;

const ETHER: Amount = 1_000_000_000_000_000_000;

const REGISTRY: Address = [0xAAu8; 32];
const SELLER: Address = [1u8; 32];
const BIDDER_1: Address = [2u8; 32];
const BIDDER_2: Address = [3u8; 32];
const NON_BIDDER: Address = [4u8; 32];
const TOKEN: TokenId = 1;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Ledger plus the collaborators a host would run it with.
struct Chain {
    state: LedgerState,
    registry: InMemoryRegistry,
    bank: Bank,
    now: u64,
}

impl Chain {
    fn new() -> Self {
        init_tracing();

        let state = LedgerState::from_genesis(&LedgerGenesisConfig::default())
            .expect("default genesis is valid");
        let mut registry = InMemoryRegistry::new(REGISTRY);
        registry.mint(TOKEN, SELLER).expect("fresh registry");

        let mut bank = Bank::new(state.escrow_account());
        for bidder in [BIDDER_1, BIDDER_2, NON_BIDDER] {
            bank.deposit(bidder, 100 * ETHER).expect("no overflow");
        }

        Self {
            state,
            registry,
            bank,
            now: 1_700_000_000,
        }
    }

    fn ctx(&self, sender: Address) -> CallContext {
        CallContext {
            sender,
            timestamp: self.now,
        }
    }

    fn advance(&mut self, secs: u64) {
        self.now += secs;
    }

    fn create(
        &mut self,
        seller: Address,
        token_id: TokenId,
        reserve: Amount,
    ) -> HandlerResult<AuctionId> {
        let ctx = self.ctx(seller);
        handle_create_auction(
            &mut self.state,
            &mut self.registry,
            &ctx,
            token_id,
            reserve,
            REGISTRY,
        )
    }

    fn bid(&mut self, bidder: Address, token_id: TokenId, amount: Amount) -> HandlerResult<()> {
        let ctx = self.ctx(bidder);
        handle_place_bid(&mut self.state, &mut self.bank, &ctx, token_id, amount)
    }

    fn withdraw(&mut self, who: Address) -> HandlerResult<Amount> {
        let ctx = self.ctx(who);
        handle_withdraw_bid(&mut self.state, &mut self.bank, &ctx)
    }

    fn close(&mut self, who: Address, token_id: TokenId) -> HandlerResult<Settlement> {
        let ctx = self.ctx(who);
        handle_close_auction(&mut self.state, &mut self.registry, &mut self.bank, &ctx, token_id)
    }

    fn leader(&self, token_id: TokenId) -> (Option<Address>, Amount) {
        let auction = self.state.get_auction(token_id).expect("auction exists");
        (auction.highest_bidder, auction.highest_bid)
    }

    /// Escrow holds exactly the leading bids plus the refunds owed.
    fn assert_solvent(&self) {
        assert_eq!(self.bank.escrow_balance(), self.state.escrow_liabilities());
    }
}

/// Test the complete auction flow from creation to settlement.
#[test]
fn test_full_auction_flow() {
    let mut chain = Chain::new();
    let reserve = ETHER;

    // ========================================
    // Phase 1: Only the owner can open an auction
    // ========================================

    assert_eq!(chain.create(BIDDER_1, TOKEN, reserve), Err(AuctionError::NotOwner(TOKEN)));
    assert_eq!(chain.registry.owner_of(TOKEN), Ok(SELLER));

    let auction_id = chain.create(SELLER, TOKEN, reserve).unwrap();
    assert_eq!(chain.registry.owner_of(TOKEN), Ok(chain.state.escrow_account()));
    assert_eq!(chain.leader(TOKEN), (None, 0));
    info!(auction_id, "auction created");

    // ========================================
    // Phase 2: Bidding
    // ========================================

    assert!(matches!(
        chain.bid(BIDDER_1, TOKEN, ETHER / 2),
        Err(AuctionError::BidTooLow { .. })
    ));

    chain.bid(BIDDER_1, TOKEN, 3 * ETHER / 2).unwrap();
    assert_eq!(chain.leader(TOKEN), (Some(BIDDER_1), 3 * ETHER / 2));

    chain.bid(BIDDER_2, TOKEN, 2 * ETHER).unwrap();
    assert_eq!(chain.leader(TOKEN), (Some(BIDDER_2), 2 * ETHER));
    assert_eq!(chain.state.vault().balance_of(&BIDDER_1), 3 * ETHER / 2);
    chain.assert_solvent();

    // ========================================
    // Phase 3: Refunds
    // ========================================

    assert_eq!(chain.withdraw(BIDDER_2), Err(AuctionError::NotDisplacedBidder));
    assert_eq!(chain.withdraw(NON_BIDDER), Err(AuctionError::NotDisplacedBidder));

    assert_eq!(chain.withdraw(BIDDER_1), Ok(3 * ETHER / 2));
    assert_eq!(chain.state.vault().balance_of(&BIDDER_1), 0);
    assert_eq!(chain.bank.balance_of(&BIDDER_1), 100 * ETHER);
    assert_eq!(chain.withdraw(BIDDER_1), Err(AuctionError::NotDisplacedBidder));
    chain.assert_solvent();

    // ========================================
    // Phase 4: Settlement
    // ========================================

    assert!(matches!(
        chain.close(SELLER, TOKEN),
        Err(AuctionError::AuctionNotEnded { .. })
    ));
    assert_eq!(chain.state.get_auction(TOKEN).unwrap().status, AuctionStatus::Active);

    chain.advance(DEFAULT_AUCTION_DURATION_SECS);

    let settlement = chain.close(SELLER, TOKEN).unwrap();
    assert_eq!(settlement.winner, Some(BIDDER_2));
    assert_eq!(settlement.amount, 2 * ETHER);
    assert_eq!(chain.registry.owner_of(TOKEN), Ok(BIDDER_2));
    assert_eq!(chain.bank.balance_of(&SELLER), 2 * ETHER);
    assert_eq!(chain.bank.balance_of(&BIDDER_2), 98 * ETHER);
    assert_eq!(chain.bank.escrow_balance(), 0);
    assert_eq!(chain.state.get_auction(TOKEN).unwrap().status, AuctionStatus::Closed);

    assert_eq!(chain.close(SELLER, TOKEN), Err(AuctionError::NotAuctioned(TOKEN)));
    assert_eq!(chain.bank.balance_of(&SELLER), 2 * ETHER);

    let events = chain.state.drain_events();
    assert_eq!(
        events[1],
        AuctionEvent::BidPlaced {
            bidder: BIDDER_1,
            amount: 3 * ETHER / 2,
            token_id: TOKEN,
            registry: REGISTRY,
        }
    );
    assert_eq!(
        events.last(),
        Some(&AuctionEvent::AuctionClosed {
            token_id: TOKEN,
            winner: BIDDER_2,
            amount: 2 * ETHER,
        })
    );
    assert_eq!(events.len(), 5);
}

/// A closed token can be auctioned again by its new owner; the old record
/// stays queryable.
#[test]
fn test_reauction_after_close() {
    let mut chain = Chain::new();
    chain.create(SELLER, TOKEN, ETHER).unwrap();
    chain.bid(BIDDER_1, TOKEN, 2 * ETHER).unwrap();
    chain.advance(DEFAULT_AUCTION_DURATION_SECS);
    chain.close(SELLER, TOKEN).unwrap();

    assert_eq!(chain.create(SELLER, TOKEN, ETHER), Err(AuctionError::NotOwner(TOKEN)));

    let second = chain.create(BIDDER_1, TOKEN, 3 * ETHER).unwrap();
    assert_eq!(second, 2);
    assert_eq!(chain.state.get_auction(TOKEN).unwrap().seller, BIDDER_1);

    let history = chain.state.token_history(TOKEN);
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].status, AuctionStatus::Closed);
    assert_eq!(history[0].highest_bid, 2 * ETHER);
    assert_eq!(history[1].status, AuctionStatus::Active);

    match handle_query(&chain.state, AuctionQuery::GetAuctionById { auction_id: 1 }) {
        AuctionQueryResponse::Auction(Some(first)) => assert_eq!(first.seller, SELLER),
        other => panic!("unexpected response: {other:?}"),
    }
}

#[test]
fn test_close_without_bids_returns_asset() {
    let mut chain = Chain::new();
    chain.create(SELLER, TOKEN, ETHER).unwrap();
    chain.advance(DEFAULT_AUCTION_DURATION_SECS + 3_600);

    assert_eq!(get_closable_auctions(&chain.state, chain.now), vec![TOKEN]);

    let settlement = chain.close(SELLER, TOKEN).unwrap();
    assert_eq!(settlement.winner, None);
    assert_eq!(chain.registry.owner_of(TOKEN), Ok(SELLER));
    assert_eq!(chain.bank.balance_of(&SELLER), 0);
    assert!(get_closable_auctions(&chain.state, chain.now).is_empty());
}

/// Randomized bidding: accepted bids strictly increase, rejected ones leave
/// the leader untouched, and escrow always matches what is owed.
#[test]
fn test_random_bid_sequences() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let bidders: Vec<Address> = (10u8..15).map(|b| [b; 32]).collect();
    let reserve: Amount = 1_000;

    for round in 0..20 {
        let mut chain = Chain::new();
        for bidder in &bidders {
            chain.bank.deposit(*bidder, 1_000_000).unwrap();
        }
        chain.create(SELLER, TOKEN, reserve).unwrap();

        let mut accepted: Vec<Amount> = Vec::new();
        for _ in 0..100 {
            let bidder = bidders[rng.gen_range(0..bidders.len())];

            if rng.gen_bool(0.2) {
                let owed = chain.state.vault().balance_of(&bidder);
                match chain.withdraw(bidder) {
                    Ok(amount) => assert_eq!(amount, owed),
                    Err(err) => {
                        assert_eq!(err, AuctionError::NotDisplacedBidder);
                        assert_eq!(owed, 0);
                    }
                }
            } else {
                let before = chain.leader(TOKEN);
                let floor = before.1.max(reserve);
                let amount = floor - 50 + rng.gen_range(0..150);

                match chain.bid(bidder, TOKEN, amount) {
                    Ok(()) => {
                        assert!(amount > floor);
                        accepted.push(amount);
                        assert_eq!(chain.leader(TOKEN), (Some(bidder), amount));
                    }
                    Err(err) => {
                        assert!(amount <= floor);
                        assert!(matches!(err, AuctionError::BidTooLow { .. }));
                        assert_eq!(chain.leader(TOKEN), before);
                    }
                }
            }
            chain.assert_solvent();
        }

        assert!(accepted.windows(2).all(|pair| pair[0] < pair[1]), "round {round}");
        assert!(accepted.iter().all(|amount| *amount > reserve));

        chain.advance(DEFAULT_AUCTION_DURATION_SECS);
        let settlement = chain.close(SELLER, TOKEN).unwrap();
        assert_eq!(settlement.amount, accepted.last().copied().unwrap_or(0));

        for bidder in &bidders {
            let _ = chain.withdraw(*bidder);
        }
        assert_eq!(chain.bank.escrow_balance(), 0);
        assert_eq!(chain.state.vault().total_owed(), 0);

        let spent: Amount = bidders
            .iter()
            .map(|bidder| 1_000_000 - chain.bank.balance_of(bidder))
            .sum();
        assert_eq!(spent, settlement.amount);
    }
}

/// What the recipient of a payout does before accepting the funds.
#[derive(Clone, Copy)]
enum Reentry {
    Withdraw,
    Close(TokenId),
    Bid(TokenId, Amount),
}

/// Treasury whose payout recipients call back into the ledger once.
struct ReentrantTreasury {
    bank: Bank,
    reentry: Reentry,
    timestamp: u64,
    entered: bool,
    nested: Vec<HandlerResult<()>>,
}

impl ReentrantTreasury {
    fn new(bank: Bank, reentry: Reentry, timestamp: u64) -> Self {
        Self {
            bank,
            reentry,
            timestamp,
            entered: false,
            nested: Vec::new(),
        }
    }
}

impl Treasury for ReentrantTreasury {
    fn lock(&mut self, from: Address, amount: Amount) -> Result<(), TransferError> {
        self.bank.lock(from, amount)
    }

    fn release(
        &mut self,
        state: &mut LedgerState,
        to: Address,
        amount: Amount,
    ) -> Result<(), TransferError> {
        if !self.entered {
            self.entered = true;
            let ctx = CallContext {
                sender: to,
                timestamp: self.timestamp,
            };
            let result = match self.reentry {
                Reentry::Withdraw => handle_withdraw_bid(state, &mut *self, &ctx).map(|_| ()),
                Reentry::Close(token_id) => {
                    let mut registries: HashMap<Address, InMemoryRegistry> = HashMap::new();
                    handle_close_auction(state, &mut registries, &mut *self, &ctx, token_id)
                        .map(|_| ())
                }
                Reentry::Bid(token_id, amount) => {
                    handle_place_bid(state, &mut *self, &ctx, token_id, amount)
                }
            };
            self.nested.push(result);
        }
        self.bank.release(state, to, amount)
    }
}

#[test]
fn test_reentrant_withdraw_pays_once() {
    let mut chain = Chain::new();
    chain.create(SELLER, TOKEN, ETHER).unwrap();
    chain.bid(BIDDER_1, TOKEN, 2 * ETHER).unwrap();
    chain.bid(BIDDER_2, TOKEN, 3 * ETHER).unwrap();

    let mut treasury = ReentrantTreasury::new(chain.bank.clone(), Reentry::Withdraw, chain.now);
    let ctx = chain.ctx(BIDDER_1);
    let paid = handle_withdraw_bid(&mut chain.state, &mut treasury, &ctx).unwrap();

    assert_eq!(paid, 2 * ETHER);
    assert_eq!(treasury.nested, vec![Err(AuctionError::NotDisplacedBidder)]);
    assert_eq!(treasury.bank.balance_of(&BIDDER_1), 100 * ETHER);
    assert_eq!(chain.state.vault().balance_of(&BIDDER_1), 0);
    assert_eq!(treasury.bank.escrow_balance(), chain.state.escrow_liabilities());
}

#[test]
fn test_reentrant_close_settles_once() {
    let mut chain = Chain::new();
    chain.create(SELLER, TOKEN, ETHER).unwrap();
    chain.bid(BIDDER_1, TOKEN, 2 * ETHER).unwrap();
    chain.advance(DEFAULT_AUCTION_DURATION_SECS);

    let mut treasury =
        ReentrantTreasury::new(chain.bank.clone(), Reentry::Close(TOKEN), chain.now);
    let ctx = chain.ctx(SELLER);
    let settlement =
        handle_close_auction(&mut chain.state, &mut chain.registry, &mut treasury, &ctx, TOKEN)
            .unwrap();

    assert_eq!(settlement.amount, 2 * ETHER);
    assert_eq!(treasury.nested, vec![Err(AuctionError::NotAuctioned(TOKEN))]);
    assert_eq!(treasury.bank.balance_of(&SELLER), 2 * ETHER);
    assert_eq!(treasury.bank.escrow_balance(), 0);
    assert_eq!(chain.registry.owner_of(TOKEN), Ok(BIDDER_1));
}

#[test]
fn test_reentrant_bid_on_closing_auction_rejected() {
    let mut chain = Chain::new();
    chain.create(SELLER, TOKEN, ETHER).unwrap();
    chain.bid(BIDDER_1, TOKEN, 2 * ETHER).unwrap();
    chain.advance(DEFAULT_AUCTION_DURATION_SECS);
    chain.bank.deposit(SELLER, 10 * ETHER).unwrap();

    let mut treasury = ReentrantTreasury::new(
        chain.bank.clone(),
        Reentry::Bid(TOKEN, 5 * ETHER),
        chain.now - 1,
    );
    let ctx = chain.ctx(SELLER);
    handle_close_auction(&mut chain.state, &mut chain.registry, &mut treasury, &ctx, TOKEN)
        .unwrap();

    assert_eq!(treasury.nested, vec![Err(AuctionError::NotAuctioned(TOKEN))]);
    assert_eq!(chain.leader(TOKEN), (Some(BIDDER_1), 2 * ETHER));
    assert_eq!(treasury.bank.balance_of(&SELLER), 12 * ETHER);
}

/// Treasury that refuses every payout to one account.
struct RejectingTreasury {
    bank: Bank,
    rejects: Address,
}

impl Treasury for RejectingTreasury {
    fn lock(&mut self, from: Address, amount: Amount) -> Result<(), TransferError> {
        self.bank.lock(from, amount)
    }

    fn release(
        &mut self,
        state: &mut LedgerState,
        to: Address,
        amount: Amount,
    ) -> Result<(), TransferError> {
        if to == self.rejects {
            return Err(TransferError::Rejected("recipient refuses funds".into()));
        }
        self.bank.release(state, to, amount)
    }
}

#[test]
fn test_failed_refund_payout_keeps_balance() {
    let mut chain = Chain::new();
    chain.create(SELLER, TOKEN, ETHER).unwrap();
    chain.bid(BIDDER_1, TOKEN, 2 * ETHER).unwrap();
    chain.bid(BIDDER_2, TOKEN, 3 * ETHER).unwrap();

    let mut treasury = RejectingTreasury {
        bank: chain.bank.clone(),
        rejects: BIDDER_1,
    };
    let ctx = chain.ctx(BIDDER_1);
    let result = handle_withdraw_bid(&mut chain.state, &mut treasury, &ctx);

    assert!(matches!(result, Err(AuctionError::Transfer(TransferError::Rejected(_)))));
    assert_eq!(chain.state.vault().balance_of(&BIDDER_1), 2 * ETHER);
    assert_eq!(treasury.bank.escrow_balance(), chain.state.escrow_liabilities());

    // A failing refund does not hold up settlement
    chain.advance(DEFAULT_AUCTION_DURATION_SECS);
    let ctx = chain.ctx(SELLER);
    handle_close_auction(&mut chain.state, &mut chain.registry, &mut treasury, &ctx, TOKEN)
        .unwrap();
    assert_eq!(chain.registry.owner_of(TOKEN), Ok(BIDDER_2));
    assert_eq!(treasury.bank.balance_of(&SELLER), 3 * ETHER);
}

#[test]
fn test_failed_seller_payout_rolls_back_close() {
    let mut chain = Chain::new();
    chain.create(SELLER, TOKEN, ETHER).unwrap();
    chain.bid(BIDDER_1, TOKEN, 2 * ETHER).unwrap();
    chain.advance(DEFAULT_AUCTION_DURATION_SECS);
    let events_before = chain.state.events().len();

    let mut treasury = RejectingTreasury {
        bank: chain.bank.clone(),
        rejects: SELLER,
    };
    let ctx = chain.ctx(SELLER);
    let result =
        handle_close_auction(&mut chain.state, &mut chain.registry, &mut treasury, &ctx, TOKEN);

    assert!(matches!(result, Err(AuctionError::Transfer(_))));
    assert_eq!(chain.state.get_auction(TOKEN).unwrap().status, AuctionStatus::Active);
    assert_eq!(chain.registry.owner_of(TOKEN), Ok(chain.state.escrow_account()));
    assert_eq!(treasury.bank.escrow_balance(), 2 * ETHER);
    assert_eq!(chain.state.events().len(), events_before);

    // Retrying with a working payout settles normally
    let settlement = chain.close(SELLER, TOKEN).unwrap();
    assert_eq!(settlement.winner, Some(BIDDER_1));
    assert_eq!(chain.registry.owner_of(TOKEN), Ok(BIDDER_1));
}

/// Calls shipped as borsh bytes dispatch like direct handler calls.
#[test]
fn test_encoded_calls() {
    let mut chain = Chain::new();
    let calls = [
        (SELLER, 0, AuctionCall::CreateAuction {
            token_id: TOKEN,
            reserve_price: ETHER,
            registry: REGISTRY,
        }),
        (BIDDER_1, 10, AuctionCall::PlaceBid {
            token_id: TOKEN,
            amount: 2 * ETHER,
        }),
        (BIDDER_2, 20, AuctionCall::PlaceBid {
            token_id: TOKEN,
            amount: 3 * ETHER,
        }),
        (BIDDER_1, 30, AuctionCall::WithdrawBid),
        (SELLER, DEFAULT_AUCTION_DURATION_SECS, AuctionCall::CloseAuction { token_id: TOKEN }),
    ];

    let start = chain.now;
    let mut outcomes = Vec::new();
    for (sender, offset, call) in calls {
        let bytes = borsh::to_vec(&call).unwrap();
        let decoded: AuctionCall = borsh::from_slice(&bytes).unwrap();
        assert_eq!(decoded, call);

        let ctx = CallContext {
            sender,
            timestamp: start + offset,
        };
        let mut env = HostEnv {
            registries: &mut chain.registry,
            treasury: &mut chain.bank,
        };
        outcomes.push(handle_call(&mut chain.state, &mut env, &ctx, decoded).unwrap());
    }

    assert_eq!(outcomes[0], CallOutcome::AuctionCreated(1));
    assert_eq!(outcomes[3], CallOutcome::RefundWithdrawn(2 * ETHER));
    assert!(matches!(
        &outcomes[4],
        CallOutcome::AuctionClosed(Settlement {
            winner: Some(BIDDER_2),
            ..
        })
    ));
}

#[test]
fn test_genesis_config_from_json() {
    let config = LedgerGenesisConfig {
        auction_duration_secs: 60,
        escrow_seed: "test-ledger".into(),
    };
    let json = serde_json::to_string(&config).unwrap();
    let parsed: LedgerGenesisConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, config);

    let state = LedgerState::from_genesis(&parsed).unwrap();
    assert_eq!(state.auction_duration_secs(), 60);
    assert_eq!(state.escrow_account(), config.escrow_account());

    let invalid: LedgerGenesisConfig =
        serde_json::from_str(r#"{ "auction_duration_secs": 0 }"#).unwrap();
    assert!(LedgerState::from_genesis(&invalid).is_err());
}
