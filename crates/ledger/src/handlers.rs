//! Call handlers for the auction ledger.
//!
//! These functions implement the business logic for each call type. Each one
//! either commits all of its effects or returns an error with the ledger,
//! the registry and the treasury as they were before the call.
//!
//! Outgoing transfers are always the last step: balances and status are
//! written first, so a recipient calling back into the ledger sees the
//! post-operation state.

use auction_types::{
    Address, Amount, AuctionEvent, AuctionId, AuctionRecord, AuctionStatus, Settlement, TokenId,
};
use tracing::{debug, error, info, warn};

use crate::call::AuctionCall;
use crate::error::AuctionError;
use crate::registry::{AssetRegistries, RegistryError};
use crate::state::LedgerState;
use crate::treasury::Treasury;

/// Context provided by the host for each call.
#[derive(Clone, Copy, Debug)]
pub struct CallContext {
    /// Sender of the call
    pub sender: Address,
    /// Current timestamp (seconds)
    pub timestamp: u64,
}

/// Result type for handlers.
pub type HandlerResult<T> = Result<T, AuctionError>;

/// Collaborators a host hands to `handle_call`.
pub struct HostEnv<'a> {
    pub registries: &'a mut dyn AssetRegistries,
    pub treasury: &'a mut dyn Treasury,
}

/// What a dispatched call produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallOutcome {
    AuctionCreated(AuctionId),
    BidAccepted,
    RefundWithdrawn(Amount),
    AuctionClosed(Settlement),
}

/// Dispatch a call message to its handler.
pub fn handle_call(
    state: &mut LedgerState,
    env: &mut HostEnv<'_>,
    ctx: &CallContext,
    call: AuctionCall,
) -> HandlerResult<CallOutcome> {
    match call {
        AuctionCall::CreateAuction {
            token_id,
            reserve_price,
            registry,
        } => handle_create_auction(
            state,
            &mut *env.registries,
            ctx,
            token_id,
            reserve_price,
            registry,
        )
        .map(CallOutcome::AuctionCreated),

        AuctionCall::PlaceBid { token_id, amount } => {
            handle_place_bid(state, &mut *env.treasury, ctx, token_id, amount)
                .map(|()| CallOutcome::BidAccepted)
        }

        AuctionCall::WithdrawBid => {
            handle_withdraw_bid(state, &mut *env.treasury, ctx).map(CallOutcome::RefundWithdrawn)
        }

        AuctionCall::CloseAuction { token_id } => handle_close_auction(
            state,
            &mut *env.registries,
            &mut *env.treasury,
            ctx,
            token_id,
        )
        .map(CallOutcome::AuctionClosed),
    }
}

/// Handle CreateAuction call.
///
/// Moves `token_id` from the sender into escrow and opens bidding until
/// `timestamp + auction_duration_secs`.
pub fn handle_create_auction(
    state: &mut LedgerState,
    registries: &mut dyn AssetRegistries,
    ctx: &CallContext,
    token_id: TokenId,
    reserve_price: Amount,
    registry_ref: Address,
) -> HandlerResult<AuctionId> {
    let registry = registries
        .resolve(&registry_ref)
        .ok_or_else(|| AuctionError::UnknownRegistry(hex::encode(registry_ref)))?;

    // Check ownership; an unminted token has no owner to match
    let owner = match registry.owner_of(token_id) {
        Ok(owner) => Some(owner),
        Err(RegistryError::UnknownToken(_)) => None,
        Err(err) => return Err(err.into()),
    };
    if owner != Some(ctx.sender) {
        debug!(token_id, sender = %hex::encode(ctx.sender), "create rejected: not owner");
        return Err(AuctionError::NotOwner(token_id));
    }

    if reserve_price == 0 {
        return Err(AuctionError::ZeroPrice);
    }

    if state.active_auction(token_id).is_some() {
        return Err(AuctionError::AlreadyAuctioned(token_id));
    }

    // Take custody; nothing has been written yet if this fails
    let escrow = state.escrow_account();
    registry.transfer_custody(token_id, ctx.sender, escrow)?;

    let auction_id = state.allocate_auction_id();
    let closes_at = ctx.timestamp.saturating_add(state.auction_duration_secs());

    state.insert_auction(AuctionRecord {
        auction_id,
        token_id,
        seller: ctx.sender,
        registry: registry_ref,
        reserve_price,
        highest_bidder: None,
        highest_bid: 0,
        created_at: ctx.timestamp,
        closes_at,
        status: AuctionStatus::Active,
    });

    state.emit(AuctionEvent::AuctionCreated {
        auction_id,
        token_id,
        seller: ctx.sender,
        registry: registry_ref,
        reserve_price,
        closes_at,
    });

    info!(
        auction_id,
        token_id,
        seller = %hex::encode(ctx.sender),
        reserve_price = %reserve_price,
        closes_at,
        "auction created"
    );

    Ok(auction_id)
}

/// Handle PlaceBid call.
///
/// Bids are admitted for as long as the auction is Active, including after
/// `closes_at` until the seller settles. The previous leader, including the
/// sender itself, is credited with the superseded amount in the refund vault.
pub fn handle_place_bid(
    state: &mut LedgerState,
    treasury: &mut dyn Treasury,
    ctx: &CallContext,
    token_id: TokenId,
    amount: Amount,
) -> HandlerResult<()> {
    let auction = state
        .active_auction(token_id)
        .ok_or(AuctionError::NotAuctioned(token_id))?;

    let floor = auction.bid_floor();
    if amount <= floor {
        debug!(token_id, amount = %amount, floor = %floor, "bid rejected: too low");
        return Err(AuctionError::BidTooLow { amount, floor });
    }

    let auction_id = auction.auction_id;
    let registry = auction.registry;
    let displaced = auction
        .highest_bidder
        .map(|bidder| (bidder, auction.highest_bid));

    if let Some((bidder, superseded)) = displaced {
        state.vault().ensure_creditable(&bidder, superseded)?;
    }

    // Lock the new bid; nothing has been written yet if this fails
    treasury.lock(ctx.sender, amount)?;

    if let Some((bidder, superseded)) = displaced {
        let owed = state.vault_mut().credit(bidder, superseded)?;
        debug!(
            token_id,
            bidder = %hex::encode(bidder),
            superseded = %superseded,
            owed = %owed,
            "bidder displaced"
        );
    }

    let auction = state
        .get_auction_mut_by_id(auction_id)
        .ok_or(AuctionError::NotAuctioned(token_id))?;
    auction.highest_bidder = Some(ctx.sender);
    auction.highest_bid = amount;

    state.emit(AuctionEvent::BidPlaced {
        bidder: ctx.sender,
        amount,
        token_id,
        registry,
    });

    info!(
        auction_id,
        token_id,
        bidder = %hex::encode(ctx.sender),
        amount = %amount,
        "bid accepted"
    );

    Ok(())
}

/// Handle WithdrawBid call.
///
/// The balance is zeroed before the payout is issued. If the payout fails
/// the amount is credited back.
pub fn handle_withdraw_bid(
    state: &mut LedgerState,
    treasury: &mut dyn Treasury,
    ctx: &CallContext,
) -> HandlerResult<Amount> {
    let amount = state.vault_mut().withdraw(&ctx.sender)?;

    if let Err(err) = treasury.release(state, ctx.sender, amount) {
        warn!(
            bidder = %hex::encode(ctx.sender),
            amount = %amount,
            error = %err,
            "refund payout failed, restoring balance"
        );
        if let Err(undo) = state.vault_mut().credit(ctx.sender, amount) {
            error!(
                bidder = %hex::encode(ctx.sender),
                amount = %amount,
                error = %undo,
                "could not restore refund balance after failed payout"
            );
        }
        return Err(err.into());
    }

    state.emit(AuctionEvent::RefundWithdrawn {
        bidder: ctx.sender,
        amount,
    });

    info!(bidder = %hex::encode(ctx.sender), amount = %amount, "refund withdrawn");

    Ok(amount)
}

/// Handle CloseAuction call.
///
/// Any caller before the deadline gets `AuctionNotEnded`; after it, only the
/// seller may settle.
pub fn handle_close_auction(
    state: &mut LedgerState,
    registries: &mut dyn AssetRegistries,
    treasury: &mut dyn Treasury,
    ctx: &CallContext,
    token_id: TokenId,
) -> HandlerResult<Settlement> {
    let auction = state
        .active_auction(token_id)
        .ok_or(AuctionError::NotAuctioned(token_id))?;

    if !auction.has_ended(ctx.timestamp) {
        return Err(AuctionError::AuctionNotEnded {
            closes_at: auction.closes_at,
            now: ctx.timestamp,
        });
    }

    if auction.seller != ctx.sender {
        return Err(AuctionError::NotSeller(token_id));
    }

    let auction_id = auction.auction_id;
    let seller = auction.seller;
    let registry_ref = auction.registry;
    let winner = auction.highest_bidder;
    let amount = auction.highest_bid;

    let registry = registries
        .resolve(&registry_ref)
        .ok_or_else(|| AuctionError::UnknownRegistry(hex::encode(registry_ref)))?;
    let escrow = state.escrow_account();

    state.set_status(auction_id, AuctionStatus::Closed);

    // Asset to the winner, or back to the seller without bids
    let recipient = winner.unwrap_or(seller);
    if let Err(err) = registry.transfer_custody(token_id, escrow, recipient) {
        warn!(auction_id, token_id, error = %err, "custody transfer failed, reopening auction");
        state.set_status(auction_id, AuctionStatus::Active);
        return Err(err.into());
    }

    if let Some(winner) = winner {
        if let Err(err) = treasury.release(state, seller, amount) {
            warn!(auction_id, token_id, error = %err, "seller payout failed, reopening auction");
            // Left Closed if the asset cannot be recovered; reopening would
            // leave an auction whose escrow no longer holds the asset
            match registry.transfer_custody(token_id, winner, escrow) {
                Ok(()) => state.set_status(auction_id, AuctionStatus::Active),
                Err(undo) => error!(
                    auction_id,
                    token_id,
                    error = %undo,
                    "could not return asset to escrow after failed payout, auction stays closed"
                ),
            }
            return Err(err.into());
        }
    }

    let settlement = Settlement {
        auction_id,
        token_id,
        seller,
        winner,
        amount,
        closed_at: ctx.timestamp,
    };

    match winner {
        Some(winner) => {
            state.emit(AuctionEvent::AuctionClosed {
                token_id,
                winner,
                amount,
            });
            info!(
                auction_id,
                token_id,
                winner = %hex::encode(winner),
                amount = %amount,
                "auction closed"
            );
        }
        None => {
            state.emit(AuctionEvent::AuctionClosedNoBid { token_id });
            info!(auction_id, token_id, "auction closed without bids");
        }
    }

    Ok(settlement)
}
