//! Escrow-backed auction ledger for uniquely identified tokens.
//!
//! This crate implements the auction lifecycle and its escrow accounting:
//!
//! - Auction creation, taking the token into escrow custody
//! - Strictly increasing bids backed by locked funds
//! - Pull-based refunds for displaced bidders
//! - Seller-initiated settlement once the deadline has passed
//!
//! # Architecture
//!
//! - `call`: Message types for state-changing operations
//! - `handlers`: Business logic for processing calls
//! - `queries`: Read-only state access
//! - `state`: Auction records and their token index
//! - `vault`: Refund balances owed to displaced bidders
//! - `registry`: Asset registry collaborator
//! - `treasury`: Funds collaborator
//! - `genesis`: Initial configuration
//! - `error`: Error types
//!
//! # Example
//!
//! ```ignore
//! use auction_ledger::{handlers, LedgerState, InMemoryRegistry, Bank};
//!
//! let mut state = LedgerState::default();
//! let ctx = handlers::CallContext { sender, timestamp };
//!
//! // Put a token up for auction
//! let auction_id = handlers::handle_create_auction(&mut state, &mut registry, &ctx, ...)?;
//!
//! // Bid on it
//! handlers::handle_place_bid(&mut state, &mut bank, &ctx, token_id, amount)?;
//! ```

pub mod call;
pub mod error;
pub mod genesis;
pub mod handlers;
pub mod queries;
pub mod registry;
pub mod state;
pub mod treasury;
pub mod vault;

pub use call::AuctionCall;
pub use error::AuctionError;
pub use genesis::{GenesisValidationError, LedgerGenesisConfig};
pub use handlers::{CallContext, CallOutcome, HandlerResult, HostEnv};
pub use queries::{AuctionQuery, AuctionQueryResponse, AuctionSummary};
pub use registry::{AssetRegistries, AssetRegistry, InMemoryRegistry, RegistryError};
pub use state::LedgerState;
pub use treasury::{Bank, TransferError, Treasury};
pub use vault::RefundVault;
