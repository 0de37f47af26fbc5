//! Funds collaborator.
//!
//! Bids are locked into the escrow account when they are accepted and leave
//! it only through `release`: a refund pulled by a displaced bidder, or the
//! winning amount paid to the seller on settlement.

use std::collections::HashMap;

use thiserror::Error;

use auction_types::{Address, Amount};

use crate::state::LedgerState;

/// Errors reported when moving funds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error("Insufficient funds in {account}: need {needed}, have {available}")]
    InsufficientFunds {
        account: String,
        needed: Amount,
        available: Amount,
    },

    #[error("Balance overflow for {0}")]
    Overflow(String),

    #[error("Recipient rejected the transfer: {0}")]
    Rejected(String),
}

/// Moves funds into and out of escrow custody.
pub trait Treasury {
    /// Lock `amount` from `from` into escrow.
    fn lock(&mut self, from: Address, amount: Amount) -> Result<(), TransferError>;

    /// Pay `amount` out of escrow to `to`.
    ///
    /// The recipient may call back into the ledger through `state` before
    /// this returns. The caller has already written every balance and status
    /// change of the current operation.
    fn release(
        &mut self,
        state: &mut LedgerState,
        to: Address,
        amount: Amount,
    ) -> Result<(), TransferError>;
}

/// Account balances with one of them acting as escrow.
#[derive(Debug, Clone)]
pub struct Bank {
    escrow: Address,
    balances: HashMap<Address, Amount>,
}

impl Bank {
    pub fn new(escrow: Address) -> Self {
        Self {
            escrow,
            balances: HashMap::new(),
        }
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Funds held in escrow custody.
    pub fn escrow_balance(&self) -> Amount {
        self.balance_of(&self.escrow)
    }

    /// Add external funds to `account`.
    pub fn deposit(&mut self, account: Address, amount: Amount) -> Result<(), TransferError> {
        let balance = self.balances.entry(account).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| TransferError::Overflow(hex::encode(account)))?;
        Ok(())
    }

    /// Move `amount` between accounts; leaves both untouched on failure.
    pub fn transfer(
        &mut self,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), TransferError> {
        let available = self.balance_of(&from);
        if available < amount {
            return Err(TransferError::InsufficientFunds {
                account: hex::encode(from),
                needed: amount,
                available,
            });
        }
        if from == to {
            return Ok(());
        }

        self.balance_of(&to)
            .checked_add(amount)
            .ok_or_else(|| TransferError::Overflow(hex::encode(to)))?;

        self.balances.insert(from, available - amount);
        *self.balances.entry(to).or_insert(0) += amount;
        Ok(())
    }
}

impl Treasury for Bank {
    fn lock(&mut self, from: Address, amount: Amount) -> Result<(), TransferError> {
        let escrow = self.escrow;
        self.transfer(from, escrow, amount)
    }

    fn release(
        &mut self,
        _state: &mut LedgerState,
        to: Address,
        amount: Amount,
    ) -> Result<(), TransferError> {
        let escrow = self.escrow;
        self.transfer(escrow, to, amount)
    }
}
