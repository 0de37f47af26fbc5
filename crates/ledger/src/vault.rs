//! Pull-based refund accounting for displaced bidders.
//!
//! The vault is the only place a displaced bid lives once it has been
//! outbid. The ledger credits it on displacement; the balance is only ever
//! debited by its owner through a withdrawal, which zeroes it in one step.

use std::collections::HashMap;

use auction_types::{Address, Amount};

use crate::error::AuctionError;

/// Withdrawable balances keyed by participant.
///
/// Entries are created on first credit and never removed; a withdrawn entry
/// stays at zero.
#[derive(Debug, Clone, Default)]
pub struct RefundVault {
    balances: HashMap<Address, Amount>,
}

impl RefundVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Amount `who` can withdraw right now.
    pub fn balance_of(&self, who: &Address) -> Amount {
        self.balances.get(who).copied().unwrap_or(0)
    }

    /// Whether `who` was ever displaced.
    pub fn has_entry(&self, who: &Address) -> bool {
        self.balances.contains_key(who)
    }

    /// Sum of all outstanding refunds.
    pub fn total_owed(&self) -> Amount {
        self.balances
            .values()
            .fold(0, |total: Amount, balance| total.saturating_add(*balance))
    }

    /// Check that crediting `amount` to `who` cannot overflow.
    pub(crate) fn ensure_creditable(
        &self,
        who: &Address,
        amount: Amount,
    ) -> Result<(), AuctionError> {
        self.balance_of(who)
            .checked_add(amount)
            .map(|_| ())
            .ok_or(AuctionError::BalanceOverflow)
    }

    /// Add `amount` to `who`'s balance and return the new balance.
    pub(crate) fn credit(&mut self, who: Address, amount: Amount) -> Result<Amount, AuctionError> {
        let balance = self.balances.entry(who).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or(AuctionError::BalanceOverflow)?;
        Ok(*balance)
    }

    /// Zero `who`'s balance and return what it held.
    pub(crate) fn withdraw(&mut self, who: &Address) -> Result<Amount, AuctionError> {
        match self.balances.get_mut(who) {
            Some(balance) if *balance > 0 => Ok(std::mem::take(balance)),
            _ => Err(AuctionError::NotDisplacedBidder),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_accumulates() {
        let mut vault = RefundVault::new();
        let addr = [1u8; 32];

        assert_eq!(vault.balance_of(&addr), 0);
        assert!(!vault.has_entry(&addr));

        assert_eq!(vault.credit(addr, 100).unwrap(), 100);
        assert_eq!(vault.credit(addr, 50).unwrap(), 150);
        assert_eq!(vault.balance_of(&addr), 150);
        assert_eq!(vault.total_owed(), 150);
    }

    #[test]
    fn test_withdraw_zeroes_balance() {
        let mut vault = RefundVault::new();
        let addr = [1u8; 32];
        vault.credit(addr, 75).unwrap();

        assert_eq!(vault.withdraw(&addr), Ok(75));
        assert_eq!(vault.balance_of(&addr), 0);
        assert!(vault.has_entry(&addr));

        assert_eq!(vault.withdraw(&addr), Err(AuctionError::NotDisplacedBidder));
    }

    #[test]
    fn test_withdraw_unknown() {
        let mut vault = RefundVault::new();
        assert_eq!(
            vault.withdraw(&[2u8; 32]),
            Err(AuctionError::NotDisplacedBidder)
        );
    }

    #[test]
    fn test_credit_overflow() {
        let mut vault = RefundVault::new();
        let addr = [1u8; 32];
        vault.credit(addr, Amount::MAX).unwrap();

        assert_eq!(
            vault.ensure_creditable(&addr, 1),
            Err(AuctionError::BalanceOverflow)
        );
        assert_eq!(vault.credit(addr, 1), Err(AuctionError::BalanceOverflow));
        assert_eq!(vault.balance_of(&addr), Amount::MAX);
    }
}
