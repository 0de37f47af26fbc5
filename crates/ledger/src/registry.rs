//! Asset registry collaborator.
//!
//! The registry is the sole owner of custody state. The ledger only asks it
//! who holds a token and requests transfers; it never records ownership
//! itself.

use std::collections::HashMap;

use thiserror::Error;

use auction_types::{Address, TokenId};

/// Errors reported by an asset registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Unknown token {0}")]
    UnknownToken(TokenId),

    #[error("Token {0} already exists")]
    TokenExists(TokenId),

    #[error("Transfer of token {token_id} from {from} rejected: not the custodian")]
    NotCustodian { token_id: TokenId, from: String },
}

/// Ownership record for uniquely identified tokens.
pub trait AssetRegistry {
    /// Current custodian of `token_id`.
    fn owner_of(&self, token_id: TokenId) -> Result<Address, RegistryError>;

    /// Move custody of `token_id` from `from` to `to`. Fails if `from` is
    /// not the current custodian.
    fn transfer_custody(
        &mut self,
        token_id: TokenId,
        from: Address,
        to: Address,
    ) -> Result<(), RegistryError>;
}

/// Resolves the registry reference stored on an auction.
pub trait AssetRegistries {
    fn resolve(&mut self, registry: &Address) -> Option<&mut dyn AssetRegistry>;
}

impl<R: AssetRegistry + 'static> AssetRegistries for HashMap<Address, R> {
    fn resolve(&mut self, registry: &Address) -> Option<&mut dyn AssetRegistry> {
        self.get_mut(registry)
            .map(|registry| registry as &mut dyn AssetRegistry)
    }
}

/// In-memory registry for hosts that keep ownership alongside the ledger.
#[derive(Debug, Clone)]
pub struct InMemoryRegistry {
    address: Address,
    owners: HashMap<TokenId, Address>,
}

impl InMemoryRegistry {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            owners: HashMap::new(),
        }
    }

    /// Register a new token held by `owner`.
    pub fn mint(&mut self, token_id: TokenId, owner: Address) -> Result<(), RegistryError> {
        if self.owners.contains_key(&token_id) {
            return Err(RegistryError::TokenExists(token_id));
        }
        self.owners.insert(token_id, owner);
        Ok(())
    }
}

impl AssetRegistry for InMemoryRegistry {
    fn owner_of(&self, token_id: TokenId) -> Result<Address, RegistryError> {
        self.owners
            .get(&token_id)
            .copied()
            .ok_or(RegistryError::UnknownToken(token_id))
    }

    fn transfer_custody(
        &mut self,
        token_id: TokenId,
        from: Address,
        to: Address,
    ) -> Result<(), RegistryError> {
        let owner = self
            .owners
            .get_mut(&token_id)
            .ok_or(RegistryError::UnknownToken(token_id))?;

        if *owner != from {
            return Err(RegistryError::NotCustodian {
                token_id,
                from: hex::encode(from),
            });
        }

        *owner = to;
        Ok(())
    }
}

impl AssetRegistries for InMemoryRegistry {
    fn resolve(&mut self, registry: &Address) -> Option<&mut dyn AssetRegistry> {
        if *registry == self.address {
            Some(self as &mut dyn AssetRegistry)
        } else {
            None
        }
    }
}
