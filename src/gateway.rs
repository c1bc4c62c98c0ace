// src/gateway.rs
use crate::error::{LedgerError, LedgerResult};
use crate::models::{Account, AccountId};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

/// Persistence for account records, keyed by id and by name.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn get_by_name(&self, name: &str) -> LedgerResult<Option<Account>>;

    async fn get_by_id(&self, id: AccountId) -> LedgerResult<Option<Account>>;

    /// Stores a fresh account and assigns its id. Fails with `Conflict` when
    /// the name is already taken.
    async fn create(&self, name: &str, password_hash: &str) -> LedgerResult<Account>;

    /// Overwrites the full record.
    async fn update(&self, account: &Account) -> LedgerResult<()>;

    async fn delete(&self, name: &str) -> LedgerResult<()>;
}

#[derive(Clone, Default)]
pub struct InMemoryGateway {
    accounts: Arc<DashMap<AccountId, Account>>,
    names: Arc<DashMap<String, AccountId>>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[async_trait]
impl Gateway for InMemoryGateway {
    async fn get_by_name(&self, name: &str) -> LedgerResult<Option<Account>> {
        let id = match self.names.get(name) {
            Some(id) => *id.value(),
            None => return Ok(None),
        };
        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: AccountId) -> LedgerResult<Option<Account>> {
        Ok(self.accounts.get(&id).map(|a| a.value().clone()))
    }

    async fn create(&self, name: &str, password_hash: &str) -> LedgerResult<Account> {
        // Holding the name entry makes check-and-insert atomic.
        match self.names.entry(name.to_string()) {
            Entry::Occupied(_) => Err(LedgerError::Conflict),
            Entry::Vacant(slot) => {
                let account = Account::new(AccountId::new(), name, password_hash);
                self.accounts.insert(account.id, account.clone());
                slot.insert(account.id);
                Ok(account)
            }
        }
    }

    async fn update(&self, account: &Account) -> LedgerResult<()> {
        match self.accounts.get_mut(&account.id) {
            Some(mut stored) => {
                *stored = account.clone();
                Ok(())
            }
            None => Err(LedgerError::NotFound),
        }
    }

    async fn delete(&self, name: &str) -> LedgerResult<()> {
        if let Some((_, id)) = self.names.remove(name) {
            self.accounts.remove(&id);
        }
        Ok(())
    }
}
