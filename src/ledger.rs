// src/ledger.rs
use crate::auth::hash_password;
use crate::error::{LedgerError, LedgerResult};
use crate::gateway::Gateway;
use crate::models::{Account, AccountId, Transaction};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use log::{info, warn};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Flat cost charged on every buy, in account currency.
pub const TRANSACTION_FEE: Decimal = Decimal::from_parts(75, 0, 0, false, 0);

pub const SIGNIN_OK: &str = "signin successful";
pub const SIGNUP_OK: &str = "user created";
pub const DELETE_OK: &str = "user deleted";

/// Account operations on top of a [`Gateway`].
///
/// Mutations of a single account (buy, favorite update, delete) run one at a
/// time; each holds that account's lock across its read-modify-write.
pub struct Ledger {
    gateway: Arc<dyn Gateway>,
    fee: Decimal,
    locks: DashMap<AccountId, Arc<Mutex<()>>>,
}

impl Ledger {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self::with_fee(gateway, TRANSACTION_FEE)
    }

    pub fn with_fee(gateway: Arc<dyn Gateway>, fee: Decimal) -> Self {
        Ledger {
            gateway,
            fee,
            locks: DashMap::new(),
        }
    }

    pub fn fee(&self) -> Decimal {
        self.fee
    }

    async fn lock(&self, id: AccountId) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Locks and loads an account. A missing account leaves no lock entry behind.
    async fn lock_account(&self, id: AccountId) -> LedgerResult<(OwnedMutexGuard<()>, Account)> {
        let guard = self.lock(id).await;
        match self.account(id).await {
            Ok(account) => Ok((guard, account)),
            Err(LedgerError::NotFound) => {
                drop(guard);
                self.locks.remove(&id);
                Err(LedgerError::NotFound)
            }
            Err(e) => Err(e),
        }
    }

    async fn authenticate(&self, name: &str, password: &str) -> LedgerResult<Account> {
        let account = self
            .gateway
            .get_by_name(name)
            .await?
            .ok_or(LedgerError::NotFound)?;

        if account.password_hash != hash_password(password) {
            return Err(LedgerError::Unauthorized);
        }
        Ok(account)
    }

    pub async fn sign_in(&self, username: &str, password: &str) -> LedgerResult<Account> {
        match self.authenticate(username, password).await {
            Ok(account) => {
                info!("User {} signed in.", username);
                Ok(account)
            }
            Err(e) => {
                warn!("Sign-in for {} refused: {}", username, e);
                Err(e)
            }
        }
    }

    pub async fn sign_up(&self, username: &str, password: &str) -> LedgerResult<()> {
        if self.gateway.get_by_name(username).await?.is_some() {
            warn!("Sign-up for {} refused: name taken.", username);
            return Err(LedgerError::Conflict);
        }

        let account = self
            .gateway
            .create(username, &hash_password(password))
            .await?;
        info!("User {} registered as {}.", username, account.id);
        Ok(())
    }

    pub async fn delete(&self, name: &str, password: &str) -> LedgerResult<()> {
        let account = self.authenticate(name, password).await?;
        let guard = self.lock(account.id).await;

        // The name may have been released and claimed by a new account since
        // the password was checked.
        match self.gateway.get_by_name(name).await? {
            Some(current) if current.id == account.id => {}
            _ => {
                drop(guard);
                self.locks.remove(&account.id);
                warn!("Delete of {} refused: account replaced.", name);
                return Err(LedgerError::NotFound);
            }
        }

        self.gateway.delete(name).await?;
        drop(guard);
        self.locks.remove(&account.id);
        info!("User {} deleted.", name);
        Ok(())
    }

    /// True iff `id` resolves to an account named exactly `name`.
    pub async fn exists(&self, id: AccountId, name: &str) -> bool {
        match self.gateway.get_by_id(id).await {
            Ok(Some(account)) => account.name == name,
            Ok(None) => false,
            Err(e) => {
                warn!("Existence check for {} failed: {}", id, e);
                false
            }
        }
    }

    pub async fn account(&self, id: AccountId) -> LedgerResult<Account> {
        self.gateway
            .get_by_id(id)
            .await?
            .ok_or(LedgerError::NotFound)
    }

    /// Appends a buy and debits `quantity * price + fee`. The balance is not
    /// checked and may go negative.
    pub async fn buy(
        &self,
        user_id: AccountId,
        symbol: &str,
        quantity: u32,
        price: Decimal,
        timestamp: DateTime<Utc>,
    ) -> LedgerResult<Account> {
        if quantity == 0 {
            return Err(LedgerError::InvalidOrder("quantity must be positive".into()));
        }
        if price.is_sign_negative() {
            return Err(LedgerError::InvalidOrder("price must not be negative".into()));
        }

        let transaction = Transaction::buy(symbol, quantity, price, timestamp);
        let cost = transaction
            .value()
            .and_then(|value| value.checked_add(self.fee))
            .ok_or_else(|| LedgerError::InvalidOrder("order value out of range".into()))?;

        let (_guard, mut account) = self.lock_account(user_id).await?;
        account.balance = account
            .balance
            .checked_sub(cost)
            .ok_or_else(|| LedgerError::InvalidOrder("balance out of range".into()))?;
        account.record(transaction);
        self.gateway.update(&account).await?;

        info!(
            "{} bought {} {} at {}; balance now {}",
            account.name, quantity, symbol, price, account.balance
        );
        Ok(account)
    }

    pub async fn update_favorite_stock(
        &self,
        user_id: AccountId,
        favorite_stock: &str,
    ) -> LedgerResult<Account> {
        let (_guard, mut account) = self.lock_account(user_id).await?;

        account.favorite_stock = Some(favorite_stock.to_string());
        self.gateway.update(&account).await?;
        Ok(account)
    }
}
