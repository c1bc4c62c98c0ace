// src/models.rs
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(Uuid);

impl AccountId {
    pub fn new() -> Self {
        AccountId(Uuid::new_v4())
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AccountId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(AccountId)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Buy,
}

/// One executed order. Never edited after it is appended to an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub symbol: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub quantity: u32,
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    pub fn buy(symbol: &str, quantity: u32, price: Decimal, timestamp: DateTime<Utc>) -> Self {
        Transaction {
            symbol: symbol.to_string(),
            kind: TransactionKind::Buy,
            quantity,
            price,
            timestamp,
        }
    }

    /// Gross value of the order, before fees. `None` on overflow.
    pub fn value(&self) -> Option<Decimal> {
        Decimal::from(self.quantity).checked_mul(self.price)
    }

    pub fn view(&self) -> TransactionView {
        TransactionView {
            symbol: self.symbol.clone(),
            kind: self.kind,
            quantity: self.quantity,
            price: self.price,
            timestamp: self.timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionView {
    pub symbol: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    pub symbol: String,
    pub quantity: u32,
    pub average_price: Decimal,
}

impl Holding {
    pub fn view(&self) -> HoldingView {
        HoldingView {
            symbol: self.symbol.clone(),
            quantity: self.quantity,
            average_price: self.average_price,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingView {
    pub symbol: String,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub average_price: Decimal,
}

/// Stored account record, password hash included.
///
/// The transaction history is only reachable read-only from outside the
/// crate; the ledger appends to it through [`Account::record`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub password_hash: String,
    pub balance: Decimal,
    #[serde(default)]
    transactions: Vec<Transaction>,
    #[serde(default)]
    pub current_stocks: Vec<Holding>,
    #[serde(default)]
    pub stared_stocks: Vec<String>,
    #[serde(default)]
    pub favorite_stock: Option<String>,
}

impl Account {
    pub fn new(id: AccountId, name: &str, password_hash: &str) -> Self {
        Account {
            id,
            name: name.to_string(),
            password_hash: password_hash.to_string(),
            balance: Decimal::ZERO,
            transactions: Vec::new(),
            current_stocks: Vec::new(),
            stared_stocks: Vec::new(),
            favorite_stock: None,
        }
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub(crate) fn record(&mut self, transaction: Transaction) {
        self.transactions.push(transaction);
    }

    pub fn view(&self) -> AccountView {
        AccountView {
            id: self.id,
            name: self.name.clone(),
            balance: self.balance,
            transactions: self.transactions.iter().map(Transaction::view).collect(),
            current_stocks: self.current_stocks.iter().map(Holding::view).collect(),
            stared_stocks: self.stared_stocks.clone(),
            favorite_stock: self.favorite_stock.clone(),
        }
    }
}

/// What the dashboard receives for a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: AccountId,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
    pub transactions: Vec<TransactionView>,
    pub current_stocks: Vec<HoldingView>,
    pub stared_stocks: Vec<String>,
    pub favorite_stock: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
    pub symbol: String,
    pub name: String,
}

impl Market {
    pub fn new(symbol: &str, name: &str) -> Self {
        Market {
            symbol: symbol.to_string(),
            name: name.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn view_hides_password_hash() {
        let account = Account::new(AccountId::new(), "alice", "digest");
        let json = serde_json::to_value(account.view()).unwrap();

        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["transactions"], serde_json::json!([]));
        assert_eq!(json["currentStocks"], serde_json::json!([]));
        assert_eq!(json["favoriteStock"], serde_json::Value::Null);
    }

    #[test]
    fn transaction_view_renders_type_and_numeric_price() {
        let tx = Transaction::buy("AAPL", 3, dec!(12.5), Utc::now());
        let json = serde_json::to_value(tx.view()).unwrap();

        assert_eq!(json["type"], "buy");
        assert_eq!(json["price"], serde_json::json!(12.5));
        assert_eq!(tx.value(), Some(dec!(37.5)));
    }

    #[test]
    fn value_overflow_is_none() {
        let tx = Transaction::buy("X", 2, Decimal::MAX, Utc::now());
        assert_eq!(tx.value(), None);
    }

    #[test]
    fn stored_record_keeps_exact_prices() {
        let mut account = Account::new(AccountId::new(), "alice", "h");
        account.record(Transaction::buy("ABC", 1, dec!(0.1000000000000000000000000001), Utc::now()));
        account.current_stocks.push(Holding {
            symbol: "ABC".to_string(),
            quantity: 1,
            average_price: dec!(123.456789012345678901),
        });

        let doc = serde_json::to_string(&account).unwrap();
        let restored: Account = serde_json::from_str(&doc).unwrap();

        assert_eq!(restored, account);
    }

    #[test]
    fn stored_record_without_history_loads_empty() {
        let id = AccountId::new();
        let doc = format!(
            r#"{{"id":"{}","name":"bob","passwordHash":"x","balance":"10"}}"#,
            id
        );
        let account: Account = serde_json::from_str(&doc).unwrap();

        assert!(account.transactions().is_empty());
        assert_eq!(account.balance, dec!(10));
    }
}
