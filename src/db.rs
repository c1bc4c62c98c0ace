// src/db.rs
use crate::error::{LedgerError, LedgerResult};
use crate::gateway::Gateway;
use crate::models::{Account, AccountId};
use async_trait::async_trait;
use log::{error, info, warn};
use std::future::Future;
use scylla::{frame::response::result::CqlValue, query::Query, Session, SessionBuilder};

/// Accounts stored in ScyllaDB as JSON documents, with a name index table.
pub struct ScyllaGateway {
    session: Session,
}

pub async fn init(node: &str) -> Result<Session, Box<dyn std::error::Error>> {
    let session = SessionBuilder::new().known_node(node).build().await?;

    session.query("CREATE KEYSPACE IF NOT EXISTS stock_demo WITH REPLICATION = {'class': 'SimpleStrategy', 'replication_factor': 1}", &[]).await?;
    session
        .query(
            "CREATE TABLE IF NOT EXISTS stock_demo.accounts (id TEXT PRIMARY KEY, doc TEXT)",
            &[],
        )
        .await?;
    session
        .query(
            "CREATE TABLE IF NOT EXISTS stock_demo.accounts_by_name (name TEXT PRIMARY KEY, id TEXT)",
            &[],
        )
        .await?;

    info!("Successfully connected to ScyllaDB at {}.", node);
    Ok(session)
}

fn storage<E: std::fmt::Display>(e: E) -> LedgerError {
    error!("ScyllaDB request failed: {}", e);
    LedgerError::Storage(e.to_string())
}

fn first_column(rows: Option<Vec<scylla::frame::response::result::Row>>) -> Option<CqlValue> {
    rows?.into_iter().next()?.columns.into_iter().next()?
}

/// Awaits `step`; when it fails, awaits `undo` before handing back the
/// original error.
async fn or_undo<T, S, U>(step: S, undo: U) -> LedgerResult<T>
where
    S: Future<Output = LedgerResult<T>>,
    U: Future<Output = LedgerResult<()>>,
{
    match step.await {
        Ok(value) => Ok(value),
        Err(e) => {
            if let Err(undo_err) = undo.await {
                warn!("Rollback after failed write also failed: {}", undo_err);
            }
            Err(e)
        }
    }
}

impl ScyllaGateway {
    pub fn new(session: Session) -> Self {
        ScyllaGateway { session }
    }

    pub async fn connect(node: &str) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self::new(init(node).await?))
    }

    async fn id_for_name(&self, name: &str) -> LedgerResult<Option<AccountId>> {
        let query = Query::new("SELECT id FROM stock_demo.accounts_by_name WHERE name = ?");
        let result = self.session.query(query, (name,)).await.map_err(storage)?;

        match first_column(result.rows) {
            Some(value) => {
                let text = value
                    .as_text()
                    .ok_or_else(|| storage("id column is not text"))?;
                text.parse().map(Some).map_err(storage)
            }
            None => Ok(None),
        }
    }

    async fn release_name(&self, name: &str) -> LedgerResult<()> {
        let query = Query::new("DELETE FROM stock_demo.accounts_by_name WHERE name = ?");
        self.session.query(query, (name,)).await.map_err(storage)?;
        Ok(())
    }

    async fn write_doc(&self, account: &Account) -> LedgerResult<()> {
        let doc = serde_json::to_string(account).map_err(storage)?;
        let query = Query::new("INSERT INTO stock_demo.accounts (id, doc) VALUES (?, ?)");
        self.session
            .query(query, (account.id.to_string(), doc))
            .await
            .map_err(storage)?;
        Ok(())
    }
}

#[async_trait]
impl Gateway for ScyllaGateway {
    async fn get_by_name(&self, name: &str) -> LedgerResult<Option<Account>> {
        match self.id_for_name(name).await? {
            Some(id) => self.get_by_id(id).await,
            None => Ok(None),
        }
    }

    async fn get_by_id(&self, id: AccountId) -> LedgerResult<Option<Account>> {
        let query = Query::new("SELECT doc FROM stock_demo.accounts WHERE id = ?");
        let result = self
            .session
            .query(query, (id.to_string(),))
            .await
            .map_err(storage)?;

        match first_column(result.rows) {
            Some(value) => {
                let doc = value
                    .as_text()
                    .ok_or_else(|| storage("doc column is not text"))?;
                serde_json::from_str(doc).map(Some).map_err(storage)
            }
            None => Ok(None),
        }
    }

    async fn create(&self, name: &str, password_hash: &str) -> LedgerResult<Account> {
        let account = Account::new(AccountId::new(), name, password_hash);

        // Lightweight transaction claims the name; `[applied]` is false if taken.
        let claim = Query::new(
            "INSERT INTO stock_demo.accounts_by_name (name, id) VALUES (?, ?) IF NOT EXISTS",
        );
        let result = self
            .session
            .query(claim, (name, account.id.to_string()))
            .await
            .map_err(storage)?;
        let applied = first_column(result.rows)
            .and_then(|v| v.as_boolean())
            .unwrap_or(false);
        if !applied {
            return Err(LedgerError::Conflict);
        }

        // A claimed name without a document would block the name for good.
        or_undo(self.write_doc(&account), self.release_name(name)).await?;
        info!("Created account {} for {}", account.id, name);
        Ok(account)
    }

    async fn update(&self, account: &Account) -> LedgerResult<()> {
        self.write_doc(account).await
    }

    async fn delete(&self, name: &str) -> LedgerResult<()> {
        let id = match self.id_for_name(name).await? {
            Some(id) => id,
            None => return Ok(()),
        };

        let query = Query::new("DELETE FROM stock_demo.accounts WHERE id = ?");
        self.session
            .query(query, (id.to_string(),))
            .await
            .map_err(storage)?;
        self.release_name(name).await
    }
}
