//! SQLite-backed account store
//!
//! One connection guarded by a mutex; every query runs on the blocking pool so
//! the async runtime never waits on disk I/O.

use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::{new_account, Account, AccountStore, StoreError, StoreResult};

/// Persistent account store
#[derive(Debug, Clone)]
pub struct SqliteAccountStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteAccountStore {
    /// Open (or create) the database at `path` and ensure the schema exists
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        Self::init_schema(&conn)?;
        tracing::info!(path = %path.as_ref().display(), "Opened SQLite account store");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn init_schema(conn: &Connection) -> StoreResult<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS accounts (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                account_number TEXT NOT NULL,
                owner_id TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_accounts_owner_id ON accounts(owner_id)",
            [],
        )?;

        Ok(())
    }

    /// Run `op` against the connection on the blocking pool
    async fn with_conn<T, F>(&self, op: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> StoreResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| StoreError::Task("SQLite connection mutex poisoned".to_string()))?;
            op(&guard)
        })
        .await?
    }
}

#[async_trait]
impl AccountStore for SqliteAccountStore {
    async fn count(&self, owner_id: &str) -> StoreResult<u64> {
        let owner_id = owner_id.to_string();
        self.with_conn(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM accounts WHERE owner_id = ?1",
                params![owner_id],
                |row| row.get(0),
            )?;
            Ok(count.max(0) as u64)
        })
        .await
    }

    async fn list(&self, owner_id: &str) -> StoreResult<Vec<Account>> {
        let owner_id = owner_id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, account_number, owner_id, created_at
                 FROM accounts
                 WHERE owner_id = ?1
                 ORDER BY name ASC, created_at ASC",
            )?;
            let rows = stmt.query_map(params![owner_id], |row| {
                Ok(Account {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    account_number: row.get(2)?,
                    owner_id: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })?;

            let mut accounts = Vec::new();
            for row in rows {
                accounts.push(row?);
            }
            Ok(accounts)
        })
        .await
    }

    async fn create(
        &self,
        owner_id: &str,
        name: &str,
        account_number: &str,
    ) -> StoreResult<Account> {
        let account = new_account(owner_id, name, account_number);
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO accounts (id, name, account_number, owner_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    account.id,
                    account.name,
                    account.account_number,
                    account.owner_id,
                    account.created_at,
                ],
            )?;
            Ok(account)
        })
        .await
    }

    async fn delete_owned(&self, id: &str, owner_id: &str) -> StoreResult<u64> {
        let id = id.to_string();
        let owner_id = owner_id.to_string();
        self.with_conn(move |conn| {
            let removed = conn.execute(
                "DELETE FROM accounts WHERE id = ?1 AND owner_id = ?2",
                params![id, owner_id],
            )?;
            Ok(removed as u64)
        })
        .await
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}
