//! Account Store
//!
//! Owner-scoped CRUD over tracked account records. The service layer talks to
//! the [`AccountStore`] trait only; two backends are provided:
//!
//! - [`InMemoryAccountStore`]: process-local, used by tests and `backend = "memory"`
//! - [`SqliteAccountStore`]: persistent, backed by a SQLite file
//!
//! # Ordering
//!
//! `list` returns accounts sorted by name using byte-wise comparison, which
//! is what SQLite's default `BINARY` collation does. Both backends agree.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use memory::InMemoryAccountStore;
pub use sqlite::SqliteAccountStore;

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// A tracked account owned by exactly one principal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Store-generated identifier
    pub id: String,

    /// Display label chosen by the owner
    pub name: String,

    /// Account number as entered (not unique, not even per owner)
    pub account_number: String,

    /// Principal that owns this record
    pub owner_id: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Errors raised by store backends
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The database rejected or failed the operation
    #[error("Database error: {0}")]
    Database(String),

    /// The blocking worker running the query failed
    #[error("Store task failed: {0}")]
    Task(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        StoreError::Task(err.to_string())
    }
}

/// Data-access interface for tracked accounts
///
/// Every operation is scoped by owner. Implementations must not enforce any
/// quota: limits are the service's business.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Number of accounts owned by `owner_id`
    async fn count(&self, owner_id: &str) -> StoreResult<u64>;

    /// Accounts owned by `owner_id`, sorted by name ascending
    async fn list(&self, owner_id: &str) -> StoreResult<Vec<Account>>;

    /// Insert a new account for `owner_id`
    async fn create(&self, owner_id: &str, name: &str, account_number: &str)
        -> StoreResult<Account>;

    /// Delete `id` only if it belongs to `owner_id`
    ///
    /// Returns the number of rows removed (0 or 1). A record owned by someone
    /// else and a record that does not exist both yield 0.
    async fn delete_owned(&self, id: &str, owner_id: &str) -> StoreResult<u64>;

    /// Backend name for logs
    fn name(&self) -> &str;
}

/// Build a fresh account record with a generated id
pub(crate) fn new_account(owner_id: &str, name: &str, account_number: &str) -> Account {
    Account {
        id: uuid::Uuid::new_v4().to_string(),
        name: name.to_string(),
        account_number: account_number.to_string(),
        owner_id: owner_id.to_string(),
        created_at: Utc::now(),
    }
}
