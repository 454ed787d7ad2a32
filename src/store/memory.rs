//! In-memory account store

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{new_account, Account, AccountStore, StoreResult};

/// Process-local account store
///
/// Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAccountStore {
    accounts: Arc<RwLock<HashMap<String, Account>>>,
}

impl InMemoryAccountStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of records across all owners
    pub async fn len(&self) -> usize {
        self.accounts.read().await.len()
    }

    /// Whether the store holds no records
    pub async fn is_empty(&self) -> bool {
        self.accounts.read().await.is_empty()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn count(&self, owner_id: &str) -> StoreResult<u64> {
        let accounts = self.accounts.read().await;
        Ok(accounts.values().filter(|a| a.owner_id == owner_id).count() as u64)
    }

    async fn list(&self, owner_id: &str) -> StoreResult<Vec<Account>> {
        let accounts = self.accounts.read().await;
        let mut owned: Vec<Account> = accounts
            .values()
            .filter(|a| a.owner_id == owner_id)
            .cloned()
            .collect();

        // Byte-wise, same as SQLite BINARY collation
        owned.sort_by(|a, b| {
            a.name
                .as_bytes()
                .cmp(b.name.as_bytes())
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        Ok(owned)
    }

    async fn create(
        &self,
        owner_id: &str,
        name: &str,
        account_number: &str,
    ) -> StoreResult<Account> {
        let account = new_account(owner_id, name, account_number);
        let mut accounts = self.accounts.write().await;
        accounts.insert(account.id.clone(), account.clone());
        Ok(account)
    }

    async fn delete_owned(&self, id: &str, owner_id: &str) -> StoreResult<u64> {
        let mut accounts = self.accounts.write().await;
        match accounts.get(id) {
            Some(account) if account.owner_id == owner_id => {
                accounts.remove(id);
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    fn name(&self) -> &str {
        "memory"
    }
}
