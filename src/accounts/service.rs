//! Account service

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::error::ServiceError;
use super::input::{AccountInput, ValidAccountInput};
use super::locks::OwnerLocks;
use super::outcome::{AddOutcome, DeleteOutcome, Usage};
use super::LimitEnforcement;
use crate::entitlement::{EntitlementClient, TRACKED_ACCOUNTS_FEATURE};
use crate::identity::{IdentityResolver, Principal, RequestContext};
use crate::metrics;
use crate::store::{Account, AccountStore};

/// Longest principal id accepted by the count endpoint
const MAX_PRINCIPAL_ID_LEN: usize = 255;

/// Reply of the count endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountCount {
    pub principal_id: String,
    pub count: u64,
}

/// Quota-enforced tracked account operations
pub struct AccountService {
    identity: Arc<dyn IdentityResolver>,
    entitlements: Arc<dyn EntitlementClient>,
    store: Arc<dyn AccountStore>,
    feature_key: String,
    enforcement: LimitEnforcement,
    owner_locks: OwnerLocks,
}

impl AccountService {
    /// Create a service with soft enforcement on the `tracked_accounts` feature
    pub fn new(
        identity: Arc<dyn IdentityResolver>,
        entitlements: Arc<dyn EntitlementClient>,
        store: Arc<dyn AccountStore>,
    ) -> Self {
        Self {
            identity,
            entitlements,
            store,
            feature_key: TRACKED_ACCOUNTS_FEATURE.to_string(),
            enforcement: LimitEnforcement::Soft,
            owner_locks: OwnerLocks::new(),
        }
    }

    pub fn with_enforcement(mut self, enforcement: LimitEnforcement) -> Self {
        self.enforcement = enforcement;
        self
    }

    pub fn with_feature_key(mut self, feature_key: impl Into<String>) -> Self {
        self.feature_key = feature_key.into();
        self
    }

    pub fn enforcement(&self) -> LimitEnforcement {
        self.enforcement
    }

    pub fn feature_key(&self) -> &str {
        &self.feature_key
    }

    /// Resolve the caller once so several operations can share it
    pub async fn authenticate(&self, ctx: &RequestContext) -> Result<Principal, ServiceError> {
        Ok(self.identity.resolve(ctx).await?)
    }

    /// The caller's accounts, sorted by name
    pub async fn list_accounts(&self, ctx: &RequestContext) -> Result<Vec<Account>, ServiceError> {
        let principal = self.authenticate(ctx).await?;
        self.list_for(&principal).await
    }

    /// Accounts of an already resolved principal
    pub async fn list_for(&self, principal: &Principal) -> Result<Vec<Account>, ServiceError> {
        let accounts = self.store.list(&principal.id).await?;
        debug!(principal = %principal.id, count = accounts.len(), "Listed tracked accounts");
        Ok(accounts)
    }

    /// Add an account for the caller, subject to the plan limit
    ///
    /// Only a missing session and an unreadable store count are errors;
    /// everything else is an [`AddOutcome`].
    pub async fn add_account(
        &self,
        ctx: &RequestContext,
        input: &AccountInput,
    ) -> Result<AddOutcome, ServiceError> {
        let principal = self.authenticate(ctx).await?;
        self.add_for(&principal, input).await
    }

    pub async fn add_for(
        &self,
        principal: &Principal,
        input: &AccountInput,
    ) -> Result<AddOutcome, ServiceError> {
        let outcome = match input.validate() {
            Ok(valid) => match self.enforcement {
                LimitEnforcement::Soft => self.add_checked(principal, valid).await?,
                LimitEnforcement::Strict => {
                    let _guard = self.owner_locks.acquire(&principal.id).await;
                    self.add_checked(principal, valid).await?
                }
            },
            Err(message) => AddOutcome::Invalid { message },
        };

        metrics::record_add_outcome(outcome.label());
        Ok(outcome)
    }

    async fn add_checked(
        &self,
        principal: &Principal,
        input: ValidAccountInput,
    ) -> Result<AddOutcome, ServiceError> {
        let used = self.store.count(&principal.id).await?;

        let limit = match self.entitlements.get_limit(principal, &self.feature_key).await {
            Ok(limit) => limit,
            Err(e) => {
                warn!(principal = %principal.id, "Rejecting add, entitlements unavailable: {}", e);
                return Ok(AddOutcome::EntitlementUnavailable);
            }
        };

        info!(
            principal = %principal.id,
            feature_key = %self.feature_key,
            used,
            limit = %limit,
            "Current tracked account usage"
        );

        if !limit.admits(used) {
            return Ok(AddOutcome::LimitReached {
                used,
                limit: limit.max().unwrap_or_default(),
            });
        }

        match self
            .store
            .create(&principal.id, &input.name, &input.account_number)
            .await
        {
            Ok(account) => {
                info!(principal = %principal.id, account_id = %account.id, "Tracked account added");
                Ok(AddOutcome::Added {
                    account,
                    usage: Usage::new(used + 1, limit),
                })
            }
            Err(e) => {
                error!(principal = %principal.id, "Failed to create tracked account: {}", e);
                Ok(AddOutcome::CreationFailed)
            }
        }
    }

    /// Delete one of the caller's accounts
    pub async fn delete_account(
        &self,
        ctx: &RequestContext,
        id: &str,
    ) -> Result<DeleteOutcome, ServiceError> {
        let principal = self.authenticate(ctx).await?;
        self.delete_for(&principal, id).await
    }

    pub async fn delete_for(
        &self,
        principal: &Principal,
        id: &str,
    ) -> Result<DeleteOutcome, ServiceError> {
        let removed = self.store.delete_owned(id, &principal.id).await?;

        if removed == 0 {
            debug!(principal = %principal.id, account_id = %id, "Nothing deleted");
            return Ok(DeleteOutcome::NotFoundOrNotAllowed);
        }

        metrics::ACCOUNTS_DELETED_TOTAL.inc_by(removed);
        info!(principal = %principal.id, account_id = %id, "Tracked account deleted");
        Ok(DeleteOutcome::Deleted)
    }

    /// Number of accounts owned by an arbitrary principal
    ///
    /// No session and no entitlement check: this reads a count, not records.
    pub async fn count_for(&self, principal_id: &str) -> Result<AccountCount, ServiceError> {
        let principal_id = validate_principal_id(principal_id)?;
        let count = self.store.count(principal_id).await?;
        Ok(AccountCount {
            principal_id: principal_id.to_string(),
            count,
        })
    }
}

fn validate_principal_id(id: &str) -> Result<&str, ServiceError> {
    if id.trim().is_empty() {
        return Err(ServiceError::Validation("principalId is required".to_string()));
    }
    if id.trim() != id {
        return Err(ServiceError::Validation(
            "principalId must not have surrounding whitespace".to_string(),
        ));
    }
    if id.len() > MAX_PRINCIPAL_ID_LEN {
        return Err(ServiceError::Validation("principalId is too long".to_string()));
    }
    if id.chars().any(char::is_control) {
        return Err(ServiceError::Validation(
            "principalId contains invalid characters".to_string(),
        ));
    }
    Ok(id)
}
