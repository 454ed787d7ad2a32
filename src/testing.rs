//! Shared test doubles

use async_trait::async_trait;
use axum::Router;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Barrier;

use crate::entitlement::{EntitlementClient, EntitlementError, Limit};
use crate::identity::{IdentityError, IdentityResolver, Principal, RequestContext};
use crate::store::{Account, AccountStore, InMemoryAccountStore, StoreError, StoreResult};

/// Serve `app` on an ephemeral localhost port
pub(crate) async fn spawn_server(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Resolver that treats the access token as the principal id
#[derive(Debug, Default)]
pub(crate) struct TokenIsPrincipal {
    pub calls: AtomicUsize,
}

#[async_trait]
impl IdentityResolver for TokenIsPrincipal {
    async fn resolve(&self, ctx: &RequestContext) -> Result<Principal, IdentityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match ctx.access_token() {
            Some(token) => Ok(Principal::new(token, token)),
            None => Err(IdentityError::Unauthenticated),
        }
    }
}

/// Entitlement client with a canned answer and a call counter
pub(crate) struct MockEntitlements {
    response: Mutex<Result<Limit, EntitlementError>>,
    calls: AtomicUsize,
    barrier: Option<Arc<Barrier>>,
    delay: Duration,
}

impl MockEntitlements {
    pub fn returning(response: Result<Limit, EntitlementError>) -> Self {
        Self {
            response: Mutex::new(response),
            calls: AtomicUsize::new(0),
            barrier: None,
            delay: Duration::ZERO,
        }
    }

    pub fn bounded(n: u64) -> Self {
        Self::returning(Ok(Limit::Bounded(n)))
    }

    /// Every call waits until `barrier` releases
    pub fn with_barrier(mut self, barrier: Arc<Barrier>) -> Self {
        self.barrier = Some(barrier);
        self
    }

    /// Every call sleeps before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_response(&self, response: Result<Limit, EntitlementError>) {
        *self.response.lock().unwrap() = response;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EntitlementClient for MockEntitlements {
    async fn get_limit(
        &self,
        _principal: &Principal,
        _feature_key: &str,
    ) -> Result<Limit, EntitlementError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.response.lock().unwrap().clone()
    }
}

/// In-memory store that counts calls and can be told to fail
#[derive(Debug, Default)]
pub(crate) struct CountingStore {
    pub inner: InMemoryAccountStore,
    pub count_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    pub fail_create: AtomicBool,
    pub fail_reads: AtomicBool,
}

impl CountingStore {
    pub fn total_calls(&self) -> usize {
        self.count_calls.load(Ordering::SeqCst)
            + self.list_calls.load(Ordering::SeqCst)
            + self.create_calls.load(Ordering::SeqCst)
            + self.delete_calls.load(Ordering::SeqCst)
    }

    fn read_guard(&self) -> StoreResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Database("store unreachable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl AccountStore for CountingStore {
    async fn count(&self, owner_id: &str) -> StoreResult<u64> {
        self.count_calls.fetch_add(1, Ordering::SeqCst);
        self.read_guard()?;
        self.inner.count(owner_id).await
    }

    async fn list(&self, owner_id: &str) -> StoreResult<Vec<Account>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.read_guard()?;
        self.inner.list(owner_id).await
    }

    async fn create(
        &self,
        owner_id: &str,
        name: &str,
        account_number: &str,
    ) -> StoreResult<Account> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(StoreError::Database("constraint violation".to_string()));
        }
        self.inner.create(owner_id, name, account_number).await
    }

    async fn delete_owned(&self, id: &str, owner_id: &str) -> StoreResult<u64> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.read_guard()?;
        self.inner.delete_owned(id, owner_id).await
    }

    fn name(&self) -> &str {
        "counting"
    }
}
