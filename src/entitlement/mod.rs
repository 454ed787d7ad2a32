//! Entitlement Client
//!
//! Looks up a principal's usage cap for a feature key from the plan/billing
//! API of the identity provider.
//!
//! # Failure policy
//!
//! The lookup fails *open* on response shape and *closed* on transport:
//!
//! - 404, a missing entitlement, a mismatched feature key or an unusable
//!   `entitlement_limit_max` all mean [`Limit::Unbounded`]
//! - no credential, network failure, timeout, any other non-2xx status or a
//!   body that is not JSON at all surface as [`EntitlementError`]
//!
//! Every call is a single round trip. Nothing is cached or retried.

pub mod http;
pub mod limit;

use async_trait::async_trait;

use crate::identity::Principal;

pub use http::HttpEntitlementClient;
pub use limit::{limit_from_body, Limit};

/// Feature key for the tracked accounts cap
pub const TRACKED_ACCOUNTS_FEATURE: &str = "tracked_accounts";

/// Errors raised by an entitlement lookup
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EntitlementError {
    /// The principal has no bearer credential to forward
    #[error("no credential available for entitlement lookup")]
    NoCredential,

    /// The client cannot be built from the current configuration
    #[error("entitlement client misconfigured: {0}")]
    Misconfigured(String),

    /// Network failure or timeout
    #[error("entitlement request failed: {0}")]
    Transport(String),

    /// The API answered with a non-2xx status other than 404
    #[error("could not read entitlement ({status}). {body}")]
    Status { status: u16, body: String },

    /// A 2xx answer whose body is not JSON
    #[error("entitlement response is not valid JSON: {0}")]
    Decode(String),
}

impl EntitlementError {
    /// Short label for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            EntitlementError::NoCredential => "no_credential",
            EntitlementError::Misconfigured(_) => "misconfigured",
            EntitlementError::Transport(_) => "transport",
            EntitlementError::Status { .. } => "status",
            EntitlementError::Decode(_) => "decode",
        }
    }
}

/// Source of per-principal feature limits
#[async_trait]
pub trait EntitlementClient: Send + Sync {
    /// Fetch the current limit for `feature_key`
    async fn get_limit(
        &self,
        principal: &Principal,
        feature_key: &str,
    ) -> Result<Limit, EntitlementError>;
}
