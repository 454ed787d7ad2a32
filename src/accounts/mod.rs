//! Quota-Enforced Account Service
//!
//! Orchestrates identity, entitlements and the store to list, add and delete
//! tracked accounts.
//!
//! # Add workflow
//!
//! ```text
//! authenticate -> validate -> count -> fetch limit -> enforce -> create
//!      |              |                    |             |          |
//! Unauthenticated  Invalid     EntitlementUnavailable LimitReached CreationFailed
//! ```
//!
//! # Limit enforcement
//!
//! Count-then-create is not atomic. With [`LimitEnforcement::Soft`] two
//! concurrent adds by the same owner can both pass the check and exceed the
//! cap by one. [`LimitEnforcement::Strict`] holds a per-owner lock across the
//! whole sequence so adds handled by this process never overshoot.

pub mod error;
pub mod input;
pub mod locks;
pub mod outcome;
pub mod service;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use error::ServiceError;
pub use input::{AccountInput, ValidAccountInput};
pub use locks::OwnerLocks;
pub use outcome::{ActionReply, AddOutcome, DeleteOutcome, Usage};
pub use service::{AccountCount, AccountService};

/// How strictly the tracked accounts cap is enforced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitEnforcement {
    /// Count and create are not serialized; concurrent adds may overshoot
    #[default]
    Soft,
    /// Adds by the same owner are serialized in-process
    Strict,
}

impl FromStr for LimitEnforcement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "soft" => Ok(LimitEnforcement::Soft),
            "strict" => Ok(LimitEnforcement::Strict),
            other => Err(format!(
                "Invalid limit enforcement: {}. Must be 'soft' or 'strict'",
                other
            )),
        }
    }
}

impl fmt::Display for LimitEnforcement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitEnforcement::Soft => f.write_str("soft"),
            LimitEnforcement::Strict => f.write_str("strict"),
        }
    }
}
