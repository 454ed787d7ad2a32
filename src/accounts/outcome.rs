//! Outcomes of add and delete, and their wire rendering
//!
//! Business conditions are values, not errors: the presentation layer turns
//! each outcome into an [`ActionReply`] and an HTTP status.

use serde::Serialize;

use crate::entitlement::Limit;
use crate::store::Account;

/// Usage snapshot reported after an add attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Usage {
    /// Records owned by the principal
    pub used: u64,

    /// Cap in effect, `None` when unbounded
    pub limit: Option<u64>,
}

impl Usage {
    pub fn new(used: u64, limit: Limit) -> Self {
        Self {
            used,
            limit: limit.max(),
        }
    }
}

/// Result of an add attempt
#[derive(Debug, Clone, PartialEq)]
pub enum AddOutcome {
    /// Record created
    Added { account: Account, usage: Usage },

    /// Input rejected before any lookup
    Invalid { message: String },

    /// Entitlement lookup failed; nothing was persisted
    EntitlementUnavailable,

    /// Cap already reached
    LimitReached { used: u64, limit: u64 },

    /// The store refused the insert
    CreationFailed,
}

impl AddOutcome {
    /// Stable label used for metrics
    pub fn label(&self) -> &'static str {
        match self {
            AddOutcome::Added { .. } => "added",
            AddOutcome::Invalid { .. } => "invalid",
            AddOutcome::EntitlementUnavailable => "entitlement_error",
            AddOutcome::LimitReached { .. } => "limit_reached",
            AddOutcome::CreationFailed => "creation_failed",
        }
    }

    pub fn is_added(&self) -> bool {
        matches!(self, AddOutcome::Added { .. })
    }
}

/// Result of a delete attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// Missing or owned by someone else; the two are never told apart
    NotFoundOrNotAllowed,
}

/// JSON reply for add and delete
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionReply {
    pub ok: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<Account>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl ActionReply {
    fn failure(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            code: Some(code),
            message: Some(message.into()),
            account: None,
            usage: None,
        }
    }
}

impl From<&AddOutcome> for ActionReply {
    fn from(outcome: &AddOutcome) -> Self {
        match outcome {
            AddOutcome::Added { account, usage } => Self {
                ok: true,
                code: None,
                message: Some("Account added.".to_string()),
                account: Some(account.clone()),
                usage: Some(*usage),
            },
            AddOutcome::Invalid { message } => Self::failure("VALIDATION_ERROR", message.clone()),
            AddOutcome::EntitlementUnavailable => Self::failure(
                "ENTITLEMENT_ERROR",
                "We could not verify your plan entitlements right now. Please try again.",
            ),
            AddOutcome::LimitReached { used, limit } => Self {
                usage: Some(Usage {
                    used: *used,
                    limit: Some(*limit),
                }),
                ..Self::failure(
                    "LIMIT_REACHED",
                    format!(
                        "You've reached your tracked accounts limit ({}). Remove one or upgrade your plan to add more.",
                        limit
                    ),
                )
            },
            AddOutcome::CreationFailed => Self::failure("CREATION_FAILED", "Failed to add account."),
        }
    }
}

impl From<DeleteOutcome> for ActionReply {
    fn from(outcome: DeleteOutcome) -> Self {
        match outcome {
            DeleteOutcome::Deleted => Self {
                ok: true,
                code: None,
                message: Some("Account deleted.".to_string()),
                account: None,
                usage: None,
            },
            DeleteOutcome::NotFoundOrNotAllowed => Self::failure(
                "NOT_FOUND_OR_NOT_ALLOWED",
                "Account not found or not allowed.",
            ),
        }
    }
}
