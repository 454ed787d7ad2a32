//! Tracked Accounts Library
//!
//! A per-user registry of tracked accounts whose size is capped by the
//! user's plan entitlement. Includes the identity resolver, the entitlement
//! client, the account store backends, the quota-enforced service and the
//! HTTP presentation layer.

pub mod accounts;
pub mod config;
pub mod entitlement;
pub mod identity;
pub mod issuer;
pub mod metrics;
pub mod store;
pub mod telemetry;
pub mod web;

#[cfg(test)]
pub(crate) mod testing;
