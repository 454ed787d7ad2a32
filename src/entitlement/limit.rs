//! Limit values and response interpretation

use serde_json::Value;
use std::fmt;

/// A usage cap for one principal and feature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    /// At most `n` records
    Bounded(u64),
    /// No cap in effect
    Unbounded,
}

impl Limit {
    /// The cap, or `None` when unbounded
    pub fn max(&self) -> Option<u64> {
        match self {
            Limit::Bounded(n) => Some(*n),
            Limit::Unbounded => None,
        }
    }

    /// Whether one more record may be added on top of `used`
    pub fn admits(&self, used: u64) -> bool {
        match self {
            Limit::Bounded(n) => used < *n,
            Limit::Unbounded => true,
        }
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::Bounded(n) => write!(f, "{}", n),
            Limit::Unbounded => f.write_str("unbounded"),
        }
    }
}

/// Interpret a 2xx entitlement body for `feature_key`
///
/// Expected shape: `{ "data": { "entitlement": { "feature_key": ..,
/// "entitlement_limit_max": .. } } }`. Anything that does not fit degrades to
/// [`Limit::Unbounded`].
pub fn limit_from_body(feature_key: &str, body: &Value) -> Limit {
    let entitlement = match body.get("data").and_then(|d| d.get("entitlement")) {
        Some(e) if is_truthy(e) => e,
        _ => return Limit::Unbounded,
    };

    if let Some(key) = entitlement.get("feature_key").filter(|k| is_truthy(k)) {
        if key.as_str() != Some(feature_key) {
            return Limit::Unbounded;
        }
    }

    match entitlement.get("entitlement_limit_max").and_then(coerce_number) {
        Some(n) if n.is_finite() && n >= 0.0 => Limit::Bounded(n.ceil() as u64),
        _ => Limit::Unbounded,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                None
            } else {
                s.parse::<f64>().ok()
            }
        }
        _ => None,
    }
}
