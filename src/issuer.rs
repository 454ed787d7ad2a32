//! Identity provider base address
//!
//! Both the identity resolver and the entitlement client talk to the same
//! issuer. The address is validated once, when configuration is turned into
//! clients, and never re-read per request.

use reqwest::Url;
use std::fmt;

/// Errors raised while parsing an issuer address
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IssuerError {
    /// No address configured
    #[error("issuer URL is not configured")]
    Missing,

    /// Address present but unusable
    #[error("invalid issuer URL '{url}': {reason}")]
    Invalid { url: String, reason: String },
}

/// Validated issuer base address with trailing slashes stripped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuerUrl {
    base: Url,
    display: String,
}

impl IssuerUrl {
    /// Parse an issuer address from configuration
    pub fn parse(raw: &str) -> Result<Self, IssuerError> {
        let trimmed = raw.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(IssuerError::Missing);
        }

        let base = Url::parse(trimmed).map_err(|e| IssuerError::Invalid {
            url: trimmed.to_string(),
            reason: e.to_string(),
        })?;

        if !matches!(base.scheme(), "http" | "https") || base.cannot_be_a_base() {
            return Err(IssuerError::Invalid {
                url: trimmed.to_string(),
                reason: "must be an http(s) URL".to_string(),
            });
        }

        Ok(Self {
            base,
            display: trimmed.to_string(),
        })
    }

    /// Parse an optional configured value
    pub fn from_config(raw: Option<&str>) -> Result<Self, IssuerError> {
        Self::parse(raw.unwrap_or_default())
    }

    /// Build `{issuer}/{segments...}`, percent-encoding each segment
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            path.extend(segments);
        }
        url
    }

    /// The address as configured, without trailing slashes
    pub fn as_str(&self) -> &str {
        &self.display
    }
}

impl fmt::Display for IssuerUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}
