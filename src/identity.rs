//! Identity Resolver
//!
//! Turns an inbound request into an authenticated [`Principal`]. The request
//! side is reduced to a [`RequestContext`] carrying the caller's access token
//! (bearer header first, session cookie second), so the service layer never
//! sees HTTP types.
//!
//! The production resolver asks the identity provider whom the token belongs
//! to via its user profile endpoint.

use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::issuer::IssuerUrl;

/// Stable identifier of an authenticated user
pub type PrincipalId = String;

/// Caller credentials extracted from a request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    access_token: Option<String>,
}

impl RequestContext {
    /// Context with no credentials
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Context carrying an access token
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            access_token: Some(token.into()),
        }
    }

    /// Extract the access token from `Authorization: Bearer` or the session cookie
    pub fn from_headers(headers: &HeaderMap, session_cookie: &str) -> Self {
        let bearer = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| {
                let (scheme, token) = v.trim().split_once(' ')?;
                scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
            })
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        let access_token = bearer.or_else(|| cookie_value(headers, session_cookie));
        Self { access_token }
    }

    /// The raw access token, if any
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// The authenticated user behind a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Stable user id from the identity provider
    pub id: PrincipalId,

    /// Bearer credential, forwarded to the entitlement API
    pub access_token: Option<String>,
}

impl Principal {
    /// Create a principal with a credential
    pub fn new(id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            access_token: Some(access_token.into()),
        }
    }
}

/// Errors raised while resolving a principal
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    /// No valid session
    #[error("Not authenticated")]
    Unauthenticated,

    /// The identity provider could not answer
    #[error("Identity provider unavailable: {0}")]
    Unavailable(String),
}

/// Resolves request credentials to a principal
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Resolve the caller, or fail with [`IdentityError::Unauthenticated`]
    async fn resolve(&self, ctx: &RequestContext) -> Result<Principal, IdentityError>;
}

#[derive(Debug, Deserialize)]
struct UserProfile {
    #[serde(default)]
    id: Option<String>,
}

/// Resolver backed by the identity provider's user profile endpoint
#[derive(Debug, Clone)]
pub struct UserProfileResolver {
    http: reqwest::Client,
    profile_url: reqwest::Url,
}

impl UserProfileResolver {
    /// Create a resolver for `issuer`
    pub fn new(issuer: &IssuerUrl, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            profile_url: issuer.endpoint(&["oauth2", "v2", "user_profile"]),
        })
    }
}

#[async_trait]
impl IdentityResolver for UserProfileResolver {
    async fn resolve(&self, ctx: &RequestContext) -> Result<Principal, IdentityError> {
        let token = ctx.access_token().ok_or(IdentityError::Unauthenticated)?;

        let response = self
            .http
            .get(self.profile_url.clone())
            .bearer_auth(token)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                warn!("User profile request failed: {}", e);
                IdentityError::Unavailable(e.to_string())
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            debug!(status = status.as_u16(), "Access token rejected by identity provider");
            return Err(IdentityError::Unauthenticated);
        }
        if !status.is_success() {
            return Err(IdentityError::Unavailable(format!(
                "user profile returned {}",
                status.as_u16()
            )));
        }

        let profile: UserProfile = response
            .json()
            .await
            .map_err(|e| IdentityError::Unavailable(format!("invalid user profile: {}", e)))?;

        match profile.id {
            Some(id) if !id.trim().is_empty() => Ok(Principal::new(id, token)),
            _ => Err(IdentityError::Unavailable(
                "user profile has no id".to_string(),
            )),
        }
    }
}
