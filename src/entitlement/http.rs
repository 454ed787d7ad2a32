//! HTTP entitlement client
//!
//! `GET {issuer}/account_api/v1/entitlement/{feature_key}` with the
//! principal's bearer token.

use async_trait::async_trait;
use axum::http::header;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::limit::{limit_from_body, Limit};
use super::{EntitlementClient, EntitlementError};
use crate::identity::Principal;
use crate::issuer::IssuerUrl;
use crate::metrics;

/// Entitlement client for the identity provider's account API
#[derive(Debug, Clone)]
pub struct HttpEntitlementClient {
    http: reqwest::Client,
    issuer: IssuerUrl,
}

impl HttpEntitlementClient {
    /// Create a client for an already validated issuer
    pub fn new(issuer: IssuerUrl, timeout: Duration) -> Result<Self, EntitlementError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EntitlementError::Misconfigured(e.to_string()))?;
        Ok(Self { http, issuer })
    }

    /// Create a client from the raw configured issuer address
    ///
    /// A missing or unusable address is [`EntitlementError::Misconfigured`].
    pub fn from_config(issuer: Option<&str>, timeout: Duration) -> Result<Self, EntitlementError> {
        let issuer = IssuerUrl::from_config(issuer)
            .map_err(|e| EntitlementError::Misconfigured(e.to_string()))?;
        Self::new(issuer, timeout)
    }

    /// Lookup URL for `feature_key`
    pub fn entitlement_url(&self, feature_key: &str) -> reqwest::Url {
        self.issuer
            .endpoint(&["account_api", "v1", "entitlement", feature_key])
    }

    async fn fetch(&self, token: &str, feature_key: &str) -> Result<Limit, EntitlementError> {
        let url = self.entitlement_url(feature_key);
        debug!("Fetching entitlement from {}", url);

        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .header(header::ACCEPT, "application/json")
            .header(header::CACHE_CONTROL, "no-store")
            .send()
            .await
            .map_err(|e| EntitlementError::Transport(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            debug!(feature_key, "Feature not defined for this plan, no limit applies");
            return Ok(Limit::Unbounded);
        }
        if !status.is_success() {
            // Best effort: an unreadable body is reported as empty
            let body = response.text().await.unwrap_or_default();
            return Err(EntitlementError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| EntitlementError::Transport(e.to_string()))?;
        let body: serde_json::Value =
            serde_json::from_slice(&bytes).map_err(|e| EntitlementError::Decode(e.to_string()))?;

        Ok(limit_from_body(feature_key, &body))
    }
}

#[async_trait]
impl EntitlementClient for HttpEntitlementClient {
    async fn get_limit(
        &self,
        principal: &Principal,
        feature_key: &str,
    ) -> Result<Limit, EntitlementError> {
        let token = principal
            .access_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(EntitlementError::NoCredential)?;

        let start = Instant::now();
        let result = self.fetch(token, feature_key).await;
        metrics::ENTITLEMENT_LOOKUP_DURATION_SECONDS.observe(start.elapsed().as_secs_f64());

        if let Err(e) = &result {
            metrics::ENTITLEMENT_LOOKUP_ERRORS_TOTAL
                .with_label_values(&[e.kind()])
                .inc();
            warn!(principal = %principal.id, feature_key, "Entitlement lookup failed: {}", e);
        }
        result
    }
}
