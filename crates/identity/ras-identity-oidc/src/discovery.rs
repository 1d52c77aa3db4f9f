//! OpenID Connect discovery document retrieval and caching.

use crate::cache::METADATA_CACHE_KEY;
use crate::config::OidcConfig;
use crate::error::{OidcError, OidcResult};
use crate::http::{HttpFetcher, describe_transport_error};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

/// Scope requested when the caller does not pick one
pub const DEFAULT_SCOPE: &str = "openid profile email";

/// Provider metadata published at the discovery URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryDocument {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub jwks_uri: String,
    /// Every other field of the document
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// Fetches the discovery document on cache miss and serves it from cache otherwise
#[derive(Clone)]
pub struct DiscoveryClient {
    config: Arc<OidcConfig>,
    http: HttpFetcher,
}

impl DiscoveryClient {
    pub fn new(config: Arc<OidcConfig>, http: HttpFetcher) -> Self {
        Self { config, http }
    }

    /// The document exactly as the provider returned it
    pub async fn raw_document(&self) -> OidcResult<Value> {
        if let Some(cached) = self.config.cache.read(METADATA_CACHE_KEY).await {
            debug!("Discovery document served from cache");
            return Ok(cached);
        }

        let (raw, _) = self.fetch_and_store().await?;
        Ok(raw)
    }

    pub async fn document(&self) -> OidcResult<DiscoveryDocument> {
        if let Some(cached) = self.config.cache.read(METADATA_CACHE_KEY).await {
            debug!("Discovery document served from cache");
            return parse_document(cached);
        }

        let (_, document) = self.fetch_and_store().await?;
        Ok(document)
    }

    pub async fn authorization_endpoint(&self) -> OidcResult<String> {
        Ok(self.document().await?.authorization_endpoint)
    }

    pub async fn token_endpoint(&self) -> OidcResult<String> {
        Ok(self.document().await?.token_endpoint)
    }

    pub async fn jwks_uri(&self) -> OidcResult<String> {
        Ok(self.document().await?.jwks_uri)
    }

    pub async fn issuer(&self) -> OidcResult<String> {
        Ok(self.document().await?.issuer)
    }

    /// Login URL for the provider with [`DEFAULT_SCOPE`]
    pub async fn authorization_url(&self, redirect_uri: &str, state: &str) -> OidcResult<String> {
        self.authorization_url_with_scope(redirect_uri, state, DEFAULT_SCOPE)
            .await
    }

    /// Login URL for the provider
    pub async fn authorization_url_with_scope(
        &self,
        redirect_uri: &str,
        state: &str,
        scope: &str,
    ) -> OidcResult<String> {
        let endpoint = self.authorization_endpoint().await?;
        Url::parse(&endpoint)?;

        let separator = if endpoint.contains('?') { '&' } else { '?' };
        Ok(format!(
            "{endpoint}{separator}client_id={}&redirect_uri={}&scope={}&state={}&response_mode=query&response_type=code",
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(scope),
            urlencoding::encode(state),
        ))
    }

    async fn fetch_and_store(&self) -> OidcResult<(Value, DiscoveryDocument)> {
        let url = self.config.metadata_url.as_str();
        debug!(url = %url, "Fetching discovery document");

        let response = self
            .http
            .get(url)
            .await
            .map_err(|e| OidcError::DiscoveryFetch(describe_transport_error(&e)))?;

        if !response.status().is_success() {
            return Err(OidcError::DiscoveryFetch(format!(
                "Received {} from server.",
                response.status().as_u16()
            )));
        }

        let raw: Value = response
            .json()
            .await
            .map_err(|e| OidcError::DiscoveryFetch(describe_transport_error(&e)))?;
        let document = parse_document(raw.clone())?;

        self.config
            .cache
            .write(METADATA_CACHE_KEY, raw.clone(), &self.config.cache_options)
            .await;

        info!(url = %url, issuer = %document.issuer, "Discovery document cached");
        Ok((raw, document))
    }
}

fn parse_document(raw: Value) -> OidcResult<DiscoveryDocument> {
    serde_json::from_value(raw)
        .map_err(|e| OidcError::DiscoveryFetch(format!("Invalid discovery document: {e}")))
}
