//! JSON Web Key Set retrieval and caching.

use crate::config::OidcConfig;
use crate::error::{OidcError, OidcResult};
use crate::http::{HttpFetcher, describe_transport_error};
use jsonwebtoken::jwk::{Jwk, JwkSet};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info};

const CACHE_KEY_PREFIX: &str = "jwks_";

/// Cache slot for the key set published at `jwks_url`
pub fn cache_key(jwks_url: &str) -> String {
    format!("{CACHE_KEY_PREFIX}{:x}", Sha256::digest(jwks_url.as_bytes()))
}

/// Key set client for a single JWKS URL
pub struct KeySetClient {
    jwks_url: String,
    cache_key: String,
    config: Arc<OidcConfig>,
    http: HttpFetcher,
}

impl KeySetClient {
    pub fn new(jwks_url: impl Into<String>, config: Arc<OidcConfig>, http: HttpFetcher) -> Self {
        let jwks_url = jwks_url.into();
        let cache_key = cache_key(&jwks_url);

        Self {
            jwks_url,
            cache_key,
            config,
            http,
        }
    }

    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    pub fn cache_key(&self) -> &str {
        &self.cache_key
    }

    /// The key set, from cache when present
    pub async fn key_set(&self) -> OidcResult<JwkSet> {
        if let Some(cached) = self.config.cache.read(&self.cache_key).await {
            debug!(url = %self.jwks_url, "Key set served from cache");
            return parse_key_set(&cached);
        }

        self.fetch_and_store().await
    }

    async fn fetch_and_store(&self) -> OidcResult<JwkSet> {
        debug!(url = %self.jwks_url, "Fetching JSON Web Key Set");

        let response = self
            .http
            .get(&self.jwks_url)
            .await
            .map_err(|e| OidcError::KeySetFetch(describe_transport_error(&e)))?;

        if !response.status().is_success() {
            return Err(OidcError::KeySetFetch(format!(
                "Received {} from server.",
                response.status().as_u16()
            )));
        }

        let raw: Value = response
            .json()
            .await
            .map_err(|e| OidcError::KeySetFetch(describe_transport_error(&e)))?;
        let key_set = parse_key_set(&raw)?;

        self.config
            .cache
            .write(&self.cache_key, raw, &self.config.cache_options)
            .await;

        info!(
            url = %self.jwks_url,
            key_count = key_set.keys.len(),
            "JSON Web Key Set cached"
        );
        Ok(key_set)
    }
}

/// Keys this crate cannot model (other key types, curves or algorithms) are
/// skipped so they never hide the ones it can.
fn parse_key_set(raw: &Value) -> OidcResult<JwkSet> {
    let entries = raw
        .get("keys")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            OidcError::KeySetFetch("Invalid JSON Web Key Set: no keys array".to_string())
        })?;

    let keys = entries
        .iter()
        .filter_map(|entry| match serde_json::from_value::<Jwk>(entry.clone()) {
            Ok(jwk) => Some(jwk),
            Err(e) => {
                debug!(
                    kid = entry.get("kid").and_then(serde_json::Value::as_str).unwrap_or_default(),
                    error = %e,
                    "Skipping unsupported key"
                );
                None
            }
        })
        .collect();

    Ok(JwkSet { keys })
}
