//! Authorization code for ID token exchange.

use crate::config::OidcConfig;
use crate::discovery::DiscoveryClient;
use crate::error::{OidcError, OidcResult};
use crate::http::{HttpFetcher, describe_transport_error};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};

/// Form body of the token request
#[derive(Serialize)]
pub struct TokenExchangeRequest<'a> {
    pub client_id: &'a str,
    pub code: &'a str,
    pub redirect_uri: &'a str,
    pub grant_type: &'static str,
    pub client_secret: &'a str,
}

impl<'a> TokenExchangeRequest<'a> {
    pub fn new(config: &'a OidcConfig, code: &'a str, redirect_uri: &'a str) -> Self {
        Self {
            client_id: &config.client_id,
            code,
            redirect_uri,
            grant_type: "authorization_code",
            client_secret: &config.client_secret,
        }
    }
}

/// Token endpoint response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub id_token: String,
    pub access_token: Option<String>,
    pub token_type: Option<String>,
    pub expires_in: Option<u64>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
}

pub struct TokenExchanger {
    config: Arc<OidcConfig>,
    discovery: DiscoveryClient,
    http: HttpFetcher,
}

impl TokenExchanger {
    pub fn new(config: Arc<OidcConfig>, discovery: DiscoveryClient, http: HttpFetcher) -> Self {
        Self {
            config,
            discovery,
            http,
        }
    }

    /// Exchange `code` for the raw ID token
    ///
    /// A discovery failure surfaces as [`OidcError::DiscoveryFetch`]; everything
    /// that goes wrong at the token endpoint is [`OidcError::TokenExchange`].
    pub async fn exchange(&self, code: &str, redirect_uri: &str) -> OidcResult<String> {
        let token_endpoint = self.discovery.token_endpoint().await?;
        let request = TokenExchangeRequest::new(&self.config, code, redirect_uri);

        debug!(url = %token_endpoint, "Exchanging authorization code");

        let response = self
            .http
            .post_form(&token_endpoint, &request)
            .await
            .map_err(|e| OidcError::TokenExchange(describe_transport_error(&e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(status = %status, "Token exchange failed: {}", error_text);
            return Err(OidcError::TokenExchange(format!(
                "Received {} from server.",
                status.as_u16()
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| OidcError::TokenExchange(format!("Invalid token response: {e}")))?;

        Ok(token_response.id_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCache;
    use url::Url;

    #[test]
    fn test_request_uses_configured_client() {
        let config = OidcConfig::builder()
            .client_id("1234")
            .client_secret("5678")
            .metadata_url(Url::parse("http://test.int/metadata").unwrap())
            .cache(Arc::new(InMemoryCache::new()))
            .build();

        let request = TokenExchangeRequest::new(&config, "auth-code", "http://app.test/session");

        assert_eq!(request.client_id, "1234");
        assert_eq!(request.client_secret, "5678");
        assert_eq!(request.code, "auth-code");
        assert_eq!(request.redirect_uri, "http://app.test/session");
        assert_eq!(request.grant_type, "authorization_code");
    }

    #[test]
    fn test_token_response_requires_id_token() {
        let missing: Result<TokenResponse, _> =
            serde_json::from_str(r#"{"access_token": "abc", "token_type": "Bearer"}"#);
        assert!(missing.is_err());

        let present: TokenResponse =
            serde_json::from_str(r#"{"id_token": "a.b.c", "expires_in": 3600}"#).unwrap();
        assert_eq!(present.id_token, "a.b.c");
        assert_eq!(present.expires_in, Some(3600));
    }
}
