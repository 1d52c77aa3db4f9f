//! ID token signature and claims verification.

use crate::config::OidcConfig;
use crate::discovery::DiscoveryClient;
use crate::error::{OidcError, OidcResult};
use crate::http::HttpFetcher;
use crate::jwks::KeySetClient;
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, Header, Validation, decode, decode_header};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

/// Decoded ID token payload
pub type Claims = Map<String, Value>;

/// The only accepted signing algorithm.
///
/// Never negotiated from the token or from configuration: accepting the
/// header's algorithm would allow HMAC tokens keyed with the RSA public key.
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::RS256;

pub struct TokenValidator {
    config: Arc<OidcConfig>,
    discovery: DiscoveryClient,
    http: HttpFetcher,
}

impl TokenValidator {
    pub fn new(config: Arc<OidcConfig>, discovery: DiscoveryClient, http: HttpFetcher) -> Self {
        Self {
            config,
            discovery,
            http,
        }
    }

    /// Verify `token` and return its claims
    ///
    /// Token defects are [`OidcError::InvalidToken`]; failing to obtain the
    /// discovery document or key set propagates as the matching fetch error.
    pub async fn validate(&self, token: &str) -> OidcResult<Claims> {
        let header = decode_header(token)?;
        let kid = check_header(&header)?;

        let issuer = self.discovery.issuer().await?;
        let jwks_uri = self.discovery.jwks_uri().await?;
        let key_set = KeySetClient::new(jwks_uri, self.config.clone(), self.http.clone())
            .key_set()
            .await?;

        let jwk = key_set
            .find(&kid)
            .ok_or_else(|| OidcError::InvalidToken(format!("No key with kid '{kid}' in key set")))?;
        let decoding_key = DecodingKey::from_jwk(jwk)?;

        let validation = self.validation(&issuer);
        let token_data = decode::<Claims>(token, &decoding_key, &validation)?;
        check_issued_at(&token_data.claims, self.config.leeway_seconds)?;

        debug!(kid = %kid, "ID token validated");
        Ok(token_data.claims)
    }

    fn validation(&self, issuer: &str) -> Validation {
        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.algorithms = vec![SIGNING_ALGORITHM];
        validation.leeway = self.config.leeway_seconds;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[self.config.client_id.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        validation
    }
}

/// Reject anything but RS256 and return the key id
fn check_header(header: &Header) -> OidcResult<String> {
    if header.alg != SIGNING_ALGORITHM {
        return Err(OidcError::InvalidToken(format!(
            "Expected a {:?} signature, token uses {:?}",
            SIGNING_ALGORITHM, header.alg
        )));
    }

    header
        .kid
        .clone()
        .ok_or_else(|| OidcError::InvalidToken("No key id (kid) in token header".to_string()))
}

/// `iat` must be a number that does not lie in the future
fn check_issued_at(claims: &Claims, leeway_seconds: u64) -> OidcResult<()> {
    let iat = claims
        .get("iat")
        .and_then(Value::as_f64)
        .ok_or_else(|| OidcError::InvalidToken("Missing or non-numeric iat claim".to_string()))?;

    let latest = Utc::now().timestamp() as f64 + leeway_seconds as f64;
    if iat > latest {
        return Err(OidcError::InvalidToken("Token was issued in the future".to_string()));
    }

    Ok(())
}
