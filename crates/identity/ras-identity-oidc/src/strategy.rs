//! The callback half of the authorization code flow.

use crate::config::OidcConfig;
use crate::discovery::DiscoveryClient;
use crate::error::OidcResult;
use crate::exchange::TokenExchanger;
use crate::http::HttpFetcher;
use crate::resolver::{UserResolution, UserResolver};
use crate::types::{AuthOutcome, CallbackParams};
use crate::validator::{Claims, TokenValidator};
use std::sync::Arc;
use tracing::{info, warn};

const PROVIDER_ERROR_PREFIX: &str = "There was a problem logging you in. ";
const MISSING_CODE_MESSAGE: &str = "No authorization code was provided.";

/// Runs exchange, validation and user resolution for a callback request
///
/// Every failure comes back as [`AuthOutcome::Failure`] carrying a fixed
/// message such as [`crate::INVALID_TOKEN_MESSAGE`]. Operator detail goes to the log.
pub struct OidcStrategy<R: UserResolver> {
    discovery: DiscoveryClient,
    exchanger: TokenExchanger,
    validator: TokenValidator,
    resolver: R,
}

impl<R: UserResolver> OidcStrategy<R> {
    pub fn new(config: Arc<OidcConfig>, resolver: R) -> OidcResult<Self> {
        let http = HttpFetcher::new(&config.http)?;
        let discovery = DiscoveryClient::new(config.clone(), http.clone());

        Ok(Self {
            exchanger: TokenExchanger::new(config.clone(), discovery.clone(), http.clone()),
            validator: TokenValidator::new(config, discovery.clone(), http),
            discovery,
            resolver,
        })
    }

    pub fn discovery(&self) -> &DiscoveryClient {
        &self.discovery
    }

    /// Login URL to send the browser to
    pub async fn authorization_url(&self, redirect_uri: &str, state: &str) -> OidcResult<String> {
        self.discovery.authorization_url(redirect_uri, state).await
    }

    pub async fn authenticate(&self, params: &CallbackParams) -> AuthOutcome<R::User> {
        if let Some(error) = &params.error {
            warn!(
                error = %error,
                description = params.error_description.as_deref().unwrap_or_default(),
                "Provider returned an error to the callback"
            );
            return AuthOutcome::failure(provider_error_message(
                error,
                params.error_description.as_deref(),
            ));
        }

        let Some(code) = params.code.as_deref() else {
            return AuthOutcome::failure(MISSING_CODE_MESSAGE);
        };

        let claims = match self.verified_claims(code, &params.redirect_uri()).await {
            Ok(claims) => claims,
            Err(e) => {
                warn!(error = %e, "OpenID Connect authentication failed");
                return AuthOutcome::failure(e.user_message());
            }
        };

        match self.resolver.resolve(&claims).await {
            UserResolution::Found(user) => {
                info!(
                    subject = claims.get("sub").and_then(|s| s.as_str()).unwrap_or_default(),
                    "User authenticated"
                );
                AuthOutcome::Success(user)
            }
            UserResolution::NotFound => {
                warn!("No user matches the validated id token");
                AuthOutcome::Failure { message: None }
            }
            UserResolution::Outcome(outcome) => outcome,
        }
    }

    async fn verified_claims(&self, code: &str, redirect_uri: &str) -> OidcResult<Claims> {
        let token = self.exchanger.exchange(code, redirect_uri).await?;
        self.validator.validate(&token).await
    }
}

fn provider_error_message(error: &str, description: Option<&str>) -> String {
    match description {
        Some(description) if !description.is_empty() => {
            format!("{PROVIDER_ERROR_PREFIX}{description} ({error})")
        }
        _ => format!("{PROVIDER_ERROR_PREFIX}{error}"),
    }
}
