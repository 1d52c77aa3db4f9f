//! OIDC error types.

use thiserror::Error;

pub type OidcResult<T> = Result<T, OidcError>;

/// Message shown when the discovery document cannot be retrieved.
pub const DISCOVERY_FETCH_MESSAGE: &str = "Could not fetch OpenID Configuration Document";
/// Message shown when the key set cannot be retrieved.
pub const KEY_SET_FETCH_MESSAGE: &str = "Could not fetch JSON Web Key Set to verify token.";
/// Message shown for any failed code-for-token exchange.
pub const TOKEN_EXCHANGE_MESSAGE: &str = "Unable to exchange authorization code for a token.";
/// Message shown for any ID token defect.
pub const INVALID_TOKEN_MESSAGE: &str =
    "There was an error with the id token received. Please try again.";

#[derive(Debug, Error)]
pub enum OidcError {
    #[error("Discovery document fetch failed: {0}")]
    DiscoveryFetch(String),

    #[error("JSON Web Key Set fetch failed: {0}")]
    KeySetFetch(String),

    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    #[error("Invalid id token: {0}")]
    InvalidToken(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl OidcError {
    /// The fixed message an end user sees for this failure.
    ///
    /// The detail carried by the variant is for operators only.
    pub fn user_message(&self) -> &'static str {
        match self {
            OidcError::DiscoveryFetch(_) | OidcError::Config(_) => DISCOVERY_FETCH_MESSAGE,
            OidcError::KeySetFetch(_) => KEY_SET_FETCH_MESSAGE,
            OidcError::TokenExchange(_) => TOKEN_EXCHANGE_MESSAGE,
            OidcError::InvalidToken(_) => INVALID_TOKEN_MESSAGE,
        }
    }
}

impl From<url::ParseError> for OidcError {
    fn from(err: url::ParseError) -> Self {
        OidcError::Config(format!("URL parsing error: {err}"))
    }
}

impl From<jsonwebtoken::errors::Error> for OidcError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        OidcError::InvalidToken(err.to_string())
    }
}
