use ras_identity_oidc::OidcError;
use thiserror::Error;

/// Errors that end an `oidc-login` run
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Oidc(#[from] OidcError),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Failed to render identity: {0}")]
    Output(#[from] serde_json::Error),
}
