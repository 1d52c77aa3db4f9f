use crate::error::CliError;
use clap::{Parser, Subcommand};
use ras_identity_oidc::{
    AuthOutcome, CallbackParams, ClaimsIdentityResolver, InMemoryCache, OidcSettings,
    OidcStrategy,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Drive an OpenID Connect login from the command line
#[derive(Parser, Debug)]
#[command(name = "oidc-login")]
#[command(about = "Build OpenID Connect login URLs and complete authorization code callbacks")]
#[command(version = "0.1.0")]
pub struct Args {
    /// TOML settings file; `OIDC__*` environment variables override it
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the provider login URL
    AuthorizeUrl {
        /// Where the provider sends the browser back to
        #[arg(long, value_name = "URI")]
        redirect_uri: String,

        /// Opaque value echoed back on the callback
        #[arg(long)]
        state: String,

        /// Requested scopes (defaults to "openid profile email")
        #[arg(long)]
        scope: Option<String>,
    },

    /// Complete a callback and print the verified identity as JSON
    Callback {
        /// Base URL of the callback request (e.g., http://localhost:3000)
        #[arg(long, value_name = "URL")]
        base_url: String,

        /// Path of the callback request
        #[arg(long, default_value = "/")]
        path: String,

        /// Authorization code from the callback
        #[arg(long, required_unless_present = "error", conflicts_with = "error")]
        code: Option<String>,

        /// Error code reported by the provider
        #[arg(long)]
        error: Option<String>,

        #[arg(long, requires = "error")]
        error_description: Option<String>,
    },
}

impl Args {
    /// Run the selected command and return what should be printed
    pub async fn run(&self) -> Result<String, CliError> {
        let settings = OidcSettings::load(self.config.as_deref())?;
        let config = Arc::new(settings.into_config(Arc::new(InMemoryCache::new()))?);
        debug!(?config, "Loaded OIDC configuration");

        let strategy = OidcStrategy::new(config, ClaimsIdentityResolver::default())?;

        match &self.command {
            Command::AuthorizeUrl {
                redirect_uri,
                state,
                scope,
            } => {
                let url = match scope {
                    Some(scope) => {
                        strategy
                            .discovery()
                            .authorization_url_with_scope(redirect_uri, state, scope)
                            .await?
                    }
                    None => strategy.authorization_url(redirect_uri, state).await?,
                };
                Ok(url)
            }
            Command::Callback {
                base_url,
                path,
                code,
                error,
                error_description,
            } => {
                let params = CallbackParams {
                    code: code.clone(),
                    error: error.clone(),
                    error_description: error_description.clone(),
                    base_url: base_url.clone(),
                    path: path.clone(),
                    ..CallbackParams::default()
                };

                match strategy.authenticate(&params).await {
                    AuthOutcome::Success(identity) => Ok(serde_json::to_string_pretty(&identity)?),
                    AuthOutcome::Failure { message } => Err(CliError::AuthenticationFailed(
                        message.unwrap_or_else(|| "no matching user".to_string()),
                    )),
                }
            }
        }
    }
}
