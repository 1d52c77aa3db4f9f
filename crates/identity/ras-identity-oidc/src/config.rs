//! OIDC relying party configuration.
//!
//! [`OidcConfig`] is built once at startup and shared read-only by every
//! authentication attempt. [`OidcSettings`] is its serializable subset, loaded
//! from a TOML file and `OIDC__*` environment variables.

use crate::cache::{CacheOptions, MetadataCache};
use crate::error::{OidcError, OidcResult};
use crate::http::HttpSettings;
use bon::Builder;
use config::{Config as ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

/// Relying party configuration
#[derive(Clone, Builder)]
pub struct OidcConfig {
    /// Client identifier registered with the provider; also the expected `aud`
    #[builder(into)]
    pub client_id: String,

    #[builder(into)]
    pub client_secret: String,

    /// Location of the provider's discovery document
    pub metadata_url: Url,

    /// Cache shared by discovery and key set retrieval
    pub cache: Arc<dyn MetadataCache>,

    #[builder(default)]
    pub cache_options: CacheOptions,

    #[builder(default)]
    pub http: HttpSettings,

    /// Allowed clock skew when checking `exp`, `nbf` and `iat`
    #[builder(default)]
    pub leeway_seconds: u64,
}

impl fmt::Debug for OidcConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OidcConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("metadata_url", &self.metadata_url.as_str())
            .field("cache_options", &self.cache_options)
            .field("http", &self.http)
            .field("leeway_seconds", &self.leeway_seconds)
            .finish_non_exhaustive()
    }
}

/// Serializable relying party settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OidcSettings {
    pub client_id: String,
    pub client_secret: String,
    pub metadata_url: String,

    #[serde(default)]
    pub cache_options: CacheOptions,

    #[serde(default)]
    pub http: HttpSettings,

    #[serde(default)]
    pub leeway_seconds: u64,
}

impl OidcSettings {
    /// Load settings from an optional TOML file, then `OIDC__*` environment variables.
    ///
    /// Environment variables take precedence, e.g. `OIDC__CLIENT_ID` or
    /// `OIDC__HTTP__TIMEOUT_SECONDS`.
    pub fn load(path: Option<&Path>) -> OidcResult<Self> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = path {
            info!("Loading OIDC settings from {}", path.display());
            builder = builder.add_source(File::from(path).required(true));
        } else {
            debug!("No OIDC settings file given, reading environment only");
        }

        builder = builder.add_source(
            Environment::with_prefix("OIDC")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .and_then(|config| config.try_deserialize::<OidcSettings>())
            .map_err(|e| OidcError::Config(format!("Failed to load settings: {e}")))?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> OidcResult<()> {
        if self.client_id.trim().is_empty() {
            return Err(OidcError::Config("client_id must not be empty".to_string()));
        }
        if self.client_secret.is_empty() {
            return Err(OidcError::Config("client_secret must not be empty".to_string()));
        }
        Url::parse(&self.metadata_url)?;
        Ok(())
    }

    /// Combine the settings with a cache into a ready [`OidcConfig`]
    pub fn into_config(self, cache: Arc<dyn MetadataCache>) -> OidcResult<OidcConfig> {
        self.validate()?;
        let metadata_url = Url::parse(&self.metadata_url)?;

        Ok(OidcConfig::builder()
            .client_id(self.client_id)
            .client_secret(self.client_secret)
            .metadata_url(metadata_url)
            .cache(cache)
            .cache_options(self.cache_options)
            .http(self.http)
            .leeway_seconds(self.leeway_seconds)
            .build())
    }
}
