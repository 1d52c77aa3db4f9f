//! OpenID Connect relying party for the authorization code flow.
//!
//! This crate handles the callback half of an OIDC login: it exchanges the
//! authorization code for an ID token, verifies the token's RS256 signature
//! against the provider's published key set, checks the standard claims, and
//! hands the claims to a host supplied [`UserResolver`]. The provider's
//! discovery document and key sets are cached through a pluggable
//! [`MetadataCache`].
//!
//! Every failure is reported as an [`AuthOutcome::Failure`] with a fixed,
//! user-safe message; the underlying detail only reaches the `tracing` log.

mod cache;
mod config;
mod discovery;
mod error;
mod exchange;
mod http;
mod jwks;
mod resolver;
mod strategy;
mod types;
mod validator;


pub use cache::{CacheOptions, InMemoryCache, METADATA_CACHE_KEY, MetadataCache};
pub use config::{OidcConfig, OidcSettings};
pub use discovery::{DEFAULT_SCOPE, DiscoveryClient, DiscoveryDocument};
pub use error::{
    DISCOVERY_FETCH_MESSAGE, INVALID_TOKEN_MESSAGE, KEY_SET_FETCH_MESSAGE, OidcError, OidcResult,
    TOKEN_EXCHANGE_MESSAGE,
};
pub use exchange::{TokenExchangeRequest, TokenExchanger, TokenResponse};
pub use http::{HttpFetcher, HttpSettings, RetryPolicy};
pub use jwks::{KeySetClient, cache_key as key_set_cache_key};
pub use resolver::{
    ClaimMapping, ClaimsIdentityResolver, FnResolver, UserResolution, UserResolver,
    VerifiedIdentity, resolver_fn,
};
pub use strategy::OidcStrategy;
pub use types::{AuthOutcome, CallbackParams};
pub use validator::{Claims, SIGNING_ALGORITHM, TokenValidator};
