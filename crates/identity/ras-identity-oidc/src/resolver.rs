//! Mapping validated claims to an application user.

use crate::types::AuthOutcome;
use crate::validator::Claims;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::marker::PhantomData;

/// What a resolver found for a set of claims
#[derive(Debug, Clone, PartialEq)]
pub enum UserResolution<U> {
    Found(U),
    NotFound,
    /// A finished outcome, returned to the host unchanged
    Outcome(AuthOutcome<U>),
}

impl<U> From<Option<U>> for UserResolution<U> {
    fn from(user: Option<U>) -> Self {
        match user {
            Some(user) => UserResolution::Found(user),
            None => UserResolution::NotFound,
        }
    }
}

impl<U> From<AuthOutcome<U>> for UserResolution<U> {
    fn from(outcome: AuthOutcome<U>) -> Self {
        UserResolution::Outcome(outcome)
    }
}

/// Host supplied lookup from validated claims to a user
#[async_trait]
pub trait UserResolver: Send + Sync {
    type User: Send + 'static;

    async fn resolve(&self, claims: &Claims) -> UserResolution<Self::User>;
}

/// Resolver backed by a plain function, see [`resolver_fn`]
pub struct FnResolver<F, U> {
    f: F,
    _user: PhantomData<fn() -> U>,
}

/// Wrap a synchronous function as a [`UserResolver`]
pub fn resolver_fn<F, U>(f: F) -> FnResolver<F, U>
where
    F: Fn(&Claims) -> UserResolution<U> + Send + Sync,
{
    FnResolver {
        f,
        _user: PhantomData,
    }
}

#[async_trait]
impl<F, U> UserResolver for FnResolver<F, U>
where
    F: Fn(&Claims) -> UserResolution<U> + Send + Sync,
    U: Send + 'static,
{
    type User = U;

    async fn resolve(&self, claims: &Claims) -> UserResolution<U> {
        (self.f)(claims)
    }
}

/// Identity built straight from ID token claims
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedIdentity {
    pub issuer: String,
    pub subject: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub metadata: Option<Value>,
}

/// Which claims feed which [`VerifiedIdentity`] fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaimMapping {
    pub subject_claim: String,
    pub email_claim: String,
    pub name_claim: String,
    pub picture_claim: String,
}

impl Default for ClaimMapping {
    fn default() -> Self {
        Self {
            subject_claim: "sub".to_string(),
            email_claim: "email".to_string(),
            name_claim: "name".to_string(),
            picture_claim: "picture".to_string(),
        }
    }
}

/// Resolver that trusts the token and turns its claims into a [`VerifiedIdentity`]
#[derive(Debug, Clone, Default)]
pub struct ClaimsIdentityResolver {
    mapping: ClaimMapping,
}

impl ClaimsIdentityResolver {
    pub fn new(mapping: ClaimMapping) -> Self {
        Self { mapping }
    }

    pub fn map_claims(&self, claims: &Claims) -> Option<VerifiedIdentity> {
        let text = |name: &str| claims.get(name).and_then(Value::as_str).map(String::from);

        let subject = text(&self.mapping.subject_claim)?;
        let issuer = text("iss").unwrap_or_default();

        let mut metadata = serde_json::Map::new();
        if let Some(picture) = text(&self.mapping.picture_claim) {
            metadata.insert("picture".to_string(), Value::String(picture));
        }
        if let Some(verified) = claims.get("email_verified").and_then(Value::as_bool) {
            metadata.insert("email_verified".to_string(), Value::Bool(verified));
        }

        Some(VerifiedIdentity {
            issuer,
            subject,
            email: text(&self.mapping.email_claim),
            display_name: text(&self.mapping.name_claim),
            metadata: if metadata.is_empty() {
                None
            } else {
                Some(Value::Object(metadata))
            },
        })
    }
}

#[async_trait]
impl UserResolver for ClaimsIdentityResolver {
    type User = VerifiedIdentity;

    async fn resolve(&self, claims: &Claims) -> UserResolution<VerifiedIdentity> {
        self.map_claims(claims).into()
    }
}
