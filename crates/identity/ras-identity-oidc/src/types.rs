//! Callback parameters and authentication outcomes.

use serde::{Deserialize, Serialize};

/// Parameters of the request that hit the redirect URI
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
    /// Scheme, host and port of the callback request, e.g. `https://app.example.com`
    #[serde(default)]
    pub base_url: String,
    /// Path of the callback request, e.g. `/auth/callback`
    #[serde(default)]
    pub path: String,
}

impl CallbackParams {
    /// Parse the query string of a callback request
    pub fn from_query(base_url: impl Into<String>, path: impl Into<String>, query: &str) -> Self {
        let mut params = Self {
            base_url: base_url.into(),
            path: path.into(),
            ..Self::default()
        };

        for (key, value) in url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
            let value = Some(value.into_owned());
            match key.as_ref() {
                "code" => params.code = value,
                "state" => params.state = value,
                "error" => params.error = value,
                "error_description" => params.error_description = value,
                _ => {}
            }
        }

        params
    }

    /// Whether the request carries a response from the provider at all
    pub fn is_callback(&self) -> bool {
        self.code.is_some() || self.error.is_some()
    }

    /// The redirect URI the code was issued for
    pub fn redirect_uri(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.path)
    }
}

/// Result of one authentication attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AuthOutcome<U> {
    Success(U),
    /// `message` is `None` when nothing more specific is known, e.g. no matching user
    Failure { message: Option<String> },
}

impl<U> AuthOutcome<U> {
    pub fn failure(message: impl Into<String>) -> Self {
        AuthOutcome::Failure {
            message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AuthOutcome::Success(_))
    }

    pub fn user(&self) -> Option<&U> {
        match self {
            AuthOutcome::Success(user) => Some(user),
            AuthOutcome::Failure { .. } => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            AuthOutcome::Success(_) => None,
            AuthOutcome::Failure { message } => message.as_deref(),
        }
    }

    pub fn into_result(self) -> Result<U, Option<String>> {
        match self {
            AuthOutcome::Success(user) => Ok(user),
            AuthOutcome::Failure { message } => Err(message),
        }
    }
}
