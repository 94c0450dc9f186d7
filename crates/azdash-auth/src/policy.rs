//! The process-wide authentication policy and its untrusted wire shape.

use serde::{Deserialize, Serialize};

use crate::AuthError;

/// Whether requests must carry an identity token, and how to get one.
///
/// Built once at startup by [`ConfigFetcher`](crate::ConfigFetcher) and then
/// passed by value/reference into everything that needs it. There is no way
/// to mutate it after construction.
///
/// When `enabled` is false every other field is the empty string. Consumers
/// branch on [`is_enabled`](Self::is_enabled) only, never on field contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthPolicy {
    enabled: bool,
    client_id: String,
    authority: String,
    api_scope: String,
}

impl AuthPolicy {
    /// The disabled sentinel: no identity provider, no tokens.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            client_id: String::new(),
            authority: String::new(),
            api_scope: String::new(),
        }
    }

    /// Whether requests to the API must carry an identity token.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Identity-provider application (client) ID. Empty when disabled.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Identity-provider issuer URL. Empty when disabled.
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Access-token scope for the backend API. Empty when disabled.
    pub fn api_scope(&self) -> &str {
        &self.api_scope
    }
}

impl Default for AuthPolicy {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Response body of `GET {apiRoot}/config/azure-ad`.
///
/// Every field may be absent or `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawConfigResponse {
    /// Whether the backend wants the client to authenticate.
    #[serde(default)]
    pub enabled: Option<bool>,
    /// Identity-provider application ID.
    #[serde(default)]
    pub client_id: Option<String>,
    /// Identity-provider issuer URL.
    #[serde(default)]
    pub authority: Option<String>,
    /// Scope to request for the API.
    #[serde(default)]
    pub api_scope: Option<String>,
}

impl RawConfigResponse {
    /// Validate the response into an [`AuthPolicy`].
    ///
    /// Returns the disabled sentinel when the backend did not ask for auth.
    /// Returns [`AuthError::InvalidConfig`] when it asked for auth but left a
    /// field missing or blank; the caller decides how to degrade.
    pub fn into_policy(self) -> Result<AuthPolicy, AuthError> {
        if self.enabled != Some(true) {
            return Ok(AuthPolicy::disabled());
        }

        let client_id = required("clientId", self.client_id)?;
        let authority = required("authority", self.authority)?;
        let api_scope = required("apiScope", self.api_scope)?;

        Ok(AuthPolicy {
            enabled: true,
            client_id,
            authority,
            api_scope,
        })
    }
}

fn required(field: &str, value: Option<String>) -> Result<String, AuthError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        Some(_) => Err(AuthError::InvalidConfig(format!("{field} is blank"))),
        None => Err(AuthError::InvalidConfig(format!("{field} is missing"))),
    }
}
