//! The identity-provider seam.

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};

use crate::AuthError;

/// Boxed future returned by [`IdentityClient`] methods.
pub type AuthFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, AuthError>> + Send + 'a>>;

/// A bearer token for one set of scopes.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    /// The raw token, sent as `Authorization: Bearer <secret>`.
    pub secret: String,
    /// When the identity provider says the token stops being valid.
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// The signed-in account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Login name (usually an email address).
    pub username: String,
    /// Display name, if the provider supplied one.
    pub name: Option<String>,
}

/// Client for an identity provider.
///
/// Implement this per provider (Entra ID, a test fake, ...). Only constructed
/// when the [`AuthPolicy`](crate::AuthPolicy) is enabled.
pub trait IdentityClient: Send + Sync + 'static {
    /// The cached account, if one is signed in. Never prompts.
    fn active_session(&self) -> Option<Session>;

    /// Get a token for `scopes`, silently if possible, interactively if not.
    ///
    /// Resolves only once a token is in hand or the attempt has failed; an
    /// abandoned interactive sign-in resolves to an error.
    fn acquire_token<'a>(&'a self, scopes: &'a [String]) -> AuthFuture<'a, AccessToken>;

    /// Ensure an account is signed in, prompting the user if there is none.
    fn sign_in(&self) -> AuthFuture<'_, Session>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_token_debug_redacts_secret() {
        let token = AccessToken {
            secret: "eyJ.super.secret".to_string(),
            expires_at: Utc::now(),
        };
        let debug = format!("{token:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("super"));
    }
}
