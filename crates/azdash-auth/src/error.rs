//! Auth-specific error types.

/// Errors that can occur while resolving the auth policy or talking to the
/// identity provider.
///
/// `Clone` so that a single failed sign-in can be reported to every request
/// that was waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum AuthError {
    /// The configuration endpoint could not be reached or returned garbage.
    #[error("failed to fetch auth configuration: {0}")]
    ConfigFetch(String),

    /// The configuration was fetched but is not usable.
    #[error("invalid auth configuration: {0}")]
    InvalidConfig(String),

    /// The user did not complete the interactive sign-in in time, or declined it.
    #[error("sign-in was abandoned: {0}")]
    SignInAbandoned(String),

    /// The identity provider rejected the interactive sign-in.
    #[error("sign-in failed: {0}")]
    SignInFailed(String),

    /// A token could not be obtained for the requested scopes.
    #[error("token acquisition failed: {0}")]
    TokenAcquisition(String),

    /// No signed-in account is available.
    #[error("no active session")]
    NoSession,

    /// The token cache could not be read or written.
    #[error("token cache error: {0}")]
    Cache(String),
}

impl AuthError {
    /// Whether recovering from this error needs the user to sign in again.
    pub fn is_interaction_required(&self) -> bool {
        matches!(
            self,
            AuthError::NoSession | AuthError::SignInAbandoned(_) | AuthError::SignInFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_display() {
        let e = AuthError::NoSession;
        assert_eq!(e.to_string(), "no active session");
    }

    #[test]
    fn test_auth_error_config_fetch_display() {
        let e = AuthError::ConfigFetch("connection refused".to_string());
        assert_eq!(
            e.to_string(),
            "failed to fetch auth configuration: connection refused"
        );
    }

    #[test]
    fn test_is_interaction_required() {
        assert!(AuthError::NoSession.is_interaction_required());
        assert!(AuthError::SignInAbandoned("expired".into()).is_interaction_required());
        // Cache trouble is local, signing in again won't help
        assert!(!AuthError::Cache("disk full".into()).is_interaction_required());
        assert!(!AuthError::ConfigFetch("err".into()).is_interaction_required());
    }
}
