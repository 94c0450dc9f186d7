//! Route guard: decides whether navigation into a protected view proceeds.

use std::fmt;
use std::sync::Arc;

use crate::IdentityClient;

/// Outcome of [`RouteGuard::can_activate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Navigation may proceed.
    Allow,
    /// Navigation must not proceed; the user is not signed in.
    Block {
        /// Why, for the user.
        reason: String,
    },
}

impl GuardDecision {
    /// Whether navigation may proceed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, GuardDecision::Allow)
    }
}

/// Gate run before a protected view renders.
#[derive(Clone)]
pub enum RouteGuard {
    /// Authentication is disabled; every navigation is allowed.
    AllowAll,
    /// Navigation requires an active session with the identity provider.
    RequireSession(Arc<dyn IdentityClient>),
}

impl RouteGuard {
    /// Whether this guard consults an identity provider.
    pub fn requires_session(&self) -> bool {
        matches!(self, RouteGuard::RequireSession(_))
    }

    /// Decide whether to let navigation proceed.
    ///
    /// With no active session this starts an interactive sign-in and waits
    /// for it to finish. A failed or abandoned sign-in blocks.
    pub async fn can_activate(&self) -> GuardDecision {
        let identity = match self {
            RouteGuard::AllowAll => return GuardDecision::Allow,
            RouteGuard::RequireSession(identity) => identity,
        };

        if identity.active_session().is_some() {
            return GuardDecision::Allow;
        }

        match identity.sign_in().await {
            Ok(session) => {
                log::info!("Signed in as {}", session.username);
                GuardDecision::Allow
            }
            Err(e) => {
                log::warn!("Navigation blocked: {e}");
                GuardDecision::Block {
                    reason: e.to_string(),
                }
            }
        }
    }
}

impl fmt::Debug for RouteGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteGuard::AllowAll => write!(f, "RouteGuard::AllowAll"),
            RouteGuard::RequireSession(_) => write!(f, "RouteGuard::RequireSession"),
        }
    }
}
