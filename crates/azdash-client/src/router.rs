//! Route table and guarded navigation.

use azdash_auth::{GuardDecision, RouteGuard};

use crate::error::{Error, Result};

/// Path that matches anything not matched by another route.
pub const WILDCARD: &str = "**";

const MAX_REDIRECTS: usize = 8;

/// Views the client can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Dashboard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteTarget {
    View(View),
    Redirect(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub path: &'static str,
    pub target: RouteTarget,
    /// Whether the route guard runs before the view renders.
    pub guarded: bool,
}

/// The application routes: the dashboard at the root, everything else
/// redirected to it.
pub fn routes() -> Vec<Route> {
    vec![
        Route {
            path: "",
            target: RouteTarget::View(View::Dashboard),
            guarded: true,
        },
        Route {
            path: WILDCARD,
            target: RouteTarget::Redirect(""),
            guarded: false,
        },
    ]
}

/// Result of a navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Render { path: String, view: View },
    Blocked { path: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct Router {
    routes: Vec<Route>,
    guard: RouteGuard,
}

impl Router {
    pub fn new(guard: RouteGuard) -> Self {
        Self {
            routes: routes(),
            guard,
        }
    }

    /// Resolve `path`, follow redirects, and run the guard on protected views.
    pub async fn navigate(&self, path: &str) -> Result<Navigation> {
        let mut path = normalize(path);

        for _ in 0..MAX_REDIRECTS {
            let route = self
                .resolve(&path)
                .ok_or_else(|| Error::Navigation(format!("no route for '/{path}'")))?;

            let view = match route.target {
                RouteTarget::Redirect(to) => {
                    log::debug!("Redirecting '/{path}' to '/{to}'");
                    path = to.to_string();
                    continue;
                }
                RouteTarget::View(view) => view,
            };

            if route.guarded
                && let GuardDecision::Block { reason } = self.guard.can_activate().await
            {
                return Ok(Navigation::Blocked { path, reason });
            }
            return Ok(Navigation::Render { path, view });
        }

        Err(Error::Navigation(format!("too many redirects from '/{path}'")))
    }

    fn resolve(&self, path: &str) -> Option<&Route> {
        self.routes
            .iter()
            .find(|r| r.path == path)
            .or_else(|| self.routes.iter().find(|r| r.path == WILDCARD))
    }
}

fn normalize(path: &str) -> String {
    path.trim().trim_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use azdash_auth::{AccessToken, AuthError, AuthFuture, IdentityClient, Session};

    use super::*;

    struct Identity {
        allow: bool,
        sign_ins: AtomicUsize,
    }

    impl IdentityClient for Identity {
        fn active_session(&self) -> Option<Session> {
            None
        }

        fn acquire_token<'a>(&'a self, _scopes: &'a [String]) -> AuthFuture<'a, AccessToken> {
            Box::pin(async { Err(AuthError::NoSession) })
        }

        fn sign_in(&self) -> AuthFuture<'_, Session> {
            Box::pin(async move {
                self.sign_ins.fetch_add(1, Ordering::SeqCst);
                if self.allow {
                    Ok(Session {
                        username: "alice@example.com".into(),
                        name: None,
                    })
                } else {
                    Err(AuthError::SignInAbandoned("window closed".into()))
                }
            })
        }
    }

    fn guarded(allow: bool) -> (Arc<Identity>, Router) {
        let identity = Arc::new(Identity {
            allow,
            sign_ins: AtomicUsize::new(0),
        });
        let router = Router::new(RouteGuard::RequireSession(identity.clone()));
        (identity, router)
    }

    #[tokio::test]
    async fn test_root_renders_dashboard() {
        let router = Router::new(RouteGuard::AllowAll);
        assert_eq!(
            router.navigate("/").await.unwrap(),
            Navigation::Render {
                path: String::new(),
                view: View::Dashboard
            }
        );
    }

    #[tokio::test]
    async fn test_unknown_path_redirects_to_root() {
        let router = Router::new(RouteGuard::AllowAll);
        let nav = router.navigate("/no/such/page").await.unwrap();
        assert_eq!(
            nav,
            Navigation::Render {
                path: String::new(),
                view: View::Dashboard
            }
        );
    }

    #[tokio::test]
    async fn test_guard_runs_after_redirect() {
        let (identity, router) = guarded(true);
        let nav = router.navigate("/elsewhere").await.unwrap();
        assert!(matches!(nav, Navigation::Render { .. }));
        assert_eq!(identity.sign_ins.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_abandoned_sign_in_blocks() {
        let (_identity, router) = guarded(false);
        match router.navigate("").await.unwrap() {
            Navigation::Blocked { path, reason } => {
                assert_eq!(path, "");
                assert!(reason.contains("window closed"));
            }
            other => panic!("expected Blocked, got {other:?}"),
        }
    }

    #[test]
    fn test_route_table() {
        let table = routes();
        assert_eq!(table[0].path, "");
        assert!(table[0].guarded);
        assert_eq!(table[1].target, RouteTarget::Redirect(""));
    }
}
