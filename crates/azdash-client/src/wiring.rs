//! Provider wiring: one branch on [`AuthPolicy::is_enabled`].
//!
//! Disabled: no identity client, no token stage, a guard that allows
//! everything. Enabled: an identity client from the [`IdentityFactory`], a
//! bearer-token stage protecting the API root, and a session guard.

use std::fmt;
use std::sync::Arc;

use azdash_auth::{AuthError, AuthPolicy, IdentityClient, RouteGuard};

use crate::interceptors::{ApimHeader, BearerToken, OverrideStore, ProtectedResourceMap};
use crate::pipeline::{Interceptor, Pipeline, Transport};

/// Builds the identity client for an enabled policy.
pub trait IdentityFactory: Send + Sync {
    fn create(&self, policy: &AuthPolicy) -> Result<Arc<dyn IdentityClient>, AuthError>;
}

/// Auth-dependent providers registered at startup.
#[derive(Clone)]
pub struct AuthProviders {
    /// The identity client, when auth is enabled.
    pub identity: Option<Arc<dyn IdentityClient>>,
    /// Auth stages, appended after the APIM header stage.
    pub interceptors: Vec<Arc<dyn Interceptor>>,
    pub guard: RouteGuard,
    pub resources: ProtectedResourceMap,
}

impl AuthProviders {
    /// The disabled set: nothing registered, everything allowed.
    pub fn none() -> Self {
        Self {
            identity: None,
            interceptors: Vec::new(),
            guard: RouteGuard::AllowAll,
            resources: ProtectedResourceMap::new(),
        }
    }
}

impl fmt::Debug for AuthProviders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthProviders")
            .field("identity", &self.identity.is_some())
            .field(
                "interceptors",
                &self.interceptors.iter().map(|i| i.name()).collect::<Vec<_>>(),
            )
            .field("guard", &self.guard)
            .field("resources", &self.resources)
            .finish()
    }
}

/// Select the providers for `policy`.
///
/// `api_root` is the protected resource; tokens are requested for the
/// policy's API scope. The factory is only consulted when auth is enabled.
pub fn provide_auth(
    policy: &AuthPolicy,
    api_root: &str,
    factory: &dyn IdentityFactory,
) -> Result<AuthProviders, AuthError> {
    if !policy.is_enabled() {
        log::debug!("Authentication disabled; no auth providers registered");
        return Ok(AuthProviders::none());
    }

    let identity = factory.create(policy)?;
    let resources =
        ProtectedResourceMap::new().with(api_root, vec![policy.api_scope().to_string()]);
    let bearer: Arc<dyn Interceptor> =
        Arc::new(BearerToken::new(identity.clone(), resources.clone()));

    log::info!(
        "Authentication enabled (authority {}, scope {})",
        policy.authority(),
        policy.api_scope()
    );

    Ok(AuthProviders {
        identity: Some(identity.clone()),
        interceptors: vec![bearer],
        guard: RouteGuard::RequireSession(identity),
        resources,
    })
}

/// The request pipeline: APIM header first, then the auth stages.
pub fn build_pipeline(
    transport: Arc<dyn Transport>,
    overrides: Arc<dyn OverrideStore>,
    auth: &AuthProviders,
) -> Pipeline {
    Pipeline::new(transport)
        .with_stage(Arc::new(ApimHeader::new(overrides)))
        .with_stages(auth.interceptors.iter().cloned())
}
