//! Application startup: fetch the policy, wire providers, build the client.

use std::sync::Arc;
use std::time::Duration;

use azdash_auth::{AuthPolicy, ConfigFetcher, DEFAULT_TIMEOUT, IdentityClient};

use crate::api::ApiClient;
use crate::dashboard::Dashboard;
use crate::error::Result;
use crate::interceptors::OverrideStore;
use crate::pipeline::Transport;
use crate::router::{Navigation, Router, View};
use crate::wiring::{AuthProviders, IdentityFactory, build_pipeline, provide_auth};

/// Startup settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Base URL of the API, e.g. `http://localhost:8080/api`.
    pub api_root: String,
    /// Upper bound on the startup config fetch.
    pub config_timeout: Duration,
}

impl Settings {
    pub fn new(api_root: impl Into<String>) -> Self {
        Self {
            api_root: api_root.into(),
            config_timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_config_timeout(mut self, timeout: Duration) -> Self {
        self.config_timeout = timeout;
        self
    }
}

/// What a navigation produced.
#[derive(Debug)]
pub enum Screen {
    Dashboard(Dashboard),
    SignInRequired { reason: String },
}

/// A started client.
#[derive(Debug)]
pub struct App {
    policy: AuthPolicy,
    auth: AuthProviders,
    api: ApiClient,
    router: Router,
}

/// Fetch the auth policy from the backend, then compose the app.
///
/// The fetch never fails: an unreachable or misconfigured backend yields the
/// disabled policy.
pub async fn bootstrap(
    settings: &Settings,
    overrides: Arc<dyn OverrideStore>,
    factory: &dyn IdentityFactory,
) -> Result<App> {
    let http = reqwest::Client::new();
    let policy = ConfigFetcher::new(&settings.api_root)
        .with_timeout(settings.config_timeout)
        .with_client(http.clone())
        .load()
        .await;

    App::compose(policy, &settings.api_root, Arc::new(http), overrides, factory)
}

impl App {
    /// Wire an app for an already-resolved policy.
    pub fn compose(
        policy: AuthPolicy,
        api_root: &str,
        transport: Arc<dyn Transport>,
        overrides: Arc<dyn OverrideStore>,
        factory: &dyn IdentityFactory,
    ) -> Result<Self> {
        let auth = provide_auth(&policy, api_root, factory)?;
        let pipeline = build_pipeline(transport, overrides, &auth);
        log::debug!("Request pipeline: {:?}", pipeline.stage_names());

        Ok(Self {
            router: Router::new(auth.guard.clone()),
            api: ApiClient::new(pipeline, api_root),
            policy,
            auth,
        })
    }

    pub fn policy(&self) -> &AuthPolicy {
        &self.policy
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// The identity client, when auth is enabled.
    pub fn identity(&self) -> Option<&Arc<dyn IdentityClient>> {
        self.auth.identity.as_ref()
    }

    /// Navigate to `path` and load whatever view it lands on.
    pub async fn open(&self, path: &str) -> Result<Screen> {
        match self.router.navigate(path).await? {
            Navigation::Render {
                view: View::Dashboard,
                ..
            } => Ok(Screen::Dashboard(Dashboard::load(&self.api).await)),
            Navigation::Blocked { reason, .. } => Ok(Screen::SignInRequired { reason }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_default_timeout() {
        let settings = Settings::new("http://localhost:8080/api");
        assert_eq!(settings.config_timeout, DEFAULT_TIMEOUT);
        let settings = settings.with_config_timeout(Duration::from_secs(2));
        assert_eq!(settings.config_timeout, Duration::from_secs(2));
    }
}
