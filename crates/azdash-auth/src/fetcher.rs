//! Startup fetch of the auth configuration.
//!
//! This is the only place untrusted configuration becomes an [`AuthPolicy`].
//! Nothing downstream re-validates.

use std::time::Duration;

use crate::{AuthError, AuthPolicy, RawConfigResponse};

/// Path of the configuration endpoint, relative to the API root.
pub const CONFIG_PATH: &str = "/config/azure-ad";

/// Default time allowed for the configuration request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Fetches the auth configuration from the backend, once.
#[derive(Debug, Clone)]
pub struct ConfigFetcher {
    http: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl ConfigFetcher {
    /// Create a fetcher for the given API root (e.g. `https://host/api`).
    pub fn new(api_root: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: config_endpoint(api_root),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Use an existing HTTP client instead of a fresh one.
    pub fn with_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// The full URL that [`load`](Self::load) requests.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fetch and validate the configuration.
    ///
    /// Never fails: any transport, status, parse or validation problem is
    /// logged and the disabled sentinel is returned instead.
    pub async fn load(&self) -> AuthPolicy {
        log::debug!("Fetching auth configuration from {}", self.endpoint);
        let policy = resolve(self.fetch().await);
        log::info!(
            "Authentication {}",
            if policy.is_enabled() { "enabled" } else { "disabled" }
        );
        policy
    }

    async fn fetch(&self) -> Result<RawConfigResponse, AuthError> {
        let response = self
            .http
            .get(&self.endpoint)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| AuthError::ConfigFetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::ConfigFetch(format!(
                "{} returned HTTP {status}",
                self.endpoint
            )));
        }

        response
            .json::<RawConfigResponse>()
            .await
            .map_err(|e| AuthError::ConfigFetch(format!("malformed response body: {e}")))
    }
}

/// Turn a fetch outcome into a policy, degrading to disabled on any error.
pub fn resolve(fetched: Result<RawConfigResponse, AuthError>) -> AuthPolicy {
    match fetched.and_then(RawConfigResponse::into_policy) {
        Ok(policy) => policy,
        Err(e) => {
            log::warn!("{e}; continuing with authentication disabled");
            AuthPolicy::disabled()
        }
    }
}

/// Build the configuration endpoint URL for an API root.
pub fn config_endpoint(api_root: &str) -> String {
    format!("{}{CONFIG_PATH}", api_root.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_config_endpoint() {
        assert_eq!(
            config_endpoint("https://host/api"),
            "https://host/api/config/azure-ad"
        );
        assert_eq!(
            config_endpoint("https://host/api/"),
            "https://host/api/config/azure-ad"
        );
    }

    #[test]
    fn test_fetcher_builder() {
        let fetcher =
            ConfigFetcher::new("http://localhost:8080/api").with_timeout(Duration::from_secs(2));
        assert_eq!(
            fetcher.endpoint(),
            "http://localhost:8080/api/config/azure-ad"
        );
        assert_eq!(fetcher.timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_resolve_fetch_error_is_disabled() {
        let policy = resolve(Err(AuthError::ConfigFetch("timed out".into())));
        assert_eq!(policy, AuthPolicy::disabled());
    }

    #[test]
    fn test_resolve_valid_response_unchanged() {
        let policy = resolve(Ok(RawConfigResponse {
            enabled: Some(true),
            client_id: Some("c1".into()),
            authority: Some("https://login.example/tenant".into()),
            api_scope: Some("api://x/.default".into()),
        }));
        assert!(policy.is_enabled());
        assert_eq!(policy.client_id(), "c1");
        assert_eq!(policy.authority(), "https://login.example/tenant");
        assert_eq!(policy.api_scope(), "api://x/.default");
    }

    fn field() -> impl Strategy<Value = Option<String>> {
        prop_oneof![
            Just(None),
            Just(Some(String::new())),
            Just(Some(" \t".to_string())),
            "[a-z0-9:/._-]{1,24}".prop_map(Some),
        ]
    }

    proptest! {
        #[test]
        fn test_resolve_incomplete_is_sentinel(
            enabled in proptest::option::of(any::<bool>()),
            client_id in field(),
            authority in field(),
            api_scope in field(),
        ) {
            let usable = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
            let complete = enabled == Some(true)
                && usable(&client_id)
                && usable(&authority)
                && usable(&api_scope);

            let policy = resolve(Ok(RawConfigResponse {
                enabled,
                client_id,
                authority,
                api_scope,
            }));

            prop_assert_eq!(policy.is_enabled(), complete);
            if !complete {
                prop_assert_eq!(policy, AuthPolicy::disabled());
            }
        }
    }
}
