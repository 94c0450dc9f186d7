//! Microsoft Entra ID (Azure AD) identity client for azdash.
//!
//! Implements [`azdash_auth::IdentityClient`]:
//! - Cached access tokens per scope set, with an expiry skew
//! - Silent renewal through the `refresh_token` grant
//! - Interactive sign-in through the device authorization grant
//! - Optional JSON token cache on disk
//!
//! Concurrent callers that all need an interactive sign-in share a single
//! one; if it is abandoned they all get the same error.

mod cache;
mod protocol;

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};

use azdash_auth::{AccessToken, AuthError, AuthFuture, IdentityClient, Session};

pub use cache::{Account, TokenCache, TokenResponse, account_from_id_token, scope_key};
pub use protocol::Endpoints;

use protocol::{
    DEVICE_CODE_GRANT, DeviceCodeResponse, PollOutcome, ProviderError, classify_poll, post_form,
    request_scopes,
};

/// What the user must do to finish an interactive sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCodePrompt {
    /// Code to type at the verification page.
    pub user_code: String,
    /// Page to open in a browser.
    pub verification_uri: String,
    /// Ready-made instruction text from the provider.
    pub message: String,
    /// How long the code stays valid.
    pub expires_in: Duration,
}

/// Shows the device-code instructions to the user.
pub trait SignInPrompt: Send + Sync + 'static {
    /// Display the prompt. Must not block.
    fn show(&self, prompt: &DeviceCodePrompt);
}

/// Prompt that only writes to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogPrompt;

impl SignInPrompt for LogPrompt {
    fn show(&self, prompt: &DeviceCodePrompt) {
        log::warn!("{}", prompt.message);
    }
}

/// Settings for [`EntraIdentityClient`].
#[derive(Debug, Clone)]
pub struct EntraOptions {
    /// Application (client) ID.
    pub client_id: String,
    /// Issuer, e.g. `https://login.microsoftonline.com/<tenant>`.
    pub authority: String,
    /// Scopes requested when signing in without a specific request.
    pub login_scopes: Vec<String>,
    /// Where to persist the token cache. In memory only when `None`.
    pub cache_path: Option<PathBuf>,
}

impl EntraOptions {
    /// Options with no login scopes and an in-memory cache.
    pub fn new(client_id: impl Into<String>, authority: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            authority: authority.into(),
            login_scopes: Vec::new(),
            cache_path: None,
        }
    }

    /// Scopes to request on [`IdentityClient::sign_in`].
    pub fn with_login_scopes(mut self, scopes: Vec<String>) -> Self {
        self.login_scopes = scopes;
        self
    }

    /// Persist the token cache at `path`.
    pub fn with_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = Some(path.into());
        self
    }
}

type SignInFlight = Shared<BoxFuture<'static, Result<AccessToken, AuthError>>>;

/// Entra ID client. Cheap to clone (Arc internals).
#[derive(Clone)]
pub struct EntraIdentityClient {
    inner: Arc<Inner>,
}

struct Inner {
    options: EntraOptions,
    endpoints: Endpoints,
    http: reqwest::Client,
    cache: Mutex<TokenCache>,
    prompt: Arc<dyn SignInPrompt>,
    inflight: Mutex<Option<(String, SignInFlight)>>,
}

impl EntraIdentityClient {
    /// Create a client, loading the token cache from disk if configured.
    ///
    /// An unreadable cache file is logged and replaced by an empty cache.
    pub fn new(options: EntraOptions, prompt: Arc<dyn SignInPrompt>) -> Self {
        let cache = match &options.cache_path {
            Some(path) => TokenCache::load(path).unwrap_or_else(|e| {
                log::warn!("Ignoring token cache: {e}");
                TokenCache::default()
            }),
            None => TokenCache::default(),
        };

        Self {
            inner: Arc::new(Inner {
                endpoints: Endpoints::for_authority(&options.authority),
                options,
                http: reqwest::Client::new(),
                cache: Mutex::new(cache),
                prompt,
                inflight: Mutex::new(None),
            }),
        }
    }

    /// The endpoints this client talks to.
    pub fn endpoints(&self) -> &Endpoints {
        &self.inner.endpoints
    }
}

impl std::fmt::Debug for EntraIdentityClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntraIdentityClient")
            .field("client_id", &self.inner.options.client_id)
            .field("authority", &self.inner.options.authority)
            .finish()
    }
}

impl IdentityClient for EntraIdentityClient {
    fn active_session(&self) -> Option<Session> {
        let cache = self.inner.cache().ok()?;
        cache.session(Utc::now())
    }

    fn acquire_token<'a>(&'a self, scopes: &'a [String]) -> AuthFuture<'a, AccessToken> {
        let inner = self.inner.clone();
        let scopes = scopes.to_vec();
        Box::pin(inner.acquire(scopes))
    }

    fn sign_in(&self) -> AuthFuture<'_, Session> {
        Box::pin(async move {
            if let Some(session) = self.active_session() {
                return Ok(session);
            }
            let scopes = self.inner.options.login_scopes.clone();
            self.inner.clone().acquire(scopes).await?;
            self.active_session().ok_or_else(|| {
                AuthError::SignInFailed("identity provider returned no account".to_string())
            })
        })
    }
}

impl Inner {
    fn cache(&self) -> Result<MutexGuard<'_, TokenCache>, AuthError> {
        self.cache
            .lock()
            .map_err(|_| AuthError::Cache("token cache lock poisoned".to_string()))
    }

    /// Cached token, then refresh token, then interactive sign-in.
    async fn acquire(self: Arc<Self>, scopes: Vec<String>) -> Result<AccessToken, AuthError> {
        if let Some(token) = self.acquire_silent(&scopes).await? {
            return Ok(token);
        }
        self.interactive(scopes).await
    }

    /// Try the cache and the refresh token. `Ok(None)` means interaction is needed.
    async fn acquire_silent(&self, scopes: &[String]) -> Result<Option<AccessToken>, AuthError> {
        let refresh_token = {
            let cache = self.cache()?;
            if let Some(token) = cache.access_token(scopes, Utc::now()) {
                return Ok(Some(token));
            }
            cache.refresh_token().map(str::to_string)
        };

        let Some(refresh_token) = refresh_token else {
            return Ok(None);
        };

        let scope = request_scopes(scopes);
        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", self.options.client_id.as_str()),
            ("refresh_token", refresh_token.as_str()),
            ("scope", scope.as_str()),
        ];

        match post_form::<TokenResponse>(&self.http, &self.endpoints.token, &form).await {
            Ok(response) => {
                log::debug!("Refreshed access token for '{}'", scope_key(scopes));
                self.store(scopes, response).map(Some)
            }
            Err(e @ ProviderError::Rejected { .. }) => {
                log::info!("Refresh token rejected ({e}); sign-in required");
                self.cache()?.drop_refresh_token();
                self.persist();
                Ok(None)
            }
            Err(e) => Err(AuthError::TokenAcquisition(e.to_string())),
        }
    }

    /// Join the in-flight sign-in or start one.
    async fn interactive(self: Arc<Self>, scopes: Vec<String>) -> Result<AccessToken, AuthError> {
        let key = scope_key(&scopes);
        let (flight_key, flight) = {
            let mut slot = self
                .inflight
                .lock()
                .map_err(|_| AuthError::Cache("sign-in lock poisoned".to_string()))?;
            match slot.as_ref() {
                Some((k, f)) => (k.clone(), f.clone()),
                None => {
                    let f = self.clone().device_code_flow(scopes.clone()).boxed().shared();
                    *slot = Some((key.clone(), f.clone()));
                    (key.clone(), f)
                }
            }
        };

        let result = flight.clone().await;

        if let Ok(mut slot) = self.inflight.lock()
            && slot.as_ref().is_some_and(|(_, f)| f.ptr_eq(&flight))
        {
            *slot = None;
        }

        let token = result?;
        if flight_key == key {
            return Ok(token);
        }
        // Joined a sign-in for other scopes; the new refresh token covers ours.
        self.acquire_silent(&scopes)
            .await?
            .ok_or(AuthError::NoSession)
    }

    async fn device_code_flow(
        self: Arc<Self>,
        scopes: Vec<String>,
    ) -> Result<AccessToken, AuthError> {
        let scope = request_scopes(&scopes);
        let form = [
            ("client_id", self.options.client_id.as_str()),
            ("scope", scope.as_str()),
        ];
        let grant: DeviceCodeResponse = post_form(&self.http, &self.endpoints.device_code, &form)
            .await
            .map_err(|e| AuthError::SignInFailed(e.to_string()))?;

        let expires_in = grant.lifetime();
        self.prompt.show(&DeviceCodePrompt {
            message: grant.message.clone().unwrap_or_else(|| {
                format!(
                    "To sign in, open {} and enter the code {}",
                    grant.verification_uri, grant.user_code
                )
            }),
            user_code: grant.user_code.clone(),
            verification_uri: grant.verification_uri.clone(),
            expires_in,
        });

        let deadline = tokio::time::Instant::now() + expires_in;
        let mut interval = grant.poll_interval();
        let poll_form = [
            ("grant_type", DEVICE_CODE_GRANT),
            ("client_id", self.options.client_id.as_str()),
            ("device_code", grant.device_code.as_str()),
        ];

        loop {
            tokio::time::sleep(interval).await;
            if tokio::time::Instant::now() >= deadline {
                return Err(AuthError::SignInAbandoned(
                    "device code expired before sign-in completed".to_string(),
                ));
            }

            let polled =
                post_form::<TokenResponse>(&self.http, &self.endpoints.token, &poll_form).await;
            match classify_poll(polled)? {
                PollOutcome::Granted(response) => {
                    let token = self.store(&scopes, response)?;
                    if let Some(session) = self.cache()?.session(Utc::now()) {
                        log::info!("Signed in as {}", session.username);
                    }
                    return Ok(token);
                }
                PollOutcome::Pending => {}
                PollOutcome::SlowDown => interval += Duration::from_secs(5),
            }
        }
    }

    fn store(&self, scopes: &[String], response: TokenResponse) -> Result<AccessToken, AuthError> {
        let token = self.cache()?.store(scopes, response, Utc::now())?;
        self.persist();
        Ok(token)
    }

    /// Mirror the cache to disk. Failures are logged, not fatal.
    fn persist(&self) {
        let Some(path) = &self.options.cache_path else {
            return;
        };
        let result = self.cache().and_then(|cache| cache.save(path));
        if let Err(e) = result {
            log::warn!("Could not persist token cache: {e}");
        }
    }
}
