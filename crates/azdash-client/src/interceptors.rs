//! The two request stages: APIM base-URL header and bearer token.

use std::fmt;
use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, HeaderName, HeaderValue};
use reqwest::{Request, Url};

use azdash_auth::{AuthError, IdentityClient};

use crate::pipeline::{Interceptor, Next, PipelineFuture};

/// Header carrying the user-selected API Management base URL (`X-APIM-Base-Url`).
pub const APIM_HEADER: HeaderName = HeaderName::from_static("x-apim-base-url");

/// Source of the user-configured APIM base URL.
///
/// Read on every request, so a change is picked up without rebuilding the
/// pipeline.
pub trait OverrideStore: Send + Sync + 'static {
    fn apim_base_url(&self) -> Option<String>;
}

/// An override fixed at construction.
#[derive(Debug, Clone, Default)]
pub struct FixedOverride(pub Option<String>);

impl OverrideStore for FixedOverride {
    fn apim_base_url(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Stamps [`APIM_HEADER`] onto every request.
///
/// The header is always present; it is empty when no override is set.
pub struct ApimHeader {
    store: Arc<dyn OverrideStore>,
}

impl ApimHeader {
    pub fn new(store: Arc<dyn OverrideStore>) -> Self {
        Self { store }
    }

    fn header_value(&self) -> HeaderValue {
        let value = self.store.apim_base_url().unwrap_or_default();
        HeaderValue::from_str(value.trim()).unwrap_or_else(|_| {
            log::warn!("Ignoring APIM base URL that is not a valid header value");
            HeaderValue::from_static("")
        })
    }
}

impl Interceptor for ApimHeader {
    fn name(&self) -> &'static str {
        "apim-base-url"
    }

    fn intercept<'a>(&'a self, mut request: Request, next: Next<'a>) -> PipelineFuture<'a> {
        request.headers_mut().insert(APIM_HEADER, self.header_value());
        next.run(request)
    }
}

/// URL prefixes that need a token, and the scopes to request for each.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtectedResourceMap {
    entries: Vec<(String, Vec<String>)>,
}

impl ProtectedResourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Protect every URL under `base` with `scopes`.
    pub fn with(mut self, base: &str, scopes: Vec<String>) -> Self {
        let normalized = Url::parse(base)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| base.to_string());
        self.entries
            .push((normalized.trim_end_matches('/').to_string(), scopes));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Scopes for `url`, from the longest matching prefix.
    pub fn scopes_for(&self, url: &Url) -> Option<&[String]> {
        let url = url.as_str();
        self.entries
            .iter()
            .filter(|(base, _)| is_under(base, url))
            .max_by_key(|(base, _)| base.len())
            .map(|(_, scopes)| scopes.as_slice())
    }
}

/// `url` equals `base` or continues it at a path, query or fragment boundary.
fn is_under(base: &str, url: &str) -> bool {
    url.strip_prefix(base)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(['/', '?', '#']))
}

/// Attaches `Authorization: Bearer <token>` to requests for protected URLs.
///
/// Requests outside the [`ProtectedResourceMap`] pass through untouched.
/// If no token can be acquired the request is not sent.
pub struct BearerToken {
    identity: Arc<dyn IdentityClient>,
    resources: ProtectedResourceMap,
}

impl BearerToken {
    pub fn new(identity: Arc<dyn IdentityClient>, resources: ProtectedResourceMap) -> Self {
        Self {
            identity,
            resources,
        }
    }
}

impl Interceptor for BearerToken {
    fn name(&self) -> &'static str {
        "bearer-token"
    }

    fn intercept<'a>(&'a self, mut request: Request, next: Next<'a>) -> PipelineFuture<'a> {
        let Some(scopes) = self.resources.scopes_for(request.url()) else {
            return next.run(request);
        };

        Box::pin(async move {
            let token = self.identity.acquire_token(scopes).await?;
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.secret))
                .map_err(|_| {
                    AuthError::TokenAcquisition("token is not a valid header value".into())
                })?;
            value.set_sensitive(true);
            request.headers_mut().insert(AUTHORIZATION, value);
            next.run(request).await
        })
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerToken")
            .field("resources", &self.resources)
            .finish_non_exhaustive()
    }
}
