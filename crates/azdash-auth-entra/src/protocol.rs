//! Wire types and form posts for the Microsoft identity platform v2.0 endpoints.

use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use azdash_auth::AuthError;

use crate::cache::TokenResponse;

/// Grant type for polling a device code.
pub const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Scopes added to every request so we get an `id_token` and a refresh token.
pub const OIDC_SCOPES: [&str; 3] = ["openid", "profile", "offline_access"];

/// Upper bound on a device code's lifetime.
pub const MAX_DEVICE_CODE_LIFETIME_SECS: u64 = 24 * 3600;

/// Lower bound on the device-code polling interval.
pub const MIN_POLL_INTERVAL_SECS: u64 = 1;

/// Token and device-code endpoints for an authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub device_code: String,
    pub token: String,
}

impl Endpoints {
    /// Derive the endpoints from an authority such as
    /// `https://login.microsoftonline.com/<tenant>`.
    pub fn for_authority(authority: &str) -> Self {
        let base = authority.trim_end_matches('/');
        Self {
            device_code: format!("{base}/oauth2/v2.0/devicecode"),
            token: format!("{base}/oauth2/v2.0/token"),
        }
    }
}

/// Response to a device authorization request.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceCodeResponse {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    #[serde(default)]
    pub message: Option<String>,
    pub expires_in: u64,
    #[serde(default = "default_interval")]
    pub interval: u64,
}

fn default_interval() -> u64 {
    5
}

impl DeviceCodeResponse {
    /// How long the code stays valid, capped at [`MAX_DEVICE_CODE_LIFETIME_SECS`].
    pub fn lifetime(&self) -> Duration {
        Duration::from_secs(self.expires_in.min(MAX_DEVICE_CODE_LIFETIME_SECS))
    }

    /// Delay between polls, never below [`MIN_POLL_INTERVAL_SECS`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.interval.max(MIN_POLL_INTERVAL_SECS))
    }
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Failure talking to an identity-provider endpoint.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// Network trouble or an unreadable response.
    #[error("{0}")]
    Transport(String),
    /// The provider answered with an OAuth error code.
    #[error("{code}{}", with_description(.description))]
    Rejected { code: String, description: String },
}

fn with_description(description: &str) -> String {
    if description.is_empty() {
        String::new()
    } else {
        format!(": {description}")
    }
}

/// What a single device-code poll told us.
#[derive(Debug)]
pub enum PollOutcome {
    Granted(TokenResponse),
    Pending,
    SlowDown,
}

/// Map a device-code poll result onto the polling state machine.
pub fn classify_poll(
    result: Result<TokenResponse, ProviderError>,
) -> Result<PollOutcome, AuthError> {
    match result {
        Ok(tokens) => Ok(PollOutcome::Granted(tokens)),
        Err(ProviderError::Rejected { code, description }) => {
            let message = ProviderError::Rejected {
                code: code.clone(),
                description,
            }
            .to_string();
            match code.as_str() {
                "authorization_pending" => Ok(PollOutcome::Pending),
                "slow_down" => Ok(PollOutcome::SlowDown),
                "authorization_declined" | "expired_token" | "access_denied" => {
                    Err(AuthError::SignInAbandoned(message))
                }
                _ => Err(AuthError::SignInFailed(message)),
            }
        }
        Err(e) => Err(AuthError::SignInFailed(e.to_string())),
    }
}

/// Scopes to send: the requested resource scopes plus the OIDC set.
pub fn request_scopes(scopes: &[String]) -> String {
    let mut all: Vec<&str> = scopes.iter().map(String::as_str).collect();
    for s in OIDC_SCOPES {
        if !all.contains(&s) {
            all.push(s);
        }
    }
    all.join(" ")
}

/// POST an urlencoded form and decode the JSON answer.
pub async fn post_form<T: DeserializeOwned>(
    http: &reqwest::Client,
    url: &str,
    form: &[(&str, &str)],
) -> Result<T, ProviderError> {
    let response = http
        .post(url)
        .form(form)
        .send()
        .await
        .map_err(|e| ProviderError::Transport(e.to_string()))?;

    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|e| ProviderError::Transport(e.to_string()))?;

    if status.is_success() {
        return serde_json::from_slice(&body)
            .map_err(|e| ProviderError::Transport(format!("malformed response from {url}: {e}")));
    }

    match serde_json::from_slice::<ErrorResponse>(&body) {
        Ok(err) => Err(ProviderError::Rejected {
            code: err.error,
            description: err.error_description.unwrap_or_default(),
        }),
        Err(_) => Err(ProviderError::Transport(format!("{url} returned HTTP {status}"))),
    }
}
