//! Token cache: account, refresh token and per-scope access tokens.
//!
//! Persisted as JSON when a cache path is configured, so a session survives
//! between runs the way a browser's `localStorage` cache does.

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use azdash_auth::{AccessToken, AuthError, Session};

/// Access tokens this close to expiry (seconds) are treated as expired.
pub const EXPIRY_SKEW_SECS: i64 = 300;

/// Successful response from the token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: i64,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
}

/// The signed-in account, as read from the `id_token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub oid: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedToken {
    scopes: String,
    secret: String,
    expires_at: DateTime<Utc>,
}

/// In-memory token cache, optionally mirrored to a file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenCache {
    #[serde(default)]
    account: Option<Account>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    access_tokens: Vec<CachedToken>,
}

impl TokenCache {
    /// Read a cache file. A missing file is an empty cache.
    pub fn load(path: &Path) -> Result<Self, AuthError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(AuthError::Cache(format!("{}: {e}", path.display()))),
        };
        serde_json::from_str(&content)
            .map_err(|e| AuthError::Cache(format!("{}: {e}", path.display())))
    }

    /// Write the cache file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), AuthError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AuthError::Cache(format!("{}: {e}", parent.display())))?;
        }
        let json =
            serde_json::to_string_pretty(self).map_err(|e| AuthError::Cache(e.to_string()))?;
        std::fs::write(path, json)
            .map_err(|e| AuthError::Cache(format!("{}: {e}", path.display())))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(path, perms)
                .map_err(|e| AuthError::Cache(format!("{}: {e}", path.display())))?;
        }

        Ok(())
    }

    /// A cached access token for exactly these scopes, if still fresh.
    pub fn access_token(&self, scopes: &[String], now: DateTime<Utc>) -> Option<AccessToken> {
        let key = scope_key(scopes);
        self.access_tokens
            .iter()
            .find(|t| t.scopes == key && is_fresh(t.expires_at, now))
            .map(|t| AccessToken {
                secret: t.secret.clone(),
                expires_at: t.expires_at,
            })
    }

    /// The cached refresh token.
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    /// Forget the refresh token (the provider rejected it).
    pub fn drop_refresh_token(&mut self) {
        self.refresh_token = None;
    }

    /// The signed-in account, if there is one we can still get tokens for.
    pub fn session(&self, now: DateTime<Utc>) -> Option<Session> {
        let account = self.account.as_ref()?;
        let usable = self.refresh_token.is_some()
            || self
                .access_tokens
                .iter()
                .any(|t| is_fresh(t.expires_at, now));
        usable.then(|| Session {
            username: account.username.clone(),
            name: account.name.clone(),
        })
    }

    /// Record a token response for `scopes` and return the access token.
    ///
    /// Fails without touching the cache when `expires_in` is out of range.
    pub fn store(
        &mut self,
        scopes: &[String],
        response: TokenResponse,
        now: DateTime<Utc>,
    ) -> Result<AccessToken, AuthError> {
        let key = scope_key(scopes);
        let expires_at = expiry(now, response.expires_in)?;

        if let Some(account) = response.id_token.as_deref().and_then(account_from_id_token) {
            self.account = Some(account);
        }
        if response.refresh_token.is_some() {
            self.refresh_token = response.refresh_token;
        }

        self.access_tokens.retain(|t| t.scopes != key);
        self.access_tokens.push(CachedToken {
            scopes: key,
            secret: response.access_token.clone(),
            expires_at,
        });

        Ok(AccessToken {
            secret: response.access_token,
            expires_at,
        })
    }
}

fn expiry(now: DateTime<Utc>, expires_in: i64) -> Result<DateTime<Utc>, AuthError> {
    TimeDelta::try_seconds(expires_in)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or_else(|| {
            AuthError::TokenAcquisition(format!("token lifetime out of range: {expires_in}s"))
        })
}

fn is_fresh(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    expires_at
        .checked_sub_signed(TimeDelta::seconds(EXPIRY_SKEW_SECS))
        .is_some_and(|refresh_at| refresh_at > now)
}

/// Order-independent key for a scope set.
pub fn scope_key(scopes: &[String]) -> String {
    let mut sorted: Vec<&str> = scopes.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    sorted.dedup();
    sorted.join(" ")
}

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    preferred_username: Option<String>,
    email: Option<String>,
    upn: Option<String>,
    name: Option<String>,
    oid: Option<String>,
}

/// Read the account out of an `id_token` payload.
///
/// The signature is not checked: the token came straight from the token
/// endpoint over TLS and is only used to label the session.
pub fn account_from_id_token(id_token: &str) -> Option<Account> {
    let payload = id_token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    let claims: IdTokenClaims = serde_json::from_slice(&bytes).ok()?;
    let username = claims
        .preferred_username
        .or(claims.email)
        .or(claims.upn)?;
    Some(Account {
        username,
        name: claims.name,
        oid: claims.oid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id_token_for(username: &str) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#);
        let payload = URL_SAFE_NO_PAD.encode(
            serde_json::json!({
                "preferred_username": username,
                "name": "Alice Example",
                "oid": "00000000-0000-0000-0000-000000000001"
            })
            .to_string(),
        );
        format!("{header}.{payload}.sig")
    }

    fn scopes() -> Vec<String> {
        vec!["api://x/.default".to_string()]
    }

    fn response(expires_in: i64) -> TokenResponse {
        TokenResponse {
            access_token: "at-1".to_string(),
            expires_in,
            refresh_token: Some("rt-1".to_string()),
            id_token: Some(id_token_for("alice@example.com")),
        }
    }

    #[test]
    fn test_account_from_id_token() {
        let account = account_from_id_token(&id_token_for("alice@example.com")).unwrap();
        assert_eq!(account.username, "alice@example.com");
        assert_eq!(account.name.as_deref(), Some("Alice Example"));
    }

    #[test]
    fn test_account_from_garbage_token() {
        assert!(account_from_id_token("not-a-jwt").is_none());
        assert!(account_from_id_token("a.!!!.c").is_none());
    }

    #[test]
    fn test_scope_key_order_independent() {
        let a = vec!["b".to_string(), "a".to_string()];
        let b = vec!["a".to_string(), "b".to_string(), "a".to_string()];
        assert_eq!(scope_key(&a), scope_key(&b));
    }

    #[test]
    fn test_store_then_lookup() {
        let now = Utc::now();
        let mut cache = TokenCache::default();
        let token = cache.store(&scopes(), response(3600), now).unwrap();
        assert_eq!(token.secret, "at-1");
        assert_eq!(cache.access_token(&scopes(), now), Some(token));
        assert_eq!(cache.refresh_token(), Some("rt-1"));
        assert_eq!(
            cache.session(now).map(|s| s.username),
            Some("alice@example.com".to_string())
        );
    }

    #[test]
    fn test_lookup_respects_skew() {
        let now = Utc::now();
        let mut cache = TokenCache::default();
        cache.store(&scopes(), response(60), now).unwrap();
        assert!(cache.access_token(&scopes(), now).is_none());
    }

    #[test]
    fn test_lookup_other_scope_misses() {
        let now = Utc::now();
        let mut cache = TokenCache::default();
        cache.store(&scopes(), response(3600), now).unwrap();
        assert!(cache.access_token(&["other".to_string()], now).is_none());
    }

    #[test]
    fn test_session_requires_refresh_or_fresh_token() {
        let now = Utc::now();
        let mut cache = TokenCache::default();
        let mut resp = response(60);
        resp.refresh_token = None;
        cache.store(&scopes(), resp, now).unwrap();
        assert!(cache.session(now).is_none());
    }

    #[test]
    fn test_store_rejects_out_of_range_lifetime() {
        let now = Utc::now();
        let mut cache = TokenCache::default();
        for expires_in in [i64::MAX, i64::MIN, i64::MAX / 1000] {
            let result = cache.store(&scopes(), response(expires_in), now);
            assert!(matches!(result, Err(AuthError::TokenAcquisition(_))));
        }
        assert!(cache.refresh_token().is_none());
        assert!(cache.session(now).is_none());
    }

    #[test]
    fn test_save_load_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("tokens.json");
        let now = Utc::now();

        let mut cache = TokenCache::default();
        cache.store(&scopes(), response(3600), now).unwrap();
        cache.save(&path).unwrap();

        let loaded = TokenCache::load(&path).unwrap();
        assert_eq!(loaded.refresh_token(), Some("rt-1"));
        assert!(loaded.access_token(&scopes(), now).is_some());
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let cache = TokenCache::load(&dir.path().join("absent.json")).unwrap();
        assert!(cache.refresh_token().is_none());
    }

    #[test]
    fn test_load_corrupt_file_errors() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("tokens.json");
        std::fs::write(&path, "{ nope").unwrap();
        assert!(matches!(TokenCache::load(&path), Err(AuthError::Cache(_))));
    }
}
