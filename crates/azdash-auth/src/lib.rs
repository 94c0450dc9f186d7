//! Authentication primitives for azdash.
//!
//! Provides:
//! - [`AuthPolicy`] — Write-once policy: is auth on, and with which provider
//! - [`ConfigFetcher`] — Fetches the policy from the backend at startup, never fails
//! - [`IdentityClient`] — Trait for identity providers (implement per provider)
//! - [`RouteGuard`] — Gate run before protected views
//! - [`AuthError`] — Auth-specific error types

mod error;
mod fetcher;
mod guard;
mod identity;
mod policy;

pub use error::AuthError;
pub use fetcher::{CONFIG_PATH, ConfigFetcher, DEFAULT_TIMEOUT, config_endpoint, resolve};
pub use guard::{GuardDecision, RouteGuard};
pub use identity::{AccessToken, AuthFuture, IdentityClient, Session};
pub use policy::{AuthPolicy, RawConfigResponse};
