//! Error types for the azdash client.

use azdash_auth::AuthError;

/// Errors raised while talking to the azdash API.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Token acquisition or sign-in failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Network or decoding failure from the HTTP client.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-2xx status.
    #[error("{url} returned HTTP {status}")]
    Status { status: u16, url: String },

    /// A request URL could not be built from the API root.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Navigation could not be resolved to a view.
    #[error("navigation failed: {0}")]
    Navigation(String),
}

impl Error {
    /// Whether the failure means the user has to sign in again.
    pub fn is_interaction_required(&self) -> bool {
        matches!(self, Error::Auth(e) if e.is_interaction_required())
    }
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;
