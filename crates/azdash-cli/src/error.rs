//! Error types for azdash-cli

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type alias for azdash-cli operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in azdash-cli
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Bad or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem failure on a specific path
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The dashboard is behind sign-in and the user did not complete it
    #[error("Sign-in required: {0}")]
    SignInRequired(String),

    /// Error from azdash-client
    #[error(transparent)]
    Client(#[from] azdash_client::Error),

    /// Error from azdash-auth
    #[error(transparent)]
    Auth(#[from] azdash_auth::AuthError),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    pub fn io_with_path(source: std::io::Error, path: &Path) -> Self {
        Error::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
