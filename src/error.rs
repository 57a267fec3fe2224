use reqwest::StatusCode;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Every failure is fatal to the run; `main` prints the message.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to load settings from {}: {source}", .path.display())]
    SettingsLoad {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to parse existing token response: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Failed to get OAuth token ({status})")]
    AuthExchangeFailed { status: StatusCode },

    #[error(
        "Failed to refresh OAuth token ({status}); \
         delete tokenResponse.json to sign in again"
    )]
    RefreshFailed { status: StatusCode },

    #[error("Failed to get broadcast ({status})")]
    BroadcastFetchFailed { status: StatusCode },

    #[error("Authorization was denied: {0}")]
    AuthorizationDenied(String),

    #[error("Authorization callback did not carry a code")]
    MissingAuthorizationCode,

    #[error("Token endpoint did not return a refresh token")]
    MissingRefreshToken,

    #[error("Callback listener stopped before a request arrived")]
    ListenerClosed,

    #[error("Active broadcast has no concurrent viewer count")]
    MissingViewerCount,

    #[error("Invalid URI {uri}: {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("Could not open browser: {0}")]
    Browser(#[source] io::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn invalid_uri(uri: &str, reason: impl ToString) -> Self {
        Error::InvalidUri {
            uri: uri.to_string(),
            reason: reason.to_string(),
        }
    }
}
