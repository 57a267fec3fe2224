use serde::Deserialize;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Overrides the directory holding the settings and credential files.
pub const DIR_ENV: &str = "LIVE_VIEWER_COUNT_DIR";

const SETTINGS_FILE: &str = "appsettings.json";
const TOKEN_FILE: &str = "tokenResponse.json";

const DEFAULT_BROADCASTS_URI: &str =
    "https://youtube.googleapis.com/youtube/v3/liveBroadcasts";

/// OAuth client settings, read once at startup.
#[derive(Clone, Deserialize)]
pub struct Settings {
    #[serde(alias = "ClientId")]
    pub client_id: String,
    #[serde(alias = "ClientSecret")]
    pub client_secret: String,
    #[serde(alias = "RedirectUri")]
    pub redirect_uri: String,
    #[serde(alias = "TokenUri")]
    pub token_uri: String,
    #[serde(alias = "AuthUri")]
    pub auth_uri: String,
    #[serde(alias = "Scopes")]
    pub scopes: String,
    #[serde(alias = "BroadcastsUri", default = "default_broadcasts_uri")]
    pub broadcasts_uri: String,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .field("token_uri", &self.token_uri)
            .field("auth_uri", &self.auth_uri)
            .field("scopes", &self.scopes)
            .field("broadcasts_uri", &self.broadcasts_uri)
            .finish()
    }
}

fn default_broadcasts_uri() -> String {
    DEFAULT_BROADCASTS_URI.to_string()
}

impl Settings {
    /// Reads settings from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let wrap = |source: Box<dyn std::error::Error + Send + Sync>| {
            Error::SettingsLoad {
                path: path.to_path_buf(),
                source,
            }
        };
        let data = fs::read_to_string(path).map_err(|e| wrap(e.into()))?;
        serde_json::from_str(&data).map_err(|e| wrap(e.into()))
    }
}

/// Locations of the files the tool reads and writes.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub settings: PathBuf,
    pub token: PathBuf,
}

impl AppPaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            settings: dir.join(SETTINGS_FILE),
            token: dir.join(TOKEN_FILE),
        }
    }

    /// Uses `LIVE_VIEWER_COUNT_DIR` if set, else the working directory.
    pub fn resolve() -> Result<Self> {
        let dir = match env::var_os(DIR_ENV) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => env::current_dir()?,
        };
        Ok(Self::in_dir(&dir))
    }
}

/// Loads a `.env` file from the working directory, if there is one.
///
/// Runs before logging is set up, so a bad file is returned rather than
/// logged.
pub fn load_env() -> std::result::Result<(), dotenvy::Error> {
    ignore_missing(dotenvy::dotenv().map(|_| ()))
}

fn ignore_missing(
    result: std::result::Result<(), dotenvy::Error>,
) -> std::result::Result<(), dotenvy::Error> {
    match result {
        Err(err) if err.not_found() => Ok(()),
        other => other,
    }
}
