use chrono::{DateTime, Utc};

use crate::authorize::{authorize, Browser};
use crate::config::Settings;
use crate::error::Result;
use crate::refresh::refresh_token;
use crate::store::CredentialStore;
use crate::token::TokenRecord;

/// What the credential file says about the current token.
#[derive(Debug, PartialEq, Eq)]
pub enum TokenState {
    Absent,
    Fresh(TokenRecord),
    Stale(TokenRecord),
}

impl TokenState {
    pub fn classify(stored: Option<TokenRecord>, now: DateTime<Utc>) -> Self {
        match stored {
            None => TokenState::Absent,
            Some(record) if record.is_fresh_at(now) => TokenState::Fresh(record),
            Some(record) => TokenState::Stale(record),
        }
    }
}

/// Produces a usable access token, reusing, refreshing or authorizing
/// as the stored state requires.
pub struct TokenManager<'a> {
    settings: &'a Settings,
    store: &'a CredentialStore,
    http: &'a reqwest::Client,
    browser: &'a dyn Browser,
}

impl<'a> TokenManager<'a> {
    pub fn new(
        settings: &'a Settings,
        store: &'a CredentialStore,
        http: &'a reqwest::Client,
        browser: &'a dyn Browser,
    ) -> Self {
        Self {
            settings,
            store,
            http,
            browser,
        }
    }

    /// Any network failure is returned as is; a failed refresh does not
    /// fall back to the browser flow.
    pub async fn ensure_token(&self) -> Result<TokenRecord> {
        let stored = self.store.load()?;

        let record = match TokenState::classify(stored, Utc::now()) {
            TokenState::Fresh(record) => {
                tracing::info!("Stored access token is still valid");
                return Ok(record);
            }
            TokenState::Stale(record) => {
                tracing::info!("Stored access token expired, refreshing");
                refresh_token(self.http, self.settings, &record.refresh_token)
                    .await?
            }
            TokenState::Absent => {
                tracing::info!(
                    path = %self.store.path().display(),
                    "No stored token, starting browser authorization"
                );
                authorize(self.http, self.settings, self.browser).await?
            }
        };

        self.store.save(&record)?;
        Ok(record)
    }
}
