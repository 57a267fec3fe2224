//! The persisted token record and the token endpoint's wire format.

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Token as stored in the credential file.
///
/// `expires_at` is absolute (milliseconds since the Unix epoch) so a
/// reloaded record needs no recomputation. `expires_in` is kept for
/// reference only.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: i64,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub scope: String,
    pub refresh_token: String,
    pub expires_at: i64,
}

impl TokenRecord {
    /// Builds a record from a token endpoint response received at `now`.
    ///
    /// On a refresh, `previous_refresh_token` is the stored token and is
    /// always carried forward, whatever the response contains. Without it
    /// the response must supply one.
    pub fn issue(
        response: TokenResponse,
        now: DateTime<Utc>,
        previous_refresh_token: Option<&str>,
    ) -> Result<Self> {
        let refresh_token = match previous_refresh_token {
            Some(previous) => previous.to_string(),
            None => response
                .refresh_token
                .filter(|token| !token.is_empty())
                .ok_or(Error::MissingRefreshToken)?,
        };
        let expires_in = response.expires_in.unwrap_or(0);
        // Saturates rather than wrapping on huge lifetimes.
        let expires_at = now
            .timestamp_millis()
            .saturating_add(expires_in.saturating_mul(1000));

        Ok(Self {
            access_token: response.access_token,
            expires_in,
            token_type: response.token_type.unwrap_or_default(),
            scope: response.scope.unwrap_or_default(),
            refresh_token,
            expires_at,
        })
    }

    /// A record is fresh strictly before its expiry instant.
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp_millis() < self.expires_at
    }
}

impl fmt::Debug for TokenRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRecord")
            .field("access_token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .field("refresh_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Successful response body from the token endpoint.
#[derive(Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// POSTs a form-encoded grant to the token endpoint.
///
/// A non-success status is turned into an error by `on_failure`.
pub(crate) async fn request_token(
    http: &reqwest::Client,
    token_uri: &str,
    form: &[(&str, &str)],
    on_failure: fn(StatusCode) -> Error,
) -> Result<TokenResponse> {
    let response = http.post(token_uri).form(form).send().await?;
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(%status, %body, "Token endpoint rejected request");
        return Err(on_failure(status));
    }

    Ok(response.json::<TokenResponse>().await?)
}
