use chrono::Utc;

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::token::{request_token, TokenRecord};

/// Exchanges a stored refresh token for a new access token.
///
/// The returned record always keeps the stored `refresh_token`. The
/// caller is responsible for persisting it.
pub async fn refresh_token(
    http: &reqwest::Client,
    settings: &Settings,
    refresh_token: &str,
) -> Result<TokenRecord> {
    tracing::debug!(token_uri = %settings.token_uri, "Refreshing access token");

    let form = [
        ("client_id", settings.client_id.as_str()),
        ("client_secret", settings.client_secret.as_str()),
        ("refresh_token", refresh_token),
        ("grant_type", "refresh_token"),
    ];
    let response =
        request_token(http, &settings.token_uri, &form, |status| {
            Error::RefreshFailed { status }
        })
        .await?;

    TokenRecord::issue(response, Utc::now(), Some(refresh_token))
}
