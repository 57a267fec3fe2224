//! Interactive authorization-code flow through the system browser.

use chrono::Utc;
use std::io;
use url::Url;

use crate::callback::{Callback, CallbackListener};
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::token::{request_token, TokenRecord};

/// Something that can show the consent page to the user.
pub trait Browser: Send + Sync {
    fn open(&self, url: &str) -> io::Result<()>;
}

/// The platform's default browser.
pub struct SystemBrowser;

impl Browser for SystemBrowser {
    fn open(&self, url: &str) -> io::Result<()> {
        webbrowser::open(url)
    }
}

/// Builds the consent page URL, asking for offline access so the grant
/// includes a refresh token.
pub fn authorization_url(settings: &Settings) -> Result<Url> {
    Url::parse_with_params(
        &settings.auth_uri,
        &[
            ("client_id", settings.client_id.as_str()),
            ("redirect_uri", settings.redirect_uri.as_str()),
            ("response_type", "code"),
            ("scope", settings.scopes.as_str()),
            ("access_type", "offline"),
            ("prompt", "consent"),
        ],
    )
    .map_err(|err| Error::invalid_uri(&settings.auth_uri, err))
}

/// Runs the browser flow and returns the initial token.
///
/// Blocks until the redirect arrives; there is no timeout. Whatever the
/// exchange outcome, the browser gets the confirmation page and the
/// listener is stopped before returning.
pub async fn authorize(
    http: &reqwest::Client,
    settings: &Settings,
    browser: &dyn Browser,
) -> Result<TokenRecord> {
    let redirect_uri = Url::parse(&settings.redirect_uri)
        .map_err(|err| Error::invalid_uri(&settings.redirect_uri, err))?;
    let auth_url = authorization_url(settings)?;

    let mut listener = CallbackListener::bind(&redirect_uri).await?;
    tracing::info!(
        addr = %listener.local_addr(),
        "Waiting for authorization redirect"
    );

    eprintln!("Opening browser for authorization:\n\n{auth_url}\n");
    browser.open(auth_url.as_str()).map_err(Error::Browser)?;

    let callback = listener.accept().await?;
    let result = exchange_code(http, settings, &callback).await;

    callback.respond();
    listener.shutdown().await;

    result
}

async fn exchange_code(
    http: &reqwest::Client,
    settings: &Settings,
    callback: &Callback,
) -> Result<TokenRecord> {
    if let Some(error) = callback.param("error") {
        return Err(Error::AuthorizationDenied(error.to_string()));
    }
    let code = callback
        .param("code")
        .ok_or(Error::MissingAuthorizationCode)?;
    tracing::debug!("Exchanging authorization code");

    let form = [
        ("code", code),
        ("client_id", settings.client_id.as_str()),
        ("client_secret", settings.client_secret.as_str()),
        ("redirect_uri", settings.redirect_uri.as_str()),
        ("grant_type", "authorization_code"),
    ];
    let response =
        request_token(http, &settings.token_uri, &form, |status| {
            Error::AuthExchangeFailed { status }
        })
        .await?;

    TokenRecord::issue(response, Utc::now(), None)
}
