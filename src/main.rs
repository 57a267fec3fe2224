mod auth;
mod authorize;
mod broadcast;
mod callback;
mod config;
mod error;
mod refresh;
mod store;
mod token;

#[cfg(test)]
mod testing;

use auth::TokenManager;
use authorize::{Browser, SystemBrowser};
use broadcast::fetch_active_viewer_count;
use config::{load_env, AppPaths, Settings};
use error::Result;
use store::CredentialStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env before anything reads the environment.
    let env_loaded = load_env();

    // Logs go to stderr; stdout carries only the result.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    if let Err(err) = env_loaded {
        tracing::warn!("Ignoring unreadable .env file: {err}");
    }

    let outcome = match AppPaths::resolve() {
        Ok(paths) => run(&paths, &SystemBrowser).await,
        Err(err) => Err(err),
    };
    println!("{}", report(outcome));
}

/// Every outcome, including failure, is a single line on stdout.
fn report(outcome: Result<i64>) -> String {
    match outcome {
        Ok(viewers) => viewers.to_string(),
        Err(err) => err.to_string(),
    }
}

async fn run(paths: &AppPaths, browser: &dyn Browser) -> Result<i64> {
    let settings = Settings::load(&paths.settings)?;
    let store = CredentialStore::new(&paths.token);
    let http = reqwest::Client::new();

    let token = TokenManager::new(&settings, &store, &http, browser)
        .ensure_token()
        .await?;

    fetch_active_viewer_count(&http, &settings.broadcasts_uri, &token.access_token)
        .await
}
