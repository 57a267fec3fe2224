//! Helpers shared by the unit tests.

use std::io;
use std::sync::Mutex;
use tokio::task::JoinHandle;
use url::Url;

use crate::authorize::Browser;
use crate::config::Settings;

pub fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Settings pointing every endpoint at `server_uri`.
pub fn settings_for(server_uri: &str, redirect_uri: &str) -> Settings {
    Settings {
        client_id: "client-id".to_string(),
        client_secret: "client-secret".to_string(),
        redirect_uri: redirect_uri.to_string(),
        token_uri: format!("{server_uri}/token"),
        auth_uri: format!("{server_uri}/auth"),
        scopes: "s".to_string(),
        broadcasts_uri: format!("{server_uri}/liveBroadcasts"),
    }
}

/// Plays the user's part: follows the redirect with the given query.
pub struct RedirectingBrowser {
    query: String,
    opened: Mutex<Vec<String>>,
    page: Mutex<Option<JoinHandle<String>>>,
}

impl RedirectingBrowser {
    pub fn new(query: &str) -> Self {
        Self {
            query: query.to_string(),
            opened: Mutex::new(Vec::new()),
            page: Mutex::new(None),
        }
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }

    /// Body the listener returned to the browser.
    pub async fn page(&self) -> String {
        let handle = self.page.lock().unwrap().take().unwrap();
        handle.await.unwrap()
    }
}

impl Browser for RedirectingBrowser {
    fn open(&self, url: &str) -> io::Result<()> {
        self.opened.lock().unwrap().push(url.to_string());

        let auth_url = Url::parse(url).unwrap();
        let (_, redirect) = auth_url
            .query_pairs()
            .find(|(key, _)| key == "redirect_uri")
            .unwrap();
        let target = format!("{}?{}", redirect, self.query);

        let handle = tokio::spawn(async move {
            reqwest::get(target).await.unwrap().text().await.unwrap()
        });
        *self.page.lock().unwrap() = Some(handle);
        Ok(())
    }
}

/// Fails the test if the authorization flow is started.
pub struct UnreachableBrowser;

impl Browser for UnreachableBrowser {
    fn open(&self, url: &str) -> io::Result<()> {
        panic!("browser should not be opened, got {url}");
    }
}
