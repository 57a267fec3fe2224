//! One-shot local listener for the OAuth redirect.
//!
//! The first request that reaches the listener is handed to the caller as
//! a [`Callback`]. The browser's request is held open until the callback
//! is answered or dropped, and then always receives the confirmation page.

use axum::extract::{RawQuery, State};
use axum::response::Html;
use axum::Router;
use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use url::Url;

use crate::error::{Error, Result};

pub const CONFIRMATION_PAGE: &str =
    "<html><body><h1>You may now close this window.</h1></body></html>";

type CallbackSlot = Arc<Mutex<Option<oneshot::Sender<Callback>>>>;

/// The redirect request captured by the listener.
#[derive(Debug)]
pub struct Callback {
    params: HashMap<String, String>,
    reply: oneshot::Sender<()>,
}

impl Callback {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Releases the browser's request. Dropping the callback does the same.
    pub fn respond(self) {
        let _ = self.reply.send(());
    }
}

/// HTTP listener bound to the redirect URI's host and port.
///
/// Dropping it stops the server, so every exit path releases the socket.
/// [`CallbackListener::shutdown`] additionally waits for the server to
/// finish writing pending responses.
pub struct CallbackListener {
    local_addr: SocketAddr,
    callback_rx: oneshot::Receiver<Callback>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    server: Option<JoinHandle<std::io::Result<()>>>,
}

impl CallbackListener {
    pub async fn bind(redirect_uri: &Url) -> Result<Self> {
        let port = redirect_uri.port_or_known_default().ok_or_else(|| {
            Error::invalid_uri(redirect_uri.as_str(), "no port")
        })?;
        let listener = match redirect_uri.host_str() {
            Some("localhost") | None => {
                TcpListener::bind((Ipv4Addr::LOCALHOST, port)).await?
            }
            Some(host) => {
                let host = host.trim_start_matches('[').trim_end_matches(']');
                TcpListener::bind((host, port)).await?
            }
        };
        let local_addr = listener.local_addr()?;

        let (callback_tx, callback_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let slot: CallbackSlot = Arc::new(Mutex::new(Some(callback_tx)));
        let app = Router::new().fallback(receive_callback).with_state(slot);

        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
        });
        tracing::debug!(%local_addr, "Callback listener started");

        Ok(Self {
            local_addr,
            callback_rx,
            shutdown_tx: Some(shutdown_tx),
            server: Some(server),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Waits, without a timeout, for the first inbound request.
    pub async fn accept(&mut self) -> Result<Callback> {
        (&mut self.callback_rx)
            .await
            .map_err(|_| Error::ListenerClosed)
    }

    /// Stops accepting connections and waits for in-flight responses.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(server) = self.server.take() {
            match server.await {
                Ok(Ok(())) => tracing::debug!("Callback listener stopped"),
                Ok(Err(err)) => {
                    tracing::warn!("Callback listener failed: {err}")
                }
                Err(err) => {
                    tracing::warn!("Callback listener task failed: {err}")
                }
            }
        }
    }
}

impl Drop for CallbackListener {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(server) = self.server.take() {
            server.abort();
        }
    }
}

async fn receive_callback(
    State(slot): State<CallbackSlot>,
    RawQuery(query): RawQuery,
) -> Html<&'static str> {
    let sender = slot.lock().ok().and_then(|mut pending| pending.take());
    let Some(sender) = sender else {
        return Html(CONFIRMATION_PAGE);
    };

    let query = query.unwrap_or_default();
    let params = url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect();
    let (reply_tx, reply_rx) = oneshot::channel();
    let _ = sender.send(Callback {
        params,
        reply: reply_tx,
    });
    let _ = reply_rx.await;

    Html(CONFIRMATION_PAGE)
}
