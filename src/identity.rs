//! Identity provider client: OAuth 2.0 authorization code + PKCE over a
//! loopback redirect.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use url::Url;

use crate::auth::{AccessToken, AuthLibrary, TokenRequest};
use crate::error::{DriveError, Result};
use crate::models::{IdentityDiscovery, TokenResponse};
use crate::pkce::{generate_code_challenge, generate_code_verifier, generate_state};
use crate::Outcome;

/// OpenID discovery document for the vendor's identity provider.
pub const IDENTITY_DISCOVERY_URL: &str = "https://accounts.google.com/.well-known/openid-configuration";

/// Shows the consent URL to the user.
pub type ConsentPresenter = Arc<dyn Fn(&Url) + Send + Sync>;

/// Presenter that opens the system browser and prints the URL as a fallback.
pub fn open_in_browser() -> ConsentPresenter {
    Arc::new(|url: &Url| {
        eprintln!("Opening your browser to authorize access...");
        if let Err(e) = open::that(url.as_str()) {
            warn!(error = %e, "failed to open browser");
            eprintln!("Open this URL to continue:\n{}", url);
        }
    })
}

/// What came back on the loopback redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callback {
    Code { code: String, state: String },
    Error { error: String, description: Option<String> },
}

/// Parse the request line of a redirect hit, e.g. `GET /?code=..&state=.. HTTP/1.1`.
///
/// Returns `None` for requests that are not OAuth callbacks (favicon probes).
pub fn parse_callback(request_line: &str) -> Option<Callback> {
    let target = request_line.split_whitespace().nth(1)?;
    let url = Url::parse(&format!("http://127.0.0.1{}", target)).ok()?;

    let mut code = None;
    let mut state = None;
    let mut error = None;
    let mut description = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            "error_description" => description = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Some(Callback::Error { error, description });
    }
    Some(Callback::Code {
        code: code?,
        state: state?,
    })
}

/// Loaded identity client.
pub struct GoogleIdentity {
    http: Client,
    authorization_endpoint: String,
    token_endpoint: String,
    client_secret: Option<String>,
    presenter: ConsentPresenter,
}

impl GoogleIdentity {
    /// Fetch the discovery document and build a client from it.
    pub async fn load(
        http: Client,
        discovery_url: &str,
        client_secret: Option<String>,
        presenter: ConsentPresenter,
    ) -> Result<Self> {
        debug!(url = discovery_url, "loading identity discovery document");
        let response = http.get(discovery_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DriveError::ApiError {
                status: status.as_u16(),
                message: format!("identity discovery failed: {}", discovery_url),
            });
        }
        let discovery: IdentityDiscovery = response.json().await?;

        Ok(Self {
            http,
            authorization_endpoint: discovery.authorization_endpoint,
            token_endpoint: discovery.token_endpoint,
            client_secret,
            presenter,
        })
    }

    pub fn authorization_url(
        &self,
        request: TokenRequest<'_>,
        redirect_uri: &str,
        state: &str,
        code_challenge: &str,
    ) -> Result<Url> {
        Url::parse_with_params(
            &self.authorization_endpoint,
            &[
                ("client_id", request.client_id),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("scope", request.scope),
                ("state", state),
                ("code_challenge", code_challenge),
                ("code_challenge_method", "S256"),
            ],
        )
        .map_err(|_| DriveError::InvalidUrlOrId(self.authorization_endpoint.clone()))
    }

    async fn exchange_code(
        &self,
        client_id: &str,
        code: &str,
        code_verifier: &str,
        redirect_uri: &str,
    ) -> Result<AccessToken> {
        let mut params = vec![
            ("grant_type", "authorization_code"),
            ("client_id", client_id),
            ("code", code),
            ("code_verifier", code_verifier),
            ("redirect_uri", redirect_uri),
        ];
        if let Some(secret) = self.client_secret.as_deref() {
            params.push(("client_secret", secret));
        }

        let response = self
            .http
            .post(&self.token_endpoint)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DriveError::AuthenticationError(format!(
                "Status {}: {}",
                status, body
            )));
        }

        let token_response: TokenResponse = response.json().await?;
        debug!(
            token_type = token_response.token_type.as_deref().unwrap_or("-"),
            expires_in = token_response.expires_in.unwrap_or_default(),
            "authorization code exchanged"
        );
        Ok(AccessToken::new(token_response.access_token))
    }
}

/// How long a redirect connection may stay silent before it is dropped.
const CALLBACK_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Accept redirect hits until one carries an OAuth result.
///
/// Each connection is read on its own task, so an idle preconnect or an
/// unreadable request never holds up the real callback.
async fn await_callback(listener: &TcpListener) -> Result<(Callback, TcpStream)> {
    let (hits_tx, mut hits_rx) = mpsc::channel(1);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (socket, peer) = accepted?;
                debug!(%peer, "redirect connection accepted");
                tokio::spawn(read_callback(socket, hits_tx.clone()));
            }
            Some(hit) = hits_rx.recv() => return Ok(hit),
        }
    }
}

async fn read_callback(mut socket: TcpStream, hits: mpsc::Sender<(Callback, TcpStream)>) {
    let mut request_line = String::new();
    let read = tokio::time::timeout(
        CALLBACK_READ_TIMEOUT,
        BufReader::new(&mut socket).read_line(&mut request_line),
    )
    .await;

    match read {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => {
            debug!(error = %e, "dropping unreadable redirect connection");
            return;
        }
        Err(_) => {
            debug!("dropping idle redirect connection");
            return;
        }
    }

    match parse_callback(&request_line) {
        Some(callback) => {
            // The receiver is gone once another connection delivered first.
            let _ = hits.send((callback, socket)).await;
        }
        None => reply(&mut socket, "404 Not Found", "Waiting for authorization...").await,
    }
}

/// Answer the browser. The flow does not depend on the page arriving.
async fn reply(socket: &mut TcpStream, status: &str, message: &str) {
    if let Err(e) = send_page(socket, status, message).await {
        debug!(error = %e, "failed to answer redirect");
    }
}

async fn send_page(socket: &mut TcpStream, status: &str, message: &str) -> std::io::Result<()> {
    let body = format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>drive_pick</title></head>\
         <body><p>{}</p></body></html>",
        message
    );
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    socket.write_all(response.as_bytes()).await?;
    socket.flush().await
}

#[async_trait]
impl AuthLibrary for GoogleIdentity {
    async fn request_access_token(&self, request: TokenRequest<'_>) -> Result<Outcome<AccessToken>> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let redirect_uri = format!("http://127.0.0.1:{}", listener.local_addr()?.port());

        let code_verifier = generate_code_verifier();
        let state = generate_state();
        let url = self.authorization_url(
            request,
            &redirect_uri,
            &state,
            &generate_code_challenge(&code_verifier),
        )?;

        info!(redirect_uri = %redirect_uri, "waiting for consent");
        (self.presenter)(&url);

        let (callback, mut socket) = await_callback(&listener).await?;
        match callback {
            Callback::Error { error, .. } if error == "access_denied" => {
                reply(&mut socket, "200 OK", "Access was not granted. You can close this tab.").await;
                Ok(Outcome::Aborted)
            }
            Callback::Error { error, description } => {
                reply(&mut socket, "400 Bad Request", "Authorization failed.").await;
                Err(DriveError::AuthenticationError(match description {
                    Some(description) => format!("{}: {}", error, description),
                    None => error,
                }))
            }
            Callback::Code {
                state: received, ..
            } if received != state => {
                reply(&mut socket, "400 Bad Request", "Invalid state parameter.").await;
                Err(DriveError::AuthenticationError("state mismatch".to_string()))
            }
            Callback::Code { code, .. } => {
                reply(&mut socket, "200 OK", "Authorized. You can close this tab.").await;
                let token = self
                    .exchange_code(request.client_id, &code, &code_verifier, &redirect_uri)
                    .await?;
                Ok(Outcome::Completed(token))
            }
        }
    }
}
