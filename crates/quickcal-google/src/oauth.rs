//! OAuth 2.0 authorization code flow with PKCE and a loopback redirect.
//!
//! # Flow
//!
//! 1. Resolve the client secret (inline or from the Cloud Console JSON)
//! 2. Bind a listener on 127.0.0.1 and derive the redirect URI from it
//! 3. Send the user's browser to the consent page with an S256 challenge
//! 4. Block until the browser is redirected back with `code` and `state`
//! 5. Exchange the code and verifier for tokens
//!
//! Refreshing uses the same token endpoint with the `refresh_token` grant.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use rand::Rng as _;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};

use crate::BoxFuture;
use crate::config::{ClientSecret, Endpoints, GoogleConfig, OAuthCredentials};
use crate::credential::{Credential, TokenGrant};
use crate::error::AuthError;

/// Length of the PKCE verifier before encoding.
const VERIFIER_BYTES: usize = 32;

const CALLBACK_PATH: &str = "/callback";

/// The two token-endpoint operations the authenticator relies on.
pub trait OAuthFlow: Send + Sync {
    /// Runs the interactive consent flow and returns a fresh credential.
    fn authorize<'a>(&'a self, scopes: &'a [String]) -> BoxFuture<'a, Result<Credential, AuthError>>;

    /// Trades a refresh token for a new access token.
    fn refresh<'a>(&'a self, refresh_token: &'a str) -> BoxFuture<'a, Result<TokenGrant, AuthError>>;
}

/// Talks to Google's OAuth endpoints.
#[derive(Debug)]
pub struct OAuthClient {
    client_secret: ClientSecret,
    endpoints: Endpoints,
    port_range: (u16, u16),
    callback_timeout: Option<Duration>,
    open_browser: bool,
    http_client: reqwest::Client,
}

impl OAuthClient {
    pub fn new(config: &GoogleConfig) -> Result<Self, AuthError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AuthError::flow(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client_secret: config.client_secret.clone(),
            endpoints: config.endpoints.clone(),
            port_range: config.loopback_port_range,
            callback_timeout: config.callback_timeout,
            open_browser: config.open_browser,
            http_client,
        })
    }

    async fn run_consent_flow(&self, scopes: &[String]) -> Result<Credential, AuthError> {
        let credentials = self.client_secret.resolve().map_err(AuthError::flow)?;
        let pkce = Pkce::new();

        let (listener, port) = bind_loopback(self.port_range)?;
        let redirect_uri = format!("http://127.0.0.1:{}{}", port, CALLBACK_PATH);
        let auth_url = pkce.auth_url(
            &self.endpoints.auth_url,
            &credentials.client_id,
            &redirect_uri,
            scopes,
        );

        info!("waiting for browser consent on port {}", port);
        debug!("authorization URL: {}", auth_url);

        eprintln!("\nOpen this URL in your browser to grant calendar access:\n\n{}\n", auth_url);
        if self.open_browser {
            if let Err(e) = open::that(&auth_url) {
                warn!("failed to open browser: {}", e);
            }
        }

        let (code, state) = wait_for_callback(listener, self.callback_timeout)?;
        check_state(&pkce.state, state.as_deref())?;

        info!("received authorization code, exchanging for tokens");
        let params = [
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("code", code.as_str()),
            ("code_verifier", pkce.verifier.as_str()),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri.as_str()),
        ];
        let grant = self
            .request_token(&params)
            .await
            .map_err(|e| AuthError::flow(format!("token exchange failed: {}", e)))?;

        Ok(Credential::from_grant(grant, scopes, Utc::now()))
    }

    async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenGrant, AuthError> {
        let OAuthCredentials {
            client_id,
            client_secret,
        } = self.client_secret.resolve().map_err(AuthError::refresh)?;

        let params = [
            ("client_id", client_id.as_str()),
            ("client_secret", client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];
        let grant = self.request_token(&params).await.map_err(AuthError::refresh)?;

        info!("refreshed access token");
        Ok(grant)
    }

    /// Posts a form to the token endpoint and decodes the grant.
    async fn request_token(&self, params: &[(&str, &str)]) -> Result<TokenGrant, String> {
        let response = self
            .http_client
            .post(&self.endpoints.token_url)
            .form(params)
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| format!("failed to read response: {}", e))?;

        if !status.is_success() {
            return Err(describe_token_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| format!("invalid token response: {}", e))
    }
}

impl OAuthFlow for OAuthClient {
    fn authorize<'a>(&'a self, scopes: &'a [String]) -> BoxFuture<'a, Result<Credential, AuthError>> {
        Box::pin(self.run_consent_flow(scopes))
    }

    fn refresh<'a>(&'a self, refresh_token: &'a str) -> BoxFuture<'a, Result<TokenGrant, AuthError>> {
        Box::pin(self.refresh_access_token(refresh_token))
    }
}

#[derive(Debug, Deserialize)]
struct TokenErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

fn describe_token_error(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<TokenErrorBody>(body) {
        Ok(TokenErrorBody {
            error,
            error_description: Some(description),
        }) => format!("{} ({}): {}", error, status, description),
        Ok(TokenErrorBody { error, .. }) => format!("{} ({})", error, status),
        Err(_) => format!("{}: {}", status, body.trim()),
    }
}

/// Binds the first free port in `range` on the loopback interface.
fn bind_loopback(range: (u16, u16)) -> Result<(TcpListener, u16), AuthError> {
    for port in range.0..=range.1 {
        let Ok(listener) = TcpListener::bind(("127.0.0.1", port)) else {
            continue;
        };
        let bound = listener
            .local_addr()
            .map_err(|e| AuthError::flow(format!("failed to read listener address: {}", e)))?
            .port();
        debug!("loopback listener bound on port {}", bound);
        return Ok((listener, bound));
    }
    Err(AuthError::flow(format!(
        "no free loopback port in range {}-{}",
        range.0, range.1
    )))
}

/// Waits for the redirect and returns `(code, state)`.
///
/// Requests for other paths (a browser's favicon probe, for example) are
/// ignored. With `timeout` unset this waits until the process ends.
fn wait_for_callback(
    listener: TcpListener,
    timeout: Option<Duration>,
) -> Result<(String, Option<String>), AuthError> {
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    if let Some(result) = answer_callback(stream) {
                        let _ = tx.send(result);
                        return;
                    }
                }
                Err(e) => error!("failed to accept redirect connection: {}", e),
            }
        }
    });

    let received = match timeout {
        Some(limit) => rx.recv_timeout(limit).map_err(|e| match e {
            mpsc::RecvTimeoutError::Timeout => {
                AuthError::flow(format!("no browser redirect within {}s", limit.as_secs()))
            }
            mpsc::RecvTimeoutError::Disconnected => {
                AuthError::flow("redirect listener stopped unexpectedly")
            }
        }),
        None => rx
            .recv()
            .map_err(|_| AuthError::flow("redirect listener stopped unexpectedly")),
    };
    received?
}

/// Rejects a redirect whose `state` is not the one sent with the request.
fn check_state(expected: &str, received: Option<&str>) -> Result<(), AuthError> {
    if received == Some(expected) {
        Ok(())
    } else {
        Err(AuthError::flow("OAuth state mismatch in redirect"))
    }
}

/// Outcome of one request to the loopback listener.
#[derive(Debug, PartialEq, Eq)]
enum Callback {
    Code { code: String, state: Option<String> },
    Denied(String),
    MissingCode,
}

/// Parses `GET /callback?... HTTP/1.1`; `None` for unrelated requests.
fn parse_callback(request_line: &str) -> Option<Callback> {
    let mut parts = request_line.split_whitespace();
    if parts.next()? != "GET" {
        return None;
    }
    let target = parts.next()?;
    let url = url::Url::parse(&format!("http://127.0.0.1{}", target)).ok()?;
    if url.path() != CALLBACK_PATH {
        return None;
    }

    let mut code = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => return Some(Callback::Denied(value.into_owned())),
            _ => {}
        }
    }

    Some(match code {
        Some(code) => Callback::Code { code, state },
        None => Callback::MissingCode,
    })
}

fn answer_callback(mut stream: TcpStream) -> Option<Result<(String, Option<String>), AuthError>> {
    let mut request_line = String::new();
    {
        let mut reader = BufReader::new(&stream);
        reader.read_line(&mut request_line).ok()?;
        // Drain the headers so closing the socket does not reset the peer.
        let mut header = String::new();
        loop {
            header.clear();
            match reader.read_line(&mut header) {
                Ok(n) if n > 0 && !header.trim().is_empty() => continue,
                _ => break,
            }
        }
    }
    let callback = parse_callback(&request_line)?;

    let (status, heading) = match callback {
        Callback::Code { .. } => ("200 OK", "Calendar access granted"),
        _ => ("400 Bad Request", "Authorization failed"),
    };
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n\
         <html><body><h1>{}</h1><p>You can close this window.</p></body></html>",
        status, heading
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();

    Some(match callback {
        Callback::Code { code, state } => Ok((code, state)),
        Callback::Denied(reason) => Err(AuthError::flow(format!("access denied: {}", reason))),
        Callback::MissingCode => Err(AuthError::flow("redirect carried no authorization code")),
    })
}

/// PKCE verifier, challenge and anti-CSRF state for one authorization.
#[derive(Debug)]
pub struct Pkce {
    pub verifier: String,
    pub challenge: String,
    pub state: String,
}

impl Pkce {
    pub fn new() -> Self {
        let verifier = random_token(VERIFIER_BYTES);
        Self {
            challenge: challenge_for(&verifier),
            verifier,
            state: random_token(16),
        }
    }

    /// Builds the consent page URL.
    ///
    /// `access_type=offline` with `prompt=consent` makes Google return a
    /// refresh token every time.
    pub fn auth_url(
        &self,
        base: &str,
        client_id: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&\
             code_challenge={}&code_challenge_method=S256&state={}&\
             access_type=offline&prompt=consent",
            base,
            urlencoding::encode(client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&scopes.join(" ")),
            urlencoding::encode(&self.challenge),
            urlencoding::encode(&self.state),
        )
    }
}

impl Default for Pkce {
    fn default() -> Self {
        Self::new()
    }
}

fn random_token(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::rng().fill(bytes.as_mut_slice());
    URL_SAFE_NO_PAD.encode(&bytes)
}

fn challenge_for(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}
