//! Fakes shared by the unit tests.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};

use chrono::Utc;

use crate::BoxFuture;
use crate::config::{ClientSecret, GoogleConfig, OAuthCredentials};
use crate::credential::{Credential, TokenGrant};
use crate::error::AuthError;
use crate::oauth::OAuthFlow;

/// OAuth flow that never leaves the process.
#[derive(Default)]
pub struct FakeFlow {
    pub authorize_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub deny: bool,
    pub refresh_rejected: bool,
    /// Issue access tokens that are already inside the expiry margin.
    pub short_lived: bool,
}

impl FakeFlow {
    pub fn denying() -> Self {
        Self {
            deny: true,
            ..Default::default()
        }
    }

    pub fn counts(&self) -> (usize, usize) {
        (
            self.authorize_calls.load(Ordering::SeqCst),
            self.refresh_calls.load(Ordering::SeqCst),
        )
    }
}

impl OAuthFlow for FakeFlow {
    fn authorize<'a>(&'a self, scopes: &'a [String]) -> BoxFuture<'a, Result<Credential, AuthError>> {
        Box::pin(async move {
            self.authorize_calls.fetch_add(1, Ordering::SeqCst);
            if self.deny {
                return Err(AuthError::flow("access denied: access_denied"));
            }
            let lifetime = if self.short_lived { 30 } else { 3600 };
            let grant = TokenGrant::new("fresh-access", Some(lifetime)).with_refresh_token("fresh-refresh");
            Ok(Credential::from_grant(grant, scopes, Utc::now()))
        })
    }

    fn refresh<'a>(&'a self, refresh_token: &'a str) -> BoxFuture<'a, Result<TokenGrant, AuthError>> {
        Box::pin(async move {
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            assert!(matches!(refresh_token, "stored-refresh" | "fresh-refresh"));
            if self.refresh_rejected {
                return Err(AuthError::refresh("invalid_grant (400 Bad Request)"));
            }
            Ok(TokenGrant::new("refreshed-access", Some(3600)))
        })
    }
}

/// Config with an inline client and the token file inside `dir`.
pub fn config(dir: &tempfile::TempDir) -> GoogleConfig {
    GoogleConfig::new(ClientSecret::Inline(OAuthCredentials::new(
        "test.apps.googleusercontent.com",
        "secret",
    )))
    .with_token_path(dir.path().join("token.json"))
}

/// Answers a single HTTP request and hands back what was received.
pub fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(&stream);
        let mut request = String::new();
        let mut content_length = 0;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                content_length = value.trim().parse().unwrap();
            }
            request.push_str(&line);
            if line.trim().is_empty() {
                break;
            }
        }
        let mut body_bytes = vec![0u8; content_length];
        reader.read_exact(&mut body_bytes).unwrap();
        request.push_str(&String::from_utf8(body_bytes).unwrap());

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        (&stream).write_all(response.as_bytes()).unwrap();
        request
    });

    (base, handle)
}
