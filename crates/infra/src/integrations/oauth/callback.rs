//! Loopback HTTP listener for OAuth redirects

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use actionarc_domain::{ActionArcError, Result};
use axum::extract::Query;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, warn};

const CALLBACK_PATH: &str = "/callback";
const POLL_INTERVAL: Duration = Duration::from_millis(100);

const SUCCESS_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Sign-in complete</title></head>
<body><h1>ActionArc is signed in</h1><p>You can close this window.</p></body>
</html>"#;

const FAILURE_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Sign-in failed</title></head>
<body><h1>Sign-in failed</h1><p>Invalid or unexpected callback parameters.</p></body>
</html>"#;

/// What the redirect delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
enum CallbackOutcome {
    Code { code: String, state: String },
    /// Provider redirected with `error=...` (e.g. the user declined consent).
    Denied(String),
}

#[derive(Default)]
struct CallbackState {
    expected_state: Option<String>,
    outcome: Option<CallbackOutcome>,
}

type SharedCallbackState = Arc<Mutex<CallbackState>>;

/// Loopback HTTP server that receives OAuth redirect callbacks.
///
/// Only a request carrying the expected `state` completes the login; a
/// mismatched one gets the failure page and the server keeps waiting.
pub struct OAuthCallbackServer {
    port: u16,
    state: SharedCallbackState,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl OAuthCallbackServer {
    /// Start the loopback server on `127.0.0.1:port` (0 = ephemeral).
    pub async fn start(port: u16) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", port)).await.map_err(|err| {
            ActionArcError::Network(format!("failed to bind OAuth loopback server on port {port}: {err}"))
        })?;

        let port = listener
            .local_addr()
            .map_err(|err| ActionArcError::Network(format!("failed to determine port: {err}")))?
            .port();

        let state: SharedCallbackState = Arc::default();
        let handler_state = state.clone();

        let app = Router::new().route(
            CALLBACK_PATH,
            get(move |query: Query<HashMap<String, String>>| {
                handle_oauth_callback(query, handler_state.clone())
            }),
        );

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
            {
                error!(error = %err, "OAuth callback server error");
            }
        });

        debug!(port, "OAuth callback server listening");

        Ok(Self { port, state, shutdown_tx: Some(shutdown_tx), handle: Some(handle) })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Redirect URI used in the authorization request.
    pub fn redirect_uri(&self) -> String {
        format!("http://127.0.0.1:{}{CALLBACK_PATH}", self.port)
    }

    /// Configure expected OAuth state for CSRF validation.
    pub fn set_expected_state(&self, expected: String) {
        self.state.lock().expected_state = Some(expected);
    }

    /// Await the authorization code with a timeout.
    ///
    /// Returns `(code, state)`.
    pub async fn wait_for_code(&self, timeout: Duration) -> Result<(String, String)> {
        if self.state.lock().expected_state.is_none() {
            return Err(ActionArcError::Config("OAuth expected state not configured".to_string()));
        }

        let deadline = Instant::now() + timeout;

        loop {
            let outcome = self.state.lock().outcome.clone();
            match outcome {
                Some(CallbackOutcome::Code { code, state }) => return Ok((code, state)),
                Some(CallbackOutcome::Denied(reason)) => {
                    return Err(ActionArcError::Auth(format!("authorization denied: {reason}")))
                }
                None => {}
            }

            if Instant::now() > deadline {
                return Err(ActionArcError::Network(
                    "OAuth callback timeout waiting for authorization code".into(),
                ));
            }

            sleep(POLL_INTERVAL).await;
        }
    }

    /// Shut down the loopback server gracefully.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                if err.is_panic() {
                    return Err(ActionArcError::Internal(format!(
                        "OAuth callback server panicked: {err}"
                    )));
                }
            }
        }

        Ok(())
    }
}

impl Drop for OAuthCallbackServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if !handle.is_finished() {
                handle.abort();
            }
        }
    }
}

async fn handle_oauth_callback(
    Query(params): Query<HashMap<String, String>>,
    shared: SharedCallbackState,
) -> Html<&'static str> {
    let mut guard = shared.lock();
    let Some(expected) = guard.expected_state.clone() else {
        warn!("OAuth callback arrived before a login was started");
        return Html(FAILURE_PAGE);
    };

    let state = params.get("state").cloned();
    if state.as_deref() != Some(expected.as_str()) {
        warn!("OAuth callback rejected: state mismatch");
        return Html(FAILURE_PAGE);
    }

    if let Some(error) = params.get("error") {
        let reason = params
            .get("error_description")
            .map(|d| format!("{error}: {d}"))
            .unwrap_or_else(|| error.clone());
        guard.outcome = Some(CallbackOutcome::Denied(reason));
        return Html(FAILURE_PAGE);
    }

    match params.get("code") {
        Some(code) if !code.is_empty() => {
            guard.outcome = Some(CallbackOutcome::Code { code: code.clone(), state: expected });
            Html(SUCCESS_PAGE)
        }
        _ => Html(FAILURE_PAGE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn hit(server: &OAuthCallbackServer, query: &str) -> String {
        let url = format!("{}?{query}", server.redirect_uri());
        reqwest::Client::builder().no_proxy().build().unwrap().get(url).send().await.unwrap().text().await.unwrap()
    }

    #[tokio::test]
    async fn delivers_code_for_matching_state() {
        let server = OAuthCallbackServer::start(0).await.unwrap();
        server.set_expected_state("s1".into());

        let page = hit(&server, "code=abc&state=s1").await;
        assert!(page.contains("signed in"));

        let (code, state) = server.wait_for_code(Duration::from_secs(1)).await.unwrap();
        assert_eq!((code.as_str(), state.as_str()), ("abc", "s1"));
        server.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn mismatched_state_is_ignored() {
        let server = OAuthCallbackServer::start(0).await.unwrap();
        server.set_expected_state("good".into());

        let page = hit(&server, "code=evil&state=bad").await;
        assert!(page.contains("Sign-in failed"));

        hit(&server, "code=real&state=good").await;
        let (code, _) = server.wait_for_code(Duration::from_secs(1)).await.unwrap();
        assert_eq!(code, "real");
    }

    #[tokio::test]
    async fn provider_error_fails_the_wait() {
        let server = OAuthCallbackServer::start(0).await.unwrap();
        server.set_expected_state("s".into());

        hit(&server, "error=access_denied&state=s").await;
        let err = server.wait_for_code(Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, ActionArcError::Auth(msg) if msg.contains("access_denied")));
    }

    #[tokio::test]
    async fn times_out_without_callback() {
        let server = OAuthCallbackServer::start(0).await.unwrap();
        server.set_expected_state("s".into());
        let err = server.wait_for_code(Duration::from_millis(150)).await.unwrap_err();
        assert!(matches!(err, ActionArcError::Network(_)));
    }

    #[tokio::test]
    async fn requires_expected_state() {
        let server = OAuthCallbackServer::start(0).await.unwrap();
        let err = server.wait_for_code(Duration::from_millis(10)).await.unwrap_err();
        assert!(matches!(err, ActionArcError::Config(_)));
    }
}
