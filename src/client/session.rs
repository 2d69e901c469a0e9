//! Session and token lifecycle
//!
//! Authentication is a two-step handshake: an app-signup call registers this
//! client instance with the platform, then the login call exchanges the
//! account credentials for a JWT. The token's `exp` claim drives transparent
//! re-login; the platform also hands out a refresh token, but its own app
//! never uses it and neither does this client.

use crate::client::transport::{Transport, PATH_APP_SIGNUP, PATH_LOGIN};
use crate::config::Credentials;
use crate::error::{AguaIotError, Result};
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Token lifetime assumed when the JWT carries no readable `exp` claim
const FALLBACK_TOKEN_LIFETIME_MS: i64 = 24 * 60 * 60 * 1000;

/// Current authentication state
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Bearer token for authenticated calls
    pub token: Option<String>,
    /// Refresh token as handed out at login; stored, not used
    pub refresh_token: Option<String>,
    /// Token expiry in epoch milliseconds
    pub expires_at_ms: Option<i64>,
}

/// Manages login and token renewal for one client instance
#[derive(Debug)]
pub struct Session {
    credentials: Credentials,
    client_id: String,
    state: RwLock<SessionState>,
}

impl Session {
    /// Create a session for an app instance id and account credentials
    pub fn new(credentials: Credentials, client_id: String) -> Self {
        Self {
            credentials,
            client_id,
            state: RwLock::new(SessionState::default()),
        }
    }

    /// App-instance identifier used for signup and the login Authorization header
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Snapshot of the current session state
    pub async fn state(&self) -> SessionState {
        self.state.read().await.clone()
    }

    /// Perform the signup handshake and log in
    ///
    /// Idempotent: calling it again replaces the stored token, which is how
    /// a caller forces a fresh login after an authorization failure.
    pub async fn authenticate(&self, transport: &Transport) -> Result<()> {
        self.register_app(transport).await?;

        info!("Logging in to Agua IOT as {}", self.credentials.email);
        let body = json!({
            "email": self.credentials.email,
            "password": self.credentials.password,
        });
        let headers = [("local", "true"), ("Authorization", self.client_id.as_str())];

        let response = transport
            .login_request(Method::POST, PATH_LOGIN, Some(&body), &headers)
            .await
            .map_err(|e| match e {
                AguaIotError::HttpStatus { status, body } => {
                    AguaIotError::authentication(format!("Login rejected ({status}): {body}"))
                }
                other => other,
            })?;

        let token = response
            .get("token")
            .and_then(Value::as_str)
            .ok_or_else(|| AguaIotError::authentication("Login response carried no token"))?;
        let refresh_token = response
            .get("refresh_token")
            .and_then(Value::as_str)
            .map(str::to_string);

        let expires_at_ms = token_expiry_millis(token).unwrap_or_else(|| {
            warn!("Token carries no readable expiry, assuming 24h");
            Utc::now().timestamp_millis() + FALLBACK_TOKEN_LIFETIME_MS
        });

        let mut state = self.state.write().await;
        state.token = Some(token.to_string());
        state.refresh_token = refresh_token;
        state.expires_at_ms = Some(expires_at_ms);
        info!("Login successful, token expires at {expires_at_ms}");
        Ok(())
    }

    /// Send an authenticated request, logging in first when needed
    ///
    /// A missing token counts as expired, so a fresh client's first
    /// operation triggers the login on its own.
    pub async fn authenticated_request(
        &self,
        transport: &Transport,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value> {
        if self.needs_login().await {
            self.authenticate(transport).await?;
        }

        let token = {
            let state = self.state.read().await;
            state
                .token
                .clone()
                .ok_or_else(|| AguaIotError::authentication("No token available after login"))?
        };

        let headers = [("local", "false"), ("Authorization", token.as_str())];
        transport.request(method, path, body, &headers).await
    }

    async fn register_app(&self, transport: &Transport) -> Result<()> {
        debug!("Registering app instance {}", self.client_id);
        let body = json!({
            "phone_type": "Android",
            "phone_id": self.client_id,
            "phone_version": "1.0",
            "language": "en",
            "id_app": self.client_id,
            "push_notification_token": self.client_id,
            "push_notification_active": false,
        });
        transport
            .request(Method::POST, PATH_APP_SIGNUP, Some(&body), &[])
            .await?;
        Ok(())
    }

    async fn needs_login(&self) -> bool {
        let state = self.state.read().await;
        match (&state.token, state.expires_at_ms) {
            (None, _) => true,
            (Some(_), Some(expires_at_ms)) => Utc::now().timestamp_millis() > expires_at_ms,
            (Some(_), None) => false,
        }
    }
}

/// Expiry of a JWT in epoch milliseconds, taken from its `exp` claim
///
/// Tolerates both base64url and padded standard encodings of the payload.
/// `None` when the token is not a readable JWT; the caller falls back to a
/// fixed lifetime rather than rejecting the token.
pub(crate) fn token_expiry_millis(token: &str) -> Option<i64> {
    let payload = token.split('.').nth(1)?;
    let decoded = URL_SAFE_NO_PAD
        .decode(payload)
        .ok()
        .or_else(|| STANDARD.decode(payload).ok())?;
    let claims: Value = serde_json::from_slice(&decoded).ok()?;
    let exp = claims.get("exp")?.as_f64()?;
    Some((exp * 1000.0) as i64)
}
