//! Identity provider client.
//!
//! Talks to the provider's password-grant, sign-up, current-user, and logout
//! endpoints under a configured base URL. Every call carries the publishable
//! `apikey` header; user-scoped calls add the bearer token.

use reqwest::RequestBuilder;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Notice shown when sign-up ends in the email-confirmation state.
pub const CONFIRMATION_NOTICE: &str =
    "Check your email to confirm the account, then sign in.";

#[derive(Debug, Error)]
pub enum AuthError {
    /// The provider rejected the request; the message is its own.
    #[error("{0}")]
    Provider(String),
    #[error("Request to identity provider failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Unexpected identity response: {0}")]
    Decode(#[from] serde_json::Error),
}

type Result<T> = std::result::Result<T, AuthError>;

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Sign-up response. A provider configured to require email confirmation
/// returns a user but no session; that is a valid terminal state, not an
/// error.
#[derive(Debug, Default, Deserialize)]
pub struct SignUpResponse {
    #[serde(default)]
    pub user: Option<AuthUser>,
    #[serde(default)]
    pub session: Option<AuthSession>,
}

#[derive(Debug)]
pub enum SignUpOutcome {
    SignedIn(AuthSession),
    /// Account created, awaiting email confirmation.
    ConfirmationPending,
}

#[derive(Debug, Clone)]
pub struct AuthClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl AuthClient {
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            http: reqwest::Client::new(),
            base_url,
            anon_key: anon_key.into(),
        }
    }

    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession> {
        let request = self
            .post("/auth/v1/token?grant_type=password")
            .json(&serde_json::json!({ "email": email, "password": password }));
        let body = send_json(request, "Failed to sign in").await?;
        Ok(serde_json::from_value(body)?)
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpResponse> {
        let request = self
            .post("/auth/v1/signup")
            .json(&serde_json::json!({ "email": email, "password": password }));
        let body = send_json(request, "Failed to sign up").await?;
        Ok(serde_json::from_value(body)?)
    }

    /// Sign up, then try to open a session. Providers that require email
    /// confirmation return no session from sign-up; a follow-up sign-in that
    /// the provider rejects settles on [`SignUpOutcome::ConfirmationPending`].
    pub async fn sign_up_with_fallback(&self, email: &str, password: &str) -> Result<SignUpOutcome> {
        let response = self.sign_up(email, password).await?;
        if let Some(session) = response.session {
            return Ok(SignUpOutcome::SignedIn(session));
        }
        match self.sign_in_with_password(email, password).await {
            Ok(session) => Ok(SignUpOutcome::SignedIn(session)),
            Err(AuthError::Provider(message)) => {
                debug!("Sign-in after sign-up rejected: {message}");
                Ok(SignUpOutcome::ConfirmationPending)
            }
            Err(err) => Err(err),
        }
    }

    /// Resolve a token to its user. An invalid or expired token yields
    /// `None`, never an error, so session checks stay crash-free.
    pub async fn user_from_token(&self, token: &str) -> Result<Option<AuthUser>> {
        if token.is_empty() {
            return Ok(None);
        }
        let response = self
            .get("/auth/v1/user")
            .bearer_auth(token)
            .send()
            .await?;
        if !response.status().is_success() {
            return Ok(None);
        }
        Ok(Some(response.json().await?))
    }

    /// Best-effort provider logout. A non-success status is ignored; the
    /// caller clears the local token either way.
    pub async fn sign_out(&self, token: &str) -> Result<()> {
        if token.is_empty() {
            return Ok(());
        }
        self.post("/auth/v1/logout")
            .bearer_auth(token)
            .send()
            .await?;
        Ok(())
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.http
            .get(format!("{}{path}", self.base_url))
            .header("apikey", &self.anon_key)
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.http
            .post(format!("{}{path}", self.base_url))
            .header("apikey", &self.anon_key)
    }
}

async fn send_json(request: RequestBuilder, fallback: &str) -> Result<Value> {
    let response = request.send().await?;
    let status = response.status();
    let text = response.text().await?;
    let body: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
    if !status.is_success() {
        return Err(AuthError::Provider(provider_message(&body, fallback)));
    }
    Ok(body)
}

fn provider_message(body: &Value, fallback: &str) -> String {
    body.get("msg")
        .and_then(Value::as_str)
        .or_else(|| body.get("error_description").and_then(Value::as_str))
        .unwrap_or(fallback)
        .to_string()
}
