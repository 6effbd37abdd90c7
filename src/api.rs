//! Backend gateway.
//!
//! The one chokepoint for authenticated calls to the REST backend. Attaches
//! the current bearer token when one is held, always sends JSON, never
//! caches, and normalizes every non-success status into a single error kind
//! carrying the raw body text.

use reqwest::{header::CONTENT_TYPE, RequestBuilder, StatusCode};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::session::SessionStore;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Non-success response; the message is the backend's body text, or a
    /// status-coded placeholder when the body was empty.
    #[error("{0}")]
    Remote(String),
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Expected a response body")]
    Empty,
}

type Result<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: SessionStore,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, session: SessionStore) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            http: reqwest::Client::new(),
            base_url,
            session,
        }
    }

    /// Fetch `path`. `Ok(None)` means the backend answered with no content.
    pub async fn get(&self, path: &str) -> Result<Option<Value>> {
        self.call(self.http.get(self.url(path))).await
    }

    pub async fn post<B>(&self, path: &str, body: &B) -> Result<Option<Value>>
    where
        B: Serialize + ?Sized,
    {
        self.call(self.http.post(self.url(path)).json(body)).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn call(&self, request: RequestBuilder) -> Result<Option<Value>> {
        let mut request = request.header(CONTENT_TYPE, "application/json");
        if let Some(token) = self.session.get() {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            let message = if text.trim().is_empty() {
                format!("HTTP {}", status.as_u16())
            } else {
                text
            };
            return Err(ApiError::Remote(message));
        }
        if status == StatusCode::NO_CONTENT || text.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&text)?))
    }
}
