//! services/client/src/pipeline.rs
//!
//! The authenticated request pipeline: every REST call goes through here.
//! It attaches the current bearer token, and on a 401 runs a single
//! refresh-and-retry before giving up and cascading into a logout.

use std::sync::Arc;

use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use telehealth_core::ports::RequestError;
use tracing::{debug, warn};

use crate::auth::SessionManager;

//=========================================================================================
// RequestPipeline
//=========================================================================================

/// Wraps a `reqwest::Client` with bearer-token attachment and 401 recovery.
///
/// Callers observe only the final outcome of a call: a transparently
/// retried request looks like a plain success, and a failed refresh
/// surfaces as the refresh failure, never the intermediate 401.
pub struct RequestPipeline {
    http: reqwest::Client,
    base_url: String,
    session: Arc<SessionManager>,
}

impl RequestPipeline {
    pub fn new(session: Arc<SessionManager>, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            session,
        }
    }

    /// Issues an authenticated GET and deserializes the JSON response.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, RequestError> {
        self.request_json(Method::GET, path, None).await
    }

    /// Issues an authenticated POST with a JSON body and deserializes the
    /// JSON response.
    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, RequestError> {
        let body = serde_json::to_value(body)
            .map_err(|e| RequestError::Network(format!("failed to encode request body: {e}")))?;
        self.request_json(Method::POST, path, Some(body)).await
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, RequestError> {
        let token = self.session.current_access_token();
        let response = self
            .send(method.clone(), path, body.as_ref(), token.as_deref())
            .await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return interpret(response).await;
        }

        // 401: without a refresh token there is nothing to recover with.
        if self.session.current_refresh_token().is_none() {
            warn!("401 with no refresh token; logging out.");
            self.session.logout().await;
            return Err(RequestError::Unauthorized);
        }

        // Refresh (shared with any concurrently failing calls), then re-issue
        // the original request exactly once. A second 401 propagates as-is;
        // no further refresh is attempted.
        let stale = token.unwrap_or_default();
        match self.session.refresh_reusing_current(&stale).await {
            Ok(new_token) => {
                debug!("Retrying request after token refresh: {method} {path}");
                let response = self
                    .send(method, path, body.as_ref(), Some(&new_token))
                    .await?;
                if response.status() == StatusCode::UNAUTHORIZED {
                    return Err(RequestError::Unauthorized);
                }
                interpret(response).await
            }
            Err(refresh_err) => {
                warn!("Token refresh failed ({refresh_err}); logging out.");
                self.session.logout().await;
                Err(RequestError::Auth(refresh_err))
            }
        }
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        token: Option<&str>,
    ) -> Result<Response, RequestError> {
        let mut request = self.http.request(method, format!("{}{}", self.base_url, path));
        if let Some(body) = body {
            request = request.json(body);
        }
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request
            .send()
            .await
            .map_err(|e| RequestError::Network(e.to_string()))
    }
}

/// Turns a non-401 response into the caller's result: 2xx deserializes,
/// anything else becomes a `ServerError` carrying the server's message
/// when one can be read from the body.
async fn interpret<T: DeserializeOwned>(response: Response) -> Result<T, RequestError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|e| RequestError::Network(format!("failed to decode response body: {e}")));
    }

    let message = match response.json::<Value>().await {
        Ok(body) => body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("request failed")
            .to_string(),
        Err(_) => "request failed".to_string(),
    };
    Err(RequestError::ServerError {
        status: status.as_u16(),
        message,
    })
}

//=========================================================================================
// Tests
//=========================================================================================
