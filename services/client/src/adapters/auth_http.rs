//! services/client/src/adapters/auth_http.rs
//!
//! This module contains the adapter for the `/auth/*` endpoints. It
//! implements the `AuthApi` port from the `core` crate. These calls carry
//! no bearer token and never go through the request pipeline.

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use telehealth_core::domain::{Credential, NewUser, Profile};
use telehealth_core::ports::{AuthApi, AuthError};

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest<'a> {
    email: &'a str,
    password: &'a str,
    first_name: &'a str,
    last_name: &'a str,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    token: String,
    refresh_token: String,
    user: Profile,
}

#[derive(Deserialize)]
struct RefreshResponse {
    token: String,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `AuthApi` port against the REST API.
#[derive(Clone)]
pub struct HttpAuthApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpAuthApi {
    /// Creates a new `HttpAuthApi` for the given API base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<Response, AuthError> {
        self.http
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))
    }
}

/// Parses a successful auth response into a credential, refusing tokens the
/// rest of the system is not allowed to hold.
async fn into_credential(response: Response) -> Result<Credential, AuthError> {
    let body: AuthResponse = response
        .json()
        .await
        .map_err(|e| AuthError::Network(format!("malformed auth response: {e}")))?;
    if body.token.is_empty() || body.refresh_token.is_empty() {
        return Err(AuthError::Network(
            "auth response contained an empty token".to_string(),
        ));
    }
    Ok(Credential {
        access_token: body.token,
        refresh_token: body.refresh_token,
        user: body.user,
    })
}

/// The server's error message, when the body carries one.
async fn server_message(response: Response) -> Option<String> {
    let body: Value = response.json().await.ok()?;
    body.get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
}

//=========================================================================================
// `AuthApi` Trait Implementation
//=========================================================================================

#[async_trait]
impl AuthApi for HttpAuthApi {
    async fn register(&self, user: &NewUser, password: &str) -> Result<Credential, AuthError> {
        let response = self
            .post(
                "/auth/register",
                &RegisterRequest {
                    email: &user.email,
                    password,
                    first_name: &user.first_name,
                    last_name: &user.last_name,
                },
            )
            .await?;
        if response.status().is_success() {
            into_credential(response).await
        } else {
            let message = server_message(response)
                .await
                .unwrap_or_else(|| "Registration failed".to_string());
            Err(AuthError::InvalidCredentials(message))
        }
    }

    async fn login(&self, email: &str, password: &str) -> Result<Credential, AuthError> {
        let response = self
            .post("/auth/login", &LoginRequest { email, password })
            .await?;
        if response.status().is_success() {
            into_credential(response).await
        } else {
            let message = server_message(response)
                .await
                .unwrap_or_else(|| "Invalid email or password".to_string());
            Err(AuthError::InvalidCredentials(message))
        }
    }

    async fn refresh(&self, refresh_token: &str) -> Result<String, AuthError> {
        let response = self
            .post("/auth/refresh", &RefreshRequest { refresh_token })
            .await?;
        match response.status() {
            status if status.is_success() => {
                let body: RefreshResponse = response
                    .json()
                    .await
                    .map_err(|e| AuthError::Network(format!("malformed refresh response: {e}")))?;
                if body.token.is_empty() {
                    return Err(AuthError::Network(
                        "refresh response contained an empty token".to_string(),
                    ));
                }
                Ok(body.token)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::BAD_REQUEST => {
                Err(AuthError::RefreshRejected)
            }
            status => Err(AuthError::Network(format!(
                "refresh failed with status {status}"
            ))),
        }
    }

    async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        let response = self
            .post("/auth/logout", &RefreshRequest { refresh_token })
            .await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(AuthError::Network(format!(
                "logout failed with status {}",
                response.status()
            )))
        }
    }
}

//=========================================================================================
// Tests
//=========================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::spawn_fixture;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::json;
    use telehealth_core::domain::Role;

    fn auth_user() -> Value {
        json!({
            "id": 7,
            "email": "a@x.com",
            "firstName": "Ada",
            "lastName": "Lovelace",
            "role": "patient",
            "patientId": 1
        })
    }

    #[tokio::test]
    async fn login_parses_the_auth_response() {
        let router = Router::new().route(
            "/auth/login",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["email"], "a@x.com");
                assert_eq!(body["password"], "p");
                Json(json!({
                    "token": "T1",
                    "refreshToken": "R1",
                    "user": auth_user()
                }))
            }),
        );
        let api = HttpAuthApi::new(spawn_fixture(router).await);

        let credential = api.login("a@x.com", "p").await.unwrap();
        assert_eq!(credential.access_token, "T1");
        assert_eq!(credential.refresh_token, "R1");
        assert_eq!(credential.user.id, 7);
        assert_eq!(credential.user.role, Role::Patient);
    }

    #[tokio::test]
    async fn rejected_login_carries_the_server_message() {
        let router = Router::new().route(
            "/auth/login",
            post(|| async {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "message": "Invalid email or password" })),
                )
            }),
        );
        let api = HttpAuthApi::new(spawn_fixture(router).await);

        let err = api.login("a@x.com", "wrong").await.unwrap_err();
        match err {
            AuthError::InvalidCredentials(message) => {
                assert_eq!(message, "Invalid email or password")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn register_sends_the_wire_field_names() {
        let router = Router::new().route(
            "/auth/register",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["firstName"], "Ada");
                assert_eq!(body["lastName"], "Lovelace");
                Json(json!({
                    "token": "T1",
                    "refreshToken": "R1",
                    "user": auth_user()
                }))
            }),
        );
        let api = HttpAuthApi::new(spawn_fixture(router).await);

        let user = NewUser {
            email: "a@x.com".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
        };
        let credential = api.register(&user, "p").await.unwrap();
        assert_eq!(credential.user.first_name, "Ada");
    }

    #[tokio::test]
    async fn refresh_exchanges_the_token() {
        let router = Router::new().route(
            "/auth/refresh",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["refreshToken"], "R1");
                Json(json!({ "token": "T2" }))
            }),
        );
        let api = HttpAuthApi::new(spawn_fixture(router).await);

        assert_eq!(api.refresh("R1").await.unwrap(), "T2");
    }

    #[tokio::test]
    async fn rejected_refresh_maps_to_refresh_rejected() {
        let router = Router::new().route(
            "/auth/refresh",
            post(|| async {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "message": "expired" })),
                )
            }),
        );
        let api = HttpAuthApi::new(spawn_fixture(router).await);

        let err = api.refresh("stale").await.unwrap_err();
        assert!(matches!(err, AuthError::RefreshRejected));
    }

    #[tokio::test]
    async fn empty_tokens_in_the_response_are_refused() {
        let router = Router::new().route(
            "/auth/login",
            post(|| async {
                Json(json!({
                    "token": "",
                    "refreshToken": "R1",
                    "user": auth_user()
                }))
            }),
        );
        let api = HttpAuthApi::new(spawn_fixture(router).await);

        let err = api.login("a@x.com", "p").await.unwrap_err();
        assert!(matches!(err, AuthError::Network(_)));
    }
}
