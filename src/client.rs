// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session-aware API client for the gateway.
//!
//! Holds the caller's session explicitly and handles:
//! - Bearer token injection
//! - One refresh-and-retry when a request comes back 401
//! - Clearing the session when the refresh itself is rejected

use crate::models::token::{AuthResponse, TokensResponse};
use crate::models::TokenPair;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tokio::sync::RwLock;

/// Client-side session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
}

impl From<TokenPair> for Session {
    fn from(tokens: TokenPair) -> Self {
        Self {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Session expired; sign in again")]
    SessionExpired,

    #[error("Request failed with {status}: {body}")]
    Status { status: StatusCode, body: String },
}

/// Gateway client. Paths are relative to the gateway root (`/auth/me`, `/meta/metrics`, ...).
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: RwLock<Option<Session>>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            session: RwLock::new(None),
        }
    }

    pub async fn session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    pub async fn set_session(&self, session: Option<Session>) {
        *self.session.write().await = session;
    }

    /// Sign in and keep the returned tokens.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ClientError> {
        let response = self
            .http
            .post(self.url("/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let auth: AuthResponse = Self::read_json(response).await?;

        self.set_session(Some(Session::from(auth.tokens.clone())))
            .await;
        Ok(auth)
    }

    /// Revoke the refresh token and forget the session.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let Some(session) = self.session.write().await.take() else {
            return Ok(());
        };
        let response = self
            .http
            .post(self.url("/auth/logout"))
            .json(&json!({ "refreshToken": session.refresh_token }))
            .send()
            .await?;
        Self::ensure_success(response).await?;
        Ok(())
    }

    /// Send a request with the session's access token.
    ///
    /// A 401 triggers exactly one refresh followed by one retry. If the
    /// refresh is rejected the session is cleared and
    /// [`ClientError::SessionExpired`] is returned. Without a session the
    /// 401 response is returned as is.
    pub async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<reqwest::Response, ClientError> {
        let session = self.session().await;
        let access = session.as_ref().map(|s| s.access_token.as_str());
        let response = self.execute(&method, path, body, access).await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }
        let Some(session) = session else {
            return Ok(response);
        };

        tracing::debug!(path, "Access token rejected, refreshing session");
        let refreshed = self.refresh(&session).await?;
        self.execute(&method, path, body, Some(refreshed.access_token.as_str()))
            .await
    }

    /// `send` and decode a successful JSON body.
    pub async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ClientError> {
        let response = self.send(method, path, body).await?;
        Self::read_json(response).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.send_json::<(), T>(Method::GET, path, None).await
    }

    async fn refresh(&self, stale: &Session) -> Result<Session, ClientError> {
        let mut guard = self.session.write().await;

        // Another request already refreshed while we waited for the lock.
        if let Some(current) = guard.as_ref() {
            if current.access_token != stale.access_token {
                return Ok(current.clone());
            }
        }

        let response = self
            .http
            .post(self.url("/auth/refresh"))
            .json(&json!({ "refreshToken": stale.refresh_token }))
            .send()
            .await;

        let tokens = match response {
            Ok(r) if r.status().is_success() => r.json::<TokensResponse>().await.ok(),
            _ => None,
        };

        match tokens {
            Some(TokensResponse { tokens }) => {
                let session = Session::from(tokens);
                *guard = Some(session.clone());
                Ok(session)
            }
            None => {
                tracing::info!("Session refresh rejected, clearing session");
                *guard = None;
                Err(ClientError::SessionExpired)
            }
        }
    }

    async fn execute<B: Serialize + ?Sized>(
        &self,
        method: &Method,
        path: &str,
        body: Option<&B>,
        access_token: Option<&str>,
    ) -> Result<reqwest::Response, ClientError> {
        let mut request = self.http.request(method.clone(), self.url(path));
        if let Some(token) = access_token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ClientError::Status { status, body })
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        Ok(Self::ensure_success(response).await?.json::<T>().await?)
    }
}
