//! HTTP client for a GoTrue-compatible identity service (`/auth/v1`).

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::broadcast;

use rollcall_auth::{
    IdentityError, IdentityService, IdentityUser, Session, SessionEvent, SignUp,
};

use super::lock;

#[derive(Debug, Clone)]
pub struct GoTrueConfig {
    /// Project base URL, e.g. `https://xyz.supabase.co`.
    pub url: String,
    /// Public (anon) API key sent with every request.
    pub api_key: String,
    pub timeout: Duration,
}

impl GoTrueConfig {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(30),
        }
    }
}

pub struct GoTrueClient {
    http: reqwest::Client,
    base: String,
    api_key: String,
    persist_session: bool,
    current: Mutex<Option<Session>>,
    events: broadcast::Sender<SessionEvent>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    expires_in: Option<i64>,
    user: IdentityUser,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|at| Utc.timestamp_opt(at, 0).single())
            .or_else(|| {
                self.expires_in
                    .map(|secs| Utc::now() + chrono::Duration::seconds(secs))
            })
            .unwrap_or_else(Utc::now);
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

/// Error body shapes returned by GoTrue versions in the wild.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl GoTrueClient {
    /// Client-style instance: sign-in keeps the session and emits events.
    pub fn new(config: GoTrueConfig) -> Result<Self, IdentityError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| IdentityError::Transport(e.to_string()))?;
        let (events, _) = broadcast::channel(64);
        Ok(Self {
            http,
            base: format!("{}/auth/v1", config.url.trim_end_matches('/')),
            api_key: config.api_key,
            persist_session: true,
            current: Mutex::new(None),
            events,
        })
    }

    /// Server-style instance: no session is held between requests.
    pub fn stateless(config: GoTrueConfig) -> Result<Self, IdentityError> {
        Ok(Self {
            persist_session: false,
            ..Self::new(config)?
        })
    }

    /// Exchange the current refresh token for a new session.
    pub async fn refresh_session(&self) -> Result<Session, IdentityError> {
        let refresh_token = lock(&self.current)
            .as_ref()
            .map(|s| s.refresh_token.clone())
            .ok_or(IdentityError::NoSession)?;

        let resp = self
            .request(Method::POST, "/token?grant_type=refresh_token", None)
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .map_err(transport)?;
        let session = parse::<TokenResponse>(resp).await?.into_session();

        *lock(&self.current) = Some(session.clone());
        let _ = self.events.send(SessionEvent::token_refreshed(session.clone()));
        Ok(session)
    }

    fn request(&self, method: Method, path: &str, bearer: Option<&str>) -> RequestBuilder {
        let req = self
            .http
            .request(method, format!("{}{path}", self.base))
            .header("apikey", &self.api_key);
        match bearer {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    fn signup_request(&self, request: &SignUp) -> RequestBuilder {
        self.request(Method::POST, "/signup", None)
            .query(&[("redirect_to", &request.redirect_to)])
            .json(&json!({
                "email": request.email,
                "password": request.password,
                "data": request.metadata,
            }))
    }

    fn recover_request(&self, email: &str, redirect_to: &str) -> RequestBuilder {
        self.request(Method::POST, "/recover", None)
            .query(&[("redirect_to", redirect_to)])
            .json(&json!({ "email": email }))
    }

    fn current_token(&self) -> Option<String> {
        lock(&self.current).as_ref().map(|s| s.access_token.clone())
    }
}

fn transport(err: reqwest::Error) -> IdentityError {
    IdentityError::Transport(err.to_string())
}

async fn parse<T: serde::de::DeserializeOwned>(resp: Response) -> Result<T, IdentityError> {
    let resp = check(resp).await?;
    resp.json::<T>().await.map_err(transport)
}

async fn check(resp: Response) -> Result<Response, IdentityError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let url = resp.url().path().to_string();
    let body: ErrorBody = resp.json().await.unwrap_or_default();
    let err = classify(status, body);
    tracing::debug!(%status, path = %url, error = %err, "identity service rejected request");
    Err(err)
}

fn classify(status: StatusCode, body: ErrorBody) -> IdentityError {
    let message = body
        .msg
        .or(body.message)
        .or(body.error_description)
        .or(body.error)
        .unwrap_or_else(|| status.to_string());
    let lower = message.to_lowercase();

    match body.error_code.as_deref() {
        Some("invalid_credentials") => return IdentityError::InvalidCredentials,
        Some("email_not_confirmed") => return IdentityError::EmailNotConfirmed,
        Some("user_already_exists" | "email_exists") => return IdentityError::AlreadyRegistered,
        Some("bad_jwt" | "session_not_found" | "user_not_found") => {
            return IdentityError::InvalidToken;
        }
        _ => {}
    }

    if lower.contains("invalid login credentials") {
        IdentityError::InvalidCredentials
    } else if lower.contains("confirm") {
        IdentityError::EmailNotConfirmed
    } else if lower.contains("already") {
        IdentityError::AlreadyRegistered
    } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        IdentityError::InvalidToken
    } else {
        IdentityError::Rejected {
            status: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl IdentityService for GoTrueClient {
    async fn validate_token(&self, access_token: &str) -> Result<IdentityUser, IdentityError> {
        let resp = self
            .request(Method::GET, "/user", Some(access_token))
            .send()
            .await
            .map_err(transport)?;
        parse(resp).await
    }

    async fn get_session(&self) -> Result<Option<Session>, IdentityError> {
        Ok(lock(&self.current).clone())
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, IdentityError> {
        let resp = self
            .request(Method::POST, "/token?grant_type=password", None)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(transport)?;
        let session = parse::<TokenResponse>(resp).await?.into_session();

        if self.persist_session {
            *lock(&self.current) = Some(session.clone());
            let _ = self.events.send(SessionEvent::signed_in(session.clone()));
        }
        Ok(session)
    }

    async fn sign_up(&self, request: SignUp) -> Result<IdentityUser, IdentityError> {
        let resp = self
            .signup_request(&request)
            .send()
            .await
            .map_err(transport)?;

        // Returns the bare user when confirmation is pending, a session otherwise.
        let body: Value = parse(resp).await?;
        let user = match body.get("user") {
            Some(user) => user.clone(),
            None => body,
        };
        serde_json::from_value(user).map_err(|e| IdentityError::Transport(e.to_string()))
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        let token = self.current_token();
        lock(&self.current).take();
        let _ = self.events.send(SessionEvent::signed_out());

        match token {
            Some(token) => self.revoke_token(&token).await,
            None => Ok(()),
        }
    }

    async fn revoke_token(&self, access_token: &str) -> Result<(), IdentityError> {
        let resp = self
            .request(Method::POST, "/logout", Some(access_token))
            .send()
            .await
            .map_err(transport)?;
        check(resp).await.map(|_| ())
    }

    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), IdentityError> {
        let resp = self
            .recover_request(email, redirect_to)
            .send()
            .await
            .map_err(transport)?;
        check(resp).await.map(|_| ())
    }

    async fn update_password(&self, new_password: &str) -> Result<IdentityUser, IdentityError> {
        let token = self.current_token().ok_or(IdentityError::NoSession)?;
        let resp = self
            .request(Method::PUT, "/user", Some(&token))
            .json(&json!({ "password": new_password }))
            .send()
            .await
            .map_err(transport)?;
        parse(resp).await
    }

    async fn resend_verification(&self, email: &str) -> Result<(), IdentityError> {
        let resp = self
            .request(Method::POST, "/resend", None)
            .json(&json!({ "type": "signup", "email": email }))
            .send()
            .await
            .map_err(transport)?;
        check(resp).await.map(|_| ())
    }

    fn session_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

impl core::fmt::Debug for GoTrueClient {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GoTrueClient")
            .field("base", &self.base)
            .field("persist_session", &self.persist_session)
            .finish_non_exhaustive()
    }
}
