//! In-memory identity service for tests/dev.
//!
//! Issues HS256 access tokens signed with a local secret and keeps accounts,
//! sessions and revocations in memory. Passwords are kept as given: this is a
//! test double, never a credential store.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use rollcall_auth::{
    IdentityError, IdentityService, IdentityUser, Session, SessionEvent, SignUp, UserMetadata,
};
use rollcall_core::UserId;

use super::lock;

/// Operations that can be made to fail on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ValidateToken,
    SignIn,
    SignUp,
    SignOut,
    ResetPassword,
    UpdatePassword,
    ResendVerification,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailKind {
    Confirmation,
    PasswordReset,
}

/// An email the service would have delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub kind: EmailKind,
    pub to: String,
    pub redirect_to: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    email: String,
    iat: i64,
    exp: i64,
    jti: String,
}

#[derive(Debug, Clone)]
struct Account {
    user: IdentityUser,
    password: String,
    confirmed: bool,
}

pub struct InMemoryIdentityService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    token_ttl: Duration,
    persist_session: bool,
    auto_confirm: bool,
    accounts: Mutex<HashMap<String, Account>>,
    revoked: Mutex<HashSet<String>>,
    refresh_tokens: Mutex<HashMap<String, UserId>>,
    current: Mutex<Option<Session>>,
    failures: Mutex<HashSet<Operation>>,
    outbox: Mutex<Vec<SentEmail>>,
    events: broadcast::Sender<SessionEvent>,
}

impl InMemoryIdentityService {
    /// Client-style instance: sign-in keeps the session and emits events.
    pub fn new(secret: &[u8]) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            token_ttl: Duration::hours(1),
            persist_session: true,
            auto_confirm: false,
            accounts: Mutex::new(HashMap::new()),
            revoked: Mutex::new(HashSet::new()),
            refresh_tokens: Mutex::new(HashMap::new()),
            current: Mutex::new(None),
            failures: Mutex::new(HashSet::new()),
            outbox: Mutex::new(Vec::new()),
            events,
        }
    }

    /// Server-style instance: sessions are returned, never held.
    pub fn stateless(secret: &[u8]) -> Self {
        Self {
            persist_session: false,
            ..Self::new(secret)
        }
    }

    /// Confirm new accounts immediately at sign-up.
    pub fn with_auto_confirm(mut self) -> Self {
        self.auto_confirm = true;
        self
    }

    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// Create an account directly (seeding).
    pub fn create_user(
        &self,
        email: &str,
        password: &str,
        metadata: UserMetadata,
        confirmed: bool,
    ) -> IdentityUser {
        let user = IdentityUser {
            id: UserId::new(Uuid::now_v7().to_string()),
            email: email.to_string(),
            metadata,
        };
        lock(&self.accounts).insert(
            normalize(email),
            Account {
                user: user.clone(),
                password: password.to_string(),
                confirmed,
            },
        );
        user
    }

    pub fn confirm_email(&self, email: &str) -> bool {
        match lock(&self.accounts).get_mut(&normalize(email)) {
            Some(account) => {
                account.confirmed = true;
                true
            }
            None => false,
        }
    }

    /// Mint a session for an existing user without a password.
    pub fn issue_session(&self, user_id: &UserId) -> Result<Session, IdentityError> {
        let user = self.user_by_id(user_id).ok_or(IdentityError::InvalidToken)?;
        self.mint(user)
    }

    /// Rotate the current session and announce it as `TokenRefreshed`.
    pub fn refresh_session(&self) -> Result<Session, IdentityError> {
        let current = lock(&self.current).clone().ok_or(IdentityError::NoSession)?;
        let user_id = lock(&self.refresh_tokens)
            .remove(&current.refresh_token)
            .ok_or(IdentityError::InvalidToken)?;
        let user = self.user_by_id(&user_id).ok_or(IdentityError::InvalidToken)?;

        let session = self.mint(user)?;
        *lock(&self.current) = Some(session.clone());
        let _ = self.events.send(SessionEvent::token_refreshed(session.clone()));
        Ok(session)
    }

    /// Publish an arbitrary lifecycle event (e.g. a sign-out from another tab).
    pub fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    pub fn inject_failure(&self, op: Operation) {
        lock(&self.failures).insert(op);
    }

    pub fn clear_failures(&self) {
        lock(&self.failures).clear();
    }

    pub fn sent_emails(&self) -> Vec<SentEmail> {
        lock(&self.outbox).clone()
    }

    fn check(&self, op: Operation) -> Result<(), IdentityError> {
        if lock(&self.failures).contains(&op) {
            return Err(IdentityError::Rejected {
                status: 503,
                message: format!("{op:?} temporarily unavailable"),
            });
        }
        Ok(())
    }

    fn user_by_id(&self, id: &UserId) -> Option<IdentityUser> {
        lock(&self.accounts)
            .values()
            .find(|a| &a.user.id == id)
            .map(|a| a.user.clone())
    }

    fn mint(&self, user: IdentityUser) -> Result<Session, IdentityError> {
        let now = Utc::now();
        let expires_at = now + self.token_ttl;
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::now_v7().to_string(),
        };
        let access_token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| IdentityError::Transport(e.to_string()))?;

        let refresh_token = Uuid::now_v7().simple().to_string();
        lock(&self.refresh_tokens).insert(refresh_token.clone(), user.id.clone());

        Ok(Session {
            access_token,
            refresh_token,
            expires_at,
            user,
        })
    }

    fn decode(&self, token: &str, validate_exp: bool) -> Result<Claims, IdentityError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = validate_exp;
        validation.leeway = 0;
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|_| IdentityError::InvalidToken)
    }

    fn revoke(&self, token: &str) -> Result<(), IdentityError> {
        let claims = self.decode(token, false)?;
        lock(&self.revoked).insert(claims.jti);
        Ok(())
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
impl IdentityService for InMemoryIdentityService {
    async fn validate_token(&self, access_token: &str) -> Result<IdentityUser, IdentityError> {
        self.check(Operation::ValidateToken)?;
        let claims = self.decode(access_token, true)?;
        if lock(&self.revoked).contains(&claims.jti) {
            return Err(IdentityError::InvalidToken);
        }
        self.user_by_id(&UserId::new(claims.sub))
            .ok_or(IdentityError::InvalidToken)
    }

    async fn get_session(&self) -> Result<Option<Session>, IdentityError> {
        Ok(lock(&self.current).clone())
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, IdentityError> {
        self.check(Operation::SignIn)?;
        let account = lock(&self.accounts)
            .get(&normalize(email))
            .cloned()
            .ok_or(IdentityError::InvalidCredentials)?;
        if account.password != password {
            return Err(IdentityError::InvalidCredentials);
        }
        if !account.confirmed {
            return Err(IdentityError::EmailNotConfirmed);
        }

        let session = self.mint(account.user)?;
        if self.persist_session {
            *lock(&self.current) = Some(session.clone());
            let _ = self.events.send(SessionEvent::signed_in(session.clone()));
        }
        Ok(session)
    }

    async fn sign_up(&self, request: SignUp) -> Result<IdentityUser, IdentityError> {
        self.check(Operation::SignUp)?;
        let key = normalize(&request.email);
        if lock(&self.accounts).contains_key(&key) {
            return Err(IdentityError::AlreadyRegistered);
        }

        let user = self.create_user(
            &request.email,
            &request.password,
            request.metadata,
            self.auto_confirm,
        );
        if !self.auto_confirm {
            lock(&self.outbox).push(SentEmail {
                kind: EmailKind::Confirmation,
                to: request.email,
                redirect_to: Some(request.redirect_to),
            });
        }
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        self.check(Operation::SignOut)?;
        let session = lock(&self.current).take();
        if let Some(session) = session {
            self.revoke(&session.access_token)?;
            lock(&self.refresh_tokens).remove(&session.refresh_token);
        }
        let _ = self.events.send(SessionEvent::signed_out());
        Ok(())
    }

    async fn revoke_token(&self, access_token: &str) -> Result<(), IdentityError> {
        self.check(Operation::SignOut)?;
        self.revoke(access_token)
    }

    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), IdentityError> {
        self.check(Operation::ResetPassword)?;
        // Sent whether or not an account exists; the caller cannot tell.
        if lock(&self.accounts).contains_key(&normalize(email)) {
            lock(&self.outbox).push(SentEmail {
                kind: EmailKind::PasswordReset,
                to: email.to_string(),
                redirect_to: Some(redirect_to.to_string()),
            });
        }
        Ok(())
    }

    async fn update_password(&self, new_password: &str) -> Result<IdentityUser, IdentityError> {
        self.check(Operation::UpdatePassword)?;
        let session = lock(&self.current).clone().ok_or(IdentityError::NoSession)?;
        let mut accounts = lock(&self.accounts);
        let account = accounts
            .get_mut(&normalize(&session.user.email))
            .ok_or(IdentityError::InvalidToken)?;
        account.password = new_password.to_string();
        Ok(account.user.clone())
    }

    async fn resend_verification(&self, email: &str) -> Result<(), IdentityError> {
        self.check(Operation::ResendVerification)?;
        let pending = lock(&self.accounts)
            .get(&normalize(email))
            .is_some_and(|a| !a.confirmed);
        if pending {
            lock(&self.outbox).push(SentEmail {
                kind: EmailKind::Confirmation,
                to: email.to_string(),
                redirect_to: None,
            });
        }
        Ok(())
    }

    fn session_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

impl core::fmt::Debug for InMemoryIdentityService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InMemoryIdentityService")
            .field("persist_session", &self.persist_session)
            .field("auto_confirm", &self.auto_confirm)
            .finish_non_exhaustive()
    }
}
