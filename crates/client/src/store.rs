//! The client session store.
//!
//! One `watch` cell holds the current [`AuthState`]. Every writer (the
//! imperative actions, `initialize`, and the session-event listener) takes
//! the store's async gate before resolving and publishing, so interleaved
//! events can never produce a mixed `{user, role, profile}` tuple.

use std::sync::{Arc, OnceLock, Weak};

use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;

use rollcall_auth::{
    IdentityError, IdentityService, ProfileStore, Session, SessionEvent, SessionEventKind, SignUp,
    UserMetadata,
};
use rollcall_core::{Profile, Role, StoreError};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::state::{AuthState, Resolved};

/// Cheap to clone; all clones share one state cell and one listener.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

struct Inner {
    identity: Arc<dyn IdentityService>,
    profiles: Arc<dyn ProfileStore>,
    config: ClientConfig,
    state: watch::Sender<AuthState>,
    gate: Mutex<()>,
    listener: OnceLock<JoinHandle<()>>,
}

impl SessionStore {
    /// `profiles` is the restricted (row-policy bound) profile store.
    pub fn new(
        identity: Arc<dyn IdentityService>,
        profiles: Arc<dyn ProfileStore>,
        config: ClientConfig,
    ) -> Self {
        let (state, _) = watch::channel(AuthState::initial());
        Self {
            inner: Arc::new(Inner {
                identity,
                profiles,
                config,
                state,
                gate: Mutex::new(()),
                listener: OnceLock::new(),
            }),
        }
    }

    /// Receiver that observes every published state.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.inner.state.subscribe()
    }

    pub fn snapshot(&self) -> AuthState {
        self.inner.state.borrow().clone()
    }

    /// Stream of states, starting with the current one.
    pub fn changes(&self) -> WatchStream<AuthState> {
        WatchStream::new(self.inner.state.subscribe())
    }

    /// Resolve the existing session (if any), then start listening for
    /// session events. Safe to call more than once; the listener is only
    /// ever started once.
    pub async fn initialize(&self) {
        {
            let _gate = self.inner.gate.lock().await;
            let resolved = match self.inner.identity.get_session().await {
                Ok(Some(session)) => self.inner.resolve_initial(session).await,
                Ok(None) => Resolved::signed_out(),
                Err(e) => {
                    tracing::warn!(error = %e, "failed to read existing session");
                    Resolved::signed_out()
                }
            };
            self.inner.publish(resolved);
        }

        self.listen();
    }

    pub async fn login(&self, email: &str, password: &str) -> ClientResult<()> {
        let _gate = self.inner.gate.lock().await;

        let session = self
            .inner
            .identity
            .sign_in_with_password(email, password)
            .await
            .map_err(|e| match e {
                IdentityError::EmailNotConfirmed => ClientError::EmailNotVerified,
                other => ClientError::Identity(other),
            })?;

        let profile = self
            .inner
            .profiles
            .get_profile(&session.user.id)
            .await?
            .ok_or_else(|| {
                tracing::error!(user_id = %session.user.id, "signed in without a profile row");
                ClientError::ProfileMissing
            })?;

        tracing::info!(user_id = %session.user.id, role = %profile.role, "signed in");
        self.inner.publish(Resolved::signed_in(session, Some(profile)));
        Ok(())
    }

    /// Create an account. The profile row is created later, on the first
    /// `initialize` that finds a session without one.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
        role: Role,
    ) -> ClientResult<()> {
        let request = SignUp {
            email: email.to_string(),
            password: password.to_string(),
            metadata: UserMetadata::new(full_name, role),
            redirect_to: self.inner.config.login_redirect(),
        };

        match self.inner.identity.sign_up(request).await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, role = %role, "registered");
                Ok(())
            }
            Err(IdentityError::AlreadyRegistered) => Err(ClientError::AlreadyRegistered),
            Err(e) => Err(e.into()),
        }
    }

    /// Always ends signed out locally, whatever the identity service says.
    pub async fn logout(&self) {
        let _gate = self.inner.gate.lock().await;
        if let Err(e) = self.inner.identity.sign_out().await {
            tracing::warn!(error = %e, "sign-out failed; clearing local session anyway");
        }
        self.inner.publish(Resolved::signed_out());
    }

    pub async fn forgot_password(&self, email: &str) -> ClientResult<()> {
        let redirect = self.inner.config.reset_password_redirect();
        self.inner
            .identity
            .reset_password_for_email(email, &redirect)
            .await?;
        Ok(())
    }

    pub async fn update_password(&self, new_password: &str) -> ClientResult<()> {
        self.inner.identity.update_password(new_password).await?;
        Ok(())
    }

    pub async fn resend_verification_email(&self, email: &str) -> ClientResult<()> {
        self.inner.identity.resend_verification(email).await?;
        Ok(())
    }

    /// Replace the cached profile (e.g. after the UI edited it).
    pub async fn set_profile(&self, profile: Option<Profile>) {
        let _gate = self.inner.gate.lock().await;
        self.inner.state.send_modify(|state| {
            state.profile = profile;
            state.version += 1;
        });
    }

    /// True once the session-event listener is running.
    pub fn is_listening(&self) -> bool {
        self.inner.listener.get().is_some()
    }

    fn listen(&self) {
        if self.inner.listener.get().is_some() {
            tracing::debug!("session listener already running");
            return;
        }

        let events = self.inner.identity.session_events();
        let weak = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(run_listener(weak, events));
        if let Err(handle) = self.inner.listener.set(handle) {
            // Lost a race with a concurrent initialize.
            handle.abort();
        }
    }
}

async fn run_listener(store: Weak<Inner>, mut events: broadcast::Receiver<SessionEvent>) {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "session listener lagged; resyncing");
                let Some(inner) = store.upgrade() else {
                    break;
                };
                inner.resync().await;
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        let Some(inner) = store.upgrade() else {
            break;
        };
        inner.handle_event(event).await;
    }
    tracing::debug!("session listener stopped");
}

impl Inner {
    fn publish(&self, resolved: Resolved) {
        self.state
            .send_modify(|state| *state = resolved.into_state(state.version + 1));
    }

    /// Cold-start resolution: creates the default profile when none exists.
    async fn resolve_initial(&self, session: Session) -> Resolved {
        let user = &session.user;
        let profile = match self.profiles.get_profile(&user.id).await {
            Ok(Some(profile)) => Some(profile),
            Ok(None) => {
                let default = Profile::default_for(
                    user.id.clone(),
                    &user.email,
                    user.metadata.full_name.as_deref(),
                    user.metadata.role(),
                );
                match self.profiles.insert_profile(default).await {
                    Ok(profile) => {
                        tracing::info!(user_id = %user.id, role = %profile.role, "created default profile");
                        Some(profile)
                    }
                    Err(StoreError::Duplicate(_)) => self.reread(&session).await,
                    Err(e) => {
                        tracing::error!(user_id = %user.id, error = %e, "failed to create default profile");
                        None
                    }
                }
            }
            Err(e) => {
                tracing::error!(user_id = %user.id, error = %e, "profile lookup failed");
                None
            }
        };
        Resolved::signed_in(session, profile)
    }

    async fn reread(&self, session: &Session) -> Option<Profile> {
        match self.profiles.get_profile(&session.user.id).await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::error!(user_id = %session.user.id, error = %e, "profile lookup failed");
                None
            }
        }
    }

    /// Rebuild state from the identity service after missed events.
    async fn resync(&self) {
        let _gate = self.gate.lock().await;
        let resolved = match self.identity.get_session().await {
            Ok(Some(session)) => {
                let profile = self.reread(&session).await;
                Resolved::signed_in(session, profile)
            }
            Ok(None) => Resolved::signed_out(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read session after lag");
                return;
            }
        };
        self.publish(resolved);
    }

    async fn handle_event(&self, event: SessionEvent) {
        let _gate = self.gate.lock().await;
        match (event.kind, event.session) {
            (SessionEventKind::SignedIn | SessionEventKind::TokenRefreshed, Some(session)) => {
                tracing::debug!(kind = ?event.kind, user_id = %session.user.id, "session event");
                let profile = self.reread(&session).await;
                self.publish(Resolved::signed_in(session, profile));
            }
            (SessionEventKind::SignedOut, _) => {
                tracing::debug!("session event: signed out");
                self.publish(Resolved::signed_out());
            }
            (kind, None) => {
                tracing::warn!(?kind, "session event without a session");
            }
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(handle) = self.listener.get() {
            handle.abort();
        }
    }
}

impl core::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionStore")
            .field("state", &*self.inner.state.borrow())
            .field("listening", &self.is_listening())
            .finish_non_exhaustive()
    }
}
