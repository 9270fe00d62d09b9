//! Request authentication: bearer token → identity user → profile → principal.

use std::sync::Arc;

use rollcall_core::{AppError, AppResult, UnauthenticatedReason};

use crate::{ElevatedProfiles, IdentityService, Principal};

/// Resolves the caller of a request.
///
/// Every call re-validates the token with the identity service; nothing is
/// cached between requests and nothing is retried.
pub struct Authenticator {
    identity: Arc<dyn IdentityService>,
    profiles: ElevatedProfiles,
}

impl Authenticator {
    pub fn new(identity: Arc<dyn IdentityService>, profiles: ElevatedProfiles) -> Self {
        Self { identity, profiles }
    }

    /// Authenticate a request from its raw `Authorization` header value.
    pub async fn authenticate(&self, authorization: Option<&str>) -> AppResult<Principal> {
        let token = extract_bearer(authorization).inspect_err(|_| {
            tracing::info!("no bearer token provided");
        })?;

        let user = self.identity.validate_token(token).await.map_err(|e| {
            tracing::warn!(error = %e, "token rejected by identity service");
            AppError::unauthenticated(UnauthenticatedReason::InvalidToken)
        })?;

        let profile = match self.profiles.get_profile(&user.id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                tracing::error!(user_id = %user.id, email = %user.email, "profile not found for user");
                return Err(AppError::ProfileMissing);
            }
            Err(e) => {
                tracing::error!(user_id = %user.id, error = %e, "profile query failed");
                return Err(AppError::ProfileLookupFailed(e.to_string()));
            }
        };

        let principal = Principal::resolve(&user, &profile);
        tracing::debug!(user_id = %principal.id, role = %principal.role, "request authenticated");
        Ok(principal)
    }
}

impl core::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Authenticator").finish_non_exhaustive()
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn extract_bearer(header: Option<&str>) -> AppResult<&str> {
    let missing = || AppError::unauthenticated(UnauthenticatedReason::MissingToken);

    let header = header.ok_or_else(missing)?;
    let token = header.strip_prefix("Bearer ").ok_or_else(missing)?.trim();
    if token.is_empty() {
        return Err(missing());
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::sync::broadcast;

    use rollcall_core::{Profile, Role, StoreError, UserId};

    use super::*;
    use crate::{
        IdentityError, IdentityUser, ProfileStore, Session, SessionEvent, SignUp, UserMetadata,
    };

    struct TokenTable {
        users: HashMap<String, IdentityUser>,
        events: broadcast::Sender<SessionEvent>,
    }

    impl TokenTable {
        fn with(token: &str, id: &str) -> Self {
            let mut users = HashMap::new();
            users.insert(
                token.to_string(),
                IdentityUser {
                    id: UserId::new(id),
                    email: format!("{id}@school.test"),
                    metadata: UserMetadata::default(),
                },
            );
            let (events, _) = broadcast::channel(4);
            Self { users, events }
        }
    }

    #[async_trait]
    impl IdentityService for TokenTable {
        async fn validate_token(&self, token: &str) -> Result<IdentityUser, IdentityError> {
            self.users.get(token).cloned().ok_or(IdentityError::InvalidToken)
        }
        async fn get_session(&self) -> Result<Option<Session>, IdentityError> {
            Ok(None)
        }
        async fn sign_in_with_password(&self, _: &str, _: &str) -> Result<Session, IdentityError> {
            Err(IdentityError::InvalidCredentials)
        }
        async fn sign_up(&self, _: SignUp) -> Result<IdentityUser, IdentityError> {
            Err(IdentityError::AlreadyRegistered)
        }
        async fn sign_out(&self) -> Result<(), IdentityError> {
            Ok(())
        }
        async fn revoke_token(&self, _: &str) -> Result<(), IdentityError> {
            Ok(())
        }
        async fn reset_password_for_email(&self, _: &str, _: &str) -> Result<(), IdentityError> {
            Ok(())
        }
        async fn update_password(&self, _: &str) -> Result<IdentityUser, IdentityError> {
            Err(IdentityError::NoSession)
        }
        async fn resend_verification(&self, _: &str) -> Result<(), IdentityError> {
            Ok(())
        }
        fn session_events(&self) -> broadcast::Receiver<SessionEvent> {
            self.events.subscribe()
        }
    }

    #[derive(Default)]
    struct ProfileTable {
        rows: Mutex<HashMap<UserId, Profile>>,
        broken: bool,
    }

    #[async_trait]
    impl ProfileStore for ProfileTable {
        async fn get_profile(&self, id: &UserId) -> Result<Option<Profile>, StoreError> {
            if self.broken {
                return Err(StoreError::backend("connection refused"));
            }
            Ok(self.rows.lock().unwrap().get(id).cloned())
        }
        async fn insert_profile(&self, profile: Profile) -> Result<Profile, StoreError> {
            self.rows.lock().unwrap().insert(profile.id.clone(), profile.clone());
            Ok(profile)
        }
        async fn find_profile_id_by_email(&self, _: &str) -> Result<Option<UserId>, StoreError> {
            Ok(None)
        }
    }

    fn authenticator(profiles: ProfileTable) -> (Authenticator, Arc<ProfileTable>) {
        let profiles = Arc::new(profiles);
        let auth = Authenticator::new(
            Arc::new(TokenTable::with("good-token", "u-1")),
            ElevatedProfiles::new(profiles.clone()),
        );
        (auth, profiles)
    }

    fn seeded() -> ProfileTable {
        let table = ProfileTable::default();
        table.rows.lock().unwrap().insert(
            UserId::new("u-1"),
            Profile {
                id: UserId::new("u-1"),
                role: Role::Teacher,
                full_name: "Tess Teacher".into(),
                email: "u-1@school.test".into(),
            },
        );
        table
    }

    #[test]
    fn bearer_extraction() {
        assert_eq!(extract_bearer(Some("Bearer abc")).unwrap(), "abc");
        assert!(extract_bearer(None).is_err());
        assert!(extract_bearer(Some("Basic abc")).is_err());
        assert!(extract_bearer(Some("Bearer   ")).is_err());
        assert!(extract_bearer(Some("bearer abc")).is_err());
    }

    #[tokio::test]
    async fn missing_header_is_unauthenticated() {
        let (auth, _) = authenticator(seeded());
        let err = auth.authenticate(None).await.unwrap_err();
        assert_eq!(err, AppError::Unauthenticated(UnauthenticatedReason::MissingToken));
        assert_eq!(err.public_message().as_deref(), Some("Please login to continue"));
    }

    #[tokio::test]
    async fn unknown_token_is_unauthenticated() {
        let (auth, _) = authenticator(seeded());
        let err = auth.authenticate(Some("Bearer forged")).await.unwrap_err();
        assert_eq!(err, AppError::Unauthenticated(UnauthenticatedReason::InvalidToken));
        assert_eq!(err.public_message().as_deref(), Some("Please login again"));
    }

    #[tokio::test]
    async fn valid_token_resolves_principal_from_profile() {
        let (auth, _) = authenticator(seeded());
        let principal = auth.authenticate(Some("Bearer good-token")).await.unwrap();
        assert_eq!(principal.id, UserId::new("u-1"));
        assert_eq!(principal.role, Role::Teacher);
        assert_eq!(principal.full_name, "Tess Teacher");
        assert_eq!(principal.email, "u-1@school.test");
    }

    #[tokio::test]
    async fn missing_profile_is_reported_and_never_created() {
        let (auth, profiles) = authenticator(ProfileTable::default());
        let err = auth.authenticate(Some("Bearer good-token")).await.unwrap_err();
        assert_eq!(err, AppError::ProfileMissing);
        assert!(profiles.rows.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn store_failure_is_distinct_from_missing_profile() {
        let (auth, _) = authenticator(ProfileTable {
            broken: true,
            ..Default::default()
        });
        let err = auth.authenticate(Some("Bearer good-token")).await.unwrap_err();
        assert!(matches!(err, AppError::ProfileLookupFailed(_)));
    }
}
