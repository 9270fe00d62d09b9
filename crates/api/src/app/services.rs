//! Service wiring: which backend sits behind each collaborator.
//!
//! The elevated profile reader is built here and moved straight into the
//! [`Authenticator`]; [`AppServices`] only carries the restricted store.

use std::sync::Arc;

use anyhow::Context;

use rollcall_auth::{Authenticator, ElevatedProfiles, IdentityService, ProfileStore};
use rollcall_infra::{
    GoTrueClient, GoTrueConfig, InMemoryIdentityService, InMemoryProfileStore, InMemoryResetLog,
    InMemoryStudentStore, PostgresProfileStore, PostgresResetLog, PostgresStudentStore, ResetLog,
    StudentStore, postgres,
};

use crate::config::{Backend, HostedBackend, Settings};

const POOL_SIZE: u32 = 10;

/// Handles shared by every request handler.
#[derive(Clone)]
pub struct AppServices {
    pub identity: Arc<dyn IdentityService>,
    /// Restricted profile store.
    pub profiles: Arc<dyn ProfileStore>,
    pub reset_log: Arc<dyn ResetLog>,
    pub students: Arc<dyn StudentStore>,
    pub site_url: String,
}

impl AppServices {
    pub fn reset_password_redirect(&self) -> String {
        format!("{}/reset-password", self.site_url)
    }

    pub fn login_redirect(&self) -> String {
        format!("{}/login", self.site_url)
    }
}

/// Everything `build_app` needs.
pub struct Wiring {
    pub services: AppServices,
    pub authenticator: Authenticator,
}

/// In-process backend: fakes for the identity service and every store.
///
/// Handles stay reachable so tests (and local tooling) can seed data.
#[derive(Clone)]
pub struct InMemoryBackend {
    pub identity: Arc<InMemoryIdentityService>,
    pub profiles: Arc<InMemoryProfileStore>,
    pub reset_log: Arc<InMemoryResetLog>,
    pub students: Arc<InMemoryStudentStore>,
}

impl InMemoryBackend {
    /// Accounts are confirmed at sign-up: nothing delivers email in-process.
    pub fn new(token_secret: &[u8]) -> Self {
        Self {
            identity: Arc::new(InMemoryIdentityService::stateless(token_secret).with_auto_confirm()),
            profiles: Arc::new(InMemoryProfileStore::new()),
            reset_log: Arc::new(InMemoryResetLog::new()),
            students: Arc::new(InMemoryStudentStore::new()),
        }
    }

    pub fn wire(&self, site_url: impl Into<String>) -> Wiring {
        let authenticator = Authenticator::new(
            self.identity.clone(),
            // No row-level policy in memory: the same table backs both handles.
            ElevatedProfiles::new(self.profiles.clone()),
        );
        Wiring {
            services: AppServices {
                identity: self.identity.clone(),
                profiles: self.profiles.clone(),
                reset_log: self.reset_log.clone(),
                students: self.students.clone(),
                site_url: site_url.into(),
            },
            authenticator,
        }
    }
}

/// Wire the backend selected by `settings`.
pub async fn build_services(settings: &Settings) -> anyhow::Result<Wiring> {
    match &settings.backend {
        Backend::Hosted(hosted) => hosted_services(hosted, &settings.site_url).await,
        Backend::InMemory { token_secret } => {
            tracing::warn!("IDENTITY_URL/DATABASE_URL not set; using in-memory backend");
            Ok(InMemoryBackend::new(token_secret.as_bytes()).wire(settings.site_url.clone()))
        }
    }
}

async fn hosted_services(hosted: &HostedBackend, site_url: &str) -> anyhow::Result<Wiring> {
    let identity: Arc<dyn IdentityService> = Arc::new(
        GoTrueClient::stateless(GoTrueConfig::new(
            hosted.identity_url.clone(),
            hosted.identity_anon_key.clone(),
        ))
        .context("failed to build identity client")?,
    );

    let restricted = postgres::connect(&hosted.database_url, POOL_SIZE)
        .await
        .context("failed to connect to DATABASE_URL")?;
    let elevated = postgres::connect(&hosted.service_database_url, 2)
        .await
        .context("failed to connect to SERVICE_DATABASE_URL")?;

    tracing::info!(identity_url = %hosted.identity_url, "hosted backend wired");

    Ok(Wiring {
        authenticator: Authenticator::new(
            identity.clone(),
            ElevatedProfiles::new(Arc::new(PostgresProfileStore::new(elevated))),
        ),
        services: AppServices {
            identity,
            profiles: Arc::new(PostgresProfileStore::new(restricted.clone())),
            reset_log: Arc::new(PostgresResetLog::new(restricted.clone())),
            students: Arc::new(PostgresStudentStore::new(restricted)),
            site_url: site_url.to_string(),
        },
    })
}
