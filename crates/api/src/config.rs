//! Process configuration from the environment.

use std::net::SocketAddr;

use anyhow::Context;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_SITE_URL: &str = "http://localhost:5173";
const DEV_TOKEN_SECRET: &str = "dev-secret";

/// Connection details of the hosted backend.
#[derive(Clone)]
pub struct HostedBackend {
    pub identity_url: String,
    pub identity_anon_key: String,
    /// Restricted credential (row-level policy applies).
    pub database_url: String,
    /// Elevated credential, only used for the authenticator's profile reads.
    pub service_database_url: String,
}

impl core::fmt::Debug for HostedBackend {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HostedBackend")
            .field("identity_url", &self.identity_url)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub enum Backend {
    Hosted(HostedBackend),
    /// In-process fakes; tokens are signed with `token_secret`.
    InMemory { token_secret: String },
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_addr: SocketAddr,
    pub site_url: String,
    pub backend: Backend,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key/value source (the environment in prod).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr = var("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .context("BIND_ADDR is not a valid socket address")?;

        let site_url = var("SITE_URL")
            .unwrap_or_else(|| DEFAULT_SITE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let backend = match (var("IDENTITY_URL"), var("DATABASE_URL")) {
            (Some(identity_url), Some(database_url)) => {
                let identity_anon_key =
                    var("IDENTITY_ANON_KEY").context("IDENTITY_ANON_KEY must be set with IDENTITY_URL")?;
                let service_database_url =
                    var("SERVICE_DATABASE_URL").unwrap_or_else(|| database_url.clone());
                Backend::Hosted(HostedBackend {
                    identity_url,
                    identity_anon_key,
                    database_url,
                    service_database_url,
                })
            }
            _ => {
                let token_secret = var("DEV_TOKEN_SECRET").unwrap_or_else(|| {
                    tracing::warn!("DEV_TOKEN_SECRET not set; using insecure dev default");
                    DEV_TOKEN_SECRET.to_string()
                });
                Backend::InMemory { token_secret }
            }
        };

        Ok(Self {
            bind_addr,
            site_url,
            backend,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn settings(pairs: &[(&str, &str)]) -> anyhow::Result<Settings> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_to_in_memory_backend() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(s.site_url, DEFAULT_SITE_URL);
        assert!(matches!(s.backend, Backend::InMemory { ref token_secret } if token_secret == "dev-secret"));
    }

    #[test]
    fn service_database_url_falls_back_to_database_url() {
        let s = settings(&[
            ("IDENTITY_URL", "https://id.example"),
            ("IDENTITY_ANON_KEY", "anon"),
            ("DATABASE_URL", "postgres://app@db/school"),
        ])
        .unwrap();
        let Backend::Hosted(hosted) = s.backend else {
            panic!("expected hosted backend");
        };
        assert_eq!(hosted.service_database_url, "postgres://app@db/school");
    }

    #[test]
    fn hosted_backend_requires_anon_key() {
        let err = settings(&[
            ("IDENTITY_URL", "https://id.example"),
            ("DATABASE_URL", "postgres://app@db/school"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("IDENTITY_ANON_KEY"));
    }

    #[test]
    fn rejects_bad_bind_addr() {
        assert!(settings(&[("BIND_ADDR", "not-an-addr")]).is_err());
    }
}
