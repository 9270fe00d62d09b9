/// Default base URL of the web front end.
pub const DEFAULT_SITE_URL: &str = "http://localhost:5173";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base used to build email redirect targets.
    pub site_url: String,
}

impl ClientConfig {
    pub fn new(site_url: impl Into<String>) -> Self {
        Self {
            site_url: site_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Read `SITE_URL`, falling back to the local dev server.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        match lookup("SITE_URL") {
            Some(url) if !url.trim().is_empty() => Self::new(url.trim()),
            _ => Self::default(),
        }
    }

    /// Where the sign-up confirmation email lands.
    pub fn login_redirect(&self) -> String {
        format!("{}/login", self.site_url)
    }

    /// Where the password-reset email lands.
    pub fn reset_password_redirect(&self) -> String {
        format!("{}/reset-password", self.site_url)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SITE_URL)
    }
}
