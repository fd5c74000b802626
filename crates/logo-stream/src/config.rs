use std::time::Duration;

use crate::errors::LogoStreamError;

const DEFAULT_BASE_URL: &str = "http://localhost:5080/api";
const DEFAULT_SAVING_URL: &str = "http://localhost:5000/api";

/// Configuration for the generation service client.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL the generation endpoints hang off (for example
    /// `http://localhost:5080/api`).
    pub base_url: String,
    /// Timeout for request/response calls (generate, abort).
    ///
    /// Never applied to the SSE body, which stays open for the whole task.
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(120),
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("logo-stream/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    /// Creates a config pointing at `base_url` with default timeouts.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Builds a config from `LOGO_SPARK_BASE_URL` and `LOGO_SPARK_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, LogoStreamError> {
        let mut config = Self::default();
        if let Ok(base_url) = std::env::var("LOGO_SPARK_BASE_URL")
            && !base_url.trim().is_empty()
        {
            config.base_url = base_url;
        }
        if let Some(timeout) = read_secs("LOGO_SPARK_TIMEOUT_SECS")? {
            config.timeout = timeout;
        }
        Ok(config)
    }

    /// Overrides the base URL (for proxies or test servers).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), LogoStreamError> {
        if self.base_url.trim().is_empty() {
            return Err(LogoStreamError::Config("base_url must not be empty".into()));
        }
        Ok(())
    }

    pub(crate) fn generate_url(&self) -> String {
        format!("{}/generate", self.trimmed_base())
    }

    pub(crate) fn stream_url(&self, task_id: &str) -> String {
        format!("{}/stream-logos/{task_id}", self.trimmed_base())
    }

    pub(crate) fn abort_url(&self, task_id: &str) -> String {
        format!("{}/abort-generation/{task_id}", self.trimmed_base())
    }

    fn trimmed_base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

/// Configuration for the saved-logo service client.
#[derive(Clone, Debug)]
pub struct SavedLogoConfig {
    pub base_url: String,
    /// Bearer token issued by the account service.
    pub token: Option<String>,
    pub timeout: Duration,
}

impl Default for SavedLogoConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SAVING_URL.to_string(),
            token: None,
            timeout: Duration::from_secs(30),
        }
    }
}

impl SavedLogoConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Builds a config from `LOGO_SPARK_SAVING_URL` and `LOGO_SPARK_TOKEN`.
    pub fn from_env() -> Result<Self, LogoStreamError> {
        let mut config = Self::default();
        if let Ok(base_url) = std::env::var("LOGO_SPARK_SAVING_URL")
            && !base_url.trim().is_empty()
        {
            config.base_url = base_url;
        }
        config.token = std::env::var("LOGO_SPARK_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty());
        Ok(config)
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/saving/{path}", self.base_url.trim_end_matches('/'))
    }

    pub(crate) fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/{path}", self.base_url.trim_end_matches('/'))
    }
}

fn read_secs(key: &str) -> Result<Option<Duration>, LogoStreamError> {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<u64>()
            .map(|secs| Some(Duration::from_secs(secs)))
            .map_err(|e| LogoStreamError::Config(format!("{key} must be a number of seconds: {e}"))),
        _ => Ok(None),
    }
}
