use tracing::{debug, info};

use crate::config::SavedLogoConfig;
use crate::errors::{LogoStreamError, RemoteError};
use crate::http::read_json;

/// A logo stored in the user's account.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedLogo {
    pub id: i64,
    pub name: String,
    pub image_path: String,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "PascalCase")]
struct SaveBody<'a> {
    image_path: &'a str,
    name: &'a str,
}

/// Account the token was issued for.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize)]
pub struct Account {
    pub id: String,
    pub username: String,
    pub name: String,
}

/// Result of a successful login or registration.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize)]
pub struct AuthSession {
    pub token: String,
    pub user: Account,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(serde::Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

/// Client for the bearer-authenticated saved-logo endpoints.
pub struct SavedLogoClient {
    client: reqwest::Client,
    config: SavedLogoConfig,
}

impl SavedLogoClient {
    pub fn new(config: SavedLogoConfig) -> Result<Self, LogoStreamError> {
        if config.base_url.trim().is_empty() {
            return Err(LogoStreamError::Config(
                "saved-logo base_url must not be empty".into(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LogoStreamError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self, LogoStreamError> {
        Self::new(SavedLogoConfig::from_env()?)
    }

    /// Logs in and keeps the issued token for later calls.
    pub async fn login(
        &mut self,
        username: &str,
        password: &str,
    ) -> Result<AuthSession, LogoStreamError> {
        self.authenticate("login", username, password, None).await
    }

    /// Creates an account and keeps the issued token for later calls.
    pub async fn register(
        &mut self,
        username: &str,
        password: &str,
        name: &str,
    ) -> Result<AuthSession, LogoStreamError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LogoStreamError::Validation("display name is required".into()));
        }
        self.authenticate("register", username, password, Some(name)).await
    }

    async fn authenticate(
        &mut self,
        action: &str,
        username: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<AuthSession, LogoStreamError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(LogoStreamError::Validation(
                "username and password are required".into(),
            ));
        }
        debug!(username, action, "authenticating");
        let response = self
            .client
            .post(self.config.auth_url(action))
            .json(&Credentials {
                username,
                password,
                name,
            })
            .send()
            .await
            .map_err(|e| RemoteError::transport(format!("{action} request failed: {e}")))?;
        let session: AuthSession = read_json(response).await?;
        info!(username = %session.user.username, action, "authenticated");
        self.config.token = Some(session.token.clone());
        Ok(session)
    }

    /// Stores `image_path` under `name`.
    ///
    /// The name must be non-empty and the path must point under `/images/`;
    /// both are checked before any request is sent.
    pub async fn save(&self, name: &str, image_path: &str) -> Result<SavedLogo, LogoStreamError> {
        let token = self.token()?;
        let name = name.trim();
        let image_path = image_path.trim();
        if name.is_empty() {
            return Err(LogoStreamError::Validation("logo name is required".into()));
        }
        if !image_path.starts_with("/images/") {
            return Err(LogoStreamError::Validation(format!(
                "invalid image path `{image_path}`, expected /images/..."
            )));
        }

        debug!(name, image_path, "saving logo");
        let response = self
            .client
            .post(self.config.url("save-image"))
            .bearer_auth(token)
            .json(&SaveBody { image_path, name })
            .send()
            .await
            .map_err(|e| RemoteError::transport(format!("save request failed: {e}")))?;
        let saved: SavedLogo = read_json(response).await?;
        info!(id = saved.id, name = %saved.name, "logo saved");
        Ok(saved)
    }

    /// Lists the logos saved by the token's user.
    pub async fn list(&self) -> Result<Vec<SavedLogo>, LogoStreamError> {
        let token = self.token()?;
        let response = self
            .client
            .get(self.config.url("saved-images"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| RemoteError::transport(format!("list request failed: {e}")))?;
        Ok(read_json(response).await?)
    }

    /// Removes a saved logo owned by the token's user.
    pub async fn remove(&self, id: i64) -> Result<(), LogoStreamError> {
        let token = self.token()?;
        let response = self
            .client
            .delete(self.config.url(&format!("remove-image/{id}")))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| RemoteError::transport(format!("remove request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(RemoteError::Status {
                code: status.as_u16(),
                body,
            }
            .into());
        }
        info!(id, "saved logo removed");
        Ok(())
    }

    /// Token used for the saved-logo calls, if any.
    pub fn token(&self) -> Result<&str, LogoStreamError> {
        self.config
            .token
            .as_deref()
            .filter(|token| !token.trim().is_empty())
            .ok_or(LogoStreamError::Unauthorized)
    }
}
