use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub app: AppSettings,
    pub drive: DriveSettings,
    pub oauth: OAuthSettings,
    pub tokens: TokenSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DriveSettings {
    /// Destination folder for uploads; everything the gateway touches
    /// lives under this one folder.
    pub folder_id: String,
    pub api_base: String,
    pub upload_base: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OAuthSettings {
    /// Authorization mode; only "oauth" is supported.
    pub mode: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
    pub auth_uri: String,
    pub token_uri: String,
    /// Environment-provided refresh token. When set it is authoritative and
    /// the token file is never read or written (serverless deployments).
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TokenSettings {
    pub path: String,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::default()
                    .separator("__")
                    .prefix("SNAPDRIVE"),
            )
            .set_default("app.host", "0.0.0.0")?
            .set_default("app.port", 3000)?
            .set_default("app.cors_origins", Vec::<String>::new())?
            .set_default("drive.folder_id", "")?
            .set_default("drive.api_base", "https://www.googleapis.com/drive/v3")?
            .set_default(
                "drive.upload_base",
                "https://www.googleapis.com/upload/drive/v3",
            )?
            .set_default("oauth.mode", "oauth")?
            .set_default("oauth.client_id", "")?
            .set_default("oauth.client_secret", "")?
            .set_default(
                "oauth.redirect_url",
                "http://localhost:3000/oauth2callback",
            )?
            .set_default(
                "oauth.auth_uri",
                "https://accounts.google.com/o/oauth2/v2/auth",
            )?
            .set_default("oauth.token_uri", "https://oauth2.googleapis.com/token")?
            .set_default("tokens.path", "tokens.json")?
            .build()?;

        config.try_deserialize()
    }

    /// Values with no usable default; absence is a fatal startup error.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.oauth.mode.to_lowercase() != "oauth" {
            return Err(ConfigError::Message(format!(
                "unsupported oauth.mode '{}'",
                self.oauth.mode
            )));
        }
        if self.drive.folder_id.trim().is_empty() {
            return Err(ConfigError::Message(
                "drive.folder_id is required".to_string(),
            ));
        }
        if self.oauth.client_id.is_empty() || self.oauth.client_secret.is_empty() {
            return Err(ConfigError::Message(
                "oauth.client_id and oauth.client_secret are required".to_string(),
            ));
        }
        Ok(())
    }
}
