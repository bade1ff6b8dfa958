use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use snapdrive_config::OAuthSettings;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::token_store::{StoredTokens, TokenResponse, TokenStore, TokenStoreError};

/// Refresh slightly before the recorded expiry so a token never dies
/// mid-request.
const EXPIRY_SKEW_SECS: i64 = 60;

/// Narrow scope: only files this application creates. Avoids the stricter
/// provider review that full-drive access triggers.
pub const DRIVE_FILE_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Not authenticated")]
    NotAuthenticated,
    #[error("Authorization code exchange failed: {0}")]
    Exchange(String),
    #[error(transparent)]
    Store(#[from] TokenStoreError),
    #[error("Token endpoint request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct TokenErrorBody {
    error: Option<String>,
    error_description: Option<String>,
}

impl TokenErrorBody {
    fn message(self) -> String {
        match (self.error, self.error_description) {
            (Some(e), Some(d)) => format!("{e}: {d}"),
            (Some(e), None) => e,
            _ => "unknown token endpoint error".to_string(),
        }
    }
}

/// Owns the OAuth grant lifecycle: consent URL construction, code
/// exchange, token refresh, and persistence. Handlers only ever see the
/// bearer token this service mints; raw grant fields stay in here.
pub struct AuthService {
    oauth: OAuthSettings,
    store: Arc<TokenStore>,
    client: reqwest::Client,
    /// Access token minted from the environment-provided refresh token.
    /// Only used when `oauth.refresh_token` is configured; the file store
    /// is never touched in that mode.
    env_access: RwLock<Option<(String, i64)>>,
}

impl AuthService {
    pub fn new(oauth: OAuthSettings, store: Arc<TokenStore>) -> Self {
        Self {
            oauth,
            store,
            client: reqwest::Client::new(),
            env_access: RwLock::new(None),
        }
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// True iff a grant exists that can still mint bearer tokens.
    /// Side-effect-free.
    pub async fn is_authorized(&self) -> bool {
        if self.oauth.refresh_token.is_some() {
            return true;
        }
        match self.store.load().await {
            Ok(Some(tokens)) => tokens.is_usable(),
            _ => false,
        }
    }

    /// Provider consent URL. `access_type=offline` plus `prompt=consent`
    /// makes Google return a refresh token on every grant.
    pub fn authorize_url(&self) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
            self.oauth.auth_uri,
            self.oauth.client_id,
            urlencoding::encode(&self.oauth.redirect_url),
            urlencoding::encode(DRIVE_FILE_SCOPE),
        )
    }

    /// Exchanges a one-time consent code and persists the grant (full
    /// overwrite). A rejected code leaves the store untouched.
    pub async fn exchange_code(&self, code: &str) -> Result<StoredTokens, AuthError> {
        let delta = self
            .token_request(&[
                ("code", code),
                ("client_id", &self.oauth.client_id),
                ("client_secret", &self.oauth.client_secret),
                ("redirect_uri", &self.oauth.redirect_url),
                ("grant_type", "authorization_code"),
            ])
            .await?;

        let mut tokens = StoredTokens::default();
        tokens.merge_from(&delta, Utc::now().timestamp());
        if tokens.access_token.is_none() {
            return Err(AuthError::Exchange(
                "token response carried no access_token".to_string(),
            ));
        }
        self.store.save(&tokens).await?;
        debug!("authorization code exchanged, grant persisted");
        Ok(tokens)
    }

    /// Current bearer token, refreshing when expired. The refresh result
    /// is merged into the store before the token is handed out, so the
    /// persisted grant is never behind the one in use.
    pub async fn bearer_token(&self) -> Result<String, AuthError> {
        if let Some(refresh_token) = self.oauth.refresh_token.clone() {
            return self.env_bearer_token(&refresh_token).await;
        }

        let tokens = self
            .store
            .load()
            .await?
            .ok_or(AuthError::NotAuthenticated)?;
        let now = Utc::now().timestamp();
        if let Some(access_token) = &tokens.access_token {
            if !tokens.is_expired(now, EXPIRY_SKEW_SECS) {
                return Ok(access_token.clone());
            }
        }

        let refresh_token = tokens
            .refresh_token
            .clone()
            .ok_or(AuthError::NotAuthenticated)?;
        let delta = self.refresh_grant(&refresh_token).await?;
        let merged = self.store.merge(&delta, Utc::now().timestamp()).await?;
        merged.access_token.ok_or_else(|| {
            AuthError::Exchange("refresh response carried no access_token".to_string())
        })
    }

    pub async fn logout(&self) -> Result<(), AuthError> {
        self.store.clear().await?;
        debug!("grant deleted");
        Ok(())
    }

    async fn env_bearer_token(&self, refresh_token: &str) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        {
            let cached = self.env_access.read().await;
            if let Some((access_token, expiry)) = cached.as_ref() {
                if now + EXPIRY_SKEW_SECS < *expiry {
                    return Ok(access_token.clone());
                }
            }
        }

        let delta = self.refresh_grant(refresh_token).await?;
        let access_token = delta.access_token.clone().ok_or_else(|| {
            AuthError::Exchange("refresh response carried no access_token".to_string())
        })?;
        let expiry = now + delta.expires_in.unwrap_or(3600);
        *self.env_access.write().await = Some((access_token.clone(), expiry));
        Ok(access_token)
    }

    async fn refresh_grant(&self, refresh_token: &str) -> Result<TokenResponse, AuthError> {
        debug!("access token expired, refreshing");
        self.token_request(&[
            ("refresh_token", refresh_token),
            ("client_id", &self.oauth.client_id),
            ("client_secret", &self.oauth.client_secret),
            ("grant_type", "refresh_token"),
        ])
        .await
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenResponse, AuthError> {
        let resp = self
            .client
            .post(&self.oauth.token_uri)
            .form(form)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<TokenErrorBody>(&body)
                .map(TokenErrorBody::message)
                .unwrap_or_else(|_| status.to_string());
            warn!(%status, "token endpoint rejected request: {message}");
            return Err(AuthError::Exchange(message));
        }
        Ok(resp.json::<TokenResponse>().await?)
    }
}
