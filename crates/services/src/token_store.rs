use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Error)]
pub enum TokenStoreError {
    #[error("Token store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Token store parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Persisted OAuth grant. Unknown provider fields end up in `extra` so a
/// merge never discards anything the provider sent earlier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredTokens {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Unix seconds at which the access token stops working.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StoredTokens {
    /// A grant with a refresh token is durable; one with only an access
    /// token is ephemeral but still usable until it expires.
    pub fn is_usable(&self) -> bool {
        self.refresh_token.is_some() || self.access_token.is_some()
    }

    pub fn is_expired(&self, now: i64, skew_secs: i64) -> bool {
        match self.expiry {
            Some(exp) => now + skew_secs >= exp,
            None => false,
        }
    }

    /// Shallow merge: fields present in the response overwrite, absent
    /// fields are preserved. Google omits `refresh_token` on refresh
    /// grants, so a full overwrite here would lose the durable half.
    pub fn merge_from(&mut self, delta: &TokenResponse, now: i64) {
        if let Some(access_token) = &delta.access_token {
            self.access_token = Some(access_token.clone());
        }
        if let Some(refresh_token) = &delta.refresh_token {
            self.refresh_token = Some(refresh_token.clone());
        }
        if let Some(ttl) = delta.expires_in {
            self.expiry = Some(now + ttl);
        }
        for (key, value) in &delta.extra {
            self.extra.insert(key.clone(), value.clone());
        }
    }
}

/// Body of a successful token-endpoint response. Everything is optional:
/// refresh grants carry no `refresh_token`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Single-file JSON credential store. Writes go through a temp file plus
/// rename, and read-merge-write runs under one async mutex so concurrent
/// refreshes cannot interleave into a torn or stale file.
pub struct TokenStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<Option<StoredTokens>, TokenStoreError> {
        self.read_current().await
    }

    /// Full overwrite, used when a fresh consent grant replaces whatever
    /// was stored before.
    pub async fn save(&self, tokens: &StoredTokens) -> Result<(), TokenStoreError> {
        let _guard = self.lock.lock().await;
        self.write_atomic(tokens).await
    }

    /// Read-current, shallow-merge-in, write-back, all under the lock.
    pub async fn merge(
        &self,
        delta: &TokenResponse,
        now: i64,
    ) -> Result<StoredTokens, TokenStoreError> {
        let _guard = self.lock.lock().await;
        let mut current = self.read_current().await?.unwrap_or_default();
        current.merge_from(delta, now);
        self.write_atomic(&current).await?;
        debug!("token store updated after refresh");
        Ok(current)
    }

    pub async fn clear(&self) -> Result<(), TokenStoreError> {
        let _guard = self.lock.lock().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn read_current(&self) -> Result<Option<StoredTokens>, TokenStoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_atomic(&self, tokens: &StoredTokens) -> Result<(), TokenStoreError> {
        let json = serde_json::to_vec_pretty(tokens)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}
