//! Durable per-retro auth token persistence behind a capability trait.

use std::{collections::HashMap, sync::Arc};

use anyhow::{Context, Result};
use async_trait::async_trait;
use shared::domain::RetroId;
use storage::Storage;
use tokio::sync::Mutex;

/// Key prefix for per-retro auth tokens in durable storage.
pub const AUTH_TOKEN_KEY_PREFIX: &str = "api-token-";

fn token_key(retro_id: RetroId) -> String {
    format!("{AUTH_TOKEN_KEY_PREFIX}{}", retro_id.0)
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn set_token(&self, retro_id: RetroId, token: &str) -> Result<()>;
    async fn token(&self, retro_id: RetroId) -> Result<Option<String>>;
    /// Removes every persisted token. Sign-out relies on this being wholesale.
    async fn clear_all(&self) -> Result<()>;
}

pub struct DurableTokenStore {
    store: Storage,
}

impl DurableTokenStore {
    pub async fn initialize(database_url: &str) -> Result<Arc<Self>> {
        let store = Storage::new(database_url)
            .await
            .with_context(|| format!("failed to initialize token storage at '{database_url}'"))?;
        Ok(Arc::new(Self { store }))
    }
}

#[async_trait]
impl TokenStore for DurableTokenStore {
    async fn set_token(&self, retro_id: RetroId, token: &str) -> Result<()> {
        self.store.put_entry(&token_key(retro_id), token).await
    }

    async fn token(&self, retro_id: RetroId) -> Result<Option<String>> {
        self.store.entry(&token_key(retro_id)).await
    }

    async fn clear_all(&self) -> Result<()> {
        self.store.clear_entries().await
    }
}

/// Process-local token store for tests and throwaway sessions.
#[derive(Default)]
pub struct MemoryTokenStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryTokenStore {
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn set_token(&self, retro_id: RetroId, token: &str) -> Result<()> {
        self.entries
            .lock()
            .await
            .insert(token_key(retro_id), token.to_string());
        Ok(())
    }

    async fn token(&self, retro_id: RetroId) -> Result<Option<String>> {
        Ok(self.entries.lock().await.get(&token_key(retro_id)).cloned())
    }

    async fn clear_all(&self) -> Result<()> {
        self.entries.lock().await.clear();
        Ok(())
    }
}
