//! Credential persistence hooks.
//!
//! The host (usually a web session store) registers a [`CredentialPersister`]
//! so a refreshed credential survives past the current request. Notification
//! is fire-and-forget: the coordinator logs a failed persist and moves on.

use crate::error::Result;
use crate::types::Credential;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[async_trait]
pub trait CredentialPersister: Send + Sync {
    async fn persist(&self, credential: &Credential) -> Result<()>;
}

/// Keeps the latest credential per subject in memory.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    credentials: RwLock<HashMap<String, Credential>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, subject_id: &str) -> Option<Credential> {
        self.credentials.read().await.get(subject_id).cloned()
    }

    pub async fn remove(&self, subject_id: &str) -> Option<Credential> {
        self.credentials.write().await.remove(subject_id)
    }

    pub async fn len(&self) -> usize {
        self.credentials.read().await.len()
    }
}

#[async_trait]
impl CredentialPersister for InMemoryCredentialStore {
    async fn persist(&self, credential: &Credential) -> Result<()> {
        self.credentials
            .write()
            .await
            .insert(credential.subject_id.clone(), credential.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_store_keeps_latest_per_subject() {
        let store = InMemoryCredentialStore::new();
        let now = Utc::now();

        store
            .persist(&Credential::new("a1", "r1", now, "jane"))
            .await
            .unwrap();
        store
            .persist(&Credential::new("a2", "r2", now, "jane"))
            .await
            .unwrap();

        assert_eq!(store.len().await, 1);
        assert_eq!(store.get("jane").await.unwrap().access_token, "a2");
        assert!(store.remove("jane").await.is_some());
        assert!(store.get("jane").await.is_none());
    }
}
