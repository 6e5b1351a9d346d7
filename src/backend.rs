/**
 * Face Data Backend
 * Storage collaborator for enrollment uploads, verification fetches and resets
 */

use std::collections::HashMap;
use std::future::Future;

use tokio::sync::RwLock;
use tracing::info;

use crate::error::{FaceKeyError, Result};
use crate::records::{FetchPayload, UploadPayload};

/// Where enrolled records live. Transport, auth and retries are the
/// implementor's concern.
pub trait FaceDataBackend: Send + Sync {
    fn upload(&self, user_id: &str, payload: UploadPayload) -> impl Future<Output = Result<()>> + Send;

    fn fetch(&self, user_id: &str) -> impl Future<Output = Result<FetchPayload>> + Send;

    /// Removes every record and the salt of a user.
    fn delete(&self, user_id: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Process-local backend, one payload per user.
#[derive(Default)]
pub struct InMemoryBackend {
    users: RwLock<HashMap<String, UploadPayload>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, user_id: &str) -> bool {
        self.users.read().await.contains_key(user_id)
    }

    /// Replaces a stored payload wholesale.
    pub async fn insert(&self, user_id: &str, payload: UploadPayload) {
        self.users.write().await.insert(user_id.to_string(), payload);
    }
}

impl FaceDataBackend for InMemoryBackend {
    async fn upload(&self, user_id: &str, payload: UploadPayload) -> Result<()> {
        info!("Storing {} records for user_id={}", payload.records.len(), user_id);
        self.insert(user_id, payload).await;
        Ok(())
    }

    async fn fetch(&self, user_id: &str) -> Result<FetchPayload> {
        self.users
            .read()
            .await
            .get(user_id)
            .cloned()
            .map(FetchPayload::from)
            .ok_or_else(|| FaceKeyError::Backend(format!("no enrollment for user {}", user_id)))
    }

    async fn delete(&self, user_id: &str) -> Result<()> {
        match self.users.write().await.remove(user_id) {
            Some(_) => {
                info!("Deleted enrollment for user_id={}", user_id);
                Ok(())
            }
            None => Err(FaceKeyError::Backend(format!("no enrollment for user {}", user_id))),
        }
    }
}
