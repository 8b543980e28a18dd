//! In-process stores used by tests and `STORE_BACKEND=memory` deployments.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use stratus_core::models::{
    ConfigurationStatus, ConfigurationVersion, NewUserToken, Page, PageOptions, UserToken,
};
use stratus_core::AppError;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::configuration_version::ConfigurationVersionStore;
use super::user_token::UserTokenStore;

#[derive(Clone, Default)]
pub struct MemoryConfigurationVersionStore {
    versions: Arc<RwLock<HashMap<String, ConfigurationVersion>>>,
}

impl MemoryConfigurationVersionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn newest_first(mut versions: Vec<ConfigurationVersion>) -> Vec<ConfigurationVersion> {
        versions.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        versions
    }
}

#[async_trait]
impl ConfigurationVersionStore for MemoryConfigurationVersionStore {
    async fn create(&self, cv: &ConfigurationVersion) -> Result<(), AppError> {
        let mut versions = self.versions.write().await;
        if versions.contains_key(&cv.id) {
            return Err(AppError::Conflict(format!(
                "configuration version {} already exists",
                cv.id
            )));
        }
        versions.insert(cv.id.clone(), cv.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<ConfigurationVersion>, AppError> {
        Ok(self.versions.read().await.get(id).cloned())
    }

    async fn get_latest(
        &self,
        workspace_id: &str,
    ) -> Result<Option<ConfigurationVersion>, AppError> {
        let versions = self.versions.read().await;
        let matching = versions
            .values()
            .filter(|cv| cv.workspace_id == workspace_id)
            .cloned()
            .collect();
        Ok(Self::newest_first(matching).into_iter().next())
    }

    async fn list(
        &self,
        workspace_id: &str,
        opts: PageOptions,
    ) -> Result<Page<ConfigurationVersion>, AppError> {
        let versions = self.versions.read().await;
        let matching = versions
            .values()
            .filter(|cv| cv.workspace_id == workspace_id)
            .cloned()
            .collect();
        Ok(Page::from_items(Self::newest_first(matching), opts))
    }

    async fn delete(&self, id: &str) -> Result<bool, AppError> {
        Ok(self.versions.write().await.remove(id).is_some())
    }

    async fn transition(
        &self,
        id: &str,
        status: ConfigurationStatus,
        at: DateTime<Utc>,
    ) -> Result<ConfigurationVersion, AppError> {
        // the write lock makes check-and-set atomic
        let mut versions = self.versions.write().await;
        let cv = versions
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("configuration version {} not found", id)))?;
        cv.transition(status, at)?;
        Ok(cv.clone())
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MemoryUserTokenStore {
    tokens: Arc<RwLock<Vec<UserToken>>>,
}

impl MemoryUserTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.tokens.read().await.len()
    }
}

#[async_trait]
impl UserTokenStore for MemoryUserTokenStore {
    async fn create(&self, token: NewUserToken) -> Result<UserToken, AppError> {
        let token = UserToken {
            id: Uuid::new_v4(),
            username: token.username,
            description: token.description,
            token_prefix: token.token_prefix,
            token_hash: token.token_hash,
            created_at: Utc::now(),
        };
        self.tokens.write().await.push(token.clone());
        Ok(token)
    }

    async fn get_by_prefix(&self, prefix: &str) -> Result<Vec<UserToken>, AppError> {
        Ok(self
            .tokens
            .read()
            .await
            .iter()
            .filter(|t| t.token_prefix == prefix)
            .cloned()
            .collect())
    }
}
