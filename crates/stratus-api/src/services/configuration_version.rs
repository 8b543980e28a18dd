//! Configuration version lifecycle.
//!
//! Every operation except `upload` goes through the [`Authorizer`]; upload is
//! authorized by the signed URL that routed the request here. Status changes
//! are delegated to the store, which only ever moves a version out of `pending`.
//! Uploads to one version are serialized in-process, so a losing writer is
//! turned away before it reaches storage.

use bytes::Bytes;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use stratus_core::models::{
    ConfigurationStatus, ConfigurationVersion, CreateConfigurationVersion, Page, PageOptions,
};
use stratus_core::AppError;
use stratus_db::ConfigurationVersionStore;
use stratus_storage::{configuration_version_key, Storage, StorageError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::auth::{Action, Authorizer, Subject};
use crate::error::storage_error_to_app;

/// One lock per version with an upload in flight.
#[derive(Clone, Default)]
struct UploadLocks {
    inner: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl UploadLocks {
    async fn acquire(&self, id: &str) -> Result<UploadGuard, AppError> {
        let lock = {
            let mut locks = self
                .inner
                .lock()
                .map_err(|_| AppError::Internal("upload lock table poisoned".to_string()))?;
            locks.entry(id.to_string()).or_default().clone()
        };
        Ok(UploadGuard {
            guard: Some(lock.lock_owned().await),
            locks: self.clone(),
            id: id.to_string(),
        })
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner.lock().map(|locks| locks.len()).unwrap_or(0)
    }
}

/// Releases the version lock and drops the table entry once nobody waits on it.
struct UploadGuard {
    guard: Option<OwnedMutexGuard<()>>,
    locks: UploadLocks,
    id: String,
}

impl Drop for UploadGuard {
    fn drop(&mut self) {
        self.guard.take();
        if let Ok(mut locks) = self.locks.inner.lock() {
            if locks
                .get(&self.id)
                .is_some_and(|lock| Arc::strong_count(lock) == 1)
            {
                locks.remove(&self.id);
            }
        }
    }
}

#[derive(Clone)]
pub struct ConfigurationVersionService {
    store: Arc<dyn ConfigurationVersionStore>,
    storage: Arc<dyn Storage>,
    authorizer: Arc<dyn Authorizer>,
    upload_locks: UploadLocks,
    max_config_size: u64,
}

impl ConfigurationVersionService {
    pub fn new(
        store: Arc<dyn ConfigurationVersionStore>,
        storage: Arc<dyn Storage>,
        authorizer: Arc<dyn Authorizer>,
        max_config_size: u64,
    ) -> Self {
        Self {
            store,
            storage,
            authorizer,
            upload_locks: UploadLocks::default(),
            max_config_size,
        }
    }

    pub fn max_config_size(&self) -> u64 {
        self.max_config_size
    }

    pub fn store(&self) -> &Arc<dyn ConfigurationVersionStore> {
        &self.store
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub async fn create(
        &self,
        subject: &Subject,
        workspace_id: &str,
        opts: CreateConfigurationVersion,
    ) -> Result<ConfigurationVersion, AppError> {
        self.authorizer
            .can_access(subject, Action::CreateConfigurationVersion, workspace_id)?;

        let cv = ConfigurationVersion::new(workspace_id, opts);
        self.store.create(&cv).await?;

        tracing::info!(
            cv_id = %cv.id,
            workspace_id = %workspace_id,
            username = %subject.username,
            source = %cv.source,
            "Created configuration version"
        );
        Ok(cv)
    }

    pub async fn list(
        &self,
        subject: &Subject,
        workspace_id: &str,
        opts: PageOptions,
    ) -> Result<Page<ConfigurationVersion>, AppError> {
        self.authorizer
            .can_access(subject, Action::ListConfigurationVersions, workspace_id)?;

        self.store.list(workspace_id, opts).await
    }

    pub async fn get(&self, subject: &Subject, id: &str) -> Result<ConfigurationVersion, AppError> {
        self.authorized_lookup(subject, Action::GetConfigurationVersion, id)
            .await
    }

    pub async fn get_latest(
        &self,
        subject: &Subject,
        workspace_id: &str,
    ) -> Result<ConfigurationVersion, AppError> {
        self.authorizer
            .can_access(subject, Action::GetConfigurationVersion, workspace_id)?;

        self.store.get_latest(workspace_id).await?.ok_or_else(|| {
            AppError::NotFound(format!(
                "workspace {} has no configuration versions",
                workspace_id
            ))
        })
    }

    pub async fn delete(&self, subject: &Subject, id: &str) -> Result<(), AppError> {
        let cv = self
            .authorized_lookup(subject, Action::DeleteConfigurationVersion, id)
            .await?;

        if !self.store.delete(&cv.id).await? {
            return Err(not_found(id));
        }

        // the record is gone; a leftover blob is unreachable, so failure only warns
        let key = configuration_version_key(&cv.id).map_err(storage_error_to_app)?;
        if let Err(e) = self.storage.delete(&key).await {
            tracing::warn!(cv_id = %cv.id, error = %e, "Failed to remove configuration archive");
        }

        tracing::info!(cv_id = %cv.id, username = %subject.username, "Deleted configuration version");
        Ok(())
    }

    /// Store the archive and move the version out of `pending`.
    ///
    /// Storage failure marks the version `errored`; the status is only touched
    /// after the write has completed. The pending check, the write and the
    /// status change run under the version's upload lock.
    pub async fn upload(&self, id: &str, config: Bytes) -> Result<ConfigurationVersion, AppError> {
        if config.len() as u64 > self.max_config_size {
            return Err(self.too_large());
        }

        let _lock = self.upload_locks.acquire(id).await?;
        let cv = self.store.get(id).await?.ok_or_else(|| not_found(id))?;
        if cv.status != ConfigurationStatus::Pending {
            return Err(AppError::Conflict(format!(
                "configuration version {} is already {}",
                id, cv.status
            )));
        }

        let key = configuration_version_key(&cv.id).map_err(storage_error_to_app)?;
        let size = config.len();
        if let Err(e) = self.storage.put(&key, config).await {
            tracing::error!(cv_id = %cv.id, error = %e, "Failed to store configuration archive");
            if let Err(mark_err) = self
                .store
                .transition(&cv.id, ConfigurationStatus::Errored, Utc::now())
                .await
            {
                tracing::error!(cv_id = %cv.id, error = %mark_err, "Failed to mark configuration version errored");
            }
            return Err(AppError::Storage(e.to_string()));
        }

        let cv = self
            .store
            .transition(&cv.id, ConfigurationStatus::Uploaded, Utc::now())
            .await?;

        tracing::info!(cv_id = %cv.id, size, "Uploaded configuration archive");
        Ok(cv)
    }

    pub async fn download(&self, subject: &Subject, id: &str) -> Result<Bytes, AppError> {
        let cv = self
            .authorized_lookup(subject, Action::DownloadConfigurationVersion, id)
            .await?;

        let key = configuration_version_key(&cv.id).map_err(storage_error_to_app)?;
        match self.storage.get(&key).await {
            Ok(bytes) => Ok(bytes),
            Err(StorageError::NotFound(_)) => Err(AppError::NotFound(format!(
                "configuration version {} has no uploaded configuration",
                id
            ))),
            Err(e) => Err(storage_error_to_app(e)),
        }
    }

    pub fn too_large(&self) -> AppError {
        AppError::PayloadTooLarge(format!(
            "configuration version exceeds maximum size ({} bytes)",
            self.max_config_size
        ))
    }

    /// Look the version up to find its workspace, then check access to it.
    async fn authorized_lookup(
        &self,
        subject: &Subject,
        action: Action,
        id: &str,
    ) -> Result<ConfigurationVersion, AppError> {
        let cv = self.store.get(id).await?.ok_or_else(|| not_found(id))?;
        self.authorizer.can_access(subject, action, &cv.workspace_id)?;
        Ok(cv)
    }
}

fn not_found(id: &str) -> AppError {
    AppError::NotFound(format!("configuration version {} not found", id))
}
