use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use stratus_core::models::{
    ConfigurationSource, ConfigurationStatus, ConfigurationVersion, IngressAttributes, Page,
    PageOptions, StatusTimestamp,
};
use stratus_core::AppError;

use super::transaction::TransactionGuard;

/// Record store for configuration versions.
///
/// Implementations must make `transition` atomic: only a `pending` version may
/// change status, and concurrent callers racing on one id see exactly one winner.
#[async_trait]
pub trait ConfigurationVersionStore: Send + Sync {
    async fn create(&self, cv: &ConfigurationVersion) -> Result<(), AppError>;

    async fn get(&self, id: &str) -> Result<Option<ConfigurationVersion>, AppError>;

    /// Most recently created version in the workspace
    async fn get_latest(&self, workspace_id: &str)
        -> Result<Option<ConfigurationVersion>, AppError>;

    /// Newest first
    async fn list(
        &self,
        workspace_id: &str,
        opts: PageOptions,
    ) -> Result<Page<ConfigurationVersion>, AppError>;

    /// Returns false when no such version existed
    async fn delete(&self, id: &str) -> Result<bool, AppError>;

    /// Move a pending version to `status` and record `at`.
    ///
    /// `NotFound` if the id is unknown, `Conflict` if the version is no longer pending.
    async fn transition(
        &self,
        id: &str,
        status: ConfigurationStatus,
        at: DateTime<Utc>,
    ) -> Result<ConfigurationVersion, AppError>;

    async fn health_check(&self) -> Result<(), AppError>;
}

/// PostgreSQL-backed configuration version repository
#[derive(Clone)]
pub struct PostgresConfigurationVersionRepository {
    pool: PgPool,
}

const SELECT_VERSIONS: &str = r#"
    SELECT
        cv.configuration_version_id, cv.workspace_id, cv.status, cv.auto_queue_runs,
        cv.speculative, cv.source, cv.created_at,
        ia.commit_sha, ia.commit_url
    FROM configuration_versions cv
    LEFT JOIN ingress_attributes ia USING (configuration_version_id)
"#;

impl PostgresConfigurationVersionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_version(row: &PgRow) -> Result<ConfigurationVersion, sqlx::Error> {
        let commit_sha: Option<String> = row.try_get("commit_sha")?;
        let commit_url: Option<String> = row.try_get("commit_url")?;
        let ingress_attributes = match (commit_sha, commit_url) {
            (Some(commit_sha), Some(commit_url)) => Some(IngressAttributes {
                commit_sha,
                commit_url,
            }),
            _ => None,
        };

        Ok(ConfigurationVersion {
            id: row.try_get("configuration_version_id")?,
            workspace_id: row.try_get("workspace_id")?,
            status: row.try_get::<ConfigurationStatus, _>("status")?,
            status_timestamps: Vec::new(),
            auto_queue_runs: row.try_get("auto_queue_runs")?,
            speculative: row.try_get("speculative")?,
            source: row.try_get::<ConfigurationSource, _>("source")?,
            ingress_attributes,
            created_at: row.try_get("created_at")?,
        })
    }

    /// Attach status timestamps, oldest first, to each version
    async fn with_timestamps(
        &self,
        mut versions: Vec<ConfigurationVersion>,
    ) -> Result<Vec<ConfigurationVersion>, AppError> {
        if versions.is_empty() {
            return Ok(versions);
        }
        let ids: Vec<String> = versions.iter().map(|cv| cv.id.clone()).collect();

        let rows = sqlx::query(
            r#"
            SELECT configuration_version_id, status, timestamp
            FROM configuration_version_status_timestamps
            WHERE configuration_version_id = ANY($1)
            ORDER BY timestamp ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_id: HashMap<String, Vec<StatusTimestamp>> = HashMap::new();
        for row in rows {
            let id: String = row.try_get("configuration_version_id")?;
            by_id.entry(id).or_default().push(StatusTimestamp {
                status: row.try_get("status")?,
                timestamp: row.try_get("timestamp")?,
            });
        }

        for cv in versions.iter_mut() {
            cv.status_timestamps = by_id.remove(&cv.id).unwrap_or_default();
        }
        Ok(versions)
    }
}

#[async_trait]
impl ConfigurationVersionStore for PostgresConfigurationVersionRepository {
    async fn create(&self, cv: &ConfigurationVersion) -> Result<(), AppError> {
        let mut tx = TransactionGuard::begin(&self.pool).await?;

        // Use dynamic SQLx queries to avoid requiring DATABASE_URL/sqlx prepare
        sqlx::query(
            r#"
            INSERT INTO configuration_versions (
                configuration_version_id, workspace_id, status, auto_queue_runs,
                speculative, source, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&cv.id)
        .bind(&cv.workspace_id)
        .bind(cv.status)
        .bind(cv.auto_queue_runs)
        .bind(cv.speculative)
        .bind(cv.source)
        .bind(cv.created_at)
        .execute(&mut **tx)
        .await?;

        for ts in &cv.status_timestamps {
            sqlx::query(
                r#"
                INSERT INTO configuration_version_status_timestamps (
                    configuration_version_id, status, timestamp
                )
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(&cv.id)
            .bind(ts.status)
            .bind(ts.timestamp)
            .execute(&mut **tx)
            .await?;
        }

        if let Some(ia) = &cv.ingress_attributes {
            sqlx::query(
                r#"
                INSERT INTO ingress_attributes (configuration_version_id, commit_sha, commit_url)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(&cv.id)
            .bind(&ia.commit_sha)
            .bind(&ia.commit_url)
            .execute(&mut **tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<ConfigurationVersion>, AppError> {
        let row = sqlx::query(&format!(
            "{} WHERE cv.configuration_version_id = $1",
            SELECT_VERSIONS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let cv = Self::row_to_version(&row)?;
        Ok(self.with_timestamps(vec![cv]).await?.pop())
    }

    async fn get_latest(
        &self,
        workspace_id: &str,
    ) -> Result<Option<ConfigurationVersion>, AppError> {
        let row = sqlx::query(&format!(
            "{} WHERE cv.workspace_id = $1 ORDER BY cv.created_at DESC LIMIT 1",
            SELECT_VERSIONS
        ))
        .bind(workspace_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let cv = Self::row_to_version(&row)?;
        Ok(self.with_timestamps(vec![cv]).await?.pop())
    }

    async fn list(
        &self,
        workspace_id: &str,
        opts: PageOptions,
    ) -> Result<Page<ConfigurationVersion>, AppError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM configuration_versions WHERE workspace_id = $1",
        )
        .bind(workspace_id)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(&format!(
            "{} WHERE cv.workspace_id = $1 ORDER BY cv.created_at DESC LIMIT $2 OFFSET $3",
            SELECT_VERSIONS
        ))
        .bind(workspace_id)
        .bind(opts.limit())
        .bind(opts.offset())
        .fetch_all(&self.pool)
        .await?;

        let versions = rows
            .iter()
            .map(Self::row_to_version)
            .collect::<Result<Vec<_>, _>>()?;
        let versions = self.with_timestamps(versions).await?;

        Ok(Page::new(versions, opts, total.max(0) as u64))
    }

    async fn delete(&self, id: &str) -> Result<bool, AppError> {
        // timestamps and ingress attributes cascade
        let result = sqlx::query("DELETE FROM configuration_versions WHERE configuration_version_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn transition(
        &self,
        id: &str,
        status: ConfigurationStatus,
        at: DateTime<Utc>,
    ) -> Result<ConfigurationVersion, AppError> {
        let mut tx = TransactionGuard::begin(&self.pool).await?;

        let updated = sqlx::query(
            r#"
            UPDATE configuration_versions
            SET status = $2
            WHERE configuration_version_id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(status)
        .execute(&mut **tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return match self.get(id).await? {
                Some(cv) => Err(AppError::Conflict(format!(
                    "configuration version {} is already {}",
                    id, cv.status
                ))),
                None => Err(AppError::NotFound(format!(
                    "configuration version {} not found",
                    id
                ))),
            };
        }

        sqlx::query(
            r#"
            INSERT INTO configuration_version_status_timestamps (
                configuration_version_id, status, timestamp
            )
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(at)
        .execute(&mut **tx)
        .await?;

        tx.commit().await?;

        tracing::debug!(cv_id = %id, status = %status, "Configuration version status updated");

        self.get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("configuration version {} not found", id)))
    }

    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
