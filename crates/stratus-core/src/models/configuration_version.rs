use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;

use super::resource_id::new_resource_id;
use crate::AppError;

/// Status of a configuration version.
///
/// `Pending` is the only non-terminal state: a version moves to `Uploaded` or
/// `Errored` exactly once and never leaves it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "configuration_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum ConfigurationStatus {
    Pending,
    Uploaded,
    Errored,
}

impl ConfigurationStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ConfigurationStatus::Pending)
    }

    pub fn can_transition_to(&self, next: ConfigurationStatus) -> bool {
        matches!(
            (self, next),
            (ConfigurationStatus::Pending, ConfigurationStatus::Uploaded)
                | (ConfigurationStatus::Pending, ConfigurationStatus::Errored)
        )
    }
}

impl Display for ConfigurationStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ConfigurationStatus::Pending => write!(f, "pending"),
            ConfigurationStatus::Uploaded => write!(f, "uploaded"),
            ConfigurationStatus::Errored => write!(f, "errored"),
        }
    }
}

impl FromStr for ConfigurationStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ConfigurationStatus::Pending),
            "uploaded" => Ok(ConfigurationStatus::Uploaded),
            "errored" => Ok(ConfigurationStatus::Errored),
            _ => Err(anyhow::anyhow!("Invalid configuration status: {}", s)),
        }
    }
}

/// Where a configuration version came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "configuration_source", rename_all = "kebab-case")
)]
#[serde(rename_all = "kebab-case")]
pub enum ConfigurationSource {
    #[default]
    Api,
    TerraformCli,
}

impl Display for ConfigurationSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ConfigurationSource::Api => write!(f, "api"),
            ConfigurationSource::TerraformCli => write!(f, "terraform-cli"),
        }
    }
}

impl FromStr for ConfigurationSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "api" => Ok(ConfigurationSource::Api),
            "terraform-cli" => Ok(ConfigurationSource::TerraformCli),
            _ => Err(anyhow::anyhow!("Invalid configuration source: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTimestamp {
    pub status: ConfigurationStatus,
    pub timestamp: DateTime<Utc>,
}

/// VCS metadata attached to a configuration version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub struct IngressAttributes {
    pub commit_sha: String,
    pub commit_url: String,
}

#[derive(Debug, Clone, Default)]
pub struct CreateConfigurationVersion {
    pub auto_queue_runs: bool,
    pub speculative: bool,
    pub source: ConfigurationSource,
    pub ingress_attributes: Option<IngressAttributes>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationVersion {
    pub id: String,
    pub workspace_id: String,
    pub status: ConfigurationStatus,
    /// Ordered oldest first
    pub status_timestamps: Vec<StatusTimestamp>,
    pub auto_queue_runs: bool,
    pub speculative: bool,
    pub source: ConfigurationSource,
    pub ingress_attributes: Option<IngressAttributes>,
    pub created_at: DateTime<Utc>,
}

impl ConfigurationVersion {
    pub fn new(workspace_id: impl Into<String>, opts: CreateConfigurationVersion) -> Self {
        let now = Utc::now();
        Self {
            id: new_resource_id("cv"),
            workspace_id: workspace_id.into(),
            status: ConfigurationStatus::Pending,
            status_timestamps: vec![StatusTimestamp {
                status: ConfigurationStatus::Pending,
                timestamp: now,
            }],
            auto_queue_runs: opts.auto_queue_runs,
            speculative: opts.speculative,
            source: opts.source,
            ingress_attributes: opts.ingress_attributes,
            created_at: now,
        }
    }

    /// Move to `next`, appending a timestamp entry.
    pub fn transition(
        &mut self,
        next: ConfigurationStatus,
        at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        if !self.status.can_transition_to(next) {
            return Err(AppError::Conflict(format!(
                "configuration version {} is {} and cannot become {}",
                self.id, self.status, next
            )));
        }
        self.status = next;
        self.status_timestamps.push(StatusTimestamp {
            status: next,
            timestamp: at,
        });
        Ok(())
    }

    pub fn status_timestamp(&self, status: ConfigurationStatus) -> Option<DateTime<Utc>> {
        self.status_timestamps
            .iter()
            .find(|ts| ts.status == status)
            .map(|ts| ts.timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_version_is_pending_with_timestamp() {
        let cv = ConfigurationVersion::new("ws-123", CreateConfigurationVersion::default());
        assert!(cv.id.starts_with("cv-"));
        assert_eq!(cv.status, ConfigurationStatus::Pending);
        assert_eq!(cv.status_timestamps.len(), 1);
        assert_eq!(
            cv.status_timestamp(ConfigurationStatus::Pending),
            Some(cv.created_at)
        );
    }

    #[test]
    fn test_transition_is_monotonic() {
        let mut cv = ConfigurationVersion::new("ws-123", CreateConfigurationVersion::default());
        let now = Utc::now();
        cv.transition(ConfigurationStatus::Uploaded, now).unwrap();
        assert_eq!(cv.status, ConfigurationStatus::Uploaded);
        assert_eq!(cv.status_timestamp(ConfigurationStatus::Uploaded), Some(now));

        let err = cv
            .transition(ConfigurationStatus::Errored, Utc::now())
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(cv.status, ConfigurationStatus::Uploaded);
        assert_eq!(cv.status_timestamps.len(), 2);
    }

    #[test]
    fn test_pending_cannot_transition_to_pending() {
        assert!(!ConfigurationStatus::Pending.can_transition_to(ConfigurationStatus::Pending));
        assert!(ConfigurationStatus::Errored.is_terminal());
    }

    #[test]
    fn test_source_wire_names() {
        assert_eq!(ConfigurationSource::TerraformCli.to_string(), "terraform-cli");
        assert_eq!(
            "terraform-cli".parse::<ConfigurationSource>().unwrap(),
            ConfigurationSource::TerraformCli
        );
        assert_eq!(
            serde_json::to_string(&ConfigurationSource::TerraformCli).unwrap(),
            "\"terraform-cli\""
        );
    }
}
