use std::fmt::{Display, Formatter, Result as FmtResult};
use stratus_core::AppError;

use super::models::{Subject, UserRole};

/// Operations on configuration versions subject to access control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateConfigurationVersion,
    ListConfigurationVersions,
    GetConfigurationVersion,
    DownloadConfigurationVersion,
    DeleteConfigurationVersion,
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            Action::CreateConfigurationVersion => "create_configuration_version",
            Action::ListConfigurationVersions => "list_configuration_versions",
            Action::GetConfigurationVersion => "get_configuration_version",
            Action::DownloadConfigurationVersion => "download_configuration_version",
            Action::DeleteConfigurationVersion => "delete_configuration_version",
        };
        f.write_str(name)
    }
}

/// Decides whether `subject` may perform `action` on a workspace.
pub trait Authorizer: Send + Sync {
    fn can_access(
        &self,
        subject: &Subject,
        action: Action,
        workspace_id: &str,
    ) -> Result<(), AppError>;
}

/// Role-based policy: admins do everything, members everything but delete,
/// viewers only read metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleAuthorizer;

impl RoleAuthorizer {
    fn allows(role: UserRole, action: Action) -> bool {
        match role {
            UserRole::Admin => true,
            UserRole::Member => !matches!(action, Action::DeleteConfigurationVersion),
            UserRole::Viewer => matches!(
                action,
                Action::ListConfigurationVersions | Action::GetConfigurationVersion
            ),
        }
    }
}

impl Authorizer for RoleAuthorizer {
    fn can_access(
        &self,
        subject: &Subject,
        action: Action,
        workspace_id: &str,
    ) -> Result<(), AppError> {
        if Self::allows(subject.role, action) {
            return Ok(());
        }

        tracing::warn!(
            username = %subject.username,
            role = %subject.role,
            action = %action,
            workspace_id = %workspace_id,
            "Access denied"
        );
        Err(AppError::Forbidden("access denied".to_string()))
    }
}
