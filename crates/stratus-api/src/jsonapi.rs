//! JSON:API documents for configuration versions.
//!
//! Built by explicit projection from the domain model; there is no generic
//! marshaller or side-loading.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stratus_core::models::{
    convert_id, ConfigurationSource, ConfigurationStatus, ConfigurationVersion, Page, Pagination,
};
use utoipa::ToSchema;

pub const MEDIA_TYPE: &str = "application/vnd.api+json";
pub const CONFIGURATION_VERSIONS_TYPE: &str = "configuration-versions";
pub const INGRESS_ATTRIBUTES_TYPE: &str = "ingress-attributes";

/// Serializes `T` with the JSON:API media type.
pub struct JsonApi<T>(pub StatusCode, pub T);

impl<T: Serialize> IntoResponse for JsonApi<T> {
    fn into_response(self) -> Response {
        let mut response = (self.0, Json(self.1)).into_response();
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(MEDIA_TYPE));
        response
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub struct StatusTimestamps {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queued_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub struct ConfigurationVersionAttributes {
    pub auto_queue_runs: bool,
    pub error: Option<String>,
    pub error_message: Option<String>,
    pub source: ConfigurationSource,
    pub speculative: bool,
    pub status: ConfigurationStatus,
    pub status_timestamps: StatusTimestamps,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResourceIdentifier {
    pub id: String,
    #[serde(rename = "type")]
    pub resource_type: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Relationship {
    pub data: ResourceIdentifier,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub struct ConfigurationVersionRelationships {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingress_attributes: Option<Relationship>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConfigurationVersionResource {
    pub id: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub attributes: ConfigurationVersionAttributes,
    pub relationships: ConfigurationVersionRelationships,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConfigurationVersionDocument {
    pub data: ConfigurationVersionResource,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListMeta {
    pub pagination: Pagination,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConfigurationVersionListDocument {
    pub data: Vec<ConfigurationVersionResource>,
    pub meta: ListMeta,
}

/// Body of a create request. Every member is optional.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateConfigurationVersionDocument {
    #[serde(default)]
    pub data: Option<CreateConfigurationVersionData>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateConfigurationVersionData {
    #[serde(rename = "type", default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub attributes: CreateConfigurationVersionAttributes,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub struct CreateConfigurationVersionAttributes {
    /// Defaults to true
    pub auto_queue_runs: Option<bool>,
    /// Defaults to false
    pub speculative: Option<bool>,
}

/// Project a version into its JSON:API resource. `upload_url` is only set on create.
pub fn configuration_version_resource(
    cv: &ConfigurationVersion,
    upload_url: Option<String>,
) -> ConfigurationVersionResource {
    let mut timestamps = StatusTimestamps {
        queued_at: None,
        started_at: None,
        finished_at: None,
    };
    for ts in &cv.status_timestamps {
        match ts.status {
            ConfigurationStatus::Pending => timestamps.queued_at = Some(ts.timestamp),
            ConfigurationStatus::Uploaded => timestamps.started_at = Some(ts.timestamp),
            ConfigurationStatus::Errored => timestamps.finished_at = Some(ts.timestamp),
        }
    }

    let ingress_attributes = cv.ingress_attributes.as_ref().map(|_| Relationship {
        data: ResourceIdentifier {
            id: convert_id(&cv.id, "ia"),
            resource_type: INGRESS_ATTRIBUTES_TYPE.to_string(),
        },
    });

    ConfigurationVersionResource {
        id: cv.id.clone(),
        resource_type: CONFIGURATION_VERSIONS_TYPE.to_string(),
        attributes: ConfigurationVersionAttributes {
            auto_queue_runs: cv.auto_queue_runs,
            error: None,
            error_message: None,
            source: cv.source,
            speculative: cv.speculative,
            status: cv.status,
            status_timestamps: timestamps,
            upload_url,
        },
        relationships: ConfigurationVersionRelationships { ingress_attributes },
    }
}

pub fn configuration_version_document(
    cv: &ConfigurationVersion,
    upload_url: Option<String>,
) -> ConfigurationVersionDocument {
    ConfigurationVersionDocument {
        data: configuration_version_resource(cv, upload_url),
    }
}

pub fn configuration_version_list_document(
    page: &Page<ConfigurationVersion>,
) -> ConfigurationVersionListDocument {
    ConfigurationVersionListDocument {
        data: page
            .items
            .iter()
            .map(|cv| configuration_version_resource(cv, None))
            .collect(),
        meta: ListMeta {
            pagination: page.pagination.clone(),
        },
    }
}
