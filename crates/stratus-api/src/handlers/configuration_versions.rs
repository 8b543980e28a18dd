//! Configuration version endpoints under `/api/v2`.
//!
//! Everything here except `upload` runs behind bearer-token auth. `upload` is
//! only reachable through a signed URL handed out by `create`.

use axum::{
    body::{Body, Bytes, HttpBody},
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::BytesMut;
use serde::Deserialize;
use std::future::poll_fn;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use stratus_core::models::{ConfigurationSource, CreateConfigurationVersion, PageOptions};
use stratus_core::AppError;
use utoipa::IntoParams;

use crate::auth::Subject;
use crate::constants::{API_PREFIX, TERRAFORM_INTEGRATION_HEADER};
use crate::error::{ErrorResponse, HttpAppError};
use crate::jsonapi::{
    configuration_version_document, configuration_version_list_document,
    ConfigurationVersionDocument, ConfigurationVersionListDocument,
    CreateConfigurationVersionDocument, JsonApi,
};
use crate::state::AppState;
use crate::utils::request_url::absolute_url;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// Defaults to 1
    #[serde(rename = "page[number]")]
    pub page_number: Option<u32>,
    /// Defaults to 20, capped at 100
    #[serde(rename = "page[size]")]
    pub page_size: Option<u32>,
}

/// Path of the upload endpoint relative to the API prefix, before signing
pub fn upload_path(cv_id: &str) -> String {
    format!("/configuration-versions/{}/upload", cv_id)
}

fn source_from_headers(headers: &HeaderMap) -> ConfigurationSource {
    match headers
        .get(TERRAFORM_INTEGRATION_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        Some("cloud") => ConfigurationSource::TerraformCli,
        _ => ConfigurationSource::Api,
    }
}

fn parse_create_body(body: &[u8]) -> Result<CreateConfigurationVersionDocument, AppError> {
    if body.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(CreateConfigurationVersionDocument::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::InvalidInput(format!("Invalid request body: {}", e)))
}

/// Read the body, giving up as soon as it grows past `max` bytes.
async fn read_bounded(mut body: Body, max: u64) -> Result<Option<Bytes>, AppError> {
    let mut buf = BytesMut::new();
    while let Some(frame) = poll_fn(|cx| Pin::new(&mut body).poll_frame(cx)).await {
        let frame = frame
            .map_err(|e| AppError::InvalidInput(format!("Failed to read request body: {}", e)))?;
        if let Ok(data) = frame.into_data() {
            if (buf.len() + data.len()) as u64 > max {
                return Ok(None);
            }
            buf.extend_from_slice(&data);
        }
    }
    Ok(Some(buf.freeze()))
}

#[utoipa::path(
    post,
    path = "/api/v2/workspaces/{workspace_id}/configuration-versions",
    tag = "configuration-versions",
    params(("workspace_id" = String, Path, description = "Workspace ID")),
    request_body(content = CreateConfigurationVersionDocument, content_type = "application/vnd.api+json"),
    responses(
        (status = 201, description = "Configuration version created", body = ConfigurationVersionDocument),
        (status = 400, description = "Invalid request body", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Access denied", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(
    skip(state, headers, body),
    fields(username = %subject.username, operation = "create_configuration_version")
)]
pub async fn create_configuration_version(
    State(state): State<Arc<AppState>>,
    subject: Subject,
    Path(workspace_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, HttpAppError> {
    let document = parse_create_body(&body)?;
    let attributes = document.data.map(|d| d.attributes).unwrap_or_default();

    let opts = CreateConfigurationVersion {
        auto_queue_runs: attributes.auto_queue_runs.unwrap_or(true),
        speculative: attributes.speculative.unwrap_or(false),
        source: source_from_headers(&headers),
        ingress_attributes: None,
    };

    let cv = state
        .configuration_versions
        .create(&subject, &workspace_id, opts)
        .await?;

    let ttl = Duration::from_secs(state.config.upload_url_ttl_seconds());
    let signed = state.signer.sign(&upload_path(&cv.id), ttl);
    let upload_url = absolute_url(&headers, &format!("{}{}", API_PREFIX, signed));

    Ok(JsonApi(
        StatusCode::CREATED,
        configuration_version_document(&cv, Some(upload_url)),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v2/workspaces/{workspace_id}/configuration-versions",
    tag = "configuration-versions",
    params(("workspace_id" = String, Path, description = "Workspace ID"), PageQuery),
    responses(
        (status = 200, description = "Configuration versions, newest first", body = ConfigurationVersionListDocument),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Access denied", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state), fields(username = %subject.username))]
pub async fn list_configuration_versions(
    State(state): State<Arc<AppState>>,
    subject: Subject,
    Path(workspace_id): Path<String>,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let opts = PageOptions::new(page.page_number, page.page_size);
    let versions = state
        .configuration_versions
        .list(&subject, &workspace_id, opts)
        .await?;

    Ok(JsonApi(
        StatusCode::OK,
        configuration_version_list_document(&versions),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v2/configuration-versions/{id}",
    tag = "configuration-versions",
    params(("id" = String, Path, description = "Configuration version ID")),
    responses(
        (status = 200, description = "Configuration version", body = ConfigurationVersionDocument),
        (status = 403, description = "Access denied", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state), fields(username = %subject.username))]
pub async fn get_configuration_version(
    State(state): State<Arc<AppState>>,
    subject: Subject,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    let cv = state.configuration_versions.get(&subject, &id).await?;
    Ok(JsonApi(
        StatusCode::OK,
        configuration_version_document(&cv, None),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v2/workspaces/{workspace_id}/configuration-versions/latest",
    tag = "configuration-versions",
    params(("workspace_id" = String, Path, description = "Workspace ID")),
    responses(
        (status = 200, description = "Most recent configuration version", body = ConfigurationVersionDocument),
        (status = 403, description = "Access denied", body = ErrorResponse),
        (status = 404, description = "Workspace has no configuration versions", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state), fields(username = %subject.username))]
pub async fn get_latest_configuration_version(
    State(state): State<Arc<AppState>>,
    subject: Subject,
    Path(workspace_id): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    let cv = state
        .configuration_versions
        .get_latest(&subject, &workspace_id)
        .await?;
    Ok(JsonApi(
        StatusCode::OK,
        configuration_version_document(&cv, None),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v2/configuration-versions/{id}",
    tag = "configuration-versions",
    params(("id" = String, Path, description = "Configuration version ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Access denied", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state), fields(username = %subject.username))]
pub async fn delete_configuration_version(
    State(state): State<Arc<AppState>>,
    subject: Subject,
    Path(id): Path<String>,
) -> Result<StatusCode, HttpAppError> {
    state.configuration_versions.delete(&subject, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v2/configuration-versions/{id}/download",
    tag = "configuration-versions",
    params(("id" = String, Path, description = "Configuration version ID")),
    responses(
        (status = 200, description = "Configuration archive", content_type = "application/octet-stream"),
        (status = 403, description = "Access denied", body = ErrorResponse),
        (status = 404, description = "Not found or not uploaded", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state), fields(username = %subject.username))]
pub async fn download_configuration_version(
    State(state): State<Arc<AppState>>,
    subject: Subject,
    Path(id): Path<String>,
) -> Result<Response, HttpAppError> {
    let bytes = state.configuration_versions.download(&subject, &id).await?;
    Ok((
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/octet-stream"),
        )],
        bytes,
    )
        .into_response())
}

#[utoipa::path(
    put,
    path = "/api/v2/signed/{signature}/configuration-versions/{id}/upload",
    tag = "configuration-versions",
    params(
        ("signature" = String, Path, description = "`{signature}.{expiry}` issued with the upload URL"),
        ("id" = String, Path, description = "Configuration version ID")
    ),
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 200, description = "Archive stored"),
        (status = 403, description = "Invalid or expired signature", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse),
        (status = 409, description = "Configuration version is not pending", body = ErrorResponse),
        (status = 422, description = "Archive exceeds the maximum size", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, headers, body), fields(operation = "upload_configuration_version"))]
pub async fn upload_configuration_version(
    State(state): State<Arc<AppState>>,
    Path((_signature, id)): Path<(String, String)>,
    headers: HeaderMap,
    body: Body,
) -> Result<StatusCode, HttpAppError> {
    let service = &state.configuration_versions;
    let max = service.max_config_size();

    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    if declared.is_some_and(|len| len > max) {
        return Err(service.too_large().into());
    }

    let Some(config) = read_bounded(body, max).await? else {
        return Err(service.too_large().into());
    };

    service.upload(&id, config).await?;
    Ok(StatusCode::OK)
}

#[utoipa::path(
    get,
    path = "/api/v2/ping",
    tag = "health",
    responses((status = 204, description = "API is reachable"))
)]
pub async fn ping() -> StatusCode {
    StatusCode::NO_CONTENT
}
