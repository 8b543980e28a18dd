//! Health check handlers and response types.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use utoipa::ToSchema;

use crate::state::AppState;

const CHECK_TIMEOUT: Duration = Duration::from_secs(5);
const HEALTHY: &str = "healthy";

/// Run an async check with timeout; returns "healthy", "timeout", or "{prefix}: {error}".
async fn run_check<F, E>(timeout: Duration, f: F, error_prefix: &str) -> String
where
    F: Future<Output = Result<(), E>>,
    E: Display,
{
    match tokio::time::timeout(timeout, f).await {
        Ok(Ok(())) => HEALTHY.to_string(),
        Ok(Err(e)) => format!("{}: {}", error_prefix, e),
        Err(_) => "timeout".to_string(),
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthCheckResponse {
    pub status: String,
    pub store: String,
    pub storage: String,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Store and blob cache reachable", body = HealthCheckResponse),
        (status = 503, description = "Store unreachable", body = HealthCheckResponse)
    )
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let store = state.configuration_versions.store().clone();
    let store_status = run_check(
        CHECK_TIMEOUT,
        async move { store.health_check().await },
        "unhealthy",
    )
    .await;

    let storage = state.configuration_versions.storage().clone();
    let storage_status = run_check(
        CHECK_TIMEOUT,
        async move {
            storage
                .exists("configs/health-check-non-existent-key")
                .await
                .map(drop)
        },
        "degraded",
    )
    .await;

    // only the record store decides readiness
    let (status_code, status) = if store_status != HEALTHY {
        tracing::error!(store = %store_status, "Health check failed");
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    } else if storage_status != HEALTHY {
        tracing::warn!(storage = %storage_status, "Blob cache degraded");
        (StatusCode::OK, "degraded")
    } else {
        (StatusCode::OK, HEALTHY)
    };

    (
        status_code,
        Json(HealthCheckResponse {
            status: status.to_string(),
            store: store_status,
            storage: storage_status,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_check_reports_error_and_timeout() {
        let ok = run_check(CHECK_TIMEOUT, async { Ok::<(), String>(()) }, "unhealthy").await;
        assert_eq!(ok, "healthy");

        let failed = run_check(
            CHECK_TIMEOUT,
            async { Err::<(), _>("connection refused".to_string()) },
            "unhealthy",
        )
        .await;
        assert_eq!(failed, "unhealthy: connection refused");

        let slow = run_check(
            Duration::from_millis(10),
            async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok::<(), String>(())
            },
            "unhealthy",
        )
        .await;
        assert_eq!(slow, "timeout");
    }
}
