use axum::http::HeaderValue;
use axum::{extract::Request, middleware::Next, response::Response};

use crate::constants::{TFP_API_VERSION, TFP_API_VERSION_HEADER};

/// Advertise the TFE API version terraform should speak.
pub async fn api_version_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    response.headers_mut().insert(
        TFP_API_VERSION_HEADER,
        HeaderValue::from_static(TFP_API_VERSION),
    );
    response
}
