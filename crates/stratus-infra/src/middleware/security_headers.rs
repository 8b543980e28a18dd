use axum::extract::State;
use axum::http::HeaderValue;
use axum::{extract::Request, middleware::Next, response::Response};

/// Options for [`security_headers_middleware`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SecurityHeaders {
    /// Emit `Strict-Transport-Security`; only set in production
    pub hsts: bool,
}

/// Adds security headers to all HTTP responses.
///
/// Install with `axum::middleware::from_fn_with_state(SecurityHeaders { .. }, security_headers_middleware)`.
pub async fn security_headers_middleware(
    State(opts): State<SecurityHeaders>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;

    let headers = response.headers_mut();

    headers.insert(
        "X-Content-Type-Options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));
    headers.insert(
        "Referrer-Policy",
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );

    if opts.hsts {
        headers.insert(
            "Strict-Transport-Security",
            HeaderValue::from_static("max-age=31536000; includeSubDomains"),
        );
    }

    // the consent page posts back to itself and carries inline styles
    headers.insert(
        "Content-Security-Policy",
        HeaderValue::from_static(
            "default-src 'self'; style-src 'self' 'unsafe-inline'; form-action 'self'; frame-ancestors 'none'",
        ),
    );

    response
}
