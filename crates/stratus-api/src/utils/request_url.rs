use axum::http::{header, HeaderMap};

const FORWARDED_PROTO: &str = "X-Forwarded-Proto";

/// Make `path` absolute using the scheme and host the client addressed.
pub fn absolute_url(headers: &HeaderMap, path: &str) -> String {
    let scheme = headers
        .get(FORWARDED_PROTO)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(',').next().unwrap_or(v).trim())
        .filter(|v| *v == "http" || *v == "https")
        .unwrap_or("http");
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    format!("{}://{}{}", scheme, host, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_defaults_to_http() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("stratus.example"));
        assert_eq!(absolute_url(&headers, "/x"), "http://stratus.example/x");
    }

    #[test]
    fn test_forwarded_proto() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("stratus.example"));
        headers.insert(FORWARDED_PROTO, HeaderValue::from_static("https, http"));
        assert_eq!(absolute_url(&headers, "/x"), "https://stratus.example/x");
    }
}
