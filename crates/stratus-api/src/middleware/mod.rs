//! HTTP middleware specific to the API

pub mod api_version;
pub mod signed_url;

pub use api_version::api_version_middleware;
pub use signed_url::signed_url_middleware;
