pub mod request_url;
pub mod signed_url;

pub use signed_url::{SignatureError, UrlSigner};
