//! Application state shared by all handlers.
//!
//! Everything here is immutable after start-up; mutable data lives behind the
//! store and blob cache trait objects.

use std::sync::Arc;
use stratus_core::{CodeCodec, Config};

use crate::auth::TokenIssuer;
use crate::services::ConfigurationVersionService;
use crate::utils::UrlSigner;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub configuration_versions: ConfigurationVersionService,
    pub tokens: Arc<dyn TokenIssuer>,
    pub codec: CodeCodec,
    pub signer: Arc<UrlSigner>,
}
