//! Authentication and authorization
//!
//! - `token`: minting and verifying `stx_` API tokens
//! - `middleware`: bearer-token authentication for the API
//! - `session`: trusted-proxy session authentication for the browser login flow
//! - `authorizer`: role-based access to configuration versions

pub mod authorizer;
pub mod middleware;
pub mod models;
pub mod session;
pub mod token;

pub use authorizer::{Action, Authorizer, RoleAuthorizer};
pub use models::{Subject, UserRole};
pub use token::{StoreTokenIssuer, TokenIssuer};
