pub mod authorization_code;
pub mod configuration_version;
pub mod pagination;
pub mod resource_id;
pub mod user_token;

pub use authorization_code::AuthorizationCodePayload;
pub use configuration_version::{
    ConfigurationSource, ConfigurationStatus, ConfigurationVersion, CreateConfigurationVersion,
    IngressAttributes, StatusTimestamp,
};
pub use pagination::{Page, PageOptions, Pagination};
pub use resource_id::{convert_id, new_resource_id};
pub use user_token::{NewUserToken, UserToken};
