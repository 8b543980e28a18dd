pub mod configuration_versions;
pub mod discovery;
pub mod health;
pub mod login;
