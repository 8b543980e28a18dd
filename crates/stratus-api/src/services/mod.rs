pub mod configuration_version;

pub use configuration_version::ConfigurationVersionService;
