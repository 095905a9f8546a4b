//! Configuration management for Nexus services.
//!
//! Configuration is loaded from (in priority order):
//! 1. Environment variables (`NEXUS__` prefix, `__` as the section separator)
//! 2. Config file (`nexus.toml`, or the prefix passed on the command line)
//! 3. Defaults

use serde::de::DeserializeOwned;

pub use config::ConfigError;

/// Default config file prefix (resolves to `nexus.toml`, `nexus.yaml`, ...).
pub const DEFAULT_FILE_PREFIX: &str = "nexus";

/// Load one section of the layered configuration.
///
/// The file is optional. A missing section yields `T::default()`; a section
/// that is present but malformed is an error.
pub fn load_section<T>(file_prefix: &str, env_prefix: &str, section: &str) -> Result<T, ConfigError>
where
    T: DeserializeOwned + Default,
{
    let cfg = config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(
            config::Environment::with_prefix(env_prefix)
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    match cfg.get::<T>(section) {
        Ok(value) => Ok(value),
        Err(ConfigError::NotFound(_)) => {
            tracing::debug!(section, "Config section missing, using defaults");
            Ok(T::default())
        }
        Err(e) => Err(e),
    }
}
