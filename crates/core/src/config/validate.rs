use std::collections::HashSet;

use super::{types::Config, ConfigError};
use crate::provider::Provider;

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - HTTP timeout is not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.http.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "http.timeout_secs cannot be 0".to_string(),
        ));
    }

    Ok(())
}

/// Validate a persisted provider list: names unique, hosts present.
pub fn validate_providers(providers: &[Provider]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for provider in providers {
        if provider.name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "provider name cannot be empty".to_string(),
            ));
        }
        if provider.host.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "provider {} has no host",
                provider.name
            )));
        }
        if !seen.insert(provider.name.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate provider name: {}",
                provider.name
            )));
        }
    }
    Ok(())
}
