// src/config/validation.rs

use crate::errors::ConfigError;
use url::Url;

/// Checks that `value` is an absolute http(s) URL and returns it without a trailing slash.
pub(super) fn normalize_base_url(option: &str, value: &str) -> Result<String, ConfigError> {
    let parsed = Url::parse(value.trim()).map_err(|e| ConfigError::InvalidValue {
        option: option.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https" | "file") {
        return Err(ConfigError::InvalidValue {
            option: option.to_string(),
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }
    if parsed.query().is_some() || parsed.fragment().is_some() {
        return Err(ConfigError::InvalidValue {
            option: option.to_string(),
            reason: "must not carry a query or fragment".to_string(),
        });
    }
    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

pub(super) fn require_non_zero(option: &str, value: usize) -> Result<usize, ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            option: option.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}
