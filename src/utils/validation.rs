use crate::utils::error::{Result, SyncError};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field_name: &str, value: &str, reason: impl Into<String>) -> SyncError {
    SyncError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// API base URL or endpoint. Request paths and auth headers are added by the
/// clients, so the configured URL must carry neither a query nor credentials.
pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.trim().is_empty() {
        return Err(invalid(field_name, url_str, "API URL cannot be empty"));
    }

    let url = Url::parse(url_str)
        .map_err(|e| invalid(field_name, url_str, format!("not an absolute API URL: {}", e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(
            field_name,
            url_str,
            format!("API URL must be http or https, got {}", url.scheme()),
        ));
    }
    if url.host_str().is_none() {
        return Err(invalid(field_name, url_str, "API URL has no host"));
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(invalid(
            field_name,
            url_str,
            "credentials go in api_token, not in the URL",
        ));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid(
            field_name,
            url_str,
            "API URL must not carry a query string or fragment",
        ));
    }

    Ok(())
}

/// Database or snapshot file path.
pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.trim().is_empty() {
        return Err(invalid(field_name, path, "file path cannot be empty"));
    }
    if path.contains('\0') {
        return Err(invalid(field_name, path, "file path contains null bytes"));
    }
    if path.contains("${") {
        return Err(invalid(
            field_name,
            path,
            "unresolved environment variable in file path",
        ));
    }
    if path.ends_with('/') || path.ends_with(std::path::MAIN_SEPARATOR) {
        return Err(invalid(
            field_name,
            path,
            "expected a file, got a directory path",
        ));
    }

    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(SyncError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

/// Credentials must be present and fully substituted. A leftover `${VAR}`
/// means the environment variable was never exported.
pub fn validate_secret(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(SyncError::MissingConfigError {
            field: field_name.to_string(),
        });
    }

    if value.contains("${") {
        return Err(SyncError::ConfigValidationError {
            field: field_name.to_string(),
            message: format!("unresolved environment variable in '{}'", value),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("wave.endpoint", "https://gql.waveapps.com/graphql/public").is_ok());
        assert!(validate_url("wave.endpoint", "http://localhost:8080").is_ok());
        assert!(validate_url("wave.endpoint", "").is_err());
        assert!(validate_url("wave.endpoint", "invalid-url").is_err());
        assert!(validate_url("wave.endpoint", "ftp://example.com").is_err());
        assert!(validate_url("bigcommerce.base_url", "https://user:pw@api.bigcommerce.com").is_err());
        assert!(validate_url("bigcommerce.base_url", "https://api.bigcommerce.com?token=x").is_err());
    }

    #[test]
    fn test_validate_path() {
        assert!(validate_path("database.path", "./data/crm.db").is_ok());
        assert!(validate_path("database.path", " ").is_err());
        assert!(validate_path("database.path", "./data/").is_err());
        assert!(validate_path("wave.snapshot", "${SNAPSHOT_DIR}/wave.json").is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("bigcommerce.per_page", 250, 1, 250).is_ok());
        assert!(validate_range("bigcommerce.per_page", 0, 1, 250).is_err());
        assert!(validate_range("bigcommerce.per_page", 251, 1, 250).is_err());
    }

    #[test]
    fn test_validate_secret() {
        assert!(validate_secret("wave.api_token", "abc123").is_ok());
        assert!(matches!(
            validate_secret("wave.api_token", "  "),
            Err(SyncError::MissingConfigError { .. })
        ));
        assert!(matches!(
            validate_secret("wave.api_token", "${WAVE_API_TOKEN}"),
            Err(SyncError::ConfigValidationError { .. })
        ));
    }
}
