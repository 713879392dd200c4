use crate::utils::error::{EtlError, Result};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field: &str, value: impl ToString, reason: impl Into<String>) -> EtlError {
    EtlError::InvalidConfigValueError {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// Endpoints must be absolute `http`/`https` URLs.
pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.trim().is_empty() {
        return Err(invalid(field_name, url_str, "endpoint is empty"));
    }

    let url = Url::parse(url_str)
        .map_err(|e| invalid(field_name, url_str, format!("not a URL ({})", e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(
            field_name,
            url_str,
            format!("scheme '{}' is not http or https", url.scheme()),
        ));
    }
    Ok(())
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(invalid(field_name, path, "output directory is empty"));
    }
    if path.contains('\0') {
        return Err(invalid(field_name, path.escape_default(), "NUL byte in path"));
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(field_name, value, "blank value"));
    }
    Ok(())
}

/// Required values report `MissingConfigError` when blank.
pub fn validate_required(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(EtlError::MissingConfigError {
            field: field_name.to_string(),
        });
    }
    Ok(())
}

/// Inclusive bounds check.
pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(invalid(field_name, value, format!("expected {}..={}", min, max)))
    }
}

/// Backoff factors are seconds and must be finite and non-negative.
pub fn validate_backoff(field_name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(invalid(
            field_name,
            value,
            "backoff must be a finite, non-negative number of seconds",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("api_endpoint", "https://example.com").is_ok());
        assert!(validate_url("api_endpoint", "http://example.com").is_ok());
        assert!(validate_url("api_endpoint", "").is_err());
        assert!(validate_url("api_endpoint", "invalid-url").is_err());
        assert!(validate_url("api_endpoint", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("retry_attempts", 5u32, 1, 10).is_ok());
        assert!(validate_range("retry_attempts", 0u32, 1, 10).is_err());
        assert!(validate_range("timeout_seconds", 301u64, 1, 300).is_err());
    }

    #[test]
    fn test_validate_backoff() {
        assert!(validate_backoff("backoff_factor", 1.0).is_ok());
        assert!(validate_backoff("backoff_factor", 0.0).is_ok());
        assert!(validate_backoff("backoff_factor", -1.0).is_err());
        assert!(validate_backoff("backoff_factor", f64::NAN).is_err());
    }

    #[test]
    fn test_validate_path_and_key() {
        assert!(validate_path("output_path", "nova_poshta_regions").is_ok());
        assert!(validate_path("output_path", "").is_err());
        assert!(validate_path("output_path", "out\0put").is_err());
        assert!(validate_non_empty_string("fallback_region", "   ").is_err());
        assert!(matches!(
            validate_required("api_key", ""),
            Err(EtlError::MissingConfigError { .. })
        ));
    }
}
