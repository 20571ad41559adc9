use crate::utils::error::{Result, SyncError};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field_name: &str, value: impl ToString, reason: impl Into<String>) -> SyncError {
    SyncError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// 只接受 http/https；store URL 會再接上 `/rest/v1/...`
pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(invalid(field_name, url_str, "URL cannot be empty"));
    }

    let url = Url::parse(url_str)
        .map_err(|e| invalid(field_name, url_str, format!("Invalid URL format: {}", e)))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(invalid(
            field_name,
            url_str,
            format!("Unsupported URL scheme: {}", scheme),
        )),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(invalid(field_name, path, "Path cannot be empty"));
    }
    if path.contains('\0') {
        return Err(invalid(field_name, path, "Path contains null bytes"));
    }
    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(invalid(
            field_name,
            value,
            format!("Value must be at least {}", min_value),
        ));
    }
    Ok(())
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| SyncError::MissingConfigError {
        field: field_name.to_string(),
    })
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(
            field_name,
            value,
            "Value cannot be empty or whitespace-only",
        ));
    }
    Ok(())
}

/// `${VAR}` 沒有被環境變數取代時會原樣留在設定值裡
pub fn validate_resolved_secret(field_name: &str, value: &str) -> Result<()> {
    validate_non_empty_string(field_name, value)?;
    if value.starts_with("${") && value.ends_with('}') {
        return Err(invalid(field_name, value, "Environment variable is not set"));
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
        return Err(invalid(
            field_name,
            value,
            format!("Value must be between {} and {}", min, max),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_urls() {
        assert!(validate_url("store.url", "https://abc.supabase.co").is_ok());
        assert!(validate_url("store.url", "http://localhost:54321").is_ok());
        assert!(validate_url("store.url", "").is_err());
        assert!(validate_url("store.url", "abc.supabase.co").is_err());
        assert!(validate_url("store.url", "postgres://db:5432").is_err());
    }

    #[test]
    fn test_sample_sizes_must_be_positive() {
        assert!(validate_positive_number("report.unmatched_sample", 30, 1).is_ok());
        assert!(validate_positive_number("report.unmatched_sample", 0, 1).is_err());
    }

    #[test]
    fn test_missing_snapshot_path() {
        let present = Some("snapshot.json".to_string());
        let missing: Option<String> = None;
        assert_eq!(
            validate_required_field("store.snapshot_path", &present).unwrap(),
            "snapshot.json"
        );
        assert!(matches!(
            validate_required_field("store.snapshot_path", &missing),
            Err(SyncError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_unresolved_secret_placeholder() {
        assert!(validate_resolved_secret("store.api_key", "service-role-key").is_ok());
        assert!(validate_resolved_secret("store.api_key", "   ").is_err());

        let err = validate_resolved_secret("store.api_key", "${STORE_API_KEY}").unwrap_err();
        assert!(err.to_string().contains("Environment variable is not set"));
    }

    #[test]
    fn test_threshold_range() {
        assert!(validate_range("thresholds.module_existing_floor", 50, 0, 10_000).is_ok());
        assert!(validate_range("thresholds.module_existing_floor", 20_000, 0, 10_000).is_err());
    }
}
