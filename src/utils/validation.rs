use crate::utils::error::{ClassifierError, Result};
use std::path::Path;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field: &str, value: impl ToString, reason: impl Into<String>) -> ClassifierError {
    ClassifierError::InvalidConfigValueError {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// 模型伺服器位址：必須是帶 host 的 http(s) URL
pub fn validate_endpoint(field: &str, endpoint: &str) -> Result<()> {
    require_value(field, endpoint)?;

    let url = Url::parse(endpoint)
        .map_err(|e| invalid(field, endpoint, format!("Invalid URL format: {}", e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(
            field,
            endpoint,
            format!("Model endpoint must use http or https, not {}", url.scheme()),
        ));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid(field, endpoint, "URL has no host"));
    }
    Ok(())
}

/// 命令列指定的輸入檔或設定檔必須存在
pub fn validate_input_file(field: &str, path: &str) -> Result<()> {
    require_value(field, path)?;

    if !Path::new(path).is_file() {
        return Err(invalid(field, path, "File does not exist or is not a regular file"));
    }
    Ok(())
}

pub fn require_value(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ClassifierError::MissingConfigError {
            field: field.to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    // NaN 也會落在這裡被擋下
    if !(value >= min && value <= max) {
        return Err(invalid(
            field,
            value,
            format!("Value must be between {} and {}", min, max),
        ));
    }
    Ok(())
}
