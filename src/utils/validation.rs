use crate::utils::error::{EtlError, Result};
use std::collections::HashSet;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(EtlError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

/// 檢查檔名副檔名，例如 `par.tex`
pub fn validate_file_extension(field_name: &str, file: &str, extension: &str) -> Result<()> {
    validate_path(field_name, file)?;

    let actual = std::path::Path::new(file)
        .extension()
        .and_then(|ext| ext.to_str());

    match actual {
        Some(ext) if ext == extension => Ok(()),
        Some(ext) => Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: file.to_string(),
            reason: format!("Unsupported file extension: {}. Expected: {}", ext, extension),
        }),
        None => Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: file.to_string(),
            reason: "File has no extension or invalid filename".to_string(),
        }),
    }
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
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
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

/// 表格名稱不可重複，否則同一張 sheet 會被當成兩種資料
pub fn validate_distinct(field_name: &str, values: &[&str]) -> Result<()> {
    let mut seen = HashSet::new();
    for value in values {
        if !seen.insert(*value) {
            return Err(EtlError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: value.to_string(),
                reason: "Table names must be distinct".to_string(),
            });
        }
    }
    Ok(())
}
