use crate::domain::model::{file_extension, AUDIO_EXTENSIONS};
use crate::utils::error::{AudioError, Result};
use std::path::{Component, Path};

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(AudioError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(AudioError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

/// 輸出檔名必須是相對路徑，且不能跳出輸出目錄
pub fn validate_output_name(output: &str) -> Result<()> {
    if output.trim().is_empty() || output.contains('\0') {
        return Err(AudioError::ValidationError {
            message: format!("Invalid output name '{}'", output),
        });
    }

    let path = Path::new(output);
    let escapes = path.components().any(|component| {
        matches!(
            component,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if escapes {
        return Err(AudioError::ValidationError {
            message: format!("Output name '{}' must stay inside the output directory", output),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(AudioError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_audio_file_name(field_name: &str, file_name: &str) -> Result<()> {
    match file_extension(file_name) {
        Some(extension) if AUDIO_EXTENSIONS.contains(&extension.as_str()) => Ok(()),
        Some(extension) => Err(AudioError::ValidationError {
            message: format!(
                "{}: unsupported file extension '{}' in '{}'. Allowed extensions: {}",
                field_name,
                extension,
                file_name,
                AUDIO_EXTENSIONS.join(", ")
            ),
        }),
        None => Err(AudioError::ValidationError {
            message: format!(
                "{}: '{}' has no extension or an invalid filename",
                field_name, file_name
            ),
        }),
    }
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AudioError::InvalidConfigValueError {
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
        return Err(AudioError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}
