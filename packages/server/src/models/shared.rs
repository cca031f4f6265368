use serde::Deserialize;

use crate::error::AppError;

/// `?limit=` for newest-first listings.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LimitQuery {
    /// Maximum number of entries (1-200, default 50).
    pub limit: Option<u64>,
}

impl LimitQuery {
    pub fn resolve(&self) -> u64 {
        self.limit.unwrap_or(50).clamp(1, 200)
    }
}

/// Validate a trimmed required field against a character range.
pub fn validate_required(field: &str, value: &str, max: usize) -> Result<(), AppError> {
    let value = value.trim();
    if value.is_empty() || value.chars().count() > max {
        return Err(AppError::Validation(format!(
            "{field} must be 1-{max} characters"
        )));
    }
    Ok(())
}

/// Validate an optional free-text field (may be empty) against a maximum length.
pub fn validate_max(field: &str, value: &str, max: usize) -> Result<(), AppError> {
    if value.chars().count() > max {
        return Err(AppError::Validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}
