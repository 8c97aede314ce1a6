use serde::{Deserialize, Deserializer, Serialize};

use crate::error::AppError;

/// Pagination metadata included in list responses.
#[derive(Serialize, utoipa::ToSchema)]
pub struct Pagination {
    /// Current page number (1-based).
    #[schema(example = 1)]
    pub page: u64,
    /// Number of items per page.
    #[schema(example = 20)]
    pub per_page: u64,
    /// Total number of matching items across all pages.
    #[schema(example = 47)]
    pub total: u64,
    /// Total number of pages.
    #[schema(example = 3)]
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(page: u64, per_page: u64, total: u64) -> Self {
        Self {
            page,
            per_page,
            total,
            total_pages: total.div_ceil(per_page),
        }
    }
}

/// Highest page number served; later pages are empty anyway.
pub const MAX_PAGE: u64 = 1_000_000;

/// Normalize `page`/`per_page` query values: page in 1..=MAX_PAGE, per_page in 1..=100 (default 20).
pub fn page_params(page: Option<u64>, per_page: Option<u64>) -> (u64, u64) {
    let page = page.unwrap_or(1).clamp(1, MAX_PAGE);
    let per_page = per_page.unwrap_or(20).clamp(1, 100);
    (page, per_page)
}

/// Escape LIKE wildcard characters in a search string.
pub fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Serde helper for PATCH semantics on nullable fields.
///
/// * JSON field absent  => `None`          (don't update)
/// * JSON field = null  => `Some(None)`    (set to NULL)
/// * JSON field = value => `Some(Some(v))` (set to value)
pub fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(Option::deserialize(deserializer)?))
}

/// Validate a trimmed title (1-256 Unicode characters).
pub fn validate_title(title: &str) -> Result<(), AppError> {
    let title = title.trim();
    if title.is_empty() || title.chars().count() > 256 {
        return Err(AppError::Validation(
            "Title must be 1-256 characters".into(),
        ));
    }
    Ok(())
}

/// Validate free text with an upper bound on Unicode characters.
pub fn validate_max_chars(value: &str, field: &str, max: usize) -> Result<(), AppError> {
    if value.chars().count() > max {
        return Err(AppError::Validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

/// Validate an external link: `https://` only, at most 256 characters, no whitespace.
pub fn validate_https_url(url: &str, field: &str) -> Result<(), AppError> {
    let url = url.trim();
    let valid = url
        .strip_prefix("https://")
        .is_some_and(|rest| !rest.is_empty() && !rest.chars().any(char::is_whitespace));
    if !valid || url.len() > 256 {
        return Err(AppError::Validation(format!(
            "{field} must be an https:// URL of at most 256 characters"
        )));
    }
    Ok(())
}

/// Validate an optional position field (must be >= 0 when present).
pub fn validate_optional_position(pos: Option<i32>) -> Result<(), AppError> {
    if let Some(pos) = pos
        && pos < 0
    {
        return Err(AppError::Validation("Position must be >= 0".into()));
    }
    Ok(())
}

/// Trim an optional string, mapping blank values to `None`.
pub fn trim_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
