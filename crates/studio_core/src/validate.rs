use url::Url;

/// Input rejected before any request is sent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Missing { field: &'static str },
    #[error("{field} must be between {min} and {max} characters (got {actual})")]
    Length {
        field: &'static str,
        min: usize,
        max: usize,
        actual: usize,
    },
    #[error("{field} must be a number between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: u64,
        max: u64,
    },
    #[error("please enter a valid http(s) URL: {0}")]
    InvalidUrl(String),
    #[error("unknown content source '{0}' (expected url, text or markdown)")]
    UnknownSource(String),
    #[error("{0}")]
    NotReady(&'static str),
}

/// Inclusive character-count bounds for a free-text field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthBounds {
    pub min: usize,
    pub max: usize,
}

pub const JOB_TITLE_BOUNDS: LengthBounds = LengthBounds { min: 1, max: 200 };
pub const RAW_DATA_BOUNDS: LengthBounds = LengthBounds {
    min: 10,
    max: 50_000,
};
pub const CONTENT_BOUNDS: LengthBounds = LengthBounds {
    min: 50,
    max: 100_000,
};

pub fn validate_required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Missing { field });
    }
    Ok(trimmed)
}

/// Checks the trimmed character count of `value` against `bounds`.
pub fn validate_length<'a>(
    field: &'static str,
    value: &'a str,
    bounds: LengthBounds,
) -> Result<&'a str, ValidationError> {
    let trimmed = validate_required(field, value)?;
    let actual = trimmed.chars().count();
    if actual < bounds.min || actual > bounds.max {
        return Err(ValidationError::Length {
            field,
            min: bounds.min,
            max: bounds.max,
            actual,
        });
    }
    Ok(trimmed)
}

pub fn validate_range(
    field: &'static str,
    value: Option<u64>,
    min: u64,
    max: u64,
) -> Result<u64, ValidationError> {
    match value {
        Some(v) if (min..=max).contains(&v) => Ok(v),
        _ => Err(ValidationError::OutOfRange { field, min, max }),
    }
}

/// Accepts absolute http/https URLs with a host.
pub fn validate_url(value: &str) -> Result<Url, ValidationError> {
    let trimmed = validate_required("url", value)?;
    let parsed = Url::parse(trimmed).map_err(|_| ValidationError::InvalidUrl(trimmed.to_string()))?;
    let scheme_ok = matches!(parsed.scheme(), "http" | "https");
    if !scheme_ok || parsed.host_str().map_or(true, str::is_empty) {
        return Err(ValidationError::InvalidUrl(trimmed.to_string()));
    }
    Ok(parsed)
}
