//! Request validation helpers.

use tmai_core::{CoreError, CoreResult};

/// Maximum accepted length for a key label.
pub const MAX_KEY_NAME_CHARS: usize = 80;

/// Maximum accepted length for a service name.
pub const MAX_SERVICE_NAME_CHARS: usize = 120;

/// Validates an API key label.
pub fn validate_key_name(name: &str) -> CoreResult<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CoreError::invalid_input("key name must not be empty"));
    }
    if trimmed.chars().count() > MAX_KEY_NAME_CHARS {
        return Err(CoreError::invalid_input(format!(
            "key name must be at most {MAX_KEY_NAME_CHARS} characters"
        )));
    }
    Ok(())
}

/// Validates a service display name.
pub fn validate_service_name(name: &str) -> CoreResult<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CoreError::invalid_input("service name must not be empty"));
    }
    if trimmed.chars().count() > MAX_SERVICE_NAME_CHARS {
        return Err(CoreError::invalid_input(format!(
            "service name must be at most {MAX_SERVICE_NAME_CHARS} characters"
        )));
    }
    Ok(())
}

/// Derives a URL-safe slug from a display name: lowercase alphanumerics
/// with single dashes between words.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Validates a caller-supplied slug.
pub fn validate_slug(slug: &str) -> CoreResult<()> {
    if slug.is_empty() {
        return Err(CoreError::invalid_input("slug must not be empty"));
    }
    let well_formed = slug
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
        && !slug.starts_with('-')
        && !slug.ends_with('-');
    if !well_formed {
        return Err(CoreError::invalid_input(
            "slug must be lowercase alphanumerics and dashes",
        ));
    }
    Ok(())
}
