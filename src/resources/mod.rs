//! Resource handlers — validation, descriptions and provider-side outputs per kind.
//!
//! Each handler provides:
//! 1. Kind-specific validation of a params-resolved declaration
//! 2. A one-line plan description
//! 3. The outputs a provider assigns once the resource exists

pub mod compute;
pub mod datastore;
pub mod frontend;
pub mod secret;

use crate::core::error::ValidationError;
use crate::core::types::ResourceType;

/// Push an error when a required string field is blank.
pub(crate) fn require(
    errors: &mut Vec<ValidationError>,
    id: &str,
    rt: ResourceType,
    field: &str,
    value: &str,
) {
    if value.trim().is_empty() {
        errors.push(ValidationError::new(format!(
            "resource '{}' ({}) has no {}",
            id, rt, field
        )));
    }
}

/// Push an error when a count is below its minimum.
pub(crate) fn require_at_least(
    errors: &mut Vec<ValidationError>,
    id: &str,
    rt: ResourceType,
    field: &str,
    value: u32,
    min: u32,
) {
    if value < min {
        errors.push(ValidationError::new(format!(
            "resource '{}' ({}) {} must be at least {} (got {})",
            id, rt, field, min, value
        )));
    }
}
