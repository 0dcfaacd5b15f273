use serde::{Deserialize, Deserializer};
use thiserror::Error;

pub mod project;
pub mod store;
pub mod task;
pub mod time_entry;
pub mod tray;

pub type ProjectId = u64;
pub type TaskId = u64;
pub type TimeEntryId = u64;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: &'static str },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("Priority must be between 0 and 10, got {0}")]
    PriorityOutOfRange(u32),

    #[error("Color '{0}' is not a hex color like #007AFF")]
    InvalidColor(String),
}

/// Checks a trimmed free-text field against a character budget.
pub(crate) fn check_length(
    field: &'static str,
    value: &str,
    max: usize,
    required: bool,
) -> Result<(), ValidationError> {
    let length = value.trim().chars().count();
    if required && length == 0 {
        return Err(ValidationError::Required { field });
    }
    if length > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

/// Trims optional text and drops it when nothing is left.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// The backend omits empty strings most of the time but not always.
pub(crate) fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|v| !v.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_length_counts_characters_not_bytes() {
        assert!(check_length("Name", "ééé", 3, true).is_ok());
        assert_eq!(
            check_length("Name", "éééé", 3, true),
            Err(ValidationError::TooLong {
                field: "Name",
                max: 3
            })
        );
    }

    #[test]
    fn test_check_length_rejects_blank_required_value() {
        assert_eq!(
            check_length("Title", "   ", 200, true),
            Err(ValidationError::Required { field: "Title" })
        );
        assert!(check_length("Description", "", 500, false).is_ok());
    }

    #[test]
    fn test_non_empty_trims_and_drops_blank() {
        assert_eq!(non_empty(Some("  hi ".to_string())), Some("hi".to_string()));
        assert_eq!(non_empty(Some("   ".to_string())), None);
        assert_eq!(non_empty(None), None);
    }
}
