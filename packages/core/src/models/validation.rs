use thiserror::Error;

/// Longest accepted list or item name, in characters
pub const MAX_NAME_LENGTH: usize = 500;

/// Validation errors for list and item input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Name must not be blank")]
    BlankName,

    #[error("Name is {length} characters, the limit is {max}")]
    NameTooLong { length: usize, max: usize },

    #[error("Order key {0} is out of range")]
    OrderOutOfRange(i64),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Items {prev} and {next} are not adjacent siblings")]
    NotAdjacent { prev: String, next: String },
}

/// Trim a user-supplied name and reject blank or oversized values
pub fn normalize_name(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::BlankName);
    }
    let length = trimmed.chars().count();
    if length > MAX_NAME_LENGTH {
        return Err(ValidationError::NameTooLong {
            length,
            max: MAX_NAME_LENGTH,
        });
    }
    Ok(trimmed.to_string())
}

/// Reject empty identifiers (user ids are opaque but must be present)
pub fn require_id(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_trims() {
        assert_eq!(normalize_name("  Milk \n").unwrap(), "Milk");
    }

    #[test]
    fn test_blank_rejected() {
        assert_eq!(normalize_name("   \t"), Err(ValidationError::BlankName));
        assert_eq!(normalize_name(""), Err(ValidationError::BlankName));
    }

    #[test]
    fn test_length_counts_characters() {
        let at_limit = "é".repeat(MAX_NAME_LENGTH);
        assert!(normalize_name(&at_limit).is_ok());

        let over = "x".repeat(MAX_NAME_LENGTH + 1);
        assert!(matches!(
            normalize_name(&over),
            Err(ValidationError::NameTooLong { length, .. }) if length == MAX_NAME_LENGTH + 1
        ));
    }
}
