//! Field validation shared by all entity records.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Rule a field value failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationRule {
    /// Required text is empty or whitespace-only.
    Blank,
    /// Discriminator value names no known variant.
    UnknownVariant(String),
    /// `updated_at` precedes `created_at`.
    TimestampOrder,
}

/// Field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Column name of the offending field.
    pub field: &'static str,
    pub rule: ValidationRule,
}

impl ValidationError {
    pub fn new(field: &'static str, rule: ValidationRule) -> Self {
        Self { field, rule }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.rule {
            ValidationRule::Blank => write!(f, "`{}` must not be blank", self.field),
            ValidationRule::UnknownVariant(value) => {
                write!(f, "`{}` has unknown variant `{value}`", self.field)
            }
            ValidationRule::TimestampOrder => {
                write!(f, "`{}` must not precede `created_at`", self.field)
            }
        }
    }
}

impl Error for ValidationError {}

/// Rejects empty or whitespace-only text for a required column.
///
/// The value itself is stored untrimmed.
pub fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, ValidationRule::Blank));
    }
    Ok(())
}

pub(crate) fn require_timestamp_order(
    created_at: i64,
    updated_at: i64,
) -> Result<(), ValidationError> {
    if updated_at < created_at {
        return Err(ValidationError::new(
            "updated_at",
            ValidationRule::TimestampOrder,
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{require_text, ValidationRule};

    #[test]
    fn require_text_rejects_whitespace_only() {
        let err = require_text("name", " \t\n").unwrap_err();
        assert_eq!(err.field, "name");
        assert_eq!(err.rule, ValidationRule::Blank);
        assert_eq!(err.to_string(), "`name` must not be blank");
    }

    #[test]
    fn require_text_accepts_padded_text() {
        assert!(require_text("name", "  Family ").is_ok());
    }
}
