//! Field-level validation errors.
//!
//! Write operations report every offending field at once so a caller can fix
//! a request in one round trip. Field names use a path syntax
//! (`items[2].quantity`, `goods[0].price`).

use core::fmt;

use serde::Serialize;

/// One invalid field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Path of the field, e.g. `items[0].listing_id`.
    pub field: String,
    /// Human-readable reason.
    pub message: String,
}

impl FieldError {
    /// Create a field error.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// A non-empty list of [`FieldError`]s once returned as an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    /// Start an empty collector.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// A single-field error.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self(vec![FieldError::new(field, message)])
    }

    /// Record an invalid field.
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError::new(field, message));
    }

    /// Whether nothing was recorded.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Recorded errors in insertion order.
    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    /// `Ok(value)` when nothing was recorded, otherwise `Err(self)`.
    ///
    /// # Errors
    ///
    /// Returns the collector itself when it holds at least one error.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }

    /// Check a text field: trimmed, optionally required, at most `max` chars.
    ///
    /// Returns the trimmed value, or `None` after recording an error.
    pub fn text(
        &mut self,
        field: &str,
        value: Option<&str>,
        required: bool,
        max: usize,
    ) -> Option<String> {
        let value = value.map(str::trim).unwrap_or_default();
        if required && value.is_empty() {
            self.push(field, "this field is required");
            return None;
        }
        if value.chars().count() > max {
            self.push(field, format!("must be at most {max} characters"));
            return None;
        }
        Some(value.to_owned())
    }

    /// Check a required non-negative integer.
    pub fn non_negative(&mut self, field: &str, value: Option<i64>) -> Option<i64> {
        match value {
            None => {
                self.push(field, "this field is required");
                None
            }
            Some(v) if v < 0 => {
                self.push(field, "must not be negative");
                None
            }
            Some(v) => Some(v),
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for error in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            first = false;
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl IntoIterator for ValidationErrors {
    type Item = FieldError;
    type IntoIter = std::vec::IntoIter<FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
