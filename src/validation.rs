//! Field-level input checks that accumulate every failure before rejecting.

use crate::error::{Error, FieldError};

#[derive(Debug, Default)]
pub(crate) struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn fail(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.to_owned(),
            message: message.into(),
        });
    }

    /// Require at least `min` characters (not bytes).
    pub(crate) fn min_len(&mut self, field: &str, value: &str, min: usize, message: &str) {
        if value.chars().count() < min {
            self.fail(field, message);
        }
    }

    /// Require at most `max` characters (not bytes).
    pub(crate) fn max_len(&mut self, field: &str, value: &str, max: usize, message: &str) {
        if value.chars().count() > max {
            self.fail(field, message);
        }
    }

    /// Require at least `min` ASCII digits; separators like spaces, dashes
    /// and a leading `+` are tolerated but not counted.
    pub(crate) fn min_digits(&mut self, field: &str, value: &str, min: usize, message: &str) {
        if value.chars().filter(char::is_ascii_digit).count() < min {
            self.fail(field, message);
        }
    }

    pub(crate) fn email(&mut self, field: &str, value: &str, message: &str) {
        if !is_email(value) {
            self.fail(field, message);
        }
    }

    /// `Ok(())` if nothing failed, otherwise a validation error listing every field.
    pub(crate) fn finish(self) -> Result<(), Error> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(Error::validation(self.errors))
        }
    }
}

/// Loose structural email check: one `@`, non-empty local part, dotted domain.
pub(crate) fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !value.chars().any(char::is_whitespace)
        && domain.split('.').count() >= 2
        && domain.split('.').all(|part| !part.is_empty())
}
