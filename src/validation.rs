use std::sync::LazyLock;

use regex::Regex;

use crate::error::{AppError, FieldErrors};
use crate::i18n::{Locale, Message};

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// Trimmed value, with empty strings treated as absent.
pub fn optional(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

/// Collects per-field errors in request order and turns them into a 422.
pub struct Validator {
    locale: Locale,
    errors: FieldErrors,
}

impl Validator {
    pub fn new(locale: Locale) -> Self {
        Self {
            locale,
            errors: FieldErrors::new(),
        }
    }

    pub fn add(&mut self, field: &str, msg: Message, params: &[(&str, &str)]) {
        let attribute = field.replace('_', " ");
        let mut all = vec![("attribute", attribute.as_str())];
        all.extend_from_slice(params);
        let text = self.locale.format(msg, &all);
        self.errors.entry(field.to_string()).or_default().push(text);
    }

    pub fn has(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    /// Returns the trimmed value when present and non-empty.
    pub fn required<'a>(&mut self, field: &str, value: Option<&'a str>) -> Option<&'a str> {
        match value.map(str::trim) {
            Some(v) if !v.is_empty() => Some(v),
            _ => {
                self.add(field, Message::Required, &[]);
                None
            }
        }
    }

    /// Like `required` but returns the value untrimmed, for passwords.
    pub fn required_secret<'a>(&mut self, field: &str, value: Option<&'a str>) -> Option<&'a str> {
        match value {
            Some(v) if !v.trim().is_empty() => Some(v),
            _ => {
                self.add(field, Message::Required, &[]);
                None
            }
        }
    }

    pub fn email(&mut self, field: &str, value: &str) {
        if !is_valid_email(value) {
            self.add(field, Message::Email, &[]);
        }
    }

    pub fn min_len(&mut self, field: &str, value: &str, min: usize) {
        if value.chars().count() < min {
            self.add(field, Message::Min, &[("min", &min.to_string())]);
        }
    }

    /// Optional fields pass when absent.
    pub fn max_len(&mut self, field: &str, value: Option<&str>, max: usize) {
        if value.is_some_and(|v| v.chars().count() > max) {
            self.add(field, Message::Max, &[("max", &max.to_string())]);
        }
    }

    pub fn confirmed(&mut self, field: &str, value: &str, confirmation: Option<&str>) {
        if confirmation != Some(value) {
            self.add(field, Message::Confirmed, &[]);
        }
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn finish(self) -> Result<(), AppError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation {
                message: self.locale.t(Message::ValidationFailed).to_string(),
                errors: self.errors,
            })
        }
    }
}
