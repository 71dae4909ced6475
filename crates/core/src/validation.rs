use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// Field level validation failure carrying a human readable message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: &'static str,
}

impl ValidationError {
    pub fn new(field: &'static str, message: &'static str) -> Self {
        Self { field, message }
    }
}

/// Length bounds and allowed characters for a text field.
pub(crate) struct TextRule {
    pub field: &'static str,
    pub min: usize,
    pub max: usize,
    pub pattern: Option<fn() -> &'static Regex>,
    pub too_short: &'static str,
    pub too_long: &'static str,
    pub invalid: &'static str,
}

impl TextRule {
    pub fn check(&self, value: &str) -> Result<(), ValidationError> {
        // Lengths are measured in characters so Turkish letters count once.
        let length = value.chars().count();
        if length < self.min {
            return Err(ValidationError::new(self.field, self.too_short));
        }
        if length > self.max {
            return Err(ValidationError::new(self.field, self.too_long));
        }
        if let Some(pattern) = self.pattern {
            if !pattern().is_match(value) {
                return Err(ValidationError::new(self.field, self.invalid));
            }
        }
        Ok(())
    }
}

fn compile(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| {
        Regex::new(pattern)
            .unwrap_or_else(|error| panic!("pattern {pattern} failed to compile: {error}"))
    })
}

static PERSON_NAME_RE: OnceLock<Regex> = OnceLock::new();
static TITLE_NAME_RE: OnceLock<Regex> = OnceLock::new();
static ALPHANUMERIC_RE: OnceLock<Regex> = OnceLock::new();
static ASCII_LETTERS_RE: OnceLock<Regex> = OnceLock::new();
static PHONE_RE: OnceLock<Regex> = OnceLock::new();
static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
static POSTAL_CODE_RE: OnceLock<Regex> = OnceLock::new();

/// Letters (including Turkish letters) and spaces.
pub(crate) fn person_name_regex() -> &'static Regex {
    compile(&PERSON_NAME_RE, "^[a-zA-ZçÇğĞıİöÖşŞüÜ ]+$")
}

pub(crate) fn title_name_regex() -> &'static Regex {
    compile(&TITLE_NAME_RE, "^[a-zA-ZçÇğĞıİöÖşŞüÜ0-9 ]+$")
}

pub(crate) fn alphanumeric_regex() -> &'static Regex {
    compile(&ALPHANUMERIC_RE, "^[a-zA-Z0-9 ]+$")
}

pub(crate) fn ascii_letters_regex() -> &'static Regex {
    compile(&ASCII_LETTERS_RE, "^[a-zA-Z ]+$")
}

fn phone_regex() -> &'static Regex {
    compile(&PHONE_RE, r"^\+?[0-9]{10,15}$")
}

fn email_regex() -> &'static Regex {
    compile(&EMAIL_RE, r"^[^\s@]+@[^\s@]+\.[^\s@]+$")
}

fn postal_code_regex() -> &'static Regex {
    compile(&POSTAL_CODE_RE, r"^[0-9]{5}(-[0-9]{4})?$")
}

pub(crate) fn check_phone(value: &str) -> Result<(), ValidationError> {
    if phone_regex().is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::new(
            "phone",
            "Phone number must be between 10 and 15 digits, optionally starting with \"+\".",
        ))
    }
}

pub(crate) fn check_email(value: &str) -> Result<(), ValidationError> {
    if email_regex().is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::new(
            "email",
            "Email must be a valid email address (e.g., user@example.com).",
        ))
    }
}

pub(crate) fn check_postal_code(value: &str) -> Result<(), ValidationError> {
    if postal_code_regex().is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::new(
            "postalCode",
            "Postal code must be in the format 12345 or 12345-6789.",
        ))
    }
}

pub(crate) fn check_salary(value: f64) -> Result<(), ValidationError> {
    // NaN fails the comparison as well.
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ValidationError::new("salary", "Salary must be at least 0."))
    }
}
