use std::fmt;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use garde::Validate;
use serde_json::Value;

use crate::descriptor::FieldDescriptor;
use crate::entity::Entity;

/// Validation rule attached to a field, checked at save/update time when
/// the field is marked for validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationRule {
    Email,
    /// `chrono` format string. `%+` accepts RFC 3339.
    Date { format: &'static str },
    /// The value is a path to an existing file.
    File,
}

impl ValidationRule {
    pub fn validator(&self) -> &'static dyn Validator {
        match self {
            ValidationRule::Email => &EmailValidator,
            ValidationRule::Date { .. } => &DateValidator,
            ValidationRule::File => &FileValidator,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ValidationRule::Email => "Email",
            ValidationRule::Date { .. } => "Date",
            ValidationRule::File => "File",
        }
    }
}

impl fmt::Display for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Checks one field of an entity against a rule.
///
/// Unset (null) values always pass; required-ness is checked separately.
pub trait Validator: Send + Sync {
    fn validate(&self, entity: &dyn Entity, field: &FieldDescriptor, rule: &ValidationRule) -> bool;
}

#[derive(Validate)]
struct EmailAddress {
    #[garde(email)]
    value: String,
}

pub struct EmailValidator;

impl Validator for EmailValidator {
    fn validate(&self, entity: &dyn Entity, field: &FieldDescriptor, _rule: &ValidationRule) -> bool {
        match entity.property(field.property) {
            None | Some(Value::Null) => true,
            Some(Value::String(value)) => EmailAddress { value }.validate().is_ok(),
            Some(_) => false,
        }
    }
}

pub struct DateValidator;

impl DateValidator {
    fn parses(value: &str, format: &str) -> bool {
        if format == "%+" {
            return DateTime::parse_from_rfc3339(value).is_ok();
        }
        DateTime::parse_from_str(value, format).is_ok()
            || NaiveDateTime::parse_from_str(value, format).is_ok()
            || NaiveDate::parse_from_str(value, format).is_ok()
    }
}

impl Validator for DateValidator {
    fn validate(&self, entity: &dyn Entity, field: &FieldDescriptor, rule: &ValidationRule) -> bool {
        let format = match rule {
            ValidationRule::Date { format } => *format,
            _ => "%Y-%m-%d",
        };
        match entity.property(field.property) {
            None | Some(Value::Null) => true,
            Some(Value::String(value)) => Self::parses(&value, format),
            Some(_) => false,
        }
    }
}

pub struct FileValidator;

impl Validator for FileValidator {
    fn validate(&self, entity: &dyn Entity, field: &FieldDescriptor, _rule: &ValidationRule) -> bool {
        match entity.property(field.property) {
            None | Some(Value::Null) => true,
            Some(Value::String(location)) => Path::new(&location).is_file(),
            Some(_) => false,
        }
    }
}
