//! Structural validation of student aggregates.
//!
//! Catches problems such as blank names, malformed phone numbers, and
//! repeated phone ids before a write reaches the store.
//!
//! # Examples
//!
//! ```
//! use chrono::NaiveDate;
//! use student_registry_core::*;
//!
//! let birth = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
//! let mut ana = Student::new("Ana", birth);
//! ana.add_phone(Phone::new("11", "99999-0000")).unwrap();
//! assert!(validate_student(&ana).is_empty());
//!
//! // Invalid: area code with letters
//! let mut bad = Student::new("Bo", birth);
//! bad.add_phone(Phone::new("1a", "7777")).unwrap();
//! assert!(!validate_student(&bad).is_empty());
//! ```

use std::collections::HashSet;

use thiserror::Error;

use crate::{Phone, Student};

/// Student validation errors.
///
/// Each variant describes a specific structural problem found during
/// validation. The `Display` impl provides a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Student name is empty or whitespace-only.
    #[error("student name cannot be empty")]
    EmptyName,
    /// Phone area code is empty.
    #[error("phone area code cannot be empty")]
    EmptyAreaCode,
    /// Area code contains something other than ASCII digits.
    #[error("invalid area code: {0}")]
    InvalidAreaCode(String),
    /// Phone number is empty.
    #[error("phone number cannot be empty")]
    EmptyNumber,
    /// Number contains characters other than digits, spaces and dashes.
    #[error("invalid phone number: {0}")]
    InvalidNumber(String),
    /// Two phones in the same aggregate share an id.
    #[error("duplicate phone id: {0}")]
    DuplicatePhone(i64),
}

/// Validates a student and its phones.
///
/// Returns every problem found; an empty vector means the aggregate is
/// ready to be written.
pub fn validate_student(student: &Student) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if student.name().trim().is_empty() {
        errors.push(ValidationError::EmptyName);
    }

    let mut seen: HashSet<i64> = HashSet::new();
    for phone in student.phones() {
        if let Some(id) = phone.id() {
            if !seen.insert(id) {
                errors.push(ValidationError::DuplicatePhone(id));
            }
        }
        errors.extend(validate_phone(phone));
    }

    errors
}

/// Validates a single phone's area code and number.
pub fn validate_phone(phone: &Phone) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let area_code = phone.area_code().trim();
    if area_code.is_empty() {
        errors.push(ValidationError::EmptyAreaCode);
    } else if !area_code.chars().all(|c| c.is_ascii_digit()) {
        errors.push(ValidationError::InvalidAreaCode(area_code.to_string()));
    }

    let number = phone.number().trim();
    if number.is_empty() {
        errors.push(ValidationError::EmptyNumber);
    } else if !number
        .chars()
        .all(|c| c.is_ascii_digit() || c == '-' || c == ' ')
        || !number.chars().any(|c| c.is_ascii_digit())
    {
        errors.push(ValidationError::InvalidNumber(number.to_string()));
    }

    errors
}
