//! Core domain types for the student registry.
//!
//! This crate defines the aggregate that the storage layer hydrates and
//! persists:
//!
//! - [`Student`]: the aggregate root, holding identity, name, birth date, and an
//!   ordered collection of phones.
//! - [`Phone`]: a phone number owned by exactly one student.
//!
//! Identity is an `Option<i64>`: `None` marks a transient entity that the
//! store has not assigned an id to yet. [`Student::add_phone`] is the only
//! way to grow a student's phone collection and rejects repeated phone ids
//! with [`AggregateError`].
//!
//! Validation ([`validate_student`]) catches blank names and malformed phone
//! numbers before they are written.
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use student_registry_core::*;
//!
//! let birth = NaiveDate::from_ymd_opt(2001, 2, 3).unwrap();
//! let mut carla = Student::new("Carla", birth);
//! assert_eq!(carla.lifecycle(), Lifecycle::Transient);
//!
//! carla.add_phone(Phone::new("11", "91234-5678")).unwrap();
//! assert_eq!(carla.phones().len(), 1);
//! assert!(validate_student(&carla).is_empty());
//! ```

mod types;
mod validate;

pub use types::*;
pub use validate::{ValidationError, validate_phone, validate_student};
