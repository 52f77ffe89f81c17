//! Domain entities for the student registry.
//!
//! A [`Student`] is an aggregate root that owns an ordered collection of
//! [`Phone`] entities. Both carry an optional integer identity: `None` means
//! the entity has not been persisted yet (transient), `Some` means the store
//! has assigned it a row id.
//!
//! Phones are attached after construction through [`Student::add_phone`],
//! which keeps the collection free of duplicate phone ids.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Format used for birth dates on the wire and in storage (`YYYY-MM-DD`).
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Violations of the student aggregate's invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregateError {
    /// A phone with the same id is already attached to the student.
    #[error("phone {phone_id} is already attached to student {student}")]
    DuplicatePhone {
        /// Display form of the owning student's id (`"<transient>"` if unset).
        student: String,
        /// The repeated phone id.
        phone_id: i64,
    },
}

/// Persistence status of an entity, derived from the presence of an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Not stored yet; no id assigned.
    Transient,
    /// Stored; the id identifies the row.
    Persisted,
}

/// A phone number owned by exactly one [`Student`].
///
/// # Examples
///
/// ```
/// use student_registry_core::Phone;
///
/// let phone = Phone::new("11", "99999-0000");
/// assert!(phone.id().is_none());
/// assert_eq!(phone.to_string(), "(11) 99999-0000");
///
/// let stored = Phone::persisted(10, "11", "99999-0000");
/// assert_eq!(stored.id(), Some(10));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phone {
    #[serde(default)]
    id: Option<i64>,
    area_code: String,
    number: String,
}

impl Phone {
    /// Creates a transient phone (no id yet).
    pub fn new(area_code: impl Into<String>, number: impl Into<String>) -> Self {
        Self {
            id: None,
            area_code: area_code.into(),
            number: number.into(),
        }
    }

    /// Creates a phone rehydrated from a stored row.
    pub fn persisted(id: i64, area_code: impl Into<String>, number: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            area_code: area_code.into(),
            number: number.into(),
        }
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn area_code(&self) -> &str {
        &self.area_code
    }

    pub fn number(&self) -> &str {
        &self.number
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}) {}", self.area_code, self.number)
    }
}

/// A student together with the phones it owns.
///
/// Construct a transient student with [`Student::new`], or a stored one with
/// [`Student::persisted`]. Phones are never passed to a constructor; attach
/// them with [`Student::add_phone`].
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use student_registry_core::{Lifecycle, Phone, Student};
///
/// let birth = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
/// let mut ana = Student::persisted(1, "Ana", birth);
/// assert_eq!(ana.lifecycle(), Lifecycle::Persisted);
///
/// ana.add_phone(Phone::persisted(10, "11", "9999")).unwrap();
/// assert!(ana.add_phone(Phone::persisted(10, "11", "9999")).is_err());
/// assert_eq!(ana.phones().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    #[serde(default)]
    id: Option<i64>,
    name: String,
    birth_date: NaiveDate,
    #[serde(default)]
    phones: Vec<Phone>,
}

impl Student {
    /// Creates a transient student (id not yet assigned by the store).
    pub fn new(name: impl Into<String>, birth_date: NaiveDate) -> Self {
        Self {
            id: None,
            name: name.into(),
            birth_date,
            phones: Vec::new(),
        }
    }

    /// Creates a student rehydrated from a stored row.
    pub fn persisted(id: i64, name: impl Into<String>, birth_date: NaiveDate) -> Self {
        Self {
            id: Some(id),
            name: name.into(),
            birth_date,
            phones: Vec::new(),
        }
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn birth_date(&self) -> NaiveDate {
        self.birth_date
    }

    /// Birth date rendered as `YYYY-MM-DD`, the form bound to statements.
    pub fn birth_date_iso(&self) -> String {
        self.birth_date.format(DATE_FORMAT).to_string()
    }

    /// Phones in the order they were attached.
    pub fn phones(&self) -> &[Phone] {
        &self.phones
    }

    pub fn lifecycle(&self) -> Lifecycle {
        match self.id {
            Some(_) => Lifecycle::Persisted,
            None => Lifecycle::Transient,
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_birth_date(&mut self, birth_date: NaiveDate) {
        self.birth_date = birth_date;
    }

    /// Records the id the store assigned to this student.
    pub fn assign_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    /// Returns the attached phone with the given id, if any.
    pub fn phone(&self, phone_id: i64) -> Option<&Phone> {
        self.phones.iter().find(|p| p.id == Some(phone_id))
    }

    /// Attaches a phone to this student.
    ///
    /// Transient phones (no id) are always appended. A phone whose id is
    /// already present is rejected and the collection is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::DuplicatePhone`] on a repeated phone id.
    pub fn add_phone(&mut self, phone: Phone) -> Result<(), AggregateError> {
        if let Some(phone_id) = phone.id {
            if self.phone(phone_id).is_some() {
                return Err(AggregateError::DuplicatePhone {
                    student: self.display_id(),
                    phone_id,
                });
            }
        }
        self.phones.push(phone);
        Ok(())
    }

    /// Detaches and returns all phones, leaving the collection empty.
    pub fn take_phones(&mut self) -> Vec<Phone> {
        std::mem::take(&mut self.phones)
    }

    fn display_id(&self) -> String {
        self.id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "<transient>".to_string())
    }
}
