//! Absence model.
//!
//! Absences are the sole source of unavailability: a person is available
//! for every block of the horizon except those whose date falls inside one
//! of their absence intervals. The upstream record system guarantees that
//! absences never overlap for the same person; the loader does not
//! re-check that invariant.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::PersonId;

/// Classification of an absence record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbsenceType {
    Vacation,
    Sick,
    Conference,
    Leave,
}

/// A continuous absence interval for one person.
///
/// Both endpoints are inclusive calendar dates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Absence {
    /// The absent person.
    pub person_id: PersonId,
    /// First absent day (inclusive).
    pub start_date: NaiveDate,
    /// Last absent day (inclusive).
    pub end_date: NaiveDate,
    /// Absence classification.
    pub absence_type: AbsenceType,
}

impl Absence {
    /// Creates an absence interval.
    pub fn new(
        person_id: impl Into<PersonId>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        absence_type: AbsenceType,
    ) -> Self {
        Self {
            person_id: person_id.into(),
            start_date,
            end_date,
            absence_type,
        }
    }

    /// Whether the absence covers a given date.
    #[inline]
    pub fn covers(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }

    /// Number of absent days.
    pub fn num_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}
