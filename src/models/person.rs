//! Person model.
//!
//! People are the assignable staff of a residency program: residents
//! (tiered by post-graduate year) and supervising faculty. Each person
//! carries a set of credentialed skills used for eligibility checks.
//!
//! People are immutable within a scheduling run; the loader snapshots
//! them once and every solver path reads the same copies.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Unique person identifier, as issued by the upstream directory.
pub type PersonId = String;

/// Staff role classification.
///
/// Determines which decision variables a person participates in:
/// residents take duty assignments, faculty take supervision assignments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// A resident physician at the given post-graduate year (1-based).
    Resident { pgy: u8 },
    /// Supervising faculty.
    Faculty,
}

/// A schedulable staff member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    /// Unique person identifier.
    pub id: PersonId,
    /// Human-readable name.
    pub name: String,
    /// Staff role.
    pub role: Role,
    /// Credentialed skills (e.g., "ob", "icu", "procedures").
    pub skills: HashSet<String>,
}

impl Person {
    /// Creates a resident at the given PGY level.
    pub fn resident(id: impl Into<PersonId>, pgy: u8) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            role: Role::Resident { pgy },
            skills: HashSet::new(),
        }
    }

    /// Creates a faculty member.
    pub fn faculty(id: impl Into<PersonId>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            role: Role::Faculty,
            skills: HashSet::new(),
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds a credentialed skill.
    pub fn with_skill(mut self, skill: impl Into<String>) -> Self {
        self.skills.insert(skill.into());
        self
    }

    /// Adds several credentialed skills.
    pub fn with_skills(mut self, skills: impl IntoIterator<Item = impl Into<String>>) -> Self {
        for skill in skills {
            self.skills.insert(skill.into());
        }
        self
    }

    /// Whether this person is a resident.
    #[inline]
    pub fn is_resident(&self) -> bool {
        matches!(self.role, Role::Resident { .. })
    }

    /// Whether this person is faculty.
    #[inline]
    pub fn is_faculty(&self) -> bool {
        self.role == Role::Faculty
    }

    /// Post-graduate year, or `None` for faculty.
    pub fn pgy(&self) -> Option<u8> {
        match self.role {
            Role::Resident { pgy } => Some(pgy),
            Role::Faculty => None,
        }
    }

    /// Whether this person holds a given credentialed skill.
    pub fn has_skill(&self, skill: &str) -> bool {
        self.skills.contains(skill)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resident_builder() {
        let p = Person::resident("r1", 2)
            .with_name("A. Resident")
            .with_skill("icu")
            .with_skills(["ob", "procedures"]);

        assert_eq!(p.id, "r1");
        assert_eq!(p.name, "A. Resident");
        assert!(p.is_resident());
        assert!(!p.is_faculty());
        assert_eq!(p.pgy(), Some(2));
        assert!(p.has_skill("icu"));
        assert!(p.has_skill("ob"));
        assert!(!p.has_skill("anesthesia"));
    }

    #[test]
    fn test_faculty_has_no_pgy() {
        let f = Person::faculty("f1").with_name("Dr. F");
        assert!(f.is_faculty());
        assert_eq!(f.pgy(), None);
    }

    #[test]
    fn test_serde_round_trip() {
        let p = Person::resident("r1", 1).with_skill("clinic");
        let json = serde_json::to_string(&p).unwrap();
        let back: Person = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, p.id);
        assert_eq!(back.role, p.role);
        assert!(back.has_skill("clinic"));
    }
}
