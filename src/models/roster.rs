//! Roster (solution) model.
//!
//! A roster is a complete set of person-to-block assignments produced by
//! one generation run. Assignments are created only by a solver and never
//! mutated afterward; a later run supersedes the whole roster.
//!
//! `Violation` and `RuleId` form the shared vocabulary between the
//! constraint framework and the compliance validator: every rule that can
//! be broken has exactly one `RuleId`, whether it is enforced as a hard
//! bound, scored as a soft penalty, or audited after the fact.

use serde::{Deserialize, Serialize};

use super::{BlockId, PersonId};

/// The capacity in which a person is assigned to a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RosterRole {
    /// Covering the block's activity (residents).
    Duty,
    /// Supervising the residents on the block (faculty).
    Supervision,
}

/// A single person-block-role assignment.
///
/// Field order defines the canonical sort: block, then role (duty before
/// supervision), then person.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Assignment {
    /// Assigned block.
    pub block_id: BlockId,
    /// Capacity of the assignment.
    pub role: RosterRole,
    /// Assigned person.
    pub person_id: PersonId,
}

impl Assignment {
    /// Creates a duty assignment.
    pub fn duty(person_id: impl Into<PersonId>, block_id: BlockId) -> Self {
        Self {
            block_id,
            person_id: person_id.into(),
            role: RosterRole::Duty,
        }
    }

    /// Creates a supervision assignment.
    pub fn supervision(person_id: impl Into<PersonId>, block_id: BlockId) -> Self {
        Self {
            block_id,
            person_id: person_id.into(),
            role: RosterRole::Supervision,
        }
    }
}

impl PartialOrd for RosterRole {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RosterRole {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Duty sorts before Supervision for stable roster output.
        fn rank(r: &RosterRole) -> u8 {
            match r {
                RosterRole::Duty => 0,
                RosterRole::Supervision => 1,
            }
        }
        rank(self).cmp(&rank(other))
    }
}

/// Identity of a scheduling rule.
///
/// A closed enum: constraint registration, objective weighting, and
/// violation reporting all key on it, so a rule cannot exist in one place
/// without being nameable in the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleId {
    // Hard regulatory rules.
    Availability,
    DutyHourCeiling,
    MandatoryRest,
    RestDayMinimum,
    SupervisionRatio,
    /// At most one assignment per (person, block, role). Structural in the
    /// solvers, audited explicitly by the validator.
    DoubleBooking,
    // Soft objective terms.
    Coverage,
    Equity,
    Continuity,
    // Resilience-aware soft terms.
    HubProtection,
    UtilizationBuffer,
    ZoneBoundary,
    PreferenceTrail,
    N1Vulnerability,
}

/// A detected rule violation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    /// The rule that was broken.
    pub rule: RuleId,
    /// Person involved, when the rule is person-scoped.
    pub person_id: Option<PersonId>,
    /// Block involved, when the rule is block-scoped.
    pub block_id: Option<BlockId>,
    /// Severity (0-100, higher = worse). Hard rules report 85+.
    pub severity: i32,
    /// Human-readable description.
    pub message: String,
}

impl Violation {
    /// Creates a violation of a hard rule involving a person.
    pub fn hard(rule: RuleId, person_id: impl Into<PersonId>, message: impl Into<String>) -> Self {
        Self {
            rule,
            person_id: Some(person_id.into()),
            block_id: None,
            severity: 95,
            message: message.into(),
        }
    }

    /// Creates a block-scoped violation.
    pub fn for_block(rule: RuleId, block_id: BlockId, message: impl Into<String>) -> Self {
        Self {
            rule,
            person_id: None,
            block_id: Some(block_id),
            severity: 85,
            message: message.into(),
        }
    }

    /// Creates a soft, advisory violation.
    pub fn advisory(rule: RuleId, message: impl Into<String>) -> Self {
        Self {
            rule,
            person_id: None,
            block_id: None,
            severity: 30,
            message: message.into(),
        }
    }

    /// Attaches a block id.
    pub fn with_block(mut self, block_id: BlockId) -> Self {
        self.block_id = Some(block_id);
        self
    }

    /// Attaches a person id.
    pub fn with_person(mut self, person_id: impl Into<PersonId>) -> Self {
        self.person_id = Some(person_id.into());
        self
    }

    /// Overrides the severity.
    pub fn with_severity(mut self, severity: i32) -> Self {
        self.severity = severity;
        self
    }
}

/// A complete solution: assignments plus any blocks left uncovered.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Roster {
    /// All assignments, sorted by (block, role, person).
    pub assignments: Vec<Assignment>,
    /// Blocks no solver path could cover. A gap, not an error.
    pub uncovered: Vec<BlockId>,
}

impl Roster {
    /// Creates an empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an assignment.
    pub fn push(&mut self, assignment: Assignment) {
        self.assignments.push(assignment);
    }

    /// Records an uncovered block.
    pub fn push_uncovered(&mut self, block_id: BlockId) {
        self.uncovered.push(block_id);
    }

    /// Sorts assignments and gaps into canonical order.
    pub fn normalize(&mut self) {
        self.assignments.sort();
        self.uncovered.sort_unstable();
    }

    /// Number of assignments.
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    /// Whether the roster holds no assignments.
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// All assignments for one person.
    pub fn for_person(&self, person_id: &str) -> Vec<&Assignment> {
        self.assignments
            .iter()
            .filter(|a| a.person_id == person_id)
            .collect()
    }

    /// All assignments on one block.
    pub fn for_block(&self, block_id: BlockId) -> Vec<&Assignment> {
        self.assignments
            .iter()
            .filter(|a| a.block_id == block_id)
            .collect()
    }

    /// Number of assignments held by one person.
    pub fn count_for_person(&self, person_id: &str) -> usize {
        self.assignments
            .iter()
            .filter(|a| a.person_id == person_id)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_roster() -> Roster {
        let mut r = Roster::new();
        r.push(Assignment::duty("r1", 0));
        r.push(Assignment::duty("r2", 1));
        r.push(Assignment::supervision("f1", 0));
        r.push(Assignment::duty("r1", 2));
        r.push_uncovered(3);
        r
    }

    #[test]
    fn test_roster_queries() {
        let r = sample_roster();
        assert_eq!(r.len(), 4);
        assert_eq!(r.count_for_person("r1"), 2);
        assert_eq!(r.for_block(0).len(), 2);
        assert_eq!(r.for_person("f1").len(), 1);
        assert_eq!(r.uncovered, vec![3]);
    }

    #[test]
    fn test_normalize_orders_duty_before_supervision() {
        let mut r = Roster::new();
        r.push(Assignment::supervision("f1", 0));
        r.push(Assignment::duty("r1", 0));
        r.normalize();
        assert_eq!(r.assignments[0].role, RosterRole::Duty);
        assert_eq!(r.assignments[1].role, RosterRole::Supervision);
    }

    #[test]
    fn test_violation_builders() {
        let v = Violation::hard(RuleId::DutyHourCeiling, "r1", "86h in window").with_block(4);
        assert_eq!(v.rule, RuleId::DutyHourCeiling);
        assert_eq!(v.person_id.as_deref(), Some("r1"));
        assert_eq!(v.block_id, Some(4));
        assert!(v.severity >= 85);

        let a = Violation::advisory(RuleId::UtilizationBuffer, "over target");
        assert!(a.severity < 85);
    }

    #[test]
    fn test_empty_roster() {
        let r = Roster::new();
        assert!(r.is_empty());
        assert_eq!(r.count_for_person("r1"), 0);
    }
}
