//! Scheduling zones for failure containment.
//!
//! A zone is a named partition of the schedule (by activity) together with
//! the faculty who belong to it. Zones bound the blast radius of a staffing
//! loss: a zone that can cover itself without borrowing keeps its failures
//! local, while habitual cross-zone borrowing couples every zone's fate to
//! every other's.
//!
//! Self-sufficiency requires more than headcount. A zone with three
//! available bodies and nobody credentialed for its critical skill cannot
//! actually run, so the check counts qualified providers per critical
//! skill, not warm bodies.
//!
//! Status changes are returned as plain event values from `transition`;
//! callers decide what to notify.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::{Person, PersonId};

/// A named schedule partition with coverage requirements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulingZone {
    /// Zone name (e.g., "inpatient", "clinic").
    pub name: String,
    /// Activities whose blocks belong to this zone.
    pub activities: HashSet<String>,
    /// Faculty homed in this zone.
    pub faculty: HashSet<PersonId>,
    /// Minimum available headcount for self-sufficiency.
    pub minimum_coverage: usize,
    /// Required qualified providers per critical skill.
    pub critical_skills: HashMap<String, usize>,
    /// Whether cross-zone borrowing into this zone is penalized at the
    /// elevated rate.
    pub critical: bool,
}

/// Zone health classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoneStatus {
    /// Headcount and every critical skill are covered.
    SelfSufficient,
    /// Available headcount is below the minimum.
    Understaffed,
    /// Headcount is met but a critical skill lacks qualified providers.
    SkillGap,
}

/// Result of assessing a zone against current availability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneAssessment {
    /// Assessed zone name.
    pub zone: String,
    /// Health classification.
    pub status: ZoneStatus,
    /// Available zone faculty count.
    pub available_headcount: usize,
    /// Critical skills missing coverage: (skill, qualified available, required).
    pub missing_skills: Vec<(String, usize, usize)>,
}

/// A status change produced by `transition`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneEvent {
    pub zone: String,
    pub from: ZoneStatus,
    pub to: ZoneStatus,
}

impl SchedulingZone {
    /// Creates a zone.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            activities: HashSet::new(),
            faculty: HashSet::new(),
            minimum_coverage: 1,
            critical_skills: HashMap::new(),
            critical: false,
        }
    }

    /// Adds an activity to the zone.
    pub fn with_activity(mut self, activity: impl Into<String>) -> Self {
        self.activities.insert(activity.into());
        self
    }

    /// Homes a faculty member in the zone.
    pub fn with_faculty(mut self, person_id: impl Into<PersonId>) -> Self {
        self.faculty.insert(person_id.into());
        self
    }

    /// Sets the minimum available headcount.
    pub fn with_minimum_coverage(mut self, minimum: usize) -> Self {
        self.minimum_coverage = minimum;
        self
    }

    /// Requires qualified available providers for a skill.
    pub fn with_critical_skill(mut self, skill: impl Into<String>, required: usize) -> Self {
        self.critical_skills.insert(skill.into(), required);
        self
    }

    /// Flags the zone as critical.
    pub fn with_critical(mut self) -> Self {
        self.critical = true;
        self
    }

    /// Whether a block activity belongs to this zone.
    pub fn contains_activity(&self, activity: &str) -> bool {
        self.activities.contains(activity)
    }

    /// Whether the zone can cover itself: available headcount meets the
    /// minimum AND every critical skill has enough qualified, available
    /// providers.
    pub fn is_self_sufficient(&self, people: &[Person], available: &HashSet<PersonId>) -> bool {
        self.assess(people, available).status == ZoneStatus::SelfSufficient
    }

    /// Assesses the zone against the currently available people.
    ///
    /// `available` holds ids of people who can actually take work right
    /// now; only zone faculty within it count toward coverage.
    pub fn assess(&self, people: &[Person], available: &HashSet<PersonId>) -> ZoneAssessment {
        let available_zone_faculty: Vec<&Person> = people
            .iter()
            .filter(|p| self.faculty.contains(&p.id) && available.contains(&p.id))
            .collect();
        let headcount = available_zone_faculty.len();

        let mut missing = Vec::new();
        for (skill, &required) in &self.critical_skills {
            let qualified = available_zone_faculty
                .iter()
                .filter(|p| p.has_skill(skill))
                .count();
            if qualified < required {
                missing.push((skill.clone(), qualified, required));
            }
        }
        missing.sort();

        let status = if headcount < self.minimum_coverage {
            ZoneStatus::Understaffed
        } else if !missing.is_empty() {
            ZoneStatus::SkillGap
        } else {
            ZoneStatus::SelfSufficient
        };

        ZoneAssessment {
            zone: self.name.clone(),
            status,
            available_headcount: headcount,
            missing_skills: missing,
        }
    }

    /// Re-assesses the zone and reports a status change, if any, as an
    /// event value.
    pub fn transition(
        &self,
        previous: ZoneStatus,
        people: &[Person],
        available: &HashSet<PersonId>,
    ) -> (ZoneAssessment, Option<ZoneEvent>) {
        let assessment = self.assess(people, available);
        let event = (assessment.status != previous).then(|| ZoneEvent {
            zone: self.name.clone(),
            from: previous,
            to: assessment.status,
        });
        (assessment, event)
    }
}
