//! Rotation template model.
//!
//! A rotation template describes a recurring activity that must be staffed:
//! its label, how many residents each half-day needs, whether assigned
//! residents require faculty supervision, and an optional credential.
//! Block generation expands every day of the planning range against every
//! active template.

use serde::{Deserialize, Serialize};

/// A recurring activity definition used to generate blocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationTemplate {
    /// Unique template identifier.
    pub id: String,
    /// Activity label stamped onto generated blocks (e.g., "clinic", "inpatient").
    pub activity: String,
    /// Duty headcount per generated block.
    pub required_headcount: usize,
    /// Whether generated blocks require faculty supervision.
    pub needs_supervision: bool,
    /// Credential residents must hold to be eligible, if any.
    pub required_skill: Option<String>,
    /// Whether coverage is a hard requirement. Blocks from mandatory
    /// templates must be fully staffed in any accepted solution; others
    /// may stay open as coverage gaps.
    pub mandatory: bool,
}

impl RotationTemplate {
    /// Creates a template with a headcount of one and no supervision.
    pub fn new(id: impl Into<String>, activity: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            activity: activity.into(),
            required_headcount: 1,
            needs_supervision: false,
            required_skill: None,
            mandatory: false,
        }
    }

    /// Sets the duty headcount per block.
    pub fn with_headcount(mut self, headcount: usize) -> Self {
        self.required_headcount = headcount;
        self
    }

    /// Requires faculty supervision on generated blocks.
    pub fn with_supervision(mut self) -> Self {
        self.needs_supervision = true;
        self
    }

    /// Requires a credential for duty eligibility.
    pub fn with_required_skill(mut self, skill: impl Into<String>) -> Self {
        self.required_skill = Some(skill.into());
        self
    }

    /// Makes coverage of generated blocks a hard requirement.
    pub fn with_mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }
}
