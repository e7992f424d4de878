//! Constraint framework.
//!
//! A scheduling constraint is polymorphic over two capabilities: it can
//! add itself to the MILP model (`apply`) and it can audit a finished
//! assignment set with no knowledge of how it was produced (`check`).
//! The second capability is what makes the compliance validator and the
//! unit tests independent of the solver.
//!
//! `ConstraintSet` is the ordered registry. Constraints are identified by
//! the closed `RuleId` enum, never by strings, and can be enabled,
//! disabled, or replaced at runtime. Two factory configurations exist:
//! `baseline` (regulatory rules plus coverage and equity) and
//! `resilience_aware` (baseline plus the systemic-resilience terms).

mod objective;
mod regulatory;
mod resilience;

pub use objective::{ContinuityConstraint, CoverageConstraint, EquityConstraint};
pub use regulatory::{
    AvailabilityConstraint, DutyHourCeilingConstraint, MandatoryRestConstraint,
    RestDayMinimumConstraint, SupervisionRatioConstraint,
};
pub use resilience::{
    HubProtectionConstraint, N1VulnerabilityConstraint, PreferenceTrailConstraint,
    UtilizationBufferConstraint, ZoneBoundaryConstraint,
};

use std::fmt::Debug;
use std::sync::Arc;

use crate::context::SchedulingContext;
use crate::models::{Assignment, RuleId, Violation};
use crate::solver::model::AssignmentModel;

/// A rule that shapes the model and audits finished rosters.
pub trait SchedulingConstraint: Send + Sync + Debug {
    /// Identity of the rule this constraint enforces.
    fn id(&self) -> RuleId;

    /// Whether the rule is a hard bound (must hold in any accepted
    /// solution) rather than a weighted objective term.
    fn is_hard(&self) -> bool {
        false
    }

    /// Adds the rule to the model: hard bounds for hard rules, weighted
    /// objective terms for soft ones. Soft rules whose input signals are
    /// missing add nothing.
    fn apply(&self, model: &mut AssignmentModel, ctx: &SchedulingContext);

    /// Audits a finished assignment set against this rule alone.
    fn check(&self, assignments: &[Assignment], ctx: &SchedulingContext) -> Vec<Violation>;
}

#[derive(Clone)]
struct Entry {
    constraint: Arc<dyn SchedulingConstraint>,
    enabled: bool,
}

impl Debug for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}(enabled={})", self.constraint.id(), self.enabled)
    }
}

/// Ordered, toggleable constraint registry.
#[derive(Debug, Default, Clone)]
pub struct ConstraintSet {
    entries: Vec<Entry>,
}

impl ConstraintSet {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The baseline configuration: all regulatory hard rules plus the
    /// coverage and equity objective terms.
    pub fn baseline() -> Self {
        Self::new()
            .with(AvailabilityConstraint)
            .with(DutyHourCeilingConstraint)
            .with(MandatoryRestConstraint)
            .with(RestDayMinimumConstraint)
            .with(SupervisionRatioConstraint)
            .with(CoverageConstraint)
            .with(EquityConstraint)
            .with(ContinuityConstraint)
    }

    /// The resilience-aware configuration: baseline plus hub protection,
    /// utilization buffering, zone isolation, preference trails, and N-1
    /// vulnerability avoidance.
    pub fn resilience_aware() -> Self {
        Self::baseline()
            .with(N1VulnerabilityConstraint)
            .with(UtilizationBufferConstraint)
            .with(HubProtectionConstraint)
            .with(ZoneBoundaryConstraint)
            .with(PreferenceTrailConstraint)
    }

    /// Registers a constraint, enabled.
    pub fn with<C: SchedulingConstraint + 'static>(mut self, constraint: C) -> Self {
        self.entries.push(Entry {
            constraint: Arc::new(constraint),
            enabled: true,
        });
        self
    }

    /// Enables a registered constraint. Returns whether it was found.
    pub fn enable(&mut self, id: RuleId) -> bool {
        self.set_enabled(id, true)
    }

    /// Disables a registered constraint. Returns whether it was found.
    pub fn disable(&mut self, id: RuleId) -> bool {
        self.set_enabled(id, false)
    }

    /// Whether a constraint is registered and enabled.
    pub fn is_enabled(&self, id: RuleId) -> bool {
        self.entries
            .iter()
            .any(|e| e.constraint.id() == id && e.enabled)
    }

    /// Replaces a registered constraint with another carrying the same id.
    /// Returns whether a replacement happened.
    pub fn replace<C: SchedulingConstraint + 'static>(&mut self, constraint: C) -> bool {
        let id = constraint.id();
        for entry in &mut self.entries {
            if entry.constraint.id() == id {
                entry.constraint = Arc::new(constraint);
                return true;
            }
        }
        false
    }

    /// Enabled constraints in registration order.
    pub fn enabled(&self) -> impl Iterator<Item = &Arc<dyn SchedulingConstraint>> {
        self.entries
            .iter()
            .filter(|e| e.enabled)
            .map(|e| &e.constraint)
    }

    /// Enabled hard constraints in registration order.
    pub fn enabled_hard(&self) -> impl Iterator<Item = &Arc<dyn SchedulingConstraint>> {
        self.enabled().filter(|c| c.is_hard())
    }

    /// Applies every enabled constraint to the model.
    pub fn apply_all(&self, model: &mut AssignmentModel, ctx: &SchedulingContext) {
        for constraint in self.enabled() {
            constraint.apply(model, ctx);
        }
    }

    /// Audits assignments against every enabled constraint.
    pub fn check_all(&self, assignments: &[Assignment], ctx: &SchedulingContext) -> Vec<Violation> {
        self.enabled()
            .flat_map(|c| c.check(assignments, ctx))
            .collect()
    }

    fn set_enabled(&mut self, id: RuleId, enabled: bool) -> bool {
        let mut found = false;
        for entry in &mut self.entries {
            if entry.constraint.id() == id {
                entry.enabled = enabled;
                found = true;
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline_contains_regulatory_rules() {
        let set = ConstraintSet::baseline();
        for id in [
            RuleId::Availability,
            RuleId::DutyHourCeiling,
            RuleId::MandatoryRest,
            RuleId::RestDayMinimum,
            RuleId::SupervisionRatio,
            RuleId::Coverage,
            RuleId::Equity,
        ] {
            assert!(set.is_enabled(id), "{id:?} missing from baseline");
        }
        assert!(!set.is_enabled(RuleId::HubProtection));
    }

    #[test]
    fn test_resilience_aware_adds_resilience_rules() {
        let set = ConstraintSet::resilience_aware();
        for id in [
            RuleId::HubProtection,
            RuleId::UtilizationBuffer,
            RuleId::ZoneBoundary,
            RuleId::PreferenceTrail,
            RuleId::N1Vulnerability,
        ] {
            assert!(set.is_enabled(id), "{id:?} missing");
        }
    }

    #[test]
    fn test_disable_and_enable() {
        let mut set = ConstraintSet::resilience_aware();
        assert!(set.disable(RuleId::HubProtection));
        assert!(!set.is_enabled(RuleId::HubProtection));
        assert!(set.enable(RuleId::HubProtection));
        assert!(set.is_enabled(RuleId::HubProtection));
        // Unknown rule: nothing to toggle.
        let mut empty = ConstraintSet::new();
        assert!(!empty.disable(RuleId::Coverage));
    }

    #[test]
    fn test_hard_subset() {
        let set = ConstraintSet::baseline();
        let hard: Vec<RuleId> = set.enabled_hard().map(|c| c.id()).collect();
        assert_eq!(
            hard,
            vec![
                RuleId::Availability,
                RuleId::DutyHourCeiling,
                RuleId::MandatoryRest,
                RuleId::RestDayMinimum,
                RuleId::SupervisionRatio,
            ]
        );
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut set = ConstraintSet::baseline();
        assert!(set.replace(CoverageConstraint));
        let ids: Vec<RuleId> = set.enabled().map(|c| c.id()).collect();
        let pos = ids.iter().position(|&i| i == RuleId::Coverage).unwrap();
        assert_eq!(pos, 5);
    }
}
