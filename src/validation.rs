//! Post-hoc compliance validation.
//!
//! Re-derives every regulatory check from a finished assignment set
//! alone, with no knowledge of how the set was produced. This is the
//! single source of truth for "is this schedule legal": solver output,
//! manually edited rosters, and schedules imported from external tools
//! all go through the same checks.
//!
//! Validation is pure and idempotent: the same assignment set against
//! the same context always yields the same violation list.

use itertools::Itertools;

use crate::constraints::{
    AvailabilityConstraint, ConstraintSet, DutyHourCeilingConstraint, MandatoryRestConstraint,
    RestDayMinimumConstraint, SupervisionRatioConstraint,
};
use crate::context::SchedulingContext;
use crate::models::{Assignment, RuleId, Violation};

/// Audits finished rosters against the regulatory rules.
#[derive(Debug)]
pub struct ComplianceValidator {
    rules: ConstraintSet,
}

impl Default for ComplianceValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl ComplianceValidator {
    /// Creates a validator over the full regulatory rule set.
    pub fn new() -> Self {
        Self {
            rules: ConstraintSet::new()
                .with(AvailabilityConstraint)
                .with(DutyHourCeilingConstraint)
                .with(MandatoryRestConstraint)
                .with(RestDayMinimumConstraint)
                .with(SupervisionRatioConstraint),
        }
    }

    /// Checks every regulatory rule plus double-booking and returns all
    /// violations found.
    pub fn validate(
        &self,
        assignments: &[Assignment],
        ctx: &SchedulingContext,
    ) -> Vec<Violation> {
        let mut violations = self.rules.check_all(assignments, ctx);
        violations.extend(check_double_booking(assignments, ctx));
        violations
    }
}

/// At most one assignment per (person, block, role), and one block per
/// person per half-day.
fn check_double_booking(assignments: &[Assignment], ctx: &SchedulingContext) -> Vec<Violation> {
    let mut violations = Vec::new();

    // Exact duplicates.
    let duplicates = assignments
        .iter()
        .map(|a| (&a.person_id, a.block_id, a.role))
        .counts();
    for ((person_id, block_id, role), count) in duplicates
        .into_iter()
        .sorted_by_key(|&((id, b, _), _)| (id.clone(), b))
    {
        if count > 1 {
            violations.push(
                Violation::hard(
                    RuleId::DoubleBooking,
                    person_id.clone(),
                    format!(
                        "'{person_id}' holds {count} identical {role:?} assignments on block {block_id}"
                    ),
                )
                .with_block(block_id)
                .with_severity(90),
            );
        }
    }

    // Two places at once.
    let slots = assignments
        .iter()
        .filter_map(|a| {
            let block = ctx.data.blocks.get(a.block_id)?;
            Some(((&a.person_id, block.date, block.day_part), a.block_id))
        })
        .into_group_map();
    for ((person_id, date, part), blocks) in slots
        .into_iter()
        .sorted_by_key(|&((id, date, part), _)| (id.clone(), date, part))
    {
        let distinct: Vec<usize> = blocks.into_iter().unique().collect();
        if distinct.len() > 1 {
            violations.push(
                Violation::hard(
                    RuleId::DoubleBooking,
                    person_id.clone(),
                    format!(
                        "'{person_id}' holds {} blocks simultaneously on {date} {part:?}",
                        distinct.len()
                    ),
                )
                .with_severity(90),
            );
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EngineConfig;
    use crate::loader::tests::{d, FixtureDirectory};
    use crate::loader::ScheduleData;
    use crate::models::{Absence, AbsenceType, DateRange, DayPart, Person, RotationTemplate};

    fn ctx() -> SchedulingContext {
        let dir = FixtureDirectory {
            people: vec![
                Person::resident("r1", 1),
                Person::resident("r2", 2),
                Person::faculty("f1"),
            ],
            absences: vec![Absence::new(
                "r1",
                d(2026, 3, 3),
                d(2026, 3, 3),
                AbsenceType::Vacation,
            )],
            templates: vec![
                RotationTemplate::new("t1", "clinic").with_supervision(),
                RotationTemplate::new("t2", "inpatient"),
            ],
        };
        let range = DateRange::new(d(2026, 3, 1), d(2026, 3, 7));
        let data = ScheduleData::load(range, &dir).unwrap();
        SchedulingContext::new(data, EngineConfig::default())
    }

    fn block_at(ctx: &SchedulingContext, day: usize, part: DayPart, activity: &str) -> usize {
        ctx.data
            .blocks
            .iter()
            .find(|b| b.day_index == day && b.day_part == part && b.activity == activity)
            .unwrap()
            .id
    }

    #[test]
    fn test_clean_schedule_passes() {
        let ctx = ctx();
        let clinic_am = block_at(&ctx, 0, DayPart::Am, "clinic");
        let assignments = vec![
            Assignment::duty("r2", clinic_am),
            Assignment::supervision("f1", clinic_am),
        ];
        assert!(ComplianceValidator::new()
            .validate(&assignments, &ctx)
            .is_empty());
    }

    #[test]
    fn test_detects_multiple_rule_breaches_at_once() {
        let ctx = ctx();
        // r1 is absent on day index 2 (March 3rd), and PM day 2 into
        // AM day 3 breaks overnight rest.
        let pm2 = block_at(&ctx, 2, DayPart::Pm, "inpatient");
        let am3 = block_at(&ctx, 3, DayPart::Am, "inpatient");
        let assignments = vec![Assignment::duty("r1", pm2), Assignment::duty("r1", am3)];

        let violations = ComplianceValidator::new().validate(&assignments, &ctx);
        let rules: Vec<RuleId> = violations.iter().map(|v| v.rule).collect();
        assert!(rules.contains(&RuleId::Availability));
        assert!(rules.contains(&RuleId::MandatoryRest));
    }

    #[test]
    fn test_detects_exact_duplicate() {
        let ctx = ctx();
        let b = block_at(&ctx, 0, DayPart::Am, "inpatient");
        let assignments = vec![Assignment::duty("r2", b), Assignment::duty("r2", b)];

        let violations = ComplianceValidator::new().validate(&assignments, &ctx);
        assert!(violations.iter().any(|v| v.rule == RuleId::DoubleBooking));
    }

    #[test]
    fn test_detects_two_places_at_once() {
        let ctx = ctx();
        let clinic = block_at(&ctx, 0, DayPart::Am, "clinic");
        let inpatient = block_at(&ctx, 0, DayPart::Am, "inpatient");
        let assignments = vec![
            Assignment::duty("r2", clinic),
            Assignment::duty("r2", inpatient),
            Assignment::supervision("f1", clinic),
        ];

        let violations = ComplianceValidator::new().validate(&assignments, &ctx);
        let double: Vec<&Violation> = violations
            .iter()
            .filter(|v| v.rule == RuleId::DoubleBooking)
            .collect();
        assert_eq!(double.len(), 1);
        assert_eq!(double[0].person_id.as_deref(), Some("r2"));
    }

    #[test]
    fn test_validation_is_idempotent() {
        let ctx = ctx();
        let pm0 = block_at(&ctx, 0, DayPart::Pm, "clinic");
        let am1 = block_at(&ctx, 1, DayPart::Am, "clinic");
        let assignments = vec![
            Assignment::duty("r1", pm0),
            Assignment::duty("r1", am1),
            Assignment::duty("r2", pm0),
        ];

        let validator = ComplianceValidator::new();
        let first = validator.validate(&assignments, &ctx);
        let second = validator.validate(&assignments, &ctx);
        assert!(!first.is_empty());
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.rule, b.rule);
            assert_eq!(a.person_id, b.person_id);
            assert_eq!(a.block_id, b.block_id);
            assert_eq!(a.message, b.message);
        }
    }

    #[test]
    fn test_unsupervised_pgy1_flagged() {
        let ctx = ctx();
        let clinic = block_at(&ctx, 1, DayPart::Am, "clinic");
        let assignments = vec![Assignment::duty("r1", clinic)];

        let violations = ComplianceValidator::new().validate(&assignments, &ctx);
        assert!(violations
            .iter()
            .any(|v| v.rule == RuleId::SupervisionRatio));

        // The unsupervised template carries no ratio requirement.
        let inpatient = block_at(&ctx, 1, DayPart::Am, "inpatient");
        let assignments = vec![Assignment::duty("r1", inpatient)];
        assert!(ComplianceValidator::new()
            .validate(&assignments, &ctx)
            .is_empty());
    }
}
