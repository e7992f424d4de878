//! Baseline objective terms: coverage, equity, continuity.
//!
//! Coverage carries a weight two orders of magnitude above everything
//! else, so the solver never trades a filled block for any combination of
//! softer goals. Equity enters the MILP as mean absolute deviation
//! (auxiliary deviation variables), while `EquityConstraint::penalty`
//! scores the exact quadratic distance from the mean for audits.

use good_lp::{constraint, Expression};
use itertools::Itertools;

use crate::context::SchedulingContext;
use crate::models::{Assignment, RosterRole, RuleId, Violation};
use crate::solver::model::AssignmentModel;

use super::SchedulingConstraint;

/// Rewards every filled duty seat; a fully staffed block earns exactly
/// the coverage weight. Blocks generated from mandatory templates must
/// be fully staffed outright.
#[derive(Debug, Clone, Copy)]
pub struct CoverageConstraint;

impl SchedulingConstraint for CoverageConstraint {
    fn id(&self) -> RuleId {
        RuleId::Coverage
    }

    fn apply(&self, model: &mut AssignmentModel, ctx: &SchedulingContext) {
        let weight = ctx.config.weights.coverage;
        for block in &ctx.data.blocks {
            let seats = block.required_headcount.max(1) as f64;
            let filled: Expression = model.duty_for_block(block.id).into_iter().sum();
            if block.mandatory {
                model.add_hard(constraint!(filled.clone() >= seats));
            }
            model.add_objective((weight / seats) * filled);
        }
    }

    fn check(&self, assignments: &[Assignment], ctx: &SchedulingContext) -> Vec<Violation> {
        let mut filled = vec![0usize; ctx.data.blocks.len()];
        for a in assignments {
            if a.role == RosterRole::Duty {
                if let Some(slot) = filled.get_mut(a.block_id) {
                    *slot += 1;
                }
            }
        }

        ctx.data
            .blocks
            .iter()
            .filter(|b| filled[b.id] < b.required_headcount)
            .map(|b| {
                let severity = if b.mandatory {
                    80
                } else if filled[b.id] == 0 {
                    60
                } else {
                    40
                };
                Violation::advisory(
                    RuleId::Coverage,
                    format!(
                        "block {} ({} {}) filled {}/{}",
                        b.id,
                        b.date,
                        b.activity,
                        filled[b.id],
                        b.required_headcount
                    ),
                )
                .with_block(b.id)
                .with_severity(severity)
            })
            .collect()
    }
}

/// Balances duty load across residents.
#[derive(Debug, Clone, Copy)]
pub struct EquityConstraint;

impl EquityConstraint {
    /// Quadratic distance of per-person counts from their mean.
    pub fn penalty(counts: &[usize]) -> f64 {
        if counts.is_empty() {
            return 0.0;
        }
        let mean = counts.iter().sum::<usize>() as f64 / counts.len() as f64;
        counts
            .iter()
            .map(|&c| {
                let d = c as f64 - mean;
                d * d
            })
            .sum()
    }
}

impl SchedulingConstraint for EquityConstraint {
    fn id(&self) -> RuleId {
        RuleId::Equity
    }

    fn apply(&self, model: &mut AssignmentModel, ctx: &SchedulingContext) {
        let residents = ctx.data.resident_indices();
        if residents.len() < 2 {
            return;
        }
        let weight = ctx.config.weights.equity;
        let share = 1.0 / residents.len() as f64;

        let total: Expression = model.duty_entries().map(|(_, v)| *v).sum();
        for &person in &residents {
            let load: Expression = model
                .duty_for_person(person)
                .into_iter()
                .map(|(_, v)| v)
                .sum();
            let deviation = model.add_nonneg();
            model.add_hard(constraint!(deviation >= load.clone() - share * total.clone()));
            model.add_hard(constraint!(deviation >= share * total.clone() - load));
            model.add_objective(-weight * deviation);
        }
    }

    fn check(&self, assignments: &[Assignment], ctx: &SchedulingContext) -> Vec<Violation> {
        let counts: Vec<usize> = duty_counts_per_resident(assignments, ctx);
        let spread = counts.iter().max().copied().unwrap_or(0)
            - counts.iter().min().copied().unwrap_or(0);
        if spread > 2 {
            vec![Violation::advisory(
                RuleId::Equity,
                format!(
                    "duty load spread is {spread} blocks (penalty {:.1})",
                    Self::penalty(&counts)
                ),
            )]
        } else {
            Vec::new()
        }
    }
}

/// Rewards one person holding both half-days of a date on the same
/// activity (continuity of care).
#[derive(Debug, Clone, Copy)]
pub struct ContinuityConstraint;

impl SchedulingConstraint for ContinuityConstraint {
    fn id(&self) -> RuleId {
        RuleId::Continuity
    }

    fn apply(&self, model: &mut AssignmentModel, ctx: &SchedulingContext) {
        use crate::models::DayPart;

        let weight = ctx.config.weights.continuity;
        // Pair AM and PM blocks of the same date and activity.
        let pairs: Vec<(usize, usize)> = ctx
            .data
            .blocks
            .iter()
            .filter(|b| b.day_part == DayPart::Am)
            .filter_map(|am| {
                ctx.data
                    .blocks
                    .iter()
                    .find(|pm| {
                        pm.day_part == DayPart::Pm
                            && pm.date == am.date
                            && pm.activity == am.activity
                    })
                    .map(|pm| (am.id, pm.id))
            })
            .collect();

        for person in ctx.data.resident_indices() {
            for &(am, pm) in &pairs {
                let (Some(am_var), Some(pm_var)) =
                    (model.duty_var(person, am), model.duty_var(person, pm))
                else {
                    continue;
                };
                let both = model.add_binary();
                model.add_hard(constraint!(both <= am_var));
                model.add_hard(constraint!(both <= pm_var));
                model.add_objective(weight * both);
            }
        }
    }

    fn check(&self, _assignments: &[Assignment], _ctx: &SchedulingContext) -> Vec<Violation> {
        // Purely an objective preference; nothing to audit.
        Vec::new()
    }
}

/// Duty-assignment counts per resident, in person order.
fn duty_counts_per_resident(assignments: &[Assignment], ctx: &SchedulingContext) -> Vec<usize> {
    let by_person = assignments
        .iter()
        .filter(|a| a.role == RosterRole::Duty)
        .filter_map(|a| ctx.data.person_index(&a.person_id))
        .counts();
    ctx.data
        .resident_indices()
        .into_iter()
        .map(|p| by_person.get(&p).copied().unwrap_or(0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EngineConfig;
    use crate::loader::tests::{d, FixtureDirectory};
    use crate::loader::ScheduleData;
    use crate::models::{DateRange, Person, RotationTemplate};

    fn ctx() -> SchedulingContext {
        let dir = FixtureDirectory {
            people: vec![
                Person::resident("r1", 1),
                Person::resident("r2", 2),
                Person::faculty("f1"),
            ],
            absences: vec![],
            templates: vec![RotationTemplate::new("t1", "clinic")],
        };
        let range = DateRange::new(d(2026, 3, 1), d(2026, 3, 2));
        let data = ScheduleData::load(range, &dir).unwrap();
        SchedulingContext::new(data, EngineConfig::default())
    }

    #[test]
    fn test_equity_penalty_quadratic() {
        // Counts 4 and 0: mean 2, penalty 4 + 4 = 8.
        assert!((EquityConstraint::penalty(&[4, 0]) - 8.0).abs() < 1e-10);
        // Balanced load has zero penalty.
        assert!((EquityConstraint::penalty(&[2, 2, 2]) - 0.0).abs() < 1e-10);
        assert_eq!(EquityConstraint::penalty(&[]), 0.0);
    }

    #[test]
    fn test_coverage_check_reports_gaps() {
        let ctx = ctx();
        // Cover only the first block.
        let assignments = vec![Assignment::duty("r1", 0)];
        let violations = CoverageConstraint.check(&assignments, &ctx);
        // 4 blocks, 3 unfilled.
        assert_eq!(violations.len(), 3);
        assert!(violations.iter().all(|v| v.rule == RuleId::Coverage));
        assert!(violations.iter().all(|v| v.severity == 60));
    }

    #[test]
    fn test_equity_check_flags_spread() {
        let ctx = ctx();
        // r1 takes everything, r2 nothing: spread 4.
        let assignments: Vec<Assignment> = ctx
            .data
            .blocks
            .iter()
            .map(|b| Assignment::duty("r1", b.id))
            .collect();
        let violations = EquityConstraint.check(&assignments, &ctx);
        assert_eq!(violations.len(), 1);

        // One each: no finding.
        let balanced = vec![Assignment::duty("r1", 0), Assignment::duty("r2", 1)];
        assert!(EquityConstraint.check(&balanced, &ctx).is_empty());
    }

    #[test]
    fn test_continuity_adds_pair_terms() {
        let ctx = ctx();
        let mut model = AssignmentModel::build(&ctx);
        let vars_before = model.num_vars();
        let hard_before = model.num_hard();
        ContinuityConstraint.apply(&mut model, &ctx);
        // 2 residents x 2 dates: 4 pair indicators, 2 links each.
        assert_eq!(model.num_vars(), vars_before + 4);
        assert_eq!(model.num_hard(), hard_before + 8);
    }
}
