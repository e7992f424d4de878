//! MILP-based optimizing scheduler.
//!
//! Builds Boolean assignment variables, lets every enabled constraint add
//! its hard bounds and weighted objective terms, then hands the model to
//! the HiGHS backend under a wall-clock budget. Termination states, in
//! order of preference: proven optimal, feasible (time-limited), provably
//! infeasible (with a minimal explanation where probing finds one), or
//! aborted with nothing usable.
//!
//! Reproducibility: variable creation order is deterministic, the solver
//! runs single-threaded by default, and the random seed comes from the
//! engine configuration, so identical inputs yield identical rosters.

use std::time::{Duration, Instant};

use good_lp::{constraint, default_solver, Expression, ResolutionError, Solution, SolverModel};
use log::{debug, info};

use crate::constraints::ConstraintSet;
use crate::context::SchedulingContext;
use crate::models::{Assignment, DayPart, Roster, RosterRole, RuleId};

use super::model::AssignmentModel;
use super::{SolveOutcome, SolveStats, SolveStatus};

/// Hard rule families the infeasibility probe may relax one at a time.
/// Availability is definitional and never relaxed. Coverage is listed
/// because mandatory templates turn it into a hard mandate.
const RELAXABLE: [RuleId; 5] = [
    RuleId::Coverage,
    RuleId::DutyHourCeiling,
    RuleId::MandatoryRest,
    RuleId::RestDayMinimum,
    RuleId::SupervisionRatio,
];

/// The constraint-programming path.
#[derive(Debug, Clone)]
pub struct CpScheduler {
    constraints: ConstraintSet,
}

impl CpScheduler {
    /// Creates a scheduler over an explicit constraint registry.
    pub fn new(constraints: ConstraintSet) -> Self {
        Self { constraints }
    }

    /// Baseline configuration: regulatory rules, coverage, equity.
    pub fn baseline() -> Self {
        Self::new(ConstraintSet::baseline())
    }

    /// Resilience-aware configuration.
    pub fn resilience_aware() -> Self {
        Self::new(ConstraintSet::resilience_aware())
    }

    /// The registry, for toggling before solving.
    pub fn constraints_mut(&mut self) -> &mut ConstraintSet {
        &mut self.constraints
    }

    /// Solves under a wall-clock budget.
    pub fn solve(&self, ctx: &SchedulingContext, time_limit: Duration) -> SolveOutcome {
        match self.solve_with(&self.constraints, ctx, time_limit) {
            Attempt::Solved(outcome) => outcome,
            Attempt::Infeasible => {
                let explanation = self.explain_infeasibility(ctx, time_limit);
                SolveOutcome {
                    status: SolveStatus::Infeasible { explanation },
                    roster: Roster::new(),
                    stats: SolveStats::default(),
                }
            }
            Attempt::Failed(reason) => SolveOutcome {
                status: SolveStatus::Aborted { reason },
                roster: Roster::new(),
                stats: SolveStats::default(),
            },
        }
    }

    fn solve_with(
        &self,
        constraints: &ConstraintSet,
        ctx: &SchedulingContext,
        time_limit: Duration,
    ) -> Attempt {
        let start = Instant::now();
        let mut model = AssignmentModel::build(ctx);
        add_structural_guards(&mut model, ctx);
        constraints.apply_all(&mut model, ctx);

        let variables = model.num_vars();
        let hard_constraints = model.num_hard();
        info!("milp model: {variables} variables, {hard_constraints} hard constraints");

        let parts = model.finish();
        let objective = parts.objective.clone();
        let mut solver_model = parts
            .vars
            .maximise(parts.objective)
            .using(default_solver)
            .set_option("threads", ctx.config.solver_threads)
            .set_option("random_seed", ctx.config.random_seed)
            .set_option("time_limit", time_limit.as_secs_f64())
            .set_option("output_flag", "false");
        for c in parts.hard {
            solver_model.add_constraint(c);
        }

        let solution = match solver_model.solve() {
            Ok(s) => s,
            Err(ResolutionError::Infeasible) => return Attempt::Infeasible,
            Err(e) => return Attempt::Failed(format!("solver failed: {e}")),
        };
        let elapsed = start.elapsed();

        let mut roster = Roster::new();
        for (&(p, b), &v) in &parts.duty {
            if solution.value(v) > 0.9 {
                roster.push(Assignment::duty(ctx.data.person(p).id.clone(), b));
            }
        }
        for (&(p, b), &v) in &parts.supervision {
            if solution.value(v) > 0.9 {
                roster.push(Assignment::supervision(ctx.data.person(p).id.clone(), b));
            }
        }
        for block in &ctx.data.blocks {
            let covered = roster
                .for_block(block.id)
                .iter()
                .any(|a| a.role == RosterRole::Duty);
            if !covered {
                roster.push_uncovered(block.id);
            }
        }
        roster.normalize();

        // HiGHS stops early only with a proven answer; running into the
        // wall means the incumbent is merely feasible.
        let status = if elapsed >= time_limit {
            SolveStatus::Feasible
        } else {
            SolveStatus::Optimal
        };
        debug!(
            "milp solved in {elapsed:?}: {} assignments, {} gaps",
            roster.len(),
            roster.uncovered.len(),
        );

        Attempt::Solved(SolveOutcome {
            status,
            roster,
            stats: SolveStats {
                solve_time_ms: elapsed.as_millis() as u64,
                variables,
                hard_constraints,
                objective: Some(objective.eval_with(&solution)),
            },
        })
    }

    /// Single-deletion probing: re-solves with one relaxable family
    /// disabled at a time and reports the families whose removal restores
    /// feasibility. An empty result means no single family explains it.
    fn explain_infeasibility(&self, ctx: &SchedulingContext, time_limit: Duration) -> Vec<RuleId> {
        let probe_limit = (time_limit / 4).max(Duration::from_secs(1));
        let mut explanation = Vec::new();

        for rule in RELAXABLE {
            if !self.constraints.is_enabled(rule) {
                continue;
            }
            let mut relaxed = self.constraints.clone();
            relaxed.disable(rule);
            if matches!(
                self.solve_with(&relaxed, ctx, probe_limit),
                Attempt::Solved(_)
            ) {
                explanation.push(rule);
            }
        }

        debug!("infeasibility explanation: {explanation:?}");
        explanation
    }
}

enum Attempt {
    Solved(SolveOutcome),
    Infeasible,
    Failed(String),
}

/// Physical guards that are not policy: a block never takes more duty
/// assignments than it has seats, nobody supervises an empty block, and a
/// person occupies at most one block per half-day.
fn add_structural_guards(model: &mut AssignmentModel, ctx: &SchedulingContext) {
    for block in &ctx.data.blocks {
        let seats = block.required_headcount as f64;
        let duty: Expression = model.duty_for_block(block.id).into_iter().sum();
        if block.needs_supervision {
            let supervisors: Expression =
                model.supervision_for_block(block.id).into_iter().sum();
            model.add_hard(constraint!(supervisors <= duty.clone()));
        }
        model.add_hard(constraint!(duty <= seats));
    }

    for person in 0..ctx.data.people.len() {
        let person_vars = model.vars_for_person(person);
        if person_vars.is_empty() {
            continue;
        }
        for day in 0..ctx.data.horizon_days() {
            for part in [DayPart::Am, DayPart::Pm] {
                let here: Vec<_> = person_vars
                    .iter()
                    .filter(|(b, _)| {
                        let block = &ctx.data.blocks[*b];
                        block.day_index == day && block.day_part == part
                    })
                    .map(|(_, v)| *v)
                    .collect();
                if here.len() > 1 {
                    let occupied: Expression = here.into_iter().sum();
                    model.add_hard(constraint!(occupied <= 1));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EngineConfig;
    use crate::loader::tests::{d, FixtureDirectory};
    use crate::loader::ScheduleData;
    use crate::models::{
        Absence, AbsenceType, DateRange, Person, ResilienceSignals, RosterRole, RotationTemplate,
    };
    use crate::validation::ComplianceValidator;
    use std::collections::HashMap;

    fn load_ctx(dir: FixtureDirectory, days: u32) -> SchedulingContext {
        let range = DateRange::new(d(2026, 3, 1), d(2026, 3, days));
        let data = ScheduleData::load(range, &dir).unwrap();
        SchedulingContext::new(data, EngineConfig::default())
    }

    fn limit() -> Duration {
        Duration::from_secs(20)
    }

    #[test]
    fn test_optimal_covers_all_blocks() {
        let dir = FixtureDirectory {
            people: vec![
                Person::resident("r1", 1),
                Person::resident("r2", 2),
                Person::faculty("f1"),
                Person::faculty("f2"),
            ],
            absences: vec![],
            templates: vec![RotationTemplate::new("t1", "clinic").with_supervision()],
        };
        let ctx = load_ctx(dir, 3);

        let outcome = CpScheduler::baseline().solve(&ctx, limit());
        assert_eq!(outcome.status, SolveStatus::Optimal);
        assert!(outcome.roster.uncovered.is_empty());
        // Every covered block with a PGY-1 on it has a supervisor.
        assert!(ComplianceValidator::new()
            .validate(&outcome.roster.assignments, &ctx)
            .is_empty());
    }

    #[test]
    fn test_no_hard_violations_in_output() {
        let dir = FixtureDirectory {
            people: vec![
                Person::resident("r1", 1),
                Person::resident("r2", 2),
                Person::resident("r3", 3),
                Person::faculty("f1"),
                Person::faculty("f2"),
            ],
            absences: vec![Absence::new(
                "r2",
                d(2026, 3, 2),
                d(2026, 3, 4),
                AbsenceType::Vacation,
            )],
            templates: vec![
                RotationTemplate::new("t1", "clinic").with_supervision(),
                RotationTemplate::new("t2", "inpatient"),
            ],
        };
        let ctx = load_ctx(dir, 7);

        let outcome = CpScheduler::baseline().solve(&ctx, limit());
        assert!(matches!(
            outcome.status,
            SolveStatus::Optimal | SolveStatus::Feasible
        ));
        let violations = ComplianceValidator::new().validate(&outcome.roster.assignments, &ctx);
        assert!(violations.is_empty(), "unexpected violations: {violations:?}");
    }

    #[test]
    fn test_infeasible_when_absence_meets_mandatory_coverage() {
        // A fully single-resident mandatory rotation where the one
        // resident is absent has no legal coverage pattern. The solver
        // reports infeasibility as a status, not a crash, and probing
        // names the coverage mandate as the explanation (relaxing any
        // duty-hour family leaves the conflict intact).
        let dir = FixtureDirectory {
            people: vec![Person::resident("r1", 2)],
            absences: vec![Absence::new(
                "r1",
                d(2026, 3, 2),
                d(2026, 3, 2),
                AbsenceType::Sick,
            )],
            templates: vec![RotationTemplate::new("t1", "clinic").with_mandatory()],
        };
        let ctx = load_ctx(dir, 3);

        let outcome = CpScheduler::baseline().solve(&ctx, limit());
        match outcome.status {
            SolveStatus::Infeasible { explanation } => {
                assert_eq!(explanation, vec![RuleId::Coverage]);
            }
            other => panic!("expected infeasible, got {other:?}"),
        }
        assert!(outcome.roster.is_empty());
    }

    #[test]
    fn test_infeasible_supervision_conflict_explained() {
        // Mandatory coverage by a PGY-1 with zero faculty: relaxing
        // either the mandate or the ratio restores feasibility.
        let dir = FixtureDirectory {
            people: vec![Person::resident("r1", 1)],
            absences: vec![],
            templates: vec![RotationTemplate::new("t1", "clinic")
                .with_mandatory()
                .with_supervision()],
        };
        let ctx = load_ctx(dir, 1);

        let outcome = CpScheduler::baseline().solve(&ctx, limit());
        match outcome.status {
            SolveStatus::Infeasible { explanation } => {
                assert!(explanation.contains(&RuleId::Coverage));
                assert!(explanation.contains(&RuleId::SupervisionRatio));
            }
            other => panic!("expected infeasible, got {other:?}"),
        }
    }

    #[test]
    fn test_resilience_terms_shift_load_off_hubs() {
        let dir = FixtureDirectory {
            people: vec![
                Person::resident("r1", 2),
                Person::faculty("f_hub"),
                Person::faculty("f_quiet"),
            ],
            absences: vec![],
            templates: vec![RotationTemplate::new("t1", "clinic")
                .with_supervision()],
        };
        let mut ctx = load_ctx(dir, 2);
        ctx.signals = ResilienceSignals {
            hub_scores: Some(HashMap::from([
                ("f_hub".to_string(), 0.9),
                ("f_quiet".to_string(), 0.1),
            ])),
            ..ResilienceSignals::empty()
        };

        let outcome = CpScheduler::resilience_aware().solve(&ctx, limit());
        let hub_load = outcome.roster.count_for_person("f_hub");
        let quiet_load = outcome.roster.count_for_person("f_quiet");
        // All supervision lands on the non-hub.
        assert_eq!(hub_load, 0);
        assert!(quiet_load > 0);
    }

    #[test]
    fn test_preference_trail_steers_assignment() {
        use crate::models::SlotType;
        let dir = FixtureDirectory {
            people: vec![Person::resident("r1", 2), Person::resident("r2", 2)],
            absences: vec![],
            templates: vec![RotationTemplate::new("t1", "clinic")],
        };
        let mut ctx = load_ctx(dir, 1);
        // r2 strongly prefers clinic AM; r1 strongly avoids it.
        ctx.signals = ResilienceSignals {
            preference_trails: Some(HashMap::from([
                (("r2".to_string(), SlotType::new("clinic", DayPart::Am)), 0.9),
                (("r1".to_string(), SlotType::new("clinic", DayPart::Am)), 0.1),
            ])),
            ..ResilienceSignals::empty()
        };

        let outcome = CpScheduler::resilience_aware().solve(&ctx, limit());
        let am_assignees: Vec<_> = outcome
            .roster
            .for_block(0)
            .iter()
            .filter(|a| a.role == RosterRole::Duty)
            .map(|a| a.person_id.clone())
            .collect();
        assert_eq!(am_assignees, vec!["r2".to_string()]);
    }

    #[test]
    fn test_stats_populated() {
        let dir = FixtureDirectory {
            people: vec![Person::resident("r1", 2)],
            absences: vec![],
            templates: vec![RotationTemplate::new("t1", "clinic")],
        };
        let ctx = load_ctx(dir, 2);

        let outcome = CpScheduler::baseline().solve(&ctx, limit());
        assert!(outcome.stats.variables > 0);
        assert!(outcome.stats.hard_constraints > 0);
        assert!(outcome.stats.objective.is_some());
    }
}
