//! Regulatory hard constraints.
//!
//! The duty-hour rules every accepted roster must satisfy: availability,
//! the 80-hour ceiling over any rolling 7-day window, overnight rest
//! (no AM after the previous PM), the free-day minimum over any rolling
//! 28-day window, and the faculty supervision ratios.
//!
//! # Window Accounting
//! Rolling windows are any N consecutive calendar days, both endpoints
//! inclusive. A horizon shorter than N is governed by one clipped window
//! with the free-day requirement pro-rated. This is stricter near
//! boundaries than calendar-week accounting: a compliant pair of
//! calendar weeks cannot hide an eight-day burst.
//!
//! # Reference
//! ACGME Common Program Requirements (Residency), Section VI:
//! clinical experience and education limits, supervision ratios.

use good_lp::{constraint, Expression, Variable};
use itertools::Itertools;

use crate::context::SchedulingContext;
use crate::models::{Assignment, BlockId, DayPart, RuleId, Violation};
use crate::solver::model::AssignmentModel;

use super::SchedulingConstraint;

/// Pins assignment variables to zero wherever the availability matrix
/// says the person is out.
#[derive(Debug, Clone, Copy)]
pub struct AvailabilityConstraint;

impl SchedulingConstraint for AvailabilityConstraint {
    fn id(&self) -> RuleId {
        RuleId::Availability
    }

    fn is_hard(&self) -> bool {
        true
    }

    fn apply(&self, model: &mut AssignmentModel, ctx: &SchedulingContext) {
        let pinned: Vec<Variable> = model
            .duty_entries()
            .chain(model.supervision_entries())
            .filter(|((p, b), _)| !ctx.data.availability.is_available(*p, *b))
            .map(|(_, v)| *v)
            .collect();
        for v in pinned {
            model.add_hard(constraint!(v <= 0));
        }
    }

    fn check(&self, assignments: &[Assignment], ctx: &SchedulingContext) -> Vec<Violation> {
        let mut violations = Vec::new();
        for a in assignments {
            match ctx.data.person_index(&a.person_id) {
                None => violations.push(
                    Violation::hard(
                        RuleId::Availability,
                        a.person_id.clone(),
                        format!("assignment references unknown person '{}'", a.person_id),
                    )
                    .with_block(a.block_id)
                    .with_severity(100),
                ),
                Some(p) if !ctx.data.availability.is_available(p, a.block_id) => violations.push(
                    Violation::hard(
                        RuleId::Availability,
                        a.person_id.clone(),
                        format!("'{}' is unavailable for block {}", a.person_id, a.block_id),
                    )
                    .with_block(a.block_id)
                    .with_severity(100),
                ),
                Some(_) => {}
            }
        }
        violations
    }
}

/// Caps assigned hours per person at the weekly ceiling over every
/// rolling 7-day window.
#[derive(Debug, Clone, Copy)]
pub struct DutyHourCeilingConstraint;

impl SchedulingConstraint for DutyHourCeilingConstraint {
    fn id(&self) -> RuleId {
        RuleId::DutyHourCeiling
    }

    fn is_hard(&self) -> bool {
        true
    }

    fn apply(&self, model: &mut AssignmentModel, ctx: &SchedulingContext) {
        let hours = ctx.config.hours_per_block;
        let ceiling = ctx.config.weekly_hour_ceiling;
        let windows = ctx.rolling_windows(7);

        for person in 0..ctx.data.people.len() {
            let person_vars = model.vars_for_person(person);
            if person_vars.is_empty() {
                continue;
            }
            for &(start, end) in &windows {
                let in_window: Expression = person_vars
                    .iter()
                    .filter(|(b, _)| {
                        let day = ctx.data.blocks[*b].day_index;
                        day >= start && day <= end
                    })
                    .map(|(_, v)| *v)
                    .sum();
                model.add_hard(constraint!(hours * in_window <= ceiling));
            }
        }
    }

    fn check(&self, assignments: &[Assignment], ctx: &SchedulingContext) -> Vec<Violation> {
        let hours = ctx.config.hours_per_block;
        let ceiling = ctx.config.weekly_hour_ceiling;
        let mut violations = Vec::new();

        for (person_id, days) in assignment_days(assignments, ctx) {
            for (start, end) in ctx.rolling_windows(7) {
                let blocks_in_window = days
                    .iter()
                    .filter(|&&day| day >= start && day <= end)
                    .count();
                let total = blocks_in_window as f64 * hours;
                if total > ceiling {
                    violations.push(Violation::hard(
                        RuleId::DutyHourCeiling,
                        person_id.clone(),
                        format!(
                            "'{person_id}' assigned {total:.0}h in days {start}..={end}, ceiling {ceiling:.0}h"
                        ),
                    ));
                }
            }
        }
        violations
    }
}

/// Forbids an AM assignment on the day after a PM assignment.
#[derive(Debug, Clone, Copy)]
pub struct MandatoryRestConstraint;

impl SchedulingConstraint for MandatoryRestConstraint {
    fn id(&self) -> RuleId {
        RuleId::MandatoryRest
    }

    fn is_hard(&self) -> bool {
        true
    }

    fn apply(&self, model: &mut AssignmentModel, ctx: &SchedulingContext) {
        for person in 0..ctx.data.people.len() {
            let person_vars = model.vars_for_person(person);
            if person_vars.is_empty() {
                continue;
            }
            for (day, next_day) in (0..ctx.data.horizon_days()).tuple_windows() {
                let pm_today: Vec<Variable> = half_day_vars(&person_vars, ctx, day, DayPart::Pm);
                let am_next: Vec<Variable> = half_day_vars(&person_vars, ctx, next_day, DayPart::Am);
                for &pm in &pm_today {
                    for &am in &am_next {
                        model.add_hard(constraint!(pm + am <= 1));
                    }
                }
            }
        }
    }

    fn check(&self, assignments: &[Assignment], ctx: &SchedulingContext) -> Vec<Violation> {
        let mut violations = Vec::new();
        for (person_id, parts) in assignment_parts(assignments, ctx) {
            for &(day, part) in &parts {
                if part == DayPart::Pm && parts.iter().any(|&(d, p)| d == day + 1 && p == DayPart::Am)
                {
                    violations.push(
                        Violation::hard(
                            RuleId::MandatoryRest,
                            person_id.clone(),
                            format!(
                                "'{person_id}' works PM of day {day} and AM of day {}",
                                day + 1
                            ),
                        )
                        .with_severity(90),
                    );
                }
            }
        }
        violations
    }
}

/// Requires assignment-free days within every rolling 28-day window.
#[derive(Debug, Clone, Copy)]
pub struct RestDayMinimumConstraint;

impl RestDayMinimumConstraint {
    /// Free days required for a window of the given length. Clipped
    /// windows are pro-rated; horizons under seven days carry no
    /// requirement, since even one-in-seven does not bind there yet.
    pub(crate) fn required_free(ctx: &SchedulingContext, window_len: usize) -> usize {
        let full = ctx.config.rest_window_days;
        let min_free = ctx.config.min_free_days;
        if window_len >= full {
            min_free
        } else if window_len >= 7 {
            (window_len * min_free / full).max(1)
        } else {
            0
        }
    }
}

impl SchedulingConstraint for RestDayMinimumConstraint {
    fn id(&self) -> RuleId {
        RuleId::RestDayMinimum
    }

    fn is_hard(&self) -> bool {
        true
    }

    fn apply(&self, model: &mut AssignmentModel, ctx: &SchedulingContext) {
        let windows = ctx.rolling_windows(ctx.config.rest_window_days);
        for person in 0..ctx.data.people.len() {
            if model.vars_for_person(person).is_empty() {
                continue;
            }
            for &(start, end) in &windows {
                let len = end - start + 1;
                let required = Self::required_free(ctx, len);
                if required == 0 {
                    continue;
                }
                let max_busy = (len - required) as f64;
                let indicators: Vec<Variable> = (start..=end)
                    .filter_map(|day| model.busy_day_var(ctx, person, day))
                    .collect();
                if indicators.is_empty() {
                    continue;
                }
                let busy: Expression = indicators.into_iter().sum();
                model.add_hard(constraint!(busy <= max_busy));
            }
        }
    }

    fn check(&self, assignments: &[Assignment], ctx: &SchedulingContext) -> Vec<Violation> {
        let mut violations = Vec::new();
        for (person_id, days) in assignment_days(assignments, ctx) {
            let distinct: Vec<usize> = days.iter().copied().unique().collect();
            for (start, end) in ctx.rolling_windows(ctx.config.rest_window_days) {
                let len = end - start + 1;
                let busy = distinct
                    .iter()
                    .filter(|&&day| day >= start && day <= end)
                    .count();
                let required = Self::required_free(ctx, len);
                if len - busy.min(len) < required {
                    violations.push(
                        Violation::hard(
                            RuleId::RestDayMinimum,
                            person_id.clone(),
                            format!(
                                "'{person_id}' has {} free days in days {start}..={end}, needs {required}",
                                len - busy.min(len)
                            ),
                        )
                        .with_severity(88),
                    );
                }
            }
        }
        violations
    }
}

/// Enforces faculty supervision ratios per block: one supervisor covers
/// at most two PGY-1 residents and at most four senior residents.
#[derive(Debug, Clone, Copy)]
pub struct SupervisionRatioConstraint;

impl SchedulingConstraint for SupervisionRatioConstraint {
    fn id(&self) -> RuleId {
        RuleId::SupervisionRatio
    }

    fn is_hard(&self) -> bool {
        true
    }

    fn apply(&self, model: &mut AssignmentModel, ctx: &SchedulingContext) {
        for block in &ctx.data.blocks {
            if !block.needs_supervision {
                continue;
            }
            let supervisors: Expression = model.supervision_for_block(block.id).into_iter().sum();
            let (pgy1_vars, senior_vars) = tiered_duty_vars(model, ctx, block.id);
            let pgy1: Expression = pgy1_vars.into_iter().sum();
            let seniors: Expression = senior_vars.into_iter().sum();
            model.add_hard(constraint!(2.0 * supervisors.clone() >= pgy1));
            model.add_hard(constraint!(4.0 * supervisors >= seniors));
        }
    }

    fn check(&self, assignments: &[Assignment], ctx: &SchedulingContext) -> Vec<Violation> {
        use crate::models::RosterRole;

        let mut violations = Vec::new();
        let by_block = assignments
            .iter()
            .filter(|a| ctx.data.blocks.get(a.block_id).is_some())
            .map(|a| (a.block_id, a))
            .into_group_map();

        for (block_id, members) in by_block.into_iter().sorted_by_key(|(b, _)| *b) {
            let block = &ctx.data.blocks[block_id];
            if !block.needs_supervision {
                continue;
            }
            let faculty = members
                .iter()
                .filter(|a| a.role == RosterRole::Supervision)
                .count();
            let mut pgy1 = 0usize;
            let mut seniors = 0usize;
            for a in &members {
                if a.role != RosterRole::Duty {
                    continue;
                }
                match ctx
                    .data
                    .person_index(&a.person_id)
                    .and_then(|p| ctx.data.person(p).pgy())
                {
                    Some(1) => pgy1 += 1,
                    Some(_) => seniors += 1,
                    None => {}
                }
            }
            if 2 * faculty < pgy1 || 4 * faculty < seniors {
                violations.push(Violation::for_block(
                    RuleId::SupervisionRatio,
                    block_id,
                    format!(
                        "block {block_id} has {faculty} supervisor(s) for {pgy1} PGY-1 and {seniors} senior resident(s)"
                    ),
                ));
            }
        }
        violations
    }
}

/// Duty variables of a block split into (PGY-1, senior) tiers.
fn tiered_duty_vars(
    model: &AssignmentModel,
    ctx: &SchedulingContext,
    block: BlockId,
) -> (Vec<Variable>, Vec<Variable>) {
    let mut pgy1 = Vec::new();
    let mut seniors = Vec::new();
    for (&(p, b), &v) in model.duty_entries() {
        if b != block {
            continue;
        }
        match ctx.data.person(p).pgy() {
            Some(1) => pgy1.push(v),
            Some(_) => seniors.push(v),
            None => {}
        }
    }
    (pgy1, seniors)
}

/// A person's variables on one half-day.
fn half_day_vars(
    person_vars: &[(BlockId, Variable)],
    ctx: &SchedulingContext,
    day: usize,
    part: DayPart,
) -> Vec<Variable> {
    person_vars
        .iter()
        .filter(|(b, _)| {
            let block = &ctx.data.blocks[*b];
            block.day_index == day && block.day_part == part
        })
        .map(|(_, v)| *v)
        .collect()
}

/// Day indices of each person's assignments (known people and blocks only).
fn assignment_days<'a>(
    assignments: &'a [Assignment],
    ctx: &SchedulingContext,
) -> Vec<(&'a str, Vec<usize>)> {
    assignments
        .iter()
        .filter_map(|a| {
            let block = ctx.data.blocks.get(a.block_id)?;
            ctx.data.person_index(&a.person_id)?;
            Some((a.person_id.as_str(), block.day_index))
        })
        .into_group_map()
        .into_iter()
        .sorted_by_key(|(id, _)| *id)
        .collect()
}

/// (day, part) pairs of each person's assignments.
fn assignment_parts<'a>(
    assignments: &'a [Assignment],
    ctx: &SchedulingContext,
) -> Vec<(&'a str, Vec<(usize, DayPart)>)> {
    assignments
        .iter()
        .filter_map(|a| {
            let block = ctx.data.blocks.get(a.block_id)?;
            ctx.data.person_index(&a.person_id)?;
            Some((a.person_id.as_str(), (block.day_index, block.day_part)))
        })
        .into_group_map()
        .into_iter()
        .sorted_by_key(|(id, _)| *id)
        .collect()
}
