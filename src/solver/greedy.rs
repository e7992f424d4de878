//! Hardest-first greedy scheduler.
//!
//! # Algorithm
//!
//! 1. Sort blocks by ascending count of eligible residents, so the
//!    hardest-to-fill blocks choose first.
//! 2. For each block, fill duty seats with the eligible resident holding
//!    the fewest assignments so far (ties: lowest person id).
//! 3. Fill supervision afterward from the per-block resident tier counts,
//!    picking the least-loaded eligible faculty.
//!
//! Candidates are screened against the duty-hour rules (overnight rest,
//! weekly ceiling, free days) before every pick, so the draft is clean
//! even where it leaves gaps. Blocks with no workable resident are
//! recorded as coverage gaps, not errors.
//!
//! # Complexity
//! O(B log B + B x P) for B blocks and P people.
//!
//! No backtracking: an early assignment can starve a later, more
//! constrained block. That is the accepted trade-off of this path; the
//! optimizing scheduler exists for when the draft is not good enough.

use std::collections::HashSet;

use log::debug;

use crate::constraints::RestDayMinimumConstraint;
use crate::context::SchedulingContext;
use crate::models::{Assignment, Block, DayPart, Roster};

use super::{SolveOutcome, SolveStats, SolveStatus};

/// Per-person accumulation during the greedy sweep.
#[derive(Debug, Default, Clone)]
struct PersonState {
    /// Total assignments so far.
    count: usize,
    /// Occupied (day, part) slots.
    slots: HashSet<(usize, DayPart)>,
    /// Distinct busy days.
    busy_days: HashSet<usize>,
}

impl PersonState {
    fn occupies(&self, day: usize, part: DayPart) -> bool {
        self.slots.contains(&(day, part))
    }

    fn record(&mut self, day: usize, part: DayPart) {
        self.count += 1;
        self.slots.insert((day, part));
        self.busy_days.insert(day);
    }
}

/// Single-threaded deterministic draft scheduler.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyScheduler;

impl GreedyScheduler {
    /// Creates a greedy scheduler.
    pub fn new() -> Self {
        Self
    }

    /// Produces a draft roster.
    pub fn solve(&self, ctx: &SchedulingContext) -> SolveOutcome {
        let start = std::time::Instant::now();
        let mut states: Vec<PersonState> = vec![PersonState::default(); ctx.data.people.len()];
        let mut roster = Roster::new();

        // Hardest-to-fill first; ties by block id for determinism.
        let mut order: Vec<&Block> = ctx.data.blocks.iter().collect();
        order.sort_by_key(|b| (ctx.data.eligible_residents(b).len(), b.id));

        for block in &order {
            let mut filled = 0usize;
            for _seat in 0..block.required_headcount {
                let pick = self.pick_resident(ctx, &states, block);
                match pick {
                    Some(person) => {
                        states[person].record(block.day_index, block.day_part);
                        roster.push(Assignment::duty(ctx.data.person(person).id.clone(), block.id));
                        filled += 1;
                    }
                    None => break,
                }
            }
            if filled == 0 {
                roster.push_uncovered(block.id);
            }
        }

        // Supervision pass over chronological block order.
        for block in &ctx.data.blocks {
            if !block.needs_supervision {
                continue;
            }
            let needed = self.supervisors_needed(ctx, &roster, block);
            for _ in 0..needed {
                match self.pick_faculty(ctx, &states, block) {
                    Some(person) => {
                        states[person].record(block.day_index, block.day_part);
                        roster.push(Assignment::supervision(
                            ctx.data.person(person).id.clone(),
                            block.id,
                        ));
                    }
                    None => break,
                }
            }
        }

        roster.normalize();
        debug!(
            "greedy draft: {} assignments, {} gaps in {:?}",
            roster.len(),
            roster.uncovered.len(),
            start.elapsed(),
        );

        SolveOutcome {
            status: SolveStatus::Feasible,
            roster,
            stats: SolveStats {
                solve_time_ms: start.elapsed().as_millis() as u64,
                variables: 0,
                hard_constraints: 0,
                objective: None,
            },
        }
    }

    /// Least-loaded workable resident for a block, ties by person index
    /// (people are sorted by id, so the lowest id wins).
    fn pick_resident(
        &self,
        ctx: &SchedulingContext,
        states: &[PersonState],
        block: &Block,
    ) -> Option<usize> {
        ctx.data
            .eligible_residents(block)
            .into_iter()
            .filter(|&p| self.fits_rules(ctx, &states[p], block))
            .min_by_key(|&p| (states[p].count, p))
    }

    /// Least-loaded workable faculty member for a block.
    fn pick_faculty(
        &self,
        ctx: &SchedulingContext,
        states: &[PersonState],
        block: &Block,
    ) -> Option<usize> {
        ctx.data
            .eligible_faculty(block)
            .into_iter()
            .filter(|&p| self.fits_rules(ctx, &states[p], block))
            .min_by_key(|&p| (states[p].count, p))
    }

    /// Supervisors required by the resident tiers already on the block:
    /// one per two PGY-1s and one per four seniors, whichever is larger.
    fn supervisors_needed(
        &self,
        ctx: &SchedulingContext,
        roster: &Roster,
        block: &Block,
    ) -> usize {
        let mut pgy1 = 0usize;
        let mut seniors = 0usize;
        for a in roster.for_block(block.id) {
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
        (pgy1.div_ceil(2)).max(seniors.div_ceil(4))
    }

    /// Whether assigning the block keeps the person inside every
    /// duty-hour rule.
    fn fits_rules(&self, ctx: &SchedulingContext, state: &PersonState, block: &Block) -> bool {
        let day = block.day_index;

        // One body per half-day.
        if state.occupies(day, block.day_part) {
            return false;
        }

        // Overnight rest in both directions.
        match block.day_part {
            DayPart::Am => {
                if day > 0 && state.occupies(day - 1, DayPart::Pm) {
                    return false;
                }
            }
            DayPart::Pm => {
                if state.occupies(day + 1, DayPart::Am) {
                    return false;
                }
            }
        }

        // Weekly hour ceiling over every 7-day window containing the day.
        let max_blocks = ctx.config.max_blocks_per_week();
        for start in day.saturating_sub(6)..=day {
            let end = start + 6;
            let in_window = state
                .slots
                .iter()
                .filter(|(d, _)| *d >= start && *d <= end)
                .count();
            if in_window + 1 > max_blocks {
                return false;
            }
        }

        // Free-day minimum over every rest window containing the day.
        if !state.busy_days.contains(&day) {
            for (start, end) in ctx.rolling_windows(ctx.config.rest_window_days) {
                if day < start || day > end {
                    continue;
                }
                let len = end - start + 1;
                let required_free = RestDayMinimumConstraint::required_free(ctx, len);
                let busy = state
                    .busy_days
                    .iter()
                    .filter(|&&d| d >= start && d <= end)
                    .count();
                if busy + 1 > len - required_free {
                    return false;
                }
            }
        }

        true
    }
}
