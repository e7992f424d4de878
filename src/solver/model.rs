//! MILP decision-variable model for roster generation.
//!
//! Holds the Boolean decision variables (duty per resident-block,
//! supervision per faculty-block), the accumulated hard constraints, and
//! the weighted soft objective. Constraints mutate this model through
//! `apply`; the CP scheduler then assembles and solves it.
//!
//! Variable maps are ordered (`BTreeMap`) so model assembly is
//! deterministic for a fixed input, which together with a fixed solver
//! seed makes whole runs reproducible.

use std::collections::BTreeMap;

use good_lp::{constraint, variable, Constraint, Expression, ProblemVariables, Variable};
use log::trace;

use crate::context::SchedulingContext;
use crate::models::BlockId;

/// Decision variables and model parts under construction.
pub struct AssignmentModel {
    vars: ProblemVariables,
    duty: BTreeMap<(usize, BlockId), Variable>,
    supervision: BTreeMap<(usize, BlockId), Variable>,
    busy_day: BTreeMap<(usize, usize), Variable>,
    hard: Vec<Constraint>,
    objective: Expression,
    aux_count: usize,
}

/// The finished parts handed to the solver backend.
pub struct ModelParts {
    pub vars: ProblemVariables,
    pub hard: Vec<Constraint>,
    pub objective: Expression,
    pub duty: BTreeMap<(usize, BlockId), Variable>,
    pub supervision: BTreeMap<(usize, BlockId), Variable>,
}

impl AssignmentModel {
    /// Builds the variable skeleton for a context.
    ///
    /// Duty variables exist for every (resident, block) pair where the
    /// resident is credentialed for the block; supervision variables for
    /// every (faculty, block) pair on supervised blocks. Availability is
    /// not filtered here: the availability constraint pins unavailable
    /// cells to zero so that the rule stays visible in the model.
    pub fn build(ctx: &SchedulingContext) -> Self {
        let mut vars = ProblemVariables::new();
        let mut duty = BTreeMap::new();
        let mut supervision = BTreeMap::new();
        let residents = ctx.data.resident_indices();
        let faculty = ctx.data.faculty_indices();

        for block in &ctx.data.blocks {
            for &p in &residents {
                if ctx.data.is_credentialed(p, block) {
                    duty.insert((p, block.id), vars.add(variable().binary()));
                }
            }
            if block.needs_supervision {
                for &f in &faculty {
                    supervision.insert((f, block.id), vars.add(variable().binary()));
                }
            }
        }

        trace!(
            "model skeleton: {} duty vars, {} supervision vars",
            duty.len(),
            supervision.len(),
        );

        Self {
            vars,
            duty,
            supervision,
            busy_day: BTreeMap::new(),
            hard: Vec::new(),
            objective: Expression::default(),
            aux_count: 0,
        }
    }

    /// Duty variable for a (resident, block) pair, if it exists.
    pub fn duty_var(&self, person: usize, block: BlockId) -> Option<Variable> {
        self.duty.get(&(person, block)).copied()
    }

    /// Supervision variable for a (faculty, block) pair, if it exists.
    pub fn supervision_var(&self, person: usize, block: BlockId) -> Option<Variable> {
        self.supervision.get(&(person, block)).copied()
    }

    /// All duty entries as ((person, block), var).
    pub fn duty_entries(&self) -> impl Iterator<Item = (&(usize, BlockId), &Variable)> {
        self.duty.iter()
    }

    /// All supervision entries as ((person, block), var).
    pub fn supervision_entries(&self) -> impl Iterator<Item = (&(usize, BlockId), &Variable)> {
        self.supervision.iter()
    }

    /// Duty variables on one block.
    pub fn duty_for_block(&self, block: BlockId) -> Vec<Variable> {
        self.duty
            .iter()
            .filter(|((_, b), _)| *b == block)
            .map(|(_, v)| *v)
            .collect()
    }

    /// Supervision variables on one block.
    pub fn supervision_for_block(&self, block: BlockId) -> Vec<Variable> {
        self.supervision
            .iter()
            .filter(|((_, b), _)| *b == block)
            .map(|(_, v)| *v)
            .collect()
    }

    /// Duty variables of one person as (block, var).
    pub fn duty_for_person(&self, person: usize) -> Vec<(BlockId, Variable)> {
        self.duty
            .range((person, 0)..(person + 1, 0))
            .map(|((_, b), v)| (*b, *v))
            .collect()
    }

    /// Every variable of one person, duty and supervision, as (block, var).
    pub fn vars_for_person(&self, person: usize) -> Vec<(BlockId, Variable)> {
        let mut out: Vec<(BlockId, Variable)> = self
            .duty
            .range((person, 0)..(person + 1, 0))
            .chain(self.supervision.range((person, 0)..(person + 1, 0)))
            .map(|((_, b), v)| (*b, *v))
            .collect();
        out.sort_by_key(|(b, _)| *b);
        out
    }

    /// Adds a hard constraint.
    pub fn add_hard(&mut self, constraint: Constraint) {
        self.hard.push(constraint);
    }

    /// Adds a term to the (maximized) objective.
    pub fn add_objective(&mut self, term: Expression) {
        self.objective += term;
    }

    /// Adds a fresh auxiliary binary variable.
    pub fn add_binary(&mut self) -> Variable {
        self.aux_count += 1;
        self.vars.add(variable().binary())
    }

    /// Adds a fresh non-negative continuous variable.
    pub fn add_nonneg(&mut self) -> Variable {
        self.aux_count += 1;
        self.vars.add(variable().min(0.0))
    }

    /// Adds a fresh continuous variable bounded to `[0, max]`.
    pub fn add_nonneg_bounded(&mut self, max: f64) -> Variable {
        self.aux_count += 1;
        self.vars.add(variable().min(0.0).max(max))
    }

    /// Busy-day indicator for a person and day, created on first use.
    ///
    /// Linked from below: every assignment variable of the person on that
    /// day forces the indicator to one. Returns `None` when the person has
    /// no variables on the day (structurally never busy).
    pub fn busy_day_var(
        &mut self,
        ctx: &SchedulingContext,
        person: usize,
        day: usize,
    ) -> Option<Variable> {
        if let Some(v) = self.busy_day.get(&(person, day)) {
            return Some(*v);
        }

        let day_blocks = &ctx.data.blocks_by_day()[day];
        let person_vars: Vec<Variable> = day_blocks
            .iter()
            .filter_map(|&b| {
                self.duty
                    .get(&(person, b))
                    .or_else(|| self.supervision.get(&(person, b)))
                    .copied()
            })
            .collect();
        if person_vars.is_empty() {
            return None;
        }

        let indicator = self.add_binary();
        for v in person_vars {
            self.hard.push(constraint!(v <= indicator));
        }
        self.busy_day.insert((person, day), indicator);
        Some(indicator)
    }

    /// Number of decision variables, auxiliaries included.
    pub fn num_vars(&self) -> usize {
        self.duty.len() + self.supervision.len() + self.aux_count
    }

    /// Number of hard constraints accumulated so far.
    pub fn num_hard(&self) -> usize {
        self.hard.len()
    }

    /// Finishes construction and releases the parts for solving.
    pub fn finish(self) -> ModelParts {
        ModelParts {
            vars: self.vars,
            hard: self.hard,
            objective: self.objective,
            duty: self.duty,
            supervision: self.supervision,
        }
    }
}
