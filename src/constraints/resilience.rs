//! Resilience-aware soft constraints.
//!
//! Strictly additive objective terms: none of these can make a feasible
//! problem infeasible, and each degrades to a no-op when the signal it
//! needs is absent. The exact penalty formulas live in the `penalty`
//! functions and are shared by audits and the resilience summary; the
//! MILP objective uses linearized counterparts of the quadratic ones.
//!
//! The rationales, briefly: scale-free dependency graphs fail hardest
//! when high-degree nodes are removed (hub protection); queueing delay
//! grows like rho/(1-rho), so cost must grow super-linearly toward full
//! utilization (buffering); local failures should stay local (zone
//! boundaries); and no block should collapse from losing exactly one
//! more person (N-1 contingency).
//!
//! # References
//! - Albert, Jeong, Barabási (2000), "Error and attack tolerance of
//!   complex networks"
//! - NERC TPL-001, N-1 contingency planning standard
//! - Kleinrock (1975), "Queueing Systems", Vol. 1

use good_lp::{constraint, Expression};
use itertools::Itertools;

use crate::context::SchedulingContext;
use crate::models::{Assignment, HubClass, RosterRole, RuleId, Violation};
use crate::solver::model::AssignmentModel;

use super::SchedulingConstraint;

/// Penalizes concentrating load on high-centrality people.
#[derive(Debug, Clone, Copy)]
pub struct HubProtectionConstraint;

impl HubProtectionConstraint {
    /// Penalty for one person: `count x hub_score x multiplier`, where the
    /// multiplier is 2.0 for critical hubs (score >= 0.6), 1.0 for
    /// significant hubs (score >= 0.4), and 0 otherwise.
    pub fn penalty(assignment_count: usize, hub_score: f64) -> f64 {
        assignment_count as f64 * hub_score * HubClass::of(hub_score).multiplier()
    }
}

impl SchedulingConstraint for HubProtectionConstraint {
    fn id(&self) -> RuleId {
        RuleId::HubProtection
    }

    fn apply(&self, model: &mut AssignmentModel, ctx: &SchedulingContext) {
        let Some(scores) = ctx.signals.hub_scores.as_ref() else {
            return; // no centrality data, nothing to protect
        };
        let weight = ctx.config.weights.hub_protection;

        for (person, p) in ctx.data.people.iter().enumerate() {
            let Some(&score) = scores.get(&p.id) else {
                continue;
            };
            let rate = score * HubClass::of(score).multiplier();
            if rate == 0.0 {
                continue;
            }
            let load: Expression = model
                .vars_for_person(person)
                .into_iter()
                .map(|(_, v)| v)
                .sum();
            model.add_objective(-(weight * rate) * load);
        }
    }

    fn check(&self, assignments: &[Assignment], ctx: &SchedulingContext) -> Vec<Violation> {
        let Some(scores) = ctx.signals.hub_scores.as_ref() else {
            return Vec::new();
        };
        let counts = assignments.iter().map(|a| a.person_id.as_str()).counts();

        scores
            .iter()
            .sorted_by_key(|(id, _)| id.as_str())
            .filter_map(|(id, &score)| {
                let count = counts.get(id.as_str()).copied().unwrap_or(0);
                let penalty = Self::penalty(count, score);
                (penalty > 0.0).then(|| {
                    Violation::advisory(
                        RuleId::HubProtection,
                        format!(
                            "hub '{id}' (score {score:.2}) carries {count} assignments, penalty {penalty:.1}"
                        ),
                    )
                    .with_person(id.clone())
                })
            })
            .collect()
    }
}

/// Penalizes scheduling the system past its target utilization.
#[derive(Debug, Clone, Copy)]
pub struct UtilizationBufferConstraint;

impl UtilizationBufferConstraint {
    /// Penalty `(utilization - target)^2 x 100` above target, else 0.
    pub fn penalty(utilization: f64, target: f64) -> f64 {
        if utilization > target {
            let over = utilization - target;
            over * over * 100.0
        } else {
            0.0
        }
    }
}

impl SchedulingConstraint for UtilizationBufferConstraint {
    fn id(&self) -> RuleId {
        RuleId::UtilizationBuffer
    }

    fn apply(&self, model: &mut AssignmentModel, ctx: &SchedulingContext) {
        let capacity = ctx.capacity_hours();
        if capacity <= 0.0 {
            return;
        }
        let weight = ctx.config.weights.utilization_buffer;
        let target = ctx.config.target_utilization;
        let per_var = ctx.config.hours_per_block / capacity;

        let scheduled: Expression = model
            .duty_entries()
            .chain(model.supervision_entries())
            .map(|(_, v)| *v)
            .sum();

        // Two-segment piecewise-linear overflow. Chord slopes of the
        // quadratic: 10 per unit on (0, 0.1], 30 per unit beyond, so the
        // solver fills the cheap segment first and the marginal cost of
        // thinning the buffer still rises super-linearly.
        let over_near = model.add_nonneg_bounded(0.10);
        let over_far = model.add_nonneg();
        model.add_hard(constraint!(
            per_var * scheduled - target <= over_near + over_far
        ));
        model.add_objective(-weight * (10.0 * over_near + 30.0 * over_far));
    }

    fn check(&self, assignments: &[Assignment], ctx: &SchedulingContext) -> Vec<Violation> {
        let capacity = ctx.capacity_hours();
        if capacity <= 0.0 {
            return Vec::new();
        }
        let utilization = assignments.len() as f64 * ctx.config.hours_per_block / capacity;
        let penalty = Self::penalty(utilization, ctx.config.target_utilization);
        if penalty > 0.0 {
            vec![Violation::advisory(
                RuleId::UtilizationBuffer,
                format!(
                    "utilization {utilization:.2} exceeds target {:.2}, penalty {penalty:.2}",
                    ctx.config.target_utilization
                ),
            )]
        } else {
            Vec::new()
        }
    }
}

/// Penalizes assignments that cross zone boundaries, harder into
/// critical zones.
#[derive(Debug, Clone, Copy)]
pub struct ZoneBoundaryConstraint;

impl ZoneBoundaryConstraint {
    /// Rate multiplier for borrowing into a zone.
    fn rate(critical: bool) -> f64 {
        if critical {
            2.0
        } else {
            1.0
        }
    }
}

impl SchedulingConstraint for ZoneBoundaryConstraint {
    fn id(&self) -> RuleId {
        RuleId::ZoneBoundary
    }

    fn apply(&self, model: &mut AssignmentModel, ctx: &SchedulingContext) {
        if ctx.signals.home_zones.is_none() || ctx.zones.is_empty() {
            return;
        }
        let weight = ctx.config.weights.zone_boundary;

        let mut terms: Vec<(f64, good_lp::Variable)> = Vec::new();
        for (&(person, block_id), &var) in model.duty_entries().chain(model.supervision_entries()) {
            let block = &ctx.data.blocks[block_id];
            let Some(block_zone) = ctx.zone_of_block(block) else {
                continue;
            };
            let Some(home) = ctx.signals.home_zone(&ctx.data.person(person).id) else {
                continue;
            };
            if home != block_zone.name {
                terms.push((Self::rate(block_zone.critical), var));
            }
        }
        for (rate, var) in terms {
            model.add_objective(-(weight * rate) * var);
        }
    }

    fn check(&self, assignments: &[Assignment], ctx: &SchedulingContext) -> Vec<Violation> {
        if ctx.signals.home_zones.is_none() || ctx.zones.is_empty() {
            return Vec::new();
        }
        assignments
            .iter()
            .filter_map(|a| {
                let block = ctx.data.blocks.get(a.block_id)?;
                let block_zone = ctx.zone_of_block(block)?;
                let home = ctx.signals.home_zone(&a.person_id)?;
                (home != block_zone.name).then(|| {
                    Violation::advisory(
                        RuleId::ZoneBoundary,
                        format!(
                            "'{}' borrowed from zone '{home}' into '{}'",
                            a.person_id, block_zone.name
                        ),
                    )
                    .with_person(a.person_id.clone())
                    .with_block(a.block_id)
                    .with_severity(if block_zone.critical { 45 } else { 30 })
                })
            })
            .collect()
    }
}

/// Applies learned preference and avoidance signals.
#[derive(Debug, Clone, Copy)]
pub struct PreferenceTrailConstraint;

impl PreferenceTrailConstraint {
    /// Signed objective contribution of a trail strength: `(s - 0.5) x 20`
    /// outside the (0.4, 0.6) noise band, 0 inside it.
    pub fn signal(strength: f64) -> f64 {
        if strength >= 0.6 || strength <= 0.4 {
            (strength - 0.5) * 20.0
        } else {
            0.0
        }
    }
}

impl SchedulingConstraint for PreferenceTrailConstraint {
    fn id(&self) -> RuleId {
        RuleId::PreferenceTrail
    }

    fn apply(&self, model: &mut AssignmentModel, ctx: &SchedulingContext) {
        if ctx.signals.preference_trails.is_none() {
            return;
        }
        let weight = ctx.config.weights.preference_trail;

        let mut terms: Vec<(f64, good_lp::Variable)> = Vec::new();
        for (&(person, block_id), &var) in model.duty_entries() {
            let block = &ctx.data.blocks[block_id];
            let person_id = &ctx.data.person(person).id;
            let Some(strength) = ctx.signals.trail(person_id, &block.slot_type()) else {
                continue;
            };
            let signal = Self::signal(strength);
            if signal != 0.0 {
                terms.push((signal, var));
            }
        }
        for (signal, var) in terms {
            model.add_objective((weight * signal) * var);
        }
    }

    fn check(&self, assignments: &[Assignment], ctx: &SchedulingContext) -> Vec<Violation> {
        if ctx.signals.preference_trails.is_none() {
            return Vec::new();
        }
        assignments
            .iter()
            .filter(|a| a.role == RosterRole::Duty)
            .filter_map(|a| {
                let block = ctx.data.blocks.get(a.block_id)?;
                let strength = ctx.signals.trail(&a.person_id, &block.slot_type())?;
                (strength <= 0.4).then(|| {
                    Violation::advisory(
                        RuleId::PreferenceTrail,
                        format!(
                            "'{}' assigned against learned avoidance ({strength:.2}) of {} {:?}",
                            a.person_id, block.activity, block.day_part
                        ),
                    )
                    .with_person(a.person_id.clone())
                    .with_block(a.block_id)
                })
            })
            .collect()
    }
}

/// Penalizes blocks whose coverage would collapse from one more loss.
#[derive(Debug, Clone, Copy)]
pub struct N1VulnerabilityConstraint;

impl N1VulnerabilityConstraint {
    /// Shortfall tiers: 0 alternates scores 3, 1 scores 2, 2 scores 1,
    /// three or more score 0. One linear slope reproduces the required
    /// ratios (one alternate penalized at twice the two-alternate rate).
    pub fn shortfall(alternates: usize) -> f64 {
        (3.0 - alternates as f64).max(0.0)
    }
}

impl SchedulingConstraint for N1VulnerabilityConstraint {
    fn id(&self) -> RuleId {
        RuleId::N1Vulnerability
    }

    fn apply(&self, model: &mut AssignmentModel, ctx: &SchedulingContext) {
        let weight = ctx.config.weights.n1_vulnerability;
        for block in &ctx.data.blocks {
            let eligible = ctx.data.eligible_residents(block).len() as f64;
            let assigned: Expression = model.duty_for_block(block.id).into_iter().sum();
            let shortfall = model.add_nonneg();
            // alternates = eligible - assigned; shortfall >= 3 - alternates.
            model.add_hard(constraint!(shortfall >= assigned + (3.0 - eligible)));
            model.add_objective(-weight * shortfall);
        }
    }

    fn check(&self, assignments: &[Assignment], ctx: &SchedulingContext) -> Vec<Violation> {
        let mut assigned = vec![0usize; ctx.data.blocks.len()];
        for a in assignments {
            if a.role == RosterRole::Duty {
                if let Some(slot) = assigned.get_mut(a.block_id) {
                    *slot += 1;
                }
            }
        }

        ctx.data
            .blocks
            .iter()
            .filter(|b| assigned[b.id] > 0)
            .filter_map(|b| {
                let eligible = ctx.data.eligible_residents(b).len();
                let alternates = eligible.saturating_sub(assigned[b.id]);
                (alternates < 3).then(|| {
                    Violation::advisory(
                        RuleId::N1Vulnerability,
                        format!(
                            "block {} has {alternates} alternate(s) beyond its {} assignee(s)",
                            b.id, assigned[b.id]
                        ),
                    )
                    .with_block(b.id)
                    .with_severity(if alternates == 0 { 50 } else { 30 })
                })
            })
            .collect()
    }
}
