//! Roster generation entry points.
//!
//! Two solving strategies share one contract: the greedy path produces a
//! fast draft, the MILP path optimizes under a time budget. `RosterEngine`
//! wires them to the external collaborators and wraps every run's output
//! in a `GenerationResult` with compliance violations and a resilience
//! summary.
//!
//! Solver outcomes are data, never panics: "no perfect schedule exists"
//! is an expected, actionable result. Only data loading returns a hard
//! error.

pub mod cp;
pub mod greedy;
pub mod model;

pub use cp::CpScheduler;
pub use greedy::GreedyScheduler;

use std::collections::HashSet;
use std::time::Duration;

use log::info;
use serde::{Deserialize, Serialize};

use crate::constraints::ConstraintSet;
use crate::context::{EngineConfig, SchedulingContext};
use crate::loader::{DataLoadError, ScheduleData, ScheduleDirectory};
use crate::models::{
    DateRange, HubClass, PersonId, ResilienceProvider, ResilienceSignals, Roster, RosterRole,
    RuleId, SchedulingZone, Violation, ZoneStatus,
};
use crate::validation::ComplianceValidator;

/// Which solving strategy to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Algorithm {
    /// Fast heuristic draft.
    Greedy,
    /// MILP optimization under a time budget.
    ConstraintProgramming,
}

/// Termination state of a solve, in order of preference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStatus {
    /// Proven best solution.
    Optimal,
    /// Valid solution, optimality unproven (time-limited).
    Feasible,
    /// Hard constraints jointly unsatisfiable. The explanation lists the
    /// rule families whose individual removal restores feasibility; empty
    /// when no single family explains it.
    Infeasible { explanation: Vec<RuleId> },
    /// No usable solution within the budget. Not an error.
    Aborted { reason: String },
}

/// Diagnostic counters from one solve.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SolveStats {
    pub solve_time_ms: u64,
    pub variables: usize,
    pub hard_constraints: usize,
    pub objective: Option<f64>,
}

/// A solver's raw result before validation and summarizing.
#[derive(Debug, Clone)]
pub struct SolveOutcome {
    pub status: SolveStatus,
    pub roster: Roster,
    pub stats: SolveStats,
}

/// Parameters of one generation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Strategy to run.
    pub algorithm: Algorithm,
    /// Wall-clock budget for the MILP path.
    pub time_limit: Duration,
    /// Whether to activate the resilience-aware constraint set and
    /// collect provider signals.
    pub resilience_enabled: bool,
}

impl Default for GenerationRequest {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::ConstraintProgramming,
            time_limit: Duration::from_secs(30),
            resilience_enabled: true,
        }
    }
}

/// Systemic-resilience read-out for a finished roster.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResilienceSummary {
    /// Scheduled hours over available person-hours.
    pub utilization_rate: f64,
    /// Hub-classified people (score >= 0.4) carrying assignments.
    pub hub_faculty_count: usize,
    /// Every covered block survives one further loss.
    pub n1_compliant: bool,
    /// Every covered block survives two further losses.
    pub n2_compliant: bool,
    /// Human-readable resilience concerns.
    pub warnings: Vec<String>,
}

impl ResilienceSummary {
    /// Computes the summary from a finished roster.
    pub fn calculate(roster: &Roster, ctx: &SchedulingContext) -> Self {
        let capacity = ctx.capacity_hours();
        let utilization_rate = if capacity > 0.0 {
            roster.len() as f64 * ctx.config.hours_per_block / capacity
        } else {
            0.0
        };

        let mut warnings = Vec::new();
        if utilization_rate > ctx.config.target_utilization {
            warnings.push(format!(
                "utilization {utilization_rate:.2} exceeds target {:.2}; little slack to absorb sick calls",
                ctx.config.target_utilization
            ));
        }
        if !roster.uncovered.is_empty() {
            warnings.push(format!("{} block(s) uncovered", roster.uncovered.len()));
        }

        // Hub exposure.
        let mut hub_faculty_count = 0;
        if let Some(scores) = ctx.signals.hub_scores.as_ref() {
            let mut hubs: Vec<(&PersonId, f64)> = scores
                .iter()
                .filter(|(id, &score)| {
                    HubClass::of(score) != HubClass::Marginal && roster.count_for_person(id) > 0
                })
                .map(|(id, &score)| (id, score))
                .collect();
            hubs.sort_by(|a, b| a.0.cmp(b.0));
            hub_faculty_count = hubs.len();
            for (id, score) in hubs {
                if HubClass::of(score) == HubClass::Critical {
                    warnings.push(format!(
                        "critical hub '{id}' (score {score:.2}) carries {} assignments",
                        roster.count_for_person(id)
                    ));
                }
            }
        }

        // Known single points of failure carrying load.
        if let Some(vulnerable) = ctx.signals.n1_vulnerable.as_ref() {
            let mut loaded: Vec<&PersonId> = vulnerable
                .iter()
                .filter(|id| roster.count_for_person(id) > 0)
                .collect();
            loaded.sort();
            for id in loaded {
                warnings.push(format!(
                    "'{id}' is a single point of failure and still carries {} assignments",
                    roster.count_for_person(id)
                ));
            }
        }

        // Alternate depth per covered block.
        let mut n1_compliant = true;
        let mut n2_compliant = true;
        for block in &ctx.data.blocks {
            let assigned = roster
                .for_block(block.id)
                .iter()
                .filter(|a| a.role == RosterRole::Duty)
                .count();
            if assigned == 0 {
                continue;
            }
            let alternates = ctx
                .data
                .eligible_residents(block)
                .len()
                .saturating_sub(assigned);
            if alternates < 1 {
                n1_compliant = false;
            }
            if alternates < 2 {
                n2_compliant = false;
            }
        }

        // Zone self-sufficiency under current availability.
        for zone in &ctx.zones {
            let available = zone_available_people(ctx, zone);
            let assessment = zone.assess(&ctx.data.people, &available);
            if assessment.status != ZoneStatus::SelfSufficient {
                warnings.push(format!(
                    "zone '{}' is not self-sufficient: {:?}, headcount {}",
                    assessment.zone, assessment.status, assessment.available_headcount
                ));
            }
        }

        Self {
            utilization_rate,
            hub_faculty_count,
            n1_compliant,
            n2_compliant,
            warnings,
        }
    }
}

/// People available for at least one of the zone's blocks this run.
fn zone_available_people(ctx: &SchedulingContext, zone: &SchedulingZone) -> HashSet<PersonId> {
    let zone_blocks: Vec<usize> = ctx
        .data
        .blocks
        .iter()
        .filter(|b| zone.contains_activity(&b.activity))
        .map(|b| b.id)
        .collect();
    ctx.data
        .people
        .iter()
        .enumerate()
        .filter(|(p, _)| {
            zone_blocks
                .iter()
                .any(|&b| ctx.data.availability.is_available(*p, b))
        })
        .map(|(_, person)| person.id.clone())
        .collect()
}

/// Complete output of one generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    pub status: SolveStatus,
    pub assignments: Vec<crate::models::Assignment>,
    /// Blocks left without any duty coverage.
    pub uncovered: Vec<usize>,
    /// Compliance violations found in the produced roster. Returned, not
    /// thrown: coordinators may need to see a degraded schedule.
    pub violations: Vec<Violation>,
    pub resilience_summary: ResilienceSummary,
    pub stats: SolveStats,
}

/// Front door of the engine: binds the external collaborators and runs
/// generation and validation.
pub struct RosterEngine<'a> {
    directory: &'a dyn ScheduleDirectory,
    resilience: Option<&'a dyn ResilienceProvider>,
    zones: Vec<SchedulingZone>,
    config: EngineConfig,
}

impl<'a> RosterEngine<'a> {
    /// Creates an engine over a record directory.
    pub fn new(directory: &'a dyn ScheduleDirectory) -> Self {
        Self {
            directory,
            resilience: None,
            zones: Vec::new(),
            config: EngineConfig::default(),
        }
    }

    /// Attaches the optional resilience-signals collaborator.
    pub fn with_resilience_provider(mut self, provider: &'a dyn ResilienceProvider) -> Self {
        self.resilience = Some(provider);
        self
    }

    /// Configures zones.
    pub fn with_zones(mut self, zones: Vec<SchedulingZone>) -> Self {
        self.zones = zones;
        self
    }

    /// Overrides the engine configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Generates a roster for the range.
    ///
    /// Only data loading fails hard; every solver outcome, including
    /// infeasibility and timeout, comes back as a `GenerationResult`.
    pub fn generate(
        &self,
        range: DateRange,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, DataLoadError> {
        let ctx = self.build_context(range, request.resilience_enabled)?;
        info!(
            "generating roster: {:?} over {} blocks, resilience {}",
            request.algorithm,
            ctx.data.blocks.len(),
            if request.resilience_enabled { "on" } else { "off" },
        );

        let outcome = match request.algorithm {
            Algorithm::Greedy => GreedyScheduler::new().solve(&ctx),
            Algorithm::ConstraintProgramming => {
                let constraints = if request.resilience_enabled {
                    ConstraintSet::resilience_aware()
                } else {
                    ConstraintSet::baseline()
                };
                CpScheduler::new(constraints).solve(&ctx, request.time_limit)
            }
        };

        let violations = ComplianceValidator::new().validate(&outcome.roster.assignments, &ctx);
        let resilience_summary = ResilienceSummary::calculate(&outcome.roster, &ctx);

        Ok(GenerationResult {
            status: outcome.status,
            assignments: outcome.roster.assignments,
            uncovered: outcome.roster.uncovered,
            violations,
            resilience_summary,
            stats: outcome.stats,
        })
    }

    /// Validates an externally produced assignment set against the same
    /// range, independent of any solver.
    pub fn validate(
        &self,
        range: DateRange,
        assignments: &[crate::models::Assignment],
    ) -> Result<Vec<Violation>, DataLoadError> {
        let ctx = self.build_context(range, false)?;
        Ok(ComplianceValidator::new().validate(assignments, &ctx))
    }

    fn build_context(
        &self,
        range: DateRange,
        resilience_enabled: bool,
    ) -> Result<SchedulingContext, DataLoadError> {
        let data = ScheduleData::load(range, self.directory)?;
        let signals = match self.resilience {
            Some(provider) if resilience_enabled => {
                ResilienceSignals::collect(provider, &data.people, &data.slot_types())
            }
            _ => ResilienceSignals::empty(),
        };
        Ok(SchedulingContext::new(data, self.config.clone())
            .with_signals(signals)
            .with_zones(self.zones.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::tests::{d, FixtureDirectory};
    use crate::models::{Absence, AbsenceType, Assignment, Person, RotationTemplate};
    use std::collections::HashMap;

    fn directory() -> FixtureDirectory {
        FixtureDirectory {
            people: vec![
                Person::resident("r1", 1),
                Person::resident("r2", 2),
                Person::resident("r3", 2),
                Person::faculty("f1"),
                Person::faculty("f2"),
            ],
            absences: vec![],
            templates: vec![RotationTemplate::new("t1", "clinic").with_supervision()],
        }
    }

    fn range() -> DateRange {
        DateRange::new(d(2026, 3, 1), d(2026, 3, 3))
    }

    #[test]
    fn test_generate_greedy_end_to_end() {
        let dir = directory();
        let engine = RosterEngine::new(&dir);
        let request = GenerationRequest {
            algorithm: Algorithm::Greedy,
            ..GenerationRequest::default()
        };

        let result = engine.generate(range(), &request).unwrap();
        assert_eq!(result.status, SolveStatus::Feasible);
        assert!(!result.assignments.is_empty());
        assert!(result.violations.is_empty());
    }

    #[test]
    fn test_generate_cp_end_to_end() {
        let dir = directory();
        let engine = RosterEngine::new(&dir);
        let request = GenerationRequest {
            algorithm: Algorithm::ConstraintProgramming,
            time_limit: Duration::from_secs(20),
            resilience_enabled: false,
        };

        let result = engine.generate(range(), &request).unwrap();
        assert_eq!(result.status, SolveStatus::Optimal);
        assert!(result.uncovered.is_empty());
        assert!(result.violations.is_empty());
    }

    #[test]
    fn test_generate_propagates_load_error() {
        let dir = directory();
        let engine = RosterEngine::new(&dir);
        let inverted = DateRange::new(d(2026, 3, 3), d(2026, 3, 1));
        assert!(engine
            .generate(inverted, &GenerationRequest::default())
            .is_err());
    }

    #[test]
    fn test_validate_external_schedule() {
        let mut dir = directory();
        dir.absences.push(Absence::new(
            "r1",
            d(2026, 3, 1),
            d(2026, 3, 1),
            AbsenceType::Sick,
        ));
        let engine = RosterEngine::new(&dir);

        // Hand-built schedule assigning the absent resident.
        let assignments = vec![Assignment::duty("r1", 0)];
        let violations = engine.validate(range(), &assignments).unwrap();
        assert!(violations.iter().any(|v| v.rule == RuleId::Availability));
    }

    #[test]
    fn test_summary_utilization_and_alternates() {
        let dir = directory();
        let engine = RosterEngine::new(&dir);
        let request = GenerationRequest {
            algorithm: Algorithm::Greedy,
            ..GenerationRequest::default()
        };
        let result = engine.generate(range(), &request).unwrap();

        let s = &result.resilience_summary;
        assert!(s.utilization_rate > 0.0);
        // Three eligible residents, one assigned per block: two alternates
        // everywhere, so the roster survives one loss but not guaranteed two.
        assert!(s.n1_compliant);
        assert!(s.n2_compliant);
    }

    #[test]
    fn test_summary_flags_loaded_hub() {
        struct HubProvider;
        impl ResilienceProvider for HubProvider {
            fn hub_scores(&self) -> Option<HashMap<PersonId, f64>> {
                Some(HashMap::from([("f1".to_string(), 0.9)]))
            }
            fn utilization(&self) -> Option<f64> {
                None
            }
            fn n1_vulnerable(&self) -> Option<std::collections::HashSet<PersonId>> {
                None
            }
            fn zone_of(&self, _person_id: &str) -> Option<String> {
                None
            }
            fn preference_trail(
                &self,
                _person_id: &str,
                _slot: &crate::models::SlotType,
            ) -> Option<f64> {
                None
            }
        }

        let dir = FixtureDirectory {
            people: vec![Person::resident("r1", 1), Person::faculty("f1")],
            absences: vec![],
            templates: vec![RotationTemplate::new("t1", "clinic").with_supervision()],
        };
        let provider = HubProvider;
        let engine = RosterEngine::new(&dir).with_resilience_provider(&provider);
        let request = GenerationRequest {
            algorithm: Algorithm::Greedy,
            ..GenerationRequest::default()
        };

        let result = engine
            .generate(DateRange::new(d(2026, 3, 1), d(2026, 3, 1)), &request)
            .unwrap();
        // The only faculty is a critical hub and must supervise.
        assert_eq!(result.resilience_summary.hub_faculty_count, 1);
        assert!(result
            .resilience_summary
            .warnings
            .iter()
            .any(|w| w.contains("critical hub 'f1'")));
    }

    #[test]
    fn test_serde_round_trip_result() {
        let dir = directory();
        let engine = RosterEngine::new(&dir);
        let request = GenerationRequest {
            algorithm: Algorithm::Greedy,
            ..GenerationRequest::default()
        };
        let result = engine.generate(range(), &request).unwrap();

        let json = serde_json::to_string(&result).unwrap();
        let back: GenerationResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.assignments, result.assignments);
        assert_eq!(back.status, result.status);
    }
}
