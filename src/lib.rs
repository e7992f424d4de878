//! Constraint-based duty roster generation for residency programs.
//!
//! Assigns residents and supervising faculty to recurring half-day blocks
//! over a planning horizon, under the hard duty-hour rules (80-hour week,
//! overnight rest, one-in-seven free days, supervision ratios) and a
//! weighted set of soft goals, including systemic-resilience heuristics:
//! hub protection, utilization buffering, blast-radius zone isolation,
//! N-1 contingency depth, and learned preference trails.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Person`, `Block`, `RotationTemplate`,
//!   `Absence`, `AvailabilityMatrix`, `Roster`, `Violation`,
//!   `SchedulingZone`, `ResilienceSignals`
//! - **`loader`**: Collaborator read interface and the per-run
//!   `ScheduleData` snapshot
//! - **`context`**: The immutable per-run aggregate and configuration
//! - **`constraints`**: The pluggable constraint framework (hard
//!   regulatory rules, soft objective terms, resilience terms)
//! - **`solver`**: The greedy draft scheduler, the MILP optimizer, and
//!   the `RosterEngine` front door
//! - **`validation`**: The post-hoc compliance validator
//!
//! # Usage
//!
//! ```no_run
//! use rotagen::loader::ScheduleDirectory;
//! use rotagen::models::DateRange;
//! use rotagen::solver::{Algorithm, GenerationRequest, RosterEngine};
//!
//! fn run(directory: &dyn ScheduleDirectory, range: DateRange) {
//!     let engine = RosterEngine::new(directory);
//!     let request = GenerationRequest {
//!         algorithm: Algorithm::ConstraintProgramming,
//!         ..GenerationRequest::default()
//!     };
//!     let result = engine.generate(range, &request).unwrap();
//!     println!("{:?}: {} assignments", result.status, result.assignments.len());
//! }
//! ```
//!
//! # Design
//!
//! One generation run builds one immutable `SchedulingContext`; nothing
//! is shared mutably across runs. Solver outcomes (infeasible, timed out)
//! are ordinary result values, not errors: only malformed input data
//! fails hard.

pub mod constraints;
pub mod context;
pub mod loader;
pub mod models;
pub mod solver;
pub mod validation;
