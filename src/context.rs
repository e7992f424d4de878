//! Scheduling context and engine configuration.
//!
//! `SchedulingContext` is the immutable aggregate handed to every
//! constraint and both solver paths: the loaded data snapshot, the
//! optional resilience signals, the zone map, and the configuration.
//! It is built fresh per generation run and discarded afterward, so
//! concurrent runs never share mutable state.

use serde::{Deserialize, Serialize};

use crate::loader::ScheduleData;
use crate::models::{Block, ResilienceSignals, SchedulingZone};

/// Relative weights of the soft objective terms.
///
/// Explicit, tunable numbers. Coverage dominates everything else by two
/// orders of magnitude so no combination of resilience terms can justify
/// leaving a block empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintWeights {
    pub coverage: f64,
    pub n1_vulnerability: f64,
    pub utilization_buffer: f64,
    pub hub_protection: f64,
    pub zone_boundary: f64,
    pub equity: f64,
    pub preference_trail: f64,
    pub continuity: f64,
}

impl Default for ConstraintWeights {
    fn default() -> Self {
        Self {
            coverage: 1000.0,
            n1_vulnerability: 25.0,
            utilization_buffer: 20.0,
            hub_protection: 15.0,
            zone_boundary: 12.0,
            equity: 10.0,
            preference_trail: 8.0,
            continuity: 5.0,
        }
    }
}

/// Engine configuration for one generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Target system utilization; load beyond it is penalized.
    pub target_utilization: f64,
    /// Fixed duty hours per half-day block.
    pub hours_per_block: f64,
    /// Duty-hour ceiling over any rolling 7-day window.
    pub weekly_hour_ceiling: f64,
    /// Length of the rolling window for the free-day rule, in days.
    pub rest_window_days: usize,
    /// Assignment-free days required within each rest window.
    pub min_free_days: usize,
    /// Solver worker threads. One by default for reproducibility.
    pub solver_threads: i32,
    /// Solver random seed. Fixed so identical inputs reproduce identical
    /// rosters across runs.
    pub random_seed: i32,
    /// Soft-constraint weights.
    pub weights: ConstraintWeights,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            target_utilization: 0.80,
            hours_per_block: 6.0,
            weekly_hour_ceiling: 80.0,
            rest_window_days: 28,
            min_free_days: 4,
            solver_threads: 1,
            random_seed: 1234,
            weights: ConstraintWeights::default(),
        }
    }
}

impl EngineConfig {
    /// Sets the target utilization.
    pub fn with_target_utilization(mut self, target: f64) -> Self {
        self.target_utilization = target;
        self
    }

    /// Sets the soft-constraint weights.
    pub fn with_weights(mut self, weights: ConstraintWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Sets the solver random seed.
    pub fn with_random_seed(mut self, seed: i32) -> Self {
        self.random_seed = seed;
        self
    }

    /// Maximum blocks per rolling 7-day window under the hour ceiling.
    pub fn max_blocks_per_week(&self) -> usize {
        (self.weekly_hour_ceiling / self.hours_per_block).floor() as usize
    }
}

/// The immutable per-run aggregate.
#[derive(Debug, Clone)]
pub struct SchedulingContext {
    /// Loaded input snapshot.
    pub data: ScheduleData,
    /// Resilience signal snapshot; all-empty when the provider is absent.
    pub signals: ResilienceSignals,
    /// Configured zones; empty when zoning is not used.
    pub zones: Vec<SchedulingZone>,
    /// Engine configuration.
    pub config: EngineConfig,
}

impl SchedulingContext {
    /// Creates a context with no resilience signals or zones.
    pub fn new(data: ScheduleData, config: EngineConfig) -> Self {
        Self {
            data,
            signals: ResilienceSignals::empty(),
            zones: Vec::new(),
            config,
        }
    }

    /// Attaches a resilience signal snapshot.
    pub fn with_signals(mut self, signals: ResilienceSignals) -> Self {
        self.signals = signals;
        self
    }

    /// Attaches the zone map.
    pub fn with_zones(mut self, zones: Vec<SchedulingZone>) -> Self {
        self.zones = zones;
        self
    }

    /// The zone a block belongs to, if any.
    pub fn zone_of_block(&self, block: &Block) -> Option<&SchedulingZone> {
        self.zones.iter().find(|z| z.contains_activity(&block.activity))
    }

    /// Total system capacity in hours: every available person-block cell.
    pub fn capacity_hours(&self) -> f64 {
        self.data.availability.total_available() as f64 * self.config.hours_per_block
    }

    /// All rolling windows of `len` days over the horizon as
    /// `(start_day, end_day)` inclusive pairs. A horizon shorter than
    /// `len` yields one clipped window spanning the whole horizon.
    pub fn rolling_windows(&self, len: usize) -> Vec<(usize, usize)> {
        let days = self.data.horizon_days();
        if days == 0 {
            return Vec::new();
        }
        if days <= len {
            return vec![(0, days - 1)];
        }
        (0..=days - len).map(|start| (start, start + len - 1)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::tests::{d, FixtureDirectory};
    use crate::loader::ScheduleData;
    use crate::models::{DateRange, Person, RotationTemplate};

    fn sample_context(days: u32) -> SchedulingContext {
        let dir = FixtureDirectory {
            people: vec![Person::resident("r1", 1), Person::faculty("f1")],
            absences: vec![],
            templates: vec![RotationTemplate::new("t1", "clinic")],
        };
        let range = DateRange::new(d(2026, 3, 1), d(2026, 3, days));
        let data = ScheduleData::load(range, &dir).unwrap();
        SchedulingContext::new(data, EngineConfig::default())
    }

    #[test]
    fn test_default_weights_ordering() {
        let w = ConstraintWeights::default();
        assert!(w.coverage > w.n1_vulnerability);
        assert!(w.n1_vulnerability > w.utilization_buffer);
        assert!(w.utilization_buffer > w.hub_protection);
        assert!(w.hub_protection > w.zone_boundary);
        assert!(w.zone_boundary > w.equity);
        assert!(w.equity > w.preference_trail);
        assert!(w.preference_trail > w.continuity);
    }

    #[test]
    fn test_max_blocks_per_week() {
        // 80h at 6h per block allows 13 blocks, not 14.
        let config = EngineConfig::default();
        assert_eq!(config.max_blocks_per_week(), 13);
    }

    #[test]
    fn test_rolling_windows_full() {
        let ctx = sample_context(10);
        let windows = ctx.rolling_windows(7);
        assert_eq!(windows, vec![(0, 6), (1, 7), (2, 8), (3, 9)]);
    }

    #[test]
    fn test_rolling_windows_clipped() {
        // Horizon shorter than the window: one clipped window.
        let ctx = sample_context(4);
        assert_eq!(ctx.rolling_windows(7), vec![(0, 3)]);
        assert_eq!(ctx.rolling_windows(28), vec![(0, 3)]);
    }

    #[test]
    fn test_capacity_hours() {
        let ctx = sample_context(2);
        // 2 people x 4 blocks x 6h.
        assert!((ctx.capacity_hours() - 48.0).abs() < 1e-10);
    }

    #[test]
    fn test_zone_lookup() {
        use crate::models::SchedulingZone;
        let ctx = sample_context(1)
            .with_zones(vec![SchedulingZone::new("ambulatory").with_activity("clinic")]);
        let block = &ctx.data.blocks[0];
        assert_eq!(ctx.zone_of_block(block).unwrap().name, "ambulatory");
    }
}
