//! Resilience signals: hub centrality, utilization, preference trails.
//!
//! These are auxiliary, advisory inputs computed outside the engine and
//! snapshotted once per run. Every field is optional: a deployment that
//! has never run the signal pipeline still schedules correctly, and each
//! resilience constraint degrades to a no-op for the signals it lacks.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::{Person, PersonId, SlotType};

/// Hub classification thresholds over the composite centrality score.
const CRITICAL_HUB_THRESHOLD: f64 = 0.6;
const SIGNIFICANT_HUB_THRESHOLD: f64 = 0.4;

/// Composite network-centrality measure for one faculty member.
///
/// Computed per run from the coverage-dependency graph and never
/// persisted. The composite blends the three standard centrality views:
/// how many things depend on the person (degree), how often they sit on
/// the only path between two needs (betweenness), and how central their
/// neighbors are (eigenvector).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacultyCentrality {
    pub person_id: PersonId,
    /// Normalized degree centrality (0.0..1.0).
    pub degree: f64,
    /// Normalized betweenness centrality (0.0..1.0).
    pub betweenness: f64,
    /// Normalized eigenvector centrality (0.0..1.0).
    pub eigenvector: f64,
}

impl FacultyCentrality {
    /// Creates a centrality record.
    pub fn new(person_id: impl Into<PersonId>, degree: f64, betweenness: f64, eigenvector: f64) -> Self {
        Self {
            person_id: person_id.into(),
            degree: degree.clamp(0.0, 1.0),
            betweenness: betweenness.clamp(0.0, 1.0),
            eigenvector: eigenvector.clamp(0.0, 1.0),
        }
    }

    /// Composite hub score. Betweenness weighs heaviest: a person on the
    /// only path between two coverage needs is the most disruptive to lose.
    pub fn hub_score(&self) -> f64 {
        0.3 * self.degree + 0.45 * self.betweenness + 0.25 * self.eigenvector
    }
}

/// Hub classification of a centrality score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HubClass {
    /// Score >= 0.6: penalized at double rate.
    Critical,
    /// Score >= 0.4: penalized at standard rate.
    Significant,
    /// Below 0.4: not penalized.
    Marginal,
}

impl HubClass {
    /// Classifies a hub score.
    pub fn of(score: f64) -> Self {
        if score >= CRITICAL_HUB_THRESHOLD {
            HubClass::Critical
        } else if score >= SIGNIFICANT_HUB_THRESHOLD {
            HubClass::Significant
        } else {
            HubClass::Marginal
        }
    }

    /// Penalty multiplier for this class.
    pub fn multiplier(self) -> f64 {
        match self {
            HubClass::Critical => 2.0,
            HubClass::Significant => 1.0,
            HubClass::Marginal => 0.0,
        }
    }
}

/// The optional signals collaborator.
///
/// Implementations typically wrap whatever analytics store the deployment
/// keeps; returning `None` from any method is always acceptable.
pub trait ResilienceProvider {
    /// Composite hub score per person, when computed.
    fn hub_scores(&self) -> Option<HashMap<PersonId, f64>>;

    /// Current system utilization (0.0..1.0), when measured.
    fn utilization(&self) -> Option<f64>;

    /// People whose single loss already breaks some coverage.
    fn n1_vulnerable(&self) -> Option<HashSet<PersonId>>;

    /// Home zone of a person, when zoning is configured.
    fn zone_of(&self, person_id: &str) -> Option<String>;

    /// Learned preference strength for a person and slot type
    /// (0.0..1.0, 0.5 = neutral), when trail data exists.
    fn preference_trail(&self, person_id: &str, slot: &SlotType) -> Option<f64>;
}

/// One run's snapshot of all resilience signals.
///
/// Collected once and shared read-only by both solver paths.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResilienceSignals {
    /// Composite hub score per person.
    pub hub_scores: Option<HashMap<PersonId, f64>>,
    /// Current system utilization (0.0..1.0).
    pub utilization: Option<f64>,
    /// People whose single loss already breaks some coverage.
    pub n1_vulnerable: Option<HashSet<PersonId>>,
    /// Home zone per person.
    pub home_zones: Option<HashMap<PersonId, String>>,
    /// Preference trail strength per (person, slot type).
    pub preference_trails: Option<HashMap<(PersonId, SlotType), f64>>,
}

impl ResilienceSignals {
    /// A snapshot with no signals; every resilience constraint no-ops.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Snapshots a provider for the given people and slot types.
    pub fn collect(
        provider: &dyn ResilienceProvider,
        people: &[Person],
        slot_types: &[SlotType],
    ) -> Self {
        let hub_scores = provider.hub_scores();
        let utilization = provider.utilization();
        let n1_vulnerable = provider.n1_vulnerable();

        let mut home_zones = HashMap::new();
        for person in people {
            if let Some(zone) = provider.zone_of(&person.id) {
                home_zones.insert(person.id.clone(), zone);
            }
        }
        let home_zones = (!home_zones.is_empty()).then_some(home_zones);

        let mut trails = HashMap::new();
        for person in people {
            for slot in slot_types {
                if let Some(strength) = provider.preference_trail(&person.id, slot) {
                    trails.insert((person.id.clone(), slot.clone()), strength);
                }
            }
        }
        let preference_trails = (!trails.is_empty()).then_some(trails);

        Self {
            hub_scores,
            utilization,
            n1_vulnerable,
            home_zones,
            preference_trails,
        }
    }

    /// Hub score for a person, if known.
    pub fn hub_score(&self, person_id: &str) -> Option<f64> {
        self.hub_scores.as_ref()?.get(person_id).copied()
    }

    /// Home zone of a person, if known.
    pub fn home_zone(&self, person_id: &str) -> Option<&str> {
        self.home_zones.as_ref()?.get(person_id).map(String::as_str)
    }

    /// Preference trail strength for a person and slot type, if recorded.
    pub fn trail(&self, person_id: &str, slot: &SlotType) -> Option<f64> {
        self.preference_trails
            .as_ref()?
            .get(&(person_id.to_string(), slot.clone()))
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DayPart;

    #[test]
    fn test_hub_classification_thresholds() {
        assert_eq!(HubClass::of(0.7), HubClass::Critical);
        assert_eq!(HubClass::of(0.6), HubClass::Critical);
        assert_eq!(HubClass::of(0.59), HubClass::Significant);
        assert_eq!(HubClass::of(0.4), HubClass::Significant);
        assert_eq!(HubClass::of(0.39), HubClass::Marginal);
    }

    #[test]
    fn test_hub_multipliers() {
        assert_eq!(HubClass::Critical.multiplier(), 2.0);
        assert_eq!(HubClass::Significant.multiplier(), 1.0);
        assert_eq!(HubClass::Marginal.multiplier(), 0.0);
    }

    #[test]
    fn test_centrality_composite_bounds() {
        let c = FacultyCentrality::new("f1", 1.0, 1.0, 1.0);
        assert!((c.hub_score() - 1.0).abs() < 1e-10);

        let clamped = FacultyCentrality::new("f2", 2.0, -1.0, 0.5);
        assert!((clamped.degree - 1.0).abs() < 1e-10);
        assert!((clamped.betweenness - 0.0).abs() < 1e-10);
    }

    #[test]
    fn test_empty_signals() {
        let s = ResilienceSignals::empty();
        assert!(s.hub_score("f1").is_none());
        assert!(s.home_zone("f1").is_none());
        assert!(s.trail("f1", &SlotType::new("clinic", DayPart::Am)).is_none());
        assert!(s.utilization.is_none());
    }

    struct FixedProvider;

    impl ResilienceProvider for FixedProvider {
        fn hub_scores(&self) -> Option<HashMap<PersonId, f64>> {
            Some(HashMap::from([("f1".to_string(), 0.7)]))
        }
        fn utilization(&self) -> Option<f64> {
            Some(0.85)
        }
        fn n1_vulnerable(&self) -> Option<HashSet<PersonId>> {
            None
        }
        fn zone_of(&self, person_id: &str) -> Option<String> {
            (person_id == "f1").then(|| "inpatient".to_string())
        }
        fn preference_trail(&self, person_id: &str, slot: &SlotType) -> Option<f64> {
            (person_id == "r1" && slot.day_part == DayPart::Am).then_some(0.8)
        }
    }

    #[test]
    fn test_collect_snapshot() {
        let people = vec![Person::faculty("f1"), Person::resident("r1", 1)];
        let slots = vec![
            SlotType::new("clinic", DayPart::Am),
            SlotType::new("clinic", DayPart::Pm),
        ];
        let s = ResilienceSignals::collect(&FixedProvider, &people, &slots);

        assert_eq!(s.hub_score("f1"), Some(0.7));
        assert_eq!(s.utilization, Some(0.85));
        assert!(s.n1_vulnerable.is_none());
        assert_eq!(s.home_zone("f1"), Some("inpatient"));
        assert_eq!(s.trail("r1", &SlotType::new("clinic", DayPart::Am)), Some(0.8));
        assert!(s.trail("r1", &SlotType::new("clinic", DayPart::Pm)).is_none());
    }
}
