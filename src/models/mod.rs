//! Scheduling domain models.
//!
//! Core data types for representing one roster-generation run: who can
//! work (`Person`), what must be staffed (`Block`, `RotationTemplate`),
//! who is away (`Absence`, `AvailabilityMatrix`), what the solvers emit
//! (`Roster`, `Assignment`, `Violation`), and the resilience side-channel
//! (`SchedulingZone`, `ResilienceSignals`).
//!
//! Everything here is immutable within a run: the loader builds one
//! snapshot, both solver paths and the validator read it.

mod absence;
mod availability;
mod block;
mod person;
mod resilience;
mod roster;
mod template;
mod zone;

pub use absence::{Absence, AbsenceType};
pub use availability::AvailabilityMatrix;
pub use block::{Block, BlockId, DateRange, DayPart, SlotType};
pub use person::{Person, PersonId, Role};
pub use resilience::{FacultyCentrality, HubClass, ResilienceProvider, ResilienceSignals};
pub use roster::{Assignment, Roster, RosterRole, RuleId, Violation};
pub use template::RotationTemplate;
pub use zone::{SchedulingZone, ZoneAssessment, ZoneEvent, ZoneStatus};
