//! Schedule data loading.
//!
//! Normalizes the external record system's people, absences, and rotation
//! templates into one immutable `ScheduleData` snapshot: generated blocks
//! for every half-day of the planning range and a dense availability
//! matrix with absence intervals subtracted.
//!
//! Loading is the only seam that fails hard. A malformed request (empty
//! range, no active templates) yields a `DataLoadError` and no partial
//! result; everything downstream of a successful load is represented as
//! data, not errors.

use std::collections::HashMap;

use log::debug;
use thiserror::Error;

use crate::models::{
    Absence, AvailabilityMatrix, Block, BlockId, DateRange, DayPart, Person, PersonId,
    RotationTemplate, SlotType,
};

/// Read interface of the external record system.
///
/// Implementations supply normalized records; the loader never writes
/// back. `list_templates` returns active templates only.
pub trait ScheduleDirectory {
    /// All schedulable people.
    fn list_people(&self) -> Vec<Person>;

    /// Absence records overlapping the given range.
    fn list_absences(&self, range: &DateRange) -> Vec<Absence>;

    /// Active rotation templates.
    fn list_templates(&self) -> Vec<RotationTemplate>;
}

/// Fatal input errors detected while loading.
#[derive(Debug, Error)]
pub enum DataLoadError {
    /// The requested date range contains no days.
    #[error("empty date range: {start} to {end}")]
    EmptyDateRange { start: String, end: String },

    /// No active rotation templates; nothing to generate blocks from.
    #[error("no active rotation templates")]
    NoTemplates,

    /// Block generation yielded nothing despite a non-empty range.
    #[error("date range produced no blocks")]
    NoBlocks,

    /// No schedulable people.
    #[error("directory returned no people")]
    NoPeople,

    /// An absence references a person the directory does not know.
    #[error("absence references unknown person '{0}'")]
    UnknownPerson(PersonId),
}

/// One run's immutable input snapshot.
#[derive(Debug, Clone)]
pub struct ScheduleData {
    /// The planning range blocks were generated for.
    pub range: DateRange,
    /// People sorted by id.
    pub people: Vec<Person>,
    /// Generated blocks in (date, part, activity) order; `Block::id` is the
    /// position in this vector.
    pub blocks: Vec<Block>,
    /// The templates blocks were generated from.
    pub templates: Vec<RotationTemplate>,
    /// Availability after subtracting absences.
    pub availability: AvailabilityMatrix,
    person_index: HashMap<PersonId, usize>,
}

impl ScheduleData {
    /// Loads and normalizes one run's data.
    ///
    /// Deterministic: the same directory contents and range always produce
    /// identical people ordering, block ids, and availability cells.
    pub fn load(range: DateRange, directory: &dyn ScheduleDirectory) -> Result<Self, DataLoadError> {
        if range.is_empty() {
            return Err(DataLoadError::EmptyDateRange {
                start: range.start.to_string(),
                end: range.end.to_string(),
            });
        }

        let mut people = directory.list_people();
        if people.is_empty() {
            return Err(DataLoadError::NoPeople);
        }
        people.sort_by(|a, b| a.id.cmp(&b.id));

        let templates = directory.list_templates();
        if templates.is_empty() {
            return Err(DataLoadError::NoTemplates);
        }

        let blocks = generate_blocks(&range, &templates);
        if blocks.is_empty() {
            return Err(DataLoadError::NoBlocks);
        }

        let person_index: HashMap<PersonId, usize> = people
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id.clone(), i))
            .collect();

        let mut availability = AvailabilityMatrix::new(people.len(), blocks.len());
        for absence in directory.list_absences(&range) {
            let &person = person_index
                .get(&absence.person_id)
                .ok_or_else(|| DataLoadError::UnknownPerson(absence.person_id.clone()))?;
            for block in &blocks {
                if absence.covers(block.date) {
                    availability.mark_unavailable(person, block.id);
                }
            }
        }

        debug!(
            "loaded {} people, {} blocks over {} days, {} available cells",
            people.len(),
            blocks.len(),
            range.num_days(),
            availability.total_available(),
        );

        Ok(Self {
            range,
            people,
            blocks,
            templates,
            availability,
            person_index,
        })
    }

    /// Index of a person in `people`, if known.
    pub fn person_index(&self, person_id: &str) -> Option<usize> {
        self.person_index.get(person_id).copied()
    }

    /// Person at a given index.
    pub fn person(&self, index: usize) -> &Person {
        &self.people[index]
    }

    /// Number of days in the planning horizon.
    pub fn horizon_days(&self) -> usize {
        self.range.num_days()
    }

    /// Indices of all residents.
    pub fn resident_indices(&self) -> Vec<usize> {
        (0..self.people.len())
            .filter(|&i| self.people[i].is_resident())
            .collect()
    }

    /// Indices of all faculty.
    pub fn faculty_indices(&self) -> Vec<usize> {
        (0..self.people.len())
            .filter(|&i| self.people[i].is_faculty())
            .collect()
    }

    /// Whether a person is credentialed for a block (role-independent).
    pub fn is_credentialed(&self, person: usize, block: &Block) -> bool {
        match &block.required_skill {
            Some(skill) => self.people[person].has_skill(skill),
            None => true,
        }
    }

    /// Residents available and credentialed for a block.
    pub fn eligible_residents(&self, block: &Block) -> Vec<usize> {
        (0..self.people.len())
            .filter(|&p| {
                self.people[p].is_resident()
                    && self.availability.is_available(p, block.id)
                    && self.is_credentialed(p, block)
            })
            .collect()
    }

    /// Faculty available for a block.
    pub fn eligible_faculty(&self, block: &Block) -> Vec<usize> {
        (0..self.people.len())
            .filter(|&p| self.people[p].is_faculty() && self.availability.is_available(p, block.id))
            .collect()
    }

    /// Block ids grouped by day index, AM before PM within a day.
    pub fn blocks_by_day(&self) -> Vec<Vec<BlockId>> {
        let mut days = vec![Vec::new(); self.horizon_days()];
        for block in &self.blocks {
            days[block.day_index].push(block.id);
        }
        days
    }

    /// Distinct slot types across all blocks.
    pub fn slot_types(&self) -> Vec<SlotType> {
        let mut seen = Vec::new();
        for block in &self.blocks {
            let slot = block.slot_type();
            if !seen.contains(&slot) {
                seen.push(slot);
            }
        }
        seen
    }
}

/// Generates one block per (day, half-day, template), in deterministic
/// (date, part, template) order.
fn generate_blocks(range: &DateRange, templates: &[RotationTemplate]) -> Vec<Block> {
    let mut blocks = Vec::with_capacity(range.num_days() * 2 * templates.len());
    for (day_index, date) in range.days().enumerate() {
        for part in [DayPart::Am, DayPart::Pm] {
            for template in templates {
                let mut block = Block::new(blocks.len(), date, part, day_index, &template.activity)
                    .with_headcount(template.required_headcount);
                if template.needs_supervision {
                    block = block.with_supervision();
                }
                if let Some(skill) = &template.required_skill {
                    block = block.with_required_skill(skill.clone());
                }
                if template.mandatory {
                    block = block.with_mandatory();
                }
                blocks.push(block);
            }
        }
    }
    blocks
}
