//! Block and date-range models.
//!
//! A block is the atomic schedulable unit: one half-day (AM or PM) of one
//! calendar date for one rotation activity. Blocks are derived
//! deterministically from the planning date range and the active rotation
//! templates; they are never persisted upstream.
//!
//! # Time Model
//! Calendar dates only. Within a date, `DayPart` distinguishes the two
//! half-days. Rolling-window rules operate on `day_index`, the offset in
//! days from the start of the planning horizon.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Dense block index within one scheduling run.
pub type BlockId = usize;

/// Half-day classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DayPart {
    Am,
    Pm,
}

/// A slot classification used for learned preference signals:
/// the activity together with the half-day it occupies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotType {
    /// Rotation activity label.
    pub activity: String,
    /// Half-day.
    pub day_part: DayPart,
}

impl SlotType {
    /// Creates a slot type.
    pub fn new(activity: impl Into<String>, day_part: DayPart) -> Self {
        Self {
            activity: activity.into(),
            day_part,
        }
    }
}

/// An inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// First day of the range (inclusive).
    pub start: NaiveDate,
    /// Last day of the range (inclusive).
    pub end: NaiveDate,
}

impl DateRange {
    /// Creates a date range. `start` must not be after `end`; an inverted
    /// range is representable and reported by `is_empty`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Whether the range contains no days.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    /// Number of days in the range (0 when empty).
    pub fn num_days(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            (self.end - self.start).num_days() as usize + 1
        }
    }

    /// Whether a date falls within the range.
    #[inline]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Iterates all dates in the range in ascending order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        let count = self.num_days();
        self.start.iter_days().take(count)
    }
}

/// A half-day schedulable unit for one rotation activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    /// Dense index within this run (position in `ScheduleData::blocks`).
    pub id: BlockId,
    /// Calendar date.
    pub date: NaiveDate,
    /// Half-day.
    pub day_part: DayPart,
    /// Days since the start of the planning horizon.
    pub day_index: usize,
    /// Rotation activity label (from the template that generated this block).
    pub activity: String,
    /// Number of duty assignments this block should receive.
    pub required_headcount: usize,
    /// Whether assigned residents require faculty supervision.
    pub needs_supervision: bool,
    /// Credential required for duty eligibility, if any.
    pub required_skill: Option<String>,
    /// Whether coverage of this block is a hard requirement.
    pub mandatory: bool,
}

impl Block {
    /// Creates a block.
    pub fn new(
        id: BlockId,
        date: NaiveDate,
        day_part: DayPart,
        day_index: usize,
        activity: impl Into<String>,
    ) -> Self {
        Self {
            id,
            date,
            day_part,
            day_index,
            activity: activity.into(),
            required_headcount: 1,
            needs_supervision: false,
            required_skill: None,
            mandatory: false,
        }
    }

    /// Sets the required duty headcount.
    pub fn with_headcount(mut self, headcount: usize) -> Self {
        self.required_headcount = headcount;
        self
    }

    /// Marks this block as requiring faculty supervision.
    pub fn with_supervision(mut self) -> Self {
        self.needs_supervision = true;
        self
    }

    /// Sets a required credential.
    pub fn with_required_skill(mut self, skill: impl Into<String>) -> Self {
        self.required_skill = Some(skill.into());
        self
    }

    /// Makes coverage of this block a hard requirement.
    pub fn with_mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    /// The slot type of this block, for preference-trail lookups.
    pub fn slot_type(&self) -> SlotType {
        SlotType::new(self.activity.clone(), self.day_part)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_date_range_days() {
        let r = DateRange::new(d(2026, 3, 1), d(2026, 3, 3));
        assert!(!r.is_empty());
        assert_eq!(r.num_days(), 3);
        let days: Vec<_> = r.days().collect();
        assert_eq!(days, vec![d(2026, 3, 1), d(2026, 3, 2), d(2026, 3, 3)]);
        assert!(r.contains(d(2026, 3, 2)));
        assert!(!r.contains(d(2026, 3, 4)));
    }

    #[test]
    fn test_date_range_single_day() {
        let r = DateRange::new(d(2026, 3, 1), d(2026, 3, 1));
        assert_eq!(r.num_days(), 1);
    }

    #[test]
    fn test_date_range_inverted_is_empty() {
        let r = DateRange::new(d(2026, 3, 2), d(2026, 3, 1));
        assert!(r.is_empty());
        assert_eq!(r.num_days(), 0);
        assert_eq!(r.days().count(), 0);
    }

    #[test]
    fn test_block_builder() {
        let b = Block::new(0, d(2026, 3, 1), DayPart::Am, 0, "clinic")
            .with_headcount(2)
            .with_supervision()
            .with_required_skill("ob");

        assert_eq!(b.required_headcount, 2);
        assert!(b.needs_supervision);
        assert_eq!(b.required_skill.as_deref(), Some("ob"));
        assert_eq!(b.slot_type(), SlotType::new("clinic", DayPart::Am));
    }

    #[test]
    fn test_day_part_ordering() {
        // AM sorts before PM within a date.
        assert!(DayPart::Am < DayPart::Pm);
    }
}
