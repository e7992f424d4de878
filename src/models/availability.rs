//! Person-by-block availability matrix.
//!
//! Derived once per run by the loader: full availability minus absence
//! intervals. Every constraint and both solver paths read the same matrix;
//! nothing mutates it after construction.
//!
//! Rows are person indices (position in `ScheduleData::people`), columns
//! are block ids. Dense layout: lookups are O(1) and the whole matrix for
//! a quarter of a mid-size program fits in a few kilobytes.

use serde::{Deserialize, Serialize};

use super::BlockId;

/// Dense `person x block -> bool` availability matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityMatrix {
    people: usize,
    blocks: usize,
    cells: Vec<bool>,
}

impl AvailabilityMatrix {
    /// Creates a matrix with every cell available.
    pub fn new(people: usize, blocks: usize) -> Self {
        Self {
            people,
            blocks,
            cells: vec![true; people * blocks],
        }
    }

    /// Number of person rows.
    #[inline]
    pub fn num_people(&self) -> usize {
        self.people
    }

    /// Number of block columns.
    #[inline]
    pub fn num_blocks(&self) -> usize {
        self.blocks
    }

    /// Marks a cell unavailable.
    pub fn mark_unavailable(&mut self, person: usize, block: BlockId) {
        let idx = self.index(person, block);
        self.cells[idx] = false;
    }

    /// Whether a person is available for a block.
    ///
    /// Out-of-range lookups return `false` rather than panicking: an
    /// assignment referencing an unknown person or block is never available.
    #[inline]
    pub fn is_available(&self, person: usize, block: BlockId) -> bool {
        if person >= self.people || block >= self.blocks {
            return false;
        }
        self.cells[person * self.blocks + block]
    }

    /// Indices of people available for a block.
    pub fn available_people(&self, block: BlockId) -> Vec<usize> {
        (0..self.people)
            .filter(|&p| self.is_available(p, block))
            .collect()
    }

    /// Number of blocks a person is available for.
    pub fn available_block_count(&self, person: usize) -> usize {
        (0..self.blocks)
            .filter(|&b| self.is_available(person, b))
            .count()
    }

    /// Total number of available person-block cells.
    pub fn total_available(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    #[inline]
    fn index(&self, person: usize, block: BlockId) -> usize {
        assert!(person < self.people && block < self.blocks);
        person * self.blocks + block
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_available_by_default() {
        let m = AvailabilityMatrix::new(2, 3);
        for p in 0..2 {
            for b in 0..3 {
                assert!(m.is_available(p, b));
            }
        }
        assert_eq!(m.total_available(), 6);
    }

    #[test]
    fn test_mark_unavailable() {
        let mut m = AvailabilityMatrix::new(2, 3);
        m.mark_unavailable(0, 1);
        assert!(!m.is_available(0, 1));
        assert!(m.is_available(0, 0));
        assert!(m.is_available(1, 1));
        assert_eq!(m.total_available(), 5);
    }

    #[test]
    fn test_available_people() {
        let mut m = AvailabilityMatrix::new(3, 2);
        m.mark_unavailable(1, 0);
        assert_eq!(m.available_people(0), vec![0, 2]);
        assert_eq!(m.available_people(1), vec![0, 1, 2]);
    }

    #[test]
    fn test_available_block_count() {
        let mut m = AvailabilityMatrix::new(1, 4);
        m.mark_unavailable(0, 0);
        m.mark_unavailable(0, 3);
        assert_eq!(m.available_block_count(0), 2);
    }

    #[test]
    fn test_out_of_range_is_unavailable() {
        let m = AvailabilityMatrix::new(1, 1);
        assert!(!m.is_available(5, 0));
        assert!(!m.is_available(0, 5));
    }
}
