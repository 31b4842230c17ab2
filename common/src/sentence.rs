use std::collections::BTreeSet;
use std::fmt;

use itertools::Itertools;

use crate::Cell;

/// A logical statement about the board: exactly `count` of `cells` are mines.
///
/// Two sentences are equal when they hold the same cells and the same count,
/// regardless of the order the cells were added in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Sentence {
    cells: BTreeSet<Cell>,
    count: usize,
}

impl Sentence {
    pub fn new(cells: impl IntoIterator<Item = Cell>, count: usize) -> Self {
        let cells: BTreeSet<Cell> = cells.into_iter().collect();
        debug_assert!(count <= cells.len(), "{count} mines among {} cells", cells.len());
        Sentence { cells, count }
    }

    pub fn cells(&self) -> &BTreeSet<Cell> {
        &self.cells
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn contains(&self, cell: Cell) -> bool {
        self.cells.contains(&cell)
    }

    /// Cells that must be mines: all of them when the count equals the number of cells.
    pub fn known_mines(&self) -> BTreeSet<Cell> {
        if self.count > 0 && self.cells.len() == self.count {
            self.cells.clone()
        } else {
            BTreeSet::new()
        }
    }

    /// Cells that must be safe: all of them when the count is zero.
    pub fn known_safes(&self) -> BTreeSet<Cell> {
        if self.count == 0 {
            self.cells.clone()
        } else {
            BTreeSet::new()
        }
    }

    /// Drops a cell known to be a mine, which accounts for one of the counted mines.
    pub fn mark_mine(&mut self, cell: Cell) {
        if self.cells.remove(&cell) {
            debug_assert!(self.count > 0, "mine {cell} marked in a sentence with no mines left");
            self.count = self.count.saturating_sub(1);
        }
    }

    /// Drops a cell known to be safe. The count is unchanged.
    pub fn mark_safe(&mut self, cell: Cell) {
        self.cells.remove(&cell);
    }

    pub fn is_subset(&self, other: &Sentence) -> bool {
        self.cells.is_subset(&other.cells)
    }

    /// Subset resolution: if `self` ⊆ `superset`, the cells only `superset` holds
    /// contain exactly `superset.count - self.count` mines.
    ///
    /// Returns `None` when `self` is not a subset, or when its count exceeds the
    /// superset's (the two sentences contradict each other).
    pub fn difference(&self, superset: &Sentence) -> Option<Sentence> {
        if !self.is_subset(superset) {
            return None;
        }
        let count = superset.count.checked_sub(self.count)?;
        let cells: BTreeSet<Cell> = superset.cells.difference(&self.cells).copied().collect();
        if count > cells.len() {
            return None;
        }
        Some(Sentence { cells, count })
    }
}

impl fmt::Display for Sentence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}} = {}", self.cells.iter().join(", "), self.count)
    }
}
