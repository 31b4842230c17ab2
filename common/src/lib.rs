//! A Minesweeper board paired with a propositional-logic player.
//!
//! The player keeps a knowledge base of [`Sentence`]s ("exactly `count` of these
//! cells are mines") and combines them by subset resolution to find cells that
//! are certainly safe or certainly mines. [`Game`] wires a [`Board`] and an
//! [`InferenceEngine`] together and plays turn by turn.

use std::fmt;

pub mod board;
pub mod engine;
pub mod game;
pub mod sentence;

pub use board::{Board, BoardError};
pub use engine::{InferenceEngine, Move, MoveKind};
pub use game::{Game, GameState, Turn};
pub use sentence::Sentence;

/// A `(row, col)` coordinate on the board, 0-indexed from the top-left corner.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
}

impl Cell {
    pub const fn new(row: usize, col: usize) -> Self {
        Cell { row, col }
    }
}

impl From<(usize, usize)> for Cell {
    fn from((row, col): (usize, usize)) -> Self {
        Cell::new(row, col)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// All in-bounds cells within one row and column of `cell`, not including `cell` itself.
pub fn neighbors(cell: Cell, height: usize, width: usize) -> impl Iterator<Item = Cell> {
    (-1isize..=1).flat_map(move |dr| {
        (-1isize..=1).filter_map(move |dc| {
            if dr == 0 && dc == 0 {
                return None;
            }

            let row = cell.row as isize + dr;
            let col = cell.col as isize + dc;

            if row >= 0 && row < height as isize && col >= 0 && col < width as isize {
                Some(Cell::new(row as usize, col as usize))
            } else {
                None
            }
        })
    })
}
