use std::collections::BTreeSet;
use std::fmt;

use rand::Rng;
use rand::seq::index;

use crate::{Cell, neighbors};

/// Reasons a board configuration is refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    #[error("board must have at least one row and one column, got {height}x{width}")]
    EmptyGrid { height: usize, width: usize },
    #[error("a {height}x{width} board has more cells than can be addressed")]
    TooLarge { height: usize, width: usize },
    #[error("too many mines: {mines} requested but a board of {cells} cells needs at least one safe cell")]
    TooManyMines { mines: usize, cells: usize },
    #[error("mine at {cell} is outside of the {height}x{width} board")]
    OutOfBounds {
        cell: Cell,
        height: usize,
        width: usize,
    },
}

/// Ground truth of a game: where the mines are, and which ones the player has flagged.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Board {
    height: usize,
    width: usize,
    mines: BTreeSet<Cell>,
    /// Cells flagged as mines by the player. Only ever grows.
    mines_found: BTreeSet<Cell>,
}

impl Board {
    /// Places `mines` mines on distinct cells chosen uniformly at random.
    pub fn new<R: Rng + ?Sized>(
        height: usize,
        width: usize,
        mines: usize,
        rng: &mut R,
    ) -> Result<Self, BoardError> {
        check_size(height, width, mines)?;

        let mines = index::sample(rng, height * width, mines)
            .into_iter()
            .map(|i| Cell::new(i / width, i % width))
            .collect();

        Ok(Board {
            height,
            width,
            mines,
            mines_found: BTreeSet::new(),
        })
    }

    /// Builds a board with mines on exactly the given cells.
    pub fn with_mines(
        height: usize,
        width: usize,
        mines: impl IntoIterator<Item = Cell>,
    ) -> Result<Self, BoardError> {
        let mines: BTreeSet<Cell> = mines.into_iter().collect();
        check_size(height, width, mines.len())?;
        check_bounds(&mines, height, width)?;

        Ok(Board {
            height,
            width,
            mines,
            mines_found: BTreeSet::new(),
        })
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn mine_count(&self) -> usize {
        self.mines.len()
    }

    pub fn mines(&self) -> &BTreeSet<Cell> {
        &self.mines
    }

    pub fn mines_found(&self) -> &BTreeSet<Cell> {
        &self.mines_found
    }

    pub fn is_mine(&self, cell: Cell) -> bool {
        self.mines.contains(&cell)
    }

    /// Number of mines within one row and column of `cell`, not including the cell itself.
    pub fn nearby_mine_count(&self, cell: Cell) -> u8 {
        neighbors(cell, self.height, self.width)
            .filter(|&neighbor| self.is_mine(neighbor))
            .count() as u8
    }

    /// Records that the player flagged `cell` as a mine. Returns `false` if it was already flagged.
    pub fn flag(&mut self, cell: Cell) -> bool {
        self.mines_found.insert(cell)
    }

    /// The game is won once the flagged cells are exactly the mines.
    pub fn won(&self) -> bool {
        self.mines_found == self.mines
    }

    /// Re-checks the construction rules, for boards that did not come from a constructor.
    pub fn validate(&self) -> Result<(), BoardError> {
        check_size(self.height, self.width, self.mines.len())?;
        check_bounds(&self.mines, self.height, self.width)?;
        check_bounds(&self.mines_found, self.height, self.width)
    }
}

fn check_size(height: usize, width: usize, mines: usize) -> Result<(), BoardError> {
    if height == 0 || width == 0 {
        return Err(BoardError::EmptyGrid { height, width });
    }
    let cells = height
        .checked_mul(width)
        .filter(|&cells| cells <= isize::MAX as usize)
        .ok_or(BoardError::TooLarge { height, width })?;
    if mines >= cells {
        return Err(BoardError::TooManyMines { mines, cells });
    }
    Ok(())
}

fn check_bounds(cells: &BTreeSet<Cell>, height: usize, width: usize) -> Result<(), BoardError> {
    match cells
        .iter()
        .find(|cell| cell.row >= height || cell.col >= width)
    {
        Some(&cell) => Err(BoardError::OutOfBounds {
            cell,
            height,
            width,
        }),
        None => Ok(()),
    }
}

/// Prints where the mines are, one `|X` or `| ` per cell.
impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let separator = format!("{}-", "--".repeat(self.width));
        for row in 0..self.height {
            writeln!(f, "{separator}")?;
            for col in 0..self.width {
                if self.is_mine(Cell::new(row, col)) {
                    write!(f, "|X")?;
                } else {
                    write!(f, "| ")?;
                }
            }
            writeln!(f, "|")?;
        }
        writeln!(f, "{separator}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_random_placement_counts() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let board = Board::new(8, 8, 10, &mut rng).unwrap();
            assert_eq!(board.mine_count(), 10);
            assert!(board.mines().iter().all(|c| c.row < 8 && c.col < 8));
            assert!(board.mines_found().is_empty());
        }
    }

    #[test]
    fn test_placement_is_reproducible_with_seed() {
        let a = Board::new(6, 9, 12, &mut StdRng::seed_from_u64(42)).unwrap();
        let b = Board::new(6, 9, 12, &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rejects_full_board() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            Board::new(3, 3, 9, &mut rng),
            Err(BoardError::TooManyMines { mines: 9, cells: 9 })
        );
        assert!(Board::new(3, 3, 8, &mut rng).is_ok());
    }

    #[test]
    fn test_rejects_empty_grid() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            Board::new(0, 4, 0, &mut rng),
            Err(BoardError::EmptyGrid {
                height: 0,
                width: 4
            })
        );
    }

    #[test]
    fn test_rejects_grid_too_large_to_address() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            Board::new(usize::MAX, 2, 1, &mut rng),
            Err(BoardError::TooLarge {
                height: usize::MAX,
                width: 2
            })
        );
        assert!(matches!(
            Board::new(usize::MAX / 2 + 2, 2, 1, &mut rng),
            Err(BoardError::TooLarge { .. })
        ));
        assert!(matches!(
            Board::with_mines(2, usize::MAX, Vec::new()),
            Err(BoardError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_validate() {
        let board = Board::with_mines(2, 2, [Cell::new(1, 1)]).unwrap();
        assert_eq!(board.validate(), Ok(()));

        let mut flagged_outside = board.clone();
        flagged_outside.flag(Cell::new(0, 7));
        assert!(matches!(
            flagged_outside.validate(),
            Err(BoardError::OutOfBounds { .. })
        ));

        let mut mine_outside = board.clone();
        mine_outside.mines.insert(Cell::new(5, 0));
        assert!(matches!(
            mine_outside.validate(),
            Err(BoardError::OutOfBounds { .. })
        ));

        let emptied = Board {
            height: 0,
            ..board
        };
        assert!(matches!(emptied.validate(), Err(BoardError::EmptyGrid { .. })));
    }

    #[test]
    fn test_with_mines_rejects_out_of_bounds() {
        let err = Board::with_mines(2, 2, [Cell::new(2, 0)]).unwrap_err();
        assert!(matches!(err, BoardError::OutOfBounds { .. }));
        assert_eq!(err.to_string(), "mine at (2, 0) is outside of the 2x2 board");
    }

    #[test]
    fn test_nearby_mine_count() {
        // . X .
        // . . .
        // X . X
        let board = Board::with_mines(
            3,
            3,
            [Cell::new(0, 1), Cell::new(2, 0), Cell::new(2, 2)],
        )
        .unwrap();

        assert_eq!(board.nearby_mine_count(Cell::new(1, 1)), 3);
        assert_eq!(board.nearby_mine_count(Cell::new(0, 0)), 1);
        assert_eq!(board.nearby_mine_count(Cell::new(2, 1)), 2);
        // The cell itself is not counted
        assert_eq!(board.nearby_mine_count(Cell::new(0, 1)), 0);
        assert!(board.is_mine(Cell::new(2, 2)));
        assert!(!board.is_mine(Cell::new(1, 1)));
    }

    #[test]
    fn test_won_requires_exact_mine_set() {
        let mut board = Board::with_mines(2, 2, [Cell::new(0, 0)]).unwrap();
        assert!(!board.won());

        // Same cardinality, wrong cell
        board.flag(Cell::new(1, 1));
        assert!(!board.won());

        let mut board = Board::with_mines(2, 2, [Cell::new(0, 0)]).unwrap();
        assert!(board.flag(Cell::new(0, 0)));
        assert!(!board.flag(Cell::new(0, 0)));
        assert!(board.won());
    }

    #[test]
    fn test_display() {
        let board = Board::with_mines(1, 2, [Cell::new(0, 1)]).unwrap();
        assert_eq!(board.to_string(), "-----\n| |X|\n-----\n");
    }
}
