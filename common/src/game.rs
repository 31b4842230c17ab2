use std::fmt;

use itertools::iproduct;
use rand::Rng;
use tracing::{debug, info, instrument};

use crate::{Board, BoardError, Cell, InferenceEngine, Move, MoveKind};

/// Value of a hidden cell in [`Game::cells`].
pub const HIDDEN: i8 = -1;
/// Value of a flagged cell in [`Game::cells`].
pub const FLAGGED: i8 = -2;
/// Value of the mine that ended the game in [`Game::cells`].
pub const EXPLODED: i8 = -3;

/// Represents the current state of the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum GameState {
    Playing,
    Won,
    Lost,
    /// No cell was left to probe but the flags do not match the mines.
    Stuck,
}

/// A single probe and what it revealed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Turn {
    pub cell: Cell,
    /// How the engine picked the cell; `None` when the caller chose it with [`Game::reveal`].
    pub kind: Option<MoveKind>,
    /// The nearby mine count, or `None` if the cell was a mine.
    pub revealed: Option<u8>,
}

/// A board and the engine playing it.
///
/// The game is the only place the two meet: it probes the board on the engine's
/// behalf, feeds the revealed counts back, and flags whatever the engine proves
/// to be a mine.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Game {
    board: Board,
    engine: InferenceEngine,
    state: GameState,
    /// Probed cells with their counts, in the order they were revealed.
    revealed: Vec<(Cell, u8)>,
    exploded: Option<Cell>,
}

impl Game {
    pub fn new<R: Rng + ?Sized>(
        height: usize,
        width: usize,
        mines: usize,
        rng: &mut R,
    ) -> Result<Self, BoardError> {
        Ok(Self::from_board(Board::new(height, width, mines, rng)?))
    }

    pub fn from_board(board: Board) -> Self {
        Game {
            engine: InferenceEngine::new(board.height(), board.width()),
            board,
            state: GameState::Playing,
            revealed: Vec::new(),
            exploded: None,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn engine(&self) -> &InferenceEngine {
        &self.engine
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn revealed(&self) -> &[(Cell, u8)] {
        &self.revealed
    }

    /// Plays one engine move.
    ///
    /// Returns `Ok(None)` when the game ended without a probe: either every mine
    /// is flagged, or the engine has nothing left to try.
    #[instrument(level = "debug", skip_all, fields(moves = self.revealed.len()))]
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> anyhow::Result<Option<Turn>> {
        if self.state != GameState::Playing {
            anyhow::bail!("game_ended");
        }

        self.apply_mine_total();
        if self.board.won() {
            self.state = GameState::Won;
            return Ok(None);
        }

        let Some(Move { cell, kind }) = self.engine.next_move(rng) else {
            debug!("no move left");
            self.state = GameState::Stuck;
            return Ok(None);
        };

        debug!(%cell, ?kind, "probing");
        Ok(Some(self.probe(cell, Some(kind))))
    }

    /// Probes a cell chosen by the caller instead of the engine.
    pub fn reveal(&mut self, cell: Cell) -> anyhow::Result<Turn> {
        if self.state != GameState::Playing {
            anyhow::bail!("game_ended");
        }
        if cell.row >= self.board.height() || cell.col >= self.board.width() {
            anyhow::bail!("out_of_bounds: {cell}");
        }
        if self.engine.moves_made().contains(&cell) {
            anyhow::bail!("already_revealed: {cell}");
        }
        Ok(self.probe(cell, None))
    }

    /// Steps until the game is over.
    pub fn play<R: Rng + ?Sized>(&mut self, rng: &mut R) -> anyhow::Result<GameState> {
        while self.state == GameState::Playing {
            self.step(rng)?;
        }
        info!(state = ?self.state, moves = self.revealed.len(), "game over");
        Ok(self.state)
    }

    fn probe(&mut self, cell: Cell, kind: Option<MoveKind>) -> Turn {
        if self.board.is_mine(cell) {
            self.exploded = Some(cell);
            self.state = GameState::Lost;
            return Turn {
                cell,
                kind,
                revealed: None,
            };
        }

        let count = self.board.nearby_mine_count(cell);
        self.engine.add_knowledge(cell, count);
        self.revealed.push((cell, count));
        self.flag_known_mines();

        if self.board.won() {
            self.state = GameState::Won;
        }

        Turn {
            cell,
            kind,
            revealed: Some(count),
        }
    }

    /// When as many cells remain unprobed as there are mines, every one of them is a mine.
    fn apply_mine_total(&mut self) {
        let unprobed: Vec<Cell> = iproduct!(0..self.board.height(), 0..self.board.width())
            .map(Cell::from)
            .filter(|cell| !self.engine.moves_made().contains(cell))
            .collect();

        if unprobed.len() == self.board.mine_count() {
            for cell in unprobed {
                self.engine.mark_mine(cell);
            }
            self.flag_known_mines();
        }
    }

    fn flag_known_mines(&mut self) {
        for &cell in self.engine.mines() {
            self.board.flag(cell);
        }
    }

    /// Row-major view of the board as the player sees it: the revealed count,
    /// or one of [`HIDDEN`], [`FLAGGED`] and [`EXPLODED`].
    pub fn cells(&self) -> Vec<i8> {
        let width = self.board.width();
        let mut cells = vec![HIDDEN; self.board.height() * width];
        for cell in self.board.mines_found() {
            cells[cell.row * width + cell.col] = FLAGGED;
        }
        for &(cell, count) in &self.revealed {
            cells[cell.row * width + cell.col] = count as i8;
        }
        if let Some(cell) = self.exploded {
            cells[cell.row * width + cell.col] = EXPLODED;
        }
        cells
    }

    /// Deserializes a game from bytes.
    ///
    /// The bytes come from outside the process, so the decoded game is checked
    /// against the same rules a freshly built one satisfies.
    pub fn deserialize(bts: &[u8]) -> anyhow::Result<Self> {
        let game: Game = bcs::from_bytes(bts)?;
        game.validate()?;
        Ok(game)
    }

    fn validate(&self) -> anyhow::Result<()> {
        self.board.validate()?;

        let (height, width) = (self.board.height(), self.board.width());
        if (self.engine.height(), self.engine.width()) != (height, width) {
            anyhow::bail!(
                "engine_size_mismatch: {}x{} engine on a {height}x{width} board",
                self.engine.height(),
                self.engine.width()
            );
        }

        let engine_cells = self
            .engine
            .moves_made()
            .iter()
            .chain(self.engine.safes())
            .chain(self.engine.mines())
            .chain(self.engine.knowledge().iter().flat_map(|sentence| sentence.cells()));
        let game_cells = self.revealed.iter().map(|(cell, _)| cell).chain(&self.exploded);
        if let Some(cell) = engine_cells
            .chain(game_cells)
            .find(|cell| cell.row >= height || cell.col >= width)
        {
            anyhow::bail!("out_of_bounds: {cell}");
        }

        Ok(())
    }

    /// Serializes the game to bytes.
    pub fn serialize(&self) -> anyhow::Result<Vec<u8>> {
        Ok(bcs::to_bytes(self)?)
    }
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.board.width();

        write!(f, "   ")?;
        for col in 0..width {
            write!(f, "{col:^3}")?;
        }
        writeln!(f)?;
        writeln!(f, "  +{}", "---".repeat(width))?;

        for (row, cells) in self.cells().chunks(width).enumerate() {
            write!(f, "{row:^2}|")?;
            for &cell in cells {
                match cell {
                    HIDDEN => write!(f, " ■ ")?,
                    FLAGGED => write!(f, " F ")?,
                    EXPLODED => write!(f, " * ")?,
                    n => write!(f, " {n} ")?,
                }
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn single_row() -> Game {
        Game::from_board(Board::with_mines(1, 3, [Cell::new(0, 2)]).unwrap())
    }

    #[test]
    fn test_reveal_then_deduce() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut game = single_row();

        let turn = game.reveal(Cell::new(0, 0)).unwrap();
        assert_eq!(turn.revealed, Some(0));
        assert_eq!(turn.kind, None);
        assert_eq!(game.state(), GameState::Playing);

        let turn = game.step(&mut rng).unwrap().unwrap();
        assert_eq!(turn.cell, Cell::new(0, 1));
        assert_eq!(turn.kind, Some(MoveKind::Safe));
        assert_eq!(turn.revealed, Some(1));

        assert!(game.engine().mines().contains(&Cell::new(0, 2)));
        assert_eq!(game.state(), GameState::Won);
        assert!(game.board().won());
    }

    #[test]
    fn test_step_after_game_over_fails() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut game = single_row();
        game.reveal(Cell::new(0, 2)).unwrap();
        assert_eq!(game.state(), GameState::Lost);

        let err = game.step(&mut rng).unwrap_err();
        assert_eq!(err.to_string(), "game_ended");
        assert!(game.reveal(Cell::new(0, 0)).is_err());
    }

    #[test]
    fn test_reveal_rejects_bad_cells() {
        let mut game = single_row();
        assert!(game.reveal(Cell::new(1, 0)).is_err());
        game.reveal(Cell::new(0, 0)).unwrap();
        assert_eq!(
            game.reveal(Cell::new(0, 0)).unwrap_err().to_string(),
            "already_revealed: (0, 0)"
        );
    }

    #[test]
    fn test_mine_total_flags_the_rest() {
        // X X
        // X .
        let board = Board::with_mines(2, 2, [Cell::new(0, 0), Cell::new(0, 1), Cell::new(1, 0)])
            .unwrap();
        let mut game = Game::from_board(board);
        let mut rng = StdRng::seed_from_u64(0);

        game.reveal(Cell::new(1, 1)).unwrap();
        assert_eq!(game.state(), GameState::Won);
        assert!(game.step(&mut rng).is_err());

        // Without a clue, the total alone is not enough
        let board = Board::with_mines(2, 2, [Cell::new(0, 0)]).unwrap();
        let mut game = Game::from_board(board);
        game.apply_mine_total();
        assert!(game.engine().mines().is_empty());
    }

    #[test]
    fn test_played_games_finish_and_flags_are_mines() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..25 {
            let mut game = Game::new(8, 8, 10, &mut rng).unwrap();
            let state = game.play(&mut rng).unwrap();

            assert_ne!(state, GameState::Playing);
            assert!(game.board().mines_found().is_subset(game.board().mines()));
            match state {
                GameState::Won => assert_eq!(game.board().mines_found(), game.board().mines()),
                GameState::Lost => {
                    let exploded = game.exploded.unwrap();
                    assert!(game.board().is_mine(exploded));
                    assert!(!game.engine().safes().contains(&exploded));
                }
                _ => {}
            }
        }
    }

    #[test]
    fn test_serialization_round_trip() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut game = Game::new(5, 5, 3, &mut rng).unwrap();
        game.step(&mut rng).unwrap();

        let bytes = game.serialize().unwrap();
        assert_eq!(Game::deserialize(&bytes).unwrap(), game);
        assert!(Game::deserialize(&bytes[..bytes.len() / 2]).is_err());
    }

    #[test]
    fn test_deserialize_rejects_cells_off_the_board() {
        let mut game = single_row();
        game.reveal(Cell::new(0, 0)).unwrap();

        let mut revealed_outside = game.clone();
        revealed_outside.revealed.push((Cell::new(4, 4), 1));
        let bytes = revealed_outside.serialize().unwrap();
        assert_eq!(
            Game::deserialize(&bytes).unwrap_err().to_string(),
            "out_of_bounds: (4, 4)"
        );

        let mut exploded_outside = game.clone();
        exploded_outside.exploded = Some(Cell::new(0, 9));
        let bytes = exploded_outside.serialize().unwrap();
        assert!(Game::deserialize(&bytes).is_err());

        let mut engine_outside = game.clone();
        engine_outside.engine.mark_mine(Cell::new(3, 0));
        let bytes = engine_outside.serialize().unwrap();
        assert!(Game::deserialize(&bytes).is_err());

        let mut mismatched = game.clone();
        mismatched.engine = InferenceEngine::new(2, 3);
        let bytes = mismatched.serialize().unwrap();
        assert!(Game::deserialize(&bytes).is_err());

        let bytes = game.serialize().unwrap();
        assert_eq!(Game::deserialize(&bytes).unwrap(), game);
    }

    #[test]
    fn test_cells_and_display() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut game = single_row();
        assert_eq!(game.cells(), vec![HIDDEN, HIDDEN, HIDDEN]);

        game.reveal(Cell::new(0, 0)).unwrap();
        game.step(&mut rng).unwrap();

        assert_eq!(game.cells(), vec![0, 1, FLAGGED]);
        assert_eq!(game.to_string(), "    0  1  2 \n  +---------\n0 | 0  1  F \n");
    }

    #[test]
    fn test_exploded_cell_is_shown() {
        let mut game = single_row();
        game.reveal(Cell::new(0, 2)).unwrap();
        assert_eq!(game.cells(), vec![HIDDEN, HIDDEN, EXPLODED]);
    }
}
