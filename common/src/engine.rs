use std::collections::{BTreeSet, HashSet};

use itertools::{Itertools, iproduct};
use rand::Rng;
use rand::seq::IndexedRandom;
use tracing::{debug, instrument, trace, warn};

use crate::{Cell, Sentence, neighbors};

/// How the player arrived at a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum MoveKind {
    /// The cell was proven safe.
    Safe,
    /// Nothing was provably safe, so the cell is a guess.
    Random,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Move {
    pub cell: Cell,
    pub kind: MoveKind,
}

/// The player's beliefs about the board.
///
/// Every cell recorded in `safes` or `mines` has already been removed from every
/// sentence in `knowledge`, and the two sets never overlap.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct InferenceEngine {
    height: usize,
    width: usize,
    /// Cells already probed.
    moves_made: BTreeSet<Cell>,
    safes: BTreeSet<Cell>,
    mines: BTreeSet<Cell>,
    /// Sentences known to be true. Never holds two equal sentences.
    knowledge: Vec<Sentence>,
}

impl InferenceEngine {
    pub fn new(height: usize, width: usize) -> Self {
        InferenceEngine {
            height,
            width,
            moves_made: BTreeSet::new(),
            safes: BTreeSet::new(),
            mines: BTreeSet::new(),
            knowledge: Vec::new(),
        }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn moves_made(&self) -> &BTreeSet<Cell> {
        &self.moves_made
    }

    pub fn safes(&self) -> &BTreeSet<Cell> {
        &self.safes
    }

    pub fn mines(&self) -> &BTreeSet<Cell> {
        &self.mines
    }

    pub fn knowledge(&self) -> &[Sentence] {
        &self.knowledge
    }

    /// Records `cell` as a mine and strikes it from every sentence.
    ///
    /// Returns `true` if the cell was not known to be a mine before. A cell
    /// already known to be safe is left alone.
    pub fn mark_mine(&mut self, cell: Cell) -> bool {
        if self.safes.contains(&cell) {
            warn!(%cell, "refusing to mark a known safe cell as a mine");
            return false;
        }
        let added = self.mines.insert(cell);
        for sentence in &mut self.knowledge {
            sentence.mark_mine(cell);
        }
        added
    }

    /// Records `cell` as safe and strikes it from every sentence.
    ///
    /// Returns `true` if the cell was not known to be safe before. A cell
    /// already known to be a mine is left alone.
    pub fn mark_safe(&mut self, cell: Cell) -> bool {
        if self.mines.contains(&cell) {
            warn!(%cell, "refusing to mark a known mine as safe");
            return false;
        }
        let added = self.safes.insert(cell);
        for sentence in &mut self.knowledge {
            sentence.mark_safe(cell);
        }
        added
    }

    /// Takes in the clue revealed by probing `cell`: `count` of its neighbors are mines.
    ///
    /// The cell is recorded as a move and as safe, a sentence over its still
    /// undetermined neighbors joins the knowledge base, and inference runs until
    /// nothing new can be concluded.
    #[instrument(level = "debug", skip(self))]
    pub fn add_knowledge(&mut self, cell: Cell, count: u8) {
        self.moves_made.insert(cell);
        self.mark_safe(cell);

        let mut count = usize::from(count);
        let mut undetermined = BTreeSet::new();
        for neighbor in neighbors(cell, self.height, self.width) {
            if self.mines.contains(&neighbor) {
                debug_assert!(count > 0, "clue at {cell} is lower than its known mines");
                count = count.saturating_sub(1);
            } else if !self.safes.contains(&neighbor) {
                undetermined.insert(neighbor);
            }
        }

        if !undetermined.is_empty() {
            let sentence = Sentence::new(undetermined, count);
            debug!(%sentence, "new sentence");
            if !self.knowledge.contains(&sentence) {
                self.knowledge.push(sentence);
            }
        }

        self.infer();
    }

    /// Marks every conclusion the knowledge base allows and derives new sentences
    /// by subset resolution, until a full pass changes nothing.
    fn infer(&mut self) {
        for pass in 1usize.. {
            let mut changed = false;

            let mut safes = BTreeSet::new();
            let mut mines = BTreeSet::new();
            for sentence in &self.knowledge {
                safes.extend(sentence.known_safes());
                mines.extend(sentence.known_mines());
            }

            for cell in safes {
                if self.mark_safe(cell) {
                    debug!(%cell, "deduced safe");
                    changed = true;
                }
            }
            for cell in mines {
                if self.mark_mine(cell) {
                    debug!(%cell, "deduced mine");
                    changed = true;
                }
            }

            self.tidy_knowledge();

            let known: HashSet<&Sentence> = self.knowledge.iter().collect();
            let inferred: Vec<Sentence> = iproduct!(&self.knowledge, &self.knowledge)
                .filter(|(subset, superset)| subset != superset)
                .filter_map(|(subset, superset)| subset.difference(superset))
                .filter(|sentence| !sentence.is_empty() && !known.contains(sentence))
                .unique()
                .collect();

            if !inferred.is_empty() {
                for sentence in &inferred {
                    debug!(%sentence, "inferred sentence");
                }
                self.knowledge.extend(inferred);
                changed = true;
            }

            trace!(pass, sentences = self.knowledge.len(), "inference pass");
            if !changed {
                break;
            }
        }
    }

    /// Drops sentences that have run out of cells, and duplicates that marking left behind.
    fn tidy_knowledge(&mut self) {
        let mut seen = HashSet::new();
        self.knowledge
            .retain(|sentence| !sentence.is_empty() && seen.insert(sentence.clone()));
    }

    /// A cell proven safe that has not been probed yet.
    pub fn make_safe_move(&self) -> Option<Cell> {
        self.safes.difference(&self.moves_made).next().copied()
    }

    /// A uniformly random cell that has not been probed and is not a known mine.
    pub fn make_random_move<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Cell> {
        let choices: Vec<Cell> = iproduct!(0..self.height, 0..self.width)
            .map(Cell::from)
            .filter(|cell| !self.moves_made.contains(cell) && !self.mines.contains(cell))
            .collect();
        choices.choose(rng).copied()
    }

    /// The next cell to probe: a safe one if any is known, otherwise a guess.
    pub fn next_move<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Move> {
        if let Some(cell) = self.make_safe_move() {
            return Some(Move {
                cell,
                kind: MoveKind::Safe,
            });
        }
        self.make_random_move(rng).map(|cell| Move {
            cell,
            kind: MoveKind::Random,
        })
    }
}
