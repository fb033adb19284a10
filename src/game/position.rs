//! Provides fully-specified Ultimate Tic-Tac-Toe [`Position`]: marks of both
//! players on each of the nine sub-boards, sub-boards claimed by each player,
//! the side to move and the last move played (which decides where the
//! opponent has to play).
//!
//! The move generator and move making are also implemented here as the only
//! ways to mutate a [`Position`].

use std::fmt;

use anyhow::{bail, Context};
use arrayvec::ArrayVec;
use thiserror::Error;

use crate::environment::{Outcome, Player};
use crate::game::bitboard::{self, Bitboard};
use crate::game::core::{Cell, Move, CELLS, GRID_SIZE, GRID_WIDTH};

/// Legal moves never exceed the number of cells on the board.
pub type MoveList = ArrayVec<Move, GRID_SIZE>;

/// A move that is not in the legal set of the position it was played in.
///
/// This is a logic error: the engine only plays moves it generated itself and
/// the opponent's moves come from the referee.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error(
    "illegal move {} in sub-board {} (X: {:#011b}, O: {:#011b})",
    .attempted,
    .attempted.board(),
    .first.bits(),
    .second.bits()
)]
pub struct InvalidMoveError {
    /// The rejected move.
    pub attempted: Move,
    /// Marks of [`Player::One`] in the target sub-board.
    pub first: Bitboard,
    /// Marks of [`Player::Two`] in the target sub-board.
    pub second: Bitboard,
}

/// State of the game. [`Position::try_from()`] and [`fmt::Display`] provide a
/// compact text notation:
///
/// ```text
/// <row 0>/<row 1>/.../<row 8> <side to move> <last move | ->
/// ```
///
/// where each row holds 9 characters of the flattened grid (`X`, `O` or `.`),
/// e.g. `"........./........./........./........./....X..../........./........./........./......... O 4 4"`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Position {
    /// Marks of each player, indexed by [`Player::index`] and sub-board index.
    boards: [[Bitboard; CELLS as usize]; 2],
    /// Sub-boards won by each player.
    claimed: [Bitboard; 2],
    side_to_move: Player,
    last_move: Option<Move>,
}

impl Position {
    /// Creates the empty board with [`Player::One`] to move.
    ///
    /// ```
    /// use ultimate::game::Position;
    ///
    /// let position = Position::starting();
    /// assert_eq!(position.actions().len(), 81);
    /// assert!(position.outcome().is_none());
    /// ```
    #[must_use]
    pub fn starting() -> Self {
        Self {
            boards: [[Bitboard::empty(); CELLS as usize]; 2],
            claimed: [Bitboard::empty(); 2],
            side_to_move: Player::One,
            last_move: None,
        }
    }

    #[must_use]
    pub const fn us(&self) -> Player {
        self.side_to_move
    }

    #[must_use]
    pub fn they(&self) -> Player {
        !self.side_to_move
    }

    #[must_use]
    pub const fn last_move(&self) -> Option<Move> {
        self.last_move
    }

    /// Marks of `player` in the given sub-board.
    #[must_use]
    pub const fn marks(&self, player: Player, board: Cell) -> Bitboard {
        self.boards[player.index()][board.index() as usize]
    }

    /// Union of both players' marks in the given sub-board.
    #[must_use]
    pub fn occupancy(&self, board: Cell) -> Bitboard {
        self.marks(Player::One, board) | self.marks(Player::Two, board)
    }

    /// Sub-boards won by `player`, in big-board coordinates.
    #[must_use]
    pub const fn claimed(&self, player: Player) -> Bitboard {
        self.claimed[player.index()]
    }

    /// A sub-board is decided when it is won by either player or full. Decided
    /// sub-boards never produce legal moves.
    #[must_use]
    pub const fn is_decided(&self, board: Cell) -> bool {
        bitboard::is_terminal(
            self.marks(Player::One, board),
            self.marks(Player::Two, board),
        )
    }

    /// Sub-board the side to move has to play in, or `None` when any undecided
    /// sub-board is allowed (first move or the target is already decided).
    #[must_use]
    pub fn forced_board(&self) -> Option<Cell> {
        self.last_move
            .map(Move::forced_board)
            .filter(|&board| !self.is_decided(board))
    }

    /// Generates moves following the forcing rule, regardless of whether the
    /// big board is already decided. Use [`Position::actions`] to respect the
    /// end of the game.
    #[must_use]
    pub fn legal_moves(&self) -> MoveList {
        let mut moves = MoveList::new();
        match self.forced_board() {
            Some(board) => self.push_moves(board, &mut moves),
            None => {
                for board in Cell::iter().filter(|&board| !self.is_decided(board)) {
                    self.push_moves(board, &mut moves);
                }
            },
        }
        moves
    }

    fn push_moves(&self, board: Cell, moves: &mut MoveList) {
        for &mask in bitboard::legal_moves(self.occupancy(board)) {
            if let Some(next_move) = Move::from_mask(board, mask) {
                moves.push(next_move);
            }
        }
    }

    /// Moves available to the side to move: empty once the game is over.
    #[must_use]
    pub fn actions(&self) -> MoveList {
        if self.outcome().is_some() {
            return MoveList::new();
        }
        self.legal_moves()
    }

    #[must_use]
    pub fn is_legal(&self, candidate: Move) -> bool {
        self.actions().contains(&candidate)
    }

    /// Returns the result of the game or `None` if it is still in progress.
    ///
    /// A player wins by claiming three sub-boards in a row. The game is drawn
    /// once every sub-board is decided without such a line, which is also
    /// exactly the moment when no legal moves are left.
    #[must_use]
    pub fn outcome(&self) -> Option<Outcome> {
        if self.claimed(Player::One).has_won() {
            return Some(Outcome::Win(Player::One));
        }
        if self.claimed(Player::Two).has_won() {
            return Some(Outcome::Win(Player::Two));
        }
        if Cell::iter().all(|board| self.is_decided(board)) {
            return Some(Outcome::Draw);
        }
        None
    }

    /// Applies the move without checking its legality. This is the hot path
    /// for playouts: the move has to come from [`Position::actions`].
    pub fn make_move(&mut self, next_move: Move) {
        debug_assert!(
            self.is_legal(next_move),
            "illegal move {next_move} in position {self}"
        );
        let player = self.side_to_move.index();
        let board = next_move.board();
        let marks = &mut self.boards[player][board.index() as usize];
        *marks |= next_move.mask();
        if marks.has_won() {
            self.claimed[player] |= board.mask();
        }
        self.side_to_move = !self.side_to_move;
        self.last_move = Some(next_move);
    }

    /// Checks the move against the legal set and applies it.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidMoveError`] with the state of the target sub-board if
    /// the move is not legal.
    pub fn play(&mut self, next_move: Move) -> Result<(), InvalidMoveError> {
        if !self.is_legal(next_move) {
            return Err(InvalidMoveError {
                attempted: next_move,
                first: self.marks(Player::One, next_move.board()),
                second: self.marks(Player::Two, next_move.board()),
            });
        }
        self.make_move(next_move);
        Ok(())
    }

    fn mark_at(&self, target: Move) -> char {
        if self.marks(Player::One, target.board()).is_set(target.cell()) {
            'X'
        } else if self.marks(Player::Two, target.board()).is_set(target.cell()) {
            'O'
        } else {
            '.'
        }
    }

    /// Parses the text notation described in [`Position`].
    ///
    /// # Errors
    ///
    /// Returns an error if the notation is malformed or the position could not
    /// have been reached by alternating moves.
    pub fn from_notation(input: &str) -> anyhow::Result<Self> {
        let mut parts = input.split_whitespace();
        let Some(grid) = parts.next() else {
            bail!("position notation is empty");
        };
        let rows: Vec<&str> = grid.split('/').collect();
        if rows.len() != GRID_WIDTH as usize {
            bail!("expected {GRID_WIDTH} rows, got {}", rows.len());
        }
        let mut position = Self::starting();
        for (row, line) in (0..GRID_WIDTH).zip(rows) {
            if line.chars().count() != GRID_WIDTH as usize {
                bail!("expected {GRID_WIDTH} cells in row {row}, got \"{line}\"");
            }
            for (column, mark) in (0..GRID_WIDTH).zip(line.chars()) {
                if mark == '.' {
                    continue;
                }
                let player = Player::try_from(mark)?;
                let Some(target) = Move::from_grid(row, column) else {
                    unreachable!("grid coordinates are bounded by GRID_WIDTH");
                };
                position.boards[player.index()][target.board().index() as usize] |=
                    target.mask();
            }
        }

        for board in Cell::iter() {
            let first = position.marks(Player::One, board);
            let second = position.marks(Player::Two, board);
            match (first.has_won(), second.has_won()) {
                (true, true) => bail!("sub-board {board} is won by both players"),
                (true, false) => position.claimed[Player::One.index()] |= board.mask(),
                (false, true) => position.claimed[Player::Two.index()] |= board.mask(),
                (false, false) => {},
            }
        }

        let count = |player| -> u32 {
            Cell::iter()
                .map(|board| position.marks(player, board).count_ones())
                .sum()
        };
        let (first, second) = (count(Player::One), count(Player::Two));
        position.side_to_move = match first.checked_sub(second) {
            Some(0) => Player::One,
            Some(1) => Player::Two,
            _ => bail!("X has {first} marks and O has {second}: moves must alternate"),
        };

        let Some(side) = parts.next() else {
            bail!("expected side to move after the grid");
        };
        let side = match side.chars().collect::<Vec<_>>().as_slice() {
            [mark] => Player::try_from(*mark)?,
            _ => bail!("side to move should be 'X' or 'O', got \"{side}\""),
        };
        if side != position.side_to_move {
            bail!(
                "side to move is {side} but the number of marks implies {}",
                position.side_to_move
            );
        }

        let rest: Vec<&str> = parts.collect();
        position.last_move = match rest.as_slice() {
            [] | ["-"] => None,
            [row, column] => {
                let last: Move = format!("{row} {column}")
                    .parse()
                    .context("last move is malformed")?;
                if !position
                    .marks(position.they(), last.board())
                    .is_set(last.cell())
                {
                    bail!("last move {last} is not marked by {}", position.they());
                }
                Some(last)
            },
            _ => bail!("expected last move or '-', got \"{}\"", rest.join(" ")),
        };

        Ok(position)
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::starting()
    }
}

impl TryFrom<&str> for Position {
    type Error = anyhow::Error;

    fn try_from(input: &str) -> anyhow::Result<Self> {
        Self::from_notation(input.trim())
    }
}

impl fmt::Display for Position {
    /// Prints the position in the compact text notation.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..GRID_WIDTH {
            if row > 0 {
                write!(f, "/")?;
            }
            for column in 0..GRID_WIDTH {
                if let Some(cell) = Move::from_grid(row, column) {
                    write!(f, "{}", self.mark_at(cell))?;
                }
            }
        }
        write!(f, " {}", self.side_to_move)?;
        match self.last_move {
            Some(last) => write!(f, " {last}"),
            None => write!(f, " -"),
        }
    }
}

impl fmt::Debug for Position {
    /// Draws the 9x9 grid with sub-board separators.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..GRID_WIDTH {
            if row > 0 && row % 3 == 0 {
                writeln!(f, "------+-------+------")?;
            }
            for column in 0..GRID_WIDTH {
                if column > 0 && column % 3 == 0 {
                    write!(f, "| ")?;
                }
                if let Some(cell) = Move::from_grid(row, column) {
                    write!(f, "{} ", self.mark_at(cell))?;
                }
            }
            writeln!(f)?;
        }
        writeln!(f, "Player to move: {}", self.side_to_move)?;
        match self.last_move {
            Some(last) => writeln!(f, "Last move: {last}")?,
            None => writeln!(f, "Last move: -")?,
        }
        if let Some(outcome) = self.outcome() {
            writeln!(f, "Outcome: {outcome}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn cell(index: u8) -> Cell {
        Cell::new(index).unwrap()
    }

    #[test]
    fn first_move_anywhere() {
        let position = Position::starting();
        assert_eq!(position.us(), Player::One);
        assert_eq!(position.forced_board(), None);
        let moves = position.legal_moves();
        assert_eq!(moves.len(), 81);
        assert!(Move::all().all(|candidate| moves.contains(&candidate)));
    }

    #[test]
    fn opening_in_the_center_forces_center() {
        let mut position = Position::starting();
        position.make_move(Move::new(Cell::CENTER, Cell::CENTER));
        assert_eq!(position.us(), Player::Two);
        assert_eq!(position.forced_board(), Some(Cell::CENTER));
        let moves = position.legal_moves();
        assert_eq!(moves.len(), 8);
        assert!(moves.iter().all(|m| m.board() == Cell::CENTER));
        assert!(!moves.contains(&Move::new(Cell::CENTER, Cell::CENTER)));
    }

    #[test]
    fn claiming_sub_board() {
        let mut position = Position::starting();
        // O keeps sending X back to sub-board 0 until X completes the top row.
        for next_move in ["0 1", "0 3", "0 2", "0 6"] {
            position.make_move(next_move.parse().unwrap());
        }
        assert_eq!(position.claimed(Player::One), Bitboard::empty());
        assert_eq!(position.forced_board(), Some(cell(0)));
        position.make_move("0 0".parse().unwrap());
        assert_eq!(position.claimed(Player::One), cell(0).mask());
        assert_eq!(position.claimed(Player::Two), Bitboard::empty());
        assert!(position.is_decided(cell(0)));
        // X's last move points at sub-board 0, which is decided now.
        assert_eq!(position.forced_board(), None);
        assert!(position.legal_moves().iter().all(|m| m.board() != cell(0)));
    }

    #[test]
    fn won_sub_board_never_reenters_legal_set() {
        let mut position = Position::starting();
        for next_move in ["0 1", "0 3", "0 2", "0 6", "0 0"] {
            position.play(next_move.parse().unwrap()).unwrap();
        }
        assert!(position.is_decided(cell(0)));
        // Every following move is sent to sub-board 0 and has to be redirected.
        for next_move in ["3 0", "3 3", "6 0", "6 3"] {
            let next_move: Move = next_move.parse().unwrap();
            assert_eq!(next_move.forced_board(), cell(0));
            position.play(next_move).unwrap();
            assert!(position.is_decided(cell(0)));
            assert_eq!(position.forced_board(), None);
            assert!(position.legal_moves().iter().all(|m| m.board() != cell(0)));
        }
        assert!(position.play(Move::new(cell(0), cell(8))).is_err());
    }

    #[test]
    fn won_sub_board_falls_back_to_all_undecided() {
        let position = Position::try_from(
            "XXX....../........./........./...O...../........./........./........./........./.......OO X 3 3",
        )
        .unwrap();
        assert_eq!(position.claimed(Player::One), cell(0).mask());
        // O's last move sends X into sub-board 0, which is already won.
        assert_eq!(position.last_move().map(Move::forced_board), Some(cell(0)));
        assert_eq!(position.forced_board(), None);
        let moves = position.legal_moves();
        assert_eq!(moves.len(), 81 - 9 - 3);
        assert!(moves.iter().all(|m| m.board() != cell(0)));
    }

    #[test]
    fn illegal_moves_are_reported() {
        let mut position = Position::starting();
        position.make_move(Move::new(Cell::CENTER, Cell::CENTER));
        let occupied = position.play(Move::new(Cell::CENTER, Cell::CENTER));
        assert_eq!(
            occupied,
            Err(InvalidMoveError {
                attempted: Move::new(Cell::CENTER, Cell::CENTER),
                first: Cell::CENTER.mask(),
                second: Bitboard::empty(),
            })
        );
        let outside = position.play(Move::new(cell(0), cell(0))).unwrap_err();
        assert_eq!(
            outside.to_string(),
            "illegal move 0 0 in sub-board 0 (X: 0b000000000, O: 0b000000000)"
        );
        assert!(position.play(Move::new(Cell::CENTER, cell(0))).is_ok());
        assert_eq!(position.us(), Player::One);
    }

    #[test]
    fn game_won() {
        let position = Position::try_from(
            "XXXXXXXXX/........./........./OO.OO.OO./........./O..O..O../........./........./......... X -",
        )
        .unwrap();
        assert_eq!(position.outcome(), Some(Outcome::Win(Player::One)));
        assert!(position.actions().is_empty());
        assert!(!position.legal_moves().is_empty());
    }

    #[test]
    fn draw_when_every_sub_board_is_decided() {
        // X claims sub-boards 0, 1, 5, 6, 8 and O claims 2, 3, 4, 7: no line.
        let won_by_x = ["XXXO.....", "XXXO.....", "XXXO.....", "XXX......", "XXX......"];
        let won_by_o = "OOO......";
        let mut boards = [won_by_o; 9];
        for (board, pattern) in [0, 1, 5, 6, 8].into_iter().zip(won_by_x) {
            boards[board] = pattern;
        }
        let position = Position::try_from(format!("{} X -", grid(boards)).as_str()).unwrap();
        assert_eq!(position.outcome(), Some(Outcome::Draw));
        assert!(position.legal_moves().is_empty());
        assert!(position.actions().is_empty());
    }

    #[test]
    fn notation_round_trip() {
        let mut position = Position::starting();
        assert_eq!(
            position.to_string(),
            "........./........./........./........./........./........./........./........./......... X -"
        );
        for next_move in ["4 4", "3 3", "0 0", "1 1", "4 3"] {
            position.make_move(next_move.parse().unwrap());
            let serialized = position.to_string();
            assert_eq!(Position::try_from(serialized.as_str()).unwrap(), position);
        }
        assert_eq!(
            position.to_string(),
            "X......../.O......./........./...O...../...XX..../........./........./........./......... O 4 3"
        );
    }

    #[test]
    fn malformed_notation() {
        assert!(Position::try_from("").is_err());
        assert!(Position::try_from("......... X -").is_err());
        // Too many X marks.
        assert!(Position::try_from(
            "XX......./........./........./........./........./........./........./........./......... O -"
        )
        .is_err());
        // Side to move does not match the number of marks.
        assert!(Position::try_from(
            "X......../........./........./........./........./........./........./........./......... X -"
        )
        .is_err());
        // Last move must be a mark of the previous player.
        assert!(Position::try_from(
            "X......../........./........./........./........./........./........./........./......... O 4 4"
        )
        .is_err());
        assert!(Position::try_from(
            "X......../........./........./........./........./........./........./........./......... O 0 0"
        )
        .is_ok());
    }

    /// Builds the grid part of the notation from per-sub-board patterns.
    fn grid(boards: [&str; 9]) -> String {
        (0..GRID_WIDTH)
            .map(|row| {
                (0..GRID_WIDTH)
                    .map(|column| {
                        let target = Move::from_grid(row, column).unwrap();
                        boards[target.board().index() as usize]
                            .chars()
                            .nth(target.cell().index() as usize)
                            .unwrap()
                    })
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}
