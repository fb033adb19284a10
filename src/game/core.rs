//! Game primitives commonly used within [`crate::game`].

use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Context};

use crate::game::bitboard::Bitboard;

/// Width (and height) of both a sub-board and the big board.
pub const BOARD_WIDTH: u8 = 3;
/// Number of cells in a sub-board and number of sub-boards in the big board.
pub const CELLS: u8 = BOARD_WIDTH * BOARD_WIDTH;
/// Width of the flattened 9x9 grid used by the text encoding.
pub const GRID_WIDTH: u8 = BOARD_WIDTH * BOARD_WIDTH;
/// Total number of cells on the full board.
pub const GRID_SIZE: usize = CELLS as usize * CELLS as usize;

/// A position within a 3x3 grid, counted row by row from the top-left corner:
///
/// ```text
/// 0 1 2
/// 3 4 5
/// 6 7 8
/// ```
///
/// The same type addresses a cell of a sub-board and a sub-board of the big
/// board (the "board index").
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell(u8);

impl Cell {
    /// The center of the grid.
    pub const CENTER: Self = Self(4);

    /// Creates a cell from its index, returns `None` if it is outside `0..9`.
    #[must_use]
    pub const fn new(index: u8) -> Option<Self> {
        if index < CELLS {
            Some(Self(index))
        } else {
            None
        }
    }

    /// Creates a cell from row and column, both within `0..3`.
    #[must_use]
    pub const fn from_coordinates(row: u8, column: u8) -> Option<Self> {
        if row < BOARD_WIDTH && column < BOARD_WIDTH {
            Some(Self(row * BOARD_WIDTH + column))
        } else {
            None
        }
    }

    /// Inverse of [`Cell::mask`]: returns the cell for a single-bit mask.
    #[must_use]
    pub const fn from_mask(mask: Bitboard) -> Option<Self> {
        if mask.count_ones() != 1 {
            return None;
        }
        Self::new((mask.bits().leading_zeros() - (u16::BITS - CELLS as u32)) as u8)
    }

    #[must_use]
    pub const fn index(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn row(self) -> u8 {
        self.0 / BOARD_WIDTH
    }

    #[must_use]
    pub const fn column(self) -> u8 {
        self.0 % BOARD_WIDTH
    }

    /// Single-bit [`Bitboard`] with this cell set.
    #[must_use]
    pub const fn mask(self) -> Bitboard {
        Bitboard::from_bits(1 << (CELLS - 1 - self.0))
    }

    /// Iterates over all 9 cells in index order.
    pub fn iter() -> impl Iterator<Item = Self> {
        (0..CELLS).map(Self)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Placing a mark on `cell` of the sub-board `board`. Only the side to move is
/// implicit: the move itself is the same for both players.
///
/// The textual form is the global "row column" pair of the flattened 9x9 grid,
/// e.g. the center of the center sub-board is `"4 4"`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Move {
    board: Cell,
    cell: Cell,
}

impl Move {
    #[must_use]
    pub const fn new(board: Cell, cell: Cell) -> Self {
        Self { board, cell }
    }

    /// Builds a move from a sub-board index and a local single-bit mask.
    #[must_use]
    pub const fn from_mask(board: Cell, mask: Bitboard) -> Option<Self> {
        match Cell::from_mask(mask) {
            Some(cell) => Some(Self::new(board, cell)),
            None => None,
        }
    }

    /// Builds a move from global coordinates of the 9x9 grid.
    #[must_use]
    pub const fn from_grid(row: u8, column: u8) -> Option<Self> {
        if row >= GRID_WIDTH || column >= GRID_WIDTH {
            return None;
        }
        let board = Cell(row / BOARD_WIDTH * BOARD_WIDTH + column / BOARD_WIDTH);
        let cell = Cell(row % BOARD_WIDTH * BOARD_WIDTH + column % BOARD_WIDTH);
        Some(Self::new(board, cell))
    }

    /// Index of the sub-board the move is played in.
    #[must_use]
    pub const fn board(self) -> Cell {
        self.board
    }

    /// Cell within the sub-board.
    #[must_use]
    pub const fn cell(self) -> Cell {
        self.cell
    }

    /// Local single-bit mask of the cell.
    #[must_use]
    pub const fn mask(self) -> Bitboard {
        self.cell.mask()
    }

    /// The sub-board the opponent is sent to by this move.
    #[must_use]
    pub const fn forced_board(self) -> Cell {
        self.cell
    }

    /// Row of the flattened 9x9 grid.
    #[must_use]
    pub const fn grid_row(self) -> u8 {
        self.board.row() * BOARD_WIDTH + self.cell.row()
    }

    /// Column of the flattened 9x9 grid.
    #[must_use]
    pub const fn grid_column(self) -> u8 {
        self.board.column() * BOARD_WIDTH + self.cell.column()
    }

    /// Iterates over all 81 moves of the full grid, sub-board by sub-board.
    pub fn all() -> impl Iterator<Item = Self> {
        Cell::iter().flat_map(|board| Cell::iter().map(move |cell| Self::new(board, cell)))
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.grid_row(), self.grid_column())
    }
}

impl FromStr for Move {
    type Err = anyhow::Error;

    fn from_str(input: &str) -> anyhow::Result<Self> {
        let mut parts = input.split_whitespace();
        let (Some(row), Some(column), None) = (parts.next(), parts.next(), parts.next()) else {
            bail!("expected \"<row> <column>\", got \"{input}\"");
        };
        let row: u8 = row
            .parse()
            .with_context(|| format!("row should be a number in 0..9, got \"{row}\""))?;
        let column: u8 = column
            .parse()
            .with_context(|| format!("column should be a number in 0..9, got \"{column}\""))?;
        match Self::from_grid(row, column) {
            Some(parsed) => Ok(parsed),
            None => bail!("move {row} {column} is outside of the 9x9 grid"),
        }
    }
}
