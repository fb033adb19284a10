//! [`Bitboard`]-based representation of a single 3x3 sub-board. Each player
//! owns one 9-bit mask per sub-board and the same representation is reused for
//! the "big board" of claimed sub-boards.
//!
//! Every question the rules ask about a sub-board (is it won? which cells are
//! free?) is answered by indexing a 512-entry table generated in `build.rs`,
//! so the playouts never branch over the winning lines.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign, Not};

use itertools::Itertools;

use crate::game::core::{Cell, BOARD_WIDTH, CELLS};
use crate::game::generated;

/// Set of cells within a 3x3 grid. Cell 0 (top-left) is stored in the most
/// significant bit (`0b100_000_000`) and cell 8 (bottom-right) in the least
/// significant one.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Bitboard {
    bits: u16,
}

impl Bitboard {
    /// Mask with every cell of the grid set.
    pub const FULL_MASK: u16 = 0b111_111_111;

    /// The 8 winning lines: 3 rows, 3 columns and 2 diagonals.
    pub const WINNING_LINES: [Self; 8] = [
        Self::from_bits(0b111_000_000),
        Self::from_bits(0b000_111_000),
        Self::from_bits(0b000_000_111),
        Self::from_bits(0b100_100_100),
        Self::from_bits(0b010_010_010),
        Self::from_bits(0b001_001_001),
        Self::from_bits(0b100_010_001),
        Self::from_bits(0b001_010_100),
    ];

    /// Constructs Bitboard from pre-calculated bits. Bits outside of the 3x3
    /// grid are discarded.
    #[must_use]
    pub const fn from_bits(bits: u16) -> Self {
        Self {
            bits: bits & Self::FULL_MASK,
        }
    }

    /// Constructs a bitboard representing empty set of cells.
    #[must_use]
    pub const fn empty() -> Self {
        Self::from_bits(0)
    }

    /// Constructs a bitboard with all 9 cells set.
    #[must_use]
    pub const fn full() -> Self {
        Self::from_bits(Self::FULL_MASK)
    }

    /// Returns raw bits.
    #[must_use]
    pub const fn bits(self) -> u16 {
        self.bits
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.bits == 0
    }

    /// Returns true if all 9 cells are occupied.
    #[must_use]
    pub const fn is_full(self) -> bool {
        self.bits == Self::FULL_MASK
    }

    /// Returns true if this bitboard contains given cell.
    #[must_use]
    pub const fn is_set(self, cell: Cell) -> bool {
        self.bits & cell.mask().bits != 0
    }

    #[must_use]
    pub const fn count_ones(self) -> u32 {
        self.bits.count_ones()
    }

    /// Returns true if the bitboard contains at least one of the
    /// [`Bitboard::WINNING_LINES`].
    #[must_use]
    pub const fn has_won(self) -> bool {
        generated::WINNING[self.bits as usize]
    }

    /// Returns single-cell masks of all cells that are not set in this
    /// bitboard, ordered from cell 0 to cell 8.
    #[must_use]
    pub const fn free_cells(self) -> &'static [Self] {
        generated::FREE_CELLS[self.bits as usize]
    }

    /// An efficient way to iterate over the set cells.
    #[must_use]
    pub const fn iter(self) -> BitboardIterator {
        BitboardIterator { bits: self.bits }
    }
}

/// Returns the single-cell masks for the free cells of a sub-board with given
/// `occupancy` (union of both players' masks).
#[must_use]
pub const fn legal_moves(occupancy: Bitboard) -> &'static [Bitboard] {
    occupancy.free_cells()
}

/// Returns true if the mask contains any of the 8 winning lines.
#[must_use]
pub const fn has_won(mask: Bitboard) -> bool {
    mask.has_won()
}

/// A sub-board is terminal when either player has won it or when there are no
/// free cells left.
#[must_use]
pub const fn is_terminal(first: Bitboard, second: Bitboard) -> bool {
    first.has_won() || second.has_won() || (first.bits | second.bits) == Bitboard::FULL_MASK
}

impl fmt::Debug for Bitboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            Cell::iter()
                .map(|cell| if self.is_set(cell) { '1' } else { '.' })
                .chunks(BOARD_WIDTH as usize)
                .into_iter()
                .map(|mut row| row.join(" "))
                .join("\n")
        )
    }
}

impl BitOr for Bitboard {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self::from_bits(self.bits | rhs.bits)
    }
}

impl BitOrAssign for Bitboard {
    fn bitor_assign(&mut self, rhs: Self) {
        self.bits |= rhs.bits;
    }
}

impl BitAnd for Bitboard {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self::from_bits(self.bits & rhs.bits)
    }
}

impl Not for Bitboard {
    type Output = Self;

    /// Returns the complement within the 3x3 grid.
    fn not(self) -> Self::Output {
        Self::from_bits(!self.bits)
    }
}

impl From<Cell> for Bitboard {
    fn from(cell: Cell) -> Self {
        cell.mask()
    }
}

/// Iterates over set cells from cell 0 (most significant bit) to cell 8.
pub struct BitboardIterator {
    bits: u16,
}

impl Iterator for BitboardIterator {
    type Item = Cell;

    fn next(&mut self) -> Option<Self::Item> {
        if self.bits == 0 {
            return None;
        }
        // The grid occupies the 9 lowest bits of u16, so the number of leading
        // zeros is at least 7 and the highest set bit belongs to cell
        // `leading_zeros - 7`.
        let index = self.bits.leading_zeros() - (u16::BITS - CELLS as u32);
        let cell = Cell::new(index as u8)?;
        self.bits ^= cell.mask().bits;
        Some(cell)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let count = self.bits.count_ones() as usize;
        (count, Some(count))
    }
}

impl ExactSizeIterator for BitboardIterator {}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn basics() {
        assert!(Bitboard::empty().is_empty());
        assert!(Bitboard::full().is_full());
        assert_eq!(Bitboard::full().count_ones(), 9);
        assert_eq!(!Bitboard::empty(), Bitboard::full());
        assert_eq!(Bitboard::from_bits(u16::MAX), Bitboard::full());
        assert_eq!(
            Bitboard::from_bits(0b110_000_000) | Bitboard::from_bits(0b000_000_011),
            Bitboard::from_bits(0b110_000_011)
        );
        assert_eq!(
            Bitboard::from_bits(0b110_000_011) & Bitboard::from_bits(0b100_000_001),
            Bitboard::from_bits(0b100_000_001)
        );
    }

    #[test]
    fn iteration() {
        let cells: Vec<u8> = Bitboard::from_bits(0b100_010_001)
            .iter()
            .map(Cell::index)
            .collect();
        assert_eq!(cells, vec![0, 4, 8]);
        assert_eq!(Bitboard::empty().iter().count(), 0);
        assert_eq!(Bitboard::full().iter().len(), 9);
    }

    #[test]
    fn free_cells_for_every_occupancy() {
        for bits in 0..=Bitboard::FULL_MASK {
            let occupancy = Bitboard::from_bits(bits);
            let moves = legal_moves(occupancy);
            assert_eq!(moves.len() as u32, 9 - occupancy.count_ones());
            for single in moves {
                assert_eq!(single.count_ones(), 1);
                assert!((*single & occupancy).is_empty());
            }
        }
    }

    #[test]
    fn single_free_cell() {
        assert_eq!(
            legal_moves(Bitboard::from_bits(0b011_111_111)),
            &[Bitboard::from_bits(0b100_000_000)]
        );
        assert_eq!(
            legal_moves(Bitboard::from_bits(0b111_101_111)),
            &[Bitboard::from_bits(0b000_010_000)]
        );
        assert_eq!(
            legal_moves(Bitboard::from_bits(0b111_111_110)),
            &[Bitboard::from_bits(0b000_000_001)]
        );
        assert_eq!(legal_moves(Bitboard::from_bits(0b101_010_101)).len(), 4);
        assert_eq!(legal_moves(Bitboard::from_bits(0b010_101_010)).len(), 5);
    }

    #[test]
    fn winning_masks() {
        for bits in 0..=Bitboard::FULL_MASK {
            let expected = Bitboard::WINNING_LINES
                .iter()
                .any(|line| bits & line.bits() == line.bits());
            assert_eq!(has_won(Bitboard::from_bits(bits)), expected, "{bits:#011b}");
        }
        assert!(!has_won(Bitboard::empty()));
        assert!(has_won(Bitboard::from_bits(0b001_010_100)));
        assert!(!has_won(Bitboard::from_bits(0b101_000_101)));
    }

    #[test]
    fn terminal_sub_boards() {
        assert!(!is_terminal(Bitboard::empty(), Bitboard::empty()));
        assert!(is_terminal(Bitboard::from_bits(0b111_000_000), Bitboard::empty()));
        assert!(is_terminal(Bitboard::empty(), Bitboard::from_bits(0b100_100_100)));
        // Draw: every cell taken, nobody has a line.
        assert!(is_terminal(
            Bitboard::from_bits(0b110_001_101),
            Bitboard::from_bits(0b001_110_010)
        ));
        assert!(!is_terminal(
            Bitboard::from_bits(0b110_001_100),
            Bitboard::from_bits(0b001_110_010)
        ));
    }

    #[test]
    fn debug_format() {
        assert_eq!(
            format!("{:?}", Bitboard::from_bits(0b100_010_001)),
            "1 . .\n. 1 .\n. . 1"
        );
    }
}
