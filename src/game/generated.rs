//! Lookup tables indexed by the 9-bit value of a sub-board mask. Generated in
//! `build.rs`.

use crate::game::bitboard::Bitboard;

const TABLE_SIZE: usize = 1 << 9;

/// `WINNING[mask]` is true iff `mask` contains one of the 8 winning lines.
pub(super) const WINNING: [bool; TABLE_SIZE] =
    include!(concat!(env!("OUT_DIR"), "/winning.rs"));

/// `FREE_CELLS[occupancy]` lists single-cell masks of all free cells.
pub(super) const FREE_CELLS: [&[Bitboard]; TABLE_SIZE] =
    include!(concat!(env!("OUT_DIR"), "/free_cells.rs"));
