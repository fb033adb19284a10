//! Implementation of Ultimate Tic-Tac-Toe rules: nine 3x3 sub-boards arranged
//! in a 3x3 big board. The cell a player marks decides which sub-board the
//! opponent has to play in next.

pub mod bitboard;
pub mod core;
mod generated;
pub mod position;

pub use self::bitboard::Bitboard;
pub use self::core::{Cell, Move};
pub use self::position::{InvalidMoveError, MoveList, Position};
