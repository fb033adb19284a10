//! Random playouts (rollouts) estimating the value of a leaf: both players pick
//! uniformly random moves until the game ends.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::environment::Outcome;
use crate::game::Position;

/// Result of a single playout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Playout {
    pub(super) outcome: Outcome,
    /// Number of moves made until the end of the game.
    pub(super) plies: u32,
}

/// Plays random moves from `position` until the game is over. The moves come
/// from [`Position::actions`], so the forcing rules are exactly the ones used
/// by the tree.
///
/// Running out of moves without a winner is a draw.
pub(super) fn simulate(mut position: Position, rng: &mut impl Rng) -> Playout {
    let mut plies = 0;
    loop {
        if let Some(outcome) = position.outcome() {
            return Playout { outcome, plies };
        }
        let Some(&next_move) = position.legal_moves().choose(rng) else {
            return Playout {
                outcome: Outcome::Draw,
                plies,
            };
        };
        position.make_move(next_move);
        plies += 1;
    }
}
