//! Players and game results shared by the rules implementation and the search.

use std::fmt;
use std::ops::Not;

use anyhow::bail;

/// Ultimate Tic-Tac-Toe is played between two players: the first one to move
/// marks cells with `X`, the second one with `O`.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Player {
    One,
    Two,
}

impl Player {
    /// Index into per-player arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::One => 0,
            Self::Two => 1,
        }
    }
}

impl Not for Player {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            Self::One => Self::Two,
            Self::Two => Self::One,
        }
    }
}

impl TryFrom<char> for Player {
    type Error = anyhow::Error;

    fn try_from(mark: char) -> anyhow::Result<Self> {
        match mark {
            'X' => Ok(Self::One),
            'O' => Ok(Self::Two),
            _ => bail!("player mark should be 'X' or 'O', got '{mark}'"),
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match &self {
                Self::One => 'X',
                Self::Two => 'O',
            }
        )
    }
}

/// Final result of a finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The player claimed three sub-boards in a row.
    Win(Player),
    /// Every sub-board is decided and nobody has a line on the big board.
    Draw,
}

impl Outcome {
    /// Returns the result from the perspective of `player`.
    #[must_use]
    pub fn for_player(self, player: Player) -> GameResult {
        match self {
            Self::Win(winner) if winner == player => GameResult::Win,
            Self::Win(_) => GameResult::Loss,
            Self::Draw => GameResult::Draw,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Win(player) => write!(f, "{player} wins"),
            Self::Draw => write!(f, "draw"),
        }
    }
}

/// Result of the game from the perspective of a single player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum GameResult {
    Win,
    Draw,
    Loss,
}

impl GameResult {
    /// Sign of the reward: `1` for a win, `-1` for a loss and `0` for a draw.
    #[must_use]
    pub const fn sign(self) -> f64 {
        match self {
            Self::Win => 1.0,
            Self::Draw => 0.0,
            Self::Loss => -1.0,
        }
    }
}
