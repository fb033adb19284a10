//! Parsing of the turn input sent by the referee:
//!
//! ```text
//! <opponent row> <opponent column>    (-1 -1 when the engine moves first)
//! <number of valid actions>
//! <row> <column>                      (repeated for every valid action)
//! ```

use std::io::BufRead;

use anyhow::{bail, Context};

use crate::game::Move;

/// Input of a single turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Turn {
    /// The opponent's last move, `None` on the very first turn of the game.
    pub(super) opponent: Option<Move>,
    /// Legal moves as seen by the referee.
    pub(super) valid_actions: Vec<Move>,
}

/// Marker of "no move yet".
const NO_MOVE: &str = "-1 -1";

/// Reads the next turn. Returns `None` when the input is closed before the
/// turn starts.
pub(super) fn read_turn(input: &mut impl BufRead) -> anyhow::Result<Option<Turn>> {
    let Some(line) = read_line(input)? else {
        return Ok(None);
    };
    let opponent = parse_opponent(&line)?;
    let Some(line) = read_line(input)? else {
        bail!("input closed before the number of valid actions");
    };
    let count = parse_count(&line)?;
    let mut valid_actions = Vec::with_capacity(count);
    for index in 0..count {
        let Some(line) = read_line(input)? else {
            bail!("input closed after {index} of {count} valid actions");
        };
        valid_actions.push(
            line.parse::<Move>()
                .with_context(|| format!("malformed valid action #{index}"))?,
        );
    }
    Ok(Some(Turn {
        opponent,
        valid_actions,
    }))
}

/// Parses the opponent's move or the [`NO_MOVE`] marker.
pub(super) fn parse_opponent(line: &str) -> anyhow::Result<Option<Move>> {
    if line.split_whitespace().eq(NO_MOVE.split_whitespace()) {
        return Ok(None);
    }
    line.parse::<Move>()
        .map(Some)
        .context("malformed opponent move")
}

/// The count line may carry extra tokens, only the first one matters.
pub(super) fn parse_count(line: &str) -> anyhow::Result<usize> {
    let Some(count) = line.split_whitespace().next() else {
        bail!("expected the number of valid actions, got an empty line");
    };
    count
        .parse::<usize>()
        .with_context(|| format!("number of valid actions should be a number, got \"{count}\""))
}

/// Reads a line without the trailing newline, `None` on EOF.
fn read_line(input: &mut impl BufRead) -> anyhow::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line).context("reading turn input")? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}
