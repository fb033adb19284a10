//! The engine puts all pieces together: it reads the referee's turn input,
//! keeps the [`Searcher`] in sync with the game and prints the chosen moves.
//!
//! [`Engine::run`] is the "main loop" of the engine which communicates with
//! the environment until the input stream is closed.

use std::io::{BufRead, Write};

use anyhow::{bail, Context};
use tracing::{debug, info, warn};

use crate::game::Move;
use crate::search::{Config, Searcher};

mod protocol;

/// The Engine connects the search with the turn-based text protocol, including
/// I/O.
pub struct Engine<R: BufRead, W: Write> {
    searcher: Searcher,
    input: R,
    output: W,
    /// Number of moves made by the engine so far.
    turns: usize,
}

impl<R: BufRead, W: Write> Engine<R, W> {
    /// Creates a new instance of the engine for a new game with provided I/O.
    #[must_use]
    pub fn new(config: Config, input: R, output: W) -> Self {
        Self {
            searcher: Searcher::new(config),
            input,
            output,
            turns: 0,
        }
    }

    /// Plays turns until the input stream is closed.
    ///
    /// NOTE: The referee is trusted to send legal opponent moves. An illegal
    /// one is reported as an error and stops the engine, there is no error
    /// recovery.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed or illegal input and on I/O failures.
    pub fn run(&mut self) -> anyhow::Result<()> {
        info!(
            "starting a new game: first turn {} ms, then {} ms per turn",
            self.searcher.config().first_turn_budget.as_millis(),
            self.searcher.config().turn_budget.as_millis()
        );
        while let Some(turn) = protocol::read_turn(&mut self.input)? {
            self.play_turn(&turn)?;
        }
        info!("input closed after {} turns", self.turns);
        Ok(())
    }

    fn play_turn(&mut self, turn: &protocol::Turn) -> anyhow::Result<()> {
        if let Some(opponent) = turn.opponent {
            self.searcher
                .observe(opponent)
                .with_context(|| format!("opponent move {opponent} is rejected"))?;
        }
        self.check_valid_actions(&turn.valid_actions);

        let budget = if self.turns == 0 {
            self.searcher.config().first_turn_budget
        } else {
            self.searcher.config().turn_budget
        };
        let Some(chosen) = self.searcher.choose_move(budget) else {
            bail!(
                "no moves left to play in position {}",
                self.searcher.position()
            );
        };
        self.turns += 1;
        writeln!(self.output, "{chosen}")?;
        self.output.flush()?;
        info!(turn = self.turns, %chosen, "move played");
        if let Some(outcome) = self.searcher.position().outcome() {
            info!(%outcome, "game over");
        }
        Ok(())
    }

    /// Compares the referee's view of the legal moves with the engine's one.
    /// A mismatch means the two disagree on the rules or the game state.
    fn check_valid_actions(&self, valid_actions: &[Move]) {
        let actions = self.searcher.position().actions();
        let missing = actions
            .iter()
            .filter(|&action| !valid_actions.contains(action))
            .count();
        let unexpected = valid_actions
            .iter()
            .filter(|&action| !actions.contains(action))
            .count();
        if missing == 0 && unexpected == 0 {
            debug!("{} valid actions", actions.len());
            return;
        }
        warn!(
            missing,
            unexpected,
            "valid actions differ from the generated moves in position {}",
            self.searcher.position()
        );
    }
}
