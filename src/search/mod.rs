//! Implements [Monte Carlo Tree Search] (MCTS) algorithm.
//!
//! Each iteration selects a leaf of the search tree with the [UCT] policy,
//! expands one pending move, plays a random game from the new node and
//! propagates its result back to the root. The search stops when the
//! [`Limiter`] is exhausted and the most visited child of the root is played.
//!
//! [Monte Carlo Tree Search]: https://en.wikipedia.org/wiki/Monte_Carlo_tree_search
//! [UCT]: https://www.chessprogramming.org/UCT

use std::fmt;
use std::io::Write;
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tracing::{debug, trace};

use crate::game::{InvalidMoveError, Move, Position};
use crate::search::tree::{Expansion, Tree, ROOT};

mod playout;
mod policy;
mod tree;

/// Magnitude of the reward propagated after a playout. Wins are positive and
/// losses negative from the perspective of the player who moved into the
/// node, draws are always worth zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Reward {
    /// Every decided game is worth `1`.
    #[default]
    Flat,
    /// Faster wins are worth more: `1 / plies` of the playout.
    DepthWeighted,
}

impl Reward {
    /// Magnitude of the reward for a playout that took `plies` moves.
    #[must_use]
    pub fn magnitude(self, plies: u32) -> f64 {
        match self {
            Self::Flat => 1.0,
            Self::DepthWeighted => 1.0 / f64::from(plies.max(1)),
        }
    }
}

/// Search parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Exploration constant `C` of the UCT formula. Higher values spread the
    /// visits more evenly between the moves.
    pub exploration: f64,
    /// Reward of a decided playout.
    pub reward: Reward,
    /// Seed of the random source. `None` seeds it from the OS entropy.
    pub seed: Option<u64>,
    /// Time budget for the first move of the game, which also pays for the
    /// setup.
    pub first_turn_budget: Duration,
    /// Time budget for every following move.
    pub turn_budget: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exploration: 1.41,
            reward: Reward::default(),
            seed: None,
            first_turn_budget: Duration::from_millis(900),
            turn_budget: Duration::from_millis(90),
        }
    }
}

impl Config {
    #[must_use]
    pub fn with_exploration(mut self, exploration: f64) -> Self {
        self.exploration = exploration;
        self
    }

    #[must_use]
    pub fn with_reward(mut self, reward: Reward) -> Self {
        self.reward = reward;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the time budgets of the first and the following turns.
    #[must_use]
    pub fn with_budgets(mut self, first_turn: Duration, turn: Duration) -> Self {
        self.first_turn_budget = first_turn;
        self.turn_budget = turn;
        self
    }
}

/// Bounds a single search by wall-clock time and/or number of iterations.
/// The limits are checked between iterations, so the time budget can be
/// exceeded by the duration of one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limiter {
    time: Option<Duration>,
    iterations: Option<u64>,
}

impl Limiter {
    /// Stops the search once `budget` has elapsed.
    #[must_use]
    pub const fn time(budget: Duration) -> Self {
        Self {
            time: Some(budget),
            iterations: None,
        }
    }

    /// Stops the search after `iterations` playouts.
    #[must_use]
    pub const fn iterations(iterations: u64) -> Self {
        Self {
            time: None,
            iterations: Some(iterations),
        }
    }

    /// Adds an iteration limit on top of the existing ones.
    #[must_use]
    pub const fn with_iterations(mut self, iterations: u64) -> Self {
        self.iterations = Some(iterations);
        self
    }

    fn is_exhausted(&self, elapsed: Duration, iterations: u64) -> bool {
        self.time.is_some_and(|budget| elapsed >= budget)
            || self.iterations.is_some_and(|limit| iterations >= limit)
    }
}

/// Statistics of a root child.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveStats {
    #[allow(missing_docs)]
    pub action: Move,
    /// Number of playouts that went through the move.
    pub visits: u32,
    /// Average reward from the perspective of the side to move at the root.
    pub mean_score: f64,
}

/// Summary of a single [`Searcher::search`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchReport {
    /// Number of playouts made by this search.
    pub iterations: u64,
    /// Number of nodes in the tree, including the ones kept from the previous
    /// searches.
    pub tree_size: usize,
    /// Wall-clock time of the search.
    pub elapsed: Duration,
    /// The most visited root child, `None` if the game is already over.
    pub best: Option<MoveStats>,
}

impl fmt::Display for SearchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} iterations in {} ms, {} nodes",
            self.iterations,
            self.elapsed.as_millis(),
            self.tree_size
        )?;
        if let Some(best) = &self.best {
            write!(
                f,
                ", best {} ({} visits, score {:.3})",
                best.action, best.visits, best.mean_score
            )?;
        }
        Ok(())
    }
}

/// Keeps the search tree between the turns of a single game: the subtree of
/// every played move is reused by the next search.
pub struct Searcher {
    tree: Tree,
    config: Config,
    rng: ChaCha20Rng,
}

impl Searcher {
    /// Creates a searcher for a new game.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self::with_position(config, Position::starting())
    }

    /// Creates a searcher starting from an arbitrary `position`.
    #[must_use]
    pub fn with_position(config: Config, position: Position) -> Self {
        let mut rng = match config.seed {
            Some(seed) => ChaCha20Rng::seed_from_u64(seed),
            None => ChaCha20Rng::from_entropy(),
        };
        let tree = Tree::new(position, &mut rng);
        Self { tree, config, rng }
    }

    #[must_use]
    pub fn position(&self) -> &Position {
        self.tree.root().position()
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Number of nodes currently in the tree.
    #[must_use]
    pub fn tree_size(&self) -> usize {
        self.tree.len()
    }

    /// Applies the opponent's move.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidMoveError`] if the move is not legal in the current
    /// position. The searcher is left unchanged in that case.
    pub fn observe(&mut self, action: Move) -> Result<(), InvalidMoveError> {
        trace!(%action, "observing opponent move");
        self.advance(action)
    }

    /// Applies the engine's own move.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidMoveError`] if the move is not legal in the current
    /// position.
    pub fn commit(&mut self, action: Move) -> Result<(), InvalidMoveError> {
        trace!(%action, "committing move");
        self.advance(action)
    }

    /// Moves the root to the child reached by `action`. Statistics of an
    /// already expanded child are kept, otherwise the tree starts over from
    /// the new position.
    fn advance(&mut self, action: Move) -> Result<(), InvalidMoveError> {
        if let Some(child) = self.tree.child(ROOT, action) {
            self.tree.reroot(child);
            return Ok(());
        }
        let mut position = self.position().clone();
        position.play(action)?;
        self.tree = Tree::new(position, &mut self.rng);
        Ok(())
    }

    /// Runs iterations until the `limiter` is exhausted. At least one
    /// iteration is made unless the game is already over.
    pub fn search(&mut self, limiter: &Limiter) -> SearchReport {
        let started = Instant::now();
        let mut iterations = 0;
        if self.tree.root().expansion() != Expansion::Terminal {
            loop {
                self.iterate();
                iterations += 1;
                if limiter.is_exhausted(started.elapsed(), iterations) {
                    break;
                }
            }
        }
        let report = SearchReport {
            iterations,
            tree_size: self.tree.len(),
            elapsed: started.elapsed(),
            best: self.best_move_stats(),
        };
        debug!("{report}");
        report
    }

    /// Searches for `budget` and plays the most visited move, keeping its
    /// subtree for the next turn. Returns `None` if the game is over.
    pub fn choose_move(&mut self, budget: Duration) -> Option<Move> {
        let report = self.search(&Limiter::time(budget));
        let best = report.best?;
        if let Some(child) = self.tree.child(ROOT, best.action) {
            self.tree.reroot(child);
        }
        Some(best.action)
    }

    /// The most visited move of the root, if any child was expanded.
    #[must_use]
    pub fn best_move(&self) -> Option<Move> {
        self.best_move_stats().map(|stats| stats.action)
    }

    fn best_move_stats(&self) -> Option<MoveStats> {
        let node = self.tree.node(self.tree.most_visited_child(ROOT)?);
        Some(MoveStats {
            action: node.action()?,
            visits: node.visits(),
            mean_score: node.mean_score(),
        })
    }

    /// A single select, expand, simulate and backpropagate step.
    fn iterate(&mut self) {
        let leaf = self.tree.select_leaf(self.config.exploration, &mut self.rng);
        let position = self.tree.node(leaf).position().clone();
        // The leaf statistics are kept for the player who moved into it.
        let mover = position.they();
        let playout = playout::simulate(position, &mut self.rng);
        let reward = playout.outcome.for_player(mover).sign()
            * self.config.reward.magnitude(playout.plies);
        self.tree.backpropagate(leaf, reward);
    }
}

/// Positions searched by [`bench`]: the opening, a forced reply, a middle game
/// and a position with a win in one.
const BENCH_POSITIONS: [&str; 4] = [
    "........./........./........./........./........./........./........./........./......... X -",
    "........./........./........./........./....X..../........./........./........./......... O 4 4",
    "X......../.O......./........./...O...../...XX..../........./........./........./......... O 4 3",
    "XXXXXXXX./........./........./OO.OO.O.O/O..O...../........./........./........./......... X 3 8",
];

const BENCH_ITERATIONS: u64 = 20_000;

/// Runs a fixed-size search on a small set of positions and reports the speed
/// as `"<nodes> nodes <nps> nps"`, where a node is a single playout.
///
/// # Errors
///
/// Returns an error if writing to `output` fails.
pub fn bench(output: &mut impl Write) -> anyhow::Result<()> {
    let config = Config::default().with_seed(0);
    let mut nodes = 0;
    let mut elapsed = Duration::ZERO;
    for notation in BENCH_POSITIONS {
        let position = Position::try_from(notation)?;
        let mut searcher = Searcher::with_position(config.clone(), position);
        let report = searcher.search(&Limiter::iterations(BENCH_ITERATIONS));
        writeln!(output, "{notation}: {report}")?;
        nodes += report.iterations;
        elapsed += report.elapsed;
    }
    let nps = (nodes as f64 / elapsed.as_secs_f64().max(f64::EPSILON)) as u64;
    writeln!(output, "{nodes} nodes {nps} nps")?;
    Ok(())
}
