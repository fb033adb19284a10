//! [UCT] (Upper Confidence bound applied to Trees) selection policy.
//!
//! [UCT]: https://en.wikipedia.org/wiki/Monte_Carlo_tree_search#Exploration_and_exploitation

/// Scores a child for selection: mean reward plus an exploration bonus that
/// shrinks as the child gets visited more often than its siblings.
///
/// Visit counts are clamped to 1 so that a freshly expanded node never divides
/// by zero.
#[must_use]
pub(super) fn uct(score: f64, visits: u32, parent_visits: u32, exploration: f64) -> f64 {
    let visits = f64::from(visits.max(1));
    let parent_visits = f64::from(parent_visits.max(1));
    exploration.mul_add((parent_visits.ln() / visits).sqrt(), score / visits)
}
