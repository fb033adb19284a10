//! Arena-backed search tree. Nodes are stored in a single vector and refer to
//! each other by index, the parent link is a plain index back-pointer, so the
//! tree has no reference cycles and dropping the arena drops every node.

use std::collections::VecDeque;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::game::{Move, MoveList, Position};
use crate::search::policy;

pub(super) type NodeIndex = usize;

/// The root always occupies the first slot of the arena.
pub(super) const ROOT: NodeIndex = 0;

// This is a special value that is used to indicate that the node has no parent.
const TOMBSTONE_PARENT: NodeIndex = usize::MAX;

/// Expansion state of a node. Terminal nodes have no moves at all and are never
/// expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Expansion {
    Unexpanded,
    Partial,
    Full,
    Terminal,
}

pub(super) struct Node {
    position: Position,
    parent: NodeIndex,
    /// Move leading from the parent to this node.
    action: Option<Move>,
    children: Vec<NodeIndex>,
    /// Legal moves that do not have a child yet, in random order.
    unexpanded: MoveList,
    visits: u32,
    /// Sum of rewards from the perspective of the player who made `action`.
    score: f64,
}

impl Node {
    fn new(
        position: Position,
        parent: NodeIndex,
        action: Option<Move>,
        rng: &mut impl Rng,
    ) -> Self {
        let mut unexpanded = position.actions();
        unexpanded.shuffle(rng);
        Self {
            position,
            parent,
            action,
            children: Vec::new(),
            unexpanded,
            visits: 0,
            score: 0.0,
        }
    }

    #[must_use]
    pub(super) const fn position(&self) -> &Position {
        &self.position
    }

    #[must_use]
    pub(super) const fn action(&self) -> Option<Move> {
        self.action
    }

    #[must_use]
    pub(super) const fn visits(&self) -> u32 {
        self.visits
    }

    #[must_use]
    pub(super) const fn score(&self) -> f64 {
        self.score
    }

    /// Average reward per visit.
    #[must_use]
    pub(super) fn mean_score(&self) -> f64 {
        self.score / f64::from(self.visits.max(1))
    }

    #[must_use]
    pub(super) fn expansion(&self) -> Expansion {
        match (self.children.is_empty(), self.unexpanded.is_empty()) {
            (true, true) => Expansion::Terminal,
            (true, false) => Expansion::Unexpanded,
            (false, false) => Expansion::Partial,
            (false, true) => Expansion::Full,
        }
    }
}

pub(super) struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub(super) fn new(root: Position, rng: &mut impl Rng) -> Self {
        Self {
            nodes: vec![Node::new(root, TOMBSTONE_PARENT, None, rng)],
        }
    }

    #[must_use]
    pub(super) fn node(&self, index: NodeIndex) -> &Node {
        &self.nodes[index]
    }

    #[must_use]
    pub(super) fn root(&self) -> &Node {
        self.node(ROOT)
    }

    #[must_use]
    pub(super) fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub(super) fn parent(&self, index: NodeIndex) -> Option<NodeIndex> {
        match self.nodes[index].parent {
            TOMBSTONE_PARENT => None,
            parent => Some(parent),
        }
    }

    pub(super) fn children(&self, index: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.nodes[index].children.iter().copied()
    }

    /// Finds the child reached by playing `action`, if it was expanded.
    #[must_use]
    pub(super) fn child(&self, index: NodeIndex, action: Move) -> Option<NodeIndex> {
        self.children(index)
            .find(|&child| self.nodes[child].action == Some(action))
    }

    /// Walks down from the root: nodes with pending moves get a new child which
    /// is returned, fully expanded nodes descend into the child with the
    /// highest UCT score. Terminal nodes are returned as they are.
    pub(super) fn select_leaf(&mut self, exploration: f64, rng: &mut impl Rng) -> NodeIndex {
        let mut current = ROOT;
        loop {
            if let Some(&action) = self.nodes[current].unexpanded.last() {
                return self.expand(current, action, rng);
            }
            match self.best_child(current, exploration) {
                Some(child) => current = child,
                None => return current,
            }
        }
    }

    /// Materializes the child of `parent` reached by `action`, removing the
    /// move from the parent's pending list.
    pub(super) fn expand(
        &mut self,
        parent: NodeIndex,
        action: Move,
        rng: &mut impl Rng,
    ) -> NodeIndex {
        let node = &mut self.nodes[parent];
        if let Some(pending) = node.unexpanded.iter().rposition(|&m| m == action) {
            let _ = node.unexpanded.swap_remove(pending);
        }
        let mut position = node.position.clone();
        position.make_move(action);
        let child = self.nodes.len();
        self.nodes.push(Node::new(position, parent, Some(action), rng));
        self.nodes[parent].children.push(child);
        child
    }

    /// Child with the highest UCT score, `None` for nodes without children.
    #[must_use]
    pub(super) fn best_child(&self, index: NodeIndex, exploration: f64) -> Option<NodeIndex> {
        let parent_visits = self.nodes[index].visits;
        self.children(index).max_by(|&lhs, &rhs| {
            let score = |child: NodeIndex| {
                let node = &self.nodes[child];
                policy::uct(node.score(), node.visits(), parent_visits, exploration)
            };
            score(lhs).total_cmp(&score(rhs))
        })
    }

    /// Child with the most visits.
    #[must_use]
    pub(super) fn most_visited_child(&self, index: NodeIndex) -> Option<NodeIndex> {
        self.children(index).max_by_key(|&child| self.nodes[child].visits)
    }

    /// Adds the playout result to the leaf and all of its ancestors. `reward`
    /// is from the perspective of the player who moved into `leaf` and flips
    /// sign at every level because the players alternate.
    pub(super) fn backpropagate(&mut self, leaf: NodeIndex, reward: f64) {
        let mut current = leaf;
        let mut reward = reward;
        loop {
            let node = &mut self.nodes[current];
            node.visits += 1;
            node.score += reward;
            match self.parent(current) {
                Some(parent) => current = parent,
                None => break,
            }
            reward = -reward;
        }
    }

    /// Makes `new_root` the root and drops every node outside of its subtree.
    /// The statistics of the kept nodes are preserved, the new root loses its
    /// parent link.
    pub(super) fn reroot(&mut self, new_root: NodeIndex) {
        if new_root == ROOT {
            return;
        }
        let mut old: Vec<Option<Node>> = std::mem::take(&mut self.nodes)
            .into_iter()
            .map(Some)
            .collect();
        let mut queue = VecDeque::from([(new_root, TOMBSTONE_PARENT)]);
        while let Some((old_index, parent)) = queue.pop_front() {
            let Some(mut node) = old[old_index].take() else {
                continue;
            };
            let index = self.nodes.len();
            queue.extend(node.children.drain(..).map(|child| (child, index)));
            node.parent = parent;
            if parent != TOMBSTONE_PARENT {
                self.nodes[parent].children.push(index);
            }
            self.nodes.push(node);
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;
    use crate::game::Cell;

    fn rng() -> ChaCha20Rng {
        ChaCha20Rng::seed_from_u64(42)
    }

    fn parse(input: &str) -> Move {
        input.parse().unwrap()
    }

    #[test]
    fn new_root() {
        let tree = Tree::new(Position::starting(), &mut rng());
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.root().visits(), 0);
        assert_eq!(tree.root().unexpanded.len(), 81);
        assert_eq!(tree.root().expansion(), Expansion::Unexpanded);
        assert_eq!(tree.parent(ROOT), None);
    }

    #[test]
    fn expansion_states() {
        let mut rng = rng();
        let mut position = Position::starting();
        position.make_move(Move::new(Cell::CENTER, Cell::CENTER));
        let mut tree = Tree::new(position, &mut rng);
        for expanded in 1..=8 {
            let leaf = tree.select_leaf(1.41, &mut rng);
            assert_eq!(leaf, expanded);
            assert_eq!(tree.parent(leaf), Some(ROOT));
            assert_eq!(tree.node(leaf).visits(), 0);
            tree.backpropagate(leaf, 1.0);
            let expected = if expanded == 8 {
                Expansion::Full
            } else {
                Expansion::Partial
            };
            assert_eq!(tree.root().expansion(), expected);
        }
        assert_eq!(tree.children(ROOT).count(), 8);
        // The root is fully expanded: selection goes one level deeper.
        let leaf = tree.select_leaf(1.41, &mut rng);
        assert_eq!(tree.parent(leaf).and_then(|p| tree.parent(p)), Some(ROOT));
    }

    #[test]
    fn terminal_nodes_are_not_expanded() {
        let position = Position::try_from(
            "XXXXXXXXX/........./........./OO.OO.OO./........./O..O..O../........./........./......... X -",
        )
        .unwrap();
        let mut rng = rng();
        let mut tree = Tree::new(position, &mut rng);
        assert_eq!(tree.root().expansion(), Expansion::Terminal);
        assert_eq!(tree.select_leaf(1.41, &mut rng), ROOT);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn backpropagation_alternates_polarity() {
        let mut rng = rng();
        let mut tree = Tree::new(Position::starting(), &mut rng);
        let child = tree.expand(ROOT, parse("4 4"), &mut rng);
        let grandchild = tree.expand(child, parse("3 3"), &mut rng);
        assert_eq!(tree.node(grandchild).position().last_move(), Some(parse("3 3")));
        assert_eq!(tree.root().unexpanded.len(), 80);

        // The player who moved into the grandchild (O) won the playout.
        tree.backpropagate(grandchild, 1.0);
        assert_eq!(tree.node(grandchild).visits(), 1);
        assert_eq!(tree.node(child).visits(), 1);
        assert_eq!(tree.root().visits(), 1);
        assert!((tree.node(grandchild).score() - 1.0).abs() < f64::EPSILON);
        assert!((tree.node(child).score() + 1.0).abs() < f64::EPSILON);
        assert!((tree.root().score() - 1.0).abs() < f64::EPSILON);

        // A draw does not change the scores.
        tree.backpropagate(grandchild, 0.0);
        assert_eq!(tree.root().visits(), 2);
        assert!((tree.node(child).mean_score() + 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn most_visited_child_wins_over_best_score() {
        let mut rng = rng();
        let mut tree = Tree::new(Position::starting(), &mut rng);
        let popular = tree.expand(ROOT, parse("4 4"), &mut rng);
        let lucky = tree.expand(ROOT, parse("0 0"), &mut rng);
        for _ in 0..5 {
            tree.backpropagate(popular, 0.2);
        }
        tree.backpropagate(lucky, 1.0);
        assert_eq!(tree.most_visited_child(ROOT), Some(popular));
        assert_eq!(tree.best_child(ROOT, 0.0), Some(lucky));
        assert_eq!(tree.child(ROOT, parse("0 0")), Some(lucky));
        assert_eq!(tree.child(ROOT, parse("8 8")), None);
    }

    #[test]
    fn reroot_keeps_subtree_statistics() {
        let mut rng = rng();
        let mut tree = Tree::new(Position::starting(), &mut rng);
        let kept = tree.expand(ROOT, parse("4 4"), &mut rng);
        let dropped = tree.expand(ROOT, parse("0 0"), &mut rng);
        let first = tree.expand(kept, parse("3 3"), &mut rng);
        let second = tree.expand(kept, parse("5 5"), &mut rng);
        let deep = tree.expand(second, parse("7 7"), &mut rng);
        let _ = tree.expand(dropped, parse("1 1"), &mut rng);
        tree.backpropagate(first, 1.0);
        tree.backpropagate(deep, 1.0);
        assert_eq!(tree.len(), 7);

        tree.reroot(kept);
        assert_eq!(tree.len(), 4);
        assert_eq!(tree.parent(ROOT), None);
        assert_eq!(tree.root().action(), Some(parse("4 4")));
        assert_eq!(tree.root().visits(), 2);
        // -1 from the first playout, +1 from the second one.
        assert!(tree.root().score().abs() < f64::EPSILON);
        assert_eq!(tree.root().unexpanded.len(), 6);

        let children: Vec<NodeIndex> = tree.children(ROOT).collect();
        assert_eq!(children, vec![1, 2]);
        assert_eq!(tree.node(1).action(), Some(parse("3 3")));
        assert_eq!(tree.node(2).action(), Some(parse("5 5")));
        assert_eq!(tree.parent(3), Some(2));
        assert_eq!(tree.node(3).action(), Some(parse("7 7")));
        assert_eq!(tree.child(2, parse("7 7")), Some(3));
        assert!((tree.node(3).score() - 1.0).abs() < f64::EPSILON);
    }
}
