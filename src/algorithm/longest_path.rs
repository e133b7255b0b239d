use std::collections::VecDeque;

use petgraph::graph::DiGraph;
use petgraph::Direction;

/// Assigns every node its longest-path-from-any-source rank using Kahn's
/// topological BFS.
///
/// Ranks depend only on ancestors, never on subtree depth: two nodes fed by
/// the same parent land on the same rank even when one branch runs much
/// deeper. This is what keeps the children of a branch node aligned on one
/// row.
///
/// ```svgbob
/// rank 0        B
///             / | \
/// rank 1    X  Y  Z
///           |
/// rank 2    X1
///           |
/// rank 3    X2
/// ```
///
/// Sources and isolated nodes rank 0. The input must be acyclic; nodes on a
/// cycle never drain out of the queue and keep rank 0.
pub fn longest_path_ranks<N, E>(graph: &DiGraph<N, E>) -> Vec<usize> {
    let mut indegree: Vec<usize> = graph
        .node_indices()
        .map(|n| graph.neighbors_directed(n, Direction::Incoming).count())
        .collect();
    let mut rank = vec![0usize; graph.node_count()];

    let mut queue: VecDeque<_> = graph
        .node_indices()
        .filter(|n| indegree[n.index()] == 0)
        .collect();

    while let Some(n) = queue.pop_front() {
        for m in graph.neighbors_directed(n, Direction::Outgoing) {
            rank[m.index()] = rank[m.index()].max(rank[n.index()] + 1);
            indegree[m.index()] -= 1;
            if indegree[m.index()] == 0 {
                queue.push_back(m);
            }
        }
    }

    rank
}
