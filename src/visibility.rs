//! Visibility filter: collapsed branch groups and bypass edges.
//!
//! A branch node with two or more direct children and a merge node
//! reachable from all of them forms a *branch group*: everything strictly
//! between the branch and the merge belongs to the group.
//!
//! ```svgbob
//!        B              B  <- collapsed
//!       / \             |
//!      L   R     =>     |   (bypass)
//!       \ /             v
//!        M              E
//!        |
//!        E
//! ```
//!
//! - Collapsing the branch hides the whole group *and* the merge, and a
//!   bypass edge is synthesised from the branch to each of the merge's
//!   successors.
//! - Collapsing a direct child hides only that child's slice of the group,
//!   from the child (inclusive) to the merge (exclusive); the merge stays.
//!
//! Edges survive iff both endpoints stay visible. An input without any
//! `collapsed` flag comes back unchanged.
use std::collections::{HashMap, HashSet, VecDeque};

use fixedbitset::FixedBitSet;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::diagram::{Diagram, EdgeRecord};

/// Produces the visible subgraph of a diagram with collapsed nodes.
pub fn visible_subgraph(diagram: &Diagram) -> Diagram {
    if !diagram.nodes().any(|n| n.collapsed) {
        return diagram.clone();
    }

    let ids: Vec<&str> = diagram.nodes().map(|n| n.id.as_str()).collect();
    let index_of: HashMap<&str, NodeIndex> = ids
        .iter()
        .enumerate()
        .map(|(i, id)| (*id, NodeIndex::new(i)))
        .collect();

    let mut graph: DiGraph<(), ()> = DiGraph::new();
    for _ in &ids {
        graph.add_node(());
    }
    for edge in diagram.edges() {
        if let (Some(&s), Some(&t)) = (
            index_of.get(edge.source_id.as_str()),
            index_of.get(edge.target_id.as_str()),
        ) {
            graph.add_edge(s, t, ());
        }
    }

    let n = graph.node_count();
    let mut hidden = FixedBitSet::with_capacity(n);
    let mut bypasses: Vec<(usize, usize)> = vec![];

    for (bi, branch) in diagram.nodes().enumerate() {
        let b = NodeIndex::new(bi);
        let children = direct_children(&graph, b);
        if children.len() < 2 {
            continue;
        }
        let Some(m) = merge_point(&graph, diagram, b, &children) else {
            continue;
        };

        let to_merge = reachable(&graph, m, Direction::Incoming);

        if branch.collapsed {
            // Hide the whole group plus the merge, then jump straight to
            // the merge's continuation.
            let from_branch = reachable(&graph, b, Direction::Outgoing);
            for i in 0..n {
                if from_branch.contains(i) && to_merge.contains(i) && i != b.index() {
                    hidden.insert(i);
                }
            }
            hidden.insert(m.index());

            for s in graph.neighbors_directed(m, Direction::Outgoing) {
                bypasses.push((bi, s.index()));
            }
        } else {
            for c in &children {
                let child = diagram.nodes().nth(c.index()).unwrap();
                if !child.collapsed {
                    continue;
                }

                let from_child = reachable(&graph, *c, Direction::Outgoing);
                for i in 0..n {
                    if from_child.contains(i) && to_merge.contains(i) && i != m.index() {
                        hidden.insert(i);
                    }
                }
            }
        }
    }

    // Rebuild the diagram from the survivors.
    let mut out = Diagram::new();
    for (i, node) in diagram.nodes().enumerate() {
        if !hidden.contains(i) {
            out.add_node(node.clone());
        }
    }

    let visible = |id: &str| index_of.get(id).map_or(false, |i| !hidden.contains(i.index()));
    for edge in diagram.edges() {
        if visible(&edge.source_id) && visible(&edge.target_id) {
            out.add_edge(edge.clone());
        }
    }

    let mut seen: HashSet<(usize, usize)> = out
        .edges()
        .filter_map(|e| {
            let s = index_of.get(e.source_id.as_str())?;
            let t = index_of.get(e.target_id.as_str())?;
            Some((s.index(), t.index()))
        })
        .collect();

    for (b, s) in bypasses {
        if hidden.contains(b) || hidden.contains(s) {
            continue;
        }
        if !seen.insert((b, s)) {
            continue;
        }

        out.add_edge(EdgeRecord::new(
            format!("bypass-{}-{}", ids[b], ids[s]),
            ids[b],
            ids[s],
        ));
    }

    out
}

/// Distinct direct successors, in edge order.
fn direct_children(graph: &DiGraph<(), ()>, b: NodeIndex) -> Vec<NodeIndex> {
    let mut children: Vec<NodeIndex> = vec![];
    let mut walker = graph
        .neighbors_directed(b, Direction::Outgoing)
        .collect::<Vec<_>>();
    // petgraph iterates neighbors in reverse insertion order.
    walker.reverse();

    for c in walker {
        if !children.contains(&c) {
            children.push(c);
        }
    }
    children
}

/// The merge closing a branch: a merge-marked node reachable from every
/// direct child, nearest to the branch (BFS depth, then node order).
fn merge_point(
    graph: &DiGraph<(), ()>,
    diagram: &Diagram,
    b: NodeIndex,
    children: &[NodeIndex],
) -> Option<NodeIndex> {
    let mut intersection: Option<FixedBitSet> = None;

    for c in children {
        let r = reachable(graph, *c, Direction::Outgoing);
        intersection = Some(match intersection {
            None => r,
            Some(mut i) => {
                i.intersect_with(&r);
                i
            }
        });
    }

    let intersection = intersection?;
    let depths = bfs_depths(graph, b);

    diagram
        .nodes()
        .enumerate()
        .filter(|(i, rec)| rec.is_merge && intersection.contains(*i))
        .min_by_key(|(i, _)| (depths[*i].unwrap_or(usize::MAX), *i))
        .map(|(i, _)| NodeIndex::new(i))
}

/// Every node reachable from `start` along `dir`, including `start`.
fn reachable(graph: &DiGraph<(), ()>, start: NodeIndex, dir: Direction) -> FixedBitSet {
    let mut seen = FixedBitSet::with_capacity(graph.node_count());
    let mut stack = vec![start];

    while let Some(n) = stack.pop() {
        if seen.contains(n.index()) {
            continue;
        }
        seen.insert(n.index());

        for m in graph.neighbors_directed(n, dir) {
            if !seen.contains(m.index()) {
                stack.push(m);
            }
        }
    }

    seen
}

fn bfs_depths(graph: &DiGraph<(), ()>, start: NodeIndex) -> Vec<Option<usize>> {
    let mut depths = vec![None; graph.node_count()];
    let mut queue = VecDeque::from([start]);
    depths[start.index()] = Some(0);

    while let Some(n) = queue.pop_front() {
        let d = depths[n.index()].unwrap();

        for m in graph.neighbors_directed(n, Direction::Outgoing) {
            if depths[m.index()].is_none() {
                depths[m.index()] = Some(d + 1);
                queue.push_back(m);
            }
        }
    }

    depths
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagram::{NodeRecord, NodeRecordBuilder};

    fn merge_node(id: &str) -> NodeRecord {
        NodeRecordBuilder::default().id(id).is_merge(true).build().unwrap()
    }

    fn collapsed(id: &str) -> NodeRecord {
        NodeRecordBuilder::default().id(id).collapsed(true).build().unwrap()
    }

    /// pre -> B -> {L, R} -> M -> E
    fn branch_group(collapse_branch: bool, collapse_left: bool) -> Diagram {
        let mut diagram = Diagram::new();

        diagram.add_node(NodeRecord::new("pre"));
        diagram.add_node(if collapse_branch {
            collapsed("b")
        } else {
            NodeRecord::new("b")
        });
        diagram.add_node(if collapse_left {
            collapsed("l")
        } else {
            NodeRecord::new("l")
        });
        diagram.add_node(NodeRecord::new("r"));
        diagram.add_node(merge_node("m"));
        diagram.add_node(NodeRecord::new("e"));

        for (id, s, t) in [
            ("pre->b", "pre", "b"),
            ("b->l", "b", "l"),
            ("b->r", "b", "r"),
            ("l->m", "l", "m"),
            ("r->m", "r", "m"),
            ("m->e", "m", "e"),
        ] {
            diagram.add_edge(EdgeRecord::new(id, s, t));
        }

        diagram
    }

    fn node_ids(diagram: &Diagram) -> Vec<&str> {
        diagram.nodes().map(|n| n.id.as_str()).collect()
    }

    fn edge_ids(diagram: &Diagram) -> Vec<&str> {
        diagram.edges().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn no_collapsed_flags_is_identity() {
        let diagram = branch_group(false, false);
        let filtered = visible_subgraph(&diagram);

        assert_eq!(node_ids(&filtered), node_ids(&diagram));
        assert_eq!(edge_ids(&filtered), edge_ids(&diagram));
    }

    #[test]
    fn collapsing_the_branch_hides_the_group_and_bridges_to_the_successor() {
        let filtered = visible_subgraph(&branch_group(true, false));

        assert_eq!(node_ids(&filtered), vec!["pre", "b", "e"]);
        assert_eq!(edge_ids(&filtered), vec!["pre->b", "bypass-b-e"]);

        let bypass = filtered.edges().find(|e| e.id == "bypass-b-e").unwrap();
        assert_eq!(bypass.source_id, "b");
        assert_eq!(bypass.target_id, "e");
    }

    #[test]
    fn collapsing_one_child_keeps_the_merge() {
        let filtered = visible_subgraph(&branch_group(false, true));

        assert_eq!(node_ids(&filtered), vec!["pre", "b", "r", "m", "e"]);
        assert_eq!(
            edge_ids(&filtered),
            vec!["pre->b", "b->r", "r->m", "m->e"]
        );
    }

    #[test]
    fn bypasses_deduplicate_by_endpoint_pair() {
        // Two parallel edges m -> e yield a single bypass.
        let mut diagram = branch_group(true, false);
        diagram.add_edge(EdgeRecord::new("m->e-again", "m", "e"));

        let filtered = visible_subgraph(&diagram);

        assert_eq!(edge_ids(&filtered), vec!["pre->b", "bypass-b-e"]);
    }

    #[test]
    fn collapse_without_a_merge_changes_nothing() {
        // Branch with two children but no merge: no group, no hiding.
        let mut diagram = Diagram::new();
        diagram.add_node(collapsed("b"));
        diagram.add_node(NodeRecord::new("l"));
        diagram.add_node(NodeRecord::new("r"));
        diagram.add_edge(EdgeRecord::new("b->l", "b", "l"));
        diagram.add_edge(EdgeRecord::new("b->r", "b", "r"));

        let filtered = visible_subgraph(&diagram);

        assert_eq!(node_ids(&filtered), vec!["b", "l", "r"]);
        assert_eq!(edge_ids(&filtered), vec!["b->l", "b->r"]);
    }

    #[test]
    fn nested_chain_inside_a_branch_is_hidden_with_it() {
        // The left branch runs through two nodes before the merge.
        let mut diagram = Diagram::new();
        diagram.add_node(collapsed("b"));
        for id in ["l1", "l2", "r"] {
            diagram.add_node(NodeRecord::new(id));
        }
        diagram.add_node(merge_node("m"));
        diagram.add_node(NodeRecord::new("e"));

        for (id, s, t) in [
            ("b->l1", "b", "l1"),
            ("l1->l2", "l1", "l2"),
            ("l2->m", "l2", "m"),
            ("b->r", "b", "r"),
            ("r->m", "r", "m"),
            ("m->e", "m", "e"),
        ] {
            diagram.add_edge(EdgeRecord::new(id, s, t));
        }

        let filtered = visible_subgraph(&diagram);

        assert_eq!(node_ids(&filtered), vec!["b", "e"]);
        assert_eq!(edge_ids(&filtered), vec!["bypass-b-e"]);
    }
}
