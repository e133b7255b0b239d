use fixedbitset::FixedBitSet;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

/// Number of down/up barycenter sweep rounds. Small diagrams converge in
/// one; a second round settles skip-level edges.
const SWEEP_ROUNDS: usize = 2;

/// Computes a left-to-right node order for every rank.
///
/// Edge weights are source-port indices. The classic barycenter method is
/// port-blind, so two refinements keep a branch's children in handle order:
///
/// - the initial order comes from a DFS that visits children sorted by port
///   index, and the barycenter sorts are stable, so equal-barycenter
///   siblings never swap;
/// - after the sweeps, every branch's direct children that share a rank are
///   permuted within their slots into port order.
pub fn ordered_ranks<N>(graph: &DiGraph<N, usize>, ranks: &[usize]) -> Vec<Vec<NodeIndex>> {
    let depth = ranks.iter().copied().max().map_or(0, |d| d + 1);
    let mut rows: Vec<Vec<NodeIndex>> = vec![vec![]; depth];

    for n in discovery_order(graph) {
        rows[ranks[n.index()]].push(n);
    }

    for _ in 0..SWEEP_ROUNDS {
        sweep(graph, &mut rows, Direction::Incoming);
        sweep(graph, &mut rows, Direction::Outgoing);
    }

    enforce_port_order(graph, &mut rows);
    rows
}

/// Preorder DFS from every source, visiting children in (port, insertion)
/// order. Nodes unreachable from any source (cycles) trail in insertion
/// order.
fn discovery_order<N>(graph: &DiGraph<N, usize>) -> Vec<NodeIndex> {
    let mut visited = FixedBitSet::with_capacity(graph.node_count());
    let mut order = Vec::with_capacity(graph.node_count());
    let mut stack: Vec<NodeIndex> = vec![];

    let roots: Vec<NodeIndex> = graph
        .node_indices()
        .filter(|n| {
            graph
                .neighbors_directed(*n, Direction::Incoming)
                .next()
                .is_none()
        })
        .collect();

    for root in roots {
        stack.push(root);

        while let Some(n) = stack.pop() {
            if visited.contains(n.index()) {
                continue;
            }
            visited.insert(n.index());
            order.push(n);

            let mut children: Vec<(usize, NodeIndex)> = graph
                .edges(n)
                .map(|e| (*e.weight(), e.target()))
                .collect();
            children.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.index().cmp(&b.1.index())));

            // Reverse so the lowest port pops first.
            for (_, child) in children.into_iter().rev() {
                if !visited.contains(child.index()) {
                    stack.push(child);
                }
            }
        }
    }

    for n in graph.node_indices() {
        if !visited.contains(n.index()) {
            order.push(n);
        }
    }

    order
}

/// One barycenter pass. Rows re-sort towards the mean position of their
/// neighbors on the given side; nodes without neighbors hold their slot.
fn sweep<N>(graph: &DiGraph<N, usize>, rows: &mut [Vec<NodeIndex>], dir: Direction) {
    let row_range: Vec<usize> = match dir {
        Direction::Incoming => (0..rows.len()).collect(),
        Direction::Outgoing => (0..rows.len()).rev().collect(),
    };

    for r in row_range {
        let mut pos = vec![0f64; graph.node_count()];
        for row in rows.iter() {
            for (i, n) in row.iter().enumerate() {
                pos[n.index()] = i as f64;
            }
        }

        let mut keyed: Vec<(f64, NodeIndex)> = rows[r]
            .iter()
            .enumerate()
            .map(|(i, &n)| {
                let neighbors: Vec<f64> = graph
                    .neighbors_directed(n, dir)
                    .map(|m| pos[m.index()])
                    .collect();

                let barycenter = if neighbors.is_empty() {
                    i as f64
                } else {
                    neighbors.iter().sum::<f64>() / neighbors.len() as f64
                };

                (barycenter, n)
            })
            .collect();

        keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
        rows[r] = keyed.into_iter().map(|(_, n)| n).collect();
    }
}

/// For every branch, permutes its same-rank direct children within their
/// occupied slots so their left-to-right order matches their port indices.
fn enforce_port_order<N>(graph: &DiGraph<N, usize>, rows: &mut [Vec<NodeIndex>]) {
    for parent in graph.node_indices() {
        let mut children: Vec<(usize, NodeIndex)> = graph
            .edges(parent)
            .map(|e| (*e.weight(), e.target()))
            .collect();
        if children.len() < 2 {
            continue;
        }
        children.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.index().cmp(&b.1.index())));

        // Parallel edges to one child keep only the lowest port.
        let mut seen = FixedBitSet::with_capacity(graph.node_count());
        children.retain(|(_, c)| {
            let fresh = !seen.contains(c.index());
            seen.insert(c.index());
            fresh
        });

        for row in rows.iter_mut() {
            let slots: Vec<usize> = row
                .iter()
                .enumerate()
                .filter(|(_, n)| children.iter().any(|(_, c)| c == *n))
                .map(|(i, _)| i)
                .collect();
            if slots.len() < 2 {
                continue;
            }

            let ordered: Vec<NodeIndex> = children
                .iter()
                .filter(|(_, c)| row.contains(c))
                .map(|(_, c)| *c)
                .collect();

            for (slot, child) in slots.into_iter().zip(ordered) {
                row[slot] = child;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::longest_path_ranks;

    fn positions(rows: &[Vec<NodeIndex>]) -> Vec<(NodeIndex, usize, usize)> {
        rows.iter()
            .enumerate()
            .flat_map(|(r, row)| row.iter().enumerate().map(move |(i, n)| (*n, r, i)))
            .collect()
    }

    fn slot_of(rows: &[Vec<NodeIndex>], n: NodeIndex) -> (usize, usize) {
        positions(rows)
            .into_iter()
            .find(|(m, _, _)| *m == n)
            .map(|(_, r, i)| (r, i))
            .unwrap()
    }

    #[test]
    fn children_follow_port_indices() {
        let mut g: DiGraph<&str, usize> = DiGraph::new();
        let b = g.add_node("b");
        let x = g.add_node("x");
        let y = g.add_node("y");
        let z = g.add_node("z");

        // Inserted backwards on purpose; the port index must win.
        g.add_edge(b, z, 2);
        g.add_edge(b, y, 1);
        g.add_edge(b, x, 0);

        let ranks = longest_path_ranks(&g);
        let rows = ordered_ranks(&g, &ranks);

        assert_eq!(rows[1], vec![x, y, z]);
    }

    #[test]
    fn deep_branches_do_not_break_sibling_order() {
        let mut g: DiGraph<&str, usize> = DiGraph::new();
        let b = g.add_node("b");
        let x = g.add_node("x");
        let y = g.add_node("y");
        let z = g.add_node("z");
        g.add_edge(b, x, 0);
        g.add_edge(b, y, 1);
        g.add_edge(b, z, 2);

        // A chain under x pulls barycenters around; x, y, z must stay put.
        let x1 = g.add_node("x1");
        let x2 = g.add_node("x2");
        let x3 = g.add_node("x3");
        g.add_edge(x, x1, 0);
        g.add_edge(x1, x2, 0);
        g.add_edge(x2, x3, 0);

        let ranks = longest_path_ranks(&g);
        let rows = ordered_ranks(&g, &ranks);

        let (rx, ix) = slot_of(&rows, x);
        let (ry, iy) = slot_of(&rows, y);
        let (rz, iz) = slot_of(&rows, z);

        assert_eq!(rx, ry);
        assert_eq!(ry, rz);
        assert!(ix < iy && iy < iz);
    }

    #[test]
    fn barycenter_keeps_a_diamond_untangled() {
        //  a   b        parents in a fixed order
        //  |\ /|
        //  | X |        children connected crosswise must not cross
        //  |/ \|
        //  a1  b1
        let mut g: DiGraph<&str, usize> = DiGraph::new();
        let a = g.add_node("a");
        let b = g.add_node("b");
        let b1 = g.add_node("b1");
        let a1 = g.add_node("a1");
        g.add_edge(a, a1, 0);
        g.add_edge(b, b1, 0);

        let ranks = longest_path_ranks(&g);
        let rows = ordered_ranks(&g, &ranks);

        let (_, ia) = slot_of(&rows, a);
        let (_, ib) = slot_of(&rows, b);
        let (_, ia1) = slot_of(&rows, a1);
        let (_, ib1) = slot_of(&rows, b1);

        // a precedes b, so a's child precedes b's child.
        assert!(ia < ib);
        assert!(ia1 < ib1);
    }

    #[test]
    fn every_node_lands_in_exactly_one_row() {
        let mut g: DiGraph<u32, usize> = DiGraph::new();
        let nodes: Vec<_> = (0..7).map(|i| g.add_node(i)).collect();
        g.add_edge(nodes[0], nodes[1], 0);
        g.add_edge(nodes[0], nodes[2], 1);
        g.add_edge(nodes[1], nodes[3], 0);
        g.add_edge(nodes[2], nodes[3], 0);
        g.add_edge(nodes[3], nodes[4], 0);

        let ranks = longest_path_ranks(&g);
        let rows = ordered_ranks(&g, &ranks);

        let mut seen: Vec<NodeIndex> = rows.iter().flatten().copied().collect();
        seen.sort();
        let mut expected: Vec<NodeIndex> = g.node_indices().collect();
        expected.sort();
        assert_eq!(seen, expected);
    }
}
