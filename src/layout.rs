//! Layered layout engine
//!
//! Algorithm
//! ---------
//!
//! Nodes of a DAG are assigned to horizontal ranks and positioned row by
//! row:
//!
//! 1. **Ranking** - every node's rank is its longest path from any source
//!    (Kahn's topological BFS). Ranks depend only on ancestors, so the
//!    children of a branch stay on one row even when one branch runs
//!    deeper.
//! 2. **Ordering** - within each rank, nodes are ordered by stable
//!    barycenter sweeps seeded with a port-respecting DFS, and each
//!    branch's direct children end up left-to-right in source-port order.
//! 3. **Coordinates** - rows are stacked top to bottom with the configured
//!    vertical gap and centered about the widest row; nodes inside a row
//!    are spaced by the horizontal gap.
//!
//! ```svgbob
//!            +-------+
//!            | (b)   |
//!            +-o-o-o-+
//!             /  |  \
//!   +-----+ +-----+ +-----+
//!   | (x) | | (y) | | (z) |
//!   +-----+ +-----+ +-----+
//!      |
//!   +-----+
//!   | (q) |
//!   +-----+
//! ```
//!
//! An optional compaction pass shrinks the gap between rank pairs whose
//! connecting edges carry no labels; the shift cascades to all later rows.
//!
//! Cycles are outside this engine's contract: ranking terminates, but the
//! resulting positions are unspecified.
use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};

use crate::algorithm::{longest_path_ranks, ordered_ranks};
use crate::config::LayoutConfig;
use crate::diagram::{handle_index, Diagram};
use crate::geometry::{Point, Rect, Size};

pub trait LayoutEngine {
    /// Place all nodes on 2D coordination.
    ///
    /// The engine must assign `origin` (and a measured `size` where the
    /// host left none) to every node. Returns the computed view box.
    fn place_nodes(&mut self, diagram: &mut Diagram) -> Option<Rect>;
}

#[derive(Debug, Default)]
pub struct LayeredLayoutEngine {
    config: LayoutConfig,
}

impl LayeredLayoutEngine {
    const ORIGIN: Point = Point::new(50.0, 50.0);

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: LayoutConfig) -> Self {
        Self { config }
    }
}

impl LayoutEngine for LayeredLayoutEngine {
    fn place_nodes(&mut self, diagram: &mut Diagram) -> Option<Rect> {
        if diagram.nodes().len() == 0 {
            return None;
        }

        let fallback = Size::new(self.config.node_width, self.config.node_height);

        // Mirror the records into a graph; edge weights are source-port
        // indices (an explicit `order` hint wins over the handle id).
        let mut graph: DiGraph<String, usize> = DiGraph::new();
        let mut indices: HashMap<String, NodeIndex> = HashMap::new();

        for node in diagram.nodes() {
            let idx = graph.add_node(node.id.clone());
            indices.insert(node.id.clone(), idx);
        }

        for edge in diagram.edges() {
            let (Some(&s), Some(&t)) = (
                indices.get(&edge.source_id),
                indices.get(&edge.target_id),
            ) else {
                continue;
            };

            let port = edge
                .order
                .or_else(|| handle_index(&edge.source_handle))
                .unwrap_or(0);
            graph.add_edge(s, t, port);
        }

        let ranks = longest_path_ranks(&graph);
        let rows = ordered_ranks(&graph, &ranks);

        let sizes: Vec<Size> = graph
            .node_indices()
            .map(|n| {
                diagram
                    .get_node(&graph[n])
                    .and_then(|record| record.size)
                    .unwrap_or(fallback)
            })
            .collect();

        // Row extents.
        let row_widths: Vec<f64> = rows
            .iter()
            .map(|row| {
                let nodes: f64 = row.iter().map(|n| sizes[n.index()].width).sum();
                let gaps = row.len().saturating_sub(1) as f64 * self.config.horizontal_gap;
                nodes + gaps
            })
            .collect();
        let row_heights: Vec<f64> = rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|n| sizes[n.index()].height)
                    .fold(0.0, f64::max)
            })
            .collect();
        let max_width = row_widths.iter().copied().fold(0.0, f64::max);

        // Stack rows, optionally pulling label-free rank pairs closer.
        let mut base_y = Self::ORIGIN.y;

        for (r, row) in rows.iter().enumerate() {
            if r > 0 {
                let gap = match self.config.compact_gap {
                    Some(compact) if !boundary_has_labels(diagram, &ranks, r) => compact,
                    _ => self.config.vertical_gap,
                };
                base_y += row_heights[r - 1] + gap;
            }

            let mut x = Self::ORIGIN.x + (max_width - row_widths[r]) / 2.0;

            for n in row {
                let record = diagram.get_node_mut(&graph[*n]).unwrap();
                record.origin = Some(Point::new(x, base_y));
                if record.size.is_none() {
                    record.size = Some(fallback);
                }

                x += sizes[n.index()].width + self.config.horizontal_gap;
            }
        }

        let height = base_y + row_heights.last().copied().unwrap_or(0.0) + Self::ORIGIN.y;
        Some(Rect::new(
            Point::zero(),
            Size::new(Self::ORIGIN.x * 2.0 + max_width, height),
        ))
    }
}

/// Whether any edge crossing the boundary between rank `r - 1` and rank `r`
/// carries a label.
fn boundary_has_labels(diagram: &Diagram, ranks: &[usize], r: usize) -> bool {
    let rank_of = |id: &str| {
        diagram
            .nodes()
            .position(|n| n.id == id)
            .map(|i| ranks[i])
    };

    diagram.edges().any(|edge| {
        if edge.label.is_none() {
            return false;
        }
        let (Some(s), Some(t)) = (rank_of(&edge.source_id), rank_of(&edge.target_id)) else {
            return false;
        };
        s < r && t >= r
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagram::{EdgeRecord, EdgeRecordBuilder, NodeRecord};

    fn branch_diagram() -> Diagram {
        let mut diagram = Diagram::new();
        for id in ["b", "x", "y", "z"] {
            diagram.add_node(NodeRecord::new(id));
        }

        // Edge insertion order deliberately disagrees with port order.
        for (id, target, handle) in [
            ("b->z", "z", "output-2"),
            ("b->x", "x", "output-0"),
            ("b->y", "y", "output-1"),
        ] {
            let mut edge = EdgeRecord::new(id, "b", target);
            edge.source_handle = handle.into();
            diagram.add_edge(edge);
        }

        diagram
    }

    fn origin_of(diagram: &Diagram, id: &str) -> Point {
        diagram.get_node(id).unwrap().origin.unwrap()
    }

    #[test]
    fn children_line_up_in_port_order() {
        let mut diagram = branch_diagram();
        let view_box = LayeredLayoutEngine::new().place_nodes(&mut diagram);

        assert!(view_box.is_some());

        let (x, y, z) = (
            origin_of(&diagram, "x"),
            origin_of(&diagram, "y"),
            origin_of(&diagram, "z"),
        );

        assert!(x.x < y.x && y.x < z.x);
        assert_eq!(x.y, y.y);
        assert_eq!(y.y, z.y);
        // All children sit one rank below the branch.
        assert!(origin_of(&diagram, "b").y < x.y);
    }

    #[test]
    fn deepening_one_branch_leaves_the_others_alone() {
        let mut plain = branch_diagram();
        LayeredLayoutEngine::new().place_nodes(&mut plain);

        let mut grown = branch_diagram();
        for (id, source, target) in [
            ("x->x1", "x", "x1"),
            ("x1->x2", "x1", "x2"),
            ("x2->x3", "x2", "x3"),
        ] {
            grown.add_node(NodeRecord::new(target));
            grown.add_edge(EdgeRecord::new(id, source, target));
        }
        LayeredLayoutEngine::new().place_nodes(&mut grown);

        // y and z keep their rank row.
        assert_eq!(origin_of(&plain, "y").y, origin_of(&grown, "y").y);
        assert_eq!(origin_of(&plain, "z").y, origin_of(&grown, "z").y);

        let (x, y, z) = (
            origin_of(&grown, "x"),
            origin_of(&grown, "y"),
            origin_of(&grown, "z"),
        );
        assert!(x.x < y.x && y.x < z.x);
    }

    #[test]
    fn ranks_respect_every_edge() {
        let mut diagram = Diagram::new();
        for id in ["a", "b", "c", "d"] {
            diagram.add_node(NodeRecord::new(id));
        }
        for (id, s, t) in [
            ("a->b", "a", "b"),
            ("b->c", "b", "c"),
            ("a->c", "a", "c"),
            ("c->d", "c", "d"),
        ] {
            diagram.add_edge(EdgeRecord::new(id, s, t));
        }

        LayeredLayoutEngine::new().place_nodes(&mut diagram);

        for edge in diagram.edges().collect::<Vec<_>>() {
            let s = origin_of(&diagram, &edge.source_id);
            let t = origin_of(&diagram, &edge.target_id);
            assert!(t.y > s.y, "edge {} must point downwards", edge.id);
        }
    }

    #[test]
    fn isolated_nodes_sit_on_the_first_row() {
        let mut diagram = Diagram::new();
        diagram.add_node(NodeRecord::new("alone"));
        diagram.add_node(NodeRecord::new("a"));
        diagram.add_node(NodeRecord::new("b"));
        diagram.add_edge(EdgeRecord::new("a->b", "a", "b"));

        LayeredLayoutEngine::new().place_nodes(&mut diagram);

        assert_eq!(
            origin_of(&diagram, "alone").y,
            origin_of(&diagram, "a").y
        );
    }

    #[test]
    fn compaction_pulls_unlabelled_rank_pairs_closer() {
        let make = |labelled: bool| {
            let mut diagram = Diagram::new();
            for id in ["a", "b", "c"] {
                diagram.add_node(NodeRecord::new(id));
            }
            diagram.add_edge(
                EdgeRecordBuilder::default()
                    .id("a->b")
                    .source_id("a")
                    .target_id("b")
                    .label(labelled.then(|| "keep apart".to_string()))
                    .build()
                    .unwrap(),
            );
            diagram.add_edge(EdgeRecord::new("b->c", "b", "c"));
            diagram
        };

        let mut config = LayoutConfig::default();
        config.compact_gap = Some(20.0);

        let mut labelled = make(true);
        LayeredLayoutEngine::with_config(config.clone()).place_nodes(&mut labelled);

        let mut unlabelled = make(false);
        LayeredLayoutEngine::with_config(config).place_nodes(&mut unlabelled);

        let labelled_gap = origin_of(&labelled, "b").y - origin_of(&labelled, "a").y;
        let unlabelled_gap = origin_of(&unlabelled, "b").y - origin_of(&unlabelled, "a").y;
        assert!(unlabelled_gap < labelled_gap);

        // The shift cascades: c moves up by the same amount.
        let delta = origin_of(&labelled, "c").y - origin_of(&unlabelled, "c").y;
        assert_eq!(delta, labelled_gap - unlabelled_gap);
    }

    #[test]
    fn empty_diagram_has_no_view_box() {
        let mut diagram = Diagram::new();
        assert!(LayeredLayoutEngine::new().place_nodes(&mut diagram).is_none());
    }
}
