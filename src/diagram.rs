//! Host-neutral document model.
//!
//! The routing core copies scalar fields out of whatever node/edge storage
//! the host keeps; it never retains references into host objects. A
//! [`Diagram`] is the bag of [`NodeRecord`]s and [`EdgeRecord`]s one routing
//! or layout pass consumes, and a [`RoutingResult`] is what the pass hands
//! back, keyed by edge id.
//!
//! Handle ids follow the `output-<i>` / `input-<i>` convention with `i`
//! zero-based. When a node carries no measured handle bounds, port positions
//! come from the default port-layout formula: the `i`-th of `N` handles on
//! one side sits at perpendicular offset `(i - (N - 1) / 2) * 8` from the
//! side's midpoint.
use std::collections::BTreeMap;

use derive_builder::Builder;
use smallvec::SmallVec;

use crate::config::RoutingOverrides;
use crate::geometry::{Orientation, Point, Rect, Size};

/// Fixed inter-port spacing of the default port-layout formula, in px.
pub const PORT_SPACING: f64 = 8.0;

/// Perpendicular offset of the `index`-th of `count` ports from the side
/// midpoint.
pub fn port_offset(index: usize, count: usize) -> f64 {
    (index as f64 - (count.max(1) as f64 - 1.0) / 2.0) * PORT_SPACING
}

/// Absolute position of a synthesised port on a node side.
///
/// This formula is a contract shared by the port resolver and the layout
/// engine; computing it differently in one place attaches edges at the
/// wrong coordinate.
pub fn default_port_position(rect: &Rect, side: Orientation, index: usize, count: usize) -> Point {
    let offset = port_offset(index, count);

    match side {
        Orientation::Up => Point::new(rect.mid_x() + offset, rect.min_y()),
        Orientation::Down => Point::new(rect.mid_x() + offset, rect.max_y()),
        Orientation::Left => Point::new(rect.min_x(), rect.mid_y() + offset),
        Orientation::Right => Point::new(rect.max_x(), rect.mid_y() + offset),
    }
}

/// Extracts the zero-based index from a `output-<i>` / `input-<i>` handle id.
pub fn handle_index(id: &str) -> Option<usize> {
    id.rsplit_once('-').and_then(|(_, i)| i.parse().ok())
}

/// A measured handle rectangle, relative to the node's top-left corner.
#[derive(Debug, Clone, PartialEq, Builder)]
#[builder(default)]
pub struct HandleBounds {
    #[builder(setter(into))]
    pub id: String,
    pub offset: Point,
    pub size: Size,
    pub side: Orientation,
}

impl Default for HandleBounds {
    fn default() -> Self {
        Self {
            id: String::new(),
            offset: Point::zero(),
            size: Size::zero(),
            side: Orientation::Down,
        }
    }
}

impl HandleBounds {
    /// Center of the handle in world coordinates, given the owning node's
    /// origin.
    pub fn center(&self, node_origin: &Point) -> Point {
        Point::new(
            node_origin.x + self.offset.x + self.size.width / 2.0,
            node_origin.y + self.offset.y + self.size.height / 2.0,
        )
    }
}

/// Scalar copy of one host node.
#[derive(Debug, Clone, Default, Builder)]
#[builder(default)]
pub struct NodeRecord {
    #[builder(setter(into))]
    pub id: String,
    /// The origin (absolute in the global coordination). `None` until the
    /// host measures the node or the layout engine places it.
    pub origin: Option<Point>,
    pub size: Option<Size>,
    pub label: Option<String>,
    /// Merge nodes act as single-target receivers whose entry side is
    /// chosen by the orchestrator.
    pub is_merge: bool,
    pub collapsed: bool,
    pub source_handles: SmallVec<[HandleBounds; 4]>,
    pub target_handles: SmallVec<[HandleBounds; 4]>,
}

impl NodeRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    // --- Geometry

    pub fn rect(&self) -> Option<Rect> {
        self.origin
            .and_then(|origin| self.size.map(|size| Rect::new(origin, size)))
    }

    /// The node's rectangle, substituting `fallback` for an unmeasured size.
    /// An unplaced node sits at the global origin.
    pub fn measured_rect(&self, fallback: Size) -> Rect {
        Rect::new(
            self.origin.unwrap_or_else(Point::zero),
            self.size.unwrap_or(fallback),
        )
    }

    // --- Handles

    pub fn source_handle(&self, id: &str) -> Option<&HandleBounds> {
        self.source_handles.iter().find(|h| h.id == id)
    }

    pub fn target_handle(&self, id: &str) -> Option<&HandleBounds> {
        self.target_handles.iter().find(|h| h.id == id)
    }
}

/// Scalar copy of one host edge.
#[derive(Debug, Clone, Builder)]
#[builder(default)]
pub struct EdgeRecord {
    #[builder(setter(into))]
    pub id: String,
    #[builder(setter(into))]
    pub source_id: String,
    #[builder(setter(into))]
    pub source_handle: String,
    #[builder(setter(into))]
    pub target_id: String,
    #[builder(setter(into))]
    pub target_handle: String,
    pub label: Option<String>,
    pub routing: Option<RoutingOverrides>,
    /// Sibling-order hint consumed by the layered layout.
    pub order: Option<usize>,
}

impl Default for EdgeRecord {
    fn default() -> Self {
        Self {
            id: String::new(),
            source_id: String::new(),
            source_handle: "output-0".into(),
            target_id: String::new(),
            target_handle: "input-0".into(),
            label: None,
            routing: None,
            order: None,
        }
    }
}

impl EdgeRecord {
    pub fn new(
        id: impl Into<String>,
        source_id: impl Into<String>,
        target_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source_id: source_id.into(),
            target_id: target_id.into(),
            ..Self::default()
        }
    }
}

/// The bag of records one pass consumes.
#[derive(Debug, Clone, Default)]
pub struct Diagram {
    nodes: Vec<NodeRecord>,
    edges: Vec<EdgeRecord>,
}

impl Diagram {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Nodes

    pub fn nodes(&self) -> impl ExactSizeIterator<Item = &NodeRecord> {
        self.nodes.iter()
    }

    pub fn nodes_mut(&mut self) -> impl ExactSizeIterator<Item = &mut NodeRecord> {
        self.nodes.iter_mut()
    }

    pub fn get_node(&self, id: &str) -> Option<&NodeRecord> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn get_node_mut(&mut self, id: &str) -> Option<&mut NodeRecord> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn add_node(&mut self, node: NodeRecord) {
        self.nodes.push(node);
    }

    // --- Edges

    pub fn edges(&self) -> impl ExactSizeIterator<Item = &EdgeRecord> {
        self.edges.iter()
    }

    pub fn edges_mut(&mut self) -> impl ExactSizeIterator<Item = &mut EdgeRecord> {
        self.edges.iter_mut()
    }

    pub fn add_edge(&mut self, edge: EdgeRecord) {
        self.edges.push(edge);
    }

    /// Outgoing edges of a node, in record order.
    pub fn outgoing<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a EdgeRecord> + 'a {
        self.edges.iter().filter(move |e| e.source_id == node_id)
    }

    /// Incoming edges of a node, in record order.
    pub fn incoming<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a EdgeRecord> + 'a {
        self.edges.iter().filter(move |e| e.target_id == node_id)
    }
}

/// One routed edge as handed back to the host.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutedEdge {
    pub points: Vec<Point>,
    pub svg_path: String,
}

/// Routing output for a whole batch, keyed by edge id. Iteration order is
/// the id order, so repeated runs emit identical sequences.
#[derive(Debug, Clone, Default)]
pub struct RoutingResult {
    routes: BTreeMap<String, RoutedEdge>,
}

impl RoutingResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, edge_id: impl Into<String>, route: RoutedEdge) {
        self.routes.insert(edge_id.into(), route);
    }

    pub fn get(&self, edge_id: &str) -> Option<&RoutedEdge> {
        self.routes.get(edge_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &RoutedEdge)> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_formula_centers_on_midpoint() {
        // A single port sits exactly on the side midpoint.
        assert_eq!(port_offset(0, 1), 0.0);

        // Three ports spread symmetrically at the fixed spacing.
        assert_eq!(port_offset(0, 3), -8.0);
        assert_eq!(port_offset(1, 3), 0.0);
        assert_eq!(port_offset(2, 3), 8.0);

        // Two ports straddle the midpoint.
        assert_eq!(port_offset(0, 2), -4.0);
        assert_eq!(port_offset(1, 2), 4.0);
    }

    #[test]
    fn port_positions_per_side() {
        let rect = Rect::new(Point::new(0.0, 0.0), Size::new(100.0, 40.0));

        assert_eq!(
            default_port_position(&rect, Orientation::Down, 0, 1),
            Point::new(50.0, 40.0)
        );
        assert_eq!(
            default_port_position(&rect, Orientation::Up, 0, 1),
            Point::new(50.0, 0.0)
        );
        assert_eq!(
            default_port_position(&rect, Orientation::Left, 0, 1),
            Point::new(0.0, 20.0)
        );
        assert_eq!(
            default_port_position(&rect, Orientation::Right, 1, 2),
            Point::new(100.0, 24.0)
        );
    }

    #[test]
    fn handle_id_convention() {
        assert_eq!(handle_index("output-0"), Some(0));
        assert_eq!(handle_index("input-12"), Some(12));
        assert_eq!(handle_index("output"), None);
        assert_eq!(handle_index("output-x"), None);
    }

    #[test]
    fn handle_center_is_world_absolute() {
        let handle = HandleBoundsBuilder::default()
            .id("output-0")
            .offset(Point::new(46.0, 36.0))
            .size(Size::new(8.0, 8.0))
            .build()
            .unwrap();

        assert_eq!(
            handle.center(&Point::new(100.0, 200.0)),
            Point::new(150.0, 240.0)
        );
    }

    #[test]
    fn build_diagram() {
        let mut diagram = Diagram::new();

        diagram.add_node(
            NodeRecordBuilder::default()
                .id("a")
                .origin(Some(Point::zero()))
                .size(Some(Size::new(100.0, 40.0)))
                .build()
                .unwrap(),
        );
        diagram.add_node(NodeRecord::new("b"));
        diagram.add_edge(EdgeRecord::new("a->b", "a", "b"));

        assert!(diagram.get_node("a").unwrap().rect().is_some());
        assert!(diagram.get_node("b").unwrap().rect().is_none());
        assert_eq!(diagram.outgoing("a").count(), 1);
        assert_eq!(diagram.incoming("b").count(), 1);
        assert_eq!(diagram.incoming("a").count(), 0);

        let edge = diagram.edges().next().unwrap();
        assert_eq!(edge.source_handle, "output-0");
        assert_eq!(edge.target_handle, "input-0");
    }

    #[test]
    fn measured_rect_falls_back() {
        let node = NodeRecord::new("n");
        let rect = node.measured_rect(Size::new(150.0, 60.0));

        assert_eq!(rect.origin, Point::zero());
        assert_eq!(rect.size, Size::new(150.0, 60.0));
    }

    #[test]
    fn routing_result_iterates_in_id_order() {
        let mut result = RoutingResult::new();

        for id in ["zeta", "alpha", "mid"] {
            result.insert(
                id,
                RoutedEdge {
                    points: vec![],
                    svg_path: String::new(),
                },
            );
        }

        let ids: Vec<_> = result.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "mid", "zeta"]);
    }
}
