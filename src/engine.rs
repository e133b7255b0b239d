//! Routing orchestrator.
//!
//! The batch driver between the host's records and the single-edge router:
//! resolve both ports of every edge, route each edge around all other
//! nodes, spread the batch once through the overlap separator, and render
//! path data. Results are memoised on a structural key of the inputs, so a
//! host re-rendering an unchanged graph pays for one routing pass.
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::config::{LayoutConfig, RoutingConfig};
use crate::diagram::{
    default_port_position, handle_index, Diagram, NodeRecord, RoutedEdge, RoutingResult,
};
use crate::geometry::{simplify_polyline, Orientation, Point, Rect, Size};
use crate::renderer::svg_path;
use crate::router::{route_edge, PortAnchor};
use crate::separator::separate;

/// Batch router with a one-slot memo cache.
///
/// The cache is process-local and not synchronized; callers on threaded
/// platforms keep one engine per thread.
#[derive(Debug, Default)]
pub struct RoutingEngine {
    cache: Option<(u64, RoutingResult)>,
}

impl RoutingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes every edge of the diagram, reusing the previous result while
    /// node geometry, the edge set and the configuration stay unchanged.
    pub fn route(
        &mut self,
        diagram: &Diagram,
        routing: &RoutingConfig,
        layout: &LayoutConfig,
    ) -> &RoutingResult {
        let key = structural_key(diagram, routing, layout);

        let stale = self.cache.as_ref().map(|(k, _)| *k) != Some(key);
        if stale {
            self.cache = Some((key, route_diagram(diagram, routing, layout)));
        }

        &self.cache.as_ref().unwrap().1
    }
}

/// One uncached routing pass over the whole batch.
pub fn route_diagram(
    diagram: &Diagram,
    routing: &RoutingConfig,
    layout: &LayoutConfig,
) -> RoutingResult {
    let fallback = Size::new(layout.node_width, layout.node_height);

    let mut ids: Vec<String> = Vec::with_capacity(diagram.edges().len());
    let mut polylines: Vec<Vec<Point>> = Vec::with_capacity(diagram.edges().len());
    let mut radii: Vec<f64> = Vec::with_capacity(diagram.edges().len());

    for edge in diagram.edges() {
        let (Some(source), Some(target)) = (
            diagram.get_node(&edge.source_id),
            diagram.get_node(&edge.target_id),
        ) else {
            continue;
        };

        let mut config = edge
            .routing
            .as_ref()
            .map(|o| o.merged(routing))
            .unwrap_or_else(|| routing.clone());

        // The early-bend tax exists so the first horizontal run, where the
        // label sits, lands near the source. Unlabelled edges route purely
        // by length and bends.
        if edge.label.is_none() {
            config.early_bend_bias = 0.0;
        }

        let source_rect = source.measured_rect(fallback);
        let src = source_anchor(diagram, source, &edge.source_handle, fallback);
        let tgt = target_anchor(diagram, target, &edge.target_handle, &source_rect, fallback);

        let obstacles: Vec<Rect> = diagram
            .nodes()
            .filter(|n| n.id != source.id && n.id != target.id)
            .map(|n| n.measured_rect(fallback))
            .collect();

        ids.push(edge.id.clone());
        polylines.push(route_edge(&src, &tgt, &obstacles, &config));
        radii.push(config.bend_radius);
    }

    let spread = separate(&polylines, routing.edge_separation);

    let mut result = RoutingResult::new();
    for ((id, points), radius) in ids.into_iter().zip(spread).zip(radii) {
        let path = svg_path(&simplify_polyline(&points), radius);
        result.insert(
            id,
            RoutedEdge {
                points,
                svg_path: path,
            },
        );
    }

    result
}

/// Resolves where an edge leaves its source node.
///
/// Measured handle bounds win; otherwise the port comes from the default
/// port-layout formula on the bottom side, with the handle population
/// inferred from the node's outgoing edges.
fn source_anchor(
    diagram: &Diagram,
    node: &NodeRecord,
    handle_id: &str,
    fallback: Size,
) -> PortAnchor {
    if let Some(handle) = node.source_handle(handle_id) {
        let origin = node.origin.unwrap_or_else(Point::zero);
        return PortAnchor::new(handle.center(&origin), handle.side);
    }

    let rect = node.measured_rect(fallback);
    let index = handle_index(handle_id).unwrap_or(0);
    let count = handle_population(
        diagram.outgoing(&node.id).map(|e| e.source_handle.as_str()),
        index,
    );

    PortAnchor::new(
        default_port_position(&rect, Orientation::Down, index, count),
        Orientation::Down,
    )
}

/// Resolves where an edge enters its target node.
///
/// Merge nodes are single-target receivers: the entry side is picked by
/// comparing the source's horizontal center against the merge center, with
/// a dead zone of half the merge width resolving to a top entry.
fn target_anchor(
    diagram: &Diagram,
    node: &NodeRecord,
    handle_id: &str,
    source_rect: &Rect,
    fallback: Size,
) -> PortAnchor {
    let rect = node.measured_rect(fallback);

    if node.is_merge {
        let threshold = rect.width() / 2.0;
        let dx = source_rect.mid_x() - rect.mid_x();

        return if dx < -threshold {
            PortAnchor::new(Point::new(rect.min_x(), rect.mid_y()), Orientation::Left)
        } else if dx > threshold {
            PortAnchor::new(Point::new(rect.max_x(), rect.mid_y()), Orientation::Right)
        } else {
            PortAnchor::new(Point::new(rect.mid_x(), rect.min_y()), Orientation::Up)
        };
    }

    if let Some(handle) = node.target_handle(handle_id) {
        let origin = node.origin.unwrap_or_else(Point::zero);
        return PortAnchor::new(handle.center(&origin), handle.side);
    }

    let index = handle_index(handle_id).unwrap_or(0);
    let count = handle_population(
        diagram.incoming(&node.id).map(|e| e.target_handle.as_str()),
        index,
    );

    PortAnchor::new(
        default_port_position(&rect, Orientation::Up, index, count),
        Orientation::Up,
    )
}

/// Number of ports on one side: enough for every referenced handle index,
/// and at least enough for the one being resolved.
fn handle_population<'a>(handles: impl Iterator<Item = &'a str>, index: usize) -> usize {
    handles
        .filter_map(handle_index)
        .max()
        .map_or(index + 1, |max| max.max(index) + 1)
}

/// Structural memo key: id-sorted node geometry, id-sorted edge tuples and
/// the configuration snapshot.
fn structural_key(diagram: &Diagram, routing: &RoutingConfig, layout: &LayoutConfig) -> u64 {
    let mut h = DefaultHasher::new();

    let mut nodes: Vec<&NodeRecord> = diagram.nodes().collect();
    nodes.sort_by(|a, b| a.id.cmp(&b.id));

    for node in nodes {
        node.id.hash(&mut h);
        hash_opt_point(&mut h, node.origin);
        hash_opt(&mut h, node.size.map(|s| s.width));
        hash_opt(&mut h, node.size.map(|s| s.height));
        node.is_merge.hash(&mut h);

        for handle in node.source_handles.iter().chain(&node.target_handles) {
            handle.id.hash(&mut h);
            hash_f64(&mut h, handle.offset.x);
            hash_f64(&mut h, handle.offset.y);
            hash_f64(&mut h, handle.size.width);
            hash_f64(&mut h, handle.size.height);
            handle.side.hash(&mut h);
        }
    }

    let mut edges: Vec<_> = diagram.edges().collect();
    edges.sort_by(|a, b| a.id.cmp(&b.id));

    for edge in edges {
        edge.id.hash(&mut h);
        edge.source_id.hash(&mut h);
        edge.source_handle.hash(&mut h);
        edge.target_id.hash(&mut h);
        edge.target_handle.hash(&mut h);
        edge.label.hash(&mut h);

        if let Some(o) = &edge.routing {
            hash_opt(&mut h, o.padding);
            hash_opt(&mut h, o.source_stub_length);
            hash_opt(&mut h, o.target_stub_length);
            hash_opt(&mut h, o.bend_penalty);
            hash_opt(&mut h, o.early_bend_bias);
            hash_opt(&mut h, o.edge_separation);
            hash_opt(&mut h, o.bend_radius);
        }
    }

    for v in [
        routing.padding,
        routing.source_stub_length,
        routing.target_stub_length,
        routing.bend_penalty,
        routing.early_bend_bias,
        routing.edge_separation,
        routing.bend_radius,
        layout.node_width,
        layout.node_height,
    ] {
        hash_f64(&mut h, v);
    }

    h.finish()
}

fn hash_f64(h: &mut impl Hasher, v: f64) {
    v.to_bits().hash(h);
}

fn hash_opt(h: &mut impl Hasher, v: Option<f64>) {
    match v {
        Some(v) => {
            1u8.hash(h);
            hash_f64(h, v);
        }
        None => 0u8.hash(h),
    }
}

fn hash_opt_point(h: &mut impl Hasher, v: Option<Point>) {
    match v {
        Some(p) => {
            1u8.hash(h);
            hash_f64(h, p.x);
            hash_f64(h, p.y);
        }
        None => 0u8.hash(h),
    }
}
