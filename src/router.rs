//! Single-edge orthogonal router.
//!
//! Algorithm
//! ---------
//!
//! Routing one edge is a motion-planning problem: find an axis-aligned
//! polyline from the source port to the target port that clears every
//! obstacle. We use the _expanded obstacles_ approach: each obstacle
//! rectangle grows by the configured padding, and the path may touch but
//! never enter the grown rectangle.
//!
//! Instead of a static grid, the router builds a sparse visibility grid per
//! edge. The guide coordinates are the x/y values something interesting
//! happens at: the two stub endpoints and the sides of every inflated
//! obstacle. Waypoints are the grid intersections of those guide lines that
//! fall outside all inflated obstacles.
//!
//! ```svgbob
//!      :      :        :   :
//!  ....o......o........o...o....
//!      |      :        :   :
//!      | stub :        :   :
//!  ....o......+--------+...o....
//!      :      | padded :   :
//!      :      | +----+ |   :
//!      :      | |    | |   :
//!      :      | +----+ |   :
//!  ....o......+--------+...o....
//!      :      :        :   :
//!  ....o......o........o...o....
//! ```
//!
//! Neighboring waypoints on the same guide line are connected when the
//! straight segment between them crosses no inflated obstacle. The shortest
//! path runs over (waypoint, incoming-axis) states so each direction change
//! can be charged a bend penalty; waypoints and states are generated in
//! sorted (x, y) order, so routes are fully determined by their inputs.
//!
//! The router never fails: when a stub endpoint is swallowed by an obstacle
//! or the search exhausts its frontier, it falls back to a blind S-shape
//! through the midline between the two stubs.
use petgraph::algo::astar;
use petgraph::prelude::{DiGraph, NodeIndex};
use smallvec::SmallVec;

use crate::config::RoutingConfig;
use crate::geometry::{simplify_polyline, Axis, Orientation, Point, Rect};

/// One end of an edge: where it attaches and which way its stub points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortAnchor {
    pub position: Point,
    pub direction: Orientation,
}

impl PortAnchor {
    pub fn new(position: Point, direction: Orientation) -> Self {
        Self {
            position,
            direction,
        }
    }

    /// The stub endpoint: `length` px straight out of the port.
    fn stub_end(&self, length: f64) -> Point {
        let (dx, dy) = self.direction.vector();
        Point::new(self.position.x + dx * length, self.position.y + dy * length)
    }
}

/// Routes a single edge around `obstacles` (which must exclude the endpoint
/// nodes themselves).
///
/// The result is an orthogonal polyline
/// `[source port, source stub end, ..., target stub end, target port]`; the
/// interior is simplified but both stub endpoints survive, because the
/// overlap separator treats the first and last segment as untouchable.
pub fn route_edge(
    source: &PortAnchor,
    target: &PortAnchor,
    obstacles: &[Rect],
    config: &RoutingConfig,
) -> Vec<Point> {
    let stub_src = source.stub_end(config.source_stub_length);
    let stub_tgt = target.stub_end(config.target_stub_length);

    let inflated: Vec<Rect> = obstacles
        .iter()
        .map(|r| r.inset_by(-config.padding, -config.padding))
        .collect();

    // A stub endpoint buried in an obstacle has no legal waypoint; don't
    // bother searching.
    let buried = |p: &Point| inflated.iter().any(|r| r.contains_point(p, false));
    if buried(&stub_src) || buried(&stub_tgt) {
        return s_shape(source, stub_src, target, stub_tgt);
    }

    let grid = VisibilityGrid::build(&stub_src, &stub_tgt, &inflated);

    let (Some(start), Some(goal)) = (grid.waypoint_at(&stub_src), grid.waypoint_at(&stub_tgt))
    else {
        return s_shape(source, stub_src, target, stub_tgt);
    };

    let Some(spine) = shortest_path(&grid, start, goal, source, config) else {
        return s_shape(source, stub_src, target, stub_tgt);
    };

    // Simplify between the stubs only. The stub endpoints stay even when
    // collinear with their neighbors; a straight corridor still yields
    // [port, stub end, stub end, port].
    let mut points = Vec::with_capacity(spine.len() + 2);
    points.push(source.position);
    points.extend(simplify_polyline(&spine));
    points.push(target.position);
    points
}

/// Blind fallback: port, stub, two midline corners, stub, port.
///
/// ```svgbob
///   o
///   |
///   *----.
///        |
///        `----*
///             |
///             o
/// ```
fn s_shape(
    source: &PortAnchor,
    stub_src: Point,
    target: &PortAnchor,
    stub_tgt: Point,
) -> Vec<Point> {
    let src_axis = source.direction.axis();
    let tgt_axis = target.direction.axis();

    let mut points = vec![source.position, stub_src];

    match (src_axis, tgt_axis) {
        (Axis::Vertical, Axis::Vertical) => {
            let mid_y = (stub_src.y + stub_tgt.y) / 2.0;
            points.push(Point::new(stub_src.x, mid_y));
            points.push(Point::new(stub_tgt.x, mid_y));
        }
        (Axis::Horizontal, Axis::Horizontal) => {
            let mid_x = (stub_src.x + stub_tgt.x) / 2.0;
            points.push(Point::new(mid_x, stub_src.y));
            points.push(Point::new(mid_x, stub_tgt.y));
        }
        // Mixed stub axes meet at a single corner.
        (Axis::Vertical, Axis::Horizontal) => {
            points.push(Point::new(stub_src.x, stub_tgt.y));
        }
        (Axis::Horizontal, Axis::Vertical) => {
            points.push(Point::new(stub_tgt.x, stub_src.y));
        }
    }

    points.push(stub_tgt);
    points.push(target.position);
    points
}

#[derive(Debug, Clone, Copy)]
struct GridLink {
    to: u32,
    axis: Axis,
    length: f64,
}

/// The sparse visibility grid for one edge.
#[derive(Debug)]
struct VisibilityGrid {
    xs: Vec<f64>,
    ys: Vec<f64>,
    points: Vec<Point>,
    /// Waypoint id per (x, y) guide cell; dense, row per x guide.
    cells: Vec<Option<u32>>,
    /// Each waypoint connects to at most four neighbors.
    adjacency: Vec<SmallVec<[GridLink; 4]>>,
}

impl VisibilityGrid {
    fn build(stub_src: &Point, stub_tgt: &Point, inflated: &[Rect]) -> Self {
        let mut xs = vec![stub_src.x, stub_tgt.x];
        let mut ys = vec![stub_src.y, stub_tgt.y];

        for r in inflated {
            xs.push(r.min_x());
            xs.push(r.max_x());
            ys.push(r.min_y());
            ys.push(r.max_y());
        }

        xs.sort_by(|a, b| a.total_cmp(b));
        xs.dedup();
        ys.sort_by(|a, b| a.total_cmp(b));
        ys.dedup();

        // Waypoints in sorted (x, y) order, so the search graph downstream
        // is built identically on every run.
        let mut points = Vec::with_capacity(xs.len() * ys.len());
        let mut cells = vec![None; xs.len() * ys.len()];

        for (xi, &x) in xs.iter().enumerate() {
            for (yi, &y) in ys.iter().enumerate() {
                let pt = Point::new(x, y);
                if inflated.iter().any(|r| r.contains_point(&pt, false)) {
                    continue;
                }

                let id = points.len() as u32;
                points.push(pt);
                cells[xi * ys.len() + yi] = Some(id);
            }
        }

        let mut grid = Self {
            xs,
            ys,
            points,
            cells,
            adjacency: vec![SmallVec::new(); 0],
        };
        grid.adjacency = grid.connect(inflated);
        grid
    }

    fn connect(&self, inflated: &[Rect]) -> Vec<SmallVec<[GridLink; 4]>> {
        let mut adjacency = vec![SmallVec::new(); self.points.len()];

        // Columns: consecutive waypoints sharing a guide x.
        for (xi, &x) in self.xs.iter().enumerate() {
            let mut prev: Option<u32> = None;

            for yi in 0..self.ys.len() {
                let Some(id) = self.cells[xi * self.ys.len() + yi] else {
                    continue;
                };

                if let Some(prev_id) = prev {
                    let (y_lo, y_hi) = (self.points[prev_id as usize].y, self.ys[yi]);

                    if !inflated.iter().any(|r| r.crossed_by_vertical(x, y_lo, y_hi)) {
                        self.link(&mut adjacency, prev_id, id, Axis::Vertical, y_hi - y_lo);
                    }
                }
                prev = Some(id);
            }
        }

        // Rows: the same, transposed.
        for (yi, &y) in self.ys.iter().enumerate() {
            let mut prev: Option<u32> = None;

            for xi in 0..self.xs.len() {
                let Some(id) = self.cells[xi * self.ys.len() + yi] else {
                    continue;
                };

                if let Some(prev_id) = prev {
                    let (x_lo, x_hi) = (self.points[prev_id as usize].x, self.xs[xi]);

                    if !inflated
                        .iter()
                        .any(|r| r.crossed_by_horizontal(y, x_lo, x_hi))
                    {
                        self.link(&mut adjacency, prev_id, id, Axis::Horizontal, x_hi - x_lo);
                    }
                }
                prev = Some(id);
            }
        }

        adjacency
    }

    fn link(
        &self,
        adjacency: &mut [SmallVec<[GridLink; 4]>],
        a: u32,
        b: u32,
        axis: Axis,
        length: f64,
    ) {
        adjacency[a as usize].push(GridLink { to: b, axis, length });
        adjacency[b as usize].push(GridLink { to: a, axis, length });
    }

    fn waypoint_at(&self, pt: &Point) -> Option<u32> {
        let xi = self.xs.binary_search_by(|x| x.total_cmp(&pt.x)).ok()?;
        let yi = self.ys.binary_search_by(|y| y.total_cmp(&pt.y)).ok()?;
        self.cells[xi * self.ys.len() + yi]
    }
}

fn axis_slot(axis: Axis) -> usize {
    match axis {
        Axis::Horizontal => 0,
        Axis::Vertical => 1,
    }
}

/// Shortest path over (waypoint, incoming-axis) states. The source stub
/// counts as the initial axis, so the very first turn out of the stub is
/// already a charged bend.
///
/// The state space is mirrored into a `petgraph` graph with all step costs
/// folded into the edge weights, and the search itself is
/// `petgraph::algo::astar` with a zero estimate.
fn shortest_path(
    grid: &VisibilityGrid,
    start: u32,
    goal: u32,
    source: &PortAnchor,
    config: &RoutingConfig,
) -> Option<Vec<Point>> {
    let bias = config.early_bend_bias.max(0.0);

    // Two states per waypoint, one per incoming axis, in waypoint order.
    let mut graph: DiGraph<(u32, Axis), f64> = DiGraph::new();
    let mut states: Vec<[NodeIndex; 2]> = Vec::with_capacity(grid.points.len());

    for id in 0..grid.points.len() as u32 {
        states.push([
            graph.add_node((id, Axis::Horizontal)),
            graph.add_node((id, Axis::Vertical)),
        ]);
    }

    for (from, links) in grid.adjacency.iter().enumerate() {
        for l in links {
            let mut step = l.length;

            if l.axis == Axis::Horizontal && bias > 0.0 {
                // Horizontal travel is taxed by how far below the source it
                // happens, which pulls the first bend towards the source.
                // The tax applies to every horizontal segment, even ones
                // past the target, and goes negative above the source, so
                // upward edges can route unexpectedly. Known limitation of
                // the cost model, kept as-is.
                let y = grid.points[from].y;
                step += bias * (y - source.position.y);
            }

            let to_slot = axis_slot(l.axis);
            for slot in 0..2 {
                let weight = if slot == to_slot {
                    step
                } else {
                    step + config.bend_penalty
                };
                graph.add_edge(states[from][slot], states[l.to as usize][to_slot], weight);
            }
        }
    }

    let start_state = states[start as usize][axis_slot(source.direction.axis())];

    let (_, path) = astar(
        &graph,
        start_state,
        |finish| graph[finish].0 == goal,
        |e| *e.weight(),
        |_| 0.0,
    )?;

    Some(
        path.into_iter()
            .map(|state| grid.points[graph[state].0 as usize])
            .collect(),
    )
}
