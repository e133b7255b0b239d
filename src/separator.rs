//! Multi-edge overlap separator.
//!
//! Independently routed edges are happy to share a corridor, which renders
//! as one line and hides edges from the reader. This pass runs once over a
//! whole batch, finds collinear interior segments that overlap, and nudges
//! them apart perpendicular to their direction while keeping every polyline
//! orthogonal and anchored at its ports.
//!
//! ```svgbob
//!  o   o          o   o
//!  |   |          |   |
//!  *---+---->o    *-----.
//!      |       =>  *----+--->o
//!      |           .----'
//!      |           |
//! ```
//!
//! The first and last segment of every polyline are port stubs and are never
//! nudged; a shifted interior segment is stitched back to its fixed
//! neighbors with a perpendicular jog (or a corner point where both sides
//! moved). When the jog is collinear with the stub this collapses, in the
//! final simplification, into the stub simply growing or shrinking.
use std::collections::HashMap;

use smallvec::SmallVec;

use crate::geometry::{simplify_polyline, Point, EPS};

/// Spreads collinear overlapping interior segments of a routed batch.
///
/// Edges are identified by index. Batches with fewer than two polylines or
/// a non-positive separation pass through unchanged, as do polylines too
/// short to have interior segments and polylines no cluster touched.
pub fn separate(polylines: &[Vec<Point>], separation: f64) -> Vec<Vec<Point>> {
    if separation <= 0.0 || polylines.len() < 2 {
        return polylines.to_vec();
    }

    let offsets = assign_offsets(polylines, separation);

    polylines
        .iter()
        .enumerate()
        .map(|(edge, points)| match apply_offsets(points, edge, &offsets) {
            Some(stitched) => simplify_polyline(&stitched),
            None => points.clone(),
        })
        .collect()
}

/// One eligible segment, keyed for clustering: `coord` is the fixed
/// coordinate (y for horizontal segments, x for vertical), `lo..hi` the
/// span along the segment's axis.
#[derive(Debug, Clone, Copy)]
struct SegRef {
    edge: usize,
    seg: usize,
    coord: f64,
    lo: f64,
    hi: f64,
}

fn assign_offsets(polylines: &[Vec<Point>], separation: f64) -> HashMap<(usize, usize), f64> {
    let mut horizontal: Vec<SegRef> = vec![];
    let mut vertical: Vec<SegRef> = vec![];

    for (edge, points) in polylines.iter().enumerate() {
        let n = points.len();
        if n < 4 {
            continue;
        }

        // Every segment except the first (source stub) and last (target
        // stub) is routable.
        for seg in 1..n - 2 {
            let (a, b) = (points[seg], points[seg + 1]);
            let flat = (a.y - b.y).abs() < EPS;
            let plumb = (a.x - b.x).abs() < EPS;

            if flat && plumb {
                // Zero-length leftover; nothing to spread.
                continue;
            } else if flat {
                horizontal.push(SegRef {
                    edge,
                    seg,
                    coord: a.y,
                    lo: a.x.min(b.x),
                    hi: a.x.max(b.x),
                });
            } else if plumb {
                vertical.push(SegRef {
                    edge,
                    seg,
                    coord: a.x,
                    lo: a.y.min(b.y),
                    hi: a.y.max(b.y),
                });
            }
        }
    }

    let mut offsets = HashMap::new();
    sweep_axis(horizontal, separation, &mut offsets);
    sweep_axis(vertical, separation, &mut offsets);
    offsets
}

/// Groups segments by fixed coordinate, sweeps each group into clusters of
/// pairwise-overlapping spans (touching counts), and center-spreads every
/// cluster with at least two distinct edges.
fn sweep_axis(mut segs: Vec<SegRef>, separation: f64, offsets: &mut HashMap<(usize, usize), f64>) {
    segs.sort_by(|a, b| {
        a.coord
            .total_cmp(&b.coord)
            .then(a.lo.total_cmp(&b.lo))
            .then(a.edge.cmp(&b.edge))
            .then(a.seg.cmp(&b.seg))
    });

    let mut i = 0;
    while i < segs.len() {
        let mut j = i + 1;
        while j < segs.len() && (segs[j].coord - segs[i].coord).abs() <= EPS {
            j += 1;
        }

        let mut k = i;
        while k < j {
            let mut end = k + 1;
            let mut hi = segs[k].hi;

            while end < j && segs[end].lo <= hi + EPS {
                hi = hi.max(segs[end].hi);
                end += 1;
            }

            spread(&segs[k..end], separation, offsets);
            k = end;
        }

        i = j;
    }
}

fn spread(members: &[SegRef], separation: f64, offsets: &mut HashMap<(usize, usize), f64>) {
    // Distinct edges in order of first appearance in the sweep.
    let mut edges: SmallVec<[usize; 8]> = SmallVec::new();
    for s in members {
        if !edges.contains(&s.edge) {
            edges.push(s.edge);
        }
    }

    if edges.len() < 2 {
        return;
    }

    let n = edges.len() as f64;
    for s in members {
        let rank = edges.iter().position(|e| *e == s.edge).unwrap() as f64;
        offsets.insert((s.edge, s.seg), (rank - (n - 1.0) / 2.0) * separation);
    }
}

/// Shifts the offset segments of one polyline and stitches the pieces back
/// into an orthogonal chain. Returns `None` when no segment moved.
fn apply_offsets(
    points: &[Point],
    edge: usize,
    offsets: &HashMap<(usize, usize), f64>,
) -> Option<Vec<Point>> {
    let n = points.len();
    if n < 4 {
        return None;
    }

    let mut segs: Vec<(Point, Point)> = Vec::with_capacity(n - 1);
    let mut touched = false;

    for i in 0..n - 1 {
        let (mut a, mut b) = (points[i], points[i + 1]);

        if let Some(&d) = offsets.get(&(edge, i)) {
            if d != 0.0 {
                touched = true;
                if (a.y - b.y).abs() < EPS {
                    a.y += d;
                    b.y += d;
                } else {
                    a.x += d;
                    b.x += d;
                }
            }
        }

        segs.push((a, b));
    }

    if !touched {
        return None;
    }

    // Walk the shifted segments, reconnecting each to the previous chain
    // end. Anchored points (ports, stub junctions) were never moved, so a
    // mismatch is at most one perpendicular jog or one corner.
    let mut out: Vec<Point> = Vec::with_capacity(n + 4);
    out.push(segs[0].0);

    for (a, b) in segs {
        let last = *out.last().unwrap();

        if last != a {
            let aligned = (last.x - a.x).abs() < EPS || (last.y - a.y).abs() < EPS;

            if !aligned {
                // Both neighbors moved; enter the segment perpendicular to
                // its own direction so both new segments stay axis-aligned.
                let corner = if (a.y - b.y).abs() < EPS {
                    Point::new(a.x, last.y)
                } else {
                    Point::new(last.x, a.y)
                };
                out.push(corner);
            }
            out.push(a);
        }

        out.push(b);
    }

    Some(out)
}
