//! Rendering: polyline → SVG path data, and diagram → SVG document.
//!
//! The path generator replaces every sharp corner of an orthogonal polyline
//! with a quadratic bezier whose control point is the corner itself:
//!
//! ```svgbob
//! 0 - - - - - - - - - - - - - - - - - - - ->
//! ! -------+
//! !        |  entry    corner
//! !  start o--------*--.
//! !        |           |
//! !        |           * exit
//! !        |           |
//! !        |           |
//! !        |           v
//! ```
//!
//! The arc endpoints sit on the incoming and outgoing segments at distance
//! `r = min(bend_radius, incoming/2, outgoing/2)` from the corner, so two
//! corners on a short segment never eat past each other's trim.
use std::io::Write;

use svg::node::element;

use crate::color::{theme, NamedColor, WebColor};
use crate::diagram::{Diagram, RoutingResult};
use crate::error::RenderError;
use crate::geometry::{Path, Point, Rect};

/// Corners closer than this to a degenerate radius render as plain lines.
const MIN_CORNER_RADIUS: f64 = 0.5;

/// Builds the SVG path data string for an orthogonal polyline with rounded
/// corners.
///
/// The first command is always `M`, the last always `L`; interior vertices
/// with non-collinear neighbors contribute an `L` to the arc entry and a
/// `Q` through the corner. Collinear interior points degrade to `L`
/// (simplification should have removed them, but the generator tolerates
/// them). An empty polyline produces an empty string.
pub fn svg_path(points: &[Point], bend_radius: f64) -> String {
    let Some(first) = points.first() else {
        return String::new();
    };

    let mut path = Path::new(*first);
    let radius = bend_radius.max(0.0);

    for i in 1..points.len().saturating_sub(1) {
        let (prev, vertex, next) = (points[i - 1], points[i], points[i + 1]);

        let incoming = vertex.manhattan_distance(&prev);
        let outgoing = next.manhattan_distance(&vertex);
        let collinear = (prev.x == vertex.x && vertex.x == next.x)
            || (prev.y == vertex.y && vertex.y == next.y);

        let r = radius.min(incoming / 2.0).min(outgoing / 2.0);

        if collinear || incoming == 0.0 || outgoing == 0.0 || r < MIN_CORNER_RADIUS {
            path.line_to(vertex);
            continue;
        }

        let entry = Point::new(
            vertex.x - (vertex.x - prev.x) / incoming * r,
            vertex.y - (vertex.y - prev.y) / incoming * r,
        );
        let exit = Point::new(
            vertex.x + (next.x - vertex.x) / outgoing * r,
            vertex.y + (next.y - vertex.y) / outgoing * r,
        );

        path.line_to(entry);
        path.quad_to(vertex, exit);
    }

    if let Some(last) = points.last() {
        if points.len() >= 2 {
            path.line_to(*last);
        }
    }

    path.to_string()
}

pub trait Renderer {
    fn render(
        &self,
        diagram: &Diagram,
        routes: &RoutingResult,
        writer: &mut impl Write,
    ) -> Result<(), RenderError>;
}

/// Draws node boxes, labels, routed edges and their port dots into an SVG
/// document.
#[derive(Debug, Default)]
pub struct SvgRenderer {
    /// View box computed by the layout engine, if any.
    pub view_box: Option<Rect>,
}

impl SvgRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Renderer for SvgRenderer {
    fn render(
        &self,
        diagram: &Diagram,
        routes: &RoutingResult,
        writer: &mut impl Write,
    ) -> Result<(), RenderError> {
        let border_radius = 6f64;
        let stroke_width = 1.5;
        let port_radius = 3.0;

        let mut svg_doc = svg::Document::new().set("version", "1.1");

        if let Some(view_box) = &self.view_box {
            svg_doc = svg_doc.set(
                "viewBox",
                format!(
                    "{} {} {} {}",
                    view_box.min_x(),
                    view_box.min_y(),
                    view_box.width(),
                    view_box.height()
                ),
            );
        }

        // -- Background
        let background_rect = element::Rectangle::new()
            .set("width", "100%")
            .set("height", "100%")
            .set("fill", theme::CANVAS.to_string());

        svg_doc = svg_doc.add(background_rect);

        // -- Draw node boxes
        for node in diagram.nodes() {
            let Some(rect) = node.rect() else {
                return Err(RenderError::InvalidLayout(node.id.clone()));
            };

            let fill = if node.is_merge {
                theme::MERGE_FILL
            } else {
                theme::NODE_FILL
            };

            let node_bg = element::Rectangle::new()
                .set("x", rect.min_x())
                .set("y", rect.min_y())
                .set("width", rect.width())
                .set("height", rect.height())
                .set("rx", border_radius)
                .set("ry", border_radius)
                .set("stroke", theme::NODE_STROKE.to_string())
                .set("fill", fill.to_string());
            svg_doc = svg_doc.add(node_bg);

            if let Some(label) = &node.label {
                let text = element::Text::new()
                    .set("x", rect.mid_x())
                    .set("y", rect.mid_y())
                    .set("dominant-baseline", "middle")
                    .set("text-anchor", "middle")
                    .set("fill", theme::TEXT.to_string())
                    .add(svg::node::Text::new(label.clone()));
                svg_doc = svg_doc.add(text);
            }
        }

        // -- Draw routed edges over the boxes
        for (edge_id, route) in routes.iter() {
            let edge_path = element::Path::new()
                .set("stroke", theme::EDGE_STROKE.to_string())
                .set("stroke-width", stroke_width)
                .set("fill", WebColor::Named(NamedColor::Transparent).to_string())
                .set("d", route.svg_path.clone());
            svg_doc = svg_doc.add(edge_path);

            // Port dots at both ends.
            for pt in [route.points.first(), route.points.last()]
                .into_iter()
                .flatten()
            {
                let circle = element::Circle::new()
                    .set("cx", pt.x)
                    .set("cy", pt.y)
                    .set("r", port_radius)
                    .set("stroke", theme::EDGE_STROKE.to_string())
                    .set("stroke-width", stroke_width)
                    .set("fill", theme::CANVAS.to_string());
                svg_doc = svg_doc.add(circle);
            }

            // Edge labels sit next to the first bend.
            let label = diagram.edges().find(|e| e.id == *edge_id).and_then(|e| e.label.clone());
            if let Some(label) = label {
                if let Some(anchor) = label_anchor(&route.points) {
                    let text = element::Text::new()
                        .set("x", anchor.x + 6.0)
                        .set("y", anchor.y - 6.0)
                        .set("fill", theme::TEXT.to_string())
                        .set("font-size", "small")
                        .add(svg::node::Text::new(label));
                    svg_doc = svg_doc.add(text);
                }
            }
        }

        writer.write_all(svg_doc.to_string().as_bytes())?;
        Ok(())
    }
}

/// The first bend of the polyline, or the midpoint of a straight run.
fn label_anchor(points: &[Point]) -> Option<Point> {
    if points.len() < 2 {
        return None;
    }

    for i in 1..points.len() - 1 {
        let (prev, vertex, next) = (points[i - 1], points[i], points[i + 1]);
        let collinear = (prev.x == vertex.x && vertex.x == next.x)
            || (prev.y == vertex.y && vertex.y == next.y);
        if !collinear {
            return Some(vertex);
        }
    }

    let (a, b) = (points[0], points[points.len() - 1]);
    Some(Point::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagram::{NodeRecordBuilder, RoutedEdge};
    use crate::geometry::Size;

    fn pt(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn empty_polyline_renders_nothing() {
        assert_eq!(svg_path(&[], 8.0), "");
    }

    #[test]
    fn straight_line() {
        let d = svg_path(&[pt(50.0, 40.0), pt(50.0, 200.0)], 8.0);
        assert_eq!(d, "M 50 40 L 50 200");
    }

    #[test]
    fn single_corner_is_rounded() {
        let d = svg_path(&[pt(0.0, 0.0), pt(0.0, 100.0), pt(100.0, 100.0)], 8.0);
        assert_eq!(d, "M 0 0 L 0 92 Q 0 100 8 100 L 100 100");
    }

    #[test]
    fn radius_clamps_to_half_the_shorter_segment() {
        // The 10 px middle segment allows at most a 5 px radius per corner.
        let d = svg_path(
            &[pt(0.0, 0.0), pt(0.0, 50.0), pt(10.0, 50.0), pt(10.0, 100.0)],
            8.0,
        );
        assert_eq!(
            d,
            "M 0 0 L 0 45 Q 0 50 5 50 L 5 50 Q 10 50 10 55 L 10 100"
        );
    }

    #[test]
    fn tiny_radius_degrades_to_a_line() {
        // Half of the 0.6 px segment is below the 0.5 px corner cutoff.
        let d = svg_path(
            &[pt(0.0, 0.0), pt(0.0, 10.0), pt(0.6, 10.0), pt(0.6, 20.0)],
            8.0,
        );
        assert_eq!(d, "M 0 0 L 0 10 L 0.6 10 L 0.6 20");
    }

    #[test]
    fn collinear_interior_points_pass_through() {
        let d = svg_path(&[pt(0.0, 0.0), pt(0.0, 10.0), pt(0.0, 20.0)], 8.0);
        assert_eq!(d, "M 0 0 L 0 10 L 0 20");
    }

    #[test]
    fn negative_radius_is_treated_as_zero() {
        let d = svg_path(&[pt(0.0, 0.0), pt(0.0, 10.0), pt(10.0, 10.0)], -4.0);
        assert_eq!(d, "M 0 0 L 0 10 L 10 10");
    }

    #[test]
    fn renders_a_laid_out_diagram() {
        let mut diagram = Diagram::new();
        diagram.add_node(
            NodeRecordBuilder::default()
                .id("a")
                .origin(Some(Point::zero()))
                .size(Some(Size::new(100.0, 40.0)))
                .label(Some("Start".into()))
                .build()
                .unwrap(),
        );

        let mut routes = RoutingResult::new();
        routes.insert(
            "a->b",
            RoutedEdge {
                points: vec![pt(50.0, 40.0), pt(50.0, 200.0)],
                svg_path: "M 50 40 L 50 200".into(),
            },
        );

        let mut bytes: Vec<u8> = vec![];
        SvgRenderer::new()
            .render(&diagram, &routes, &mut bytes)
            .expect("generate SVG");

        let out = String::from_utf8(bytes).unwrap();
        assert!(out.starts_with("<svg"));
        assert!(out.contains("M 50 40 L 50 200"));
        assert!(out.contains("Start"));
    }

    #[test]
    fn unplaced_node_is_an_error() {
        let mut diagram = Diagram::new();
        diagram.add_node(crate::diagram::NodeRecord::new("floating"));

        let result = SvgRenderer::new().render(&diagram, &RoutingResult::new(), &mut vec![]);

        assert!(matches!(
            result,
            Err(RenderError::InvalidLayout(id)) if id == "floating"
        ));
    }
}
