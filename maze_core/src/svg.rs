// svg.rs - Vector export of ordered wall geometry
//
// Pure serializer: builds the whole document in a `String`. The viewBox is
// the maze's logical extent; `width`/`height` carry the physical size in mm.

use std::fmt::Write;

use crate::config::{StrokeOptions, SvgLayout};
use crate::maze::{Maze, NodeId};
use crate::optimizer::Chain;
use crate::types::Point;

const SVG_NS: &str = "http://www.w3.org/2000/svg";

/// Render ordered chains (plus optional labels, markers and solution).
pub fn render_svg(maze: &Maze, chains: &[Chain], stroke: &StrokeOptions) -> String {
    let (w, h) = (maze.width() as f64, maze.height() as f64);
    let width_mm = stroke.output_width_mm;
    let height_mm = if w > 0.0 { width_mm * h / w } else { width_mm };
    let p = stroke.precision;

    let mut out = String::with_capacity(64 * chains.iter().map(Chain::len).sum::<usize>() + 512);
    let _ = writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    let _ = writeln!(
        out,
        r#"<svg xmlns="{SVG_NS}" width="{width_mm:.p$}mm" height="{height_mm:.p$}mm" viewBox="0 0 {} {}">"#,
        maze.width(),
        maze.height(),
    );
    let _ = writeln!(
        out,
        r#"  <g id="walls" fill="none" stroke="{}" stroke-linecap="round" stroke-linejoin="round">"#,
        xml_escape(&stroke.color)
    );
    match stroke.layout {
        SvgLayout::Segments => write_lines(&mut out, chains, stroke),
        SvgLayout::Chains => write_paths(&mut out, chains, stroke),
    }
    let _ = writeln!(out, "  </g>");

    if stroke.show_solution {
        write_solution(&mut out, maze, stroke);
    }
    if stroke.markers {
        write_markers(&mut out, maze, stroke);
    }
    if stroke.labels {
        write_labels(&mut out, maze, stroke);
    }
    let _ = writeln!(out, "</svg>");
    out
}

fn write_lines(out: &mut String, chains: &[Chain], stroke: &StrokeOptions) {
    let p = stroke.precision;
    for segment in chains.iter().flat_map(Chain::segments) {
        let _ = writeln!(
            out,
            r#"    <line x1="{:.p$}" y1="{:.p$}" x2="{:.p$}" y2="{:.p$}" stroke-width="{:.p$}"/>"#,
            segment.start.x,
            segment.start.y,
            segment.end.x,
            segment.end.y,
            stroke.stroke_width(segment.brightness),
        );
    }
}

/// One `<path>` per run of segments whose stroke width formats identically.
fn write_paths(out: &mut String, chains: &[Chain], stroke: &StrokeOptions) {
    let p = stroke.precision;
    for chain in chains {
        let pts = chain.points();
        let widths: Vec<String> = chain
            .brightness()
            .iter()
            .map(|&b| format!("{:.p$}", stroke.stroke_width(b)))
            .collect();
        let mut i = 0;
        while i < widths.len() {
            let mut j = i + 1;
            while j < widths.len() && widths[j] == widths[i] {
                j += 1;
            }
            let mut d = format!("M{:.p$} {:.p$}", pts[i].x, pts[i].y);
            for pt in &pts[i + 1..=j] {
                let _ = write!(d, " L{:.p$} {:.p$}", pt.x, pt.y);
            }
            let _ = writeln!(out, r#"    <path d="{d}" stroke-width="{}"/>"#, widths[i]);
            i = j;
        }
    }
}

fn write_solution(out: &mut String, maze: &Maze, stroke: &StrokeOptions) {
    let Some(route) = maze.solve() else {
        log::warn!("No route from entrance to exit; solution overlay skipped");
        return;
    };
    let p = stroke.precision;
    let mut points = vec![opening_point(maze, maze.entrance(), true)];
    for pair in route.windows(2) {
        points.push(maze.node(pair[0]).rect.center());
        if let Some(n) = maze.node(pair[0]).neighbors.iter().find(|n| n.node == pair[1]) {
            points.push(n.midpoint);
        }
    }
    if let Some(&last) = route.last() {
        points.push(maze.node(last).rect.center());
    }
    points.push(opening_point(maze, maze.exit(), false));

    let coords: Vec<String> = points
        .iter()
        .map(|pt| format!("{:.p$},{:.p$}", pt.x, pt.y))
        .collect();
    let _ = writeln!(
        out,
        r#"  <polyline id="solution" points="{}" fill="none" stroke="red" stroke-width="{:.p$}" stroke-opacity="0.6"/>"#,
        coords.join(" "),
        stroke.base_weight,
    );
}

fn write_markers(out: &mut String, maze: &Maze, stroke: &StrokeOptions) {
    let p = stroke.precision;
    let _ = writeln!(
        out,
        r#"  <g id="markers" fill="{}" stroke="none">"#,
        xml_escape(&stroke.color)
    );
    for (node, top) in [(maze.entrance(), true), (maze.exit(), false)] {
        let (size, anchor) = marker_geometry(maze, node, top);
        // downward arrow: into the maze at the entrance, out of it at the exit
        let tip_y = if top { anchor.y + size } else { anchor.y };
        let base_y = tip_y - size;
        let _ = writeln!(
            out,
            r#"    <path d="M{:.p$} {:.p$} L{:.p$} {:.p$} L{:.p$} {:.p$} Z"/>"#,
            anchor.x - size / 2.0,
            base_y,
            anchor.x + size / 2.0,
            base_y,
            anchor.x,
            tip_y,
        );
    }
    let _ = writeln!(out, "  </g>");
}

fn write_labels(out: &mut String, maze: &Maze, stroke: &StrokeOptions) {
    let p = stroke.precision;
    let _ = writeln!(
        out,
        r#"  <g id="labels" font-family="sans-serif" text-anchor="middle" fill="{}">"#,
        xml_escape(&stroke.color)
    );
    for (node, top, text) in [(maze.entrance(), true, "START"), (maze.exit(), false, "END")] {
        let (size, anchor) = marker_geometry(maze, node, top);
        let y = if top { anchor.y + size * 2.2 } else { anchor.y - size * 1.4 };
        let _ = writeln!(
            out,
            r#"    <text x="{:.p$}" y="{:.p$}" font-size="{:.p$}">{}</text>"#,
            anchor.x,
            y,
            size * 0.8,
            xml_escape(text),
        );
    }
    let _ = writeln!(out, "  </g>");
}

/// Marker size and the midpoint of the node's outer opening.
fn marker_geometry(maze: &Maze, node: NodeId, top: bool) -> (f64, Point) {
    let rect = maze.node(node).rect;
    (rect.min_side() as f64 * 0.35, opening_point(maze, node, top))
}

fn opening_point(maze: &Maze, node: NodeId, top: bool) -> Point {
    let rect = maze.node(node).rect;
    let x = rect.center().x;
    if top {
        Point::new(x, rect.y as f64)
    } else {
        Point::new(x, rect.bottom() as f64)
    }
}

/// Escape the five XML special characters.
fn xml_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}
