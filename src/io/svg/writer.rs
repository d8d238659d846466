//! SVG writing operations.

use std::fmt::Write as _;

use geo::{Coord, CoordsIter, LineString, MultiPolygon, Rect};

/// Maps planar coordinates into the SVG canvas, preserving aspect with Y down.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Frame {
    bounds: Rect<f64>,
    left: f64,
    top: f64,
    scale: f64,
    pub width: f64,
    pub height: f64,
}

impl Frame {
    /// Fit `bounds` into a canvas `width` wide. The top `header` pixels are left for a title.
    pub(crate) fn fit(bounds: Rect<f64>, width: f64, margin: f64, header: f64) -> Self {
        let span = if bounds.width() > 0.0 { bounds.width() } else { 1.0 };
        let scale = (width - 2.0 * margin) / span;
        let height = bounds.height() * scale + 2.0 * margin + header;
        Self { bounds, left: margin, top: margin + header, scale, width, height }
    }

    #[inline]
    pub(crate) fn project(&self, coord: Coord<f64>) -> (f64, f64) {
        let x = self.left + (coord.x - self.bounds.min().x) * self.scale;
        let y = self.top + (self.bounds.max().y - coord.y) * self.scale; // invert vertically
        (x, y)
    }
}

/// An SVG document assembled in memory.
pub(crate) struct SvgDocument {
    buffer: String,
}

impl SvgDocument {
    /// Start a document with the XML declaration, the opening `<svg>` tag and styles.
    pub(crate) fn new(width: f64, height: f64) -> Self {
        let mut buffer = String::new();
        let _ = writeln!(buffer, r##"<?xml version="1.0" encoding="UTF-8" standalone="no"?>"##);
        let _ = writeln!(buffer, r##"<svg xmlns="http://www.w3.org/2000/svg" width="{width:.0}" height="{height:.0}" viewBox="0 0 {width:.0} {height:.0}">"##);
        let _ = writeln!(buffer, r##"<rect width="100%" height="100%" fill="#ffffff"/>"##);
        let _ = writeln!(buffer, r##"<defs>
<style>
    .unit {{ stroke: #4b5563; stroke-width: 0.4; fill-rule: evenodd; }}
    .title {{ font: bold 18px sans-serif; fill: #111827; }}
    .label {{ font: 12px sans-serif; fill: #111827; }}
    .axis {{ stroke: #111827; stroke-width: 1; }}
    .guide {{ stroke: #9ca3af; stroke-dasharray: 4 3; }}
    .point {{ fill: #2563eb; fill-opacity: 0.6; }}
</style>
</defs>"##);
        Self { buffer }
    }

    pub(crate) fn title(&mut self, x: f64, y: f64, text: &str) {
        let _ = writeln!(self.buffer, r#"<text class="title" x="{x:.1}" y="{y:.1}">{}</text>"#, escape(text));
    }

    pub(crate) fn label(&mut self, x: f64, y: f64, anchor: &str, text: &str) {
        let _ = writeln!(self.buffer, r#"<text class="label" x="{x:.1}" y="{y:.1}" text-anchor="{anchor}">{}</text>"#, escape(text));
    }

    pub(crate) fn rect(&mut self, x: f64, y: f64, w: f64, h: f64, fill: &str) {
        let _ = writeln!(self.buffer, r##"<rect x="{x:.1}" y="{y:.1}" width="{w:.1}" height="{h:.1}" fill="{fill}" stroke="#4b5563" stroke-width="0.5"/>"##);
    }

    pub(crate) fn line(&mut self, class: &str, (x1, y1): (f64, f64), (x2, y2): (f64, f64)) {
        let _ = writeln!(self.buffer, r#"<line class="{class}" x1="{x1:.3}" y1="{y1:.3}" x2="{x2:.3}" y2="{y2:.3}"/>"#);
    }

    pub(crate) fn circle(&mut self, (cx, cy): (f64, f64), r: f64) {
        let _ = writeln!(self.buffer, r#"<circle class="point" cx="{cx:.3}" cy="{cy:.3}" r="{r:.1}"/>"#);
    }

    /// Draw one unit as a path (exteriors and holes) with a fill color and a tooltip.
    pub(crate) fn unit(&mut self, shape: &MultiPolygon<f64>, frame: &Frame, fill: &str, tooltip: &str) {
        let d = multipolygon_to_path(shape, frame);
        if d.is_empty() { return }
        let _ = writeln!(self.buffer, r#"<path class="unit" d="{d}" fill="{fill}"><title>{}</title></path>"#, escape(tooltip));
    }

    /// Close the document and return its text.
    pub(crate) fn finish(mut self) -> String {
        self.buffer.push_str("</svg>\n");
        self.buffer
    }
}

/// Build a compact SVG path string for a MultiPolygon (exteriors + holes).
fn multipolygon_to_path(shape: &MultiPolygon<f64>, frame: &Frame) -> String {
    let mut out = String::new();

    for polygon in &shape.0 {
        ring_to_path(polygon.exterior(), frame, &mut out);
        for interior in polygon.interiors() {
            ring_to_path(interior, frame, &mut out);
        }
    }

    out.trim_start().to_string()
}

/// Append a ring as an SVG subpath: "M x,y L x,y ... Z"
fn ring_to_path(ring: &LineString<f64>, frame: &Frame, out: &mut String) {
    let mut coords = ring.coords_iter().map(|coord| frame.project(coord));
    if let Some((x, y)) = coords.next() {
        let _ = write!(out, " M{x:.2},{y:.2}");
        for (x, y) in coords {
            let _ = write!(out, " L{x:.2},{y:.2}");
        }
        out.push('Z');
    }
}

/// Escape text for XML content and attributes.
pub(crate) fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    #[test]
    fn frame_inverts_y_and_keeps_aspect() {
        let bounds = Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 100.0, y: 50.0 });
        let frame = Frame::fit(bounds, 220.0, 10.0, 0.0);

        assert_eq!(frame.height, 120.0);
        assert_eq!(frame.project(Coord { x: 0.0, y: 50.0 }), (10.0, 10.0));
        assert_eq!(frame.project(Coord { x: 100.0, y: 0.0 }), (210.0, 110.0));
    }

    #[test]
    fn unit_paths_are_closed_and_escaped() {
        let bounds = Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 1.0 });
        let frame = Frame::fit(bounds, 12.0, 1.0, 0.0);
        let square = MultiPolygon(vec![polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0)]]);

        let mut doc = SvgDocument::new(frame.width, frame.height);
        doc.unit(&square, &frame, "#ff0000", "A & B");
        let svg = doc.finish();

        assert!(svg.contains(r#"d="M1.00,11.00 L11.00,11.00 L11.00,1.00 L1.00,1.00 L1.00,11.00Z""#), "{svg}");
        assert!(svg.contains("<title>A &amp; B</title>"));
        assert!(svg.trim_end().ends_with("</svg>"));
    }
}
