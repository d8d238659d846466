//! Static SVG maps and charts.

use std::path::Path;

use anyhow::{anyhow, bail, ensure, Context, Result};
use tracing::info;

use super::{
    color::{diverging_color, hotspot_color, lisa_color, Rgb, NO_DATA},
    writer::{Frame, SvgDocument},
};
use crate::{
    dataset::Dataset,
    io::fs::write_string,
    spatial::{HotSpots, LocalMoran},
    stats::OlsFit,
    table::AnalysisTable,
    value::valid_values,
};

const WIDTH: f64 = 1000.0;
const MARGIN: f64 = 20.0;
const HEADER: f64 = 40.0;
const LEGEND: f64 = 70.0;

/// Lay out a map of `dataset` and draw every unit with its fill and tooltip.
fn draw_units(dataset: &Dataset, title: &str, fills: &[(Rgb, String)]) -> Result<(SvgDocument, Frame)> {
    ensure!(fills.len() == dataset.len(),
        "[io::svg] length mismatch: {} fills for {} units",
        fills.len(),
        dataset.len(),
    );
    let bounds = dataset.bounds()
        .ok_or_else(|| anyhow!("[io::svg] Could not determine bounds; nothing to draw."))?;

    let frame = Frame::fit(bounds, WIDTH, MARGIN, HEADER);
    let mut doc = SvgDocument::new(frame.width, frame.height + LEGEND);
    doc.title(MARGIN, MARGIN + 12.0, title);

    for (unit, (fill, tooltip)) in dataset.units().iter().zip(fills) {
        doc.unit(&unit.geometry, &frame, &fill.hex(), tooltip);
    }
    Ok((doc, frame))
}

/// Swatches with labels in a row under the map.
fn categorical_legend(doc: &mut SvgDocument, frame: &Frame, entries: &[(String, Rgb)]) {
    let y = frame.height + 10.0;
    let step = (frame.width - 2.0 * MARGIN) / entries.len().max(1) as f64;
    for (i, (label, color)) in entries.iter().enumerate() {
        let x = MARGIN + i as f64 * step;
        doc.rect(x, y, 16.0, 16.0, &color.hex());
        doc.label(x + 22.0, y + 13.0, "start", label);
    }
}

fn tooltip(table: &AnalysisTable, row: usize, detail: &str) -> String {
    let identity = &table.identities()[row];
    format!("{} ({}): {detail}", identity.name, identity.district)
}

/// Choropleth of a numeric column on a diverging ramp from its minimum to its maximum.
pub fn choropleth(dataset: &Dataset, table: &AnalysisTable, column: &str) -> Result<String> {
    let values = table.require(column)?;
    let (valid, undefined) = valid_values(values);
    let (min, max) = valid.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if valid.is_empty() { bail!("[io::svg] Column {column:?} has no defined values to map") }
    let range = if max > min { max - min } else { 1.0 };

    let fills = values.iter().enumerate()
        .map(|(row, v)| match v.get() {
            Some(x) => (diverging_color((x - min) / range), tooltip(table, row, &format!("{x:.2}"))),
            None => (NO_DATA, tooltip(table, row, &v.to_string())),
        })
        .collect::<Vec<_>>();

    let (mut doc, frame) = draw_units(dataset, column, &fills)?;

    // gradient bar with its end values
    let (y, steps) = (frame.height + 10.0, 10);
    let w = 300.0 / steps as f64;
    for i in 0..steps {
        let t = i as f64 / (steps - 1) as f64;
        doc.rect(MARGIN + i as f64 * w, y, w, 16.0, &diverging_color(t).hex());
    }
    doc.label(MARGIN, y + 32.0, "start", &format!("{min:.2}"));
    doc.label(MARGIN + 300.0, y + 32.0, "end", &format!("{max:.2}"));
    if undefined > 0 {
        doc.rect(MARGIN + 340.0, y, 16.0, 16.0, &NO_DATA.hex());
        doc.label(MARGIN + 362.0, y + 13.0, "start", &format!("no data ({undefined})"));
    }

    Ok(doc.finish())
}

/// LISA cluster map.
pub fn lisa_map(dataset: &Dataset, table: &AnalysisTable, lisa: &LocalMoran, title: &str) -> Result<String> {
    ensure!(lisa.len() == table.len(), "[io::svg] LISA covers {} units, table has {}", lisa.len(), table.len());
    let fills = lisa.clusters.iter().enumerate()
        .map(|(row, &c)| (lisa_color(c), tooltip(table, row, &c.to_string())))
        .collect::<Vec<_>>();

    let (mut doc, frame) = draw_units(dataset, title, &fills)?;
    let legend = lisa.counts().into_iter()
        .filter(|&(c, n)| n > 0 || c.code().is_some())
        .map(|(c, n)| (format!("{c} ({n})"), lisa_color(c)))
        .collect::<Vec<_>>();
    categorical_legend(&mut doc, &frame, &legend);
    Ok(doc.finish())
}

/// Gi* hot spot map.
pub fn hotspot_map(dataset: &Dataset, table: &AnalysisTable, spots: &HotSpots, title: &str) -> Result<String> {
    ensure!(spots.len() == table.len(), "[io::svg] Gi* covers {} units, table has {}", spots.len(), table.len());
    let fills = spots.classes.iter().enumerate()
        .map(|(row, &c)| (hotspot_color(c), tooltip(table, row, &c.to_string())))
        .collect::<Vec<_>>();

    let (mut doc, frame) = draw_units(dataset, title, &fills)?;
    let legend = spots.counts().into_iter()
        .filter(|&(c, n)| n > 0 || c.code().is_some())
        .map(|(c, n)| (format!("{c} ({n})"), hotspot_color(c)))
        .collect::<Vec<_>>();
    categorical_legend(&mut doc, &frame, &legend);
    Ok(doc.finish())
}

/// Predicted against actual values of a regression, with the identity line.
pub fn regression_scatter(fit: &OlsFit) -> Result<String> {
    if fit.fitted.is_empty() { bail!("[io::svg] Regression has no fitted rows to plot") }

    let (lo, hi) = fit.fitted.iter()
        .flat_map(|&(_, a, p)| [a, p])
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let pad = if hi > lo { (hi - lo) * 0.05 } else { 1.0 };
    let (lo, hi) = (lo - pad, hi + pad);

    let size = 600.0;
    let (left, top, plot) = (70.0, HEADER + MARGIN, size - 100.0);
    let project = |a: f64, p: f64| (left + (a - lo) / (hi - lo) * plot, top + (hi - p) / (hi - lo) * plot);

    let mut doc = SvgDocument::new(size, top + plot + 60.0);
    let r2 = fit.r_squared.map_or("undefined".to_string(), |r| format!("{r:.3}"));
    doc.title(MARGIN, MARGIN + 12.0, &format!("{}: predicted vs actual (R² = {r2}, n = {})", fit.target, fit.rows_used));

    doc.line("axis", (left, top + plot), (left + plot, top + plot));
    doc.line("axis", (left, top), (left, top + plot));
    doc.line("guide", project(lo, lo), project(hi, hi));
    for &(_, actual, predicted) in &fit.fitted {
        doc.circle(project(actual, predicted), 3.0);
    }

    doc.label(left, top + plot + 18.0, "start", &format!("{lo:.1}"));
    doc.label(left + plot, top + plot + 18.0, "end", &format!("{hi:.1}"));
    doc.label(left + plot / 2.0, top + plot + 40.0, "middle", &format!("actual {}", fit.target));
    doc.label(left - 8.0, top + plot, "end", &format!("{lo:.1}"));
    doc.label(left - 8.0, top + 10.0, "end", &format!("{hi:.1}"));
    doc.label(left + 8.0, top - 6.0, "start", "predicted");

    Ok(doc.finish())
}

/// Write any rendered SVG to `path`.
pub fn write_svg(svg: String, path: &Path) -> Result<()> {
    write_string(path, &svg)
        .with_context(|| format!("[io::svg] Failed to write {}", path.display()))?;
    info!(path = %path.display(), "wrote SVG");
    Ok(())
}
