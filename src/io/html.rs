//! Interactive Leaflet map as a self-contained HTML page.

use std::path::Path;

use anyhow::{Context, Result};
use geo::Point;
use serde_json::{json, Value as Json};
use tracing::info;

use crate::{
    crs::{Crs, Reprojector},
    dataset::Dataset,
    io::{fs::write_string, geojson::to_geojson, svg::{diverging_color, escape, NO_DATA}},
    stats::{bottom_k, top_k},
    table::AnalysisTable,
    value::valid_values,
};

/// Tooltip rows: table column and label. Columns absent from the table are skipped.
const TOOLTIP: [(&str, &str); 6] = [
    ("income_per_capita", "Income per capita (k TWD)"),
    ("POPULATION", "Population"),
    ("HOUSEHOLD", "Households"),
    ("education_rate", "Tertiary education rate"),
    ("AgingIndex", "Aging index"),
    ("POP_DENS", "Population density"),
];

/// Render `column` as a Leaflet choropleth with village tooltips and markers on
/// the `k` highest and lowest units. `centroids` are in the dataset's CRS.
pub fn interactive_map(
    dataset: &Dataset,
    table: &AnalysisTable,
    centroids: &[Option<Point<f64>>],
    column: &str,
    k: usize,
) -> Result<String> {
    let values = table.require(column)?;
    let (valid, _) = valid_values(values);
    let (min, max) = valid.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = if max > min { max - min } else { 1.0 };

    let mut collection = to_geojson(dataset, table, Crs::Wgs84)?;
    if let Some(features) = collection["features"].as_array_mut() {
        for (feature, value) in features.iter_mut().zip(values) {
            let fill = value.get().map_or(NO_DATA, |v| diverging_color((v - min) / range));
            let properties = &mut feature["properties"];
            properties["_fill"] = json!(fill.hex());
            // tooltips are HTML
            for key in ["name", "district"] {
                if let Some(text) = properties[key].as_str().map(escape) {
                    properties[key] = json!(text);
                }
            }
        }
    }

    let to_wgs84 = Reprojector::new(dataset.crs(), Crs::Wgs84)?;
    let marker = |row: usize, value: f64, kind: &str| -> Result<Option<Json>> {
        let Some(centroid) = centroids.get(row).copied().flatten() else { return Ok(None) };
        let p = to_wgs84.point(centroid)?;
        let identity = &table.identities()[row];
        Ok(Some(json!({
            "lat": p.y(),
            "lon": p.x(),
            "kind": kind,
            "label": escape(&format!("{} {}: {value:.1}", kind, identity.name)),
        })))
    };
    let mut markers = Vec::new();
    for r in top_k(values, k) {
        markers.extend(marker(r.row, r.value, "Top")?);
    }
    for r in bottom_k(values, k) {
        markers.extend(marker(r.row, r.value, "Bottom")?);
    }

    let fields = TOOLTIP.iter()
        .filter(|(c, _)| table.has_column(c))
        .map(|(c, label)| json!([c, label]))
        .collect::<Vec<_>>();

    let center = dataset.bounds()
        .map(|b| to_wgs84.point(b.center().into()))
        .transpose()?
        .map_or([24.8, 120.97], |p| [p.y(), p.x()]);

    Ok(PAGE
        .replace("{{title}}", &escape(&format!("Hsinchu villages: {column}")))
        .replace("{{subtitle}}", &escape(&format!(
            "{} villages; range {min:.1} to {max:.1}; markers on top and bottom {k}", table.len()
        )))
        .replace("{{center}}", &json!(center).to_string())
        .replace("{{fields}}", &script_json(&json!(fields)))
        .replace("{{markers}}", &script_json(&json!(markers)))
        .replace("{{data}}", &script_json(&collection)))
}

/// JSON safe to embed inside a `<script>` element.
fn script_json(value: &Json) -> String {
    value.to_string().replace("</", "<\\/")
}

pub fn write_interactive_map(html: &str, path: &Path) -> Result<()> {
    write_string(path, html)
        .with_context(|| format!("[io::html] Failed to write {}", path.display()))?;
    info!(path = %path.display(), "wrote interactive map");
    Ok(())
}

const PAGE: &str = r##"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8"/>
<title>{{title}}</title>
<meta name="viewport" content="width=device-width, initial-scale=1.0"/>
<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css"/>
<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
<style>
  html, body, #map { height: 100%; margin: 0; }
  .title-box { position: absolute; top: 10px; left: 50px; z-index: 1000; background: white;
               padding: 8px 14px; border-radius: 4px; box-shadow: 0 1px 4px rgba(0,0,0,0.3);
               font-family: sans-serif; }
  .title-box h3 { margin: 0 0 4px 0; font-size: 16px; }
  .title-box p { margin: 0; font-size: 12px; color: #4b5563; }
</style>
</head>
<body>
<div id="map"></div>
<div class="title-box"><h3>{{title}}</h3><p>{{subtitle}}</p></div>
<script>
const fields = {{fields}};
const markers = {{markers}};
const data = {{data}};

const map = L.map('map').setView({{center}}, 12);
L.tileLayer('https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png', {
  attribution: '&copy; OpenStreetMap contributors'
}).addTo(map);

function fmt(v) {
  if (v === null || v === undefined) return 'n/a';
  return typeof v === 'number' ? v.toLocaleString(undefined, { maximumFractionDigits: 3 }) : v;
}

const layer = L.geoJSON(data, {
  style: f => ({ fillColor: f.properties._fill, color: '#4b5563', weight: 0.6, fillOpacity: 0.7 }),
  onEachFeature: (f, l) => {
    const p = f.properties;
    const rows = fields.map(([c, label]) => `<tr><td>${label}</td><td>${fmt(p[c])}</td></tr>`).join('');
    l.bindTooltip(`<b>${p.name}</b> (${p.district})<table>${rows}</table>`, { sticky: true });
  }
}).addTo(map);
map.fitBounds(layer.getBounds());

for (const m of markers) {
  L.circleMarker([m.lat, m.lon], {
    radius: 7, weight: 2, color: m.kind === 'Top' ? '#b91c1c' : '#1d4ed8', fillOpacity: 0.9
  }).bindTooltip(m.label).addTo(map);
}
</script>
</body>
</html>
"##;
