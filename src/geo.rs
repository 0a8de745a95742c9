//! Country boundaries from a GeoJSON feature collection, and the Mercator
//! projection used to fit them into a chart.

use anyhow::{Context, Result, bail};
use serde_json::Value;
use std::f64::consts::PI;
use std::path::Path;

/// Web-Mercator is undefined at the poles; latitudes are clamped to this.
const MAX_LATITUDE: f64 = 85.051_128_78;

/// A ring of `(lon, lat)` positions.
pub type Ring = Vec<(f64, f64)>;

#[derive(Debug, Clone, PartialEq)]
pub struct CountryFeature {
    pub name: String,
    pub name_long: Option<String>,
    /// Polygons, each an outer ring followed by holes.
    pub polygons: Vec<Vec<Ring>>,
}

impl CountryFeature {
    /// Case-insensitive match against either name field.
    pub fn matches(&self, country: &str) -> bool {
        let c = country.trim();
        self.name.eq_ignore_ascii_case(c)
            || self
                .name_long
                .as_deref()
                .map(|n| n.eq_ignore_ascii_case(c))
                .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
    pub features: Vec<CountryFeature>,
}

impl FeatureCollection {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read boundaries {}", path.display()))?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let v: Value = serde_json::from_str(text).context("parse GeoJSON")?;
        Self::from_value(&v)
    }

    /// Accepts a `FeatureCollection`; features without a name or without
    /// polygon geometry are skipped.
    pub fn from_value(v: &Value) -> Result<Self> {
        let Some(features) = v.get("features").and_then(Value::as_array) else {
            bail!("GeoJSON has no `features` array");
        };
        let mut out = Vec::with_capacity(features.len());
        for f in features {
            let props = f.get("properties");
            let name = props
                .and_then(|p| p.get("name"))
                .and_then(Value::as_str)
                .map(str::to_string);
            let Some(name) = name else { continue };
            let name_long = props
                .and_then(|p| p.get("name_long"))
                .and_then(Value::as_str)
                .map(str::to_string);
            let polygons = f.get("geometry").map(parse_geometry).unwrap_or_default();
            if polygons.is_empty() {
                log::debug!("feature {name} has no polygon geometry");
                continue;
            }
            out.push(CountryFeature {
                name,
                name_long,
                polygons,
            });
        }
        Ok(Self { features: out })
    }

    /// Projected bounding box `(x0, y0, x1, y1)` in raw Mercator units.
    pub fn projected_bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let mut b: Option<(f64, f64, f64, f64)> = None;
        for f in &self.features {
            for poly in &f.polygons {
                for &(lon, lat) in poly.iter().flatten() {
                    let (x, y) = mercator(lon, lat);
                    b = Some(match b {
                        None => (x, y, x, y),
                        Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
                    });
                }
            }
        }
        b
    }
}

fn parse_ring(v: &Value) -> Ring {
    v.as_array()
        .map(|pts| {
            pts.iter()
                .filter_map(|p| {
                    let p = p.as_array()?;
                    Some((p.first()?.as_f64()?, p.get(1)?.as_f64()?))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn parse_polygon(v: &Value) -> Vec<Ring> {
    v.as_array()
        .map(|rings| {
            rings
                .iter()
                .map(parse_ring)
                .filter(|r| r.len() >= 3)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_geometry(g: &Value) -> Vec<Vec<Ring>> {
    let coords = g.get("coordinates");
    match (g.get("type").and_then(Value::as_str), coords) {
        (Some("Polygon"), Some(c)) => {
            let p = parse_polygon(c);
            if p.is_empty() { vec![] } else { vec![p] }
        }
        (Some("MultiPolygon"), Some(c)) => c
            .as_array()
            .map(|ps| {
                ps.iter()
                    .map(parse_polygon)
                    .filter(|p| !p.is_empty())
                    .collect()
            })
            .unwrap_or_default(),
        _ => vec![],
    }
}

/// Spherical Mercator in radians; y grows northwards.
pub fn mercator(lon: f64, lat: f64) -> (f64, f64) {
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    (lon.to_radians(), (PI / 4.0 + lat / 2.0).tan().ln())
}

/// Mercator fitted to a pixel rectangle (y grows downwards).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub scale: f64,
    pub tx: f64,
    pub ty: f64,
}

impl Projection {
    /// Fit `bounds` (raw Mercator units) into `[x, x + w] × [y, y + h]`, preserving aspect ratio.
    pub fn fit(bounds: (f64, f64, f64, f64), x: f64, y: f64, w: f64, h: f64) -> Self {
        let (x0, y0, x1, y1) = bounds;
        let bw = (x1 - x0).max(f64::EPSILON);
        let bh = (y1 - y0).max(f64::EPSILON);
        let scale = (w / bw).min(h / bh);
        // center the fitted box
        let tx = x + (w - bw * scale) / 2.0 - x0 * scale;
        let ty = y + (h - bh * scale) / 2.0 + y1 * scale;
        Self { scale, tx, ty }
    }

    pub fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        let (mx, my) = mercator(lon, lat);
        (self.tx + mx * self.scale, self.ty - my * self.scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {"name": "France", "name_long": "French Republic"},
             "geometry": {"type": "Polygon", "coordinates": [[[0,45],[5,45],[5,50],[0,50],[0,45]]]}},
            {"type": "Feature", "properties": {"name": "Nowhere"}, "geometry": null}
        ]
    }"#;

    #[test]
    fn parses_and_matches_both_names() {
        let fc = FeatureCollection::from_json_str(SAMPLE).unwrap();
        assert_eq!(fc.features.len(), 1);
        assert!(fc.features[0].matches("france"));
        assert!(fc.features[0].matches("FRENCH REPUBLIC"));
        assert!(!fc.features[0].matches("Germany"));
    }

    #[test]
    fn fitted_projection_stays_inside_the_box() {
        let fc = FeatureCollection::from_json_str(SAMPLE).unwrap();
        let b = fc.projected_bounds().unwrap();
        let p = Projection::fit(b, 10.0, 20.0, 200.0, 100.0);
        for &(lon, lat) in fc.features[0].polygons[0][0].iter() {
            let (x, y) = p.project(lon, lat);
            assert!((10.0 - 1e-9..=210.0 + 1e-9).contains(&x));
            assert!((20.0 - 1e-9..=120.0 + 1e-9).contains(&y));
        }
    }
}
