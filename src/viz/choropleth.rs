//! Choropleth of accident counts per country.

use super::axis::Frame;
use super::legend::gradient_marks;
use super::scene::{EntityRef, Enter, Fill, Mark, Point, Primitive, Rect, Scene, Stroke};
use super::types::{ChartConfig, LegendMode, Tooltip};
use super::util::NumberFormat;
use super::{ChartRenderer, chart_size};
use crate::config::MAP_ZOOM_EXTENT;
use crate::geo::{CountryFeature, FeatureCollection, Projection};
use crate::interaction::ViewportState;
use crate::scales::{
    BLACK, ContinuousColorScale, NO_DATA_COLOR, Rgb, WHITE, log_or_linear_color_scale,
};
use std::collections::BTreeMap;
use std::sync::Arc;

const GRADIENT_BAND_H: f64 = 34.0;
const GRADIENT_W: f64 = 220.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ChoroplethInput {
    pub features: Arc<FeatureCollection>,
    /// Lower-cased, trimmed country name -> count.
    counts: BTreeMap<String, f64>,
    domain: Option<(f64, f64)>,
}

fn norm(name: &str) -> String {
    name.trim().to_lowercase()
}

impl ChoroplethInput {
    pub fn new<I, S>(features: Arc<FeatureCollection>, counts: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        let mut map = BTreeMap::new();
        for (k, v) in counts {
            if v.is_finite() {
                *map.entry(norm(k.as_ref())).or_insert(0.0) += v;
            }
        }
        Self {
            features,
            counts: map,
            domain: None,
        }
    }

    /// Fix the color domain instead of deriving `[1, max]` from the counts.
    pub fn domain(mut self, min: f64, max: f64) -> Self {
        self.domain = Some((min, max));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty() || self.features.features.is_empty()
    }

    /// Count for a feature, matched case-insensitively on either name field.
    pub fn count_for(&self, f: &CountryFeature) -> Option<f64> {
        self.counts.get(&norm(&f.name)).copied().or_else(|| {
            f.name_long
                .as_deref()
                .and_then(|n| self.counts.get(&norm(n)).copied())
        })
    }

    /// Log scale over `[1, max]`; linear when that domain is unusable.
    pub fn color_scale(&self) -> ContinuousColorScale {
        let (lo, hi) = self.domain.unwrap_or_else(|| {
            let max = self.counts.values().copied().fold(0.0, f64::max);
            (1.0, max.max(1.0))
        });
        log_or_linear_color_scale(lo, hi)
    }

    /// Fill for a region: the scale color for positive counts, the
    /// zero/no-data color otherwise.
    pub fn fill_for(&self, f: &CountryFeature, scale: &ContinuousColorScale) -> Rgb {
        match self.count_for(f) {
            Some(c) if c > 0.0 => scale.color(c),
            _ => NO_DATA_COLOR,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChoroplethRenderer {
    pub config: ChartConfig,
}

impl ChoroplethRenderer {
    pub fn new(config: ChartConfig) -> Self {
        Self {
            config: ChartConfig {
                legend: LegendMode::Hidden,
                ..config
            },
        }
    }
}

impl ChartRenderer for ChoroplethRenderer {
    type Input = ChoroplethInput;

    fn render(&self, input: &ChoroplethInput, view: &ViewportState) -> Scene {
        let size = chart_size(view);
        let bounds = input.features.projected_bounds();
        let Some(bounds) = bounds.filter(|_| !input.is_empty()) else {
            return Scene::no_data(size);
        };
        let frame = Frame::new(&self.config, size, &[]);
        let mut plot = frame.plot;
        plot.h = (plot.h - GRADIENT_BAND_H).max(1.0);
        let proj = Projection::fit(bounds, plot.x, plot.y, plot.w, plot.h);
        let scale = input.color_scale();
        let z = view.zoom;

        let mut scene = Scene::new(size, plot);
        scene.transform = z;
        let mut hovered_mark = None;
        for f in &input.features.features {
            let entity = EntityRef::Region(f.name.clone());
            let hovered = view.is_hovered(&entity);
            let rings: Vec<Vec<Point>> = f
                .polygons
                .iter()
                .flatten()
                .map(|ring| {
                    ring.iter()
                        .map(|&(lon, lat)| {
                            let (x, y) = proj.project(lon, lat);
                            z.apply(Point::new(x, y))
                        })
                        .collect()
                })
                .collect();
            let mark = Mark::data(Primitive::Polygon {
                rings,
                fill: Some(Fill::solid(input.fill_for(f, &scale))),
                stroke: Some(if hovered {
                    Stroke::new(BLACK, 1.5)
                } else {
                    Stroke::new(WHITE, 0.5)
                }),
            })
            .bound(entity)
            .enter(Enter::FadeIn);
            if hovered {
                hovered_mark = Some(mark);
            } else {
                scene.push(mark);
            }
        }
        scene.extend(hovered_mark);

        scene.extend(frame.titles(&self.config));
        let legend = Rect::new(
            plot.x,
            plot.bottom() + 8.0,
            GRADIENT_W.min(plot.w),
            GRADIENT_BAND_H - 8.0,
        );
        scene.extend(gradient_marks(&scale, legend, &frame.fmt));
        scene
    }

    fn tooltip(&self, input: &ChoroplethInput, entity: &EntityRef) -> Option<Tooltip> {
        let EntityRef::Region(name) = entity else {
            return None;
        };
        let f = input.features.features.iter().find(|f| &f.name == name)?;
        let fmt = NumberFormat::for_tag(&self.config.locale);
        let value = match input.count_for(f) {
            Some(c) => fmt.count(c),
            None => "No data".to_string(),
        };
        Some(Tooltip::new(f.name.clone()).row("Accidents", value))
    }

    fn zoom_extent(&self) -> Option<(f64, f64)> {
        Some(MAP_ZOOM_EXTENT)
    }
}
