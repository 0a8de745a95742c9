/*!
 * Desktop viewer for the aviation accident dashboard.
 *
 * Loads one view at a time from a fixture directory or the live API on a
 * background thread, paints the chart scene with egui and forwards pointer
 * input to the chart's interaction controller (hover, selection, zoom, pan).
 * The current view can be exported as SVG.
 */

use aviation_dash::api::{DataSource, FileSource};
use aviation_dash::config::ApiConfig;
use aviation_dash::dashboard::{DashboardChart, PrepareContext, View, ViewData, ViewParams, prepare};
use aviation_dash::error::FetchError;
use aviation_dash::geo::FeatureCollection;
use aviation_dash::interaction::ActiveSet;
use aviation_dash::layout::Size;
use aviation_dash::pipeline::{DataStage, LoadState, Ticket};
use aviation_dash::scales::{Rgb, ScaleRegistry};
use aviation_dash::stats::PeriodMode;
use aviation_dash::viz::scene::{Anchor, Fill, Point, Primitive, Scene, Stroke};
use aviation_dash::viz::{LineMode, write_svg};
use aviation_dash::{Client, views};
use eframe::egui;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

fn main() -> Result<(), eframe::Error> {
    env_logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1100.0, 700.0])
            .with_min_inner_size([700.0, 450.0])
            .with_title("Aviation Accident Dashboard"),
        ..Default::default()
    };

    eframe::run_native(
        "Aviation Accident Dashboard",
        options,
        Box::new(|_cc| Ok(Box::new(DashApp::new()))),
    )
}

type FetchResult = (Ticket, Result<ViewData, FetchError>);

#[derive(Debug, Clone, Copy, PartialEq)]
enum SourceKind {
    Files,
    Api,
}

struct DashApp {
    // Data source
    source_kind: SourceKind,
    data_dir: String,
    api_url: String,
    geojson_path: String,
    features: Option<Arc<FeatureCollection>>,

    // Page state
    view: View,
    params: ViewParams,
    params_rev: u64,
    registry: ScaleRegistry,
    stage: DataStage<ViewData>,
    chart: DashboardChart,

    // Background fetches share one channel so superseded replies still arrive
    // and get dropped by the stage.
    sender: mpsc::Sender<FetchResult>,
    receiver: mpsc::Receiver<FetchResult>,

    started: Instant,
    hovering: bool,
    status_message: String,
    error_message: String,
}

impl DashApp {
    fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        let data_dir = std::env::current_dir()
            .map(|d| d.join("data"))
            .unwrap_or_else(|_| PathBuf::from("data"))
            .to_string_lossy()
            .to_string();
        let view = View::Aboard;
        let params = ViewParams::default();
        let mut app = Self {
            source_kind: SourceKind::Files,
            data_dir,
            api_url: ApiConfig::from_env().base_url,
            geojson_path: String::new(),
            features: None,
            view,
            chart: DashboardChart::new(view, Size::new(800.0, 600.0), &params.locale),
            params,
            params_rev: 0,
            registry: ScaleRegistry::new(),
            stage: DataStage::new(),
            sender,
            receiver,
            started: Instant::now(),
            hovering: false,
            status_message: String::new(),
            error_message: String::new(),
        };
        app.start_fetch();
        app
    }

    fn now(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    fn start_fetch(&mut self) {
        let ticket = self.stage.begin();
        self.error_message.clear();
        self.status_message = format!("Loading {}...", self.view.title());

        let sender = self.sender.clone();
        let view = self.view;
        let params = self.params.clone();
        let kind = self.source_kind;
        let data_dir = self.data_dir.clone();
        let api_url = self.api_url.clone();

        thread::spawn(move || {
            let result = open_source(kind, &data_dir, &api_url)
                .and_then(|source| view.fetch(source.as_ref(), &params));
            let _ = sender.send((ticket, result));
        });
    }

    fn check_fetch_results(&mut self) {
        while let Ok((ticket, result)) = self.receiver.try_recv() {
            if !self.stage.complete(ticket, result) {
                continue;
            }
            match self.stage.state() {
                LoadState::Ready(snap) => {
                    self.status_message = format!("Loaded {}", self.view.title());
                    if let ViewData::Clusters(d) = snap.data.as_ref() {
                        let universe = views::cluster_universe(d);
                        let stale = self.params.clusters.as_ref().is_none_or(|s| s.universe() != universe.as_slice());
                        if stale {
                            self.params.clusters = Some(ActiveSet::all(universe));
                            self.params_rev += 1;
                        }
                    }
                }
                LoadState::Failed(e) => {
                    self.status_message.clear();
                    self.error_message = e.clone();
                }
                _ => {}
            }
        }
    }

    /// Switch views, refetching only when the current payload cannot feed
    /// the new view.
    fn switch_view(&mut self, view: View) {
        let size = self.chart.final_scene().size;
        self.view = view;
        self.chart = DashboardChart::new(view, size, &self.params.locale);
        let reusable = match self.stage.state() {
            LoadState::Ready(snap) => {
                let ctx = PrepareContext {
                    registry: &self.registry,
                    features: self.features.clone(),
                    params: &self.params,
                };
                prepare(view, &snap.data, &ctx).is_some()
            }
            _ => false,
        };
        if !reusable {
            self.start_fetch();
        }
    }

    fn load_geojson(&mut self) {
        match FeatureCollection::from_path(self.geojson_path.trim()) {
            Ok(fc) => {
                self.status_message = format!("Loaded {} country shapes", fc.features.len());
                self.features = Some(Arc::new(fc));
                self.params_rev += 1;
            }
            Err(err) => self.error_message = format!("Failed to load GeoJSON: {err:#}"),
        }
    }

    fn export_svg(&mut self) {
        let default_dir = dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        let Some(path) = rfd::FileDialog::new()
            .set_directory(default_dir)
            .set_file_name(format!("{}.svg", self.view.name()))
            .add_filter("SVG", &["svg"])
            .save_file()
        else {
            return;
        };
        match write_svg(self.chart.final_scene(), &path) {
            Ok(()) => self.status_message = format!("Wrote {}", path.display()),
            Err(err) => self.error_message = format!("Failed to export chart: {err:#}"),
        }
    }

    fn params_ui(&mut self, ui: &mut egui::Ui) {
        let snapshot = self.stage.state().snapshot().cloned();
        match self.view {
            View::ManufacturerShare | View::ManufacturerTotals | View::ManufacturerTrends => {
                let years = match snapshot.as_ref().map(|s| s.data.as_ref()) {
                    Some(ViewData::Manufacturers(rows)) => views::manufacturer_years(rows),
                    _ => Vec::new(),
                };
                if self.view == View::ManufacturerShare && !years.is_empty() {
                    let mut year = self.params.year.unwrap_or(years[years.len() - 1]);
                    egui::ComboBox::from_label("Year")
                        .selected_text(year.to_string())
                        .show_ui(ui, |ui| {
                            for y in &years {
                                ui.selectable_value(&mut year, *y, y.to_string());
                            }
                        });
                    self.params.year = Some(year);
                }
                if self.view == View::ManufacturerTotals {
                    ui.horizontal(|ui| {
                        ui.label("Top:");
                        ui.add(egui::DragValue::new(&mut self.params.top_n).range(1..=40));
                    });
                }
                if self.view == View::ManufacturerTrends {
                    line_mode_ui(ui, &mut self.params.line_mode);
                }
            }
            View::TemporalTrends => {
                ui.horizontal(|ui| {
                    ui.label("Period:");
                    ui.radio_value(&mut self.params.period, PeriodMode::Yearly, "Yearly");
                    ui.radio_value(&mut self.params.period, PeriodMode::Decade, "Decade");
                    ui.radio_value(&mut self.params.period, PeriodMode::Seasonal, "Seasonal");
                });
                ui.checkbox(&mut self.params.cumulative, "Cumulative");
                line_mode_ui(ui, &mut self.params.line_mode);
            }
            View::CountryClusters => {
                let countries = match snapshot.as_ref().map(|s| s.data.as_ref()) {
                    Some(ViewData::Clusters(d)) => views::cluster_countries(d),
                    _ => Vec::new(),
                };
                let selected = self
                    .params
                    .country
                    .clone()
                    .or_else(|| countries.first().cloned())
                    .unwrap_or_default();
                let mut country = selected.clone();
                egui::ComboBox::from_label("Country")
                    .selected_text(country.as_str())
                    .show_ui(ui, |ui| {
                        for c in &countries {
                            ui.selectable_value(&mut country, c.clone(), c.as_str());
                        }
                    });
                if country != selected {
                    self.params.country = Some(country);
                }
            }
            View::Countries => {
                ui.horizontal(|ui| {
                    ui.label("GeoJSON:");
                    ui.text_edit_singleline(&mut self.geojson_path);
                    if ui.button("Browse").clicked()
                        && let Some(path) = rfd::FileDialog::new()
                            .add_filter("GeoJSON", &["json", "geojson"])
                            .pick_file()
                    {
                        self.geojson_path = path.to_string_lossy().to_string();
                    }
                });
                if ui.button("Load shapes").clicked() {
                    self.load_geojson();
                }
            }
            _ => {}
        }

        if self.view.uses_clusters()
            && let Some(set) = self.params.clusters.as_mut()
        {
            ui.separator();
            ui.label("Accident Types:");
            ui.horizontal(|ui| {
                if ui.button("All").clicked() {
                    set.select_all();
                }
                if ui.button("None").clicked() {
                    set.clear_all();
                }
            });
            let keys = set.universe().to_vec();
            for key in keys {
                let mut on = set.is_active(&key);
                if ui.checkbox(&mut on, key.as_str()).changed() {
                    set.toggle(&key);
                }
            }
        }
    }

    fn chart_ui(&mut self, ui: &mut egui::Ui) {
        let now = self.now();
        let avail = ui.available_size();
        let (response, painter) = ui.allocate_painter(avail, egui::Sense::click_and_drag());
        let origin = response.rect.min;
        let to_scene = |p: egui::Pos2| Point::new((p.x - origin.x) as f64, (p.y - origin.y) as f64);

        let chart = self.chart.interactive_mut();
        chart.observe_size(Size::new(avail.x as f64, avail.y as f64), now);
        chart.tick(now);

        if let Some(pos) = response.hover_pos() {
            chart.pointer_move(to_scene(pos), now);
            self.hovering = true;
            let scroll = ui.input(|i| i.raw_scroll_delta.y);
            if scroll != 0.0 {
                chart.wheel(to_scene(pos), -scroll as f64, now);
            }
        } else if self.hovering {
            chart.pointer_leave();
            self.hovering = false;
        }
        if response.clicked()
            && let Some(pos) = response.interact_pointer_pos()
        {
            chart.click(to_scene(pos), now);
        }
        if response.drag_started()
            && let Some(pos) = response.interact_pointer_pos()
        {
            chart.drag_start(to_scene(pos), now);
        }
        if response.dragged()
            && let Some(pos) = response.interact_pointer_pos()
        {
            chart.drag_to(to_scene(pos), now);
        }
        if response.drag_stopped() {
            chart.drag_end();
        }

        paint_scene(&painter, origin, &chart.scene(now));

        if chart.is_animating(now) {
            ui.ctx().request_repaint();
        }
        if let Some(tip) = chart.tooltip() {
            response.on_hover_ui_at_pointer(|ui| {
                ui.strong(tip.title.as_str());
                for (k, v) in &tip.rows {
                    ui.label(format!("{k}: {v}"));
                }
            });
        }
    }
}

fn open_source(kind: SourceKind, data_dir: &str, api_url: &str) -> Result<Box<dyn DataSource>, FetchError> {
    match kind {
        SourceKind::Files => Ok(Box::new(FileSource::new(data_dir.trim()))),
        SourceKind::Api => {
            let cfg = ApiConfig::from_env().with_base_url(api_url.trim());
            Client::new(cfg)
                .map(|c| Box::new(c) as Box<dyn DataSource>)
                .map_err(|e| FetchError::Network {
                    url: api_url.to_string(),
                    message: format!("{e:#}"),
                })
        }
    }
}

fn line_mode_ui(ui: &mut egui::Ui, mode: &mut LineMode) {
    ui.horizontal(|ui| {
        ui.label("Chart:");
        ui.radio_value(mode, LineMode::Lines, "Lines");
        ui.radio_value(mode, LineMode::Area, "Area");
        ui.radio_value(mode, LineMode::StackedArea, "Stacked");
    });
}

impl eframe::App for DashApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.check_fetch_results();
        if self.stage.state().is_loading() {
            ctx.request_repaint();
        }

        egui::SidePanel::left("controls").min_width(260.0).show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.heading("Aviation Accidents");
                ui.add_space(8.0);

                ui.group(|ui| {
                    ui.label("Data Source");
                    ui.horizontal(|ui| {
                        ui.radio_value(&mut self.source_kind, SourceKind::Files, "Files");
                        ui.radio_value(&mut self.source_kind, SourceKind::Api, "API");
                    });
                    match self.source_kind {
                        SourceKind::Files => {
                            ui.horizontal(|ui| {
                                ui.text_edit_singleline(&mut self.data_dir);
                                if ui.button("Browse").clicked()
                                    && let Some(path) = rfd::FileDialog::new().pick_folder()
                                {
                                    self.data_dir = path.to_string_lossy().to_string();
                                }
                            });
                        }
                        SourceKind::Api => {
                            ui.text_edit_singleline(&mut self.api_url);
                        }
                    }
                    if ui.button("Reload").clicked() {
                        self.start_fetch();
                    }
                });

                ui.add_space(8.0);

                let mut view = self.view;
                egui::ComboBox::from_label("View")
                    .selected_text(view.title())
                    .width(220.0)
                    .show_ui(ui, |ui| {
                        for v in View::ALL {
                            ui.selectable_value(&mut view, v, v.title());
                        }
                    });
                if view != self.view {
                    self.switch_view(view);
                }

                ui.add_space(8.0);
                let before = self.params.clone();
                self.params_ui(ui);
                if self.params != before {
                    self.params_rev += 1;
                }

                ui.add_space(8.0);
                let now = self.now();
                ui.horizontal(|ui| {
                    let chart = self.chart.interactive_mut();
                    if chart.supports_zoom() {
                        if ui.button("+").on_hover_text("Zoom in").clicked() {
                            chart.zoom_in(now);
                        }
                        if ui.button("−").on_hover_text("Zoom out").clicked() {
                            chart.zoom_out(now);
                        }
                        if ui.button("Reset").clicked() {
                            chart.reset_zoom(now);
                        }
                    }
                    if ui.button("Clear selection").clicked() {
                        chart.clear_selection();
                    }
                });
                if ui.button("Export SVG").clicked() {
                    self.export_svg();
                }

                ui.add_space(8.0);
                if self.stage.state().is_loading() {
                    ui.spinner();
                }
                if !self.status_message.is_empty() {
                    ui.colored_label(egui::Color32::DARK_GREEN, &self.status_message);
                }
                if !self.error_message.is_empty() {
                    ui.colored_label(egui::Color32::RED, &self.error_message);
                }
            });
        });

        let now = self.now();
        let ctx_prep = PrepareContext {
            registry: &self.registry,
            features: self.features.clone(),
            params: &self.params,
        };
        self.chart
            .sync(self.view, self.stage.state(), self.params_rev, &ctx_prep, now);

        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(egui::Color32::WHITE))
            .show(ctx, |ui| self.chart_ui(ui));

        // lets the resize debounce settle without further input
        ctx.request_repaint_after(Duration::from_millis(120));
    }
}

fn color(c: Rgb, opacity: f64) -> egui::Color32 {
    egui::Color32::from_rgba_unmultiplied(c.0, c.1, c.2, (opacity.clamp(0.0, 1.0) * 255.0).round() as u8)
}

fn fill_color(f: &Option<Fill>) -> egui::Color32 {
    f.map(|f| color(f.color, f.opacity)).unwrap_or(egui::Color32::TRANSPARENT)
}

fn stroke(s: &Option<Stroke>) -> egui::Stroke {
    s.map(|s| egui::Stroke::new(s.width as f32, color(s.color, s.opacity)))
        .unwrap_or(egui::Stroke::NONE)
}

fn paint_scene(painter: &egui::Painter, origin: egui::Pos2, scene: &Scene) {
    let pos = |p: Point| egui::pos2(origin.x + p.x as f32, origin.y + p.y as f32);
    for prim in scene.visible_primitives() {
        match prim {
            Primitive::Rect { rect, fill, stroke: s } => {
                let r = egui::Rect::from_min_size(pos(Point::new(rect.x, rect.y)), egui::vec2(rect.w as f32, rect.h as f32));
                painter.rect(r, 0.0, fill_color(&fill), stroke(&s));
            }
            Primitive::Line { from, to, stroke: s } => {
                painter.line_segment([pos(from), pos(to)], stroke(&Some(s)));
            }
            Primitive::Circle {
                center,
                radius,
                fill,
                stroke: s,
            } => {
                painter.circle(pos(center), radius as f32, fill_color(&fill), stroke(&s));
            }
            Primitive::Polygon { rings, fill, stroke: s } => {
                let fill = fill_color(&fill);
                for (i, ring) in rings.iter().enumerate() {
                    let pts: Vec<egui::Pos2> = ring.iter().map(|p| pos(*p)).collect();
                    // holes are painted white, as in the SVG output
                    let c = if i == 0 { fill } else { egui::Color32::WHITE };
                    if c != egui::Color32::TRANSPARENT {
                        painter.add(egui::Shape::mesh(fill_mesh(&pts, c)));
                    }
                    let st = stroke(&s);
                    if st != egui::Stroke::NONE {
                        painter.add(egui::Shape::closed_line(pts, st));
                    }
                }
            }
            Primitive::Polyline { points, stroke: s } => {
                let pts = points.into_iter().map(pos).collect();
                painter.add(egui::Shape::line(pts, stroke(&Some(s))));
            }
            Primitive::Text { at, text, style } => {
                let font = egui::FontId::proportional(style.size as f32);
                let c = color(style.color, style.opacity);
                let galley = painter.layout_no_wrap(text, font, c);
                let size = galley.size();
                let dx = match style.anchor {
                    Anchor::Start => 0.0,
                    Anchor::Middle => size.x / 2.0,
                    Anchor::End => size.x,
                };
                let at = pos(at);
                if style.vertical {
                    // rotated -90°: the galley's top-left ends up bottom-left
                    let p = egui::pos2(at.x - size.y / 2.0, at.y + dx);
                    painter.add(
                        egui::epaint::TextShape::new(p, galley, c).with_angle(-std::f32::consts::FRAC_PI_2),
                    );
                } else {
                    painter.galley(egui::pos2(at.x - dx, at.y - size.y / 2.0), galley, c);
                }
            }
        }
    }
}

/// Ear-clipping triangulation; egui only fills convex paths natively.
fn fill_mesh(pts: &[egui::Pos2], c: egui::Color32) -> egui::Mesh {
    let mut mesh = egui::Mesh::default();
    let mut pts = pts.to_vec();
    if pts.len() > 1 && pts.first() == pts.last() {
        pts.pop();
    }
    if pts.len() < 3 {
        return mesh;
    }
    for p in &pts {
        mesh.colored_vertex(*p, c);
    }
    let cross = |a: egui::Pos2, b: egui::Pos2, c: egui::Pos2| (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
    let area: f32 = (0..pts.len())
        .map(|i| {
            let (a, b) = (pts[i], pts[(i + 1) % pts.len()]);
            a.x * b.y - b.x * a.y
        })
        .sum();
    let sign = if area >= 0.0 { 1.0 } else { -1.0 };
    let mut idx: Vec<usize> = (0..pts.len()).collect();
    while idx.len() > 3 {
        let n = idx.len();
        let ear = (0..n).find(|&i| {
            let (a, b, d) = (pts[idx[(i + n - 1) % n]], pts[idx[i]], pts[idx[(i + 1) % n]]);
            if cross(a, b, d) * sign <= 0.0 {
                return false;
            }
            idx.iter().all(|&j| {
                let p = pts[j];
                p == a
                    || p == b
                    || p == d
                    || !(cross(a, b, p) * sign > 0.0 && cross(b, d, p) * sign > 0.0 && cross(d, a, p) * sign > 0.0)
            })
        });
        match ear {
            Some(i) => {
                mesh.add_triangle(idx[(i + n - 1) % n] as u32, idx[i] as u32, idx[(i + 1) % n] as u32);
                idx.remove(i);
            }
            // degenerate ring: fan the rest
            None => break,
        }
    }
    for i in 1..idx.len().saturating_sub(1) {
        mesh.add_triangle(idx[0] as u32, idx[i] as u32, idx[i + 1] as u32);
    }
    mesh
}
