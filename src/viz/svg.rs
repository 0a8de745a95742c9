//! Paint a [`Scene`] through the plotters SVG backend.

use super::scene::{Anchor, Fill, Point, Primitive, Scene, Stroke, TextStyle};
use crate::scales::{Rgb, WHITE};
use anyhow::{Context, Result};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{FontDesc, FontFamily, FontStyle, FontTransform};
use plotters_svg::SVGBackend;
use std::path::Path;

fn px(p: Point) -> (i32, i32) {
    (p.x.round() as i32, p.y.round() as i32)
}

fn rgba(c: Rgb, opacity: f64) -> RGBAColor {
    RGBColor(c.0, c.1, c.2).mix(opacity.clamp(0.0, 1.0))
}

fn fill_style(f: Fill) -> ShapeStyle {
    ShapeStyle {
        color: rgba(f.color, f.opacity),
        filled: true,
        stroke_width: 0,
    }
}

fn stroke_style(s: Stroke) -> ShapeStyle {
    ShapeStyle {
        color: rgba(s.color, s.opacity),
        filled: false,
        stroke_width: s.width.round().max(1.0) as u32,
    }
}

fn text_style(style: &TextStyle) -> plotters::style::TextStyle<'static> {
    let weight = if style.bold {
        FontStyle::Bold
    } else {
        FontStyle::Normal
    };
    let mut font = FontDesc::new(FontFamily::SansSerif, style.size, weight);
    if style.vertical {
        font = font.transform(FontTransform::Rotate270);
    }
    let h = match style.anchor {
        Anchor::Start => HPos::Left,
        Anchor::Middle => HPos::Center,
        Anchor::End => HPos::Right,
    };
    font.color(&rgba(style.color, style.opacity))
        .pos(Pos::new(h, VPos::Center))
}

fn closed(ring: &[Point]) -> Vec<(i32, i32)> {
    let mut pts: Vec<(i32, i32)> = ring.iter().map(|p| px(*p)).collect();
    if let (Some(first), Some(last)) = (pts.first().copied(), pts.last().copied())
        && first != last
    {
        pts.push(first);
    }
    pts
}

fn draw_primitive(root: &DrawingArea<SVGBackend<'_>, Shift>, prim: &Primitive) -> Result<()> {
    match prim {
        Primitive::Rect { rect, fill, stroke } => {
            let corners = [
                px(Point::new(rect.x, rect.y)),
                px(Point::new(rect.right(), rect.bottom())),
            ];
            if let Some(f) = fill {
                root.draw(&Rectangle::new(corners, fill_style(*f)))
                    .map_err(|e| anyhow::anyhow!("{:?}", e))?;
            }
            if let Some(s) = stroke {
                root.draw(&Rectangle::new(corners, stroke_style(*s)))
                    .map_err(|e| anyhow::anyhow!("{:?}", e))?;
            }
        }
        Primitive::Line { from, to, stroke } => {
            root.draw(&PathElement::new(vec![px(*from), px(*to)], stroke_style(*stroke)))
                .map_err(|e| anyhow::anyhow!("{:?}", e))?;
        }
        Primitive::Circle {
            center,
            radius,
            fill,
            stroke,
        } => {
            let r = radius.round().max(1.0) as i32;
            if let Some(f) = fill {
                root.draw(&Circle::new(px(*center), r, fill_style(*f)))
                    .map_err(|e| anyhow::anyhow!("{:?}", e))?;
            }
            if let Some(s) = stroke {
                root.draw(&Circle::new(px(*center), r, stroke_style(*s)))
                    .map_err(|e| anyhow::anyhow!("{:?}", e))?;
            }
        }
        Primitive::Polygon {
            rings,
            fill,
            stroke,
        } => {
            for (i, ring) in rings.iter().enumerate() {
                // holes are painted over with the background
                let f = match (i, fill) {
                    (0, Some(f)) => Some(*f),
                    (_, Some(_)) => Some(Fill::solid(WHITE)),
                    _ => None,
                };
                if let Some(f) = f {
                    root.draw(&Polygon::new(closed(ring), fill_style(f)))
                        .map_err(|e| anyhow::anyhow!("{:?}", e))?;
                }
                if let Some(s) = stroke {
                    root.draw(&PathElement::new(closed(ring), stroke_style(*s)))
                        .map_err(|e| anyhow::anyhow!("{:?}", e))?;
                }
            }
        }
        Primitive::Polyline { points, stroke } => {
            let pts: Vec<(i32, i32)> = points.iter().map(|p| px(*p)).collect();
            root.draw(&PathElement::new(pts, stroke_style(*stroke)))
                .map_err(|e| anyhow::anyhow!("{:?}", e))?;
        }
        Primitive::Text { at, text, style } => {
            if !text.is_empty() {
                root.draw(&Text::new(text.clone(), px(*at), text_style(style)))
                    .map_err(|e| anyhow::anyhow!("{:?}", e))?;
            }
        }
    }
    Ok(())
}

/// Render `scene` to an SVG document.
pub fn render_svg_string(scene: &Scene) -> Result<String> {
    let w = scene.size.width.round().max(1.0) as u32;
    let h = scene.size.height.round().max(1.0) as u32;
    let mut buf = String::new();
    {
        let root = SVGBackend::with_string(&mut buf, (w, h)).into_drawing_area();
        root.fill(&WHITE_RGB)
            .map_err(|e| anyhow::anyhow!("{:?}", e))?;
        for prim in scene.visible_primitives() {
            draw_primitive(&root, &prim)?;
        }
        root.present().map_err(|e| anyhow::anyhow!("{:?}", e))?;
    }
    Ok(buf)
}

const WHITE_RGB: RGBColor = RGBColor(WHITE.0, WHITE.1, WHITE.2);

/// Render `scene` and write it to `path`.
pub fn write_svg<P: AsRef<Path>>(scene: &Scene, path: P) -> Result<()> {
    let path = path.as_ref();
    let svg = render_svg_string(scene)?;
    std::fs::write(path, svg).with_context(|| format!("write {}", path.display()))?;
    log::info!("wrote {}", path.display());
    Ok(())
}
