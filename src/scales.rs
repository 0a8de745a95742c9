//! Color and position scales.
//!
//! [`ScaleRegistry`] caches categorical color scales keyed by the sorted,
//! de-duplicated key set, so every chart asking for the same key universe gets
//! the very same mapping. Pass the *global* universe (all cluster ids, all
//! manufacturer names), never a filtered display list, or colors will shift
//! when the selection changes.

use crate::error::{ChartError, ChartResult};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Mutex};

/// 8-bit sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Parse `#rrggbb` or `rrggbb`.
    pub fn from_hex(s: &str) -> Option<Rgb> {
        let s = s.trim().trim_start_matches('#');
        if s.len() != 6 || !s.is_ascii() {
            return None;
        }
        let p = |i: usize| u8::from_str_radix(&s[i..i + 2], 16).ok();
        Some(Rgb(p(0)?, p(2)?, p(4)?))
    }

    pub fn hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }

    /// Linear interpolation in sRGB space, `t` clamped to `[0, 1]`.
    pub fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgb(mix(self.0, other.0), mix(self.1, other.1), mix(self.2, other.2))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex())
    }
}

pub const BLACK: Rgb = Rgb(0, 0, 0);
pub const WHITE: Rgb = Rgb(255, 255, 255);
/// Regions with no count, and the "Other" pie slice.
pub const NO_DATA_COLOR: Rgb = Rgb(0xcc, 0xcc, 0xcc);
/// Fill for bars outside the active set.
pub const INACTIVE_COLOR: Rgb = Rgb(0xd1, 0xd5, 0xdb);
/// Keys outside a scale's universe.
pub const UNKNOWN_COLOR: Rgb = Rgb(0x80, 0x80, 0x80);
pub const AXIS_COLOR: Rgb = Rgb(0x37, 0x41, 0x51);
pub const GRID_COLOR: Rgb = Rgb(0xe5, 0xe7, 0xeb);

/// d3 `schemeCategory10`.
pub const CATEGORY10: [Rgb; 10] = [
    Rgb(0x1f, 0x77, 0xb4),
    Rgb(0xff, 0x7f, 0x0e),
    Rgb(0x2c, 0xa0, 0x2c),
    Rgb(0xd6, 0x27, 0x28),
    Rgb(0x94, 0x67, 0xbd),
    Rgb(0x8c, 0x56, 0x4b),
    Rgb(0xe3, 0x77, 0xc2),
    Rgb(0x7f, 0x7f, 0x7f),
    Rgb(0xbc, 0xbd, 0x22),
    Rgb(0x17, 0xbe, 0xcf),
];

/// ColorBrewer Set2.
pub const SET2: [Rgb; 8] = [
    Rgb(0x66, 0xc2, 0xa5),
    Rgb(0xfc, 0x8d, 0x62),
    Rgb(0x8d, 0xa0, 0xcb),
    Rgb(0xe7, 0x8a, 0xc3),
    Rgb(0xa6, 0xd8, 0x54),
    Rgb(0xff, 0xd9, 0x2f),
    Rgb(0xe5, 0xc4, 0x94),
    Rgb(0xb3, 0xb3, 0xb3),
];

/// ColorBrewer Set3.
pub const SET3: [Rgb; 12] = [
    Rgb(0x8d, 0xd3, 0xc7),
    Rgb(0xff, 0xff, 0xb3),
    Rgb(0xbe, 0xba, 0xda),
    Rgb(0xfb, 0x80, 0x72),
    Rgb(0x80, 0xb1, 0xd3),
    Rgb(0xfd, 0xb4, 0x62),
    Rgb(0xb3, 0xde, 0x69),
    Rgb(0xfc, 0xcd, 0xe5),
    Rgb(0xd9, 0xd9, 0xd9),
    Rgb(0xbc, 0x80, 0xbd),
    Rgb(0xcc, 0xeb, 0xc5),
    Rgb(0xff, 0xed, 0x6f),
];

pub const PALETTE_LEN: usize = CATEGORY10.len() + SET2.len() + SET3.len();

/// Entry `i` of Category10 ++ Set2 ++ Set3, cycling past the end.
pub fn palette_color(i: usize) -> Rgb {
    let i = i % PALETTE_LEN;
    if i < CATEGORY10.len() {
        CATEGORY10[i]
    } else if i < CATEGORY10.len() + SET2.len() {
        SET2[i - CATEGORY10.len()]
    } else {
        SET3[i - CATEGORY10.len() - SET2.len()]
    }
}

/// Deterministic key -> color mapping over a fixed key universe.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryScale {
    keys: Vec<String>,
}

impl CategoryScale {
    /// Colors are assigned by position in the sorted, de-duplicated key list.
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set: BTreeSet<String> = keys.into_iter().map(|k| k.as_ref().to_string()).collect();
        Self {
            keys: set.into_iter().collect(),
        }
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn get(&self, key: &str) -> Option<Rgb> {
        self.keys
            .binary_search_by(|k| k.as_str().cmp(key))
            .ok()
            .map(palette_color)
    }

    /// Color for `key`, or [`UNKNOWN_COLOR`] outside the universe.
    pub fn color(&self, key: &str) -> Rgb {
        self.get(key).unwrap_or(UNKNOWN_COLOR)
    }

    fn cache_key(&self) -> String {
        self.keys.join("\u{1f}")
    }
}

/// Session-scoped cache of categorical color scales.
///
/// Inject one registry per session (or per test); it is append-only for its
/// lifetime. The lock serializes the check-then-insert so two threads asking
/// for the same universe never build it twice.
#[derive(Debug, Default)]
pub struct ScaleRegistry {
    cache: Mutex<AHashMap<String, Arc<CategoryScale>>>,
}

impl ScaleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn color_scale_for<I, S>(&self, keys: I) -> Arc<CategoryScale>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let scale = CategoryScale::new(keys);
        let key = scale.cache_key();
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(hit) = cache.get(&key) {
            return Arc::clone(hit);
        }
        log::debug!("color scale cache miss: {} keys", scale.keys.len());
        let scale = Arc::new(scale);
        cache.insert(key, Arc::clone(&scale));
        scale
    }

    pub fn len(&self) -> usize {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorScaleKind {
    Linear,
    Log,
}

/// Two-stop ramp for linear color scales.
pub const LINEAR_RAMP: [Rgb; 2] = [Rgb(0xde, 0xeb, 0xf7), Rgb(0x08, 0x51, 0x9c)];
/// Light yellow -> orange -> dark red.
pub const LOG_RAMP: [Rgb; 3] = [Rgb(0xff, 0xff, 0xcc), Rgb(0xfd, 0x8d, 0x3c), Rgb(0x80, 0x00, 0x26)];

/// Value -> color over a fixed gradient, clamped to the domain.
#[derive(Debug, Clone, PartialEq)]
pub struct ContinuousColorScale {
    kind: ColorScaleKind,
    min: f64,
    max: f64,
    stops: Vec<Rgb>,
}

impl ContinuousColorScale {
    pub fn kind(&self) -> ColorScaleKind {
        self.kind
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.min, self.max)
    }

    pub fn stops(&self) -> &[Rgb] {
        &self.stops
    }

    /// Position of `v` in the domain, `[0, 1]`.
    pub fn normalize(&self, v: f64) -> f64 {
        let (lo, hi, x) = match self.kind {
            ColorScaleKind::Linear => (self.min, self.max, v),
            ColorScaleKind::Log => {
                let x = if v > 0.0 { v.ln() } else { f64::NEG_INFINITY };
                (self.min.ln(), self.max.ln(), x)
            }
        };
        if hi <= lo {
            return if x >= hi { 1.0 } else { 0.0 };
        }
        ((x - lo) / (hi - lo)).clamp(0.0, 1.0)
    }

    /// Color for `v`; non-finite values get [`NO_DATA_COLOR`].
    pub fn color(&self, v: f64) -> Rgb {
        if !v.is_finite() {
            return NO_DATA_COLOR;
        }
        let t = self.normalize(v);
        let segments = self.stops.len() - 1;
        let pos = t * segments as f64;
        let i = (pos.floor() as usize).min(segments - 1);
        self.stops[i].lerp(self.stops[i + 1], pos - i as f64)
    }
}

pub fn linear_color_scale(min: f64, max: f64) -> ContinuousColorScale {
    let (min, max) = if min <= max { (min, max) } else { (max, min) };
    ContinuousColorScale {
        kind: ColorScaleKind::Linear,
        min,
        max,
        stops: LINEAR_RAMP.to_vec(),
    }
}

/// ### Errors
/// [`ChartError::InvalidDomain`] unless `0 < min <= max` and both are finite.
pub fn log_color_scale(min: f64, max: f64) -> ChartResult<ContinuousColorScale> {
    if !(min > 0.0 && min.is_finite() && max.is_finite() && max >= min) {
        return Err(ChartError::InvalidDomain { min, max });
    }
    Ok(ContinuousColorScale {
        kind: ColorScaleKind::Log,
        min,
        max,
        stops: LOG_RAMP.to_vec(),
    })
}

/// Log scale when the domain allows one, otherwise a linear scale over the same bounds.
pub fn log_or_linear_color_scale(min: f64, max: f64) -> ContinuousColorScale {
    match log_color_scale(min, max) {
        Ok(s) => s,
        Err(e) => {
            log::debug!("{e}; falling back to a linear color scale");
            linear_color_scale(min, max)
        }
    }
}

/// Continuous position scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    d0: f64,
    d1: f64,
    r0: f64,
    r1: f64,
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self {
            d0: domain.0,
            d1: domain.1,
            r0: range.0,
            r1: range.1,
        }
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.d0, self.d1)
    }

    pub fn range(&self) -> (f64, f64) {
        (self.r0, self.r1)
    }

    pub fn map(&self, v: f64) -> f64 {
        let span = self.d1 - self.d0;
        if span == 0.0 {
            return (self.r0 + self.r1) / 2.0;
        }
        self.r0 + (v - self.d0) / span * (self.r1 - self.r0)
    }

    pub fn invert(&self, px: f64) -> f64 {
        let span = self.r1 - self.r0;
        if span == 0.0 {
            return self.d0;
        }
        self.d0 + (px - self.r0) / span * (self.d1 - self.d0)
    }

    /// Extend the domain outward to multiples of the tick step.
    pub fn nice(self, count: usize) -> Self {
        let step = tick_step(self.d0, self.d1, count);
        if step <= 0.0 || !step.is_finite() {
            return self;
        }
        Self {
            d0: (self.d0 / step).floor() * step,
            d1: (self.d1 / step).ceil() * step,
            ..self
        }
    }

    /// Roughly `count` round tick values (1-2-5 steps) inside the domain.
    pub fn ticks(&self, count: usize) -> Vec<f64> {
        let (lo, hi) = if self.d0 <= self.d1 {
            (self.d0, self.d1)
        } else {
            (self.d1, self.d0)
        };
        let step = tick_step(lo, hi, count);
        if step <= 0.0 || !step.is_finite() {
            return vec![lo];
        }
        let start = (lo / step).ceil() as i64;
        let stop = (hi / step).floor() as i64;
        (start..=stop).map(|i| i as f64 * step).collect()
    }
}

/// 1-2-5 step giving about `count` ticks over `[lo, hi]`.
pub fn tick_step(lo: f64, hi: f64, count: usize) -> f64 {
    let span = (hi - lo).abs();
    if span == 0.0 || count == 0 {
        return 0.0;
    }
    let raw = span / count as f64;
    let power = 10f64.powf(raw.log10().floor());
    let err = raw / power;
    let factor = if err >= 50f64.sqrt() {
        10.0
    } else if err >= 10f64.sqrt() {
        5.0
    } else if err >= 2f64.sqrt() {
        2.0
    } else {
        1.0
    };
    factor * power
}

/// Categorical bands across a pixel range.
#[derive(Debug, Clone, PartialEq)]
pub struct BandScale {
    keys: Vec<String>,
    r0: f64,
    r1: f64,
    padding_inner: f64,
    padding_outer: f64,
}

impl BandScale {
    /// Keys keep their given order.
    pub fn new(keys: Vec<String>, range: (f64, f64)) -> Self {
        Self {
            keys,
            r0: range.0,
            r1: range.1,
            padding_inner: 0.1,
            padding_outer: 0.1,
        }
    }

    pub fn padding(mut self, inner: f64, outer: f64) -> Self {
        self.padding_inner = inner.clamp(0.0, 1.0);
        self.padding_outer = outer.max(0.0);
        self
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    fn step(&self) -> f64 {
        let n = self.keys.len() as f64;
        (self.r1 - self.r0) / (n - self.padding_inner + 2.0 * self.padding_outer).max(1.0)
    }

    pub fn bandwidth(&self) -> f64 {
        self.step() * (1.0 - self.padding_inner)
    }

    /// Start of band `i`.
    pub fn band_start(&self, i: usize) -> f64 {
        let n = self.keys.len() as f64;
        let step = self.step();
        let used = step * (n - self.padding_inner);
        let start = self.r0 + ((self.r1 - self.r0) - used) / 2.0;
        start + step * i as f64
    }

    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.keys.iter().position(|k| k == key)
    }

    pub fn position(&self, key: &str) -> Option<f64> {
        self.index_of(key).map(|i| self.band_start(i))
    }

    pub fn center(&self, i: usize) -> f64 {
        self.band_start(i) + self.bandwidth() / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        assert_eq!(Rgb::from_hex("#1f77b4"), Some(CATEGORY10[0]));
        assert_eq!(CATEGORY10[0].hex(), "#1f77b4");
        assert_eq!(Rgb::from_hex("zz"), None);
    }

    #[test]
    fn palette_is_thirty_long_and_cycles() {
        assert_eq!(PALETTE_LEN, 30);
        assert_eq!(palette_color(10), SET2[0]);
        assert_eq!(palette_color(18), SET3[0]);
        assert_eq!(palette_color(30), CATEGORY10[0]);
    }

    #[test]
    fn ticks_use_round_steps() {
        let s = LinearScale::new((0.0, 97.0), (0.0, 100.0));
        assert_eq!(s.ticks(5), vec![0.0, 20.0, 40.0, 60.0, 80.0]);
        let n = s.nice(5);
        assert_eq!(n.domain(), (0.0, 100.0));
    }

    #[test]
    fn bands_fill_the_range() {
        let b = BandScale::new(vec!["a".into(), "b".into()], (0.0, 100.0)).padding(0.0, 0.0);
        assert_eq!(b.bandwidth(), 50.0);
        assert_eq!(b.position("b"), Some(50.0));
        assert_eq!(b.position("c"), None);
    }
}
