//! Upstream payload models.
//!
//! The accident API is inconsistently populated: numbers arrive as strings,
//! fields go missing, and counts carry free-text context such as
//! `"12 (passengers:10 crew:2)"`. Every field here deserializes leniently and
//! defaults instead of failing, so a single odd row never sinks a payload.

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

/// Composite categorical key for grouped observations, e.g. `("crew", "Heavy")`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey {
    pub category: String,
    pub subcategory: String,
}

impl GroupKey {
    pub fn new(category: impl Into<String>, subcategory: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            subcategory: subcategory.into(),
        }
    }

    /// `"crew-Heavy"`, the band label used on box plot axes.
    pub fn label(&self) -> String {
        if self.subcategory.is_empty() {
            self.category.clone()
        } else {
            format!("{}-{}", self.category, self.subcategory)
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Weight classes in ascending order; keys outside this list sort after it.
pub const WEIGHT_CLASSES: [&str; 4] = ["Small", "Medium", "Large", "Heavy"];

fn weight_rank(key: &str) -> Option<usize> {
    WEIGHT_CLASSES
        .iter()
        .position(|w| w.eq_ignore_ascii_case(key.trim()))
}

/// Display order for category keys: known weight classes first in size order,
/// then numeric keys numerically (`"2"` before `"10"`), then the rest alphabetically.
pub fn category_order(a: &str, b: &str) -> Ordering {
    match (weight_rank(a), weight_rank(b)) {
        (Some(x), Some(y)) => return x.cmp(&y),
        (Some(_), None) => return Ordering::Less,
        (None, Some(_)) => return Ordering::Greater,
        (None, None) => {}
    }
    match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// One raw accident record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccidentRow {
    #[serde(rename = "Year", default, deserialize_with = "de_opt_i32_lenient")]
    pub year: Option<i32>,
    #[serde(rename = "Date", default, deserialize_with = "de_opt_text")]
    pub date: Option<String>,
    /// `HHMM`, or `"?"` when unknown.
    #[serde(rename = "Time", default, deserialize_with = "de_opt_text")]
    pub time: Option<String>,
    #[serde(rename = "Location", default, deserialize_with = "de_opt_text")]
    pub location: Option<String>,
    #[serde(rename = "Operator", default, deserialize_with = "de_opt_text")]
    pub operator: Option<String>,
    #[serde(rename = "Operator Country", default, deserialize_with = "de_opt_text")]
    pub operator_country: Option<String>,
    #[serde(rename = "AC Type", default, deserialize_with = "de_opt_text")]
    pub ac_type: Option<String>,
    #[serde(rename = "Manufacturer", default, deserialize_with = "de_opt_text")]
    pub manufacturer: Option<String>,
    /// `"<n> (<context>)"`
    #[serde(rename = "Fatalities", default, deserialize_with = "de_opt_text")]
    pub fatalities: Option<String>,
    /// `"<n> (<context>)"`
    #[serde(rename = "Aboard", default, deserialize_with = "de_opt_text")]
    pub aboard: Option<String>,
}

impl AccidentRow {
    pub fn fatalities_count(&self) -> u32 {
        parse_count_prefix(self.fatalities.as_deref())
    }

    pub fn aboard_count(&self) -> u32 {
        parse_count_prefix(self.aboard.as_deref())
    }

    /// `(passengers, crew)` from the aboard context, when both are present.
    pub fn aboard_breakdown(&self) -> Option<(u32, u32)> {
        parse_people_breakdown(self.aboard.as_deref()?)
    }

    pub fn parsed_date(&self) -> Option<NaiveDate> {
        self.date.as_deref().and_then(parse_accident_date)
    }

    /// The `Year` field, or the year of `Date` when `Year` is missing.
    pub fn effective_year(&self) -> Option<i32> {
        use chrono::Datelike;
        self.year
            .filter(|y| *y != 0)
            .or_else(|| self.parsed_date().map(|d| d.year()))
    }

    /// Hour of day from a numeric `HHMM` time.
    pub fn hour(&self) -> Option<u32> {
        let t = self.time.as_deref()?.trim();
        if t.is_empty() || !t.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let n: u32 = t.parse().ok()?;
        if n > 2359 {
            return None;
        }
        let hour = n / 100;
        (hour < 24).then_some(hour)
    }
}

/// Numeric prefix of a `"<n> (<context>)"` field; missing or unparsable yields 0.
pub fn parse_count_prefix(field: Option<&str>) -> u32 {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(s) = field else { return 0 };
    let head = s.split('(').next().unwrap_or("");
    let re = RE.get_or_init(|| Regex::new(r"^\s*(\d+)").ok());
    re.as_ref()
        .and_then(|re| re.captures(head))
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .unwrap_or(0)
}

/// `"12 (passengers:10 crew:2)"` -> `Some((10, 2))`.
pub fn parse_people_breakdown(field: &str) -> Option<(u32, u32)> {
    static RE: OnceLock<Option<(Regex, Regex)>> = OnceLock::new();
    let pair = RE.get_or_init(|| {
        let p = Regex::new(r"passengers:\s*(\d+)").ok()?;
        let c = Regex::new(r"crew:\s*(\d+)").ok()?;
        Some((p, c))
    });
    let (p_re, c_re) = pair.as_ref()?;
    let grab = |re: &Regex| -> Option<u32> { re.captures(field)?.get(1)?.as_str().parse().ok() };
    Some((grab(p_re)?, grab(c_re)?))
}

/// Dataset dates look like `"September 17, 1908"`; ISO and US forms are accepted too.
pub fn parse_accident_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    ["%B %d, %Y", "%Y-%m-%d", "%m/%d/%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Row of the per-country endpoint: `{"Operator Country": "...", "Count": n}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CountryCount {
    #[serde(rename = "Operator Country", default, deserialize_with = "de_text_or_empty")]
    pub country: String,
    #[serde(rename = "Count", default, deserialize_with = "de_f64_lenient")]
    pub count: f64,
}

/// Histogram row of the wingspan endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BinRow {
    #[serde(default = "nan", deserialize_with = "de_f64_lenient")]
    pub bin_start: f64,
    #[serde(default = "nan", deserialize_with = "de_f64_lenient")]
    pub bin_end: f64,
    #[serde(default, deserialize_with = "de_f64_lenient")]
    pub accident_count: f64,
}

/// Accident counts per manufacturer for one year (or year group).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManufacturerYearRow {
    pub year: i32,
    pub counts: BTreeMap<String, f64>,
}

/// Parse `[{year, <manufacturer>: count, ...}, ...]`. Rows without a usable
/// year are dropped; non-numeric counts are skipped.
pub fn parse_manufacturer_rows(v: &Value) -> Vec<ManufacturerYearRow> {
    let Some(arr) = v.as_array() else {
        return Vec::new();
    };
    let mut out = Vec::with_capacity(arr.len());
    for row in arr {
        let Some(obj) = row.as_object() else { continue };
        let Some(year) = obj.get("year").and_then(value_as_f64) else {
            log::debug!("skipping manufacturer row without year: {row}");
            continue;
        };
        let counts = obj
            .iter()
            .filter(|(k, _)| k.as_str() != "year")
            .filter_map(|(k, v)| value_as_f64(v).map(|n| (k.clone(), n)))
            .collect();
        out.push(ManufacturerYearRow {
            year: year as i32,
            counts,
        });
    }
    out.sort_by_key(|r| r.year);
    out
}

/// Parse an object of counts (`{"2": 140, "4": 31}`) in display order.
pub fn parse_category_counts(v: &Value) -> Vec<(String, f64)> {
    let Some(obj) = v.as_object() else {
        return Vec::new();
    };
    let mut out: Vec<(String, f64)> = obj
        .iter()
        .filter_map(|(k, v)| value_as_f64(v).map(|n| (k.clone(), n)))
        .collect();
    out.sort_by(|a, b| category_order(&a.0, &b.0));
    out
}

/// Parse `{category: {subcategory: [values]}}`. Non-numeric entries become NaN
/// so that the summarizer counts them as excluded.
pub fn parse_aboard_distribution(v: &Value) -> BTreeMap<GroupKey, Vec<f64>> {
    let mut out = BTreeMap::new();
    let Some(obj) = v.as_object() else {
        return out;
    };
    for (category, inner) in obj {
        let Some(inner) = inner.as_object() else { continue };
        for (sub, values) in inner {
            let Some(values) = values.as_array() else { continue };
            let vals: Vec<f64> = values
                .iter()
                .map(|x| value_as_f64(x).unwrap_or(f64::NAN))
                .collect();
            out.insert(GroupKey::new(category.clone(), sub.clone()), vals);
        }
    }
    out
}

/// One point of the clustering output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterPoint {
    #[serde(default = "nan", deserialize_with = "de_f64_lenient")]
    pub x: f64,
    #[serde(default = "nan", deserialize_with = "de_f64_lenient")]
    pub y: f64,
    #[serde(default, deserialize_with = "de_u32_lenient")]
    pub kmeans_cluster: u32,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub kmeans_interpretation: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub operator_country: Option<String>,
    #[serde(rename = "Year", default, deserialize_with = "de_opt_i32_lenient")]
    pub year: Option<i32>,
    #[serde(rename = "Date", default, deserialize_with = "de_opt_text")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "de_opt_f64_lenient")]
    pub fatalities: Option<f64>,
}

impl Default for ClusterPoint {
    fn default() -> Self {
        Self {
            x: f64::NAN,
            y: f64::NAN,
            kmeans_cluster: 0,
            kmeans_interpretation: None,
            operator_country: None,
            year: None,
            date: None,
            summary: None,
            fatalities: None,
        }
    }
}

impl ClusterPoint {
    /// Cluster label: the interpretation when present, else `"Cluster <id>"`.
    pub fn cluster_label(&self) -> String {
        match self.kmeans_interpretation.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => format!("Cluster {}", self.kmeans_cluster),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterInfo {
    #[serde(default, deserialize_with = "de_u32_lenient")]
    pub id: u32,
    #[serde(default, deserialize_with = "de_text_or_empty")]
    pub interpretation: String,
    #[serde(default, deserialize_with = "de_u32_lenient")]
    pub size: u32,
    #[serde(default)]
    pub terms: Vec<Value>,
    #[serde(default)]
    pub samples: Vec<Value>,
}

impl ClusterInfo {
    /// Top terms as plain strings (terms arrive as strings or `[term, weight]` pairs).
    pub fn term_labels(&self) -> Vec<String> {
        self.terms
            .iter()
            .filter_map(|t| match t {
                Value::String(s) => Some(s.clone()),
                Value::Array(a) => a.first().and_then(|v| v.as_str()).map(str::to_string),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KMeans {
    #[serde(default)]
    pub clusters: Vec<ClusterInfo>,
    /// interpretation -> point count
    #[serde(default, deserialize_with = "de_count_map")]
    pub distribution: BTreeMap<String, f64>,
}

/// Payload of the clustering endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterData {
    #[serde(default)]
    pub points: Vec<ClusterPoint>,
    #[serde(default)]
    pub kmeans: KMeans,
}

fn nan() -> f64 {
    f64::NAN
}

/// Numbers, numeric strings and booleans as `f64`.
pub fn value_as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Serde visitor accepting numbers, numeric strings, empty strings and null.
struct LenientF64;

impl<'de> serde::de::Visitor<'de> for LenientF64 {
    type Value = Option<f64>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "a number, a numeric string, or null")
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(Some(v as f64))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(Some(v as f64))
    }

    fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(Some(v))
    }

    fn visit_bool<E>(self, _v: bool) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(None)
    }

    fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        // "12 (passengers:10 crew:2)" style strings keep their numeric prefix.
        let t = s.trim();
        if t.is_empty() {
            return Ok(None);
        }
        Ok(t.parse::<f64>().ok().or_else(|| {
            let n = parse_count_prefix(Some(t));
            t.starts_with(|c: char| c.is_ascii_digit())
                .then_some(n as f64)
        }))
    }

    fn visit_none<E>(self) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(None)
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(None)
    }

    fn visit_some<D>(self, d: D) -> Result<Self::Value, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        d.deserialize_any(LenientF64)
    }
}

fn de_opt_f64_lenient<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    deserializer.deserialize_any(LenientF64)
}

fn de_f64_lenient<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(deserializer.deserialize_any(LenientF64)?.unwrap_or(f64::NAN))
}

fn de_opt_i32_lenient<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(deserializer
        .deserialize_any(LenientF64)?
        .filter(|v| v.is_finite())
        .map(|v| v as i32))
}

/// Serde helper: parse `u32` from a number or a string; anything else becomes 0.
fn de_u32_lenient<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(deserializer
        .deserialize_any(LenientF64)?
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v as u32)
        .unwrap_or(0))
}

/// Serde visitor turning any scalar into text; null and blank become `None`.
struct LenientText;

impl<'de> serde::de::Visitor<'de> for LenientText {
    type Value = Option<String>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "a string, a number, or null")
    }

    fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        let t = s.trim();
        Ok((!t.is_empty()).then(|| t.to_string()))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(Some(v.to_string()))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(Some(v.to_string()))
    }

    fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        if v.is_finite() {
            Ok(Some(v.to_string()))
        } else {
            Ok(None)
        }
    }

    fn visit_bool<E>(self, v: bool) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(Some(v.to_string()))
    }

    fn visit_none<E>(self) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(None)
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(None)
    }

    fn visit_some<D>(self, d: D) -> Result<Self::Value, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        d.deserialize_any(LenientText)
    }
}

fn de_opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    deserializer.deserialize_any(LenientText)
}

fn de_text_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(deserializer.deserialize_any(LenientText)?.unwrap_or_default())
}

fn de_count_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;
    Ok(v.as_object()
        .map(|obj| {
            obj.iter()
                .filter_map(|(k, v)| value_as_f64(v).map(|n| (k.clone(), n)))
                .collect()
        })
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_prefix_handles_context_and_junk() {
        assert_eq!(parse_count_prefix(Some("12 (passengers:10 crew:2)")), 12);
        assert_eq!(parse_count_prefix(Some(" 7")), 7);
        assert_eq!(parse_count_prefix(Some("?")), 0);
        assert_eq!(parse_count_prefix(Some("")), 0);
        assert_eq!(parse_count_prefix(None), 0);
    }

    #[test]
    fn people_breakdown() {
        assert_eq!(
            parse_people_breakdown("12 (passengers:10 crew:2)"),
            Some((10, 2))
        );
        assert_eq!(parse_people_breakdown("12"), None);
    }

    #[test]
    fn category_order_prefers_weight_then_numbers() {
        let mut keys = vec!["Heavy", "Small", "Large", "Medium"];
        keys.sort_by(|a, b| category_order(a, b));
        assert_eq!(keys, ["Small", "Medium", "Large", "Heavy"]);

        let mut keys = vec!["10", "2", "1", "unknown"];
        keys.sort_by(|a, b| category_order(a, b));
        assert_eq!(keys, ["1", "2", "10", "unknown"]);
    }
}
