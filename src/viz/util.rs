//! Number formatting for axes, labels and tooltips.

use num_format::{Locale, ToFormattedString};

/// Map a user-provided locale tag to a `num_format::Locale` and its decimal separator.
///
/// Supported tags (case-insensitive): `en`, `us`, `en_US`, `de`, `de_DE`, `german`,
/// `fr`, `es`, `it`, `pt`, `nl`. Anything else is English.
pub fn map_locale(tag: &str) -> (&'static Locale, char) {
    match tag.to_lowercase().as_str() {
        "de" | "de_de" | "german" => (&Locale::de, ','),
        "fr" | "fr_fr" => (&Locale::fr, ','),
        "es" | "es_es" => (&Locale::es, ','),
        "it" | "it_it" => (&Locale::it, ','),
        "pt" | "pt_pt" | "pt_br" => (&Locale::pt, ','),
        "nl" | "nl_nl" => (&Locale::nl, ','),
        _ => (&Locale::en, '.'),
    }
}

/// Locale-aware number formatter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumberFormat {
    locale: &'static Locale,
    decimal: char,
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self::for_tag("en")
    }
}

impl NumberFormat {
    pub fn for_tag(tag: &str) -> Self {
        let (locale, decimal) = map_locale(tag);
        Self { locale, decimal }
    }

    /// Integer with grouping separators, e.g. `12,345`.
    pub fn count(&self, v: f64) -> String {
        if !v.is_finite() {
            return "–".to_string();
        }
        let n = v.round() as i64;
        let s = n.unsigned_abs().to_formatted_string(self.locale);
        if n < 0 { format!("-{s}") } else { s }
    }

    /// Grouped integer part with `prec` decimals.
    pub fn decimal(&self, v: f64, prec: usize) -> String {
        if !v.is_finite() {
            return "–".to_string();
        }
        if prec == 0 {
            return self.count(v);
        }
        let raw = format!("{:.*}", prec, v.abs());
        let (int, frac) = raw.split_once('.').unwrap_or((raw.as_str(), ""));
        let int = int
            .parse::<u64>()
            .map(|i| i.to_formatted_string(self.locale))
            .unwrap_or_else(|_| int.to_string());
        let sign = if v < 0.0 && raw.chars().any(|c| c.is_ascii_digit() && c != '0') {
            "-"
        } else {
            ""
        };
        format!("{sign}{int}{}{frac}", self.decimal)
    }

    /// Tick label: integers grouped, fractions with just enough precision for `step`.
    pub fn tick(&self, v: f64, step: f64) -> String {
        let prec = if step >= 1.0 || step <= 0.0 || !step.is_finite() {
            0
        } else {
            (-step.log10() - 1e-9).ceil().max(0.0) as usize
        };
        if prec == 0 {
            self.count(v)
        } else {
            self.decimal(v, prec)
        }
    }

    /// `12.3%`
    pub fn percent(&self, pct: f64) -> String {
        format!("{}%", self.decimal(pct, 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grouped_counts_follow_locale() {
        assert_eq!(NumberFormat::for_tag("en").count(12345.0), "12,345");
        assert_eq!(NumberFormat::for_tag("de").count(12345.0), "12.345");
        assert_eq!(NumberFormat::for_tag("en").count(-7.0), "-7");
    }

    #[test]
    fn decimals_use_locale_separator() {
        assert_eq!(NumberFormat::for_tag("de").decimal(1234.5, 1), "1.234,5");
        assert_eq!(NumberFormat::default().percent(12.34), "12.3%");
        assert_eq!(NumberFormat::default().tick(0.5, 0.1), "0.5");
        assert_eq!(NumberFormat::default().tick(2000.0, 500.0), "2,000");
    }
}
