//! Text measurement for layout. No backend exposes font metrics up front, so
//! widths are estimated from the character count.

/// Average glyph advance as a fraction of the font size.
const ADVANCE: f64 = 0.60;

pub fn text_width(text: &str, font_px: f64) -> f64 {
    text.chars().count() as f64 * font_px * ADVANCE
}

/// Longest prefix that fits `max_px`, ending in an ellipsis when cut.
pub fn truncate(text: &str, font_px: f64, max_px: f64) -> String {
    if text_width(text, font_px) <= max_px {
        return text.to_string();
    }
    let fit = (max_px / (font_px * ADVANCE)).floor() as usize;
    if fit == 0 {
        return String::new();
    }
    let mut out: String = text.chars().take(fit.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// Greedy word wrap. Words longer than a line are broken by character.
pub fn wrap(text: &str, font_px: f64, max_px: f64) -> Vec<String> {
    let per_line = ((max_px / (font_px * ADVANCE)).floor() as usize).max(1);
    let mut lines = Vec::new();
    let mut cur = String::new();
    for word in text.split_whitespace() {
        let needed = if cur.is_empty() {
            word.chars().count()
        } else {
            cur.chars().count() + 1 + word.chars().count()
        };
        if needed <= per_line {
            if !cur.is_empty() {
                cur.push(' ');
            }
            cur.push_str(word);
            continue;
        }
        if !cur.is_empty() {
            lines.push(std::mem::take(&mut cur));
        }
        let chars: Vec<char> = word.chars().collect();
        let mut chunks = chars.chunks(per_line).peekable();
        while let Some(chunk) = chunks.next() {
            let s: String = chunk.iter().collect();
            if chunks.peek().is_some() {
                lines.push(s);
            } else {
                cur = s;
            }
        }
    }
    if !cur.is_empty() {
        lines.push(cur);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_adds_single_ellipsis() {
        let s = truncate("Aeroflot Russian Airlines", 10.0, 60.0);
        assert!(s.ends_with('…'));
        assert!(text_width(&s, 10.0) <= 60.0);
        assert_eq!(truncate("Short", 10.0, 60.0), "Short");
    }

    #[test]
    fn wrap_breaks_long_words() {
        let lines = wrap("a verylongwordindeed b", 10.0, 36.0);
        assert!(lines.iter().all(|l| l.chars().count() <= 6));
        assert_eq!(lines.first().map(String::as_str), Some("a"));
        assert_eq!(lines.last().map(String::as_str), Some("b"));
    }
}
