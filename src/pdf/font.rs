//! Standard-14 Helvetica metrics and text encoding for generated content.
//!
//! Generated pages (TOC, stamps, image wrappers) use the built-in Helvetica
//! faces so nothing has to be embedded. Those faces only cover
//! WinAnsiEncoding, so every string is transliterated to ASCII before it is
//! measured or written.

use deunicode::deunicode;
use lopdf::{Dictionary, Object};

/// A built-in font face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Helvetica,
    HelveticaBold,
}

impl Font {
    pub fn base_font(self) -> &'static str {
        match self {
            Font::Helvetica => "Helvetica",
            Font::HelveticaBold => "Helvetica-Bold",
        }
    }

    /// Type1 font dictionary suitable for a page's `/Font` resources.
    pub fn dictionary(self) -> Dictionary {
        Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type1".to_vec())),
            ("BaseFont", Object::Name(self.base_font().as_bytes().to_vec())),
            ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
        ])
    }

    fn widths(self) -> &'static [u16; 95] {
        match self {
            Font::Helvetica => &HELVETICA_WIDTHS,
            Font::HelveticaBold => &HELVETICA_BOLD_WIDTHS,
        }
    }

    /// Advance width of one glyph in 1/1000 em. Non-printable bytes measure
    /// as a space.
    fn glyph_width(self, byte: u8) -> u16 {
        match byte {
            32..=126 => self.widths()[(byte - 32) as usize],
            _ => self.widths()[0],
        }
    }

    /// Width of `text` in points at `size`, after sanitising.
    pub fn text_width(self, text: &str, size: f32) -> f32 {
        let units: u32 = sanitize(text)
            .bytes()
            .map(|b| u32::from(self.glyph_width(b)))
            .sum();
        units as f32 * size / 1000.0
    }
}

// AFM advance widths for ASCII 32..=126 (space through tilde).
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,                               // 0..9
    278, 278, 584, 584, 584, 556, 1015,                                             // :..@
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833,                // A..M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,                // N..Z
    278, 278, 278, 469, 556, 333,                                                   // [..`
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833,                // a..m
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500,                // n..z
    334, 260, 334, 584,                                                             // {..~
];

#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    333, 333, 584, 584, 584, 611, 975,
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    333, 278, 333, 584, 556, 333,
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
    389, 280, 389, 584,
];

/// Transliterate to printable ASCII. Control characters become spaces.
pub fn sanitize(text: &str) -> String {
    deunicode(text)
        .chars()
        .map(|c| if (' '..='~').contains(&c) { c } else { ' ' })
        .collect()
}

/// Escape a sanitised string for use inside a PDF literal `( … )`.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' | '(' | ')' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

/// Sanitised, escaped PDF string literal including the parentheses.
pub fn literal(text: &str) -> String {
    format!("({})", escape(&sanitize(text)))
}

/// Keep at most `max` characters, appending `...` when anything was cut.
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let head: String = text.chars().take(max).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

/// Shorten `text` with a trailing `...` until it fits `max_width` points.
pub fn fit_width(font: Font, text: &str, size: f32, max_width: f32) -> String {
    let clean = sanitize(text);
    if font.text_width(&clean, size) <= max_width {
        return clean;
    }
    let mut chars: Vec<char> = clean.chars().collect();
    while !chars.is_empty() {
        chars.pop();
        let candidate: String = chars.iter().collect::<String>() + "...";
        if font.text_width(&candidate, size) <= max_width {
            return candidate;
        }
    }
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_glyph_widths() {
        assert_eq!(Font::Helvetica.glyph_width(b' '), 278);
        assert_eq!(Font::Helvetica.glyph_width(b'A'), 667);
        assert_eq!(Font::Helvetica.glyph_width(b'i'), 222);
        assert_eq!(Font::Helvetica.glyph_width(b'~'), 584);
        assert_eq!(Font::HelveticaBold.glyph_width(b'A'), 722);
        assert_eq!(Font::HelveticaBold.glyph_width(b'm'), 889);
    }

    #[test]
    fn text_width_scales_with_size() {
        let w10 = Font::Helvetica.text_width("Exhibit", 10.0);
        let w20 = Font::Helvetica.text_width("Exhibit", 20.0);
        assert!((w20 - 2.0 * w10).abs() < 1e-3);
        assert!((Font::Helvetica.text_width("AA", 10.0) - 13.34).abs() < 1e-3);
    }

    #[test]
    fn sanitize_transliterates_unicode() {
        assert_eq!(sanitize("Café Résumé"), "Cafe Resume");
        assert_eq!(sanitize("tab\there"), "tab here");
    }

    #[test]
    fn escape_parentheses_and_backslash() {
        assert_eq!(escape(r"a(b)c\d"), r"a\(b\)c\\d");
        assert_eq!(literal("x (y)"), r"(x \(y\))");
    }

    #[test]
    fn truncate_appends_ellipsis_only_when_cut() {
        assert_eq!(truncate_chars("short", 60), "short");
        let long = "x".repeat(61);
        let cut = truncate_chars(&long, 60);
        assert_eq!(cut.len(), 63);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn fit_width_respects_limit() {
        let text = "A very long exhibit title that cannot possibly fit";
        let fitted = fit_width(Font::Helvetica, text, 10.0, 100.0);
        assert!(fitted.ends_with("..."));
        assert!(Font::Helvetica.text_width(&fitted, 10.0) <= 100.0);
        assert_eq!(fit_width(Font::Helvetica, "ok", 10.0, 100.0), "ok");
    }
}
