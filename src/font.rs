use crate::types::Pt;
use std::collections::HashMap;

// AFM advance widths for printable ASCII (0x20..=0x7E), in 1/1000 em.
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    278, 278, 584, 584, 584, 556, 1015,
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    278, 278, 278, 469, 556, 333,
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833,
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500,
    334, 260, 334, 584,
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

#[derive(Debug)]
pub(crate) struct FontMetrics {
    pub(crate) base_font: &'static str,
    widths: &'static [u16; 95],
    pub(crate) ascent: i16,
    pub(crate) descent: i16,
    pub(crate) line_gap: i16,
    missing_width: u16,
}

static HELVETICA: FontMetrics = FontMetrics {
    base_font: "Helvetica",
    widths: &HELVETICA_WIDTHS,
    ascent: 718,
    descent: -207,
    line_gap: 231,
    missing_width: 556,
};

static HELVETICA_BOLD: FontMetrics = FontMetrics {
    base_font: "Helvetica-Bold",
    widths: &HELVETICA_BOLD_WIDTHS,
    ascent: 718,
    descent: -207,
    line_gap: 265,
    missing_width: 611,
};

impl FontMetrics {
    fn advance_for_char(&self, ch: char) -> u16 {
        let ch = fold_latin1(ch);
        match ch {
            ' '..='~' => self.widths[(ch as usize) - 0x20],
            '\u{00A0}' => self.widths[0],
            '\u{2013}' => 556,
            '\u{2014}' | '\u{2026}' => 1000,
            _ => self.missing_width,
        }
    }

    fn text_units(&self, text: &str) -> i64 {
        text.chars()
            .map(|ch| self.advance_for_char(ch) as i64)
            .sum()
    }

    fn line_height_units(&self) -> i64 {
        (self.ascent as i64) - (self.descent as i64) + (self.line_gap as i64)
    }
}

/// Accented Latin-1 letters measure like their base letter.
fn fold_latin1(ch: char) -> char {
    match ch {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' => 'a',
        'Á' | 'À' | 'Â' | 'Ä' | 'Ã' | 'Å' => 'A',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'É' | 'È' | 'Ê' | 'Ë' => 'E',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' => 'o',
        'Ó' | 'Ò' | 'Ô' | 'Ö' | 'Õ' => 'O',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
        'ñ' => 'n',
        'Ñ' => 'N',
        'ç' => 'c',
        'Ç' => 'C',
        other => other,
    }
}

/// Metrics for the standard PDF faces the report prints with.
#[derive(Debug)]
pub struct FontRegistry {
    fonts: Vec<&'static FontMetrics>,
    lookup: HashMap<String, usize>,
}

impl FontRegistry {
    pub fn base14() -> Self {
        let mut registry = Self {
            fonts: Vec::new(),
            lookup: HashMap::new(),
        };
        registry.register(&HELVETICA, &["Helvetica", "Arial"]);
        registry.register(&HELVETICA_BOLD, &["Helvetica-Bold", "Arial-Bold"]);
        registry
    }

    fn register(&mut self, metrics: &'static FontMetrics, aliases: &[&str]) {
        let index = self.fonts.len();
        self.fonts.push(metrics);
        for alias in aliases {
            let key = normalize_name(alias);
            if key.is_empty() || self.lookup.contains_key(&key) {
                continue;
            }
            self.lookup.insert(key, index);
        }
    }

    pub(crate) fn resolve(&self, name: &str) -> Option<&'static FontMetrics> {
        let key = normalize_name(name);
        self.lookup
            .get(&key)
            .and_then(|index| self.fonts.get(*index))
            .copied()
    }

    pub fn supports(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    pub fn measure_text_width(&self, name: &str, font_size: Pt, text: &str) -> Option<Pt> {
        let font = self.resolve(name)?;
        Some(font_size.mul_ratio(font.text_units(text), 1000))
    }

    pub fn line_height(&self, name: &str, font_size: Pt) -> Option<Pt> {
        let font = self.resolve(name)?;
        Some(font_size.mul_ratio(font.line_height_units(), 1000))
    }

    pub fn ascent(&self, name: &str, font_size: Pt) -> Option<Pt> {
        let font = self.resolve(name)?;
        Some(font_size.mul_ratio(font.ascent as i64, 1000))
    }
}

impl Default for FontRegistry {
    fn default() -> Self {
        Self::base14()
    }
}

fn normalize_name(name: &str) -> String {
    name.trim()
        .trim_matches('"')
        .trim_matches('\'')
        .to_ascii_lowercase()
}
