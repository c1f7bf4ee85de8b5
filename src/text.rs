use crate::error::ReportError;
use crate::types::Pt;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub font_name: Arc<str>,
    pub font_size: Pt,
}

impl TextStyle {
    pub fn new(font_name: &str, font_size: f32) -> Self {
        Self {
            font_name: Arc::<str>::from(font_name),
            font_size: Pt::from_f32(font_size),
        }
    }

    pub fn helvetica(font_size: f32) -> Self {
        Self::new("Helvetica", font_size)
    }

    pub fn helvetica_bold(font_size: f32) -> Self {
        Self::new("Helvetica-Bold", font_size)
    }
}

impl Default for TextStyle {
    fn default() -> Self {
        Self::helvetica(12.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextOptions {
    pub style: TextStyle,
    /// Wrap width. `None` draws a single unwrapped run per source line.
    pub width: Option<Pt>,
}

impl TextOptions {
    pub fn new(style: TextStyle) -> Self {
        Self {
            style,
            width: None,
        }
    }

    pub fn with_width(mut self, width: Pt) -> Self {
        self.width = Some(width);
        self
    }
}

/// Greedy word wrap. Explicit newlines always break; words wider than the
/// line are split between characters. Empty input yields no lines.
pub(crate) fn wrap_lines<F>(
    text: &str,
    max_width: Pt,
    mut measure: F,
) -> Result<Vec<String>, ReportError>
where
    F: FnMut(&str) -> Result<Pt, ReportError>,
{
    if text.is_empty() {
        return Ok(Vec::new());
    }
    let max_width = max_width.max(Pt::from_f32(1.0));
    let space_width = measure(" ")?;
    let mut word_widths: HashMap<&str, Pt> = HashMap::new();
    let mut lines = Vec::new();

    for segment in text.split('\n') {
        if segment.trim().is_empty() {
            lines.push(String::new());
            continue;
        }
        let mut current = String::new();
        let mut current_width = Pt::ZERO;
        for word in segment.split_whitespace() {
            let word_width = match word_widths.get(word) {
                Some(value) => *value,
                None => {
                    let value = measure(word)?;
                    word_widths.insert(word, value);
                    value
                }
            };
            if !current.is_empty() {
                let next_width = current_width + space_width + word_width;
                if next_width <= max_width {
                    current.push(' ');
                    current.push_str(word);
                    current_width = next_width;
                    continue;
                }
                lines.push(std::mem::take(&mut current));
                current_width = Pt::ZERO;
            }
            if word_width > max_width {
                let mut parts = split_long_word(word, max_width, &mut measure)?;
                if let Some(last) = parts.pop() {
                    lines.extend(parts);
                    current_width = measure(&last)?;
                    current = last;
                }
            } else {
                current.push_str(word);
                current_width = word_width;
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }
    Ok(lines)
}

fn split_long_word<F>(word: &str, max_width: Pt, measure: &mut F) -> Result<Vec<String>, ReportError>
where
    F: FnMut(&str) -> Result<Pt, ReportError>,
{
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut current_width = Pt::ZERO;
    let mut char_widths: HashMap<char, Pt> = HashMap::new();
    for ch in word.chars() {
        let w = match char_widths.get(&ch) {
            Some(value) => *value,
            None => {
                let mut buf = [0u8; 4];
                let value = measure(ch.encode_utf8(&mut buf))?;
                char_widths.insert(ch, value);
                value
            }
        };
        let mut next_width = current_width + w;
        if !current.is_empty() && next_width > max_width {
            parts.push(std::mem::take(&mut current));
            next_width = w;
        }
        current.push(ch);
        current_width = next_width;
    }
    if !current.is_empty() {
        parts.push(current);
    }
    Ok(parts)
}
