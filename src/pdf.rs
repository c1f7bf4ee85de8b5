use crate::canvas::{Command, Document, Page};
use crate::font::FontRegistry;
use crate::types::{Color, Pt};
use fixed::types::I32F32;
use std::collections::BTreeMap;
use std::io;

const PDF_CATALOG_ID: usize = 1;
const PDF_PAGES_ID: usize = 2;
const PDF_RESOURCES_ID: usize = 3;
const FIRST_FONT_ID: usize = 4;

#[derive(Debug, Clone, Default)]
pub struct PdfOptions {
    pub title: Option<String>,
}

impl PdfOptions {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
        }
    }
}

/// Serializes a recorded document to PDF 1.7 bytes.
///
/// Pages keep the canvas' top-left origin: each content stream starts by
/// flipping the y axis, and text is placed with a mirrored text matrix so
/// glyphs stay upright.
pub fn document_to_pdf(document: &Document, options: &PdfOptions) -> io::Result<Vec<u8>> {
    let registry = FontRegistry::base14();
    let fonts = collect_fonts(document, &registry)?;
    let font_ids: Vec<(String, usize)> = fonts
        .values()
        .enumerate()
        .map(|(index, resource)| (resource.clone(), FIRST_FONT_ID + index))
        .collect();

    let first_page_id = FIRST_FONT_ID + fonts.len();
    let page_ids: Vec<usize> = (0..document.pages.len())
        .map(|index| first_page_id + index * 2)
        .collect();
    let info_id = first_page_id + document.pages.len() * 2;

    let mut objects: Vec<String> = Vec::with_capacity(info_id);
    objects.push(format!(
        "<< /Type /Catalog /Pages {} 0 R >>",
        PDF_PAGES_ID
    ));
    let kids: Vec<String> = page_ids.iter().map(|id| format!("{} 0 R", id)).collect();
    objects.push(format!(
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        kids.join(" "),
        page_ids.len()
    ));
    objects.push(format!("<< /Font {} >>", font_resources(&font_ids)));
    for base_font in fonts.keys() {
        objects.push(font_object(base_font));
    }
    for (page, page_id) in document.pages.iter().zip(&page_ids) {
        let size = page.size();
        objects.push(format!(
            "<< /Type /Page /Parent {} 0 R /MediaBox [0 0 {} {}] /Resources {} 0 R /Contents {} 0 R >>",
            PDF_PAGES_ID,
            fmt_pt(size.width),
            fmt_pt(size.height),
            PDF_RESOURCES_ID,
            page_id + 1
        ));
        let content = render_page(page, &fonts, &registry)?;
        objects.push(stream_object(&content));
    }
    objects.push(info_object(options.title.as_deref()));

    Ok(build_pdf(objects, PDF_CATALOG_ID, Some(info_id)))
}

/// Base font name -> resource name for every face the document may select.
fn collect_fonts(
    document: &Document,
    registry: &FontRegistry,
) -> io::Result<BTreeMap<&'static str, String>> {
    let mut base_fonts: Vec<&'static str> = Vec::new();
    let commands = document.pages.iter().flat_map(|page| page.commands.iter());
    for command in commands {
        let base = match command {
            Command::SetFontName(name) => resolve_base_font(registry, name)?,
            // Text drawn before any font selection uses the initial face.
            Command::DrawString { .. } => resolve_base_font(registry, "Helvetica")?,
            _ => continue,
        };
        if !base_fonts.contains(&base) {
            base_fonts.push(base);
        }
    }
    base_fonts.sort_unstable();
    Ok(base_fonts
        .into_iter()
        .enumerate()
        .map(|(index, base)| (base, format!("F{}", index + 1)))
        .collect())
}

fn resolve_base_font(registry: &FontRegistry, name: &str) -> io::Result<&'static str> {
    registry
        .resolve(name)
        .map(|font| font.base_font)
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("font {name:?} is not a standard PDF font"),
            )
        })
}

#[derive(Clone)]
struct TextState {
    font_name: String,
    font_size: Pt,
}

fn render_page(
    page: &Page,
    fonts: &BTreeMap<&'static str, String>,
    registry: &FontRegistry,
) -> io::Result<String> {
    let mut out = String::new();
    out.push_str(&format!(
        "1 0 0 -1 0 {} cm\n",
        fmt_pt(page.size().height)
    ));
    let mut state = TextState {
        font_name: "Helvetica".to_string(),
        font_size: Pt::from_f32(12.0),
    };
    let mut saved: Vec<TextState> = Vec::new();

    for command in &page.commands {
        match command {
            Command::SaveState => {
                saved.push(state.clone());
                out.push_str("q\n");
            }
            Command::RestoreState => {
                if let Some(previous) = saved.pop() {
                    state = previous;
                }
                out.push_str("Q\n");
            }
            Command::Translate(x, y) => {
                out.push_str(&format!("1 0 0 1 {} {} cm\n", fmt_pt(*x), fmt_pt(*y)));
            }
            Command::Rotate(angle) => {
                let sin = libm::sinf(*angle);
                let cos = libm::cosf(*angle);
                out.push_str(&format!(
                    "{} {} {} {} 0 0 cm\n",
                    fmt(cos),
                    fmt(sin),
                    fmt(-sin),
                    fmt(cos)
                ));
            }
            Command::SetFillColor(color) => out.push_str(&color_to_pdf_fill(*color)),
            Command::SetFontName(name) => state.font_name = name.clone(),
            Command::SetFontSize(size) => state.font_size = *size,
            Command::FillRect {
                x,
                y,
                width,
                height,
            } => {
                out.push_str(&format!(
                    "{} {} {} {} re f\n",
                    fmt_pt(*x),
                    fmt_pt(*y),
                    fmt_pt(*width),
                    fmt_pt(*height)
                ));
            }
            Command::StrokeRect {
                x,
                y,
                width,
                height,
            } => {
                out.push_str(&format!(
                    "{} {} {} {} re S\n",
                    fmt_pt(*x),
                    fmt_pt(*y),
                    fmt_pt(*width),
                    fmt_pt(*height)
                ));
            }
            Command::DrawString { x, y, text } => {
                let base = resolve_base_font(registry, &state.font_name)?;
                let resource = fonts.get(base).map(String::as_str).unwrap_or("F1");
                out.push_str("BT\n");
                out.push_str(&format!("/{} {} Tf\n", resource, fmt_pt(state.font_size)));
                out.push_str(&format!("1 0 0 -1 {} {} Tm\n", fmt_pt(*x), fmt_pt(*y)));
                out.push_str(&format!("({}) Tj\n", encode_winansi_pdf_string(text)));
                out.push_str("ET\n");
            }
        }
    }
    Ok(out)
}

fn font_object(base_font: &str) -> String {
    format!(
        "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
        base_font
    )
}

fn font_resources(fonts: &[(String, usize)]) -> String {
    let entries: Vec<String> = fonts
        .iter()
        .map(|(resource, font_id)| format!("/{} {} 0 R", resource, font_id))
        .collect();
    format!("<< {} >>", entries.join(" "))
}

fn stream_object(content: &str) -> String {
    format!(
        "<< /Length {} >>\nstream\n{}\nendstream",
        content.len(),
        content
    )
}

fn info_object(title: Option<&str>) -> String {
    match title {
        Some(title) => format!(
            "<< /Title ({}) /Producer (daysheet) >>",
            encode_winansi_pdf_string(title)
        ),
        None => "<< /Producer (daysheet) >>".to_string(),
    }
}

fn build_pdf(objects: Vec<String>, catalog_id: usize, info_id: Option<usize>) -> Vec<u8> {
    let mut out: Vec<u8> = Vec::new();
    out.extend_from_slice(b"%PDF-1.7\n");
    out.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");

    let mut offsets = Vec::with_capacity(objects.len());
    for (index, obj) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n", index + 1).as_bytes());
        out.extend_from_slice(obj.as_bytes());
        out.extend_from_slice(b"\nendobj\n");
    }

    let xref_start = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for offset in offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }

    let mut trailer = format!(
        "trailer\n<< /Size {} /Root {} 0 R",
        objects.len() + 1,
        catalog_id
    );
    if let Some(info_id) = info_id {
        trailer.push_str(&format!(" /Info {} 0 R", info_id));
    }
    trailer.push_str(&format!(" >>\nstartxref\n{}\n%%EOF", xref_start));
    out.extend_from_slice(trailer.as_bytes());
    out
}

/// cp1252 bytes as an escaped PDF literal body. Unmappable characters become `?`.
fn encode_winansi_pdf_string(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        let byte = match ch {
            '\u{0000}'..='\u{007F}' => ch as u8,
            '\u{00A0}'..='\u{00FF}' => ch as u8,
            '\u{20AC}' => 0x80,
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            _ => b'?',
        };
        match byte {
            b'\\' => out.push_str("\\\\"),
            b'(' => out.push_str("\\("),
            b')' => out.push_str("\\)"),
            b if b < 0x20 || b >= 0x7f => out.push_str(&format!("\\{:03o}", b)),
            b => out.push(b as char),
        }
    }
    out
}

fn fmt(value: f32) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let fixed = I32F32::from_num(value);
    let scaled = (fixed * I32F32::from_num(1000)).round();
    let milli: i64 = scaled.to_num();
    format_milli(milli)
}

fn format_milli(milli: i64) -> String {
    if milli == 0 {
        return "0".to_string();
    }
    let sign = if milli < 0 { "-" } else { "" };
    let abs = milli.abs();
    let int_part = abs / 1000;
    let frac_part = abs % 1000;
    if frac_part == 0 {
        return format!("{}{}", sign, int_part);
    }
    let digits = format!("{:03}", frac_part);
    format!("{}{}.{}", sign, int_part, digits.trim_end_matches('0'))
}

fn fmt_pt(value: Pt) -> String {
    format_milli(value.to_milli_i64())
}

fn color_to_pdf_fill(color: Color) -> String {
    format!("{} {} {} rg\n", fmt(color.r), fmt(color.g), fmt(color.b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PageSetup;
    use lopdf::Object;

    fn page(commands: Vec<Command>) -> Page {
        Page {
            setup: PageSetup::letter_landscape(10.0),
            commands,
        }
    }

    fn content_of(bytes: &[u8], page_number: u32) -> String {
        let doc = lopdf::Document::load_mem(bytes).expect("pdf parses");
        let pages = doc.get_pages();
        let page_id = pages[&page_number];
        let content = doc.get_page_content(page_id).expect("page content");
        String::from_utf8_lossy(&content).into_owned()
    }

    fn count_token(bytes: &[u8], token: &[u8]) -> usize {
        bytes.windows(token.len()).filter(|w| *w == token).count()
    }

    fn number(object: &Object) -> f32 {
        match object {
            Object::Integer(value) => *value as f32,
            Object::Real(value) => *value as f32,
            other => panic!("not a number: {other:?}"),
        }
    }

    #[test]
    fn milli_formatting_trims_zeros() {
        assert_eq!(format_milli(0), "0");
        assert_eq!(format_milli(792_000), "792");
        assert_eq!(format_milli(10_404), "10.404");
        assert_eq!(format_milli(-2_500), "-2.5");
        assert_eq!(format_milli(50), "0.05");
        assert_eq!(fmt(0.8), "0.8");
    }

    #[test]
    fn winansi_escapes_latin1_and_delimiters() {
        assert_eq!(encode_winansi_pdf_string("Díaz (2)"), "D\\355az \\(2\\)");
        assert_eq!(encode_winansi_pdf_string("Núñez"), "N\\372\\361ez");
        assert_eq!(encode_winansi_pdf_string("a\\b"), "a\\\\b");
        assert_eq!(encode_winansi_pdf_string("\u{4E2D}"), "?");
    }

    #[test]
    fn pages_parse_with_landscape_media_box() {
        let document = Document {
            pages: vec![page(Vec::new()), page(Vec::new())],
        };
        let bytes = document_to_pdf(&document, &PdfOptions::titled("18/10/2026")).unwrap();
        let doc = lopdf::Document::load_mem(&bytes).expect("pdf parses");
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 2);
        for page_id in pages.values() {
            let dict = doc.get_object(*page_id).unwrap().as_dict().unwrap();
            let media_box: Vec<f32> = dict
                .get(b"MediaBox")
                .unwrap()
                .as_array()
                .unwrap()
                .iter()
                .map(number)
                .collect();
            assert_eq!(media_box, vec![0.0, 0.0, 792.0, 612.0]);
        }

        let info_id = doc.trailer.get(b"Info").unwrap().as_reference().unwrap();
        let info = doc.get_object(info_id).unwrap().as_dict().unwrap();
        match info.get(b"Title").unwrap() {
            Object::String(bytes, _) => assert_eq!(bytes.as_slice(), b"18/10/2026"),
            other => panic!("unexpected title {other:?}"),
        }
    }

    #[test]
    fn content_uses_top_left_frame() {
        let document = Document {
            pages: vec![page(vec![
                Command::SetFillColor(Color::gray(0xCC)),
                Command::FillRect {
                    x: Pt::from_i32(10),
                    y: Pt::from_i32(22),
                    width: Pt::from_i32(28),
                    height: Pt::from_i32(20),
                },
                Command::SetFontName("Arial-Bold".to_string()),
                Command::SetFontSize(Pt::from_i32(10)),
                Command::DrawString {
                    x: Pt::from_i32(15),
                    y: Pt::from_f32(33.18),
                    text: "No".to_string(),
                },
            ])],
        };
        let bytes = document_to_pdf(&document, &PdfOptions::default()).unwrap();
        let content = content_of(&bytes, 1);
        assert!(content.starts_with("1 0 0 -1 0 612 cm\n"));
        assert!(content.contains("0.8 0.8 0.8 rg\n10 22 28 20 re f\n"));
        assert!(content.contains("/F2 10 Tf\n1 0 0 -1 15 33.18 Tm\n(No) Tj\n"));

        assert_eq!(count_token(&bytes, b"/BaseFont /Helvetica-Bold "), 1);
        assert_eq!(count_token(&bytes, b"/Arial"), 0);
    }

    #[test]
    fn restore_reinstates_font_for_later_text() {
        let document = Document {
            pages: vec![page(vec![
                Command::SetFontSize(Pt::from_i32(18)),
                Command::SaveState,
                Command::SetFontSize(Pt::from_i32(10)),
                Command::Rotate(std::f32::consts::FRAC_PI_2),
                Command::RestoreState,
                Command::DrawString {
                    x: Pt::ZERO,
                    y: Pt::ZERO,
                    text: "1".to_string(),
                },
            ])],
        };
        let bytes = document_to_pdf(&document, &PdfOptions::default()).unwrap();
        let content = content_of(&bytes, 1);
        assert!(content.contains("q\n0 1 -1 0 0 0 cm\nQ\n"));
        assert!(content.contains("/F1 18 Tf"));
    }

    #[test]
    fn unknown_fonts_are_rejected() {
        let document = Document {
            pages: vec![page(vec![
                Command::SetFontName("Papyrus".to_string()),
                Command::DrawString {
                    x: Pt::ZERO,
                    y: Pt::ZERO,
                    text: "x".to_string(),
                },
            ])],
        };
        let err = document_to_pdf(&document, &PdfOptions::default()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
