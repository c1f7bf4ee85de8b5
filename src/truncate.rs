use crate::error::ReportError;
use crate::surface::RenderSurface;
use crate::text::TextStyle;
use crate::types::Pt;

pub const ELLIPSIS: &str = "...";

/// Longest prefix of `text` that still fits `max_width` once [`ELLIPSIS`] is
/// appended. The marker is always appended, even when `text` already fits;
/// use [`fit_text`] for pass-through behaviour. When `max_width` is narrower
/// than the marker itself the result is the bare marker.
pub fn truncate<S>(
    surface: &S,
    text: &str,
    max_width: Pt,
    style: &TextStyle,
) -> Result<String, ReportError>
where
    S: RenderSurface + ?Sized,
{
    let budget = max_width - surface.measure_width(ELLIPSIS, style)?;
    let mut kept = text.to_string();
    while !kept.is_empty() && surface.measure_width(&kept, style)? > budget {
        kept.pop();
    }
    kept.push_str(ELLIPSIS);
    Ok(kept)
}

/// Returns `text` untouched when it fits `max_width`, otherwise truncates it.
pub fn fit_text<S>(
    surface: &S,
    text: &str,
    max_width: Pt,
    style: &TextStyle,
) -> Result<String, ReportError>
where
    S: RenderSurface + ?Sized,
{
    if surface.measure_width(text, style)? <= max_width {
        return Ok(text.to_string());
    }
    truncate(surface, text, max_width, style)
}
