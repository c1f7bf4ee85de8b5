use crate::error::ReportError;
use crate::text::{TextOptions, TextStyle};
use crate::types::{Color, PageSetup, Pt, Rect};

/// Drawing and measuring capability the layout engine renders against.
///
/// Coordinates are in points with the origin at the top-left corner of the
/// current page and y growing downwards. Transforms apply to everything drawn
/// after them until the matching [`RenderSurface::restore_transform`].
pub trait RenderSurface {
    /// Finishes the current page, if any, and starts a new one.
    fn open_page(&mut self, setup: &PageSetup) -> Result<(), ReportError>;

    /// Area inside the current page's margins.
    fn content_box(&self) -> Result<Rect, ReportError>;

    fn measure_width(&self, text: &str, style: &TextStyle) -> Result<Pt, ReportError>;

    /// Height of `text` once wrapped to `width`. Empty text is zero high.
    fn measure_wrapped_height(
        &self,
        text: &str,
        width: Pt,
        style: &TextStyle,
    ) -> Result<Pt, ReportError>;

    fn line_height(&self, style: &TextStyle) -> Result<Pt, ReportError>;

    fn fill_rect(&mut self, rect: Rect, color: Color);

    fn stroke_rect(&mut self, rect: Rect);

    /// Draws `text` with its first line's top edge at `y`.
    fn draw_text(&mut self, text: &str, x: Pt, y: Pt, options: &TextOptions)
    -> Result<(), ReportError>;

    fn save_transform(&mut self);

    fn translate(&mut self, dx: Pt, dy: Pt);

    /// Clockwise on the page, in degrees.
    fn rotate(&mut self, degrees: f32);

    fn restore_transform(&mut self) -> Result<(), ReportError>;

    fn close_document(&mut self) -> Result<(), ReportError>;
}

/// Runs `body` between a save and a restore. The restore happens on every
/// exit path; the body's error wins over a restore error.
pub fn with_saved_transform<S, T, F>(surface: &mut S, body: F) -> Result<T, ReportError>
where
    S: RenderSurface + ?Sized,
    F: FnOnce(&mut S) -> Result<T, ReportError>,
{
    surface.save_transform();
    let result = body(surface);
    let restored = surface.restore_transform();
    let value = result?;
    restored?;
    Ok(value)
}
