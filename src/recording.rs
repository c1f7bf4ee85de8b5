use crate::error::ReportError;
use crate::surface::RenderSurface;
use crate::text::{TextOptions, TextStyle, wrap_lines};
use crate::types::{Color, PageSetup, Pt, Rect};
use std::collections::BTreeSet;

/// One call received by a [`RecordingSurface`]. Geometry is kept both as
/// issued (local frame) and resolved through the transform stack (page frame).
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    OpenPage(PageSetup),
    FillRect {
        rect: Rect,
        page_bounds: Rect,
        color: Color,
    },
    StrokeRect {
        rect: Rect,
        page_bounds: Rect,
    },
    Text {
        text: String,
        x: Pt,
        y: Pt,
        page_x: Pt,
        page_y: Pt,
        options: TextOptions,
    },
    Save,
    Restore,
    Translate(Pt, Pt),
    Rotate(f32),
    CloseDocument,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Affine {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    e: f64,
    f: f64,
}

impl Affine {
    const IDENTITY: Affine = Affine {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    /// `self` applied after `inner`.
    fn then(self, inner: Affine) -> Affine {
        Affine {
            a: self.a * inner.a + self.c * inner.b,
            b: self.b * inner.a + self.d * inner.b,
            c: self.a * inner.c + self.c * inner.d,
            d: self.b * inner.c + self.d * inner.d,
            e: self.a * inner.e + self.c * inner.f + self.e,
            f: self.b * inner.e + self.d * inner.f + self.f,
        }
    }

    fn apply(&self, x: Pt, y: Pt) -> (f64, f64) {
        let x = x.to_f32() as f64;
        let y = y.to_f32() as f64;
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    fn bounds(&self, rect: Rect) -> Rect {
        let corners = [
            self.apply(rect.x, rect.y),
            self.apply(rect.right(), rect.y),
            self.apply(rect.x, rect.bottom()),
            self.apply(rect.right(), rect.bottom()),
        ];
        let min_x = corners.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
        let max_x = corners.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
        let min_y = corners.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
        let max_y = corners.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
        Rect {
            x: Pt::from_f32(min_x as f32),
            y: Pt::from_f32(min_y as f32),
            width: Pt::from_f32((max_x - min_x) as f32),
            height: Pt::from_f32((max_y - min_y) as f32),
        }
    }
}

/// In-memory surface for layout tests.
///
/// Every glyph is half an em wide and every line is 1.2 em tall, so expected
/// geometry can be computed by hand. Fonts passed to [`Self::fail_font`]
/// refuse to measure.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    ops: Vec<Op>,
    page: Option<PageSetup>,
    matrix_stack: Vec<Affine>,
    matrix: Option<Affine>,
    failing_fonts: BTreeSet<String>,
    orphan_ops: usize,
    closed: bool,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_font(mut self, font_name: &str) -> Self {
        self.failing_fonts.insert(font_name.to_string());
        self
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub fn transform_depth(&self) -> usize {
        self.matrix_stack.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn page_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, Op::OpenPage(_)))
            .count()
    }

    /// Ops grouped by page, excluding the `OpenPage` markers.
    pub fn pages(&self) -> Vec<Vec<Op>> {
        let mut pages: Vec<Vec<Op>> = Vec::new();
        for op in &self.ops {
            match op {
                Op::OpenPage(_) => pages.push(Vec::new()),
                Op::CloseDocument => {}
                other => {
                    if let Some(page) = pages.last_mut() {
                        page.push(other.clone());
                    }
                }
            }
        }
        pages
    }

    pub fn texts_on_page(&self, page_index: usize) -> Vec<String> {
        self.pages()
            .get(page_index)
            .map(|ops| {
                ops.iter()
                    .filter_map(|op| match op {
                        Op::Text { text, .. } => Some(text.clone()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn current_matrix(&self) -> Affine {
        self.matrix.unwrap_or(Affine::IDENTITY)
    }

    fn record_drawing(&mut self, op: Op) {
        if self.page.is_none() {
            self.orphan_ops += 1;
        }
        self.ops.push(op);
    }

    fn check_font(&self, text: &str, style: &TextStyle) -> Result<(), ReportError> {
        if self.failing_fonts.contains(style.font_name.as_ref()) {
            return Err(ReportError::measurement(&style.font_name, text));
        }
        Ok(())
    }
}

impl RenderSurface for RecordingSurface {
    fn open_page(&mut self, setup: &PageSetup) -> Result<(), ReportError> {
        if !self.matrix_stack.is_empty() {
            return Err(ReportError::Surface(format!(
                "page opened with {} unrestored transform(s)",
                self.matrix_stack.len()
            )));
        }
        self.page = Some(*setup);
        self.matrix = Some(Affine::IDENTITY);
        self.ops.push(Op::OpenPage(*setup));
        Ok(())
    }

    fn content_box(&self) -> Result<Rect, ReportError> {
        self.page
            .map(|page| page.content_box())
            .ok_or_else(|| ReportError::Surface("no open page".to_string()))
    }

    fn measure_width(&self, text: &str, style: &TextStyle) -> Result<Pt, ReportError> {
        self.check_font(text, style)?;
        let units = text.chars().count() as i64 * 500;
        Ok(style.font_size.mul_ratio(units, 1000))
    }

    fn measure_wrapped_height(
        &self,
        text: &str,
        width: Pt,
        style: &TextStyle,
    ) -> Result<Pt, ReportError> {
        self.check_font(text, style)?;
        let lines = wrap_lines(text, width, |part| self.measure_width(part, style))?;
        Ok(self.line_height(style)? * lines.len() as i32)
    }

    fn line_height(&self, style: &TextStyle) -> Result<Pt, ReportError> {
        self.check_font("", style)?;
        Ok(style.font_size.mul_ratio(6, 5))
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        let page_bounds = self.current_matrix().bounds(rect);
        self.record_drawing(Op::FillRect {
            rect,
            page_bounds,
            color,
        });
    }

    fn stroke_rect(&mut self, rect: Rect) {
        let page_bounds = self.current_matrix().bounds(rect);
        self.record_drawing(Op::StrokeRect { rect, page_bounds });
    }

    fn draw_text(
        &mut self,
        text: &str,
        x: Pt,
        y: Pt,
        options: &TextOptions,
    ) -> Result<(), ReportError> {
        self.check_font(text, &options.style)?;
        let (page_x, page_y) = self.current_matrix().apply(x, y);
        self.record_drawing(Op::Text {
            text: text.to_string(),
            x,
            y,
            page_x: Pt::from_f32(page_x as f32),
            page_y: Pt::from_f32(page_y as f32),
            options: options.clone(),
        });
        Ok(())
    }

    fn save_transform(&mut self) {
        self.matrix_stack.push(self.current_matrix());
        self.ops.push(Op::Save);
    }

    fn translate(&mut self, dx: Pt, dy: Pt) {
        let step = Affine {
            e: dx.to_f32() as f64,
            f: dy.to_f32() as f64,
            ..Affine::IDENTITY
        };
        self.matrix = Some(self.current_matrix().then(step));
        self.ops.push(Op::Translate(dx, dy));
    }

    fn rotate(&mut self, degrees: f32) {
        let radians = (degrees as f64).to_radians();
        let (sin, cos) = (libm::sin(radians), libm::cos(radians));
        let step = Affine {
            a: cos,
            b: sin,
            c: -sin,
            d: cos,
            e: 0.0,
            f: 0.0,
        };
        self.matrix = Some(self.current_matrix().then(step));
        self.ops.push(Op::Rotate(degrees));
    }

    fn restore_transform(&mut self) -> Result<(), ReportError> {
        let Some(previous) = self.matrix_stack.pop() else {
            return Err(ReportError::Surface(
                "restore without matching save".to_string(),
            ));
        };
        self.matrix = Some(previous);
        self.ops.push(Op::Restore);
        Ok(())
    }

    fn close_document(&mut self) -> Result<(), ReportError> {
        if !self.matrix_stack.is_empty() {
            return Err(ReportError::Surface(
                "document closed with unrestored transforms".to_string(),
            ));
        }
        if self.closed {
            return Err(ReportError::Surface("document already closed".to_string()));
        }
        if self.orphan_ops > 0 {
            return Err(ReportError::Surface(format!(
                "{} drawing call(s) issued with no open page",
                self.orphan_ops
            )));
        }
        self.closed = true;
        self.ops.push(Op::CloseDocument);
        Ok(())
    }
}
