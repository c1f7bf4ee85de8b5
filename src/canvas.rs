use crate::error::ReportError;
use crate::font::FontRegistry;
use crate::surface::RenderSurface;
use crate::text::{TextOptions, TextStyle, wrap_lines};
use crate::types::{Color, PageSetup, Pt, Rect, Size};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SaveState,
    RestoreState,
    Translate(Pt, Pt),
    // Radians, clockwise in page space.
    Rotate(f32),
    SetFillColor(Color),
    SetFontName(String),
    SetFontSize(Pt),
    FillRect {
        x: Pt,
        y: Pt,
        width: Pt,
        height: Pt,
    },
    StrokeRect {
        x: Pt,
        y: Pt,
        width: Pt,
        height: Pt,
    },
    // `y` is the baseline.
    DrawString {
        x: Pt,
        y: Pt,
        text: String,
    },
}

#[derive(Debug, Clone)]
pub struct Page {
    pub setup: PageSetup,
    pub commands: Vec<Command>,
}

impl Page {
    fn new(setup: PageSetup) -> Self {
        Self {
            setup,
            commands: Vec::new(),
        }
    }

    pub fn size(&self) -> Size {
        self.setup.physical_size()
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    pub pages: Vec<Page>,
}

#[derive(Debug, Clone)]
struct GraphicsState {
    fill_color: Color,
    font_size: Pt,
    font_name: String,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            fill_color: Color::BLACK,
            font_size: Pt::from_f32(12.0),
            font_name: "Helvetica".to_string(),
        }
    }
}

/// Records drawing calls page by page for later serialization.
pub struct Canvas {
    fonts: FontRegistry,
    pages: Vec<Page>,
    current: Option<Page>,
    state_stack: Vec<GraphicsState>,
    current_state: GraphicsState,
    orphan_commands: usize,
    closed: bool,
}

impl Canvas {
    pub fn new() -> Self {
        Self::with_fonts(FontRegistry::base14())
    }

    pub fn with_fonts(fonts: FontRegistry) -> Self {
        Self {
            fonts,
            pages: Vec::new(),
            current: None,
            state_stack: Vec::new(),
            current_state: GraphicsState::default(),
            orphan_commands: 0,
            closed: false,
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len() + usize::from(self.current.is_some())
    }

    fn push(&mut self, command: Command) {
        match self.current.as_mut() {
            Some(page) => page.commands.push(command),
            None => self.orphan_commands += 1,
        }
    }

    fn set_fill_color(&mut self, color: Color) {
        if self.current_state.fill_color == color {
            return;
        }
        self.current_state.fill_color = color;
        self.push(Command::SetFillColor(color));
    }

    fn set_font(&mut self, style: &TextStyle) {
        if self.current_state.font_name != style.font_name.as_ref() {
            self.current_state.font_name = style.font_name.to_string();
            self.push(Command::SetFontName(self.current_state.font_name.clone()));
        }
        if self.current_state.font_size != style.font_size {
            self.current_state.font_size = style.font_size;
            self.push(Command::SetFontSize(style.font_size));
        }
    }

    fn finish_page(&mut self) {
        if let Some(page) = self.current.take() {
            self.pages.push(page);
        }
        self.state_stack.clear();
        self.current_state = GraphicsState::default();
    }

    fn layout_lines(&self, text: &str, options: &TextOptions) -> Result<Vec<String>, ReportError> {
        match options.width {
            Some(width) => wrap_lines(text, width, |part| {
                self.measure_width(part, &options.style)
            }),
            None => Ok(text.split('\n').map(str::to_string).collect()),
        }
    }

    /// Closes the document if needed and hands over the recorded pages.
    pub fn finish(mut self) -> Result<Document, ReportError> {
        if !self.closed {
            self.close_document()?;
        }
        Ok(Document { pages: self.pages })
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderSurface for Canvas {
    fn open_page(&mut self, setup: &PageSetup) -> Result<(), ReportError> {
        if self.closed {
            return Err(ReportError::Surface("document already closed".to_string()));
        }
        if !self.state_stack.is_empty() {
            return Err(ReportError::Surface(format!(
                "page opened with {} unrestored transform(s)",
                self.state_stack.len()
            )));
        }
        self.finish_page();
        self.current = Some(Page::new(*setup));
        Ok(())
    }

    fn content_box(&self) -> Result<Rect, ReportError> {
        self.current
            .as_ref()
            .map(|page| page.setup.content_box())
            .ok_or_else(|| ReportError::Surface("no open page".to_string()))
    }

    fn measure_width(&self, text: &str, style: &TextStyle) -> Result<Pt, ReportError> {
        self.fonts
            .measure_text_width(&style.font_name, style.font_size, text)
            .ok_or_else(|| ReportError::measurement(&style.font_name, text))
    }

    fn measure_wrapped_height(
        &self,
        text: &str,
        width: Pt,
        style: &TextStyle,
    ) -> Result<Pt, ReportError> {
        let line_height = self.line_height(style)?;
        let lines = wrap_lines(text, width, |part| self.measure_width(part, style))?;
        Ok(line_height * lines.len() as i32)
    }

    fn line_height(&self, style: &TextStyle) -> Result<Pt, ReportError> {
        self.fonts
            .line_height(&style.font_name, style.font_size)
            .ok_or_else(|| ReportError::measurement(&style.font_name, ""))
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.set_fill_color(color);
        self.push(Command::FillRect {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
        });
    }

    fn stroke_rect(&mut self, rect: Rect) {
        self.push(Command::StrokeRect {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
        });
    }

    fn draw_text(
        &mut self,
        text: &str,
        x: Pt,
        y: Pt,
        options: &TextOptions,
    ) -> Result<(), ReportError> {
        let style = &options.style;
        let line_height = self.line_height(style)?;
        let ascent = self
            .fonts
            .ascent(&style.font_name, style.font_size)
            .ok_or_else(|| ReportError::measurement(&style.font_name, text))?;
        let lines = self.layout_lines(text, options)?;

        let mut placed = Vec::with_capacity(lines.len());
        for (index, line) in lines.into_iter().enumerate() {
            if line.is_empty() {
                continue;
            }
            placed.push(Command::DrawString {
                x,
                y: y + line_height * index as i32 + ascent,
                text: line,
            });
        }
        if placed.is_empty() {
            return Ok(());
        }

        self.set_fill_color(Color::BLACK);
        self.set_font(style);
        for command in placed {
            self.push(command);
        }
        Ok(())
    }

    fn save_transform(&mut self) {
        self.state_stack.push(self.current_state.clone());
        self.push(Command::SaveState);
    }

    fn translate(&mut self, dx: Pt, dy: Pt) {
        self.push(Command::Translate(dx, dy));
    }

    fn rotate(&mut self, degrees: f32) {
        self.push(Command::Rotate(degrees.to_radians()));
    }

    fn restore_transform(&mut self) -> Result<(), ReportError> {
        let Some(state) = self.state_stack.pop() else {
            return Err(ReportError::Surface(
                "restore without matching save".to_string(),
            ));
        };
        self.current_state = state;
        self.push(Command::RestoreState);
        Ok(())
    }

    fn close_document(&mut self) -> Result<(), ReportError> {
        if self.closed {
            return Err(ReportError::Surface("document already closed".to_string()));
        }
        if !self.state_stack.is_empty() {
            return Err(ReportError::Surface(
                "document closed with unrestored transforms".to_string(),
            ));
        }
        if self.orphan_commands > 0 {
            return Err(ReportError::Surface(format!(
                "{} drawing call(s) issued with no open page",
                self.orphan_commands
            )));
        }
        self.finish_page();
        self.closed = true;
        Ok(())
    }
}
