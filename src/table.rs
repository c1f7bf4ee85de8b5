use crate::error::ReportError;
use crate::surface::RenderSurface;
use crate::text::{TextOptions, TextStyle};
use crate::types::{Color, Pt, Rect};
use daysheet_contract::ColumnDef;

/// One fixed-width column. The width is authoritative; content never widens it.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub label: String,
    pub width: Pt,
}

impl ColumnSpec {
    pub fn new(label: impl Into<String>, width: f32) -> Self {
        Self {
            label: label.into(),
            width: Pt::from_f32(width),
        }
    }
}

impl From<&ColumnDef> for ColumnSpec {
    fn from(def: &ColumnDef) -> Self {
        ColumnSpec::new(def.label, def.width)
    }
}

/// Validated, non-empty column sequence in draw order.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    columns: Vec<ColumnSpec>,
    width: Pt,
}

impl TableSchema {
    pub fn new(columns: Vec<ColumnSpec>) -> Result<Self, ReportError> {
        if columns.is_empty() {
            return Err(ReportError::Schema("table has no columns".to_string()));
        }
        for (index, column) in columns.iter().enumerate() {
            if column.width <= Pt::ZERO {
                return Err(ReportError::Schema(format!(
                    "column {} ({:?}) has non-positive width",
                    index, column.label
                )));
            }
        }
        let width = columns.iter().map(|c| c.width).sum();
        Ok(Self { columns, width })
    }

    pub fn from_defs(defs: &[ColumnDef]) -> Result<Self, ReportError> {
        if let Some(bad) = defs.iter().find(|def| !def.width.is_finite()) {
            return Err(ReportError::Schema(format!(
                "column {:?} has non-finite width",
                bad.label
            )));
        }
        Self::new(defs.iter().map(ColumnSpec::from).collect())
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Sum of column widths; the same for the header and every row.
    pub fn width(&self) -> Pt {
        self.width
    }

    /// Left edge of each column relative to the table origin.
    pub fn column_offsets(&self) -> Vec<Pt> {
        let mut offsets = Vec::with_capacity(self.columns.len());
        let mut x = Pt::ZERO;
        for column in &self.columns {
            offsets.push(x);
            x += column.width;
        }
        offsets
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableStyle {
    pub cell_padding: Pt,
    pub header_text: TextStyle,
    pub body_text: TextStyle,
    pub header_fill: Color,
    pub even_row_fill: Color,
    pub odd_row_fill: Color,
    /// Space added below the last row before the returned cursor.
    pub trailing_margin: Pt,
}

impl Default for TableStyle {
    fn default() -> Self {
        Self {
            cell_padding: Pt::from_i32(5),
            header_text: TextStyle::helvetica_bold(10.0),
            body_text: TextStyle::helvetica(9.0),
            header_fill: Color::gray(0xCC),
            even_row_fill: Color::WHITE,
            odd_row_fill: Color::gray(0xF0),
            trailing_margin: Pt::from_i32(10),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowLayout {
    pub row_index: usize,
    pub y: Pt,
    pub height: Pt,
    /// Exactly one string per column.
    pub cells: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedTable {
    pub rows: Vec<RowLayout>,
    pub width: Pt,
    pub header_height: Pt,
    /// Cursor below the table, trailing margin included.
    pub end_y: Pt,
}

/// Header band plus one striped row per record, rows growing to fit their
/// wrapped cell text.
#[derive(Debug, Clone)]
pub struct TableLayout {
    schema: TableSchema,
    style: TableStyle,
    min_row_height: Pt,
    header_height: Pt,
}

impl TableLayout {
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            style: TableStyle::default(),
            min_row_height: Pt::from_i32(20),
            header_height: Pt::from_i32(20),
        }
    }

    pub fn with_style(mut self, style: TableStyle) -> Self {
        self.style = style;
        self
    }

    pub fn min_row_height(mut self, height: Pt) -> Self {
        self.min_row_height = height;
        self
    }

    pub fn header_height(mut self, height: Pt) -> Self {
        self.header_height = height;
        self
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Computes row geometry without drawing.
    pub fn measure_rows<S, R, M>(
        &self,
        surface: &S,
        origin_y: Pt,
        records: &[R],
        mapper: M,
    ) -> Result<Vec<RowLayout>, ReportError>
    where
        S: RenderSurface + ?Sized,
        M: Fn(&R, usize) -> Vec<String>,
    {
        let padding = self.style.cell_padding;
        let mut rows = Vec::with_capacity(records.len());
        let mut y = origin_y + self.header_height;
        for (row_index, record) in records.iter().enumerate() {
            let mut cells = mapper(record, row_index);
            cells.resize(self.schema.len(), String::new());

            let mut height = self.min_row_height;
            for (column, cell) in self.schema.columns.iter().zip(&cells) {
                let text_height = surface.measure_wrapped_height(
                    cell,
                    column.width - padding * 2,
                    &self.style.body_text,
                )?;
                height = height.max(text_height + padding * 2);
            }
            rows.push(RowLayout {
                row_index,
                y,
                height,
                cells,
            });
            y += height;
        }
        Ok(rows)
    }

    pub fn render<S, R, M>(
        &self,
        surface: &mut S,
        origin_y: Pt,
        records: &[R],
        mapper: M,
    ) -> Result<RenderedTable, ReportError>
    where
        S: RenderSurface + ?Sized,
        M: Fn(&R, usize) -> Vec<String>,
    {
        let left = surface.content_box()?.x;
        let padding = self.style.cell_padding;
        let offsets = self.schema.column_offsets();

        let mut label_heights = Vec::with_capacity(self.schema.len());
        for column in &self.schema.columns {
            label_heights.push(surface.measure_wrapped_height(
                &column.label,
                column.width - padding * 2,
                &self.style.header_text,
            )?);
        }
        let rows = self.measure_rows(&*surface, origin_y, records, mapper)?;

        for ((column, offset), label_height) in
            self.schema.columns.iter().zip(&offsets).zip(label_heights)
        {
            let cell = Rect::new(left + *offset, origin_y, column.width, self.header_height);
            surface.fill_rect(cell, self.style.header_fill);
            surface.stroke_rect(cell);
            let options = TextOptions::new(self.style.header_text.clone())
                .with_width(column.width - padding * 2);
            surface.draw_text(
                &column.label,
                cell.x + padding,
                origin_y + (self.header_height - label_height) / 2,
                &options,
            )?;
        }

        for row in &rows {
            let fill = if row.row_index % 2 == 0 {
                self.style.even_row_fill
            } else {
                self.style.odd_row_fill
            };
            surface.fill_rect(
                Rect::new(left, row.y, self.schema.width, row.height),
                fill,
            );
            for ((column, offset), text) in
                self.schema.columns.iter().zip(&offsets).zip(&row.cells)
            {
                let cell = Rect::new(left + *offset, row.y, column.width, row.height);
                surface.stroke_rect(cell);
                let options = TextOptions::new(self.style.body_text.clone())
                    .with_width(column.width - padding * 2);
                surface.draw_text(text, cell.x + padding, row.y + padding, &options)?;
            }
        }

        let rows_height: Pt = rows.iter().map(|row| row.height).sum();
        Ok(RenderedTable {
            width: self.schema.width,
            header_height: self.header_height,
            end_y: origin_y + self.header_height + rows_height + self.style.trailing_margin,
            rows,
        })
    }
}

/// Draws a table with the default style and returns the cursor below it.
pub fn layout_table<S, R, M>(
    surface: &mut S,
    origin_y: Pt,
    schema: &TableSchema,
    records: &[R],
    mapper: M,
    min_row_height: Pt,
    header_height: Pt,
) -> Result<Pt, ReportError>
where
    S: RenderSurface + ?Sized,
    M: Fn(&R, usize) -> Vec<String>,
{
    let layout = TableLayout::new(schema.clone())
        .min_row_height(min_row_height)
        .header_height(header_height);
    Ok(layout.render(surface, origin_y, records, mapper)?.end_y)
}
