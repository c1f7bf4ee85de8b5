mod canvas;
mod cards;
mod debug;
mod error;
mod font;
mod metrics;
mod pdf;
mod recording;
mod report;
mod surface;
mod table;
mod text;
mod truncate;
mod types;

pub use canvas::{Canvas, Command, Document, Page};
pub use cards::{
    CardElement, CardGridSummary, CardTemplate, CardText, CardTile, GridPaginator, TileConfig,
    render_card, render_card_grid,
};
pub use daysheet_contract::{Record, TableDef, TableKind, fields};
pub use error::ReportError;
pub use font::FontRegistry;
pub use metrics::{ReportMetrics, TableMetrics};
pub use pdf::{PdfOptions, document_to_pdf};
pub use recording::{Op, RecordingSurface};
pub use report::{
    CardPlan, CellMapper, RenderedReport, ReportBuilder, ReportComposer, ReportConfig, TablePlan,
    blood_tube_cells, laboratory_cells, patient_cells,
};
pub use surface::{RenderSurface, with_saved_transform};
pub use table::{
    ColumnSpec, RenderedTable, RowLayout, TableLayout, TableSchema, TableStyle, layout_table,
};
pub use text::{TextOptions, TextStyle};
pub use truncate::{ELLIPSIS, fit_text, truncate};
pub use types::{Color, Margins, Orientation, PageSetup, Pt, Rect, Size};
