use crate::canvas::Canvas;
use crate::cards::{CardTemplate, GridPaginator, TileConfig, render_card_grid};
use crate::debug::{DebugLogger, json_string};
use crate::error::ReportError;
use crate::metrics::{ReportMetrics, TableMetrics};
use crate::pdf::{PdfOptions, document_to_pdf};
use crate::surface::RenderSurface;
use crate::table::{TableLayout, TableSchema, TableStyle};
use crate::text::{TextOptions, TextStyle};
use crate::types::{PageSetup, Pt};
use daysheet_contract::{Record, TableDef, TableKind, fields, table_def};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// `(record, row_index) -> cells`; `row_index` is 0-based.
pub type CellMapper = Arc<dyn Fn(&Record, usize) -> Vec<String> + Send + Sync>;

#[derive(Clone)]
pub struct TablePlan {
    pub title: String,
    pub schema: TableSchema,
    pub min_row_height: Pt,
    pub header_height: Pt,
    pub mapper: CellMapper,
}

impl TablePlan {
    pub fn new<F>(title: impl Into<String>, schema: TableSchema, mapper: F) -> Self
    where
        F: Fn(&Record, usize) -> Vec<String> + Send + Sync + 'static,
    {
        Self {
            title: title.into(),
            schema,
            min_row_height: Pt::from_i32(20),
            header_height: Pt::from_i32(20),
            mapper: Arc::new(mapper),
        }
    }

    pub fn from_def<F>(def: &TableDef, mapper: F) -> Result<Self, ReportError>
    where
        F: Fn(&Record, usize) -> Vec<String> + Send + Sync + 'static,
    {
        let schema = TableSchema::from_defs(def.columns)?;
        Ok(Self::new(def.title, schema, mapper)
            .min_row_height(Pt::from_f32(def.min_row_height))
            .header_height(Pt::from_f32(def.header_height)))
    }

    pub fn min_row_height(mut self, height: Pt) -> Self {
        self.min_row_height = height;
        self
    }

    pub fn header_height(mut self, height: Pt) -> Self {
        self.header_height = height;
        self
    }
}

impl fmt::Debug for TablePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TablePlan")
            .field("title", &self.title)
            .field("schema", &self.schema)
            .field("min_row_height", &self.min_row_height)
            .field("header_height", &self.header_height)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CardPlan {
    pub tiles: TileConfig,
    pub template: CardTemplate,
}

impl CardPlan {
    pub fn clinic_default() -> Self {
        Self {
            tiles: TileConfig::default(),
            template: CardTemplate::clinic_default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub page: PageSetup,
    pub tables: Vec<TablePlan>,
    pub cards: Option<CardPlan>,
    pub table_style: TableStyle,
    pub title_style: TextStyle,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            page: PageSetup::letter_landscape(10.0),
            tables: Vec::new(),
            cards: None,
            table_style: TableStyle::default(),
            title_style: TextStyle::helvetica(12.0),
        }
    }
}

impl ReportConfig {
    /// Patients, blood tubes and laboratory tables followed by one index card
    /// per appointment.
    pub fn clinic_default() -> Result<Self, ReportError> {
        Ok(Self {
            tables: vec![
                TablePlan::from_def(table_def(TableKind::Patients), patient_cells)?,
                TablePlan::from_def(table_def(TableKind::BloodTubes), blood_tube_cells)?,
                TablePlan::from_def(table_def(TableKind::Laboratory), laboratory_cells)?,
            ],
            cards: Some(CardPlan::clinic_default()),
            ..Self::default()
        })
    }
}

fn cells(record: &Record, row_index: usize, names: &[&str]) -> Vec<String> {
    let mut out = Vec::with_capacity(names.len() + 2);
    out.push((row_index + 1).to_string());
    out.extend(names.iter().map(|name| record.get(name).to_string()));
    out
}

pub fn patient_cells(record: &Record, row_index: usize) -> Vec<String> {
    let mut out = cells(
        record,
        row_index,
        &[
            fields::TIME,
            fields::VISIT_NUMBER,
            fields::RECIPIENT_NAME,
            fields::DONOR_NAME,
            fields::PHONE_NUMBER,
            fields::TREATMENT_REQUIRED,
            fields::PICKED,
            fields::PAID,
            fields::DONE,
        ],
    );
    // Row number repeats in the last column.
    out.push((row_index + 1).to_string());
    out
}

pub fn blood_tube_cells(record: &Record, row_index: usize) -> Vec<String> {
    cells(
        record,
        row_index,
        &[
            fields::TIME,
            fields::DONOR_NAME,
            fields::RECIPIENT_NAME,
            fields::NUMBER_OF_TUBES,
        ],
    )
}

pub fn laboratory_cells(record: &Record, row_index: usize) -> Vec<String> {
    cells(
        record,
        row_index,
        &[
            fields::TIME,
            fields::TREATMENT_NAME,
            fields::VISIT_NUMBER,
            fields::RECIPIENT_NAME,
            fields::DONOR_NAME,
            fields::TS,
            fields::TS_RPM,
            fields::SN,
            fields::SN_RPM,
            fields::IY,
            fields::DONE,
        ],
    )
}

pub struct ReportBuilder {
    config: ReportConfig,
    debug_log: Option<PathBuf>,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self::from_config(ReportConfig::default())
    }

    pub fn from_config(config: ReportConfig) -> Self {
        Self {
            config,
            debug_log: None,
        }
    }

    pub fn clinic_default() -> Result<Self, ReportError> {
        Ok(Self::from_config(ReportConfig::clinic_default()?))
    }

    pub fn page(mut self, page: PageSetup) -> Self {
        self.config.page = page;
        self
    }

    pub fn table(mut self, plan: TablePlan) -> Self {
        self.config.tables.push(plan);
        self
    }

    pub fn cards(mut self, plan: CardPlan) -> Self {
        self.config.cards = Some(plan);
        self
    }

    pub fn without_cards(mut self) -> Self {
        self.config.cards = None;
        self
    }

    pub fn table_style(mut self, style: TableStyle) -> Self {
        self.config.table_style = style;
        self
    }

    pub fn title_style(mut self, style: TextStyle) -> Self {
        self.config.title_style = style;
        self
    }

    pub fn debug_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.debug_log = Some(path.into());
        self
    }

    pub fn build(self) -> Result<ReportComposer, ReportError> {
        if self.config.tables.is_empty() && self.config.cards.is_none() {
            return Err(ReportError::InvalidConfiguration(
                "report has no tables and no cards".to_string(),
            ));
        }
        if let Some(cards) = &self.config.cards {
            GridPaginator::new(cards.tiles)?;
        }
        let content = self.config.page.content_box();
        if content.width <= Pt::ZERO || content.height <= Pt::ZERO {
            return Err(ReportError::InvalidConfiguration(
                "page margins leave no content area".to_string(),
            ));
        }
        let debug = match self.debug_log {
            Some(path) => Some(DebugLogger::new(path)?),
            None => None,
        };
        Ok(ReportComposer {
            config: Arc::new(self.config),
            debug,
        })
    }
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct RenderedReport {
    pub pdf: Vec<u8>,
    pub metrics: ReportMetrics,
}

/// Draws every configured table on its own page, then the card grid, over
/// one record sequence.
#[derive(Clone)]
pub struct ReportComposer {
    config: Arc<ReportConfig>,
    debug: Option<DebugLogger>,
}

impl ReportComposer {
    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    pub fn compose<S>(
        &self,
        surface: &mut S,
        records: &[Record],
        date_label: &str,
    ) -> Result<ReportMetrics, ReportError>
    where
        S: RenderSurface + ?Sized,
    {
        let mut metrics = ReportMetrics::default();
        for plan in &self.config.tables {
            let table = self.compose_table(surface, plan, records, date_label)?;
            if let Some(debug) = &self.debug {
                debug.event(
                    "table.rendered",
                    &[
                        ("title", json_string(&table.title)),
                        ("rows", table.rows.to_string()),
                        ("end_y", table.end_y.to_milli_i64().to_string()),
                    ],
                );
            }
            metrics.tables.push(table);
        }

        if let Some(plan) = &self.config.cards {
            let summary = render_card_grid(surface, records, &plan.tiles, &plan.template)?;
            if let Some(debug) = &self.debug {
                for (page, cards) in summary.cards_per_page.iter().enumerate() {
                    debug.event(
                        "cards.page",
                        &[("page", (page + 1).to_string()), ("cards", cards.to_string())],
                    );
                }
            }
            metrics.cards = Some(summary);
        }

        surface.close_document()?;
        if let Some(debug) = &self.debug {
            debug.event(
                "report.done",
                &[
                    ("date", json_string(date_label)),
                    ("records", records.len().to_string()),
                    ("pages", metrics.page_count().to_string()),
                ],
            );
            debug.emit_summary("compose");
            debug.flush();
        }
        Ok(metrics)
    }

    fn compose_table<S>(
        &self,
        surface: &mut S,
        plan: &TablePlan,
        records: &[Record],
        date_label: &str,
    ) -> Result<TableMetrics, ReportError>
    where
        S: RenderSurface + ?Sized,
    {
        surface.open_page(&self.config.page)?;
        let content = surface.content_box()?;
        let title_style = &self.config.title_style;
        let title = format!("{} - {}", plan.title, date_label);
        surface.draw_text(
            &title,
            content.x,
            content.y,
            &TextOptions::new(title_style.clone()).with_width(content.width),
        )?;
        let origin_y = content.y + surface.line_height(title_style)?;

        let mapper = &plan.mapper;
        let table = TableLayout::new(plan.schema.clone())
            .with_style(self.config.table_style.clone())
            .min_row_height(plan.min_row_height)
            .header_height(plan.header_height)
            .render(surface, origin_y, records, |record, row_index| {
                mapper(record, row_index)
            })?;
        Ok(TableMetrics::from_rendered(&plan.title, &table))
    }

    /// Composes onto a fresh [`Canvas`] and serializes it, titled with
    /// `date_label`.
    pub fn render_pdf(
        &self,
        records: &[Record],
        date_label: &str,
    ) -> Result<RenderedReport, ReportError> {
        let mut canvas = Canvas::new();
        let metrics = self.compose(&mut canvas, records, date_label)?;
        let document = canvas.finish()?;
        let pdf = document_to_pdf(&document, &PdfOptions::titled(date_label))?;
        Ok(RenderedReport { pdf, metrics })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug::tests::temp_log_path;
    use crate::recording::{Op, RecordingSurface};
    use crate::table::ColumnSpec;

    const DATE: &str = "18/10/2026";

    fn appointments(count: usize) -> Vec<Record> {
        (1..=count)
            .map(|n| {
                Record::new()
                    .with(fields::TIME, format!("{}:00 AM", 8 + n))
                    .with(fields::RECIPIENT_NAME, format!("Recipient {n}"))
                    .with(fields::DONOR_NAME, format!("Donor {n}"))
                    .with(fields::TREATMENT_REQUIRED, "IUI - 100 ")
                    .with(fields::TREATMENT_NAME, "IUI")
                    .with(fields::VISIT_NUMBER, " 1")
            })
            .collect()
    }

    fn clinic() -> ReportComposer {
        ReportBuilder::clinic_default()
            .expect("default config")
            .build()
            .expect("composer")
    }

    #[test]
    fn mappers_number_rows_from_one() {
        let record = appointments(1).remove(0);
        let patients = patient_cells(&record, 0);
        assert_eq!(patients.len(), 11);
        assert_eq!(patients[0], "1");
        assert_eq!(patients[10], "1");
        assert_eq!(patients[3], "Recipient 1");
        assert_eq!(patients[7], "");
        let tubes = blood_tube_cells(&record, 4);
        assert_eq!(tubes, vec!["5", "9:00 AM", "Donor 1", "Recipient 1", ""]);
        let lab = laboratory_cells(&record, 1);
        assert_eq!(lab.len(), 12);
        assert_eq!(lab[2], "IUI");
    }

    #[test]
    fn compose_draws_three_tables_then_cards() {
        let composer = clinic();
        let mut surface = RecordingSurface::new();
        let metrics = composer
            .compose(&mut surface, &appointments(4), DATE)
            .unwrap();

        assert_eq!(metrics.tables.len(), 3);
        assert_eq!(metrics.page_count(), 5);
        assert_eq!(surface.page_count(), 5);
        assert!(surface.is_closed());
        assert_eq!(surface.transform_depth(), 0);

        let titles: Vec<String> = (0..3)
            .map(|page| surface.texts_on_page(page)[0].clone())
            .collect();
        assert_eq!(
            titles,
            vec![
                "Pacientes - 18/10/2026",
                "Tubos de Sangre - 18/10/2026",
                "Laboratorio - 18/10/2026",
            ]
        );
        let cards = metrics.cards.expect("cards drawn");
        assert_eq!(cards.cards_per_page, vec![3, 1]);
    }

    #[test]
    fn table_starts_one_title_line_below_the_margin() {
        let composer = clinic();
        let mut surface = RecordingSurface::new();
        composer
            .compose(&mut surface, &appointments(1), DATE)
            .unwrap();
        let first_header = surface.pages()[0]
            .iter()
            .find_map(|op| match op {
                Op::FillRect { rect, .. } => Some(*rect),
                _ => None,
            })
            .expect("header fill");
        // 10pt margin + one 12pt line at 1.2em
        assert_eq!(first_header.y, Pt::from_f32(24.4));
        assert_eq!(first_header.x, Pt::from_i32(10));
    }

    #[test]
    fn record_order_is_kept_in_every_table() {
        let composer = clinic();
        let mut surface = RecordingSurface::new();
        let metrics = composer
            .compose(&mut surface, &appointments(3), DATE)
            .unwrap();
        for page in 0..3 {
            let texts = surface.texts_on_page(page);
            let positions: Vec<usize> = (1..=3)
                .map(|n| {
                    let name = format!("Recipient {n}");
                    texts
                        .iter()
                        .position(|t| *t == name)
                        .expect("recipient drawn")
                })
                .collect();
            assert!(positions.windows(2).all(|w| w[0] < w[1]));
        }
        assert!(metrics.tables.iter().all(|t| t.rows == 3));
        assert_eq!(
            metrics.tables[2].tallest_row,
            Some(Pt::from_i32(45))
        );
    }

    #[test]
    fn no_records_still_prints_table_headers() {
        let composer = clinic();
        let mut surface = RecordingSurface::new();
        let metrics = composer.compose(&mut surface, &[], DATE).unwrap();
        assert_eq!(surface.page_count(), 3);
        assert_eq!(metrics.cards.map(|c| c.pages), Some(0));
        let origin = Pt::from_f32(24.4);
        assert_eq!(
            metrics.tables[0].end_y,
            origin + Pt::from_i32(20) + Pt::from_i32(10)
        );
        assert_eq!(
            metrics.tables[2].end_y,
            origin + Pt::from_i32(30) + Pt::from_i32(10)
        );
    }

    #[test]
    fn render_pdf_produces_one_pdf_page_per_surface_page() {
        let composer = clinic();
        let report = composer.render_pdf(&appointments(2), DATE).unwrap();
        assert_eq!(report.metrics.page_count(), 4);
        let doc = lopdf::Document::load_mem(&report.pdf).expect("pdf parses");
        assert_eq!(doc.get_pages().len(), 4);
        assert!(report.pdf.starts_with(b"%PDF-1.7"));
    }

    #[test]
    fn measurement_failures_surface_as_errors() {
        let composer = clinic();
        let mut surface = RecordingSurface::new().fail_font("Helvetica-Bold");
        let err = composer
            .compose(&mut surface, &appointments(1), DATE)
            .unwrap_err();
        assert!(matches!(err, ReportError::Measurement { ref font, .. } if font == "Helvetica-Bold"));
        assert!(!surface.is_closed());
    }

    #[test]
    fn builder_rejects_empty_and_unfit_reports() {
        assert!(matches!(
            ReportBuilder::new().build(),
            Err(ReportError::InvalidConfiguration(_))
        ));
        let crowded = CardPlan {
            tiles: TileConfig {
                cards_per_page: 5,
                ..TileConfig::default()
            },
            template: CardTemplate::clinic_default(),
        };
        assert!(matches!(
            ReportBuilder::new().cards(crowded).build(),
            Err(ReportError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn clinic_report_without_cards_stops_after_tables() {
        let composer = ReportBuilder::clinic_default()
            .unwrap()
            .without_cards()
            .build()
            .unwrap();
        let mut surface = RecordingSurface::new();
        let metrics = composer
            .compose(&mut surface, &appointments(4), DATE)
            .unwrap();
        assert!(metrics.cards.is_none());
        assert_eq!(metrics.page_count(), 3);
        assert_eq!(surface.page_count(), 3);
        assert!(surface.is_closed());
    }

    #[test]
    fn custom_table_only_report() {
        let schema = TableSchema::new(vec![
            ColumnSpec::new("No", 30.0),
            ColumnSpec::new("Tubos", 80.0),
        ])
        .unwrap();
        let composer = ReportBuilder::new()
            .table(
                TablePlan::new("Tubos", schema, |record: &Record, index: usize| {
                    vec![
                        (index + 1).to_string(),
                        record.get(fields::NUMBER_OF_TUBES).to_string(),
                    ]
                })
                .min_row_height(Pt::from_i32(30)),
            )
            .build()
            .unwrap();
        let mut surface = RecordingSurface::new();
        let records = vec![Record::new().with(fields::NUMBER_OF_TUBES, "3")];
        let metrics = composer.compose(&mut surface, &records, DATE).unwrap();
        assert_eq!(surface.page_count(), 1);
        assert!(metrics.cards.is_none());
        assert!(surface.texts_on_page(0).contains(&"3".to_string()));
    }

    #[test]
    fn debug_log_records_each_stage() {
        let path = temp_log_path("compose");
        let composer = ReportBuilder::clinic_default()
            .unwrap()
            .debug_log(&path)
            .build()
            .unwrap();
        let mut surface = RecordingSurface::new();
        composer
            .compose(&mut surface, &appointments(4), DATE)
            .unwrap();

        let contents = std::fs::read_to_string(&path).expect("log readable");
        let count = |kind: &str| {
            contents
                .lines()
                .filter(|line| line.starts_with(&format!("{{\"type\":\"{kind}\"")))
                .count()
        };
        assert_eq!(count("table.rendered"), 3);
        assert_eq!(count("cards.page"), 2);
        assert_eq!(count("report.done"), 1);
        assert_eq!(count("debug.summary"), 1);
        assert!(contents.contains("\"title\":\"Pacientes\",\"rows\":4"));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn composers_share_config_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ReportConfig>();
        assert_send_sync::<ReportComposer>();

        let composer = clinic();
        let records = appointments(5);
        let pages: Vec<usize> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..2)
                .map(|_| {
                    let composer = composer.clone();
                    let records = &records;
                    scope.spawn(move || {
                        let mut surface = RecordingSurface::new();
                        composer.compose(&mut surface, records, DATE).unwrap();
                        surface.page_count()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(pages, vec![5, 5]);
    }
}
