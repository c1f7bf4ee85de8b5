use crate::cards::CardGridSummary;
use crate::table::RenderedTable;
use crate::types::Pt;

#[derive(Debug, Clone, PartialEq)]
pub struct TableMetrics {
    pub title: String,
    pub rows: usize,
    pub width: Pt,
    pub end_y: Pt,
    pub tallest_row: Option<Pt>,
}

impl TableMetrics {
    pub(crate) fn from_rendered(title: &str, table: &RenderedTable) -> Self {
        Self {
            title: title.to_string(),
            rows: table.rows.len(),
            width: table.width,
            end_y: table.end_y,
            tallest_row: table.rows.iter().map(|row| row.height).reduce(Pt::max),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportMetrics {
    pub tables: Vec<TableMetrics>,
    pub cards: Option<CardGridSummary>,
}

impl ReportMetrics {
    /// One page per table plus the card pages.
    pub fn page_count(&self) -> usize {
        self.tables.len() + self.cards.as_ref().map_or(0, |cards| cards.pages)
    }
}
