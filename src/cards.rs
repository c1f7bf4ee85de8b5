use crate::error::ReportError;
use crate::surface::{RenderSurface, with_saved_transform};
use crate::text::{TextOptions, TextStyle};
use crate::truncate::fit_text;
use crate::types::{Margins, Orientation, PageSetup, Pt, Rect, Size};
use daysheet_contract::{Record, fields};
use std::ops::Range;

// Gap between the card border and the template origin, after the half-width shift.
const TEMPLATE_INSET: i32 = 20;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileConfig {
    pub cards_per_page: usize,
    /// Card size before the quarter turn; the tile on the page is this swapped.
    pub unrotated_width: Pt,
    pub unrotated_height: Pt,
    /// Physical page size, orientation already applied.
    pub page_size: Size,
}

impl Default for TileConfig {
    /// Three 5x3in cards across a landscape Letter page.
    fn default() -> Self {
        Self {
            cards_per_page: 3,
            unrotated_width: Pt::from_i32(5 * 72),
            unrotated_height: Pt::from_i32(3 * 72),
            page_size: Size::letter().oriented(Orientation::Landscape),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardTile {
    pub index: usize,
    pub page_index: usize,
    pub page_slot: usize,
    pub origin_x: Pt,
    pub origin_y: Pt,
    pub width_unrotated: Pt,
    pub height_unrotated: Pt,
}

impl CardTile {
    /// Area the card occupies on the page once rotated.
    pub fn page_rect(&self) -> Rect {
        Rect::new(
            self.origin_x,
            self.origin_y,
            self.height_unrotated,
            self.width_unrotated,
        )
    }
}

/// Fixed-capacity pages of identical tiles, centred on the page.
#[derive(Debug, Clone, PartialEq)]
pub struct GridPaginator {
    config: TileConfig,
    horizontal_margin: Pt,
    vertical_margin: Pt,
}

impl GridPaginator {
    pub fn new(config: TileConfig) -> Result<Self, ReportError> {
        if config.cards_per_page == 0 {
            return Err(ReportError::InvalidConfiguration(
                "cards_per_page must be at least 1".to_string(),
            ));
        }
        if config.unrotated_width <= Pt::ZERO || config.unrotated_height <= Pt::ZERO {
            return Err(ReportError::InvalidConfiguration(
                "card sides must be positive".to_string(),
            ));
        }
        let per_page = i32::try_from(config.cards_per_page).map_err(|_| {
            ReportError::InvalidConfiguration("cards_per_page is too large".to_string())
        })?;
        let row_width = config.unrotated_height * per_page;
        let horizontal_margin = (config.page_size.width - row_width) / 2;
        let vertical_margin = (config.page_size.height - config.unrotated_width) / 2;
        if horizontal_margin < Pt::ZERO || vertical_margin < Pt::ZERO {
            return Err(ReportError::InvalidConfiguration(format!(
                "{} cards of {}x{}pt do not fit a {}x{}pt page",
                config.cards_per_page,
                config.unrotated_height.to_f32(),
                config.unrotated_width.to_f32(),
                config.page_size.width.to_f32(),
                config.page_size.height.to_f32()
            )));
        }
        Ok(Self {
            config,
            horizontal_margin,
            vertical_margin,
        })
    }

    pub fn config(&self) -> &TileConfig {
        &self.config
    }

    pub fn page_count(&self, items: usize) -> usize {
        items.div_ceil(self.config.cards_per_page)
    }

    /// Item index ranges, one per page; the last may be short.
    pub fn page_ranges(&self, items: usize) -> Vec<Range<usize>> {
        let per_page = self.config.cards_per_page;
        (0..self.page_count(items))
            .map(|page| page * per_page..((page + 1) * per_page).min(items))
            .collect()
    }

    pub fn starts_page(&self, index: usize) -> bool {
        index % self.config.cards_per_page == 0
    }

    pub fn tile(&self, index: usize) -> CardTile {
        let slot = index % self.config.cards_per_page;
        CardTile {
            index,
            page_index: index / self.config.cards_per_page,
            page_slot: slot,
            origin_x: self.horizontal_margin + self.config.unrotated_height * slot as i32,
            origin_y: self.vertical_margin,
            width_unrotated: self.config.unrotated_width,
            height_unrotated: self.config.unrotated_height,
        }
    }

    pub fn page_setup(&self) -> PageSetup {
        let size = self.config.page_size;
        let orientation = if size.width > size.height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        };
        PageSetup {
            size,
            orientation,
            margins: Margins::symmetric(self.vertical_margin, self.horizontal_margin),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CardText {
    Literal(String),
    Field(&'static str),
    /// 1-based position of the card in the run.
    SequenceNumber,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CardElement {
    Text {
        x: Pt,
        y: Pt,
        content: CardText,
        style: TextStyle,
        /// Single-line budget; longer text is cut with an ellipsis.
        max_width: Option<Pt>,
    },
    Outline {
        rect: Rect,
    },
    /// Box around the sequence number, widened once the number has two digits.
    SequenceBox {
        x: Pt,
        y: Pt,
        height: Pt,
        width: Pt,
        wide_width: Pt,
    },
}

impl CardElement {
    pub fn text(x: i32, y: i32, content: CardText, style: TextStyle) -> Self {
        CardElement::Text {
            x: Pt::from_i32(x),
            y: Pt::from_i32(y),
            content,
            style,
            max_width: None,
        }
    }

    pub fn label(x: i32, y: i32, text: &str) -> Self {
        Self::text(x, y, CardText::Literal(text.to_string()), TextStyle::helvetica(12.0))
    }

    pub fn square(x: i32, y: i32, side: i32) -> Self {
        CardElement::Outline {
            rect: Rect::new(
                Pt::from_i32(x),
                Pt::from_i32(y),
                Pt::from_i32(side),
                Pt::from_i32(side),
            ),
        }
    }

    pub fn with_max_width(self, limit: Pt) -> Self {
        match self {
            CardElement::Text {
                x,
                y,
                content,
                style,
                ..
            } => CardElement::Text {
                x,
                y,
                content,
                style,
                max_width: Some(limit),
            },
            other => other,
        }
    }
}

/// Ordered drawing recipe for one card, in the card's local frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CardTemplate {
    elements: Vec<CardElement>,
}

impl CardTemplate {
    pub fn new(elements: Vec<CardElement>) -> Self {
        Self { elements }
    }

    pub fn elements(&self) -> &[CardElement] {
        &self.elements
    }

    pub fn push(mut self, element: CardElement) -> Self {
        self.elements.push(element);
        self
    }

    /// The clinic's appointment card: number, names, treatment, test checklist
    /// and tube tally boxes.
    pub fn clinic_default() -> Self {
        let mut elements = vec![
            CardElement::SequenceBox {
                x: Pt::from_i32(10),
                y: Pt::from_i32(10),
                height: Pt::from_i32(30),
                width: Pt::from_i32(30),
                wide_width: Pt::from_i32(40),
            },
            CardElement::text(20, 20, CardText::SequenceNumber, TextStyle::helvetica(18.0)),
            CardElement::label(80, 20, "Visit: _______"),
            CardElement::text(
                20,
                60,
                CardText::Field(fields::RECIPIENT_NAME),
                TextStyle::helvetica(12.0),
            ),
            CardElement::text(
                20,
                80,
                CardText::Field(fields::DONOR_NAME),
                TextStyle::helvetica(12.0),
            ),
            CardElement::text(
                20,
                110,
                CardText::Field(fields::TREATMENT_NAME),
                TextStyle::helvetica_bold(10.0),
            ),
            CardElement::label(20, 130, "______________________"),
        ];
        for (y, label) in [
            (160, "Rogham"),
            (190, "STD - Donante Pareja"),
            (220, "STD - Paciente"),
        ] {
            elements.push(CardElement::square(20, y - 3, 20));
            elements.push(CardElement::label(50, y, label));
        }
        elements.push(CardElement::label(20, 255, "______ STD Donantes"));
        elements.push(CardElement::label(20, 285, "Tubos"));
        for x in [20, 70, 120] {
            elements.push(CardElement::square(x, 305, 40));
        }
        Self { elements }
    }

    /// Draws every element for `record` in the current local frame.
    pub fn draw<S>(&self, surface: &mut S, record: &Record, number: usize) -> Result<(), ReportError>
    where
        S: RenderSurface + ?Sized,
    {
        for element in &self.elements {
            match element {
                CardElement::Text {
                    x,
                    y,
                    content,
                    style,
                    max_width,
                } => {
                    let text = match content {
                        CardText::Literal(text) => text.clone(),
                        CardText::Field(name) => record.get(name).to_string(),
                        CardText::SequenceNumber => number.to_string(),
                    };
                    let text = match max_width {
                        Some(limit) => fit_text(&*surface, &text, *limit, style)?,
                        None => text,
                    };
                    surface.draw_text(&text, *x, *y, &TextOptions::new(style.clone()))?;
                }
                CardElement::Outline { rect } => surface.stroke_rect(*rect),
                CardElement::SequenceBox {
                    x,
                    y,
                    height,
                    width,
                    wide_width,
                } => {
                    let width = if number > 9 { *wide_width } else { *width };
                    surface.stroke_rect(Rect::new(*x, *y, width, *height));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CardGridSummary {
    pub cards: usize,
    pub pages: usize,
    /// Cards drawn on each page, in page order.
    pub cards_per_page: Vec<usize>,
}

/// Draws one card inside its tile: border on the tile edge, template in the
/// card's local frame.
pub fn render_card<S>(
    surface: &mut S,
    tile: &CardTile,
    record: &Record,
    template: &CardTemplate,
) -> Result<(), ReportError>
where
    S: RenderSurface + ?Sized,
{
    let width = tile.width_unrotated;
    let height = tile.height_unrotated;
    with_saved_transform(surface, |s| {
        s.translate(tile.origin_x + height / 2, tile.origin_y + width / 2);
        s.rotate(90.0);
        s.translate(-(width / 2), -(height / 2));
        s.stroke_rect(Rect::new(Pt::ZERO, Pt::ZERO, width, height));
        s.rotate(-90.0);
        s.translate(-(width / 2) - Pt::from_i32(TEMPLATE_INSET), Pt::ZERO);
        template.draw(s, record, tile.index + 1)
    })
}

/// Lays out one card per record, opening a fresh page each time the
/// current one is full.
pub fn render_card_grid<S>(
    surface: &mut S,
    records: &[Record],
    config: &TileConfig,
    template: &CardTemplate,
) -> Result<CardGridSummary, ReportError>
where
    S: RenderSurface + ?Sized,
{
    let paginator = GridPaginator::new(*config)?;
    let setup = paginator.page_setup();
    let mut summary = CardGridSummary::default();
    for (index, record) in records.iter().enumerate() {
        if paginator.starts_page(index) {
            surface.open_page(&setup)?;
            summary.pages += 1;
            summary.cards_per_page.push(0);
        }
        render_card(surface, &paginator.tile(index), record, template)?;
        summary.cards += 1;
        if let Some(count) = summary.cards_per_page.last_mut() {
            *count += 1;
        }
    }
    Ok(summary)
}
