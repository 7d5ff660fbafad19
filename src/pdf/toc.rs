//! Table-of-contents generation.
//!
//! The TOC is laid out top-to-bottom on US Letter pages by a small cursor
//! based layout engine: each element asks whether it fits above the bottom
//! margin and starts a new page when it does not. Table rows never split;
//! a table that continues on a new page repeats its header row.
//!
//! ```text
//!            EXHIBIT PACKAGE
//!           TABLE OF CONTENTS
//!     ┌──────────────┬───────────────────────┐
//!     │     Case ID: │ Smith O-1A            │
//!     │  Generated:  │ March 04, 2025        │
//!     └──────────────┴───────────────────────┘
//!   Exhibit List
//!   ┌─────────┬─────────────────────┬───────┐
//!   │ Exhibit │ Title/Description   │ Pages │
//!   ├─────────┼─────────────────────┼───────┤
//!   │Exhibit A│ resume.pdf          │   3   │
//!   └─────────┴─────────────────────┴───────┘
//! ```

use super::font::{fit_width, literal, truncate_chars, Font};
use super::{install_page_tree, LETTER_HEIGHT, LETTER_WIDTH};
use crate::config::CaseInfo;
use crate::error::ExhibitError;
use chrono::NaiveDate;
use lopdf::{Dictionary, Document, Object, Stream};
use serde::{Deserialize, Serialize};

// ── Page geometry ────────────────────────────────────────────────────────

const INCH: f32 = 72.0;
const MARGIN_LEFT: f32 = 72.0;
const MARGIN_RIGHT: f32 = 72.0;
const MARGIN_TOP: f32 = 72.0;
const MARGIN_BOTTOM: f32 = 18.0;
const CONTENT_WIDTH: f32 = LETTER_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
const LEADING: f32 = 1.2;
/// Helvetica cap height as a fraction of the font size.
const CAP_HEIGHT: f32 = 0.718;

const TITLE_SIZE: f32 = 24.0;
const TITLE_SPACE_AFTER: f32 = 30.0;
const HEADING_SIZE: f32 = 16.0;
const HEADING_SPACE: f32 = 12.0;
const FOOTER_SIZE: f32 = 9.0;

/// Titles longer than this are cut and end in `...`.
pub const TITLE_MAX_CHARS: usize = 60;
/// URLs longer than this are cut and end in `...`.
pub const URL_MAX_CHARS: usize = 40;

// ── Colours ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
struct Rgb(f32, f32, f32);

impl Rgb {
    fn fill(self) -> String {
        format!("{:.3} {:.3} {:.3} rg", self.0, self.1, self.2)
    }

    fn stroke(self) -> String {
        format!("{:.3} {:.3} {:.3} RG", self.0, self.1, self.2)
    }
}

/// #1f77b4
const ACCENT: Rgb = Rgb(0.122, 0.467, 0.706);
/// #333333
const HEADING: Rgb = Rgb(0.2, 0.2, 0.2);
const GREY: Rgb = Rgb(0.502, 0.502, 0.502);
/// #f0f0f0
const LABEL_BACKGROUND: Rgb = Rgb(0.941, 0.941, 0.941);
/// #f9f9f9
const STRIPE: Rgb = Rgb(0.976, 0.976, 0.976);
const WHITE: Rgb = Rgb(1.0, 1.0, 1.0);
const WHITESMOKE: Rgb = Rgb(0.961, 0.961, 0.961);
const BLACK: Rgb = Rgb(0.0, 0.0, 0.0);

// ── Public types ─────────────────────────────────────────────────────────

/// One row of the exhibit list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    pub label: String,
    pub title: String,
    pub page_count: usize,
    pub original_url: Option<String>,
    pub archived_url: Option<String>,
}

/// A rendered table of contents.
#[derive(Debug, Clone)]
pub struct TocDocument {
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

/// Render the table of contents for `entries`.
///
/// Layout depends only on the arguments; `generated_on` is printed as
/// `%B %d, %Y`.
pub fn generate_toc(
    case: &CaseInfo,
    entries: &[TocEntry],
    generated_on: NaiveDate,
) -> Result<TocDocument, ExhibitError> {
    let pages = layout(case, entries, generated_on);
    let page_count = pages.len();
    let bytes = render(pages)?;
    Ok(TocDocument { bytes, page_count })
}

// ── Layout ───────────────────────────────────────────────────────────────

fn layout(case: &CaseInfo, entries: &[TocEntry], generated_on: NaiveDate) -> Vec<String> {
    let mut page = Layout::new();

    page.centred_line("EXHIBIT PACKAGE", Font::HelveticaBold, TITLE_SIZE, ACCENT);
    page.space(TITLE_SPACE_AFTER);
    page.centred_line("TABLE OF CONTENTS", Font::HelveticaBold, TITLE_SIZE, ACCENT);
    page.space(TITLE_SPACE_AFTER);
    page.space(0.3 * INCH);

    page.table(&INFO_TABLE, None, &case_rows(case, entries.len(), generated_on));
    page.space(0.5 * INCH);

    page.heading("Exhibit List");
    page.space(0.2 * INCH);
    let header = header_row(&["Exhibit", "Title/Description", "Pages"], 11.0);
    let rows: Vec<Vec<Cell>> = entries
        .iter()
        .enumerate()
        .map(|(i, e)| {
            let background = stripe(i);
            vec![
                Cell::new(format!("Exhibit {}", e.label), Font::Helvetica, 10.0)
                    .align(Align::Center)
                    .background(background),
                Cell::new(truncate_chars(&e.title, TITLE_MAX_CHARS), Font::Helvetica, 10.0)
                    .background(background),
                Cell::new(e.page_count.to_string(), Font::Helvetica, 10.0)
                    .align(Align::Center)
                    .background(background),
            ]
        })
        .collect();
    page.table(&EXHIBIT_TABLE, Some(header.as_slice()), &rows);

    let with_urls: Vec<&TocEntry> = entries
        .iter()
        .filter(|e| e.original_url.is_some() || e.archived_url.is_some())
        .collect();
    // A failed snapshot falls back to the original URL.
    let any_archived = entries
        .iter()
        .any(|e| e.archived_url.is_some() && e.archived_url != e.original_url);
    if !with_urls.is_empty() {
        page.space(0.5 * INCH);
        page.heading("Archived URLs (archive.org)");
        page.space(0.2 * INCH);
        let header = header_row(&["Exhibit", "Original URL", "Archived URL"], 9.0);
        let rows: Vec<Vec<Cell>> = with_urls
            .iter()
            .enumerate()
            .map(|(i, e)| {
                let background = stripe(i);
                let url_cell = |url: &Option<String>| {
                    let text = url
                        .as_deref()
                        .map(|u| truncate_chars(u, URL_MAX_CHARS))
                        .unwrap_or_else(|| "N/A".to_string());
                    Cell::new(text, Font::Helvetica, 8.0).background(background)
                };
                vec![
                    Cell::new(format!("Exhibit {}", e.label), Font::Helvetica, 8.0)
                        .background(background),
                    url_cell(&e.original_url),
                    url_cell(&e.archived_url),
                ]
            })
            .collect();
        page.table(&URL_TABLE, Some(header.as_slice()), &rows);
    }

    page.space(0.5 * INCH);
    page.centred_line(
        "This exhibit package was generated automatically.",
        Font::Helvetica,
        FOOTER_SIZE,
        GREY,
    );
    if any_archived {
        page.centred_line(
            "All source URLs have been archived to archive.org for preservation.",
            Font::Helvetica,
            FOOTER_SIZE,
            GREY,
        );
    }

    page.finish()
}

fn case_rows(case: &CaseInfo, total: usize, generated_on: NaiveDate) -> Vec<Vec<Cell>> {
    let mut pairs: Vec<(&str, String)> = vec![("Case ID:", case.case_name.clone())];
    if let Some(b) = &case.beneficiary {
        pairs.push(("Beneficiary:", b.clone()));
    }
    if let Some(p) = &case.petitioner {
        pairs.push(("Petitioner:", p.clone()));
    }
    if let Some(v) = &case.visa_type {
        pairs.push(("Visa Type:", v.clone()));
    }
    pairs.push(("Generated:", generated_on.format("%B %d, %Y").to_string()));
    pairs.push(("Total Exhibits:", total.to_string()));

    pairs
        .into_iter()
        .map(|(key, value)| {
            vec![
                Cell::new(key, Font::HelveticaBold, 11.0)
                    .align(Align::Right)
                    .background(Some(LABEL_BACKGROUND)),
                Cell::new(value, Font::Helvetica, 11.0),
            ]
        })
        .collect()
}

fn header_row(titles: &[&str], size: f32) -> Vec<Cell> {
    titles
        .iter()
        .map(|t| {
            Cell::new(*t, Font::HelveticaBold, size)
                .align(Align::Center)
                .color(WHITESMOKE)
                .background(Some(ACCENT))
        })
        .collect()
}

fn stripe(row: usize) -> Option<Rgb> {
    Some(if row % 2 == 0 { WHITE } else { STRIPE })
}

// ── Tables ───────────────────────────────────────────────────────────────

struct TableStyle {
    widths: &'static [f32],
    pad_x: f32,
    pad_y: f32,
    grid_width: f32,
}

const INFO_TABLE: TableStyle = TableStyle {
    widths: &[2.0 * INCH, 4.0 * INCH],
    pad_x: 12.0,
    pad_y: 8.0,
    grid_width: 1.0,
};

const EXHIBIT_TABLE: TableStyle = TableStyle {
    widths: &[1.2 * INCH, 4.3 * INCH, 1.0 * INCH],
    pad_x: 8.0,
    pad_y: 6.0,
    grid_width: 0.5,
};

const URL_TABLE: TableStyle = TableStyle {
    widths: &[1.0 * INCH, 2.5 * INCH, 2.5 * INCH],
    pad_x: 6.0,
    pad_y: 4.0,
    grid_width: 0.5,
};

impl TableStyle {
    fn row_height(&self, cells: &[Cell]) -> f32 {
        let tallest = cells.iter().map(|c| c.size).fold(0.0_f32, f32::max);
        tallest * LEADING + 2.0 * self.pad_y
    }

    fn left(&self) -> f32 {
        let width: f32 = self.widths.iter().sum();
        MARGIN_LEFT + (CONTENT_WIDTH - width) / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Center,
    Right,
}

struct Cell {
    text: String,
    font: Font,
    size: f32,
    color: Rgb,
    align: Align,
    background: Option<Rgb>,
}

impl Cell {
    fn new(text: impl Into<String>, font: Font, size: f32) -> Self {
        Self {
            text: text.into(),
            font,
            size,
            color: BLACK,
            align: Align::Left,
            background: None,
        }
    }

    fn align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    fn color(mut self, color: Rgb) -> Self {
        self.color = color;
        self
    }

    fn background(mut self, background: Option<Rgb>) -> Self {
        self.background = background;
        self
    }
}

fn resource_name(font: Font) -> &'static str {
    match font {
        Font::Helvetica => "F1",
        Font::HelveticaBold => "F2",
    }
}

// ── Layout engine ────────────────────────────────────────────────────────

struct Layout {
    pages: Vec<String>,
    current: String,
    /// Top of the remaining free space on the current page.
    y: f32,
}

impl Layout {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: String::new(),
            y: LETTER_HEIGHT - MARGIN_TOP,
        }
    }

    fn fits(&self, height: f32) -> bool {
        self.y - height >= MARGIN_BOTTOM
    }

    fn new_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.current));
        self.y = LETTER_HEIGHT - MARGIN_TOP;
    }

    /// Vertical gap. A gap that does not fit just exhausts the page.
    fn space(&mut self, height: f32) {
        self.y = (self.y - height).max(MARGIN_BOTTOM);
    }

    fn ensure(&mut self, height: f32) {
        if !self.fits(height) && !self.current.is_empty() {
            self.new_page();
        }
    }

    fn draw_text(&mut self, text: &str, font: Font, size: f32, color: Rgb, x: f32, baseline: f32) {
        self.current.push_str(&format!(
            "BT /{} {size} Tf {} {x:.2} {baseline:.2} Td {} Tj ET\n",
            resource_name(font),
            color.fill(),
            literal(text)
        ));
    }

    fn centred_line(&mut self, text: &str, font: Font, size: f32, color: Rgb) {
        let height = size * LEADING;
        self.ensure(height);
        let fitted = fit_width(font, text, size, CONTENT_WIDTH);
        let x = MARGIN_LEFT + (CONTENT_WIDTH - font.text_width(&fitted, size)) / 2.0;
        self.draw_text(&fitted, font, size, color, x, self.y - size);
        self.y -= height;
    }

    /// Section heading, kept on the same page as at least one table row.
    fn heading(&mut self, text: &str) {
        let line = HEADING_SIZE * LEADING;
        self.ensure(HEADING_SPACE + line + HEADING_SPACE + 0.2 * INCH + 50.0);
        self.space(HEADING_SPACE);
        let fitted = fit_width(Font::HelveticaBold, text, HEADING_SIZE, CONTENT_WIDTH);
        self.draw_text(
            &fitted,
            Font::HelveticaBold,
            HEADING_SIZE,
            HEADING,
            MARGIN_LEFT,
            self.y - HEADING_SIZE,
        );
        self.y -= line;
        self.space(HEADING_SPACE);
    }

    fn table(&mut self, style: &TableStyle, header: Option<&[Cell]>, rows: &[Vec<Cell>]) {
        if let Some(header) = header {
            let first = rows.first().map(|r| style.row_height(r)).unwrap_or(0.0);
            self.ensure(style.row_height(header) + first);
            self.row(style, header);
        }
        for row in rows {
            let height = style.row_height(row);
            if !self.fits(height) {
                self.new_page();
                if let Some(header) = header {
                    self.row(style, header);
                }
            }
            self.row(style, row);
        }
    }

    fn row(&mut self, style: &TableStyle, cells: &[Cell]) {
        let height = style.row_height(cells);
        let bottom = self.y - height;
        let mut x = style.left();

        for (cell, &width) in cells.iter().zip(style.widths) {
            if let Some(bg) = cell.background {
                self.current.push_str(&format!(
                    "{} {x:.2} {bottom:.2} {width:.2} {height:.2} re f\n",
                    bg.fill()
                ));
            }
            self.current.push_str(&format!(
                "{} w {} {x:.2} {bottom:.2} {width:.2} {height:.2} re S\n",
                style.grid_width,
                GREY.stroke()
            ));

            let text = fit_width(cell.font, &cell.text, cell.size, width - 2.0 * style.pad_x);
            let text_width = cell.font.text_width(&text, cell.size);
            let tx = match cell.align {
                Align::Left => x + style.pad_x,
                Align::Center => x + (width - text_width) / 2.0,
                Align::Right => x + width - style.pad_x - text_width,
            };
            let ty = bottom + (height - CAP_HEIGHT * cell.size) / 2.0;
            self.draw_text(&text, cell.font, cell.size, cell.color, tx, ty);
            x += width;
        }
        self.y = bottom;
    }

    fn finish(mut self) -> Vec<String> {
        if !self.current.is_empty() || self.pages.is_empty() {
            self.pages.push(std::mem::take(&mut self.current));
        }
        self.pages
    }
}

// ── Rendering ────────────────────────────────────────────────────────────

fn render(pages: Vec<String>) -> Result<Vec<u8>, ExhibitError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let regular_id = doc.add_object(Font::Helvetica.dictionary());
    let bold_id = doc.add_object(Font::HelveticaBold.dictionary());
    let resources_id = doc.add_object(Dictionary::from_iter(vec![(
        "Font",
        Object::Dictionary(Dictionary::from_iter(vec![
            (resource_name(Font::Helvetica), Object::Reference(regular_id)),
            (resource_name(Font::HelveticaBold), Object::Reference(bold_id)),
        ])),
    )]));

    let mut page_ids = Vec::with_capacity(pages.len());
    for content in pages {
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));
        let page_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("Contents", Object::Reference(content_id)),
            ("Resources", Object::Reference(resources_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(LETTER_WIDTH as i64),
                    Object::Integer(LETTER_HEIGHT as i64),
                ]),
            ),
        ]));
        page_ids.push(page_id);
    }

    install_page_tree(&mut doc, pages_id, &page_ids);
    super::save(doc)
}
